//! Resolved program model: objects, lexical scopes, and types live in one
//! [`Arena`] and are addressed by small copyable ids.

mod check;
mod format;
mod universe;

pub use check::{check_package, Checked, TypeError};
pub(crate) use check::overload_base;
pub use format::{object_kind_name, signature_string, type_string, Qualifier};
pub use universe::{builtin_signature, BuiltinSig};

pub use crate::language::ast::ChanDir;

use crate::language::{ast::NodeId, span::Pos};
use rustc_hash::FxHashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Invalid,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,
    Byte,
    Rune,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Invalid => "invalid type",
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::String => "string",
            BasicKind::UnsafePointer => "unsafe.Pointer",
            BasicKind::Byte => "byte",
            BasicKind::Rune => "rune",
            BasicKind::UntypedBool => "untyped bool",
            BasicKind::UntypedInt => "untyped int",
            BasicKind::UntypedRune => "untyped rune",
            BasicKind::UntypedFloat => "untyped float",
            BasicKind::UntypedString => "untyped string",
            BasicKind::UntypedNil => "untyped nil",
        }
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            BasicKind::UntypedBool
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
                | BasicKind::UntypedFloat
                | BasicKind::UntypedString
                | BasicKind::UntypedNil
        )
    }

    /// Type an untyped constant takes when nothing else constrains it.
    pub fn default_kind(self) -> BasicKind {
        match self {
            BasicKind::UntypedBool => BasicKind::Bool,
            BasicKind::UntypedInt => BasicKind::Int,
            BasicKind::UntypedRune => BasicKind::Rune,
            BasicKind::UntypedFloat => BasicKind::Float64,
            BasicKind::UntypedString => BasicKind::String,
            other => other,
        }
    }

    /// Aliases compare equal to their target.
    fn canonical(self) -> BasicKind {
        match self {
            BasicKind::Byte => BasicKind::Uint8,
            BasicKind::Rune => BasicKind::Int32,
            other => other,
        }
    }

    const ALL: [BasicKind; 27] = [
        BasicKind::Invalid,
        BasicKind::Bool,
        BasicKind::Int,
        BasicKind::Int8,
        BasicKind::Int16,
        BasicKind::Int32,
        BasicKind::Int64,
        BasicKind::Uint,
        BasicKind::Uint8,
        BasicKind::Uint16,
        BasicKind::Uint32,
        BasicKind::Uint64,
        BasicKind::Uintptr,
        BasicKind::Float32,
        BasicKind::Float64,
        BasicKind::Complex64,
        BasicKind::Complex128,
        BasicKind::String,
        BasicKind::UnsafePointer,
        BasicKind::Byte,
        BasicKind::Rune,
        BasicKind::UntypedBool,
        BasicKind::UntypedInt,
        BasicKind::UntypedRune,
        BasicKind::UntypedFloat,
        BasicKind::UntypedString,
        BasicKind::UntypedNil,
    ];
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Named {
    pub obj: ObjectId,
    /// Declared right-hand side; may itself be a named type, see
    /// [`Arena::underlying`].
    pub underlying: TypeId,
    pub methods: Vec<ObjectId>,
    pub type_params: Vec<TypeId>,
    pub type_args: Vec<TypeId>,
    /// Generic origin of an instantiation.
    pub origin: Option<TypeId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub recv: Option<ObjectId>,
    pub type_params: Vec<TypeId>,
    pub params: Vec<ObjectId>,
    pub results: Vec<ObjectId>,
    pub variadic: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Basic(BasicKind),
    Named(Named),
    Pointer(TypeId),
    Slice(TypeId),
    Array { len: Option<u64>, elem: TypeId },
    Map { key: TypeId, value: TypeId },
    Chan { dir: ChanDir, elem: TypeId },
    Struct { fields: Vec<ObjectId> },
    Signature(Signature),
    Interface { methods: Vec<ObjectId>, embeddeds: Vec<TypeId> },
    TypeParam { obj: ObjectId, index: usize, constraint: TypeId },
    Tuple(Vec<TypeId>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinFunc {
    Append,
    Cap,
    Clear,
    Close,
    Complex,
    Copy,
    Delete,
    Imag,
    Len,
    Make,
    Max,
    Min,
    New,
    Panic,
    Print,
    Println,
    Real,
    Recover,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    TypeName,
    Const,
    Var {
        is_field: bool,
        embedded: bool,
    },
    /// `overloads` is non-empty only for a synthesized overload family.
    Func {
        overloads: Vec<ObjectId>,
    },
    PkgName {
        imported: PackageId,
    },
    Label,
    Builtin(BuiltinFunc),
    Nil,
}

#[derive(Clone, Debug)]
pub struct Object {
    pub name: String,
    pub kind: ObjectKind,
    pub pos: Pos,
    pub pkg: Option<PackageId>,
    pub parent: Option<ScopeId>,
    pub ty: TypeId,
    pub doc: Option<String>,
    /// Struct or interface type holding a field or interface method, or the
    /// named type a concrete method is declared on.
    pub owner: Option<TypeId>,
    /// Start of the region where a local declaration is visible.
    pub scope_pos: Pos,
}

impl Object {
    pub fn is_field(&self) -> bool {
        matches!(self.kind, ObjectKind::Var { is_field: true, .. })
    }

    pub fn is_exported(&self) -> bool {
        crate::language::ast::is_exported(&self.name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Universe,
    Package,
    File,
    Func,
    Block,
    Labels,
}

#[derive(Clone, Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub pos: Pos,
    pub end: Pos,
    names: Vec<ObjectId>,
    index: FxHashMap<String, ObjectId>,
}

impl Scope {
    pub fn is_func(&self) -> bool {
        self.kind == ScopeKind::Func
    }

    /// Declared objects in insertion order.
    pub fn objects(&self) -> &[ObjectId] {
        &self.names
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.pos.is_valid() && self.pos <= pos && pos <= self.end
    }
}

#[derive(Clone, Debug)]
pub struct Package {
    pub path: String,
    pub name: String,
    pub scope: ScopeId,
    pub imports: Vec<PackageId>,
    /// False for placeholders created for unresolved imports.
    pub complete: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Invalid,
    NoValue,
    Builtin,
    TypeExpr,
    Constant,
    Variable,
    Value,
    Nil,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeAndValue {
    pub mode: Mode,
    pub ty: TypeId,
}

impl TypeAndValue {
    pub fn is_type(&self) -> bool {
        self.mode == Mode::TypeExpr
    }

    pub fn addressable(&self) -> bool {
        self.mode == Mode::Variable
    }
}

/// Results of checking one package, keyed by syntax node.
#[derive(Clone, Debug, Default)]
pub struct Info {
    pub defs: FxHashMap<NodeId, ObjectId>,
    pub uses: FxHashMap<NodeId, ObjectId>,
    /// Objects declared without an identifier, such as unnamed imports.
    pub implicits: FxHashMap<NodeId, ObjectId>,
    pub types: FxHashMap<NodeId, TypeAndValue>,
    pub scopes: FxHashMap<NodeId, ScopeId>,
    /// Label scope of each function, keyed by the function's scope.
    pub labels: FxHashMap<ScopeId, ScopeId>,
    /// Position of every identifier recorded in `defs` or `uses`.
    pub idents: FxHashMap<NodeId, Pos>,
}

impl Info {
    pub fn object_of(&self, id: NodeId) -> Option<ObjectId> {
        self.defs.get(&id).or_else(|| self.uses.get(&id)).copied()
    }

    /// One use of `obj`, the earliest in source order.
    pub fn some_use(&self, obj: ObjectId) -> Option<(NodeId, Pos)> {
        self.uses
            .iter()
            .filter(|(_, used)| **used == obj)
            .map(|(id, _)| (*id, self.idents.get(id).copied().unwrap_or(Pos::NONE)))
            .min_by_key(|(id, pos)| (*pos, *id))
    }
}

/// A field or method found through [`Arena::lookup_field_or_method`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub obj: ObjectId,
    /// Embedded-field indices walked to reach `obj`.
    pub path: Vec<usize>,
    pub indirect: bool,
}

#[derive(Debug)]
pub struct Arena {
    objects: Vec<Object>,
    scopes: Vec<Scope>,
    types: Vec<Type>,
    packages: Vec<Package>,
    basics: Vec<TypeId>,
    universe: ScopeId,
    any: TypeId,
    error: TypeId,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    pub fn new() -> Self {
        let mut arena = Self {
            objects: Vec::new(),
            scopes: Vec::new(),
            types: Vec::new(),
            packages: Vec::new(),
            basics: Vec::new(),
            universe: ScopeId(0),
            any: TypeId(0),
            error: TypeId(0),
        };
        arena.universe = arena.new_scope(None, ScopeKind::Universe, Pos::NONE, Pos::NONE);
        for kind in BasicKind::ALL {
            let id = arena.new_type(Type::Basic(kind));
            arena.basics.push(id);
        }
        universe::populate(&mut arena);
        arena
    }

    pub fn universe(&self) -> ScopeId {
        self.universe
    }

    pub fn object(&self, id: ObjectId) -> &Object {
        &self.objects[id.0 as usize]
    }

    /// Every object with its handle, in creation order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(idx, obj)| (ObjectId(idx as u32), obj))
    }

    pub fn object_mut(&mut self, id: ObjectId) -> &mut Object {
        &mut self.objects[id.0 as usize]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn ty(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.0 as usize]
    }

    pub fn packages(&self) -> impl Iterator<Item = (PackageId, &Package)> {
        self.packages
            .iter()
            .enumerate()
            .map(|(idx, pkg)| (PackageId(idx as u32), pkg))
    }

    pub fn package_by_path(&self, path: &str) -> Option<PackageId> {
        self.packages()
            .filter(|(_, pkg)| pkg.path == path)
            .map(|(id, _)| id)
            .last()
    }

    pub fn new_package(&mut self, path: &str, name: &str, complete: bool) -> PackageId {
        let scope = self.new_scope(Some(self.universe), ScopeKind::Package, Pos::NONE, Pos::NONE);
        self.packages.push(Package {
            path: path.to_string(),
            name: name.to_string(),
            scope,
            imports: Vec::new(),
            complete,
        });
        PackageId(self.packages.len() as u32 - 1)
    }

    pub(crate) fn package_mut(&mut self, id: PackageId) -> &mut Package {
        &mut self.packages[id.0 as usize]
    }

    pub fn new_object(&mut self, obj: Object) -> ObjectId {
        self.objects.push(obj);
        ObjectId(self.objects.len() as u32 - 1)
    }

    pub fn new_type(&mut self, ty: Type) -> TypeId {
        self.types.push(ty);
        TypeId(self.types.len() as u32 - 1)
    }

    pub(crate) fn set_type(&mut self, id: TypeId, ty: Type) {
        self.types[id.0 as usize] = ty;
    }

    pub(crate) fn type_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.types[id.0 as usize]
    }

    pub fn new_scope(&mut self, parent: Option<ScopeId>, kind: ScopeKind, pos: Pos, end: Pos) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            kind,
            parent,
            children: Vec::new(),
            pos,
            end,
            names: Vec::new(),
            index: FxHashMap::default(),
        });
        if let Some(parent) = parent {
            self.scopes[parent.0 as usize].children.push(id);
        }
        id
    }

    /// Declares `obj` in `scope`. Returns the previous declaration on
    /// conflict, leaving the scope unchanged.
    pub fn insert(&mut self, scope: ScopeId, obj: ObjectId) -> Result<(), ObjectId> {
        let name = self.object(obj).name.clone();
        let entry = &mut self.scopes[scope.0 as usize];
        if let Some(existing) = entry.index.get(&name) {
            return Err(*existing);
        }
        entry.index.insert(name, obj);
        entry.names.push(obj);
        self.objects[obj.0 as usize].parent = Some(scope);
        Ok(())
    }

    /// Makes `obj` visible in `scope` without moving its declaration, as a
    /// dot import does.
    pub(crate) fn insert_alias(&mut self, scope: ScopeId, obj: ObjectId) -> Result<(), ObjectId> {
        let name = self.object(obj).name.clone();
        let entry = &mut self.scopes[scope.0 as usize];
        if let Some(existing) = entry.index.get(&name) {
            return Err(*existing);
        }
        entry.index.insert(name, obj);
        entry.names.push(obj);
        Ok(())
    }

    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<ObjectId> {
        self.scope(scope).index.get(name).copied()
    }

    /// Resolves `name` from `scope` outwards. Local declarations are only
    /// visible at or after their scope position.
    pub fn lookup_parent(&self, scope: ScopeId, name: &str, pos: Pos) -> Option<(ScopeId, ObjectId)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = self.scope(id);
            if let Some(obj) = entry.index.get(name) {
                let local = matches!(entry.kind, ScopeKind::Func | ScopeKind::Block);
                if !local || !pos.is_valid() || self.object(*obj).scope_pos <= pos {
                    return Some((id, *obj));
                }
            }
            current = entry.parent;
        }
        None
    }

    /// Number of scopes from `scope` up to and including the universe.
    pub fn scope_depth(&self, scope: ScopeId) -> usize {
        let mut depth = 0;
        let mut current = Some(scope);
        while let Some(id) = current {
            depth += 1;
            current = self.scope(id).parent;
        }
        depth
    }

    /// Innermost descendant of `scope` whose range contains `pos`.
    pub fn innermost_scope(&self, scope: ScopeId, pos: Pos) -> ScopeId {
        let mut current = scope;
        'descend: loop {
            for child in &self.scope(current).children {
                if self.scope(*child).contains(pos) {
                    current = *child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    pub fn basic(&self, kind: BasicKind) -> TypeId {
        self.basics[kind as usize]
    }

    pub fn invalid(&self) -> TypeId {
        self.basic(BasicKind::Invalid)
    }

    pub fn any_type(&self) -> TypeId {
        self.any
    }

    pub fn error_type(&self) -> TypeId {
        self.error
    }

    pub fn is_invalid(&self, ty: TypeId) -> bool {
        matches!(self.ty(ty), Type::Basic(BasicKind::Invalid))
    }

    pub fn pointer_to(&mut self, elem: TypeId) -> TypeId {
        self.new_type(Type::Pointer(elem))
    }

    /// Follows named types (and chains of them) down to a structural type.
    pub fn underlying(&self, ty: TypeId) -> TypeId {
        let mut current = ty;
        for _ in 0..64 {
            match self.ty(current) {
                Type::Named(named) => current = named.underlying,
                _ => return current,
            }
        }
        self.invalid()
    }

    pub fn deref(&self, ty: TypeId) -> TypeId {
        match self.ty(ty) {
            Type::Pointer(elem) => *elem,
            _ => ty,
        }
    }

    pub fn is_interface(&self, ty: TypeId) -> bool {
        matches!(self.ty(self.underlying(ty)), Type::Interface { .. })
    }

    pub fn is_empty_interface(&self, ty: TypeId) -> bool {
        match self.ty(self.underlying(ty)) {
            Type::Interface { .. } => self.interface_methods(ty).is_empty(),
            _ => false,
        }
    }

    pub fn is_untyped(&self, ty: TypeId) -> bool {
        matches!(self.ty(ty), Type::Basic(kind) if kind.is_untyped())
    }

    pub fn as_named(&self, ty: TypeId) -> Option<&Named> {
        match self.ty(ty) {
            Type::Named(named) => Some(named),
            _ => None,
        }
    }

    pub fn as_signature(&self, ty: TypeId) -> Option<&Signature> {
        match self.ty(self.underlying(ty)) {
            Type::Signature(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn struct_fields(&self, ty: TypeId) -> Option<&[ObjectId]> {
        match self.ty(self.underlying(ty)) {
            Type::Struct { fields } => Some(fields),
            _ => None,
        }
    }

    /// Declared methods of a named type (shared by its instantiations).
    pub fn named_methods(&self, ty: TypeId) -> &[ObjectId] {
        match self.ty(ty) {
            Type::Named(named) => match named.origin {
                Some(origin) if origin != ty => self.named_methods(origin),
                _ => &named.methods,
            },
            _ => &[],
        }
    }

    /// All methods of an interface, including embedded ones.
    pub fn interface_methods(&self, ty: TypeId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        self.collect_interface_methods(ty, &mut out, 0);
        out
    }

    fn collect_interface_methods(&self, ty: TypeId, out: &mut Vec<ObjectId>, depth: usize) {
        if depth > 16 {
            return;
        }
        if let Type::Interface { methods, embeddeds } = self.ty(self.underlying(ty)) {
            out.extend(methods.iter().copied());
            for embedded in embeddeds {
                self.collect_interface_methods(*embedded, out, depth + 1);
            }
        }
    }

    /// The named type whose declared underlying type is `structural`.
    pub fn named_of(&self, structural: TypeId) -> Option<TypeId> {
        self.types.iter().enumerate().find_map(|(idx, ty)| match ty {
            Type::Named(named) if named.origin.is_none() && named.underlying == structural => {
                Some(TypeId(idx as u32))
            }
            _ => None,
        })
    }

    /// Field or method `name` reachable from `ty`, breadth-first through
    /// embedded fields, with automatic pointer indirection.
    pub fn lookup_field_or_method(&self, ty: TypeId, name: &str) -> Option<Selection> {
        let (start, indirect) = match self.ty(ty) {
            Type::Pointer(elem) => (*elem, true),
            _ => (ty, false),
        };
        let mut level = vec![(start, Vec::new(), indirect)];
        let mut seen = Vec::new();
        for _ in 0..8 {
            let mut next = Vec::new();
            for (current, path, indirect) in level {
                if seen.contains(&current) {
                    continue;
                }
                seen.push(current);
                if let Some(m) = self
                    .named_methods(current)
                    .iter()
                    .find(|m| self.object(**m).name == name)
                {
                    return Some(Selection {
                        obj: *m,
                        path,
                        indirect,
                    });
                }
                if self.is_interface(current) {
                    if let Some(m) = self
                        .interface_methods(current)
                        .into_iter()
                        .find(|m| self.object(*m).name == name)
                    {
                        return Some(Selection { obj: m, path, indirect });
                    }
                }
                let Some(fields) = self.struct_fields(current) else {
                    continue;
                };
                for (idx, field) in fields.iter().enumerate() {
                    let object = self.object(*field);
                    if object.name == name {
                        let mut path = path.clone();
                        path.push(idx);
                        return Some(Selection {
                            obj: *field,
                            path,
                            indirect,
                        });
                    }
                    if matches!(object.kind, ObjectKind::Var { embedded: true, .. }) {
                        let mut path = path.clone();
                        path.push(idx);
                        let (embedded, via_pointer) = match self.ty(object.ty) {
                            Type::Pointer(elem) => (*elem, true),
                            _ => (object.ty, false),
                        };
                        next.push((embedded, path, indirect || via_pointer));
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            level = next;
        }
        None
    }

    /// Whether `ty` has every method of interface `iface`.
    pub fn implements(&self, ty: TypeId, iface: TypeId) -> bool {
        if !self.is_interface(iface) || self.is_invalid(ty) {
            return false;
        }
        self.interface_methods(iface).into_iter().all(|m| {
            let wanted = self.object(m);
            match self.lookup_field_or_method(ty, &wanted.name) {
                Some(sel) => {
                    let found = self.object(sel.obj);
                    matches!(found.kind, ObjectKind::Func { .. }) && self.identical_signatures(found.ty, wanted.ty)
                }
                None => false,
            }
        })
    }

    fn identical_signatures(&self, a: TypeId, b: TypeId) -> bool {
        match (self.as_signature(a), self.as_signature(b)) {
            (Some(x), Some(y)) => {
                x.variadic == y.variadic
                    && x.params.len() == y.params.len()
                    && x.results.len() == y.results.len()
                    && x.params
                        .iter()
                        .zip(&y.params)
                        .chain(x.results.iter().zip(&y.results))
                        .all(|(p, q)| self.identical(self.object(*p).ty, self.object(*q).ty))
            }
            _ => false,
        }
    }

    pub fn identical(&self, a: TypeId, b: TypeId) -> bool {
        self.identical_at(a, b, 0)
    }

    fn identical_at(&self, a: TypeId, b: TypeId, depth: usize) -> bool {
        if a == b {
            return true;
        }
        if depth > 32 {
            return false;
        }
        let same = |x: TypeId, y: TypeId| self.identical_at(x, y, depth + 1);
        match (self.ty(a), self.ty(b)) {
            (Type::Basic(x), Type::Basic(y)) => x.canonical() == y.canonical(),
            (Type::Named(x), Type::Named(y)) => {
                x.obj == y.obj
                    && x.type_args.len() == y.type_args.len()
                    && x.type_args.iter().zip(&y.type_args).all(|(p, q)| same(*p, *q))
            }
            (Type::Pointer(x), Type::Pointer(y)) | (Type::Slice(x), Type::Slice(y)) => same(*x, *y),
            (Type::Array { len: l1, elem: e1 }, Type::Array { len: l2, elem: e2 }) => {
                l1 == l2 && same(*e1, *e2)
            }
            (Type::Map { key: k1, value: v1 }, Type::Map { key: k2, value: v2 }) => {
                same(*k1, *k2) && same(*v1, *v2)
            }
            (Type::Chan { dir: d1, elem: e1 }, Type::Chan { dir: d2, elem: e2 }) => {
                d1 == d2 && same(*e1, *e2)
            }
            (Type::Struct { fields: f1 }, Type::Struct { fields: f2 }) => {
                f1.len() == f2.len()
                    && f1.iter().zip(f2).all(|(p, q)| {
                        let (p, q) = (self.object(*p), self.object(*q));
                        p.name == q.name && same(p.ty, q.ty)
                    })
            }
            (Type::Signature(_), Type::Signature(_)) => self.identical_signatures(a, b),
            (Type::Interface { .. }, Type::Interface { .. }) => {
                let (m1, m2) = (self.interface_methods(a), self.interface_methods(b));
                m1.len() == m2.len()
                    && m1.iter().all(|m| {
                        let wanted = self.object(*m);
                        m2.iter().any(|n| {
                            let other = self.object(*n);
                            other.name == wanted.name && self.identical_signatures(other.ty, wanted.ty)
                        })
                    })
            }
            (Type::TypeParam { obj: x, .. }, Type::TypeParam { obj: y, .. }) => x == y,
            (Type::Tuple(x), Type::Tuple(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(p, q)| same(*p, *q))
            }
            _ => false,
        }
    }

    /// Deprecation notice taken from the declaration's doc comment.
    pub fn is_deprecated(&self, obj: ObjectId) -> bool {
        self.object(obj)
            .doc
            .as_deref()
            .is_some_and(|doc| doc.starts_with("Deprecated"))
    }
}

#[cfg(test)]
mod tests;
