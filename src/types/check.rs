use super::{
    Arena, BasicKind, BuiltinFunc, Info, Mode, Named, Object, ObjectId, ObjectKind, PackageId, ScopeId,
    ScopeKind, Signature, Type, TypeAndValue, TypeId,
};
use crate::language::{
    ast::{
        AssignOp, BinaryOp, BlockStmt, CaseClause, Decl, DeclKind, Expr, ExprKind, FieldList, File,
        FuncDecl, FuncType, GenDecl, Ident, LitKind, Spec, Stmt, StmtKind, TypeSpec, UnaryOp, ValueSpec,
    },
    span::Pos,
};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeError {
    pub pos: Pos,
    pub message: String,
}

impl TypeError {
    pub fn new(pos: Pos, message: impl Into<String>) -> Self {
        Self {
            pos,
            message: message.into(),
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of [`check_package`]. Type errors never stop checking.
#[derive(Debug)]
pub struct Checked {
    pub pkg: PackageId,
    pub info: Info,
    pub errors: Vec<TypeError>,
}

/// Type-checks the files of one package into `arena`. Imports are resolved
/// against packages already in the arena; unknown paths get an incomplete
/// placeholder package.
pub fn check_package(arena: &mut Arena, path: &str, files: &[&File]) -> Checked {
    let name = files.first().map(|f| f.package_name()).unwrap_or("main");
    let pkg = match arena.package_by_path(path) {
        Some(existing) if !arena.package(existing).complete => {
            let entry = arena.package_mut(existing);
            entry.name = name.to_string();
            entry.complete = true;
            existing
        }
        _ => arena.new_package(path, name, true),
    };
    let pkg_scope = arena.package(pkg).scope;
    let mut checker = Checker {
        arena,
        pkg,
        pkg_scope,
        info: Info::default(),
        errors: Vec::new(),
        labels: None,
    };
    checker.check_files(files);
    tracing::debug!(
        package = path,
        files = files.len(),
        errors = checker.errors.len(),
        "type-checked package"
    );
    Checked {
        pkg,
        info: checker.info,
        errors: checker.errors,
    }
}

struct ValueDecl<'f> {
    scope: ScopeId,
    tok: DeclKind,
    spec: &'f ValueSpec,
    /// Spec whose type and values a bare const spec repeats.
    source: &'f ValueSpec,
    objs: Vec<Option<ObjectId>>,
}

struct Checker<'a> {
    arena: &'a mut Arena,
    pkg: PackageId,
    pkg_scope: ScopeId,
    info: Info,
    errors: Vec<TypeError>,
    labels: Option<ScopeId>,
}

fn var_kind() -> ObjectKind {
    ObjectKind::Var {
        is_field: false,
        embedded: false,
    }
}

fn func_kind() -> ObjectKind {
    ObjectKind::Func {
        overloads: Vec::new(),
    }
}

/// `name__c` with a single trailing digit or lowercase letter names one
/// member of the overload family `name`.
pub(crate) fn overload_base(name: &str) -> Option<&str> {
    let split = name.len().checked_sub(3)?;
    if split == 0 || !name.is_char_boundary(split) {
        return None;
    }
    let (base, tail) = name.split_at(split);
    let tail = tail.as_bytes();
    (tail[0] == b'_' && tail[1] == b'_' && (tail[2].is_ascii_digit() || tail[2].is_ascii_lowercase()))
        .then_some(base)
}

fn embedded_name(expr: &Expr) -> Option<&Ident> {
    match &expr.kind {
        ExprKind::Ident(ident) => Some(ident),
        ExprKind::Star(inner) | ExprKind::Paren(inner) => embedded_name(inner),
        ExprKind::Selector { sel, .. } => Some(sel),
        ExprKind::Index { x, .. } => embedded_name(x),
        _ => None,
    }
}

fn receiver_base(expr: &Expr) -> Option<(&Ident, Vec<&Ident>)> {
    match &expr.kind {
        ExprKind::Ident(ident) => Some((ident, Vec::new())),
        ExprKind::Star(inner) | ExprKind::Paren(inner) => receiver_base(inner),
        ExprKind::Index { x, indices } => {
            let (base, _) = receiver_base(x)?;
            Some((base, indices.iter().filter_map(Expr::as_ident).collect()))
        }
        _ => None,
    }
}

impl<'a> Checker<'a> {
    fn error(&mut self, pos: Pos, message: impl Into<String>) {
        self.errors.push(TypeError::new(pos, message));
    }

    fn new_object(&mut self, name: &str, kind: ObjectKind, pos: Pos, ty: TypeId, doc: Option<&String>) -> ObjectId {
        self.arena.new_object(Object {
            name: name.to_string(),
            kind,
            pos,
            pkg: Some(self.pkg),
            parent: None,
            ty,
            doc: doc.cloned(),
            owner: None,
            scope_pos: Pos::NONE,
        })
    }

    fn record_def(&mut self, ident: &Ident, obj: ObjectId) {
        self.info.defs.insert(ident.id, obj);
        self.info.idents.insert(ident.id, ident.pos);
    }

    fn record_use(&mut self, ident: &Ident, obj: ObjectId) {
        self.info.uses.insert(ident.id, obj);
        self.info.idents.insert(ident.id, ident.pos);
    }

    /// Declares `obj` under `ident` in `scope`; blank names are recorded but
    /// never inserted.
    fn declare(&mut self, scope: ScopeId, ident: &Ident, obj: ObjectId) {
        self.record_def(ident, obj);
        if ident.is_blank() {
            return;
        }
        if self.arena.insert(scope, obj).is_err() {
            self.error(ident.pos, format!("{} redeclared in this block", ident.name));
        }
    }

    fn invalid(&self) -> TypeAndValue {
        TypeAndValue {
            mode: Mode::Invalid,
            ty: self.arena.invalid(),
        }
    }

    fn value(ty: TypeId) -> TypeAndValue {
        TypeAndValue { mode: Mode::Value, ty }
    }

    fn default_type(&self, ty: TypeId) -> TypeId {
        match self.arena.ty(ty) {
            Type::Basic(kind) if kind.is_untyped() && *kind != BasicKind::UntypedNil => {
                self.arena.basic(kind.default_kind())
            }
            _ => ty,
        }
    }

    fn check_files<'f>(&mut self, files: &[&'f File]) {
        let mut file_scopes = Vec::new();
        for file in files {
            let scope = self
                .arena
                .new_scope(Some(self.pkg_scope), ScopeKind::File, file.pos, file.end);
            self.info.scopes.insert(file.id, scope);
            file_scopes.push((*file, scope));
        }

        let mut types = Vec::new();
        let mut values = Vec::new();
        let mut funcs = Vec::new();
        let mut methods = Vec::new();
        for (file, scope) in &file_scopes {
            for decl in &file.decls {
                match decl {
                    Decl::Gen(gen) => match gen.tok {
                        DeclKind::Import => self.imports(gen, *scope),
                        DeclKind::Type => {
                            for spec in &gen.specs {
                                if let Spec::Type(spec) = spec {
                                    let obj = self.type_name(spec, gen, self.pkg_scope);
                                    types.push((*scope, spec, obj));
                                }
                            }
                        }
                        DeclKind::Const | DeclKind::Var => {
                            let mut last: Option<&ValueSpec> = None;
                            for spec in &gen.specs {
                                let Spec::Value(spec) = spec else { continue };
                                let source = match last {
                                    Some(prev) if gen.tok == DeclKind::Const && spec.values.is_empty() && spec.ty.is_none() => prev,
                                    _ => spec,
                                };
                                last = Some(source);
                                let kind = if gen.tok == DeclKind::Const { ObjectKind::Const } else { var_kind() };
                                let doc = spec.doc.as_ref().or(gen.doc.as_ref());
                                let mut objs = Vec::new();
                                for name in &spec.names {
                                    let invalid = self.arena.invalid();
                                    let obj = self.new_object(&name.name, kind.clone(), name.pos, invalid, doc);
                                    self.declare(self.pkg_scope, name, obj);
                                    objs.push(Some(obj));
                                }
                                values.push(ValueDecl {
                                    scope: *scope,
                                    tok: gen.tok,
                                    spec,
                                    source,
                                    objs,
                                });
                            }
                        }
                    },
                    Decl::Func(func) if func.recv.is_some() => methods.push((*scope, func)),
                    Decl::Func(func) => {
                        let invalid = self.arena.invalid();
                        let obj = self.new_object(&func.name.name, func_kind(), func.name.pos, invalid, func.doc.as_ref());
                        if func.name.name == "init" {
                            self.record_def(&func.name, obj);
                            self.arena.object_mut(obj).parent = Some(self.pkg_scope);
                        } else {
                            self.declare(self.pkg_scope, &func.name, obj);
                        }
                        funcs.push((*scope, func, obj));
                    }
                    Decl::Bad(_) => {}
                }
            }
        }

        let mut named_types = Vec::new();
        for (scope, spec, obj) in types {
            self.type_decl(scope, spec, obj);
            let ty = self.arena.object(obj).ty;
            if self.arena.as_named(ty).is_some() {
                named_types.push(ty);
            }
        }

        let mut bodies = Vec::new();
        for (scope, func) in methods {
            let fscope = self.method_decl(scope, func);
            bodies.push((fscope, func));
        }
        for (scope, func, obj) in funcs {
            let fscope = self
                .arena
                .new_scope(Some(scope), ScopeKind::Func, func.pos, func.end);
            self.info.scopes.insert(func.ty.id, fscope);
            let sig = self.signature(&func.ty, fscope, None);
            self.arena.object_mut(obj).ty = sig;
            bodies.push((fscope, func));
        }
        self.synthesize_overloads(named_types);

        for decl in values {
            self.package_values(decl);
        }
        for (fscope, func) in bodies {
            if let Some(body) = &func.body {
                self.func_body(fscope, body);
            }
        }
    }

    fn imports(&mut self, gen: &GenDecl, scope: ScopeId) {
        for spec in &gen.specs {
            let Spec::Import(spec) = spec else { continue };
            let path = spec.path_value();
            let imported = match self.arena.package_by_path(&path) {
                Some(pkg) => pkg,
                None => {
                    let name = path.rsplit('/').next().unwrap_or(path.as_str()).to_string();
                    self.arena.new_package(&path, &name, false)
                }
            };
            if !self.arena.package(self.pkg).imports.contains(&imported) {
                self.arena.package_mut(self.pkg).imports.push(imported);
            }
            let pkg_name = self.arena.package(imported).name.clone();
            let kind = ObjectKind::PkgName { imported };
            let invalid = self.arena.invalid();
            match &spec.name {
                Some(name) if name.name == "." => {
                    let obj = self.new_object(&pkg_name, kind, name.pos, invalid, None);
                    self.info.implicits.insert(spec.id, obj);
                    let members = self.arena.scope(self.arena.package(imported).scope).objects().to_vec();
                    for member in members {
                        if self.arena.object(member).is_exported() {
                            let _ = self.arena.insert_alias(scope, member);
                        }
                    }
                }
                Some(name) => {
                    let obj = self.new_object(&name.name, kind, name.pos, invalid, None);
                    self.declare(scope, name, obj);
                }
                None => {
                    let obj = self.new_object(&pkg_name, kind, spec.path.pos, invalid, None);
                    self.info.implicits.insert(spec.id, obj);
                    if self.arena.insert(scope, obj).is_err() {
                        self.error(spec.path.pos, format!("{pkg_name} redeclared in this block"));
                    }
                }
            }
        }
    }

    /// Declares the name of a type spec; the right-hand side is resolved
    /// later by [`Checker::type_decl`].
    fn type_name(&mut self, spec: &TypeSpec, gen: &GenDecl, scope: ScopeId) -> ObjectId {
        let invalid = self.arena.invalid();
        let doc = spec.doc.as_ref().or(gen.doc.as_ref());
        let obj = self.new_object(&spec.name.name, ObjectKind::TypeName, spec.name.pos, invalid, doc);
        self.arena.object_mut(obj).scope_pos = spec.name.pos;
        if !spec.assign.is_valid() {
            let named = self.arena.new_type(Type::Named(Named {
                obj,
                underlying: invalid,
                methods: Vec::new(),
                type_params: Vec::new(),
                type_args: Vec::new(),
                origin: None,
            }));
            self.arena.object_mut(obj).ty = named;
        }
        self.declare(scope, &spec.name, obj);
        obj
    }

    fn type_decl(&mut self, scope: ScopeId, spec: &TypeSpec, obj: ObjectId) {
        let named = self.arena.object(obj).ty;
        let inner = match &spec.type_params {
            Some(list) => {
                let tscope = self
                    .arena
                    .new_scope(Some(scope), ScopeKind::Block, spec.name.pos, spec.end);
                self.info.scopes.insert(spec.id, tscope);
                let params = self.declare_type_params(list, tscope);
                if let Type::Named(n) = self.arena.type_mut(named) {
                    n.type_params = params;
                }
                tscope
            }
            None => scope,
        };
        let rhs = self.resolve_type(&spec.ty, inner);
        if spec.assign.is_valid() {
            self.arena.object_mut(obj).ty = rhs;
            return;
        }
        let rhs = if rhs == named {
            self.error(spec.name.pos, format!("invalid recursive type {}", spec.name.name));
            self.arena.invalid()
        } else {
            rhs
        };
        if let Type::Named(n) = self.arena.type_mut(named) {
            n.underlying = rhs;
        }
    }

    fn declare_type_params(&mut self, list: &FieldList, scope: ScopeId) -> Vec<TypeId> {
        let mut params = Vec::new();
        let invalid = self.arena.invalid();
        for field in &list.list {
            for name in &field.names {
                let obj = self.new_object(&name.name, ObjectKind::TypeName, name.pos, invalid, None);
                let ty = self.arena.new_type(Type::TypeParam {
                    obj,
                    index: params.len(),
                    constraint: invalid,
                });
                self.arena.object_mut(obj).ty = ty;
                self.declare(scope, name, obj);
                params.push(ty);
            }
        }
        let mut idx = 0;
        for field in &list.list {
            let constraint = self.resolve_type(&field.ty, scope);
            for _ in &field.names {
                if let Type::TypeParam { constraint: slot, .. } = self.arena.type_mut(params[idx]) {
                    *slot = constraint;
                }
                idx += 1;
            }
        }
        params
    }

    fn method_decl(&mut self, scope: ScopeId, func: &FuncDecl) -> ScopeId {
        let fscope = self
            .arena
            .new_scope(Some(scope), ScopeKind::Func, func.pos, func.end);
        self.info.scopes.insert(func.ty.id, fscope);
        let invalid = self.arena.invalid();
        let recv_field = func.recv.as_ref().and_then(|recv| recv.list.first());

        let mut named = None;
        let mut recv = None;
        if let Some(field) = recv_field {
            if let Some((base, args)) = receiver_base(&field.ty) {
                match self.arena.lookup(self.pkg_scope, &base.name) {
                    Some(obj) if self.arena.object(obj).kind == ObjectKind::TypeName => {
                        self.record_use(base, obj);
                        let ty = self.arena.object(obj).ty;
                        if self.arena.as_named(ty).is_some() {
                            named = Some(ty);
                        }
                        let type_params = self
                            .arena
                            .as_named(ty)
                            .map(|n| n.type_params.clone())
                            .unwrap_or_default();
                        for (arg, param) in args.iter().zip(type_params) {
                            let tp = self.new_object(&arg.name, ObjectKind::TypeName, arg.pos, param, None);
                            self.declare(fscope, arg, tp);
                        }
                    }
                    _ => self.error(base.pos, format!("undefined: {}", base.name)),
                }
            }
            let base_ty = named.unwrap_or(invalid);
            let recv_ty = if matches!(field.ty.unparen().kind, ExprKind::Star(_)) {
                self.arena.pointer_to(base_ty)
            } else {
                base_ty
            };
            self.info.types.insert(
                field.ty.id,
                TypeAndValue {
                    mode: Mode::TypeExpr,
                    ty: recv_ty,
                },
            );
            let name = field.names.first();
            let obj = self.new_object(
                name.map(|n| n.name.as_str()).unwrap_or(""),
                var_kind(),
                name.map(|n| n.pos).unwrap_or(field.pos),
                recv_ty,
                None,
            );
            if let Some(name) = name {
                self.declare(fscope, name, obj);
            }
            recv = Some(obj);
        }

        let sig = self.signature(&func.ty, fscope, recv);
        let obj = self.new_object(&func.name.name, func_kind(), func.name.pos, sig, func.doc.as_ref());
        self.arena.object_mut(obj).owner = named;
        self.record_def(&func.name, obj);
        if let Some(named) = named {
            if func.name.is_blank() {
                return fscope;
            }
            let exists = self
                .arena
                .named_methods(named)
                .iter()
                .any(|m| self.arena.object(*m).name == func.name.name);
            let field_clash = self
                .arena
                .struct_fields(named)
                .is_some_and(|fields| fields.iter().any(|f| self.arena.object(*f).name == func.name.name));
            if exists || field_clash {
                let type_name = self.arena.object(self.arena.as_named(named).map(|n| n.obj).unwrap_or(obj)).name.clone();
                self.error(
                    func.name.pos,
                    format!("field and method with the same name {} on {type_name}", func.name.name),
                );
            } else if let Type::Named(n) = self.arena.type_mut(named) {
                n.methods.push(obj);
            }
        }
        fscope
    }

    /// Builds the signature of `ft`, declaring its type parameters,
    /// parameters and named results in `scope`.
    fn signature(&mut self, ft: &FuncType, scope: ScopeId, recv: Option<ObjectId>) -> TypeId {
        let type_params = match &ft.type_params {
            Some(list) => self.declare_type_params(list, scope),
            None => Vec::new(),
        };
        let (params, variadic) = self.params(&ft.params, scope);
        let results = match &ft.results {
            Some(list) => self.params(list, scope).0,
            None => Vec::new(),
        };
        self.arena.new_type(Type::Signature(Signature {
            recv,
            type_params,
            params,
            results,
            variadic,
        }))
    }

    fn params(&mut self, list: &FieldList, scope: ScopeId) -> (Vec<ObjectId>, bool) {
        let mut out = Vec::new();
        let mut variadic = false;
        let count = list.list.len();
        for (idx, field) in list.list.iter().enumerate() {
            if matches!(field.ty.kind, ExprKind::Ellipsis(_)) {
                if idx + 1 == count && field.names.len() <= 1 {
                    variadic = true;
                } else {
                    self.error(field.ty.pos, "can only use ... with final parameter in list");
                }
            }
            let ty = self.resolve_type(&field.ty, scope);
            if field.names.is_empty() {
                let obj = self.new_object("", var_kind(), field.ty.pos, ty, None);
                out.push(obj);
                continue;
            }
            for name in &field.names {
                let obj = self.new_object(&name.name, var_kind(), name.pos, ty, None);
                self.declare(scope, name, obj);
                out.push(obj);
            }
        }
        (out, variadic)
    }

    /// Groups `F__0`, `F__1`, ... into a family object `F` when `F` itself
    /// is not declared.
    fn synthesize_overloads(&mut self, named_types: Vec<TypeId>) {
        let members = self.arena.scope(self.pkg_scope).objects().to_vec();
        for (base, family) in self.overload_groups(&members) {
            if self.arena.lookup(self.pkg_scope, &base).is_some() {
                continue;
            }
            let obj = self.family(&base, family);
            let _ = self.arena.insert(self.pkg_scope, obj);
        }
        for named in named_types {
            let methods = self.arena.named_methods(named).to_vec();
            for (base, family) in self.overload_groups(&methods) {
                if methods.iter().any(|m| self.arena.object(*m).name == base) {
                    continue;
                }
                let obj = self.family(&base, family);
                self.arena.object_mut(obj).owner = Some(named);
                if let Type::Named(n) = self.arena.type_mut(named) {
                    n.methods.push(obj);
                }
            }
        }
    }

    fn overload_groups(&self, objects: &[ObjectId]) -> Vec<(String, Vec<ObjectId>)> {
        let mut groups: Vec<(String, Vec<ObjectId>)> = Vec::new();
        for obj in objects {
            let object = self.arena.object(*obj);
            if !matches!(object.kind, ObjectKind::Func { .. }) {
                continue;
            }
            let Some(base) = overload_base(&object.name) else { continue };
            match groups.iter_mut().find(|(name, _)| name == base) {
                Some((_, members)) => members.push(*obj),
                None => groups.push((base.to_string(), vec![*obj])),
            }
        }
        for (_, members) in &mut groups {
            members.sort_by(|a, b| self.arena.object(*a).name.cmp(&self.arena.object(*b).name));
        }
        groups
    }

    fn family(&mut self, base: &str, members: Vec<ObjectId>) -> ObjectId {
        let first = self.arena.object(members[0]).clone();
        self.new_object(
            base,
            ObjectKind::Func { overloads: members },
            first.pos,
            first.ty,
            first.doc.as_ref(),
        )
    }

    /// Types of the values assigned to `count` names.
    fn assigned_types(&mut self, values: &[Expr], count: usize, scope: ScopeId, hint: Option<TypeId>) -> Vec<TypeId> {
        if values.len() == 1 && count > 1 {
            let tv = self.expr_hint(&values[0], scope, hint);
            return match self.arena.ty(tv.ty) {
                Type::Tuple(types) => types.clone(),
                _ if count == 2 && Self::comma_ok(&values[0]) => {
                    vec![tv.ty, self.arena.basic(BasicKind::UntypedBool)]
                }
                _ => vec![tv.ty],
            };
        }
        values
            .iter()
            .map(|value| self.expr_hint(value, scope, hint).ty)
            .collect()
    }

    fn comma_ok(expr: &Expr) -> bool {
        matches!(
            expr.unparen().kind,
            ExprKind::TypeAssert { .. } | ExprKind::Index { .. } | ExprKind::Unary { op: UnaryOp::Recv, .. }
        )
    }

    fn package_values(&mut self, decl: ValueDecl<'_>) {
        let declared = decl.source.ty.as_ref().map(|ty| self.resolve_type(ty, decl.scope));
        let types = self.assigned_types(&decl.source.values, decl.objs.len(), decl.scope, declared);
        if decl.tok == DeclKind::Var && !decl.spec.values.is_empty() && types.len() != decl.objs.len() {
            self.error(
                decl.spec.pos,
                format!("assignment mismatch: {} variables but {} values", decl.objs.len(), types.len()),
            );
        }
        for (idx, obj) in decl.objs.iter().enumerate() {
            let Some(obj) = obj else { continue };
            let ty = self.value_type(decl.tok, declared, types.get(idx).copied());
            self.arena.object_mut(*obj).ty = ty;
        }
    }

    fn value_type(&self, tok: DeclKind, declared: Option<TypeId>, value: Option<TypeId>) -> TypeId {
        match (declared, value) {
            (Some(ty), _) => ty,
            (None, Some(ty)) if tok == DeclKind::Const => ty,
            (None, Some(ty)) => self.default_type(ty),
            (None, None) => self.arena.invalid(),
        }
    }

    fn local_decl(&mut self, gen: &GenDecl, scope: ScopeId) {
        match gen.tok {
            DeclKind::Import => self.error(gen.pos, "imports must appear before other declarations"),
            DeclKind::Type => {
                for spec in &gen.specs {
                    if let Spec::Type(spec) = spec {
                        let obj = self.type_name(spec, gen, scope);
                        self.type_decl(scope, spec, obj);
                    }
                }
            }
            DeclKind::Const | DeclKind::Var => {
                let mut last: Option<&ValueSpec> = None;
                for spec in &gen.specs {
                    let Spec::Value(spec) = spec else { continue };
                    let source = match last {
                        Some(prev) if gen.tok == DeclKind::Const && spec.values.is_empty() && spec.ty.is_none() => prev,
                        _ => spec,
                    };
                    last = Some(source);
                    let declared = source.ty.as_ref().map(|ty| self.resolve_type(ty, scope));
                    let types = self.assigned_types(&source.values, spec.names.len(), scope, declared);
                    let kind = if gen.tok == DeclKind::Const { ObjectKind::Const } else { var_kind() };
                    for (idx, name) in spec.names.iter().enumerate() {
                        let ty = self.value_type(gen.tok, declared, types.get(idx).copied());
                        let obj = self.new_object(&name.name, kind.clone(), name.pos, ty, spec.doc.as_ref());
                        self.arena.object_mut(obj).scope_pos = spec.end;
                        self.declare(scope, name, obj);
                    }
                }
            }
        }
    }

    fn func_body(&mut self, fscope: ScopeId, body: &BlockStmt) {
        let saved = self.labels.take();
        let labels = self
            .arena
            .new_scope(None, ScopeKind::Labels, body.lbrace, body.end);
        self.info.labels.insert(fscope, labels);
        self.labels = Some(labels);
        self.collect_labels(&body.stmts, labels);
        self.stmts(&body.stmts, fscope);
        self.labels = saved;
    }

    fn collect_labels(&mut self, stmts: &[Stmt], labels: ScopeId) {
        for stmt in stmts {
            self.collect_labels_in(stmt, labels);
        }
    }

    fn collect_labels_in(&mut self, stmt: &Stmt, labels: ScopeId) {
        match &stmt.kind {
            StmtKind::Labeled { label, stmt } => {
                if !label.is_blank() {
                    let invalid = self.arena.invalid();
                    let obj = self.new_object(&label.name, ObjectKind::Label, label.pos, invalid, None);
                    self.record_def(label, obj);
                    if self.arena.insert(labels, obj).is_err() {
                        self.error(label.pos, format!("label {} already declared", label.name));
                    }
                }
                self.collect_labels_in(stmt, labels);
            }
            StmtKind::Block(block) => self.collect_labels(&block.stmts, labels),
            StmtKind::If { body, els, .. } => {
                self.collect_labels(&body.stmts, labels);
                if let Some(els) = els {
                    self.collect_labels_in(els, labels);
                }
            }
            StmtKind::For { body, .. } | StmtKind::Range { body, .. } => self.collect_labels(&body.stmts, labels),
            StmtKind::Switch { body, .. } => {
                for clause in body {
                    self.collect_labels(&clause.body, labels);
                }
            }
            _ => {}
        }
    }

    fn stmts(&mut self, stmts: &[Stmt], scope: ScopeId) {
        for stmt in stmts {
            self.stmt(stmt, scope);
        }
    }

    fn block(&mut self, block: &BlockStmt, parent: ScopeId) {
        let scope = self
            .arena
            .new_scope(Some(parent), ScopeKind::Block, block.lbrace, block.end);
        self.info.scopes.insert(block.id, scope);
        self.stmts(&block.stmts, scope);
    }

    fn implicit_scope(&mut self, stmt: &Stmt, parent: ScopeId) -> ScopeId {
        let scope = self
            .arena
            .new_scope(Some(parent), ScopeKind::Block, stmt.pos, stmt.end);
        self.info.scopes.insert(stmt.id, scope);
        scope
    }

    fn stmt(&mut self, stmt: &Stmt, scope: ScopeId) {
        match &stmt.kind {
            StmtKind::Bad | StmtKind::Empty { .. } => {}
            StmtKind::Decl(gen) => self.local_decl(gen, scope),
            StmtKind::Labeled { stmt, .. } => self.stmt(stmt, scope),
            StmtKind::Expr(expr) | StmtKind::Go(expr) | StmtKind::Defer(expr) => {
                self.expr(expr, scope);
            }
            StmtKind::Send { chan, value } => {
                let chan_ty = self.expr(chan, scope).ty;
                let elem = match self.arena.ty(self.arena.underlying(chan_ty)) {
                    Type::Chan { elem, .. } => Some(*elem),
                    _ => None,
                };
                self.expr_hint(value, scope, elem);
            }
            StmtKind::IncDec { x, .. } => {
                self.expr(x, scope);
            }
            StmtKind::Assign { lhs, op, rhs } => self.assign(stmt, lhs, *op, rhs, scope),
            StmtKind::Return(results) => {
                for result in results {
                    self.expr(result, scope);
                }
            }
            StmtKind::Branch { label, .. } => {
                if let Some(label) = label {
                    let found = self.labels.and_then(|labels| self.arena.lookup(labels, &label.name));
                    match found {
                        Some(obj) => self.record_use(label, obj),
                        None => self.error(label.pos, format!("label {} not declared", label.name)),
                    }
                }
            }
            StmtKind::Block(block) => self.block(block, scope),
            StmtKind::If { init, cond, body, els } => {
                let inner = self.implicit_scope(stmt, scope);
                if let Some(init) = init {
                    self.stmt(init, inner);
                }
                self.expr(cond, inner);
                self.block(body, inner);
                if let Some(els) = els {
                    self.stmt(els, inner);
                }
            }
            StmtKind::Switch { init, tag, body } => {
                let inner = self.implicit_scope(stmt, scope);
                if let Some(init) = init {
                    self.stmt(init, inner);
                }
                if let Some(tag) = tag {
                    self.expr(tag, inner);
                }
                for clause in body {
                    self.case_clause(clause, inner);
                }
            }
            StmtKind::For { init, cond, post, body } => {
                let inner = self.implicit_scope(stmt, scope);
                if let Some(init) = init {
                    self.stmt(init, inner);
                }
                if let Some(cond) = cond {
                    self.expr(cond, inner);
                }
                if let Some(post) = post {
                    self.stmt(post, inner);
                }
                self.block(body, inner);
            }
            StmtKind::Range { key, value, define, x, body } => {
                let inner = self.implicit_scope(stmt, scope);
                let range_ty = self.expr(x, inner).ty;
                let (key_ty, value_ty) = self.range_types(range_ty);
                for (expr, ty) in [(key, key_ty), (value, value_ty)] {
                    let Some(expr) = expr else { continue };
                    match expr.as_ident() {
                        Some(ident) if *define => {
                            let obj = self.new_object(&ident.name, var_kind(), ident.pos, ty, None);
                            self.arena.object_mut(obj).scope_pos = body.lbrace;
                            self.declare(inner, ident, obj);
                            self.info.types.insert(
                                expr.id,
                                TypeAndValue {
                                    mode: Mode::Variable,
                                    ty,
                                },
                            );
                        }
                        _ => {
                            self.expr(expr, inner);
                        }
                    }
                }
                self.block(body, inner);
            }
        }
    }

    fn case_clause(&mut self, clause: &CaseClause, parent: ScopeId) {
        for expr in &clause.list {
            self.expr(expr, parent);
        }
        let scope = self
            .arena
            .new_scope(Some(parent), ScopeKind::Block, clause.pos, clause.end);
        self.info.scopes.insert(clause.id, scope);
        self.stmts(&clause.body, scope);
    }

    fn assign(&mut self, stmt: &Stmt, lhs: &[Expr], op: AssignOp, rhs: &[Expr], scope: ScopeId) {
        if op != AssignOp::Define {
            let mut hint = None;
            for target in lhs {
                hint = Some(self.expr(target, scope).ty);
            }
            let hint = if lhs.len() == 1 { hint } else { None };
            self.assigned_types(rhs, lhs.len(), scope, hint);
            return;
        }
        let types = self.assigned_types(rhs, lhs.len(), scope, None);
        let mut fresh = 0;
        let mut named = 0;
        for (idx, target) in lhs.iter().enumerate() {
            let Some(ident) = target.as_ident() else {
                self.expr(target, scope);
                self.error(target.pos, "non-name on left side of :=");
                continue;
            };
            if ident.is_blank() {
                continue;
            }
            named += 1;
            if let Some(existing) = self.arena.lookup(scope, &ident.name) {
                self.record_use(ident, existing);
                let ty = self.arena.object(existing).ty;
                self.info.types.insert(
                    target.id,
                    TypeAndValue {
                        mode: Mode::Variable,
                        ty,
                    },
                );
                continue;
            }
            let ty = types
                .get(idx)
                .map(|ty| self.default_type(*ty))
                .unwrap_or_else(|| self.arena.invalid());
            let obj = self.new_object(&ident.name, var_kind(), ident.pos, ty, None);
            self.arena.object_mut(obj).scope_pos = stmt.end;
            self.declare(scope, ident, obj);
            self.info.types.insert(
                target.id,
                TypeAndValue {
                    mode: Mode::Variable,
                    ty,
                },
            );
            fresh += 1;
        }
        if fresh == 0 && named > 0 {
            self.error(stmt.pos, "no new variables on left side of :=");
        }
    }

    fn range_types(&mut self, ty: TypeId) -> (TypeId, TypeId) {
        let int = self.arena.basic(BasicKind::Int);
        let invalid = self.arena.invalid();
        let under = self.arena.underlying(ty);
        match self.arena.ty(under).clone() {
            Type::Basic(kind) if kind.canonical() == BasicKind::String || kind == BasicKind::UntypedString => {
                (int, self.arena.basic(BasicKind::Rune))
            }
            Type::Basic(kind) if kind != BasicKind::Invalid => (self.default_type(ty), invalid),
            Type::Array { elem, .. } | Type::Slice(elem) => (int, elem),
            Type::Pointer(elem) => match self.arena.ty(self.arena.underlying(elem)) {
                Type::Array { elem, .. } => (int, *elem),
                _ => (invalid, invalid),
            },
            Type::Map { key, value } => (key, value),
            Type::Chan { elem, .. } => (elem, invalid),
            _ => (invalid, invalid),
        }
    }

    fn resolve_type(&mut self, expr: &Expr, scope: ScopeId) -> TypeId {
        let ty = self.type_expr(expr, scope);
        self.info.types.insert(
            expr.id,
            TypeAndValue {
                mode: Mode::TypeExpr,
                ty,
            },
        );
        ty
    }

    /// Package named by `expr` when it is a bare import name.
    fn package_qualifier(&mut self, expr: &Expr, scope: ScopeId) -> Option<PackageId> {
        let ident = expr.as_ident()?;
        let (_, obj) = self.arena.lookup_parent(scope, &ident.name, ident.pos)?;
        let ObjectKind::PkgName { imported } = self.arena.object(obj).kind else {
            return None;
        };
        self.record_use(ident, obj);
        Some(imported)
    }

    fn qualified_member(&mut self, imported: PackageId, sel: &Ident) -> Option<ObjectId> {
        let scope = self.arena.package(imported).scope;
        match self.arena.lookup(scope, &sel.name) {
            Some(member) if sel.is_exported() || imported == self.pkg => {
                self.record_use(sel, member);
                Some(member)
            }
            _ => {
                if self.arena.package(imported).complete && !sel.is_blank() {
                    let name = self.arena.package(imported).name.clone();
                    self.error(sel.pos, format!("undefined: {name}.{}", sel.name));
                }
                None
            }
        }
    }

    fn type_expr(&mut self, expr: &Expr, scope: ScopeId) -> TypeId {
        let invalid = self.arena.invalid();
        match &expr.kind {
            ExprKind::Bad => invalid,
            ExprKind::Ident(ident) => match self.arena.lookup_parent(scope, &ident.name, ident.pos) {
                Some((_, obj)) => {
                    self.record_use(ident, obj);
                    if self.arena.object(obj).kind == ObjectKind::TypeName {
                        self.arena.object(obj).ty
                    } else {
                        self.error(ident.pos, format!("{} is not a type", ident.name));
                        invalid
                    }
                }
                None => {
                    if !ident.is_blank() {
                        self.error(ident.pos, format!("undefined: {}", ident.name));
                    }
                    invalid
                }
            },
            ExprKind::Selector { x, sel } => match self.package_qualifier(x, scope) {
                Some(imported) => match self.qualified_member(imported, sel) {
                    Some(member) if self.arena.object(member).kind == ObjectKind::TypeName => self.arena.object(member).ty,
                    Some(_) => {
                        self.error(sel.pos, format!("{} is not a type", sel.name));
                        invalid
                    }
                    None => invalid,
                },
                None => {
                    self.expr(x, scope);
                    self.error(expr.pos, "selector is not a type");
                    invalid
                }
            },
            ExprKind::Paren(inner) => self.resolve_type(inner, scope),
            ExprKind::Star(inner) => {
                let elem = self.resolve_type(inner, scope);
                self.arena.pointer_to(elem)
            }
            ExprKind::ArrayType { len, elt } => {
                let elem = self.resolve_type(elt, scope);
                match len.as_deref() {
                    None => self.arena.new_type(Type::Slice(elem)),
                    Some(Expr {
                        kind: ExprKind::BasicLit(lit),
                        ..
                    }) if lit.kind == LitKind::Int => {
                        let len = lit.value.replace('_', "").parse::<u64>().ok();
                        self.arena.new_type(Type::Array { len, elem })
                    }
                    Some(Expr {
                        kind: ExprKind::Ellipsis(None),
                        ..
                    }) => self.arena.new_type(Type::Array { len: None, elem }),
                    Some(len) => {
                        self.expr(len, scope);
                        self.arena.new_type(Type::Array { len: None, elem })
                    }
                }
            }
            ExprKind::MapType { key, value } => {
                let key = self.resolve_type(key, scope);
                let value = self.resolve_type(value, scope);
                self.arena.new_type(Type::Map { key, value })
            }
            ExprKind::ChanType { dir, value } => {
                let elem = self.resolve_type(value, scope);
                self.arena.new_type(Type::Chan { dir: *dir, elem })
            }
            ExprKind::FuncType(ft) => {
                let fscope = self.arena.new_scope(Some(scope), ScopeKind::Func, ft.pos, ft.end);
                self.info.scopes.insert(ft.id, fscope);
                self.signature(ft, fscope, None)
            }
            ExprKind::StructType(list) => self.struct_type(list, scope),
            ExprKind::InterfaceType(list) => self.interface_type(list, scope),
            ExprKind::Index { x, indices } => {
                let base = self.resolve_type(x, scope);
                self.instantiate(expr.pos, base, indices, scope)
            }
            ExprKind::Ellipsis(Some(elt)) => {
                let elem = self.resolve_type(elt, scope);
                self.arena.new_type(Type::Slice(elem))
            }
            _ => {
                let tv = self.expr(expr, scope);
                if tv.is_type() {
                    tv.ty
                } else {
                    if tv.mode != Mode::Invalid {
                        self.error(expr.pos, "expression is not a type");
                    }
                    invalid
                }
            }
        }
    }

    fn instantiate(&mut self, pos: Pos, base: TypeId, indices: &[Expr], scope: ScopeId) -> TypeId {
        let type_args: Vec<TypeId> = indices.iter().map(|index| self.resolve_type(index, scope)).collect();
        let Some(named) = self.arena.as_named(base).cloned() else {
            if !self.arena.is_invalid(base) {
                self.error(pos, "not a generic type");
            }
            return base;
        };
        if named.type_params.is_empty() {
            self.error(pos, format!("{} is not a generic type", self.arena.object(named.obj).name));
            return base;
        }
        self.arena.new_type(Type::Named(Named {
            obj: named.obj,
            underlying: named.underlying,
            methods: Vec::new(),
            type_params: named.type_params,
            type_args,
            origin: Some(named.origin.unwrap_or(base)),
        }))
    }

    fn struct_type(&mut self, list: &FieldList, scope: ScopeId) -> TypeId {
        let id = self.arena.new_type(Type::Struct { fields: Vec::new() });
        let mut fields = Vec::new();
        for field in &list.list {
            let ty = self.resolve_type(&field.ty, scope);
            let kind = |embedded| ObjectKind::Var {
                is_field: true,
                embedded,
            };
            if field.names.is_empty() {
                let Some(name) = embedded_name(&field.ty) else { continue };
                let obj = self.new_object(&name.name, kind(true), name.pos, ty, field.doc.as_ref());
                self.arena.object_mut(obj).owner = Some(id);
                fields.push(obj);
                continue;
            }
            for name in &field.names {
                let obj = self.new_object(&name.name, kind(false), name.pos, ty, field.doc.as_ref());
                self.arena.object_mut(obj).owner = Some(id);
                self.record_def(name, obj);
                fields.push(obj);
            }
        }
        let names: Vec<&str> = fields
            .iter()
            .map(|f| self.arena.object(*f).name.as_str())
            .filter(|name| *name != "_")
            .collect();
        for (idx, name) in names.iter().enumerate() {
            if names[..idx].contains(name) {
                let pos = fields
                    .iter()
                    .map(|f| self.arena.object(*f))
                    .filter(|f| f.name == *name)
                    .nth(1)
                    .map(|f| f.pos)
                    .unwrap_or(Pos::NONE);
                let message = format!("{name} redeclared");
                self.errors.push(TypeError::new(pos, message));
            }
        }
        self.arena.set_type(id, Type::Struct { fields });
        id
    }

    fn interface_type(&mut self, list: &FieldList, scope: ScopeId) -> TypeId {
        let id = self.arena.new_type(Type::Interface {
            methods: Vec::new(),
            embeddeds: Vec::new(),
        });
        let mut methods = Vec::new();
        let mut embeddeds = Vec::new();
        for field in &list.list {
            match (field.names.first(), &field.ty.kind) {
                (Some(name), ExprKind::FuncType(ft)) => {
                    let fscope = self.arena.new_scope(Some(scope), ScopeKind::Func, ft.pos, ft.end);
                    self.info.scopes.insert(ft.id, fscope);
                    let sig = self.signature(ft, fscope, None);
                    let obj = self.new_object(&name.name, func_kind(), name.pos, sig, field.doc.as_ref());
                    self.arena.object_mut(obj).owner = Some(id);
                    self.record_def(name, obj);
                    methods.push(obj);
                }
                _ => embeddeds.push(self.resolve_type(&field.ty, scope)),
            }
        }
        self.arena.set_type(id, Type::Interface { methods, embeddeds });
        id
    }

    fn expr(&mut self, expr: &Expr, scope: ScopeId) -> TypeAndValue {
        self.expr_hint(expr, scope, None)
    }

    /// Checks `expr`; `hint` is the type expected by the context, used for
    /// composite literals with elided types.
    fn expr_hint(&mut self, expr: &Expr, scope: ScopeId, hint: Option<TypeId>) -> TypeAndValue {
        let tv = self.expr_kind(expr, scope, hint);
        self.info.types.insert(expr.id, tv);
        tv
    }

    fn object_value(&self, obj: ObjectId) -> TypeAndValue {
        let object = self.arena.object(obj);
        let mode = match object.kind {
            ObjectKind::TypeName => Mode::TypeExpr,
            ObjectKind::Const => Mode::Constant,
            ObjectKind::Var { .. } => Mode::Variable,
            ObjectKind::Func { .. } => Mode::Value,
            ObjectKind::Builtin(_) => Mode::Builtin,
            ObjectKind::Nil => Mode::Nil,
            ObjectKind::PkgName { .. } | ObjectKind::Label => Mode::Invalid,
        };
        TypeAndValue { mode, ty: object.ty }
    }

    fn expr_kind(&mut self, expr: &Expr, scope: ScopeId, hint: Option<TypeId>) -> TypeAndValue {
        match &expr.kind {
            ExprKind::Bad => self.invalid(),
            ExprKind::Ident(ident) => match self.arena.lookup_parent(scope, &ident.name, ident.pos) {
                Some((_, obj)) => {
                    self.record_use(ident, obj);
                    if matches!(self.arena.object(obj).kind, ObjectKind::PkgName { .. }) {
                        self.error(ident.pos, format!("use of package {} without selector", ident.name));
                    }
                    self.object_value(obj)
                }
                None => {
                    if !ident.is_blank() {
                        self.error(ident.pos, format!("undefined: {}", ident.name));
                    }
                    TypeAndValue {
                        mode: if ident.is_blank() { Mode::Variable } else { Mode::Invalid },
                        ty: self.arena.invalid(),
                    }
                }
            },
            ExprKind::BasicLit(lit) => {
                let kind = match lit.kind {
                    LitKind::Int => BasicKind::UntypedInt,
                    LitKind::Float => BasicKind::UntypedFloat,
                    LitKind::Char => BasicKind::UntypedRune,
                    LitKind::String => BasicKind::UntypedString,
                };
                TypeAndValue {
                    mode: Mode::Constant,
                    ty: self.arena.basic(kind),
                }
            }
            ExprKind::CompositeLit { ty, elts, .. } => self.composite_lit(ty.as_deref(), elts, scope, hint),
            ExprKind::FuncLit { ty, body } => {
                let fscope = self.arena.new_scope(Some(scope), ScopeKind::Func, ty.pos, body.end);
                self.info.scopes.insert(ty.id, fscope);
                let sig = self.signature(ty, fscope, None);
                self.func_body(fscope, body);
                Self::value(sig)
            }
            ExprKind::Paren(inner) => self.expr_hint(inner, scope, hint),
            ExprKind::Selector { x, sel } => self.selector(x, sel, scope),
            ExprKind::Index { x, indices } => {
                let xt = self.expr(x, scope);
                if xt.is_type() {
                    let ty = self.instantiate(expr.pos, xt.ty, indices, scope);
                    return TypeAndValue {
                        mode: Mode::TypeExpr,
                        ty,
                    };
                }
                let under = self.arena.underlying(xt.ty);
                match self.arena.ty(under).clone() {
                    Type::Slice(elem) | Type::Array { elem, .. } => {
                        for index in indices {
                            self.expr(index, scope);
                        }
                        TypeAndValue {
                            mode: Mode::Variable,
                            ty: elem,
                        }
                    }
                    Type::Pointer(ptr) => {
                        for index in indices {
                            self.expr(index, scope);
                        }
                        match self.arena.ty(self.arena.underlying(ptr)) {
                            Type::Array { elem, .. } => TypeAndValue {
                                mode: Mode::Variable,
                                ty: *elem,
                            },
                            _ => self.invalid(),
                        }
                    }
                    Type::Map { key, value } => {
                        for index in indices {
                            self.expr_hint(index, scope, Some(key));
                        }
                        Self::value(value)
                    }
                    Type::Basic(kind) if kind.canonical() == BasicKind::String || kind == BasicKind::UntypedString => {
                        for index in indices {
                            self.expr(index, scope);
                        }
                        Self::value(self.arena.basic(BasicKind::Byte))
                    }
                    Type::Signature(sig) if !sig.type_params.is_empty() => {
                        for index in indices {
                            self.resolve_type(index, scope);
                        }
                        Self::value(xt.ty)
                    }
                    _ => {
                        for index in indices {
                            self.expr(index, scope);
                        }
                        self.invalid()
                    }
                }
            }
            ExprKind::Slice { x, low, high } => {
                let xt = self.expr(x, scope);
                for bound in [low, high].into_iter().flatten() {
                    self.expr(bound, scope);
                }
                let under = self.arena.underlying(self.arena.deref(xt.ty));
                match self.arena.ty(under).clone() {
                    Type::Array { elem, .. } => Self::value(self.arena.new_type(Type::Slice(elem))),
                    Type::Basic(kind) if kind.is_untyped() => Self::value(self.arena.basic(BasicKind::String)),
                    _ => Self::value(xt.ty),
                }
            }
            ExprKind::TypeAssert { x, ty } => {
                let xt = self.expr(x, scope);
                match ty {
                    Some(ty) => Self::value(self.resolve_type(ty, scope)),
                    None => Self::value(xt.ty),
                }
            }
            ExprKind::Call { fun, args, ellipsis, .. } => self.call(fun, args, ellipsis.is_valid(), scope),
            ExprKind::Star(x) => {
                let xt = self.expr(x, scope);
                if xt.is_type() {
                    return TypeAndValue {
                        mode: Mode::TypeExpr,
                        ty: self.arena.pointer_to(xt.ty),
                    };
                }
                match self.arena.ty(self.arena.underlying(xt.ty)) {
                    Type::Pointer(elem) => TypeAndValue {
                        mode: Mode::Variable,
                        ty: *elem,
                    },
                    _ => {
                        if xt.mode != Mode::Invalid {
                            self.error(expr.pos, "invalid indirect of non-pointer value");
                        }
                        self.invalid()
                    }
                }
            }
            ExprKind::Unary { op, x } => {
                let inner_hint = match (op, hint) {
                    (UnaryOp::Addr, Some(hint)) => Some(self.arena.deref(hint)),
                    _ => None,
                };
                let xt = self.expr_hint(x, scope, inner_hint);
                match op {
                    UnaryOp::Addr => Self::value(self.arena.pointer_to(xt.ty)),
                    UnaryOp::Recv => match self.arena.ty(self.arena.underlying(xt.ty)) {
                        Type::Chan { elem, .. } => Self::value(*elem),
                        _ => self.invalid(),
                    },
                    UnaryOp::Not
                    | UnaryOp::Neg | UnaryOp::Pos | UnaryOp::Xor => TypeAndValue {
                        mode: if xt.mode == Mode::Constant { Mode::Constant } else { Mode::Value },
                        ty: xt.ty,
                    },
                }
            }
            ExprKind::Binary { x, op, y } => {
                let xt = self.expr(x, scope);
                let yt = self.expr(y, scope);
                let mode = if xt.mode == Mode::Constant && yt.mode == Mode::Constant {
                    Mode::Constant
                } else {
                    Mode::Value
                };
                let ty = if op.is_comparison() {
                    self.arena.basic(BasicKind::UntypedBool)
                } else if matches!(op, BinaryOp::Shl | BinaryOp::Shr) || !self.arena.is_untyped(xt.ty) {
                    xt.ty
                } else {
                    yt.ty
                };
                TypeAndValue { mode, ty }
            }
            ExprKind::KeyValue { key, value, .. } => {
                self.expr(key, scope);
                self.expr(value, scope);
                self.invalid()
            }
            ExprKind::ArrayType { .. }
            | ExprKind::MapType { .. }
            | ExprKind::ChanType { .. }
            | ExprKind::FuncType(_)
            | ExprKind::StructType(_)
            | ExprKind::InterfaceType(_)
            | ExprKind::Ellipsis(_) => TypeAndValue {
                mode: Mode::TypeExpr,
                ty: self.type_expr(expr, scope),
            },
        }
    }

    fn selector(&mut self, x: &Expr, sel: &Ident, scope: ScopeId) -> TypeAndValue {
        if let Some(imported) = self.package_qualifier(x, scope) {
            return match self.qualified_member(imported, sel) {
                Some(member) => self.object_value(member),
                None => self.invalid(),
            };
        }
        let xt = self.expr(x, scope);
        if xt.mode == Mode::Invalid || self.arena.is_invalid(xt.ty) {
            return self.invalid();
        }
        match self.arena.lookup_field_or_method(xt.ty, &sel.name) {
            Some(selection) => {
                self.record_use(sel, selection.obj);
                let object = self.arena.object(selection.obj);
                let mode = if object.is_field() && (xt.addressable() || selection.indirect) {
                    Mode::Variable
                } else {
                    Mode::Value
                };
                TypeAndValue { mode, ty: object.ty }
            }
            None => {
                if !sel.is_blank() {
                    let shown = super::type_string(&*self.arena, xt.ty, super::Qualifier::RelativeTo(self.pkg));
                    self.error(
                        sel.pos,
                        format!("{}.{} undefined (type {shown} has no field or method {})", shown, sel.name, sel.name),
                    );
                }
                self.invalid()
            }
        }
    }

    fn callee_object(&self, fun: &Expr) -> Option<ObjectId> {
        match &fun.unparen().kind {
            ExprKind::Ident(ident) => self.info.uses.get(&ident.id).copied(),
            ExprKind::Selector { sel, .. } => self.info.uses.get(&sel.id).copied(),
            ExprKind::Index { x, .. } => self.callee_object(x),
            _ => None,
        }
    }

    fn call(&mut self, fun: &Expr, args: &[Expr], spread: bool, scope: ScopeId) -> TypeAndValue {
        let ft = self.expr(fun, scope);
        match ft.mode {
            Mode::TypeExpr => {
                for arg in args {
                    self.expr(arg, scope);
                }
                return Self::value(ft.ty);
            }
            Mode::Builtin => {
                let builtin = match self.callee_object(fun).map(|obj| &self.arena.object(obj).kind) {
                    Some(ObjectKind::Builtin(func)) => Some(*func),
                    _ => None,
                };
                if let Some(builtin) = builtin {
                    return self.builtin_call(builtin, args, scope);
                }
            }
            Mode::Invalid => {
                for arg in args {
                    self.expr(arg, scope);
                }
                return self.invalid();
            }
            _ => {}
        }

        let mut sig_ty = ft.ty;
        if let Some(obj) = self.callee_object(fun) {
            if let ObjectKind::Func { overloads } = &self.arena.object(obj).kind {
                let fits = overloads.iter().copied().find(|member| {
                    self.arena
                        .as_signature(self.arena.object(*member).ty)
                        .is_some_and(|sig| sig.params.len() == args.len() || sig.variadic && args.len() + 1 >= sig.params.len())
                });
                if let Some(member) = fits {
                    sig_ty = self.arena.object(member).ty;
                }
            }
        }
        let Some(sig) = self.arena.as_signature(sig_ty).cloned() else {
            for arg in args {
                self.expr(arg, scope);
            }
            self.error(fun.pos, "invalid operation: cannot call non-function");
            return self.invalid();
        };
        for (idx, arg) in args.iter().enumerate() {
            let param = match sig.params.get(idx).or(sig.params.last()) {
                Some(param) => {
                    let ty = self.arena.object(*param).ty;
                    let last = idx + 1 >= sig.params.len();
                    match self.arena.ty(ty) {
                        Type::Slice(elem) if sig.variadic && last && !spread => Some(*elem),
                        _ => Some(ty),
                    }
                }
                None => None,
            };
            self.expr_hint(arg, scope, param);
        }
        match sig.results.as_slice() {
            [] => TypeAndValue {
                mode: Mode::NoValue,
                ty: self.arena.invalid(),
            },
            [single] => Self::value(self.arena.object(*single).ty),
            results => {
                let types = results.iter().map(|r| self.arena.object(*r).ty).collect();
                Self::value(self.arena.new_type(Type::Tuple(types)))
            }
        }
    }

    fn builtin_call(&mut self, builtin: BuiltinFunc, args: &[Expr], scope: ScopeId) -> TypeAndValue {
        let no_value = TypeAndValue {
            mode: Mode::NoValue,
            ty: self.arena.invalid(),
        };
        match builtin {
            BuiltinFunc::Make | BuiltinFunc::New => {
                let Some((first, rest)) = args.split_first() else {
                    return self.invalid();
                };
                let ty = self.resolve_type(first, scope);
                for arg in rest {
                    self.expr(arg, scope);
                }
                if builtin == BuiltinFunc::New {
                    Self::value(self.arena.pointer_to(ty))
                } else {
                    Self::value(ty)
                }
            }
            BuiltinFunc::Append => {
                let Some((first, rest)) = args.split_first() else {
                    return self.invalid();
                };
                let slice = self.expr(first, scope).ty;
                let elem = match self.arena.ty(self.arena.underlying(slice)) {
                    Type::Slice(elem) => Some(*elem),
                    _ => None,
                };
                for arg in rest {
                    self.expr_hint(arg, scope, elem);
                }
                Self::value(self.default_type(slice))
            }
            BuiltinFunc::Min | BuiltinFunc::Max => {
                let mut ty = self.arena.invalid();
                for (idx, arg) in args.iter().enumerate() {
                    let arg_ty = self.expr(arg, scope).ty;
                    if idx == 0 || self.arena.is_untyped(ty) {
                        ty = arg_ty;
                    }
                }
                Self::value(ty)
            }
            _ => {
                for arg in args {
                    self.expr(arg, scope);
                }
                match builtin {
                    BuiltinFunc::Len | BuiltinFunc::Cap | BuiltinFunc::Copy => Self::value(self.arena.basic(BasicKind::Int)),
                    BuiltinFunc::Complex => Self::value(self.arena.basic(BasicKind::Complex128)),
                    BuiltinFunc::Real | BuiltinFunc::Imag => Self::value(self.arena.basic(BasicKind::Float64)),
                    BuiltinFunc::Recover => Self::value(self.arena.any_type()),
                    _ => no_value,
                }
            }
        }
    }

    fn composite_lit(&mut self, ty: Option<&Expr>, elts: &[Expr], scope: ScopeId, hint: Option<TypeId>) -> TypeAndValue {
        let lit_ty = match (ty, hint) {
            (Some(ty), _) => self.resolve_type(ty, scope),
            (None, Some(hint)) => self.arena.deref(hint),
            (None, None) => {
                self.error(elts.first().map(|e| e.pos).unwrap_or(Pos::NONE), "invalid composite literal type: missing type");
                self.arena.invalid()
            }
        };
        let under = self.arena.underlying(lit_ty);
        match self.arena.ty(under).clone() {
            Type::Struct { fields } => {
                for (idx, elt) in elts.iter().enumerate() {
                    if let ExprKind::KeyValue { key, value, .. } = &elt.kind {
                        let field = key.as_ident().and_then(|key| {
                            let found = fields.iter().copied().find(|f| self.arena.object(*f).name == key.name);
                            match found {
                                Some(field) => self.record_use(key, field),
                                None => self.error(key.pos, format!("unknown field {} in struct literal", key.name)),
                            }
                            found
                        });
                        let field_ty = field.map(|f| self.arena.object(f).ty);
                        self.expr_hint(value, scope, field_ty);
                    } else {
                        let field_ty = fields.get(idx).map(|f| self.arena.object(*f).ty);
                        self.expr_hint(elt, scope, field_ty);
                    }
                }
            }
            Type::Array { elem, .. } | Type::Slice(elem) => {
                for elt in elts {
                    match &elt.kind {
                        ExprKind::KeyValue { key, value, .. } => {
                            self.expr(key, scope);
                            self.expr_hint(value, scope, Some(elem));
                        }
                        _ => {
                            self.expr_hint(elt, scope, Some(elem));
                        }
                    }
                }
            }
            Type::Map { key: key_ty, value: value_ty } => {
                for elt in elts {
                    match &elt.kind {
                        ExprKind::KeyValue { key, value, .. } => {
                            self.expr_hint(key, scope, Some(key_ty));
                            self.expr_hint(value, scope, Some(value_ty));
                        }
                        _ => {
                            self.error(elt.pos, "missing key in map literal");
                            self.expr(elt, scope);
                        }
                    }
                }
            }
            _ => {
                for elt in elts {
                    match &elt.kind {
                        ExprKind::KeyValue { value, .. } => {
                            self.expr(value, scope);
                        }
                        _ => {
                            self.expr(elt, scope);
                        }
                    }
                }
            }
        }
        Self::value(lit_ty)
    }
}
