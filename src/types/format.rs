use super::{Arena, ChanDir, ObjectId, ObjectKind, PackageId, Type, TypeId};

/// How package-level names from other packages are prefixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Qualifier {
    /// Full import path.
    Path,
    /// Package name, omitted for the given package.
    RelativeTo(PackageId),
    /// Never qualify.
    Unqualified,
}

impl Qualifier {
    pub fn prefix(self, arena: &Arena, pkg: PackageId) -> String {
        match self {
            Qualifier::Path => arena.package(pkg).path.clone(),
            Qualifier::RelativeTo(current) if current == pkg => String::new(),
            Qualifier::RelativeTo(_) => arena.package(pkg).name.clone(),
            Qualifier::Unqualified => String::new(),
        }
    }
}

pub fn type_string(arena: &Arena, ty: TypeId, qf: Qualifier) -> String {
    let mut out = String::new();
    write_type(arena, ty, qf, &mut out, 0);
    out
}

/// Parameter and result lists of a signature, e.g. `(x int) (bool, error)`.
pub fn signature_string(arena: &Arena, ty: TypeId, qf: Qualifier) -> String {
    let mut out = String::new();
    write_signature(arena, ty, qf, &mut out, 0);
    out
}

pub fn object_kind_name(arena: &Arena, obj: ObjectId) -> &'static str {
    let object = arena.object(obj);
    match &object.kind {
        ObjectKind::TypeName => "type",
        ObjectKind::Const => "const",
        ObjectKind::Var { is_field: true, .. } => "field",
        ObjectKind::Var { .. } => "var",
        ObjectKind::Func { .. } if object.owner.is_some() => "method",
        ObjectKind::Func { .. } => "func",
        ObjectKind::PkgName { .. } => "package",
        ObjectKind::Label => "label",
        ObjectKind::Builtin(_) => "builtin",
        ObjectKind::Nil => "nil",
    }
}

fn write_list(arena: &Arena, types: &[TypeId], qf: Qualifier, out: &mut String, depth: usize) {
    for (idx, ty) in types.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        write_type(arena, *ty, qf, out, depth + 1);
    }
}

fn write_type(arena: &Arena, ty: TypeId, qf: Qualifier, out: &mut String, depth: usize) {
    if depth > 24 {
        out.push_str("...");
        return;
    }
    if ty == arena.any_type() {
        out.push_str("any");
        return;
    }
    match arena.ty(ty) {
        Type::Basic(kind) => out.push_str(kind.name()),
        Type::Named(named) => {
            let obj = arena.object(named.obj);
            if let Some(pkg) = obj.pkg {
                let prefix = qf.prefix(arena, pkg);
                if !prefix.is_empty() {
                    out.push_str(&prefix);
                    out.push('.');
                }
            }
            out.push_str(&obj.name);
            if !named.type_args.is_empty() {
                out.push('[');
                write_list(arena, &named.type_args, qf, out, depth);
                out.push(']');
            }
        }
        Type::Pointer(elem) => {
            out.push('*');
            write_type(arena, *elem, qf, out, depth + 1);
        }
        Type::Slice(elem) => {
            out.push_str("[]");
            write_type(arena, *elem, qf, out, depth + 1);
        }
        Type::Array { len, elem } => {
            match len {
                Some(len) => out.push_str(&format!("[{len}]")),
                None => out.push_str("[...]"),
            }
            write_type(arena, *elem, qf, out, depth + 1);
        }
        Type::Map { key, value } => {
            out.push_str("map[");
            write_type(arena, *key, qf, out, depth + 1);
            out.push(']');
            write_type(arena, *value, qf, out, depth + 1);
        }
        Type::Chan { dir, elem } => {
            out.push_str(match dir {
                ChanDir::Both => "chan ",
                ChanDir::Send => "chan<- ",
                ChanDir::Recv => "<-chan ",
            });
            write_type(arena, *elem, qf, out, depth + 1);
        }
        Type::Struct { fields } => {
            out.push_str("struct{");
            for (idx, field) in fields.iter().enumerate() {
                if idx > 0 {
                    out.push_str("; ");
                }
                let field = arena.object(*field);
                if !matches!(field.kind, ObjectKind::Var { embedded: true, .. }) {
                    out.push_str(&field.name);
                    out.push(' ');
                }
                write_type(arena, field.ty, qf, out, depth + 1);
            }
            out.push('}');
        }
        Type::Signature(_) => {
            out.push_str("func");
            write_signature(arena, ty, qf, out, depth);
        }
        Type::Interface { methods, embeddeds } => {
            out.push_str("interface{");
            let mut first = true;
            for embedded in embeddeds {
                if !first {
                    out.push_str("; ");
                }
                first = false;
                write_type(arena, *embedded, qf, out, depth + 1);
            }
            for method in methods {
                if !first {
                    out.push_str("; ");
                }
                first = false;
                let method = arena.object(*method);
                out.push_str(&method.name);
                write_signature(arena, method.ty, qf, out, depth + 1);
            }
            out.push('}');
        }
        Type::TypeParam { obj, .. } => out.push_str(&arena.object(*obj).name),
        Type::Tuple(types) => {
            out.push('(');
            write_list(arena, types, qf, out, depth);
            out.push(')');
        }
    }
}

fn write_signature(arena: &Arena, ty: TypeId, qf: Qualifier, out: &mut String, depth: usize) {
    let Some(sig) = arena.as_signature(ty) else {
        out.push_str("()");
        return;
    };
    out.push('(');
    for (idx, param) in sig.params.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        let param = arena.object(*param);
        if !param.name.is_empty() {
            out.push_str(&param.name);
            out.push(' ');
        }
        let last = idx + 1 == sig.params.len();
        match arena.ty(param.ty) {
            Type::Slice(elem) if sig.variadic && last => {
                out.push_str("...");
                write_type(arena, *elem, qf, out, depth + 1);
            }
            _ => write_type(arena, param.ty, qf, out, depth + 1),
        }
    }
    out.push(')');
    match sig.results.as_slice() {
        [] => {}
        [single] if arena.object(*single).name.is_empty() => {
            out.push(' ');
            write_type(arena, arena.object(*single).ty, qf, out, depth + 1);
        }
        results => {
            out.push_str(" (");
            for (idx, result) in results.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                let result = arena.object(*result);
                if !result.name.is_empty() {
                    out.push_str(&result.name);
                    out.push(' ');
                }
                write_type(arena, result.ty, qf, out, depth + 1);
            }
            out.push(')');
        }
    }
}
