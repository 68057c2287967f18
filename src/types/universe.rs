use super::{Arena, BasicKind, BuiltinFunc, Named, Object, ObjectKind, Signature, Type};
use crate::language::span::Pos;

/// Documented signature of a builtin function, used when presenting it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuiltinSig {
    pub type_params: &'static [(&'static str, &'static str)],
    pub params: &'static [(&'static str, &'static str)],
    pub results: &'static [&'static str],
    pub variadic: bool,
}

const fn sig(
    params: &'static [(&'static str, &'static str)],
    results: &'static [&'static str],
    variadic: bool,
) -> BuiltinSig {
    BuiltinSig {
        type_params: &[],
        params,
        results,
        variadic,
    }
}

const ORDERED: &[(&str, &str)] = &[("T", "cmp.Ordered")];

const BUILTINS: &[(&str, BuiltinFunc, BuiltinSig)] = &[
    (
        "append",
        BuiltinFunc::Append,
        sig(&[("slice", "[]Type"), ("elems", "Type")], &["[]Type"], true),
    ),
    ("cap", BuiltinFunc::Cap, sig(&[("v", "Type")], &["int"], false)),
    ("clear", BuiltinFunc::Clear, sig(&[("t", "T")], &[], false)),
    ("close", BuiltinFunc::Close, sig(&[("c", "chan<- Type")], &[], false)),
    (
        "complex",
        BuiltinFunc::Complex,
        sig(&[("r", "FloatType"), ("i", "FloatType")], &["ComplexType"], false),
    ),
    (
        "copy",
        BuiltinFunc::Copy,
        sig(&[("dst", "[]Type"), ("src", "[]Type")], &["int"], false),
    ),
    (
        "delete",
        BuiltinFunc::Delete,
        sig(&[("m", "map[Type]Type1"), ("key", "Type")], &[], false),
    ),
    ("imag", BuiltinFunc::Imag, sig(&[("c", "ComplexType")], &["FloatType"], false)),
    ("len", BuiltinFunc::Len, sig(&[("v", "Type")], &["int"], false)),
    (
        "make",
        BuiltinFunc::Make,
        sig(&[("t", "Type"), ("size", "IntegerType")], &["Type"], true),
    ),
    (
        "max",
        BuiltinFunc::Max,
        BuiltinSig {
            type_params: ORDERED,
            params: &[("x", "T"), ("y", "T")],
            results: &["T"],
            variadic: true,
        },
    ),
    (
        "min",
        BuiltinFunc::Min,
        BuiltinSig {
            type_params: ORDERED,
            params: &[("x", "T"), ("y", "T")],
            results: &["T"],
            variadic: true,
        },
    ),
    ("new", BuiltinFunc::New, sig(&[("", "Type")], &["*Type"], false)),
    ("panic", BuiltinFunc::Panic, sig(&[("v", "any")], &[], false)),
    ("print", BuiltinFunc::Print, sig(&[("args", "Type")], &[], true)),
    ("println", BuiltinFunc::Println, sig(&[("args", "Type")], &[], true)),
    ("real", BuiltinFunc::Real, sig(&[("c", "ComplexType")], &["FloatType"], false)),
    ("recover", BuiltinFunc::Recover, sig(&[], &["any"], false)),
];

pub fn builtin_signature(func: BuiltinFunc) -> BuiltinSig {
    BUILTINS
        .iter()
        .find(|(_, f, _)| *f == func)
        .map(|(_, _, sig)| *sig)
        .unwrap_or(sig(&[], &[], false))
}

const BASIC_NAMES: &[BasicKind] = &[
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
    BasicKind::Byte,
    BasicKind::Rune,
];

fn declare(arena: &mut Arena, name: &str, kind: ObjectKind, ty: super::TypeId) -> super::ObjectId {
    let obj = arena.new_object(Object {
        name: name.to_string(),
        kind,
        pos: Pos::NONE,
        pkg: None,
        parent: None,
        ty,
        doc: None,
        owner: None,
        scope_pos: Pos::NONE,
    });
    let universe = arena.universe();
    // Universe names are distinct, so insertion cannot conflict.
    let _ = arena.insert(universe, obj);
    obj
}

pub(super) fn populate(arena: &mut Arena) {
    for kind in BASIC_NAMES {
        let ty = arena.basic(*kind);
        declare(arena, kind.name(), ObjectKind::TypeName, ty);
    }

    let any = arena.new_type(Type::Interface {
        methods: Vec::new(),
        embeddeds: Vec::new(),
    });
    arena.any = any;
    declare(arena, "any", ObjectKind::TypeName, any);

    let string = arena.basic(BasicKind::String);
    let result = arena.new_object(Object {
        name: String::new(),
        kind: ObjectKind::Var {
            is_field: false,
            embedded: false,
        },
        pos: Pos::NONE,
        pkg: None,
        parent: None,
        ty: string,
        doc: None,
        owner: None,
        scope_pos: Pos::NONE,
    });
    let error_sig = arena.new_type(Type::Signature(Signature {
        recv: None,
        type_params: Vec::new(),
        params: Vec::new(),
        results: vec![result],
        variadic: false,
    }));
    let error_method = arena.new_object(Object {
        name: "Error".to_string(),
        kind: ObjectKind::Func {
            overloads: Vec::new(),
        },
        pos: Pos::NONE,
        pkg: None,
        parent: None,
        ty: error_sig,
        doc: None,
        owner: None,
        scope_pos: Pos::NONE,
    });
    let error_iface = arena.new_type(Type::Interface {
        methods: vec![error_method],
        embeddeds: Vec::new(),
    });
    arena.object_mut(error_method).owner = Some(error_iface);
    let invalid = arena.invalid();
    let error = arena.new_type(Type::Basic(BasicKind::Invalid));
    let error_obj = declare(arena, "error", ObjectKind::TypeName, error);
    arena.set_type(
        error,
        Type::Named(Named {
            obj: error_obj,
            underlying: error_iface,
            methods: Vec::new(),
            type_params: Vec::new(),
            type_args: Vec::new(),
            origin: None,
        }),
    );
    arena.error = error;

    let comparable_iface = arena.new_type(Type::Interface {
        methods: Vec::new(),
        embeddeds: Vec::new(),
    });
    let comparable = arena.new_type(Type::Basic(BasicKind::Invalid));
    let comparable_obj = declare(arena, "comparable", ObjectKind::TypeName, comparable);
    arena.set_type(
        comparable,
        Type::Named(Named {
            obj: comparable_obj,
            underlying: comparable_iface,
            methods: Vec::new(),
            type_params: Vec::new(),
            type_args: Vec::new(),
            origin: None,
        }),
    );

    let untyped_bool = arena.basic(BasicKind::UntypedBool);
    declare(arena, "true", ObjectKind::Const, untyped_bool);
    declare(arena, "false", ObjectKind::Const, untyped_bool);
    let untyped_int = arena.basic(BasicKind::UntypedInt);
    declare(arena, "iota", ObjectKind::Const, untyped_int);
    let untyped_nil = arena.basic(BasicKind::UntypedNil);
    declare(arena, "nil", ObjectKind::Nil, untyped_nil);

    for (name, func, _) in BUILTINS {
        declare(arena, name, ObjectKind::Builtin(*func), invalid);
    }
}
