use super::*;
use crate::language::{
    ast::{File, Ident},
    parser::parse,
    span::FileSet,
    visit::{inspect, Node},
};

fn check_src(src: &str) -> (Arena, Checked, File) {
    let mut fset = FileSet::new();
    let (file, _) = parse(&mut fset, "demo.gop", src.as_bytes());
    let file = file.expect("tree");
    let mut arena = Arena::new();
    let checked = check_package(&mut arena, "example.com/demo", &[&file]);
    (arena, checked, file)
}

fn idents<'a>(file: &'a File, name: &str) -> Vec<&'a Ident> {
    let mut out = Vec::new();
    inspect(Node::File(file), &mut |node| {
        if let Some(Node::Ident(ident)) = node {
            if ident.name == name {
                out.push(ident);
            }
        }
        true
    });
    out
}

#[test]
fn universe_has_builtins_and_error() {
    let arena = Arena::new();
    let universe = arena.universe();
    let append = arena.lookup(universe, "append").expect("append");
    assert!(matches!(
        arena.object(append).kind,
        ObjectKind::Builtin(BuiltinFunc::Append)
    ));
    let error = arena.lookup(universe, "error").expect("error");
    let error_ty = arena.object(error).ty;
    assert!(arena.is_interface(error_ty));
    assert!(arena.lookup_field_or_method(error_ty, "Error").is_some());
    assert_eq!(arena.scope_depth(universe), 1);
}

#[test]
fn local_uses_resolve_to_their_definition() {
    let src = "package demo\n\nfunc f(n int) int {\n\tx := n + 1\n\treturn x\n}\n";
    let (arena, checked, file) = check_src(src);
    assert!(checked.errors.is_empty(), "{:?}", checked.errors);
    let xs = idents(&file, "x");
    let def = checked.info.defs[&xs[0].id];
    assert_eq!(checked.info.uses[&xs[1].id], def);
    let object = arena.object(def);
    assert_eq!(type_string(&arena, object.ty, Qualifier::Unqualified), "int");
    assert!(arena.scope_depth(object.parent.expect("parent")) >= 3);
}

#[test]
fn declaration_is_not_visible_before_it() {
    let src = "package demo\n\nvar x = 1\n\nfunc f() {\n\ty := x\n\tx := 2\n\t_, _ = x, y\n}\n";
    let (_, checked, file) = check_src(src);
    let xs = idents(&file, "x");
    let package_x = checked.info.defs[&xs[0].id];
    assert_eq!(checked.info.uses[&xs[1].id], package_x);
    let local_x = checked.info.defs[&xs[2].id];
    assert_ne!(local_x, package_x);
    assert_eq!(checked.info.uses[&xs[3].id], local_x);
}

#[test]
fn struct_literal_keys_use_fields() {
    let src = "package demo\n\ntype Point struct {\n\tX, Y int\n}\n\nvar p = Point{X: 1, Y: 2}\n";
    let (arena, checked, file) = check_src(src);
    assert!(checked.errors.is_empty(), "{:?}", checked.errors);
    let xs = idents(&file, "X");
    let field = checked.info.defs[&xs[0].id];
    assert!(arena.object(field).is_field());
    assert_eq!(checked.info.uses[&xs[1].id], field);
    let owner = arena.object(field).owner.expect("owner");
    let named = arena.named_of(owner).expect("named");
    assert_eq!(type_string(&arena, named, Qualifier::Path), "example.com/demo.Point");
}

#[test]
fn overloads_are_grouped_under_their_base_name() {
    let src = "package demo\n\nfunc Add__0(a, b int) int { return a + b }\n\nfunc Add__1(a, b string) string { return a + b }\n\nvar n = Add(1, 2)\n";
    let (arena, checked, _) = check_src(src);
    let scope = arena.package(checked.pkg).scope;
    let add = arena.lookup(scope, "Add").expect("family");
    let ObjectKind::Func { overloads } = &arena.object(add).kind else {
        panic!("expected func");
    };
    let names: Vec<_> = overloads.iter().map(|o| arena.object(*o).name.as_str()).collect();
    assert_eq!(names, vec!["Add__0", "Add__1"]);
    let n = arena.lookup(scope, "n").expect("n");
    assert_eq!(type_string(&arena, arena.object(n).ty, Qualifier::Unqualified), "int");
}

#[test]
fn shadowed_builtin_resolves_to_user_object() {
    let src = "package demo\n\nfunc append(xs []int, x int) []int { return xs }\n\nfunc f(xs []int) {\n\txs = append(xs, 1)\n}\n";
    let (arena, checked, file) = check_src(src);
    let uses = idents(&file, "append");
    let used = checked.info.uses[&uses[1].id];
    assert!(matches!(arena.object(used).kind, ObjectKind::Func { .. }));
    assert_eq!(arena.object(used).pkg, Some(checked.pkg));
}

#[test]
fn embedded_fields_promote_methods() {
    let src = "package demo\n\ntype Base struct{}\n\nfunc (b *Base) Hello() string { return \"hi\" }\n\ntype Outer struct {\n\t*Base\n\tName string\n}\n\nfunc f(o Outer) string { return o.Hello() }\n";
    let (arena, checked, _) = check_src(src);
    assert!(checked.errors.is_empty(), "{:?}", checked.errors);
    let scope = arena.package(checked.pkg).scope;
    let outer = arena.object(arena.lookup(scope, "Outer").expect("Outer")).ty;
    let hello = arena.lookup_field_or_method(outer, "Hello").expect("promoted");
    assert_eq!(hello.path, vec![0]);
    assert!(hello.indirect);
    let sig = type_string(&arena, arena.object(hello.obj).ty, Qualifier::Unqualified);
    assert_eq!(sig, "func() string");
}

#[test]
fn unknown_import_becomes_placeholder_package() {
    let src = "package demo\n\nimport \"github.com/acme/widgets\"\n\nvar w = widgets.New()\n";
    let (arena, checked, _) = check_src(src);
    assert!(checked.errors.is_empty(), "{:?}", checked.errors);
    let widgets = arena.package_by_path("github.com/acme/widgets").expect("placeholder");
    assert_eq!(arena.package(widgets).name, "widgets");
    assert!(!arena.package(widgets).complete);
    assert_eq!(arena.package(checked.pkg).imports, vec![widgets]);
}

#[test]
fn labels_live_in_function_label_scope() {
    let src = "package demo\n\nfunc f() {\nouter:\n\tfor {\n\t\tbreak outer\n\t}\n}\n";
    let (arena, checked, file) = check_src(src);
    assert!(checked.errors.is_empty(), "{:?}", checked.errors);
    let labels = idents(&file, "outer");
    let label = checked.info.defs[&labels[0].id];
    assert_eq!(checked.info.uses[&labels[1].id], label);
    let scope = arena.object(label).parent.expect("label scope");
    assert_eq!(arena.scope(scope).kind, ScopeKind::Labels);
}

#[test]
fn signatures_format_like_declarations() {
    let src = "package demo\n\nfunc Join(sep string, parts ...string) (out string, err error) { return }\n";
    let (arena, checked, _) = check_src(src);
    let scope = arena.package(checked.pkg).scope;
    let join = arena.lookup(scope, "Join").expect("Join");
    assert_eq!(
        signature_string(&arena, arena.object(join).ty, Qualifier::RelativeTo(checked.pkg)),
        "(sep string, parts ...string) (out string, err error)"
    );
}

#[test]
fn implements_checks_method_sets() {
    let src = "package demo\n\ntype Stringer interface {\n\tString() string\n}\n\ntype Name string\n\nfunc (n Name) String() string { return string(n) }\n";
    let (arena, checked, _) = check_src(src);
    let scope = arena.package(checked.pkg).scope;
    let stringer = arena.object(arena.lookup(scope, "Stringer").expect("Stringer")).ty;
    let name = arena.object(arena.lookup(scope, "Name").expect("Name")).ty;
    assert!(arena.implements(name, stringer));
    assert!(!arena.implements(arena.basic(BasicKind::Int), stringer));
}
