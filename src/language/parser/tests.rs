use super::*;

fn parse_str(src: &str) -> (File, SyntaxErrors) {
    let mut fset = FileSet::new();
    let (file, errors) = parse(&mut fset, "test.gop", src.as_bytes());
    (file.expect("tree"), errors)
}

fn func<'a>(file: &'a File, name: &str) -> &'a FuncDecl {
    file.decls
        .iter()
        .find_map(|decl| match decl {
            Decl::Func(func) if func.name.name == name => Some(func),
            _ => None,
        })
        .expect("function declared")
}

#[test]
fn parses_package_imports_and_declarations() {
    let src = r#"package demo

import (
    "fmt"
    str "strings"
)

// Point is a 2D point.
type Point struct {
    X, Y int
    label string `json:"label"`
}

func (p *Point) Norm() int {
    return p.X*p.X + p.Y*p.Y
}

func Map[T any, U any](xs []T, f func(T) U) []U {
    out := make([]U, 0, len(xs))
    for _, x := range xs {
        out = append(out, f(x))
    }
    return out
}
"#;
    let (file, errors) = parse_str(src);
    assert!(errors.is_empty(), "unexpected errors: {errors}");
    assert_eq!(file.package_name(), "demo");
    assert!(file.package.is_valid());
    let imports: Vec<_> = file.imports().map(|i| i.path_value()).collect();
    assert_eq!(imports, vec!["fmt", "strings"]);

    let Decl::Gen(types) = &file.decls[1] else {
        panic!("expected type declaration");
    };
    assert_eq!(types.doc.as_deref(), Some("Point is a 2D point."));
    let Spec::Type(point) = &types.specs[0] else {
        panic!("expected type spec");
    };
    let ExprKind::StructType(fields) = &point.ty.kind else {
        panic!("expected struct type");
    };
    assert_eq!(fields.num_fields(), 3);
    assert!(fields.list[1].tag.is_some());

    let norm = func(&file, "Norm");
    assert!(norm.recv.is_some());
    let map = func(&file, "Map");
    assert_eq!(map.ty.type_params.as_ref().map(|tp| tp.num_fields()), Some(2));
    assert_eq!(map.ty.params.num_fields(), 2);
}

#[test]
fn package_clause_is_optional() {
    let (file, errors) = parse_str("func main() {\n\tprintln(1)\n}\n");
    assert!(errors.is_empty(), "unexpected errors: {errors}");
    assert_eq!(file.package, Pos::NONE);
    assert_eq!(file.package_name(), "main");
    assert_eq!(file.decls.len(), 1);
}

#[test]
fn bad_statement_is_kept_in_place() {
    let src = "package p\n\nfunc f() {\n\tfoo(a b)\n\tx := 1\n\t_ = x\n}\n";
    let (file, errors) = parse_str(src);
    assert!(!errors.is_empty());
    let body = func(&file, "f").body.as_ref().expect("body");
    assert!(matches!(body.stmts[0].kind, StmtKind::Bad));
    assert!(matches!(
        body.stmts[1].kind,
        StmtKind::Assign {
            op: AssignOp::Define,
            ..
        }
    ));
}

#[test]
fn missing_closing_brace_still_yields_tree() {
    let src = "package p\n\nfunc f() {\n\tx := 1\n";
    let (file, errors) = parse_str(src);
    assert!(errors.errors.iter().any(|e| e.message.contains("expected '}'")));
    let body = func(&file, "f").body.as_ref().expect("body");
    assert_eq!(body.stmts.len(), 1);
    assert_eq!(body.rbrace, file.end);
}

#[test]
fn dangling_selector_gets_blank_name() {
    let (file, errors) = parse_str("package p\n\nfunc f() {\n\tfmt.\n}\n");
    assert_eq!(errors.len(), 1);
    let body = func(&file, "f").body.as_ref().expect("body");
    let StmtKind::Expr(expr) = &body.stmts[0].kind else {
        panic!("expected expression statement");
    };
    let ExprKind::Selector { sel, .. } = &expr.kind else {
        panic!("expected selector");
    };
    assert!(sel.is_blank());
}

#[test]
fn garbage_becomes_bad_declarations() {
    for src in ["", ")))", "}{", "package", "func (", "var = ;;", "\"unterminated"] {
        let mut fset = FileSet::new();
        let (file, _) = parse(&mut fset, "junk.gop", src.as_bytes());
        assert!(file.is_some(), "no tree for {src:?}");
    }
    let (file, errors) = parse_str("package p\n)))\nfunc ok() {}\n");
    assert!(!errors.is_empty());
    assert!(matches!(file.decls[0], Decl::Bad(_)));
    func(&file, "ok");
}

#[test]
fn non_utf8_input_has_no_tree() {
    let mut fset = FileSet::new();
    let (file, errors) = parse(&mut fset, "bin.gop", &[0x66, 0xff, 0xfe]);
    assert!(file.is_none());
    assert_eq!(errors.first().map(|e| e.span.start), Some(1));
}

#[test]
fn control_clause_does_not_start_composite_literal() {
    let src = "package p\n\nfunc f(x, y int) {\n\tif x == y {\n\t\treturn\n\t}\n\tfor i := 0; i < x; i++ {\n\t}\n}\n";
    let (file, errors) = parse_str(src);
    assert!(errors.is_empty(), "unexpected errors: {errors}");
    let body = func(&file, "f").body.as_ref().expect("body");
    assert!(matches!(body.stmts[0].kind, StmtKind::If { .. }));
    assert!(matches!(body.stmts[1].kind, StmtKind::For { .. }));
}

#[test]
fn composite_literal_keys_are_key_values() {
    let src = "package p\n\ntype S struct{ F int }\n\nvar s = S{F: 1}\n";
    let (file, errors) = parse_str(src);
    assert!(errors.is_empty(), "unexpected errors: {errors}");
    let Decl::Gen(decl) = &file.decls[1] else {
        panic!("expected var declaration");
    };
    let Spec::Value(spec) = &decl.specs[0] else {
        panic!("expected value spec");
    };
    let ExprKind::CompositeLit { elts, .. } = &spec.values[0].kind else {
        panic!("expected composite literal");
    };
    assert!(matches!(elts[0].kind, ExprKind::KeyValue { .. }));
}

#[test]
fn node_ids_are_unique_across_files() {
    let mut fset = FileSet::new();
    let (a, _) = parse(&mut fset, "a.gop", b"package p\nvar x = 1\n");
    let (b, _) = parse(&mut fset, "b.gop", b"package p\nvar y = 2\n");
    let (a, b) = (a.expect("a"), b.expect("b"));
    assert_ne!(a.id, b.id);
    assert_ne!(a.id.file, b.id.file);
}
