use super::*;
use crate::{
    error::{CancelToken, Error},
    language::{
        ast::{Decl, File, StmtKind},
        errors::SyntaxErrors,
        span::{FileSet, TokenFile},
    },
};
use std::{cell::Cell, io::Write, sync::Arc};

fn parse(src: &[u8]) -> ParsedFile {
    let mut fset = FileSet::new();
    parse_src(&mut fset, "a.gop", src, ParseMode::Full, false, &DefaultRepairs)
}

fn body_stmts(file: &File) -> &[crate::language::ast::Stmt] {
    file.decls
        .iter()
        .find_map(|decl| match decl {
            Decl::Func(func) => func.body.as_ref(),
            _ => None,
        })
        .map(|body| body.stmts.as_slice())
        .expect("function body")
}

/// Appends a comment forever; the buffer never becomes valid.
struct AlwaysEdit {
    calls: Cell<usize>,
}

impl SourceRepair for AlwaysEdit {
    fn repair(&self, _: &File, _: &TokenFile, src: &[u8], _: &SyntaxErrors) -> Option<(Vec<u8>, SourceFix)> {
        self.calls.set(self.calls.get() + 1);
        let fix = SourceFix {
            kind: SourceFixKind::Custom("comment"),
            offset: src.len(),
            inserted: "\n// again".into(),
        };
        Some((fix.apply(src), fix))
    }
}

/// Produces bytes the parser cannot tokenize.
struct Garbage;

impl SourceRepair for Garbage {
    fn repair(&self, _: &File, _: &TokenFile, src: &[u8], _: &SyntaxErrors) -> Option<(Vec<u8>, SourceFix)> {
        let mut out = src.to_vec();
        out.push(0xff);
        Some((
            out,
            SourceFix {
                kind: SourceFixKind::Custom("garbage"),
                offset: src.len(),
                inserted: String::new(),
            },
        ))
    }
}

#[test]
fn any_input_yields_a_tree() {
    let inputs: [&[u8]; 7] = [
        b"",
        b"package",
        b"package demo\nfunc (",
        b"}}}{{{",
        b"\x00\x01\x02",
        b"\xff\xfe\xfd",
        b"package demo\nfunc f() { x := [1, 2, \n",
    ];
    for input in inputs {
        let parsed = parse(input);
        assert_eq!(parsed.tok.size(), parsed.src.len());
        let source_fixes = parsed
            .fixes
            .iter()
            .filter(|fix| matches!(fix, Fix::Source(_)))
            .count();
        assert!(source_fixes <= MAX_REPAIR_ITERATIONS);
    }
}

#[test]
fn clean_source_is_returned_untouched() {
    let src = b"package demo\n\nfunc f() int {\n\treturn 1\n}\n";
    let parsed = parse(src);
    assert!(parsed.is_clean());
    assert!(!parsed.fixed_src);
    assert!(!parsed.fixed_ast);
    assert!(parsed.fixes.is_empty());
    assert_eq!(&*parsed.src, &src[..]);
}

#[test]
fn bad_statements_become_empty_statements() {
    let src = b"package demo\n\nfunc f() {\n\t)\n}\n";
    let parsed = parse(src);
    assert!(!parsed.is_clean());
    assert!(parsed.fixed_ast);
    assert!(!parsed.fixed_src);
    let stmts = body_stmts(&parsed.file);
    assert!(stmts
        .iter()
        .all(|stmt| !matches!(stmt.kind, StmtKind::Bad)));
    assert!(stmts
        .iter()
        .any(|stmt| matches!(stmt.kind, StmtKind::Empty { implicit: false })));
    assert!(matches!(parsed.fixes[0], Fix::BadStmt { .. }));
}

#[test]
fn dangling_selector_is_completed() {
    let src = b"package demo\n\nfunc f() {\n\tx := fmt.\n}\n";
    let parsed = parse(src);
    assert!(parsed.fixed_src);
    assert!(parsed.parse_err.is_some(), "original error is kept");
    assert!(std::str::from_utf8(&parsed.src)
        .expect("utf-8")
        .contains("fmt._"));
    let source_fixes: Vec<_> = parsed
        .fixes
        .iter()
        .filter_map(|fix| match fix {
            Fix::Source(fix) => Some(fix.kind),
            Fix::BadStmt { .. } => None,
        })
        .collect();
    assert_eq!(source_fixes, vec![SourceFixKind::DanglingSelector]);
    assert_eq!(parsed.mapper.content(), &*parsed.src);
}

#[test]
fn unclosed_call_gets_closing_paren() {
    let src = b"package demo\n\nfunc f() {\n\tprintln(1\n}\n";
    let parsed = parse(src);
    assert!(parsed.fixed_src);
    let text = std::str::from_utf8(&parsed.src).expect("utf-8");
    assert!(text.contains("println(1)\n"), "{text}");
}

#[test]
fn missing_braces_are_appended() {
    let src = b"package demo\n\nfunc f() {\n\tif true {\n\t\treturn\n";
    let parsed = parse(src);
    assert!(parsed.fixed_src);
    assert!(parsed.src.ends_with(b"\n}\n}"));
}

#[test]
fn repair_loop_stops_after_ten_attempts() {
    let repair = AlwaysEdit { calls: Cell::new(0) };
    let mut fset = FileSet::new();
    let parsed = parse_src(
        &mut fset,
        "a.gop",
        b"package demo\nfunc f() {\n\t)\n}\n",
        ParseMode::Full,
        false,
        &repair,
    );
    assert_eq!(repair.calls.get(), MAX_REPAIR_ITERATIONS);
    assert_eq!(parsed.diagnostics.len(), 1);
    let diagnostic = &parsed.diagnostics[0];
    assert_eq!(diagnostic.iteration, MAX_REPAIR_ITERATIONS - 1);
    assert!(diagnostic.diff.starts_with("--- before\n+++ after\n"));
    assert!(diagnostic.diff.contains("+// again"));
    let sources = parsed
        .fixes
        .iter()
        .filter(|fix| matches!(fix, Fix::Source(_)))
        .count();
    assert_eq!(sources, MAX_REPAIR_ITERATIONS);
}

#[test]
fn unparsable_repair_is_not_adopted() {
    let src = b"package demo\nfunc f() {\n\t)\n}\n";
    let mut fset = FileSet::new();
    let parsed = parse_src(&mut fset, "a.gop", src, ParseMode::Full, false, &Garbage);
    assert!(!parsed.fixed_src);
    assert_eq!(&*parsed.src, &src[..]);
    assert!(parsed.fixes.iter().all(|fix| !matches!(fix, Fix::Source(_))));
}

#[test]
fn undecodable_buffer_gets_synthetic_tree() {
    let parsed = parse(b"package demo\n\xff\n");
    assert!(parsed.synthetic);
    assert!(parsed.file.decls.is_empty());
    assert!(parsed.parse_err.is_some());
    assert_eq!(parsed.tok.size(), parsed.src.len());
}

#[test]
fn missing_package_clause_still_maps_positions() {
    let parsed = parse(b"func f() {}\n");
    assert!(!parsed.file.package.is_valid());
    assert!(parsed.tok.contains(parsed.file.pos));
}

#[test]
fn header_mode_keeps_only_imports() {
    let src = b"package demo\n\nimport \"fmt\"\n\nfunc f() { fmt.Println() }\n";
    let mut fset = FileSet::new();
    let parsed = parse_src(&mut fset, "a.gop", src, ParseMode::Header, false, &DefaultRepairs);
    assert_eq!(parsed.file.decls.len(), 1);
    assert_eq!(parsed.file.imports().count(), 1);
}

#[test]
fn purging_bodies_keeps_offsets_and_lines() {
    let src = "package demo\n\ntype T struct {\n\tX int\n}\n\nfunc f() int {\n\tx := 1\n\treturn x\n}\n";
    let purged = purge_func_bodies(src.as_bytes());
    assert_eq!(purged.len(), src.len());
    let text = String::from_utf8(purged).expect("utf-8");
    assert!(text.contains("X int"));
    assert!(!text.contains("return"));
    assert_eq!(text.lines().count(), src.lines().count());

    let mut fset = FileSet::new();
    let parsed = parse_src(&mut fset, "a.gop", src.as_bytes(), ParseMode::Full, true, &DefaultRepairs);
    assert!(parsed.is_clean());
}

#[test]
fn cancelled_request_is_distinct_error() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let overlay = Overlay {
        name: "a.gop".into(),
        content: Arc::from(&b"package demo\n"[..]),
    };
    let mut fset = FileSet::new();
    let err = parse_file(&cancel, &mut fset, &overlay, ParseMode::Full).expect_err("cancelled");
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(fset.files().count(), 0);
}

#[test]
fn disk_files_are_read_and_missing_files_fail() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"package demo\n\nvar x = 1\n").expect("write");
    let cancel = CancelToken::new();
    let mut fset = FileSet::new();
    let parsed = parse_file(&cancel, &mut fset, &DiskFile::new(file.path()), ParseMode::Full)
        .expect("parsed");
    assert!(parsed.is_clean());

    let missing = DiskFile::new(file.path().with_extension("missing"));
    let err = parse_file(&cancel, &mut fset, &missing, ParseMode::Full).expect_err("io error");
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn deep_nesting_is_a_syntax_error() {
    let depth = 100_000;
    let inputs = [
        format!("package p\nvar x = {}1{}\n", "(".repeat(depth), ")".repeat(depth)),
        format!("package p\nvar x = {}0{}\n", "a[".repeat(depth), "]".repeat(depth)),
        format!("package p\nvar x {}int\n", "[]".repeat(depth)),
        format!("package p\nvar x = {}true\n", "!".repeat(depth)),
        format!("package p\nfunc f() {{\n{}{}\n}}\n", "{".repeat(depth), "}".repeat(depth)),
        format!("package p\nvar x = T{}{}\n", "{".repeat(depth), "}".repeat(depth)),
    ];
    for input in &inputs {
        let parsed = parse(input.as_bytes());
        assert!(!parsed.synthetic);
        let errors = parsed.parse_err.as_ref().expect("nesting is reported");
        assert!(
            errors.errors.iter().any(|e| e.message == "exceeded max nesting depth"),
            "{errors}"
        );
    }

    let shallow = format!("package p\nvar x = {}1{}\n", "(".repeat(16), ")".repeat(16));
    assert!(parse(shallow.as_bytes()).is_clean());
}
