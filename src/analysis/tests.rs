use super::*;
use crate::{
    language::{parser::parse, span::FileSet, visit::NodeKind},
    types::check_package,
};
use std::sync::atomic::{AtomicUsize, Ordering};

fn with_unit<R>(src: &str, f: impl FnOnce(Unit<'_>, &FileSet) -> R) -> R {
    let mut fset = FileSet::new();
    let (file, _) = parse(&mut fset, "demo.gop", src.as_bytes());
    let file = file.expect("tree");
    let mut arena = Arena::new();
    let checked = check_package(&mut arena, "example.com/demo", &[&file]);
    let files = [&file];
    let unit = Unit {
        files: &files,
        arena: &arena,
        info: &checked.info,
        pkg: checked.pkg,
    };
    f(unit, &fset)
}

static COUNTED_RUNS: AtomicUsize = AtomicUsize::new(0);

fn counted<'a, 'p>(_: &'p Pass<'a, 'p>) -> Result<Output<'a>, AnalysisError> {
    COUNTED_RUNS.fetch_add(1, Ordering::SeqCst);
    Ok(Output::Other(Box::new(42u32)))
}

fn failing<'a, 'p>(pass: &'p Pass<'a, 'p>) -> Result<Output<'a>, AnalysisError> {
    Err(AnalysisError::Failed {
        analyzer: pass.analyzer.name.into(),
        message: "malformed input".into(),
    })
}

fn reads_count<'a, 'p>(pass: &'p Pass<'a, 'p>) -> Result<Output<'a>, AnalysisError> {
    let Output::Other(value) = pass.result_of(&COUNTED)? else {
        return Err(AnalysisError::Failed {
            analyzer: pass.analyzer.name.into(),
            message: "unexpected result".into(),
        });
    };
    if value.downcast_ref::<u32>() == Some(&42) {
        pass.report(Diagnostic {
            pos: Pos::NONE,
            end: Pos::NONE,
            category: pass.analyzer.name,
            message: "saw 42".into(),
        });
    }
    Ok(Output::None)
}

fn nothing<'a, 'p>(_: &'p Pass<'a, 'p>) -> Result<Output<'a>, AnalysisError> {
    Ok(Output::None)
}

static COUNTED: Analyzer = Analyzer {
    name: "counted",
    doc: "",
    url: "",
    requires: &[],
    run: counted,
};

static READER_A: Analyzer = Analyzer {
    name: "reader_a",
    doc: "",
    url: "",
    requires: &[&COUNTED],
    run: reads_count,
};

static READER_B: Analyzer = Analyzer {
    name: "reader_b",
    doc: "",
    url: "",
    requires: &[&COUNTED],
    run: reads_count,
};

static FAILING: Analyzer = Analyzer {
    name: "failing",
    doc: "",
    url: "",
    requires: &[],
    run: failing,
};

static DEPENDENT: Analyzer = Analyzer {
    name: "dependent",
    doc: "",
    url: "",
    requires: &[&FAILING],
    run: nothing,
};

static TRANSITIVE: Analyzer = Analyzer {
    name: "transitive",
    doc: "",
    url: "",
    requires: &[&DEPENDENT],
    run: nothing,
};

#[test]
fn appends_reports_calls_without_values() {
    let src = "package demo\n\nfunc f(xs []int) {\n\txs = append(xs)\n\txs = append(xs, 1)\n\t_ = xs\n}\n";
    with_unit(src, |unit, fset| {
        let outcomes = run(&[&passes::appends::ANALYZER], unit);
        let names: Vec<_> = outcomes.iter().map(|o| o.analyzer.name).collect();
        assert_eq!(names, vec!["inspect", "appends"]);
        assert!(outcomes.iter().all(Outcome::succeeded));
        let diagnostics = &outcomes[1].diagnostics;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "append with no values");
        assert_eq!(diagnostics[0].category, "appends");
        let position = fset.position(diagnostics[0].pos);
        assert_eq!((position.line, position.column), (4, 7));
    });
}

#[test]
fn appends_ignores_user_defined_append() {
    let src = "package demo\n\nfunc append(xs []int) []int { return xs }\n\nfunc f(xs []int) []int {\n\treturn append(xs)\n}\n";
    with_unit(src, |unit, _| {
        let outcomes = run(&[&passes::appends::ANALYZER], unit);
        assert!(outcomes[1].succeeded());
        assert!(outcomes[1].diagnostics.is_empty());
    });
}

#[test]
fn shared_prerequisites_run_once() {
    COUNTED_RUNS.store(0, Ordering::SeqCst);
    with_unit("package demo\n", |unit, _| {
        let outcomes = run(&[&READER_A, &READER_B], unit);
        let names: Vec<_> = outcomes.iter().map(|o| o.analyzer.name).collect();
        assert_eq!(names, vec!["counted", "reader_a", "reader_b"]);
        assert_eq!(outcomes[1].diagnostics[0].message, "saw 42");
        assert_eq!(outcomes[2].diagnostics.len(), 1);
    });
    assert_eq!(COUNTED_RUNS.load(Ordering::SeqCst), 1);
}

#[test]
fn failures_only_skip_dependents() {
    with_unit("package demo\n", |unit, _| {
        let outcomes = run(&[&TRANSITIVE, &passes::appends::ANALYZER], unit);
        let status: Vec<_> = outcomes
            .iter()
            .map(|o| match &o.status {
                Status::Done => format!("{} done", o.analyzer.name),
                Status::Failed(err) => format!("{} failed: {err}", o.analyzer.name),
                Status::Skipped { prerequisite } => format!("{} skipped for {prerequisite}", o.analyzer.name),
            })
            .collect();
        assert_eq!(
            status,
            vec![
                "failing failed: Analyzer `failing` failed: malformed input",
                "dependent skipped for failing",
                "transitive skipped for dependent",
                "inspect done",
                "appends done",
            ]
        );
    });
}

#[test]
fn shipped_analyzers_are_documented() {
    for analyzer in passes::all() {
        let doc = analyzer.documentation().expect("documentation");
        assert!(doc.starts_with(&format!("{}:", analyzer.name)));
    }
    assert!(passes::by_name("appends").is_some());
    assert!(passes::by_name("printf").is_none());
}

#[test]
fn inspector_filters_and_tracks_ancestors() {
    let src = "package demo\n\nfunc f() {\n\tg(h(1))\n}\n\nfunc g(x int) {}\n\nfunc h(x int) int { return x }\n";
    let mut fset = FileSet::new();
    let (file, _) = parse(&mut fset, "demo.gop", src.as_bytes());
    let file = file.expect("tree");
    let inspector = Inspector::new(&[&file]);

    let mut calls = 0;
    inspector.preorder(&[NodeKind::CallExpr], |_| calls += 1);
    assert_eq!(calls, 2);

    let mut funcs = Vec::new();
    inspector.nodes(&[NodeKind::FuncDecl, NodeKind::CallExpr], |node, push| {
        if push {
            if let Node::FuncDecl(func) = node {
                funcs.push(func.name.name.clone());
            }
        }
        false
    });
    assert_eq!(funcs, vec!["f", "g", "h"]);

    let mut depths = Vec::new();
    inspector.with_stack(&[NodeKind::CallExpr], |node, push, stack| {
        if push {
            assert_eq!(stack.last().map(|n| n.id()), Some(node.id()));
            assert!(matches!(stack[0], Node::File(_)));
            depths.push(stack.len());
        }
        true
    });
    assert_eq!(depths.len(), 2);
    assert!(depths[1] > depths[0]);
}
