//! Reports `append` calls that append nothing.

use super::inspect;
use crate::{
    analysis::{AnalysisError, Analyzer, Output, Pass},
    language::{
        ast::ExprKind,
        visit::{Node, NodeKind},
    },
    types::{BuiltinFunc, ObjectKind},
};

const DOC: &str = "# Analyzer appends

appends: check for missing values after append

This checker reports calls to append that pass no values to be appended
to the slice.

\ts := []string{\"a\", \"b\", \"c\"}
\t_ = append(s)

Such calls are always no-ops and often indicate an underlying mistake.
";

pub static ANALYZER: Analyzer = Analyzer {
    name: "appends",
    doc: DOC,
    url: "https://pkg.go.dev/golang.org/x/tools/go/analysis/passes/appends",
    requires: &[&inspect::ANALYZER],
    run,
};

fn run<'a, 'p>(pass: &'p Pass<'a, 'p>) -> Result<Output<'a>, AnalysisError> {
    let inspector = pass.inspector()?;
    inspector.preorder(&[NodeKind::CallExpr], |node| {
        let Node::Expr(call) = node else { return };
        let ExprKind::Call { fun, args, .. } = &call.kind else {
            return;
        };
        let Some(ident) = fun.as_ident() else { return };
        if ident.name != "append" || args.len() != 1 {
            return;
        }
        let builtin = pass
            .info
            .uses
            .get(&ident.id)
            .map(|obj| &pass.arena.object(*obj).kind);
        if matches!(builtin, Some(ObjectKind::Builtin(BuiltinFunc::Append))) {
            pass.report_rangef(node, format_args!("append with no values"));
        }
    });
    Ok(Output::None)
}
