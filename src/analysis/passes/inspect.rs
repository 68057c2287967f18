//! Builds the shared [`Inspector`] index other analyzers replay.

use crate::analysis::{AnalysisError, Analyzer, Inspector, Output, Pass};

const DOC: &str = "# Analyzer inspect

inspect: optimize AST traversal for later passes

This analyzer computes no diagnostics. Its result is an Inspector over the
files of the package that other analyzers use to find nodes of particular
kinds without walking every tree again.
";

pub static ANALYZER: Analyzer = Analyzer {
    name: "inspect",
    doc: DOC,
    url: "",
    requires: &[],
    run,
};

fn run<'a, 'p>(pass: &'p Pass<'a, 'p>) -> Result<Output<'a>, AnalysisError> {
    Ok(Output::Inspector(Inspector::new(pass.files)))
}
