//! Static-analysis passes over type-checked files.

mod doc;
mod inspector;
pub mod passes;

pub use doc::extract_doc;
pub use inspector::Inspector;

use crate::{
    language::{ast::File, span::Pos, visit::Node},
    types::{Arena, Info, PackageId},
};
use rustc_hash::FxHashMap;
use std::{any::Any, cell::RefCell, fmt};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Analyzer `{analyzer}` has bad documentation: {message}")]
    Doc { analyzer: String, message: String },
    #[error("Analyzer `{analyzer}` requires the result of `{required}`")]
    MissingResult { analyzer: String, required: String },
    #[error("Analyzer `{analyzer}` failed: {message}")]
    Failed { analyzer: String, message: String },
}

/// What an analyzer hands to the analyzers that require it.
pub enum Output<'a> {
    None,
    Inspector(Inspector<'a>),
    Other(Box<dyn Any>),
}

impl fmt::Debug for Output<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::None => f.write_str("None"),
            Output::Inspector(inspector) => write!(f, "Inspector({} nodes)", inspector.len()),
            Output::Other(_) => f.write_str("Other(..)"),
        }
    }
}

pub type RunFn = for<'a, 'p> fn(&'p Pass<'a, 'p>) -> Result<Output<'a>, AnalysisError>;

/// One bug-pattern check.
pub struct Analyzer {
    pub name: &'static str,
    /// Raw documentation holding a `# Analyzer <name>` section.
    pub doc: &'static str,
    pub url: &'static str,
    pub requires: &'static [&'static Analyzer],
    pub run: RunFn,
}

impl Analyzer {
    pub fn documentation(&self) -> Result<String, AnalysisError> {
        extract_doc(self.doc, self.name)
    }
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer").field("name", &self.name).finish()
    }
}

/// A reported problem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub pos: Pos,
    pub end: Pos,
    pub category: &'static str,
    pub message: String,
}

/// The type-checked package an analysis run works on.
#[derive(Clone, Copy, Debug)]
pub struct Unit<'a> {
    pub files: &'a [&'a File],
    pub arena: &'a Arena,
    pub info: &'a Info,
    pub pkg: PackageId,
}

/// Everything one analyzer sees while it runs.
pub struct Pass<'a, 'p> {
    pub analyzer: &'static Analyzer,
    pub files: &'a [&'a File],
    pub arena: &'a Arena,
    pub info: &'a Info,
    pub pkg: PackageId,
    results: &'p FxHashMap<&'static str, Output<'a>>,
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl<'a, 'p> Pass<'a, 'p> {
    pub fn result_of(&self, analyzer: &Analyzer) -> Result<&'p Output<'a>, AnalysisError> {
        self.results
            .get(analyzer.name)
            .ok_or_else(|| AnalysisError::MissingResult {
                analyzer: self.analyzer.name.to_string(),
                required: analyzer.name.to_string(),
            })
    }

    pub fn inspector(&self) -> Result<&'p Inspector<'a>, AnalysisError> {
        match self.result_of(&passes::inspect::ANALYZER)? {
            Output::Inspector(inspector) => Ok(inspector),
            _ => Err(AnalysisError::MissingResult {
                analyzer: self.analyzer.name.to_string(),
                required: passes::inspect::ANALYZER.name.to_string(),
            }),
        }
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    pub fn report_rangef(&self, node: Node<'_>, message: fmt::Arguments<'_>) {
        self.report(Diagnostic {
            pos: node.pos(),
            end: node.end(),
            category: self.analyzer.name,
            message: message.to_string(),
        });
    }
}

#[derive(Debug)]
pub enum Status {
    Done,
    Failed(AnalysisError),
    /// A prerequisite failed or was skipped.
    Skipped { prerequisite: &'static str },
}

#[derive(Debug)]
pub struct Outcome {
    pub analyzer: &'static Analyzer,
    pub status: Status,
    pub diagnostics: Vec<Diagnostic>,
}

impl Outcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, Status::Done)
    }
}

/// Runs `analyzers` and everything they require, prerequisites first and
/// each analyzer once. A failing analyzer only takes down the analyzers that
/// depend on it.
pub fn run(analyzers: &[&'static Analyzer], unit: Unit<'_>) -> Vec<Outcome> {
    let mut order: Vec<&'static Analyzer> = Vec::new();
    for &analyzer in analyzers {
        schedule(analyzer, &mut order);
    }

    let mut results: FxHashMap<&'static str, Output<'_>> = FxHashMap::default();
    let mut outcomes: Vec<Outcome> = Vec::new();
    for analyzer in order {
        let blocked = analyzer.requires.iter().find(|req| {
            !outcomes
                .iter()
                .any(|o| std::ptr::eq(o.analyzer, **req) && o.succeeded())
        });
        if let Some(req) = blocked {
            tracing::debug!(analyzer = analyzer.name, prerequisite = req.name, "skipping analyzer");
            outcomes.push(Outcome {
                analyzer,
                status: Status::Skipped { prerequisite: req.name },
                diagnostics: Vec::new(),
            });
            continue;
        }

        let pass = Pass {
            analyzer,
            files: unit.files,
            arena: unit.arena,
            info: unit.info,
            pkg: unit.pkg,
            results: &results,
            diagnostics: RefCell::new(Vec::new()),
        };
        let result = (analyzer.run)(&pass);
        let diagnostics = pass.diagnostics.into_inner();
        match result {
            Ok(output) => {
                tracing::debug!(analyzer = analyzer.name, diagnostics = diagnostics.len(), "analyzer done");
                results.insert(analyzer.name, output);
                outcomes.push(Outcome {
                    analyzer,
                    status: Status::Done,
                    diagnostics,
                });
            }
            Err(err) => {
                tracing::warn!(analyzer = analyzer.name, error = %err, "analyzer failed");
                outcomes.push(Outcome {
                    analyzer,
                    status: Status::Failed(err),
                    diagnostics,
                });
            }
        }
    }
    outcomes
}

fn schedule(analyzer: &'static Analyzer, order: &mut Vec<&'static Analyzer>) {
    if order.iter().any(|a| std::ptr::eq(*a, analyzer)) {
        return;
    }
    for req in analyzer.requires {
        schedule(req, order);
    }
    order.push(analyzer);
}

#[cfg(test)]
mod tests;
