use crate::{analysis, cache::ParsedFile, language::errors::SyntaxError};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: &SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.message.clone(),
            label: err.label.clone(),
        }
    }
}

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(severity(Warning))]
pub struct FindingDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{category}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    category: String,
}

fn named_source(file: &ParsedFile) -> NamedSource<String> {
    NamedSource::new(file.name.clone(), String::from_utf8_lossy(&file.src).into_owned())
}

/// Syntax errors of the first parse of `file`, ready for rendering.
pub fn syntax_diagnostics(file: &ParsedFile) -> Vec<SyntaxDiagnostic> {
    let Some(errors) = &file.parse_err else {
        return Vec::new();
    };
    let src = named_source(file);
    errors
        .errors
        .iter()
        .map(|err| SyntaxDiagnostic::from_error(src.clone(), err))
        .collect()
}

/// An analyzer finding located in `file`, or `None` when it points elsewhere.
pub fn finding_diagnostic(file: &ParsedFile, finding: &analysis::Diagnostic, url: &str) -> Option<FindingDiagnostic> {
    let start = file.tok.offset(finding.pos)?;
    let end = file.tok.offset(finding.end).unwrap_or(start).max(start);
    Some(FindingDiagnostic {
        src: named_source(file),
        span: (start, end - start).into(),
        help: (!url.is_empty()).then(|| format!("see {url}")),
        message: finding.message.clone(),
        category: finding.category.to_string(),
    })
}

pub fn render<D>(diagnostic: D) -> String
where
    D: Diagnostic + Send + Sync + 'static,
{
    format!("{:?}", Report::new(diagnostic))
}

pub fn emit<D>(diagnostic: D)
where
    D: Diagnostic + Send + Sync + 'static,
{
    eprintln!("{}", render(diagnostic));
}
