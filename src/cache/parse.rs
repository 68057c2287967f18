use super::{
    diff,
    fix::{self, Fix, SourceRepair},
};
use crate::{
    error::{CancelToken, Error, ExtResult},
    language::{
        ast::{Decl, DeclKind, File, NodeId},
        errors::SyntaxErrors,
        lexer::lex,
        parser,
        span::{FileSet, TokenFile},
        token::TokenKind,
    },
    lsp::Mapper,
};
use std::{path::PathBuf, sync::Arc};

/// Upper bound on source-repair attempts for one buffer.
pub const MAX_REPAIR_ITERATIONS: usize = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParseMode {
    #[default]
    Full,
    /// Keep only the package clause and imports.
    Header,
}

/// Source of a file's bytes.
pub trait FileHandle {
    fn name(&self) -> &str;
    fn content(&self) -> ExtResult<Arc<[u8]>>;
}

#[derive(Clone, Debug)]
pub struct DiskFile {
    path: PathBuf,
    name: String,
}

impl DiskFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

impl FileHandle for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn content(&self) -> ExtResult<Arc<[u8]>> {
        std::fs::read(&self.path)
            .map(Arc::from)
            .map_err(|source| Error::Io {
                path: self.path.clone(),
                source,
            })
    }
}

/// Unsaved editor contents.
#[derive(Clone, Debug)]
pub struct Overlay {
    pub name: String,
    pub content: Arc<[u8]>,
}

impl FileHandle for Overlay {
    fn name(&self) -> &str {
        &self.name
    }

    fn content(&self) -> ExtResult<Arc<[u8]>> {
        Ok(Arc::clone(&self.content))
    }
}

/// Logged when the repair loop reaches its last permitted attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepairDiagnostic {
    pub iteration: usize,
    pub message: String,
    pub diff: String,
}

/// A parsed, possibly repaired, file. `parse_err` always holds the errors of
/// the first parse of the original buffer.
#[derive(Clone, Debug)]
pub struct ParsedFile {
    pub name: String,
    pub mode: ParseMode,
    pub src: Arc<[u8]>,
    pub file: File,
    pub tok: Arc<TokenFile>,
    pub mapper: Mapper,
    pub fixed_src: bool,
    pub fixed_ast: bool,
    /// True when the parser produced no tree and `file` is an empty stand-in.
    pub synthetic: bool,
    pub parse_err: Option<SyntaxErrors>,
    pub diagnostics: Vec<RepairDiagnostic>,
    pub fixes: Vec<Fix>,
}

impl ParsedFile {
    pub fn is_clean(&self) -> bool {
        self.parse_err.is_none()
    }
}

/// Reads `handle` and parses it with the default repairs.
pub fn parse_file(
    cancel: &CancelToken,
    fset: &mut FileSet,
    handle: &dyn FileHandle,
    mode: ParseMode,
) -> ExtResult<ParsedFile> {
    let content = handle.content()?;
    cancel.check()?;
    Ok(parse_src(fset, handle.name(), &content, mode, false, &fix::DefaultRepairs))
}

/// Parses `src`, repairing the tree and then the buffer when the strict
/// parse fails. Always yields a tree.
pub fn parse_src(
    fset: &mut FileSet,
    name: &str,
    src: &[u8],
    mode: ParseMode,
    purge_bodies: bool,
    repair: &dyn SourceRepair,
) -> ParsedFile {
    let _span = tracing::debug_span!("parse_src", file = name).entered();
    let mut src: Arc<[u8]> = if purge_bodies {
        Arc::from(purge_func_bodies(src))
    } else {
        Arc::from(src)
    };

    let (file, errors) = parser::parse(fset, name, &src);
    let parse_err = (!errors.is_empty()).then(|| errors.clone());
    let mut tok = token_file(fset, file.as_ref(), name, &src);
    let synthetic = file.is_none();
    let mut file = file.unwrap_or_else(|| empty_file(&tok));

    let mut fixed_src = false;
    let mut fixed_ast = false;
    let mut fixes = Vec::new();
    let mut diagnostics = Vec::new();
    if parse_err.is_some() && !synthetic {
        let ast_fixes = fix::fix_ast(&mut file);
        fixed_ast = !ast_fixes.is_empty();
        fixes.extend(ast_fixes);

        let mut errors = errors;
        for iteration in 0..MAX_REPAIR_ITERATIONS {
            let Some((new_src, src_fix)) = repair.repair(&file, &tok, &src, &errors) else {
                break;
            };

            if iteration == MAX_REPAIR_ITERATIONS - 1 {
                let unified = diff::unified(
                    "before",
                    "after",
                    &String::from_utf8_lossy(&src),
                    &String::from_utf8_lossy(&new_src),
                );
                tracing::warn!(file = tok.name(), "source repair loop - last diff:\n{unified}");
                diagnostics.push(RepairDiagnostic {
                    iteration,
                    message: format!("source repair did not converge after {MAX_REPAIR_ITERATIONS} attempts"),
                    diff: unified,
                });
            }

            let (new_file, new_errors) = parser::parse(fset, name, &new_src);
            let Some(new_file) = new_file else {
                tracing::debug!(file = name, iteration, "source repair made no progress");
                break;
            };
            file = new_file;
            src = Arc::from(new_src);
            tok = token_file(fset, Some(&file), name, &src);
            tracing::debug!(file = name, iteration, fix = ?src_fix.kind, "adopted source repair");
            fixes.push(Fix::Source(src_fix));
            fixed_src = true;

            if new_errors.is_empty() {
                break;
            }
            errors = new_errors;
            let ast_fixes = fix::fix_ast(&mut file);
            fixed_ast = !ast_fixes.is_empty();
            fixes.extend(ast_fixes);
        }
    }

    if mode == ParseMode::Header {
        file.decls.retain(|decl| matches!(decl, Decl::Gen(gen) if gen.tok == DeclKind::Import));
    }

    ParsedFile {
        name: name.to_string(),
        mode,
        mapper: Mapper::new(name, Arc::clone(&src)),
        src,
        file,
        tok,
        fixed_src,
        fixed_ast,
        synthetic,
        parse_err,
        diagnostics,
        fixes,
    }
}

/// Line table for the parsed buffer: the one registered for the package
/// clause, else the one covering the file start, else a fresh registration.
fn token_file(fset: &mut FileSet, file: Option<&File>, name: &str, src: &[u8]) -> Arc<TokenFile> {
    file.and_then(|f| fset.file(f.package))
        .or_else(|| file.and_then(|f| fset.file(f.pos)))
        .unwrap_or_else(|| fset.add_file(name, src))
}

fn empty_file(tok: &TokenFile) -> File {
    File {
        id: NodeId {
            file: tok.base(),
            index: 0,
        },
        pos: tok.pos(0),
        end: tok.pos(tok.size()),
        package: crate::language::span::Pos::NONE,
        name: None,
        doc: None,
        decls: Vec::new(),
    }
}

/// Blanks the bodies of top-level functions, keeping every newline so
/// offsets and line numbers are unchanged.
pub fn purge_func_bodies(src: &[u8]) -> Vec<u8> {
    let Ok(text) = std::str::from_utf8(src) else {
        return src.to_vec();
    };
    let tokens = lex(text).tokens;
    let mut out = src.to_vec();
    let mut depth = 0usize;
    let mut parens = 0usize;
    let mut in_func = false;
    let mut idx = 0;
    while idx < tokens.len() {
        let token = &tokens[idx];
        match token.kind {
            TokenKind::Func if depth == 0 => {
                in_func = true;
                parens = 0;
            }
            TokenKind::LParen | TokenKind::LBrack => parens += 1,
            TokenKind::RParen | TokenKind::RBrack => parens = parens.saturating_sub(1),
            TokenKind::LBrace => {
                let after_type_keyword = idx > 0
                    && matches!(tokens[idx - 1].kind, TokenKind::Struct | TokenKind::Interface);
                if in_func && depth == 0 && parens == 0 && !after_type_keyword {
                    let mut nested = 1usize;
                    let mut close = idx + 1;
                    while close < tokens.len() {
                        match tokens[close].kind {
                            TokenKind::LBrace => nested += 1,
                            TokenKind::RBrace => {
                                nested -= 1;
                                if nested == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        }
                        close += 1;
                    }
                    let end = tokens.get(close).map(|t| t.span.start).unwrap_or(out.len());
                    for byte in &mut out[token.span.end..end] {
                        if *byte != b'\n' {
                            *byte = b' ';
                        }
                    }
                    in_func = false;
                    idx = close + 1;
                    continue;
                }
                depth += 1;
            }
            TokenKind::RBrace => depth = depth.saturating_sub(1),
            _ => {}
        }
        idx += 1;
    }
    out
}
