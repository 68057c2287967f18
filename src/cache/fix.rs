use crate::language::{
    ast::{File, StmtKind},
    errors::SyntaxErrors,
    lexer::lex,
    span::{Pos, TokenFile},
    token::TokenKind,
    visit::for_each_stmt_mut,
};

/// One repair applied while producing a parse result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fix {
    /// A `Bad` statement turned into an explicit empty statement over the
    /// same range.
    BadStmt { pos: Pos, end: Pos },
    Source(SourceFix),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFixKind {
    DanglingSelector,
    UnbalancedParen,
    UnbalancedBrace,
    Custom(&'static str),
}

/// A source edit: `inserted` was placed at byte `offset`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFix {
    pub kind: SourceFixKind,
    pub offset: usize,
    pub inserted: String,
}

impl SourceFix {
    pub fn apply(&self, src: &[u8]) -> Vec<u8> {
        let offset = self.offset.min(src.len());
        let mut out = Vec::with_capacity(src.len() + self.inserted.len());
        out.extend_from_slice(&src[..offset]);
        out.extend_from_slice(self.inserted.as_bytes());
        out.extend_from_slice(&src[offset..]);
        out
    }
}

/// Strategy for edits that make an unparsable buffer parse further.
pub trait SourceRepair {
    /// Returns the edited buffer and the fix applied, or `None` when there is
    /// nothing left to try.
    fn repair(&self, file: &File, tok: &TokenFile, src: &[u8], errors: &SyntaxErrors) -> Option<(Vec<u8>, SourceFix)>;
}

/// Rewrites every `Bad` statement into an explicit empty statement so the
/// rest of the tree type-checks.
pub fn fix_ast(file: &mut File) -> Vec<Fix> {
    let mut fixes = Vec::new();
    for_each_stmt_mut(file, &mut |stmt| {
        if matches!(stmt.kind, StmtKind::Bad) {
            stmt.kind = StmtKind::Empty { implicit: false };
            fixes.push(Fix::BadStmt {
                pos: stmt.pos,
                end: stmt.end,
            });
        }
    });
    fixes
}

/// Built-in repairs, tried in order: dangling selectors, unbalanced
/// parentheses on the first erroneous line, missing closing braces.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultRepairs;

impl SourceRepair for DefaultRepairs {
    fn repair(&self, _file: &File, tok: &TokenFile, src: &[u8], errors: &SyntaxErrors) -> Option<(Vec<u8>, SourceFix)> {
        let text = std::str::from_utf8(src).ok()?;
        let lexed = lex(text);
        let tokens: Vec<_> = lexed
            .tokens
            .iter()
            .filter(|t| !matches!(t.kind, TokenKind::Illegal(_)))
            .collect();

        let dangling = tokens.windows(2).find_map(|pair| {
            let (dot, next) = (pair[0], pair[1]);
            (dot.kind == TokenKind::Period && !matches!(next.kind, TokenKind::Identifier(_) | TokenKind::LParen))
                .then_some(dot.span.end)
        });
        if let Some(offset) = dangling {
            return Some(Self::fix(src, SourceFixKind::DanglingSelector, offset, "_"));
        }

        if let Some(error) = errors.first() {
            let line = tok.line_of(error.span.start.min(src.len()));
            let open = tokens
                .iter()
                .filter(|t| tok.line_of(t.span.start) == line)
                .fold(0i32, |depth, t| match t.kind {
                    TokenKind::LParen => depth + 1,
                    TokenKind::RParen => depth - 1,
                    _ => depth,
                });
            if open > 0 {
                let end = tok
                    .line_start(line + 1)
                    .map(|next| next.saturating_sub(1))
                    .unwrap_or(src.len());
                let end = text[..end].trim_end_matches(['\r', '\n']).len();
                let closing = ")".repeat(open as usize);
                return Some(Self::fix(src, SourceFixKind::UnbalancedParen, end, &closing));
            }
        }

        let braces = tokens.iter().fold(0i32, |depth, t| match t.kind {
            TokenKind::LBrace => depth + 1,
            TokenKind::RBrace => depth - 1,
            _ => depth,
        });
        if braces > 0 {
            let closing = "\n}".repeat(braces as usize);
            return Some(Self::fix(src, SourceFixKind::UnbalancedBrace, src.len(), &closing));
        }
        None
    }
}

impl DefaultRepairs {
    fn fix(src: &[u8], kind: SourceFixKind, offset: usize, inserted: &str) -> (Vec<u8>, SourceFix) {
        let fix = SourceFix {
            kind,
            offset,
            inserted: inserted.to_string(),
        };
        (fix.apply(src), fix)
    }
}
