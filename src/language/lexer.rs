use crate::language::{
    span::Span,
    token::{Token, TokenKind},
};

#[derive(Debug, Clone)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub span: Span,
    pub text: String,
}

impl Comment {
    /// Comment body without the `//` or `/* */` markers.
    pub fn body(&self) -> &str {
        if let Some(rest) = self.text.strip_prefix("//") {
            rest.strip_prefix(' ').unwrap_or(rest)
        } else {
            self.text
                .strip_prefix("/*")
                .and_then(|rest| rest.strip_suffix("*/"))
                .unwrap_or(&self.text)
                .trim()
        }
    }
}

#[derive(Debug, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
    pub errors: Vec<LexError>,
}

/// Tokenizes `source`, inserting `;` tokens at line ends the way the host
/// language does. Lexing never stops early: bad input becomes `Illegal`
/// tokens plus a recorded error.
pub fn lex(source: &str) -> Lexed {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::str::Chars<'a>,
    current: Option<char>,
    offset: usize,
    insert_semi: bool,
    out: Lexed,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        let mut chars = src.chars();
        let current = chars.next();
        Self {
            src,
            chars,
            current,
            offset: 0,
            insert_semi: false,
            out: Lexed::default(),
        }
    }

    fn run(mut self) -> Lexed {
        while let Some(ch) = self.current {
            match ch {
                '\n' => {
                    if self.insert_semi {
                        self.push_token(TokenKind::Semi, self.offset, self.offset + 1);
                    }
                    self.bump();
                }
                '/' if self.peek() == Some('/') => self.eat_line_comment(),
                '/' if self.peek() == Some('*') => self.eat_block_comment(),
                ch if ch.is_whitespace() => {
                    self.bump();
                }
                ch if ch.is_alphabetic() || ch == '_' => self.lex_identifier(),
                ch if ch.is_ascii_digit() => self.lex_number(),
                '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.lex_number(),
                '"' => self.lex_string(),
                '`' => self.lex_raw_string(),
                '\'' => self.lex_char(),
                _ => self.lex_symbol(),
            }
        }
        if self.insert_semi {
            self.push_token(TokenKind::Semi, self.offset, self.offset);
        }
        self.push_token(TokenKind::Eof, self.offset, self.offset);
        self.out
    }

    fn bump(&mut self) -> Option<char> {
        if let Some(ch) = self.current {
            self.offset += ch.len_utf8();
        }
        self.current = self.chars.next();
        self.current
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn push_token(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.insert_semi = kind.ends_statement();
        self.out.tokens.push(Token {
            kind,
            span: Span::new(start, end),
        });
    }

    fn error(&mut self, start: usize, end: usize, message: impl Into<String>) {
        self.out.errors.push(LexError {
            message: message.into(),
            span: Span::new(start, end),
        });
    }

    fn eat_line_comment(&mut self) {
        let start = self.offset;
        while let Some(ch) = self.current {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
        self.push_comment(start);
    }

    fn eat_block_comment(&mut self) {
        let start = self.offset;
        self.bump();
        self.bump();
        let mut saw_newline = false;
        loop {
            match self.current {
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    self.bump();
                    break;
                }
                Some(ch) => {
                    saw_newline |= ch == '\n';
                    self.bump();
                }
                None => {
                    self.error(start, self.offset, "comment not terminated");
                    break;
                }
            }
        }
        self.push_comment(start);
        if saw_newline && self.insert_semi {
            self.push_token(TokenKind::Semi, start, start);
        }
    }

    fn push_comment(&mut self, start: usize) {
        self.out.comments.push(Comment {
            span: Span::new(start, self.offset),
            text: self.src[start..self.offset].to_string(),
        });
    }

    fn lex_identifier(&mut self) {
        let start = self.offset;
        while let Some(ch) = self.current {
            if ch.is_alphanumeric() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let slice = &self.src[start..self.offset];
        let kind = TokenKind::keyword(slice).unwrap_or_else(|| TokenKind::Identifier(slice.into()));
        self.push_token(kind, start, self.offset);
    }

    fn lex_number(&mut self) {
        let start = self.offset;
        let mut is_float = false;
        if self.current == Some('0') && matches!(self.peek(), Some('x' | 'X' | 'b' | 'B' | 'o' | 'O')) {
            self.bump();
            self.bump();
            while let Some(ch) = self.current {
                if ch.is_ascii_hexdigit() || ch == '_' {
                    self.bump();
                } else {
                    break;
                }
            }
        } else {
            self.eat_digits();
            if self.current == Some('.') {
                is_float = true;
                self.bump();
                self.eat_digits();
            }
            if matches!(self.current, Some('e' | 'E')) {
                is_float = true;
                self.bump();
                if matches!(self.current, Some('+' | '-')) {
                    self.bump();
                }
                self.eat_digits();
            }
        }
        let text = self.src[start..self.offset].to_string();
        let kind = if is_float {
            TokenKind::Float(text)
        } else {
            TokenKind::Int(text)
        };
        self.push_token(kind, start, self.offset);
    }

    fn eat_digits(&mut self) {
        while let Some(ch) = self.current {
            if ch.is_ascii_digit() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn lex_string(&mut self) {
        let start = self.offset;
        self.bump();
        loop {
            match self.current {
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('\n') | None => {
                    self.error(start, self.offset, "string literal not terminated");
                    break;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        let text = self.src[start..self.offset].to_string();
        self.push_token(TokenKind::String(text), start, self.offset);
    }

    fn lex_raw_string(&mut self) {
        let start = self.offset;
        self.bump();
        loop {
            match self.current {
                Some('`') => {
                    self.bump();
                    break;
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    self.error(start, self.offset, "raw string literal not terminated");
                    break;
                }
            }
        }
        let text = self.src[start..self.offset].to_string();
        self.push_token(TokenKind::String(text), start, self.offset);
    }

    fn lex_char(&mut self) {
        let start = self.offset;
        self.bump();
        loop {
            match self.current {
                Some('\'') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('\n') | None => {
                    self.error(start, self.offset, "rune literal not terminated");
                    break;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        let text = self.src[start..self.offset].to_string();
        self.push_token(TokenKind::Char(text), start, self.offset);
    }

    fn lex_symbol(&mut self) {
        const SYMBOLS: &[(&str, TokenKind)] = &[
            ("&^=", TokenKind::AndNotAssign),
            ("<<=", TokenKind::ShlAssign),
            (">>=", TokenKind::ShrAssign),
            ("...", TokenKind::Ellipsis),
            ("&^", TokenKind::AndNot),
            ("+=", TokenKind::AddAssign),
            ("-=", TokenKind::SubAssign),
            ("*=", TokenKind::MulAssign),
            ("/=", TokenKind::QuoAssign),
            ("%=", TokenKind::RemAssign),
            ("&=", TokenKind::AndAssign),
            ("|=", TokenKind::OrAssign),
            ("^=", TokenKind::XorAssign),
            ("<<", TokenKind::Shl),
            (">>", TokenKind::Shr),
            ("&&", TokenKind::LAnd),
            ("||", TokenKind::LOr),
            ("<-", TokenKind::Arrow),
            ("++", TokenKind::Inc),
            ("--", TokenKind::Dec),
            ("==", TokenKind::EqEq),
            ("!=", TokenKind::NotEq),
            ("<=", TokenKind::LtEq),
            (">=", TokenKind::GtEq),
            (":=", TokenKind::Define),
            ("+", TokenKind::Plus),
            ("-", TokenKind::Minus),
            ("*", TokenKind::Star),
            ("/", TokenKind::Slash),
            ("%", TokenKind::Percent),
            ("&", TokenKind::Amp),
            ("|", TokenKind::Pipe),
            ("^", TokenKind::Caret),
            ("<", TokenKind::Lt),
            (">", TokenKind::Gt),
            ("=", TokenKind::Assign),
            ("!", TokenKind::Not),
            ("(", TokenKind::LParen),
            ("[", TokenKind::LBrack),
            ("{", TokenKind::LBrace),
            (",", TokenKind::Comma),
            (".", TokenKind::Period),
            (")", TokenKind::RParen),
            ("]", TokenKind::RBrack),
            ("}", TokenKind::RBrace),
            (";", TokenKind::Semi),
            (":", TokenKind::Colon),
            ("~", TokenKind::Tilde),
        ];

        let start = self.offset;
        let rest = &self.src[start..];
        for (text, kind) in SYMBOLS {
            if rest.starts_with(text) {
                for _ in 0..text.len() {
                    self.bump();
                }
                self.push_token(kind.clone(), start, self.offset);
                return;
            }
        }

        let ch = self.current.unwrap_or_default();
        self.bump();
        self.error(start, self.offset, format!("invalid character {ch:?}"));
        self.push_token(TokenKind::Illegal(ch.to_string()), start, self.offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn inserts_semicolons_at_line_ends() {
        let kinds = kinds("x := 1\nreturn\n");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier("x".into()),
                TokenKind::Define,
                TokenKind::Int("1".into()),
                TokenKind::Semi,
                TokenKind::Return,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn no_semicolon_after_operator_or_open_brace() {
        let kinds = kinds("a +\nb {\n}");
        assert!(!kinds[..3].contains(&TokenKind::Semi));
        assert_eq!(kinds[kinds.len() - 2], TokenKind::Semi);
    }

    #[test]
    fn records_errors_without_stopping() {
        let lexed = lex("a @ b");
        assert_eq!(lexed.errors.len(), 1);
        assert!(lexed
            .tokens
            .iter()
            .any(|t| t.kind == TokenKind::Identifier("b".into())));
    }

    #[test]
    fn keeps_comment_text() {
        let lexed = lex("// Deprecated: use y\nvar x int\n");
        assert_eq!(lexed.comments.len(), 1);
        assert_eq!(lexed.comments[0].body(), "Deprecated: use y");
    }
}
