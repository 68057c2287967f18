use crate::language::{
    ast::*,
    errors::{SyntaxError, SyntaxErrors},
    lexer::{lex, Comment, Lexed},
    span::{FileSet, Pos, Span, TokenFile},
    token::{Token, TokenKind},
};
use std::sync::Arc;

/// Deepest expression, type or block nesting the parser descends into.
pub const MAX_NESTING: usize = 64;

static EOF: Token = Token {
    kind: TokenKind::Eof,
    span: Span { start: 0, end: 0 },
};

/// Parses one source buffer and registers it in `fset`.
///
/// The parser recovers from errors: a buffer with syntax errors still yields
/// a tree, with `Bad` nodes where nothing sensible could be built. No tree is
/// returned only when the buffer is not UTF-8 and cannot be tokenized.
pub fn parse(fset: &mut FileSet, name: &str, src: &[u8]) -> (Option<File>, SyntaxErrors) {
    let text = match std::str::from_utf8(src) {
        Ok(text) => text,
        Err(err) => {
            let at = err.valid_up_to();
            let error = SyntaxError::new("source is not valid UTF-8", Span::new(at, at + 1));
            return (None, SyntaxErrors::new(vec![error]));
        }
    };
    let tok = fset.add_file(name, src);
    Parser::new(tok, lex(text)).parse_file()
}

struct Parser {
    tok: Arc<TokenFile>,
    tokens: Vec<Token>,
    comments: Vec<Comment>,
    pos: usize,
    last_end: usize,
    errors: Vec<SyntaxError>,
    suppress_block_literal: bool,
    next_node: u32,
    depth: usize,
}

enum ForHeader {
    Simple(Stmt),
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        x: Expr,
    },
}

impl Parser {
    fn new(tok: Arc<TokenFile>, lexed: Lexed) -> Self {
        let errors = lexed
            .errors
            .into_iter()
            .map(|err| SyntaxError::new(err.message, err.span))
            .collect();
        let tokens = lexed
            .tokens
            .into_iter()
            .filter(|t| !matches!(t.kind, TokenKind::Illegal(_)))
            .collect();
        Self {
            tok,
            tokens,
            comments: lexed.comments,
            pos: 0,
            last_end: 0,
            errors,
            suppress_block_literal: false,
            next_node: 0,
            depth: 0,
        }
    }

    fn parse_file(mut self) -> (Option<File>, SyntaxErrors) {
        let id = self.id();
        let mut package = Pos::NONE;
        let mut name = None;
        let mut doc = None;
        while self.matches(TokenKind::Semi) {}
        if self.check(TokenKind::Package) {
            doc = self.doc_for(self.start());
            package = self.advance_pos();
            name = Some(self.parse_ident());
            self.expect_semi();
        }

        let mut decls = Vec::new();
        while !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            let start = self.start();
            match self.parse_decl() {
                Ok(decl) => {
                    decls.push(decl);
                    self.expect_semi();
                }
                Err(err) => {
                    self.report(err);
                    self.synchronize_decl();
                    let bad = BadNode {
                        id: self.id(),
                        pos: self.at(start),
                        end: self.end_pos().max(self.at(start)),
                    };
                    decls.push(Decl::Bad(bad));
                }
            }
        }

        let file = File {
            id,
            pos: self.tok.pos(0),
            end: self.tok.pos(self.tok.size()),
            package,
            name,
            doc,
            decls,
        };
        (Some(file), SyntaxErrors::new(self.errors))
    }

    fn parse_decl(&mut self) -> Result<Decl, SyntaxError> {
        match self.peek() {
            TokenKind::Import | TokenKind::Const | TokenKind::Var | TokenKind::Type => {
                self.parse_gen_decl().map(Decl::Gen)
            }
            TokenKind::Func => self.parse_func_decl().map(Decl::Func),
            _ => Err(self.error_here("expected declaration")),
        }
    }

    fn parse_gen_decl(&mut self) -> Result<GenDecl, SyntaxError> {
        let doc = self.doc_for(self.start());
        let keyword = self.advance();
        let tok = match keyword.kind {
            TokenKind::Import => DeclKind::Import,
            TokenKind::Const => DeclKind::Const,
            TokenKind::Var => DeclKind::Var,
            _ => DeclKind::Type,
        };
        let pos = self.at(keyword.span.start);
        let id = self.id();

        if self.check(TokenKind::LParen) {
            let lparen = self.advance_pos();
            let mut specs = Vec::new();
            while !self.check(TokenKind::RParen) && !self.is_eof() {
                if self.matches(TokenKind::Semi) {
                    continue;
                }
                let spec_doc = self.doc_for(self.start());
                specs.push(self.parse_spec(tok, spec_doc)?);
                if !self.check(TokenKind::RParen) {
                    self.expect_semi();
                }
            }
            let rparen = self.expect_pos(TokenKind::RParen)?;
            return Ok(GenDecl {
                id,
                doc,
                pos,
                tok,
                lparen,
                specs,
                rparen,
                end: self.end_pos(),
            });
        }

        let spec = self.parse_spec(tok, doc.clone())?;
        Ok(GenDecl {
            id,
            doc,
            pos,
            tok,
            lparen: Pos::NONE,
            specs: vec![spec],
            rparen: Pos::NONE,
            end: self.end_pos(),
        })
    }

    fn parse_spec(&mut self, tok: DeclKind, doc: Option<String>) -> Result<Spec, SyntaxError> {
        match tok {
            DeclKind::Import => self.parse_import_spec(doc).map(Spec::Import),
            DeclKind::Type => self.parse_type_spec(doc).map(Spec::Type),
            DeclKind::Const | DeclKind::Var => self.parse_value_spec(tok, doc).map(Spec::Value),
        }
    }

    fn parse_import_spec(&mut self, doc: Option<String>) -> Result<ImportSpec, SyntaxError> {
        let name = match self.peek() {
            TokenKind::Identifier(_) => Some(self.parse_ident()),
            TokenKind::Period => {
                let pos = self.advance_pos();
                Some(Ident {
                    id: self.id(),
                    name: ".".into(),
                    pos,
                })
            }
            _ => None,
        };
        let token = self.current().clone();
        let TokenKind::String(value) = token.kind else {
            return Err(self.error_here("expected import path"));
        };
        self.advance();
        let path = BasicLit {
            id: self.id(),
            pos: self.at(token.span.start),
            kind: LitKind::String,
            value,
        };
        Ok(ImportSpec {
            id: self.id(),
            doc,
            name,
            path,
            end: self.end_pos(),
        })
    }

    fn parse_type_spec(&mut self, doc: Option<String>) -> Result<TypeSpec, SyntaxError> {
        let name = self.parse_ident();
        let type_params = if self.check(TokenKind::LBrack) && self.looks_like_type_params() {
            Some(self.parse_field_group(TokenKind::LBrack, TokenKind::RBrack)?)
        } else {
            None
        };
        let assign = if self.check(TokenKind::Assign) {
            self.advance_pos()
        } else {
            Pos::NONE
        };
        let ty = self.parse_type()?;
        Ok(TypeSpec {
            id: self.id(),
            doc,
            name,
            type_params,
            assign,
            ty,
            end: self.end_pos(),
        })
    }

    /// `type T[P any] ...` versus `type A [N]int`.
    fn looks_like_type_params(&self) -> bool {
        matches!(self.peek_n(1), TokenKind::Identifier(_))
            && matches!(
                self.peek_n(2),
                TokenKind::Identifier(_)
                    | TokenKind::Interface
                    | TokenKind::Comma
                    | TokenKind::Tilde
                    | TokenKind::Func
                    | TokenKind::Map
                    | TokenKind::Chan
                    | TokenKind::Struct
                    | TokenKind::LBrack
            )
    }

    fn parse_value_spec(&mut self, tok: DeclKind, doc: Option<String>) -> Result<ValueSpec, SyntaxError> {
        let pos = self.start_pos();
        let mut names = vec![self.parse_ident()];
        while self.matches(TokenKind::Comma) {
            names.push(self.parse_ident());
        }
        let ty = if !self.check(TokenKind::Assign) && !self.at_spec_end() {
            Some(self.parse_type()?)
        } else {
            None
        };
        let mut values = Vec::new();
        if self.matches(TokenKind::Assign) {
            values = self.parse_expr_list()?;
        } else if tok == DeclKind::Var && ty.is_none() {
            return Err(self.error_here("expected type or initializer"));
        }
        Ok(ValueSpec {
            id: self.id(),
            doc,
            pos,
            names,
            ty,
            values,
            end: self.end_pos(),
        })
    }

    fn at_spec_end(&self) -> bool {
        matches!(self.peek(), TokenKind::Semi | TokenKind::RParen | TokenKind::Eof)
    }

    fn parse_func_decl(&mut self) -> Result<FuncDecl, SyntaxError> {
        let doc = self.doc_for(self.start());
        let pos = self.advance_pos();
        let id = self.id();
        let recv = if self.check(TokenKind::LParen) {
            Some(self.parse_field_group(TokenKind::LParen, TokenKind::RParen)?)
        } else {
            None
        };
        let name = self.parse_ident();
        let type_params = if self.check(TokenKind::LBrack) {
            Some(self.parse_field_group(TokenKind::LBrack, TokenKind::RBrack)?)
        } else {
            None
        };
        let params = self.parse_field_group(TokenKind::LParen, TokenKind::RParen)?;
        let results = self.parse_results()?;
        let ty = FuncType {
            id: self.id(),
            pos,
            type_params,
            params,
            results,
            end: self.end_pos(),
        };
        let body = if self.check(TokenKind::LBrace) {
            Some(self.with_block_literals(Self::parse_block)?)
        } else {
            None
        };
        Ok(FuncDecl {
            id,
            doc,
            pos,
            recv,
            name,
            ty,
            body,
            end: self.end_pos(),
        })
    }

    fn parse_func_type(&mut self) -> Result<FuncType, SyntaxError> {
        let pos = self.expect_pos(TokenKind::Func)?;
        let params = self.parse_field_group(TokenKind::LParen, TokenKind::RParen)?;
        let results = self.parse_results()?;
        Ok(FuncType {
            id: self.id(),
            pos,
            type_params: None,
            params,
            results,
            end: self.end_pos(),
        })
    }

    fn parse_results(&mut self) -> Result<Option<FieldList>, SyntaxError> {
        if self.check(TokenKind::LParen) {
            return self
                .parse_field_group(TokenKind::LParen, TokenKind::RParen)
                .map(Some);
        }
        if !self.starts_type() {
            return Ok(None);
        }
        let ty = self.parse_type()?;
        let field = Field {
            id: self.id(),
            doc: None,
            pos: ty.pos,
            end: ty.end,
            names: Vec::new(),
            ty,
            tag: None,
        };
        Ok(Some(FieldList {
            id: self.id(),
            opening: Pos::NONE,
            list: vec![field],
            closing: Pos::NONE,
        }))
    }

    fn starts_type(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Identifier(_)
                | TokenKind::Star
                | TokenKind::LBrack
                | TokenKind::Map
                | TokenKind::Chan
                | TokenKind::Func
                | TokenKind::Struct
                | TokenKind::Interface
                | TokenKind::Arrow
        )
    }

    /// Parameter, receiver, or type-parameter list. Entries are either all
    /// named (`a, b int, c string`) or all anonymous (`int, string`).
    fn parse_field_group(&mut self, open: TokenKind, close: TokenKind) -> Result<FieldList, SyntaxError> {
        let opening = self.expect_pos(open)?;
        let mut entries: Vec<(Option<Ident>, Option<Expr>)> = Vec::new();
        while !self.check(close.clone()) && !self.is_eof() {
            entries.push(self.parse_param_entry(&close)?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        let closing = self.expect_pos(close)?;

        let named = entries.iter().any(|(name, ty)| name.is_some() && ty.is_some());
        let mut list = Vec::new();
        if named {
            let mut pending: Vec<Ident> = Vec::new();
            for (name, ty) in entries {
                match (name, ty) {
                    (Some(name), None) => pending.push(name),
                    (Some(name), Some(ty)) => {
                        pending.push(name);
                        let names = std::mem::take(&mut pending);
                        list.push(self.field(names, ty));
                    }
                    (None, Some(ty)) => {
                        self.report(SyntaxError::new(
                            "mixed named and unnamed parameters",
                            self.span_of(ty.pos, ty.end),
                        ));
                        list.push(self.field(Vec::new(), ty));
                    }
                    (None, None) => {}
                }
            }
            if let Some(last) = pending.last() {
                self.report(SyntaxError::new(
                    "missing parameter type",
                    self.span_of(last.pos, last.end()),
                ));
            }
        } else {
            for (name, ty) in entries {
                let ty = match (name, ty) {
                    (_, Some(ty)) => ty,
                    (Some(name), None) => Expr::ident(name),
                    (None, None) => continue,
                };
                list.push(self.field(Vec::new(), ty));
            }
        }

        Ok(FieldList {
            id: self.id(),
            opening,
            list,
            closing,
        })
    }

    fn field(&mut self, names: Vec<Ident>, ty: Expr) -> Field {
        Field {
            id: self.id(),
            doc: None,
            pos: names.first().map(|n| n.pos).unwrap_or(ty.pos),
            end: ty.end,
            names,
            ty,
            tag: None,
        }
    }

    fn parse_param_entry(&mut self, close: &TokenKind) -> Result<(Option<Ident>, Option<Expr>), SyntaxError> {
        if !matches!(self.peek(), TokenKind::Identifier(_)) {
            return Ok((None, Some(self.parse_param_type()?)));
        }
        match self.peek_n(1) {
            TokenKind::Period => Ok((None, Some(self.parse_type()?))),
            TokenKind::Comma => Ok((Some(self.parse_ident()), None)),
            kind if kind == close => Ok((Some(self.parse_ident()), None)),
            TokenKind::LBrack => {
                if matches!(
                    self.peek_n(2),
                    TokenKind::RBrack | TokenKind::Int(_) | TokenKind::Ellipsis
                ) {
                    let name = self.parse_ident();
                    Ok((Some(name), Some(self.parse_param_type()?)))
                } else {
                    Ok((None, Some(self.parse_type()?)))
                }
            }
            _ => {
                let name = self.parse_ident();
                Ok((Some(name), Some(self.parse_param_type()?)))
            }
        }
    }

    fn parse_param_type(&mut self) -> Result<Expr, SyntaxError> {
        if self.check(TokenKind::Ellipsis) {
            let pos = self.advance_pos();
            let elt = self.parse_type()?;
            let end = elt.end;
            return Ok(self.expr(pos, end, ExprKind::Ellipsis(Some(Box::new(elt)))));
        }
        self.matches(TokenKind::Tilde);
        let ty = self.parse_type()?;
        // Union constraints keep their first term.
        while self.matches(TokenKind::Pipe) {
            self.matches(TokenKind::Tilde);
            self.parse_type()?;
        }
        Ok(ty)
    }

    fn parse_type(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(Self::parse_type_inner)
    }

    fn parse_type_inner(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.start_pos();
        match self.peek().clone() {
            TokenKind::Identifier(_) => {
                let mut ty = Expr::ident(self.parse_ident());
                if self.matches(TokenKind::Period) {
                    let sel = self.parse_ident();
                    let end = sel.end();
                    ty = self.expr(start, end, ExprKind::Selector { x: Box::new(ty), sel });
                }
                if self.check(TokenKind::LBrack) {
                    self.advance();
                    let mut indices = vec![self.parse_type()?];
                    while self.matches(TokenKind::Comma) {
                        if self.check(TokenKind::RBrack) {
                            break;
                        }
                        indices.push(self.parse_type()?);
                    }
                    self.expect(TokenKind::RBrack)?;
                    let end = self.end_pos();
                    ty = self.expr(start, end, ExprKind::Index { x: Box::new(ty), indices });
                }
                Ok(ty)
            }
            TokenKind::Star => {
                self.advance();
                let elem = self.parse_type()?;
                let end = elem.end;
                Ok(self.expr(start, end, ExprKind::Star(Box::new(elem))))
            }
            TokenKind::LBrack => {
                self.advance();
                let len = if self.matches(TokenKind::RBrack) {
                    None
                } else if self.check(TokenKind::Ellipsis) {
                    let pos = self.advance_pos();
                    self.expect(TokenKind::RBrack)?;
                    Some(Box::new(self.expr(pos, pos.offset_by(3), ExprKind::Ellipsis(None))))
                } else {
                    let len = self.with_block_literals(Self::parse_expr)?;
                    self.expect(TokenKind::RBrack)?;
                    Some(Box::new(len))
                };
                let elt = self.parse_type()?;
                let end = elt.end;
                Ok(self.expr(start, end, ExprKind::ArrayType { len, elt: Box::new(elt) }))
            }
            TokenKind::Map => {
                self.advance();
                self.expect(TokenKind::LBrack)?;
                let key = self.parse_type()?;
                self.expect(TokenKind::RBrack)?;
                let value = self.parse_type()?;
                let end = value.end;
                Ok(self.expr(
                    start,
                    end,
                    ExprKind::MapType {
                        key: Box::new(key),
                        value: Box::new(value),
                    },
                ))
            }
            TokenKind::Chan => {
                self.advance();
                let dir = if self.matches(TokenKind::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                let value = self.parse_type()?;
                let end = value.end;
                Ok(self.expr(start, end, ExprKind::ChanType { dir, value: Box::new(value) }))
            }
            TokenKind::Arrow => {
                self.advance();
                self.expect(TokenKind::Chan)?;
                let value = self.parse_type()?;
                let end = value.end;
                Ok(self.expr(
                    start,
                    end,
                    ExprKind::ChanType {
                        dir: ChanDir::Recv,
                        value: Box::new(value),
                    },
                ))
            }
            TokenKind::Func => {
                let ty = self.parse_func_type()?;
                let end = ty.end;
                Ok(self.expr(start, end, ExprKind::FuncType(ty)))
            }
            TokenKind::Struct => self.parse_struct_type(),
            TokenKind::Interface => self.parse_interface_type(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_type()?;
                self.expect(TokenKind::RParen)?;
                let end = self.end_pos();
                Ok(self.expr(start, end, ExprKind::Paren(Box::new(inner))))
            }
            _ => Err(self.error_here("expected type")),
        }
    }

    fn parse_struct_type(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.advance_pos();
        let opening = self.expect_pos(TokenKind::LBrace)?;
        let mut list = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            let doc = self.doc_for(self.start());
            let pos = self.start_pos();
            let embedded = match self.peek() {
                TokenKind::Star => true,
                TokenKind::Identifier(_) => matches!(
                    self.peek_n(1),
                    TokenKind::Period | TokenKind::Semi | TokenKind::RBrace | TokenKind::String(_)
                ),
                _ => return Err(self.error_here("expected field name or embedded type")),
            };
            let mut names = Vec::new();
            if !embedded {
                names.push(self.parse_ident());
                while self.matches(TokenKind::Comma) {
                    names.push(self.parse_ident());
                }
            }
            let ty = self.parse_type()?;
            let tag = match self.peek().clone() {
                TokenKind::String(value) => {
                    let pos = self.advance_pos();
                    Some(BasicLit {
                        id: self.id(),
                        pos,
                        kind: LitKind::String,
                        value,
                    })
                }
                _ => None,
            };
            list.push(Field {
                id: self.id(),
                doc,
                pos,
                names,
                ty,
                tag,
                end: self.end_pos(),
            });
            if !self.check(TokenKind::RBrace) {
                self.expect_semi();
            }
        }
        let closing = self.expect_pos(TokenKind::RBrace)?;
        let fields = FieldList {
            id: self.id(),
            opening,
            list,
            closing,
        };
        let end = self.end_pos();
        Ok(self.expr(start, end, ExprKind::StructType(fields)))
    }

    fn parse_interface_type(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.advance_pos();
        let opening = self.expect_pos(TokenKind::LBrace)?;
        let mut list = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            if self.matches(TokenKind::Semi) {
                continue;
            }
            let doc = self.doc_for(self.start());
            let pos = self.start_pos();
            let method = matches!(self.peek(), TokenKind::Identifier(_))
                && matches!(self.peek_n(1), TokenKind::LParen);
            let (names, ty) = if method {
                let name = self.parse_ident();
                let params = self.parse_field_group(TokenKind::LParen, TokenKind::RParen)?;
                let results = self.parse_results()?;
                let sig = FuncType {
                    id: self.id(),
                    pos: name.pos,
                    type_params: None,
                    params,
                    results,
                    end: self.end_pos(),
                };
                let (sig_pos, sig_end) = (sig.pos, sig.end);
                (vec![name], self.expr(sig_pos, sig_end, ExprKind::FuncType(sig)))
            } else {
                (Vec::new(), self.parse_param_type()?)
            };
            list.push(Field {
                id: self.id(),
                doc,
                pos,
                names,
                ty,
                tag: None,
                end: self.end_pos(),
            });
            if !self.check(TokenKind::RBrace) {
                self.expect_semi();
            }
        }
        let closing = self.expect_pos(TokenKind::RBrace)?;
        let methods = FieldList {
            id: self.id(),
            opening,
            list,
            closing,
        };
        let end = self.end_pos();
        Ok(self.expr(start, end, ExprKind::InterfaceType(methods)))
    }

    fn parse_block(&mut self) -> Result<BlockStmt, SyntaxError> {
        self.nested(Self::parse_block_inner)
    }

    fn parse_block_inner(&mut self) -> Result<BlockStmt, SyntaxError> {
        let lbrace = self.expect_pos(TokenKind::LBrace)?;
        let id = self.id();
        let stmts = self.parse_stmt_list();
        let rbrace = if self.check(TokenKind::RBrace) {
            self.advance_pos()
        } else {
            let err = self.error_here("expected '}'");
            self.report(err);
            self.start_pos()
        };
        Ok(BlockStmt {
            id,
            lbrace,
            stmts,
            rbrace,
            end: self.end_pos().max(rbrace),
        })
    }

    fn parse_stmt_list(&mut self) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        loop {
            while self.matches(TokenKind::Semi) {}
            if matches!(
                self.peek(),
                TokenKind::RBrace | TokenKind::Case | TokenKind::Default | TokenKind::Eof
            ) {
                break;
            }
            let start = self.start();
            match self.parse_stmt() {
                Ok(stmt) => {
                    stmts.push(stmt);
                    if !matches!(
                        self.peek(),
                        TokenKind::RBrace | TokenKind::Case | TokenKind::Default | TokenKind::Eof
                    ) && !self.matches(TokenKind::Semi)
                    {
                        let err = self.error_here("expected ';'");
                        self.report(err);
                        self.synchronize_stmt();
                    }
                }
                Err(err) => {
                    self.report(err);
                    self.synchronize_stmt();
                    let pos = self.at(start);
                    let end = self.end_pos().max(pos);
                    stmts.push(self.stmt(pos, end, StmtKind::Bad));
                }
            }
        }
        stmts
    }

    fn parse_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.start_pos();
        match self.peek().clone() {
            TokenKind::Var | TokenKind::Const | TokenKind::Type => {
                let decl = self.parse_gen_decl()?;
                let end = decl.end;
                Ok(self.stmt(start, end, StmtKind::Decl(decl)))
            }
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                let end = block.end;
                Ok(self.stmt(start, end, StmtKind::Block(block)))
            }
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Return => {
                self.advance();
                let results = if matches!(self.peek(), TokenKind::Semi | TokenKind::RBrace) {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                let end = self.end_pos();
                Ok(self.stmt(start, end, StmtKind::Return(results)))
            }
            TokenKind::Break | TokenKind::Continue | TokenKind::Goto | TokenKind::Fallthrough => {
                let keyword = self.advance();
                let tok = match keyword.kind {
                    TokenKind::Break => BranchKind::Break,
                    TokenKind::Continue => BranchKind::Continue,
                    TokenKind::Goto => BranchKind::Goto,
                    _ => BranchKind::Fallthrough,
                };
                let label = match self.peek() {
                    TokenKind::Identifier(_) if tok != BranchKind::Fallthrough => Some(self.parse_ident()),
                    _ => None,
                };
                let end = self.end_pos();
                Ok(self.stmt(start, end, StmtKind::Branch { tok, label }))
            }
            TokenKind::Go | TokenKind::Defer => {
                let keyword = self.advance();
                let call = self.parse_expr()?;
                let end = call.end;
                let kind = if keyword.kind == TokenKind::Go {
                    StmtKind::Go(call)
                } else {
                    StmtKind::Defer(call)
                };
                Ok(self.stmt(start, end, kind))
            }
            TokenKind::Select => Err(self.error_here("select statements are not supported")),
            _ => self.parse_simple_stmt(true),
        }
    }

    fn parse_simple_stmt(&mut self, label_ok: bool) -> Result<Stmt, SyntaxError> {
        match self.parse_header_stmt(label_ok, false)? {
            ForHeader::Simple(stmt) => Ok(stmt),
            ForHeader::Range { x, .. } => Err(SyntaxError::new(
                "unexpected range clause",
                self.span_of(x.pos, x.end),
            )
            .with_help("range clauses are only allowed in for statements")),
        }
    }

    fn parse_header_stmt(&mut self, label_ok: bool, range_ok: bool) -> Result<ForHeader, SyntaxError> {
        let start = self.start_pos();
        if range_ok && self.matches(TokenKind::Range) {
            let x = self.parse_expr()?;
            return Ok(ForHeader::Range {
                key: None,
                value: None,
                define: false,
                x,
            });
        }

        let mut lhs = self.parse_expr_list()?;
        let op = match self.peek() {
            TokenKind::Assign => Some(AssignOp::Assign),
            TokenKind::Define => Some(AssignOp::Define),
            TokenKind::AddAssign => Some(AssignOp::Op(BinaryOp::Add)),
            TokenKind::SubAssign => Some(AssignOp::Op(BinaryOp::Sub)),
            TokenKind::MulAssign => Some(AssignOp::Op(BinaryOp::Mul)),
            TokenKind::QuoAssign => Some(AssignOp::Op(BinaryOp::Quo)),
            TokenKind::RemAssign => Some(AssignOp::Op(BinaryOp::Rem)),
            TokenKind::AndAssign => Some(AssignOp::Op(BinaryOp::And)),
            TokenKind::OrAssign => Some(AssignOp::Op(BinaryOp::Or)),
            TokenKind::XorAssign => Some(AssignOp::Op(BinaryOp::Xor)),
            TokenKind::ShlAssign => Some(AssignOp::Op(BinaryOp::Shl)),
            TokenKind::ShrAssign => Some(AssignOp::Op(BinaryOp::Shr)),
            TokenKind::AndNotAssign => Some(AssignOp::Op(BinaryOp::AndNot)),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            if range_ok && matches!(op, AssignOp::Assign | AssignOp::Define) && self.matches(TokenKind::Range) {
                let x = self.parse_expr()?;
                let mut exprs = lhs.into_iter();
                return Ok(ForHeader::Range {
                    key: exprs.next(),
                    value: exprs.next(),
                    define: op == AssignOp::Define,
                    x,
                });
            }
            let rhs = self.parse_expr_list()?;
            let end = self.end_pos();
            return Ok(ForHeader::Simple(self.stmt(start, end, StmtKind::Assign { lhs, op, rhs })));
        }

        if lhs.len() > 1 {
            return Err(self.error_here("expected 1 expression"));
        }
        let Some(x) = lhs.pop() else {
            return Err(self.error_here("expected statement"));
        };
        let kind = match self.peek() {
            TokenKind::Inc | TokenKind::Dec => {
                let inc = self.advance().kind == TokenKind::Inc;
                StmtKind::IncDec { x, inc }
            }
            TokenKind::Arrow => {
                self.advance();
                let value = self.parse_expr()?;
                StmtKind::Send { chan: x, value }
            }
            TokenKind::Colon if label_ok && x.as_ident().is_some() => {
                self.advance();
                let label = match x.kind {
                    ExprKind::Ident(ident) => ident,
                    _ => return Err(self.error_here("expected label")),
                };
                while self.matches(TokenKind::Semi) {}
                let stmt = if self.check(TokenKind::RBrace) {
                    let pos = self.start_pos();
                    self.stmt(pos, pos, StmtKind::Empty { implicit: true })
                } else {
                    self.nested(Self::parse_stmt)?
                };
                StmtKind::Labeled {
                    label,
                    stmt: Box::new(stmt),
                }
            }
            _ => StmtKind::Expr(x),
        };
        let end = self.end_pos();
        Ok(ForHeader::Simple(self.stmt(start, end, kind)))
    }

    fn parse_if(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.advance_pos();
        let (init, cond) = self.with_suppressed_literals(|p| {
            if p.check(TokenKind::LBrace) {
                return Err(p.error_here("missing condition in if statement"));
            }
            let first = if p.check(TokenKind::Semi) {
                None
            } else {
                Some(p.parse_simple_stmt(false)?)
            };
            if p.matches(TokenKind::Semi) {
                let cond = p.parse_expr()?;
                Ok((first.map(Box::new), cond))
            } else {
                match first.map(|s| s.kind) {
                    Some(StmtKind::Expr(cond)) => Ok((None, cond)),
                    _ => Err(p.error_here("expected condition")),
                }
            }
        })?;
        let body = self.with_block_literals(Self::parse_block)?;
        let els = if self.matches(TokenKind::Else) {
            match self.peek() {
                TokenKind::If => Some(Box::new(self.nested(Self::parse_if)?)),
                TokenKind::LBrace => {
                    let pos = self.start_pos();
                    let block = self.parse_block()?;
                    let end = block.end;
                    Some(Box::new(self.stmt(pos, end, StmtKind::Block(block))))
                }
                _ => return Err(self.error_here("expected if statement or block")),
            }
        } else {
            None
        };
        let end = self.end_pos();
        Ok(self.stmt(
            start,
            end,
            StmtKind::If {
                init,
                cond,
                body,
                els,
            },
        ))
    }

    fn parse_for(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.advance_pos();
        let header = self.with_suppressed_literals(|p| -> Result<_, SyntaxError> {
            if p.check(TokenKind::LBrace) {
                return Ok((None, None, None, None));
            }
            let first = if p.check(TokenKind::Semi) {
                None
            } else {
                Some(p.parse_header_stmt(false, true)?)
            };
            match first {
                Some(ForHeader::Range { key, value, define, x }) => {
                    Ok((None, None, None, Some((key, value, define, x))))
                }
                Some(ForHeader::Simple(stmt)) if !p.check(TokenKind::Semi) => match stmt.kind {
                    StmtKind::Expr(cond) => Ok((None, Some(cond), None, None)),
                    _ => Err(p.error_here("expected for loop condition")),
                },
                first => {
                    p.expect(TokenKind::Semi)?;
                    let init = first.and_then(|h| match h {
                        ForHeader::Simple(stmt) => Some(Box::new(stmt)),
                        ForHeader::Range { .. } => None,
                    });
                    let cond = if p.check(TokenKind::Semi) {
                        None
                    } else {
                        Some(p.parse_expr()?)
                    };
                    p.expect(TokenKind::Semi)?;
                    let post = if p.check(TokenKind::LBrace) {
                        None
                    } else {
                        Some(Box::new(p.parse_simple_stmt(false)?))
                    };
                    Ok((init, cond, post, None))
                }
            }
        })?;
        let body = self.with_block_literals(Self::parse_block)?;
        let end = self.end_pos();
        let kind = match header {
            (_, _, _, Some((key, value, define, x))) => StmtKind::Range {
                key,
                value,
                define,
                x,
                body,
            },
            (init, cond, post, None) => StmtKind::For {
                init,
                cond,
                post,
                body,
            },
        };
        Ok(self.stmt(start, end, kind))
    }

    fn parse_switch(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.advance_pos();
        let (init, tag) = self.with_suppressed_literals(|p| -> Result<_, SyntaxError> {
            if p.check(TokenKind::LBrace) {
                return Ok((None, None));
            }
            let first = if p.check(TokenKind::Semi) {
                None
            } else {
                Some(p.parse_simple_stmt(false)?)
            };
            let (init, tag_stmt) = if p.matches(TokenKind::Semi) {
                let tag = if p.check(TokenKind::LBrace) {
                    None
                } else {
                    Some(p.parse_simple_stmt(false)?)
                };
                (first, tag)
            } else {
                (None, first)
            };
            // `switch v := x.(type)` keeps the binding as the init statement.
            Ok(match tag_stmt {
                Some(Stmt {
                    kind: StmtKind::Expr(tag),
                    ..
                }) => (init.map(Box::new), Some(tag)),
                Some(other) => (Some(Box::new(other)), None),
                None => (init.map(Box::new), None),
            })
        })?;

        self.expect(TokenKind::LBrace)?;
        let mut body = Vec::new();
        loop {
            while self.matches(TokenKind::Semi) {}
            match self.peek() {
                TokenKind::Case | TokenKind::Default => body.push(self.parse_case_clause()?),
                _ => break,
            }
        }
        if !self.matches(TokenKind::RBrace) {
            let err = self.error_here("expected '}'");
            self.report(err);
        }
        let end = self.end_pos();
        Ok(self.stmt(start, end, StmtKind::Switch { init, tag, body }))
    }

    fn parse_case_clause(&mut self) -> Result<CaseClause, SyntaxError> {
        let keyword = self.advance();
        let pos = self.at(keyword.span.start);
        let is_default = keyword.kind == TokenKind::Default;
        let list = if is_default { Vec::new() } else { self.parse_expr_list()? };
        let colon = self.expect_pos(TokenKind::Colon)?;
        let body = self.parse_stmt_list();
        Ok(CaseClause {
            id: self.id(),
            pos,
            list,
            is_default,
            colon,
            body,
            end: self.end_pos(),
        })
    }

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut list = vec![self.parse_expr()?];
        while self.matches(TokenKind::Comma) {
            list.push(self.parse_expr()?);
        }
        Ok(list)
    }

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(|p| p.parse_binary(1))
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, SyntaxError> {
        let mut x = self.parse_unary()?;
        while let Some(op) = binary_op(self.peek()) {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.advance();
            let y = self.parse_binary(prec + 1)?;
            let (pos, end) = (x.pos, y.end);
            x = self.expr(
                pos,
                end,
                ExprKind::Binary {
                    x: Box::new(x),
                    op,
                    y: Box::new(y),
                },
            );
        }
        Ok(x)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.start_pos();
        let op = match self.peek() {
            TokenKind::Plus => UnaryOp::Pos,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Caret => UnaryOp::Xor,
            TokenKind::Amp => UnaryOp::Addr,
            TokenKind::Arrow => {
                if matches!(self.peek_n(1), TokenKind::Chan) {
                    return self.parse_primary();
                }
                UnaryOp::Recv
            }
            TokenKind::Star => {
                self.advance();
                let x = self.nested(Self::parse_unary)?;
                let end = x.end;
                return Ok(self.expr(start, end, ExprKind::Star(Box::new(x))));
            }
            _ => return self.parse_primary(),
        };
        self.advance();
        let x = self.nested(Self::parse_unary)?;
        let end = x.end;
        Ok(self.expr(start, end, ExprKind::Unary { op, x: Box::new(x) }))
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.start_pos();
        let mut x = self.parse_operand()?;
        loop {
            match self.peek() {
                TokenKind::Period => {
                    self.advance();
                    if self.matches(TokenKind::LParen) {
                        let ty = if self.matches(TokenKind::Type) {
                            None
                        } else {
                            Some(Box::new(self.parse_type()?))
                        };
                        self.expect(TokenKind::RParen)?;
                        let end = self.end_pos();
                        x = self.expr(start, end, ExprKind::TypeAssert { x: Box::new(x), ty });
                    } else {
                        let sel = self.parse_ident();
                        let end = sel.end();
                        x = self.expr(start, end, ExprKind::Selector { x: Box::new(x), sel });
                    }
                }
                TokenKind::LBrack => {
                    x = self.with_block_literals(|p| p.parse_index_or_slice(start, x))?;
                }
                TokenKind::LParen => {
                    x = self.with_block_literals(|p| p.parse_call(start, x))?;
                }
                TokenKind::LBrace => {
                    let literal_type = match &x.kind {
                        ExprKind::Ident(_) | ExprKind::Selector { .. } | ExprKind::Index { .. } => {
                            !self.suppress_block_literal
                        }
                        ExprKind::ArrayType { .. } | ExprKind::MapType { .. } | ExprKind::StructType(_) => true,
                        _ => false,
                    };
                    if !literal_type {
                        break;
                    }
                    x = self.parse_composite(Some(x))?;
                }
                _ => break,
            }
        }
        Ok(x)
    }

    fn parse_index_or_slice(&mut self, start: Pos, x: Expr) -> Result<Expr, SyntaxError> {
        self.expect(TokenKind::LBrack)?;
        let low = if self.check(TokenKind::Colon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        if self.matches(TokenKind::Colon) {
            let high = if self.check(TokenKind::RBrack) {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            self.expect(TokenKind::RBrack)?;
            let end = self.end_pos();
            return Ok(self.expr(
                start,
                end,
                ExprKind::Slice {
                    x: Box::new(x),
                    low: low.map(Box::new),
                    high,
                },
            ));
        }
        let mut indices: Vec<Expr> = low.into_iter().collect();
        while self.matches(TokenKind::Comma) {
            if self.check(TokenKind::RBrack) {
                break;
            }
            indices.push(self.parse_expr()?);
        }
        self.expect(TokenKind::RBrack)?;
        let end = self.end_pos();
        Ok(self.expr(start, end, ExprKind::Index { x: Box::new(x), indices }))
    }

    fn parse_call(&mut self, start: Pos, fun: Expr) -> Result<Expr, SyntaxError> {
        let lparen = self.expect_pos(TokenKind::LParen)?;
        let mut args = Vec::new();
        let mut ellipsis = Pos::NONE;
        while !self.check(TokenKind::RParen) && !self.is_eof() {
            args.push(self.parse_expr()?);
            if self.check(TokenKind::Ellipsis) {
                ellipsis = self.advance_pos();
            }
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        let rparen = self.expect_pos(TokenKind::RParen)?;
        let end = self.end_pos();
        Ok(self.expr(
            start,
            end,
            ExprKind::Call {
                fun: Box::new(fun),
                lparen,
                args,
                ellipsis,
                rparen,
            },
        ))
    }

    fn parse_composite(&mut self, ty: Option<Expr>) -> Result<Expr, SyntaxError> {
        self.nested(|p| p.parse_composite_inner(ty))
    }

    fn parse_composite_inner(&mut self, ty: Option<Expr>) -> Result<Expr, SyntaxError> {
        let start = ty.as_ref().map(|t| t.pos).unwrap_or_else(|| self.start_pos());
        let lbrace = self.expect_pos(TokenKind::LBrace)?;
        let elts = self.with_block_literals(|p| {
            let mut elts = Vec::new();
            while !p.check(TokenKind::RBrace) && !p.is_eof() {
                elts.push(p.parse_element()?);
                if !p.matches(TokenKind::Comma) {
                    break;
                }
            }
            Ok(elts)
        })?;
        let rbrace = self.expect_pos(TokenKind::RBrace)?;
        let end = self.end_pos();
        Ok(self.expr(
            start,
            end,
            ExprKind::CompositeLit {
                ty: ty.map(Box::new),
                lbrace,
                elts,
                rbrace,
            },
        ))
    }

    fn parse_element(&mut self) -> Result<Expr, SyntaxError> {
        let key = self.parse_element_value()?;
        if !self.check(TokenKind::Colon) {
            return Ok(key);
        }
        let colon = self.advance_pos();
        let value = self.parse_element_value()?;
        let (pos, end) = (key.pos, value.end);
        Ok(self.expr(
            pos,
            end,
            ExprKind::KeyValue {
                key: Box::new(key),
                colon,
                value: Box::new(value),
            },
        ))
    }

    fn parse_element_value(&mut self) -> Result<Expr, SyntaxError> {
        if self.check(TokenKind::LBrace) {
            self.parse_composite(None)
        } else {
            self.parse_expr()
        }
    }

    fn parse_operand(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.current().clone();
        let start = self.at(token.span.start);
        let lit = match token.kind {
            TokenKind::Identifier(_) => return Ok(Expr::ident(self.parse_ident())),
            TokenKind::Int(value) => Some((LitKind::Int, value)),
            TokenKind::Float(value) => Some((LitKind::Float, value)),
            TokenKind::Char(value) => Some((LitKind::Char, value)),
            TokenKind::String(value) => Some((LitKind::String, value)),
            _ => None,
        };
        if let Some((kind, value)) = lit {
            self.advance();
            let lit = BasicLit {
                id: self.id(),
                pos: start,
                kind,
                value,
            };
            return Ok(Expr {
                id: lit.id,
                pos: start,
                end: lit.end(),
                kind: ExprKind::BasicLit(lit),
            });
        }

        match self.peek() {
            TokenKind::LParen => {
                self.advance();
                let inner = self.with_block_literals(Self::parse_expr)?;
                self.expect(TokenKind::RParen)?;
                let end = self.end_pos();
                Ok(self.expr(start, end, ExprKind::Paren(Box::new(inner))))
            }
            TokenKind::Func => {
                let ty = self.parse_func_type()?;
                if self.check(TokenKind::LBrace) {
                    let body = self.with_block_literals(Self::parse_block)?;
                    let end = body.end;
                    Ok(self.expr(start, end, ExprKind::FuncLit { ty, body }))
                } else {
                    let end = ty.end;
                    Ok(self.expr(start, end, ExprKind::FuncType(ty)))
                }
            }
            TokenKind::LBrack
            | TokenKind::Map
            | TokenKind::Chan
            | TokenKind::Struct
            | TokenKind::Interface
            | TokenKind::Arrow => self.parse_type(),
            _ => Err(self.error_here("expected operand")),
        }
    }

    /// Missing identifiers become `_` so the surrounding construct survives.
    fn parse_ident(&mut self) -> Ident {
        let token = self.current().clone();
        if let TokenKind::Identifier(name) = token.kind {
            self.advance();
            return Ident {
                id: self.id(),
                name,
                pos: self.at(token.span.start),
            };
        }
        let err = self.error_here("expected 'IDENT'");
        self.report(err);
        Ident {
            id: self.id(),
            name: "_".into(),
            pos: self.at(token.span.start),
        }
    }

    fn with_suppressed_literals<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        let prev_flag = self.suppress_block_literal;
        self.suppress_block_literal = true;
        let result = f(self);
        self.suppress_block_literal = prev_flag;
        result
    }

    fn with_block_literals<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        let prev_flag = self.suppress_block_literal;
        self.suppress_block_literal = false;
        let result = f(self);
        self.suppress_block_literal = prev_flag;
        result
    }

    /// Leading comment group ending on the line right above `offset`.
    fn doc_for(&self, offset: usize) -> Option<String> {
        let mut line = self.tok.line_of(offset);
        let idx = self.comments.partition_point(|c| c.span.end <= offset);
        let mut parts = Vec::new();
        for comment in self.comments[..idx].iter().rev() {
            let end_line = self.tok.line_of(comment.span.end.saturating_sub(1));
            if end_line + 1 != line {
                break;
            }
            line = self.tok.line_of(comment.span.start);
            parts.push(comment.body().to_string());
        }
        if parts.is_empty() {
            return None;
        }
        parts.reverse();
        Some(parts.join("\n"))
    }

    fn id(&mut self) -> NodeId {
        let id = NodeId {
            file: self.tok.base(),
            index: self.next_node,
        };
        self.next_node += 1;
        id
    }

    fn expr(&mut self, pos: Pos, end: Pos, kind: ExprKind) -> Expr {
        Expr {
            id: self.id(),
            pos,
            end,
            kind,
        }
    }

    fn stmt(&mut self, pos: Pos, end: Pos, kind: StmtKind) -> Stmt {
        Stmt {
            id: self.id(),
            pos,
            end,
            kind,
        }
    }

    fn at(&self, offset: usize) -> Pos {
        self.tok.pos(offset)
    }

    fn span_of(&self, pos: Pos, end: Pos) -> Span {
        self.tok.span(pos, end).unwrap_or_default()
    }

    fn current(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .unwrap_or(&EOF)
    }

    fn peek(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_n(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&EOF.kind)
    }

    fn check(&self, kind: TokenKind) -> bool {
        *self.peek() == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        if token.kind != TokenKind::Eof {
            self.last_end = token.span.end;
        }
        token
    }

    fn advance_pos(&mut self) -> Pos {
        let start = self.advance().span.start;
        self.at(start)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            Err(self.error_here(&format!("expected {}", kind.describe())))
        }
    }

    fn expect_pos(&mut self, kind: TokenKind) -> Result<Pos, SyntaxError> {
        let start = self.expect(kind)?.span.start;
        Ok(self.at(start))
    }

    fn expect_semi(&mut self) {
        if self.matches(TokenKind::Semi) || matches!(self.peek(), TokenKind::Eof | TokenKind::RParen) {
            return;
        }
        let err = self.error_here("expected ';'");
        self.report(err);
        self.synchronize_stmt();
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn start(&self) -> usize {
        self.current().span.start
    }

    fn start_pos(&self) -> Pos {
        self.at(self.start())
    }

    fn end_pos(&self) -> Pos {
        self.at(self.last_end)
    }

    /// Runs `f` one nesting level deeper; fails once `MAX_NESTING` is reached.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>) -> Result<T, SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(SyntaxError::new("exceeded max nesting depth", self.current().span));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        let token = self.current();
        SyntaxError::new(format!("{message}, found {}", token.kind.describe()), token.span)
    }

    /// Keeps the first error reported at each offset.
    fn report(&mut self, err: SyntaxError) {
        if self
            .errors
            .last()
            .is_some_and(|last| last.span.start == err.span.start)
        {
            return;
        }
        self.errors.push(err);
    }

    fn synchronize_stmt(&mut self) {
        while !self.is_eof() {
            match self.peek() {
                TokenKind::Semi => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn synchronize_decl(&mut self) {
        self.advance();
        while !self.is_eof() {
            let at_line_start = self.pos > 0
                && self
                    .tokens
                    .get(self.pos - 1)
                    .is_some_and(|t| t.kind == TokenKind::Semi);
            if at_line_start && self.peek().is_decl_keyword() {
                return;
            }
            self.advance();
        }
    }
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Quo,
        TokenKind::Percent => BinaryOp::Rem,
        TokenKind::Amp => BinaryOp::And,
        TokenKind::Pipe => BinaryOp::Or,
        TokenKind::Caret => BinaryOp::Xor,
        TokenKind::Shl => BinaryOp::Shl,
        TokenKind::Shr => BinaryOp::Shr,
        TokenKind::AndNot => BinaryOp::AndNot,
        TokenKind::LAnd => BinaryOp::LAnd,
        TokenKind::LOr => BinaryOp::LOr,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::NotEq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::LtEq => BinaryOp::LtEq,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::GtEq => BinaryOp::GtEq,
        _ => return None,
    };
    Some(op)
}

#[cfg(test)]
mod tests;
