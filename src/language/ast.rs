use crate::language::span::Pos;

/// Identity of a syntax node, unique across every file registered in the
/// same `FileSet` (`file` is the file's base).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub file: u32,
    pub index: u32,
}

#[derive(Clone, Debug)]
pub struct File {
    pub id: NodeId,
    pub pos: Pos,
    pub end: Pos,
    /// Position of the `package` keyword; `Pos::NONE` when the clause is
    /// omitted, which the extension language allows.
    pub package: Pos,
    pub name: Option<Ident>,
    pub doc: Option<String>,
    pub decls: Vec<Decl>,
}

impl File {
    pub fn imports(&self) -> impl Iterator<Item = &ImportSpec> {
        self.decls
            .iter()
            .filter_map(|decl| match decl {
                Decl::Gen(gen) if gen.tok == DeclKind::Import => Some(gen),
                _ => None,
            })
            .flat_map(|gen| gen.specs.iter())
            .filter_map(|spec| match spec {
                Spec::Import(import) => Some(import),
                _ => None,
            })
    }

    pub fn package_name(&self) -> &str {
        self.name.as_ref().map(|n| n.name.as_str()).unwrap_or("main")
    }
}

#[derive(Clone, Debug)]
pub struct BadNode {
    pub id: NodeId,
    pub pos: Pos,
    pub end: Pos,
}

#[derive(Clone, Debug)]
pub enum Decl {
    Gen(GenDecl),
    Func(FuncDecl),
    Bad(BadNode),
}

impl Decl {
    pub fn pos(&self) -> Pos {
        match self {
            Decl::Gen(gen) => gen.pos,
            Decl::Func(func) => func.pos,
            Decl::Bad(bad) => bad.pos,
        }
    }

    pub fn end(&self) -> Pos {
        match self {
            Decl::Gen(gen) => gen.end,
            Decl::Func(func) => func.end,
            Decl::Bad(bad) => bad.end,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclKind {
    Import,
    Const,
    Var,
    Type,
}

#[derive(Clone, Debug)]
pub struct GenDecl {
    pub id: NodeId,
    pub doc: Option<String>,
    pub pos: Pos,
    pub tok: DeclKind,
    pub lparen: Pos,
    pub specs: Vec<Spec>,
    pub rparen: Pos,
    pub end: Pos,
}

#[derive(Clone, Debug)]
pub enum Spec {
    Import(ImportSpec),
    Value(ValueSpec),
    Type(TypeSpec),
}

impl Spec {
    pub fn pos(&self) -> Pos {
        match self {
            Spec::Import(spec) => spec.name.as_ref().map(|n| n.pos).unwrap_or(spec.path.pos),
            Spec::Value(spec) => spec.pos,
            Spec::Type(spec) => spec.name.pos,
        }
    }

    pub fn end(&self) -> Pos {
        match self {
            Spec::Import(spec) => spec.end,
            Spec::Value(spec) => spec.end,
            Spec::Type(spec) => spec.end,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ImportSpec {
    pub id: NodeId,
    pub doc: Option<String>,
    pub name: Option<Ident>,
    pub path: BasicLit,
    pub end: Pos,
}

impl ImportSpec {
    pub fn path_value(&self) -> String {
        self.path.unquoted()
    }
}

#[derive(Clone, Debug)]
pub struct ValueSpec {
    pub id: NodeId,
    pub doc: Option<String>,
    pub pos: Pos,
    pub names: Vec<Ident>,
    pub ty: Option<Expr>,
    pub values: Vec<Expr>,
    pub end: Pos,
}

#[derive(Clone, Debug)]
pub struct TypeSpec {
    pub id: NodeId,
    pub doc: Option<String>,
    pub name: Ident,
    pub type_params: Option<FieldList>,
    /// Position of `=` for aliases, `Pos::NONE` otherwise.
    pub assign: Pos,
    pub ty: Expr,
    pub end: Pos,
}

#[derive(Clone, Debug)]
pub struct FuncDecl {
    pub id: NodeId,
    pub doc: Option<String>,
    pub pos: Pos,
    pub recv: Option<FieldList>,
    pub name: Ident,
    pub ty: FuncType,
    pub body: Option<BlockStmt>,
    pub end: Pos,
}

#[derive(Clone, Debug)]
pub struct FuncType {
    pub id: NodeId,
    pub pos: Pos,
    pub type_params: Option<FieldList>,
    pub params: FieldList,
    pub results: Option<FieldList>,
    pub end: Pos,
}

#[derive(Clone, Debug)]
pub struct FieldList {
    pub id: NodeId,
    pub opening: Pos,
    pub list: Vec<Field>,
    pub closing: Pos,
}

impl FieldList {
    pub fn pos(&self) -> Pos {
        if self.opening.is_valid() {
            self.opening
        } else {
            self.list.first().map(|f| f.pos).unwrap_or(Pos::NONE)
        }
    }

    pub fn end(&self) -> Pos {
        if self.closing.is_valid() {
            self.closing.offset_by(1)
        } else {
            self.list.last().map(|f| f.end).unwrap_or(self.opening)
        }
    }

    /// Number of declared entries, counting each name separately.
    pub fn num_fields(&self) -> usize {
        self.list.iter().map(|f| f.names.len().max(1)).sum()
    }
}

#[derive(Clone, Debug)]
pub struct Field {
    pub id: NodeId,
    pub doc: Option<String>,
    pub pos: Pos,
    pub names: Vec<Ident>,
    pub ty: Expr,
    pub tag: Option<BasicLit>,
    pub end: Pos,
}

#[derive(Clone, Debug)]
pub struct BlockStmt {
    pub id: NodeId,
    pub lbrace: Pos,
    pub stmts: Vec<Stmt>,
    /// Position of the closing brace, or of the end of the buffer when the
    /// brace is missing.
    pub rbrace: Pos,
    pub end: Pos,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub id: NodeId,
    pub name: String,
    pub pos: Pos,
}

impl Ident {
    pub fn end(&self) -> Pos {
        self.pos.offset_by(self.name.len())
    }

    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }

    pub fn is_exported(&self) -> bool {
        is_exported(&self.name)
    }
}

pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|ch| ch.is_uppercase())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Char,
    String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicLit {
    pub id: NodeId,
    pub pos: Pos,
    pub kind: LitKind,
    pub value: String,
}

impl BasicLit {
    pub fn end(&self) -> Pos {
        self.pos.offset_by(self.value.len())
    }

    pub fn unquoted(&self) -> String {
        let value = self.value.as_str();
        value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('`').and_then(|v| v.strip_suffix('`')))
            .unwrap_or(value)
            .to_string()
    }
}

#[derive(Clone, Debug)]
pub struct Stmt {
    pub id: NodeId,
    pub pos: Pos,
    pub end: Pos,
    pub kind: StmtKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Define,
    Op(BinaryOp),
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    /// Placeholder for an unparsable statement.
    Bad,
    /// `implicit` is false when the statement was written (or repaired)
    /// explicitly rather than inferred from a newline.
    Empty {
        implicit: bool,
    },
    Decl(GenDecl),
    Labeled {
        label: Ident,
        stmt: Box<Stmt>,
    },
    Expr(Expr),
    Send {
        chan: Expr,
        value: Expr,
    },
    IncDec {
        x: Expr,
        inc: bool,
    },
    Assign {
        lhs: Vec<Expr>,
        op: AssignOp,
        rhs: Vec<Expr>,
    },
    Go(Expr),
    Defer(Expr),
    Return(Vec<Expr>),
    Branch {
        tok: BranchKind,
        label: Option<Ident>,
    },
    Block(BlockStmt),
    If {
        init: Option<Box<Stmt>>,
        cond: Expr,
        body: BlockStmt,
        els: Option<Box<Stmt>>,
    },
    Switch {
        init: Option<Box<Stmt>>,
        tag: Option<Expr>,
        body: Vec<CaseClause>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: BlockStmt,
    },
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        x: Expr,
        body: BlockStmt,
    },
}

#[derive(Clone, Debug)]
pub struct CaseClause {
    pub id: NodeId,
    pub pos: Pos,
    pub list: Vec<Expr>,
    pub is_default: bool,
    pub colon: Pos,
    pub body: Vec<Stmt>,
    pub end: Pos,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
    Xor,
    Addr,
    Recv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
    LAnd,
    LOr,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinaryOp {
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::LOr => 1,
            BinaryOp::LAnd => 2,
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq => 3,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Or | BinaryOp::Xor => 4,
            BinaryOp::Mul
            | BinaryOp::Quo
            | BinaryOp::Rem
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::And
            | BinaryOp::AndNot => 5,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 3
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub id: NodeId,
    pub pos: Pos,
    pub end: Pos,
    pub kind: ExprKind,
}

impl Expr {
    pub fn ident(ident: Ident) -> Self {
        Self {
            id: ident.id,
            pos: ident.pos,
            end: ident.end(),
            kind: ExprKind::Ident(ident),
        }
    }

    pub fn as_ident(&self) -> Option<&Ident> {
        match &self.kind {
            ExprKind::Ident(ident) => Some(ident),
            _ => None,
        }
    }

    /// Strips redundant parentheses.
    pub fn unparen(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) => inner.unparen(),
            _ => self,
        }
    }
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Bad,
    Ident(Ident),
    BasicLit(BasicLit),
    CompositeLit {
        ty: Option<Box<Expr>>,
        lbrace: Pos,
        elts: Vec<Expr>,
        rbrace: Pos,
    },
    FuncLit {
        ty: FuncType,
        body: BlockStmt,
    },
    Paren(Box<Expr>),
    Selector {
        x: Box<Expr>,
        sel: Ident,
    },
    Index {
        x: Box<Expr>,
        indices: Vec<Expr>,
    },
    Slice {
        x: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
    },
    TypeAssert {
        x: Box<Expr>,
        ty: Option<Box<Expr>>,
    },
    Call {
        fun: Box<Expr>,
        lparen: Pos,
        args: Vec<Expr>,
        ellipsis: Pos,
        rparen: Pos,
    },
    Star(Box<Expr>),
    Unary {
        op: UnaryOp,
        x: Box<Expr>,
    },
    Binary {
        x: Box<Expr>,
        op: BinaryOp,
        y: Box<Expr>,
    },
    KeyValue {
        key: Box<Expr>,
        colon: Pos,
        value: Box<Expr>,
    },
    ArrayType {
        len: Option<Box<Expr>>,
        elt: Box<Expr>,
    },
    MapType {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    ChanType {
        dir: ChanDir,
        value: Box<Expr>,
    },
    FuncType(FuncType),
    StructType(FieldList),
    InterfaceType(FieldList),
    Ellipsis(Option<Box<Expr>>),
}
