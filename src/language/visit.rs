use crate::language::{ast::*, span::Pos};

/// Borrowed view of any syntax node, used for uniform traversal.
///
/// Identifier and literal expressions surface as [`Node::Ident`] and
/// [`Node::BasicLit`]; block statements surface as [`Node::Block`].
#[derive(Clone, Copy, Debug)]
pub enum Node<'a> {
    File(&'a File),
    GenDecl(&'a GenDecl),
    FuncDecl(&'a FuncDecl),
    BadDecl(&'a BadNode),
    ImportSpec(&'a ImportSpec),
    ValueSpec(&'a ValueSpec),
    TypeSpec(&'a TypeSpec),
    FieldList(&'a FieldList),
    Field(&'a Field),
    FuncType(&'a FuncType),
    Block(&'a BlockStmt),
    Stmt(&'a Stmt),
    CaseClause(&'a CaseClause),
    Expr(&'a Expr),
    Ident(&'a Ident),
    BasicLit(&'a BasicLit),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeKind {
    File,
    GenDecl,
    FuncDecl,
    BadDecl,
    ImportSpec,
    ValueSpec,
    TypeSpec,
    FieldList,
    Field,
    FuncType,
    BlockStmt,
    CaseClause,
    Ident,
    BasicLit,
    BadStmt,
    EmptyStmt,
    DeclStmt,
    LabeledStmt,
    ExprStmt,
    SendStmt,
    IncDecStmt,
    AssignStmt,
    GoStmt,
    DeferStmt,
    ReturnStmt,
    BranchStmt,
    IfStmt,
    ForStmt,
    RangeStmt,
    SwitchStmt,
    BadExpr,
    CompositeLit,
    FuncLit,
    ParenExpr,
    SelectorExpr,
    IndexExpr,
    SliceExpr,
    TypeAssertExpr,
    CallExpr,
    StarExpr,
    UnaryExpr,
    BinaryExpr,
    KeyValueExpr,
    ArrayType,
    MapType,
    ChanType,
    StructType,
    InterfaceType,
    Ellipsis,
}

impl NodeKind {
    pub fn mask(self) -> u64 {
        1u64 << (self as u8)
    }
}

impl<'a> Node<'a> {
    pub fn from_expr(expr: &'a Expr) -> Self {
        match &expr.kind {
            ExprKind::Ident(ident) => Node::Ident(ident),
            ExprKind::BasicLit(lit) => Node::BasicLit(lit),
            ExprKind::FuncType(ty) => Node::FuncType(ty),
            _ => Node::Expr(expr),
        }
    }

    pub fn from_stmt(stmt: &'a Stmt) -> Self {
        match &stmt.kind {
            StmtKind::Block(block) => Node::Block(block),
            _ => Node::Stmt(stmt),
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            Node::File(n) => n.id,
            Node::GenDecl(n) => n.id,
            Node::FuncDecl(n) => n.id,
            Node::BadDecl(n) => n.id,
            Node::ImportSpec(n) => n.id,
            Node::ValueSpec(n) => n.id,
            Node::TypeSpec(n) => n.id,
            Node::FieldList(n) => n.id,
            Node::Field(n) => n.id,
            Node::FuncType(n) => n.id,
            Node::Block(n) => n.id,
            Node::Stmt(n) => n.id,
            Node::CaseClause(n) => n.id,
            Node::Expr(n) => n.id,
            Node::Ident(n) => n.id,
            Node::BasicLit(n) => n.id,
        }
    }

    pub fn pos(&self) -> Pos {
        match self {
            Node::File(n) => n.pos,
            Node::GenDecl(n) => n.pos,
            Node::FuncDecl(n) => n.pos,
            Node::BadDecl(n) => n.pos,
            Node::ImportSpec(n) => n.name.as_ref().map(|i| i.pos).unwrap_or(n.path.pos),
            Node::ValueSpec(n) => n.pos,
            Node::TypeSpec(n) => n.name.pos,
            Node::FieldList(n) => n.pos(),
            Node::Field(n) => n.pos,
            Node::FuncType(n) => n.pos,
            Node::Block(n) => n.lbrace,
            Node::Stmt(n) => n.pos,
            Node::CaseClause(n) => n.pos,
            Node::Expr(n) => n.pos,
            Node::Ident(n) => n.pos,
            Node::BasicLit(n) => n.pos,
        }
    }

    pub fn end(&self) -> Pos {
        match self {
            Node::File(n) => n.end,
            Node::GenDecl(n) => n.end,
            Node::FuncDecl(n) => n.end,
            Node::BadDecl(n) => n.end,
            Node::ImportSpec(n) => n.end,
            Node::ValueSpec(n) => n.end,
            Node::TypeSpec(n) => n.end,
            Node::FieldList(n) => n.end(),
            Node::Field(n) => n.end,
            Node::FuncType(n) => n.end,
            Node::Block(n) => n.end,
            Node::Stmt(n) => n.end,
            Node::CaseClause(n) => n.end,
            Node::Expr(n) => n.end,
            Node::Ident(n) => n.end(),
            Node::BasicLit(n) => n.end(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::File(_) => NodeKind::File,
            Node::GenDecl(_) => NodeKind::GenDecl,
            Node::FuncDecl(_) => NodeKind::FuncDecl,
            Node::BadDecl(_) => NodeKind::BadDecl,
            Node::ImportSpec(_) => NodeKind::ImportSpec,
            Node::ValueSpec(_) => NodeKind::ValueSpec,
            Node::TypeSpec(_) => NodeKind::TypeSpec,
            Node::FieldList(_) => NodeKind::FieldList,
            Node::Field(_) => NodeKind::Field,
            Node::FuncType(_) => NodeKind::FuncType,
            Node::Block(_) => NodeKind::BlockStmt,
            Node::CaseClause(_) => NodeKind::CaseClause,
            Node::Ident(_) => NodeKind::Ident,
            Node::BasicLit(_) => NodeKind::BasicLit,
            Node::Stmt(stmt) => match &stmt.kind {
                StmtKind::Bad => NodeKind::BadStmt,
                StmtKind::Empty { .. } => NodeKind::EmptyStmt,
                StmtKind::Decl(_) => NodeKind::DeclStmt,
                StmtKind::Labeled { .. } => NodeKind::LabeledStmt,
                StmtKind::Expr(_) => NodeKind::ExprStmt,
                StmtKind::Send { .. } => NodeKind::SendStmt,
                StmtKind::IncDec { .. } => NodeKind::IncDecStmt,
                StmtKind::Assign { .. } => NodeKind::AssignStmt,
                StmtKind::Go(_) => NodeKind::GoStmt,
                StmtKind::Defer(_) => NodeKind::DeferStmt,
                StmtKind::Return(_) => NodeKind::ReturnStmt,
                StmtKind::Branch { .. } => NodeKind::BranchStmt,
                StmtKind::Block(_) => NodeKind::BlockStmt,
                StmtKind::If { .. } => NodeKind::IfStmt,
                StmtKind::Switch { .. } => NodeKind::SwitchStmt,
                StmtKind::For { .. } => NodeKind::ForStmt,
                StmtKind::Range { .. } => NodeKind::RangeStmt,
            },
            Node::Expr(expr) => match &expr.kind {
                ExprKind::Bad => NodeKind::BadExpr,
                ExprKind::Ident(_) => NodeKind::Ident,
                ExprKind::BasicLit(_) => NodeKind::BasicLit,
                ExprKind::CompositeLit { .. } => NodeKind::CompositeLit,
                ExprKind::FuncLit { .. } => NodeKind::FuncLit,
                ExprKind::Paren(_) => NodeKind::ParenExpr,
                ExprKind::Selector { .. } => NodeKind::SelectorExpr,
                ExprKind::Index { .. } => NodeKind::IndexExpr,
                ExprKind::Slice { .. } => NodeKind::SliceExpr,
                ExprKind::TypeAssert { .. } => NodeKind::TypeAssertExpr,
                ExprKind::Call { .. } => NodeKind::CallExpr,
                ExprKind::Star(_) => NodeKind::StarExpr,
                ExprKind::Unary { .. } => NodeKind::UnaryExpr,
                ExprKind::Binary { .. } => NodeKind::BinaryExpr,
                ExprKind::KeyValue { .. } => NodeKind::KeyValueExpr,
                ExprKind::ArrayType { .. } => NodeKind::ArrayType,
                ExprKind::MapType { .. } => NodeKind::MapType,
                ExprKind::ChanType { .. } => NodeKind::ChanType,
                ExprKind::FuncType(_) => NodeKind::FuncType,
                ExprKind::StructType(_) => NodeKind::StructType,
                ExprKind::InterfaceType(_) => NodeKind::InterfaceType,
                ExprKind::Ellipsis(_) => NodeKind::Ellipsis,
            },
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<Node<'a>> {
        let mut out = Vec::new();
        match *self {
            Node::File(file) => {
                out.extend(file.name.as_ref().map(Node::Ident));
                for decl in &file.decls {
                    out.push(match decl {
                        Decl::Gen(gen) => Node::GenDecl(gen),
                        Decl::Func(func) => Node::FuncDecl(func),
                        Decl::Bad(bad) => Node::BadDecl(bad),
                    });
                }
            }
            Node::GenDecl(gen) => {
                for spec in &gen.specs {
                    out.push(match spec {
                        Spec::Import(s) => Node::ImportSpec(s),
                        Spec::Value(s) => Node::ValueSpec(s),
                        Spec::Type(s) => Node::TypeSpec(s),
                    });
                }
            }
            Node::FuncDecl(func) => {
                out.extend(func.recv.as_ref().map(Node::FieldList));
                out.push(Node::Ident(&func.name));
                out.push(Node::FuncType(&func.ty));
                out.extend(func.body.as_ref().map(Node::Block));
            }
            Node::BadDecl(_) | Node::Ident(_) | Node::BasicLit(_) => {}
            Node::ImportSpec(spec) => {
                out.extend(spec.name.as_ref().map(Node::Ident));
                out.push(Node::BasicLit(&spec.path));
            }
            Node::ValueSpec(spec) => {
                out.extend(spec.names.iter().map(Node::Ident));
                out.extend(spec.ty.as_ref().map(Node::from_expr));
                out.extend(spec.values.iter().map(Node::from_expr));
            }
            Node::TypeSpec(spec) => {
                out.push(Node::Ident(&spec.name));
                out.extend(spec.type_params.as_ref().map(Node::FieldList));
                out.push(Node::from_expr(&spec.ty));
            }
            Node::FieldList(list) => out.extend(list.list.iter().map(Node::Field)),
            Node::Field(field) => {
                out.extend(field.names.iter().map(Node::Ident));
                out.push(Node::from_expr(&field.ty));
                out.extend(field.tag.as_ref().map(Node::BasicLit));
            }
            Node::FuncType(ty) => {
                out.extend(ty.type_params.as_ref().map(Node::FieldList));
                out.push(Node::FieldList(&ty.params));
                out.extend(ty.results.as_ref().map(Node::FieldList));
            }
            Node::Block(block) => out.extend(block.stmts.iter().map(Node::from_stmt)),
            Node::CaseClause(clause) => {
                out.extend(clause.list.iter().map(Node::from_expr));
                out.extend(clause.body.iter().map(Node::from_stmt));
            }
            Node::Stmt(stmt) => stmt_children(stmt, &mut out),
            Node::Expr(expr) => expr_children(expr, &mut out),
        }
        out
    }
}

fn stmt_children<'a>(stmt: &'a Stmt, out: &mut Vec<Node<'a>>) {
    match &stmt.kind {
        StmtKind::Bad | StmtKind::Empty { .. } => {}
        StmtKind::Decl(gen) => out.push(Node::GenDecl(gen)),
        StmtKind::Labeled { label, stmt } => {
            out.push(Node::Ident(label));
            out.push(Node::from_stmt(stmt));
        }
        StmtKind::Expr(x) | StmtKind::Go(x) | StmtKind::Defer(x) => out.push(Node::from_expr(x)),
        StmtKind::Send { chan, value } => {
            out.push(Node::from_expr(chan));
            out.push(Node::from_expr(value));
        }
        StmtKind::IncDec { x, .. } => out.push(Node::from_expr(x)),
        StmtKind::Assign { lhs, rhs, .. } => {
            out.extend(lhs.iter().map(Node::from_expr));
            out.extend(rhs.iter().map(Node::from_expr));
        }
        StmtKind::Return(results) => out.extend(results.iter().map(Node::from_expr)),
        StmtKind::Branch { label, .. } => out.extend(label.as_ref().map(Node::Ident)),
        StmtKind::Block(block) => out.push(Node::Block(block)),
        StmtKind::If {
            init,
            cond,
            body,
            els,
        } => {
            out.extend(init.as_deref().map(Node::from_stmt));
            out.push(Node::from_expr(cond));
            out.push(Node::Block(body));
            out.extend(els.as_deref().map(Node::from_stmt));
        }
        StmtKind::Switch { init, tag, body } => {
            out.extend(init.as_deref().map(Node::from_stmt));
            out.extend(tag.as_ref().map(Node::from_expr));
            out.extend(body.iter().map(Node::CaseClause));
        }
        StmtKind::For {
            init,
            cond,
            post,
            body,
        } => {
            out.extend(init.as_deref().map(Node::from_stmt));
            out.extend(cond.as_ref().map(Node::from_expr));
            out.extend(post.as_deref().map(Node::from_stmt));
            out.push(Node::Block(body));
        }
        StmtKind::Range {
            key, value, x, body, ..
        } => {
            out.extend(key.as_ref().map(Node::from_expr));
            out.extend(value.as_ref().map(Node::from_expr));
            out.push(Node::from_expr(x));
            out.push(Node::Block(body));
        }
    }
}

fn expr_children<'a>(expr: &'a Expr, out: &mut Vec<Node<'a>>) {
    match &expr.kind {
        ExprKind::Bad | ExprKind::Ident(_) | ExprKind::BasicLit(_) => {}
        ExprKind::CompositeLit { ty, elts, .. } => {
            out.extend(ty.as_deref().map(Node::from_expr));
            out.extend(elts.iter().map(Node::from_expr));
        }
        ExprKind::FuncLit { ty, body } => {
            out.push(Node::FuncType(ty));
            out.push(Node::Block(body));
        }
        ExprKind::Paren(x) | ExprKind::Star(x) | ExprKind::Unary { x, .. } => {
            out.push(Node::from_expr(x))
        }
        ExprKind::Selector { x, sel } => {
            out.push(Node::from_expr(x));
            out.push(Node::Ident(sel));
        }
        ExprKind::Index { x, indices } => {
            out.push(Node::from_expr(x));
            out.extend(indices.iter().map(Node::from_expr));
        }
        ExprKind::Slice { x, low, high } => {
            out.push(Node::from_expr(x));
            out.extend(low.as_deref().map(Node::from_expr));
            out.extend(high.as_deref().map(Node::from_expr));
        }
        ExprKind::TypeAssert { x, ty } => {
            out.push(Node::from_expr(x));
            out.extend(ty.as_deref().map(Node::from_expr));
        }
        ExprKind::Call { fun, args, .. } => {
            out.push(Node::from_expr(fun));
            out.extend(args.iter().map(Node::from_expr));
        }
        ExprKind::Binary { x, y, .. } => {
            out.push(Node::from_expr(x));
            out.push(Node::from_expr(y));
        }
        ExprKind::KeyValue { key, value, .. } => {
            out.push(Node::from_expr(key));
            out.push(Node::from_expr(value));
        }
        ExprKind::ArrayType { len, elt } => {
            out.extend(len.as_deref().map(Node::from_expr));
            out.push(Node::from_expr(elt));
        }
        ExprKind::MapType { key, value } => {
            out.push(Node::from_expr(key));
            out.push(Node::from_expr(value));
        }
        ExprKind::ChanType { value, .. } => out.push(Node::from_expr(value)),
        ExprKind::FuncType(ty) => out.push(Node::FuncType(ty)),
        ExprKind::StructType(fields) | ExprKind::InterfaceType(fields) => {
            out.push(Node::FieldList(fields))
        }
        ExprKind::Ellipsis(elt) => out.extend(elt.as_deref().map(Node::from_expr)),
    }
}

/// Depth-first traversal. `f` is called with `Some(node)` before the
/// children and, when it returned true, with `None` after them.
pub fn inspect<'a, F>(node: Node<'a>, f: &mut F)
where
    F: FnMut(Option<Node<'a>>) -> bool,
{
    if f(Some(node)) {
        for child in node.children() {
            inspect(child, f);
        }
        f(None);
    }
}

/// Nodes enclosing `pos`, innermost first, ending with the file.
pub fn path_enclosing(file: &File, pos: Pos) -> Vec<Node<'_>> {
    let mut path = vec![Node::File(file)];
    let mut current = Node::File(file);
    loop {
        let next = current
            .children()
            .into_iter()
            .find(|child| child.pos() <= pos && pos <= child.end());
        match next {
            Some(child) => {
                path.push(child);
                current = child;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Visits every statement of `file` mutably, including statements inside
/// function literals.
pub fn for_each_stmt_mut(file: &mut File, f: &mut impl FnMut(&mut Stmt)) {
    for decl in &mut file.decls {
        match decl {
            Decl::Func(func) => {
                if let Some(body) = &mut func.body {
                    block_mut(body, f);
                }
            }
            Decl::Gen(gen) => gen_mut(gen, f),
            Decl::Bad(_) => {}
        }
    }
}

fn gen_mut(gen: &mut GenDecl, f: &mut impl FnMut(&mut Stmt)) {
    for spec in &mut gen.specs {
        if let Spec::Value(value) = spec {
            for expr in &mut value.values {
                expr_mut(expr, f);
            }
        }
    }
}

fn block_mut(block: &mut BlockStmt, f: &mut impl FnMut(&mut Stmt)) {
    for stmt in &mut block.stmts {
        stmt_mut(stmt, f);
    }
}

fn stmt_mut(stmt: &mut Stmt, f: &mut impl FnMut(&mut Stmt)) {
    f(stmt);
    match &mut stmt.kind {
        StmtKind::Bad | StmtKind::Empty { .. } | StmtKind::Branch { .. } => {}
        StmtKind::Decl(gen) => gen_mut(gen, f),
        StmtKind::Labeled { stmt, .. } => stmt_mut(stmt, f),
        StmtKind::Expr(x) | StmtKind::Go(x) | StmtKind::Defer(x) | StmtKind::IncDec { x, .. } => {
            expr_mut(x, f)
        }
        StmtKind::Send { chan, value } => {
            expr_mut(chan, f);
            expr_mut(value, f);
        }
        StmtKind::Assign { lhs, rhs, .. } => {
            for x in lhs.iter_mut().chain(rhs.iter_mut()) {
                expr_mut(x, f);
            }
        }
        StmtKind::Return(results) => {
            for x in results {
                expr_mut(x, f);
            }
        }
        StmtKind::Block(block) => block_mut(block, f),
        StmtKind::If {
            init,
            cond,
            body,
            els,
        } => {
            if let Some(init) = init {
                stmt_mut(init, f);
            }
            expr_mut(cond, f);
            block_mut(body, f);
            if let Some(els) = els {
                stmt_mut(els, f);
            }
        }
        StmtKind::Switch { init, tag, body } => {
            if let Some(init) = init {
                stmt_mut(init, f);
            }
            if let Some(tag) = tag {
                expr_mut(tag, f);
            }
            for clause in body {
                for x in &mut clause.list {
                    expr_mut(x, f);
                }
                for stmt in &mut clause.body {
                    stmt_mut(stmt, f);
                }
            }
        }
        StmtKind::For {
            init,
            cond,
            post,
            body,
        } => {
            if let Some(init) = init {
                stmt_mut(init, f);
            }
            if let Some(cond) = cond {
                expr_mut(cond, f);
            }
            if let Some(post) = post {
                stmt_mut(post, f);
            }
            block_mut(body, f);
        }
        StmtKind::Range { x, body, .. } => {
            expr_mut(x, f);
            block_mut(body, f);
        }
    }
}

/// Only function literals hold statements; everything else is descended
/// into to reach them.
fn expr_mut(expr: &mut Expr, f: &mut impl FnMut(&mut Stmt)) {
    match &mut expr.kind {
        ExprKind::FuncLit { body, .. } => block_mut(body, f),
        ExprKind::CompositeLit { elts, .. } => {
            for elt in elts {
                expr_mut(elt, f);
            }
        }
        ExprKind::Paren(x)
        | ExprKind::Star(x)
        | ExprKind::Unary { x, .. }
        | ExprKind::Selector { x, .. }
        | ExprKind::TypeAssert { x, .. }
        | ExprKind::Slice { x, .. } => expr_mut(x, f),
        ExprKind::Index { x, indices } => {
            expr_mut(x, f);
            for index in indices {
                expr_mut(index, f);
            }
        }
        ExprKind::Call { fun, args, .. } => {
            expr_mut(fun, f);
            for arg in args {
                expr_mut(arg, f);
            }
        }
        ExprKind::Binary { x, y, .. } => {
            expr_mut(x, f);
            expr_mut(y, f);
        }
        ExprKind::KeyValue { key, value, .. } => {
            expr_mut(key, f);
            expr_mut(value, f);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{parser::parse, span::FileSet};

    #[test]
    fn inspect_visits_in_source_order_and_closes_each_node() {
        let mut fset = FileSet::new();
        let (file, _) = parse(&mut fset, "v.gop", b"package p\nfunc f() { g(a, b) }\n");
        let file = file.expect("tree");
        let mut idents = Vec::new();
        let mut depth = 0i32;
        inspect(Node::File(&file), &mut |node| {
            match node {
                Some(Node::Ident(ident)) => idents.push(ident.name.clone()),
                Some(_) => {}
                None => depth -= 1,
            }
            if node.is_some() {
                depth += 1;
            }
            true
        });
        assert_eq!(idents, vec!["p", "f", "g", "a", "b"]);
        assert_eq!(depth, 0);
    }

    #[test]
    fn path_enclosing_ends_at_innermost_ident() {
        let mut fset = FileSet::new();
        let src = b"package p\nfunc f() { g(a, b) }\n";
        let (file, _) = parse(&mut fset, "v.gop", src);
        let file = file.expect("tree");
        let offset = src.iter().position(|b| *b == b'b').expect("b");
        let pos = fset.files().next().expect("registered").pos(offset);
        let path = path_enclosing(&file, pos);
        assert!(matches!(path[0], Node::Ident(ident) if ident.name == "b"));
        assert!(matches!(path[1].kind(), NodeKind::CallExpr));
        assert!(matches!(path.last(), Some(Node::File(_))));
    }
}
