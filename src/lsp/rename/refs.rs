use super::{PackageUnit, RenameError};
use crate::{
    error::CancelToken,
    language::{
        ast::{Expr, ExprKind, Ident},
        visit::{inspect, Node},
    },
    types::{Arena, Info, ObjectId, ScopeId, Type, TypeId},
};

enum Step<'a> {
    Enter(Node<'a>),
    Exit,
}

/// Calls `f(ident, block)` for every identifier of `unit` that refers to
/// `obj` lexically, with `block` the innermost scope around the reference.
/// Selected names (`x.sel`) and struct literal keys are not lexical
/// references and are skipped. Stops early and returns `Ok(false)` once `f`
/// returns false.
pub fn for_each_lexical_ref<'a>(
    cancel: &CancelToken,
    arena: &Arena,
    unit: &PackageUnit<'a>,
    obj: ObjectId,
    f: &mut dyn FnMut(&'a Ident, ScopeId) -> bool,
) -> Result<bool, RenameError> {
    let info = unit.info;
    for parsed in unit.files.iter().copied() {
        cancel.check()?;
        let file = &parsed.file;
        let mut work = vec![Step::Enter(Node::File(file))];
        let mut stack: Vec<Node<'a>> = Vec::new();
        while let Some(step) = work.pop() {
            let node = match step {
                Step::Exit => {
                    stack.pop();
                    continue;
                }
                Step::Enter(node) => node,
            };
            stack.push(node);
            work.push(Step::Exit);
            match node {
                Node::Ident(ident) => {
                    if info.uses.get(&ident.id) == Some(&obj) {
                        let Some(block) = enclosing_block(arena, info, &stack, ident) else {
                            return Err(RenameError::Internal(format!(
                                "no enclosing block for reference to \"{}\"",
                                ident.name
                            )));
                        };
                        if !f(ident, block) {
                            return Ok(false);
                        }
                    }
                }
                Node::Expr(expr) => push_expr_children(arena, info, expr, &mut work),
                _ => push_children(node, &mut work),
            }
        }
        if !stack.is_empty() {
            return Err(RenameError::Internal(format!(
                "reference traversal of {} ended with {} open nodes",
                parsed.name,
                stack.len()
            )));
        }
    }
    Ok(true)
}

fn push_children<'a>(node: Node<'a>, work: &mut Vec<Step<'a>>) {
    work.extend(node.children().into_iter().rev().map(Step::Enter));
}

fn push_expr_children<'a>(arena: &Arena, info: &Info, expr: &'a Expr, work: &mut Vec<Step<'a>>) {
    match &expr.kind {
        // `sel` resolves through the type of `x`, not the lexical scope.
        ExprKind::Selector { x, .. } => work.push(Step::Enter(Node::from_expr(x))),
        ExprKind::CompositeLit { ty, elts, .. } => {
            let Some(tv) = info.types.get(&expr.id) else { return };
            let is_struct = matches!(arena.ty(arena.underlying(arena.deref(tv.ty))), Type::Struct { .. });
            if !is_struct {
                push_children(Node::Expr(expr), work);
                return;
            }
            let mut children = Vec::with_capacity(elts.len() + 1);
            children.extend(ty.as_deref().map(Node::from_expr));
            for elt in elts {
                match &elt.kind {
                    ExprKind::KeyValue { value, .. } => children.push(Node::from_expr(value)),
                    _ => children.push(Node::from_expr(elt)),
                }
            }
            work.extend(children.into_iter().rev().map(Step::Enter));
        }
        _ => push_children(Node::Expr(expr), work),
    }
}

/// Innermost scope recorded for a node on `stack`, narrowed to `ident`.
fn enclosing_block(arena: &Arena, info: &Info, stack: &[Node<'_>], ident: &Ident) -> Option<ScopeId> {
    let scope = stack.iter().rev().find_map(|node| {
        let key = match node {
            // Parameters and body share the scope of the signature.
            Node::FuncDecl(func) => func.ty.id,
            Node::Expr(Expr {
                kind: ExprKind::FuncLit { ty, .. },
                ..
            }) => ty.id,
            other => other.id(),
        };
        info.scopes.get(&key).copied()
    })?;
    Some(arena.innermost_scope(scope, ident.pos))
}

/// The selected name of an `x.sel` expression and the type of `x`, when known.
pub(super) struct SelectorUse<'a> {
    pub sel: &'a Ident,
    pub base: Option<TypeId>,
}

/// Every selector expression of `unit` whose selected name is `name`.
pub(super) fn selectors_named<'a>(unit: &PackageUnit<'a>, name: &str) -> Vec<SelectorUse<'a>> {
    let info = unit.info;
    let mut out = Vec::new();
    for parsed in unit.files.iter().copied() {
        inspect(Node::File(&parsed.file), &mut |node| {
            if let Some(Node::Expr(expr)) = node {
                if let ExprKind::Selector { x, sel } = &expr.kind {
                    if sel.name == name {
                        out.push(SelectorUse {
                            sel,
                            base: info.types.get(&x.id).map(|tv| tv.ty),
                        });
                    }
                }
            }
            true
        });
    }
    out
}
