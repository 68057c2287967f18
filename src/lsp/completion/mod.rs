//! Turns scored candidate objects into completion items.
//!
//! Candidate discovery belongs to the caller: it hands each resolved object
//! to [`Completer::add`] (or [`Completer::item`]), asks for literal
//! suggestions through [`Completer::literal`], and collects the result with
//! [`Completer::finish`].

mod deep;
mod format;
mod literal;
mod matcher;

pub use deep::{DeepCompletionState, MAX_DEEP_COMPLETIONS};
pub use matcher::Matcher;

use super::{snippet::Builder, text::Mapper};
use crate::{
    config::CompletionOptions,
    language::{
        ast::{Expr, ExprKind, File},
        span::{FileSet, Pos, TokenFile},
        visit::{path_enclosing, Node},
    },
    types::{Arena, Info, ObjectId, ObjectKind, PackageId, Qualifier, ScopeId, Type, TypeId},
};
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use thiserror::Error;
use lsp_types::{
    self, CompletionItemKind, CompletionItemTag, Documentation, InsertTextFormat, TextEdit,
};

/// Score of a candidate that is known to be a good fit.
pub const HIGH_SCORE: f64 = 0.1;
/// Score multiplier for synthesized literals.
pub const LITERAL_CANDIDATE_SCORE: f64 = HIGH_SCORE / 2.0;
/// Deepest field chain explored by [`Completer::add_deep`].
const MAX_DEEP_DEPTH: usize = 4;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Candidate does not match the typed prefix")]
    NoMatch,
    #[error("Deep candidate is not among the best scores")]
    LowScore,
    #[error("Position {0:?} is outside the current file")]
    Position(Pos),
    #[error("No documentation for `{name}`: {reason}")]
    Documentation { name: String, reason: String },
}

/// Operation applied to a candidate to fit the expected type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Modifier {
    Reference,
    Dereference,
    ChanRead,
    Invoke,
    TakeSlice,
    TakeDotDotDot,
    Index,
}

/// A package that must be imported for a candidate to resolve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportInfo {
    pub import_path: String,
    pub name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Candidate {
    pub obj: ObjectId,
    /// Name as inserted; `a.b.c` for deep candidates.
    pub name: String,
    pub score: f64,
    /// Objects traversed to reach `obj`, empty unless the candidate is deep.
    pub path: Vec<ObjectId>,
    pub mods: Vec<Modifier>,
    pub convert_to: Option<TypeId>,
    pub imp: Option<ImportInfo>,
    /// Replaces the computed detail when set.
    pub detail: Option<String>,
    pub addressable: bool,
}

impl Candidate {
    pub fn new(arena: &Arena, obj: ObjectId, score: f64) -> Self {
        Self {
            obj,
            name: arena.object(obj).name.clone(),
            score,
            path: Vec::new(),
            mods: Vec::new(),
            convert_to: None,
            imp: None,
            detail: None,
            addressable: false,
        }
    }

    pub fn with_mods(mut self, mods: &[Modifier]) -> Self {
        self.mods.extend_from_slice(mods);
        self
    }

    pub fn has_mod(&self, m: Modifier) -> bool {
        self.mods.contains(&m)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemTag {
    Deprecated,
    /// The item stands for a family of overloads.
    Overload,
}

#[derive(Clone, Debug)]
pub struct CompletionItem {
    pub label: String,
    pub insert_text: String,
    pub additional_text_edits: Vec<TextEdit>,
    pub detail: String,
    pub kind: CompletionItemKind,
    pub tags: Vec<ItemTag>,
    pub score: f64,
    /// Length of the candidate's deep path.
    pub depth: usize,
    pub documentation: Option<String>,
    pub deprecated: bool,
    pub snippet: Option<Builder>,
    pub is_slice: bool,
    pub is_overload: bool,
    func_id: Option<String>,
}

impl CompletionItem {
    fn new(label: String, kind: CompletionItemKind, score: f64) -> Self {
        Self {
            insert_text: label.clone(),
            label,
            additional_text_edits: Vec::new(),
            detail: String::new(),
            kind,
            tags: Vec::new(),
            score,
            depth: 0,
            documentation: None,
            deprecated: false,
            snippet: None,
            is_slice: false,
            is_overload: false,
            func_id: None,
        }
    }

    /// Snippet text when there is one, the plain insert text otherwise.
    pub fn snippet_text(&self) -> &str {
        match &self.snippet {
            Some(snip) if !snip.is_empty() => snip.as_str(),
            _ => &self.insert_text,
        }
    }

    pub fn to_lsp(&self, snippets: bool) -> lsp_types::CompletionItem {
        let (insert_text, format) = match &self.snippet {
            Some(snip) if snippets && !snip.is_empty() => (snip.to_string(), InsertTextFormat::SNIPPET),
            _ if self.insert_text.is_empty() => (self.label.clone(), InsertTextFormat::PLAIN_TEXT),
            _ => (self.insert_text.clone(), InsertTextFormat::PLAIN_TEXT),
        };
        let tags: Vec<CompletionItemTag> = self
            .tags
            .iter()
            .filter(|tag| **tag == ItemTag::Deprecated)
            .map(|_| CompletionItemTag::DEPRECATED)
            .collect();
        lsp_types::CompletionItem {
            label: self.label.clone(),
            kind: Some(self.kind),
            detail: (!self.detail.is_empty()).then(|| self.detail.clone()),
            documentation: self.documentation.clone().map(Documentation::String),
            deprecated: self.deprecated.then_some(true),
            tags: (!tags.is_empty()).then_some(tags),
            insert_text: Some(insert_text),
            insert_text_format: Some(format),
            additional_text_edits: (!self.additional_text_edits.is_empty())
                .then(|| self.additional_text_edits.clone()),
            ..lsp_types::CompletionItem::default()
        }
    }
}

/// What the candidate at the cursor is expected to be.
#[derive(Clone, Copy, Debug, Default)]
pub struct Inference {
    pub obj_type: Option<TypeId>,
    /// The cursor is on the variadic parameter, so `obj_type` is its
    /// element type.
    pub variadic: bool,
}

impl Inference {
    pub fn matches_variadic(&self, arena: &Arena, ty: TypeId) -> bool {
        let Some(expected) = self.obj_type else {
            return false;
        };
        self.variadic
            && match arena.ty(arena.underlying(ty)) {
                Type::Slice(elem) => arena.identical(*elem, expected) || arena.is_empty_interface(expected),
                _ => false,
            }
    }
}

/// Type-checked file and cursor a completion request works on.
#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    pub fset: &'a FileSet,
    pub arena: &'a Arena,
    pub info: &'a Info,
    pub pkg: PackageId,
    pub file: &'a File,
    pub tok: &'a TokenFile,
    pub mapper: &'a Mapper,
    pub pos: Pos,
}

/// The composite literal whose braces hold the cursor.
#[derive(Clone, Copy, Debug)]
struct CompositeLitInfo {
    lbrace: Pos,
    /// Dereferenced underlying type of the literal.
    ty: Option<TypeId>,
    /// The cursor is in the value half of a `key: value` element.
    in_value: bool,
}

pub struct Completer<'a> {
    fset: &'a FileSet,
    arena: &'a Arena,
    info: &'a Info,
    pkg: PackageId,
    file: &'a File,
    tok: &'a TokenFile,
    mapper: &'a Mapper,
    pos: Pos,
    /// Nodes enclosing the cursor, innermost first.
    path: Vec<Node<'a>>,
    lit: Option<CompositeLitInfo>,
    pub matcher: Matcher,
    pub deep_state: DeepCompletionState,
    pub inference: Inference,
    opts: CompletionOptions,
    items: Vec<CompletionItem>,
    /// Identities of index overloads already covered by a family item.
    skip_func: FxHashSet<String>,
}

impl<'a> Completer<'a> {
    pub fn new(cursor: Cursor<'a>, opts: CompletionOptions) -> Self {
        let path = path_enclosing(cursor.file, cursor.pos);
        let prefix = match path.first() {
            Some(Node::Ident(ident)) if ident.pos <= cursor.pos && cursor.pos <= ident.end() => {
                let len = (cursor.pos.0 - ident.pos.0) as usize;
                ident.name.get(..len).unwrap_or_default().to_string()
            }
            _ => String::new(),
        };
        tracing::debug!(prefix = %prefix, "starting completion");
        let lit = enclosing_composite_lit(&path, cursor.pos, cursor.arena, cursor.info);
        Self {
            fset: cursor.fset,
            arena: cursor.arena,
            info: cursor.info,
            pkg: cursor.pkg,
            file: cursor.file,
            tok: cursor.tok,
            mapper: cursor.mapper,
            pos: cursor.pos,
            path,
            lit,
            matcher: Matcher::new(&prefix),
            deep_state: DeepCompletionState::new(opts.deep),
            inference: Inference::default(),
            opts,
            items: Vec::new(),
            skip_func: FxHashSet::default(),
        }
    }

    pub fn with_inference(mut self, inference: Inference) -> Self {
        self.inference = inference;
        self
    }

    fn qf(&self) -> Qualifier {
        Qualifier::RelativeTo(self.pkg)
    }

    /// Formats `cand` and keeps the item if it matches.
    pub fn add(&mut self, cand: Candidate) {
        match self.item(cand) {
            Ok(item) => self.items.push(item),
            Err(FormatError::NoMatch | FormatError::LowScore) => {}
            Err(err) => tracing::debug!(error = %err, "dropping completion candidate"),
        }
    }

    /// Adds `root` and the fields reachable from it, e.g. `cfg.server.addr`.
    pub fn add_deep(&mut self, root: Candidate) {
        self.add(root.clone());
        if !self.deep_state.enabled {
            return;
        }
        let arena = self.arena;
        self.deep_state.enqueue(root);
        while let Some(cand) = self.deep_state.dequeue() {
            if cand.path.len() >= MAX_DEEP_DEPTH {
                continue;
            }
            let object = arena.object(cand.obj);
            if !matches!(object.kind, ObjectKind::Var { .. }) {
                continue;
            }
            let Some(fields) = arena.struct_fields(arena.deref(object.ty)) else {
                continue;
            };
            for &field in fields {
                let field_obj = arena.object(field);
                if !field_obj.is_exported() && field_obj.pkg != Some(self.pkg) {
                    continue;
                }
                let mut next = Candidate::new(arena, field, cand.score);
                next.name = format!("{}.{}", cand.name, field_obj.name);
                next.path = DeepCompletionState::new_path(&cand, cand.obj);
                next.score *= DeepCompletionState::score_penalty(&next);
                next.addressable = true;
                self.add(next.clone());
                self.deep_state.enqueue(next);
            }
        }
    }

    /// Collected items, best first, without the index overloads that a
    /// family item already covers.
    pub fn finish(mut self) -> Vec<CompletionItem> {
        let skip = std::mem::take(&mut self.skip_func);
        let mut items: Vec<CompletionItem> = self
            .items
            .into_iter()
            .filter(|item| item.func_id.as_ref().map_or(true, |id| !skip.contains(id)))
            .collect();
        items.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.label.cmp(&b.label))
        });
        items
    }

    /// Selector the cursor sits in, e.g. `fmt.Pr|`.
    fn enclosing_selector(&self) -> Option<&'a Expr> {
        let selector = |node: &Node<'a>| match node {
            Node::Expr(expr) if matches!(expr.kind, ExprKind::Selector { .. }) => Some(*expr),
            _ => None,
        };
        let first = self.path.first()?;
        if let Some(sel) = selector(first) {
            return Some(sel);
        }
        if let Node::Ident(_) = first {
            let sel = selector(self.path.get(1)?)?;
            if let ExprKind::Selector { sel: name, .. } = &sel.kind {
                if self.pos >= name.pos {
                    return Some(sel);
                }
            }
        }
        None
    }

    /// Innermost scope holding the cursor.
    fn innermost_scope(&self) -> Option<ScopeId> {
        let file_scope = self.info.scopes.get(&self.file.id)?;
        Some(self.arena.innermost_scope(*file_scope, self.pos))
    }

    fn edit_text(&self, from: Pos, to: Pos, text: &str) -> Result<Vec<TextEdit>, FormatError> {
        let position = |pos: Pos| {
            self.tok
                .offset(pos)
                .and_then(|offset| self.mapper.offset_position(offset))
                .ok_or(FormatError::Position(pos))
        };
        Ok(vec![TextEdit {
            range: lsp_types::Range {
                start: position(from)?,
                end: position(to)?,
            },
            new_text: text.to_string(),
        }])
    }

    /// Edits that add `imp` to the current file's imports.
    fn import_edits(&self, imp: &ImportInfo) -> Result<Vec<TextEdit>, FormatError> {
        if self.file.imports().any(|spec| spec.path_value() == imp.import_path) {
            return Ok(Vec::new());
        }
        let spec = match &imp.name {
            Some(name) => format!("{name} \"{}\"", imp.import_path),
            None => format!("\"{}\"", imp.import_path),
        };
        let decls = self.file.decls.iter().filter_map(|decl| match decl {
            crate::language::ast::Decl::Gen(gen) if gen.tok == crate::language::ast::DeclKind::Import => Some(gen),
            _ => None,
        });
        if let Some(last) = decls.last() {
            if last.rparen.is_valid() {
                let offset = self.tok.offset(last.rparen).ok_or(FormatError::Position(last.rparen))?;
                let line_start = self
                    .tok
                    .line_start(self.tok.line_of(offset))
                    .unwrap_or(offset);
                let at = self.tok.pos(line_start);
                return self.edit_text(at, at, &format!("\t{spec}\n"));
            }
            return self.edit_text(last.end, last.end, &format!("\nimport {spec}"));
        }
        match &self.file.name {
            Some(name) => {
                let end = name.end();
                self.edit_text(end, end, &format!("\n\nimport {spec}"))
            }
            None => {
                let start = self.tok.pos(0);
                self.edit_text(start, start, &format!("import {spec}\n\n"))
            }
        }
    }
}

fn enclosing_composite_lit(path: &[Node<'_>], pos: Pos, arena: &Arena, info: &Info) -> Option<CompositeLitInfo> {
    for node in path {
        let Node::Expr(expr) = node else { continue };
        let ExprKind::CompositeLit { lbrace, elts, rbrace, .. } = &expr.kind else {
            continue;
        };
        if !(*lbrace < pos && (pos <= *rbrace || !rbrace.is_valid())) {
            continue;
        }
        let ty = info
            .types
            .get(&expr.id)
            .map(|tv| arena.underlying(arena.deref(tv.ty)));
        let in_value = elts.iter().any(|elt| match &elt.kind {
            ExprKind::KeyValue { colon, value, .. } => *colon < pos && pos <= value.end,
            _ => false,
        });
        return Some(CompositeLitInfo {
            lbrace: *lbrace,
            ty,
            in_value,
        });
    }
    None
}

/// Identity of a function for overload bookkeeping: `(pkg.T).M` for methods,
/// `pkg.F` for functions.
pub fn func_id(arena: &Arena, func: ObjectId) -> String {
    let object = arena.object(func);
    let mut out = String::new();
    match object.owner {
        Some(owner) if arena.as_named(owner).is_some() => {
            let named = arena.as_named(owner).map(|n| n.origin.unwrap_or(owner)).unwrap_or(owner);
            let type_obj = arena.as_named(named).map(|n| arena.object(n.obj));
            out.push('(');
            if let Some(type_obj) = type_obj {
                if let Some(pkg) = type_obj.pkg {
                    out.push_str(&arena.package(pkg).path);
                    out.push('.');
                }
                out.push_str(&type_obj.name);
            }
            out.push_str(").");
        }
        Some(_) => out.push_str("(interface)."),
        None => {
            if let Some(pkg) = object.pkg {
                out.push_str(&arena.package(pkg).path);
                out.push('.');
            }
        }
    }
    out.push_str(&object.name);
    out
}

#[cfg(test)]
mod tests;
