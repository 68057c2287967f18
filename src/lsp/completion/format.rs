use super::*;
use crate::{
    language::ast::NodeId,
    types::{builtin_signature, overload_base, signature_string, type_string, BuiltinSig},
};

/// Detail and kind for a type name.
fn format_type(arena: &Arena, ty: TypeId, qf: Qualifier) -> (String, CompletionItemKind) {
    if arena.is_interface(ty) {
        return ("interface{...}".into(), CompletionItemKind::INTERFACE);
    }
    match arena.ty(ty) {
        Type::Struct { .. } => ("struct{...}".into(), CompletionItemKind::STRUCT),
        Type::Named(named) => format_type(arena, named.underlying, qf),
        _ => (type_string(arena, ty, qf), CompletionItemKind::CLASS),
    }
}

/// `[K, V]` for a generic named type.
fn format_type_params(arena: &Arena, params: &[TypeId]) -> String {
    let names: Vec<String> = params.iter().map(|tp| type_string(arena, *tp, Qualifier::Unqualified)).collect();
    format!("[{}]", names.join(", "))
}

/// Parameter list entries as shown in call snippets, e.g. `x int`, `args ...any`.
fn param_strings(arena: &Arena, sig_ty: TypeId, qf: Qualifier) -> (Vec<String>, Vec<String>) {
    let Some(sig) = arena.as_signature(sig_ty) else {
        return (Vec::new(), Vec::new());
    };
    let tparams = sig
        .type_params
        .iter()
        .map(|tp| type_string(arena, *tp, Qualifier::Unqualified))
        .collect();
    let params = sig
        .params
        .iter()
        .enumerate()
        .map(|(idx, param)| {
            let param = arena.object(*param);
            let ty = match arena.ty(param.ty) {
                Type::Slice(elem) if sig.variadic && idx + 1 == sig.params.len() => {
                    format!("...{}", type_string(arena, *elem, qf))
                }
                _ => type_string(arena, param.ty, qf),
            };
            if param.name.is_empty() {
                ty
            } else {
                format!("{} {ty}", param.name)
            }
        })
        .collect();
    (tparams, params)
}

fn builtin_params(sig: &BuiltinSig) -> Vec<String> {
    sig.params
        .iter()
        .enumerate()
        .map(|(idx, (name, ty))| {
            let ty = if sig.variadic && idx + 1 == sig.params.len() {
                format!("...{ty}")
            } else {
                ty.to_string()
            };
            if name.is_empty() {
                ty
            } else {
                format!("{name} {ty}")
            }
        })
        .collect()
}

fn builtin_detail(sig: &BuiltinSig) -> String {
    let mut out = String::from("func");
    if !sig.type_params.is_empty() {
        let tparams: Vec<String> = sig.type_params.iter().map(|(n, c)| format!("{n} {c}")).collect();
        out.push_str(&format!("[{}]", tparams.join(", ")));
    }
    out.push_str(&format!("({})", builtin_params(sig).join(", ")));
    match sig.results {
        [] => {}
        [single] => out.push_str(&format!(" {single}")),
        many => out.push_str(&format!(" ({})", many.join(", "))),
    }
    out
}

/// First sentence of a doc comment, on one line.
pub(super) fn synopsis(text: &str) -> String {
    let paragraph = text.split("\n\n").next().unwrap_or_default();
    let flat = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
    let bytes = flat.as_bytes();
    for (idx, ch) in flat.char_indices() {
        if ch == '.' && bytes.get(idx + 1).map_or(true, |next| *next == b' ') {
            return flat[..=idx].to_string();
        }
    }
    flat
}

impl<'a> Completer<'a> {
    /// Renders `cand` as a completion item.
    pub fn item(&mut self, mut cand: Candidate) -> Result<CompletionItem, FormatError> {
        let match_score = self.matcher.score(&cand.name);
        if match_score <= 0.0 {
            return Err(FormatError::NoMatch);
        }
        cand.score *= match_score;

        if !cand.path.is_empty() && !self.deep_state.is_high_score(cand.score) {
            return Err(FormatError::LowScore);
        }

        let arena = self.arena;
        let obj = arena.object(cand.obj);
        if obj.parent == Some(arena.universe()) {
            return Ok(self.format_builtin(&cand));
        }

        let qf = self.qf();
        let mut label = cand.name.clone();
        let mut detail = if arena.is_invalid(obj.ty) {
            String::new()
        } else {
            type_string(arena, obj.ty, qf)
        };
        let mut edits: Vec<TextEdit> = Vec::new();

        if obj.kind == ObjectKind::TypeName && self.want_type_params() {
            if let Some(named) = arena.as_named(obj.ty) {
                if !named.type_params.is_empty() {
                    label.push_str(&format_type_params(arena, &named.type_params));
                }
            }
        }
        let mut insert = label.clone();
        let mut snip = Builder::new();
        snip.write_text(&insert);

        let kind = match &obj.kind {
            ObjectKind::TypeName => {
                let (type_detail, kind) = format_type(arena, obj.ty, qf);
                detail = type_detail;
                kind
            }
            ObjectKind::Const => CompletionItemKind::CONSTANT,
            ObjectKind::Var { is_field, .. } => {
                if matches!(arena.ty(obj.ty), Type::Struct { .. }) {
                    detail = "struct{...}".into();
                }
                if *is_field {
                    self.struct_field_snippet(&cand, &detail, &mut snip);
                    CompletionItemKind::FIELD
                } else {
                    CompletionItemKind::VARIABLE
                }
            }
            ObjectKind::Func { .. } => match arena.as_signature(obj.ty) {
                Some(sig) if sig.recv.is_some() || obj.owner.is_some() => CompletionItemKind::METHOD,
                Some(_) => CompletionItemKind::FUNCTION,
                None => CompletionItemKind::TEXT,
            },
            ObjectKind::PkgName { imported } => {
                detail = format!("\"{}\"", arena.package(*imported).path);
                CompletionItemKind::MODULE
            }
            ObjectKind::Label => {
                detail = "label".into();
                CompletionItemKind::CONSTANT
            }
            ObjectKind::Builtin(_) => CompletionItemKind::FUNCTION,
            ObjectKind::Nil => CompletionItemKind::VARIABLE,
        };

        let mut prefix = String::new();
        for m in &cand.mods {
            match m {
                Modifier::Reference => prefix.insert(0, '&'),
                Modifier::Dereference => prefix.insert(0, '*'),
                Modifier::ChanRead => prefix.insert_str(0, "<-"),
                _ => {}
            }
        }

        let mut is_overload = false;
        let mut tags = Vec::new();
        let mut suffix = String::new();
        let mut func_type = obj.ty;
        for m in &cand.mods {
            match m {
                Modifier::Invoke => {
                    if let Some(sig) = arena.as_signature(func_type) {
                        let (tparams, params) = param_strings(arena, func_type, qf);
                        self.function_call_snippet("", &tparams, &params, &mut snip);
                        detail = format!("func{}", signature_string(arena, func_type, qf));
                        if let [single] = sig.results.as_slice() {
                            func_type = arena.object(*single).ty;
                        }
                        if let ObjectKind::Func { overloads } = &obj.kind {
                            if !overloads.is_empty() {
                                is_overload = true;
                                let mut text = String::from("overloads\n");
                                for member in overloads {
                                    let member_obj = arena.object(*member);
                                    if overload_base(&member_obj.name) == Some(obj.name.as_str()) {
                                        self.skip_func.insert(func_id(arena, *member));
                                    }
                                    text.push_str(&format!(
                                        "\n- func{}",
                                        signature_string(arena, member_obj.ty, qf)
                                    ));
                                }
                                tags.push(ItemTag::Overload);
                                detail = text;
                            }
                        }
                    }
                    if !self.opts.snippets {
                        // Without the call parens any further suffix would be wrong.
                        break;
                    }
                }
                Modifier::TakeSlice => suffix.push_str("[:]"),
                Modifier::TakeDotDotDot => suffix.push_str("..."),
                Modifier::Index => {
                    snip.write_text("[");
                    snip.write_placeholder(None);
                    snip.write_text("]");
                }
                Modifier::Reference | Modifier::Dereference | Modifier::ChanRead => {}
            }
        }

        if let Some(imp) = &cand.imp {
            edits.extend(self.import_edits(imp)?);
            if kind != CompletionItemKind::MODULE {
                if !detail.is_empty() {
                    detail.push(' ');
                }
                detail.push_str(&format!("(from \"{}\")", imp.import_path));
            }
        }

        if let Some(target) = cand.convert_to {
            let mut type_name = type_string(arena, target, qf);
            if matches!(arena.ty(target), Type::Pointer(_) | Type::Signature(_)) {
                type_name = format!("({type_name})");
            }
            prefix = format!("{type_name}({prefix}");
            suffix = ")".into();
        }

        if !prefix.is_empty() {
            match self.enclosing_selector() {
                Some(sel) => edits.extend(self.edit_text(sel.pos, sel.pos, &prefix)?),
                None => {
                    insert = format!("{prefix}{insert}");
                    snip.prepend_text(&prefix);
                }
            }
        }
        if !suffix.is_empty() {
            insert.push_str(&suffix);
            snip.write_text(&suffix);
        }

        if let Some(stripped) = detail.strip_prefix("untyped ") {
            detail = stripped.to_string();
        }
        if let Some(custom) = &cand.detail {
            detail = custom.clone();
        }

        let mut item = CompletionItem::new(label, kind, cand.score);
        item.insert_text = insert;
        item.additional_text_edits = edits;
        item.detail = detail;
        item.tags = tags;
        item.depth = cand.path.len();
        item.snippet = Some(snip);
        item.is_slice = matches!(arena.ty(arena.underlying(obj.ty)), Type::Slice(_));
        item.is_overload = is_overload;
        if matches!(obj.kind, ObjectKind::Func { .. }) {
            item.func_id = Some(func_id(arena, cand.obj));
        }

        if !self.opts.documentation || !obj.pos.is_valid() {
            return Ok(item);
        }
        let comment = match self.doc_for_object(cand.obj) {
            Ok(comment) => comment,
            Err(err) => {
                tracing::error!(name = %obj.name, error = %err, "failed to find documentation");
                return Ok(item);
            }
        };
        item.documentation = Some(if self.opts.full_documentation {
            comment.clone()
        } else {
            synopsis(&comment)
        });
        if comment.starts_with("Deprecated") {
            if self.opts.completion_tags {
                item.tags = vec![ItemTag::Deprecated];
            } else if self.opts.completion_deprecated {
                item.deprecated = true;
            }
        }
        Ok(item)
    }

    fn doc_for_object(&self, obj: ObjectId) -> Result<String, FormatError> {
        let object = self.arena.object(obj);
        if self.fset.file(object.pos).is_none() {
            return Err(FormatError::Documentation {
                name: object.name.clone(),
                reason: "declaration is not in a loaded file".into(),
            });
        }
        Ok(object.doc.clone().unwrap_or_default())
    }

    fn format_builtin(&mut self, cand: &Candidate) -> CompletionItem {
        let arena = self.arena;
        let obj = arena.object(cand.obj);
        let mut item = CompletionItem::new(obj.name.clone(), CompletionItemKind::TEXT, cand.score);
        match &obj.kind {
            ObjectKind::Const => item.kind = CompletionItemKind::CONSTANT,
            ObjectKind::Builtin(func) => {
                item.kind = CompletionItemKind::FUNCTION;
                let sig = builtin_signature(*func);
                item.detail = builtin_detail(&sig);
                let tparams: Vec<String> = sig.type_params.iter().map(|(n, _)| n.to_string()).collect();
                let mut snip = Builder::new();
                self.function_call_snippet(&obj.name, &tparams, &builtin_params(&sig), &mut snip);
                item.snippet = Some(snip);
            }
            ObjectKind::TypeName => {
                item.kind = if arena.is_interface(obj.ty) {
                    CompletionItemKind::INTERFACE
                } else {
                    CompletionItemKind::CLASS
                };
            }
            ObjectKind::Nil => item.kind = CompletionItemKind::VARIABLE,
            _ => {}
        }
        item
    }

    /// Whether type names should carry their type parameters: only inside a
    /// method receiver, e.g. `func (s *Set[K]) ...`.
    fn want_type_params(&self) -> bool {
        let Some(start) = self.path.first().map(|n| n.pos()) else {
            return false;
        };
        for (idx, node) in self.path.iter().enumerate() {
            if let Node::FuncDecl(func) = node {
                return idx > 0 && func.recv.as_ref().is_some_and(|recv| start < recv.end());
            }
        }
        false
    }

    /// `Name: value` for a field named in a struct literal's key position.
    fn struct_field_snippet(&self, cand: &Candidate, detail: &str, snip: &mut Builder) {
        if !cand.path.is_empty() {
            return;
        }
        let Some(lit) = self.lit else { return };
        let is_struct = lit.ty.is_some_and(|ty| matches!(self.arena.ty(ty), Type::Struct { .. }));
        if !is_struct || lit.in_value {
            return;
        }
        snip.write_text(": ");
        let text = self.field_placeholder(cand.obj, detail);
        if self.opts.placeholders {
            snip.write_placeholder(Some(&|b: &mut Builder| b.write_text(&text)));
        } else {
            snip.write_placeholder(None);
        }
        if self.tok.position(self.pos).line != self.tok.position(lit.lbrace).line {
            snip.write_text(",");
        }
    }

    /// The field's type, listing its accessible sub-fields when it is a
    /// struct, e.g. `Point{X, Y}`.
    fn field_placeholder(&self, field: ObjectId, detail: &str) -> String {
        let arena = self.arena;
        let ty = arena.deref(arena.object(field).ty);
        let Some(fields) = arena.struct_fields(ty) else {
            return detail.to_string();
        };
        let names: Vec<&str> = fields
            .iter()
            .map(|f| arena.object(*f))
            .filter(|f| f.is_exported() || f.pkg == Some(self.pkg))
            .map(|f| f.name.as_str())
            .collect();
        let base = detail.strip_suffix("{...}").unwrap_or(detail);
        let base = base.trim_start_matches('*');
        format!("{base}{{{}}}", names.join(", "))
    }

    /// Writes `name(params)` with one placeholder per parameter, or just the
    /// name when call parens are already present.
    pub(super) fn function_call_snippet(&self, name: &str, tparams: &[String], params: &[String], snip: &mut Builder) {
        if !self.opts.complete_function_calls || self.call_parens_present() {
            snip.write_text(name);
            return;
        }
        snip.write_text(name);
        if !tparams.is_empty() {
            snip.write_text("[");
            if self.opts.placeholders {
                for (idx, tp) in tparams.iter().enumerate() {
                    if idx > 0 {
                        snip.write_text(", ");
                    }
                    snip.write_placeholder(Some(&|b: &mut Builder| b.write_text(tp)));
                }
            } else {
                snip.write_placeholder(None);
            }
            snip.write_text("]");
        }
        snip.write_text("(");
        if self.opts.placeholders {
            for (idx, param) in params.iter().enumerate() {
                if idx > 0 {
                    snip.write_text(", ");
                }
                snip.write_placeholder(Some(&|b: &mut Builder| b.write_text(param)));
            }
        } else if !params.is_empty() {
            snip.write_placeholder(None);
        }
        snip.write_text(")");
    }

    /// The identifier being completed is already the callee of a call with
    /// real parentheses.
    fn call_parens_present(&self) -> bool {
        let callee_of = |call: Option<&Node<'a>>, fun_id: NodeId| match call {
            Some(Node::Expr(expr)) => match &expr.kind {
                ExprKind::Call { fun, lparen, rparen, .. } => fun.id == fun_id && lparen != rparen,
                _ => false,
            },
            _ => false,
        };
        match (self.path.first(), self.path.get(1)) {
            (Some(first), Some(Node::Expr(sel))) if matches!(sel.kind, ExprKind::Selector { .. }) => {
                callee_of(self.path.get(1), first.id()) || callee_of(self.path.get(2), sel.id)
            }
            (Some(first), second) => callee_of(second, first.id()),
            _ => false,
        }
    }
}
