use super::*;
use crate::types::type_string;

/// `fooBar` becomes `fb`, `[]int` becomes `i`. Leading and trailing
/// non-letters, and anything inside leading brackets, are ignored.
pub(super) fn abbreviate_type_name(s: &str) -> String {
    let mut in_bracket = false;
    let start = s
        .char_indices()
        .find(|(_, ch)| {
            if in_bracket {
                in_bracket = *ch != ']';
                return false;
            }
            if *ch == '[' {
                in_bracket = true;
            }
            ch.is_alphabetic()
        })
        .map(|(idx, _)| idx)
        .unwrap_or(s.len());
    let trimmed = s[start..].trim_end_matches(|ch: char| !ch.is_alphabetic());

    let mut out = String::new();
    let mut use_next_upper = false;
    for (idx, ch) in trimmed.chars().enumerate() {
        if !ch.is_alphanumeric() {
            break;
        }
        if idx == 0 {
            out.extend(ch.to_lowercase());
        }
        if ch.is_uppercase() {
            if use_next_upper {
                out.extend(ch.to_lowercase());
                use_next_upper = false;
            }
        } else {
            use_next_upper = true;
        }
    }
    out
}

impl<'a> Completer<'a> {
    /// Offers literal expressions of `literal_type`: composite literals,
    /// conversions, `make()` calls and function literals.
    pub fn literal(&mut self, literal_type: TypeId, imp: Option<&ImportInfo>) {
        if !self.opts.literal {
            return;
        }
        let arena = self.arena;
        let expected = self.inference.obj_type;

        // No `[]any{}` for the variadic argument of `fmt.Print(|)`.
        if self.inference.matches_variadic(arena, literal_type) {
            return;
        }
        if expected.is_some_and(|ty| arena.is_empty_interface(ty)) {
            return;
        }
        // An unnamed expected type already got its own unnamed literal.
        if arena.as_named(literal_type).is_some() {
            if let Some(expected) = expected {
                if arena.as_named(arena.deref(expected)).is_none() {
                    return;
                }
            }
        }

        let underlying = arena.underlying(literal_type);
        let addressable = matches!(
            arena.ty(underlying),
            Type::Struct { .. } | Type::Array { .. } | Type::Slice(_) | Type::Map { .. }
        );
        let Some(mods) = self.matching_type(literal_type, addressable) else {
            return;
        };
        let reference = mods.contains(&Modifier::Reference);

        let sel = self.enclosing_selector();
        // The package name is already written before the selector.
        let qf = if sel.is_some() { Qualifier::Unqualified } else { self.qf() };
        let (mut snip, mut type_name) = self.type_name_snippet(literal_type, qf);

        let match_name = match arena.ty(literal_type) {
            Type::Slice(elem) | Type::Array { elem, .. } => type_string(arena, *elem, qf),
            _ => type_name.clone(),
        };

        let mut edits = match imp {
            Some(imp) => match self.import_edits(imp) {
                Ok(edits) => edits,
                Err(err) => {
                    tracing::error!(error = %err, "error adding import for literal candidate");
                    return;
                }
            },
            None => Vec::new(),
        };

        let score = self.matcher.score(&match_name);
        if score > 0.0 {
            if reference {
                match sel {
                    // `foo.B|` must become `&foo.Bar{}`, not `foo.&Bar{}`.
                    Some(sel) => match self.edit_text(sel.pos, sel.pos, "&") {
                        Ok(more) => edits.extend(more),
                        Err(err) => {
                            tracing::error!(error = %err, "error making edit for literal pointer completion");
                            return;
                        }
                    },
                    None => {
                        type_name.insert(0, '&');
                        snip.prepend_text("&");
                    }
                }
            }
            match arena.ty(underlying) {
                Type::Struct { .. } | Type::Array { .. } | Type::Slice(_) | Type::Map { .. } => {
                    self.composite_literal(underlying, snip.clone(), &type_name, score, edits.clone());
                }
                // e.g. `http.HandlerFunc()` where an `http.Handler` is expected.
                Type::Signature(_) => {
                    if expected.is_some_and(|ty| arena.is_interface(ty)) {
                        self.basic_literal(underlying, snip.clone(), &type_name, score, edits.clone());
                    }
                }
                Type::Basic(_) => {
                    if expected.is_some_and(|ty| arena.is_interface(ty) || arena.identical(ty, literal_type)) {
                        self.basic_literal(underlying, snip.clone(), &type_name, score, edits.clone());
                    }
                }
                _ => {}
            }
        }

        let score = self.matcher.score(&format!("make.{match_name}"));
        if !reference && score > 0.0 {
            match arena.ty(underlying) {
                // Slices need a length.
                Type::Slice(_) => self.make_call(snip.clone(), &type_name, "0", score, edits.clone()),
                Type::Map { .. } | Type::Chan { .. } => {
                    self.make_call(snip.clone(), &type_name, "", score, edits.clone())
                }
                _ => {}
            }
        }

        let score = self.matcher.score("func");
        if !reference && score > 0.0 && !expected.is_some_and(|ty| arena.is_interface(ty)) {
            if let Type::Signature(_) = arena.ty(underlying) {
                self.function_literal(underlying, score);
            }
        }
    }

    /// Modifiers a value of type `ty` needs to fit the expected type, or
    /// `None` when it cannot.
    fn matching_type(&self, ty: TypeId, addressable: bool) -> Option<Vec<Modifier>> {
        let arena = self.arena;
        let expected = self.inference.obj_type?;
        if arena.identical(ty, expected) || (arena.is_interface(expected) && arena.implements(ty, expected)) {
            return Some(Vec::new());
        }
        match arena.ty(expected) {
            Type::Pointer(elem) if addressable && arena.identical(ty, *elem) => Some(vec![Modifier::Reference]),
            _ => None,
        }
    }

    fn function_literal(&mut self, sig_ty: TypeId, match_score: f64) {
        let arena = self.arena;
        let Some(sig) = arena.as_signature(sig_ty) else {
            return;
        };
        let mut snip = Builder::new();
        snip.write_text("func(");

        // Unnamed parameters get names guessed from their types, numbered
        // when they repeat: `func(int, int64)` becomes `func(i1 int, i2 int64)`.
        let mut names: Vec<String> = Vec::with_capacity(sig.params.len());
        let mut counts: Vec<(String, usize)> = Vec::new();
        let mut has_type_params = false;
        for param in &sig.params {
            let param = arena.object(*param);
            if self.is_unbound_type_param(param.ty) {
                has_type_params = true;
            }
            let name = if param.name.is_empty() {
                abbreviate_type_name(&type_string(arena, param.ty, Qualifier::Unqualified))
            } else {
                param.name.clone()
            };
            if name != "_" {
                match counts.iter_mut().find(|(n, _)| *n == name) {
                    Some((_, count)) => *count += 1,
                    None => counts.push((name.clone(), 1)),
                }
            }
            names.push(name);
        }
        // Names seen more than once get a suffix starting at 1.
        let mut suffixes: Vec<(String, usize)> = counts
            .into_iter()
            .filter(|(_, count)| *count >= 2)
            .map(|(name, _)| (name, 1))
            .collect();

        let qf = self.qf();
        for (idx, param_id) in sig.params.iter().enumerate() {
            if has_type_params && !self.opts.placeholders {
                snip.write_placeholder(None);
                break;
            }
            if idx > 0 {
                snip.write_text(", ");
            }
            let param = arena.object(*param_id);
            let mut name = names[idx].clone();
            if let Some((_, next)) = suffixes.iter_mut().find(|(n, _)| *n == name) {
                name = format!("{name}{next}");
                *next += 1;
            }
            if name != param.name && self.opts.placeholders {
                snip.write_placeholder(Some(&|b: &mut Builder| b.write_text(&name)));
            } else {
                snip.write_text(&name);
            }

            // `i, j int` rather than `i int, j int`.
            let last = idx + 1 == sig.params.len();
            if last || !arena.identical(param.ty, arena.object(sig.params[idx + 1]).ty) {
                snip.write_text(" ");
                let mut type_str = type_string(arena, param.ty, qf);
                if sig.variadic && last {
                    type_str = type_str.replacen("[]", "...", 1);
                }
                if self.is_unbound_type_param(param.ty) {
                    snip.write_placeholder(Some(&|b: &mut Builder| b.write_text(&type_str)));
                } else {
                    snip.write_text(&type_str);
                }
            }
        }
        snip.write_text(")");

        let results = &sig.results;
        if !results.is_empty() {
            snip.write_text(" ");
        }
        let needs_parens = results.len() > 1 || (results.len() == 1 && !arena.object(results[0]).name.is_empty());
        let result_has_type_params = results.iter().any(|r| self.is_unbound_type_param(arena.object(*r).ty));
        if needs_parens {
            snip.write_text("(");
        }
        for (idx, result) in results.iter().enumerate() {
            if result_has_type_params && !self.opts.placeholders {
                snip.write_placeholder(None);
                break;
            }
            if idx > 0 {
                snip.write_text(", ");
            }
            let result = arena.object(*result);
            if !result.name.is_empty() {
                snip.write_text(&format!("{} ", result.name));
            }
            let text = type_string(arena, result.ty, qf);
            if self.is_unbound_type_param(result.ty) {
                snip.write_placeholder(Some(&|b: &mut Builder| b.write_text(&text)));
            } else {
                snip.write_text(&text);
            }
        }
        if needs_parens {
            snip.write_text(")");
        }
        snip.write_text(" {");
        snip.write_final_tabstop();
        snip.write_text("}");

        let mut item = CompletionItem::new(
            "func(...) {}".into(),
            CompletionItemKind::VARIABLE,
            match_score * LITERAL_CANDIDATE_SCORE,
        );
        item.insert_text = String::new();
        item.snippet = Some(snip);
        self.items.push(item);
    }

    fn composite_literal(&mut self, ty: TypeId, mut snip: Builder, type_name: &str, match_score: f64, edits: Vec<TextEdit>) {
        snip.write_text("{");
        // No tabstop inside the braces of a struct without accessible fields.
        let accessible = match self.arena.struct_fields(ty) {
            Some(fields) => fields.iter().any(|f| {
                let field = self.arena.object(*f);
                field.is_exported() || field.pkg == Some(self.pkg)
            }),
            None => true,
        };
        if accessible {
            snip.write_final_tabstop();
        }
        snip.write_text("}");

        let mut item = CompletionItem::new(
            format!("{type_name}{{}}"),
            CompletionItemKind::VARIABLE,
            match_score * LITERAL_CANDIDATE_SCORE,
        );
        item.additional_text_edits = edits;
        item.snippet = Some(snip);
        self.items.push(item);
    }

    fn basic_literal(&mut self, ty: TypeId, mut snip: Builder, type_name: &str, match_score: f64, edits: Vec<TextEdit>) {
        // Never `untyped int()`.
        if self.arena.is_untyped(ty) {
            return;
        }
        snip.write_text("(");
        snip.write_final_tabstop();
        snip.write_text(")");

        let mut item = CompletionItem::new(
            format!("{type_name}()"),
            CompletionItemKind::VARIABLE,
            match_score * LITERAL_CANDIDATE_SCORE,
        );
        item.detail = type_string(self.arena, ty, self.qf());
        item.additional_text_edits = edits;
        item.snippet = Some(snip);
        self.items.push(item);
    }

    fn make_call(&mut self, mut snip: Builder, type_name: &str, second_arg: &str, match_score: f64, edits: Vec<TextEdit>) {
        snip.prepend_text("make(");
        if !second_arg.is_empty() {
            snip.write_text(", ");
            if self.opts.placeholders {
                snip.write_placeholder(Some(&|b: &mut Builder| b.write_text(second_arg)));
            } else {
                snip.write_placeholder(None);
            }
        }
        snip.write_text(")");

        let label = if second_arg.is_empty() {
            format!("make({type_name})")
        } else {
            format!("make({type_name}, {second_arg})")
        };
        let mut item = CompletionItem::new(label, CompletionItemKind::FUNCTION, match_score * LITERAL_CANDIDATE_SCORE);
        item.additional_text_edits = edits;
        item.snippet = Some(snip);
        self.items.push(item);
    }

    /// Snippet and display name for a type; type parameters that are not
    /// yet fixed become placeholders, as in `Set[${1:T}]`.
    fn type_name_snippet(&self, ty: TypeId, qf: Qualifier) -> (Builder, String) {
        let arena = self.arena;
        let mut snip = Builder::new();
        let generic = arena.as_named(ty).and_then(|named| {
            let params = self.type_params_of(ty);
            (!params.is_empty() && !self.fully_instantiated(ty)).then_some((named, params))
        });
        let Some((named, params)) = generic else {
            let type_name = type_string(arena, ty, qf);
            snip.write_text(&type_name);
            return (snip, type_name);
        };

        let obj = arena.object(named.obj);
        let mut type_name = String::new();
        if let Some(pkg) = obj.pkg {
            let prefix = qf.prefix(arena, pkg);
            if !prefix.is_empty() {
                type_name = format!("{prefix}.");
            }
        }
        type_name.push_str(&obj.name);
        snip.write_text(&format!("{type_name}["));
        if self.opts.placeholders {
            for (idx, param) in params.iter().enumerate() {
                if idx > 0 {
                    snip.write_text(", ");
                }
                let text = type_string(arena, *param, qf);
                snip.write_placeholder(Some(&|b: &mut Builder| b.write_text(&text)));
            }
        } else {
            snip.write_placeholder(None);
        }
        snip.write_text("]");
        type_name.push_str("[...]");
        (snip, type_name)
    }

    fn type_params_of(&self, ty: TypeId) -> Vec<TypeId> {
        match self.arena.as_named(ty) {
            Some(named) if !named.type_params.is_empty() => named.type_params.clone(),
            Some(named) => match named.origin {
                Some(origin) if origin != ty => self.type_params_of(origin),
                _ => Vec::new(),
            },
            None => Vec::new(),
        }
    }

    /// Whether every type parameter of `ty` has a type argument.
    fn fully_instantiated(&self, ty: TypeId) -> bool {
        let Some(named) = self.arena.as_named(ty) else {
            return true;
        };
        if self.type_params_of(ty).len() != named.type_args.len() {
            return false;
        }
        named.type_args.iter().all(|arg| match self.arena.ty(*arg) {
            // Only counts when we are inside the generic definition.
            Type::TypeParam { .. } => self.type_param_in_scope(*arg),
            Type::Named(_) => self.fully_instantiated(*arg),
            _ => true,
        })
    }

    fn is_unbound_type_param(&self, ty: TypeId) -> bool {
        matches!(self.arena.ty(ty), Type::TypeParam { .. }) && !self.type_param_in_scope(ty)
    }

    /// Whether type parameter `tp` resolves at the cursor, i.e. the cursor
    /// is inside the generic declaration.
    fn type_param_in_scope(&self, tp: TypeId) -> bool {
        let Type::TypeParam { obj, .. } = self.arena.ty(tp) else {
            return false;
        };
        let Some(scope) = self.innermost_scope() else {
            return false;
        };
        let name = &self.arena.object(*obj).name;
        self.arena
            .lookup_parent(scope, name, self.pos)
            .is_some_and(|(_, found)| found == *obj)
    }
}
