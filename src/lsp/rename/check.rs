use super::{
    refs::{for_each_lexical_ref, selectors_named},
    Conflict, PackageUnit, RenameError, World,
};
use crate::{
    error::CancelToken,
    language::{ast::is_exported, span::Pos},
    types::{object_kind_name, Arena, ObjectId, ObjectKind, PackageId, Selection, TypeId},
};
use rustc_hash::FxHashSet;

/// The safety check applied to one renamed object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckKind {
    ImportName,
    Label,
    PackageLevel,
    Field,
    Method,
    Local,
}

/// Embedded-field hops needed to reach a selection's object.
fn depth(arena: &Arena, sel: &Selection) -> usize {
    if arena.object(sel.obj).is_field() {
        sel.path.len().saturating_sub(1)
    } else {
        sel.path.len()
    }
}

pub(super) struct Renamer<'w, 'a> {
    cancel: &'w CancelToken,
    world: &'w World<'a>,
    arena: &'a Arena,
    from: String,
    to: String,
    seen: FxHashSet<ObjectId>,
    objects: Vec<ObjectId>,
    checks: Vec<(ObjectId, CheckKind)>,
    conflicts: Vec<Conflict>,
}

impl<'w, 'a> Renamer<'w, 'a> {
    pub fn new(cancel: &'w CancelToken, world: &'w World<'a>, from: &str, to: &str) -> Self {
        Self {
            cancel,
            world,
            arena: world.arena,
            from: from.to_string(),
            to: to.to_string(),
            seen: FxHashSet::default(),
            objects: Vec::new(),
            checks: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// Objects to rename and checks performed, or every conflict found.
    pub fn finish(self) -> Result<(Vec<ObjectId>, Vec<(ObjectId, CheckKind)>), RenameError> {
        if !self.conflicts.is_empty() {
            tracing::info!(conflicts = self.conflicts.len(), "rename refused");
            return Err(RenameError::Unsafe(self.conflicts));
        }
        Ok((self.objects, self.checks))
    }

    fn report(&mut self, pos: Pos, message: String) {
        self.conflicts.push(Conflict {
            position: self.world.position(pos),
            message,
        });
    }

    fn kind(&self, obj: ObjectId) -> &'static str {
        object_kind_name(self.arena, obj)
    }

    /// `renaming this var "x" to "y"`.
    fn renaming_this(&self, obj: ObjectId) -> String {
        format!("renaming this {} \"{}\" to \"{}\"", self.kind(obj), self.from, self.to)
    }

    fn unit_of(&self, obj: ObjectId) -> Result<&'w PackageUnit<'a>, RenameError> {
        let world = self.world;
        self.arena
            .object(obj)
            .pkg
            .and_then(|pkg| world.unit(pkg))
            .ok_or_else(|| {
                RenameError::Internal(format!(
                    "package of \"{}\" is not loaded",
                    self.arena.object(obj).name
                ))
            })
    }

    fn is_package_level(&self, obj: ObjectId) -> bool {
        let object = self.arena.object(obj);
        object
            .pkg
            .is_some_and(|pkg| self.arena.lookup(self.arena.package(pkg).scope, &object.name) == Some(obj))
    }

    fn is_local(&self, obj: ObjectId) -> bool {
        self.arena
            .object(obj)
            .parent
            .is_some_and(|scope| self.arena.scope_depth(scope) >= 3)
    }

    fn is_method(&self, obj: ObjectId) -> bool {
        let object = self.arena.object(obj);
        matches!(object.kind, ObjectKind::Func { .. })
            && (object.owner.is_some() || self.arena.as_signature(object.ty).is_some_and(|sig| sig.recv.is_some()))
    }

    /// Runs the safety check for `obj` once, adding it to the renamed set.
    pub fn check(&mut self, obj: ObjectId) -> Result<(), RenameError> {
        if !self.seen.insert(obj) {
            return Ok(());
        }
        self.objects.push(obj);

        let object = self.arena.object(obj);
        let kind = match &object.kind {
            ObjectKind::PkgName { .. } => CheckKind::ImportName,
            ObjectKind::Label => CheckKind::Label,
            _ if self.is_package_level(obj) => CheckKind::PackageLevel,
            ObjectKind::Var { is_field: true, .. } => CheckKind::Field,
            _ if self.is_method(obj) => CheckKind::Method,
            _ if self.is_local(obj) => CheckKind::Local,
            _ => {
                return Err(RenameError::Internal(format!(
                    "unexpected {} object \"{}\" (please report a bug)",
                    self.kind(obj),
                    object.name
                )))
            }
        };
        tracing::debug!(name = %object.name, check = ?kind, "checking renamed object");
        self.checks.push((obj, kind));
        match kind {
            CheckKind::ImportName => self.check_in_file_block(obj),
            CheckKind::Label => {
                self.check_label(obj);
                Ok(())
            }
            CheckKind::PackageLevel => self.check_in_package_block(obj),
            CheckKind::Field => self.check_struct_field(obj),
            CheckKind::Method => self.check_method(obj),
            CheckKind::Local => self.check_in_lexical_scope(obj),
        }
    }

    fn check_in_file_block(&mut self, from: ObjectId) -> Result<(), RenameError> {
        let arena = self.arena;
        if self.to == "init" {
            self.report(
                arena.object(from).pos,
                "\"init\" is not a valid imported package name".into(),
            );
        }
        if let Some(pkg) = arena.object(from).pkg {
            if let Some(prev) = arena.lookup(arena.package(pkg).scope, &self.to) {
                let message = format!("{} would conflict", self.renaming_this(from));
                self.report(arena.object(from).pos, message);
                let message = format!("\twith this package member {}", self.kind(prev));
                self.report(arena.object(prev).pos, message);
                return Ok(());
            }
        }
        self.check_in_lexical_scope(from)
    }

    fn check_label(&mut self, from: ObjectId) {
        let arena = self.arena;
        let Some(labels) = arena.object(from).parent else { return };
        if let Some(prev) = arena.lookup(labels, &self.to) {
            let message = format!("renaming this label \"{}\" to \"{}\"", self.from, self.to);
            self.report(arena.object(from).pos, message);
            self.report(arena.object(prev).pos, "\twould conflict with this one".into());
        }
    }

    fn check_in_package_block(&mut self, from: ObjectId) -> Result<(), RenameError> {
        let arena = self.arena;
        self.check_exported_uses(from);

        let unit = self.unit_of(from)?;
        if self.to == "init" {
            let from_pos = arena.object(from).pos;
            if matches!(arena.object(from).kind, ObjectKind::Func { .. }) {
                if let Some((_, pos)) = unit.info.some_use(from) {
                    let message = self.renaming_this(from);
                    self.report(from_pos, message);
                    self.report(pos, "\twould make it a reference to init".into());
                    self.report(pos, "\twhich is not referenceable".into());
                    return Ok(());
                }
            } else {
                let message = format!("you cannot have a {} at package level named \"init\"", self.kind(from));
                self.report(from_pos, message);
                return Ok(());
            }
        }

        for parsed in unit.files.iter().copied() {
            let Some(file_scope) = unit.info.scopes.get(&parsed.file.id) else {
                continue;
            };
            if let Some(prev) = arena.lookup(*file_scope, &self.to) {
                let message = format!("{} would conflict", self.renaming_this(from));
                self.report(arena.object(from).pos, message);
                let message = format!("\twith this {}", self.kind(prev));
                self.report(arena.object(prev).pos, message);
                return Ok(());
            }
        }

        self.check_in_lexical_scope(from)
    }

    /// Same-block conflicts, references the new name would capture, and
    /// references to `from` that an inner declaration would shadow.
    fn check_in_lexical_scope(&mut self, from: ObjectId) -> Result<(), RenameError> {
        let arena = self.arena;
        let cancel = self.cancel;
        let unit = self.unit_of(from)?;
        let from_obj = arena.object(from);
        let from_name = self.from.clone();
        let to_name = self.to.clone();

        if let Some(block) = from_obj.parent {
            if let Some((to_block, to)) = arena.lookup_parent(block, &to_name, arena.scope(block).end) {
                if to_block == block {
                    let message = self.renaming_this(from);
                    self.report(from_obj.pos, message);
                    let message = format!("\tconflicts with {} in same block", self.kind(to));
                    self.report(arena.object(to).pos, message);
                    return Ok(());
                }
                // `to` lives in an enclosing block. Would a reference to it
                // now resolve to `from`?
                let mut captured = None;
                for_each_lexical_ref(cancel, arena, unit, to, &mut |ident, ref_block| {
                    match arena.lookup_parent(ref_block, &from_name, ident.pos) {
                        Some((_, found)) if found == from => {
                            captured = Some(ident.pos);
                            false
                        }
                        _ => true,
                    }
                })?;
                if let Some(pos) = captured {
                    let message = self.renaming_this(from);
                    self.report(from_obj.pos, message);
                    self.report(pos, "\twould shadow this reference".into());
                    let message = format!("\tto the {} declared here", self.kind(to));
                    self.report(arena.object(to).pos, message);
                    return Ok(());
                }
            }
        }

        // An intervening declaration of `to` between `from`'s block and a
        // reference would hijack the reference.
        let mut shadowed = None;
        for_each_lexical_ref(cancel, arena, unit, from, &mut |ident, ref_block| {
            let from_block = arena.lookup_parent(ref_block, &from_name, ident.pos).map(|(scope, _)| scope);
            if let (Some(from_block), Some((to_block, to))) =
                (from_block, arena.lookup_parent(ref_block, &to_name, ident.pos))
            {
                if arena.scope_depth(to_block) > arena.scope_depth(from_block) {
                    shadowed = Some((ident.pos, to));
                    return false;
                }
            }
            true
        })?;
        if let Some((pos, to)) = shadowed {
            let message = self.renaming_this(from);
            self.report(from_obj.pos, message);
            self.report(pos, "\twould cause this reference to become shadowed".into());
            let message = format!("\tby this intervening {} definition", self.kind(to));
            self.report(arena.object(to).pos, message);
            return Ok(());
        }

        // Embedded fields are named after their type and rename with it.
        if from_obj.kind == ObjectKind::TypeName {
            let embedding: Vec<ObjectId> = arena
                .objects()
                .filter(|(_, obj)| matches!(obj.kind, ObjectKind::Var { embedded: true, .. }))
                .filter(|(_, obj)| {
                    arena
                        .as_named(arena.deref(obj.ty))
                        .is_some_and(|named| named.obj == from)
                })
                .map(|(id, _)| id)
                .collect();
            for field in embedding {
                self.check(field)?;
            }
        }
        Ok(())
    }

    fn check_struct_field(&mut self, from: ObjectId) -> Result<(), RenameError> {
        let arena = self.arena;
        let from_obj = arena.object(from);
        if let Some(owner) = from_obj.owner {
            let sibling = arena
                .struct_fields(owner)
                .and_then(|fields| fields.iter().copied().find(|f| arena.object(*f).name == self.to));
            if let Some(prev) = sibling {
                let message = format!("renaming this field \"{}\" to \"{}\"", self.from, self.to);
                self.report(from_obj.pos, message);
                self.report(arena.object(prev).pos, "\twould conflict with this field".into());
                return Ok(());
            }
            if let Some(named) = arena.named_of(owner) {
                if let Some(sel) = arena.lookup_field_or_method(named, &self.to) {
                    if depth(arena, &sel) == 0 {
                        let message = format!("renaming this field \"{}\" to \"{}\"", self.from, self.to);
                        self.report(from_obj.pos, message);
                        let message = format!("\twould conflict with this {}", self.kind(sel.obj));
                        self.report(arena.object(sel.obj).pos, message);
                        return Ok(());
                    }
                }
            }
        }

        // Renaming an embedded field renames its type.
        if matches!(from_obj.kind, ObjectKind::Var { embedded: true, .. }) {
            if let Some(named) = arena.as_named(arena.deref(from_obj.ty)) {
                self.check(named.obj)?;
            }
        }

        self.check_selections(from);
        self.check_exported_uses(from);
        Ok(())
    }

    fn check_method(&mut self, from: ObjectId) -> Result<(), RenameError> {
        let arena = self.arena;
        let from_obj = arena.object(from);
        let Some(owner) = from_obj.owner else {
            return Err(RenameError::Internal(format!(
                "method \"{}\" has no receiver type",
                from_obj.name
            )));
        };

        if arena.is_interface(owner) {
            let conflict = arena
                .interface_methods(owner)
                .into_iter()
                .find(|m| arena.object(*m).name == self.to);
            if let Some(prev) = conflict {
                let message = format!("renaming this interface method \"{}\" to \"{}\"", self.from, self.to);
                self.report(from_obj.pos, message);
                self.report(arena.object(prev).pos, "\twould conflict with this method".into());
                return Ok(());
            }
            // Interfaces that embed this one get the new name too.
            for iface in self.named_types().into_iter().filter(|ty| arena.is_interface(*ty)) {
                let methods = arena.interface_methods(iface);
                if !methods.contains(&from) {
                    continue;
                }
                if let Some(prev) = methods.iter().find(|m| arena.object(**m).name == self.to) {
                    let message = format!("renaming this interface method \"{}\" to \"{}\"", self.from, self.to);
                    self.report(from_obj.pos, message);
                    self.report(arena.object(*prev).pos, "\twould conflict with this method".into());
                    return Ok(());
                }
            }
            // Concrete methods satisfying the interface must follow.
            for concrete in self.named_types().into_iter().filter(|ty| !arena.is_interface(*ty)) {
                if !arena.implements(concrete, owner) {
                    continue;
                }
                if let Some(sel) = arena.lookup_field_or_method(concrete, &self.from) {
                    if matches!(arena.object(sel.obj).kind, ObjectKind::Func { .. }) {
                        self.check(sel.obj)?;
                    }
                }
            }
        } else {
            if let Some(sel) = arena.lookup_field_or_method(owner, &self.to) {
                if depth(arena, &sel) == 0 {
                    let message = format!("renaming this method \"{}\" to \"{}\"", self.from, self.to);
                    self.report(from_obj.pos, message);
                    let message = format!("\twould conflict with this {}", self.kind(sel.obj));
                    self.report(arena.object(sel.obj).pos, message);
                    return Ok(());
                }
            }
            // Interface methods this method satisfies must follow.
            for iface in self.named_types().into_iter().filter(|ty| arena.is_interface(*ty)) {
                let abstract_method = arena
                    .interface_methods(iface)
                    .into_iter()
                    .find(|m| arena.object(*m).name == self.from);
                if let Some(method) = abstract_method {
                    if arena.implements(owner, iface) {
                        self.check(method)?;
                    }
                }
            }
        }

        self.check_selections(from);
        self.check_exported_uses(from);
        Ok(())
    }

    /// Selections `x.from` that would resolve elsewhere after the rename,
    /// and selections `x.to` the renamed object would capture.
    fn check_selections(&mut self, from: ObjectId) {
        let arena = self.arena;
        let world = self.world;
        for unit in &world.packages {
            for used in selectors_named(unit, &self.from) {
                if unit.info.uses.get(&used.sel.id) != Some(&from) {
                    continue;
                }
                let Some(base) = used.base else { continue };
                let (Some(from_sel), Some(to_sel)) = (
                    arena.lookup_field_or_method(base, &self.from),
                    arena.lookup_field_or_method(base, &self.to),
                ) else {
                    continue;
                };
                let (from_depth, to_depth) = (depth(arena, &from_sel), depth(arena, &to_sel));
                if to_depth > from_depth {
                    continue;
                }
                let message = self.renaming_this(from);
                self.report(arena.object(from).pos, message);
                if to_depth < from_depth {
                    self.report(used.sel.pos, "\twould change the referent of this selection".into());
                    let message = format!("\tof this {}", self.kind(to_sel.obj));
                    self.report(arena.object(to_sel.obj).pos, message);
                } else {
                    self.report(used.sel.pos, "\twould make this reference ambiguous".into());
                    let message = format!("\twith this {}", self.kind(to_sel.obj));
                    self.report(arena.object(to_sel.obj).pos, message);
                }
                return;
            }
            for used in selectors_named(unit, &self.to) {
                let Some(existing) = unit.info.uses.get(&used.sel.id).copied() else {
                    continue;
                };
                let Some(base) = used.base else { continue };
                let Some(from_sel) = arena.lookup_field_or_method(base, &self.from) else {
                    continue;
                };
                let Some(to_sel) = arena.lookup_field_or_method(base, &self.to) else {
                    continue;
                };
                if from_sel.obj != from || depth(arena, &from_sel) >= depth(arena, &to_sel) {
                    continue;
                }
                let message = self.renaming_this(from);
                self.report(arena.object(from).pos, message);
                self.report(used.sel.pos, "\twould shadow this selection".into());
                let message = format!("\tof the {} declared here", self.kind(existing));
                self.report(arena.object(existing).pos, message);
                return;
            }
        }
    }

    /// Refuses to unexport `from` while other packages still use it.
    fn check_exported_uses(&mut self, from: ObjectId) {
        if !is_exported(&self.from) || is_exported(&self.to) {
            return;
        }
        let world = self.world;
        let home = self.arena.object(from).pkg;
        for unit in &world.packages {
            if Some(unit.pkg) == home {
                continue;
            }
            if let Some((_, pos)) = unit.info.some_use(from) {
                if !self.check_export(pos, unit.pkg, from) {
                    break;
                }
            }
        }
    }

    fn check_export(&mut self, pos: Pos, pkg: PackageId, from: ObjectId) -> bool {
        if is_exported(&self.to) || Some(pkg) == self.arena.object(from).pkg {
            return true;
        }
        let message = format!("renaming \"{}\" to \"{}\" would make it unexported", self.from, self.to);
        self.report(self.arena.object(from).pos, message);
        let message = format!(
            "\tbreaking references from packages such as \"{}\"",
            self.arena.package(pkg).path
        );
        self.report(pos, message);
        false
    }

    /// Package-level named types of every loaded package.
    fn named_types(&self) -> Vec<TypeId> {
        let arena = self.arena;
        self.world
            .packages
            .iter()
            .flat_map(|unit| arena.scope(arena.package(unit.pkg).scope).objects())
            .map(|obj| arena.object(*obj))
            .filter(|obj| obj.kind == ObjectKind::TypeName && arena.as_named(obj.ty).is_some())
            .map(|obj| obj.ty)
            .collect()
    }
}
