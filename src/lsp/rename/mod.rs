//! Rename safety: decides whether renaming an object keeps every program in
//! the loaded world meaning the same thing, and if so produces the edits.

mod check;
mod refs;

use super::text::{is_keyword, is_valid_identifier};
use crate::{
    cache::ParsedFile,
    error::{CancelToken, Error},
    language::{
        span::{Pos, Position},
        visit::{inspect, Node},
    },
    types::{Arena, Info, ObjectId, ObjectKind, PackageId},
};
use rustc_hash::FxHashSet;
use std::{collections::BTreeMap, fmt};
use thiserror::Error;
use lsp_types::TextEdit;

pub use check::CheckKind;
pub use refs::for_each_lexical_ref;

/// One type-checked package of the world.
pub struct PackageUnit<'a> {
    pub pkg: PackageId,
    pub info: &'a Info,
    pub files: Vec<&'a ParsedFile>,
}

/// Every package a rename has to keep consistent. All of them were checked
/// into the same arena.
pub struct World<'a> {
    pub arena: &'a Arena,
    pub packages: Vec<PackageUnit<'a>>,
}

impl<'a> World<'a> {
    pub fn unit(&self, pkg: PackageId) -> Option<&PackageUnit<'a>> {
        self.packages.iter().find(|unit| unit.pkg == pkg)
    }

    fn file_of(&self, pos: Pos) -> Option<&'a ParsedFile> {
        self.packages
            .iter()
            .flat_map(|unit| unit.files.iter().copied())
            .find(|file| file.tok.contains(pos))
    }

    pub fn position(&self, pos: Pos) -> Position {
        self.file_of(pos).map(|file| file.tok.position(pos)).unwrap_or_default()
    }
}

/// A reason the rename was refused, anchored at a source position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub position: Position,
    pub message: String,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.position, self.message)
    }
}

fn render_conflicts(conflicts: &[Conflict]) -> String {
    conflicts.iter().map(|c| c.to_string()).collect::<Vec<_>>().join("\n")
}

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("Invalid identifier to rename: \"{0}\"")]
    InvalidName(String),
    #[error("Old and new names are the same: {0}")]
    SameName(String),
    #[error("Cannot rename builtin \"{0}\"")]
    Builtin(String),
    #[error("{}", render_conflicts(.0))]
    Unsafe(Vec<Conflict>),
    /// A bug in the checker itself rather than a problem with the rename.
    #[error("Internal rename error: {0}")]
    Internal(String),
    #[error(transparent)]
    Request(#[from] Error),
}

/// Outcome of an accepted rename.
#[derive(Clone, Debug, Default)]
pub struct RenameEdits {
    /// Objects renamed together, in the order they were checked.
    pub objects: Vec<ObjectId>,
    /// Safety checks performed, one per object.
    pub checks: Vec<(ObjectId, CheckKind)>,
    /// Edits keyed by file name.
    pub edits: BTreeMap<String, Vec<TextEdit>>,
}

impl RenameEdits {
    pub fn edit_count(&self) -> usize {
        self.edits.values().map(Vec::len).sum()
    }
}

/// Checks that renaming `target` to `new_name` is safe across `world` and
/// returns the edits that perform it.
pub fn check_rename(
    cancel: &CancelToken,
    world: &World<'_>,
    target: ObjectId,
    new_name: &str,
) -> Result<RenameEdits, RenameError> {
    cancel.check()?;
    let arena = world.arena;
    let object = arena.object(target);
    if !is_valid_identifier(new_name) || is_keyword(new_name) {
        return Err(RenameError::InvalidName(new_name.to_string()));
    }
    if object.name == new_name {
        return Err(RenameError::SameName(new_name.to_string()));
    }
    if object.pkg.is_none() || object.parent == Some(arena.universe()) {
        return Err(RenameError::Builtin(object.name.clone()));
    }

    tracing::debug!(from = %object.name, to = %new_name, "checking rename");
    let mut renamer = check::Renamer::new(cancel, world, &object.name, new_name);
    renamer.check(target)?;
    let (objects, checks) = renamer.finish()?;

    let mut edits: BTreeMap<String, Vec<TextEdit>> = BTreeMap::new();
    for unit in &world.packages {
        for file in &unit.files {
            cancel.check()?;
            let file_edits = edits_in_file(arena, unit.info, file, &objects, new_name);
            if !file_edits.is_empty() {
                edits.entry(file.name.clone()).or_default().extend(file_edits);
            }
        }
    }
    for file_edits in edits.values_mut() {
        file_edits.sort_by_key(|edit| (edit.range.start.line, edit.range.start.character));
        file_edits.dedup_by_key(|edit| edit.range.start);
    }
    tracing::info!(
        objects = objects.len(),
        files = edits.len(),
        "rename accepted"
    );
    Ok(RenameEdits {
        objects,
        checks,
        edits,
    })
}

/// Edits for the definitions and uses of `objects` in one file.
fn edits_in_file(
    arena: &Arena,
    info: &Info,
    file: &ParsedFile,
    objects: &[ObjectId],
    new_name: &str,
) -> Vec<TextEdit> {
    let wanted: FxHashSet<ObjectId> = objects.iter().copied().collect();
    let mut out = Vec::new();
    let mut edit = |start: Pos, end: Pos, text: String| {
        let position = |pos: Pos| {
            file.tok
                .offset(pos)
                .and_then(|offset| file.mapper.offset_position(offset))
        };
        if let (Some(start), Some(end)) = (position(start), position(end)) {
            out.push(TextEdit {
                range: lsp_types::Range { start, end },
                new_text: text,
            });
        }
    };
    inspect(Node::File(&file.file), &mut |node| {
        match node {
            Some(Node::Ident(ident)) => {
                if info.object_of(ident.id).is_some_and(|obj| wanted.contains(&obj)) {
                    edit(ident.pos, ident.end(), new_name.to_string());
                }
            }
            // `import "fmt"` becomes `import f "fmt"`.
            Some(Node::ImportSpec(spec)) if spec.name.is_none() => {
                let renamed = info.implicits.get(&spec.id).is_some_and(|obj| {
                    wanted.contains(obj) && matches!(arena.object(*obj).kind, ObjectKind::PkgName { .. })
                });
                if renamed {
                    edit(spec.path.pos, spec.path.pos, format!("{new_name} "));
                }
            }
            _ => {}
        }
        true
    });
    out
}

#[cfg(test)]
mod tests;
