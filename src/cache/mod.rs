//! Error-tolerant parsing: strict parse, tree repair, bounded source repair.

mod diff;
mod fix;
mod parse;

pub use diff::unified;
pub use fix::{fix_ast, DefaultRepairs, Fix, SourceFix, SourceFixKind, SourceRepair};
pub use parse::{
    parse_file, parse_src, purge_func_bodies, DiskFile, FileHandle, Overlay, ParseMode, ParsedFile,
    RepairDiagnostic, MAX_REPAIR_ITERATIONS,
};

#[cfg(test)]
mod tests;
