//! Package loading for mixed host/extension-language packages.
//!
//! Traversal and build-graph resolution belong to a [`Loader`]; this module
//! only decorates what it returns with extension-language file lists and
//! type information.

mod dir;
mod internals;

pub use dir::DirLoader;
pub use internals::{CmdRunner, DefaultInternals, PackageInternals, ProcessRunner};

use crate::{
    cache::ParsedFile,
    types::{Arena, Info, PackageId, TypeError},
};
use std::{
    collections::BTreeMap,
    fmt,
    ops::{BitOr, BitOrAssign, Deref},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

/// Selects which package fields a load fills in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LoadMode(u32);

impl LoadMode {
    /// Name and package path.
    pub const NAME: LoadMode = LoadMode(1 << 0);
    /// Host and extension-language file lists.
    pub const FILES: LoadMode = LoadMode(1 << 1);
    /// The type-checkable subset of the file lists.
    pub const COMPILED_FILES: LoadMode = LoadMode(1 << 2);
    /// Imports as placeholders carrying only their id unless `DEPS` is set.
    pub const IMPORTS: LoadMode = LoadMode(1 << 3);
    pub const DEPS: LoadMode = LoadMode(1 << 4);
    pub const EXPORT_FILE: LoadMode = LoadMode(1 << 5);
    pub const TYPES: LoadMode = LoadMode(1 << 6);
    pub const SYNTAX: LoadMode = LoadMode(1 << 7);
    pub const TYPES_INFO: LoadMode = LoadMode(1 << 8);
    pub const TYPES_SIZES: LoadMode = LoadMode(1 << 9);
    pub const MODULE: LoadMode = LoadMode(1 << 10);
    pub const EMBED_FILES: LoadMode = LoadMode(1 << 11);
    pub const EMBED_PATTERNS: LoadMode = LoadMode(1 << 12);
    /// Same bit as `COMPILED_FILES`; extension files ride along with host
    /// files.
    pub const COMPILED_EXT_FILES: LoadMode = Self::COMPILED_FILES;

    pub const fn empty() -> Self {
        LoadMode(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        LoadMode(bits)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: LoadMode) -> bool {
        self.0 & other.0 == other.0
    }

    /// The zero mode means names plus both file lists.
    pub fn effective(self) -> Self {
        if self.is_empty() {
            Self::NAME | Self::FILES | Self::COMPILED_FILES
        } else {
            self
        }
    }
}

impl BitOr for LoadMode {
    type Output = LoadMode;

    fn bitor(self, rhs: LoadMode) -> LoadMode {
        LoadMode(self.0 | rhs.0)
    }
}

impl BitOrAssign for LoadMode {
    fn bitor_assign(&mut self, rhs: LoadMode) {
        self.0 |= rhs.0;
    }
}

/// Load options. The default value is a valid configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub mode: LoadMode,
    pub dir: PathBuf,
    pub tests: bool,
    pub build_flags: Vec<String>,
    pub env: Vec<(String, String)>,
    /// File suffixes that mark extension-language sources.
    pub ext_suffixes: Vec<String>,
    pub mod_file: Option<PathBuf>,
    pub mod_flag: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: LoadMode::empty(),
            dir: PathBuf::from("."),
            tests: false,
            build_flags: Vec::new(),
            env: Vec::new(),
            ext_suffixes: vec![".gop".into(), ".gox".into(), ".spx".into()],
            mod_file: None,
            mod_flag: None,
        }
    }
}

impl Config {
    pub fn is_ext_file(&self, path: &Path) -> bool {
        let name = path.to_string_lossy();
        self.ext_suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackageErrorKind {
    Unknown,
    List,
    Parse,
    Type,
}

/// A problem with one package's metadata, syntax or types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageError {
    /// `file:line:col`, or empty when the position is unknown.
    pub pos: String,
    pub msg: String,
    pub kind: PackageErrorKind,
}

impl PackageError {
    pub fn new(kind: PackageErrorKind, pos: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            pos: pos.into(),
            msg: msg.into(),
            kind,
        }
    }
}

impl fmt::Display for PackageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pos.is_empty() {
            write!(f, "-: {}", self.msg)
        } else {
            write!(f, "{}: {}", self.pos, self.msg)
        }
    }
}

/// Failure of the whole load. Problems with single packages are attached to
/// those packages instead.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Invalid pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },
    #[error("Failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Command `{command}` failed: {message}")]
    Command { command: String, message: String },
    #[error("Load cancelled")]
    Cancelled,
    #[error("{0}")]
    Loader(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Module {
    pub path: String,
    pub dir: PathBuf,
}

/// Type information shared by every package of one load.
#[derive(Debug)]
pub struct TypesInfo {
    pub arena: Arc<Arena>,
    pub pkg: PackageId,
    pub info: Info,
    pub errors: Vec<TypeError>,
}

/// A package as produced by a [`Loader`].
#[derive(Clone, Debug, Default)]
pub struct RawPackage {
    pub id: String,
    pub name: String,
    pub pkg_path: String,
    pub dir: PathBuf,
    /// Every source file, host and extension language alike.
    pub files: Vec<PathBuf>,
    pub compiled_files: Vec<PathBuf>,
    pub other_files: Vec<PathBuf>,
    pub imports: BTreeMap<String, Arc<RawPackage>>,
    pub errors: Vec<PackageError>,
    pub syntax: Vec<Arc<ParsedFile>>,
    pub types_info: Option<Arc<TypesInfo>>,
    pub module: Option<Module>,
    pub for_test: String,
    pub deps_errors: Vec<PackageError>,
}

pub trait Loader {
    fn load(&self, cfg: &Config, patterns: &[&str]) -> Result<Vec<Arc<RawPackage>>, LoadError>;
}

/// A loaded package decorated with extension-language data.
#[derive(Clone, Debug)]
pub struct Package {
    raw: Arc<RawPackage>,
    pub ext_files: Vec<PathBuf>,
    pub compiled_ext_files: Vec<PathBuf>,
    /// Direct dependencies, wrapped. Their own imports are reachable only
    /// through [`Package::raw`].
    pub imports: BTreeMap<String, Package>,
    pub types_info: Option<Arc<TypesInfo>>,
}

impl Package {
    fn wrap(cfg: &Config, raw: Arc<RawPackage>) -> Self {
        let mode = cfg.mode.effective();
        let select = |files: &[PathBuf]| -> Vec<PathBuf> {
            files.iter().filter(|f| cfg.is_ext_file(f)).cloned().collect()
        };
        let ext_files = if mode.contains(LoadMode::FILES) {
            select(&raw.files)
        } else {
            Vec::new()
        };
        let compiled_ext_files = if mode.contains(LoadMode::COMPILED_FILES) {
            select(&raw.compiled_files)
        } else {
            Vec::new()
        };
        let types_info = if mode.contains(LoadMode::TYPES_INFO) {
            raw.types_info.clone()
        } else {
            None
        };
        Self {
            raw,
            ext_files,
            compiled_ext_files,
            imports: BTreeMap::new(),
            types_info,
        }
    }

    pub fn raw(&self) -> &Arc<RawPackage> {
        &self.raw
    }
}

impl Deref for Package {
    type Target = RawPackage;

    fn deref(&self) -> &RawPackage {
        &self.raw
    }
}

/// Loads the packages named by `patterns` through `loader`.
///
/// The loader's failure is returned as is. Per-package problems stay in each
/// package's `errors`.
pub fn load(loader: &dyn Loader, cfg: &Config, patterns: &[&str]) -> Result<Vec<Package>, LoadError> {
    let raws = loader.load(cfg, patterns)?;
    tracing::debug!(packages = raws.len(), ?patterns, "loaded packages");
    Ok(raws
        .into_iter()
        .map(|raw| {
            let imports = raw
                .imports
                .iter()
                .map(|(path, dep)| (path.clone(), Package::wrap(cfg, Arc::clone(dep))))
                .collect();
            let mut pkg = Package::wrap(cfg, raw);
            pkg.imports = imports;
            pkg
        })
        .collect())
}

#[cfg(test)]
mod tests;
