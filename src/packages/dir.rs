use super::{
    CmdRunner, Config, LoadError, LoadMode, Loader, Module, PackageError, PackageErrorKind, RawPackage,
    TypesInfo,
};
use crate::{
    cache::{parse_file, DiskFile, ParseMode, ParsedFile},
    error::{CancelToken, Error},
    language::span::FileSet,
    types::{check_package, Arena, Info, PackageId, TypeError},
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

const HOST_SUFFIX: &str = ".go";
const MOD_FILES: [&str; 2] = ["gop.mod", "go.mod"];

/// Loads packages from a directory tree: every directory holding source
/// files is one package whose path is the module path joined with the
/// directory's relative path.
#[derive(Clone, Debug)]
pub struct DirLoader {
    root: PathBuf,
    cancel: CancelToken,
    runner: Option<Arc<dyn CmdRunner>>,
}

struct Found {
    dir: PathBuf,
    files: Vec<PathBuf>,
    compiled: Vec<PathBuf>,
    parsed: Vec<Arc<ParsedFile>>,
    imports: Vec<String>,
    errors: Vec<PackageError>,
}

impl DirLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cancel: CancelToken::new(),
            runner: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolves the main module through `runner` (`list -m`) instead of
    /// reading module files, so build flags and environment take effect.
    pub fn with_runner(mut self, runner: Arc<dyn CmdRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Arguments of the `list -m` query for `cfg`.
    fn list_module_args(cfg: &Config) -> Vec<String> {
        let mut args = vec!["-m".to_string()];
        args.extend(cfg.build_flags.iter().cloned());
        if let Some(flag) = &cfg.mod_flag {
            args.push(format!("-mod={flag}"));
        }
        if let Some(path) = &cfg.mod_file {
            args.push(format!("-modfile={}", path.display()));
        }
        args
    }

    fn module(&self, cfg: &Config) -> Result<Module, LoadError> {
        if let Some(runner) = &self.runner {
            let out = runner.run(&self.root, "list", &Self::list_module_args(cfg), &cfg.env)?;
            let path = out.lines().map(str::trim).find(|line| !line.is_empty()).ok_or_else(|| {
                LoadError::Loader(format!("`list -m` printed no module in `{}`", self.root.display()))
            })?;
            return Ok(Module {
                path: path.to_string(),
                dir: self.root.clone(),
            });
        }
        if !cfg.build_flags.is_empty() || cfg.mod_flag.is_some() {
            tracing::warn!("build flags need a build tool; reading module files instead");
        }
        let candidates = cfg
            .mod_file
            .iter()
            .cloned()
            .chain(MOD_FILES.iter().map(|name| self.root.join(name)));
        for path in candidates {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let module = content.lines().find_map(|line| {
                let rest = line.trim().strip_prefix("module")?;
                let name = rest.trim().trim_matches('"');
                (!name.is_empty()).then(|| name.to_string())
            });
            if let Some(path) = module {
                return Ok(Module {
                    path,
                    dir: self.root.clone(),
                });
            }
        }
        let fallback = self
            .root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "main".into());
        Ok(Module {
            path: fallback,
            dir: self.root.clone(),
        })
    }

    fn walk(&self, cfg: &Config, dir: &Path, out: &mut Vec<(PathBuf, Vec<PathBuf>)>) -> Result<(), LoadError> {
        let io = |source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        let mut subdirs = Vec::new();
        for entry in fs::read_dir(dir).map_err(io)? {
            let path = entry.map_err(io)?.path();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if name.starts_with('.') || name.starts_with('_') {
                continue;
            }
            if path.is_dir() {
                if name != "testdata" {
                    subdirs.push(path);
                }
            } else if name.ends_with(HOST_SUFFIX) || cfg.is_ext_file(&path) {
                files.push(path);
            }
        }
        files.sort();
        subdirs.sort();
        if !files.is_empty() {
            out.push((dir.to_path_buf(), files));
        }
        for sub in subdirs {
            self.walk(cfg, &sub, out)?;
        }
        Ok(())
    }

    fn pkg_path(&self, module: &Module, dir: &Path) -> String {
        match dir.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => module.path.clone(),
            Ok(rel) => {
                let rel = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                format!("{}/{rel}", module.path)
            }
            Err(_) => module.path.clone(),
        }
    }

    fn matches(module: &Module, pattern: &str, pkg_path: &str) -> Result<bool, LoadError> {
        let pattern = pattern.trim_end_matches('/');
        let absolute = if pattern == "." {
            module.path.clone()
        } else if let Some(rel) = pattern.strip_prefix("./") {
            format!("{}/{rel}", module.path)
        } else if pattern == module.path || pattern.starts_with(&format!("{}/", module.path)) {
            pattern.to_string()
        } else {
            return Err(LoadError::Pattern {
                pattern: pattern.to_string(),
                message: format!("outside main module `{}`", module.path),
            });
        };
        Ok(match absolute.strip_suffix("/...") {
            Some(prefix) => pkg_path == prefix || pkg_path.starts_with(&format!("{prefix}/")),
            None => pkg_path == absolute,
        })
    }

    fn parse_package(
        &self,
        cfg: &Config,
        fset: &mut FileSet,
        dir: PathBuf,
        files: Vec<PathBuf>,
    ) -> Result<Found, LoadError> {
        let mode = cfg.mode.effective();
        let parse_mode = if mode.contains(LoadMode::SYNTAX)
            || mode.contains(LoadMode::TYPES)
            || mode.contains(LoadMode::TYPES_INFO)
        {
            ParseMode::Full
        } else {
            ParseMode::Header
        };
        let compiled: Vec<PathBuf> = files
            .iter()
            .filter(|path| {
                let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
                cfg.tests || !stem.ends_with("_test")
            })
            .cloned()
            .collect();

        let mut parsed = Vec::new();
        let mut errors = Vec::new();
        let mut imports = Vec::new();
        for path in &compiled {
            let file = parse_file(&self.cancel, fset, &DiskFile::new(path), parse_mode).map_err(|err| match err {
                Error::Io { path, source } => LoadError::Io { path, source },
                Error::Cancelled => LoadError::Cancelled,
            })?;
            if let Some(parse_err) = &file.parse_err {
                for error in &parse_err.errors {
                    let position = file.tok.position(file.tok.pos(error.span.start));
                    errors.push(PackageError::new(PackageErrorKind::Parse, position.to_string(), &error.message));
                }
            }
            for import in file.file.imports() {
                let path = import.path_value();
                if !imports.contains(&path) {
                    imports.push(path);
                }
            }
            parsed.push(Arc::new(file));
        }
        Ok(Found {
            dir,
            files,
            compiled,
            parsed,
            imports,
            errors,
        })
    }
}

impl Loader for DirLoader {
    fn load(&self, cfg: &Config, patterns: &[&str]) -> Result<Vec<Arc<RawPackage>>, LoadError> {
        let mode = cfg.mode.effective();
        let module = self.module(cfg)?;
        let patterns: Vec<&str> = if patterns.is_empty() { vec!["."] } else { patterns.to_vec() };

        let mut dirs = Vec::new();
        self.walk(cfg, &self.root, &mut dirs)?;
        let mut fset = FileSet::new();
        let mut found: BTreeMap<String, Found> = BTreeMap::new();
        for (dir, files) in dirs {
            let pkg_path = self.pkg_path(&module, &dir);
            let pkg = self.parse_package(cfg, &mut fset, dir, files)?;
            found.insert(pkg_path, pkg);
        }

        let mut roots = Vec::new();
        for pattern in &patterns {
            for path in found.keys() {
                if Self::matches(&module, pattern, path)? && !roots.contains(path) {
                    roots.push(path.clone());
                }
            }
        }

        let order = topo_order(&mut found, &module);
        let mut infos: FxHashMap<String, (PackageId, Info, Vec<TypeError>)> = FxHashMap::default();
        let mut arena = Arena::new();
        if mode.contains(LoadMode::TYPES) || mode.contains(LoadMode::TYPES_INFO) {
            for path in &order {
                let Some(pkg) = found.get_mut(path) else { continue };
                let files: Vec<_> = pkg.parsed.iter().map(|f| &f.file).collect();
                let checked = check_package(&mut arena, path, &files);
                for error in &checked.errors {
                    pkg.errors.push(PackageError::new(
                        PackageErrorKind::Type,
                        fset.position(error.pos).to_string(),
                        &error.message,
                    ));
                }
                infos.insert(path.clone(), (checked.pkg, checked.info, checked.errors));
            }
        }
        let arena = Arc::new(arena);

        let mut built: FxHashMap<String, Arc<RawPackage>> = FxHashMap::default();
        for path in &order {
            let Some(pkg) = found.remove(path) else { continue };
            let mut imports = BTreeMap::new();
            if mode.contains(LoadMode::IMPORTS) {
                for import in &pkg.imports {
                    let dep = match built.get(import) {
                        Some(dep) if mode.contains(LoadMode::DEPS) => Arc::clone(dep),
                        _ => Arc::new(RawPackage {
                            id: import.clone(),
                            ..RawPackage::default()
                        }),
                    };
                    imports.insert(import.clone(), dep);
                }
            }
            let deps_errors = pkg
                .imports
                .iter()
                .filter_map(|import| built.get(import))
                .flat_map(|dep| dep.errors.iter().chain(dep.deps_errors.iter()).cloned())
                .collect();
            let types_info = infos.remove(path).map(|(id, info, errors)| {
                Arc::new(TypesInfo {
                    arena: Arc::clone(&arena),
                    pkg: id,
                    info,
                    errors,
                })
            });
            let name = pkg
                .parsed
                .first()
                .map(|f| f.file.package_name().to_string())
                .unwrap_or_default();
            let raw = RawPackage {
                id: path.clone(),
                name: if mode.contains(LoadMode::NAME) { name } else { String::new() },
                pkg_path: if mode.contains(LoadMode::NAME) { path.clone() } else { String::new() },
                dir: pkg.dir,
                files: if mode.contains(LoadMode::FILES) { pkg.files } else { Vec::new() },
                compiled_files: if mode.contains(LoadMode::COMPILED_FILES) {
                    pkg.compiled
                } else {
                    Vec::new()
                },
                other_files: Vec::new(),
                imports,
                errors: pkg.errors,
                syntax: if mode.contains(LoadMode::SYNTAX) { pkg.parsed } else { Vec::new() },
                types_info,
                module: mode.contains(LoadMode::MODULE).then(|| module.clone()),
                for_test: String::new(),
                deps_errors,
            };
            built.insert(path.clone(), Arc::new(raw));
        }

        Ok(roots.iter().filter_map(|path| built.get(path).cloned()).collect())
    }
}

/// Dependencies before dependents. Imports inside the module that name no
/// package, and import cycles, become errors on the importing package.
fn topo_order(found: &mut BTreeMap<String, Found>, module: &Module) -> Vec<String> {
    let mut order = Vec::new();
    let mut done = FxHashSet::default();
    let mut errors: Vec<(String, PackageError)> = Vec::new();
    let keys: Vec<String> = found.keys().cloned().collect();
    for key in keys {
        let mut visiting = Vec::new();
        visit(found, module, &key, &mut visiting, &mut done, &mut order, &mut errors);
    }
    for (path, error) in errors {
        if let Some(pkg) = found.get_mut(&path) {
            if !pkg.errors.contains(&error) {
                pkg.errors.push(error);
            }
        }
    }
    order
}

fn visit(
    found: &BTreeMap<String, Found>,
    module: &Module,
    path: &str,
    visiting: &mut Vec<String>,
    done: &mut FxHashSet<String>,
    order: &mut Vec<String>,
    errors: &mut Vec<(String, PackageError)>,
) {
    if done.contains(path) {
        return;
    }
    let Some(pkg) = found.get(path) else { return };
    visiting.push(path.to_string());
    for import in &pkg.imports {
        if visiting.iter().any(|p| p == import) {
            errors.push((
                path.to_string(),
                PackageError::new(
                    PackageErrorKind::List,
                    "",
                    format!("import cycle not allowed: {path} imports {import}"),
                ),
            ));
        } else if found.contains_key(import) {
            visit(found, module, import, visiting, done, order, errors);
        } else if import == &module.path || import.starts_with(&format!("{}/", module.path)) {
            errors.push((
                path.to_string(),
                PackageError::new(
                    PackageErrorKind::List,
                    "",
                    format!("could not import {import} (no package found)"),
                ),
            ));
        }
    }
    visiting.pop();
    done.insert(path.to_string());
    order.push(path.to_string());
}
