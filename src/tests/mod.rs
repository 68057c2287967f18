//! End-to-end runs over a module on disk: load, analyze, rename.

use crate::{
    analysis::{self, passes, Status, Unit},
    cache::ParsedFile,
    config::Settings,
    error::CancelToken,
    language::{
        ast::File,
        visit::{path_enclosing, Node},
    },
    lsp::rename::{check_rename, CheckKind, PackageUnit, RenameError, World},
    packages::{self, DirLoader, LoadMode, Package},
    types::ObjectId,
};
use std::{fs, path::Path};

const LIB: &str = "package lib

// Grow returns xs, doubled in capacity.
func Grow(xs []int) []int {
\tys := make([]int, len(xs), 2*cap(xs))
\tcopy(ys, xs)
\tys = append(ys)
\treturn ys
}
";

const APP: &str = "package app

import \"example.com/demo/lib\"

func Run() int {
\tbuf := lib.Grow(nil)
\treturn len(buf)
}
";

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create dir");
    }
    fs::write(path, content).expect("write file");
}

fn module() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "gop.mod", "module example.com/demo\n");
    write(dir.path(), "lib/lib.gop", LIB);
    write(dir.path(), "app/app.gop", APP);
    write(dir.path(), "app/notes.txt", "not source\n");
    dir
}

fn load(root: &Path) -> Vec<Package> {
    let cfg = packages::Config {
        mode: LoadMode::NAME | LoadMode::FILES | LoadMode::IMPORTS | LoadMode::SYNTAX | LoadMode::TYPES_INFO,
        dir: root.to_path_buf(),
        ..packages::Config::default()
    };
    packages::load(&DirLoader::new(root), &cfg, &["./..."]).expect("load")
}

fn package<'p>(loaded: &'p [Package], path: &str) -> &'p Package {
    loaded.iter().find(|p| p.pkg_path == path).expect("package loaded")
}

fn world(loaded: &[Package]) -> World<'_> {
    let arena = &loaded[0].types_info.as_ref().expect("types").arena;
    World {
        arena,
        packages: loaded
            .iter()
            .filter_map(|pkg| {
                let types_info = pkg.types_info.as_ref()?;
                Some(PackageUnit {
                    pkg: types_info.pkg,
                    info: &types_info.info,
                    files: pkg.syntax.iter().map(|f| f.as_ref()).collect(),
                })
            })
            .collect(),
    }
}

fn object_at(pkg: &Package, needle: &str) -> ObjectId {
    let info = &pkg.types_info.as_ref().expect("types").info;
    let parsed: &ParsedFile = &pkg.syntax[0];
    let text = std::str::from_utf8(&parsed.src).expect("utf-8");
    let offset = text.find(needle).expect("needle in source");
    path_enclosing(&parsed.file, parsed.tok.pos(offset))
        .into_iter()
        .find_map(|node| match node {
            Node::Ident(ident) => info.object_of(ident.id),
            _ => None,
        })
        .expect("object at needle")
}

#[test]
fn loaded_packages_carry_extension_files_and_types() {
    let dir = module();
    let loaded = load(dir.path());
    assert_eq!(loaded.len(), 2);
    let app = package(&loaded, "example.com/demo/app");
    assert_eq!(app.name, "app");
    assert_eq!(app.ext_files.len(), 1);
    assert!(app.imports.contains_key("example.com/demo/lib"));
    assert!(app.errors.is_empty(), "{:?}", app.errors);
    let types_info = app.types_info.as_ref().expect("types");
    assert!(types_info.errors.is_empty(), "{:?}", types_info.errors);
}

#[test]
fn configured_analyzers_report_on_loaded_packages() {
    let dir = module();
    let loaded = load(dir.path());
    let settings = Settings::parse(Path::new("extls.toml"), "[analysis]\nanalyzers = [\"appends\"]\n")
        .expect("settings");
    let analyzers = settings.analysis.selected();

    let lib = package(&loaded, "example.com/demo/lib");
    let types_info = lib.types_info.as_ref().expect("types");
    let files: Vec<&File> = lib.syntax.iter().map(|f| &f.file).collect();
    let outcomes = analysis::run(
        &analyzers,
        Unit {
            files: &files,
            arena: &types_info.arena,
            info: &types_info.info,
            pkg: types_info.pkg,
        },
    );
    let names: Vec<_> = outcomes.iter().map(|o| o.analyzer.name).collect();
    assert_eq!(names, vec![passes::inspect::ANALYZER.name, "appends"]);
    assert!(outcomes.iter().all(|o| matches!(o.status, Status::Done)));
    let findings: Vec<_> = outcomes.iter().flat_map(|o| &o.diagnostics).collect();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].message, "append with no values");

    let rendered = crate::diagnostics::finding_diagnostic(&lib.syntax[0], findings[0], "")
        .map(crate::diagnostics::render)
        .expect("finding inside lib.gop");
    assert!(rendered.contains("append with no values"), "{rendered}");
}

#[test]
fn exported_renames_cross_package_boundaries() {
    let dir = module();
    let loaded = load(dir.path());
    let world = world(&loaded);
    let grow = object_at(package(&loaded, "example.com/demo/lib"), "Grow(xs");

    let edits = check_rename(&CancelToken::new(), &world, grow, "Expand").expect("safe rename");
    assert_eq!(edits.checks, vec![(grow, CheckKind::PackageLevel)]);
    assert_eq!(edits.edits.len(), 2);
    assert!(edits.edits.keys().any(|name| name.ends_with("app.gop")));
    assert!(edits.edits.keys().any(|name| name.ends_with("lib.gop")));

    let err = check_rename(&CancelToken::new(), &world, grow, "grow").expect_err("unexported");
    let RenameError::Unsafe(conflicts) = err else {
        panic!("expected conflicts");
    };
    assert!(conflicts[0].position.filename.ends_with("lib.gop"));
    assert_eq!(conflicts[1].message, "\tbreaking references from packages such as \"example.com/demo/app\"");
}

#[test]
fn locals_shadowing_universe_names_are_refused() {
    let dir = module();
    let loaded = load(dir.path());
    let world = world(&loaded);
    let buf = object_at(package(&loaded, "example.com/demo/app"), "buf :=");

    let err = check_rename(&CancelToken::new(), &world, buf, "len").expect_err("shadows len");
    assert!(err.to_string().contains("would shadow this reference"), "{err}");

    let edits = check_rename(&CancelToken::new(), &world, buf, "grown").expect("safe rename");
    assert_eq!(edits.edit_count(), 2);
}
