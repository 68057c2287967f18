use super::*;
use std::{fs, sync::Mutex};

struct Stub(Vec<Arc<RawPackage>>);

impl Loader for Stub {
    fn load(&self, _: &Config, _: &[&str]) -> Result<Vec<Arc<RawPackage>>, LoadError> {
        Ok(self.0.clone())
    }
}

struct Failing;

impl Loader for Failing {
    fn load(&self, _: &Config, _: &[&str]) -> Result<Vec<Arc<RawPackage>>, LoadError> {
        Err(LoadError::Loader("go list: exit status 1".into()))
    }
}

fn raw(path: &str, files: &[&str], imports: &[Arc<RawPackage>]) -> Arc<RawPackage> {
    let files: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();
    Arc::new(RawPackage {
        id: path.into(),
        pkg_path: path.into(),
        name: path.rsplit('/').next().unwrap_or(path).into(),
        compiled_files: files.clone(),
        files,
        imports: imports.iter().map(|p| (p.pkg_path.clone(), Arc::clone(p))).collect(),
        ..RawPackage::default()
    })
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create dir");
    }
    fs::write(path, content).expect("write file");
}

fn full_mode() -> LoadMode {
    LoadMode::NAME
        | LoadMode::FILES
        | LoadMode::COMPILED_FILES
        | LoadMode::IMPORTS
        | LoadMode::DEPS
        | LoadMode::SYNTAX
        | LoadMode::TYPES
        | LoadMode::TYPES_INFO
}

#[test]
fn zero_mode_means_names_and_files() {
    let mode = LoadMode::empty().effective();
    assert!(mode.contains(LoadMode::NAME));
    assert!(mode.contains(LoadMode::FILES));
    assert!(mode.contains(LoadMode::COMPILED_EXT_FILES));
    assert!(!mode.contains(LoadMode::TYPES_INFO));
    let mut mode = LoadMode::SYNTAX;
    mode |= LoadMode::EMBED_PATTERNS;
    assert_eq!(mode.effective(), mode);
    assert_eq!(mode.bits(), (1 << 7) | (1 << 12));
}

#[test]
fn loader_failure_is_returned_verbatim() {
    let err = load(&Failing, &Config::default(), &["./..."]).expect_err("load fails");
    assert_eq!(err.to_string(), "go list: exit status 1");
}

#[test]
fn packages_gain_ext_files_and_depth_one_imports() {
    let leaf = raw("example.com/leaf", &["leaf.go"], &[]);
    let mid = raw("example.com/mid", &["mid.gop", "mid.go", "sprite.spx"], &[leaf]);
    let mut top = raw("example.com/top", &["main.gox"], &[mid]);
    Arc::make_mut(&mut top).errors.push(PackageError::new(
        PackageErrorKind::Parse,
        "main.gox:1:1",
        "expected 'package'",
    ));

    let pkgs = load(&Stub(vec![top]), &Config::default(), &["./..."]).expect("loaded");
    assert_eq!(pkgs.len(), 1);
    let top = &pkgs[0];
    assert_eq!(top.ext_files, vec![PathBuf::from("main.gox")]);
    assert_eq!(top.errors.len(), 1);
    assert_eq!(top.errors[0].to_string(), "main.gox:1:1: expected 'package'");

    let mid = &top.imports["example.com/mid"];
    assert_eq!(
        mid.compiled_ext_files,
        vec![PathBuf::from("mid.gop"), PathBuf::from("sprite.spx")]
    );
    assert!(mid.imports.is_empty());
    assert!(mid.raw().imports.contains_key("example.com/leaf"));
}

#[test]
fn file_lists_follow_the_mode() {
    let pkg = raw("example.com/a", &["a.gop"], &[]);
    let cfg = Config {
        mode: LoadMode::NAME,
        ..Config::default()
    };
    let pkgs = load(&Stub(vec![pkg]), &cfg, &["."]).expect("loaded");
    assert!(pkgs[0].ext_files.is_empty());
    assert!(pkgs[0].compiled_ext_files.is_empty());
    assert!(pkgs[0].types_info.is_none());
}

#[test]
fn directory_loader_resolves_module_packages() {
    let dir = tempfile::tempdir().expect("temp dir");
    let root = dir.path();
    write(root, "go.mod", "module example.com/app\n");
    write(
        root,
        "main.gop",
        "package main\n\nimport \"example.com/app/util\"\n\nvar n = util.Twice(2)\n",
    );
    write(root, "util/util.gop", "package util\n\nfunc Twice(x int) int { return x * 2 }\n");
    write(root, "util/helper.go", "package util\n\nfunc helper() {}\n");
    write(root, "util/util_test.gop", "package util\n\nfunc check() {}\n");
    write(root, ".hidden/skip.gop", "package skip\n");

    let cfg = Config {
        mode: full_mode(),
        ..Config::default()
    };
    let pkgs = load(&DirLoader::new(root), &cfg, &["./..."]).expect("loaded");
    let paths: Vec<_> = pkgs.iter().map(|p| p.pkg_path.as_str()).collect();
    assert_eq!(paths, vec!["example.com/app", "example.com/app/util"]);

    let util = &pkgs[1];
    assert_eq!(util.name, "util");
    assert_eq!(util.ext_files.len(), 2);
    assert_eq!(util.compiled_ext_files, vec![root.join("util/util.gop")]);
    assert_eq!(util.compiled_files.len(), 2);
    assert!(util.errors.is_empty(), "{:?}", util.errors);

    let app = &pkgs[0];
    assert!(app.errors.is_empty(), "{:?}", app.errors);
    let dep = &app.imports["example.com/app/util"];
    assert!(dep.types_info.is_some());
    let info = app.types_info.as_ref().expect("types info");
    let scope = info.arena.package(info.pkg).scope;
    let n = info.arena.lookup(scope, "n").expect("n");
    assert_eq!(
        crate::types::type_string(&info.arena, info.arena.object(n).ty, crate::types::Qualifier::Unqualified),
        "int"
    );
}

#[test]
fn missing_module_import_is_attached_to_the_package() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "go.mod", "module example.com/app\n");
    write(
        dir.path(),
        "main.gop",
        "package main\n\nimport (\n\t\"fmt\"\n\t\"example.com/app/missing\"\n)\n",
    );
    let cfg = Config {
        mode: LoadMode::NAME | LoadMode::IMPORTS,
        ..Config::default()
    };
    let pkgs = load(&DirLoader::new(dir.path()), &cfg, &["."]).expect("loaded");
    let errors: Vec<_> = pkgs[0].errors.iter().map(|e| e.msg.as_str()).collect();
    assert_eq!(errors, vec!["could not import example.com/app/missing (no package found)"]);
    let fmt = &pkgs[0].imports["fmt"];
    assert_eq!(fmt.id, "fmt");
    assert!(fmt.name.is_empty());
}

#[test]
fn patterns_outside_the_module_fail_the_load() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "go.mod", "module example.com/app\n");
    write(dir.path(), "main.gop", "package main\n");
    let err = load(&DirLoader::new(dir.path()), &Config::default(), &["golang.org/x/tools"])
        .expect_err("bad pattern");
    assert!(matches!(err, LoadError::Pattern { .. }));
}

#[derive(Debug, Default)]
struct Recording(Mutex<Vec<String>>, String);

impl CmdRunner for Recording {
    fn run(&self, _: &Path, verb: &str, args: &[String], env: &[(String, String)]) -> Result<String, LoadError> {
        let mut calls = self.0.lock().expect("lock");
        let mut call = format!("{verb} {}", args.join(" "));
        for (key, value) in env {
            call.push_str(&format!(" {key}={value}"));
        }
        calls.push(call);
        Ok(self.1.clone())
    }
}

#[test]
fn internals_swap_runner_and_override_module_file() {
    let internals = DefaultInternals::default();
    let recording = Arc::new(Recording::default());
    internals.set_cmd_runner(recording.clone());
    internals
        .cmd_runner()
        .run(Path::new("."), "list", &["-json".into()], &[])
        .expect("ran");
    assert_eq!(*recording.0.lock().expect("lock"), vec!["list -json".to_string()]);

    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "go.mod", "module example.com/app\n");
    write(dir.path(), "alt.mod", "module example.com/alt\n");
    write(dir.path(), "main.gop", "package main\n");
    let mut cfg = Config::default();
    internals.set_mod_file(&mut cfg, dir.path().join("alt.mod"));
    internals.set_mod_flag(&mut cfg, "mod".into());
    assert_eq!(cfg.mod_flag.as_deref(), Some("mod"));
    let pkgs = load(&DirLoader::new(dir.path()), &cfg, &["example.com/alt"]).expect("loaded");
    assert_eq!(pkgs[0].pkg_path, "example.com/alt");

    assert_eq!(internals.for_test(&pkgs[0]), "");
    assert!(internals.deps_errors(&pkgs[0]).is_empty());
    let extra = internals.typecheck_cgo() | internals.deps_errors_mode() | internals.for_test_mode();
    assert_eq!(extra.bits() & full_mode().bits(), 0);
}

#[cfg(unix)]
#[test]
fn process_runner_captures_stdout() {
    let runner = ProcessRunner { tool: "echo".into() };
    let out = runner
        .run(Path::new("."), "hello", &["world".into()], &[])
        .expect("echo runs");
    assert_eq!(out, "hello world\n");
}

#[test]
fn runner_resolves_the_module_with_build_flags_and_env() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "main.gop", "package main\n");
    let recording = Arc::new(Recording(Mutex::default(), "example.com/tool\n".into()));
    let internals = DefaultInternals::default();
    let mut cfg = Config {
        build_flags: vec!["-tags=x".into()],
        env: vec![("GOFLAGS".into(), "-v".into())],
        ..Config::default()
    };
    internals.set_mod_flag(&mut cfg, "mod".into());

    let loader = DirLoader::new(dir.path()).with_runner(recording.clone());
    let pkgs = load(&loader, &cfg, &["."]).expect("loaded");
    assert_eq!(pkgs[0].pkg_path, "example.com/tool");
    assert_eq!(
        *recording.0.lock().expect("lock"),
        vec!["list -m -tags=x -mod=mod GOFLAGS=-v".to_string()]
    );
}

#[test]
fn silent_runner_fails_the_load() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "main.gop", "package main\n");
    let loader = DirLoader::new(dir.path()).with_runner(Arc::new(Recording::default()));
    let err = load(&loader, &Config::default(), &["."]).expect_err("no module");
    assert!(matches!(&err, LoadError::Loader(msg) if msg.contains("printed no module")), "{err}");
}
