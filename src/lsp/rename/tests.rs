use super::*;
use crate::{
    cache::{parse_src, DefaultRepairs, ParseMode},
    language::{span::FileSet, visit::path_enclosing},
    types::{check_package, Type},
};

struct Loaded {
    arena: Arena,
    packages: Vec<(PackageId, Info, Vec<ParsedFile>)>,
}

/// Parses and checks `(path, [(file name, source)])` packages in order, so
/// dependencies must come first.
fn load(packages: &[(&str, &[(&str, &str)])]) -> Loaded {
    let mut fset = FileSet::new();
    let mut arena = Arena::new();
    let mut out = Vec::new();
    for (path, files) in packages {
        let parsed: Vec<ParsedFile> = files
            .iter()
            .map(|(name, src)| parse_src(&mut fset, name, src.as_bytes(), ParseMode::Full, false, &DefaultRepairs))
            .collect();
        let trees: Vec<&crate::language::ast::File> = parsed.iter().map(|p| &p.file).collect();
        let checked = check_package(&mut arena, path, &trees);
        out.push((checked.pkg, checked.info, parsed));
    }
    Loaded { arena, packages: out }
}

fn single(src: &str) -> Loaded {
    load(&[("example.com/demo", &[("demo.gop", src)])])
}

impl Loaded {
    fn world(&self) -> World<'_> {
        World {
            arena: &self.arena,
            packages: self
                .packages
                .iter()
                .map(|(pkg, info, files)| PackageUnit {
                    pkg: *pkg,
                    info,
                    files: files.iter().collect(),
                })
                .collect(),
        }
    }

    /// Object of the identifier starting at the first occurrence of `needle`
    /// in file `name`.
    fn object(&self, name: &str, needle: &str) -> ObjectId {
        for (_, info, files) in &self.packages {
            let Some(file) = files.iter().find(|f| f.name == name) else {
                continue;
            };
            let text = std::str::from_utf8(&file.src).expect("utf-8 source");
            let offset = text.find(needle).unwrap_or_else(|| panic!("{needle} not in {name}"));
            let pos = file.tok.pos(offset);
            for node in path_enclosing(&file.file, pos) {
                if let Node::Ident(ident) = node {
                    if let Some(obj) = info.object_of(ident.id) {
                        return obj;
                    }
                }
            }
            if let Some(obj) = info.implicits.values().copied().find(|obj| self.arena.object(*obj).pos == pos) {
                return obj;
            }
        }
        panic!("no object at {needle} in {name}");
    }

    fn rename(&self, file: &str, needle: &str, to: &str) -> Result<RenameEdits, RenameError> {
        let target = self.object(file, needle);
        check_rename(&CancelToken::new(), &self.world(), target, to)
    }
}

fn conflicts(result: Result<RenameEdits, RenameError>) -> Vec<String> {
    match result {
        Err(RenameError::Unsafe(conflicts)) => conflicts.into_iter().map(|c| c.message).collect(),
        other => panic!("expected a refused rename, got {other:?}"),
    }
}

const LOCALS: &str = "package demo

func f() int {
\tx := 1
\ty := x + 2
\treturn x + y
}
";

#[test]
fn local_rename_edits_every_reference() {
    let loaded = single(LOCALS);
    let edits = loaded.rename("demo.gop", "x :=", "z").expect("safe rename");
    assert_eq!(edits.checks.len(), 1);
    assert_eq!(edits.checks[0].1, CheckKind::Local);
    let file_edits = &edits.edits["demo.gop"];
    assert_eq!(file_edits.len(), 3);
    assert!(file_edits.iter().all(|edit| edit.new_text == "z"));
    assert_eq!(file_edits[0].range.start, lsp_types::Position::new(3, 1));
    assert_eq!(file_edits[0].range.end, lsp_types::Position::new(3, 2));
}

#[test]
fn same_block_names_conflict() {
    let loaded = single(LOCALS);
    let messages = conflicts(loaded.rename("demo.gop", "x :=", "y"));
    assert_eq!(messages[0], "renaming this var \"x\" to \"y\"");
    assert_eq!(messages[1], "\tconflicts with var in same block");
}

#[test]
fn inner_declarations_would_shadow_references() {
    let loaded = single(
        "package demo\n\nfunc f() int {\n\tx := 1\n\tif true {\n\t\ty := 2\n\t\treturn x + y\n\t}\n\treturn x\n}\n",
    );
    let messages = conflicts(loaded.rename("demo.gop", "x :=", "y"));
    assert!(messages.contains(&"\twould cause this reference to become shadowed".to_string()));
    assert!(messages.contains(&"\tby this intervening var definition".to_string()));
}

#[test]
fn renamed_locals_must_not_capture_outer_references() {
    let loaded = single("package demo\n\nvar y = 1\n\nfunc f() int {\n\tx := 2\n\treturn x + y\n}\n");
    let messages = conflicts(loaded.rename("demo.gop", "x :=", "y"));
    assert_eq!(
        messages,
        vec![
            "renaming this var \"x\" to \"y\"".to_string(),
            "\twould shadow this reference".to_string(),
            "\tto the var declared here".to_string(),
        ]
    );
}

#[test]
fn universe_names_cannot_be_shadowed() {
    let loaded = single(
        "package demo\n\nfunc size(xs []int) int { return len(xs) }\n\nfunc total() int { return size(nil) }\n",
    );
    let messages = conflicts(loaded.rename("demo.gop", "size(xs", "len"));
    assert!(messages.contains(&"\twould shadow this reference".to_string()));

    let edits = loaded.rename("demo.gop", "size(xs", "count").expect("safe rename");
    assert_eq!(edits.checks, vec![(loaded.object("demo.gop", "size(xs"), CheckKind::PackageLevel)]);
    assert_eq!(edits.edit_count(), 2);
}

#[test]
fn struct_literal_keys_are_not_lexical_references() {
    let loaded = single(
        "package demo\n\ntype S struct {\n\tF int\n}\n\nvar s = S{F: 1}\n\nvar k = \"a\"\n\nvar m = map[string]int{k: 1}\n",
    );
    let world = loaded.world();
    let unit = &world.packages[0];
    let cancel = CancelToken::new();

    let field = loaded.object("demo.gop", "F int");
    let mut found = 0;
    let completed = for_each_lexical_ref(&cancel, &loaded.arena, unit, field, &mut |_, _| {
        found += 1;
        true
    })
    .expect("traversal");
    assert!(completed);
    assert_eq!(found, 0);

    let key = loaded.object("demo.gop", "k = ");
    let mut found = 0;
    for_each_lexical_ref(&cancel, &loaded.arena, unit, key, &mut |ident, _| {
        assert_eq!(ident.name, "k");
        found += 1;
        true
    })
    .expect("traversal");
    assert_eq!(found, 1);
}

#[test]
fn traversal_stops_when_asked() {
    let loaded = single(LOCALS);
    let world = loaded.world();
    let x = loaded.object("demo.gop", "x :=");
    let mut calls = 0;
    let completed = for_each_lexical_ref(&CancelToken::new(), &loaded.arena, &world.packages[0], x, &mut |_, _| {
        calls += 1;
        false
    })
    .expect("traversal");
    assert!(!completed);
    assert_eq!(calls, 1);
}

const LIB: &str = "package lib\n\nfunc Hello() string { return \"hi\" }\n";
const APP: &str = "package app\n\nimport \"example.com/lib\"\n\nvar greeting = lib.Hello()\n";

fn two_packages() -> Loaded {
    load(&[
        ("example.com/lib", &[("lib.gop", LIB)]),
        ("example.com/app", &[("app.gop", APP)]),
    ])
}

#[test]
fn unexporting_a_used_name_is_refused() {
    let loaded = two_packages();
    let err = loaded.rename("lib.gop", "Hello", "hello").expect_err("unsafe");
    let text = err.to_string();
    assert!(text.contains("renaming \"Hello\" to \"hello\" would make it unexported"), "{text}");
    assert!(text.contains("breaking references from packages such as \"example.com/app\""), "{text}");
    assert!(text.contains("app.gop:5:"), "{text}");
}

#[test]
fn exported_renames_reach_other_packages() {
    let loaded = two_packages();
    let edits = loaded.rename("lib.gop", "Hello", "Greet").expect("safe rename");
    assert_eq!(edits.edits.len(), 2);
    assert_eq!(edits.edits["lib.gop"].len(), 1);
    assert_eq!(edits.edits["app.gop"].len(), 1);
    assert_eq!(edits.edits["app.gop"][0].new_text, "Greet");
}

#[test]
fn implicit_import_names_gain_an_explicit_name() {
    let loaded = two_packages();
    let edits = loaded.rename("app.gop", "\"example.com/lib\"", "l").expect("safe rename");
    assert_eq!(edits.checks[0].1, CheckKind::ImportName);
    let file_edits = &edits.edits["app.gop"];
    assert_eq!(file_edits.len(), 2);
    assert_eq!(file_edits[0].new_text, "l ");
    assert_eq!(file_edits[0].range.start, file_edits[0].range.end);
    assert_eq!(file_edits[1].new_text, "l");

    let messages = conflicts(loaded.rename("app.gop", "\"example.com/lib\"", "greeting"));
    assert_eq!(messages[0], "renaming this package \"lib\" to \"greeting\" would conflict");
    assert_eq!(messages[1], "\twith this package member var");
}

const SHAPES: &str = "package demo

type Shape interface {
\tArea() float64
}

type Square struct {
\tside float64
}

func (s Square) Area() float64 { return s.side * s.side }

func measure(sh Shape) float64 { return sh.Area() }

func g(s Square) float64 { return s.Area() }
";

#[test]
fn methods_and_interfaces_rename_together_once() {
    let loaded = single(SHAPES);
    let edits = loaded.rename("demo.gop", "Area() float64 {", "Size").expect("safe rename");
    let kinds: Vec<CheckKind> = edits.checks.iter().map(|(_, kind)| *kind).collect();
    assert_eq!(kinds, vec![CheckKind::Method, CheckKind::Method]);
    let mut objects = edits.objects.clone();
    objects.sort_by_key(|obj| obj.0);
    objects.dedup();
    assert_eq!(objects.len(), 2);
    assert_eq!(edits.edit_count(), 4);

    // Starting from the interface reaches the same pair.
    let edits = loaded.rename("demo.gop", "Area() float64\n", "Size").expect("safe rename");
    assert_eq!(edits.objects.len(), 2);
    assert_eq!(edits.edit_count(), 4);
}

#[test]
fn methods_and_fields_share_a_namespace() {
    let loaded = single(SHAPES);
    let messages = conflicts(loaded.rename("demo.gop", "Area() float64 {", "side"));
    assert_eq!(messages[0], "renaming this method \"Area\" to \"side\"");
    assert_eq!(messages[1], "\twould conflict with this field");

    let messages = conflicts(loaded.rename("demo.gop", "side float64", "Area"));
    assert_eq!(messages[0], "renaming this field \"side\" to \"Area\"");
    assert_eq!(messages[1], "\twould conflict with this method");
}

#[test]
fn labels_are_unique_per_function() {
    let loaded = single(
        "package demo\n\nfunc f() {\nouter:\n\tfor {\n\t\tbreak outer\n\t}\ninner:\n\tfor {\n\t\tcontinue inner\n\t}\n}\n",
    );
    let messages = conflicts(loaded.rename("demo.gop", "outer:", "inner"));
    assert_eq!(messages, vec!["renaming this label \"outer\" to \"inner\"", "\twould conflict with this one"]);

    let edits = loaded.rename("demo.gop", "outer:", "top").expect("safe rename");
    assert_eq!(edits.checks[0].1, CheckKind::Label);
    assert_eq!(edits.edit_count(), 2);
}

#[test]
fn names_are_validated_first() {
    let loaded = single(LOCALS);
    let x = loaded.object("demo.gop", "x :=");
    let world = loaded.world();
    let cancel = CancelToken::new();
    assert!(matches!(check_rename(&cancel, &world, x, "1x"), Err(RenameError::InvalidName(_))));
    assert!(matches!(check_rename(&cancel, &world, x, "func"), Err(RenameError::InvalidName(_))));
    assert!(matches!(check_rename(&cancel, &world, x, "x"), Err(RenameError::SameName(_))));

    let len = loaded.arena.lookup(loaded.arena.universe(), "len").expect("len");
    assert!(matches!(check_rename(&cancel, &world, len, "size"), Err(RenameError::Builtin(_))));

    cancel.cancel();
    assert!(matches!(
        check_rename(&cancel, &world, x, "z"),
        Err(RenameError::Request(Error::Cancelled))
    ));
}

#[test]
fn unclassifiable_objects_are_internal_errors() {
    let loaded = single("package demo\n\ntype Pred func(int) bool\n");
    let pred = loaded.object("demo.gop", "Pred");
    let arena = &loaded.arena;
    let underlying = arena.underlying(arena.object(pred).ty);
    let Type::Signature(sig) = arena.ty(underlying) else {
        panic!("Pred is a func type");
    };
    let param = sig.params[0];
    let err = check_rename(&CancelToken::new(), &loaded.world(), param, "n").expect_err("no scope");
    match err {
        RenameError::Internal(message) => {
            assert_eq!(message, "unexpected var object \"\" (please report a bug)");
        }
        other => panic!("expected an internal error, got {other:?}"),
    }
}
