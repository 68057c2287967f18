use super::literal::abbreviate_type_name;
use super::*;
use crate::{
    language::parser::parse,
    types::{check_package, BasicKind, Checked},
};
use std::sync::Arc;
use lsp_types::Position;

const CURSOR: &str = "@@";

struct Fixture {
    fset: FileSet,
    arena: Arena,
    checked: Checked,
    file: File,
    tok: Arc<TokenFile>,
    mapper: Mapper,
    pos: Pos,
}

impl Fixture {
    fn new(marked: &str) -> Self {
        let offset = marked.find(CURSOR).expect("cursor marker");
        let src = marked.replacen(CURSOR, "", 1);
        let mut fset = FileSet::new();
        let (file, _) = parse(&mut fset, "demo.gop", src.as_bytes());
        let file = file.expect("tree");
        let mut arena = Arena::new();
        let checked = check_package(&mut arena, "example.com/demo", &[&file]);
        let tok = fset.file(file.pos).expect("token file");
        let pos = tok.pos(offset);
        let mapper = Mapper::new("demo.gop", Arc::from(src.as_bytes()));
        Self {
            fset,
            arena,
            checked,
            file,
            tok,
            mapper,
            pos,
        }
    }

    fn cursor(&self) -> Cursor<'_> {
        Cursor {
            fset: &self.fset,
            arena: &self.arena,
            info: &self.checked.info,
            pkg: self.checked.pkg,
            file: &self.file,
            tok: &self.tok,
            mapper: &self.mapper,
            pos: self.pos,
        }
    }

    fn completer(&self) -> Completer<'_> {
        Completer::new(self.cursor(), CompletionOptions::default())
    }

    fn completer_with(&self, opts: CompletionOptions) -> Completer<'_> {
        Completer::new(self.cursor(), opts)
    }

    /// Object visible as `name` at the cursor.
    fn obj(&self, name: &str) -> ObjectId {
        let file_scope = self.checked.info.scopes[&self.file.id];
        let scope = self.arena.innermost_scope(file_scope, self.pos);
        self.arena
            .lookup_parent(scope, name, self.pos)
            .map(|(_, obj)| obj)
            .unwrap_or_else(|| panic!("no object named {name}"))
    }

    fn ty(&self, name: &str) -> TypeId {
        self.arena.object(self.obj(name)).ty
    }

    fn cand(&self, name: &str) -> Candidate {
        Candidate::new(&self.arena, self.obj(name), 1.0)
    }
}

const OVERLOADS: &str = "package demo

// Add sums two ints.
func Add__0(a, b int) int { return a + b }

func Add__1(a, b string) string { return a + b }

func f() {
\t@@
}
";

#[test]
fn prefix_mismatch_is_no_match() {
    let fx = Fixture::new("package demo\n\nfunc Add(a, b int) int { return a + b }\n\nfunc f() {\n\tzz@@\n}\n");
    let mut completer = fx.completer();
    let err = completer.item(fx.cand("Add")).expect_err("zz does not match Add");
    assert!(matches!(err, FormatError::NoMatch));
    completer.add(fx.cand("Add"));
    assert!(completer.finish().is_empty());
}

#[test]
fn overload_family_replaces_its_members() {
    let fx = Fixture::new(OVERLOADS);
    let mut completer = fx.completer();
    completer.add(fx.cand("Add__0").with_mods(&[Modifier::Invoke]));
    completer.add(fx.cand("Add").with_mods(&[Modifier::Invoke]));
    completer.add(fx.cand("Add__1").with_mods(&[Modifier::Invoke]));
    let items = completer.finish();
    assert_eq!(items.len(), 1, "{items:?}");

    let item = &items[0];
    assert_eq!(item.label, "Add");
    assert_eq!(item.kind, CompletionItemKind::FUNCTION);
    assert_eq!(
        item.detail,
        "overloads\n\n- func(a int, b int) int\n- func(a string, b string) string"
    );
    assert_eq!(item.snippet_text(), "Add(${1:a int}, ${2:b int})");
    assert!(item.is_overload);
    assert_eq!(item.tags, vec![ItemTag::Overload]);
    assert_eq!(item.documentation.as_deref(), Some("Add sums two ints."));
}

#[test]
fn call_parens_already_written_are_not_repeated() {
    let src = OVERLOADS.replace("\t@@", "\tAd@@()");
    let fx = Fixture::new(&src);
    let mut completer = fx.completer();
    let item = completer
        .item(fx.cand("Add__0").with_mods(&[Modifier::Invoke]))
        .expect("item");
    assert_eq!(item.snippet_text(), "Add__0");
    assert_eq!(item.detail, "func(a int, b int) int");
}

#[test]
fn builtins_get_their_documented_signature() {
    let fx = Fixture::new("package demo\n\nfunc f() {\n\t@@\n}\n");
    let mut completer = fx.completer();
    let append = fx.arena.lookup(fx.arena.universe(), "append").expect("append");
    let item = completer.item(Candidate::new(&fx.arena, append, 1.0)).expect("item");
    assert_eq!(item.kind, CompletionItemKind::FUNCTION);
    assert_eq!(item.detail, "func(slice []Type, elems ...Type) []Type");
    assert_eq!(item.snippet_text(), "append(${1:slice []Type}, ${2:elems ...Type})");

    let nil = fx.arena.lookup(fx.arena.universe(), "nil").expect("nil");
    let item = completer.item(Candidate::new(&fx.arena, nil, 1.0)).expect("item");
    assert_eq!(item.kind, CompletionItemKind::VARIABLE);
    assert!(item.detail.is_empty());
}

#[test]
fn struct_field_key_gets_a_value_placeholder() {
    let fx = Fixture::new(
        "package demo\n\ntype Point struct {\n\tX, Y int\n}\n\ntype Line struct {\n\tFrom, To Point\n}\n\nvar l = Line{\n\tFr@@,\n}\n",
    );
    let from = fx
        .arena
        .lookup_field_or_method(fx.ty("l"), "From")
        .expect("field From")
        .obj;
    let mut completer = fx.completer();
    let item = completer.item(Candidate::new(&fx.arena, from, 1.0)).expect("item");
    assert_eq!(item.kind, CompletionItemKind::FIELD);
    assert_eq!(item.detail, "Point");
    assert_eq!(item.snippet_text(), "From: ${1:Point{X, Y\\}},");

    let mut opts = CompletionOptions::default();
    opts.placeholders = false;
    let mut completer = fx.completer_with(opts);
    let item = completer.item(Candidate::new(&fx.arena, from, 1.0)).expect("item");
    assert_eq!(item.snippet_text(), "From: ${1:},");
}

const LOCALS: &str = "package demo

type Point struct {
\tX, Y int
}

type Line struct {
\tFrom, To Point
}

func f(p *Point, n int, l Line) {
\t@@
}
";

#[test]
fn modifiers_and_conversions_wrap_the_name() {
    let fx = Fixture::new(LOCALS);
    let mut completer = fx.completer();

    let item = completer
        .item(fx.cand("p").with_mods(&[Modifier::Dereference]))
        .expect("item");
    assert_eq!(item.label, "p");
    assert_eq!(item.insert_text, "*p");
    assert_eq!(item.snippet_text(), "*p");
    assert_eq!(item.detail, "*Point");
    assert_eq!(item.kind, CompletionItemKind::VARIABLE);

    let mut cand = fx.cand("n");
    cand.convert_to = Some(fx.arena.basic(BasicKind::Float64));
    let item = completer.item(cand).expect("item");
    assert_eq!(item.insert_text, "float64(n)");

    let mut cand = fx.cand("p");
    cand.convert_to = Some(fx.ty("p"));
    let item = completer.item(cand).expect("item");
    assert_eq!(item.insert_text, "(*Point)(p)");

    let mut cand = fx.cand("n");
    cand.detail = Some("count".into());
    assert_eq!(completer.item(cand).expect("item").detail, "count");
}

const OPERANDS: &str = "package demo

type T struct {
\tF int
}

func list() []int { return nil }

func g(p *int) {}

func f(t T, ch chan int, pred func(int) bool) {
\t@@
}
";

#[test]
fn slice_and_channel_modifiers_extend_the_call() {
    let fx = Fixture::new(OPERANDS);
    let mut completer = fx.completer();

    let item = completer
        .item(fx.cand("list").with_mods(&[Modifier::Invoke, Modifier::TakeSlice]))
        .expect("item");
    assert_eq!(item.snippet_text(), "list()[:]");

    let item = completer
        .item(fx.cand("list").with_mods(&[Modifier::Invoke, Modifier::TakeDotDotDot]))
        .expect("item");
    assert_eq!(item.snippet_text(), "list()...");

    let item = completer
        .item(fx.cand("list").with_mods(&[Modifier::Invoke, Modifier::Index]))
        .expect("item");
    assert_eq!(item.snippet_text(), "list()[${1:}]");

    let item = completer
        .item(fx.cand("ch").with_mods(&[Modifier::ChanRead]))
        .expect("item");
    assert_eq!(item.insert_text, "<-ch");
    assert_eq!(item.snippet_text(), "<-ch");
    assert!(item.additional_text_edits.is_empty());
}

#[test]
fn conversion_to_a_func_type_is_parenthesized() {
    let fx = Fixture::new(OPERANDS);
    let mut completer = fx.completer();
    let mut cand = fx.cand("t");
    cand.convert_to = Some(fx.ty("pred"));
    let item = completer.item(cand).expect("item");
    assert_eq!(item.insert_text, "(func(int) bool)(t)");
}

#[test]
fn selector_prefix_is_inserted_before_the_operand() {
    let fx = Fixture::new(&OPERANDS.replace("\t@@", "\tg(t.F@@)"));
    let field = fx
        .arena
        .lookup_field_or_method(fx.ty("t"), "F")
        .expect("field F")
        .obj;
    let mut completer = fx.completer();
    let item = completer
        .item(Candidate::new(&fx.arena, field, 1.0).with_mods(&[Modifier::Reference]))
        .expect("item");
    assert_eq!(item.kind, CompletionItemKind::FIELD);
    assert_eq!(item.insert_text, "F");
    assert_eq!(item.snippet_text(), "F");
    assert_eq!(item.additional_text_edits.len(), 1);
    let edit = &item.additional_text_edits[0];
    assert_eq!(edit.new_text, "&");
    assert_eq!(edit.range.start, Position::new(11, 3));
    assert_eq!(edit.range.end, Position::new(11, 3));
}

#[test]
fn missing_imports_are_added() {
    let fx = Fixture::new("package demo\n\nfunc f() {\n\t@@\n}\n");
    let mut completer = fx.completer();
    let mut cand = fx.cand("f");
    cand.imp = Some(ImportInfo {
        import_path: "strings".into(),
        name: None,
    });
    let item = completer.item(cand).expect("item");
    assert_eq!(item.detail, "func() (from \"strings\")");
    assert_eq!(item.additional_text_edits.len(), 1);
    let edit = &item.additional_text_edits[0];
    assert_eq!(edit.new_text, "\n\nimport \"strings\"");
    assert_eq!(edit.range.start, Position::new(0, 12));
}

#[test]
fn imports_join_an_existing_import_block() {
    let fx = Fixture::new("package demo\n\nimport (\n\t\"fmt\"\n)\n\nfunc f() {\n\t@@\n}\n");
    let mut completer = fx.completer();

    let mut cand = fx.cand("f");
    cand.imp = Some(ImportInfo {
        import_path: "strings".into(),
        name: Some("str".into()),
    });
    let item = completer.item(cand).expect("item");
    let edit = &item.additional_text_edits[0];
    assert_eq!(edit.new_text, "\tstr \"strings\"\n");
    assert_eq!(edit.range.start, Position::new(4, 0));

    let mut cand = fx.cand("f");
    cand.imp = Some(ImportInfo {
        import_path: "fmt".into(),
        name: None,
    });
    let item = completer.item(cand).expect("item");
    assert!(item.additional_text_edits.is_empty());
    assert!(item.detail.ends_with("(from \"fmt\")"));
}

const DEPRECATED: &str = "package demo

// Deprecated: use Sum instead. Kept for old callers.
//
// Sum handles every numeric type.
func Old() {}

func f() {
\t@@
}
";

#[test]
fn deprecated_documentation_marks_the_item() {
    let fx = Fixture::new(DEPRECATED);
    let mut completer = fx.completer();
    let item = completer.item(fx.cand("Old")).expect("item");
    assert_eq!(item.documentation.as_deref(), Some("Deprecated: use Sum instead."));
    assert!(item.deprecated);
    assert!(item.tags.is_empty());
    let lsp = item.to_lsp(true);
    assert_eq!(lsp.deprecated, Some(true));

    let mut opts = CompletionOptions::default();
    opts.completion_tags = true;
    opts.full_documentation = true;
    let mut completer = fx.completer_with(opts);
    let item = completer.item(fx.cand("Old")).expect("item");
    assert!(!item.deprecated);
    assert_eq!(item.tags, vec![ItemTag::Deprecated]);
    assert!(item.documentation.as_deref().is_some_and(|doc| doc.ends_with("every numeric type.")));
    assert_eq!(item.to_lsp(true).tags, Some(vec![CompletionItemTag::DEPRECATED]));
}

#[test]
fn documentation_lookup_failure_keeps_the_item() {
    let fx = Fixture::new(DEPRECATED);
    let empty = FileSet::new();
    let cursor = Cursor {
        fset: &empty,
        ..fx.cursor()
    };
    let mut completer = Completer::new(cursor, CompletionOptions::default());
    let item = completer.item(fx.cand("Old")).expect("item survives");
    assert_eq!(item.label, "Old");
    assert!(item.documentation.is_none());
    assert!(!item.deprecated);
}

#[test]
fn deep_scores_keep_only_the_best_three() {
    let mut state = DeepCompletionState::new(true);
    assert!(state.is_high_score(0.5));
    assert!(state.is_high_score(0.3));
    assert!(state.is_high_score(0.4));
    assert!(!state.is_high_score(0.2));
    assert!(!state.is_high_score(0.0));
    assert!(state.is_high_score(0.45));
    assert!(!state.is_high_score(0.4));
}

#[test]
fn deep_completion_walks_struct_fields() {
    let fx = Fixture::new(LOCALS);
    let mut completer = fx.completer();
    completer.add_deep(fx.cand("l"));
    let items = completer.finish();
    let labels: Vec<&str> = items.iter().map(|item| item.label.as_str()).collect();
    assert_eq!(labels, vec!["l", "l.From", "l.To", "l.From.X"]);
    assert_eq!(items[1].depth, 1);
    assert_eq!(items[3].depth, 2);
    assert_eq!(items[3].detail, "int");

    let mut opts = CompletionOptions::default();
    opts.deep = false;
    let mut completer = fx.completer_with(opts);
    completer.add_deep(fx.cand("l"));
    assert_eq!(completer.finish().len(), 1);
}

const LITERALS: &str = "package demo

type Point struct {
\tX, Y int
}

type Pred func(int) bool

type Cmp func(int, int) bool

var (
\tpt Point
\tpp *Point
\txs []int
\tpred Pred
\tcmp Cmp
\tanything any
)

func f() {
\t@@
}
";

fn literal_items(fx: &Fixture, expected: &str, literal: TypeId) -> Vec<CompletionItem> {
    let mut completer = fx.completer().with_inference(Inference {
        obj_type: Some(fx.ty(expected)),
        variadic: false,
    });
    completer.literal(literal, None);
    completer.finish()
}

#[test]
fn struct_literals_match_the_expected_type() {
    let fx = Fixture::new(LITERALS);
    let items = literal_items(&fx, "pt", fx.ty("pt"));
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].label, "Point{}");
    assert_eq!(items[0].snippet_text(), "Point{$0\\}");
    assert_eq!(items[0].score, LITERAL_CANDIDATE_SCORE);

    let items = literal_items(&fx, "pp", fx.ty("pt"));
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].label, "&Point{}");
    assert_eq!(items[0].snippet_text(), "&Point{$0\\}");
}

#[test]
fn slice_literals_also_offer_make() {
    let fx = Fixture::new(LITERALS);
    let items = literal_items(&fx, "xs", fx.ty("xs"));
    let labels: Vec<&str> = items.iter().map(|item| item.label.as_str()).collect();
    assert_eq!(labels, vec!["[]int{}", "make([]int, 0)"]);
    assert_eq!(items[1].snippet_text(), "make([]int, ${1:0})");
    assert_eq!(items[1].kind, CompletionItemKind::FUNCTION);
}

#[test]
fn function_literals_name_their_parameters() {
    let fx = Fixture::new(LITERALS);
    let items = literal_items(&fx, "pred", fx.ty("pred"));
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].label, "func(...) {}");
    assert_eq!(items[0].snippet_text(), "func(${1:i} int) bool {$0\\}");

    let items = literal_items(&fx, "cmp", fx.ty("cmp"));
    assert_eq!(items[0].snippet_text(), "func(${1:i1}, ${2:i2} int) bool {$0\\}");
}

#[test]
fn no_literals_for_empty_interfaces_or_when_disabled() {
    let fx = Fixture::new(LITERALS);
    assert!(literal_items(&fx, "anything", fx.ty("pt")).is_empty());
    assert!(literal_items(&fx, "pt", fx.ty("xs")).is_empty());

    let mut opts = CompletionOptions::default();
    opts.literal = false;
    let mut completer = fx.completer_with(opts).with_inference(Inference {
        obj_type: Some(fx.ty("pt")),
        variadic: false,
    });
    completer.literal(fx.ty("pt"), None);
    assert!(completer.finish().is_empty());
}

#[test]
fn type_names_abbreviate_to_their_word_starts() {
    assert_eq!(abbreviate_type_name("fooBar"), "fb");
    assert_eq!(abbreviate_type_name("[]int"), "i");
    assert_eq!(abbreviate_type_name("[4]Point"), "p");
    assert_eq!(abbreviate_type_name("*bytes.Buffer"), "b");
}

#[test]
fn lsp_conversion_respects_snippet_support() {
    let fx = Fixture::new(OVERLOADS);
    let mut completer = fx.completer();
    let item = completer
        .item(fx.cand("Add__1").with_mods(&[Modifier::Invoke]))
        .expect("item");
    let lsp = item.to_lsp(true);
    assert_eq!(lsp.insert_text_format, Some(InsertTextFormat::SNIPPET));
    assert_eq!(lsp.insert_text.as_deref(), Some("Add__1(${1:a string}, ${2:b string})"));
    let plain = item.to_lsp(false);
    assert_eq!(plain.insert_text_format, Some(InsertTextFormat::PLAIN_TEXT));
    assert_eq!(plain.insert_text.as_deref(), Some("Add__1"));
    assert_eq!(plain.detail.as_deref(), Some("func(a string, b string) string"));
}

#[test]
fn func_ids_name_the_declaring_package() {
    let fx = Fixture::new(OVERLOADS);
    assert_eq!(func_id(&fx.arena, fx.obj("Add__1")), "example.com/demo.Add__1");
}
