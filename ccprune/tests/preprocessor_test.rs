//! Conditional-branch removal and macro-definition liveness.
#![allow(clippy::unwrap_used)]

use ccprune::model::{DeclKind, ParsedUnit, RefKind};
use ccprune::test_utils::UnitBuilder;
use ccprune::{PruneOptions, PruneOutcome, Pruner};

fn prune_with(unit: ParsedUnit, options: &PruneOptions) -> PruneOutcome {
    Pruner::new(options).unwrap().prune(unit).unwrap()
}

fn prune(unit: ParsedUnit) -> PruneOutcome {
    prune_with(unit, &PruneOptions::default())
}

#[test]
fn never_taken_region_is_removed_entirely() {
    let source = "#if 0\nvoid deadFn() {}\n#endif\nvoid main() {}\n";
    let mut b = UnitBuilder::new(source);
    b.decl("main", DeclKind::Function, "void main() {}");
    b.pp_if("#if 0", false, &[]);
    b.pp_endif("#endif");
    let outcome = prune(b.build());

    assert_eq!(outcome.text, "void main() {}\n");
    assert_eq!(outcome.stats.branches_removed, 1);
}

#[test]
fn taken_branch_keeps_its_body_and_drops_the_directives() {
    let source = concat!(
        "#if 1\n",
        "int x() { return 1; }\n",
        "#else\n",
        "int y() { return 2; }\n",
        "#endif\n",
        "int main() { return x(); }\n",
    );
    let mut b = UnitBuilder::new(source);
    let x = b.decl("x", DeclKind::Function, "int x() { return 1; }");
    let main = b.decl("main", DeclKind::Function, "int main() { return x(); }");
    b.reference(main, x, RefKind::Call, "x();");
    b.pp_if("#if 1", true, &[]);
    b.pp_else("#else", false);
    b.pp_endif("#endif");
    let outcome = prune(b.build());

    assert_eq!(outcome.text, "int x() { return 1; }\nint main() { return x(); }\n");
    assert_eq!(outcome.stats.branches_removed, 1);
}

#[test]
fn elif_chains_keep_only_the_taken_branch() {
    let source = concat!(
        "#if MODE == 1\n",
        "int pick() { return 1; }\n",
        "#elif MODE == 2\n",
        "int pick() { return 2; }\n",
        "#else\n",
        "int pick() { return 3; }\n",
        "#endif\n",
        "int main() { return pick(); }\n",
    );
    let mut b = UnitBuilder::new(source);
    // Only the taken branch was parsed into declarations.
    let pick = b.decl("pick", DeclKind::Function, "int pick() { return 2; }");
    let main = b.decl("main", DeclKind::Function, "int main() { return pick(); }");
    b.reference(main, pick, RefKind::Call, "return pick()");
    b.pp_if("#if MODE == 1", false, &["MODE"]);
    b.pp_elif("#elif MODE == 2", true, &["MODE"]);
    b.pp_else("#else", false);
    b.pp_endif("#endif");
    let outcome = prune(b.build());

    assert_eq!(outcome.text, "int pick() { return 2; }\nint main() { return pick(); }\n");
    assert_eq!(outcome.stats.branches_removed, 2);
}

#[test]
fn kept_macro_preserves_every_branch_verbatim() {
    let source = concat!(
        "#ifdef ONLINE_JUDGE\n",
        "int submit() { return 1; }\n",
        "#else\n",
        "int submit() { return 2; }\n",
        "#endif\n",
        "int main() { return submit(); }\n",
    );
    let build = |keep_macros: Vec<String>| {
        let mut b = UnitBuilder::new(source);
        let submit = b.decl("submit", DeclKind::Function, "int submit() { return 2; }");
        let main = b.decl("main", DeclKind::Function, "int main() { return submit(); }");
        b.reference(main, submit, RefKind::Call, "return submit()");
        b.pp_if("#ifdef ONLINE_JUDGE", false, &["ONLINE_JUDGE"]);
        b.pp_else("#else", true);
        b.pp_endif("#endif");
        prune_with(
            b.build(),
            &PruneOptions {
                keep_macros,
                ..PruneOptions::default()
            },
        )
    };

    let kept = build(vec!["ONLINE_JUDGE".to_owned()]);
    assert_eq!(kept.text, source, "a configurable conditional must stay intact");
    assert_eq!(kept.stats.branches_removed, 0);

    let pruned = build(Vec::new());
    assert_eq!(
        pruned.text,
        "int submit() { return 2; }\nint main() { return submit(); }\n"
    );
}

#[test]
fn nested_inactive_chain_inside_taken_branch() {
    let source = concat!(
        "#if 1\n",
        "#ifdef X\n",
        "int a() { return 1; }\n",
        "#endif\n",
        "int keep1() { return 2; }\n",
        "#endif\n",
        "int main() { return keep1(); }\n",
    );
    let mut b = UnitBuilder::new(source);
    let keep1 = b.decl("keep1", DeclKind::Function, "int keep1() { return 2; }");
    let main = b.decl("main", DeclKind::Function, "int main() { return keep1(); }");
    b.reference(main, keep1, RefKind::Call, "keep1();");
    b.pp_if("#if 1", true, &[]);
    b.pp_if("#ifdef X", false, &["X"]);
    b.pp_endif("#endif");
    b.pp_endif("#endif");
    let outcome = prune(b.build());

    assert_eq!(outcome.text, "int keep1() { return 2; }\nint main() { return keep1(); }\n");
}

#[test]
fn macro_dies_when_its_last_use_site_is_pruned() {
    let source = concat!(
        "#define LIMIT 100\n",
        "int cap(int v) { return v > LIMIT ? LIMIT : v; }\n",
        "int main() { return 0; }\n",
    );
    let mut b = UnitBuilder::new(source);
    b.decl(
        "cap",
        DeclKind::Function,
        "int cap(int v) { return v > LIMIT ? LIMIT : v; }\n",
    );
    b.decl("main", DeclKind::Function, "int main() { return 0; }");
    b.pp_define("LIMIT", "#define LIMIT 100");
    b.pp_use("LIMIT", "v > LIMIT");
    b.pp_use("LIMIT", "? LIMIT : v");
    let outcome = prune(b.build());

    assert_eq!(outcome.text, "int main() { return 0; }\n");
    assert_eq!(outcome.stats.macros_removed, 1);
}

#[test]
fn live_macro_definitions_survive() {
    let source = "#define LIMIT 100\nint main() { return LIMIT; }\n";
    let mut b = UnitBuilder::new(source);
    b.decl("main", DeclKind::Function, "int main() { return LIMIT; }");
    b.pp_define("LIMIT", "#define LIMIT 100");
    b.pp_use("LIMIT", "return LIMIT");
    let outcome = prune(b.build());

    assert_eq!(outcome.text, source);
    assert_eq!(outcome.stats.macros_removed, 0);
}

#[test]
fn macro_only_used_by_a_dead_macro_is_pruned_transitively() {
    let source = concat!(
        "#define HELPER_IMPL 1\n",
        "#define HELPER HELPER_IMPL\n",
        "int helper() { return HELPER; }\n",
        "int main() { return 0; }\n",
    );
    let mut b = UnitBuilder::new(source);
    b.decl(
        "helper",
        DeclKind::Function,
        "int helper() { return HELPER; }\n",
    );
    b.decl("main", DeclKind::Function, "int main() { return 0; }");
    b.pp_define("HELPER_IMPL", "#define HELPER_IMPL 1");
    b.pp_define("HELPER", "#define HELPER HELPER_IMPL");
    b.pp_use("HELPER_IMPL", "#define HELPER HELPER_IMPL");
    b.pp_use("HELPER", "return HELPER;");
    let outcome = prune(b.build());

    assert_eq!(outcome.text, "int main() { return 0; }\n");
    assert_eq!(outcome.stats.macros_removed, 2);
}

#[test]
fn undef_counts_as_a_use() {
    let source = "#define TEMP 1\nint main() { return 0; }\n#undef TEMP\n";
    let mut b = UnitBuilder::new(source);
    b.decl("main", DeclKind::Function, "int main() { return 0; }");
    b.pp_define("TEMP", "#define TEMP 1");
    b.pp_undef("TEMP", "#undef TEMP");
    let outcome = prune(b.build());

    assert_eq!(outcome.text, source);
    assert_eq!(outcome.stats.macros_removed, 0);
}

#[test]
fn unused_macro_definition_is_pruned() {
    let source = "#define UNUSED_MACRO 1\nint main() { return 0; }\n";
    let mut b = UnitBuilder::new(source);
    b.decl("main", DeclKind::Function, "int main() { return 0; }");
    b.pp_define("UNUSED_MACRO", "#define UNUSED_MACRO 1");
    let outcome = prune(b.build());

    assert_eq!(outcome.text, "int main() { return 0; }\n");
    assert_eq!(outcome.stats.macros_removed, 1);
}

#[test]
fn kept_macro_definition_survives_even_when_unused() {
    let source = "#define DEBUG_FLAG 1\nint main() { return 0; }\n";
    let mut b = UnitBuilder::new(source);
    b.decl("main", DeclKind::Function, "int main() { return 0; }");
    b.pp_define("DEBUG_FLAG", "#define DEBUG_FLAG 1");
    let outcome = prune_with(
        b.build(),
        &PruneOptions {
            keep_macros: vec!["DEBUG_FLAG".to_owned()],
            ..PruneOptions::default()
        },
    );

    assert_eq!(outcome.text, source);
}
