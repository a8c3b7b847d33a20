use ace_lang::source::SrcBuffer;
use ace_lang::{compile, Compilation, DiagnosticKind};

fn diagnostics_for(source: &str) -> ace_lang::DiagnosticBag {
    let compilation = Compilation::new("test");
    compile(&compilation, vec![SrcBuffer::file("test.ace", source)]).diagnostics
}

#[test]
fn if_without_else_misses_a_path() {
    let diagnostics = diagnostics_for("f: () : i32 { if true { ret 1; } }");

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::NotAllControlPathsReturn)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn if_with_else_covers_every_path() {
    let diagnostics =
        diagnostics_for("f: () : i32 { if true { ret 1; } else { ret 2; } }");

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn elif_chain_with_else_covers_every_path() {
    let diagnostics = diagnostics_for(
        "h: (c1: bool, c2: bool) : i32 { if c1 { ret 1; } elif c2 { ret 2; } else { ret 3; } }",
    );

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn elif_chain_without_else_misses_a_path() {
    let diagnostics = diagnostics_for(
        "h: (c1: bool, c2: bool) : i32 { if c1 { ret 1; } elif c2 { ret 2; } }",
    );

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::NotAllControlPathsReturn)
            .count(),
        1
    );
}

#[test]
fn straight_line_return_passes() {
    let diagnostics = diagnostics_for("f: () : i32 { ret 42; }");
    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn missing_return_in_straight_line_fails() {
    let diagnostics = diagnostics_for("f: () : i32 { x: i32 = 1; }");

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::NotAllControlPathsReturn)
            .count(),
        1
    );
}

#[test]
fn void_functions_need_no_return() {
    let diagnostics = diagnostics_for("f: () : void { x: i32 = 1; }");
    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn exit_terminates_a_path() {
    let diagnostics =
        diagnostics_for("f: () : i32 { if true { ret 1; } else { exit; } }");

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn loop_with_reachable_tail_fails() {
    let diagnostics =
        diagnostics_for("f: (c: bool) : i32 { while c { } }");

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::NotAllControlPathsReturn)
            .count(),
        1
    );
}

#[test]
fn diagnostic_anchors_at_the_function_name() {
    let source = "f: () : i32 { if true { ret 1; } }";
    let diagnostics = diagnostics_for(source);

    let diagnostic = diagnostics
        .of_kind(DiagnosticKind::NotAllControlPathsReturn)
        .next()
        .unwrap();
    let location = diagnostic.location.as_ref().unwrap();
    assert_eq!(location.text(), "f");
}
