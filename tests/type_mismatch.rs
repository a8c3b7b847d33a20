use std::rc::Rc;

use ace_lang::source::SrcBuffer;
use ace_lang::{compile, Compilation, DiagnosticKind};

fn compile_source(source: &str) -> (ace_lang::CompiledPackage, ace_lang::DiagnosticBag) {
    let compilation = Compilation::new("test");
    let result = compile(
        &compilation,
        vec![SrcBuffer::file("test.ace", source)],
    );
    (result.value, result.diagnostics)
}

#[test]
fn bool_var_with_int_initializer_reports_one_conversion_error() {
    let (_, diagnostics) = compile_source("f: () : void { x: bool = 1; }");

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::InvalidImplicitConversion)
            .count(),
        1
    );
    assert_eq!(diagnostics.len(), 1, "{diagnostics}");
}

#[test]
fn matching_initializer_is_clean() {
    let (_, diagnostics) = compile_source("f: () : void { x: bool = true; y: i32 = 1; }");

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn literal_narrows_to_annotated_numeric_type() {
    let (_, diagnostics) = compile_source("f: () : void { x: i8 = 100; y: u16 = 60000; }");

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn widening_is_implicit_narrowing_is_not() {
    let (_, diagnostics) =
        compile_source("f: (a: i8) : void { wide: i64 = a; }");
    assert!(!diagnostics.has_errors(), "{diagnostics}");

    let (_, diagnostics) =
        compile_source("g: (a: i64) : void { narrow: i8 = a; }");
    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::InvalidImplicitConversion)
            .count(),
        1
    );
}

#[test]
fn explicit_cast_allows_narrowing() {
    let (_, diagnostics) =
        compile_source("f: (a: i64) : void { narrow: i8 = cast[i8](a); }");

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn explicit_cast_between_unrelated_types_is_rejected() {
    let source = "
Point: struct { x: i32 }
f: (p: Point) : void { b: bool = cast[bool](p); }
";
    let (_, diagnostics) = compile_source(source);

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::InvalidExplicitConversion)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn return_type_is_checked() {
    let (_, diagnostics) = compile_source("f: () : i32 { ret true; }");

    assert!(diagnostics
        .of_kind(DiagnosticKind::InvalidImplicitConversion)
        .count()
        == 1);
}

#[test]
fn assignment_requires_lvalue() {
    let (_, diagnostics) = compile_source("f: () : void { 1 = 2; }");

    assert_eq!(
        diagnostics.of_kind(DiagnosticKind::ExpectedLValue).count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn rechecking_is_idempotent() {
    // the driver runs to the fixed point internally; a clean program with
    // conversions (narrowed literals, widenings) must come out clean, and
    // a second full compile of the same source must agree
    let source = "f: (a: i8) : i64 { x: i64 = a; ret x; }";

    let (first, d1) = compile_source(source);
    let (_second, d2) = compile_source(source);

    assert!(!d1.has_errors(), "{d1}");
    assert_eq!(d1.len(), d2.len());
    assert!(first.functions[0].body.is_lowered());
}

#[test]
fn u8_boundaries() {
    let (_, ok) = compile_source("f: () : void { a: u8 = 0; b: u8 = 255; }");
    assert!(!ok.has_errors(), "{ok}");

    let (_, overflow) = compile_source("f: () : void { c: u8 = 256; }");
    assert_eq!(
        overflow
            .of_kind(DiagnosticKind::InvalidImplicitConversion)
            .count(),
        1,
        "{overflow}"
    );
}

#[test]
fn compiled_functions_are_exposed() {
    let (package, _) = compile_source("f: () : void { } g: () : void { }");

    let names = package
        .functions
        .iter()
        .map(|f| f.symbol.name.name.clone())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["f", "g"]);

    for function in &package.functions {
        assert!(Rc::strong_count(&function.symbol) >= 1);
    }
}
