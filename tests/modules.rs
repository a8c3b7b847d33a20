use ace_lang::source::SrcBuffer;
use ace_lang::{compile, Compilation, DiagnosticKind};

fn diagnostics_for(source: &str) -> ace_lang::DiagnosticBag {
    let compilation = Compilation::new("test");
    compile(&compilation, vec![SrcBuffer::file("test.ace", source)]).diagnostics
}

#[test]
fn split_modules_merge_and_duplicate_globals_collide() {
    let source = "
a: pub mod { x: i32; }
a: pub mod { x: i32; }
";
    let diagnostics = diagnostics_for(source);

    // the modules merge; the second `x` lands in the same scope and
    // collides
    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::SymbolRedefinition)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn split_modules_share_their_members() {
    let source = "
a: pub mod { pub x: i32; }
a: pub mod { pub y: i32; }
f: () : void { a::x; a::y; }
";
    let diagnostics = diagnostics_for(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn mismatched_module_access_is_reported() {
    let source = "
a: pub mod { }
a: mod { }
";
    let diagnostics = diagnostics_for(source);

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::MismatchedAccessModifier)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn nested_module_paths_resolve() {
    let source = "
outer::inner: pub mod { pub flag: bool; }
f: () : void { outer::inner::flag; }
";
    let diagnostics = diagnostics_for(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn undefined_path_reports_once_per_reference() {
    let diagnostics = diagnostics_for("f: () : void { nowhere::nothing; }");

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::UndefinedSymbolRef)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn private_symbols_stay_inside_their_module() {
    let source = "
a: pub mod { hidden: i32; }
f: () : void { a::hidden; }
";
    let diagnostics = diagnostics_for(source);

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::InaccessibleSymbol)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn public_symbols_cross_module_boundaries() {
    let source = "
a: pub mod { pub visible: i32; }
f: () : void { a::visible; }
";
    let diagnostics = diagnostics_for(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn absolute_paths_resolve_from_the_root() {
    let source = "
f: () : void { x: ::std::i32::I32 = 1; }
";
    let diagnostics = diagnostics_for(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn value_position_rejects_type_symbols() {
    let source = "
Point: struct { x: i32 }
f: () : void { Point; }
";
    let diagnostics = diagnostics_for(source);

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::IncorrectSymbolCategory)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn instance_members_are_not_path_addressable() {
    let source = "
Point: struct { x: i32 }
f: () : void { Point::x; }
";
    let diagnostics = diagnostics_for(source);

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::NonSelfScopedSymbolScopeAccess)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn use_brings_a_trait_into_scope() {
    let source = "
shapes: pub mod {
    pub Area: trait { area: (self) : i32; }
}
use shapes::Area;
";
    let diagnostics = diagnostics_for(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn use_reimports_a_type_under_its_last_section() {
    let source = "
geometry: pub mod { pub Point: struct { pub x: i32 } }
use geometry::Point;
f: (p: Point) : i32 { ret p.x; }
";
    let diagnostics = diagnostics_for(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn redefined_struct_collides() {
    let source = "
Point: struct { x: i32 }
Point: struct { y: i32 }
";
    let diagnostics = diagnostics_for(source);

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::SymbolRedefinition)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn function_overloads_coexist_but_identical_signatures_collide() {
    let overloads = diagnostics_for(
        "f: (a: i32) : void { }\nf: (a: i32, b: i32) : void { }",
    );
    assert!(!overloads.has_errors(), "{overloads}");

    let duplicate =
        diagnostics_for("f: (a: i32) : void { }\nf: (a: i32) : void { }");
    assert_eq!(
        duplicate
            .of_kind(DiagnosticKind::SymbolRedefinition)
            .count(),
        1,
        "{duplicate}"
    );
}
