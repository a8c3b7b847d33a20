use ace_lang::source::SrcBuffer;
use ace_lang::{compile, Compilation, DiagnosticKind};

fn compile_with(source: &str) -> (Compilation, ace_lang::DiagnosticBag) {
    let compilation = Compilation::new("test");
    let diagnostics = compile(
        &compilation,
        vec![SrcBuffer::file("test.ace", source)],
    )
    .diagnostics;
    (compilation, diagnostics)
}

#[test]
fn repeated_instantiation_hits_the_cache() {
    let source = "
id: [T](x: T) : T { ret x; }
a: () : void { id[i32](1); id[i32](2); }
";
    let (compilation, diagnostics) = compile_with(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
    assert_eq!(
        compilation.templates.len(),
        1,
        "both calls must share one cached instance"
    );
}

#[test]
fn distinct_type_args_create_distinct_instances() {
    let source = "
id: [T](x: T) : T { ret x; }
a: () : void { id[i32](1); id[i64](2); }
";
    let (compilation, diagnostics) = compile_with(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
    assert_eq!(compilation.templates.len(), 2);
}

#[test]
fn type_args_are_deduced_from_call_arguments() {
    let source = "
id: [T](x: T) : T { ret x; }
a: (v: i32) : void { id(v); }
";
    let (compilation, diagnostics) = compile_with(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
    assert_eq!(compilation.templates.len(), 1);
}

#[test]
fn undeducible_type_arg_is_reported() {
    let source = "
make: [T]() : i32 { ret 0; }
a: () : void { make(); }
";
    let (_, diagnostics) = compile_with(source);

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::UnableToDeduceTemplateArg)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn conflicting_deduction_is_reported() {
    let source = "
pick: [T](a: T, b: T) : T { ret a; }
f: (x: i32, y: i64) : void { pick(x, y); }
";
    let (_, diagnostics) = compile_with(source);

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::TemplateArgDeductionConflict)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn too_many_type_args_are_reported() {
    let source = "
id: [T](x: T) : T { ret x; }
a: () : void { id[i32, i64](1); }
";
    let (_, diagnostics) = compile_with(source);

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::TooManyTemplateArgs)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn empty_template_lists_are_reported() {
    let (_, params) = compile_with("id: [](x: i32) : i32 { ret x; }");
    assert_eq!(
        params
            .of_kind(DiagnosticKind::EmptyTemplateParams)
            .count(),
        1,
        "{params}"
    );

    let (_, args) = compile_with(
        "id: [T](x: T) : T { ret x; }\na: () : void { id[](1); }",
    );
    assert_eq!(
        args.of_kind(DiagnosticKind::EmptyTemplateArgs).count(),
        1,
        "{args}"
    );
}

#[test]
fn where_clause_on_non_generic_function_is_reported() {
    let source = "
Printable: trait { print: (self) : void; }
f: (x: i32) : void where T: Printable { }
";
    let (_, diagnostics) = compile_with(source);

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::ConstrainedNonGenericSymbol)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn constrained_type_param_resolves_trait_methods() {
    let source = "
Printable: trait { print: (self) : void; }
show: [T](value: T) : void where T: Printable { value.print(); }
";
    let (_, diagnostics) = compile_with(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}
