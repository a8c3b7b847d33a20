use ace_lang::source::SrcBuffer;
use ace_lang::{compile, Compilation, DiagnosticKind};

fn diagnostics_for(source: &str) -> ace_lang::DiagnosticBag {
    let compilation = Compilation::new("test");
    compile(&compilation, vec![SrcBuffer::file("test.ace", source)]).diagnostics
}

#[test]
fn missing_semicolon_reports_and_continues() {
    let source = "
f: () : void {
    x: i32 = 1
    y: i32 = 2;
}
";
    let diagnostics = diagnostics_for(source);

    assert_eq!(
        diagnostics.of_kind(DiagnosticKind::MissingToken).count(),
        1,
        "{diagnostics}"
    );
    // recovery kept going: no cascade of unrelated errors
    assert_eq!(diagnostics.len(), 1, "{diagnostics}");
}

#[test]
fn one_bad_item_does_not_derail_its_neighbors() {
    let source = "
}} garbage ((
g: () : void { }
";
    let diagnostics = diagnostics_for(source);

    assert!(diagnostics.has_errors());
    // the well-formed neighbor still compiled cleanly; all errors point
    // at the garbage line
    assert!(diagnostics
        .errors()
        .all(|d| d.location.as_ref().map(|l| l.buffer.line_col(l.begin).0).unwrap_or(0) <= 1));
}

#[test]
fn strong_ptr_receiver_parses() {
    let source = "
Node: struct { value: i32 }
impl Node {
    get: (*self) : i32 { ret self.value; }
}
";
    let diagnostics = diagnostics_for(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn stray_star_without_self_reports_but_synthesizes_the_receiver() {
    let source = "
Node: struct { value: i32 }
impl Node {
    get: (*) : i32 { ret self.value; }
}
";
    let diagnostics = diagnostics_for(source);

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::MissingSelfModifierAfterStrongPtr)
            .count(),
        1,
        "{diagnostics}"
    );
    // `self` in the body still resolves against the synthesized receiver
    assert!(diagnostics
        .of_kind(DiagnosticKind::UndefinedSymbolRef)
        .next()
        .is_none());
}

#[test]
fn extern_function_takes_no_body() {
    let diagnostics = diagnostics_for("extern puts: (s: ::std::string::String) : i32;");
    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn extern_instance_function_is_reported() {
    let source = "
Node: struct { value: i32 }
impl Node {
    extern get: (self) : i32;
}
";
    let diagnostics = diagnostics_for(source);

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::ExternInstanceFunction)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn forbidden_modifier_is_reported() {
    let diagnostics = diagnostics_for("extern a: pub mod { }");

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::ForbiddenModifier)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn unconstrained_impl_type_param_is_reported() {
    let source = "
Wrapper[T]: struct { value: T }
impl[T, U] Wrapper[T] {
    get: (self) : T { ret self.value; }
}
";
    let diagnostics = diagnostics_for(source);

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::UnconstrainedTypeParam)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn trait_impl_is_detected_by_the_for_keyword() {
    let source = "
Area: trait { area: (self) : i32; }
Square: struct { side: i32 }
impl Area for Square {
    area: (self) : i32 { ret self.side * self.side; }
}
f: (s: Square) : i32 { ret s.area(); }
";
    let diagnostics = diagnostics_for(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn struct_construction_checks_its_fields() {
    let source = "
Point: struct { x: i32, y: i32 }
f: () : void {
    a: Point = new Point{ x: 1, y: 2 };
    b: Point = new Point{ x: 1, x: 2, y: 3 };
    c: Point = new Point{ x: 1 };
    d: Point = new Point{ x: 1, y: 2, z: 3 };
}
";
    let diagnostics = diagnostics_for(source);

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::DuplicateStructField)
            .count(),
        1,
        "{diagnostics}"
    );
    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::MissingStructFields)
            .count(),
        1,
        "{diagnostics}"
    );
    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::UnknownStructField)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn field_init_shorthand_reads_the_same_named_variable() {
    let source = "
Point: struct { x: i32, y: i32 }
f: () : void {
    x: i32 = 1;
    y: i32 = 2;
    p: Point = new Point{ x, y };
}
";
    let diagnostics = diagnostics_for(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn pointer_sigils_compose_in_type_names() {
    let source = "
Node: struct { value: i32 }
f: (strong: *Node, weak: ~Node, borrowed: &Node) : void {
    locked: *Node = lock weak;
    copied: *Node = strong;
}
";
    let diagnostics = diagnostics_for(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn strong_pointer_erases_to_weak_implicitly() {
    let source = "
Node: struct { value: i32 }
f: (strong: *Node) : void { weak: ~Node = strong; }
";
    let diagnostics = diagnostics_for(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn box_and_unbox_round_the_pointer_types() {
    let source = "
f: () : void {
    boxed: *::std::i32::I32 = box 1i32;
    value: i32 = unbox boxed;
}
";
    let diagnostics = diagnostics_for(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}

#[test]
fn keyword_expressions_type_as_documented() {
    let source = "
Node: struct { value: i32 }
f: (n: Node) : void {
    size: int = size_of[Node];
    address: ::std::ptr::Ptr = addr_of(n);
    info: ::std::ptr::Ptr = type_info_ptr[Node];
}
";
    let diagnostics = diagnostics_for(source);

    assert!(!diagnostics.has_errors(), "{diagnostics}");
}
