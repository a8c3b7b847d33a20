use ace_lang::sema::stmts::StmtSema;
use ace_lang::sema::ExprSema;
use ace_lang::source::SrcBuffer;
use ace_lang::{compile, Compilation, CompiledPackage};

fn compile_source(source: &str) -> (CompiledPackage, ace_lang::DiagnosticBag) {
    let compilation = Compilation::new("test");
    let result = compile(
        &compilation,
        vec![SrcBuffer::file("test.ace", source)],
    );
    (result.value, result.diagnostics)
}

#[derive(Default, Debug)]
struct Shape {
    labels: usize,
    jumps: usize,
    cond_jumps: usize,
    rets: usize,
    exits: usize,
}

fn shape_of(stmt: &StmtSema, shape: &mut Shape) {
    match stmt {
        StmtSema::Label(_) => shape.labels += 1,
        StmtSema::Jump(_) => shape.jumps += 1,
        StmtSema::CondJump(_) => shape.cond_jumps += 1,
        StmtSema::Ret(_) => shape.rets += 1,
        StmtSema::Exit(_) => shape.exits += 1,
        other => {
            for child in other.child_stmts() {
                shape_of(&child, shape);
            }
        }
    }
}

fn body_of(package: &CompiledPackage, name: &str) -> StmtSema {
    package
        .functions
        .iter()
        .find(|f| f.symbol.name.name == name)
        .unwrap_or_else(|| panic!("function '{name}' was compiled"))
        .body
        .clone()
}

#[test]
fn if_elif_else_lowers_to_the_documented_shape() {
    let (package, diagnostics) = compile_source(
        "h: (c1: bool, c2: bool) : i32 { if c1 { ret 1; } elif c2 { ret 2; } else { ret 3; } }",
    );
    assert!(!diagnostics.has_errors(), "{diagnostics}");

    let mut shape = Shape::default();
    shape_of(&body_of(&package, "h"), &mut shape);

    // one label per arm plus the end label; one conditional jump per
    // condition; one jump to the end after each non-final body
    assert_eq!(shape.labels, 3, "{shape:?}");
    assert_eq!(shape.cond_jumps, 2, "{shape:?}");
    assert_eq!(shape.jumps, 2, "{shape:?}");
    assert_eq!(shape.rets, 3, "{shape:?}");
}

#[test]
fn while_lowers_to_jump_label_body_label_condjump() {
    let (package, diagnostics) =
        compile_source("f: (c: bool) : void { while c { } }");
    assert!(!diagnostics.has_errors(), "{diagnostics}");

    let mut shape = Shape::default();
    shape_of(&body_of(&package, "f"), &mut shape);

    assert_eq!(shape.labels, 2, "{shape:?}");
    assert_eq!(shape.jumps, 1, "{shape:?}");
    assert_eq!(shape.cond_jumps, 1, "{shape:?}");
}

#[test]
fn assert_lowers_to_a_guarded_exit() {
    let (package, diagnostics) =
        compile_source("f: (c: bool) : void { assert c; }");
    assert!(!diagnostics.has_errors(), "{diagnostics}");

    let mut shape = Shape::default();
    shape_of(&body_of(&package, "f"), &mut shape);

    assert_eq!(shape.exits, 1, "{shape:?}");
    assert_eq!(shape.cond_jumps, 1, "{shape:?}");
}

#[test]
fn no_pre_lowering_variant_survives() {
    let source = "
f: (a: bool, b: bool, n: i32) : i32 {
    x: i32 = 0;
    while a {
        if b { x += 1; } else { x += 2; }
        assert a || b;
    }
    c: bool = a && b;
    ret x;
}
";
    let (package, diagnostics) = compile_source(source);
    assert!(!diagnostics.has_errors(), "{diagnostics}");

    assert!(body_of(&package, "f").is_lowered());
}

#[test]
fn relowering_is_a_no_op() {
    // the driver already runs to the fixed point; one more pass over the
    // result must report no change anywhere
    let source = "
f: (a: bool, b: bool) : i32 {
    if a && b { ret 1; }
    ret 0;
}
";
    let compilation = Compilation::new("test");
    let result = compile(
        &compilation,
        vec![SrcBuffer::file("test.ace", source)],
    );
    assert!(!result.diagnostics.has_errors(), "{}", result.diagnostics);

    let function = &result.value.functions[0];
    let ctx = ace_lang::sema::LowerContext {
        compilation: &compilation,
        function_scope: compilation.root_scope.clone(),
    };
    let again = function.body.create_lowered(&ctx);
    assert!(!again.changed, "lowering must be idempotent");
}

#[test]
fn short_circuit_and_becomes_jumps_with_a_temporary() {
    let (package, diagnostics) =
        compile_source("f: (a: bool, b: bool) : void { c: bool = a && b; }");
    assert!(!diagnostics.has_errors(), "{diagnostics}");

    let body = body_of(&package, "f");
    assert!(body.is_lowered());

    let mut shape = Shape::default();
    shape_of(&body, &mut shape);
    // the hoist introduces one skip label and one conditional jump
    assert_eq!(shape.labels, 1, "{shape:?}");
    assert_eq!(shape.cond_jumps, 1, "{shape:?}");
}

#[test]
fn short_circuit_or_skips_when_lhs_is_true() {
    let (package, diagnostics) =
        compile_source("f: (a: bool, b: bool) : void { c: bool = a || b; }");
    assert!(!diagnostics.has_errors(), "{diagnostics}");

    let body = body_of(&package, "f");
    assert!(body.is_lowered());

    // the skip condition of `||` is the temporary itself, not a negation
    fn find_cond_jump(stmt: &StmtSema) -> Option<ExprSema> {
        match stmt {
            StmtSema::CondJump(n) => Some(n.condition.clone()),
            other => other.child_stmts().iter().find_map(find_cond_jump),
        }
    }
    let condition = find_cond_jump(&body).expect("a conditional jump");
    assert!(
        matches!(condition, ExprSema::SymbolRef(_) | ExprSema::Conversion(_)),
        "`||` jumps on the unnegated temporary"
    );
}

#[test]
fn nested_short_circuits_all_lower() {
    let (package, diagnostics) = compile_source(
        "f: (a: bool, b: bool, c: bool) : void { d: bool = a && (b || !c) && !a; }",
    );
    assert!(!diagnostics.has_errors(), "{diagnostics}");
    assert!(body_of(&package, "f").is_lowered());
}

#[test]
fn blocks_end_with_a_teardown_marker() {
    let (package, diagnostics) = compile_source("f: () : void { x: i32 = 1; }");
    assert!(!diagnostics.has_errors(), "{diagnostics}");

    let StmtSema::Block(block) = body_of(&package, "f") else {
        panic!("function bodies stay blocks");
    };
    assert!(
        matches!(block.stmts.last(), Some(StmtSema::BlockEnd(_))),
        "lowered blocks carry their scope-teardown marker"
    );
}
