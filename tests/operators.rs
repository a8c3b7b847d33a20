use ace_lang::sema::stmts::StmtSema;
use ace_lang::sema::ExprSema;
use ace_lang::source::SrcBuffer;
use ace_lang::{compile, Compilation, CompiledPackage, DiagnosticKind};

fn compile_source(source: &str) -> (CompiledPackage, ace_lang::DiagnosticBag) {
    let compilation = Compilation::new("test");
    let result = compile(
        &compilation,
        vec![SrcBuffer::file("test.ace", source)],
    );
    (result.value, result.diagnostics)
}

const VEC_SOURCE: &str = "
Vec: struct { x: f32, y: f32 }
impl Vec {
    pub op +(self, other: Vec) : Vec {
        ret new Vec{ x: self.x + other.x, y: self.y + other.y };
    }
}
g: () : void {
    v: Vec = new Vec{ x: 1.0f32, y: 2.0f32 } + new Vec{ x: 3.0f32, y: 4.0f32 };
}
";

fn collect_static_calls(stmt: &StmtSema, calls: &mut Vec<String>) {
    fn walk_expr(expr: &ExprSema, calls: &mut Vec<String>) {
        if let ExprSema::StaticCall(call) = expr {
            calls.push(call.function.name.name.clone());
        }
        for child in expr.collect_children() {
            walk_expr(&child, calls);
        }
    }

    match stmt {
        StmtSema::Expr(n) => walk_expr(&n.expr, calls),
        StmtSema::Var(n) => {
            if let Some(init) = &n.initializer {
                walk_expr(init, calls);
            }
        }
        StmtSema::Assign(n) => {
            walk_expr(&n.lhs, calls);
            walk_expr(&n.rhs, calls);
        }
        StmtSema::CondJump(n) => walk_expr(&n.condition, calls),
        StmtSema::Ret(n) => {
            if let Some(expr) = &n.expr {
                walk_expr(expr, calls);
            }
        }
        other => {
            for child in other.child_stmts() {
                collect_static_calls(&child, calls);
            }
        }
    }
}

#[test]
fn user_plus_lowers_to_a_static_call() {
    let (package, diagnostics) = compile_source(VEC_SOURCE);
    assert!(!diagnostics.has_errors(), "{diagnostics}");

    let g = package
        .functions
        .iter()
        .find(|f| f.symbol.name.name == "g")
        .expect("g was compiled");

    let mut calls = vec![];
    collect_static_calls(&g.body, &mut calls);
    assert!(
        calls.iter().any(|name| name == "__op_add"),
        "the user + must be a static operator call, got {calls:?}"
    );
    assert!(g.body.is_lowered(), "no UserBinary may remain");
}

#[test]
fn operator_bodies_are_lowered_too() {
    let (package, diagnostics) = compile_source(VEC_SOURCE);
    assert!(!diagnostics.has_errors(), "{diagnostics}");

    for function in &package.functions {
        assert!(
            function.body.is_lowered(),
            "'{}' still contains pre-lowering nodes",
            function.symbol.name.name
        );
    }
}

#[test]
fn missing_operator_is_reported() {
    let source = "
Vec: struct { x: f32 }
g: (a: Vec, b: Vec) : void { c: Vec = a + b; }
";
    let (_, diagnostics) = compile_source(source);

    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::UndefinedSymbolRef)
            .count(),
        1,
        "{diagnostics}"
    );
}

#[test]
fn native_arithmetic_binds_to_native_operators() {
    let (package, diagnostics) =
        compile_source("f: (a: i32, b: i32) : i32 { ret a + b * 2; }");
    assert!(!diagnostics.has_errors(), "{diagnostics}");

    let mut calls = vec![];
    collect_static_calls(&package.functions[0].body, &mut calls);
    assert_eq!(
        calls.iter().filter(|n| *n == "__op_add").count(),
        1,
        "{calls:?}"
    );
    assert_eq!(
        calls.iter().filter(|n| *n == "__op_mul").count(),
        1,
        "{calls:?}"
    );
}

#[test]
fn precedence_orders_the_call_tree() {
    // a + b * 2 parses with * below +, so the add's second operand is
    // the mul call
    let (package, diagnostics) =
        compile_source("f: (a: i32, b: i32) : i32 { ret a + b * 2; }");
    assert!(!diagnostics.has_errors(), "{diagnostics}");

    fn find_ret_call(stmt: &StmtSema) -> Option<ExprSema> {
        match stmt {
            StmtSema::Ret(n) => n.expr.clone(),
            other => other.child_stmts().iter().find_map(find_ret_call),
        }
    }

    let ret_expr = find_ret_call(&package.functions[0].body).expect("ret with value");
    fn innermost_call(expr: &ExprSema) -> Option<String> {
        match expr {
            ExprSema::StaticCall(call) => Some(call.function.name.name.clone()),
            ExprSema::Conversion(c) => innermost_call(&c.expr),
            _ => None,
        }
    }
    assert_eq!(innermost_call(&ret_expr).as_deref(), Some("__op_add"));
}

#[test]
fn compound_assignment_lowers_to_operator_and_assignment() {
    let (package, diagnostics) =
        compile_source("f: () : void { a: i32 = 1; a += 2; }");
    assert!(!diagnostics.has_errors(), "{diagnostics}");

    let mut calls = vec![];
    collect_static_calls(&package.functions[0].body, &mut calls);
    assert!(calls.iter().any(|n| n == "__op_add"), "{calls:?}");
    assert!(package.functions[0].body.is_lowered());
}

#[test]
fn unary_minus_binds_for_signed_types() {
    let (_, ok) = compile_source("f: (a: i32) : i32 { ret -a; }");
    assert!(!ok.has_errors(), "{ok}");

    let (_, unsigned) = compile_source("f: (a: u32) : u32 { ret -a; }");
    assert!(
        unsigned
            .of_kind(DiagnosticKind::UndefinedSymbolRef)
            .count()
            == 1,
        "{unsigned}"
    );
}

#[test]
fn comparisons_produce_bool() {
    let (_, diagnostics) =
        compile_source("f: (a: i32, b: i32) : bool { ret a < b; }");
    assert!(!diagnostics.has_errors(), "{diagnostics}");
}
