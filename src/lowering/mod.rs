//! # Lowering
//!
//! A fixed-point rewriter that desugars high-level statements into the
//! primitive core. The per-node shapes live with the nodes in
//! `sema::stmts`; this module owns the driver loop and the one rewrite
//! that crosses the statement/expression boundary: short-circuit
//! elimination.
//!
//! ## Short-circuit hoisting
//!
//! `a && b` cannot stay an expression — the primitive core has no
//! conditional evaluation below the statement level. Whichever statement
//! owns the expression hoists it:
//!
//! ```text
//! x = a && b;      =>      __anon_t: bool = a;
//!                          gotoif !__anon_t end;
//!                          __anon_t = b;
//!                          end:
//!                          x = __anon_t;
//! ```
//!
//! `||` is the dual, jumping past the right operand when the left one is
//! already true. Nested and mixed chains fall out of the recursion, and
//! evaluation order and short-circuiting are preserved exactly.

use std::cell::RefCell;
use std::rc::Rc;

use log::trace;

use crate::compilation::Compilation;
use crate::scope::symbol::{AccessModifier, Symbol, SymbolKind, VarSymbol};
use crate::scope::Scope;
use crate::sema::exprs::{
    AddressOfExprSema, BoxExprSema, CastExprSema, ConversionExprSema, DerefAsExprSema, ExprSema,
    FieldAccessExprSema, InstanceCallExprSema, LockExprSema, LogicalNegationExprSema,
    StaticCallExprSema, StructConstructionExprSema, SymbolRefExprSema, UnboxExprSema,
    VtblPtrExprSema,
};
use crate::sema::stmts::{
    create_label, AssignStmtSema, CondJumpStmtSema, LabelStmtSema, StmtSema, VarStmtSema,
};
use crate::sema::{FunctionSema, LowerContext, MaybeChanged};

const MAX_PASSES: usize = 64;

/// Drive a function body to its lowered fixed point.
pub fn lower_function(compilation: &Compilation, function: FunctionSema) -> FunctionSema {
    let function_scope = match &function.body {
        StmtSema::Block(block) => Rc::clone(&block.scope),
        _ => compilation.root_scope.clone(),
    };

    let ctx = LowerContext {
        compilation,
        function_scope,
    };

    let mut body = function.body;
    for pass in 0..MAX_PASSES {
        let result = body.create_lowered(&ctx);
        body = result.value;
        if !result.changed {
            trace!(
                "'{}' reached the lowering fixed point after {} pass(es)",
                function.symbol.name.name,
                pass + 1
            );
            break;
        }
    }

    debug_assert!(body.is_lowered());

    FunctionSema {
        symbol: function.symbol,
        location: function.location,
        body,
    }
}

/// Lower an expression and hoist any `&&`/`||` it contains into `prefix`
/// statements, returning the residual (primitive) expression.
pub fn hoist_expr(
    expr: &ExprSema,
    ctx: &LowerContext,
    prefix: &mut Vec<StmtSema>,
) -> MaybeChanged<ExprSema> {
    let lowered = expr.create_lowered(ctx);

    if !contains_short_circuit(&lowered.value) {
        return lowered;
    }

    let hoisted = hoist(&lowered.value, ctx, prefix);
    MaybeChanged::changed(hoisted)
}

fn contains_short_circuit(expr: &ExprSema) -> bool {
    matches!(expr, ExprSema::And(_) | ExprSema::Or(_))
        || expr.collect_children().iter().any(contains_short_circuit)
}

fn hoist(expr: &ExprSema, ctx: &LowerContext, prefix: &mut Vec<StmtSema>) -> ExprSema {
    match expr {
        ExprSema::And(n) => hoist_logical(&n.location, &n.lhs, &n.rhs, true, ctx, prefix),
        ExprSema::Or(n) => hoist_logical(&n.location, &n.lhs, &n.rhs, false, ctx, prefix),

        ExprSema::Literal(_)
        | ExprSema::SymbolRef(_)
        | ExprSema::SizeOf(_)
        | ExprSema::TypeInfoPtr(_) => expr.clone(),

        ExprSema::FieldAccess(n) => ExprSema::FieldAccess(Rc::new(FieldAccessExprSema {
            location: n.location.clone(),
            expr: hoist(&n.expr, ctx, prefix),
            field: Rc::clone(&n.field),
        })),
        ExprSema::StaticCall(n) => ExprSema::StaticCall(Rc::new(StaticCallExprSema {
            location: n.location.clone(),
            function: Rc::clone(&n.function),
            args: n.args.iter().map(|a| hoist(a, ctx, prefix)).collect(),
        })),
        ExprSema::InstanceCall(n) => ExprSema::InstanceCall(Rc::new(InstanceCallExprSema {
            location: n.location.clone(),
            receiver: hoist(&n.receiver, ctx, prefix),
            function: Rc::clone(&n.function),
            args: n.args.iter().map(|a| hoist(a, ctx, prefix)).collect(),
        })),
        ExprSema::StructConstruction(n) => {
            ExprSema::StructConstruction(Rc::new(StructConstructionExprSema {
                location: n.location.clone(),
                struct_symbol: Rc::clone(&n.struct_symbol),
                args: n.args.iter().map(|a| hoist(a, ctx, prefix)).collect(),
            }))
        }
        ExprSema::Cast(n) => ExprSema::Cast(Rc::new(CastExprSema {
            location: n.location.clone(),
            expr: hoist(&n.expr, ctx, prefix),
            target: Rc::clone(&n.target),
        })),
        ExprSema::Conversion(n) => ExprSema::Conversion(Rc::new(ConversionExprSema {
            location: n.location.clone(),
            expr: hoist(&n.expr, ctx, prefix),
            kind: n.kind,
            target: Rc::clone(&n.target),
        })),
        ExprSema::AddressOf(n) => ExprSema::AddressOf(Rc::new(AddressOfExprSema {
            location: n.location.clone(),
            expr: hoist(&n.expr, ctx, prefix),
            ty: Rc::clone(&n.ty),
        })),
        ExprSema::DerefAs(n) => ExprSema::DerefAs(Rc::new(DerefAsExprSema {
            location: n.location.clone(),
            expr: hoist(&n.expr, ctx, prefix),
            target: Rc::clone(&n.target),
        })),
        ExprSema::VtblPtr(n) => ExprSema::VtblPtr(Rc::new(VtblPtrExprSema {
            location: n.location.clone(),
            expr: hoist(&n.expr, ctx, prefix),
            trait_symbol: Rc::clone(&n.trait_symbol),
            ty: Rc::clone(&n.ty),
        })),
        ExprSema::Box_(n) => ExprSema::Box_(Rc::new(BoxExprSema {
            location: n.location.clone(),
            expr: hoist(&n.expr, ctx, prefix),
            ty: Rc::clone(&n.ty),
        })),
        ExprSema::Unbox(n) => ExprSema::Unbox(Rc::new(UnboxExprSema {
            location: n.location.clone(),
            expr: hoist(&n.expr, ctx, prefix),
            ty: Rc::clone(&n.ty),
        })),
        ExprSema::Lock(n) => ExprSema::Lock(Rc::new(LockExprSema {
            location: n.location.clone(),
            expr: hoist(&n.expr, ctx, prefix),
            ty: Rc::clone(&n.ty),
        })),
        ExprSema::LogicalNegation(n) => {
            ExprSema::LogicalNegation(Rc::new(LogicalNegationExprSema {
                location: n.location.clone(),
                expr: hoist(&n.expr, ctx, prefix),
                ty: Rc::clone(&n.ty),
            }))
        }

        // user operators were already rewritten by create_lowered
        ExprSema::UserUnary(_) | ExprSema::UserBinary(_) => expr.clone(),
    }
}

/// The hoist for one `&&` (`is_and`) or `||` node.
fn hoist_logical(
    location: &crate::source::SrcLocation,
    lhs: &ExprSema,
    rhs: &ExprSema,
    is_and: bool,
    ctx: &LowerContext,
    prefix: &mut Vec<StmtSema>,
) -> ExprSema {
    let bool_ty = Rc::clone(&ctx.compilation.natives.bool_);

    // evaluate the left operand into the result temporary
    let lhs = hoist(lhs, ctx, prefix);
    let temp = create_temp_local(&ctx.function_scope, location, &bool_ty);
    prefix.push(StmtSema::Var(Rc::new(VarStmtSema {
        location: location.clone(),
        symbol: Rc::clone(&temp),
        initializer: Some(lhs),
    })));

    let temp_ref = || {
        ExprSema::SymbolRef(Rc::new(SymbolRefExprSema {
            location: location.clone(),
            symbol: Rc::clone(&temp),
        }))
    };

    // `&&` skips the right operand when the left is false; `||` when it
    // is true
    let end_label = create_label(&ctx.function_scope, location);
    let skip_condition = if is_and {
        ExprSema::LogicalNegation(Rc::new(LogicalNegationExprSema {
            location: location.clone(),
            expr: temp_ref(),
            ty: Rc::clone(&bool_ty),
        }))
    } else {
        temp_ref()
    };
    prefix.push(StmtSema::CondJump(Rc::new(CondJumpStmtSema {
        location: location.clone(),
        condition: skip_condition,
        target: Rc::clone(&end_label),
    })));

    // right operand, only reached when it matters
    let rhs = hoist(rhs, ctx, prefix);
    prefix.push(StmtSema::Assign(Rc::new(AssignStmtSema {
        location: location.clone(),
        lhs: temp_ref(),
        rhs,
    })));

    prefix.push(StmtSema::Label(Rc::new(LabelStmtSema {
        location: location.clone(),
        symbol: end_label,
    })));

    temp_ref()
}

fn create_temp_local(
    scope: &Rc<Scope>,
    location: &crate::source::SrcLocation,
    ty: &Rc<Symbol>,
) -> Rc<Symbol> {
    let name = scope.create_anonymous_name(location.clone());
    let symbol = Symbol::new(
        name,
        AccessModifier::Priv,
        SymbolKind::LocalVar(VarSymbol {
            ty: RefCell::new(Rc::clone(ty)),
        }),
    );
    scope.define(symbol).value
}
