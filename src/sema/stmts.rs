//! Statement sema nodes.
//!
//! The lowering targets here are exactly the primitive core: block,
//! block-end, group, expression statement, label, jump, conditional jump,
//! return, exit, variable, assignment, copy and drop. `if`, `while`,
//! `assert` and compound assignment rewrite themselves away; the
//! label-and-jump shapes they produce follow the original lowerings
//! (see the comments on each).

use std::rc::Rc;

use crate::diagnostics::{Diagnosed, Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::emit::Emitter;
use crate::lowering::hoist_expr;
use crate::scope::symbol::{AccessModifier, Symbol, SymbolKind};
use crate::scope::Scope;
use crate::source::SrcLocation;
use crate::typeck;

use super::exprs::{ExprSema, LogicalNegationExprSema, StaticCallExprSema};
use super::{LowerContext, MaybeChanged, TypeCheckContext, TypeInfo, ValueKind};

#[derive(Clone)]
pub enum StmtSema {
    Block(Rc<BlockStmtSema>),
    BlockEnd(Rc<BlockEndStmtSema>),
    Group(Rc<GroupStmtSema>),
    Expr(Rc<ExprStmtSema>),
    Label(Rc<LabelStmtSema>),
    Jump(Rc<NormalJumpStmtSema>),
    CondJump(Rc<CondJumpStmtSema>),
    Ret(Rc<RetStmtSema>),
    Exit(Rc<ExitStmtSema>),
    Var(Rc<VarStmtSema>),
    If(Rc<IfStmtSema>),
    While(Rc<WhileStmtSema>),
    Assert(Rc<AssertStmtSema>),
    Assign(Rc<AssignStmtSema>),
    CompoundAssign(Rc<CompoundAssignStmtSema>),
    Copy(Rc<CopyStmtSema>),
    Drop(Rc<DropStmtSema>),
}

pub struct BlockStmtSema {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub stmts: Vec<StmtSema>,
}

/// Scope teardown marker appended when a block reaches its lowered form;
/// the emitter runs drops for the block's locals here.
pub struct BlockEndStmtSema {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
}

/// A statement sequence without a scope of its own — the shape lowerings
/// expand into.
pub struct GroupStmtSema {
    pub location: SrcLocation,
    pub stmts: Vec<StmtSema>,
}

pub struct ExprStmtSema {
    pub location: SrcLocation,
    pub expr: ExprSema,
}

pub struct LabelStmtSema {
    pub location: SrcLocation,
    pub symbol: Rc<Symbol>,
}

pub struct NormalJumpStmtSema {
    pub location: SrcLocation,
    pub target: Rc<Symbol>,
}

/// Jumps when the condition is true.
pub struct CondJumpStmtSema {
    pub location: SrcLocation,
    pub condition: ExprSema,
    pub target: Rc<Symbol>,
}

pub struct RetStmtSema {
    pub location: SrcLocation,
    pub expr: Option<ExprSema>,
}

pub struct ExitStmtSema {
    pub location: SrcLocation,
}

pub struct VarStmtSema {
    pub location: SrcLocation,
    pub symbol: Rc<Symbol>,
    pub initializer: Option<ExprSema>,
}

pub struct IfStmtSema {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub conditions: Vec<ExprSema>,
    pub bodies: Vec<StmtSema>,
}

pub struct WhileStmtSema {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub condition: ExprSema,
    pub body: StmtSema,
}

pub struct AssertStmtSema {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub condition: ExprSema,
}

pub struct AssignStmtSema {
    pub location: SrcLocation,
    pub lhs: ExprSema,
    pub rhs: ExprSema,
}

/// `a OP= b`; `args` holds the operator-call operands (the checked copies
/// of `a` and `b`), `lhs` stays the raw assignment target.
pub struct CompoundAssignStmtSema {
    pub location: SrcLocation,
    pub lhs: ExprSema,
    pub args: Vec<ExprSema>,
    pub op_function: Rc<Symbol>,
}

pub struct CopyStmtSema {
    pub location: SrcLocation,
    pub expr: ExprSema,
}

pub struct DropStmtSema {
    pub location: SrcLocation,
    pub expr: ExprSema,
}

pub(crate) fn create_label(scope: &Rc<Scope>, location: &SrcLocation) -> Rc<Symbol> {
    let name = scope.create_anonymous_name(location.clone());
    let symbol = Symbol::new(name, AccessModifier::Priv, SymbolKind::Label);
    scope.define(symbol).value
}

impl StmtSema {
    pub fn location(&self) -> SrcLocation {
        match self {
            StmtSema::Block(n) => n.location.clone(),
            StmtSema::BlockEnd(n) => n.location.clone(),
            StmtSema::Group(n) => n.location.clone(),
            StmtSema::Expr(n) => n.location.clone(),
            StmtSema::Label(n) => n.location.clone(),
            StmtSema::Jump(n) => n.location.clone(),
            StmtSema::CondJump(n) => n.location.clone(),
            StmtSema::Ret(n) => n.location.clone(),
            StmtSema::Exit(n) => n.location.clone(),
            StmtSema::Var(n) => n.location.clone(),
            StmtSema::If(n) => n.location.clone(),
            StmtSema::While(n) => n.location.clone(),
            StmtSema::Assert(n) => n.location.clone(),
            StmtSema::Assign(n) => n.location.clone(),
            StmtSema::CompoundAssign(n) => n.location.clone(),
            StmtSema::Copy(n) => n.location.clone(),
            StmtSema::Drop(n) => n.location.clone(),
        }
    }

    pub fn emit(&self, emitter: &mut dyn Emitter) {
        emitter.emit_stmt(self);
    }

    /// Direct child statements, in execution order.
    pub fn child_stmts(&self) -> Vec<StmtSema> {
        match self {
            StmtSema::Block(n) => n.stmts.clone(),
            StmtSema::Group(n) => n.stmts.clone(),
            StmtSema::If(n) => n.bodies.clone(),
            StmtSema::While(n) => vec![n.body.clone()],
            _ => vec![],
        }
    }

    /// Whether the subtree contains only primitive-core variants with
    /// fully lowered expressions.
    pub fn is_lowered(&self) -> bool {
        let own = match self {
            StmtSema::If(_)
            | StmtSema::While(_)
            | StmtSema::Assert(_)
            | StmtSema::CompoundAssign(_) => false,
            StmtSema::Expr(n) => n.expr.is_lowered(),
            StmtSema::CondJump(n) => n.condition.is_lowered(),
            StmtSema::Ret(n) => n.expr.as_ref().map(|e| e.is_lowered()).unwrap_or(true),
            StmtSema::Var(n) => n
                .initializer
                .as_ref()
                .map(|e| e.is_lowered())
                .unwrap_or(true),
            StmtSema::Assign(n) => n.lhs.is_lowered() && n.rhs.is_lowered(),
            StmtSema::Copy(n) => n.expr.is_lowered(),
            StmtSema::Drop(n) => n.expr.is_lowered(),
            _ => true,
        };
        own && self.child_stmts().iter().all(|s| s.is_lowered())
    }

    // ---- type checking ----

    pub fn create_type_checked(
        &self,
        ctx: &TypeCheckContext,
    ) -> Diagnosed<MaybeChanged<StmtSema>> {
        let mut diagnostics = DiagnosticBag::new();
        let natives = &ctx.compilation.natives;
        let bool_target = || TypeInfo::rvalue(Rc::clone(&natives.bool_));

        let result = match self {
            StmtSema::Block(n) => {
                let stmts = check_all(&n.stmts, ctx, &mut diagnostics);
                rebuild_if(stmts.changed, self, |stmts| {
                    StmtSema::Block(Rc::new(BlockStmtSema {
                        location: n.location.clone(),
                        scope: Rc::clone(&n.scope),
                        stmts,
                    }))
                }, stmts.value)
            }

            StmtSema::Group(n) => {
                let stmts = check_all(&n.stmts, ctx, &mut diagnostics);
                rebuild_if(stmts.changed, self, |stmts| {
                    StmtSema::Group(Rc::new(GroupStmtSema {
                        location: n.location.clone(),
                        stmts,
                    }))
                }, stmts.value)
            }

            StmtSema::BlockEnd(_)
            | StmtSema::Label(_)
            | StmtSema::Jump(_)
            | StmtSema::Exit(_) => MaybeChanged::unchanged(self.clone()),

            StmtSema::Expr(n) => {
                let expr = diagnostics
                    .unwrap(n.expr.create_type_checked(&ctx.without_expected()));
                rebuild_if(expr.changed, self, |expr| {
                    StmtSema::Expr(Rc::new(ExprStmtSema {
                        location: n.location.clone(),
                        expr,
                    }))
                }, expr.value)
            }

            StmtSema::CondJump(n) => {
                let condition =
                    diagnostics.unwrap(typeck::convert_and_check(&n.condition, &bool_target(), ctx));
                rebuild_if(condition.changed, self, |condition| {
                    StmtSema::CondJump(Rc::new(CondJumpStmtSema {
                        location: n.location.clone(),
                        condition,
                        target: Rc::clone(&n.target),
                    }))
                }, condition.value)
            }

            StmtSema::Ret(n) => {
                let return_type = ctx
                    .return_type
                    .clone()
                    .unwrap_or_else(|| Rc::clone(&natives.void));

                match &n.expr {
                    None => {
                        if !return_type.is_same(&natives.void) && !return_type.is_error() {
                            diagnostics.add(Diagnostic::error(
                                DiagnosticKind::TypeMismatch,
                                n.location.clone(),
                                format!(
                                    "this function returns '{}', `ret` needs a value",
                                    return_type.name.name
                                ),
                            ));
                            // the error value keeps later passes quiet
                            let placeholder = ExprSema::SymbolRef(Rc::new(
                                super::exprs::SymbolRefExprSema {
                                    location: n.location.clone(),
                                    symbol: crate::scope::ty::error_symbol(
                                        crate::scope::symbol::ErrorCategory::Variable,
                                    ),
                                },
                            ));
                            return Diagnosed::new(
                                MaybeChanged::changed(StmtSema::Ret(Rc::new(RetStmtSema {
                                    location: n.location.clone(),
                                    expr: Some(placeholder),
                                }))),
                                diagnostics,
                            );
                        }
                        MaybeChanged::unchanged(self.clone())
                    }
                    Some(expr) => {
                        if return_type.is_same(&natives.void) && !expr.is_error_typed() {
                            diagnostics.add(Diagnostic::error(
                                DiagnosticKind::TypeMismatch,
                                expr.location(),
                                "void function returns a value",
                            ));
                            return Diagnosed::new(
                                MaybeChanged::changed(StmtSema::Ret(Rc::new(RetStmtSema {
                                    location: n.location.clone(),
                                    expr: Some(typeck::error_conversion(expr, ctx)),
                                }))),
                                diagnostics,
                            );
                        }
                        let checked = diagnostics.unwrap(typeck::convert_and_check(
                            expr,
                            &TypeInfo::rvalue(return_type),
                            ctx,
                        ));
                        rebuild_if(checked.changed, self, |expr| {
                            StmtSema::Ret(Rc::new(RetStmtSema {
                                location: n.location.clone(),
                                expr: Some(expr),
                            }))
                        }, checked.value)
                    }
                }
            }

            StmtSema::Var(n) => match &n.initializer {
                None => MaybeChanged::unchanged(self.clone()),
                Some(initializer) => {
                    let var_type = n
                        .symbol
                        .var_type()
                        .unwrap_or_else(|| natives.error_type.clone());
                    let checked = diagnostics.unwrap(typeck::convert_and_check(
                        initializer,
                        &TypeInfo::rvalue(var_type),
                        ctx,
                    ));
                    rebuild_if(checked.changed, self, |initializer| {
                        StmtSema::Var(Rc::new(VarStmtSema {
                            location: n.location.clone(),
                            symbol: Rc::clone(&n.symbol),
                            initializer: Some(initializer),
                        }))
                    }, checked.value)
                }
            },

            StmtSema::If(n) => {
                let mut changed = false;
                let mut conditions = vec![];
                for condition in &n.conditions {
                    let checked =
                        diagnostics.unwrap(typeck::convert_and_check(condition, &bool_target(), ctx));
                    changed |= checked.changed;
                    conditions.push(checked.value);
                }
                let bodies = check_all(&n.bodies, ctx, &mut diagnostics);
                changed |= bodies.changed;

                if changed {
                    MaybeChanged::changed(StmtSema::If(Rc::new(IfStmtSema {
                        location: n.location.clone(),
                        scope: Rc::clone(&n.scope),
                        conditions,
                        bodies: bodies.value,
                    })))
                } else {
                    MaybeChanged::unchanged(self.clone())
                }
            }

            StmtSema::While(n) => {
                let condition =
                    diagnostics.unwrap(typeck::convert_and_check(&n.condition, &bool_target(), ctx));
                let body = diagnostics.unwrap(n.body.create_type_checked(ctx));

                if condition.changed || body.changed {
                    MaybeChanged::changed(StmtSema::While(Rc::new(WhileStmtSema {
                        location: n.location.clone(),
                        scope: Rc::clone(&n.scope),
                        condition: condition.value,
                        body: body.value,
                    })))
                } else {
                    MaybeChanged::unchanged(self.clone())
                }
            }

            StmtSema::Assert(n) => {
                let condition =
                    diagnostics.unwrap(typeck::convert_and_check(&n.condition, &bool_target(), ctx));
                rebuild_if(condition.changed, self, |condition| {
                    StmtSema::Assert(Rc::new(AssertStmtSema {
                        location: n.location.clone(),
                        scope: Rc::clone(&n.scope),
                        condition,
                    }))
                }, condition.value)
            }

            StmtSema::Assign(n) => {
                let mut lhs = diagnostics
                    .unwrap(n.lhs.create_type_checked(&ctx.without_expected()));
                let lhs_info = lhs.value.type_info();

                if lhs_info.value_kind != ValueKind::LValue && !lhs_info.ty.is_error() {
                    diagnostics.add(Diagnostic::error(
                        DiagnosticKind::ExpectedLValue,
                        n.lhs.location(),
                        "left side of assignment is not assignable",
                    ));
                    lhs = MaybeChanged::changed(typeck::error_conversion(&lhs.value, ctx));
                }

                let rhs = diagnostics.unwrap(typeck::convert_and_check(
                    &n.rhs,
                    &TypeInfo::rvalue(lhs.value.type_info().ty),
                    ctx,
                ));

                if lhs.changed || rhs.changed {
                    MaybeChanged::changed(StmtSema::Assign(Rc::new(AssignStmtSema {
                        location: n.location.clone(),
                        lhs: lhs.value,
                        rhs: rhs.value,
                    })))
                } else {
                    MaybeChanged::unchanged(self.clone())
                }
            }

            StmtSema::CompoundAssign(n) => {
                let mut lhs = diagnostics
                    .unwrap(n.lhs.create_type_checked(&ctx.without_expected()));
                if lhs.value.type_info().value_kind != ValueKind::LValue
                    && !lhs.value.is_error_typed()
                {
                    diagnostics.add(Diagnostic::error(
                        DiagnosticKind::ExpectedLValue,
                        n.lhs.location(),
                        "left side of assignment is not assignable",
                    ));
                    lhs = MaybeChanged::changed(typeck::error_conversion(&lhs.value, ctx));
                }

                let args = diagnostics.unwrap(typeck::convert_and_check_args(
                    &n.args,
                    &n.op_function,
                    0,
                    &n.location,
                    ctx,
                ));

                if lhs.changed || args.changed {
                    MaybeChanged::changed(StmtSema::CompoundAssign(Rc::new(
                        CompoundAssignStmtSema {
                            location: n.location.clone(),
                            lhs: lhs.value,
                            args: args.value,
                            op_function: Rc::clone(&n.op_function),
                        },
                    )))
                } else {
                    MaybeChanged::unchanged(self.clone())
                }
            }

            StmtSema::Copy(n) => {
                let expr = diagnostics
                    .unwrap(n.expr.create_type_checked(&ctx.without_expected()));
                rebuild_if(expr.changed, self, |expr| {
                    StmtSema::Copy(Rc::new(CopyStmtSema {
                        location: n.location.clone(),
                        expr,
                    }))
                }, expr.value)
            }

            StmtSema::Drop(n) => {
                let expr = diagnostics
                    .unwrap(n.expr.create_type_checked(&ctx.without_expected()));
                rebuild_if(expr.changed, self, |expr| {
                    StmtSema::Drop(Rc::new(DropStmtSema {
                        location: n.location.clone(),
                        expr,
                    }))
                }, expr.value)
            }
        };

        Diagnosed::new(result, diagnostics)
    }

    // ---- lowering ----

    pub fn create_lowered(&self, ctx: &LowerContext) -> MaybeChanged<StmtSema> {
        match self {
            StmtSema::BlockEnd(_)
            | StmtSema::Label(_)
            | StmtSema::Jump(_)
            | StmtSema::Exit(_) => MaybeChanged::unchanged(self.clone()),

            StmtSema::Block(n) => {
                let stmts = lower_all(&n.stmts, ctx);

                // the trailing scope-teardown marker lands once
                let has_end = matches!(
                    stmts.value.last(),
                    Some(StmtSema::BlockEnd(end)) if Rc::ptr_eq(&end.scope, &n.scope)
                );
                let mut stmts_value = stmts.value;
                let mut changed = stmts.changed;
                if !has_end {
                    stmts_value.push(StmtSema::BlockEnd(Rc::new(BlockEndStmtSema {
                        location: n.location.last(),
                        scope: Rc::clone(&n.scope),
                    })));
                    changed = true;
                }

                rebuild_if(changed, self, |stmts| {
                    StmtSema::Block(Rc::new(BlockStmtSema {
                        location: n.location.clone(),
                        scope: Rc::clone(&n.scope),
                        stmts,
                    }))
                }, stmts_value)
            }

            StmtSema::Group(n) => {
                let stmts = lower_all(&n.stmts, ctx);
                rebuild_if(stmts.changed, self, |stmts| {
                    StmtSema::Group(Rc::new(GroupStmtSema {
                        location: n.location.clone(),
                        stmts,
                    }))
                }, stmts.value)
            }

            StmtSema::Expr(n) => {
                let mut prefix = vec![];
                let expr = hoist_expr(&n.expr, ctx, &mut prefix);
                let stmt = StmtSema::Expr(Rc::new(ExprStmtSema {
                    location: n.location.clone(),
                    expr: expr.value,
                }));
                finish_hoisted(self, stmt, prefix, expr.changed, &n.location)
            }

            StmtSema::CondJump(n) => {
                let mut prefix = vec![];
                let condition = hoist_expr(&n.condition, ctx, &mut prefix);
                let stmt = StmtSema::CondJump(Rc::new(CondJumpStmtSema {
                    location: n.location.clone(),
                    condition: condition.value,
                    target: Rc::clone(&n.target),
                }));
                finish_hoisted(self, stmt, prefix, condition.changed, &n.location)
            }

            StmtSema::Ret(n) => match &n.expr {
                None => MaybeChanged::unchanged(self.clone()),
                Some(expr) => {
                    let mut prefix = vec![];
                    let lowered = hoist_expr(expr, ctx, &mut prefix);
                    let stmt = StmtSema::Ret(Rc::new(RetStmtSema {
                        location: n.location.clone(),
                        expr: Some(lowered.value),
                    }));
                    finish_hoisted(self, stmt, prefix, lowered.changed, &n.location)
                }
            },

            StmtSema::Var(n) => match &n.initializer {
                None => MaybeChanged::unchanged(self.clone()),
                Some(initializer) => {
                    let mut prefix = vec![];
                    let lowered = hoist_expr(initializer, ctx, &mut prefix);
                    let stmt = StmtSema::Var(Rc::new(VarStmtSema {
                        location: n.location.clone(),
                        symbol: Rc::clone(&n.symbol),
                        initializer: Some(lowered.value),
                    }));
                    finish_hoisted(self, stmt, prefix, lowered.changed, &n.location)
                }
            },

            StmtSema::Assign(n) => {
                let mut prefix = vec![];
                let lhs = hoist_expr(&n.lhs, ctx, &mut prefix);
                let rhs = hoist_expr(&n.rhs, ctx, &mut prefix);
                let stmt = StmtSema::Assign(Rc::new(AssignStmtSema {
                    location: n.location.clone(),
                    lhs: lhs.value,
                    rhs: rhs.value,
                }));
                finish_hoisted(self, stmt, prefix, lhs.changed || rhs.changed, &n.location)
            }

            StmtSema::Copy(n) => {
                let mut prefix = vec![];
                let expr = hoist_expr(&n.expr, ctx, &mut prefix);
                let stmt = StmtSema::Copy(Rc::new(CopyStmtSema {
                    location: n.location.clone(),
                    expr: expr.value,
                }));
                finish_hoisted(self, stmt, prefix, expr.changed, &n.location)
            }

            StmtSema::Drop(n) => {
                let mut prefix = vec![];
                let expr = hoist_expr(&n.expr, ctx, &mut prefix);
                let stmt = StmtSema::Drop(Rc::new(DropStmtSema {
                    location: n.location.clone(),
                    expr: expr.value,
                }));
                finish_hoisted(self, stmt, prefix, expr.changed, &n.location)
            }

            StmtSema::If(n) => self.lower_if(n, ctx),
            StmtSema::While(n) => self.lower_while(n, ctx),
            StmtSema::Assert(n) => self.lower_assert(n, ctx),

            StmtSema::CompoundAssign(n) => {
                // a OP= b   =>   a = OP(a, b)
                let call = ExprSema::StaticCall(Rc::new(StaticCallExprSema {
                    location: n.location.clone(),
                    function: Rc::clone(&n.op_function),
                    args: n.args.clone(),
                }));
                let assign = StmtSema::Assign(Rc::new(AssignStmtSema {
                    location: n.location.clone(),
                    lhs: n.lhs.clone(),
                    rhs: call,
                }));
                MaybeChanged::changed(assign.create_lowered(ctx).value)
            }
        }
    }

    /// From:
    /// ```text
    /// if c0 { b0 } elif c1 { b1 } else { b2 }
    /// ```
    /// To:
    /// ```text
    /// gotoif !c0 label0; b0; goto label2;
    /// label0: gotoif !c1 label1; b1; goto label2;
    /// label1: b2;
    /// label2:
    /// ```
    fn lower_if(&self, n: &Rc<IfStmtSema>, ctx: &LowerContext) -> MaybeChanged<StmtSema> {
        let bool_ty = Rc::clone(&ctx.compilation.natives.bool_);
        let has_else = n.bodies.len() > n.conditions.len();
        let label_count = n.conditions.len() + usize::from(has_else);

        let labels = (0..label_count)
            .map(|_| create_label(&n.scope, &n.location))
            .collect::<Vec<_>>();
        let end_label = labels.last().expect("if chains have at least one arm");

        let mut stmts = vec![];
        for (i, condition) in n.conditions.iter().enumerate() {
            if i != 0 {
                stmts.push(StmtSema::Label(Rc::new(LabelStmtSema {
                    location: n.location.clone(),
                    symbol: Rc::clone(&labels[i - 1]),
                })));
            }

            let negated = ExprSema::LogicalNegation(Rc::new(LogicalNegationExprSema {
                location: condition.location(),
                expr: condition.clone(),
                ty: Rc::clone(&bool_ty),
            }));
            stmts.push(StmtSema::CondJump(Rc::new(CondJumpStmtSema {
                location: condition.location(),
                condition: negated,
                target: Rc::clone(&labels[i]),
            })));

            stmts.push(n.bodies[i].clone());

            let is_last_body = i == n.bodies.len() - 1;
            if !is_last_body {
                stmts.push(StmtSema::Jump(Rc::new(NormalJumpStmtSema {
                    location: n.location.clone(),
                    target: Rc::clone(end_label),
                })));
            }
        }

        if has_else {
            stmts.push(StmtSema::Label(Rc::new(LabelStmtSema {
                location: n.location.clone(),
                symbol: Rc::clone(&labels[labels.len() - 2]),
            })));
            stmts.push(n.bodies.last().expect("else body").clone());
        }

        stmts.push(StmtSema::Label(Rc::new(LabelStmtSema {
            location: n.location.clone(),
            symbol: Rc::clone(end_label),
        })));

        let group = StmtSema::Group(Rc::new(GroupStmtSema {
            location: n.location.clone(),
            stmts,
        }));
        MaybeChanged::changed(group.create_lowered(ctx).value)
    }

    /// From:
    /// ```text
    /// while c { b }
    /// ```
    /// To:
    /// ```text
    /// goto continue;
    /// start: b;
    /// continue: gotoif c start;
    /// ```
    fn lower_while(&self, n: &Rc<WhileStmtSema>, ctx: &LowerContext) -> MaybeChanged<StmtSema> {
        let start_label = create_label(&n.scope, &n.location);
        let continue_label = create_label(&n.scope, &n.location);

        let stmts = vec![
            StmtSema::Jump(Rc::new(NormalJumpStmtSema {
                location: n.location.clone(),
                target: Rc::clone(&continue_label),
            })),
            StmtSema::Label(Rc::new(LabelStmtSema {
                location: n.location.clone(),
                symbol: start_label.clone(),
            })),
            n.body.clone(),
            StmtSema::Label(Rc::new(LabelStmtSema {
                location: n.location.clone(),
                symbol: Rc::clone(&continue_label),
            })),
            StmtSema::CondJump(Rc::new(CondJumpStmtSema {
                location: n.condition.location(),
                condition: n.condition.clone(),
                target: start_label,
            })),
        ];

        let group = StmtSema::Group(Rc::new(GroupStmtSema {
            location: n.location.clone(),
            stmts,
        }));
        MaybeChanged::changed(group.create_lowered(ctx).value)
    }

    /// `assert c;` is `if !c { exit; }`, then lowered further.
    fn lower_assert(&self, n: &Rc<AssertStmtSema>, ctx: &LowerContext) -> MaybeChanged<StmtSema> {
        let bool_ty = Rc::clone(&ctx.compilation.natives.bool_);

        let negated = ExprSema::LogicalNegation(Rc::new(LogicalNegationExprSema {
            location: n.condition.location(),
            expr: n.condition.clone(),
            ty: bool_ty,
        }));

        let body_scope = n.scope.create_child_anon();
        let body = StmtSema::Block(Rc::new(BlockStmtSema {
            location: n.location.clone(),
            scope: body_scope,
            stmts: vec![StmtSema::Exit(Rc::new(ExitStmtSema {
                location: n.location.clone(),
            }))],
        }));

        let if_stmt = StmtSema::If(Rc::new(IfStmtSema {
            location: n.location.clone(),
            scope: Rc::clone(&n.scope),
            conditions: vec![negated],
            bodies: vec![body],
        }));
        MaybeChanged::changed(if_stmt.create_lowered(ctx).value)
    }
}

fn check_all(
    stmts: &[StmtSema],
    ctx: &TypeCheckContext,
    diagnostics: &mut DiagnosticBag,
) -> MaybeChanged<Vec<StmtSema>> {
    let mut changed = false;
    let mut checked = vec![];
    for stmt in stmts {
        let result = diagnostics.unwrap(stmt.create_type_checked(ctx));
        changed |= result.changed;
        checked.push(result.value);
    }
    MaybeChanged {
        value: checked,
        changed,
    }
}

fn lower_all(stmts: &[StmtSema], ctx: &LowerContext) -> MaybeChanged<Vec<StmtSema>> {
    let mut changed = false;
    let mut lowered = vec![];
    for stmt in stmts {
        let result = stmt.create_lowered(ctx);
        changed |= result.changed;
        lowered.push(result.value);
    }
    MaybeChanged {
        value: lowered,
        changed,
    }
}

fn rebuild_if<T>(
    changed: bool,
    original: &StmtSema,
    rebuild: impl FnOnce(T) -> StmtSema,
    value: T,
) -> MaybeChanged<StmtSema> {
    if changed {
        MaybeChanged::changed(rebuild(value))
    } else {
        MaybeChanged::unchanged(original.clone())
    }
}

/// Wrap a rewritten statement with its hoisted short-circuit prefix, or
/// pass it through untouched when nothing moved.
fn finish_hoisted(
    original: &StmtSema,
    stmt: StmtSema,
    prefix: Vec<StmtSema>,
    expr_changed: bool,
    location: &SrcLocation,
) -> MaybeChanged<StmtSema> {
    if prefix.is_empty() {
        return rebuild_if(expr_changed, original, |s| s, stmt);
    }

    let mut stmts = prefix;
    stmts.push(stmt);
    MaybeChanged::changed(StmtSema::Group(Rc::new(GroupStmtSema {
        location: location.clone(),
        stmts,
    })))
}
