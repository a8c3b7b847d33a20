//! Expression sema nodes.
//!
//! Every node carries the type it produces, computed at bind time and
//! kept current through rebuilds. Pre-lowering variants here are the user
//! operators (they lower to static calls) and `&&`/`||` (eliminated by
//! the statement-level short-circuit rewrite).

use std::rc::Rc;

use crate::diagnostics::{Diagnosed, Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::emit::{Emitter, ExprEmitResult};
use crate::scope::symbol::{Symbol, SymbolKind, TypeModifier};
use crate::source::SrcLocation;
use crate::syntax::exprs::LiteralKind;
use crate::typeck;

use super::{LowerContext, MaybeChanged, TypeCheckContext, TypeInfo, ValueKind};

#[derive(Clone)]
pub enum ExprSema {
    Literal(Rc<LiteralExprSema>),
    SymbolRef(Rc<SymbolRefExprSema>),
    FieldAccess(Rc<FieldAccessExprSema>),
    StaticCall(Rc<StaticCallExprSema>),
    InstanceCall(Rc<InstanceCallExprSema>),
    StructConstruction(Rc<StructConstructionExprSema>),
    Cast(Rc<CastExprSema>),
    Conversion(Rc<ConversionExprSema>),
    AddressOf(Rc<AddressOfExprSema>),
    SizeOf(Rc<SizeOfExprSema>),
    DerefAs(Rc<DerefAsExprSema>),
    VtblPtr(Rc<VtblPtrExprSema>),
    TypeInfoPtr(Rc<TypeInfoPtrExprSema>),
    Box_(Rc<BoxExprSema>),
    Unbox(Rc<UnboxExprSema>),
    Lock(Rc<LockExprSema>),
    And(Rc<AndExprSema>),
    Or(Rc<OrExprSema>),
    LogicalNegation(Rc<LogicalNegationExprSema>),
    UserUnary(Rc<UserUnaryExprSema>),
    UserBinary(Rc<UserBinaryExprSema>),
}

pub struct LiteralExprSema {
    pub location: SrcLocation,
    pub kind: LiteralKind,
    pub text: String,
    pub ty: Rc<Symbol>,
    /// Set while the literal still has the default `int` type and may be
    /// narrowed by an expected-type hint.
    pub is_default_int: bool,
}

pub struct SymbolRefExprSema {
    pub location: SrcLocation,
    pub symbol: Rc<Symbol>,
}

pub struct FieldAccessExprSema {
    pub location: SrcLocation,
    pub expr: ExprSema,
    pub field: Rc<Symbol>,
}

pub struct StaticCallExprSema {
    pub location: SrcLocation,
    pub function: Rc<Symbol>,
    pub args: Vec<ExprSema>,
}

pub struct InstanceCallExprSema {
    pub location: SrcLocation,
    pub receiver: ExprSema,
    pub function: Rc<Symbol>,
    pub args: Vec<ExprSema>,
}

pub struct StructConstructionExprSema {
    pub location: SrcLocation,
    pub struct_symbol: Rc<Symbol>,
    /// One entry per struct field, in field order.
    pub args: Vec<ExprSema>,
}

pub struct CastExprSema {
    pub location: SrcLocation,
    pub expr: ExprSema,
    pub target: Rc<Symbol>,
}

/// How an inserted conversion changes a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    LValueToRValue,
    Deref,
    Ref,
    NumericWidening,
    StrongToWeak,
    /// A failed conversion; carries the error type so the position stays
    /// quiet in later passes.
    Invalid,
}

/// An implicit conversion inserted by the type checker.
pub struct ConversionExprSema {
    pub location: SrcLocation,
    pub expr: ExprSema,
    pub kind: ConversionKind,
    pub target: Rc<Symbol>,
}

pub struct AddressOfExprSema {
    pub location: SrcLocation,
    pub expr: ExprSema,
    pub ty: Rc<Symbol>,
}

pub struct SizeOfExprSema {
    pub location: SrcLocation,
    pub target: Rc<Symbol>,
    pub ty: Rc<Symbol>,
}

pub struct DerefAsExprSema {
    pub location: SrcLocation,
    pub expr: ExprSema,
    pub target: Rc<Symbol>,
}

pub struct VtblPtrExprSema {
    pub location: SrcLocation,
    pub expr: ExprSema,
    pub trait_symbol: Rc<Symbol>,
    pub ty: Rc<Symbol>,
}

pub struct TypeInfoPtrExprSema {
    pub location: SrcLocation,
    pub target: Rc<Symbol>,
    pub ty: Rc<Symbol>,
}

pub struct BoxExprSema {
    pub location: SrcLocation,
    pub expr: ExprSema,
    pub ty: Rc<Symbol>,
}

pub struct UnboxExprSema {
    pub location: SrcLocation,
    pub expr: ExprSema,
    pub ty: Rc<Symbol>,
}

pub struct LockExprSema {
    pub location: SrcLocation,
    pub expr: ExprSema,
    pub ty: Rc<Symbol>,
}

pub struct AndExprSema {
    pub location: SrcLocation,
    pub lhs: ExprSema,
    pub rhs: ExprSema,
    pub ty: Rc<Symbol>,
}

pub struct OrExprSema {
    pub location: SrcLocation,
    pub lhs: ExprSema,
    pub rhs: ExprSema,
    pub ty: Rc<Symbol>,
}

pub struct LogicalNegationExprSema {
    pub location: SrcLocation,
    pub expr: ExprSema,
    pub ty: Rc<Symbol>,
}

pub struct UserUnaryExprSema {
    pub location: SrcLocation,
    pub expr: ExprSema,
    pub op_function: Rc<Symbol>,
}

pub struct UserBinaryExprSema {
    pub location: SrcLocation,
    pub lhs: ExprSema,
    pub rhs: ExprSema,
    pub op_function: Rc<Symbol>,
}

impl ExprSema {
    pub fn location(&self) -> SrcLocation {
        match self {
            ExprSema::Literal(n) => n.location.clone(),
            ExprSema::SymbolRef(n) => n.location.clone(),
            ExprSema::FieldAccess(n) => n.location.clone(),
            ExprSema::StaticCall(n) => n.location.clone(),
            ExprSema::InstanceCall(n) => n.location.clone(),
            ExprSema::StructConstruction(n) => n.location.clone(),
            ExprSema::Cast(n) => n.location.clone(),
            ExprSema::Conversion(n) => n.location.clone(),
            ExprSema::AddressOf(n) => n.location.clone(),
            ExprSema::SizeOf(n) => n.location.clone(),
            ExprSema::DerefAs(n) => n.location.clone(),
            ExprSema::VtblPtr(n) => n.location.clone(),
            ExprSema::TypeInfoPtr(n) => n.location.clone(),
            ExprSema::Box_(n) => n.location.clone(),
            ExprSema::Unbox(n) => n.location.clone(),
            ExprSema::Lock(n) => n.location.clone(),
            ExprSema::And(n) => n.location.clone(),
            ExprSema::Or(n) => n.location.clone(),
            ExprSema::LogicalNegation(n) => n.location.clone(),
            ExprSema::UserUnary(n) => n.location.clone(),
            ExprSema::UserBinary(n) => n.location.clone(),
        }
    }

    pub fn type_info(&self) -> TypeInfo {
        match self {
            ExprSema::Literal(n) => TypeInfo::rvalue(Rc::clone(&n.ty)),
            ExprSema::SymbolRef(n) => match n.symbol.var_type() {
                Some(ty) => TypeInfo::lvalue(ty),
                None => TypeInfo::rvalue(Rc::clone(&n.symbol)),
            },
            ExprSema::FieldAccess(n) => TypeInfo::lvalue(
                n.field
                    .var_type()
                    .unwrap_or_else(|| Rc::clone(&n.field)),
            ),
            ExprSema::StaticCall(n) => TypeInfo::rvalue(function_return_type(&n.function)),
            ExprSema::InstanceCall(n) => TypeInfo::rvalue(function_return_type(&n.function)),
            ExprSema::StructConstruction(n) => TypeInfo::rvalue(Rc::clone(&n.struct_symbol)),
            ExprSema::Cast(n) => TypeInfo::rvalue(Rc::clone(&n.target)),
            ExprSema::Conversion(n) => match n.kind {
                ConversionKind::Deref => TypeInfo::lvalue(Rc::clone(&n.target)),
                _ => TypeInfo::rvalue(Rc::clone(&n.target)),
            },
            ExprSema::AddressOf(n) => TypeInfo::rvalue(Rc::clone(&n.ty)),
            ExprSema::SizeOf(n) => TypeInfo::rvalue(Rc::clone(&n.ty)),
            ExprSema::DerefAs(n) => TypeInfo::lvalue(Rc::clone(&n.target)),
            ExprSema::VtblPtr(n) => TypeInfo::rvalue(Rc::clone(&n.ty)),
            ExprSema::TypeInfoPtr(n) => TypeInfo::rvalue(Rc::clone(&n.ty)),
            ExprSema::Box_(n) => TypeInfo::rvalue(Rc::clone(&n.ty)),
            ExprSema::Unbox(n) => TypeInfo::rvalue(Rc::clone(&n.ty)),
            ExprSema::Lock(n) => TypeInfo::rvalue(Rc::clone(&n.ty)),
            ExprSema::And(n) => TypeInfo::rvalue(Rc::clone(&n.ty)),
            ExprSema::Or(n) => TypeInfo::rvalue(Rc::clone(&n.ty)),
            ExprSema::LogicalNegation(n) => TypeInfo::rvalue(Rc::clone(&n.ty)),
            ExprSema::UserUnary(n) => TypeInfo::rvalue(function_return_type(&n.op_function)),
            ExprSema::UserBinary(n) => TypeInfo::rvalue(function_return_type(&n.op_function)),
        }
    }

    pub fn collect_children(&self) -> Vec<ExprSema> {
        match self {
            ExprSema::Literal(_)
            | ExprSema::SymbolRef(_)
            | ExprSema::SizeOf(_)
            | ExprSema::TypeInfoPtr(_) => vec![],
            ExprSema::FieldAccess(n) => vec![n.expr.clone()],
            ExprSema::StaticCall(n) => n.args.clone(),
            ExprSema::InstanceCall(n) => {
                let mut children = vec![n.receiver.clone()];
                children.extend(n.args.iter().cloned());
                children
            }
            ExprSema::StructConstruction(n) => n.args.clone(),
            ExprSema::Cast(n) => vec![n.expr.clone()],
            ExprSema::Conversion(n) => vec![n.expr.clone()],
            ExprSema::AddressOf(n) => vec![n.expr.clone()],
            ExprSema::DerefAs(n) => vec![n.expr.clone()],
            ExprSema::VtblPtr(n) => vec![n.expr.clone()],
            ExprSema::Box_(n) => vec![n.expr.clone()],
            ExprSema::Unbox(n) => vec![n.expr.clone()],
            ExprSema::Lock(n) => vec![n.expr.clone()],
            ExprSema::And(n) => vec![n.lhs.clone(), n.rhs.clone()],
            ExprSema::Or(n) => vec![n.lhs.clone(), n.rhs.clone()],
            ExprSema::LogicalNegation(n) => vec![n.expr.clone()],
            ExprSema::UserUnary(n) => vec![n.expr.clone()],
            ExprSema::UserBinary(n) => vec![n.lhs.clone(), n.rhs.clone()],
        }
    }

    pub fn is_error_typed(&self) -> bool {
        self.type_info().ty.is_error()
    }

    pub fn emit(&self, emitter: &mut dyn Emitter) -> ExprEmitResult {
        emitter.emit_expr(self)
    }

    /// One type-check step over this expression. Conversion insertion at
    /// typed positions happens in [`typeck::convert_and_check`]; this
    /// method rebuilds children and re-derives node types.
    pub fn create_type_checked(
        &self,
        ctx: &TypeCheckContext,
    ) -> Diagnosed<MaybeChanged<ExprSema>> {
        let mut diagnostics = DiagnosticBag::new();
        let natives = &ctx.compilation.natives;

        let result = match self {
            ExprSema::Literal(n) => check_literal(n, ctx, &mut diagnostics),
            ExprSema::SymbolRef(_) => MaybeChanged::unchanged(self.clone()),

            ExprSema::FieldAccess(n) => {
                let expr = diagnostics
                    .unwrap(n.expr.create_type_checked(&ctx.without_expected()));
                rebuild_if(expr.changed, self, |expr| {
                    ExprSema::FieldAccess(Rc::new(FieldAccessExprSema {
                        location: n.location.clone(),
                        expr,
                        field: Rc::clone(&n.field),
                    }))
                }, expr.value)
            }

            ExprSema::StaticCall(n) => {
                let checked = diagnostics.unwrap(typeck::convert_and_check_args(
                    &n.args,
                    &n.function,
                    0,
                    &n.location,
                    ctx,
                ));
                rebuild_if(checked.changed, self, |args| {
                    ExprSema::StaticCall(Rc::new(StaticCallExprSema {
                        location: n.location.clone(),
                        function: Rc::clone(&n.function),
                        args,
                    }))
                }, checked.value)
            }

            ExprSema::InstanceCall(n) => {
                let receiver_target = receiver_type_info(&n.function);
                let receiver = match receiver_target {
                    Some(target) => diagnostics
                        .unwrap(typeck::convert_and_check(&n.receiver, &target, ctx)),
                    None => diagnostics
                        .unwrap(n.receiver.create_type_checked(&ctx.without_expected())),
                };
                let args = diagnostics.unwrap(typeck::convert_and_check_args(
                    &n.args,
                    &n.function,
                    1,
                    &n.location,
                    ctx,
                ));

                if receiver.changed || args.changed {
                    MaybeChanged::changed(ExprSema::InstanceCall(Rc::new(InstanceCallExprSema {
                        location: n.location.clone(),
                        receiver: receiver.value,
                        function: Rc::clone(&n.function),
                        args: args.value,
                    })))
                } else {
                    MaybeChanged::unchanged(self.clone())
                }
            }

            ExprSema::StructConstruction(n) => {
                let fields = n
                    .struct_symbol
                    .as_struct()
                    .map(|s| s.fields.borrow().clone())
                    .unwrap_or_default();

                let mut changed = false;
                let mut args = vec![];
                for (i, arg) in n.args.iter().enumerate() {
                    let checked = match fields.get(i).and_then(|f| f.var_type()) {
                        Some(field_ty) => diagnostics.unwrap(typeck::convert_and_check(
                            arg,
                            &TypeInfo::rvalue(field_ty),
                            ctx,
                        )),
                        None => diagnostics
                            .unwrap(arg.create_type_checked(&ctx.without_expected())),
                    };
                    changed |= checked.changed;
                    args.push(checked.value);
                }

                rebuild_if(changed, self, |args| {
                    ExprSema::StructConstruction(Rc::new(StructConstructionExprSema {
                        location: n.location.clone(),
                        struct_symbol: Rc::clone(&n.struct_symbol),
                        args,
                    }))
                }, args)
            }

            ExprSema::Cast(n) => {
                let expr = diagnostics
                    .unwrap(n.expr.create_type_checked(&ctx.with_expected(Rc::clone(&n.target))));
                let cast_errors = typeck::check_explicit_conversion(
                    &expr.value,
                    &n.target,
                    &n.location,
                    ctx,
                );
                // an invalid cast degrades to the error type so it only
                // reports once
                let target = if cast_errors.is_empty() {
                    Rc::clone(&n.target)
                } else {
                    natives.error_type.clone()
                };
                let rebuilt = expr.changed || !cast_errors.is_empty();
                diagnostics.merge(cast_errors);
                rebuild_if(rebuilt, self, |expr| {
                    ExprSema::Cast(Rc::new(CastExprSema {
                        location: n.location.clone(),
                        expr,
                        target,
                    }))
                }, expr.value)
            }

            ExprSema::Conversion(n) => {
                let expr = diagnostics
                    .unwrap(n.expr.create_type_checked(&ctx.without_expected()));
                rebuild_if(expr.changed, self, |expr| {
                    ExprSema::Conversion(Rc::new(ConversionExprSema {
                        location: n.location.clone(),
                        expr,
                        kind: n.kind,
                        target: Rc::clone(&n.target),
                    }))
                }, expr.value)
            }

            ExprSema::AddressOf(n) => {
                let mut expr = diagnostics
                    .unwrap(n.expr.create_type_checked(&ctx.without_expected()));
                if expr.value.type_info().value_kind != ValueKind::LValue
                    && !expr.value.is_error_typed()
                {
                    diagnostics.add(Diagnostic::error(
                        DiagnosticKind::ExpectedLValue,
                        n.expr.location(),
                        "cannot take the address of a computed value",
                    ));
                    expr = MaybeChanged::changed(typeck::error_conversion(&expr.value, ctx));
                }
                rebuild_if(expr.changed, self, |expr| {
                    ExprSema::AddressOf(Rc::new(AddressOfExprSema {
                        location: n.location.clone(),
                        expr,
                        ty: Rc::clone(&n.ty),
                    }))
                }, expr.value)
            }

            ExprSema::SizeOf(_) | ExprSema::TypeInfoPtr(_) => MaybeChanged::unchanged(self.clone()),

            ExprSema::DerefAs(n) => {
                let expr = diagnostics
                    .unwrap(n.expr.create_type_checked(&ctx.without_expected()));
                rebuild_if(expr.changed, self, |expr| {
                    ExprSema::DerefAs(Rc::new(DerefAsExprSema {
                        location: n.location.clone(),
                        expr,
                        target: Rc::clone(&n.target),
                    }))
                }, expr.value)
            }

            ExprSema::VtblPtr(n) => {
                let expr = diagnostics
                    .unwrap(n.expr.create_type_checked(&ctx.without_expected()));
                rebuild_if(expr.changed, self, |expr| {
                    ExprSema::VtblPtr(Rc::new(VtblPtrExprSema {
                        location: n.location.clone(),
                        expr,
                        trait_symbol: Rc::clone(&n.trait_symbol),
                        ty: Rc::clone(&n.ty),
                    }))
                }, expr.value)
            }

            ExprSema::Box_(n) => {
                let expr = diagnostics
                    .unwrap(n.expr.create_type_checked(&ctx.without_expected()));
                let inner_ty = expr.value.type_info().ty;
                let ty = ctx
                    .compilation
                    .types
                    .modified(inner_ty, TypeModifier::StrongPtr);
                let rebuilt = expr.changed || !ty.is_same(&n.ty);
                rebuild_if(rebuilt, self, |expr| {
                    ExprSema::Box_(Rc::new(BoxExprSema {
                        location: n.location.clone(),
                        expr,
                        ty,
                    }))
                }, expr.value)
            }

            ExprSema::Unbox(n) => {
                let expr = diagnostics
                    .unwrap(n.expr.create_type_checked(&ctx.without_expected()));
                let inner = expr.value.type_info().ty;
                let ty = match strip_modifier(&inner, TypeModifier::StrongPtr) {
                    Some(referent) => referent,
                    None => {
                        if !inner.is_error() {
                            diagnostics.add(Diagnostic::error(
                                DiagnosticKind::TypeMismatch,
                                n.expr.location(),
                                format!("cannot unbox '{}'", inner.name.name),
                            ));
                        }
                        // degrade to an error node so this reports once
                        return Diagnosed::new(
                            MaybeChanged::changed(typeck::error_conversion(&expr.value, ctx)),
                            diagnostics,
                        );
                    }
                };
                let rebuilt = expr.changed || !ty.is_same(&n.ty);
                rebuild_if(rebuilt, self, |expr| {
                    ExprSema::Unbox(Rc::new(UnboxExprSema {
                        location: n.location.clone(),
                        expr,
                        ty,
                    }))
                }, expr.value)
            }

            ExprSema::Lock(n) => {
                let expr = diagnostics
                    .unwrap(n.expr.create_type_checked(&ctx.without_expected()));
                let inner = expr.value.type_info().ty;
                let ty = match strip_modifier(&inner, TypeModifier::WeakPtr) {
                    Some(referent) => ctx
                        .compilation
                        .types
                        .modified(referent, TypeModifier::StrongPtr),
                    None => {
                        if !inner.is_error() {
                            diagnostics.add(Diagnostic::error(
                                DiagnosticKind::TypeMismatch,
                                n.expr.location(),
                                format!("cannot lock '{}', a weak pointer is needed", inner.name.name),
                            ));
                        }
                        return Diagnosed::new(
                            MaybeChanged::changed(typeck::error_conversion(&expr.value, ctx)),
                            diagnostics,
                        );
                    }
                };
                let rebuilt = expr.changed || !ty.is_same(&n.ty);
                rebuild_if(rebuilt, self, |expr| {
                    ExprSema::Lock(Rc::new(LockExprSema {
                        location: n.location.clone(),
                        expr,
                        ty,
                    }))
                }, expr.value)
            }

            ExprSema::And(n) => {
                let target = TypeInfo::rvalue(Rc::clone(&natives.bool_));
                let lhs = diagnostics.unwrap(typeck::convert_and_check(&n.lhs, &target, ctx));
                let rhs = diagnostics.unwrap(typeck::convert_and_check(&n.rhs, &target, ctx));
                if lhs.changed || rhs.changed {
                    MaybeChanged::changed(ExprSema::And(Rc::new(AndExprSema {
                        location: n.location.clone(),
                        lhs: lhs.value,
                        rhs: rhs.value,
                        ty: Rc::clone(&n.ty),
                    })))
                } else {
                    MaybeChanged::unchanged(self.clone())
                }
            }

            ExprSema::Or(n) => {
                let target = TypeInfo::rvalue(Rc::clone(&natives.bool_));
                let lhs = diagnostics.unwrap(typeck::convert_and_check(&n.lhs, &target, ctx));
                let rhs = diagnostics.unwrap(typeck::convert_and_check(&n.rhs, &target, ctx));
                if lhs.changed || rhs.changed {
                    MaybeChanged::changed(ExprSema::Or(Rc::new(OrExprSema {
                        location: n.location.clone(),
                        lhs: lhs.value,
                        rhs: rhs.value,
                        ty: Rc::clone(&n.ty),
                    })))
                } else {
                    MaybeChanged::unchanged(self.clone())
                }
            }

            ExprSema::LogicalNegation(n) => {
                let target = TypeInfo::rvalue(Rc::clone(&natives.bool_));
                let expr = diagnostics.unwrap(typeck::convert_and_check(&n.expr, &target, ctx));
                rebuild_if(expr.changed, self, |expr| {
                    ExprSema::LogicalNegation(Rc::new(LogicalNegationExprSema {
                        location: n.location.clone(),
                        expr,
                        ty: Rc::clone(&n.ty),
                    }))
                }, expr.value)
            }

            ExprSema::UserUnary(n) => {
                let checked = diagnostics.unwrap(typeck::convert_and_check_args(
                    std::slice::from_ref(&n.expr),
                    &n.op_function,
                    0,
                    &n.location,
                    ctx,
                ));
                rebuild_if(checked.changed, self, |mut args: Vec<ExprSema>| {
                    ExprSema::UserUnary(Rc::new(UserUnaryExprSema {
                        location: n.location.clone(),
                        expr: args.remove(0),
                        op_function: Rc::clone(&n.op_function),
                    }))
                }, checked.value)
            }

            ExprSema::UserBinary(n) => {
                let checked = diagnostics.unwrap(typeck::convert_and_check_args(
                    &[n.lhs.clone(), n.rhs.clone()],
                    &n.op_function,
                    0,
                    &n.location,
                    ctx,
                ));
                rebuild_if(checked.changed, self, |mut args: Vec<ExprSema>| {
                    let rhs = args.remove(1);
                    let lhs = args.remove(0);
                    ExprSema::UserBinary(Rc::new(UserBinaryExprSema {
                        location: n.location.clone(),
                        lhs,
                        rhs,
                        op_function: Rc::clone(&n.op_function),
                    }))
                }, checked.value)
            }
        };

        Diagnosed::new(result, diagnostics)
    }

    /// One lowering step. User operators become static calls; everything
    /// else lowers its children.
    pub fn create_lowered(&self, ctx: &LowerContext) -> MaybeChanged<ExprSema> {
        match self {
            ExprSema::Literal(_)
            | ExprSema::SymbolRef(_)
            | ExprSema::SizeOf(_)
            | ExprSema::TypeInfoPtr(_) => MaybeChanged::unchanged(self.clone()),

            ExprSema::UserUnary(n) => {
                let expr = n.expr.create_lowered(ctx);
                MaybeChanged::changed(ExprSema::StaticCall(Rc::new(StaticCallExprSema {
                    location: n.location.clone(),
                    function: Rc::clone(&n.op_function),
                    args: vec![expr.value],
                })))
            }

            ExprSema::UserBinary(n) => {
                let lhs = n.lhs.create_lowered(ctx);
                let rhs = n.rhs.create_lowered(ctx);
                MaybeChanged::changed(ExprSema::StaticCall(Rc::new(StaticCallExprSema {
                    location: n.location.clone(),
                    function: Rc::clone(&n.op_function),
                    args: vec![lhs.value, rhs.value],
                })))
            }

            ExprSema::FieldAccess(n) => {
                let expr = n.expr.create_lowered(ctx);
                lowered_if(expr.changed, self, |expr| {
                    ExprSema::FieldAccess(Rc::new(FieldAccessExprSema {
                        location: n.location.clone(),
                        expr,
                        field: Rc::clone(&n.field),
                    }))
                }, expr.value)
            }

            ExprSema::StaticCall(n) => {
                let args = lower_all(&n.args, ctx);
                lowered_if(args.changed, self, |args| {
                    ExprSema::StaticCall(Rc::new(StaticCallExprSema {
                        location: n.location.clone(),
                        function: Rc::clone(&n.function),
                        args,
                    }))
                }, args.value)
            }

            ExprSema::InstanceCall(n) => {
                let receiver = n.receiver.create_lowered(ctx);
                let args = lower_all(&n.args, ctx);
                if receiver.changed || args.changed {
                    MaybeChanged::changed(ExprSema::InstanceCall(Rc::new(InstanceCallExprSema {
                        location: n.location.clone(),
                        receiver: receiver.value,
                        function: Rc::clone(&n.function),
                        args: args.value,
                    })))
                } else {
                    MaybeChanged::unchanged(self.clone())
                }
            }

            ExprSema::StructConstruction(n) => {
                let args = lower_all(&n.args, ctx);
                lowered_if(args.changed, self, |args| {
                    ExprSema::StructConstruction(Rc::new(StructConstructionExprSema {
                        location: n.location.clone(),
                        struct_symbol: Rc::clone(&n.struct_symbol),
                        args,
                    }))
                }, args.value)
            }

            ExprSema::Cast(n) => {
                let expr = n.expr.create_lowered(ctx);
                lowered_if(expr.changed, self, |expr| {
                    ExprSema::Cast(Rc::new(CastExprSema {
                        location: n.location.clone(),
                        expr,
                        target: Rc::clone(&n.target),
                    }))
                }, expr.value)
            }

            ExprSema::Conversion(n) => {
                let expr = n.expr.create_lowered(ctx);
                lowered_if(expr.changed, self, |expr| {
                    ExprSema::Conversion(Rc::new(ConversionExprSema {
                        location: n.location.clone(),
                        expr,
                        kind: n.kind,
                        target: Rc::clone(&n.target),
                    }))
                }, expr.value)
            }

            ExprSema::AddressOf(n) => {
                let expr = n.expr.create_lowered(ctx);
                lowered_if(expr.changed, self, |expr| {
                    ExprSema::AddressOf(Rc::new(AddressOfExprSema {
                        location: n.location.clone(),
                        expr,
                        ty: Rc::clone(&n.ty),
                    }))
                }, expr.value)
            }

            ExprSema::DerefAs(n) => {
                let expr = n.expr.create_lowered(ctx);
                lowered_if(expr.changed, self, |expr| {
                    ExprSema::DerefAs(Rc::new(DerefAsExprSema {
                        location: n.location.clone(),
                        expr,
                        target: Rc::clone(&n.target),
                    }))
                }, expr.value)
            }

            ExprSema::VtblPtr(n) => {
                let expr = n.expr.create_lowered(ctx);
                lowered_if(expr.changed, self, |expr| {
                    ExprSema::VtblPtr(Rc::new(VtblPtrExprSema {
                        location: n.location.clone(),
                        expr,
                        trait_symbol: Rc::clone(&n.trait_symbol),
                        ty: Rc::clone(&n.ty),
                    }))
                }, expr.value)
            }

            ExprSema::Box_(n) => {
                let expr = n.expr.create_lowered(ctx);
                lowered_if(expr.changed, self, |expr| {
                    ExprSema::Box_(Rc::new(BoxExprSema {
                        location: n.location.clone(),
                        expr,
                        ty: Rc::clone(&n.ty),
                    }))
                }, expr.value)
            }

            ExprSema::Unbox(n) => {
                let expr = n.expr.create_lowered(ctx);
                lowered_if(expr.changed, self, |expr| {
                    ExprSema::Unbox(Rc::new(UnboxExprSema {
                        location: n.location.clone(),
                        expr,
                        ty: Rc::clone(&n.ty),
                    }))
                }, expr.value)
            }

            ExprSema::Lock(n) => {
                let expr = n.expr.create_lowered(ctx);
                lowered_if(expr.changed, self, |expr| {
                    ExprSema::Lock(Rc::new(LockExprSema {
                        location: n.location.clone(),
                        expr,
                        ty: Rc::clone(&n.ty),
                    }))
                }, expr.value)
            }

            // `&&`/`||` lower their operands here; their own elimination
            // is the statement-level short-circuit rewrite
            ExprSema::And(n) => {
                let lhs = n.lhs.create_lowered(ctx);
                let rhs = n.rhs.create_lowered(ctx);
                if lhs.changed || rhs.changed {
                    MaybeChanged::changed(ExprSema::And(Rc::new(AndExprSema {
                        location: n.location.clone(),
                        lhs: lhs.value,
                        rhs: rhs.value,
                        ty: Rc::clone(&n.ty),
                    })))
                } else {
                    MaybeChanged::unchanged(self.clone())
                }
            }

            ExprSema::Or(n) => {
                let lhs = n.lhs.create_lowered(ctx);
                let rhs = n.rhs.create_lowered(ctx);
                if lhs.changed || rhs.changed {
                    MaybeChanged::changed(ExprSema::Or(Rc::new(OrExprSema {
                        location: n.location.clone(),
                        lhs: lhs.value,
                        rhs: rhs.value,
                        ty: Rc::clone(&n.ty),
                    })))
                } else {
                    MaybeChanged::unchanged(self.clone())
                }
            }

            ExprSema::LogicalNegation(n) => {
                let expr = n.expr.create_lowered(ctx);
                lowered_if(expr.changed, self, |expr| {
                    ExprSema::LogicalNegation(Rc::new(LogicalNegationExprSema {
                        location: n.location.clone(),
                        expr,
                        ty: Rc::clone(&n.ty),
                    }))
                }, expr.value)
            }
        }
    }

    /// Whether this expression only contains post-lowering variants.
    pub fn is_lowered(&self) -> bool {
        let own = !matches!(
            self,
            ExprSema::And(_) | ExprSema::Or(_) | ExprSema::UserUnary(_) | ExprSema::UserBinary(_)
        );
        own && self.collect_children().iter().all(|c| c.is_lowered())
    }
}

fn function_return_type(function: &Rc<Symbol>) -> Rc<Symbol> {
    match &function.kind {
        SymbolKind::Function(f) => f.signature.return_type.borrow().clone(),
        SymbolKind::Prototype(p) => p.signature.return_type.borrow().clone(),
        _ => Rc::clone(function),
    }
}

fn receiver_type_info(function: &Rc<Symbol>) -> Option<TypeInfo> {
    let params = match &function.kind {
        SymbolKind::Function(f) => f.signature.params.borrow().clone(),
        // a prototype receiver is `&Self`, the trait's pseudo-type; the
        // concrete receiver type is only known at dispatch
        SymbolKind::Prototype(_) => return None,
        _ => return None,
    };
    params
        .first()
        .filter(|p| matches!(p.kind, SymbolKind::SelfParam(_)))
        .and_then(|p| p.var_type())
        .map(TypeInfo::rvalue)
}

fn strip_modifier(ty: &Rc<Symbol>, modifier: TypeModifier) -> Option<Rc<Symbol>> {
    match &ty.kind {
        SymbolKind::ModifiedType(m) if m.modifier == modifier => Some(Rc::clone(&m.inner)),
        _ => None,
    }
}

fn check_literal(
    literal: &Rc<LiteralExprSema>,
    ctx: &TypeCheckContext,
    diagnostics: &mut DiagnosticBag,
) -> MaybeChanged<ExprSema> {
    let natives = &ctx.compilation.natives;

    // untyped `int` literals narrow toward the expected type when it is
    // numeric and the value fits
    if literal.is_default_int {
        if let Some(expected) = &ctx.expected_type {
            if natives.is_numeric(expected) && !expected.is_same(&literal.ty) {
                if let Some((min, max)) = natives.integer_range(expected) {
                    match literal.text.parse::<i128>() {
                        Ok(value) if value < min || value > max => {
                            diagnostics.add(Diagnostic::error(
                                DiagnosticKind::InvalidImplicitConversion,
                                literal.location.clone(),
                                format!(
                                    "literal {} does not fit in '{}'",
                                    literal.text, expected.name.name
                                ),
                            ));
                            return MaybeChanged::changed(ExprSema::Literal(Rc::new(
                                LiteralExprSema {
                                    location: literal.location.clone(),
                                    kind: literal.kind,
                                    text: literal.text.clone(),
                                    ty: natives.error_type.clone(),
                                    is_default_int: false,
                                },
                            )));
                        }
                        _ => {}
                    }
                }
                return MaybeChanged::changed(ExprSema::Literal(Rc::new(LiteralExprSema {
                    location: literal.location.clone(),
                    kind: literal.kind,
                    text: literal.text.clone(),
                    ty: Rc::clone(expected),
                    is_default_int: false,
                })));
            }
        }
    }

    MaybeChanged::unchanged(ExprSema::Literal(Rc::clone(literal)))
}

fn rebuild_if<T>(
    changed: bool,
    original: &ExprSema,
    rebuild: impl FnOnce(T) -> ExprSema,
    value: T,
) -> MaybeChanged<ExprSema> {
    if changed {
        MaybeChanged::changed(rebuild(value))
    } else {
        MaybeChanged::unchanged(original.clone())
    }
}

fn lowered_if<T>(
    changed: bool,
    original: &ExprSema,
    rebuild: impl FnOnce(T) -> ExprSema,
    value: T,
) -> MaybeChanged<ExprSema> {
    rebuild_if(changed, original, rebuild, value)
}

fn lower_all(exprs: &[ExprSema], ctx: &LowerContext) -> MaybeChanged<Vec<ExprSema>> {
    let mut changed = false;
    let mut lowered = vec![];
    for expr in exprs {
        let result = expr.create_lowered(ctx);
        changed |= result.changed;
        lowered.push(result.value);
    }
    MaybeChanged {
        value: lowered,
        changed,
    }
}
