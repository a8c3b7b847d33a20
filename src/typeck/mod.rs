//! # Type checking
//!
//! A fixed-point rewriter over function bodies. Each pass asks the root
//! statement for its type-checked form; a pass that reports no rebuild
//! anywhere means every expression's type agrees with its context and the
//! checker stops. In practice two passes suffice: one to insert
//! conversions, one to observe the fixed point.
//!
//! ## Implicit conversions
//!
//! When an expression's type does not match what its position expects,
//! [`convert_and_check`] tries, in order:
//!
//! 1. l-value to r-value decay when an r-value is wanted,
//! 2. reference to referent (auto-deref),
//! 3. numeric widening along the fixed lattice,
//! 4. referent to reference (auto-ref of an l-value, for receivers),
//! 5. strong-pointer to weak-pointer erasure,
//! 6. a single-argument constructor marked `[[implicit]]`.
//!
//! A conversion that cannot be made reports `InvalidImplicitConversion`
//! once and substitutes an error-typed node, so later passes and later
//! phases stay quiet about the same position.

use std::rc::Rc;

use log::trace;

use crate::compilation::Compilation;
use crate::diagnostics::{Diagnosed, Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::scope::symbol::{Symbol, SymbolKind, TypeModifier};
use crate::sema::exprs::{ConversionExprSema, ConversionKind, ExprSema, StaticCallExprSema};
use crate::sema::{FunctionSema, MaybeChanged, TypeCheckContext, TypeInfo, ValueKind};
use crate::source::SrcLocation;

const MAX_PASSES: usize = 64;

/// Drive a function body to its type-checked fixed point.
pub fn check_function(
    compilation: &Compilation,
    function: FunctionSema,
) -> Diagnosed<FunctionSema> {
    let mut diagnostics = DiagnosticBag::new();

    let return_type = match &function.symbol.kind {
        SymbolKind::Function(f) => Some(f.signature.return_type.borrow().clone()),
        _ => None,
    };

    let ctx = TypeCheckContext {
        compilation,
        return_type,
        expected_type: None,
    };

    let mut body = function.body;
    for pass in 0..MAX_PASSES {
        let result = diagnostics.unwrap(body.create_type_checked(&ctx));
        body = result.value;
        if !result.changed {
            trace!(
                "'{}' reached the type-check fixed point after {} pass(es)",
                function.symbol.name.name,
                pass + 1
            );
            break;
        }
    }

    Diagnosed::new(
        FunctionSema {
            symbol: function.symbol,
            location: function.location,
            body,
        },
        diagnostics,
    )
}

/// Type-check `expr` against a target, inserting implicit conversions as
/// needed.
pub fn convert_and_check(
    expr: &ExprSema,
    target: &TypeInfo,
    ctx: &TypeCheckContext,
) -> Diagnosed<MaybeChanged<ExprSema>> {
    let mut diagnostics = DiagnosticBag::new();

    let checked = diagnostics.unwrap(expr.create_type_checked(&ctx.with_expected(Rc::clone(&target.ty))));
    let mut changed = checked.changed;
    let mut current = checked.value;

    let info = current.type_info();
    if info.ty.is_error() || target.ty.is_error() {
        return Diagnosed::new(MaybeChanged { value: current, changed }, diagnostics);
    }

    // value positions that demand storage cannot take computed values
    if target.value_kind == ValueKind::LValue && info.value_kind == ValueKind::RValue {
        diagnostics.add(Diagnostic::error(
            DiagnosticKind::ExpectedLValue,
            current.location(),
            "an assignable location is required here",
        ));
        return Diagnosed::new(MaybeChanged { value: current, changed }, diagnostics);
    }

    if !types_agree(&info.ty, &target.ty) {
        match build_conversion(&current, &info, target, ctx) {
            Some(converted) => {
                current = converted;
                changed = true;
            }
            None => {
                diagnostics.add(Diagnostic::error(
                    DiagnosticKind::InvalidImplicitConversion,
                    current.location(),
                    format!(
                        "cannot implicitly convert '{}' to '{}'",
                        info.ty.name.name, target.ty.name.name
                    ),
                ));
                current = error_conversion(&current, ctx);
                return Diagnosed::new(MaybeChanged { value: current, changed: true }, diagnostics);
            }
        }
    }

    // r-value positions decay l-values
    if target.value_kind == ValueKind::RValue
        && current.type_info().value_kind == ValueKind::LValue
    {
        let ty = current.type_info().ty;
        current = ExprSema::Conversion(Rc::new(ConversionExprSema {
            location: current.location(),
            expr: current,
            kind: ConversionKind::LValueToRValue,
            target: ty,
        }));
        changed = true;
    }

    Diagnosed::new(MaybeChanged { value: current, changed }, diagnostics)
}

/// Check call arguments against the callee's parameters, skipping the
/// first `skip_params` (the bound receiver).
pub fn convert_and_check_args(
    args: &[ExprSema],
    function: &Rc<Symbol>,
    skip_params: usize,
    _location: &SrcLocation,
    ctx: &TypeCheckContext,
) -> Diagnosed<MaybeChanged<Vec<ExprSema>>> {
    let mut diagnostics = DiagnosticBag::new();

    let param_types = match &function.kind {
        SymbolKind::Function(f) => f.signature.param_types(),
        SymbolKind::Prototype(p) => p.signature.param_types(),
        _ => vec![],
    };
    let param_types = param_types.into_iter().skip(skip_params).collect::<Vec<_>>();

    let mut changed = false;
    let mut checked = vec![];
    for (i, arg) in args.iter().enumerate() {
        let result = match param_types.get(i) {
            Some(param_ty) => diagnostics.unwrap(convert_and_check(
                arg,
                &TypeInfo::rvalue(Rc::clone(param_ty)),
                ctx,
            )),
            // arity mismatches were reported at bind time
            None => diagnostics.unwrap(arg.create_type_checked(&ctx.without_expected())),
        };
        changed |= result.changed;
        checked.push(result.value);
    }

    Diagnosed::new(
        MaybeChanged {
            value: checked,
            changed,
        },
        diagnostics,
    )
}

/// The wider rules available to explicit `cast[T](e)`: everything the
/// implicit set allows, plus numeric narrowing and signed/unsigned
/// crossing, plus pointer reinterpretation.
pub fn check_explicit_conversion(
    expr: &ExprSema,
    target: &Rc<Symbol>,
    location: &SrcLocation,
    ctx: &TypeCheckContext,
) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();
    let natives = &ctx.compilation.natives;
    let from = expr.type_info().ty;

    if from.is_error() || target.is_error() {
        return diagnostics;
    }

    let from = from.unalias();
    let to = target.unalias();

    let allowed = types_agree(&from, &to)
        || (natives.is_numeric(&from) && natives.is_numeric(&to))
        || (natives.bool_.is_same(&from) && natives.is_integer(&to))
        || is_pointer_like(natives, &from) && is_pointer_like(natives, &to)
        || build_conversion_possible(&from, &to, ctx);

    if !allowed {
        diagnostics.add(Diagnostic::error(
            DiagnosticKind::InvalidExplicitConversion,
            location.clone(),
            format!(
                "cannot cast '{}' to '{}'",
                from.name.name, to.name.name
            ),
        ));
    }

    diagnostics
}

fn is_pointer_like(natives: &crate::scope::ty::NativeTypes, ty: &Rc<Symbol>) -> bool {
    if natives.ptr.is_same(ty) {
        return true;
    }
    matches!(
        &ty.kind,
        SymbolKind::ModifiedType(m) if matches!(
            m.modifier,
            TypeModifier::StrongPtr | TypeModifier::DynStrongPtr | TypeModifier::WeakPtr
        )
    )
}

pub fn types_agree(a: &Rc<Symbol>, b: &Rc<Symbol>) -> bool {
    a.unalias().is_same(&b.unalias()) || a.is_error() || b.is_error()
}

fn build_conversion_possible(from: &Rc<Symbol>, to: &Rc<Symbol>, ctx: &TypeCheckContext) -> bool {
    conversion_kind(from, to, ctx).is_some()
}

/// Pick the implicit conversion step (if any) taking `from` to `to`.
fn conversion_kind(
    from: &Rc<Symbol>,
    to: &Rc<Symbol>,
    ctx: &TypeCheckContext,
) -> Option<ConversionKind> {
    let natives = &ctx.compilation.natives;
    let from = from.unalias();
    let to = to.unalias();

    // auto-deref: &T where T is wanted (also &T -> widened numeric)
    if let SymbolKind::ModifiedType(m) = &from.kind {
        if m.modifier == TypeModifier::Ref {
            let referent = m.inner.unalias();
            if referent.is_same(&to) || natives.widens_to(&referent, &to) {
                return Some(ConversionKind::Deref);
            }
        }
        // strong -> weak erasure
        if m.modifier == TypeModifier::StrongPtr {
            if let SymbolKind::ModifiedType(target_m) = &to.kind {
                if target_m.modifier == TypeModifier::WeakPtr
                    && target_m.inner.unalias().is_same(&m.inner.unalias())
                {
                    return Some(ConversionKind::StrongToWeak);
                }
            }
        }
    }

    if natives.widens_to(&from, &to) {
        return Some(ConversionKind::NumericWidening);
    }

    // auto-ref: T where &T is wanted
    if let SymbolKind::ModifiedType(m) = &to.kind {
        if m.modifier == TypeModifier::Ref && m.inner.unalias().is_same(&from) {
            return Some(ConversionKind::Ref);
        }
    }

    None
}

fn build_conversion(
    expr: &ExprSema,
    info: &TypeInfo,
    target: &TypeInfo,
    ctx: &TypeCheckContext,
) -> Option<ExprSema> {
    let kind = conversion_kind(&info.ty, &target.ty, ctx);

    if let Some(kind) = kind {
        // deref may land on the referent and still need a widening step
        if kind == ConversionKind::Deref {
            let referent = match &info.ty.unalias().kind {
                SymbolKind::ModifiedType(m) => m.inner.clone(),
                _ => return None,
            };
            let dereffed = ExprSema::Conversion(Rc::new(ConversionExprSema {
                location: expr.location(),
                expr: expr.clone(),
                kind: ConversionKind::Deref,
                target: Rc::clone(&referent),
            }));
            if types_agree(&referent, &target.ty) {
                return Some(dereffed);
            }
            return Some(ExprSema::Conversion(Rc::new(ConversionExprSema {
                location: expr.location(),
                expr: dereffed,
                kind: ConversionKind::NumericWidening,
                target: Rc::clone(&target.ty),
            })));
        }

        return Some(ExprSema::Conversion(Rc::new(ConversionExprSema {
            location: expr.location(),
            expr: expr.clone(),
            kind,
            target: Rc::clone(&target.ty),
        })));
    }

    // a single-argument constructor marked [[implicit]] on the target
    implicit_constructor_call(expr, info, target, ctx)
}

fn implicit_constructor_call(
    expr: &ExprSema,
    info: &TypeInfo,
    target: &TypeInfo,
    ctx: &TypeCheckContext,
) -> Option<ExprSema> {
    let target_ty = target.ty.unalias();
    target_ty.as_struct()?;

    let impls = ctx.compilation.impls.borrow();
    for impl_symbol in impls.iter() {
        let data = match &impl_symbol.kind {
            SymbolKind::InherentImpl(data) | SymbolKind::TraitImpl(data) => data,
            _ => continue,
        };
        if !data.self_type.borrow().unalias().is_same(&target_ty) {
            continue;
        }

        for function in data.functions.borrow().iter() {
            let Some(f) = function.as_function() else {
                continue;
            };
            if !f.is_implicit || f.signature.arity() != 1 {
                continue;
            }
            let param_ty = f.signature.param_types().remove(0);
            if types_agree(&param_ty.unalias(), &info.ty.unalias()) {
                return Some(ExprSema::StaticCall(Rc::new(StaticCallExprSema {
                    location: expr.location(),
                    function: Rc::clone(function),
                    args: vec![expr.clone()],
                })));
            }
        }
    }

    None
}

/// The substitution for a failed conversion or misplaced value: an
/// error-typed node that keeps downstream positions (and later passes)
/// quiet.
pub(crate) fn error_conversion(expr: &ExprSema, ctx: &TypeCheckContext) -> ExprSema {
    ExprSema::Conversion(Rc::new(ConversionExprSema {
        location: expr.location(),
        expr: expr.clone(),
        kind: ConversionKind::Invalid,
        target: ctx.compilation.natives.error_type.clone(),
    }))
}
