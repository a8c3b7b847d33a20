//! # Binder
//!
//! Transforms syntax into sema, visiting every expression and statement
//! node exactly once in a post-order walk. Every name becomes a symbol
//! here: variables and paths through the resolver, members and operators
//! through the receiver type's impl set. Resolution failures substitute
//! error symbols and keep going — the binder never aborts a subtree.

use std::rc::Rc;

use log::trace;

use crate::compilation::Compilation;
use crate::diagnostics::{Diagnosed, Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::scope::resolve::{self, SymbolCategory};
use crate::scope::symbol::{ErrorCategory, FunctionCategory, Symbol, SymbolKind, TypeModifier};
use crate::scope::template;
use crate::scope::ty::error_symbol;
use crate::source::SrcLocation;
use crate::syntax::exprs::{ExprSyntax, LiteralKind};
use crate::syntax::items::{operator_function_name, FunctionSyntax, ItemSyntax};
use crate::syntax::name::{SymbolName, SymbolNameSection};
use crate::syntax::stmts::{BlockStmtSyntax, StmtSyntax};

use super::exprs::*;
use super::stmts::*;
use super::{ExprSema, FunctionSema, StmtSema};

/// Bind the bodies of every function in the package, in declaration
/// order.
pub fn bind_package(
    compilation: &Compilation,
    items: &[ItemSyntax],
) -> Diagnosed<Vec<FunctionSema>> {
    let mut diagnostics = DiagnosticBag::new();
    let mut functions = vec![];

    collect_functions(compilation, items, &mut functions, &mut diagnostics);

    trace!("bound {} function bodies", functions.len());
    Diagnosed::new(functions, diagnostics)
}

fn collect_functions(
    compilation: &Compilation,
    items: &[ItemSyntax],
    functions: &mut Vec<FunctionSema>,
    diagnostics: &mut DiagnosticBag,
) {
    for item in items {
        match item {
            ItemSyntax::Mod(m) => {
                collect_functions(compilation, &m.items, functions, diagnostics)
            }
            ItemSyntax::Function(f) => {
                if let Some(function) = bind_function(compilation, f, diagnostics) {
                    functions.push(function);
                }
            }
            ItemSyntax::InherentImpl(i) | ItemSyntax::TraitImpl(i) => {
                for f in &i.functions {
                    if let Some(function) = bind_function(compilation, f, diagnostics) {
                        functions.push(function);
                    }
                }
            }
            _ => {}
        }
    }
}

fn bind_function(
    compilation: &Compilation,
    function: &Rc<FunctionSyntax>,
    diagnostics: &mut DiagnosticBag,
) -> Option<FunctionSema> {
    let body = function.body.as_ref()?;
    let symbol = function.symbol.borrow().clone()?;

    let bound = diagnostics.unwrap(bind_block(compilation, body));
    Some(FunctionSema {
        symbol,
        location: function.location.clone(),
        body: bound,
    })
}

pub fn bind_block(
    compilation: &Compilation,
    block: &Rc<BlockStmtSyntax>,
) -> Diagnosed<StmtSema> {
    let mut diagnostics = DiagnosticBag::new();

    let stmts = block
        .stmts
        .iter()
        .map(|stmt| diagnostics.unwrap(bind_stmt(compilation, stmt)))
        .collect();

    Diagnosed::new(
        StmtSema::Block(Rc::new(BlockStmtSema {
            location: block.location.clone(),
            scope: Rc::clone(&block.body_scope),
            stmts,
        })),
        diagnostics,
    )
}

pub fn bind_stmt(compilation: &Compilation, stmt: &StmtSyntax) -> Diagnosed<StmtSema> {
    let mut diagnostics = DiagnosticBag::new();

    let bound = match stmt {
        StmtSyntax::Block(n) => diagnostics.unwrap(bind_block(compilation, n)),

        StmtSyntax::Expr(n) => StmtSema::Expr(Rc::new(ExprStmtSema {
            location: n.location.clone(),
            expr: diagnostics.unwrap(bind_expr(compilation, &n.expr)),
        })),

        StmtSyntax::Var(n) => {
            let symbol = n
                .symbol
                .borrow()
                .clone()
                .unwrap_or_else(|| error_symbol(ErrorCategory::Variable));
            let initializer = n
                .initializer
                .as_ref()
                .map(|init| diagnostics.unwrap(bind_expr(compilation, init)));
            StmtSema::Var(Rc::new(VarStmtSema {
                location: n.location.clone(),
                symbol,
                initializer,
            }))
        }

        StmtSyntax::If(n) => {
            let conditions = n
                .conditions
                .iter()
                .map(|c| diagnostics.unwrap(bind_expr(compilation, c)))
                .collect();
            let bodies = n
                .bodies
                .iter()
                .map(|b| diagnostics.unwrap(bind_block(compilation, b)))
                .collect();
            StmtSema::If(Rc::new(IfStmtSema {
                location: n.location.clone(),
                scope: Rc::clone(&n.scope),
                conditions,
                bodies,
            }))
        }

        StmtSyntax::While(n) => StmtSema::While(Rc::new(WhileStmtSema {
            location: n.location.clone(),
            scope: Rc::clone(&n.scope),
            condition: diagnostics.unwrap(bind_expr(compilation, &n.condition)),
            body: diagnostics.unwrap(bind_block(compilation, &n.body)),
        })),

        StmtSyntax::Ret(n) => StmtSema::Ret(Rc::new(RetStmtSema {
            location: n.location.clone(),
            expr: n
                .expr
                .as_ref()
                .map(|e| diagnostics.unwrap(bind_expr(compilation, e))),
        })),

        StmtSyntax::Exit(n) => StmtSema::Exit(Rc::new(ExitStmtSema {
            location: n.location.clone(),
        })),

        StmtSyntax::Assert(n) => StmtSema::Assert(Rc::new(AssertStmtSema {
            location: n.location.clone(),
            scope: Rc::clone(&n.scope),
            condition: diagnostics.unwrap(bind_expr(compilation, &n.condition)),
        })),

        StmtSyntax::Assign(n) => StmtSema::Assign(Rc::new(AssignStmtSema {
            location: n.location.clone(),
            lhs: diagnostics.unwrap(bind_expr(compilation, &n.lhs)),
            rhs: diagnostics.unwrap(bind_expr(compilation, &n.rhs)),
        })),

        StmtSyntax::CompoundAssign(n) => {
            let lhs = diagnostics.unwrap(bind_expr(compilation, &n.lhs));
            let rhs = diagnostics.unwrap(bind_expr(compilation, &n.rhs));

            let op_function = lookup_binary_operator(
                compilation,
                n.op,
                &lhs,
                &rhs,
                &n.location,
                &mut diagnostics,
            );

            StmtSema::CompoundAssign(Rc::new(CompoundAssignStmtSema {
                location: n.location.clone(),
                lhs: lhs.clone(),
                args: vec![lhs, rhs],
                op_function,
            }))
        }

        StmtSyntax::Copy(n) => StmtSema::Copy(Rc::new(CopyStmtSema {
            location: n.location.clone(),
            expr: diagnostics.unwrap(bind_expr(compilation, &n.expr)),
        })),

        StmtSyntax::Drop(n) => StmtSema::Drop(Rc::new(DropStmtSema {
            location: n.location.clone(),
            expr: diagnostics.unwrap(bind_expr(compilation, &n.expr)),
        })),
    };

    Diagnosed::new(bound, diagnostics)
}

pub fn bind_expr(compilation: &Compilation, expr: &ExprSyntax) -> Diagnosed<ExprSema> {
    let mut diagnostics = DiagnosticBag::new();
    let natives = &compilation.natives;

    let bound = match expr {
        ExprSyntax::Literal(n) => {
            let (ty, is_default_int) = literal_type(compilation, n.kind);
            ExprSema::Literal(Rc::new(LiteralExprSema {
                location: n.location.clone(),
                kind: n.kind,
                text: n.text.clone(),
                ty,
                is_default_int,
            }))
        }

        ExprSyntax::Paren(n) => diagnostics.unwrap(bind_expr(compilation, &n.expr)),

        ExprSyntax::LiteralSymbol(n) => {
            let symbol = diagnostics.unwrap(resolve::resolve_symbol(
                compilation,
                &n.scope,
                &n.name,
                SymbolCategory::Value,
            ));
            ExprSema::SymbolRef(Rc::new(SymbolRefExprSema {
                location: n.location.clone(),
                symbol,
            }))
        }

        ExprSyntax::MemberAccess(n) => {
            let receiver = diagnostics.unwrap(bind_expr(compilation, &n.expr));
            bind_field_access(compilation, n, receiver, &mut diagnostics)
        }

        ExprSyntax::Call(n) => diagnostics.unwrap(bind_call(compilation, n)),

        ExprSyntax::StructConstruction(n) => {
            diagnostics.unwrap(bind_struct_construction(compilation, n))
        }

        ExprSyntax::Cast(n) => {
            let target = diagnostics.unwrap(resolve::resolve_type(
                compilation,
                &n.scope,
                &n.target,
            ));
            ExprSema::Cast(Rc::new(CastExprSema {
                location: n.location.clone(),
                expr: diagnostics.unwrap(bind_expr(compilation, &n.expr)),
                target,
            }))
        }

        ExprSyntax::AddressOf(n) => ExprSema::AddressOf(Rc::new(AddressOfExprSema {
            location: n.location.clone(),
            expr: diagnostics.unwrap(bind_expr(compilation, &n.expr)),
            ty: natives.ptr.clone(),
        })),

        ExprSyntax::SizeOf(n) => {
            let target = diagnostics.unwrap(resolve::resolve_type(
                compilation,
                &n.scope,
                &n.target,
            ));
            ExprSema::SizeOf(Rc::new(SizeOfExprSema {
                location: n.location.clone(),
                target,
                ty: natives.int.clone(),
            }))
        }

        ExprSyntax::DerefAs(n) => {
            let target = diagnostics.unwrap(resolve::resolve_type(
                compilation,
                &n.scope,
                &n.target,
            ));
            ExprSema::DerefAs(Rc::new(DerefAsExprSema {
                location: n.location.clone(),
                expr: diagnostics.unwrap(bind_expr(compilation, &n.expr)),
                target,
            }))
        }

        ExprSyntax::VtblPtr(n) => {
            let trait_symbol = diagnostics.unwrap(resolve::resolve_symbol(
                compilation,
                &n.scope,
                &n.trait_name,
                SymbolCategory::Type,
            ));
            if trait_symbol.unalias().as_trait().is_none() && !trait_symbol.is_error() {
                diagnostics.add(Diagnostic::error(
                    DiagnosticKind::IncorrectSymbolType,
                    n.trait_name.location.clone(),
                    format!("'{}' is not a trait", trait_symbol.name.name),
                ));
            }
            ExprSema::VtblPtr(Rc::new(VtblPtrExprSema {
                location: n.location.clone(),
                expr: diagnostics.unwrap(bind_expr(compilation, &n.expr)),
                trait_symbol,
                ty: natives.ptr.clone(),
            }))
        }

        ExprSyntax::TypeInfoPtr(n) => {
            let target = diagnostics.unwrap(resolve::resolve_type(
                compilation,
                &n.scope,
                &n.target,
            ));
            ExprSema::TypeInfoPtr(Rc::new(TypeInfoPtrExprSema {
                location: n.location.clone(),
                target,
                ty: natives.ptr.clone(),
            }))
        }

        ExprSyntax::Box_(n) => {
            let inner = diagnostics.unwrap(bind_expr(compilation, &n.expr));
            let ty = compilation
                .types
                .modified(inner.type_info().ty, TypeModifier::StrongPtr);
            ExprSema::Box_(Rc::new(BoxExprSema {
                location: n.location.clone(),
                expr: inner,
                ty,
            }))
        }

        ExprSyntax::Unbox(n) => {
            let inner = diagnostics.unwrap(bind_expr(compilation, &n.expr));
            let ty = strip(&inner.type_info().ty, TypeModifier::StrongPtr)
                .unwrap_or_else(|| natives.error_type.clone());
            ExprSema::Unbox(Rc::new(UnboxExprSema {
                location: n.location.clone(),
                expr: inner,
                ty,
            }))
        }

        ExprSyntax::Lock(n) => {
            let inner = diagnostics.unwrap(bind_expr(compilation, &n.expr));
            let ty = strip(&inner.type_info().ty, TypeModifier::WeakPtr)
                .map(|referent| compilation.types.modified(referent, TypeModifier::StrongPtr))
                .unwrap_or_else(|| natives.error_type.clone());
            ExprSema::Lock(Rc::new(LockExprSema {
                location: n.location.clone(),
                expr: inner,
                ty,
            }))
        }

        ExprSyntax::And(n) => ExprSema::And(Rc::new(AndExprSema {
            location: n.location.clone(),
            lhs: diagnostics.unwrap(bind_expr(compilation, &n.lhs)),
            rhs: diagnostics.unwrap(bind_expr(compilation, &n.rhs)),
            ty: natives.bool_.clone(),
        })),

        ExprSyntax::Or(n) => ExprSema::Or(Rc::new(OrExprSema {
            location: n.location.clone(),
            lhs: diagnostics.unwrap(bind_expr(compilation, &n.lhs)),
            rhs: diagnostics.unwrap(bind_expr(compilation, &n.rhs)),
            ty: natives.bool_.clone(),
        })),

        ExprSyntax::LogicalNegation(n) => {
            ExprSema::LogicalNegation(Rc::new(LogicalNegationExprSema {
                location: n.location.clone(),
                expr: diagnostics.unwrap(bind_expr(compilation, &n.expr)),
                ty: natives.bool_.clone(),
            }))
        }

        ExprSyntax::UserUnary(n) => {
            let operand = diagnostics.unwrap(bind_expr(compilation, &n.expr));
            let op_function = lookup_unary_operator(
                compilation,
                n.op,
                &operand,
                &n.location,
                &mut diagnostics,
            );
            ExprSema::UserUnary(Rc::new(UserUnaryExprSema {
                location: n.location.clone(),
                expr: operand,
                op_function,
            }))
        }

        ExprSyntax::UserBinary(n) => {
            let lhs = diagnostics.unwrap(bind_expr(compilation, &n.lhs));
            let rhs = diagnostics.unwrap(bind_expr(compilation, &n.rhs));
            let op_function = lookup_binary_operator(
                compilation,
                n.op,
                &lhs,
                &rhs,
                &n.location,
                &mut diagnostics,
            );
            ExprSema::UserBinary(Rc::new(UserBinaryExprSema {
                location: n.location.clone(),
                lhs,
                rhs,
                op_function,
            }))
        }
    };

    Diagnosed::new(bound, diagnostics)
}

fn literal_type(compilation: &Compilation, kind: LiteralKind) -> (Rc<Symbol>, bool) {
    let natives = &compilation.natives;
    match kind {
        LiteralKind::Int8 => (natives.int8.clone(), false),
        LiteralKind::Int16 => (natives.int16.clone(), false),
        LiteralKind::Int32 => (natives.int32.clone(), false),
        LiteralKind::Int64 => (natives.int64.clone(), false),
        LiteralKind::UInt8 => (natives.uint8.clone(), false),
        LiteralKind::UInt16 => (natives.uint16.clone(), false),
        LiteralKind::UInt32 => (natives.uint32.clone(), false),
        LiteralKind::UInt64 => (natives.uint64.clone(), false),
        LiteralKind::Int => (natives.int.clone(), true),
        LiteralKind::Float32 => (natives.float32.clone(), false),
        LiteralKind::Float64 => (natives.float64.clone(), false),
        LiteralKind::String => (natives.string.clone(), false),
        LiteralKind::True | LiteralKind::False => (natives.bool_.clone(), false),
    }
}

fn strip(ty: &Rc<Symbol>, modifier: TypeModifier) -> Option<Rc<Symbol>> {
    match &ty.kind {
        SymbolKind::ModifiedType(m) if m.modifier == modifier => Some(Rc::clone(&m.inner)),
        _ => None,
    }
}

/// Peel references and strong pointers down to the nominal receiver type
/// used for member and operator lookup.
fn peel_receiver(ty: &Rc<Symbol>) -> Rc<Symbol> {
    match &ty.unalias().kind {
        SymbolKind::ModifiedType(m)
            if matches!(
                m.modifier,
                TypeModifier::Ref | TypeModifier::StrongPtr | TypeModifier::DynStrongPtr
            ) =>
        {
            peel_receiver(&m.inner)
        }
        _ => ty.unalias(),
    }
}

fn bind_field_access(
    compilation: &Compilation,
    n: &crate::syntax::exprs::MemberAccessExprSyntax,
    receiver: ExprSema,
    diagnostics: &mut DiagnosticBag,
) -> ExprSema {
    let receiver_ty = peel_receiver(&receiver.type_info().ty);

    let field = receiver_ty
        .as_struct()
        .and_then(|s| {
            s.fields
                .borrow()
                .iter()
                .find(|f| f.name.name == n.member.name)
                .map(Rc::clone)
        });

    let field = match field {
        Some(field) => {
            if let Some(defining_scope) = field.defining_scope() {
                if !defining_scope.is_accessible_from(&n.scope, field.access) {
                    diagnostics.add(Diagnostic::error(
                        DiagnosticKind::InaccessibleSymbol,
                        n.member.location.clone(),
                        format!("field '{}' is private", n.member.name),
                    ));
                }
            }
            field
        }
        None => {
            if !receiver_ty.is_error() {
                diagnostics.add(Diagnostic::error(
                    DiagnosticKind::UndefinedSymbolRef,
                    n.member.location.clone(),
                    format!(
                        "no field '{}' on '{}'",
                        n.member.name, receiver_ty.name.name
                    ),
                ));
            }
            error_symbol(ErrorCategory::Variable)
        }
    };

    ExprSema::FieldAccess(Rc::new(FieldAccessExprSema {
        location: n.location.clone(),
        expr: receiver,
        field,
    }))
}

fn bind_call(
    compilation: &Compilation,
    n: &crate::syntax::exprs::CallExprSyntax,
) -> Diagnosed<ExprSema> {
    let mut diagnostics = DiagnosticBag::new();

    let args = n
        .args
        .iter()
        .map(|a| diagnostics.unwrap(bind_expr(compilation, a)))
        .collect::<Vec<_>>();

    let bound = match &n.callee {
        // `path(...)` is a static call
        ExprSyntax::LiteralSymbol(callee) => {
            let function = resolve_static_callee(
                compilation,
                callee,
                &args,
                &n.location,
                &mut diagnostics,
            );
            ExprSema::StaticCall(Rc::new(StaticCallExprSema {
                location: n.location.clone(),
                function,
                args,
            }))
        }

        // `expr.name(...)` is an instance call through the receiver type
        ExprSyntax::MemberAccess(callee) => {
            let receiver = diagnostics.unwrap(bind_expr(compilation, &callee.expr));
            let function = resolve_method(
                compilation,
                &receiver,
                &callee.member.name,
                args.len(),
                &callee.member.location,
                &mut diagnostics,
            );
            ExprSema::InstanceCall(Rc::new(InstanceCallExprSema {
                location: n.location.clone(),
                receiver,
                function,
                args,
            }))
        }

        other => {
            diagnostics.add(Diagnostic::error(
                DiagnosticKind::IncorrectSymbolCategory,
                other.location(),
                "this expression is not callable",
            ));
            ExprSema::StaticCall(Rc::new(StaticCallExprSema {
                location: n.location.clone(),
                function: error_symbol(ErrorCategory::Function),
                args,
            }))
        }
    };

    Diagnosed::new(bound, diagnostics)
}

fn resolve_static_callee(
    compilation: &Compilation,
    callee: &crate::syntax::exprs::LiteralSymbolExprSyntax,
    args: &[ExprSema],
    location: &SrcLocation,
    diagnostics: &mut DiagnosticBag,
) -> Rc<Symbol> {
    let overloads = diagnostics.unwrap(resolve::resolve_callable_overloads(
        compilation,
        &callee.scope,
        &callee.name,
    ));
    if overloads.is_empty() {
        return error_symbol(ErrorCategory::Function);
    }

    let chosen = select_overload(&overloads, args, &callee.name, location, diagnostics);
    let Some(chosen) = chosen else {
        return error_symbol(ErrorCategory::Function);
    };

    instantiate_if_generic(
        compilation,
        chosen,
        callee.name.last(),
        &callee.scope,
        args,
        location,
        diagnostics,
    )
}

/// Pick among overloads by arity, then by exact argument types.
fn select_overload(
    overloads: &[Rc<Symbol>],
    args: &[ExprSema],
    name: &SymbolName,
    location: &SrcLocation,
    diagnostics: &mut DiagnosticBag,
) -> Option<Rc<Symbol>> {
    let arity_matches = overloads
        .iter()
        .filter(|f| callable_arity(f) == args.len())
        .cloned()
        .collect::<Vec<_>>();

    if arity_matches.is_empty() {
        diagnostics.add(Diagnostic::error(
            DiagnosticKind::TypeMismatch,
            location.clone(),
            format!(
                "no overload of '{}' takes {} argument(s)",
                name.last().name.name,
                args.len()
            ),
        ));
        return None;
    }
    if arity_matches.len() == 1 {
        return arity_matches.into_iter().next();
    }

    let arg_types = args.iter().map(|a| a.type_info().ty).collect::<Vec<_>>();
    let exact = arity_matches
        .iter()
        .filter(|f| {
            callable_param_types(f, 0)
                .iter()
                .zip(arg_types.iter())
                .all(|(p, a)| crate::typeck::types_agree(p, a))
        })
        .cloned()
        .collect::<Vec<_>>();

    match exact.len() {
        1 => exact.into_iter().next(),
        0 => arity_matches.into_iter().next(),
        _ => {
            diagnostics.add(Diagnostic::error(
                DiagnosticKind::AmbiguousSymbolRef,
                location.clone(),
                format!("ambiguous call to '{}'", name.last().name.name),
            ));
            None
        }
    }
}

fn callable_arity(function: &Rc<Symbol>) -> usize {
    match &function.kind {
        SymbolKind::Function(f) => f.signature.arity(),
        SymbolKind::Prototype(p) => p.signature.arity(),
        _ => 0,
    }
}

fn callable_param_types(function: &Rc<Symbol>, skip: usize) -> Vec<Rc<Symbol>> {
    let types = match &function.kind {
        SymbolKind::Function(f) => f.signature.param_types(),
        SymbolKind::Prototype(p) => p.signature.param_types(),
        _ => vec![],
    };
    types.into_iter().skip(skip).collect()
}

/// Resolve the instance for a generic callable: explicit `[args]` win,
/// otherwise arguments are deduced from the call site.
fn instantiate_if_generic(
    compilation: &Compilation,
    function: Rc<Symbol>,
    section: &SymbolNameSection,
    call_scope: &Rc<crate::scope::Scope>,
    args: &[ExprSema],
    location: &SrcLocation,
    diagnostics: &mut DiagnosticBag,
) -> Rc<Symbol> {
    if !function.is_generic() {
        return function;
    }

    let type_args = if section.type_args.is_empty() {
        let arg_types = args.iter().map(|a| a.type_info().ty).collect::<Vec<_>>();
        diagnostics.unwrap(template::deduce_type_args(
            compilation,
            &function,
            &arg_types,
            location,
        ))
    } else {
        // resolve_callable_overloads leaves trailing-section type args to
        // the call site
        section
            .type_args
            .iter()
            .map(|arg| {
                diagnostics.unwrap(resolve::resolve_type(compilation, call_scope, arg))
            })
            .collect()
    };

    diagnostics.unwrap(template::instantiate(
        compilation,
        &function,
        &type_args,
        location,
    ))
}

fn resolve_method(
    compilation: &Compilation,
    receiver: &ExprSema,
    name: &str,
    arg_count: usize,
    location: &SrcLocation,
    diagnostics: &mut DiagnosticBag,
) -> Rc<Symbol> {
    let receiver_ty = peel_receiver(&receiver.type_info().ty);
    if receiver_ty.is_error() {
        return error_symbol(ErrorCategory::Function);
    }

    let candidates = find_methods(compilation, &receiver_ty, name);
    let matching = candidates
        .iter()
        // the receiver occupies the self slot
        .filter(|f| callable_arity(f) == arg_count + 1)
        .cloned()
        .collect::<Vec<_>>();

    match matching.len() {
        0 => {
            diagnostics.add(Diagnostic::error(
                DiagnosticKind::UndefinedSymbolRef,
                location.clone(),
                format!("no method '{}' on '{}'", name, receiver_ty.name.name),
            ));
            error_symbol(ErrorCategory::Function)
        }
        1 => matching.into_iter().next().unwrap(),
        _ => {
            diagnostics.add(Diagnostic::error(
                DiagnosticKind::AmbiguousSymbolRef,
                location.clone(),
                format!("ambiguous call to method '{name}'"),
            ));
            error_symbol(ErrorCategory::Function)
        }
    }
}

/// Instance members reachable on a type: impl functions for nominal
/// types, trait prototypes for type parameters (via their constraints)
/// and trait objects.
fn find_methods(compilation: &Compilation, ty: &Rc<Symbol>, name: &str) -> Vec<Rc<Symbol>> {
    match &ty.kind {
        SymbolKind::Struct(_) => impl_functions(compilation, ty, name, true),
        SymbolKind::Trait(t) => t
            .prototypes
            .borrow()
            .iter()
            .filter(|p| p.name.name == name)
            .cloned()
            .collect(),
        SymbolKind::TypeParam(tp) => tp
            .constraints
            .borrow()
            .iter()
            .flat_map(|constraint| match &constraint.kind {
                SymbolKind::Trait(t) => t
                    .prototypes
                    .borrow()
                    .iter()
                    .filter(|p| p.name.name == name)
                    .cloned()
                    .collect::<Vec<_>>(),
                _ => vec![],
            })
            .collect(),
        _ => vec![],
    }
}

fn impl_functions(
    compilation: &Compilation,
    ty: &Rc<Symbol>,
    name: &str,
    instance_only: bool,
) -> Vec<Rc<Symbol>> {
    compilation
        .impls
        .borrow()
        .iter()
        .filter_map(|impl_symbol| match &impl_symbol.kind {
            SymbolKind::InherentImpl(data) | SymbolKind::TraitImpl(data) => {
                if data.self_type.borrow().unalias().is_same(ty) {
                    Some(data.functions.borrow().clone())
                } else {
                    None
                }
            }
            _ => None,
        })
        .flatten()
        .filter(|f| f.name.name == name)
        .filter(|f| {
            !instance_only
                || matches!(
                    &f.kind,
                    SymbolKind::Function(data) if data.category == FunctionCategory::Instance
                )
        })
        .collect()
}

fn lookup_unary_operator(
    compilation: &Compilation,
    op: crate::lexer::TokenKind,
    operand: &ExprSema,
    location: &SrcLocation,
    diagnostics: &mut DiagnosticBag,
) -> Rc<Symbol> {
    let Some(op_name) = operator_function_name(op, 1) else {
        return error_symbol(ErrorCategory::Function);
    };
    let operand_ty = peel_receiver(&operand.type_info().ty);
    if operand_ty.is_error() {
        return error_symbol(ErrorCategory::Function);
    }

    let candidates = impl_functions(compilation, &operand_ty, op_name, false)
        .into_iter()
        .filter(|f| callable_arity(f) == 1)
        .collect::<Vec<_>>();

    match candidates.into_iter().next() {
        Some(function) => function,
        None => {
            diagnostics.add(Diagnostic::error(
                DiagnosticKind::UndefinedSymbolRef,
                location.clone(),
                format!(
                    "no operator {:?} for '{}'",
                    op, operand_ty.name.name
                ),
            ));
            error_symbol(ErrorCategory::Function)
        }
    }
}

fn lookup_binary_operator(
    compilation: &Compilation,
    op: crate::lexer::TokenKind,
    lhs: &ExprSema,
    rhs: &ExprSema,
    location: &SrcLocation,
    diagnostics: &mut DiagnosticBag,
) -> Rc<Symbol> {
    let Some(op_name) = operator_function_name(op, 2) else {
        return error_symbol(ErrorCategory::Function);
    };
    let lhs_ty = peel_receiver(&lhs.type_info().ty);
    let rhs_ty = peel_receiver(&rhs.type_info().ty);
    if lhs_ty.is_error() || rhs_ty.is_error() {
        return error_symbol(ErrorCategory::Function);
    }

    let candidates = impl_functions(compilation, &lhs_ty, op_name, false)
        .into_iter()
        .filter(|f| callable_arity(f) == 2)
        .collect::<Vec<_>>();

    // exact match on the right operand picks among overloads
    let exact = candidates
        .iter()
        .filter(|f| {
            callable_param_types(f, 1)
                .first()
                .map(|p| crate::typeck::types_agree(&peel_receiver(p), &rhs_ty))
                .unwrap_or(false)
        })
        .cloned()
        .collect::<Vec<_>>();

    match exact.into_iter().next().or_else(|| candidates.into_iter().next()) {
        Some(function) => function,
        None => {
            diagnostics.add(Diagnostic::error(
                DiagnosticKind::UndefinedSymbolRef,
                location.clone(),
                format!(
                    "no operator {:?} for '{}' and '{}'",
                    op, lhs_ty.name.name, rhs_ty.name.name
                ),
            ));
            error_symbol(ErrorCategory::Function)
        }
    }
}

fn bind_struct_construction(
    compilation: &Compilation,
    n: &crate::syntax::exprs::StructConstructionExprSyntax,
) -> Diagnosed<ExprSema> {
    let mut diagnostics = DiagnosticBag::new();

    let resolved = diagnostics.unwrap(resolve::resolve_symbol(
        compilation,
        &n.scope,
        &n.type_name,
        SymbolCategory::Type,
    ));
    let struct_symbol = resolved.unalias();

    let fields = match struct_symbol.as_struct() {
        Some(data) => data.fields.borrow().clone(),
        None => {
            if !struct_symbol.is_error() {
                diagnostics.add(Diagnostic::error(
                    DiagnosticKind::IncorrectSymbolType,
                    n.type_name.location.clone(),
                    format!("'{}' is not a struct", struct_symbol.name.name),
                ));
            }
            vec![]
        }
    };

    // each argument matches a field by name; anything else diagnoses
    let mut bound_args: Vec<Option<ExprSema>> = vec![None; fields.len()];
    for (arg_name, arg_expr) in &n.args {
        let field_index = fields.iter().position(|f| f.name.name == arg_name.name);

        let bound = match arg_expr {
            Some(expr) => diagnostics.unwrap(bind_expr(compilation, expr)),
            // field-init shorthand reads the same-named variable
            None => {
                let name = SymbolName {
                    global: false,
                    sections: vec![SymbolNameSection::plain(arg_name.clone())],
                    location: arg_name.location.clone(),
                };
                let symbol = diagnostics.unwrap(resolve::resolve_symbol(
                    compilation,
                    &n.scope,
                    &name,
                    SymbolCategory::Value,
                ));
                ExprSema::SymbolRef(Rc::new(SymbolRefExprSema {
                    location: arg_name.location.clone(),
                    symbol,
                }))
            }
        };

        match field_index {
            Some(index) => {
                if bound_args[index].is_some() {
                    diagnostics.add(Diagnostic::error(
                        DiagnosticKind::DuplicateStructField,
                        arg_name.location.clone(),
                        format!("field '{}' given twice", arg_name.name),
                    ));
                } else {
                    bound_args[index] = Some(bound);
                }
            }
            None => {
                if !struct_symbol.is_error() {
                    diagnostics.add(Diagnostic::error(
                        DiagnosticKind::UnknownStructField,
                        arg_name.location.clone(),
                        format!(
                            "'{}' has no field '{}'",
                            struct_symbol.name.name, arg_name.name
                        ),
                    ));
                }
            }
        }
    }

    let missing = fields
        .iter()
        .zip(bound_args.iter())
        .filter(|(_, arg)| arg.is_none())
        .map(|(field, _)| field.name.name.clone())
        .collect::<Vec<_>>();
    if !missing.is_empty() && !struct_symbol.is_error() {
        diagnostics.add(Diagnostic::error(
            DiagnosticKind::MissingStructFields,
            n.location.clone(),
            format!("missing field(s) {}", missing.join(", ")),
        ));
    }

    let args = bound_args
        .into_iter()
        .map(|arg| {
            arg.unwrap_or_else(|| {
                ExprSema::SymbolRef(Rc::new(SymbolRefExprSema {
                    location: n.location.clone(),
                    symbol: error_symbol(ErrorCategory::Variable),
                }))
            })
        })
        .collect();

    Diagnosed::new(
        ExprSema::StructConstruction(Rc::new(StructConstructionExprSema {
            location: n.location.clone(),
            struct_symbol: if struct_symbol.as_struct().is_some() {
                struct_symbol
            } else {
                error_symbol(ErrorCategory::Type)
            },
            args,
        })),
        diagnostics,
    )
}
