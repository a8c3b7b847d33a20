//! Name resolution.
//!
//! Resolution is category-directed: callers say what shape of symbol they
//! expect (a type, a value, a callable, a scope provider) and resolution
//! reports `IncorrectSymbolCategory` when the name exists but with the
//! wrong shape. Every failure path still produces a symbol — the canonical
//! error symbol of the expected category — so downstream passes never see
//! a hole.

use std::rc::Rc;

use crate::compilation::Compilation;
use crate::diagnostics::{Diagnosed, Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::syntax::name::{SymbolName, SymbolNameSection, TypeName};

use super::symbol::{ErrorCategory, FunctionCategory, Symbol, SymbolKind};
use super::template;
use super::ty::error_symbol;
use super::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolCategory {
    /// Structs, traits, type params, aliases.
    Type,
    /// Anything a value expression may name: vars, params, fields through
    /// member access, statically-called functions.
    Value,
    /// Functions and prototypes.
    Callable,
    /// Modules and other path segments.
    ScopeProvider,
    Any,
}

impl SymbolCategory {
    fn matches(&self, symbol: &Rc<Symbol>) -> bool {
        match self {
            SymbolCategory::Type => symbol.is_type(),
            SymbolCategory::Callable => matches!(
                symbol.kind,
                SymbolKind::Function(_) | SymbolKind::Prototype(_) | SymbolKind::Error(_)
            ),
            SymbolCategory::Value => matches!(
                symbol.kind,
                SymbolKind::GlobalVar(_)
                    | SymbolKind::LocalVar(_)
                    | SymbolKind::Param(_)
                    | SymbolKind::SelfParam(_)
                    | SymbolKind::Field(_)
                    | SymbolKind::Function(_)
                    | SymbolKind::Error(_)
            ),
            SymbolCategory::ScopeProvider => symbol.provides_scope() || symbol.is_error(),
            SymbolCategory::Any => true,
        }
    }

    fn error_category(&self) -> ErrorCategory {
        match self {
            SymbolCategory::Type => ErrorCategory::Type,
            SymbolCategory::Callable => ErrorCategory::Function,
            SymbolCategory::Value => ErrorCategory::Variable,
            SymbolCategory::ScopeProvider => ErrorCategory::Module,
            SymbolCategory::Any => ErrorCategory::Type,
        }
    }
}

/// Resolve a full path from `scope`, honoring `::`-absolute names, access
/// modifiers, and template arguments on any section.
pub fn resolve_symbol(
    compilation: &Compilation,
    scope: &Rc<Scope>,
    name: &SymbolName,
    category: SymbolCategory,
) -> Diagnosed<Rc<Symbol>> {
    let mut diagnostics = DiagnosticBag::new();

    let fallback = || error_symbol(category.error_category());

    let mut candidates = if name.global {
        scope.root().lookup_local(&name.sections[0].name.name)
    } else {
        scope.lookup(&name.sections[0].name.name)
    };

    // walk intermediate sections through scope providers
    let mut section_index = 0;
    while section_index + 1 < name.sections.len() {
        let section = &name.sections[section_index];
        let provider = match pick_single(
            compilation,
            scope,
            section,
            candidates,
            SymbolCategory::ScopeProvider,
            &mut diagnostics,
        ) {
            Some(symbol) => symbol,
            None => return Diagnosed::new(fallback(), diagnostics),
        };

        let Some(inner_scope) = provider.unalias().provided_scope() else {
            return Diagnosed::new(fallback(), diagnostics);
        };

        section_index += 1;
        candidates = inner_scope.lookup_local(&name.sections[section_index].name.name);
    }

    let last = name.last();
    match pick_single(compilation, scope, last, candidates, category, &mut diagnostics) {
        Some(symbol) => {
            if category == SymbolCategory::Value && is_instance_member(&symbol) {
                diagnostics.add(Diagnostic::error(
                    DiagnosticKind::NonSelfScopedSymbolScopeAccess,
                    last.name.location.clone(),
                    format!(
                        "instance {} '{}' is only reachable through member access",
                        symbol.kind_name(),
                        last.name.name
                    ),
                ));
                return Diagnosed::new(fallback(), diagnostics);
            }
            Diagnosed::new(symbol, diagnostics)
        }
        None => Diagnosed::new(fallback(), diagnostics),
    }
}

fn is_instance_member(symbol: &Rc<Symbol>) -> bool {
    match &symbol.kind {
        SymbolKind::Field(_) => true,
        SymbolKind::Function(f) => f.category == FunctionCategory::Instance,
        _ => false,
    }
}

/// Narrow a candidate list to one symbol of the expected category,
/// applying access checks and template instantiation. `None` means the
/// failure has already been diagnosed.
fn pick_single(
    compilation: &Compilation,
    user_scope: &Rc<Scope>,
    section: &SymbolNameSection,
    candidates: Vec<Rc<Symbol>>,
    category: SymbolCategory,
    diagnostics: &mut DiagnosticBag,
) -> Option<Rc<Symbol>> {
    if candidates.is_empty() {
        diagnostics.add(Diagnostic::error(
            DiagnosticKind::UndefinedSymbolRef,
            section.name.location.clone(),
            format!("undefined symbol '{}'", section.name.name),
        ));
        return None;
    }

    let matching = candidates
        .iter()
        .filter(|c| category.matches(c))
        .cloned()
        .collect::<Vec<_>>();

    if matching.is_empty() {
        diagnostics.add(Diagnostic::error(
            DiagnosticKind::IncorrectSymbolCategory,
            section.name.location.clone(),
            format!(
                "'{}' is a {}, which is not usable here",
                section.name.name,
                candidates[0].kind_name()
            ),
        ));
        return None;
    }

    if matching.len() > 1 {
        diagnostics.add(Diagnostic::error(
            DiagnosticKind::AmbiguousSymbolRef,
            section.name.location.clone(),
            format!("ambiguous reference to '{}'", section.name.name),
        ));
        return None;
    }

    let symbol = matching.into_iter().next().unwrap();

    if let Some(defining_scope) = symbol.defining_scope() {
        if !defining_scope.is_accessible_from(user_scope, symbol.access) {
            diagnostics.add(Diagnostic::error(
                DiagnosticKind::InaccessibleSymbol,
                section.name.location.clone(),
                format!("'{}' is private", section.name.name),
            ));
            // resolution still proceeds with the symbol: the reference is
            // meaningful, just forbidden
        }
    }

    if !section.type_args.is_empty() {
        if !symbol.is_generic() {
            diagnostics.add(Diagnostic::error(
                DiagnosticKind::UndefinedTemplateInstanceRef,
                section.name.location.clone(),
                format!("'{}' is not generic", section.name.name),
            ));
            return Some(symbol);
        }

        let mut args = vec![];
        for arg in &section.type_args {
            args.push(diagnostics.unwrap(resolve_type(compilation, user_scope, arg)));
        }

        let instance =
            diagnostics.unwrap(template::instantiate(compilation, &symbol, &args, &section.name.location));
        return Some(instance);
    }

    Some(symbol)
}

/// Resolve a written type name: the path, then the modifier chain applied
/// innermost-first.
pub fn resolve_type(
    compilation: &Compilation,
    scope: &Rc<Scope>,
    type_name: &TypeName,
) -> Diagnosed<Rc<Symbol>> {
    let mut diagnostics = DiagnosticBag::new();

    let base = diagnostics.unwrap(resolve_symbol(
        compilation,
        scope,
        &type_name.name,
        SymbolCategory::Type,
    ));

    let mut ty = base;
    for (modifier, _) in type_name.modifiers.iter().rev() {
        ty = compilation.types.modified(ty, *modifier);
    }

    Diagnosed::new(ty, diagnostics)
}

/// All function overloads a callable path can refer to, for call-site
/// overload selection by arity and argument types.
pub fn resolve_callable_overloads(
    compilation: &Compilation,
    scope: &Rc<Scope>,
    name: &SymbolName,
) -> Diagnosed<Vec<Rc<Symbol>>> {
    let mut diagnostics = DiagnosticBag::new();

    // single-section names can overload; qualified paths resolve the
    // provider chain first
    let candidates = if name.sections.len() == 1 && !name.global {
        scope.lookup(&name.sections[0].name.name)
    } else {
        let provider_name = SymbolName {
            global: name.global,
            sections: name.sections[..name.sections.len() - 1].to_vec(),
            location: name.location.clone(),
        };
        let provider = diagnostics.unwrap(resolve_symbol(
            compilation,
            scope,
            &provider_name,
            SymbolCategory::ScopeProvider,
        ));
        match provider.unalias().provided_scope() {
            Some(inner) => inner.lookup_local(&name.last().name.name),
            None => vec![],
        }
    };

    let callables = candidates
        .into_iter()
        .filter(|c| SymbolCategory::Callable.matches(c))
        .collect::<Vec<_>>();

    if callables.is_empty() {
        diagnostics.add(Diagnostic::error(
            DiagnosticKind::UndefinedSymbolRef,
            name.last().name.location.clone(),
            format!("undefined function '{}'", name.last().name.name),
        ));
    }

    Diagnosed::new(callables, diagnostics)
}
