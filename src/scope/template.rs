//! Template instantiation and argument deduction.
//!
//! Instances are cached per compilation, keyed by the generic symbol and
//! the exact type-argument tuple: asking twice for `id[i32]` yields the
//! same function symbol. Generic bodies are checked once against their
//! opaque type params; an instance carries the substituted signature the
//! call site needs.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::compilation::Compilation;
use crate::diagnostics::{Diagnosed, Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::source::SrcLocation;

use super::symbol::{
    FieldSymbol, FunctionSymbol, ParamSymbol, Signature, StructSymbol, Symbol, SymbolKind,
};
use super::ty::error_symbol;
use super::symbol::ErrorCategory;

#[derive(Default)]
pub struct TemplateCache {
    instances: RefCell<HashMap<(usize, Vec<usize>), Rc<Symbol>>>,
}

impl TemplateCache {
    pub fn new() -> TemplateCache {
        TemplateCache::default()
    }

    pub fn get(&self, generic: &Rc<Symbol>, args: &[Rc<Symbol>]) -> Option<Rc<Symbol>> {
        let key = cache_key(generic, args);
        self.instances.borrow().get(&key).map(Rc::clone)
    }

    pub fn insert(&self, generic: &Rc<Symbol>, args: &[Rc<Symbol>], instance: Rc<Symbol>) {
        let key = cache_key(generic, args);
        self.instances.borrow_mut().insert(key, instance);
    }

    pub fn len(&self) -> usize {
        self.instances.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.borrow().is_empty()
    }
}

fn cache_key(generic: &Rc<Symbol>, args: &[Rc<Symbol>]) -> (usize, Vec<usize>) {
    (generic.id(), args.iter().map(|a| a.id()).collect())
}

/// Produce (or fetch) the instance of a generic symbol for the given type
/// arguments.
pub fn instantiate(
    compilation: &Compilation,
    generic: &Rc<Symbol>,
    args: &[Rc<Symbol>],
    location: &SrcLocation,
) -> Diagnosed<Rc<Symbol>> {
    let mut diagnostics = DiagnosticBag::new();

    let type_params = match &generic.kind {
        SymbolKind::Function(f) => f.type_params.borrow().clone(),
        SymbolKind::Struct(s) => s.type_params.borrow().clone(),
        SymbolKind::Trait(t) => t.type_params.borrow().clone(),
        _ => {
            diagnostics.add(Diagnostic::error(
                DiagnosticKind::UndefinedTemplateInstanceRef,
                location.clone(),
                format!("'{}' cannot be instantiated", generic.name.name),
            ));
            return Diagnosed::new(Rc::clone(generic), diagnostics);
        }
    };

    if args.len() > type_params.len() {
        diagnostics.add(Diagnostic::error(
            DiagnosticKind::TooManyTemplateArgs,
            location.clone(),
            format!(
                "'{}' takes {} type argument(s), {} given",
                generic.name.name,
                type_params.len(),
                args.len()
            ),
        ));
        return Diagnosed::new(error_symbol(ErrorCategory::Type), diagnostics);
    }

    if args.len() < type_params.len() {
        diagnostics.add(Diagnostic::error(
            DiagnosticKind::UnableToDeduceTemplateArgs,
            location.clone(),
            format!(
                "'{}' takes {} type argument(s), {} given",
                generic.name.name,
                type_params.len(),
                args.len()
            ),
        ));
        return Diagnosed::new(error_symbol(ErrorCategory::Type), diagnostics);
    }

    if let Some(cached) = compilation.templates.get(generic, args) {
        return Diagnosed::new(cached, diagnostics);
    }

    let substitution = type_params
        .iter()
        .map(|p| p.id())
        .zip(args.iter().cloned())
        .collect::<HashMap<_, _>>();

    let instance = match &generic.kind {
        SymbolKind::Function(f) => instantiate_function(compilation, generic, f, &substitution),
        SymbolKind::Struct(s) => instantiate_struct(compilation, generic, s, &substitution),
        // trait instances only need identity for constraint checks
        SymbolKind::Trait(_) => Rc::clone(generic),
        _ => unreachable!("checked above"),
    };

    compilation
        .templates
        .insert(generic, args, Rc::clone(&instance));

    Diagnosed::new(instance, diagnostics)
}

fn instantiate_function(
    compilation: &Compilation,
    generic: &Rc<Symbol>,
    function: &FunctionSymbol,
    substitution: &HashMap<usize, Rc<Symbol>>,
) -> Rc<Symbol> {
    let params = function
        .signature
        .params
        .borrow()
        .iter()
        .map(|param| {
            let ty = substitute(compilation, &param_type(param), substitution);
            Symbol::new(
                param.name.clone(),
                param.access,
                SymbolKind::Param(ParamSymbol {
                    index: match &param.kind {
                        SymbolKind::Param(p) => p.index,
                        _ => 0,
                    },
                    ty: RefCell::new(ty),
                }),
            )
        })
        .collect::<Vec<_>>();

    let return_type = substitute(
        compilation,
        &function.signature.return_type.borrow().clone(),
        substitution,
    );

    let instance = Symbol::new(
        generic.name.clone(),
        generic.access,
        SymbolKind::Function(FunctionSymbol {
            category: function.category,
            signature: Signature {
                params: RefCell::new(params),
                return_type: RefCell::new(return_type),
            },
            type_params: RefCell::new(vec![]),
            body_scope: function.body_scope.clone(),
            is_extern: function.is_extern,
            is_implicit: function.is_implicit,
        }),
    );

    *instance.scope.borrow_mut() = generic.scope.borrow().clone();
    instance
}

fn instantiate_struct(
    compilation: &Compilation,
    generic: &Rc<Symbol>,
    strukt: &StructSymbol,
    substitution: &HashMap<usize, Rc<Symbol>>,
) -> Rc<Symbol> {
    let body_scope = match generic.defining_scope() {
        Some(scope) => scope.create_child_anon(),
        None => Rc::clone(&strukt.body_scope),
    };

    let instance = Symbol::new(
        generic.name.clone(),
        generic.access,
        SymbolKind::Struct(StructSymbol {
            body_scope,
            type_params: RefCell::new(vec![]),
            fields: RefCell::new(vec![]),
        }),
    );
    *instance.scope.borrow_mut() = generic.scope.borrow().clone();

    let fields = strukt
        .fields
        .borrow()
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let ty = substitute(
                compilation,
                &field.var_type().unwrap_or_else(|| error_symbol(ErrorCategory::Type)),
                substitution,
            );
            let new_field = Symbol::new(
                field.name.clone(),
                field.access,
                SymbolKind::Field(FieldSymbol {
                    parent_struct: RefCell::new(Rc::downgrade(&instance)),
                    index,
                    ty: RefCell::new(ty),
                }),
            );
            *new_field.scope.borrow_mut() = field.scope.borrow().clone();
            new_field
        })
        .collect::<Vec<_>>();

    if let SymbolKind::Struct(s) = &instance.kind {
        *s.fields.borrow_mut() = fields;
    }

    instance
}

fn param_type(param: &Rc<Symbol>) -> Rc<Symbol> {
    param
        .var_type()
        .unwrap_or_else(|| error_symbol(ErrorCategory::Type))
}

/// Replace type params according to the substitution map, rebuilding
/// modified types through the intern store.
pub fn substitute(
    compilation: &Compilation,
    ty: &Rc<Symbol>,
    substitution: &HashMap<usize, Rc<Symbol>>,
) -> Rc<Symbol> {
    match &ty.kind {
        SymbolKind::TypeParam(_) => substitution
            .get(&ty.id())
            .cloned()
            .unwrap_or_else(|| Rc::clone(ty)),
        SymbolKind::ModifiedType(m) => {
            let inner = substitute(compilation, &m.inner, substitution);
            if inner.is_same(&m.inner) {
                Rc::clone(ty)
            } else {
                compilation.types.modified(inner, m.modifier)
            }
        }
        SymbolKind::TypeAlias(_) | SymbolKind::ImplSelfAlias(_) | SymbolKind::ReimportAlias(_) => {
            substitute(compilation, &ty.unalias(), substitution)
        }
        _ => Rc::clone(ty),
    }
}

/// Deduce missing type arguments of a generic callable from call-site
/// argument types, by unifying each declared parameter type against the
/// corresponding argument type.
pub fn deduce_type_args(
    compilation: &Compilation,
    generic: &Rc<Symbol>,
    arg_types: &[Rc<Symbol>],
    location: &SrcLocation,
) -> Diagnosed<Vec<Rc<Symbol>>> {
    let mut diagnostics = DiagnosticBag::new();

    let (type_params, param_types) = match &generic.kind {
        SymbolKind::Function(f) => (f.type_params.borrow().clone(), f.signature.param_types()),
        _ => (vec![], vec![]),
    };

    let mut bindings: HashMap<usize, Rc<Symbol>> = HashMap::new();

    for (param_type, arg_type) in param_types.iter().zip(arg_types.iter()) {
        unify(
            compilation,
            param_type,
            arg_type,
            &mut bindings,
            &mut diagnostics,
            location,
        );
    }

    let mut deduced = vec![];
    for type_param in &type_params {
        match bindings.get(&type_param.id()) {
            Some(bound) => deduced.push(Rc::clone(bound)),
            None => {
                diagnostics.add(Diagnostic::error(
                    DiagnosticKind::UnableToDeduceTemplateArg,
                    location.clone(),
                    format!(
                        "cannot deduce type argument '{}' of '{}'",
                        type_param.name.name, generic.name.name
                    ),
                ));
                deduced.push(error_symbol(ErrorCategory::Type));
            }
        }
    }

    Diagnosed::new(deduced, diagnostics)
}

fn unify(
    compilation: &Compilation,
    pattern: &Rc<Symbol>,
    actual: &Rc<Symbol>,
    bindings: &mut HashMap<usize, Rc<Symbol>>,
    diagnostics: &mut DiagnosticBag,
    location: &SrcLocation,
) {
    match &pattern.kind {
        SymbolKind::TypeParam(_) => {
            if let Some(existing) = bindings.get(&pattern.id()) {
                if !existing.is_same(actual) && !existing.is_error() && !actual.is_error() {
                    diagnostics.add(Diagnostic::error(
                        DiagnosticKind::TemplateArgDeductionConflict,
                        location.clone(),
                        format!(
                            "conflicting deductions for type parameter '{}': '{}' vs '{}'",
                            pattern.name.name, existing.name.name, actual.name.name
                        ),
                    ));
                }
                return;
            }
            bindings.insert(pattern.id(), Rc::clone(actual));
        }
        SymbolKind::ModifiedType(pattern_modified) => match &actual.kind {
            SymbolKind::ModifiedType(actual_modified)
                if pattern_modified.modifier == actual_modified.modifier =>
            {
                unify(
                    compilation,
                    &pattern_modified.inner,
                    &actual_modified.inner,
                    bindings,
                    diagnostics,
                    location,
                );
            }
            // `&T` patterns also match plain values: the callee receives a
            // reference the conversion layer inserts
            _ if pattern_modified.modifier == super::symbol::TypeModifier::Ref => {
                unify(
                    compilation,
                    &pattern_modified.inner,
                    actual,
                    bindings,
                    diagnostics,
                    location,
                );
            }
            _ => {}
        },
        _ => {}
    }
}
