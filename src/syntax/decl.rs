//! The declaration phase.
//!
//! Symbol creation runs globally sorted by declaration order, so that each
//! stage only ever resolves names created by strictly earlier stages:
//!
//! 1. `BeforeType` — type parameters, modules
//! 2. `Type` — structs and traits themselves
//! 3. `TypeReimport` — re-exports that must see the types of their source
//! 4. `TypeAlias` — the `Self` aliases of impl blocks
//! 5. `AfterType` — fields, functions, prototypes, globals, impls' bodies,
//!    locals, uses
//!
//! The two deliberate exceptions (trait prototypes naming `Self`, impl
//! bodies naming `Self`) are both handled by alias symbols defined when
//! the owning trait/impl is created.

use std::cell::RefCell;
use std::rc::Rc;

use crate::compilation::Compilation;
use crate::diagnostics::{Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::scope::resolve::{self, SymbolCategory};
use crate::scope::symbol::{
    AccessModifier, AliasSymbol, ErrorCategory, FieldSymbol, FunctionCategory, FunctionSymbol,
    ImplSymbol, ModuleSymbol, ParamSymbol, PrototypeSymbol, SelfKind, SelfParamSymbol, Signature,
    StructSymbol, Symbol, SymbolKind, TraitSymbol, TypeModifier, TypeParamSymbol, UseSymbol,
    VarSymbol,
};
use crate::scope::ty::error_symbol;
use crate::scope::Scope;
use crate::source::Ident;

use super::items::{
    FunctionSyntax, ImplSyntax, ItemSyntax, ModSyntax, StructSyntax, TraitSyntax, TypeParamSyntax,
    UseSyntax,
};
use super::stmts::StmtSyntax;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeclOrder {
    BeforeType,
    Type,
    TypeReimport,
    TypeAlias,
    AfterType,
}

enum DeclEntry {
    Mod(Rc<ModSyntax>),
    TypeParam(Rc<TypeParamSyntax>),
    Struct(Rc<StructSyntax>),
    Trait(Rc<TraitSyntax>),
    Use(Rc<UseSyntax>),
    Impl(Rc<ImplSyntax>, bool),
    Function(Rc<FunctionSyntax>),
    Field(Rc<StructSyntax>, usize),
    Prototype(Rc<TraitSyntax>, usize),
    GlobalVar(Rc<super::items::GlobalVarSyntax>),
    LocalVar(Rc<super::stmts::VarStmtSyntax>),
}

impl DeclEntry {
    fn order(&self) -> DeclOrder {
        match self {
            DeclEntry::Mod(_) | DeclEntry::TypeParam(_) => DeclOrder::BeforeType,
            DeclEntry::Struct(_) | DeclEntry::Trait(_) => DeclOrder::Type,
            DeclEntry::Use(_) => DeclOrder::TypeReimport,
            DeclEntry::Impl(..) => DeclOrder::TypeAlias,
            DeclEntry::Function(_)
            | DeclEntry::Field(..)
            | DeclEntry::Prototype(..)
            | DeclEntry::GlobalVar(_)
            | DeclEntry::LocalVar(_) => DeclOrder::AfterType,
        }
    }

    fn suborder(&self) -> usize {
        match self {
            DeclEntry::Mod(m) => m.scope.nest_level(),
            DeclEntry::Field(_, index) | DeclEntry::Prototype(_, index) => *index,
            _ => 0,
        }
    }
}

pub fn run_decl_phase(
    compilation: &Compilation,
    _package_scope: &Rc<Scope>,
    items: &[ItemSyntax],
) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();

    let mut entries = vec![];
    collect_items(items, &mut entries);
    entries.sort_by_key(|e| (e.order(), e.suborder()));

    for entry in &entries {
        diagnostics.merge(create_symbol(compilation, entry));
    }

    // supertraits may be declared later in the file than their subtraits,
    // so they resolve only after every trait symbol exists
    for entry in &entries {
        if let DeclEntry::Trait(trait_syntax) = entry {
            diagnostics.merge(resolve_supertraits(compilation, trait_syntax));
        }
    }

    diagnostics
}

fn collect_items(items: &[ItemSyntax], entries: &mut Vec<DeclEntry>) {
    for item in items {
        match item {
            ItemSyntax::Mod(m) => {
                entries.push(DeclEntry::Mod(Rc::clone(m)));
                collect_items(&m.items, entries);
            }
            ItemSyntax::Struct(s) => {
                for tp in &s.type_params {
                    entries.push(DeclEntry::TypeParam(Rc::clone(tp)));
                }
                entries.push(DeclEntry::Struct(Rc::clone(s)));
                for index in 0..s.fields.len() {
                    entries.push(DeclEntry::Field(Rc::clone(s), index));
                }
            }
            ItemSyntax::Trait(t) => {
                for tp in &t.type_params {
                    entries.push(DeclEntry::TypeParam(Rc::clone(tp)));
                }
                entries.push(DeclEntry::Trait(Rc::clone(t)));
                for index in 0..t.prototypes.len() {
                    entries.push(DeclEntry::Prototype(Rc::clone(t), index));
                }
            }
            ItemSyntax::Function(f) => collect_function(f, entries),
            ItemSyntax::GlobalVar(g) => entries.push(DeclEntry::GlobalVar(Rc::clone(g))),
            ItemSyntax::InherentImpl(i) => collect_impl(i, false, entries),
            ItemSyntax::TraitImpl(i) => collect_impl(i, true, entries),
            ItemSyntax::Use(u) => entries.push(DeclEntry::Use(Rc::clone(u))),
        }
    }
}

fn collect_impl(impl_syntax: &Rc<ImplSyntax>, is_trait_impl: bool, entries: &mut Vec<DeclEntry>) {
    for tp in &impl_syntax.type_params {
        entries.push(DeclEntry::TypeParam(Rc::clone(tp)));
    }
    entries.push(DeclEntry::Impl(Rc::clone(impl_syntax), is_trait_impl));
    for function in &impl_syntax.functions {
        collect_function(function, entries);
    }
}

fn collect_function(function: &Rc<FunctionSyntax>, entries: &mut Vec<DeclEntry>) {
    for tp in &function.type_params {
        entries.push(DeclEntry::TypeParam(Rc::clone(tp)));
    }
    entries.push(DeclEntry::Function(Rc::clone(function)));
    if let Some(body) = &function.body {
        collect_stmts(&body.stmts, entries);
    }
}

fn collect_stmts(stmts: &[StmtSyntax], entries: &mut Vec<DeclEntry>) {
    for stmt in stmts {
        match stmt {
            StmtSyntax::Var(v) => entries.push(DeclEntry::LocalVar(Rc::clone(v))),
            StmtSyntax::Block(b) => collect_stmts(&b.stmts, entries),
            StmtSyntax::If(i) => {
                for body in &i.bodies {
                    collect_stmts(&body.stmts, entries);
                }
            }
            StmtSyntax::While(w) => collect_stmts(&w.body.stmts, entries),
            _ => {}
        }
    }
}

fn create_symbol(compilation: &Compilation, entry: &DeclEntry) -> DiagnosticBag {
    match entry {
        DeclEntry::Mod(m) => create_module(m),
        DeclEntry::TypeParam(tp) => create_type_param(tp),
        DeclEntry::Struct(s) => create_struct(s),
        DeclEntry::Trait(t) => create_trait(t),
        DeclEntry::Use(u) => create_use(compilation, u),
        DeclEntry::Impl(i, is_trait_impl) => create_impl(compilation, i, *is_trait_impl),
        DeclEntry::Function(f) => create_function(compilation, f),
        DeclEntry::Field(s, index) => create_field(compilation, s, *index),
        DeclEntry::Prototype(t, index) => create_prototype(compilation, t, *index),
        DeclEntry::GlobalVar(g) => create_global_var(compilation, g),
        DeclEntry::LocalVar(v) => create_local_var(compilation, v),
    }
}

/// Modules are partial declarations: a second `a: mod { ... }` merges into
/// the first one's symbol and scope instead of colliding.
fn create_module(mod_syntax: &Rc<ModSyntax>) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();

    let mut scope = Rc::clone(&mod_syntax.scope);
    let mut symbol = None;

    for (i, segment) in mod_syntax.name.iter().enumerate() {
        let is_last = i + 1 == mod_syntax.name.len();
        let access = if is_last {
            mod_syntax.access
        } else {
            AccessModifier::Priv
        };

        let existing = scope
            .lookup_local(&segment.name)
            .into_iter()
            .find(|s| matches!(s.kind, SymbolKind::Module(_)));

        let module = match existing {
            Some(module) => {
                if is_last && module.access != mod_syntax.access {
                    diagnostics.add(Diagnostic::error(
                        DiagnosticKind::MismatchedAccessModifier,
                        segment.location.clone(),
                        format!(
                            "module '{}' redeclared with a different access modifier",
                            segment.name
                        ),
                    ));
                }
                module
            }
            None => {
                let body_scope = if is_last {
                    Rc::clone(&mod_syntax.body_scope)
                } else {
                    find_or_create_module_scope(&scope, &segment.name)
                };
                body_scope.mark_module_body();

                let module = Symbol::new(
                    segment.clone(),
                    access,
                    SymbolKind::Module(ModuleSymbol { body_scope }),
                );
                diagnostics.unwrap(scope.define(module))
            }
        };

        scope = module
            .provided_scope()
            .unwrap_or_else(|| Rc::clone(&scope));
        symbol = Some(module);
    }

    *mod_syntax.symbol.borrow_mut() = symbol;
    diagnostics
}

fn find_or_create_module_scope(parent: &Rc<Scope>, name: &str) -> Rc<Scope> {
    parent
        .find_child(name)
        .unwrap_or_else(|| parent.create_child(name.to_string()))
}

fn create_type_param(tp: &Rc<TypeParamSyntax>) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();

    let symbol = Symbol::new(
        tp.name.clone(),
        AccessModifier::Priv,
        SymbolKind::TypeParam(TypeParamSymbol {
            index: tp.index,
            constraints: RefCell::new(vec![]),
        }),
    );
    let symbol = diagnostics.unwrap(tp.body_scope.define(symbol));

    *tp.symbol.borrow_mut() = Some(symbol);
    diagnostics
}

fn create_struct(struct_syntax: &Rc<StructSyntax>) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();

    let type_params = struct_syntax
        .type_params
        .iter()
        .filter_map(|tp| tp.symbol.borrow().clone())
        .collect::<Vec<_>>();

    let symbol = Symbol::new(
        struct_syntax.name.clone(),
        struct_syntax.access,
        SymbolKind::Struct(StructSymbol {
            body_scope: Rc::clone(&struct_syntax.body_scope),
            type_params: RefCell::new(type_params),
            fields: RefCell::new(vec![]),
        }),
    );
    let symbol = diagnostics.unwrap(struct_syntax.scope.define(symbol));

    *struct_syntax.symbol.borrow_mut() = Some(symbol);
    diagnostics
}

fn create_trait(trait_syntax: &Rc<TraitSyntax>) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();

    let type_params = trait_syntax
        .type_params
        .iter()
        .filter_map(|tp| tp.symbol.borrow().clone())
        .collect::<Vec<_>>();

    let symbol = Symbol::new(
        trait_syntax.name.clone(),
        trait_syntax.access,
        SymbolKind::Trait(TraitSymbol {
            body_scope: Rc::clone(&trait_syntax.body_scope),
            type_params: RefCell::new(type_params),
            prototypes: RefCell::new(vec![]),
            supertraits: RefCell::new(vec![]),
        }),
    );
    let symbol = diagnostics.unwrap(trait_syntax.scope.define(symbol));

    // the `Self` pseudo-type trait prototypes refer to
    let trait_self = Symbol::new(
        Ident::new(trait_syntax.name.location.clone(), "Self"),
        AccessModifier::Priv,
        SymbolKind::TypeParam(TypeParamSymbol {
            index: 0,
            constraints: RefCell::new(vec![Rc::clone(&symbol)]),
        }),
    );
    diagnostics.unwrap(trait_syntax.body_scope.define(trait_self));

    *trait_syntax.symbol.borrow_mut() = Some(symbol);
    diagnostics
}

fn resolve_supertraits(compilation: &Compilation, trait_syntax: &Rc<TraitSyntax>) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();

    let Some(symbol) = trait_syntax.symbol.borrow().clone() else {
        return diagnostics;
    };
    let Some(trait_data) = symbol.as_trait() else {
        return diagnostics;
    };

    let mut supertraits = vec![];
    for name in &trait_syntax.supertraits {
        let resolved = diagnostics.unwrap(resolve::resolve_symbol(
            compilation,
            &trait_syntax.scope,
            name,
            SymbolCategory::Type,
        ));
        if resolved.as_trait().is_none() && !resolved.is_error() {
            diagnostics.add(Diagnostic::error(
                DiagnosticKind::IncorrectSymbolType,
                name.location.clone(),
                format!("'{}' is not a trait", resolved.name.name),
            ));
            continue;
        }
        supertraits.push(resolved);
    }

    *trait_data.supertraits.borrow_mut() = supertraits;
    diagnostics
}

fn create_use(compilation: &Compilation, use_syntax: &Rc<UseSyntax>) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();

    let target = diagnostics.unwrap(resolve::resolve_symbol(
        compilation,
        &use_syntax.scope,
        &use_syntax.target,
        SymbolCategory::Any,
    ));

    let name = use_syntax.target.last().name.clone();
    let symbol = match &target.kind {
        SymbolKind::Trait(_) => Symbol::new(
            name,
            use_syntax.access,
            SymbolKind::Use(UseSymbol {
                used_trait: RefCell::new(target),
            }),
        ),
        _ if target.is_type() => Symbol::new(
            name,
            use_syntax.access,
            SymbolKind::ReimportAlias(AliasSymbol {
                target: RefCell::new(target),
            }),
        ),
        _ => {
            if !target.is_error() {
                diagnostics.add(Diagnostic::error(
                    DiagnosticKind::IncorrectSymbolCategory,
                    use_syntax.target.location.clone(),
                    format!("cannot use a {}", target.kind_name()),
                ));
            }
            return diagnostics;
        }
    };

    let symbol = diagnostics.unwrap(use_syntax.scope.define(symbol));
    *use_syntax.symbol.borrow_mut() = Some(symbol);
    diagnostics
}

fn create_impl(
    compilation: &Compilation,
    impl_syntax: &Rc<ImplSyntax>,
    is_trait_impl: bool,
) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();

    let self_type = diagnostics.unwrap(resolve::resolve_symbol(
        compilation,
        &impl_syntax.body_scope,
        &impl_syntax.self_type_name,
        SymbolCategory::Type,
    ));

    // an impl must target a nominal type, not a trait instantiation
    if self_type.unalias().as_trait().is_some() {
        diagnostics.add(Diagnostic::error(
            DiagnosticKind::IncorrectSymbolCategory,
            impl_syntax.self_type_name.location.clone(),
            format!("cannot implement for trait '{}'", self_type.name.name),
        ));
    }

    let implemented_trait = if is_trait_impl {
        let trait_symbol = diagnostics.unwrap(resolve::resolve_symbol(
            compilation,
            &impl_syntax.body_scope,
            impl_syntax
                .trait_name
                .as_ref()
                .expect("trait impls carry a trait name"),
            SymbolCategory::Type,
        ));
        if trait_symbol.as_trait().is_none() && !trait_symbol.is_error() {
            diagnostics.add(Diagnostic::error(
                DiagnosticKind::IncorrectSymbolType,
                impl_syntax.trait_name.as_ref().unwrap().location.clone(),
                format!("'{}' is not a trait", trait_symbol.name.name),
            ));
        }
        Some(trait_symbol)
    } else {
        None
    };

    // `Self` inside the impl body
    let self_alias = Symbol::new(
        Ident::new(impl_syntax.self_type_name.location.clone(), "Self"),
        AccessModifier::Priv,
        SymbolKind::ImplSelfAlias(AliasSymbol {
            target: RefCell::new(Rc::clone(&self_type)),
        }),
    );
    diagnostics.unwrap(impl_syntax.body_scope.define(self_alias));

    let type_params = impl_syntax
        .type_params
        .iter()
        .filter_map(|tp| tp.symbol.borrow().clone())
        .collect::<Vec<_>>();

    let kind = if is_trait_impl {
        SymbolKind::TraitImpl
    } else {
        SymbolKind::InherentImpl
    };
    let symbol = Symbol::new(
        Ident::new(impl_syntax.location.clone(), "<impl>"),
        AccessModifier::Pub,
        kind(ImplSymbol {
            body_scope: Rc::clone(&impl_syntax.body_scope),
            self_type: RefCell::new(self_type),
            implemented_trait: RefCell::new(implemented_trait),
            functions: RefCell::new(vec![]),
            type_params: RefCell::new(type_params),
        }),
    );
    *symbol.scope.borrow_mut() = Rc::downgrade(&impl_syntax.scope);

    compilation.impls.borrow_mut().push(Rc::clone(&symbol));
    *impl_syntax.symbol.borrow_mut() = Some(symbol);
    diagnostics
}

fn create_function(compilation: &Compilation, function: &Rc<FunctionSyntax>) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();

    let type_params = function
        .type_params
        .iter()
        .filter_map(|tp| tp.symbol.borrow().clone())
        .collect::<Vec<_>>();

    // where-clause constraints attach to the named type param
    for constraint in &function.constraints {
        let target = type_params
            .iter()
            .find(|tp| tp.name.name == constraint.type_param_name.name);
        match target {
            Some(type_param) => {
                if let SymbolKind::TypeParam(data) = &type_param.kind {
                    for trait_name in &constraint.traits {
                        let resolved = diagnostics.unwrap(resolve::resolve_symbol(
                            compilation,
                            &function.body_scope,
                            trait_name,
                            SymbolCategory::Type,
                        ));
                        data.constraints.borrow_mut().push(resolved);
                    }
                }
            }
            None => diagnostics.add(Diagnostic::error(
                DiagnosticKind::ConstrainedNonGenericSymbol,
                constraint.location.clone(),
                format!(
                    "'{}' is not a type parameter of '{}'",
                    constraint.type_param_name.name, function.name.name
                ),
            )),
        }
    }

    let mut params = vec![];

    if let Some(self_param) = &function.self_param {
        if function.is_extern {
            diagnostics.add(Diagnostic::error(
                DiagnosticKind::ExternInstanceFunction,
                self_param.location.clone(),
                "extern functions cannot take self",
            ));
        }

        let self_type = resolve_self_type(compilation, function, self_param.kind);
        let symbol = Symbol::new(
            Ident::new(self_param.location.clone(), "self"),
            AccessModifier::Priv,
            SymbolKind::SelfParam(SelfParamSymbol {
                kind: self_param.kind,
                ty: RefCell::new(self_type),
            }),
        );
        let symbol = diagnostics.unwrap(function.body_scope.define(symbol));
        *self_param.symbol.borrow_mut() = Some(Rc::clone(&symbol));
        params.push(symbol);
    }

    for param in &function.params {
        let ty = diagnostics.unwrap(resolve::resolve_type(
            compilation,
            &function.body_scope,
            &param.type_name,
        ));
        diagnostics.merge(check_sized(compilation, &ty, param));

        let symbol = Symbol::new(
            param.name.clone(),
            AccessModifier::Priv,
            SymbolKind::Param(ParamSymbol {
                index: param.index,
                ty: RefCell::new(ty),
            }),
        );
        let symbol = diagnostics.unwrap(function.body_scope.define(symbol));
        *param.symbol.borrow_mut() = Some(Rc::clone(&symbol));
        params.push(symbol);
    }

    let return_type = diagnostics.unwrap(resolve::resolve_type(
        compilation,
        &function.body_scope,
        &function.return_type,
    ));

    let category = if function.self_param.is_some() {
        FunctionCategory::Instance
    } else {
        FunctionCategory::Static
    };

    let symbol = Symbol::new(
        function.name.clone(),
        function.access,
        SymbolKind::Function(FunctionSymbol {
            category,
            signature: Signature {
                params: RefCell::new(params),
                return_type: RefCell::new(return_type),
            },
            type_params: RefCell::new(type_params),
            body_scope: Some(Rc::clone(&function.body_scope)),
            is_extern: function.is_extern,
            is_implicit: function
                .attributes
                .iter()
                .any(|a| a.name.name == "implicit"),
        }),
    );
    let symbol = diagnostics.unwrap(function.scope.define(symbol));

    // methods register with their impl for member lookup
    if let Some(impl_symbol) = find_owning_impl(compilation, function) {
        match &impl_symbol.kind {
            SymbolKind::InherentImpl(data) | SymbolKind::TraitImpl(data) => {
                data.functions.borrow_mut().push(Rc::clone(&symbol));
            }
            _ => {}
        }
    }

    *function.symbol.borrow_mut() = Some(symbol);
    diagnostics
}

fn resolve_self_type(
    compilation: &Compilation,
    function: &Rc<FunctionSyntax>,
    kind: SelfKind,
) -> Rc<Symbol> {
    let base = function
        .body_scope
        .lookup("Self")
        .into_iter()
        .next()
        .unwrap_or_else(|| error_symbol(ErrorCategory::Type));

    let base = match kind {
        SelfKind::Ref => base,
        SelfKind::StrongPtrRef => compilation.types.modified(base, TypeModifier::StrongPtr),
    };
    compilation.types.modified(base, TypeModifier::Ref)
}

fn find_owning_impl(compilation: &Compilation, function: &Rc<FunctionSyntax>) -> Option<Rc<Symbol>> {
    compilation
        .impls
        .borrow()
        .iter()
        .find(|impl_symbol| match &impl_symbol.kind {
            SymbolKind::InherentImpl(data) | SymbolKind::TraitImpl(data) => {
                Rc::ptr_eq(&data.body_scope, &function.scope)
            }
            _ => false,
        })
        .map(Rc::clone)
}

fn create_field(
    compilation: &Compilation,
    struct_syntax: &Rc<StructSyntax>,
    index: usize,
) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();
    let field = &struct_syntax.fields[index];

    let ty = diagnostics.unwrap(resolve::resolve_type(
        compilation,
        &struct_syntax.body_scope,
        &field.type_name,
    ));
    diagnostics.merge(check_sized(compilation, &ty, field));

    let Some(struct_symbol) = struct_syntax.symbol.borrow().clone() else {
        return diagnostics;
    };

    let symbol = Symbol::new(
        field.name.clone(),
        field.access,
        SymbolKind::Field(FieldSymbol {
            parent_struct: RefCell::new(Rc::downgrade(&struct_symbol)),
            index,
            ty: RefCell::new(ty),
        }),
    );
    let symbol = diagnostics.unwrap(struct_syntax.body_scope.define(symbol));

    if let Some(data) = struct_symbol.as_struct() {
        data.fields.borrow_mut().push(Rc::clone(&symbol));
    }
    *field.symbol.borrow_mut() = Some(symbol);
    diagnostics
}

fn create_prototype(
    compilation: &Compilation,
    trait_syntax: &Rc<TraitSyntax>,
    index: usize,
) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();
    let prototype = &trait_syntax.prototypes[index];

    let mut params = vec![];
    if let Some(self_param) = &prototype.self_param {
        let self_type = trait_syntax
            .body_scope
            .lookup("Self")
            .into_iter()
            .next()
            .unwrap_or_else(|| error_symbol(ErrorCategory::Type));
        let self_type = match self_param.kind {
            SelfKind::Ref => self_type,
            SelfKind::StrongPtrRef => compilation
                .types
                .modified(self_type, TypeModifier::StrongPtr),
        };
        let self_type = compilation.types.modified(self_type, TypeModifier::Ref);

        params.push(Symbol::new(
            Ident::new(self_param.location.clone(), "self"),
            AccessModifier::Priv,
            SymbolKind::SelfParam(SelfParamSymbol {
                kind: self_param.kind,
                ty: RefCell::new(self_type),
            }),
        ));
    }
    for param in &prototype.params {
        let ty = diagnostics.unwrap(resolve::resolve_type(
            compilation,
            &trait_syntax.body_scope,
            &param.type_name,
        ));
        params.push(Symbol::new(
            param.name.clone(),
            AccessModifier::Priv,
            SymbolKind::Param(ParamSymbol {
                index: param.index,
                ty: RefCell::new(ty),
            }),
        ));
    }

    let return_type = diagnostics.unwrap(resolve::resolve_type(
        compilation,
        &trait_syntax.body_scope,
        &prototype.return_type,
    ));

    let Some(trait_symbol) = trait_syntax.symbol.borrow().clone() else {
        return diagnostics;
    };

    let symbol = Symbol::new(
        prototype.name.clone(),
        AccessModifier::Pub,
        SymbolKind::Prototype(PrototypeSymbol {
            parent_trait: RefCell::new(Rc::downgrade(&trait_symbol)),
            index,
            signature: Signature {
                params: RefCell::new(params),
                return_type: RefCell::new(return_type),
            },
            self_kind: prototype.self_param.as_ref().map(|sp| sp.kind),
        }),
    );
    let symbol = diagnostics.unwrap(trait_syntax.body_scope.define(symbol));

    if let Some(data) = trait_symbol.as_trait() {
        data.prototypes.borrow_mut().push(Rc::clone(&symbol));
    }
    *prototype.symbol.borrow_mut() = Some(symbol);
    diagnostics
}

fn create_global_var(
    compilation: &Compilation,
    global: &Rc<super::items::GlobalVarSyntax>,
) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();

    let ty = diagnostics.unwrap(resolve::resolve_type(
        compilation,
        &global.scope,
        &global.type_name,
    ));
    diagnostics.merge(check_sized(compilation, &ty, global));

    let symbol = Symbol::new(
        global.name.clone(),
        global.access,
        SymbolKind::GlobalVar(VarSymbol {
            ty: RefCell::new(ty),
        }),
    );
    let symbol = diagnostics.unwrap(global.scope.define(symbol));
    *global.symbol.borrow_mut() = Some(symbol);
    diagnostics
}

fn create_local_var(
    compilation: &Compilation,
    var: &Rc<super::stmts::VarStmtSyntax>,
) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();

    let ty = diagnostics.unwrap(resolve::resolve_type(
        compilation,
        &var.scope,
        &var.type_name,
    ));
    diagnostics.merge(check_sized(compilation, &ty, var));

    let symbol = Symbol::new(
        var.name.clone(),
        AccessModifier::Priv,
        SymbolKind::LocalVar(VarSymbol {
            ty: RefCell::new(ty),
        }),
    );
    let symbol = diagnostics.unwrap(var.scope.define(symbol));
    *var.symbol.borrow_mut() = Some(symbol);
    diagnostics
}

/// Trait objects are unsized; variables, params and fields must hold them
/// behind a pointer.
fn check_sized<T: HasTypePosition>(_compilation: &Compilation, ty: &Rc<Symbol>, at: &T) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();

    let unaliased = ty.unalias();
    let is_unsized = match &unaliased.kind {
        SymbolKind::Trait(_) => true,
        SymbolKind::ModifiedType(m) => m.modifier == TypeModifier::DynTrait,
        _ => false,
    };

    if is_unsized {
        diagnostics.add(Diagnostic::error(
            DiagnosticKind::ExpectedSizedType,
            at.type_location(),
            format!("'{}' is unsized here", unaliased.name.name),
        ));
    }

    diagnostics
}

trait HasTypePosition {
    fn type_location(&self) -> crate::source::SrcLocation;
}

impl HasTypePosition for Rc<super::items::ParamVarSyntax> {
    fn type_location(&self) -> crate::source::SrcLocation {
        self.type_name.location.clone()
    }
}

impl HasTypePosition for Rc<super::items::FieldVarSyntax> {
    fn type_location(&self) -> crate::source::SrcLocation {
        self.type_name.location.clone()
    }
}

impl HasTypePosition for Rc<super::items::GlobalVarSyntax> {
    fn type_location(&self) -> crate::source::SrcLocation {
        self.type_name.location.clone()
    }
}

impl HasTypePosition for Rc<super::stmts::VarStmtSyntax> {
    fn type_location(&self) -> crate::source::SrcLocation {
        self.type_name.location.clone()
    }
}
