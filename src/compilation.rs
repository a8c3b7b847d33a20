//! The per-compilation context and the phase driver.
//!
//! A [`Compilation`] owns the scope tree, the native type table, the
//! composite-type intern store and the template instantiation cache. It is
//! passed by reference into every phase — there is no global state.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::cfa;
use crate::diagnostics::{Diagnosed, DiagnosticBag};
use crate::lexer::Lexer;
use crate::lowering;
use crate::parser;
use crate::scope::symbol::Symbol;
use crate::scope::template::TemplateCache;
use crate::scope::ty::{NativeTypes, TypeStore};
use crate::scope::Scope;
use crate::sema::FunctionSema;
use crate::source::SrcBuffer;
use crate::syntax::decl;
use crate::syntax::items::ItemSyntax;
use crate::typeck;

pub struct Compilation {
    pub package_name: String,
    pub root_scope: Rc<Scope>,
    pub natives: NativeTypes,
    pub types: TypeStore,
    pub templates: TemplateCache,
    /// Every impl in the compilation, natives included; member and
    /// operator lookup scans this.
    pub impls: RefCell<Vec<Rc<Symbol>>>,
}

impl Compilation {
    pub fn new(package_name: impl Into<String>) -> Compilation {
        let root_scope = Scope::new_root();
        let natives = NativeTypes::bootstrap(&root_scope);

        let compilation = Compilation {
            package_name: package_name.into(),
            root_scope,
            natives,
            types: TypeStore::new(),
            templates: TemplateCache::new(),
            impls: RefCell::new(vec![]),
        };
        register_native_operators(&compilation);
        compilation
    }
}

/// The built-in operator set: every numeric native gets arithmetic and
/// comparison operators, integers additionally get shifts and bitwise
/// operators, `bool` gets equality and negation. They are ordinary
/// (extern, bodyless) functions so operator lookup and lowering treat
/// native and user operators identically.
fn register_native_operators(compilation: &Compilation) {
    let natives = &compilation.natives;
    let bool_ = &natives.bool_;

    let numerics = [
        &natives.int8,
        &natives.int16,
        &natives.int32,
        &natives.int64,
        &natives.int,
        &natives.uint8,
        &natives.uint16,
        &natives.uint32,
        &natives.uint64,
        &natives.float32,
        &natives.float64,
    ];
    let integers = [
        &natives.int8,
        &natives.int16,
        &natives.int32,
        &natives.int64,
        &natives.int,
        &natives.uint8,
        &natives.uint16,
        &natives.uint32,
        &natives.uint64,
    ];
    let signed = [
        &natives.int8,
        &natives.int16,
        &natives.int32,
        &natives.int64,
        &natives.int,
        &natives.float32,
        &natives.float64,
    ];

    for ty in numerics {
        let mut ops = vec![];
        for op in ["__op_add", "__op_sub", "__op_mul", "__op_div", "__op_rem"] {
            ops.push(native_operator(op, &[ty, ty], ty));
        }
        for op in [
            "__op_eq", "__op_ne", "__op_lt", "__op_gt", "__op_le", "__op_ge",
        ] {
            ops.push(native_operator(op, &[ty, ty], bool_));
        }
        if integers.iter().any(|i| i.is_same(ty)) {
            for op in ["__op_shl", "__op_shr", "__op_and", "__op_xor", "__op_or"] {
                ops.push(native_operator(op, &[ty, ty], ty));
            }
        }
        if signed.iter().any(|s| s.is_same(ty)) {
            ops.push(native_operator("__op_neg", &[ty], ty));
        }
        register_native_impl(compilation, ty, ops);
    }

    let bool_ops = vec![
        native_operator("__op_eq", &[bool_, bool_], bool_),
        native_operator("__op_ne", &[bool_, bool_], bool_),
        native_operator("__op_not", &[bool_], bool_),
    ];
    register_native_impl(compilation, bool_, bool_ops);
}

fn native_operator(
    name: &str,
    param_types: &[&Rc<Symbol>],
    return_type: &Rc<Symbol>,
) -> Rc<Symbol> {
    use crate::scope::symbol::{
        AccessModifier, FunctionCategory, FunctionSymbol, ParamSymbol, Signature, SymbolKind,
    };

    let params = param_types
        .iter()
        .enumerate()
        .map(|(index, ty)| {
            Symbol::new(
                synthetic_ident(&format!("arg{index}")),
                AccessModifier::Priv,
                SymbolKind::Param(ParamSymbol {
                    index,
                    ty: RefCell::new(Rc::clone(ty)),
                }),
            )
        })
        .collect();

    Symbol::new(
        synthetic_ident(name),
        AccessModifier::Pub,
        SymbolKind::Function(FunctionSymbol {
            category: FunctionCategory::Static,
            signature: Signature {
                params: RefCell::new(params),
                return_type: RefCell::new(Rc::clone(return_type)),
            },
            type_params: RefCell::new(vec![]),
            body_scope: None,
            is_extern: true,
            is_implicit: false,
        }),
    )
}

fn register_native_impl(compilation: &Compilation, ty: &Rc<Symbol>, functions: Vec<Rc<Symbol>>) {
    use crate::scope::symbol::{AccessModifier, ImplSymbol, SymbolKind};

    let body_scope = compilation.root_scope.create_child_anon();
    let impl_symbol = Symbol::new(
        synthetic_ident("<native impl>"),
        AccessModifier::Pub,
        SymbolKind::InherentImpl(ImplSymbol {
            body_scope,
            self_type: RefCell::new(Rc::clone(ty)),
            implemented_trait: RefCell::new(None),
            functions: RefCell::new(functions),
            type_params: RefCell::new(vec![]),
        }),
    );
    compilation.impls.borrow_mut().push(impl_symbol);
}

fn synthetic_ident(name: &str) -> crate::source::Ident {
    let buffer = SrcBuffer::package_root("std");
    crate::source::Ident::new(crate::source::SrcLocation::new(buffer, 0, 0), name)
}

/// The fully processed package: every function body type-checked, lowered
/// to the primitive core, and control-flow verified.
pub struct CompiledPackage {
    pub items: Vec<ItemSyntax>,
    pub functions: Vec<FunctionSema>,
}

/// Run the whole front-end over a set of source buffers. Diagnostics from
/// every stage are merged in order; the caller decides what to do with
/// them (the compilation itself never aborts).
pub fn compile(
    compilation: &Compilation,
    buffers: Vec<Rc<SrcBuffer>>,
) -> Diagnosed<CompiledPackage> {
    let mut diagnostics = DiagnosticBag::new();

    let package_scope = compilation
        .root_scope
        .create_child(compilation.package_name.clone());
    package_scope.mark_module_body();

    // lex + parse, scope creation interleaved
    let mut items = vec![];
    for buffer in buffers {
        debug!("lexing {}", buffer.display_name());
        let tokens = diagnostics.unwrap(Lexer::new(buffer).lex());

        debug!("parsing {} tokens", tokens.len());
        let parsed = diagnostics.unwrap(parser::parse_items(compilation, tokens, &package_scope));
        items.extend(parsed);
    }

    // decl phase: create all symbols in declaration order
    debug!("declaring symbols");
    diagnostics.merge(decl::run_decl_phase(compilation, &package_scope, &items));

    // bind: syntax -> sema
    debug!("binding");
    let functions = diagnostics.unwrap(crate::sema::bind::bind_package(compilation, &items));

    // per-function: type-check to fixed point, lower to fixed point, CFA
    let mut checked_functions = vec![];
    for function in functions {
        debug!("checking function '{}'", function.symbol.name.name);

        let function = diagnostics.unwrap(typeck::check_function(compilation, function));
        let function = lowering::lower_function(compilation, function);
        diagnostics.merge(cfa::analyze_function(compilation, &function));

        checked_functions.push(function);
    }

    Diagnosed::new(
        CompiledPackage {
            items,
            functions: checked_functions,
        },
        diagnostics,
    )
}
