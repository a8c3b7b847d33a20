//! # Scopes and symbols
//!
//! The scope tree is the backbone of name resolution. It is created *while
//! parsing* — every syntax node is born holding a handle to its lexical
//! scope — and populated during the decl phase, after which the table is
//! frozen and every later phase only reads.
//!
//! ```text
//!  root (::)
//!   └─ package module
//!       ├─ struct body scopes
//!       ├─ trait body scopes
//!       └─ function body scopes
//!            └─ block scopes (anonymous)
//! ```
//!
//! Lookup is lexical: resolving a name in a scope checks the scope itself,
//! then walks the parent chain to the root. Absolute paths (leading `::`)
//! start at the root directly. A name maps to a *list* of symbols because
//! functions overload on arity and parameter types; non-function lookups
//! treat more than one candidate as ambiguity.

pub mod resolve;
pub mod symbol;
pub mod template;
pub mod ty;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::diagnostics::{Diagnosed, Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::source::Ident;

use self::symbol::{AccessModifier, FunctionSymbol, Symbol, SymbolKind};

pub struct Scope {
    name: Option<String>,
    anon_id: usize,
    nest_level: usize,
    parent: RefCell<Weak<Scope>>,
    children: RefCell<Vec<Rc<Scope>>>,
    symbols: RefCell<HashMap<String, Vec<Rc<Symbol>>>>,
    /// Set when a module symbol claims this scope as its body; used by
    /// access checks to find the enclosing module subtree.
    is_module_body: Cell<bool>,
    anon_counter: Cell<usize>,
}

impl Scope {
    pub fn new_root() -> Rc<Scope> {
        Rc::new(Scope {
            name: None,
            anon_id: 0,
            nest_level: 0,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(vec![]),
            symbols: RefCell::new(HashMap::new()),
            is_module_body: Cell::new(true),
            anon_counter: Cell::new(0),
        })
    }

    pub fn create_child(self: &Rc<Scope>, name: impl Into<String>) -> Rc<Scope> {
        self.create_child_inner(Some(name.into()))
    }

    pub fn create_child_anon(self: &Rc<Scope>) -> Rc<Scope> {
        self.create_child_inner(None)
    }

    fn create_child_inner(self: &Rc<Scope>, name: Option<String>) -> Rc<Scope> {
        let anon_id = self.anon_counter.get();
        self.anon_counter.set(anon_id + 1);

        let child = Rc::new(Scope {
            name,
            anon_id,
            nest_level: self.nest_level + 1,
            parent: RefCell::new(Rc::downgrade(self)),
            children: RefCell::new(vec![]),
            symbols: RefCell::new(HashMap::new()),
            is_module_body: Cell::new(false),
            anon_counter: Cell::new(0),
        });

        self.children.borrow_mut().push(Rc::clone(&child));
        child
    }

    pub fn parent(&self) -> Option<Rc<Scope>> {
        self.parent.borrow().upgrade()
    }

    /// The named child created earlier in this compilation, if any.
    /// Modules split across files re-enter their scope through this.
    pub fn find_child(&self, name: &str) -> Option<Rc<Scope>> {
        self.children
            .borrow()
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
            .map(Rc::clone)
    }

    pub fn nest_level(&self) -> usize {
        self.nest_level
    }

    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("<anon {}>", self.anon_id),
        }
    }

    pub fn mark_module_body(&self) {
        self.is_module_body.set(true);
    }

    pub fn root(self: &Rc<Scope>) -> Rc<Scope> {
        match self.parent() {
            Some(parent) => parent.root(),
            None => Rc::clone(self),
        }
    }

    /// Define a symbol in this scope. Redefinition with the same signature
    /// (same kind and, for functions, same arity and parameter types) is
    /// reported and the existing symbol is returned so downstream passes
    /// keep a single canonical entity.
    pub fn define(self: &Rc<Scope>, symbol: Rc<Symbol>) -> Diagnosed<Rc<Symbol>> {
        let mut diagnostics = DiagnosticBag::new();
        let name = symbol.name.name.clone();

        if let Some(existing) = self.find_colliding(&symbol) {
            diagnostics.add(Diagnostic::error(
                DiagnosticKind::SymbolRedefinition,
                symbol.name.location.clone(),
                format!("redefinition of {} '{}'", existing.kind_name(), name),
            ));
            return Diagnosed::new(existing, diagnostics);
        }

        *symbol.scope.borrow_mut() = Rc::downgrade(self);
        self.symbols
            .borrow_mut()
            .entry(name)
            .or_default()
            .push(Rc::clone(&symbol));

        Diagnosed::new(symbol, diagnostics)
    }

    fn find_colliding(&self, candidate: &Rc<Symbol>) -> Option<Rc<Symbol>> {
        let symbols = self.symbols.borrow();
        let existing = symbols.get(&candidate.name.name)?;

        existing
            .iter()
            .find(|present| collides(present, candidate))
            .map(Rc::clone)
    }

    /// All symbols with `name` in this scope only.
    pub fn lookup_local(&self, name: &str) -> Vec<Rc<Symbol>> {
        self.symbols
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// All symbols with `name`, walking the parent chain. The nearest
    /// scope with at least one match wins; outer overloads do not leak
    /// into inner results.
    pub fn lookup(self: &Rc<Scope>, name: &str) -> Vec<Rc<Symbol>> {
        let local = self.lookup_local(name);
        if !local.is_empty() {
            return local;
        }

        match self.parent() {
            Some(parent) => parent.lookup(name),
            None => vec![],
        }
    }

    /// Whether `user` may see a symbol defined in this scope with the
    /// given access modifier. Private symbols are visible only within the
    /// defining scope's enclosing module subtree.
    pub fn is_accessible_from(self: &Rc<Scope>, user: &Rc<Scope>, access: AccessModifier) -> bool {
        if access == AccessModifier::Pub {
            return true;
        }

        let module = self.enclosing_module_scope();
        let mut cursor = Some(Rc::clone(user));
        while let Some(scope) = cursor {
            if Rc::ptr_eq(&scope, &module) {
                return true;
            }
            cursor = scope.parent();
        }
        false
    }

    fn enclosing_module_scope(self: &Rc<Scope>) -> Rc<Scope> {
        if self.is_module_body.get() {
            return Rc::clone(self);
        }
        match self.parent() {
            Some(parent) => parent.enclosing_module_scope(),
            None => Rc::clone(self),
        }
    }

    /// A fresh `__anon_<n>` identifier for compiler-introduced symbols
    /// (lowering labels, temporaries).
    pub fn create_anonymous_name(&self, location: crate::source::SrcLocation) -> Ident {
        let n = self.anon_counter.get();
        self.anon_counter.set(n + 1);
        Ident::new(location, format!("__anon_{n}"))
    }

    /// Total number of symbols, for decl-phase freeze assertions in tests.
    pub fn symbol_count_recursive(&self) -> usize {
        let own: usize = self.symbols.borrow().values().map(|v| v.len()).sum();
        own + self
            .children
            .borrow()
            .iter()
            .map(|c| c.symbol_count_recursive())
            .sum::<usize>()
    }
}

/// Two symbols collide when one would shadow the other inside a single
/// scope: always for non-functions, and for functions only when the
/// parameter type lists match.
fn collides(present: &Rc<Symbol>, candidate: &Rc<Symbol>) -> bool {
    match (&present.kind, &candidate.kind) {
        (SymbolKind::Function(a), SymbolKind::Function(b)) => same_function_signature(a, b),
        (SymbolKind::Module(_), SymbolKind::Module(_)) => {
            // modules merge across files instead of colliding
            false
        }
        _ => true,
    }
}

fn same_function_signature(a: &FunctionSymbol, b: &FunctionSymbol) -> bool {
    let a_types = a.signature.param_types();
    let b_types = b.signature.param_types();

    a_types.len() == b_types.len()
        && a_types
            .iter()
            .zip(b_types.iter())
            .all(|(x, y)| x.is_same(y) || x.is_error() || y.is_error())
}

#[cfg(test)]
mod tests {
    use super::symbol::*;
    use super::*;
    use crate::source::{SrcBuffer, SrcLocation};

    fn ident(name: &str) -> Ident {
        Ident::new(
            SrcLocation::new(SrcBuffer::file("t.ace", name), 0, name.len()),
            name,
        )
    }

    fn global_var(name: &str, ty: Rc<Symbol>) -> Rc<Symbol> {
        Symbol::new(
            ident(name),
            AccessModifier::Priv,
            SymbolKind::GlobalVar(VarSymbol {
                ty: RefCell::new(ty),
            }),
        )
    }

    fn error_type() -> Rc<Symbol> {
        Symbol::new(
            ident("<error>"),
            AccessModifier::Pub,
            SymbolKind::Error(ErrorCategory::Type),
        )
    }

    #[test]
    fn test_defined_symbol_resolves_back() {
        let root = Scope::new_root();
        let symbol = global_var("x", error_type());

        let mut bag = DiagnosticBag::new();
        let defined = bag.unwrap(root.define(symbol));

        assert!(bag.is_empty());
        assert!(root.lookup_local("x")[0].is_same(&defined));
        assert!(defined.defining_scope().unwrap().lookup("x")[0].is_same(&defined));
    }

    #[test]
    fn test_redefinition_is_reported_once() {
        let root = Scope::new_root();
        let mut bag = DiagnosticBag::new();

        bag.unwrap(root.define(global_var("x", error_type())));
        bag.unwrap(root.define(global_var("x", error_type())));

        assert_eq!(bag.of_kind(DiagnosticKind::SymbolRedefinition).count(), 1);
        assert_eq!(root.lookup_local("x").len(), 1);
    }

    #[test]
    fn test_lookup_walks_parent_chain() {
        let root = Scope::new_root();
        let inner = root.create_child_anon().create_child_anon();

        let mut bag = DiagnosticBag::new();
        let defined = bag.unwrap(root.define(global_var("deep", error_type())));

        assert!(inner.lookup("deep")[0].is_same(&defined));
        assert!(inner.lookup_local("deep").is_empty());
    }

    #[test]
    fn test_inner_definition_shadows_outer() {
        let root = Scope::new_root();
        let inner = root.create_child_anon();

        let mut bag = DiagnosticBag::new();
        bag.unwrap(root.define(global_var("x", error_type())));
        let shadow = bag.unwrap(inner.define(global_var("x", error_type())));

        assert!(inner.lookup("x")[0].is_same(&shadow));
    }

    #[test]
    fn test_private_symbol_invisible_outside_module() {
        let root = Scope::new_root();
        let module_a = root.create_child("a");
        module_a.mark_module_body();
        let module_b = root.create_child("b");
        module_b.mark_module_body();

        let inner_a = module_a.create_child_anon();

        assert!(module_a.is_accessible_from(&inner_a, AccessModifier::Priv));
        assert!(!module_a.is_accessible_from(&module_b, AccessModifier::Priv));
        assert!(module_a.is_accessible_from(&module_b, AccessModifier::Pub));
    }
}
