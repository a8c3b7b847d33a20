//! Symbol variants and their payloads.
//!
//! A symbol is a named entity owned by exactly one scope. Payload fields
//! that are populated after symbol creation (struct fields, trait
//! prototypes, type-param constraints) sit behind `RefCell`: the decl phase
//! is the only writer, every later phase reads.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::source::Ident;

use super::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessModifier {
    Pub,
    Priv,
}

/// How a function receives `self`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfKind {
    /// `self:` — by reference.
    Ref,
    /// `*self:` — through a strong pointer.
    StrongPtrRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCategory {
    Static,
    Instance,
}

/// Composite type constructors, applied outside-in. `&T` is spelled
/// `Ref(T)`, `*T` is `StrongPtr(T)`, `~T` is `WeakPtr(T)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeModifier {
    Ref,
    StrongPtr,
    DynStrongPtr,
    WeakPtr,
    DynTrait,
}

/// The category an error symbol stands in for, so downstream passes keep
/// operating on the shape they expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Type,
    Trait,
    Function,
    Variable,
    Module,
    Label,
}

pub struct ModuleSymbol {
    pub body_scope: Rc<Scope>,
}

pub struct StructSymbol {
    pub body_scope: Rc<Scope>,
    pub type_params: RefCell<Vec<Rc<Symbol>>>,
    pub fields: RefCell<Vec<Rc<Symbol>>>,
}

pub struct TraitSymbol {
    pub body_scope: Rc<Scope>,
    pub type_params: RefCell<Vec<Rc<Symbol>>>,
    pub prototypes: RefCell<Vec<Rc<Symbol>>>,
    pub supertraits: RefCell<Vec<Rc<Symbol>>>,
}

pub struct PrototypeSymbol {
    pub parent_trait: RefCell<Weak<Symbol>>,
    pub index: usize,
    pub signature: Signature,
    pub self_kind: Option<SelfKind>,
}

pub struct FunctionSymbol {
    pub category: FunctionCategory,
    pub signature: Signature,
    pub type_params: RefCell<Vec<Rc<Symbol>>>,
    pub body_scope: Option<Rc<Scope>>,
    /// `extern` functions carry no body.
    pub is_extern: bool,
    /// Single-argument constructors marked `[[implicit]]` take part in
    /// implicit conversion.
    pub is_implicit: bool,
}

pub struct FieldSymbol {
    pub parent_struct: RefCell<Weak<Symbol>>,
    pub index: usize,
    pub ty: RefCell<Rc<Symbol>>,
}

pub struct VarSymbol {
    pub ty: RefCell<Rc<Symbol>>,
}

pub struct ParamSymbol {
    pub index: usize,
    pub ty: RefCell<Rc<Symbol>>,
}

pub struct SelfParamSymbol {
    pub kind: SelfKind,
    pub ty: RefCell<Rc<Symbol>>,
}

pub struct TypeParamSymbol {
    pub index: usize,
    pub constraints: RefCell<Vec<Rc<Symbol>>>,
}

pub struct AliasSymbol {
    pub target: RefCell<Rc<Symbol>>,
}

pub struct ImplSymbol {
    pub body_scope: Rc<Scope>,
    pub self_type: RefCell<Rc<Symbol>>,
    /// `Some` for trait impls, `None` for inherent impls.
    pub implemented_trait: RefCell<Option<Rc<Symbol>>>,
    pub functions: RefCell<Vec<Rc<Symbol>>>,
    pub type_params: RefCell<Vec<Rc<Symbol>>>,
}

pub struct UseSymbol {
    pub used_trait: RefCell<Rc<Symbol>>,
}

pub struct ModifiedTypeSymbol {
    pub modifier: TypeModifier,
    pub inner: Rc<Symbol>,
}

/// A function or prototype signature. Param entries are `Param` /
/// `SelfParam` symbols; the self param, when present, is first.
pub struct Signature {
    pub params: RefCell<Vec<Rc<Symbol>>>,
    pub return_type: RefCell<Rc<Symbol>>,
}

impl Signature {
    pub fn param_types(&self) -> Vec<Rc<Symbol>> {
        self.params
            .borrow()
            .iter()
            .map(|p| p.var_type().expect("signature params carry types"))
            .collect()
    }

    pub fn arity(&self) -> usize {
        self.params.borrow().len()
    }
}

pub enum SymbolKind {
    Module(ModuleSymbol),
    Struct(StructSymbol),
    Trait(TraitSymbol),
    Prototype(PrototypeSymbol),
    Function(FunctionSymbol),
    Field(FieldSymbol),
    GlobalVar(VarSymbol),
    LocalVar(VarSymbol),
    Param(ParamSymbol),
    SelfParam(SelfParamSymbol),
    Label,
    TypeParam(TypeParamSymbol),
    TypeAlias(AliasSymbol),
    ImplSelfAlias(AliasSymbol),
    ReimportAlias(AliasSymbol),
    InherentImpl(ImplSymbol),
    TraitImpl(ImplSymbol),
    Use(UseSymbol),
    ModifiedType(ModifiedTypeSymbol),
    Error(ErrorCategory),
}

pub struct Symbol {
    pub name: Ident,
    pub scope: RefCell<Weak<Scope>>,
    pub access: AccessModifier,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn new(name: Ident, access: AccessModifier, kind: SymbolKind) -> Rc<Symbol> {
        Rc::new(Symbol {
            name,
            scope: RefCell::new(Weak::new()),
            access,
            kind,
        })
    }

    pub fn defining_scope(&self) -> Option<Rc<Scope>> {
        self.scope.borrow().upgrade()
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, SymbolKind::Error(_))
    }

    /// Whether this symbol denotes a type when named in type position.
    pub fn is_type(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Struct(_)
                | SymbolKind::Trait(_)
                | SymbolKind::TypeParam(_)
                | SymbolKind::TypeAlias(_)
                | SymbolKind::ImplSelfAlias(_)
                | SymbolKind::ReimportAlias(_)
                | SymbolKind::ModifiedType(_)
                | SymbolKind::Error(ErrorCategory::Type)
                | SymbolKind::Error(ErrorCategory::Trait)
        )
    }

    /// Whether this symbol can stand on the left of `::` in a path.
    pub fn provides_scope(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Module(_) | SymbolKind::Struct(_) | SymbolKind::Trait(_)
        )
    }

    pub fn provided_scope(&self) -> Option<Rc<Scope>> {
        match &self.kind {
            SymbolKind::Module(m) => Some(Rc::clone(&m.body_scope)),
            SymbolKind::Struct(s) => Some(Rc::clone(&s.body_scope)),
            SymbolKind::Trait(t) => Some(Rc::clone(&t.body_scope)),
            _ => None,
        }
    }

    /// Follow alias indirections to the underlying type symbol.
    pub fn unalias(self: &Rc<Symbol>) -> Rc<Symbol> {
        match &self.kind {
            SymbolKind::TypeAlias(alias)
            | SymbolKind::ImplSelfAlias(alias)
            | SymbolKind::ReimportAlias(alias) => alias.target.borrow().unalias(),
            _ => Rc::clone(self),
        }
    }

    /// The type carried by value-like symbols.
    pub fn var_type(&self) -> Option<Rc<Symbol>> {
        match &self.kind {
            SymbolKind::GlobalVar(v) | SymbolKind::LocalVar(v) => Some(v.ty.borrow().clone()),
            SymbolKind::Param(p) => Some(p.ty.borrow().clone()),
            SymbolKind::SelfParam(p) => Some(p.ty.borrow().clone()),
            SymbolKind::Field(f) => Some(f.ty.borrow().clone()),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionSymbol> {
        match &self.kind {
            SymbolKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructSymbol> {
        match &self.kind {
            SymbolKind::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_trait(&self) -> Option<&TraitSymbol> {
        match &self.kind {
            SymbolKind::Trait(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_generic(&self) -> bool {
        match &self.kind {
            SymbolKind::Function(f) => !f.type_params.borrow().is_empty(),
            SymbolKind::Struct(s) => !s.type_params.borrow().is_empty(),
            SymbolKind::Trait(t) => !t.type_params.borrow().is_empty(),
            _ => false,
        }
    }

    /// Stable identity for cache keys and set membership.
    pub fn id(self: &Rc<Symbol>) -> usize {
        Rc::as_ptr(self) as usize
    }

    /// Two symbols denote the same entity iff they are the same allocation.
    pub fn is_same(self: &Rc<Symbol>, other: &Rc<Symbol>) -> bool {
        Rc::ptr_eq(self, other)
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            SymbolKind::Module(_) => "module",
            SymbolKind::Struct(_) => "struct",
            SymbolKind::Trait(_) => "trait",
            SymbolKind::Prototype(_) => "prototype",
            SymbolKind::Function(_) => "function",
            SymbolKind::Field(_) => "field",
            SymbolKind::GlobalVar(_) => "global variable",
            SymbolKind::LocalVar(_) => "local variable",
            SymbolKind::Param(_) => "parameter",
            SymbolKind::SelfParam(_) => "self parameter",
            SymbolKind::Label => "label",
            SymbolKind::TypeParam(_) => "type parameter",
            SymbolKind::TypeAlias(_) => "type alias",
            SymbolKind::ImplSelfAlias(_) => "Self alias",
            SymbolKind::ReimportAlias(_) => "re-import",
            SymbolKind::InherentImpl(_) => "impl",
            SymbolKind::TraitImpl(_) => "trait impl",
            SymbolKind::Use(_) => "use",
            SymbolKind::ModifiedType(_) => "type",
            SymbolKind::Error(_) => "<error>",
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind_name(), self.name.name)
    }
}
