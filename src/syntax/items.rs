//! Declaration syntax nodes.
//!
//! These are produced by the parser together with their scopes: a struct
//! or module syntax node already owns the body scope its members were
//! parsed into. Symbol creation happens later, in declaration order, and
//! deposits the created symbol back into the node's `symbol` slot for the
//! binder to pick up.

use std::cell::RefCell;
use std::rc::Rc;

use crate::lexer::TokenKind;
use crate::scope::symbol::{AccessModifier, SelfKind, Symbol};
use crate::scope::Scope;
use crate::source::{Ident, SrcLocation};

use super::name::{SymbolName, TypeName};
use super::stmts::BlockStmtSyntax;

#[derive(Clone)]
pub enum ItemSyntax {
    Mod(Rc<ModSyntax>),
    Struct(Rc<StructSyntax>),
    Trait(Rc<TraitSyntax>),
    Function(Rc<FunctionSyntax>),
    GlobalVar(Rc<GlobalVarSyntax>),
    InherentImpl(Rc<ImplSyntax>),
    TraitImpl(Rc<ImplSyntax>),
    Use(Rc<UseSyntax>),
}

impl ItemSyntax {
    pub fn location(&self) -> SrcLocation {
        match self {
            ItemSyntax::Mod(n) => n.location.clone(),
            ItemSyntax::Struct(n) => n.location.clone(),
            ItemSyntax::Trait(n) => n.location.clone(),
            ItemSyntax::Function(n) => n.location.clone(),
            ItemSyntax::GlobalVar(n) => n.location.clone(),
            ItemSyntax::InherentImpl(n) | ItemSyntax::TraitImpl(n) => n.location.clone(),
            ItemSyntax::Use(n) => n.location.clone(),
        }
    }
}

/// `a::b: mod { ... }` — the body scope is created (or re-entered, for
/// modules split across files) while parsing.
pub struct ModSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub body_scope: Rc<Scope>,
    pub name: Vec<Ident>,
    pub access: AccessModifier,
    pub items: Vec<ItemSyntax>,
    pub symbol: RefCell<Option<Rc<Symbol>>>,
}

/// `Name[T]: struct { field: Type, ... }`
pub struct StructSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub body_scope: Rc<Scope>,
    pub name: Ident,
    pub access: AccessModifier,
    pub type_params: Vec<Rc<TypeParamSyntax>>,
    pub fields: Vec<Rc<FieldVarSyntax>>,
    pub symbol: RefCell<Option<Rc<Symbol>>>,
}

pub struct FieldVarSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub name: Ident,
    pub access: AccessModifier,
    pub type_name: TypeName,
    pub index: usize,
    pub symbol: RefCell<Option<Rc<Symbol>>>,
}

/// `Name[T]: trait : Super1 + Super2 { prototypes }`
pub struct TraitSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub body_scope: Rc<Scope>,
    pub name: Ident,
    pub access: AccessModifier,
    pub type_params: Vec<Rc<TypeParamSyntax>>,
    pub supertraits: Vec<SymbolName>,
    pub prototypes: Vec<Rc<PrototypeSyntax>>,
    pub symbol: RefCell<Option<Rc<Symbol>>>,
}

pub struct PrototypeSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub name: Ident,
    pub index: usize,
    pub self_param: Option<SelfParamSyntax>,
    pub params: Vec<Rc<ParamVarSyntax>>,
    pub return_type: TypeName,
    pub symbol: RefCell<Option<Rc<Symbol>>>,
}

/// A function header plus optional body. Operator functions carry the
/// operator token they were declared with; their name is the synthesized
/// `__op_*` identifier.
pub struct FunctionSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub body_scope: Rc<Scope>,
    pub name: Ident,
    pub access: AccessModifier,
    pub is_extern: bool,
    pub operator: Option<TokenKind>,
    pub type_params: Vec<Rc<TypeParamSyntax>>,
    pub self_param: Option<SelfParamSyntax>,
    pub params: Vec<Rc<ParamVarSyntax>>,
    pub return_type: TypeName,
    pub constraints: Vec<ConstraintSyntax>,
    pub attributes: Vec<AttributeSyntax>,
    pub body: Option<Rc<BlockStmtSyntax>>,
    pub symbol: RefCell<Option<Rc<Symbol>>>,
}

pub struct ParamVarSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub name: Ident,
    pub index: usize,
    pub type_name: TypeName,
    pub symbol: RefCell<Option<Rc<Symbol>>>,
}

/// The receiver synthesized from the `self` / `*self` header modifier.
pub struct SelfParamSyntax {
    pub location: SrcLocation,
    pub kind: SelfKind,
    pub symbol: RefCell<Option<Rc<Symbol>>>,
}

pub struct GlobalVarSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub name: Ident,
    pub access: AccessModifier,
    pub type_name: TypeName,
    pub symbol: RefCell<Option<Rc<Symbol>>>,
}

/// Both impl forms; `trait_name` is `Some` for `impl Trait for Type`.
pub struct ImplSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub body_scope: Rc<Scope>,
    pub type_params: Vec<Rc<TypeParamSyntax>>,
    pub trait_name: Option<SymbolName>,
    pub self_type_name: SymbolName,
    pub functions: Vec<Rc<FunctionSyntax>>,
    pub symbol: RefCell<Option<Rc<Symbol>>>,
}

/// `use Path;` — a trait brought into scope for method resolution, or a
/// type re-exported under its last path section.
pub struct UseSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub access: AccessModifier,
    pub target: SymbolName,
    pub symbol: RefCell<Option<Rc<Symbol>>>,
}

pub struct TypeParamSyntax {
    pub location: SrcLocation,
    pub body_scope: Rc<Scope>,
    pub name: Ident,
    pub index: usize,
    pub symbol: RefCell<Option<Rc<Symbol>>>,
}

/// One `T: Trait1 + Trait2` entry of a where-clause.
pub struct ConstraintSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub type_param_name: Ident,
    pub traits: Vec<SymbolName>,
}

/// `#[name]` — carried on functions, elided during lowering.
pub struct AttributeSyntax {
    pub location: SrcLocation,
    pub name: Ident,
}

/// Operator token to synthesized function name. Unary variants apply when
/// the declaration takes a single (self) operand.
pub fn operator_function_name(op: TokenKind, param_count: usize) -> Option<&'static str> {
    Some(match (op, param_count) {
        (TokenKind::Plus, 2) => "__op_add",
        (TokenKind::Minus, 2) => "__op_sub",
        (TokenKind::Minus, 1) => "__op_neg",
        (TokenKind::Asterisk, 2) => "__op_mul",
        (TokenKind::Slash, 2) => "__op_div",
        (TokenKind::Percent, 2) => "__op_rem",
        (TokenKind::EqualsEquals, 2) => "__op_eq",
        (TokenKind::ExclamationEquals, 2) => "__op_ne",
        (TokenKind::LessThan, 2) => "__op_lt",
        (TokenKind::GreaterThan, 2) => "__op_gt",
        (TokenKind::LessThanEquals, 2) => "__op_le",
        (TokenKind::GreaterThanEquals, 2) => "__op_ge",
        (TokenKind::LessThanLessThan, 2) => "__op_shl",
        (TokenKind::GreaterThanGreaterThan, 2) => "__op_shr",
        (TokenKind::Ampersand, 2) => "__op_and",
        (TokenKind::Caret, 2) => "__op_xor",
        (TokenKind::VerticalBar, 2) => "__op_or",
        (TokenKind::Exclamation, 1) => "__op_not",
        _ => return None,
    })
}
