//! Expression syntax nodes.

use std::rc::Rc;

use crate::lexer::TokenKind;
use crate::scope::Scope;
use crate::source::{Ident, SrcLocation};

use super::name::{SymbolName, TypeName};

#[derive(Clone)]
pub enum ExprSyntax {
    Literal(Rc<LiteralExprSyntax>),
    LiteralSymbol(Rc<LiteralSymbolExprSyntax>),
    Paren(Rc<ParenExprSyntax>),
    MemberAccess(Rc<MemberAccessExprSyntax>),
    Call(Rc<CallExprSyntax>),
    StructConstruction(Rc<StructConstructionExprSyntax>),
    Cast(Rc<CastExprSyntax>),
    AddressOf(Rc<AddressOfExprSyntax>),
    SizeOf(Rc<SizeOfExprSyntax>),
    DerefAs(Rc<DerefAsExprSyntax>),
    VtblPtr(Rc<VtblPtrExprSyntax>),
    TypeInfoPtr(Rc<TypeInfoPtrExprSyntax>),
    Box_(Rc<BoxExprSyntax>),
    Unbox(Rc<UnboxExprSyntax>),
    Lock(Rc<LockExprSyntax>),
    And(Rc<AndExprSyntax>),
    Or(Rc<OrExprSyntax>),
    LogicalNegation(Rc<LogicalNegationExprSyntax>),
    UserUnary(Rc<UserUnaryExprSyntax>),
    UserBinary(Rc<UserBinaryExprSyntax>),
}

impl ExprSyntax {
    pub fn location(&self) -> SrcLocation {
        match self {
            ExprSyntax::Literal(n) => n.location.clone(),
            ExprSyntax::LiteralSymbol(n) => n.location.clone(),
            ExprSyntax::Paren(n) => n.location.clone(),
            ExprSyntax::MemberAccess(n) => n.location.clone(),
            ExprSyntax::Call(n) => n.location.clone(),
            ExprSyntax::StructConstruction(n) => n.location.clone(),
            ExprSyntax::Cast(n) => n.location.clone(),
            ExprSyntax::AddressOf(n) => n.location.clone(),
            ExprSyntax::SizeOf(n) => n.location.clone(),
            ExprSyntax::DerefAs(n) => n.location.clone(),
            ExprSyntax::VtblPtr(n) => n.location.clone(),
            ExprSyntax::TypeInfoPtr(n) => n.location.clone(),
            ExprSyntax::Box_(n) => n.location.clone(),
            ExprSyntax::Unbox(n) => n.location.clone(),
            ExprSyntax::Lock(n) => n.location.clone(),
            ExprSyntax::And(n) => n.location.clone(),
            ExprSyntax::Or(n) => n.location.clone(),
            ExprSyntax::LogicalNegation(n) => n.location.clone(),
            ExprSyntax::UserUnary(n) => n.location.clone(),
            ExprSyntax::UserBinary(n) => n.location.clone(),
        }
    }

    /// Direct children, for span-containment walks.
    pub fn children(&self) -> Vec<ExprSyntax> {
        match self {
            ExprSyntax::Literal(_)
            | ExprSyntax::LiteralSymbol(_)
            | ExprSyntax::SizeOf(_)
            | ExprSyntax::TypeInfoPtr(_) => vec![],
            ExprSyntax::Paren(n) => vec![n.expr.clone()],
            ExprSyntax::MemberAccess(n) => vec![n.expr.clone()],
            ExprSyntax::Call(n) => {
                let mut children = vec![n.callee.clone()];
                children.extend(n.args.iter().cloned());
                children
            }
            ExprSyntax::StructConstruction(n) => n
                .args
                .iter()
                .filter_map(|(_, expr)| expr.clone())
                .collect(),
            ExprSyntax::Cast(n) => vec![n.expr.clone()],
            ExprSyntax::AddressOf(n) => vec![n.expr.clone()],
            ExprSyntax::DerefAs(n) => vec![n.expr.clone()],
            ExprSyntax::VtblPtr(n) => vec![n.expr.clone()],
            ExprSyntax::Box_(n) => vec![n.expr.clone()],
            ExprSyntax::Unbox(n) => vec![n.expr.clone()],
            ExprSyntax::Lock(n) => vec![n.expr.clone()],
            ExprSyntax::And(n) => vec![n.lhs.clone(), n.rhs.clone()],
            ExprSyntax::Or(n) => vec![n.lhs.clone(), n.rhs.clone()],
            ExprSyntax::LogicalNegation(n) => vec![n.expr.clone()],
            ExprSyntax::UserUnary(n) => vec![n.expr.clone()],
            ExprSyntax::UserBinary(n) => vec![n.lhs.clone(), n.rhs.clone()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int,
    Float32,
    Float64,
    String,
    True,
    False,
}

impl LiteralKind {
    pub fn from_token(kind: TokenKind) -> Option<LiteralKind> {
        Some(match kind {
            TokenKind::Int8 => LiteralKind::Int8,
            TokenKind::Int16 => LiteralKind::Int16,
            TokenKind::Int32 => LiteralKind::Int32,
            TokenKind::Int64 => LiteralKind::Int64,
            TokenKind::UInt8 => LiteralKind::UInt8,
            TokenKind::UInt16 => LiteralKind::UInt16,
            TokenKind::UInt32 => LiteralKind::UInt32,
            TokenKind::UInt64 => LiteralKind::UInt64,
            TokenKind::Int => LiteralKind::Int,
            TokenKind::Float32 => LiteralKind::Float32,
            TokenKind::Float64 => LiteralKind::Float64,
            TokenKind::String => LiteralKind::String,
            TokenKind::TrueKeyword => LiteralKind::True,
            TokenKind::FalseKeyword => LiteralKind::False,
            _ => return None,
        })
    }
}

pub struct LiteralExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub kind: LiteralKind,
    pub text: String,
}

/// A path in expression position: a variable, a static function, a global.
pub struct LiteralSymbolExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub name: SymbolName,
}

pub struct ParenExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub expr: ExprSyntax,
}

pub struct MemberAccessExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub expr: ExprSyntax,
    pub member: Ident,
}

pub struct CallExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub callee: ExprSyntax,
    pub args: Vec<ExprSyntax>,
}

/// `new Path { field: expr, other }` — a missing expression means
/// field-init shorthand from a same-named variable.
pub struct StructConstructionExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub type_name: SymbolName,
    pub args: Vec<(Ident, Option<ExprSyntax>)>,
}

pub struct CastExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub target: TypeName,
    pub expr: ExprSyntax,
}

pub struct AddressOfExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub expr: ExprSyntax,
}

pub struct SizeOfExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub target: TypeName,
}

pub struct DerefAsExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub target: TypeName,
    pub expr: ExprSyntax,
}

/// `vtbl_ptr[Trait](expr)`
pub struct VtblPtrExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub trait_name: SymbolName,
    pub expr: ExprSyntax,
}

pub struct TypeInfoPtrExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub target: TypeName,
}

pub struct BoxExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub expr: ExprSyntax,
}

pub struct UnboxExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub expr: ExprSyntax,
}

/// `lock expr` — a weak pointer upgraded to a strong one.
pub struct LockExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub expr: ExprSyntax,
}

pub struct AndExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub lhs: ExprSyntax,
    pub rhs: ExprSyntax,
}

pub struct OrExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub lhs: ExprSyntax,
    pub rhs: ExprSyntax,
}

pub struct LogicalNegationExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub expr: ExprSyntax,
}

pub struct UserUnaryExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub op: TokenKind,
    pub expr: ExprSyntax,
}

pub struct UserBinaryExprSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub op: TokenKind,
    pub lhs: ExprSyntax,
    pub rhs: ExprSyntax,
}
