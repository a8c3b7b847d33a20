//! Statement syntax nodes.

use std::cell::RefCell;
use std::rc::Rc;

use crate::lexer::TokenKind;
use crate::scope::symbol::Symbol;
use crate::scope::Scope;
use crate::source::{Ident, SrcLocation};

use super::exprs::ExprSyntax;
use super::name::TypeName;

#[derive(Clone)]
pub enum StmtSyntax {
    Block(Rc<BlockStmtSyntax>),
    Expr(Rc<ExprStmtSyntax>),
    Var(Rc<VarStmtSyntax>),
    If(Rc<IfStmtSyntax>),
    While(Rc<WhileStmtSyntax>),
    Ret(Rc<RetStmtSyntax>),
    Exit(Rc<ExitStmtSyntax>),
    Assert(Rc<AssertStmtSyntax>),
    Assign(Rc<AssignStmtSyntax>),
    CompoundAssign(Rc<CompoundAssignStmtSyntax>),
    Copy(Rc<CopyStmtSyntax>),
    Drop(Rc<DropStmtSyntax>),
}

impl StmtSyntax {
    pub fn location(&self) -> SrcLocation {
        match self {
            StmtSyntax::Block(n) => n.location.clone(),
            StmtSyntax::Expr(n) => n.location.clone(),
            StmtSyntax::Var(n) => n.location.clone(),
            StmtSyntax::If(n) => n.location.clone(),
            StmtSyntax::While(n) => n.location.clone(),
            StmtSyntax::Ret(n) => n.location.clone(),
            StmtSyntax::Exit(n) => n.location.clone(),
            StmtSyntax::Assert(n) => n.location.clone(),
            StmtSyntax::Assign(n) => n.location.clone(),
            StmtSyntax::CompoundAssign(n) => n.location.clone(),
            StmtSyntax::Copy(n) => n.location.clone(),
            StmtSyntax::Drop(n) => n.location.clone(),
        }
    }
}

/// `{ ... }` — owns the scope its statements were parsed into.
pub struct BlockStmtSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub body_scope: Rc<Scope>,
    pub stmts: Vec<StmtSyntax>,
}

pub struct ExprStmtSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub expr: ExprSyntax,
}

/// `name: Type = init;` — the local symbol is created in the decl phase
/// like every other declaration.
pub struct VarStmtSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub name: Ident,
    pub type_name: TypeName,
    pub initializer: Option<ExprSyntax>,
    pub symbol: RefCell<Option<Rc<Symbol>>>,
}

/// The whole `if`/`elif`/`else` chain: one condition per conditional arm,
/// plus at most one trailing body for `else`.
pub struct IfStmtSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub conditions: Vec<ExprSyntax>,
    pub bodies: Vec<Rc<BlockStmtSyntax>>,
}

pub struct WhileStmtSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub condition: ExprSyntax,
    pub body: Rc<BlockStmtSyntax>,
}

pub struct RetStmtSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub expr: Option<ExprSyntax>,
}

pub struct ExitStmtSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
}

pub struct AssertStmtSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub condition: ExprSyntax,
}

pub struct AssignStmtSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub lhs: ExprSyntax,
    pub rhs: ExprSyntax,
}

/// `a OP= b`
pub struct CompoundAssignStmtSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub lhs: ExprSyntax,
    pub rhs: ExprSyntax,
    pub op: TokenKind,
}

pub struct CopyStmtSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub expr: ExprSyntax,
}

pub struct DropStmtSyntax {
    pub location: SrcLocation,
    pub scope: Rc<Scope>,
    pub expr: ExprSyntax,
}
