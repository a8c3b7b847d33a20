//! Statement parsing. Blocks create their scope on the opening brace;
//! everything else threads the enclosing scope through.

use std::cell::RefCell;
use std::rc::Rc;

use crate::diagnostics::{Diagnosed, DiagnosticBag, Expected};
use crate::lexer::TokenKind;
use crate::scope::Scope;
use crate::source::SrcLocation;
use crate::syntax::stmts::{
    AssertStmtSyntax, AssignStmtSyntax, BlockStmtSyntax, CompoundAssignStmtSyntax, CopyStmtSyntax,
    DropStmtSyntax, ExitStmtSyntax, ExprStmtSyntax, IfStmtSyntax, RetStmtSyntax, StmtSyntax,
    VarStmtSyntax, WhileStmtSyntax,
};

use super::{Discard, Parser};

impl<'a> Parser<'a> {
    pub(crate) fn parse_block(&mut self, scope: &Rc<Scope>) -> Expected<Rc<BlockStmtSyntax>> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        self.expect(TokenKind::OpenBrace, &mut diagnostics);
        let body_scope = scope.create_child_anon();

        let mut stmts = vec![];
        while !self.at(TokenKind::CloseBrace) && !self.at(TokenKind::EndOfFile) {
            match self.parse_stmt(&body_scope) {
                Ok(stmt) => stmts.push(diagnostics.unwrap(stmt)),
                Err(bag) => {
                    diagnostics.merge(bag);
                    self.discard_until(
                        &[TokenKind::Semicolon, TokenKind::CloseBrace],
                        Discard::Inclusive,
                    );
                }
            }
        }
        let end = self.expect(TokenKind::CloseBrace, &mut diagnostics);

        Ok(Diagnosed::new(
            Rc::new(BlockStmtSyntax {
                location: SrcLocation::merge(&begin, &end.location),
                scope: Rc::clone(scope),
                body_scope,
                stmts,
            }),
            diagnostics,
        ))
    }

    pub(crate) fn parse_stmt(&mut self, scope: &Rc<Scope>) -> Expected<StmtSyntax> {
        match self.peek().kind {
            TokenKind::OpenBrace => self.parse_block(scope).map(|d| d.map(StmtSyntax::Block)),
            TokenKind::IfKeyword => self.parse_if(scope),
            TokenKind::WhileKeyword => self.parse_while(scope),
            TokenKind::RetKeyword => self.parse_ret(scope),
            TokenKind::ExitKeyword => self.parse_exit(scope),
            TokenKind::AssertKeyword => self.parse_assert(scope),
            TokenKind::CopyKeyword => self.parse_copy(scope),
            TokenKind::DropKeyword => self.parse_drop(scope),
            // `name :` that is not `name ::` opens a local declaration
            TokenKind::Identifier if self.peek_at(1).kind == TokenKind::Colon => {
                self.parse_var(scope)
            }
            _ => self.parse_expr_like_stmt(scope),
        }
    }

    fn parse_var(&mut self, scope: &Rc<Scope>) -> Expected<StmtSyntax> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        let name = self.parse_name(&mut diagnostics);
        self.expect(TokenKind::Colon, &mut diagnostics);
        let type_name = self.parse_type_name(&mut diagnostics);

        let initializer = if self.eat(TokenKind::Equals).is_some() {
            Some(diagnostics.unwrap(self.parse_expr(scope)?))
        } else {
            None
        };
        let end = self.expect(TokenKind::Semicolon, &mut diagnostics);

        Ok(Diagnosed::new(
            StmtSyntax::Var(Rc::new(VarStmtSyntax {
                location: SrcLocation::merge(&begin, &end.location),
                scope: Rc::clone(scope),
                name,
                type_name,
                initializer,
                symbol: RefCell::new(None),
            })),
            diagnostics,
        ))
    }

    /// Expression statement, assignment, or compound assignment: all three
    /// start with an expression.
    fn parse_expr_like_stmt(&mut self, scope: &Rc<Scope>) -> Expected<StmtSyntax> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        let expr = diagnostics.unwrap(self.parse_expr(scope)?);

        if self.eat(TokenKind::Equals).is_some() {
            let rhs = diagnostics.unwrap(self.parse_expr(scope)?);
            let end = self.expect(TokenKind::Semicolon, &mut diagnostics);
            return Ok(Diagnosed::new(
                StmtSyntax::Assign(Rc::new(AssignStmtSyntax {
                    location: SrcLocation::merge(&begin, &end.location),
                    scope: Rc::clone(scope),
                    lhs: expr,
                    rhs,
                })),
                diagnostics,
            ));
        }

        if self.peek().kind.is_compound_assignment() {
            let op_token = self.bump();
            let rhs = diagnostics.unwrap(self.parse_expr(scope)?);
            let end = self.expect(TokenKind::Semicolon, &mut diagnostics);
            return Ok(Diagnosed::new(
                StmtSyntax::CompoundAssign(Rc::new(CompoundAssignStmtSyntax {
                    location: SrcLocation::merge(&begin, &end.location),
                    scope: Rc::clone(scope),
                    lhs: expr,
                    rhs,
                    op: op_token
                        .kind
                        .compound_assignment_op()
                        .expect("compound assignment token"),
                })),
                diagnostics,
            ));
        }

        let end = self.expect(TokenKind::Semicolon, &mut diagnostics);
        Ok(Diagnosed::new(
            StmtSyntax::Expr(Rc::new(ExprStmtSyntax {
                location: SrcLocation::merge(&begin, &end.location),
                scope: Rc::clone(scope),
                expr,
            })),
            diagnostics,
        ))
    }

    /// The whole `if`/`elif`/`else` chain as one node: conditions line up
    /// with bodies, a trailing extra body is the `else`.
    fn parse_if(&mut self, scope: &Rc<Scope>) -> Expected<StmtSyntax> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        self.expect(TokenKind::IfKeyword, &mut diagnostics);

        let mut conditions = vec![];
        let mut bodies = vec![];

        conditions.push(diagnostics.unwrap(self.parse_expr(scope)?));
        bodies.push(diagnostics.unwrap(self.parse_block(scope)?));

        loop {
            if self.at(TokenKind::ElifKeyword) {
                self.bump();
                conditions.push(diagnostics.unwrap(self.parse_expr(scope)?));
                bodies.push(diagnostics.unwrap(self.parse_block(scope)?));
            } else if self.at(TokenKind::ElseKeyword) {
                self.bump();
                bodies.push(diagnostics.unwrap(self.parse_block(scope)?));
                break;
            } else {
                break;
            }
        }

        Ok(Diagnosed::new(
            StmtSyntax::If(Rc::new(IfStmtSyntax {
                location: SrcLocation::merge(&begin, &self.last_location()),
                scope: Rc::clone(scope),
                conditions,
                bodies,
            })),
            diagnostics,
        ))
    }

    fn parse_while(&mut self, scope: &Rc<Scope>) -> Expected<StmtSyntax> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        self.expect(TokenKind::WhileKeyword, &mut diagnostics);
        let condition = diagnostics.unwrap(self.parse_expr(scope)?);
        let body = diagnostics.unwrap(self.parse_block(scope)?);

        Ok(Diagnosed::new(
            StmtSyntax::While(Rc::new(WhileStmtSyntax {
                location: SrcLocation::merge(&begin, &self.last_location()),
                scope: Rc::clone(scope),
                condition,
                body,
            })),
            diagnostics,
        ))
    }

    fn parse_ret(&mut self, scope: &Rc<Scope>) -> Expected<StmtSyntax> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        self.expect(TokenKind::RetKeyword, &mut diagnostics);
        let expr = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(diagnostics.unwrap(self.parse_expr(scope)?))
        };
        let end = self.expect(TokenKind::Semicolon, &mut diagnostics);

        Ok(Diagnosed::new(
            StmtSyntax::Ret(Rc::new(RetStmtSyntax {
                location: SrcLocation::merge(&begin, &end.location),
                scope: Rc::clone(scope),
                expr,
            })),
            diagnostics,
        ))
    }

    fn parse_exit(&mut self, scope: &Rc<Scope>) -> Expected<StmtSyntax> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        self.expect(TokenKind::ExitKeyword, &mut diagnostics);
        let end = self.expect(TokenKind::Semicolon, &mut diagnostics);

        Ok(Diagnosed::new(
            StmtSyntax::Exit(Rc::new(ExitStmtSyntax {
                location: SrcLocation::merge(&begin, &end.location),
                scope: Rc::clone(scope),
            })),
            diagnostics,
        ))
    }

    fn parse_assert(&mut self, scope: &Rc<Scope>) -> Expected<StmtSyntax> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        self.expect(TokenKind::AssertKeyword, &mut diagnostics);
        let condition = diagnostics.unwrap(self.parse_expr(scope)?);
        let end = self.expect(TokenKind::Semicolon, &mut diagnostics);

        Ok(Diagnosed::new(
            StmtSyntax::Assert(Rc::new(AssertStmtSyntax {
                location: SrcLocation::merge(&begin, &end.location),
                scope: Rc::clone(scope),
                condition,
            })),
            diagnostics,
        ))
    }

    fn parse_copy(&mut self, scope: &Rc<Scope>) -> Expected<StmtSyntax> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        self.expect(TokenKind::CopyKeyword, &mut diagnostics);
        let expr = diagnostics.unwrap(self.parse_expr(scope)?);
        let end = self.expect(TokenKind::Semicolon, &mut diagnostics);

        Ok(Diagnosed::new(
            StmtSyntax::Copy(Rc::new(CopyStmtSyntax {
                location: SrcLocation::merge(&begin, &end.location),
                scope: Rc::clone(scope),
                expr,
            })),
            diagnostics,
        ))
    }

    fn parse_drop(&mut self, scope: &Rc<Scope>) -> Expected<StmtSyntax> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        self.expect(TokenKind::DropKeyword, &mut diagnostics);
        let expr = diagnostics.unwrap(self.parse_expr(scope)?);
        let end = self.expect(TokenKind::Semicolon, &mut diagnostics);

        Ok(Diagnosed::new(
            StmtSyntax::Drop(Rc::new(DropStmtSyntax {
                location: SrcLocation::merge(&begin, &end.location),
                scope: Rc::clone(scope),
                expr,
            })),
            diagnostics,
        ))
    }
}
