//! Expression parsing: precedence climbing over a fixed ten-level table,
//! `||` loosest, `* / %` tightest.

use std::rc::Rc;

use crate::diagnostics::{Diagnosed, DiagnosticBag, Expected};
use crate::lexer::TokenKind;
use crate::scope::Scope;
use crate::source::{Ident, SrcLocation};
use crate::syntax::exprs::{
    AddressOfExprSyntax, AndExprSyntax, BoxExprSyntax, CallExprSyntax, CastExprSyntax,
    DerefAsExprSyntax, ExprSyntax, LiteralExprSyntax, LiteralKind, LiteralSymbolExprSyntax,
    LockExprSyntax, LogicalNegationExprSyntax, MemberAccessExprSyntax, OrExprSyntax,
    ParenExprSyntax, SizeOfExprSyntax, StructConstructionExprSyntax, TypeInfoPtrExprSyntax,
    UnboxExprSyntax, UserBinaryExprSyntax, UserUnaryExprSyntax, VtblPtrExprSyntax,
};
use crate::syntax::name::{SymbolName, SymbolNameSection};

use super::{fail, Parser};

/// Binding strength of a binary operator token; `None` for non-operators.
fn precedence(kind: TokenKind) -> Option<u8> {
    use TokenKind::*;
    Some(match kind {
        VerticalBarVerticalBar => 1,
        AmpersandAmpersand => 2,
        VerticalBar => 3,
        Caret => 4,
        Ampersand => 5,
        EqualsEquals | ExclamationEquals => 6,
        LessThan | GreaterThan | LessThanEquals | GreaterThanEquals => 7,
        LessThanLessThan | GreaterThanGreaterThan => 8,
        Plus | Minus => 9,
        Asterisk | Slash | Percent => 10,
        _ => return None,
    })
}

impl<'a> Parser<'a> {
    pub(crate) fn parse_expr(&mut self, scope: &Rc<Scope>) -> Expected<ExprSyntax> {
        self.parse_binary(scope, 1)
    }

    fn parse_binary(&mut self, scope: &Rc<Scope>, min_precedence: u8) -> Expected<ExprSyntax> {
        let mut diagnostics = DiagnosticBag::new();
        let mut lhs = diagnostics.unwrap(self.parse_unary(scope)?);

        while let Some(op_precedence) = precedence(self.peek().kind) {
            if op_precedence < min_precedence {
                break;
            }
            let op_token = self.bump();
            let rhs = diagnostics.unwrap(self.parse_binary(scope, op_precedence + 1)?);

            let location = SrcLocation::merge(&lhs.location(), &rhs.location());
            lhs = match op_token.kind {
                TokenKind::AmpersandAmpersand => ExprSyntax::And(Rc::new(AndExprSyntax {
                    location,
                    scope: Rc::clone(scope),
                    lhs,
                    rhs,
                })),
                TokenKind::VerticalBarVerticalBar => ExprSyntax::Or(Rc::new(OrExprSyntax {
                    location,
                    scope: Rc::clone(scope),
                    lhs,
                    rhs,
                })),
                op => ExprSyntax::UserBinary(Rc::new(UserBinaryExprSyntax {
                    location,
                    scope: Rc::clone(scope),
                    op,
                    lhs,
                    rhs,
                })),
            };
        }

        Ok(Diagnosed::new(lhs, diagnostics))
    }

    fn parse_unary(&mut self, scope: &Rc<Scope>) -> Expected<ExprSyntax> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        let node = match self.peek().kind {
            TokenKind::Exclamation => {
                self.bump();
                let expr = diagnostics.unwrap(self.parse_unary(scope)?);
                ExprSyntax::LogicalNegation(Rc::new(LogicalNegationExprSyntax {
                    location: SrcLocation::merge(&begin, &expr.location()),
                    scope: Rc::clone(scope),
                    expr,
                }))
            }
            TokenKind::Minus | TokenKind::Tilde => {
                let op = self.bump().kind;
                let expr = diagnostics.unwrap(self.parse_unary(scope)?);
                ExprSyntax::UserUnary(Rc::new(UserUnaryExprSyntax {
                    location: SrcLocation::merge(&begin, &expr.location()),
                    scope: Rc::clone(scope),
                    op,
                    expr,
                }))
            }
            TokenKind::LockKeyword => {
                self.bump();
                let expr = diagnostics.unwrap(self.parse_unary(scope)?);
                ExprSyntax::Lock(Rc::new(LockExprSyntax {
                    location: SrcLocation::merge(&begin, &expr.location()),
                    scope: Rc::clone(scope),
                    expr,
                }))
            }
            TokenKind::BoxKeyword => {
                self.bump();
                let expr = diagnostics.unwrap(self.parse_unary(scope)?);
                ExprSyntax::Box_(Rc::new(BoxExprSyntax {
                    location: SrcLocation::merge(&begin, &expr.location()),
                    scope: Rc::clone(scope),
                    expr,
                }))
            }
            TokenKind::UnboxKeyword => {
                self.bump();
                let expr = diagnostics.unwrap(self.parse_unary(scope)?);
                ExprSyntax::Unbox(Rc::new(UnboxExprSyntax {
                    location: SrcLocation::merge(&begin, &expr.location()),
                    scope: Rc::clone(scope),
                    expr,
                }))
            }
            _ => diagnostics.unwrap(self.parse_postfix(scope)?),
        };

        Ok(Diagnosed::new(node, diagnostics))
    }

    fn parse_postfix(&mut self, scope: &Rc<Scope>) -> Expected<ExprSyntax> {
        let mut diagnostics = DiagnosticBag::new();
        let mut expr = diagnostics.unwrap(self.parse_primary(scope)?);

        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    self.bump();
                    let member = self.parse_name(&mut diagnostics);
                    expr = ExprSyntax::MemberAccess(Rc::new(MemberAccessExprSyntax {
                        location: SrcLocation::merge(&expr.location(), &member.location),
                        scope: Rc::clone(scope),
                        expr,
                        member,
                    }));
                }
                TokenKind::OpenParen => {
                    self.bump();
                    let mut args = vec![];
                    while !self.at(TokenKind::CloseParen) && !self.at(TokenKind::EndOfFile) {
                        args.push(diagnostics.unwrap(self.parse_expr(scope)?));
                        if self.eat(TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                    let end = self.expect(TokenKind::CloseParen, &mut diagnostics);
                    expr = ExprSyntax::Call(Rc::new(CallExprSyntax {
                        location: SrcLocation::merge(&expr.location(), &end.location),
                        scope: Rc::clone(scope),
                        callee: expr,
                        args,
                    }));
                }
                _ => break,
            }
        }

        Ok(Diagnosed::new(expr, diagnostics))
    }

    fn parse_primary(&mut self, scope: &Rc<Scope>) -> Expected<ExprSyntax> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        if let Some(kind) = LiteralKind::from_token(self.peek().kind) {
            let token = self.bump();
            return Ok(Diagnosed::new(
                ExprSyntax::Literal(Rc::new(LiteralExprSyntax {
                    location: token.location,
                    scope: Rc::clone(scope),
                    kind,
                    text: token.text,
                })),
                diagnostics,
            ));
        }

        let node = match self.peek().kind {
            TokenKind::OpenParen => {
                self.bump();
                let expr = diagnostics.unwrap(self.parse_expr(scope)?);
                let end = self.expect(TokenKind::CloseParen, &mut diagnostics);
                ExprSyntax::Paren(Rc::new(ParenExprSyntax {
                    location: SrcLocation::merge(&begin, &end.location),
                    scope: Rc::clone(scope),
                    expr,
                }))
            }
            TokenKind::CastKeyword => {
                self.bump();
                self.expect(TokenKind::OpenBracket, &mut diagnostics);
                let target = self.parse_type_name(&mut diagnostics);
                self.expect(TokenKind::CloseBracket, &mut diagnostics);
                self.expect(TokenKind::OpenParen, &mut diagnostics);
                let expr = diagnostics.unwrap(self.parse_expr(scope)?);
                let end = self.expect(TokenKind::CloseParen, &mut diagnostics);
                ExprSyntax::Cast(Rc::new(CastExprSyntax {
                    location: SrcLocation::merge(&begin, &end.location),
                    scope: Rc::clone(scope),
                    target,
                    expr,
                }))
            }
            TokenKind::AddrOfKeyword => {
                self.bump();
                self.expect(TokenKind::OpenParen, &mut diagnostics);
                let expr = diagnostics.unwrap(self.parse_expr(scope)?);
                let end = self.expect(TokenKind::CloseParen, &mut diagnostics);
                ExprSyntax::AddressOf(Rc::new(AddressOfExprSyntax {
                    location: SrcLocation::merge(&begin, &end.location),
                    scope: Rc::clone(scope),
                    expr,
                }))
            }
            TokenKind::SizeOfKeyword => {
                self.bump();
                self.expect(TokenKind::OpenBracket, &mut diagnostics);
                let target = self.parse_type_name(&mut diagnostics);
                let end = self.expect(TokenKind::CloseBracket, &mut diagnostics);
                ExprSyntax::SizeOf(Rc::new(SizeOfExprSyntax {
                    location: SrcLocation::merge(&begin, &end.location),
                    scope: Rc::clone(scope),
                    target,
                }))
            }
            TokenKind::DerefAsKeyword => {
                self.bump();
                self.expect(TokenKind::OpenBracket, &mut diagnostics);
                let target = self.parse_type_name(&mut diagnostics);
                self.expect(TokenKind::CloseBracket, &mut diagnostics);
                self.expect(TokenKind::OpenParen, &mut diagnostics);
                let expr = diagnostics.unwrap(self.parse_expr(scope)?);
                let end = self.expect(TokenKind::CloseParen, &mut diagnostics);
                ExprSyntax::DerefAs(Rc::new(DerefAsExprSyntax {
                    location: SrcLocation::merge(&begin, &end.location),
                    scope: Rc::clone(scope),
                    target,
                    expr,
                }))
            }
            TokenKind::VtblPtrKeyword => {
                self.bump();
                self.expect(TokenKind::OpenBracket, &mut diagnostics);
                let trait_name = self.parse_symbol_name(&mut diagnostics);
                self.expect(TokenKind::CloseBracket, &mut diagnostics);
                self.expect(TokenKind::OpenParen, &mut diagnostics);
                let expr = diagnostics.unwrap(self.parse_expr(scope)?);
                let end = self.expect(TokenKind::CloseParen, &mut diagnostics);
                ExprSyntax::VtblPtr(Rc::new(VtblPtrExprSyntax {
                    location: SrcLocation::merge(&begin, &end.location),
                    scope: Rc::clone(scope),
                    trait_name,
                    expr,
                }))
            }
            TokenKind::TypeInfoPtrKeyword => {
                self.bump();
                self.expect(TokenKind::OpenBracket, &mut diagnostics);
                let target = self.parse_type_name(&mut diagnostics);
                let end = self.expect(TokenKind::CloseBracket, &mut diagnostics);
                ExprSyntax::TypeInfoPtr(Rc::new(TypeInfoPtrExprSyntax {
                    location: SrcLocation::merge(&begin, &end.location),
                    scope: Rc::clone(scope),
                    target,
                }))
            }
            TokenKind::SelfKeyword => {
                let token = self.bump();
                let name = SymbolName {
                    global: false,
                    sections: vec![SymbolNameSection::plain(Ident::new(
                        token.location.clone(),
                        "self",
                    ))],
                    location: token.location.clone(),
                };
                ExprSyntax::LiteralSymbol(Rc::new(LiteralSymbolExprSyntax {
                    location: token.location,
                    scope: Rc::clone(scope),
                    name,
                }))
            }
            // `new Path { field: expr, ... }` — `new` is contextual
            TokenKind::Identifier
                if self.peek().text == "new"
                    && matches!(
                        self.peek_at(1).kind,
                        TokenKind::Identifier | TokenKind::ColonColon
                    ) =>
            {
                self.bump();
                let type_name = self.parse_symbol_name(&mut diagnostics);
                self.expect(TokenKind::OpenBrace, &mut diagnostics);

                let mut args = vec![];
                while !self.at(TokenKind::CloseBrace) && !self.at(TokenKind::EndOfFile) {
                    let field = self.parse_name(&mut diagnostics);
                    let value = if self.eat(TokenKind::Colon).is_some() {
                        Some(diagnostics.unwrap(self.parse_expr(scope)?))
                    } else {
                        None
                    };
                    args.push((field, value));
                    if self.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
                let end = self.expect(TokenKind::CloseBrace, &mut diagnostics);

                ExprSyntax::StructConstruction(Rc::new(StructConstructionExprSyntax {
                    location: SrcLocation::merge(&begin, &end.location),
                    scope: Rc::clone(scope),
                    type_name,
                    args,
                }))
            }
            TokenKind::Identifier | TokenKind::ColonColon => {
                let name = self.parse_symbol_name(&mut diagnostics);
                ExprSyntax::LiteralSymbol(Rc::new(LiteralSymbolExprSyntax {
                    location: name.location.clone(),
                    scope: Rc::clone(scope),
                    name,
                }))
            }
            _ => return fail(self.unexpected_token("an expression")),
        };

        Ok(Diagnosed::new(node, diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilation::Compilation;
    use crate::lexer::Lexer;
    use crate::source::SrcBuffer;
    use crate::syntax::exprs::ExprSyntax;

    fn parse(source: &str) -> ExprSyntax {
        let compilation = Compilation::new("t");
        let tokens = Lexer::new(SrcBuffer::file("t.ace", source)).lex().value;
        let mut parser = Parser::new(&compilation, tokens);
        let scope = compilation.root_scope.create_child_anon();
        parser.parse_expr(&scope).unwrap().value
    }

    fn assert_children_contained(expr: &ExprSyntax) {
        let location = expr.location();
        for child in expr.children() {
            assert!(
                location.contains(&child.location()),
                "child span escapes its parent in {:?}",
                location.text()
            );
            assert_children_contained(&child);
        }
    }

    #[test]
    fn test_child_spans_stay_inside_their_parents() {
        for source in [
            "a + b * c",
            "!(a && b) || c",
            "f(x, y).field",
            "cast[i32](a + 1)",
            "box a.b(c)",
        ] {
            assert_children_contained(&parse(source));
        }
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let ExprSyntax::UserBinary(add) = parse("a + b * c") else {
            panic!("+ is the root");
        };
        assert_eq!(add.op, TokenKind::Plus);
        assert!(matches!(add.rhs, ExprSyntax::UserBinary(ref mul) if mul.op == TokenKind::Asterisk));
    }

    #[test]
    fn test_logical_or_is_loosest() {
        assert!(matches!(parse("a && b || c"), ExprSyntax::Or(_)));
        assert!(matches!(parse("a || b && c"), ExprSyntax::Or(_)));
    }

    #[test]
    fn test_comparison_sits_between_shift_and_logic() {
        let ExprSyntax::And(and) = parse("a < b << 2 && c") else {
            panic!("&& is the root");
        };
        assert!(matches!(and.lhs, ExprSyntax::UserBinary(ref cmp) if cmp.op == TokenKind::LessThan));
    }

    #[test]
    fn test_member_access_and_call_are_postfix() {
        let ExprSyntax::Call(call) = parse("a.b(c)") else {
            panic!("call is the root");
        };
        assert!(matches!(call.callee, ExprSyntax::MemberAccess(_)));
    }
}
