//! # Parser
//!
//! Recursive descent over the token stream, one token of lookahead for
//! most decisions and bounded `peek(distance)` scans for disambiguating
//! item-header shapes. The parser does two jobs at once:
//!
//! - build the concrete syntax tree, and
//! - materialize the scope tree — every block, struct body, trait body,
//!   impl body and function body gets its scope the moment its opening
//!   brace is consumed, so every node is born with a scope handle.
//!
//! ## Recovery
//!
//! Every entry point returns [`Expected`]: a node plus diagnostics, or
//! diagnostics alone when nothing could be produced. Two primitives keep
//! one malformed construct from derailing a whole file:
//!
//! - [`Parser::discard_until`] consumes tokens up to a synchronization
//!   kind *at the current nest level*, either eating the terminator
//!   (`Inclusive`) or leaving it (`Exclusive`);
//! - [`Parser::expect`] emits `MissingToken` anchored just after the last
//!   consumed token and continues as if the token had been present.

mod expr;
mod item;
mod stmt;

use std::rc::Rc;

use log::trace;

use crate::compilation::Compilation;
use crate::diagnostics::{Diagnosed, Diagnostic, DiagnosticBag, DiagnosticKind, Expected};
use crate::lexer::{Token, TokenKind};
use crate::scope::Scope;
use crate::source::SrcLocation;
use crate::syntax::items::ItemSyntax;

/// Whether recovery consumes the synchronization token itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discard {
    Inclusive,
    Exclusive,
}

pub struct Parser<'a> {
    pub(crate) compilation: &'a Compilation,
    tokens: Vec<Token>,
    cursor: usize,
    nest_level: isize,
    last_location: SrcLocation,
}

/// Parse every item of one source buffer into the package scope.
pub fn parse_items(
    compilation: &Compilation,
    tokens: Vec<Token>,
    package_scope: &Rc<Scope>,
) -> Diagnosed<Vec<ItemSyntax>> {
    let mut parser = Parser::new(compilation, tokens);
    let mut diagnostics = DiagnosticBag::new();
    let mut items = vec![];

    while !parser.at(TokenKind::EndOfFile) {
        match parser.parse_item(package_scope) {
            Ok(diagnosed) => items.push(diagnostics.unwrap(diagnosed)),
            Err(bag) => {
                diagnostics.merge(bag);
                parser.discard_until(
                    &[TokenKind::Semicolon, TokenKind::CloseBrace],
                    Discard::Inclusive,
                );
            }
        }
    }

    trace!("parsed {} top-level items", items.len());
    Diagnosed::new(items, diagnostics)
}

impl<'a> Parser<'a> {
    pub fn new(compilation: &'a Compilation, tokens: Vec<Token>) -> Parser<'a> {
        let last_location = tokens
            .first()
            .map(|t| t.location.clone())
            .expect("token streams end with EndOfFile");

        Parser {
            compilation,
            tokens,
            cursor: 0,
            nest_level: 0,
            last_location,
        }
    }

    pub(crate) fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    pub(crate) fn peek_at(&self, distance: usize) -> &Token {
        let index = (self.cursor + distance).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub(crate) fn location(&self) -> SrcLocation {
        self.peek().location.clone()
    }

    pub(crate) fn last_location(&self) -> SrcLocation {
        self.last_location.clone()
    }

    pub(crate) fn bump(&mut self) -> Token {
        let token = self.tokens[self.cursor.min(self.tokens.len() - 1)].clone();
        if token.kind != TokenKind::EndOfFile {
            self.cursor += 1;
        }
        match token.kind {
            TokenKind::OpenBrace => self.nest_level += 1,
            TokenKind::CloseBrace => self.nest_level -= 1,
            _ => {}
        }
        self.last_location = token.location.clone();
        token
    }

    /// Consume the next token if it has the wanted kind.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.bump())
        } else {
            None
        }
    }

    /// Consume the expected token, or report `MissingToken` anchored at
    /// the trailing position of the last consumed token and synthesize
    /// one so parsing continues as if it had been present.
    pub(crate) fn expect(&mut self, kind: TokenKind, diagnostics: &mut DiagnosticBag) -> Token {
        if self.at(kind) {
            return self.bump();
        }

        diagnostics.add(Diagnostic::error(
            DiagnosticKind::MissingToken,
            self.last_location.after(),
            format!("expected {kind:?}, found {:?}", self.peek().kind),
        ));

        Token::new(kind, self.last_location.after(), "")
    }

    pub(crate) fn unexpected_token(&mut self, context: &str) -> DiagnosticBag {
        let mut diagnostics = DiagnosticBag::new();
        diagnostics.add(Diagnostic::error(
            DiagnosticKind::UnexpectedToken,
            self.location(),
            format!("unexpected {:?} while parsing {context}", self.peek().kind),
        ));
        diagnostics
    }

    /// Skip tokens until one of `kinds` appears at the nest level the
    /// call started at. `Inclusive` also consumes the terminator.
    pub(crate) fn discard_until(&mut self, kinds: &[TokenKind], discard: Discard) {
        let target_level = self.nest_level;

        while !self.at(TokenKind::EndOfFile) {
            if self.nest_level == target_level && kinds.contains(&self.peek().kind) {
                if discard == Discard::Inclusive {
                    self.bump();
                }
                return;
            }
            // a closing brace below the target level ends the enclosing
            // construct; stop so the caller's caller can resynchronize
            if self.at(TokenKind::CloseBrace) && self.nest_level < target_level {
                return;
            }
            self.bump();
        }
    }
}

/// Convenience used by entry points that produce nothing on failure.
pub(crate) fn fail<T>(diagnostics: DiagnosticBag) -> Expected<T> {
    Err(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::source::SrcBuffer;

    fn tokens(source: &str) -> Vec<Token> {
        Lexer::new(SrcBuffer::file("t.ace", source)).lex().value
    }

    #[test]
    fn test_discard_until_respects_nesting() {
        let compilation = Compilation::new("t");
        let mut parser = Parser::new(&compilation, tokens("a { ; ; } ; b"));

        parser.discard_until(&[TokenKind::Semicolon], Discard::Inclusive);

        // the semicolons inside the braces are at a deeper nest level, so
        // the discard stops at the outer one
        assert_eq!(parser.peek().text, "b");
    }

    #[test]
    fn test_expect_synthesizes_missing_token() {
        let compilation = Compilation::new("t");
        let mut parser = Parser::new(&compilation, tokens("a b"));
        let mut diagnostics = DiagnosticBag::new();

        parser.bump();
        let token = parser.expect(TokenKind::Semicolon, &mut diagnostics);

        assert_eq!(token.kind, TokenKind::Semicolon);
        assert_eq!(diagnostics.of_kind(DiagnosticKind::MissingToken).count(), 1);
        // the next real token is still there
        assert_eq!(parser.peek().text, "b");
    }
}
