//! # Lexer
//!
//! Transforms a [`SrcBuffer`] into a flat token stream terminated by
//! `EndOfFile`, accumulating recoverable diagnostics along the way.
//!
//! ```text
//! Source Code  →  Scanner  →  Token Stream  →  Parser
//!    (String)     (char cursor)  (Positioned)
//! ```
//!
//! The scanner is a plain character cursor, not a generated matcher: two
//! behaviors rule the generators out. Multi-line comments nest to arbitrary
//! depth, and native-type keywords (`i32`, `bool`, …) expand into the token
//! sequence of their fully-qualified standard-library path, so one lexeme
//! can yield several tokens sharing a source location.
//!
//! Recovery policy: every failure produces a diagnostic and leaves the
//! scanner in a state where it can keep going — an unexpected character is
//! skipped, an unterminated string or comment ends at end-of-file, an
//! unknown numeric suffix falls back to the default `Int` literal kind.
//! Lexing therefore always produces a complete token stream.

mod token;

pub use token::{numeric_suffix_kind, Token, TokenKind, KEYWORDS, NATIVE_TYPE_PATHS};

use std::rc::Rc;

use log::trace;

use crate::diagnostics::{Diagnosed, Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::source::{SrcBuffer, SrcLocation};

pub struct Lexer {
    buffer: Rc<SrcBuffer>,
    chars: Vec<(usize, char)>,
    cursor: usize,
}

impl Lexer {
    pub fn new(buffer: Rc<SrcBuffer>) -> Lexer {
        let chars = buffer.contents().char_indices().collect();
        Lexer {
            buffer,
            chars,
            cursor: 0,
        }
    }

    pub fn lex(mut self) -> Diagnosed<Vec<Token>> {
        let mut diagnostics = DiagnosticBag::new();
        let mut tokens = vec![];

        loop {
            self.eat_trivia(&mut diagnostics);

            let Some(c) = self.peek() else {
                break;
            };

            match c {
                '"' => self.scan_string(&mut tokens, &mut diagnostics),
                c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(&mut tokens),
                c if c.is_ascii_digit() => self.scan_numeric_literal(&mut tokens, &mut diagnostics),
                _ => self.scan_punctuation(&mut tokens, &mut diagnostics),
            }
        }

        let end = self.buffer.contents().len();
        tokens.push(Token::new(
            TokenKind::EndOfFile,
            SrcLocation::new(Rc::clone(&self.buffer), end, end),
            "",
        ));

        trace!(
            "lexed {} tokens from {}",
            tokens.len(),
            self.buffer.display_name()
        );

        Diagnosed::new(tokens, diagnostics)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.cursor).map(|(_, c)| *c)
    }

    fn peek_at(&self, distance: usize) -> Option<char> {
        self.chars.get(self.cursor + distance).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.cursor)
            .map(|(offset, _)| *offset)
            .unwrap_or_else(|| self.buffer.contents().len())
    }

    fn advance(&mut self) {
        self.cursor += 1;
    }

    fn location_from(&self, begin: usize) -> SrcLocation {
        SrcLocation::new(Rc::clone(&self.buffer), begin, self.offset())
    }

    /// Whitespace and comments. `//` runs to end of line; `/* */` nests,
    /// and an unterminated nest is anchored at the outermost opener.
    fn eat_trivia(&mut self, diagnostics: &mut DiagnosticBag) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => self.advance(),
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => {
                    let begin = self.offset();
                    self.advance();
                    self.advance();

                    let mut depth = 1usize;
                    while depth > 0 {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('/'), Some('*')) => {
                                depth += 1;
                                self.advance();
                                self.advance();
                            }
                            (Some('*'), Some('/')) => {
                                depth -= 1;
                                self.advance();
                                self.advance();
                            }
                            (Some(_), _) => self.advance(),
                            (None, _) => {
                                diagnostics.add(Diagnostic::error(
                                    DiagnosticKind::UnterminatedMultiLineComment,
                                    SrcLocation::new(Rc::clone(&self.buffer), begin, begin + 2),
                                    "unterminated multi-line comment",
                                ));
                                break;
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn scan_identifier(&mut self, tokens: &mut Vec<Token>) {
        let begin = self.offset();
        let mut string = String::new();

        while let Some(c) = self.peek() {
            if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            string.push(c);
            self.advance();
        }

        let location = self.location_from(begin);

        if let Some(sections) = NATIVE_TYPE_PATHS.get(string.as_str()) {
            // one lexeme, several tokens: `i32` becomes `::std::i32::I32`
            for section in sections.iter() {
                tokens.push(Token::new(TokenKind::ColonColon, location.clone(), ""));
                tokens.push(Token::new(
                    TokenKind::Identifier,
                    location.clone(),
                    *section,
                ));
            }
            return;
        }

        match KEYWORDS.get(string.as_str()) {
            Some(kind) => tokens.push(Token::new(*kind, location, string)),
            None => tokens.push(Token::new(TokenKind::Identifier, location, string)),
        }
    }

    fn scan_numeric_literal(&mut self, tokens: &mut Vec<Token>, diagnostics: &mut DiagnosticBag) {
        let begin = self.offset();
        let mut digits = String::new();
        let mut has_decimal_point = false;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.advance();
            } else if c == '.' && !has_decimal_point && matches!(self.peek_at(1), Some(d) if d.is_ascii_digit())
            {
                has_decimal_point = true;
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let mut suffix = String::new();
        if matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            suffix.push(self.peek().unwrap());
            self.advance();
            while let Some(c) = self.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                suffix.push(c);
                self.advance();
            }
        }

        let location = self.location_from(begin);

        let kind = match numeric_suffix_kind(&suffix) {
            Some(kind) => kind,
            None => {
                diagnostics.add(Diagnostic::error(
                    DiagnosticKind::UnknownNumericLiteralTypeSuffix,
                    location.clone(),
                    format!("unknown numeric literal type suffix '{suffix}'"),
                ));
                TokenKind::Int
            }
        };

        if has_decimal_point && !matches!(kind, TokenKind::Float32 | TokenKind::Float64) {
            diagnostics.add(Diagnostic::error(
                DiagnosticKind::DecimalPointInNonFloatNumericLiteral,
                location.clone(),
                "decimal point in non-float numeric literal",
            ));
        }

        tokens.push(Token::new(kind, location, digits));
    }

    fn scan_string(&mut self, tokens: &mut Vec<Token>, diagnostics: &mut DiagnosticBag) {
        let begin = self.offset();
        self.advance();

        let mut contents = String::new();
        let mut terminated = false;
        while let Some(c) = self.peek() {
            if c == '"' {
                self.advance();
                terminated = true;
                break;
            }
            if c == '\\' {
                contents.push(c);
                self.advance();
                if let Some(escaped) = self.peek() {
                    contents.push(escaped);
                    self.advance();
                }
                continue;
            }
            contents.push(c);
            self.advance();
        }

        if !terminated {
            diagnostics.add(Diagnostic::error(
                DiagnosticKind::UnterminatedStringLiteral,
                SrcLocation::new(Rc::clone(&self.buffer), begin, begin + 1),
                "unterminated string literal",
            ));
        }

        let text = unescape::unescape(&contents).unwrap_or(contents);
        tokens.push(Token::new(
            TokenKind::String,
            self.location_from(begin),
            text,
        ));
    }

    /// Maximal-munch operator and punctuation scanning. An unexpected
    /// character is reported, skipped, and scanning continues.
    fn scan_punctuation(&mut self, tokens: &mut Vec<Token>, diagnostics: &mut DiagnosticBag) {
        use TokenKind::*;

        let begin = self.offset();
        let first = self.peek().unwrap();
        self.advance();

        let kind = match first {
            '=' => self.munch_equals(EqualsEquals, Equals),
            '+' => self.munch_equals(PlusEquals, Plus),
            '*' => self.munch_equals(AsteriskEquals, Asterisk),
            '/' => self.munch_equals(SlashEquals, Slash),
            '%' => self.munch_equals(PercentEquals, Percent),
            '^' => self.munch_equals(CaretEquals, Caret),
            '!' => self.munch_equals(ExclamationEquals, Exclamation),
            '-' => match self.peek() {
                Some('=') => {
                    self.advance();
                    MinusEquals
                }
                Some('>') => {
                    self.advance();
                    MinusGreaterThan
                }
                _ => Minus,
            },
            '<' => match self.peek() {
                Some('<') => {
                    self.advance();
                    self.munch_equals(LessThanLessThanEquals, LessThanLessThan)
                }
                Some('=') => {
                    self.advance();
                    LessThanEquals
                }
                _ => LessThan,
            },
            '>' => match self.peek() {
                Some('>') => {
                    self.advance();
                    self.munch_equals(GreaterThanGreaterThanEquals, GreaterThanGreaterThan)
                }
                Some('=') => {
                    self.advance();
                    GreaterThanEquals
                }
                _ => GreaterThan,
            },
            '&' => match self.peek() {
                Some('&') => {
                    self.advance();
                    AmpersandAmpersand
                }
                Some('=') => {
                    self.advance();
                    AmpersandEquals
                }
                _ => Ampersand,
            },
            '|' => match self.peek() {
                Some('|') => {
                    self.advance();
                    VerticalBarVerticalBar
                }
                Some('=') => {
                    self.advance();
                    VerticalBarEquals
                }
                _ => VerticalBar,
            },
            ':' => match self.peek() {
                Some(':') => {
                    self.advance();
                    ColonColon
                }
                _ => Colon,
            },
            '.' => Dot,
            ',' => Comma,
            ';' => Semicolon,
            '~' => Tilde,
            '(' => OpenParen,
            ')' => CloseParen,
            '{' => OpenBrace,
            '}' => CloseBrace,
            '[' => OpenBracket,
            ']' => CloseBracket,
            other => {
                diagnostics.add(Diagnostic::error(
                    DiagnosticKind::UnexpectedCharacter,
                    self.location_from(begin),
                    format!("unexpected character '{other}'"),
                ));
                return;
            }
        };

        let location = self.location_from(begin);
        let text = location.text().to_string();
        tokens.push(Token::new(kind, location, text));
    }

    fn munch_equals(&mut self, with_equals: TokenKind, without: TokenKind) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            with_equals
        } else {
            without
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Diagnosed<Vec<Token>> {
        Lexer::new(SrcBuffer::file("test.ace", source)).lex()
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_identifier() {
        let result = lex("letter");

        assert!(result.diagnostics.is_empty());
        assert_eq!(result.value[0].kind, TokenKind::Identifier);
        assert_eq!(result.value[0].text, "letter");
        assert_eq!(result.value.last().unwrap().kind, TokenKind::EndOfFile);
    }

    #[test]
    fn test_lex_keywords() {
        for (text, kind) in KEYWORDS.iter() {
            let result = lex(text);
            assert_eq!(result.value[0].kind, *kind, "keyword {text}");
        }
    }

    #[test]
    fn test_lex_native_type_expands_to_path() {
        let result = lex("i32");

        use TokenKind::*;
        assert_eq!(
            kinds(&result.value),
            vec![
                ColonColon, Identifier, ColonColon, Identifier, ColonColon, Identifier, EndOfFile
            ]
        );
        assert_eq!(result.value[1].text, "std");
        assert_eq!(result.value[3].text, "i32");
        assert_eq!(result.value[5].text, "I32");
    }

    #[test]
    fn test_lex_numeric_suffixes() {
        let result = lex("1 2u8 3i64 4.5f32");

        use TokenKind::*;
        assert_eq!(
            kinds(&result.value),
            vec![Int, UInt8, Int64, Float32, EndOfFile]
        );
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_lex_unknown_suffix_recovers_to_int() {
        let result = lex("17q3");

        assert_eq!(result.value[0].kind, TokenKind::Int);
        assert_eq!(
            result
                .diagnostics
                .of_kind(DiagnosticKind::UnknownNumericLiteralTypeSuffix)
                .count(),
            1
        );
    }

    #[test]
    fn test_lex_decimal_point_requires_float_suffix() {
        let result = lex("1.5i32");

        assert_eq!(
            result
                .diagnostics
                .of_kind(DiagnosticKind::DecimalPointInNonFloatNumericLiteral)
                .count(),
            1
        );
    }

    #[test]
    fn test_lex_maximal_munch_shifts() {
        let result = lex("<<= << <");

        use TokenKind::*;
        assert_eq!(
            kinds(&result.value),
            vec![LessThanLessThanEquals, LessThanLessThan, LessThan, EndOfFile]
        );
    }

    #[test]
    fn test_lex_nested_comment_depth_four() {
        let result = lex("/* 1 /* 2 /* 3 /* 4 */ */ */ */ x");

        assert!(result.diagnostics.is_empty());
        assert_eq!(result.value[0].text, "x");
    }

    #[test]
    fn test_lex_unterminated_comment_anchors_at_opener() {
        let result = lex("x /* never closed");

        let diagnostic = result
            .diagnostics
            .of_kind(DiagnosticKind::UnterminatedMultiLineComment)
            .next()
            .unwrap();
        assert_eq!(diagnostic.location.as_ref().unwrap().begin, 2);
    }

    #[test]
    fn test_lex_unterminated_string_anchors_at_quote() {
        let result = lex("\"abc");

        let diagnostic = result
            .diagnostics
            .of_kind(DiagnosticKind::UnterminatedStringLiteral)
            .next()
            .unwrap();
        assert_eq!(diagnostic.location.as_ref().unwrap().begin, 0);
    }

    #[test]
    fn test_lex_unexpected_character_recovers() {
        let result = lex("a @ b");

        assert_eq!(
            result
                .diagnostics
                .of_kind(DiagnosticKind::UnexpectedCharacter)
                .count(),
            1
        );
        assert_eq!(
            kinds(&result.value),
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::EndOfFile
            ]
        );
    }

    #[test]
    fn test_token_span_matches_text() {
        let result = lex("foo += 42");

        for token in &result.value {
            if token.kind == TokenKind::EndOfFile || token.kind.is_numeric_literal() {
                continue;
            }
            if token.kind == TokenKind::Identifier {
                assert_eq!(token.location.text(), token.text);
            }
            assert!(token.location.begin <= token.location.end);
        }
    }
}
