use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::source::SrcLocation;

/// Every token kind the scanner can produce. Numeric literals get one kind
/// per type suffix so the parser never re-inspects literal text to learn
/// its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    EndOfFile,

    // punctuation
    Colon,
    ColonColon,
    Semicolon,
    Comma,
    Exclamation,
    Tilde,
    Dot,
    MinusGreaterThan,

    // brackets
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,

    Identifier,

    // numeric literals, one per suffix
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

    // operators
    Equals,
    EqualsEquals,
    ExclamationEquals,
    Plus,
    PlusEquals,
    Minus,
    MinusEquals,
    Asterisk,
    AsteriskEquals,
    Slash,
    SlashEquals,
    Percent,
    PercentEquals,
    LessThan,
    LessThanEquals,
    GreaterThan,
    GreaterThanEquals,
    LessThanLessThan,
    LessThanLessThanEquals,
    GreaterThanGreaterThan,
    GreaterThanGreaterThanEquals,
    Caret,
    CaretEquals,
    Ampersand,
    AmpersandEquals,
    AmpersandAmpersand,
    VerticalBar,
    VerticalBarEquals,
    VerticalBarVerticalBar,

    // keywords
    IfKeyword,
    ElseKeyword,
    ElifKeyword,
    WhileKeyword,
    RetKeyword,
    StructKeyword,
    TraitKeyword,
    ImplKeyword,
    ForKeyword,
    PubKeyword,
    SelfKeyword,
    SelfTypeKeyword,
    ExternKeyword,
    CastKeyword,
    ExitKeyword,
    AssertKeyword,
    ModKeyword,
    UseKeyword,
    WhereKeyword,
    OpKeyword,
    BoxKeyword,
    UnboxKeyword,
    LockKeyword,
    CopyKeyword,
    DropKeyword,
    AddrOfKeyword,
    SizeOfKeyword,
    DerefAsKeyword,
    TypeInfoPtrKeyword,
    VtblPtrKeyword,
    TrueKeyword,
    FalseKeyword,
}

impl TokenKind {
    pub fn is_numeric_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Int8
                | TokenKind::Int16
                | TokenKind::Int32
                | TokenKind::Int64
                | TokenKind::UInt8
                | TokenKind::UInt16
                | TokenKind::UInt32
                | TokenKind::UInt64
                | TokenKind::Int
                | TokenKind::Float32
                | TokenKind::Float64
        )
    }

    /// The `OP=` forms that desugar to `a = a OP b`.
    pub fn is_compound_assignment(&self) -> bool {
        matches!(
            self,
            TokenKind::PlusEquals
                | TokenKind::MinusEquals
                | TokenKind::AsteriskEquals
                | TokenKind::SlashEquals
                | TokenKind::PercentEquals
                | TokenKind::LessThanLessThanEquals
                | TokenKind::GreaterThanGreaterThanEquals
                | TokenKind::AmpersandEquals
                | TokenKind::CaretEquals
                | TokenKind::VerticalBarEquals
        )
    }

    /// The plain operator a compound assignment applies.
    pub fn compound_assignment_op(&self) -> Option<TokenKind> {
        Some(match self {
            TokenKind::PlusEquals => TokenKind::Plus,
            TokenKind::MinusEquals => TokenKind::Minus,
            TokenKind::AsteriskEquals => TokenKind::Asterisk,
            TokenKind::SlashEquals => TokenKind::Slash,
            TokenKind::PercentEquals => TokenKind::Percent,
            TokenKind::LessThanLessThanEquals => TokenKind::LessThanLessThan,
            TokenKind::GreaterThanGreaterThanEquals => TokenKind::GreaterThanGreaterThan,
            TokenKind::AmpersandEquals => TokenKind::Ampersand,
            TokenKind::CaretEquals => TokenKind::Caret,
            TokenKind::VerticalBarEquals => TokenKind::VerticalBar,
            _ => return None,
        })
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SrcLocation,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, location: SrcLocation, text: impl Into<String>) -> Token {
        Token {
            kind,
            location,
            text: text.into(),
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            write!(f, "{:?}", self.kind)
        } else {
            write!(f, "{:?}({})", self.kind, self.text)
        }
    }
}

/// Identifier strings that map to a single keyword token.
pub static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    HashMap::from([
        ("if", TokenKind::IfKeyword),
        ("else", TokenKind::ElseKeyword),
        ("elif", TokenKind::ElifKeyword),
        ("while", TokenKind::WhileKeyword),
        ("ret", TokenKind::RetKeyword),
        ("struct", TokenKind::StructKeyword),
        ("trait", TokenKind::TraitKeyword),
        ("impl", TokenKind::ImplKeyword),
        ("for", TokenKind::ForKeyword),
        ("pub", TokenKind::PubKeyword),
        ("self", TokenKind::SelfKeyword),
        ("Self", TokenKind::SelfTypeKeyword),
        ("extern", TokenKind::ExternKeyword),
        ("cast", TokenKind::CastKeyword),
        ("exit", TokenKind::ExitKeyword),
        ("assert", TokenKind::AssertKeyword),
        ("mod", TokenKind::ModKeyword),
        ("use", TokenKind::UseKeyword),
        ("where", TokenKind::WhereKeyword),
        ("op", TokenKind::OpKeyword),
        ("box", TokenKind::BoxKeyword),
        ("unbox", TokenKind::UnboxKeyword),
        ("lock", TokenKind::LockKeyword),
        ("copy", TokenKind::CopyKeyword),
        ("drop", TokenKind::DropKeyword),
        ("addr_of", TokenKind::AddrOfKeyword),
        ("size_of", TokenKind::SizeOfKeyword),
        ("deref_as", TokenKind::DerefAsKeyword),
        ("type_info_ptr", TokenKind::TypeInfoPtrKeyword),
        ("vtbl_ptr", TokenKind::VtblPtrKeyword),
        ("true", TokenKind::TrueKeyword),
        ("false", TokenKind::FalseKeyword),
    ])
});

/// Native-type keyword identifiers and the global path sections they
/// expand to. `i32` lexes to the token sequence of `::std::i32::I32`, so
/// downstream name resolution never treats native types specially.
pub static NATIVE_TYPE_PATHS: Lazy<HashMap<&'static str, [&'static str; 3]>> = Lazy::new(|| {
    HashMap::from([
        ("i8", ["std", "i8", "I8"]),
        ("i16", ["std", "i16", "I16"]),
        ("i32", ["std", "i32", "I32"]),
        ("i64", ["std", "i64", "I64"]),
        ("u8", ["std", "u8", "U8"]),
        ("u16", ["std", "u16", "U16"]),
        ("u32", ["std", "u32", "U32"]),
        ("u64", ["std", "u64", "U64"]),
        ("int", ["std", "int", "Int"]),
        ("f32", ["std", "f32", "F32"]),
        ("f64", ["std", "f64", "F64"]),
        ("bool", ["std", "bool", "Bool"]),
        ("void", ["std", "void", "Void"]),
    ])
});

/// Numeric literal type suffixes and their token kinds. An empty suffix is
/// the default `Int`.
pub fn numeric_suffix_kind(suffix: &str) -> Option<TokenKind> {
    Some(match suffix {
        "" => TokenKind::Int,
        "i8" => TokenKind::Int8,
        "i16" => TokenKind::Int16,
        "i32" => TokenKind::Int32,
        "i64" => TokenKind::Int64,
        "u8" => TokenKind::UInt8,
        "u16" => TokenKind::UInt16,
        "u32" => TokenKind::UInt32,
        "u64" => TokenKind::UInt64,
        "f32" => TokenKind::Float32,
        "f64" => TokenKind::Float64,
        _ => return None,
    })
}
