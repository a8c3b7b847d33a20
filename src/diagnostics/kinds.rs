use serde::Serialize;

/// Machine-readable classification of every diagnostic the front-end can
/// produce, grouped by the stage that reports it. Tests match on these
/// rather than on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    // lexing
    UnexpectedCharacter,
    UnterminatedMultiLineComment,
    UnterminatedStringLiteral,
    UnknownNumericLiteralTypeSuffix,
    DecimalPointInNonFloatNumericLiteral,

    // parsing
    UnexpectedToken,
    MissingToken,
    EmptyTemplateParams,
    EmptyTemplateArgs,
    EmptyModifiers,
    ExternInstanceFunction,
    UnknownModifier,
    ForbiddenModifier,
    MissingSelfModifierAfterStrongPtr,
    UnconstrainedTypeParam,
    ConstrainedNonGenericSymbol,

    // symbols
    SymbolRedefinition,
    MismatchedAccessModifier,
    UndefinedSymbolRef,
    AmbiguousSymbolRef,
    InaccessibleSymbol,
    IncorrectSymbolCategory,
    IncorrectSymbolType,
    NonSelfScopedSymbolScopeAccess,

    // templates
    UnableToDeduceTemplateArgs,
    UnableToDeduceTemplateArg,
    TooManyTemplateArgs,
    TemplateArgDeductionConflict,
    UndefinedTemplateInstanceRef,

    // types
    TypeMismatch,
    InvalidImplicitConversion,
    InvalidExplicitConversion,
    ExpectedLValue,
    ExpectedRValue,
    ExpectedSizedType,

    // struct construction
    UnknownStructField,
    DuplicateStructField,
    MissingStructFields,

    // control flow
    NotAllControlPathsReturn,
}
