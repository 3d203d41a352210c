use thiserror::Error;

/// Errors raised while constructing or mutating model objects (spans,
/// feature structures, patterns).
///
/// Unification *failure* is never an error: it is an `Option::None` /
/// backtracking signal. The variants here all indicate API misuse or
/// invalid construction input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Span construction with ends out of order for the offset domain.
    #[error("invalid span: {0}")]
    InvalidSpan(String),

    /// A write was attempted on a frozen object.
    #[error("the {0} is immutable")]
    Frozen(&'static str),

    /// A hash was requested on a feature structure that is still mutable.
    #[error("the feature structure does not have a valid hash code, because it is mutable")]
    NotFrozen,

    /// A feature name that is not defined in the feature system.
    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    /// A symbol name that is not defined in the feature system.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// A symbolic feature was declared with more symbols than the bitmask
    /// representation can hold.
    #[error("symbolic feature \"{0}\" has more than 64 symbols")]
    TooManySymbols(String),

    /// Quantifier bounds that cannot be compiled.
    #[error("invalid quantifier: {0}")]
    InvalidQuantifier(String),

    /// A pattern tree that cannot be compiled.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Errors raised by rule application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// A rule (or cascade) kept applying without converging. The
    /// application bound is the only safety valve against runaway rules,
    /// so this is fatal and not retried.
    #[error("rule \"{rule}\" exceeded {applications} applications without converging")]
    InfiniteLoop { rule: String, applications: usize },

    #[error(transparent)]
    Model(#[from] ModelError),
}
