use thiserror::Error;

/// Canonical result for the data engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Every violation an operator can detect. Raised synchronously by the operator
/// that sees it; empty results and unmatched outer rows are data, not errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("duplicate field '{0}'")]
    DuplicateField(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("field '{0}' exists on both sides of the join; supply an alias")]
    FieldCollision(String),

    #[error("incompatible join keys '{left}' and '{right}': {reason}")]
    IncompatibleJoinKeys {
        left: String,
        right: String,
        reason: String,
    },

    #[error("unknown reducer '{0}'")]
    UnknownReducer(String),

    #[error("field '{0}' is not continuous")]
    NonContinuousField(String),

    #[error("invalid bin configuration: {0}")]
    InvalidBinConfig(String),

    #[error("data build error: {0}")]
    Build(String),
}

impl Error {
    pub fn unknown_field(name: impl Into<String>) -> Self {
        Error::UnknownField(name.into())
    }
}
