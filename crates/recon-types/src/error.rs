use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("unknown status '{value}' for {entity}")]
    UnknownStatus { entity: &'static str, value: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors raised while building a store ledger mapping.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is longer than {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} contains an unsupported character: {value:?}")]
    InvalidCharacter { field: &'static str, value: String },

    #[error("duplicate ledger mapping for store {0}")]
    DuplicateStore(u32),
}
