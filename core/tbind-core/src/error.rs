//! Error types for tbind.
//!
//! Every fallible operation returns `TbResult<T>`. Validation failure is not
//! an error: `Record::save` reports it as `Ok(false)`.

use thiserror::Error;

/// Unified error type for all tbind operations.
#[derive(Debug, Error)]
pub enum TbError {
    /// The store returned no usable columns for a collection at bind time.
    #[error("schema unavailable for '{collection}': {reason}")]
    SchemaUnavailable { collection: String, reason: String },

    /// A time column setter received a value it cannot encode.
    #[error("type mismatch on '{column}': expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    /// `find` matched no row.
    #[error("record not found in '{collection}' with key '{key}'")]
    RecordNotFound { collection: String, key: String },

    /// No accessor was generated for this attribute.
    #[error("unknown attribute '{name}' for '{collection}'")]
    UnknownAttribute { collection: String, name: String },

    /// The entity type has not been bound to a store yet.
    #[error("entity type '{0}' is not bound")]
    NotBound(String),

    /// Failure reported by a store implementation.
    #[error("store error: {0}")]
    Store(String),

    /// Malformed filter expression
    #[error("query error: {0}")]
    Query(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be read or parsed
    #[error("config error: {0}")]
    Config(String),
}

/// Result type alias for all tbind operations.
pub type TbResult<T> = Result<T, TbError>;

impl From<serde_json::Error> for TbError {
    fn from(err: serde_json::Error) -> Self {
        TbError::Serialization(err.to_string())
    }
}
