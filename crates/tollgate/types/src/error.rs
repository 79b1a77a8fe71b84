//! Error types for tollgate-types

use thiserror::Error;

/// Errors raised while building core values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    /// A duration string was not ISO-8601 (`PnDTnHnMnS`)
    #[error("invalid ISO-8601 duration: {input}")]
    InvalidDuration { input: String },

    /// A status name did not match any known resource status
    #[error("unknown resource status: {0}")]
    UnknownStatus(String),
}

/// Result type for tollgate-types
pub type Result<T> = std::result::Result<T, TypesError>;
