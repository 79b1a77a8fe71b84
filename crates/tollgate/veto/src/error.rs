//! Error types for veto evaluation

use thiserror::Error;
use tollgate_types::ResourceId;
use tollgate_window::WindowError;

/// Veto errors
#[derive(Debug, Error, Clone)]
pub enum VetoError {
    /// A collaborator (status store, fingerprint store, ...) failed
    #[error("repository error: {reason}")]
    Repository { reason: String },

    /// The resource is unknown to the resource repository
    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceId),

    /// A message passed to a veto did not have the expected shape
    #[error("invalid message for {veto}: {reason}")]
    InvalidMessage { veto: String, reason: String },

    /// No veto with this name is registered
    #[error("unknown veto: {0}")]
    UnknownVeto(String),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A time-window constraint could not be built
    #[error(transparent)]
    Window(#[from] WindowError),
}

impl VetoError {
    pub fn repository(reason: impl Into<String>) -> Self {
        VetoError::Repository {
            reason: reason.into(),
        }
    }
}

/// Result type for veto operations
pub type Result<T> = std::result::Result<T, VetoError>;
