//! CLI error types

use thiserror::Error;
use tollgate_veto::VetoError;
use tollgate_window::WindowError;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Window expression or constraint error
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Veto evaluation error
    #[error("Veto error: {0}")]
    Veto(#[from] VetoError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
