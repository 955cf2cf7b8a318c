//! Error types for enforcer-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that end the CLI with a non-zero exit code
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from enforcer-core
    #[error(transparent)]
    Core(#[from] enforcer_core::Error),

    /// Error from enforcer-sys
    #[error(transparent)]
    Sys(#[from] enforcer_sys::Error),

    /// Report could not be rendered as JSON
    #[error("Failed to render report: {0}")]
    Json(#[from] serde_json::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
