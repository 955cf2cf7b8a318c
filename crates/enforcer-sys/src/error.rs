//! Error types for enforcer-sys

/// Result type for enforcer-sys operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by operating-system collaborators
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The program could not be started at all
    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Subprocess exited with non-zero status
    #[error("'{program}' failed (exit code {code}): {message}")]
    CommandFailed {
        program: String,
        code: i32,
        message: String,
    },

    /// Subprocess output could not be decoded as text
    #[error("'{program}' produced output that is not valid UTF-8")]
    InvalidOutput { program: String },

    /// Subprocess output did not have the expected shape
    #[error("Failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    #[error("Service '{name}' does not exist")]
    ServiceNotFound { name: String },

    /// The service manager refused an operation on a service
    #[error("Service manager rejected {operation} for '{name}' (code {code}): {message}")]
    ServiceControl {
        name: String,
        operation: String,
        code: i32,
        message: String,
    },

    /// A process was launched but could not be tracked
    #[error("Failed to launch '{path}': {source}")]
    Launch {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot resolve the current executable: {0}")]
    CurrentExe(#[source] std::io::Error),

    #[error("Elevated relaunch is not supported on this platform; re-run as an administrator")]
    ElevationUnsupported,
}

impl Error {
    pub fn parse(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            message: message.into(),
        }
    }
}
