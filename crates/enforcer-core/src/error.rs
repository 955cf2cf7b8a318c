//! Error types for enforcer-core

use crate::stage::StageKind;

/// Result type for enforcer-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by probes, remediators and configuration handling
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration failed validation
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A command ran successfully but its output could not be interpreted
    #[error("Unexpected output from '{program}': {message}")]
    UnexpectedOutput { program: String, message: String },

    // Transparent wrappers for underlying crate errors
    /// Operating-system collaborator error from enforcer-sys
    #[error(transparent)]
    Sys(#[from] enforcer_sys::Error),

    /// Filesystem or config storage error from enforcer-fs
    #[error(transparent)]
    Fs(#[from] enforcer_fs::Error),
}

impl Error {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Why a stage could not be brought to a healthy state
///
/// Every variant is fatal to the run; the engine never retries across stages.
#[derive(Debug, thiserror::Error)]
pub enum StageFailure {
    /// The probe itself could not execute
    #[error("{stage}: probe failed: {source}")]
    ProbeFailed {
        stage: StageKind,
        #[source]
        source: Error,
    },

    /// The corrective action could not be issued
    #[error("{stage}: remediation failed: {source}")]
    RemediationFailed {
        stage: StageKind,
        #[source]
        source: Error,
    },

    /// The probe kept reporting unhealthy until the poll budget ran out
    #[error("{stage}: still unhealthy after {attempts} attempts")]
    BudgetExhausted { stage: StageKind, attempts: u32 },

    /// The condition has no remediation available to this engine
    #[error("{stage}: {detail}")]
    DependencyAbsent { stage: StageKind, detail: String },
}

impl StageFailure {
    pub fn stage(&self) -> StageKind {
        match self {
            Self::ProbeFailed { stage, .. }
            | Self::RemediationFailed { stage, .. }
            | Self::BudgetExhausted { stage, .. }
            | Self::DependencyAbsent { stage, .. } => *stage,
        }
    }

    /// Whether this failure is a timeout rather than an execution error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::BudgetExhausted { .. })
    }
}
