//! Error types for the provisioner

use thiserror::Error;

/// Main error type for the provisioner
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The remote host is unreachable or rejected authentication.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A remote command exceeded the runner's maximum wait.
    #[error("Timed out after {secs}s: {command}")]
    TimeoutError { command: String, secs: u64 },

    /// An idempotency check could not be evaluated.
    #[error("Precondition check error: {0}")]
    PreconditionCheckError(String),

    /// A remote command or upload reported failure.
    #[error("Action failed: {0}")]
    ActionFailure(String),

    /// A template parameter is missing or carries invalid characters.
    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProvisionError {
    /// Errors after which no further remote action is possible, whatever the
    /// policy of the step that raised them.
    pub fn aborts_run(&self) -> bool {
        matches!(
            self,
            ProvisionError::ConnectionError(_) | ProvisionError::TimeoutError { .. }
        )
    }
}
