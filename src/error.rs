//! Error types for the content compliance optimizer.

use thiserror::Error;

/// Result type alias for optimizer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for optimizer operations
///
/// Detected content defects are not errors: they are reported as
/// [`Issue`](crate::content::Issue) values. This enum covers genuine failures
/// (bad input at the boundary, store I/O, corrector crashes).
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Configuration loading error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Corrector failure inside an optimization iteration
    #[error("Corrector '{component}' failed: {message}")]
    Corrector { component: String, message: String },

    /// Rule store error
    #[error("Rule store error: {0}")]
    RuleStore(String),

    /// Log sink error
    #[error("Log sink error: {0}")]
    LogSink(String),

    /// Internal error (poisoned locks and similar)
    #[error("Internal error: {0}")]
    Internal(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a corrector error
    pub fn corrector(component: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Corrector {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable kind, used as the `error` field of log entries
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::InvalidConfiguration(_) => "invalid_configuration",
            Error::Config(_) => "config",
            Error::Corrector { .. } => "corrector_failure",
            Error::RuleStore(_) => "rule_store",
            Error::LogSink(_) => "log_sink",
            Error::Internal(_) => "internal",
            Error::Json(_) => "json",
            Error::Io(_) => "io",
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Error::Internal(format!("lock poisoned: {}", err))
    }
}
