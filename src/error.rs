use std::time::Duration;
use thiserror::Error;

/// Crate-wide error type.
///
/// Anything below the public [`NewsService`](crate::NewsService) operations
/// recovers from these locally; they only escape for caller mistakes such as a
/// malformed cursor.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Timeout error: operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Cache error: {operation} failed - {reason}")]
    Cache { operation: String, reason: String },

    #[error("Provider error: {0}")]
    Provider(String),

    // Enrichment capability errors
    #[error("Enrichment error in {stage}: {message}")]
    Enrichment { stage: String, message: String },

    #[error("Capability not supported: {capability}")]
    Unsupported { capability: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for an enrichment failure in a named stage
    pub fn enrichment(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Enrichment {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<crate::client::providers::AdapterError> for Error {
    fn from(err: crate::client::providers::AdapterError) -> Self {
        use crate::client::providers::AdapterError;

        match err {
            AdapterError::Timeout(timeout) => Self::Timeout { timeout },
            other => Self::Provider(format!("[{}] {other}", other.code())),
        }
    }
}

impl From<crate::repositories::RepositoryError> for Error {
    fn from(err: crate::repositories::RepositoryError) -> Self {
        Self::Cache {
            operation: "repository".to_string(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::providers::AdapterError;

    #[test]
    fn test_adapter_error_conversion() {
        let err: Error = AdapterError::Auth("missing key".to_string()).into();
        assert!(matches!(err, Error::Provider(ref msg) if msg.starts_with("[AUTH_ERROR]")));

        let err: Error = AdapterError::Timeout(Duration::from_secs(3)).into();
        assert!(matches!(err, Error::Timeout { timeout } if timeout == Duration::from_secs(3)));
    }

    #[test]
    fn test_error_display() {
        let err = Error::enrichment("summarize", "model unavailable");
        assert_eq!(
            err.to_string(),
            "Enrichment error in summarize: model unavailable"
        );
    }
}
