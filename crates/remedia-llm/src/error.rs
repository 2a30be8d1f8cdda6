//! Error types for the Remedia LLM client

use std::time::Duration;
use thiserror::Error;

/// Result type alias for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Failure classes that drive the retry decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// No usable credential; retrying cannot help
    Configuration,
    /// Permission, billing or request rejection; retrying cannot help
    Authorization,
    /// Quota window exhausted; retried with a long backoff
    RateLimit,
    /// Timeouts, 5xx, connection resets; retried with exponential backoff
    Transient,
    /// Payload present but not in the expected shape; passed through
    SchemaMismatch,
}

impl FailureClass {
    /// Whether another attempt can change the outcome
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureClass::RateLimit | FailureClass::Transient)
    }
}

/// LLM module errors
#[derive(Debug, Error)]
pub enum LLMError {
    /// No credential source, or the source yielded nothing usable
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Provider refused the credential (HTTP 401/403)
    #[error("Authorization rejected ({status}): {body}")]
    Authorization { status: u16, body: String },

    /// Provider refused the request itself (other 4xx)
    #[error("Request rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// Quota or rate limit hit (HTTP 429 / RESOURCE_EXHAUSTED)
    #[error("Rate limited ({status}): {body}")]
    RateLimited {
        status: u16,
        body: String,
        retry_after: Option<Duration>,
    },

    /// Timeouts, 5xx and connection failures
    #[error("Transient failure: {0}")]
    Transient(String),

    /// 2xx response that does not carry the expected text field
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Secret store lookup failed
    #[error("Secret store error: {0}")]
    SecretStore(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl LLMError {
    /// Classify this error for the retry loop
    pub fn class(&self) -> FailureClass {
        match self {
            LLMError::Configuration(_) | LLMError::SecretStore(_) => FailureClass::Configuration,
            LLMError::Authorization { .. } | LLMError::Rejected { .. } => {
                FailureClass::Authorization
            }
            LLMError::RateLimited { .. } => FailureClass::RateLimit,
            LLMError::Transient(_) => FailureClass::Transient,
            LLMError::UnexpectedResponse(_) | LLMError::SerializationError(_) => {
                FailureClass::SchemaMismatch
            }
        }
    }

    /// Provider-requested wait, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LLMError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        // Anything reqwest surfaces before a status line is a network-level failure.
        // Request URLs may carry the API key.
        LLMError::Transient(err.without_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(
            LLMError::Configuration("missing".into()).class(),
            FailureClass::Configuration
        );
        assert_eq!(
            LLMError::Authorization {
                status: 403,
                body: String::new()
            }
            .class(),
            FailureClass::Authorization
        );
        assert_eq!(
            LLMError::Rejected {
                status: 400,
                body: String::new()
            }
            .class(),
            FailureClass::Authorization
        );
        assert_eq!(
            LLMError::RateLimited {
                status: 429,
                body: String::new(),
                retry_after: None
            }
            .class(),
            FailureClass::RateLimit
        );
        assert_eq!(
            LLMError::Transient("reset".into()).class(),
            FailureClass::Transient
        );
        assert_eq!(
            LLMError::UnexpectedResponse("{}".into()).class(),
            FailureClass::SchemaMismatch
        );
    }

    #[test]
    fn test_retryable_classes() {
        assert!(FailureClass::RateLimit.is_retryable());
        assert!(FailureClass::Transient.is_retryable());
        assert!(!FailureClass::Authorization.is_retryable());
        assert!(!FailureClass::Configuration.is_retryable());
        assert!(!FailureClass::SchemaMismatch.is_retryable());
    }

    #[test]
    fn test_retry_after_only_on_rate_limit() {
        let err = LLMError::RateLimited {
            status: 429,
            body: "quota".into(),
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(LLMError::Transient("x".into()).retry_after(), None);
    }

    #[test]
    fn test_display() {
        let err = LLMError::Authorization {
            status: 403,
            body: "billing disabled".into(),
        };
        assert_eq!(err.to_string(), "Authorization rejected (403): billing disabled");
    }
}
