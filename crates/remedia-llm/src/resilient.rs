//! Resilient text generation
//!
//! [`ResilientClient`] wraps a single-attempt [`LLMClient`] in a bounded retry
//! loop. Each failed attempt is classified through [`FailureClass`]:
//!
//! | class           | action                                       |
//! |-----------------|----------------------------------------------|
//! | `RateLimit`     | wait (long base, or capped `Retry-After`), retry |
//! | `Transient`     | wait (exponential + jitter), retry           |
//! | `Authorization` | stop, [`Generation::Forbidden`]              |
//! | `Configuration` | stop, [`Generation::Misconfigured`]          |
//! | `SchemaMismatch`| stop, [`Generation::Unexpected`] with raw body |
//!
//! `generate` never fails; callers branch on the returned [`Generation`].

use crate::client::{LLMClient, LLMRequest};
use crate::error::{FailureClass, LLMError};
use crate::retry::{BackoffPolicy, ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Marker prefixed to every failure rendered as text
pub const FATAL_MARKER: &str = "Error Fatal";

/// Outcome of a full generation, after retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Generation {
    /// Model text
    Success(String),
    /// 2xx payload without the expected text field, returned verbatim
    Unexpected(String),
    /// Credential or request rejected by the provider
    Forbidden(String),
    /// No usable credential
    Misconfigured(String),
    /// Every attempt failed with a recoverable error
    Exhausted { attempts: u32, cause: String },
}

impl Generation {
    /// Terminal failure (not a model answer, not a diagnostic passthrough)
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Generation::Forbidden(_) | Generation::Misconfigured(_) | Generation::Exhausted { .. }
        )
    }

    /// Text view; failures carry the [`FATAL_MARKER`] prefix
    pub fn into_text(self) -> String {
        match self {
            Generation::Success(text) | Generation::Unexpected(text) => text,
            other => other.to_string(),
        }
    }

    /// Whether a plain text value is a rendered failure
    pub fn is_failure_text(text: &str) -> bool {
        text.trim_start().starts_with(FATAL_MARKER)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::Success(text) => write!(f, "{}", text),
            Generation::Unexpected(raw) => write!(f, "Unexpected response: {}", raw),
            Generation::Forbidden(cause) => {
                write!(f, "{}: permission or billing rejected: {}", FATAL_MARKER, cause)
            }
            Generation::Misconfigured(cause) => {
                write!(f, "{}: configuration error: {}", FATAL_MARKER, cause)
            }
            Generation::Exhausted { attempts, cause } => write!(
                f,
                "{}: retries exhausted after {} attempts; last cause: {}",
                FATAL_MARKER, attempts, cause
            ),
        }
    }
}

/// Retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub backoff: ExponentialBackoff,
}

fn default_max_attempts() -> u32 {
    4
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: ExponentialBackoff::default(),
        }
    }
}

/// Text generation as seen by pipeline stages
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Generation;

    /// Label recorded on artifacts this generator produced
    fn generator_name(&self) -> &str {
        "text-generator"
    }
}

/// Bounded, failure-class-aware retry around an [`LLMClient`]
pub struct ResilientClient {
    inner: Arc<dyn LLMClient>,
    policy: Arc<dyn BackoffPolicy>,
    max_attempts: u32,
}

impl ResilientClient {
    /// Create with an explicit backoff policy
    pub fn new(inner: Arc<dyn LLMClient>, policy: Arc<dyn BackoffPolicy>, max_attempts: u32) -> Self {
        Self {
            inner,
            policy,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Create from retry configuration
    pub fn from_config(inner: Arc<dyn LLMClient>, config: RetryConfig) -> Self {
        Self::new(inner, Arc::new(config.backoff), config.max_attempts)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Name of the wrapped client
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Generate text for a prompt, retrying recoverable failures
    pub async fn generate(&self, prompt: &str) -> Generation {
        let mut last_cause = String::new();

        for attempt in 1..=self.max_attempts {
            let err = match self.inner.call(LLMRequest::new(prompt)).await {
                Ok(response) => {
                    info!(
                        client = self.inner.name(),
                        attempt,
                        tokens = response.tokens_used,
                        "LLM call succeeded"
                    );
                    return Generation::Success(response.content);
                }
                Err(err) => err,
            };

            let class = err.class();
            match class {
                FailureClass::Configuration => {
                    error!(client = self.inner.name(), error = %err, "LLM credential unavailable");
                    return Generation::Misconfigured(err.to_string());
                }
                FailureClass::Authorization => {
                    error!(client = self.inner.name(), error = %err, "LLM call rejected");
                    return Generation::Forbidden(err.to_string());
                }
                FailureClass::SchemaMismatch => {
                    warn!(client = self.inner.name(), "LLM response missing text field");
                    return Generation::Unexpected(raw_payload(err));
                }
                FailureClass::RateLimit | FailureClass::Transient => {}
            }

            last_cause = err.to_string();
            if attempt == self.max_attempts {
                break;
            }

            let delay = self.delay_for(attempt, class, &err);
            warn!(
                client = self.inner.name(),
                attempt,
                max_attempts = self.max_attempts,
                class = ?class,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "LLM attempt failed, retrying"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        error!(
            client = self.inner.name(),
            attempts = self.max_attempts,
            cause = %last_cause,
            "LLM retries exhausted"
        );
        Generation::Exhausted {
            attempts: self.max_attempts,
            cause: last_cause,
        }
    }

    fn delay_for(&self, attempt: u32, class: FailureClass, err: &LLMError) -> Duration {
        let computed = self.policy.delay(attempt, class);
        match err.retry_after() {
            Some(requested) => computed.max(requested.min(self.policy.max_delay())),
            None => computed,
        }
    }
}

fn raw_payload(err: LLMError) -> String {
    match err {
        LLMError::UnexpectedResponse(raw) => raw,
        other => other.to_string(),
    }
}

#[async_trait::async_trait]
impl TextGenerator for ResilientClient {
    async fn generate(&self, prompt: &str) -> Generation {
        ResilientClient::generate(self, prompt).await
    }

    fn generator_name(&self) -> &str {
        self.name()
    }
}
