//! Remedia LLM Integration
//!
//! This crate provides the LLM side of the remediation pipeline:
//! - Credential resolution, cached once per process
//! - Gemini `generateContent` requests and per-attempt failure classification
//! - Bounded retry with class-specific backoff ([`ResilientClient`])
//!
//! # Example
//! ```no_run
//! use remedia_llm::{
//!     CredentialProvider, EnvSecretStore, GeminiConfig, GeminiProvider, ResilientClient,
//!     RetryConfig,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> remedia_llm::Result<()> {
//! let credentials = Arc::new(CredentialProvider::from_secret(
//!     "GEMINI_SECRET",
//!     Arc::new(EnvSecretStore),
//! ));
//! let provider = Arc::new(GeminiProvider::new(credentials, GeminiConfig::default())?);
//! let client = ResilientClient::from_config(provider, RetryConfig::default());
//!
//! let plan = client.generate("List three ways to cut log storage costs").await;
//! println!("{}", plan.into_text());
//! # Ok(())
//! # }
//! ```

pub use client::{LLMClient, LLMRequest, LLMResponse};
pub use credential::{
    Credential, CredentialProvider, CredentialSource, EnvSecretStore, SecretStore,
    StaticSecretStore,
};
pub use error::{FailureClass, LLMError, Result};
pub use provider::{GeminiConfig, GeminiProvider, LLMProvider, MockProvider, ModelInfo};
pub use resilient::{Generation, ResilientClient, RetryConfig, TextGenerator, FATAL_MARKER};
pub use retry::{BackoffPolicy, ExponentialBackoff};

pub mod client;
pub mod credential;
pub mod error;
pub mod provider;
pub mod resilient;
pub mod retry;
