//! LLM provider implementations

use crate::client::LLMClient;

/// LLM provider trait
pub trait LLMProvider: LLMClient {
    /// Get the provider name
    fn provider_name(&self) -> &str;
}

mod gemini;
mod mock;

pub use gemini::{
    build_endpoint, build_request_body, GeminiConfig, GeminiProvider, ModelInfo,
    DEFAULT_BASE_URL, DEFAULT_MODEL,
};
pub use mock::MockProvider;
