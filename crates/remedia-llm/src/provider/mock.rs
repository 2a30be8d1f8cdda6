//! Mock LLM provider for testing

use crate::client::{LLMClient, LLMRequest, LLMResponse};
use crate::error::{LLMError, Result};
use crate::provider::LLMProvider;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Mock LLM provider for testing
///
/// Replays a script of outcomes in order; once the script is drained every
/// call returns the default response. Prompts are recorded for inspection.
pub struct MockProvider {
    name: String,
    default_response: String,
    script: Mutex<VecDeque<Result<LLMResponse>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Create a new mock provider
    pub fn new() -> Self {
        Self::with_response("Mock LLM response")
    }

    /// Create with custom default response
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            name: "mock".to_string(),
            default_response: response.into(),
            script: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue one successful response
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.push(Ok(LLMResponse::new(text, "mock-model")))
    }

    /// Queue one failure
    pub fn then_error(self, error: LLMError) -> Self {
        self.push(Err(error))
    }

    fn push(self, outcome: Result<LLMResponse>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
        self
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for MockProvider {
    async fn call(&self, request: LLMRequest) -> Result<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match scripted {
            Some(outcome) => outcome,
            None => Ok(LLMResponse::new(
                self.default_response.clone(),
                request.model.unwrap_or_else(|| "mock-model".to_string()),
            )
            .with_tokens(10)),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl LLMProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "Mock"
    }
}
