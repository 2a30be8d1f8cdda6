//! Common test utilities for pipeline integration tests

use remedia_llm::{BackoffPolicy, FailureClass, MockProvider, ResilientClient};
use remedia_pipeline::{InMemoryObjectStore, ObjectStore, ObjectTrigger, PipelineConfig, RemediationPipeline};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const BUCKET: &str = "reports";

/// Attempts allowed per generation in tests
pub const MAX_ATTEMPTS: u32 = 3;

/// Pipeline wired to an in-memory store and a scripted provider
pub struct TestPipeline {
    pub store: Arc<InMemoryObjectStore>,
    pub provider: Arc<MockProvider>,
    pub pipeline: RemediationPipeline,
}

impl TestPipeline {
    /// Build around a scripted provider; backoff waits are zero
    pub fn new(provider: MockProvider) -> Self {
        let store = Arc::new(InMemoryObjectStore::new());
        let provider = Arc::new(provider);
        let no_wait: Arc<dyn BackoffPolicy> =
            Arc::new(|_attempt: u32, _class: FailureClass| Duration::ZERO);
        let client = ResilientClient::new(provider.clone(), no_wait, MAX_ATTEMPTS);

        let pipeline = RemediationPipeline::new(
            store.clone(),
            Arc::new(client),
            PipelineConfig::default().with_bucket(BUCKET),
        );

        Self {
            store,
            provider,
            pipeline,
        }
    }

    /// Store a JSON report and return its trigger
    pub async fn upload(&self, key: &str, report: &Value) -> ObjectTrigger {
        self.upload_raw(key, report.to_string().as_bytes()).await
    }

    /// Store raw bytes and return their trigger
    pub async fn upload_raw(&self, key: &str, bytes: &[u8]) -> ObjectTrigger {
        self.store
            .put(BUCKET, key, bytes.to_vec(), "application/json")
            .await
            .expect("upload failed");
        ObjectTrigger::new(BUCKET, key)
    }

    pub fn llm_calls(&self) -> usize {
        self.provider.call_count()
    }
}
