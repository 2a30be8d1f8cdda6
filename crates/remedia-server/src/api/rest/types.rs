//! REST API type definitions
//!
//! Request and response types for the REST API endpoints.

use remedia_llm::{GeminiProvider, ModelInfo};
use remedia_pipeline::{LocalPresigner, ObjectStore, RemediationPipeline};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RemediationPipeline>,
    pub store: Arc<dyn ObjectStore>,
    pub presigner: Arc<LocalPresigner>,
    /// Model catalog lookups
    pub models: Arc<GeminiProvider>,
    /// Start a run after an upload under the input prefix
    pub auto_trigger: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Signature query parameters on `/objects/...`
#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub signature: String,
}

/// Response to a signed upload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub bucket: String,
    pub key: String,
    pub size: usize,
    /// Whether a pipeline run was started for the object
    pub run_scheduled: bool,
}

/// Model listing response
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub current: String,
    pub models: Vec<ModelInfo>,
}
