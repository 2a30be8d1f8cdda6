//! API endpoint handlers
//!
//! HTTP request handlers for all REST API endpoints.

use super::extractors::JsonExtractor;
use super::types::*;
use crate::error::ServerError;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use remedia_pipeline::storage::guess_content_type;
use remedia_pipeline::{ObjectTrigger, PipelineOutcome, PresignRequest, PresignedUrl, Presigner};
use serde_json::Value;
use tracing::{info, warn};

/// Health check endpoint
pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Storage event endpoint: runs the pipeline for the referenced object
#[axum::debug_handler]
pub(super) async fn handle_event(
    State(state): State<AppState>,
    JsonExtractor(event): JsonExtractor<Value>,
) -> Result<Json<PipelineOutcome>, ServerError> {
    let trigger = ObjectTrigger::from_event(&event)?;
    info!(bucket = %trigger.bucket, key = %trigger.key, "Received storage event");

    let outcome = state.pipeline.run(&trigger).await;
    Ok(Json(outcome))
}

/// Presigned URL endpoint
#[axum::debug_handler]
pub(super) async fn presign(
    State(state): State<AppState>,
    JsonExtractor(request): JsonExtractor<PresignRequest>,
) -> Result<Json<PresignedUrl>, ServerError> {
    let url = state.presigner.presign(&request)?;
    Ok(Json(url))
}

/// Signed object download
pub(super) async fn get_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    Query(query): Query<SignedQuery>,
) -> Result<Response, ServerError> {
    verify_signature(&state, "GET", &bucket, &key, &query)?;

    let bytes = state.store.get(&bucket, &key).await?;
    Ok(([(header::CONTENT_TYPE, guess_content_type(&key))], bytes).into_response())
}

/// Signed object upload; uploads under the input prefix start a run
pub(super) async fn put_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    Query(query): Query<SignedQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, ServerError> {
    verify_signature(&state, "PUT", &bucket, &key, &query)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_else(|| guess_content_type(&key))
        .to_string();
    let size = body.len();
    state
        .store
        .put(&bucket, &key, body.to_vec(), &content_type)
        .await?;
    info!(bucket = %bucket, key = %key, size, "Stored uploaded object");

    let run_scheduled =
        state.auto_trigger && key.starts_with(&state.pipeline.config().input_prefix);
    if run_scheduled {
        let pipeline = state.pipeline.clone();
        let trigger = ObjectTrigger::new(bucket.clone(), key.clone());
        tokio::spawn(async move {
            let outcome = pipeline.run(&trigger).await;
            info!(
                run_id = %outcome.run_id,
                key = %trigger.key,
                success = outcome.is_success(),
                "Upload-triggered run finished"
            );
        });
    }

    Ok(Json(UploadResponse {
        bucket,
        key,
        size,
        run_scheduled,
    }))
}

/// Models usable for text generation
pub(super) async fn list_models(
    State(state): State<AppState>,
) -> Result<Json<ModelsResponse>, ServerError> {
    let models = state.models.list_models().await?;
    Ok(Json(ModelsResponse {
        current: state.models.config().model.clone(),
        models,
    }))
}

fn verify_signature(
    state: &AppState,
    method: &str,
    bucket: &str,
    key: &str,
    query: &SignedQuery,
) -> Result<(), ServerError> {
    state
        .presigner
        .verify(method, bucket, key, query.expires, &query.signature, Utc::now())
        .map_err(|e| {
            warn!(method, bucket, key, error = %e, "Rejected object request");
            ServerError::Forbidden(e.to_string())
        })
}
