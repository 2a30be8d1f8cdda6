//! Google Gemini provider implementation

use crate::client::{LLMClient, LLMRequest, LLMResponse};
use crate::credential::CredentialProvider;
use crate::error::{LLMError, Result};
use crate::provider::LLMProvider;
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default text-generation model
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";

/// Gemini endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API root, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used when the request does not name one
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request HTTP timeout
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl GeminiConfig {
    /// Point the provider at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set request timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }
}

/// A model visible to the configured key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default, rename = "supportedGenerationMethods")]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Whether the model can serve `generateContent`
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// Build the `generateContent` request body: the prompt is the sole content part
pub fn build_request_body(prompt: &str) -> Value {
    json!({
        "contents": [
            { "parts": [ { "text": prompt } ] }
        ]
    })
}

/// Build the `generateContent` URL for a model and key
pub fn build_endpoint(base_url: &str, model: &str, api_key: &str) -> String {
    format!(
        "{}/models/{}:generateContent?key={}",
        base_url.trim_end_matches('/'),
        model,
        api_key
    )
}

/// Google Gemini provider
pub struct GeminiProvider {
    credentials: Arc<CredentialProvider>,
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(credentials: Arc<CredentialProvider>, config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LLMError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            config,
            client,
        })
    }

    /// Provider configuration
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// List the models the key can use for text generation
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let credential = self.credentials.resolve().await?;
        let url = format!(
            "{}/models?key={}",
            self.config.base_url.trim_end_matches('/'),
            credential.expose()
        );

        let resp = self.client.get(&url).send().await.map_err(map_send_error)?;
        let status = resp.status();
        let retry_after = parse_retry_after(resp.headers());
        let body = resp
            .text()
            .await
            .map_err(|e| {
                LLMError::Transient(format!("Failed to read response: {}", e.without_url()))
            })?;

        if !status.is_success() {
            return Err(classify_status(status, body, retry_after));
        }

        let list: ModelList = serde_json::from_str(&body)
            .map_err(|_| LLMError::UnexpectedResponse(body.clone()))?;

        Ok(list
            .models
            .into_iter()
            .filter(ModelInfo::supports_generate_content)
            .collect())
    }
}

/// Map a non-2xx status to an error class
fn classify_status(status: StatusCode, body: String, retry_after: Option<Duration>) -> LLMError {
    let code = status.as_u16();
    match status {
        StatusCode::TOO_MANY_REQUESTS => LLMError::RateLimited {
            status: code,
            body,
            retry_after,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LLMError::Authorization { status: code, body }
        }
        StatusCode::REQUEST_TIMEOUT => LLMError::Transient(format!("HTTP {}: {}", code, body)),
        s if s.is_server_error() => LLMError::Transient(format!("HTTP {}: {}", code, body)),
        _ if is_quota_exhausted(&body) => LLMError::RateLimited {
            status: code,
            body,
            retry_after,
        },
        _ => LLMError::Rejected { status: code, body },
    }
}

/// Quota errors sometimes arrive with a non-429 status
fn is_quota_exhausted(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["status"].as_str().map(str::to_string))
        .map(|s| s == "RESOURCE_EXHAUSTED")
        .unwrap_or(false)
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// The request URL carries the key, so it is dropped before formatting
fn map_send_error(err: reqwest::Error) -> LLMError {
    let err = err.without_url();
    if err.is_timeout() {
        LLMError::Transient(format!("Gemini request timed out: {}", err))
    } else {
        LLMError::Transient(format!("Gemini API call failed: {}", err))
    }
}

#[async_trait]
impl LLMClient for GeminiProvider {
    async fn call(&self, request: LLMRequest) -> Result<LLMResponse> {
        let credential = self.credentials.resolve().await?;
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.config.model.clone());

        let url = build_endpoint(&self.config.base_url, &model, credential.expose());
        let body = build_request_body(&request.prompt);

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = resp.status();
        let retry_after = parse_retry_after(resp.headers());
        let resp_text = resp
            .text()
            .await
            .map_err(|e| {
                LLMError::Transient(format!("Failed to read response: {}", e.without_url()))
            })?;

        if !status.is_success() {
            return Err(classify_status(status, resp_text, retry_after));
        }

        let resp_json: Value = serde_json::from_str(&resp_text)
            .map_err(|_| LLMError::UnexpectedResponse(resp_text.clone()))?;

        let content = resp_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| LLMError::UnexpectedResponse(resp_text.clone()))?
            .to_string();

        let finish_reason = resp_json["candidates"][0]["finishReason"]
            .as_str()
            .unwrap_or("STOP")
            .to_string();

        let tokens_used = resp_json["usageMetadata"]["totalTokenCount"]
            .as_u64()
            .unwrap_or(0) as u32;

        Ok(LLMResponse::new(content, model)
            .with_tokens(tokens_used)
            .with_finish_reason(finish_reason))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

impl LLMProvider for GeminiProvider {
    fn provider_name(&self) -> &str {
        "Gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = build_request_body("hola");
        assert_eq!(body, json!({ "contents": [ { "parts": [ { "text": "hola" } ] } ] }));
    }

    #[test]
    fn test_endpoint() {
        let url = build_endpoint(DEFAULT_BASE_URL, DEFAULT_MODEL, "k");
        assert_eq!(
            url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-flash-latest:generateContent?key=k"
        );
        assert_eq!(
            build_endpoint("http://localhost:1/", "m", "k"),
            "http://localhost:1/models/m:generateContent?key=k"
        );
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new(), None),
            LLMError::RateLimited { status: 429, .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, String::new(), None),
            LLMError::Authorization { status: 403, .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, String::new(), None),
            LLMError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "bad".into(), None),
            LLMError::Rejected { status: 400, .. }
        ));
    }

    #[test]
    fn test_resource_exhausted_body_is_rate_limit() {
        let body = r#"{"error":{"code":400,"status":"RESOURCE_EXHAUSTED"}}"#.to_string();
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, body, None),
            LLMError::RateLimited { status: 400, .. }
        ));
    }

    #[test]
    fn test_model_info_filter() {
        let model = ModelInfo {
            name: "models/gemini-flash-latest".into(),
            display_name: None,
            supported_generation_methods: vec!["countTokens".into(), "generateContent".into()],
        };
        assert!(model.supports_generate_content());
    }
}
