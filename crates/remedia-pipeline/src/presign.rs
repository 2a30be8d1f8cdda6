//! Presigned URL issuance
//!
//! Clients never talk to storage with credentials of their own. They ask for a
//! short-lived URL scoped to one object: uploads land under the input prefix,
//! downloads read from the output prefix.
//!
//! [`LocalPresigner`] signs `method`, `bucket`, `key` and the expiry timestamp
//! with a SHA-256 keyed digest; the server verifies the same tuple before
//! serving `/objects/...`.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};

/// What the URL will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresignAction {
    #[serde(alias = "subir")]
    Upload,
    #[serde(alias = "bajar")]
    Download,
}

impl PresignAction {
    /// HTTP method the URL is valid for
    pub fn method(&self) -> &'static str {
        match self {
            PresignAction::Upload => "PUT",
            PresignAction::Download => "GET",
        }
    }
}

/// Presign request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignRequest {
    #[serde(alias = "accion")]
    pub action: PresignAction,
    #[serde(rename = "fileName", alias = "archivo", alias = "file_name")]
    pub file_name: String,
}

/// A signed, time-limited object URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignedUrl {
    pub url: String,
    pub method: String,
    pub bucket: String,
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

/// Presigner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignConfig {
    /// Externally reachable base URL of the object endpoint
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Secret mixed into every signature
    #[serde(default)]
    pub signing_key: String,

    /// URL lifetime
    #[serde(default = "default_expiry_secs")]
    pub expiry_secs: i64,
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_expiry_secs() -> i64 {
    300
}

impl Default for PresignConfig {
    fn default() -> Self {
        Self {
            public_base_url: default_public_base_url(),
            signing_key: String::new(),
            expiry_secs: default_expiry_secs(),
        }
    }
}

/// Issues presigned URLs
pub trait Presigner: Send + Sync {
    fn presign(&self, request: &PresignRequest) -> Result<PresignedUrl>;
}

/// Presigner for objects served by this process
pub struct LocalPresigner {
    config: PresignConfig,
    layout: PipelineConfig,
}

impl LocalPresigner {
    pub fn new(config: PresignConfig, layout: PipelineConfig) -> Result<Self> {
        if config.signing_key.trim().is_empty() {
            return Err(PipelineError::Config(
                "presign signing key must not be empty".to_string(),
            ));
        }
        Ok(Self { config, layout })
    }

    /// Sign for an explicit expiry timestamp (seconds since epoch)
    pub fn sign(&self, method: &str, bucket: &str, key: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        for part in [
            self.config.signing_key.as_str(),
            method,
            bucket,
            key,
            &expires.to_string(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }

    /// Check a signature and its expiry against `now`
    pub fn verify(
        &self,
        method: &str,
        bucket: &str,
        key: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if now.timestamp() > expires {
            return Err(PipelineError::Presign("URL expired".to_string()));
        }
        let expected = self.sign(method, bucket, key, expires);
        if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
            return Err(PipelineError::Presign("signature mismatch".to_string()));
        }
        Ok(())
    }

    /// Presign relative to an explicit clock
    pub fn presign_at(&self, request: &PresignRequest, now: DateTime<Utc>) -> Result<PresignedUrl> {
        validate_file_name(&request.file_name)?;

        let key = match request.action {
            PresignAction::Upload => self.layout.input_key_for(&request.file_name),
            PresignAction::Download => self.layout.output_key_for(&request.file_name),
        };
        let bucket = self.layout.bucket.clone();
        let method = request.action.method();
        let expires = now.timestamp() + self.config.expiry_secs;
        let signature = self.sign(method, &bucket, &key, expires);

        let encoded_key: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        let url = format!(
            "{}/objects/{}/{}?expires={}&signature={}",
            self.config.public_base_url.trim_end_matches('/'),
            urlencoding::encode(&bucket),
            encoded_key.join("/"),
            expires,
            signature
        );

        let expires_at = Utc
            .timestamp_opt(expires, 0)
            .single()
            .ok_or_else(|| PipelineError::Presign("expiry out of range".to_string()))?;

        tracing::info!(method, bucket = %bucket, key = %key, "Issued presigned URL");

        Ok(PresignedUrl {
            url,
            method: method.to_string(),
            bucket,
            key,
            expires_at,
        })
    }
}

impl Presigner for LocalPresigner {
    fn presign(&self, request: &PresignRequest) -> Result<PresignedUrl> {
        self.presign_at(request, Utc::now())
    }
}

/// A file name must stay a single object under its prefix
fn validate_file_name(name: &str) -> Result<()> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.chars().any(char::is_control);
    if invalid {
        return Err(PipelineError::Presign(format!("invalid file name: {:?}", name)));
    }
    Ok(())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
