//! Storage trigger events

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineError, Result};

/// The object whose arrival starts a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectTrigger {
    pub bucket: String,
    pub key: String,
}

impl ObjectTrigger {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse a trigger from an event document
    ///
    /// Accepted shapes:
    /// - EventBridge: `{"detail": {"bucket": {"name"}, "object": {"key"}}}`
    /// - S3 notification: `{"Records": [{"s3": {"bucket": {"name"}, "object": {"key"}}}]}`
    /// - Plain: `{"bucket", "key"}`
    pub fn from_event(event: &Value) -> Result<Self> {
        if let Some(detail) = event.get("detail") {
            return Self::from_parts(&detail["bucket"]["name"], &detail["object"]["key"], false);
        }

        if let Some(records) = event.get("Records").and_then(Value::as_array) {
            let s3 = records
                .first()
                .map(|r| &r["s3"])
                .ok_or_else(|| PipelineError::InvalidTrigger("empty Records".to_string()))?;
            // S3 notifications URL-encode the key
            return Self::from_parts(&s3["bucket"]["name"], &s3["object"]["key"], true);
        }

        Self::from_parts(&event["bucket"], &event["key"], false)
    }

    fn from_parts(bucket: &Value, key: &Value, encoded: bool) -> Result<Self> {
        let bucket = bucket
            .as_str()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| PipelineError::InvalidTrigger("missing bucket name".to_string()))?;
        let key = key
            .as_str()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| PipelineError::InvalidTrigger("missing object key".to_string()))?;

        let key = if encoded { decode_key(key)? } else { key.to_string() };
        Ok(Self::new(bucket, key))
    }
}

/// Decode `+` and `%XX` escapes in an S3 notification key
fn decode_key(raw: &str) -> Result<String> {
    urlencoding::decode(&raw.replace('+', " "))
        .map(|k| k.into_owned())
        .map_err(|_| PipelineError::InvalidTrigger(format!("key is not UTF-8: {}", raw)))
}
