//! Credential resolution
//!
//! The API key is resolved at most once per process. The first successful
//! [`CredentialProvider::resolve`] stores the trimmed value in a once-initialized
//! cell; every later call returns it without touching the backing store. There is
//! no refresh path: a rotated key takes effect on the next process start.

use crate::error::{LLMError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Field holding the key inside a secret document
pub const API_KEY_FIELD: &str = "api_key";

/// Opaque API credential
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Expose the raw secret, e.g. for the `key=` query parameter
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "Credential({}…)", prefix)
    }
}

/// Secret store collaborator
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a secret document by name. `Ok(None)` means the secret does not exist.
    async fn get_secret(&self, name: &str) -> Result<Option<Value>>;
}

/// Secret store backed by environment variables
///
/// The variable named after the secret holds either a JSON object with an
/// `api_key` field or the bare key.
#[derive(Debug, Default, Clone)]
pub struct EnvSecretStore;

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_secret(&self, name: &str) -> Result<Option<Value>> {
        let raw = match std::env::var(name) {
            Ok(raw) => raw,
            Err(std::env::VarError::NotPresent) => return Ok(None),
            Err(e) => return Err(LLMError::SecretStore(format!("{}: {}", name, e))),
        };

        let value = match serde_json::from_str::<Value>(&raw) {
            Ok(value @ Value::Object(_)) => value,
            _ => serde_json::json!({ API_KEY_FIELD: raw }),
        };
        Ok(Some(value))
    }
}

/// In-memory secret store
#[derive(Debug, Default, Clone)]
pub struct StaticSecretStore {
    secrets: HashMap<String, Value>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret document
    pub fn with_secret(mut self, name: impl Into<String>, value: Value) -> Self {
        self.secrets.insert(name.into(), value);
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get_secret(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.secrets.get(name).cloned())
    }
}

/// Where the credential comes from
#[derive(Clone)]
pub enum CredentialSource {
    /// Named secret looked up in a secret store
    Secret {
        name: String,
        store: Arc<dyn SecretStore>,
    },
    /// Value supplied directly by configuration
    Static(String),
    /// Nothing configured
    Unconfigured,
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Secret { name, .. } => write!(f, "Secret({})", name),
            CredentialSource::Static(_) => write!(f, "Static(..)"),
            CredentialSource::Unconfigured => write!(f, "Unconfigured"),
        }
    }
}

/// Resolves and caches the API credential
#[derive(Debug)]
pub struct CredentialProvider {
    source: CredentialSource,
    cached: OnceCell<Credential>,
}

impl CredentialProvider {
    pub fn new(source: CredentialSource) -> Self {
        Self {
            source,
            cached: OnceCell::new(),
        }
    }

    /// Provider for a named secret in the given store
    pub fn from_secret(name: impl Into<String>, store: Arc<dyn SecretStore>) -> Self {
        Self::new(CredentialSource::Secret {
            name: name.into(),
            store,
        })
    }

    /// Provider for a statically configured key
    pub fn from_static(value: impl Into<String>) -> Self {
        Self::new(CredentialSource::Static(value.into()))
    }

    /// Resolve the credential, querying the source only on first success
    pub async fn resolve(&self) -> Result<Credential> {
        self.cached
            .get_or_try_init(|| self.fetch())
            .await
            .cloned()
    }

    /// Whether a credential has already been resolved
    pub fn is_cached(&self) -> bool {
        self.cached.initialized()
    }

    async fn fetch(&self) -> Result<Credential> {
        let raw = match &self.source {
            CredentialSource::Unconfigured => {
                return Err(LLMError::Configuration(
                    "no credential source configured".to_string(),
                ))
            }
            CredentialSource::Static(value) => value.clone(),
            CredentialSource::Secret { name, store } => {
                let secret = store.get_secret(name).await?.ok_or_else(|| {
                    LLMError::Configuration(format!("secret '{}' not found", name))
                })?;
                secret
                    .get(API_KEY_FIELD)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        LLMError::Configuration(format!(
                            "secret '{}' has no '{}' field",
                            name, API_KEY_FIELD
                        ))
                    })?
            }
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LLMError::Configuration("credential is empty".to_string()));
        }

        tracing::info!(source = ?self.source, "API credential resolved");
        Ok(Credential(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        hits: AtomicUsize,
        value: Option<Value>,
    }

    #[async_trait]
    impl SecretStore for CountingStore {
        async fn get_secret(&self, _name: &str) -> Result<Option<Value>> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(self.value.clone())
        }
    }

    #[tokio::test]
    async fn test_resolve_trims_and_caches() {
        let store = Arc::new(CountingStore {
            hits: AtomicUsize::new(0),
            value: Some(json!({ "api_key": "  AIza-test-key \n" })),
        });
        let provider = CredentialProvider::from_secret("gemini", store.clone());

        let first = provider.resolve().await.unwrap();
        let second = provider.resolve().await.unwrap();

        assert_eq!(first.expose(), "AIza-test-key");
        assert_eq!(first, second);
        assert_eq!(store.hits.load(Ordering::SeqCst), 1);
        assert!(provider.is_cached());
    }

    #[tokio::test]
    async fn test_unconfigured_fails_fast() {
        let provider = CredentialProvider::new(CredentialSource::Unconfigured);
        let err = provider.resolve().await.unwrap_err();
        assert!(matches!(err, LLMError::Configuration(_)));
        assert!(!provider.is_cached());
    }

    #[tokio::test]
    async fn test_missing_secret_is_configuration_error() {
        let provider =
            CredentialProvider::from_secret("absent", Arc::new(StaticSecretStore::new()));
        let err = provider.resolve().await.unwrap_err();
        assert!(err.to_string().contains("secret 'absent' not found"));
    }

    #[tokio::test]
    async fn test_secret_without_api_key_field() {
        let store = StaticSecretStore::new().with_secret("gemini", json!({ "token": "x" }));
        let provider = CredentialProvider::from_secret("gemini", Arc::new(store));
        let err = provider.resolve().await.unwrap_err();
        assert!(matches!(err, LLMError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_failed_resolution_is_not_cached() {
        let store = Arc::new(CountingStore {
            hits: AtomicUsize::new(0),
            value: None,
        });
        let provider = CredentialProvider::from_secret("gemini", store.clone());

        assert!(provider.resolve().await.is_err());
        assert!(provider.resolve().await.is_err());
        assert_eq!(store.hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_blank_static_key_rejected() {
        let provider = CredentialProvider::from_static("   ");
        assert!(provider.resolve().await.is_err());
    }

    #[tokio::test]
    async fn test_env_store_accepts_bare_key_and_json() {
        std::env::set_var("REMEDIA_TEST_BARE_SECRET", "bare-key");
        std::env::set_var("REMEDIA_TEST_JSON_SECRET", r#"{"api_key":"json-key"}"#);

        let store = EnvSecretStore;
        let bare = store.get_secret("REMEDIA_TEST_BARE_SECRET").await.unwrap().unwrap();
        let doc = store.get_secret("REMEDIA_TEST_JSON_SECRET").await.unwrap().unwrap();

        assert_eq!(bare["api_key"], "bare-key");
        assert_eq!(doc["api_key"], "json-key");
        assert!(store
            .get_secret("REMEDIA_TEST_UNSET_SECRET")
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let credential = Credential("AIzaSySecretValue".to_string());
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("SecretValue"));
    }
}
