//! Server configuration

use remedia_llm::{GeminiConfig, RetryConfig};
use remedia_pipeline::{PipelineConfig, PresignConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment prefix, e.g. `REMEDIA_PORT`, `REMEDIA_LLM__MODEL`
pub const ENV_PREFIX: &str = "REMEDIA";

/// Where objects are kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageType {
    /// Process memory; lost on restart
    Memory,
    /// Files under `root/<bucket>/<key>`
    FileSystem {
        #[serde(default = "default_storage_root")]
        root: PathBuf,
    },
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("data")
}

impl Default for StorageType {
    fn default() -> Self {
        StorageType::FileSystem {
            root: default_storage_root(),
        }
    }
}

/// Where the model API key comes from
///
/// A direct `api_key` wins over `secret_name`. With neither set the server
/// still starts; every generation then reports a configuration error.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Environment variable holding the secret (JSON with `api_key`, or the bare key)
    #[serde(default)]
    pub secret_name: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("secret_name", &self.secret_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port (HTTP)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub storage: StorageType,

    /// Bucket layout and artifact persistence
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Run the pipeline when a report is uploaded under the input prefix
    #[serde(default = "default_auto_trigger")]
    pub auto_trigger: bool,

    /// Model endpoint
    #[serde(default)]
    pub llm: GeminiConfig,

    /// Retry attempts and backoff
    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub credential: CredentialConfig,

    #[serde(default)]
    pub presign: PresignConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_auto_trigger() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            storage: StorageType::default(),
            pipeline: PipelineConfig::default(),
            auto_trigger: default_auto_trigger(),
            llm: GeminiConfig::default(),
            retry: RetryConfig::default(),
            credential: CredentialConfig::default(),
            presign: PresignConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and config file
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if exists
        dotenvy::dotenv().ok();

        let config_result = config::Config::builder()
            .add_source(config::File::with_name("config/server").required(false))
            .add_source(Self::environment())
            .build();

        match config_result {
            Ok(cfg) => cfg
                .try_deserialize()
                .map_err(|e| anyhow::anyhow!("Failed to deserialize config: {}", e)),
            Err(e) => {
                tracing::info!("No usable configuration ({}), using defaults", e);
                Ok(Self::default())
            }
        }
    }

    /// Environment source: `REMEDIA_PORT=9090`, `REMEDIA_LLM__MODEL=...`
    pub fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Address the listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, "info");
        assert!(config.auto_trigger);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.llm.model, "gemini-flash-latest");
        assert!(config.credential.api_key.is_none());
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_storage_type_default() {
        if let StorageType::FileSystem { root } = StorageType::default() {
            assert_eq!(root, PathBuf::from("data"));
        } else {
            panic!("Expected FileSystem storage type");
        }
    }

    #[test]
    fn test_credential_debug_redacts_key() {
        let config = CredentialConfig {
            secret_name: Some("GEMINI_SECRET".into()),
            api_key: Some("AIza-secret".into()),
        };
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("GEMINI_SECRET"));
        assert!(!debug_str.contains("AIza-secret"));
    }

    #[test]
    fn test_server_config_clone() {
        let config = ServerConfig::default();
        let cloned = config.clone();

        assert_eq!(config.host, cloned.host);
        assert_eq!(config.port, cloned.port);
        assert_eq!(config.storage, cloned.storage);
    }
}
