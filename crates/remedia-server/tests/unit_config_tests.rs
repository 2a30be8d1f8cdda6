//! Unit tests for ServerConfig loading

use config::{Config, File, FileFormat};
use remedia_server::config::{ServerConfig, StorageType};
use std::collections::HashMap;
use std::path::PathBuf;

fn env(vars: &[(&str, &str)]) -> config::Environment {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ServerConfig::environment().source(Some(map))
}

fn load(yaml: &str, vars: &[(&str, &str)]) -> ServerConfig {
    Config::builder()
        .add_source(File::from_str(yaml, FileFormat::Yaml))
        .add_source(env(vars))
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap()
}

#[test]
fn test_empty_sources_give_defaults() {
    let config = load("", &[]);

    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 8080);
    assert_eq!(config.pipeline.output_prefix, "remediations/");
    assert_eq!(config.retry.max_attempts, 4);
    assert_eq!(config.retry.backoff.rate_limit_base_secs, 20);
    assert_eq!(config.presign.expiry_secs, 300);
    assert!(matches!(config.storage, StorageType::FileSystem { .. }));
}

#[test]
fn test_file_values() {
    let config = load(
        r#"
host: 0.0.0.0
port: 3000
storage:
  type: memory
pipeline:
  bucket: acme-reports
  persist_artifacts: false
llm:
  model: gemini-1.5-pro
retry:
  max_attempts: 2
  backoff:
    transient_base_secs: 1
credential:
  secret_name: GEMINI_SECRET
"#,
        &[],
    );

    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.port, 3000);
    assert_eq!(config.storage, StorageType::Memory);
    assert_eq!(config.pipeline.bucket, "acme-reports");
    assert!(!config.pipeline.persist_artifacts);
    assert_eq!(config.pipeline.input_prefix, "input/");
    assert_eq!(config.llm.model, "gemini-1.5-pro");
    assert_eq!(config.retry.max_attempts, 2);
    assert_eq!(config.retry.backoff.transient_base_secs, 1);
    assert_eq!(config.retry.backoff.rate_limit_base_secs, 20);
    assert_eq!(config.credential.secret_name.as_deref(), Some("GEMINI_SECRET"));
}

#[test]
fn test_environment_overrides_file() {
    let config = load(
        "port: 3000\nllm:\n  model: from-file\n",
        &[
            ("REMEDIA_PORT", "9090"),
            ("REMEDIA_LLM__MODEL", "from-env"),
            ("REMEDIA_RETRY__MAX_ATTEMPTS", "6"),
            ("REMEDIA_STORAGE__TYPE", "filesystem"),
            ("REMEDIA_STORAGE__ROOT", "/var/lib/remedia"),
            ("REMEDIA_AUTO_TRIGGER", "false"),
        ],
    );

    assert_eq!(config.port, 9090);
    assert_eq!(config.llm.model, "from-env");
    assert_eq!(config.retry.max_attempts, 6);
    assert!(!config.auto_trigger);
    assert_eq!(
        config.storage,
        StorageType::FileSystem {
            root: PathBuf::from("/var/lib/remedia")
        }
    );
}

#[test]
fn test_unrelated_environment_is_ignored() {
    let config = load("", &[("OTHER_PORT", "1"), ("REMEDIAPORT", "2")]);
    assert_eq!(config.port, 8080);
}
