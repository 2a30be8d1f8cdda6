//! Application state initialization
//!
//! Wires configuration into the pipeline collaborators: object store,
//! credential provider, Gemini provider behind the retrying client, and the
//! presigner.

use crate::api::rest::AppState;
use crate::config::{CredentialConfig, ServerConfig, StorageType};
use anyhow::Result;
use rand::distributions::Alphanumeric;
use rand::Rng;
use remedia_llm::{
    CredentialProvider, CredentialSource, EnvSecretStore, GeminiProvider, ResilientClient,
};
use remedia_pipeline::{
    FileSystemObjectStore, InMemoryObjectStore, LocalPresigner, ObjectStore, RemediationPipeline,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Build the application state from configuration
pub fn init_state(config: &ServerConfig) -> Result<AppState> {
    let store: Arc<dyn ObjectStore> = match &config.storage {
        StorageType::Memory => {
            info!("Using in-memory object storage");
            Arc::new(InMemoryObjectStore::new())
        }
        StorageType::FileSystem { root } => {
            info!("Using file system object storage at {}", root.display());
            Arc::new(FileSystemObjectStore::new(root)?)
        }
    };

    let credentials = Arc::new(credential_provider(&config.credential));
    let gemini = Arc::new(GeminiProvider::new(credentials, config.llm.clone())?);
    info!(model = %config.llm.model, max_attempts = config.retry.max_attempts, "Model client configured");

    let client = ResilientClient::from_config(gemini.clone(), config.retry.clone());
    let pipeline = Arc::new(RemediationPipeline::new(
        store.clone(),
        Arc::new(client),
        config.pipeline.clone(),
    ));

    let mut presign = config.presign.clone();
    if presign.signing_key.trim().is_empty() {
        warn!("No presign signing key configured; URLs will not survive a restart");
        presign.signing_key = random_key();
    }
    let presigner = Arc::new(LocalPresigner::new(presign, config.pipeline.clone())?);

    Ok(AppState {
        pipeline,
        store,
        presigner,
        models: gemini,
        auto_trigger: config.auto_trigger,
    })
}

fn credential_provider(config: &CredentialConfig) -> CredentialProvider {
    if let Some(key) = &config.api_key {
        return CredentialProvider::from_static(key.clone());
    }
    if let Some(name) = &config.secret_name {
        return CredentialProvider::from_secret(name.clone(), Arc::new(EnvSecretStore));
    }
    warn!("No model credential configured; generation will report a configuration error");
    CredentialProvider::new(CredentialSource::Unconfigured)
}

fn random_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}
