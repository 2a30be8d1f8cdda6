//! Object storage collaborators
//!
//! The pipeline reads a JSON report with [`ObjectStore::get`] and optionally
//! writes the generated script back with [`ObjectStore::put`]. Two backends are
//! provided:
//!
//! - [`InMemoryObjectStore`]: process-local map, used by tests and the `memory`
//!   server profile
//! - [`FileSystemObjectStore`]: objects as files under `root/<bucket>/<key>`

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

use crate::error::{PipelineError, Result};

/// Object storage interface
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object; [`PipelineError::NotFound`] when absent
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Write an object, replacing any previous version
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<()>;

    /// Whether an object exists
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        match self.get(bucket, key).await {
            Ok(_) => Ok(true),
            Err(PipelineError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// In-memory object store
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type recorded for an object
    pub async fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.content_type.clone())
    }

    /// Keys stored in a bucket, sorted
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        let objects = self.objects.read().await;
        let mut keys: Vec<String> = objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.bytes.clone())
            .ok_or_else(|| PipelineError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        self.objects.write().await.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

/// File system based object store
pub struct FileSystemObjectStore {
    /// Root directory; buckets are its subdirectories
    root_path: PathBuf,
}

impl FileSystemObjectStore {
    /// Create a store rooted at `root_path`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(root_path: P) -> Result<Self> {
        let root_path = root_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&root_path)?;
        Ok(Self { root_path })
    }

    pub fn root(&self) -> &Path {
        &self.root_path
    }

    /// Resolve `bucket/key` below the root, refusing anything that escapes it
    fn resolve_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let mut path = self.root_path.clone();
        for part in [bucket, key] {
            let relative = Path::new(part);
            if part.is_empty()
                || relative
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_)))
            {
                return Err(PipelineError::InputData(format!(
                    "invalid object path: {}/{}",
                    bucket, key
                )));
            }
            path.push(relative);
        }
        Ok(path)
    }
}

#[async_trait]
impl ObjectStore for FileSystemObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve_path(bucket, key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PipelineError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(PipelineError::Storage(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<()> {
        let path = self.resolve_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await.map_err(|e| {
            PipelineError::Storage(format!("failed to write {}: {}", path.display(), e))
        })
    }
}

/// Best-effort content type from a key's extension
pub fn guess_content_type(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "json" => "application/json",
        Some(ext) if ext == "py" => "text/x-python",
        Some(ext) if ext == "sh" => "text/x-shellscript",
        Some(ext) if ext == "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let store = InMemoryObjectStore::new();
        store
            .put("b", "input/a.json", b"{}".to_vec(), "application/json")
            .await
            .unwrap();

        assert_eq!(store.get("b", "input/a.json").await.unwrap(), b"{}");
        assert_eq!(
            store.content_type("b", "input/a.json").await.as_deref(),
            Some("application/json")
        );
        assert!(store.exists("b", "input/a.json").await.unwrap());
        assert!(!store.exists("b", "input/missing.json").await.unwrap());
        assert!(!store.exists("other", "input/a.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_in_memory_missing_is_not_found() {
        let store = InMemoryObjectStore::new();
        let err = store.get("b", "k").await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_file_system_creates_nested_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileSystemObjectStore::new(dir.path()).unwrap();

        store
            .put("b", "remediations/a.py", b"print(1)".to_vec(), "text/x-python")
            .await
            .unwrap();

        assert!(dir.path().join("b/remediations/a.py").exists());
        assert_eq!(store.get("b", "remediations/a.py").await.unwrap(), b"print(1)");
    }

    #[tokio::test]
    async fn test_file_system_rejects_escape() {
        let dir = TempDir::new().unwrap();
        let store = FileSystemObjectStore::new(dir.path()).unwrap();

        let err = store.get("b", "../../etc/passwd").await.unwrap_err();
        assert!(matches!(err, PipelineError::InputData(_)));
        assert!(store.put("..", "x", vec![], "text/plain").await.is_err());
        assert!(store.get("b", "/abs").await.is_err());
    }

    #[tokio::test]
    async fn test_file_system_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FileSystemObjectStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.get("b", "nope.json").await.unwrap_err(),
            PipelineError::NotFound { .. }
        ));
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("remediations/a.py"), "text/x-python");
        assert_eq!(guess_content_type("input/a.JSON"), "application/json");
        assert_eq!(guess_content_type("blob"), "application/octet-stream");
    }
}
