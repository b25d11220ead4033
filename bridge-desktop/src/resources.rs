//! Resource Store Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    resources::ResourceStore,
};
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Directory-backed resource store
///
/// Resolves resource paths against a root directory (usually the folder the
/// installer unpacks bundled timing files into). Paths that try to escape the
/// root with `..` or an absolute prefix are rejected.
#[derive(Debug, Clone)]
pub struct DirectoryResourceStore {
    root: PathBuf,
}

impl DirectoryResourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(BridgeError::OperationFailed(format!(
                "resource path escapes root: {}",
                path
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ResourceStore for DirectoryResourceStore {
    async fn read(&self, path: &str) -> Result<Bytes> {
        let full_path = self.resolve(path)?;
        debug!(path = ?full_path, "Reading bundled resource");

        match fs::read(&full_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BridgeError::NotFound(full_path.display().to_string()))
            }
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full_path = self.resolve(path)?;
        Ok(fs::try_exists(&full_path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_dir(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "recitation-timing-{}-{}-{}",
            label,
            std::process::id(),
            nanos
        ))
    }

    #[tokio::test]
    async fn test_read_existing_resource() {
        let root = scratch_dir("read");
        fs::create_dir_all(root.join("timings")).await.unwrap();
        fs::write(root.join("timings/reciter_5.json"), b"{}")
            .await
            .unwrap();

        let store = DirectoryResourceStore::new(&root);
        let data = store.read("timings/reciter_5.json").await.unwrap();
        assert_eq!(&data[..], b"{}");
        assert!(store.exists("timings/reciter_5.json").await.unwrap());

        fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_resource_is_not_found() {
        let store = DirectoryResourceStore::new(scratch_dir("missing"));

        let err = store.read("timings/reciter_1.json").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!store.exists("timings/reciter_1.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_parent_traversal_rejected() {
        let store = DirectoryResourceStore::new(scratch_dir("escape"));

        let err = store.read("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, BridgeError::OperationFailed(_)));
        assert!(!err.is_not_found());
    }
}
