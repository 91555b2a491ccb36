//! Durable blob store used for uploaded reference images and
//! materialized model artifacts.
//!
//! Keys are `/`-separated relative paths (e.g.
//! `model-jobs/<id>/refs/<uuid>.png`). [`LocalStorage`] maps them onto
//! a directory tree under a configured root.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

/// Errors from the blob store layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The key escapes the storage root or is otherwise malformed.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Underlying filesystem error.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable blob store keyed by path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the blob at `key`. Fails if it does not exist.
    async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Write `bytes` at `key`, creating parent directories as needed.
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Delete every blob whose key starts with `prefix`. Deleting a
    /// prefix with no blobs under it is not an error.
    async fn delete_prefix(&self, prefix: &str) -> Result<(), StorageError>;
}

/// Filesystem-backed [`BlobStore`] rooted at a single directory.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a storage key to an absolute path under the root.
    ///
    /// Rejects absolute keys and any `..` component so a key can never
    /// address files outside the root.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let rel = Path::new(key);
        if key.is_empty()
            || rel.is_absolute()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl BlobStore for LocalStorage {
    async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::read(path).await?)
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), StorageError> {
        let path = self.resolve(prefix)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => Ok(tokio::fs::remove_dir_all(path).await?),
            Ok(_) => Ok(tokio::fs::remove_file(path).await?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        (dir, storage)
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let (_dir, storage) = store();
        storage.write("a/b/c.png", b"bytes").await.unwrap();
        assert_eq!(storage.read("a/b/c.png").await.unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn delete_prefix_removes_subtree() {
        let (_dir, storage) = store();
        storage.write("jobs/1/refs/a.png", b"a").await.unwrap();
        storage.write("jobs/1/refs/b.png", b"b").await.unwrap();
        storage.write("jobs/2/refs/c.png", b"c").await.unwrap();

        storage.delete_prefix("jobs/1").await.unwrap();

        assert!(storage.read("jobs/1/refs/a.png").await.is_err());
        assert!(storage.read("jobs/2/refs/c.png").await.is_ok());
    }

    #[tokio::test]
    async fn delete_prefix_removes_exact_file_key() {
        let (_dir, storage) = store();
        storage.write("models/a.glb", b"glb").await.unwrap();
        storage.write("models/b.glb", b"glb").await.unwrap();

        // An exact file key deletes just that blob (orphan cleanup).
        storage.delete_prefix("models/a.glb").await.unwrap();

        assert!(storage.read("models/a.glb").await.is_err());
        assert!(storage.read("models/b.glb").await.is_ok());
    }

    #[tokio::test]
    async fn delete_missing_prefix_is_ok() {
        let (_dir, storage) = store();
        storage.delete_prefix("nope/nothing").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_escaping_keys() {
        let (_dir, storage) = store();
        assert!(matches!(
            storage.read("../outside").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.write("/etc/passwd", b"x").await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
