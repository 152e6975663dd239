//! File storage collaborator for room attachments.
//!
//! The workflow only ever hands storage an opaque key and gets back the path
//! it should record; [`LocalFileStorage`] maps keys onto a directory tree.

use std::path::{Component, Path, PathBuf};

use futures::future::BoxFuture;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Stored file not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Byte storage for room files.
pub trait FileStorage: Send + Sync {
    /// Writes `bytes` under `key` and returns the path to record for it.
    fn store<'a>(&'a self, key: &'a str, bytes: Vec<u8>) -> BoxFuture<'a, StorageResult<String>>;

    fn open<'a>(&'a self, path: &'a str) -> BoxFuture<'a, StorageResult<Vec<u8>>>;

    /// Removes the bytes at `path`; `NotFound` if they are already gone.
    fn delete<'a>(&'a self, path: &'a str) -> BoxFuture<'a, StorageResult<()>>;
}

/// Stores files below a root directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Joins `key` onto the root, refusing anything that could leave it.
    fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        let contained = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

        if key.is_empty() || !contained {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

fn classify(err: std::io::Error, path: &str) -> StorageError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(path.to_string())
    } else {
        StorageError::Io(err)
    }
}

impl FileStorage for LocalFileStorage {
    fn store<'a>(&'a self, key: &'a str, bytes: Vec<u8>) -> BoxFuture<'a, StorageResult<String>> {
        Box::pin(async move {
            let target = self.resolve(key)?;
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, bytes).await?;
            tracing::debug!(key, path = %target.display(), "Stored file");
            Ok(key.to_string())
        })
    }

    fn open<'a>(&'a self, path: &'a str) -> BoxFuture<'a, StorageResult<Vec<u8>>> {
        Box::pin(async move {
            let target = self.resolve(path)?;
            tokio::fs::read(&target)
                .await
                .map_err(|err| classify(err, path))
        })
    }

    fn delete<'a>(&'a self, path: &'a str) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(async move {
            let target = self.resolve(path)?;
            tokio::fs::remove_file(&target)
                .await
                .map_err(|err| classify(err, path))
        })
    }
}
