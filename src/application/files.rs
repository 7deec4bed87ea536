//! Storage boundary for uploaded document bytes.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("path `{path}` is outside the upload directory")]
    InvalidPath { path: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FileStoreError {
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into() }
    }
}

/// Holds the content of file documents at their recorded path.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Write `bytes` to `path`, replacing previous content.
    async fn save(&self, path: &str, bytes: &[u8]) -> Result<(), FileStoreError>;

    /// Remove the content at `path`. Missing files are treated as success.
    async fn remove(&self, path: &str) -> Result<(), FileStoreError>;
}
