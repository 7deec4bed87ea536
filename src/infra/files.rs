//! Filesystem-backed document content.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::application::files::{FileStore, FileStoreError};

#[derive(Debug)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, std::io::Error> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Recorded paths are `<root>/<name>` and may not climb out of the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, FileStoreError> {
        let candidate = Path::new(path);
        let escapes = candidate
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)));
        if escapes || candidate == self.root || !candidate.starts_with(&self.root) {
            return Err(FileStoreError::invalid_path(path));
        }

        Ok(candidate.to_path_buf())
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(&self, path: &str, bytes: &[u8]) -> Result<(), FileStoreError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, bytes).await?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), FileStoreError> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(FileStoreError::Io(err)),
        }
    }
}
