//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::documents::DocumentFilter;
use crate::domain::entities::DocumentRecord;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("integrity error: {message}")]
    Integrity { message: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait DocumentsRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<DocumentRecord>, RepoError>;

    /// Documents matching `filter`, newest first, at most `filter.limit`.
    async fn list_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<Vec<DocumentRecord>, RepoError>;

    /// Store a document and its grants. Every granted login must exist.
    async fn create_document(&self, document: &DocumentRecord) -> Result<(), RepoError>;

    async fn delete_document(&self, id: Uuid) -> Result<(), RepoError>;
}
