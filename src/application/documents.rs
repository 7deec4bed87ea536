//! Document reads and writes with a read-through cache.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::files::FileStore;
use crate::application::repos::{DocumentsRepo, RepoError};
use crate::cache::{CacheTrigger, DocumentCache};
use crate::domain::documents::{DocumentFilter, validate_new_document};
use crate::domain::entities::{DocumentRecord, NewDocument};
use crate::domain::error::DomainError;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct DocumentService {
    documents: Arc<dyn DocumentsRepo>,
    files: Option<Arc<dyn FileStore>>,
    upload_dir: String,
    cache: Option<Arc<DocumentCache>>,
    cache_trigger: Option<Arc<CacheTrigger>>,
    cache_ttl: Duration,
}

impl DocumentService {
    pub fn new(documents: Arc<dyn DocumentsRepo>, upload_dir: impl Into<String>) -> Self {
        Self {
            documents,
            files: None,
            upload_dir: upload_dir.into(),
            cache: None,
            cache_trigger: None,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Persist the content of file documents through `files`.
    pub fn with_file_store(mut self, files: Arc<dyn FileStore>) -> Self {
        self.files = Some(files);
        self
    }

    /// Serve reads through `cache`, keeping entries for `ttl`.
    pub fn with_cache(mut self, cache: Arc<DocumentCache>, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    /// Set the cache trigger for this service.
    pub fn with_cache_trigger(mut self, trigger: Arc<CacheTrigger>) -> Self {
        self.cache_trigger = Some(trigger);
        self
    }

    pub async fn get_document(&self, id: Uuid) -> Result<DocumentRecord, AppError> {
        if let Some(cache) = &self.cache {
            if let Some(document) = cache.get_document(id) {
                debug!(document_id = %id, "fetch document from cache");
                return Ok(document);
            }
            debug!(document_id = %id, "document not found in cache");
        }

        let document = self
            .documents
            .find_by_id(id)
            .await?
            .ok_or(RepoError::NotFound)?;

        if let Some(cache) = &self.cache {
            cache.put_document(document.clone(), self.cache_ttl);
        }

        Ok(document)
    }

    /// Fetch a document on behalf of `login`, who must be granted it unless it is public.
    pub async fn get_document_as(&self, id: Uuid, login: &str) -> Result<DocumentRecord, AppError> {
        let document = self.get_document(id).await?;
        if !document.is_readable_by(login) {
            debug!(document_id = %id, login, "document read denied");
            return Err(DomainError::access_denied(login).into());
        }
        Ok(document)
    }

    pub async fn list_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<Vec<DocumentRecord>, AppError> {
        if let Some(cache) = &self.cache {
            if let Some(documents) = cache.get_document_list(filter) {
                debug!(count = documents.len(), "fetch document list from cache");
                return Ok(documents);
            }
            debug!("document list not found in cache");
        }

        let documents = self.documents.list_documents(filter).await?;

        if let Some(cache) = &self.cache {
            cache.put_document_list(filter, documents.clone(), self.cache_ttl);
        }

        Ok(documents)
    }

    /// Store a new document and schedule invalidation of dependent reads.
    ///
    /// File content is written before the record. When storage rejects the
    /// record the content is removed again and nothing is invalidated.
    pub async fn add_document(&self, new: NewDocument) -> Result<DocumentRecord, AppError> {
        validate_new_document(&new)?;

        let id = Uuid::new_v4();
        let path = self.storage_path(id, &new.name)?;
        let NewDocument {
            name,
            mime,
            file,
            public,
            grants,
            content,
        } = new;
        let document = DocumentRecord {
            id,
            name,
            mime,
            file,
            public,
            created_at: OffsetDateTime::now_utc(),
            grants,
            path,
        };

        let saved = match (&self.files, content) {
            (Some(files), Some(bytes)) if document.file => {
                files.save(&document.path, &bytes).await?;
                Some(files)
            }
            _ => None,
        };

        if let Err(err) = self.documents.create_document(&document).await {
            if let Some(files) = saved {
                if let Err(cleanup) = files.remove(&document.path).await {
                    warn!(path = %document.path, error = %cleanup, "remove orphaned upload failed");
                }
            }
            return Err(err.into());
        }

        if let Some(trigger) = &self.cache_trigger {
            trigger.document_created(&document);
        }

        Ok(document)
    }

    /// Delete a document and schedule invalidation of dependent reads.
    pub async fn remove_document(&self, id: Uuid) -> Result<DocumentRecord, AppError> {
        self.remove_checked(id, None).await
    }

    /// Delete a document on behalf of `login`, who must hold a grant on it.
    pub async fn remove_document_as(
        &self,
        id: Uuid,
        login: &str,
    ) -> Result<DocumentRecord, AppError> {
        self.remove_checked(id, Some(login)).await
    }

    async fn remove_checked(
        &self,
        id: Uuid,
        login: Option<&str>,
    ) -> Result<DocumentRecord, AppError> {
        // Loaded first: its attributes decide what to invalidate.
        let document = self
            .documents
            .find_by_id(id)
            .await?
            .ok_or(RepoError::NotFound)?;

        if let Some(login) = login {
            if !document.is_granted_to(login) {
                debug!(document_id = %id, login, "document delete denied");
                return Err(DomainError::access_denied(login).into());
            }
        }

        if let Err(err) = self.documents.delete_document(id).await {
            warn!(document_id = %id, error = %err, "delete document failed");
            return Err(err.into());
        }

        if let (true, Some(files)) = (document.file, &self.files) {
            if let Err(err) = files.remove(&document.path).await {
                warn!(
                    document_id = %id,
                    path = %document.path,
                    error = %err,
                    "remove upload failed"
                );
            }
        }

        if let Some(trigger) = &self.cache_trigger {
            trigger.document_deleted(&document);
        }

        Ok(document)
    }

    /// `<upload_dir>/<id>-<basename>`, so equal names never share a file.
    fn storage_path(&self, id: Uuid, name: &str) -> Result<String, AppError> {
        let base = Path::new(name).file_name().ok_or_else(|| {
            AppError::validation(format!("document name `{name}` has no file component"))
        })?;
        Ok(format!(
            "{}/{id}-{}",
            self.upload_dir.trim_end_matches('/'),
            base.to_string_lossy()
        ))
    }
}
