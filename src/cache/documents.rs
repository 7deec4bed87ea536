//! Typed access to cached document reads.

use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use crate::domain::documents::DocumentFilter;
use crate::domain::entities::DocumentRecord;

use super::keys::{CacheKey, document_list_tags, document_tags};
use super::store::TaggedStore;

/// Payload of a cached document read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    Document(DocumentRecord),
    DocumentList(Vec<DocumentRecord>),
}

/// The process-wide document cache.
pub type DocumentCache = TaggedStore<CacheKey, CachedValue>;

impl TaggedStore<CacheKey, CachedValue> {
    pub fn get_document(&self, id: Uuid) -> Option<DocumentRecord> {
        let key = CacheKey::Document(id);
        match self.get(&key)? {
            CachedValue::Document(document) => Some(document),
            CachedValue::DocumentList(_) => {
                warn!(%key, "Unexpected payload in cache, treating as miss");
                None
            }
        }
    }

    pub fn put_document(&self, document: DocumentRecord, ttl: Duration) {
        let tags = document_tags(&document);
        self.put(
            CacheKey::Document(document.id),
            CachedValue::Document(document),
            ttl,
            tags,
        );
    }

    pub fn get_document_list(&self, filter: &DocumentFilter) -> Option<Vec<DocumentRecord>> {
        let key = CacheKey::DocumentList(filter.clone());
        match self.get(&key)? {
            CachedValue::DocumentList(documents) => Some(documents),
            CachedValue::Document(_) => {
                warn!(%key, "Unexpected payload in cache, treating as miss");
                None
            }
        }
    }

    pub fn put_document_list(
        &self,
        filter: &DocumentFilter,
        documents: Vec<DocumentRecord>,
        ttl: Duration,
    ) {
        let tags = document_list_tags(filter, &documents);
        self.put(
            CacheKey::DocumentList(filter.clone()),
            CachedValue::DocumentList(documents),
            ttl,
            tags,
        );
    }
}
