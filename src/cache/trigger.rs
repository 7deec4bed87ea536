//! Cache trigger service.
//!
//! Write paths call into this after a mutation has succeeded. Publishing
//! returns immediately; the consumer applies the invalidation later.

use std::sync::Arc;

use tracing::debug;

use crate::domain::entities::DocumentRecord;

use super::config::CacheConfig;
use super::consumer::CacheConsumer;
use super::events::{EventKind, EventQueue};
use super::keys::document_write_tags;

/// Cache trigger for publishing cache events.
///
/// ```ignore
/// // After a document has been deleted from storage:
/// trigger.document_deleted(&document);
/// ```
pub struct CacheTrigger {
    config: CacheConfig,
    queue: Arc<EventQueue>,
    consumer: Arc<CacheConsumer>,
}

impl CacheTrigger {
    pub fn new(config: CacheConfig, queue: Arc<EventQueue>, consumer: Arc<CacheConsumer>) -> Self {
        Self {
            config,
            queue,
            consumer,
        }
    }

    /// Publish an event without waiting for it to be applied.
    pub fn trigger(&self, kind: EventKind) {
        if !self.config.is_enabled() {
            debug!(event_kind = kind.name(), "Cache trigger skipped: cache disabled");
            return;
        }

        self.queue.publish(kind);
    }

    /// A document was stored.
    pub fn document_created(&self, document: &DocumentRecord) {
        self.trigger(EventKind::DocumentCreated {
            document_id: document.id,
            tags: document_write_tags(document),
        });
    }

    /// A document was deleted.
    pub fn document_deleted(&self, document: &DocumentRecord) {
        self.trigger(EventKind::DocumentDeleted {
            document_id: document.id,
            tags: document_write_tags(document),
        });
    }

    /// Wait until every event published so far has been applied.
    pub async fn flush(&self) {
        self.consumer.drain().await;
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn consumer(&self) -> &Arc<CacheConsumer> {
        &self.consumer
    }
}
