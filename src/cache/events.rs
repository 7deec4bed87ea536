//! Cache event system.
//!
//! Write paths publish events here; the cache consumer drains them and
//! applies the invalidations off the request path.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::gauge;
use time::OffsetDateTime;
use tokio::sync::Notify;
use tracing::debug;
use uuid::Uuid;

use super::keys::Tag;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::events";

pub const METRIC_EVENT_QUEUE_LEN: &str = "docshelf_cache_event_queue_len";

/// Monotonic epoch for ordering events within this process.
pub type Epoch = u64;

/// Cache event with idempotency and ordering support.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    /// Unique identifier for idempotency (UUIDv4).
    pub id: Uuid,
    pub epoch: Epoch,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(kind: EventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Types of cache events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A document was stored. Carries the tags derived from it.
    DocumentCreated { document_id: Uuid, tags: Vec<Tag> },
    /// A document was deleted. Carries the tags derived from it.
    DocumentDeleted { document_id: Uuid, tags: Vec<Tag> },
    /// Evict expired entries without invalidating anything.
    SweepExpired,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::DocumentCreated { .. } => "document_created",
            EventKind::DocumentDeleted { .. } => "document_deleted",
            EventKind::SweepExpired => "sweep_expired",
        }
    }

    pub fn tags(&self) -> &[Tag] {
        match self {
            EventKind::DocumentCreated { tags, .. } | EventKind::DocumentDeleted { tags, .. } => {
                tags.as_slice()
            }
            EventKind::SweepExpired => &[],
        }
    }
}

/// In-memory FIFO of pending cache events.
///
/// Publishing wakes the consumer worker; a wake-up sent while the worker is
/// busy is remembered, so none are lost.
pub struct EventQueue {
    queue: Mutex<VecDeque<CacheEvent>>,
    epoch_counter: AtomicU64,
    wakeup: Notify,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
            wakeup: Notify::new(),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Publish an event and wake the consumer.
    pub fn publish(&self, kind: EventKind) {
        let epoch = self.next_epoch();
        let event = CacheEvent::new(kind, epoch);

        debug!(
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = event.kind.name(),
            tags = event.kind.tags().len(),
            "Cache event enqueued"
        );

        let len = {
            let mut queue = mutex_lock(&self.queue, SOURCE, "publish");
            queue.push_back(event);
            queue.len()
        };
        gauge!(METRIC_EVENT_QUEUE_LEN).set(len as f64);
        self.wakeup.notify_one();
    }

    /// Drain up to `limit` events in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<CacheEvent> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        let events: Vec<CacheEvent> = queue.drain(..count).collect();
        gauge!(METRIC_EVENT_QUEUE_LEN).set(queue.len() as f64);
        events
    }

    /// Resolves once an event has been published since the last wake-up.
    pub async fn notified(&self) {
        self.wakeup.notified().await;
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
