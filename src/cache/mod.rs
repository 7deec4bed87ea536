//! Document cache.
//!
//! An in-process store of document reads, keyed by [`CacheKey`] and labelled
//! with [`Tag`]s. Every entry expires after a fixed TTL. Writes publish
//! events that a background [`CacheConsumer`] turns into tag invalidations.
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `docshelf.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_ms = 60000
//! sweep_interval_ms = 30000
//! consume_batch_limit = 100
//! ```

mod config;
mod consumer;
mod documents;
mod events;
mod index;
mod keys;
mod lock;
mod planner;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use consumer::CacheConsumer;
pub use documents::{CachedValue, DocumentCache};
pub use events::{CacheEvent, Epoch, EventKind, EventQueue};
pub use keys::{CacheKey, Tag, document_list_tags, document_tags, document_write_tags};
pub use planner::ConsumptionPlan;
pub use store::TaggedStore;
pub use trigger::CacheTrigger;

/// Metric names recorded by the cache.
pub mod metric_names {
    pub use super::consumer::METRIC_CACHE_CONSUME_MS as CONSUME_MS;
    pub use super::events::METRIC_EVENT_QUEUE_LEN as EVENT_QUEUE_LEN;
    pub use super::store::{
        METRIC_CACHE_EXPIRED as EXPIRED, METRIC_CACHE_HIT as HIT,
        METRIC_CACHE_INVALIDATED as INVALIDATED, METRIC_CACHE_MISS as MISS,
    };
}
