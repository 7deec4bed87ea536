//! Cache consumer for executing consumption plans.
//!
//! Drains events from the queue, invalidates the tags they carry and then
//! sweeps expired entries. Runs on a background task so write requests
//! never wait on invalidation.

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::config::CacheConfig;
use super::documents::DocumentCache;
use super::events::EventQueue;
use super::planner::ConsumptionPlan;

pub const METRIC_CACHE_CONSUME_MS: &str = "docshelf_cache_consume_ms";

/// Cache consumer that processes events and maintains cache consistency.
pub struct CacheConsumer {
    config: CacheConfig,
    store: Arc<DocumentCache>,
    queue: Arc<EventQueue>,
    // Held for the whole of one batch so `drain` observes finished work.
    consume_lock: Mutex<()>,
}

impl CacheConsumer {
    pub fn new(config: CacheConfig, store: Arc<DocumentCache>, queue: Arc<EventQueue>) -> Self {
        Self {
            config,
            store,
            queue,
            consume_lock: Mutex::new(()),
        }
    }

    /// Consume one batch of pending events and execute the plan.
    ///
    /// Returns true if any events were processed.
    #[instrument(skip(self))]
    pub async fn consume(&self) -> bool {
        let _guard = self.consume_lock.lock().await;
        self.consume_batch()
    }

    /// Consume until the queue is empty.
    ///
    /// Every event published before this call has been applied to the store
    /// when it returns.
    pub async fn drain(&self) -> usize {
        let _guard = self.consume_lock.lock().await;
        let mut batches = 0;
        while self.consume_batch() {
            batches += 1;
        }
        batches
    }

    fn consume_batch(&self) -> bool {
        let consume_started_at = Instant::now();
        let events = self.queue.drain(self.config.batch_limit());
        if events.is_empty() {
            return false;
        }

        let event_count = events.len();
        let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        let plan = ConsumptionPlan::from_events(events);

        info!(
            event_count,
            event_ids = ?event_ids,
            plan = %plan,
            "Cache consumption starting"
        );

        let invalidated = self.store.invalidate_by_tags(&plan.invalidate_tags);
        let expired = if plan.sweep_expired {
            self.store.clean_expired()
        } else {
            0
        };

        info!(
            event_count,
            invalidated, expired, "Cache consumption complete"
        );

        histogram!(METRIC_CACHE_CONSUME_MS)
            .record(consume_started_at.elapsed().as_secs_f64() * 1000.0);

        true
    }

    /// Evict expired entries without waiting for a write.
    pub async fn sweep(&self) -> usize {
        let _guard = self.consume_lock.lock().await;
        let expired = self.store.clean_expired();
        if expired > 0 {
            debug!(expired, "Periodic cache sweep evicted entries");
        }
        expired
    }

    /// Run the consumer loop on a background task.
    ///
    /// The loop wakes on every publish and on each sweep tick. It stops when
    /// the handle is aborted.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.sweep_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            info!(
                sweep_interval_ms = self.config.sweep_interval_ms,
                "Cache consumer started"
            );

            loop {
                tokio::select! {
                    _ = self.queue.notified() => {
                        self.drain().await;
                    }
                    _ = ticker.tick() => {
                        if self.queue.is_empty() {
                            self.sweep().await;
                        } else {
                            self.drain().await;
                        }
                    }
                }
            }
        })
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn store(&self) -> &Arc<DocumentCache> {
        &self.store
    }
}
