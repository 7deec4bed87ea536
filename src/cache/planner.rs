//! Consumption plan generation.
//!
//! Merges a batch of cache events into one set of store actions.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use uuid::Uuid;

use super::events::{CacheEvent, EventKind};
use super::keys::Tag;

/// Actions to execute against the store for one drained batch.
#[derive(Debug, Default)]
pub struct ConsumptionPlan {
    /// Tags to invalidate, deduplicated across events.
    pub invalidate_tags: BTreeSet<Tag>,
    /// Documents whose writes contributed to this plan.
    pub documents: HashSet<Uuid>,
    /// Whether to evict expired entries after invalidating.
    pub sweep_expired: bool,
}

impl fmt::Display for ConsumptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConsumptionPlan {{ invalidate_tags: {}, documents: {}, sweep_expired: {} }}",
            self.invalidate_tags.len(),
            self.documents.len(),
            self.sweep_expired,
        )
    }
}

impl ConsumptionPlan {
    /// Merge events into a plan.
    ///
    /// Events are deduplicated by ID. Every non-empty batch sweeps expired
    /// entries, since each write is followed by a sweep.
    pub fn from_events(events: Vec<CacheEvent>) -> Self {
        let mut plan = Self::default();
        let mut seen_ids = HashSet::new();

        for event in events.into_iter().filter(|e| seen_ids.insert(e.id)) {
            plan.sweep_expired = true;
            match event.kind {
                EventKind::DocumentCreated { document_id, tags }
                | EventKind::DocumentDeleted { document_id, tags } => {
                    plan.documents.insert(document_id);
                    plan.invalidate_tags.extend(tags);
                }
                EventKind::SweepExpired => {}
            }
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.invalidate_tags.is_empty() && !self.sweep_expired
    }
}
