//! Cache configuration.
//!
//! Controlled via the `[cache]` section of `docshelf.toml`.

use std::time::Duration;

const DEFAULT_TTL_MS: u64 = 60_000;
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 30_000;
const DEFAULT_CONSUME_BATCH_LIMIT: usize = 100;

/// Runtime cache settings. `Default` holds the defaults applied when the
/// configuration omits a key.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Serve reads from the cache and invalidate it on writes.
    pub enabled: bool,
    /// Lifetime of every cached read, in milliseconds.
    pub ttl_ms: u64,
    /// Interval (ms) of the background expiry sweep.
    pub sweep_interval_ms: u64,
    /// Maximum events per consumption batch.
    pub consume_batch_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: DEFAULT_TTL_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
            consume_batch_limit: DEFAULT_CONSUME_BATCH_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl_ms: settings.ttl.as_millis() as u64,
            sweep_interval_ms: settings.sweep_interval.as_millis() as u64,
            consume_batch_limit: settings.consume_batch_limit.get(),
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Sweep interval, clamped to at least one millisecond.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }

    /// Batch limit, clamped to at least one event.
    pub fn batch_limit(&self) -> usize {
        self.consume_batch_limit.max(1)
    }
}
