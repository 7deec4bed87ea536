use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::metric_names;
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            metric_names::HIT,
            Unit::Count,
            "Total number of document cache hits."
        );
        describe_counter!(
            metric_names::MISS,
            Unit::Count,
            "Total number of document cache misses, expired entries included."
        );
        describe_counter!(
            metric_names::EXPIRED,
            Unit::Count,
            "Total number of cache entries evicted after their TTL."
        );
        describe_counter!(
            metric_names::INVALIDATED,
            Unit::Count,
            "Total number of cache entries evicted by key or tag invalidation."
        );
        describe_gauge!(
            metric_names::EVENT_QUEUE_LEN,
            Unit::Count,
            "Current number of pending cache events in the queue."
        );
        describe_histogram!(
            metric_names::CONSUME_MS,
            Unit::Milliseconds,
            "Cache consumption latency in milliseconds."
        );
    });
}
