use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "waypost_cache_fast_hit_total",
            Unit::Count,
            "Total number of fast-tier cache hits."
        );
        describe_counter!(
            "waypost_cache_fast_miss_total",
            Unit::Count,
            "Total number of fast-tier cache misses."
        );
        describe_counter!(
            "waypost_cache_durable_hit_total",
            Unit::Count,
            "Total number of durable-tier cache hits."
        );
        describe_counter!(
            "waypost_cache_durable_miss_total",
            Unit::Count,
            "Total number of durable-tier cache misses."
        );
        describe_counter!(
            "waypost_cache_durable_error_total",
            Unit::Count,
            "Total number of durable-tier failures degraded to misses."
        );
        describe_counter!(
            "waypost_flight_owner_total",
            Unit::Count,
            "Total number of computations owned by this process."
        );
        describe_counter!(
            "waypost_flight_wait_total",
            Unit::Count,
            "Total number of requests that waited on an in-flight computation."
        );
        describe_counter!(
            "waypost_flight_retry_total",
            Unit::Count,
            "Total number of waiter retries after an owner finished without a cached result."
        );
        describe_counter!(
            "waypost_route_compute_total",
            Unit::Count,
            "Total number of route plans computed upstream."
        );
        describe_counter!(
            "waypost_pool_generate_total",
            Unit::Count,
            "Total number of daily hotspot pool generations."
        );
        describe_counter!(
            "waypost_photo_search_total",
            Unit::Count,
            "Total number of photo library searches issued upstream."
        );
    });
}
