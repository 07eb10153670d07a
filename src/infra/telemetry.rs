use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
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
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
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

/// Register descriptions for every metric the service emits. Idempotent.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "sagoma_render_total",
            Unit::Count,
            "Total number of render requests handled."
        );
        describe_counter!(
            "sagoma_render_cache_hit_total",
            Unit::Count,
            "Renders served from a fresh cache entry."
        );
        describe_counter!(
            "sagoma_render_cache_miss_total",
            Unit::Count,
            "Renders that found no cache entry."
        );
        describe_counter!(
            "sagoma_render_cache_stale_total",
            Unit::Count,
            "Renders that found an entry older than its source."
        );
        describe_counter!(
            "sagoma_render_failed_total",
            Unit::Count,
            "Renders that ended in a failure, labelled by kind."
        );
        describe_counter!(
            "sagoma_compile_total",
            Unit::Count,
            "Total number of compiles started."
        );
        describe_counter!(
            "sagoma_compile_failed_total",
            Unit::Count,
            "Compiles that ended in a failure, labelled by kind."
        );
        describe_histogram!(
            "sagoma_compile_ms",
            Unit::Milliseconds,
            "Compile latency in milliseconds, including the source read."
        );
        describe_counter!(
            "sagoma_cache_flush_total",
            Unit::Count,
            "Total number of cache flushes."
        );
        describe_counter!(
            "sagoma_reply_timeout_total",
            Unit::Count,
            "Exchanges whose caller gave up waiting, labelled by operation."
        );
    });
}
