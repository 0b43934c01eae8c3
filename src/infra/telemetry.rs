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
            "vitrine_memo_hit_total",
            Unit::Count,
            "Total number of memo cache hits."
        );
        describe_counter!(
            "vitrine_memo_miss_total",
            Unit::Count,
            "Total number of memo cache misses that ran a fetch."
        );
        describe_counter!(
            "vitrine_content_source_failure_total",
            Unit::Count,
            "Configured content sources that failed and were skipped."
        );
        describe_counter!(
            "vitrine_content_fallback_total",
            Unit::Count,
            "Reads answered by a lower-priority content source."
        );
        describe_counter!(
            "vitrine_video_evict_total",
            Unit::Count,
            "Total number of preloaded videos evicted due to capacity."
        );
    });
}
