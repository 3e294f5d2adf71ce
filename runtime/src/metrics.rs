//! Dispatch metrics.
//!
//! Recorded through the `metrics` facade, so they are no-ops until the host
//! application installs a recorder (Prometheus exporter, statsd, ...).
//! Every series carries a `store` label taken from [`StoreConfig::label`].
//!
//! | Metric | Type | Extra labels |
//! |--------|------|--------------|
//! | `store_dispatches_total` | counter | |
//! | `store_dispatch_failures_total` | counter | `reason` |
//! | `store_reducer_duration_seconds` | histogram | |
//! | `store_subscribers` | gauge | |
//!
//! [`StoreConfig::label`]: crate::StoreConfig::label

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::Once;
use std::time::Duration;

static DESCRIBE: Once = Once::new();

/// Register metric descriptions with the installed recorder.
///
/// Called by every Store on construction; only the first call has an effect.
/// Call it yourself after installing a recorder if Stores were created
/// before the recorder existed.
pub fn register_metrics() {
    DESCRIBE.call_once(|| {
        describe_counter!(
            "store_dispatches_total",
            "Total number of actions dispatched to a store"
        );
        describe_counter!(
            "store_dispatch_failures_total",
            "Total number of dispatches that returned an error"
        );
        describe_histogram!(
            "store_reducer_duration_seconds",
            "Time taken by reducers to produce the next state"
        );
        describe_gauge!(
            "store_subscribers",
            "Subscribers attached to a store's state after the last dispatch"
        );
    });
}

/// Dispatch metrics recorder.
pub struct DispatchMetrics;

impl DispatchMetrics {
    /// Record a dispatch attempt.
    pub fn record_dispatch(store: &str) {
        counter!("store_dispatches_total", "store" => store.to_owned()).increment(1);
    }

    /// Record a failed dispatch.
    pub fn record_failure(store: &str, reason: &'static str) {
        counter!(
            "store_dispatch_failures_total",
            "store" => store.to_owned(),
            "reason" => reason
        )
        .increment(1);
    }

    /// Record how long a reducer ran.
    pub fn record_reducer(store: &str, duration: Duration) {
        histogram!("store_reducer_duration_seconds", "store" => store.to_owned())
            .record(duration.as_secs_f64());
    }

    /// Record the current subscriber count.
    pub fn record_subscribers(store: &str, count: usize) {
        // Precision loss acceptable for metrics (subscriber counts < 2^52)
        #[allow(clippy::cast_precision_loss)]
        gauge!("store_subscribers", "store" => store.to_owned()).set(count as f64);
    }
}
