//! Test environment helpers.

use std::sync::Once;

use enso_metrics_core::result::MetricEntry;

static INIT: Once = Once::new();

/// Install a test subscriber once per test binary.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("enso_metrics_core=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Observation keys of a metric entry, in output order.
pub fn metric_keys(entry: &MetricEntry) -> Vec<&str> {
    entry.metric.keys().map(String::as_str).collect()
}

pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {} within {} of {}",
        actual,
        tol,
        expected
    );
}
