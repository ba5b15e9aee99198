//! Test environment helpers.

use std::sync::Once;

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
