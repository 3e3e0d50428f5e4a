use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Routes `tracing` output to the test harness. Filter with `RUST_LOG`,
/// e.g. `RUST_LOG=rxcore=trace`.
pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
