//! Tracing setup for tests.

use tracing_subscriber::EnvFilter;

/// Initialize a compact tracing subscriber for test output.
///
/// Safe to call from every test; only the first call installs the
/// subscriber.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .compact()
        .try_init();
}
