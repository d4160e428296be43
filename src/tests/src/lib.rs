//! Integration tests for the result-or-error combinators.

pub mod function_tests;
pub mod future_tests;
pub mod sequencer_tests;

use tracing_subscriber::EnvFilter;

/// Installs a `RUST_LOG`-driven subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
