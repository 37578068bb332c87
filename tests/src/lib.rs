//! Courier Testing Utilities
//!
//! Test doubles for exercising capability-gated selection without a real
//! runtime environment: a scriptable capability source that counts probes,
//! conditions that count their evaluations, and senders or parsers that
//! record what reached them.

pub mod conditions;
pub mod environment;
pub mod senders;
pub mod templates;

pub use conditions::{CallCounter, counting};
pub use environment::StubEnvironment;
pub use senders::{DecliningSender, FailingSender, RecordingSender};
pub use templates::StaticParser;

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber for the current test binary.
///
/// Honors `RUST_LOG`, defaulting to `courier=debug`. Safe to call from every
/// test.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("courier=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
