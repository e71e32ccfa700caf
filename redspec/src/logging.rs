//! Diagnostic tracing for the library and CLI
//!
//! Tracing goes to stderr and is controlled by `RUST_LOG`. It is separate from
//! the two product outputs: console lines for people and progress events for
//! programs.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`. Safe to call more than once; only
/// the first call installs a subscriber.
///
/// # Example
/// ```bash
/// RUST_LOG=redspec=debug redspec "Add live bus tracking"
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
