//! Observability for TurboCommerce navigations.
//!
//! This crate provides:
//! - `StructuredLogger` - Structured logging with navigation context
//! - `MetricsCollector` / `NavigationMetrics` - Per-navigation timing
//! - `init_tracing` - Process-wide `tracing` subscriber setup

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;

use tracing_subscriber::EnvFilter;

/// Install a formatting `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Returns `false` if a
/// global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
