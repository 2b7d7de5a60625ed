//! Logging setup for embedding applications.
//!
//! The library itself only emits `tracing` events; a host that has no
//! subscriber of its own can install one from [`LoggingConfig`].

use crate::config::LoggingConfig;
use tracing::Subscriber;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global subscriber. `RUST_LOG` takes precedence over the configured level.
///
/// Fails if a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    build_subscriber(config, rust_log.as_deref()).try_init()
}

/// The subscriber `init_logging` installs, for scoped use
fn build_subscriber(
    config: &LoggingConfig,
    rust_log: Option<&str>,
) -> Box<dyn Subscriber + Send + Sync> {
    let filter = rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive(&config.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.format.eq_ignore_ascii_case("json") {
        Box::new(registry.with(tracing_subscriber::fmt::layer().json()))
    } else {
        Box::new(registry.with(tracing_subscriber::fmt::layer()))
    }
}

fn default_directive(level: &str) -> String {
    format!("nodestore_opensearch={level}")
}
