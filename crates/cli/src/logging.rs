//! Logging setup for the CLI.

use tracing_subscriber::EnvFilter;

/// Console logging with an env-filter; `RUST_LOG` overrides the default
/// INFO level.
pub fn init_logging() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
    .init();
}
