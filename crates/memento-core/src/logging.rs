//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

/// Install a compact `fmt` subscriber filtered by the settings' log filter.
///
/// `RUST_LOG` takes precedence when set. Calling this more than once is
/// harmless; later calls leave the first subscriber in place.
pub fn init_logging(settings: &Settings) {
    let env_filter = build_filter(settings);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .compact()
        .try_init()
        .ok(); // Ignore error if already initialized
}

fn build_filter(settings: &Settings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.effective_log_filter()))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}
