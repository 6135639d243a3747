//! Logging setup
//!
//! Library code only emits `tracing` events; the embedding application
//! calls [`init_tracing`] once to install a subscriber.

use agentdodo_domain::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over `config.filter`; an unparsable filter
/// falls back to `info`. Returns `false` if a global subscriber was already
/// installed.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let installed = if config.json {
        subscriber.json().try_init().is_ok()
    } else {
        subscriber.try_init().is_ok()
    };
    if installed {
        tracing::debug!(filter = %config.filter, json = config.json, "Tracing initialised");
    }
    installed
}
