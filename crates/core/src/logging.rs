//! Tracing setup shared by the frontends.
//!
//! Logs always go to stderr so reports printed on stdout stay parseable.
//! `RUST_LOG` takes precedence over the level chosen by the caller.

use std::sync::Once;

use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Raise the default level from `warn` to `debug`.
    pub verbose: bool,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

impl LogOptions {
    fn default_directive(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}

/// Install the global subscriber. Only the first call has an effect.
pub fn init_tracing(options: LogOptions) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(options.default_directive()));

        let registry = tracing_subscriber::registry().with(env_filter);
        // `try_init` so an embedding application's subscriber wins.
        let installed = if options.json {
            registry
                .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
                .try_init()
        } else {
            registry
                .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
                .try_init()
        };

        if installed.is_ok() {
            debug!(json = options.json, "tracing initialized");
        }
    });
}
