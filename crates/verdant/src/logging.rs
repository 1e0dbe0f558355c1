//! Log subscriber setup for hosts that do not install their own.
//!
//! Filtering follows `RUST_LOG`; without it, `info` is logged. With the
//! `tracing-json` feature the output is one JSON object per line.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{Error, Result};

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_tracing() -> Result<()> {
    init_with_filter(DEFAULT_FILTER)
}

/// Like [`init_tracing`], with `fallback` used when `RUST_LOG` is unset or
/// invalid.
pub fn init_with_filter(fallback: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    #[cfg(feature = "tracing-json")]
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);
    #[cfg(not(feature = "tracing-json"))]
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|err| Error::Logging(err.to_string()))
}
