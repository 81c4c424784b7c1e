//! Diagnostic logging for the CLI.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! `RUST_LOG` takes precedence over the `--verbose` flag.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Initialize the tracing subscriber.
///
/// With `json` set, events are written as flattened JSON objects; otherwise
/// as compact human-readable lines.
pub fn init_logging(verbose: bool, json: bool) {
    let filter = default_filter(verbose);
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| {
        fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(json_layer)
        .with(text_layer)
        .try_init();

    tracing::debug!(filter = %filter, json, "Logging initialized");
}
