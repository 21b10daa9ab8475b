//! Tracing initialisation for the `build-aggregator` binary.
//!
//! Every log line goes to stderr. The binary runs as a CI step whose report
//! leaves through `envman`, so stdout is kept for that step's own output.
//! `--verbose` picks the default level and `--json` switches to one JSON
//! object per line for log collectors. `RUST_LOG` overrides the level, e.g.
//! `RUST_LOG=aggregator_services=debug` to see each HTTP call.
//!
//! Only the first call in a process takes effect, so tests may call
//! [`init_tracing`] freely.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// * `json` emits newline-delimited JSON log lines.
/// * `level` is the default verbosity when `RUST_LOG` is not set.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init()
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing(false, Level::DEBUG);
        init_tracing(true, Level::INFO);
        tracing::info!(component = "telemetry", "still logging");
    }
}
