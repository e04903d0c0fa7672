//! Tracing setup for the `icetime` binary
//!
//! Log lines go to stderr in both formats. Stdout carries only command
//! output (summaries, JSON reports, TOML), so it stays machine-readable
//! with `--json`.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Targets that follow the requested level. Dependencies stay at `warn`.
const ICETIME_TARGETS: [&str; 4] = ["icetime", "icetime_core", "icetime_feeds", "icetime_store"];

/// Filter used when `RUST_LOG` is unset, e.g. `warn,icetime=info,...`.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    std::iter::once("warn".to_string())
        .chain(ICETIME_TARGETS.iter().map(|target| format!("{target}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. A second call leaves the first in place.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
