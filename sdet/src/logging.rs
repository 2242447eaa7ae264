//! Diagnostic logging for the `sdet` binary.
//!
//! Events go to stderr only, so `observe --json` and `plan --json` keep a
//! clean stdout. Nothing here is written under `.agent/`; the report is the
//! only persisted record of a run.
//!
//! Useful `RUST_LOG` targets:
//!
//! - `sdet::pipeline` for stage boundaries and the final verdict
//! - `sdet::act` for the chosen dispatch branch and teardown
//! - `sdet::io::process` for every spawned command, timeouts and kills
//! - `sdet::io::engine` for the engine verb being invoked
//!
//! For example `RUST_LOG=sdet::act=debug,sdet::io::process=debug sdet run`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Directive used when `RUST_LOG` is unset or unparsable.
const DEFAULT_DIRECTIVE: &str = "warn";

fn filter_from(raw: Option<&str>) -> EnvFilter {
    raw.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber. Call once, first thing in `main`.
pub fn init() {
    let raw = std::env::var("RUST_LOG").ok();
    tracing_subscriber::registry()
        .with(filter_from(raw.as_deref()))
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
