//! Tracing/logging initialization.
//!
//! Session events are emitted with structured fields (`user_id`, `key`,
//! `error`); the credential itself is never logged.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Project-specific override, checked before `RUST_LOG`.
pub const FILTER_ENV: &str = "FISKAL_LOG";

/// Level for everything outside the fiskal crates.
const BASE_LEVEL: &str = "warn";

/// Fiskal crates and the level their events are kept at by default.
///
/// Session lifecycle (`session established`, `session cleared`, hydration)
/// is logged at `info`; guard redirects from the web crate at `debug`.
const FISKAL_DIRECTIVES: &[&str] = &[
    "fiskal_session=info",
    "fiskal_auth=info",
    "fiskal_web=debug",
];

/// The filter used when neither `FISKAL_LOG` nor `RUST_LOG` is set.
pub fn default_filter() -> EnvFilter {
    FISKAL_DIRECTIVES
        .iter()
        .filter_map(|raw| raw.parse::<Directive>().ok())
        .fold(EnvFilter::new(BASE_LEVEL), EnvFilter::add_directive)
}

fn filter_from_env() -> EnvFilter {
    EnvFilter::try_from_env(FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| default_filter())
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    // JSON logs + timestamps; targets distinguish session from auth events.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_from_env())
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .try_init();
}
