//! tracing setup for the CLI and other native hosts.
//!
//! Output goes to stderr so the CLI's stdout stays a single JSON document.

use tracing_subscriber::{fmt, EnvFilter};

/// Filter directives, checked before `RUST_LOG`.
pub const LOG_ENV: &str = "NEARLINK_LOG";
/// `1` or `true` switches to JSON lines.
pub const LOG_JSON_ENV: &str = "NEARLINK_LOG_JSON";

const DEFAULT_FILTER: &str = "nearlink=info,warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn json_requested() -> bool {
    matches!(std::env::var(LOG_JSON_ENV).as_deref(), Ok("1") | Ok("true"))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging() {
    if json_requested() {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter())
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
            .try_init();
    } else {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter())
            .with_target(false)
            .compact()
            .with_writer(std::io::stderr)
            .try_init();
    }
}
