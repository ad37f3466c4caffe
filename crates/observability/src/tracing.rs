//! Subscriber construction.
//!
//! Output is one JSON object per event. `RUST_LOG` overrides the default
//! directives entirely when set.

use tracing_subscriber::EnvFilter;

/// Info for our crates; sqlx statement logging only when something is slow or failing.
pub const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn";

/// Filter from `RUST_LOG`, or `fallback` if it is unset or unparsable.
pub fn filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the subscriber using `fallback` when `RUST_LOG` is absent.
pub fn init(fallback: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(fallback))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_a_no_op() {
        init(DEFAULT_DIRECTIVES);
        init("debug");
    }

    #[test]
    fn default_directives_parse() {
        assert!(DEFAULT_DIRECTIVES.parse::<EnvFilter>().is_ok());
    }
}
