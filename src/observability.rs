//! Shared tracing configuration for the setup pipeline.
//!
//! Centralises the log targets used by the crate so subscribers can filter
//! pipeline events without pulling in unrelated dependency logs.

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Target used by acquisition flow logs.
pub(crate) const LOG_TARGET: &str = "gitops_setup::acquire";

/// Environment variable the runner sets when step debug logging is enabled.
const RUNNER_DEBUG_ENV: &str = "RUNNER_DEBUG";

/// Installs the process-wide `fmt` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the level is `debug` when the
/// runner requests debug output and `info` elsewhere. Installing twice is
/// harmless and only logged.
pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(runner_debug_enabled())));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .try_init();

    if let Err(err) = installed {
        debug!(target: LOG_TARGET, error = %err, "tracing subscriber already installed");
    }
}

fn runner_debug_enabled() -> bool {
    std::env::var(RUNNER_DEBUG_ENV).is_ok_and(|value| value.trim() == "1")
}

const fn default_directive(debug: bool) -> &'static str {
    if debug { "debug" } else { "info" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use temp_env::with_var;

    #[test]
    fn runner_debug_selects_debug_level() {
        assert!(with_var(RUNNER_DEBUG_ENV, Some("1"), runner_debug_enabled));
        assert!(!with_var(RUNNER_DEBUG_ENV, Some("0"), runner_debug_enabled));
        assert!(!with_var(RUNNER_DEBUG_ENV, None::<&str>, runner_debug_enabled));
        assert_eq!(default_directive(true), "debug");
        assert_eq!(default_directive(false), "info");
    }
}
