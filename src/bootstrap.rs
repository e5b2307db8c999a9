//! Entry point wiring configuration, the tool cache and the acquisition flow.

use color_eyre::eyre::Context;
use tracing::{debug, info};

use crate::acquire::Acquirer;
use crate::actions::RunnerFiles;
use crate::cache::{CacheGateway, ToolCacheDir};
use crate::error::{AcquireError, AcquireErrorKind, AcquireResult};
use crate::observability::{LOG_TARGET, init_tracing};
use crate::SetupCfg;

/// Loads inputs from the environment, acquires the binary and publishes the
/// step outputs.
///
/// # Errors
///
/// Returns an error when configuration is invalid, acquisition fails, or
/// the outputs cannot be written.
pub fn run() -> crate::Result<()> {
    install_hooks();

    let cfg = SetupCfg::load()?;
    let request = cfg.to_request();
    let settings = cfg.to_settings()?;
    let cache = CacheGateway::new(ToolCacheDir::new(cfg.tool_cache_root()), cfg.no_cache()?);
    let acquirer = Acquirer::new(cache, settings)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create Tokio runtime")
        .map_err(AcquireError::from)?;
    let acquired = rt.block_on(acquirer.acquire(&request))?;

    publish(&RunnerFiles::from_env(), &acquired)?;
    info!(
        target: LOG_TARGET,
        version = %acquired.version,
        path = %acquired.binary_path,
        cache_hit = acquired.cache_hit,
        "gitops CLI is ready"
    );
    Ok(())
}

/// Installs the error report hook and the tracing subscriber. The hook's
/// outcome is logged once a subscriber exists to record it.
fn install_hooks() {
    let eyre_hook = color_eyre::install();
    init_tracing();
    if let Err(err) = eyre_hook {
        debug!(target: LOG_TARGET, "color_eyre already installed: {err}");
    }
}

fn publish(files: &RunnerFiles, acquired: &crate::Acquired) -> AcquireResult<()> {
    files
        .publish(acquired)
        .map_err(|report| AcquireError::new(AcquireErrorKind::Other, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::capture_logs;
    use tracing::Level;

    #[test]
    fn repeated_hook_installation_is_logged() {
        let (logs, ()) = capture_logs(Level::DEBUG, || {
            install_hooks();
            install_hooks();
        });
        assert!(
            logs.iter().any(|line| line.contains("color_eyre already installed")),
            "expected the hook failure to be logged, got {logs:?}"
        );
    }
}
