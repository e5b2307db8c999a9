//! Registers a freshly installed tree in the cache.

use camino::Utf8Path;
use color_eyre::eyre::Context;
use std::fs;
use std::io;
use tracing::debug;

use super::copy::copy_tree;
use super::lookup::{entry_dir, marker_path};
use crate::cache::CacheKey;
use crate::error::CacheResult;

/// Observability target for cache operations.
const LOG_TARGET: &str = "gitops_setup::cache";

/// Copies `source` into the cache under `key`, replacing any previous entry.
///
/// The completion marker is removed first and written last, so an
/// interrupted population never looks complete.
///
/// # Errors
///
/// Returns an error if the previous entry cannot be cleared, the copy
/// fails, or the marker cannot be written.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use setup_gitops_cli::{RawPlatform, VersionSpec};
/// use setup_gitops_cli::cache::{CacheKey, populate_cache};
///
/// let key = CacheKey::new(&VersionSpec::default(), &RawPlatform::current().normalize());
/// populate_cache(
///     Utf8Path::new("/home/runner/.gitops-cli"),
///     Utf8Path::new("/opt/hostedtoolcache"),
///     &key,
/// )?;
/// # Ok::<(), setup_gitops_cli::cache::CacheError>(())
/// ```
pub fn populate_cache(source: &Utf8Path, cache_dir: &Utf8Path, key: &CacheKey) -> CacheResult<()> {
    let target = entry_dir(cache_dir, key);
    let marker = marker_path(cache_dir, key);

    debug!(
        target: LOG_TARGET,
        source = %source,
        key = %key,
        path = %target,
        "populating cache"
    );

    remove_if_present(fs::remove_file(&marker))
        .with_context(|| format!("failed to clear cache completion marker: {marker}"))?;
    remove_if_present(fs::remove_dir_all(&target))
        .with_context(|| format!("failed to clear stale cache entry: {target}"))?;

    fs::create_dir_all(&target)
        .with_context(|| format!("failed to create cache directory: {target}"))?;
    copy_tree(source, &target)
        .with_context(|| format!("failed to copy {source} into cache: {target}"))?;

    fs::write(&marker, "")
        .with_context(|| format!("failed to write cache completion marker: {marker}"))?;

    debug!(
        target: LOG_TARGET,
        key = %key,
        path = %target,
        "cache population completed"
    );
    Ok(())
}

fn remove_if_present(outcome: io::Result<()>) -> io::Result<()> {
    match outcome {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
