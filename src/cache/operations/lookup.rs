//! Cache lookup and hit/miss detection.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::cache::CacheKey;

/// Suffix of the marker file written next to a complete entry.
pub(crate) const COMPLETION_SUFFIX: &str = "complete";

/// Observability target for cache operations.
const LOG_TARGET: &str = "gitops_setup::cache";

/// Result of a cache lookup operation.
#[derive(Debug, PartialEq, Eq)]
pub enum CacheLookupResult {
    /// The entry is recorded as complete.
    Hit {
        /// Directory holding the cached files.
        source_dir: Utf8PathBuf,
    },
    /// Nothing is recorded for the key.
    Miss,
}

/// Directory holding the files cached under `key`.
#[must_use]
pub fn entry_dir(cache_dir: &Utf8Path, key: &CacheKey) -> Utf8PathBuf {
    cache_dir
        .join(key.tool())
        .join(key.version())
        .join(key.platform())
}

/// Marker recording that the entry for `key` was written in full.
#[must_use]
pub fn marker_path(cache_dir: &Utf8Path, key: &CacheKey) -> Utf8PathBuf {
    cache_dir
        .join(key.tool())
        .join(key.version())
        .join(format!("{}.{COMPLETION_SUFFIX}", key.platform()))
}

/// Checks the cache bookkeeping for `key`.
///
/// Only the completion marker is consulted. The entry directory may have
/// been removed behind the cache's back; callers re-check it before use.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use setup_gitops_cli::{RawPlatform, VersionSpec};
/// use setup_gitops_cli::cache::{CacheKey, CacheLookupResult, check_cache};
///
/// let key = CacheKey::new(&VersionSpec::default(), &RawPlatform::current().normalize());
/// match check_cache(Utf8Path::new("/opt/hostedtoolcache"), &key) {
///     CacheLookupResult::Hit { source_dir } => tracing::info!(%source_dir, "cached"),
///     CacheLookupResult::Miss => tracing::info!("not cached"),
/// }
/// ```
#[must_use]
pub fn check_cache(cache_dir: &Utf8Path, key: &CacheKey) -> CacheLookupResult {
    let marker = marker_path(cache_dir, key);
    let source_dir = entry_dir(cache_dir, key);

    if marker.is_file() {
        debug!(
            target: LOG_TARGET,
            key = %key,
            path = %source_dir,
            "cache hit"
        );
        CacheLookupResult::Hit { source_dir }
    } else {
        debug!(
            target: LOG_TARGET,
            key = %key,
            marker_exists = false,
            entry_exists = source_dir.is_dir(),
            "cache miss"
        );
        CacheLookupResult::Miss
    }
}
