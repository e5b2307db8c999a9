//! Cache backends the acquisition flow can consult.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::Context;
use tracing::{debug, warn};

use super::CacheKey;
use super::operations::{CacheLookupResult, check_cache, copy_from_cache, populate_cache};
use crate::error::CacheResult;

const LOG_TARGET: &str = "gitops_setup::cache";

/// Storage for previously acquired binaries.
///
/// Bookkeeping (`lookup`) and the filesystem may disagree; callers must
/// not assume a returned directory exists.
#[cfg_attr(test, mockall::automock)]
pub trait CacheBackend {
    /// Reports whether the backend can be used at all in this environment.
    fn available(&self) -> bool;

    /// Returns the directory recorded for `key`, if any.
    fn lookup(&self, key: &CacheKey) -> Option<Utf8PathBuf>;

    /// Copies a cached entry's contents into `destination`.
    ///
    /// # Errors
    ///
    /// Returns an error when the entry cannot be copied.
    fn materialize(&self, entry: &Utf8Path, destination: &Utf8Path) -> CacheResult<()>;

    /// Records the contents of `source` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error when the entry cannot be written.
    fn store(&self, key: &CacheKey, source: &Utf8Path) -> CacheResult<()>;
}

/// Directory-backed cache laid out like the runner's hosted tool cache.
#[derive(Debug, Clone)]
pub struct ToolCacheDir {
    root: Utf8PathBuf,
}

impl ToolCacheDir {
    /// Uses `root` as the cache directory; it is created on demand.
    #[must_use]
    pub const fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl CacheBackend for ToolCacheDir {
    fn available(&self) -> bool {
        match crate::fs::ensure_dir_exists(&self.root) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    target: LOG_TARGET,
                    root = %self.root,
                    error = %err,
                    "tool cache directory cannot be created"
                );
                false
            }
        }
    }

    fn lookup(&self, key: &CacheKey) -> Option<Utf8PathBuf> {
        match check_cache(&self.root, key) {
            CacheLookupResult::Hit { source_dir } => Some(source_dir),
            CacheLookupResult::Miss => None,
        }
    }

    fn materialize(&self, entry: &Utf8Path, destination: &Utf8Path) -> CacheResult<()> {
        copy_from_cache(entry, destination)
    }

    fn store(&self, key: &CacheKey, source: &Utf8Path) -> CacheResult<()> {
        crate::fs::ensure_dir_exists(&self.root)
            .with_context(|| format!("prepare tool cache {}", self.root))?;
        populate_cache(source, &self.root, key)?;
        debug!(target: LOG_TARGET, key = %key, "stored cache entry");
        Ok(())
    }
}
