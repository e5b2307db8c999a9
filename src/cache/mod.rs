//! Tool cache for previously acquired gitops binaries.
//!
//! Binaries are cached per tool, version and platform so later jobs on the
//! same runner skip the download. The acquisition flow talks to the cache
//! only through [`CacheGateway`], which applies the eligibility policy and
//! double-checks backend bookkeeping against the filesystem.
//!
//! # Cache Location
//!
//! The directory backend resolves its root in the following order:
//!
//! 1. `RUNNER_TOOL_CACHE` environment variable if set
//! 2. `$XDG_CACHE_HOME/gitops-cli/tool-cache` if `XDG_CACHE_HOME` is set
//! 3. `~/.cache/gitops-cli/tool-cache` as fallback
//!
//! # Concurrency
//!
//! No locks are taken. Concurrent jobs writing the same key race, and the
//! last completed population wins.

mod backend;
mod config;
mod gateway;
mod key;
mod operations;

#[cfg(test)]
pub(crate) use backend::MockCacheBackend;
pub use backend::{CacheBackend, ToolCacheDir};
pub use config::{TOOL_CACHE_ENV, resolve_cache_dir};
pub use gateway::{CacheEntry, CacheGateway, is_cache_eligible};
pub use key::{CACHE_TOOL_ID, CacheKey};
pub use operations::{
    CacheLookupResult, check_cache, copy_from_cache, entry_dir, marker_path, populate_cache,
};

pub use crate::error::{CacheError, CacheResult};
