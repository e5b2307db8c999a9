//! Cache policy layered over a [`CacheBackend`].

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use super::{CacheBackend, CacheKey};
use crate::error::CacheResult;
use crate::version::VersionSpec;

const LOG_TARGET: &str = "gitops_setup::cache";

/// A cache entry whose directory was confirmed to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    path: Utf8PathBuf,
}

impl CacheEntry {
    /// Directory holding the cached files.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Decides whether the cache may be consulted for a request.
///
/// Rules apply in order: an explicit disable wins; an unset version or a
/// moving target is never cached; otherwise the backend must be available.
/// The backend is only probed when the first two rules pass.
pub fn is_cache_eligible<B>(
    requested: Option<&VersionSpec>,
    explicit_disable: bool,
    backend: &B,
) -> bool
where
    B: CacheBackend + ?Sized,
{
    if explicit_disable {
        debug!(target: LOG_TARGET, "cache disabled by caller");
        return false;
    }

    let Some(version) = requested else {
        debug!(target: LOG_TARGET, "no version requested, cache not consulted");
        return false;
    };

    if version.is_moving_target() {
        debug!(target: LOG_TARGET, version = %version, "moving-target version, cache not consulted");
        return false;
    }

    if !backend.available() {
        warn!(target: LOG_TARGET, "tool cache is not available");
        return false;
    }
    true
}

/// Applies the cache policy to a backend.
#[derive(Debug)]
pub struct CacheGateway<B> {
    backend: B,
    disabled: bool,
}

impl<B: CacheBackend> CacheGateway<B> {
    /// Wraps `backend`; `disabled` mirrors an explicit caller opt-out.
    #[must_use]
    pub const fn new(backend: B, disabled: bool) -> Self {
        Self { backend, disabled }
    }

    /// See [`is_cache_eligible`].
    #[must_use]
    pub fn is_cache_eligible(&self, requested: Option<&VersionSpec>) -> bool {
        is_cache_eligible(requested, self.disabled, &self.backend)
    }

    /// Looks `key` up and confirms the recorded directory still exists.
    ///
    /// A recorded entry that is missing on disk is logged and treated as a
    /// miss.
    #[must_use]
    pub fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        let path = self.backend.lookup(key)?;
        if path.is_dir() {
            return Some(CacheEntry { path });
        }
        warn!(
            target: LOG_TARGET,
            key = %key,
            path = %path,
            "cached entry is recorded but missing on disk"
        );
        None
    }

    /// Copies `entry` into `destination`.
    ///
    /// # Errors
    ///
    /// Propagates backend copy failures.
    pub fn materialize(&self, entry: &CacheEntry, destination: &Utf8Path) -> CacheResult<()> {
        self.backend.materialize(entry.path(), destination)
    }

    /// Records `source` under `key`.
    ///
    /// # Errors
    ///
    /// Propagates backend write failures.
    pub fn store(&self, key: &CacheKey, source: &Utf8Path) -> CacheResult<()> {
        self.backend.store(key, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MockCacheBackend;
    use crate::platform::RawPlatform;
    use crate::test_support::capture_warn_logs;
    use rstest::rstest;
    use tempfile::tempdir;

    fn key() -> CacheKey {
        CacheKey::new(
            &VersionSpec::default(),
            &RawPlatform::new("linux", "x64").normalize(),
        )
    }

    #[rstest]
    #[case::disabled(Some("2.2.2"), true)]
    #[case::unset(None, false)]
    #[case::latest(Some("latest"), false)]
    #[case::canary_mixed_case(Some("CaNaRy"), false)]
    #[case::action(Some("my-action-build"), false)]
    fn ineligible_requests_never_touch_backend(
        #[case] version: Option<&str>,
        #[case] disabled: bool,
    ) {
        let mut backend = MockCacheBackend::new();
        backend.expect_available().never();
        let requested = version.map(VersionSpec::new);

        assert!(!is_cache_eligible(requested.as_ref(), disabled, &backend));
    }

    #[test]
    fn unavailable_backend_is_ineligible_with_warning() {
        let mut backend = MockCacheBackend::new();
        backend.expect_available().times(1).return_const(false);

        let (logs, eligible) = capture_warn_logs(|| {
            is_cache_eligible(Some(&VersionSpec::default()), false, &backend)
        });

        assert!(!eligible);
        assert!(logs.iter().any(|line| line.contains("not available")));
    }

    #[test]
    fn concrete_version_with_available_backend_is_eligible() {
        let mut backend = MockCacheBackend::new();
        backend.expect_available().times(1).return_const(true);
        let gateway = CacheGateway::new(backend, false);

        assert!(gateway.is_cache_eligible(Some(&VersionSpec::new("2.1.0"))));
    }

    #[test]
    fn entry_missing_on_disk_is_a_miss() {
        let temp = tempdir().expect("tempdir");
        let vanished = Utf8Path::from_path(temp.path())
            .expect("utf8 path")
            .join("gitops-cli/2.2.2/ubuntu-amd64");
        let mut backend = MockCacheBackend::new();
        backend
            .expect_lookup()
            .times(1)
            .return_const(Some(vanished));
        let gateway = CacheGateway::new(backend, false);

        let (logs, entry) = capture_warn_logs(|| gateway.lookup(&key()));

        assert!(entry.is_none());
        assert!(logs.iter().any(|line| line.contains("missing on disk")));
    }

    #[test]
    fn existing_entry_is_a_hit() {
        let temp = tempdir().expect("tempdir");
        let present = Utf8Path::from_path(temp.path())
            .expect("utf8 path")
            .to_path_buf();
        let mut backend = MockCacheBackend::new();
        backend
            .expect_lookup()
            .times(1)
            .return_const(Some(present.clone()));
        let gateway = CacheGateway::new(backend, false);

        let entry = gateway.lookup(&key()).expect("hit");
        assert_eq!(entry.path(), present);
    }
}
