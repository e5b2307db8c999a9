//! Acquisition flow for the gitops CLI.
//!
//! The flow is strictly sequential: prepare directories, consult the cache
//! when policy allows, verify whatever the cache produced, and otherwise
//! download, install and verify a fresh copy before updating the cache.
//! A cached binary that reports the wrong version is abandoned in favour of
//! a download; a freshly installed one only produces a warning.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::Report;
use tracing::{debug, info, warn};
use url::Url;

use secrecy::SecretString;

use crate::TOOL_NAME;
use crate::cache::{CacheBackend, CacheGateway, CacheKey};
use crate::download::Downloader;
use crate::error::{AcquireError, AcquireErrorKind, AcquireResult};
use crate::http::GitHubClient;
use crate::install::install;
use crate::observability::LOG_TARGET;
use crate::platform::{RawPlatform, VendorPlatform};
use crate::release::{AssetDescriptor, ReleaseIndex};
use crate::retry::{RetryPolicy, retry};
use crate::verify::{ProbedVersion, probe_version};
use crate::version::VersionSpec;

/// Directory the cache stores and restores; the binary lives in `bin/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: Utf8PathBuf,
}

impl InstallLayout {
    /// Lays binaries out beneath `root`.
    ///
    /// # Examples
    /// ```
    /// use setup_gitops_cli::{InstallLayout, RawPlatform};
    ///
    /// let layout = InstallLayout::new("/home/runner/.gitops-cli".into());
    /// let path = layout.binary_path(&RawPlatform::new("win32", "x64").normalize());
    /// assert_eq!(path.as_str(), "/home/runner/.gitops-cli/bin/gitops.exe");
    /// ```
    #[must_use]
    pub const fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    /// Install root, the unit stored in and restored from the cache.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Directory holding the executable.
    #[must_use]
    pub fn bin_dir(&self) -> Utf8PathBuf {
        self.root.join("bin")
    }

    /// Final path of the executable for `platform`.
    #[must_use]
    pub fn binary_path(&self, platform: &VendorPlatform) -> Utf8PathBuf {
        self.bin_dir()
            .join(format!("{TOOL_NAME}{}", platform.extension()))
    }
}

/// What the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireRequest {
    /// Requested version; `None` installs the default and skips the cache.
    pub version: Option<VersionSpec>,
    /// Platform to fetch the binary for.
    pub platform: RawPlatform,
}

/// Collaborator settings for an [`Acquirer`].
#[derive(Debug)]
pub struct AcquireSettings {
    /// Where the binary is installed.
    pub layout: InstallLayout,
    /// Directory for temporary downloads.
    pub scratch_dir: Utf8PathBuf,
    /// GitHub API endpoint.
    pub api_url: Url,
    /// Optional API token.
    pub token: Option<SecretString>,
    /// Retry policy for network operations.
    pub retry: RetryPolicy,
}

/// Outcome of a successful acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquired {
    /// Version that was requested (or defaulted).
    pub version: VersionSpec,
    /// Absolute path of the executable.
    pub binary_path: Utf8PathBuf,
    /// Directory to put on `PATH`.
    pub bin_dir: Utf8PathBuf,
    /// Whether the binary came from the cache.
    pub cache_hit: bool,
    /// Version the binary reported.
    pub probed: ProbedVersion,
}

/// Runs the acquisition flow against a cache backend.
#[derive(Debug)]
pub struct Acquirer<B> {
    cache: CacheGateway<B>,
    client: GitHubClient,
    releases: ReleaseIndex,
    downloader: Downloader,
    layout: InstallLayout,
    retry: RetryPolicy,
}

impl<B: CacheBackend> Acquirer<B> {
    /// Wires the collaborators together.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(cache: CacheGateway<B>, settings: AcquireSettings) -> AcquireResult<Self> {
        let client = GitHubClient::new(settings.token).map_err(|err| {
            AcquireError::new(
                AcquireErrorKind::Other,
                Report::new(err).wrap_err("failed to build HTTP client"),
            )
        })?;
        Ok(Self {
            cache,
            client,
            releases: ReleaseIndex::new(settings.api_url),
            downloader: Downloader::new(settings.scratch_dir),
            layout: settings.layout,
            retry: settings.retry,
        })
    }

    /// Acquires the requested binary.
    ///
    /// # Errors
    ///
    /// Fails when directories cannot be prepared, the release or asset
    /// cannot be resolved, the download fails, or the binary cannot be
    /// placed. Cache problems and version mismatches only log warnings.
    pub async fn acquire(&self, request: &AcquireRequest) -> AcquireResult<Acquired> {
        let version = request.version.clone().unwrap_or_default();
        let platform = request.platform.normalize();
        let binary_path = self.layout.binary_path(&platform);
        info!(
            target: LOG_TARGET,
            version = %version,
            platform = %platform,
            path = %binary_path,
            "acquiring gitops CLI"
        );

        self.prepare_directories()?;
        let key = CacheKey::new(&version, &platform);

        let cached = if self.cache.is_cache_eligible(request.version.as_ref()) {
            self.try_cache(&key, &version, &binary_path).await
        } else {
            None
        };
        if let Some(probed) = cached {
            return Ok(self.finish(version, binary_path, true, probed));
        }

        let asset = AssetDescriptor::resolve(&platform, &version);
        let probed = self
            .download_and_install(&asset, &version, &binary_path)
            .await?;
        self.update_cache(&key);

        Ok(self.finish(version, binary_path, false, probed))
    }

    fn prepare_directories(&self) -> AcquireResult<()> {
        let bin_dir = self.layout.bin_dir();
        crate::fs::ensure_dir_exists(&bin_dir)
            .map_err(|report| AcquireError::new(AcquireErrorKind::Install, report))?;
        crate::fs::ensure_dir_exists(self.downloader.scratch_dir())
            .map_err(|report| AcquireError::new(AcquireErrorKind::Download, report))?;
        Ok(())
    }

    /// Materialises and verifies a cache entry. Returns the probed version
    /// only when it matches the request.
    async fn try_cache(
        &self,
        key: &CacheKey,
        version: &VersionSpec,
        binary_path: &Utf8Path,
    ) -> Option<ProbedVersion> {
        let Some(entry) = self.cache.lookup(key) else {
            debug!(target: LOG_TARGET, key = %key, "no usable cache entry");
            return None;
        };

        if let Err(err) = self.cache.materialize(&entry, self.layout.root()) {
            warn!(
                target: LOG_TARGET,
                key = %key,
                error = %err,
                "cache copy failed, falling back to download"
            );
            return None;
        }
        if let Err(err) = install(None, binary_path) {
            warn!(target: LOG_TARGET, error = %err, "cached binary could not be prepared");
            return None;
        }

        let probed = probe_version(Some(binary_path)).await;
        if probed.matches(version) {
            info!(target: LOG_TARGET, version = %version, "found a cached version");
            Some(probed)
        } else {
            warn!(
                target: LOG_TARGET,
                expected = %version,
                found = %probed,
                "cached binary reports a different version and appears to be corrupted, downloading it again"
            );
            None
        }
    }

    async fn download_and_install(
        &self,
        asset: &AssetDescriptor,
        version: &VersionSpec,
        binary_path: &Utf8Path,
    ) -> AcquireResult<ProbedVersion> {
        let (client, releases, downloader) = (&self.client, &self.releases, &self.downloader);

        let url = retry(self.retry, "resolve release asset", move || {
            releases.resolve_download_url(client, asset)
        })
        .await?;
        let url_ref = &url;
        let temp = retry(self.retry, "download asset", move || {
            downloader.download(client, url_ref)
        })
        .await?;

        if let Err(err) = install(Some(&temp), binary_path) {
            discard_temp(&temp);
            return Err(err.into());
        }

        let probed = probe_version(Some(binary_path)).await;
        if probed.matches(version) {
            info!(target: LOG_TARGET, version = %version, "installed binary reports the requested version");
        } else {
            warn!(
                target: LOG_TARGET,
                expected = %version,
                found = %probed,
                "installed binary reports a different version"
            );
        }
        Ok(probed)
    }

    fn update_cache(&self, key: &CacheKey) {
        match self.cache.store(key, self.layout.root()) {
            Ok(()) => info!(target: LOG_TARGET, key = %key, "updated tool cache"),
            Err(err) => warn!(
                target: LOG_TARGET,
                key = %key,
                error = %err,
                "failed to update tool cache, future runs may download again"
            ),
        }
    }

    fn finish(
        &self,
        version: VersionSpec,
        binary_path: Utf8PathBuf,
        cache_hit: bool,
        probed: ProbedVersion,
    ) -> Acquired {
        Acquired {
            version,
            binary_path,
            bin_dir: self.layout.bin_dir(),
            cache_hit,
            probed,
        }
    }
}

fn discard_temp(path: &Utf8Path) {
    if let Err(err) = std::fs::remove_file(path) {
        debug!(target: LOG_TARGET, path = %path, error = %err, "failed to remove temporary download");
    }
}
