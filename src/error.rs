//! Domain error types for acquiring the gitops CLI.

use color_eyre::Report;
use thiserror::Error;

use crate::download::DownloadError;
use crate::install::InstallError;
use crate::release::ReleaseError;

/// Result alias for operations that may return a [`SetupError`].
pub type Result<T> = std::result::Result<T, SetupError>;

/// Result alias for acquisition fallible operations.
pub type AcquireResult<T> = std::result::Result<T, AcquireError>;

/// Result alias for configuration fallible operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result alias for cache backend fallible operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Top-level error exposed by the crate.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Indicates the binary could not be acquired.
    #[error("acquiring the gitops CLI failed")]
    Acquire(#[from] AcquireError),
    /// Indicates configuration parsing failed.
    #[error("configuration parsing failed")]
    Config(#[from] ConfigError),
}

/// Categorises fatal acquisition failures so callers can branch on
/// structured errors.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum AcquireErrorKind {
    /// Represents errors without a more specific semantic meaning.
    #[default]
    Other,
    /// The release index could not be fetched or decoded.
    ReleaseIndex,
    /// The release exists but publishes no asset for the platform.
    AssetNotFound,
    /// The asset transfer failed or was incomplete.
    Download,
    /// The temporary download path was already taken.
    DownloadCollision,
    /// The binary could not be placed at its destination.
    Install,
}

/// Captures acquisition-specific failures.
#[derive(Debug, Error)]
#[error("{report}")]
pub struct AcquireError {
    kind: AcquireErrorKind,
    #[source]
    report: Report,
}

impl AcquireError {
    /// Constructs a new acquisition error with the provided kind and
    /// diagnostic report.
    #[must_use]
    pub const fn new(kind: AcquireErrorKind, report: Report) -> Self {
        Self { kind, report }
    }

    /// Returns the semantic category for this failure.
    #[must_use]
    pub const fn kind(&self) -> AcquireErrorKind {
        self.kind
    }

    /// Extracts the underlying diagnostic report.
    #[must_use]
    pub fn into_report(self) -> Report {
        self.report
    }
}

impl From<Report> for AcquireError {
    fn from(report: Report) -> Self {
        Self::new(AcquireErrorKind::Other, report)
    }
}

impl From<ReleaseError> for AcquireError {
    fn from(err: ReleaseError) -> Self {
        let kind = match err {
            ReleaseError::AssetNotFound { .. } => AcquireErrorKind::AssetNotFound,
            ReleaseError::InvalidBaseUrl { .. }
            | ReleaseError::Transport { .. }
            | ReleaseError::Status { .. }
            | ReleaseError::Decode { .. } => AcquireErrorKind::ReleaseIndex,
        };
        Self::new(kind, Report::new(err))
    }
}

impl From<DownloadError> for AcquireError {
    fn from(err: DownloadError) -> Self {
        let kind = match err {
            DownloadError::Collision { .. } => AcquireErrorKind::DownloadCollision,
            DownloadError::Transport { .. }
            | DownloadError::Status { .. }
            | DownloadError::Truncated { .. }
            | DownloadError::Io { .. } => AcquireErrorKind::Download,
        };
        Self::new(kind, Report::new(err))
    }
}

impl From<InstallError> for AcquireError {
    fn from(err: InstallError) -> Self {
        Self::new(AcquireErrorKind::Install, Report::new(err))
    }
}

impl From<ConfigError> for AcquireError {
    fn from(err: ConfigError) -> Self {
        let ConfigError(report) = err;
        Self::new(AcquireErrorKind::Other, report)
    }
}

/// Captures configuration failures.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ConfigError(#[from] Report);

/// Captures cache backend failures. These never abort an acquisition.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct CacheError(#[from] Report);
