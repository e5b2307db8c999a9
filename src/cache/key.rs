//! Identity of a cache entry.

use std::fmt;

use crate::platform::VendorPlatform;
use crate::version::VersionSpec;

/// Tool identifier under which binaries are cached.
pub const CACHE_TOOL_ID: &str = "gitops-cli";

/// Tool, version and platform identifying one cached binary.
///
/// Keys compare by exact equality of all three parts; there is no range
/// or prefix matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    tool: String,
    version: String,
    platform: String,
}

impl CacheKey {
    /// Keys the gitops CLI at `version` for `platform`.
    ///
    /// # Examples
    /// ```
    /// use setup_gitops_cli::{RawPlatform, VersionSpec, cache::CacheKey};
    ///
    /// let key = CacheKey::new(&VersionSpec::default(), &RawPlatform::new("linux", "x64").normalize());
    /// assert_eq!(key.to_string(), "gitops-cli 2.2.2 (ubuntu-amd64)");
    /// ```
    #[must_use]
    pub fn new(version: &VersionSpec, platform: &VendorPlatform) -> Self {
        Self {
            tool: CACHE_TOOL_ID.to_owned(),
            version: version.as_str().to_owned(),
            platform: platform.to_string(),
        }
    }

    /// Tool identifier.
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Version component.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Platform component, `os-arch` in vendor terms.
    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.tool, self.version, self.platform)
    }
}
