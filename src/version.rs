//! Requested versions of the gitops CLI.

use std::fmt;

/// Version installed when the caller does not request one.
pub const DEFAULT_VERSION: &str = "2.2.2";

/// Substrings that mark a version as a moving target.
const MOVING_TARGET_TOKENS: &[&str] = &["latest", "canary", "action"];

/// A requested release tag.
///
/// Concrete versions such as `2.2.2` may be cached; moving targets such as
/// `latest` resolve to different binaries over time and never are.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionSpec(String);

impl VersionSpec {
    /// Wraps a release tag, trimming surrounding whitespace.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_owned())
    }

    /// Interprets an optional input, treating blank values as unset.
    ///
    /// # Examples
    /// ```
    /// use setup_gitops_cli::VersionSpec;
    ///
    /// assert!(VersionSpec::from_input(Some("  ")).is_none());
    /// assert_eq!(
    ///     VersionSpec::from_input(Some("2.1.0")).map(|v| v.to_string()),
    ///     Some("2.1.0".to_owned()),
    /// );
    /// ```
    #[must_use]
    pub fn from_input(raw: Option<&str>) -> Option<Self> {
        raw.map(str::trim)
            .filter(|value| !value.is_empty())
            .map(Self::new)
    }

    /// The tag as requested.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reports whether the tag names a moving target rather than a fixed
    /// release. Matching is a case-insensitive substring test.
    #[must_use]
    pub fn is_moving_target(&self) -> bool {
        let lowered = self.0.to_ascii_lowercase();
        MOVING_TARGET_TOKENS
            .iter()
            .any(|token| lowered.contains(token))
    }
}

impl Default for VersionSpec {
    fn default() -> Self {
        Self::new(DEFAULT_VERSION)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
