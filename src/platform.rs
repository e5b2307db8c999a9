//! Maps runtime platform identifiers onto the vocabulary used by release
//! asset names.
//!
//! Runners describe hosts with `win32`/`darwin`/`linux` and `x64`/`arm64`,
//! while the published assets use `windows`/`macos`/`ubuntu` and `amd64`.
//! Normalisation is table driven: identifiers without an entry pass through
//! untouched so new upstream targets need no code change.

use std::fmt;

/// Operating system identifiers that differ between runtime and vendor.
const OS_TABLE: &[(&str, &str)] = &[("win32", "windows"), ("darwin", "macos"), ("linux", "ubuntu")];

/// Architecture identifiers that differ between runtime and vendor.
const ARCH_TABLE: &[(&str, &str)] = &[("x64", "amd64")];

/// Executable suffixes keyed by runtime operating system.
const EXTENSION_TABLE: &[(&str, &str)] = &[("win32", ".exe")];

/// Host identifiers from `std::env::consts` translated to runtime names.
const HOST_OS_TABLE: &[(&str, &str)] = &[("windows", "win32"), ("macos", "darwin")];
const HOST_ARCH_TABLE: &[(&str, &str)] = &[("x86_64", "x64"), ("aarch64", "arm64"), ("x86", "ia32")];

fn lookup<'a>(table: &[(&str, &'a str)], key: &str) -> Option<&'a str> {
    table
        .iter()
        .find_map(|&(from, to)| (from == key).then_some(to))
}

/// Platform identifiers in the runtime's vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawPlatform {
    os: String,
    arch: String,
}

impl RawPlatform {
    /// Builds a raw platform from explicit identifiers.
    ///
    /// # Examples
    /// ```
    /// use setup_gitops_cli::RawPlatform;
    ///
    /// let raw = RawPlatform::new("win32", "x64");
    /// assert_eq!(raw.normalize().to_string(), "windows-amd64");
    /// ```
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Describes the host this process runs on.
    #[must_use]
    pub fn current() -> Self {
        let os = std::env::consts::OS;
        let arch = std::env::consts::ARCH;
        Self::new(
            lookup(HOST_OS_TABLE, os).unwrap_or(os),
            lookup(HOST_ARCH_TABLE, arch).unwrap_or(arch),
        )
    }

    /// Replaces the host identifiers with caller overrides when present.
    #[must_use]
    pub fn with_overrides(self, os: Option<&str>, arch: Option<&str>) -> Self {
        Self {
            os: os.map_or(self.os, str::to_owned),
            arch: arch.map_or(self.arch, str::to_owned),
        }
    }

    /// Runtime operating system identifier.
    #[must_use]
    pub fn os(&self) -> &str {
        &self.os
    }

    /// Runtime architecture identifier.
    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Translates the identifiers into the vendor's naming scheme.
    #[must_use]
    pub fn normalize(&self) -> VendorPlatform {
        VendorPlatform {
            os: lookup(OS_TABLE, &self.os).unwrap_or(&self.os).to_owned(),
            arch: lookup(ARCH_TABLE, &self.arch)
                .unwrap_or(&self.arch)
                .to_owned(),
            extension: lookup(EXTENSION_TABLE, &self.os).unwrap_or_default(),
        }
    }
}

/// Platform identifiers in the vendor's vocabulary plus the executable suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VendorPlatform {
    os: String,
    arch: String,
    extension: &'static str,
}

impl VendorPlatform {
    /// Vendor operating system name, e.g. `ubuntu`.
    #[must_use]
    pub fn os(&self) -> &str {
        &self.os
    }

    /// Vendor architecture name, e.g. `amd64`.
    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Executable suffix including the dot, or an empty string.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        self.extension
    }
}

impl fmt::Display for VendorPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}
