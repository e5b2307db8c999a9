//! Acquires a pinned version of the gitops CLI for CI jobs.
//!
//! The library resolves the release asset for the runner's platform, reuses
//! a previously cached copy when it can prove the copy reports the
//! requested version, and otherwise downloads, installs and verifies a
//! fresh binary before registering it in the tool cache.

mod acquire;
mod actions;
mod bootstrap;
pub mod cache;
mod download;
mod error;
mod fs;
mod http;
mod install;
mod observability;
mod platform;
mod release;
mod retry;
#[doc(hidden)]
pub mod test_support;
mod verify;
mod version;

pub use acquire::{AcquireRequest, AcquireSettings, Acquired, Acquirer, InstallLayout};
pub use actions::{
    OUTPUT_BINARY_PATH, OUTPUT_CACHE_HIT, OUTPUT_FILE_ENV, OUTPUT_VERSION, PATH_FILE_ENV,
    RunnerFiles,
};
pub use bootstrap::run;
pub use download::{DownloadError, Downloader};
pub use error::{
    AcquireError, AcquireErrorKind, AcquireResult, ConfigError, ConfigResult, Result, SetupError,
};
pub use http::{GitHubClient, USER_AGENT};
pub use install::{EXECUTABLE_MODE, InstallError, install};
pub use platform::{RawPlatform, VendorPlatform};
pub use release::{
    AssetDescriptor, DEFAULT_API_URL, RELEASE_OWNER, RELEASE_REPO, ReleaseAsset, ReleaseError,
    ReleaseIndex, ReleaseMetadata,
};
pub use retry::{RETRY_INITIAL_DELAY, RetryPolicy, Transient};
pub use verify::{ProbedVersion, parse_version, probe_version};
pub use version::{DEFAULT_VERSION, VersionSpec};

use camino::Utf8PathBuf;
use color_eyre::eyre::{Context, eyre};
use ortho_config::OrthoConfig;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::ffi::OsString;
use url::Url;

use crate::error::ConfigResult as CfgResult;

/// Executable name published by the upstream project.
pub const TOOL_NAME: &str = "gitops";

/// Directory under the home directory that holds the installed binary.
pub const DEFAULT_INSTALL_DIR: &str = ".gitops-cli";

/// Variable carrying the runner's per-job scratch directory.
const RUNNER_TEMP_ENV: &str = "RUNNER_TEMP";

/// The runner exports hyphenated inputs verbatim, so `no-cache` arrives
/// under a name no derive-generated key matches.
const HYPHENATED_NO_CACHE_ENV: &str = "INPUT_NO-CACHE";

/// Inputs read verbatim: the environment provider would turn a tag such as
/// `1.0` into a number and lose its spelling.
const VERSION_INPUT_ENV: &str = "INPUT_VERSION";
const TOKEN_INPUT_ENV: &str = "INPUT_TOKEN";

/// Token variables consulted when no token input is supplied.
const TOKEN_FALLBACK_ENVS: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];

/// Step inputs, read from the runner's `INPUT_<NAME>` environment variables.
///
/// Blank values count as unset, matching how the runner exports inputs
/// that were declared but not provided.
///
/// # Examples
/// ```
/// use setup_gitops_cli::SetupCfg;
///
/// let cfg = SetupCfg::default();
/// assert!(cfg.version.is_none());
/// assert!(!cfg.no_cache().expect("unset is false"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, OrthoConfig, Default)]
#[ortho_config(prefix = "INPUT")]
pub struct SetupCfg {
    /// Release tag to install; the pinned default when unset.
    #[ortho_config(cli_long = "gitops-version")]
    #[serde(default, deserialize_with = "input_text")]
    pub version: Option<String>,
    /// Runtime operating system override (`linux`, `darwin`, `win32`).
    #[serde(default, deserialize_with = "input_text")]
    pub os: Option<String>,
    /// Runtime architecture override (`x64`, `arm64`).
    #[serde(default, deserialize_with = "input_text")]
    pub arch: Option<String>,
    /// Boolean input disabling the tool cache.
    #[serde(default, deserialize_with = "input_text")]
    pub no_cache: Option<String>,
    /// Token used for GitHub API requests.
    #[serde(default, deserialize_with = "input_text")]
    pub token: Option<String>,
    /// Number of retries for transient network failures.
    #[serde(default, deserialize_with = "input_text")]
    pub retries: Option<String>,
    /// Install root; the binary lands in its `bin/` directory.
    pub install_dir: Option<Utf8PathBuf>,
    /// Tool cache root.
    pub tool_cache_dir: Option<Utf8PathBuf>,
    /// Directory for temporary downloads.
    pub scratch_dir: Option<Utf8PathBuf>,
    /// GitHub API endpoint.
    #[serde(default, deserialize_with = "input_text")]
    pub api_url: Option<String>,
}

impl SetupCfg {
    /// Loads configuration from environment variables without parsing CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns an error when the environment cannot be merged into the
    /// configuration.
    pub fn load() -> CfgResult<Self> {
        let args = [OsString::from("setup-gitops-cli")];
        let mut cfg = Self::load_from_iter(args).map_err(|err| ConfigError::from(eyre!(err)))?;
        if let Ok(raw) = std::env::var(VERSION_INPUT_ENV) {
            cfg.version = Some(raw);
        }
        if let Ok(raw) = std::env::var(TOKEN_INPUT_ENV) {
            cfg.token = Some(raw);
        }
        if non_blank(cfg.no_cache.as_deref()).is_none() {
            cfg.no_cache = std::env::var(HYPHENATED_NO_CACHE_ENV).ok();
        }
        Ok(cfg)
    }

    /// Whether the caller disabled the cache.
    ///
    /// # Errors
    ///
    /// Returns an error when the input is not a YAML 1.2 core boolean.
    pub fn no_cache(&self) -> CfgResult<bool> {
        non_blank(self.no_cache.as_deref()).map_or(Ok(false), parse_boolean_input)
    }

    /// Retry budget for network operations.
    ///
    /// # Errors
    ///
    /// Returns an error when the input is not a non-negative integer.
    pub fn retry_policy(&self) -> CfgResult<RetryPolicy> {
        let Some(raw) = non_blank(self.retries.as_deref()) else {
            return Ok(RetryPolicy::none());
        };
        let retries = raw
            .parse::<u32>()
            .with_context(|| format!("INPUT_RETRIES must be a non-negative integer, got {raw:?}"))?;
        Ok(RetryPolicy::new(retries, RETRY_INITIAL_DELAY))
    }

    /// The version and platform the caller asked for.
    #[must_use]
    pub fn to_request(&self) -> AcquireRequest {
        AcquireRequest {
            version: VersionSpec::from_input(self.version.as_deref()),
            platform: RawPlatform::current()
                .with_overrides(non_blank(self.os.as_deref()), non_blank(self.arch.as_deref())),
        }
    }

    /// Collaborator settings derived from the inputs and runner environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a directory cannot be resolved, the API URL is
    /// malformed, or the retry input is invalid.
    pub fn to_settings(&self) -> CfgResult<AcquireSettings> {
        let api_url = non_blank(self.api_url.as_deref()).unwrap_or(DEFAULT_API_URL);
        Ok(AcquireSettings {
            layout: InstallLayout::new(self.install_root()?),
            scratch_dir: self.scratch_root()?,
            api_url: Url::parse(api_url).with_context(|| format!("invalid API URL {api_url:?}"))?,
            token: self.token(),
            retry: self.retry_policy()?,
        })
    }

    /// Tool cache root, falling back to the runner and XDG locations.
    #[must_use]
    pub fn tool_cache_root(&self) -> Utf8PathBuf {
        non_blank_path(self.tool_cache_dir.as_ref()).unwrap_or_else(cache::resolve_cache_dir)
    }

    fn install_root(&self) -> CfgResult<Utf8PathBuf> {
        if let Some(dir) = non_blank_path(self.install_dir.as_ref()) {
            return Ok(dir);
        }
        let home = dirs::home_dir().ok_or_else(|| eyre!("cannot determine the home directory"))?;
        let home_utf8 = Utf8PathBuf::from_path_buf(home)
            .map_err(|path| eyre!("home directory is not valid UTF-8: {}", path.display()))?;
        Ok(home_utf8.join(DEFAULT_INSTALL_DIR))
    }

    fn scratch_root(&self) -> CfgResult<Utf8PathBuf> {
        if let Some(dir) = non_blank_path(self.scratch_dir.as_ref()) {
            return Ok(dir);
        }
        if let Some(dir) = std::env::var(RUNNER_TEMP_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            return Ok(Utf8PathBuf::from(dir));
        }
        Utf8PathBuf::from_path_buf(std::env::temp_dir())
            .map_err(|path| eyre!("temp directory is not valid UTF-8: {}", path.display()).into())
    }

    fn token(&self) -> Option<SecretString> {
        non_blank(self.token.as_deref())
            .map(str::to_owned)
            .or_else(|| {
                TOKEN_FALLBACK_ENVS.iter().find_map(|name| {
                    std::env::var(name)
                        .ok()
                        .filter(|value| !value.trim().is_empty())
                })
            })
            .map(SecretString::from)
    }
}

/// Parses a boolean input the way the runner's toolkit does: only the
/// YAML 1.2 core spellings are accepted.
///
/// # Errors
///
/// Returns an error for any other spelling.
///
/// # Examples
/// ```
/// use setup_gitops_cli::parse_boolean_input;
///
/// assert!(parse_boolean_input("TRUE").expect("valid"));
/// assert!(!parse_boolean_input("False").expect("valid"));
/// assert!(parse_boolean_input("yes").is_err());
/// ```
pub fn parse_boolean_input(raw: &str) -> CfgResult<bool> {
    match raw.trim() {
        "true" | "True" | "TRUE" => Ok(true),
        "false" | "False" | "FALSE" => Ok(false),
        other => Err(ConfigError::from(eyre!(
            "input does not meet YAML 1.2 \"Core Schema\" specification: {other:?}; \
             support boolean input list: `true | True | TRUE | false | False | FALSE`"
        ))),
    }
}

/// Environment values arrive pre-parsed, so `true` or `2` may not be strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum InputValue {
    Text(String),
    Flag(bool),
    Integer(i64),
    Float(f64),
}

fn input_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<InputValue>::deserialize(deserializer)?;
    Ok(value.map(|input| match input {
        InputValue::Text(text) => text,
        InputValue::Flag(flag) => flag.to_string(),
        InputValue::Integer(number) => number.to_string(),
        InputValue::Float(number) => number.to_string(),
    }))
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

fn non_blank_path(raw: Option<&Utf8PathBuf>) -> Option<Utf8PathBuf> {
    raw.filter(|path| !path.as_str().trim().is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("true", true)]
    #[case("True", true)]
    #[case(" TRUE ", true)]
    #[case("false", false)]
    #[case("FALSE", false)]
    fn accepts_core_schema_booleans(#[case] raw: &str, #[case] expected: bool) {
        assert_eq!(parse_boolean_input(raw).expect("valid boolean"), expected);
    }

    #[rstest]
    #[case("yes")]
    #[case("1")]
    #[case("tRuE")]
    fn rejects_other_spellings(#[case] raw: &str) {
        let err = parse_boolean_input(raw).expect_err("invalid boolean");
        assert!(err.to_string().contains("Core Schema"));
    }

    #[test]
    fn blank_inputs_fall_back_to_defaults() {
        let cfg = SetupCfg {
            version: Some(String::new()),
            no_cache: Some("  ".to_owned()),
            retries: Some(String::new()),
            os: Some(String::new()),
            ..SetupCfg::default()
        };

        assert!(cfg.to_request().version.is_none());
        assert_eq!(cfg.to_request().platform, RawPlatform::current());
        assert!(!cfg.no_cache().expect("blank is false"));
        assert_eq!(cfg.retry_policy().expect("blank is none"), RetryPolicy::none());
    }

    #[test]
    fn pre_parsed_inputs_are_read_as_text() {
        let cfg: SetupCfg = serde_json::from_value(serde_json::json!({
            "version": "2.1.0",
            "no_cache": true,
            "retries": 2,
        }))
        .expect("typed values deserialize");

        assert_eq!(cfg.no_cache.as_deref(), Some("true"));
        assert!(cfg.no_cache().expect("boolean"));
        assert_eq!(cfg.retry_policy().expect("count").retries(), 2);
    }

    #[test]
    fn invalid_retries_are_rejected() {
        let cfg = SetupCfg {
            retries: Some("-1".to_owned()),
            ..SetupCfg::default()
        };
        assert!(cfg.retry_policy().is_err());
    }

    #[test]
    fn explicit_paths_are_used_verbatim() {
        let cfg = SetupCfg {
            install_dir: Some("/opt/gitops".into()),
            scratch_dir: Some("/var/tmp/gitops".into()),
            api_url: Some("https://ghe.example.com/api/v3".to_owned()),
            ..SetupCfg::default()
        };

        let settings = cfg.to_settings().expect("settings");
        assert_eq!(settings.layout.root().as_str(), "/opt/gitops");
        assert_eq!(settings.scratch_dir.as_str(), "/var/tmp/gitops");
        assert_eq!(settings.api_url.as_str(), "https://ghe.example.com/api/v3");
    }

    #[test]
    fn malformed_api_url_is_a_config_error() {
        let cfg = SetupCfg {
            install_dir: Some("/opt/gitops".into()),
            scratch_dir: Some("/var/tmp/gitops".into()),
            api_url: Some("not a url".to_owned()),
            ..SetupCfg::default()
        };
        assert!(cfg.to_settings().is_err());
    }
}
