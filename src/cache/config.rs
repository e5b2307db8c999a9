//! Location of the tool cache.

use camino::Utf8PathBuf;

/// Variable the runner sets to its shared tool cache.
pub const TOOL_CACHE_ENV: &str = "RUNNER_TOOL_CACHE";

const XDG_CACHE_HOME_ENV: &str = "XDG_CACHE_HOME";

/// Path appended to the user cache directories.
const CACHE_SUBDIR: &str = "gitops-cli/tool-cache";

/// Root used when no other location can be determined.
const FALLBACK_ROOT: &str = "/tmp";

/// Picks the tool cache root.
///
/// Candidates, first usable one wins:
///
/// 1. `$RUNNER_TOOL_CACHE`
/// 2. `$XDG_CACHE_HOME/gitops-cli/tool-cache`
/// 3. `~/.cache/gitops-cli/tool-cache`
/// 4. `/tmp/gitops-cli/tool-cache`
///
/// Blank variables and paths that are not valid UTF-8 are skipped.
///
/// # Examples
///
/// ```
/// use setup_gitops_cli::cache::resolve_cache_dir;
///
/// assert!(!resolve_cache_dir().as_str().is_empty());
/// ```
#[must_use]
pub fn resolve_cache_dir() -> Utf8PathBuf {
    let candidates = [
        env_path(TOOL_CACHE_ENV),
        env_path(XDG_CACHE_HOME_ENV).map(|dir| dir.join(CACHE_SUBDIR)),
        dirs::home_dir()
            .and_then(|home| Utf8PathBuf::from_path_buf(home).ok())
            .map(|home| home.join(".cache").join(CACHE_SUBDIR)),
    ];
    candidates
        .into_iter()
        .flatten()
        .next()
        .unwrap_or_else(|| Utf8PathBuf::from(FALLBACK_ROOT).join(CACHE_SUBDIR))
}

fn env_path(name: &str) -> Option<Utf8PathBuf> {
    let raw = std::env::var(name).ok()?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| Utf8PathBuf::from(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use temp_env::with_vars;

    #[rstest]
    #[case::runner_cache_wins(Some("/opt/hostedtoolcache"), Some("/home/runner/.cache"), "/opt/hostedtoolcache")]
    #[case::xdg_when_runner_unset(None, Some("/home/runner/.cache"), "/home/runner/.cache/gitops-cli/tool-cache")]
    #[case::blank_runner_cache_skipped(Some("   "), Some("/srv/cache"), "/srv/cache/gitops-cli/tool-cache")]
    fn picks_first_configured_location(
        #[case] runner: Option<&str>,
        #[case] xdg: Option<&str>,
        #[case] expected: &str,
    ) {
        let result = with_vars(
            [(TOOL_CACHE_ENV, runner), (XDG_CACHE_HOME_ENV, xdg)],
            resolve_cache_dir,
        );
        assert_eq!(result.as_str(), expected);
    }

    #[test]
    fn falls_back_to_home_cache() {
        let result = with_vars(
            [
                (TOOL_CACHE_ENV, None::<&str>),
                (XDG_CACHE_HOME_ENV, None::<&str>),
            ],
            resolve_cache_dir,
        );
        assert!(result.as_str().ends_with(CACHE_SUBDIR));
    }
}
