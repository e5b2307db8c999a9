//! Validates reading step inputs from the runner environment.

use rstest::rstest;
use serial_test::serial;
use setup_gitops_cli::{RawPlatform, RetryPolicy, SetupCfg};
use temp_env::with_vars;

const INPUT_VARS: &[&str] = &[
    "INPUT_VERSION",
    "INPUT_OS",
    "INPUT_ARCH",
    "INPUT_NO_CACHE",
    "INPUT_NO-CACHE",
    "INPUT_TOKEN",
    "INPUT_RETRIES",
    "INPUT_INSTALL_DIR",
    "INPUT_TOOL_CACHE_DIR",
    "INPUT_SCRATCH_DIR",
    "INPUT_API_URL",
];

/// Runs `action` with every input cleared except `overrides`.
fn with_inputs<R>(overrides: &[(&str, &str)], action: impl FnOnce() -> R) -> R {
    let vars: Vec<(&str, Option<&str>)> = INPUT_VARS
        .iter()
        .map(|&name| {
            let value = overrides
                .iter()
                .find_map(|&(key, value)| (key == name).then_some(value));
            (name, value)
        })
        .collect();
    with_vars(vars, action)
}

#[rstest]
#[serial]
fn load_reads_runner_inputs() -> color_eyre::Result<()> {
    let cfg = with_inputs(
        &[
            ("INPUT_VERSION", "2.1.0"),
            ("INPUT_OS", "win32"),
            ("INPUT_ARCH", "x64"),
            ("INPUT_RETRIES", "2"),
        ],
        SetupCfg::load,
    )?;

    let request = cfg.to_request();
    assert_eq!(
        request.version.as_ref().map(ToString::to_string).as_deref(),
        Some("2.1.0")
    );
    assert_eq!(request.platform, RawPlatform::new("win32", "x64"));
    assert_eq!(cfg.retry_policy()?.retries(), 2);
    Ok(())
}

#[rstest]
#[serial]
fn unset_inputs_leave_version_unset() -> color_eyre::Result<()> {
    let cfg = with_inputs(&[], SetupCfg::load)?;

    assert!(cfg.to_request().version.is_none());
    assert!(!cfg.no_cache()?);
    assert_eq!(cfg.retry_policy()?, RetryPolicy::none());
    Ok(())
}

#[rstest]
#[case::hyphenated("INPUT_NO-CACHE", "true", true)]
#[case::underscored("INPUT_NO_CACHE", "TRUE", true)]
#[case::explicit_false("INPUT_NO-CACHE", "false", false)]
#[serial]
fn no_cache_accepts_both_spellings(
    #[case] name: &str,
    #[case] value: &str,
    #[case] expected: bool,
) -> color_eyre::Result<()> {
    let cfg = with_inputs(&[(name, value)], SetupCfg::load)?;
    assert_eq!(cfg.no_cache()?, expected);
    Ok(())
}

#[rstest]
#[serial]
fn no_cache_rejects_non_boolean_values() -> color_eyre::Result<()> {
    let cfg = with_inputs(&[("INPUT_NO-CACHE", "yes")], SetupCfg::load)?;
    assert!(cfg.no_cache().is_err());
    Ok(())
}

#[rstest]
#[serial]
fn tool_cache_input_overrides_runner_cache() -> color_eyre::Result<()> {
    let cfg = with_inputs(&[("INPUT_TOOL_CACHE_DIR", "/srv/tool-cache")], SetupCfg::load)?;
    assert_eq!(cfg.tool_cache_root().as_str(), "/srv/tool-cache");
    Ok(())
}

#[rstest]
#[serial]
fn scratch_dir_defaults_to_runner_temp() -> color_eyre::Result<()> {
    let settings = with_vars(
        [
            ("RUNNER_TEMP", Some("/home/runner/work/_temp")),
            ("INPUT_SCRATCH_DIR", None),
            ("INPUT_INSTALL_DIR", Some("/opt/gitops")),
        ],
        || SetupCfg::load()?.to_settings(),
    )?;
    assert_eq!(settings.scratch_dir.as_str(), "/home/runner/work/_temp");
    Ok(())
}

#[rstest]
#[case::trailing_zero("1.0")]
#[case::two_digit_minor("2.10")]
#[case::leading_zero("007")]
#[serial]
fn numeric_looking_tags_keep_their_spelling(#[case] tag: &str) -> color_eyre::Result<()> {
    let cfg = with_inputs(&[("INPUT_VERSION", tag)], SetupCfg::load)?;

    assert_eq!(cfg.version.as_deref(), Some(tag));
    assert_eq!(
        cfg.to_request().version.as_ref().map(ToString::to_string).as_deref(),
        Some(tag)
    );
    Ok(())
}
