//! Probes a gitops binary for the version it reports.
//!
//! The probe never fails: a binary that cannot be spawned, dies on a signal,
//! or prints nothing resembling `MAJOR.MINOR.PATCH` yields
//! [`ProbedVersion::Unknown`], which the caller treats as a mismatch.

use std::borrow::Cow;
use std::fmt;
use std::process::Stdio;
use std::sync::LazyLock;

use camino::Utf8Path;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::TOOL_NAME;
use crate::version::VersionSpec;

const LOG_TARGET: &str = "gitops_setup::verify";
const VERSION_FLAG: &str = "--version";
const OUTPUT_CHAR_LIMIT: usize = 512;
const TRUNCATION_SUFFIX: &str = "… [truncated]";

static SEMVER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d+\.\d+\.\d+)").ok());

/// Version reported by a binary, if any could be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbedVersion {
    /// The first `MAJOR.MINOR.PATCH` found in the probe output.
    Reported(String),
    /// Nothing usable came back from the probe.
    Unknown,
}

impl ProbedVersion {
    /// Compares the probed version with a requested one by exact string
    /// equality. `Unknown` never matches.
    #[must_use]
    pub fn matches(&self, expected: &VersionSpec) -> bool {
        match self {
            Self::Reported(found) => found == expected.as_str(),
            Self::Unknown => false,
        }
    }
}

impl fmt::Display for ProbedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reported(found) => f.write_str(found),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Extracts the first `MAJOR.MINOR.PATCH` substring from probe output.
///
/// # Examples
/// ```
/// use setup_gitops_cli::{ProbedVersion, parse_version};
///
/// assert_eq!(
///     parse_version("gitops version 2.2.2\n"),
///     ProbedVersion::Reported("2.2.2".to_owned()),
/// );
/// assert_eq!(parse_version("gitops"), ProbedVersion::Unknown);
/// ```
#[must_use]
pub fn parse_version(output: &str) -> ProbedVersion {
    SEMVER
        .as_ref()
        .and_then(|pattern| pattern.find(output))
        .map_or(ProbedVersion::Unknown, |found| {
            ProbedVersion::Reported(found.as_str().to_owned())
        })
}

/// Runs `<binary> --version` and parses what it prints.
///
/// Without a path the bare executable name is resolved through `PATH`.
/// A non-zero exit status is not significant; only termination by a signal
/// discards the output.
pub async fn probe_version(binary: Option<&Utf8Path>) -> ProbedVersion {
    let program = binary.map_or(TOOL_NAME, Utf8Path::as_str);
    info!(target: LOG_TARGET, binary = %program, "checking the version of the binary");

    let output = match Command::new(program)
        .arg(VERSION_FLAG)
        .stdin(Stdio::null())
        .output()
        .await
    {
        Ok(output) => output,
        Err(err) => {
            warn!(
                target: LOG_TARGET,
                binary = %program,
                error = %err,
                "failed to run the version probe"
            );
            return ProbedVersion::Unknown;
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    debug!(
        target: LOG_TARGET,
        binary = %program,
        status = %output.status,
        stdout = %truncate_output(Cow::Borrowed(stdout.as_ref())),
        stderr = %truncate_output(String::from_utf8_lossy(&output.stderr)),
        "version probe finished"
    );

    if output.status.code().is_none() {
        warn!(
            target: LOG_TARGET,
            binary = %program,
            status = %output.status,
            "version probe terminated abnormally"
        );
        return ProbedVersion::Unknown;
    }

    parse_version(&stdout)
}

fn truncate_output(text: Cow<'_, str>) -> String {
    let mut out = String::with_capacity(OUTPUT_CHAR_LIMIT + TRUNCATION_SUFFIX.len());
    let mut chars = text.chars();
    for _ in 0..OUTPUT_CHAR_LIMIT {
        match chars.next() {
            Some(ch) => out.push(ch),
            None => return text.into_owned(),
        }
    }

    if chars.next().is_none() {
        return text.into_owned();
    }

    out.push_str(TRUNCATION_SUFFIX);
    out
}
