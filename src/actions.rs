//! Publishes step outputs and `PATH` entries through the runner's command
//! files.

use std::fs::OpenOptions;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::{Context, Result};
use tracing::info;
use uuid::Uuid;

use crate::acquire::Acquired;

const LOG_TARGET: &str = "gitops_setup::actions";

/// Variable naming the step output file.
pub const OUTPUT_FILE_ENV: &str = "GITHUB_OUTPUT";
/// Variable naming the `PATH` additions file.
pub const PATH_FILE_ENV: &str = "GITHUB_PATH";

/// Output carrying the installed version.
pub const OUTPUT_VERSION: &str = "gitops-cli-version";
/// Output reporting whether the cache was used.
pub const OUTPUT_CACHE_HIT: &str = "cache-hit";
/// Output carrying the absolute binary path.
pub const OUTPUT_BINARY_PATH: &str = "binary-path";

/// Runner command files. Missing files turn every write into a log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerFiles {
    output: Option<Utf8PathBuf>,
    path: Option<Utf8PathBuf>,
}

impl RunnerFiles {
    /// Uses explicit file paths.
    #[must_use]
    pub const fn new(output: Option<Utf8PathBuf>, path: Option<Utf8PathBuf>) -> Self {
        Self { output, path }
    }

    /// Reads `GITHUB_OUTPUT` and `GITHUB_PATH`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(file_from_env(OUTPUT_FILE_ENV), file_from_env(PATH_FILE_ENV))
    }

    /// Records a step output.
    ///
    /// # Errors
    ///
    /// Returns an error if the output file cannot be appended to.
    pub fn set_output(&self, name: &str, value: &str) -> Result<()> {
        let Some(file) = &self.output else {
            info!(target: LOG_TARGET, name, value, "step output");
            return Ok(());
        };
        append(file, &format_output(name, value))
    }

    /// Prepends `dir` to `PATH` for later steps.
    ///
    /// # Errors
    ///
    /// Returns an error if the path file cannot be appended to.
    pub fn add_path(&self, dir: &Utf8Path) -> Result<()> {
        let Some(file) = &self.path else {
            info!(target: LOG_TARGET, dir = %dir, "add to PATH");
            return Ok(());
        };
        append(file, &format!("{dir}\n"))
    }

    /// Publishes the outputs and `PATH` entry for an acquisition.
    ///
    /// # Errors
    ///
    /// Returns an error if any command file cannot be written.
    pub fn publish(&self, acquired: &Acquired) -> Result<()> {
        self.add_path(&acquired.bin_dir)?;
        self.set_output(OUTPUT_VERSION, acquired.version.as_str())?;
        self.set_output(OUTPUT_CACHE_HIT, if acquired.cache_hit { "true" } else { "false" })?;
        self.set_output(OUTPUT_BINARY_PATH, acquired.binary_path.as_str())
    }
}

fn file_from_env(name: &str) -> Option<Utf8PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(Utf8PathBuf::from)
}

/// Single-line values use `name=value`; anything else the heredoc form.
fn format_output(name: &str, value: &str) -> String {
    if value.contains('\n') || value.contains('\r') {
        let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
        format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
    } else {
        format!("{name}={value}\n")
    }
}

fn append(file: &Utf8Path, text: &str) -> Result<()> {
    let mut handle = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)
        .with_context(|| format!("open runner file {file}"))?;
    handle
        .write_all(text.as_bytes())
        .with_context(|| format!("append to runner file {file}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::ProbedVersion;
    use crate::version::VersionSpec;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn single_line_values_use_plain_form() {
        assert_eq!(format_output("cache-hit", "true"), "cache-hit=true\n");
    }

    #[test]
    fn multi_line_values_use_delimiters() {
        let formatted = format_output("notes", "a\nb");
        let mut lines = formatted.lines();
        let header = lines.next().expect("header");
        let delimiter = header.strip_prefix("notes<<").expect("heredoc header");
        assert_eq!(lines.next(), Some("a"));
        assert_eq!(lines.next(), Some("b"));
        assert_eq!(lines.next(), Some(delimiter));
    }

    #[test]
    fn publish_appends_outputs_and_path() {
        let temp = tempdir().expect("tempdir");
        let root = Utf8Path::from_path(temp.path()).expect("utf8 path");
        let output = root.join("output");
        let path = root.join("path");
        fs::write(&output, "existing=1\n").expect("seed output");
        let files = RunnerFiles::new(Some(output.clone()), Some(path.clone()));
        let acquired = Acquired {
            version: VersionSpec::default(),
            binary_path: "/home/runner/.gitops-cli/bin/gitops".into(),
            bin_dir: "/home/runner/.gitops-cli/bin".into(),
            cache_hit: true,
            probed: ProbedVersion::Reported("2.2.2".to_owned()),
        };

        files.publish(&acquired).expect("publish");

        assert_eq!(
            fs::read_to_string(&output).expect("read output"),
            "existing=1\ngitops-cli-version=2.2.2\ncache-hit=true\nbinary-path=/home/runner/.gitops-cli/bin/gitops\n"
        );
        assert_eq!(
            fs::read_to_string(&path).expect("read path"),
            "/home/runner/.gitops-cli/bin\n"
        );
    }

    #[test]
    fn missing_files_only_log() {
        let files = RunnerFiles::default();
        files.set_output(OUTPUT_CACHE_HIT, "false").expect("log only");
        files.add_path(Utf8Path::new("/opt/bin")).expect("log only");
    }
}
