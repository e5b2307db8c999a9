//! Fake binaries, release documents and runtimes for tests.

use std::fs;

use camino::Utf8Path;
use color_eyre::eyre::{Context, Result};
use tokio::runtime::{Builder, Runtime};

/// Shell script that behaves like `gitops --version` for `version`.
///
/// # Examples
/// ```
/// use setup_gitops_cli::test_support::fake_gitops_script;
///
/// assert!(fake_gitops_script("2.1.0").contains("gitops version 2.1.0"));
/// ```
#[must_use]
pub fn fake_gitops_script(version: &str) -> String {
    format!("#!/bin/sh\necho \"gitops version {version}\"\n")
}

/// Writes an executable `/bin/sh` script with the given body to `path`.
///
/// # Panics
///
/// Panics if the script cannot be written or made executable.
#[cfg(unix)]
pub fn write_script(path: &Utf8Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .unwrap_or_else(|err| panic!("create {parent} for fake binary: {err}"));
    }
    let contents = if body.starts_with("#!") {
        body.to_owned()
    } else {
        format!("#!/bin/sh\n{body}")
    };
    fs::write(path, contents).unwrap_or_else(|err| panic!("write fake binary {path}: {err}"));
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .unwrap_or_else(|err| panic!("chmod fake binary {path}: {err}"));
}

/// Release index body publishing `assets` as `(name, url)` pairs.
#[must_use]
pub fn release_json(assets: &[(&str, &str)]) -> String {
    let entries: Vec<_> = assets
        .iter()
        .map(|&(name, url)| serde_json::json!({ "name": name, "url": url }))
        .collect();
    serde_json::json!({ "assets": entries }).to_string()
}

/// Builds a single-threaded Tokio runtime for synchronous tests.
///
/// # Errors
///
/// Returns an error if the runtime cannot be created.
pub fn test_runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create test runtime")
}
