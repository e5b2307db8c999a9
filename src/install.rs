//! Places a downloaded binary at its final path and makes it executable.
//!
//! Placement prefers an atomic rename. When that fails (typically `EXDEV`
//! because the scratch directory lives on another filesystem) the file is
//! copied and the temporary source removed on a best-effort basis.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "gitops_setup::install";

/// Mode applied to installed binaries: `rwxr-xr-x`.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Failures that prevent a binary from being placed.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Both the rename and the copy fallback failed.
    #[error("failed to copy {source_path} to {destination}")]
    Copy {
        /// Temporary file that was being installed.
        source_path: Utf8PathBuf,
        /// Final binary path.
        destination: Utf8PathBuf,
        /// Underlying copy error.
        #[source]
        source: io::Error,
    },
}

/// Installs `source` at `destination` and normalises its permissions.
///
/// With `None` the binary is assumed to be in place already (for example
/// after a cache materialisation) and only permissions are adjusted.
/// Permission failures are logged, not returned.
///
/// # Errors
///
/// Returns [`InstallError::Copy`] when the file could be neither renamed
/// nor copied.
pub fn install(source: Option<&Utf8Path>, destination: &Utf8Path) -> Result<(), InstallError> {
    install_with(source, destination, |from, to| fs::rename(from, to))
}

pub(crate) fn install_with<F>(
    source: Option<&Utf8Path>,
    destination: &Utf8Path,
    rename: F,
) -> Result<(), InstallError>
where
    F: FnOnce(&Utf8Path, &Utf8Path) -> io::Result<()>,
{
    if let Some(from) = source {
        info!(target: LOG_TARGET, source = %from, destination = %destination, "installing binary");
        place(from, destination, rename)?;
    }
    ensure_executable(destination);
    Ok(())
}

fn place<F>(source: &Utf8Path, destination: &Utf8Path, rename: F) -> Result<(), InstallError>
where
    F: FnOnce(&Utf8Path, &Utf8Path) -> io::Result<()>,
{
    let Err(err) = rename(source, destination) else {
        return Ok(());
    };

    warn!(
        target: LOG_TARGET,
        source = %source,
        destination = %destination,
        error = %err,
        "failed to rename the downloaded file, trying to copy it"
    );

    fs::copy(source, destination).map_err(|copy_err| InstallError::Copy {
        source_path: source.to_path_buf(),
        destination: destination.to_path_buf(),
        source: copy_err,
    })?;

    if let Err(remove_err) = fs::remove_file(source) {
        debug!(
            target: LOG_TARGET,
            path = %source,
            error = %remove_err,
            "failed to remove temporary download after copy"
        );
    }
    Ok(())
}

#[cfg(unix)]
fn ensure_executable(path: &Utf8Path) {
    if let Err(err) = crate::fs::set_permissions(path, EXECUTABLE_MODE) {
        warn!(
            target: LOG_TARGET,
            path = %path,
            error = %err,
            "failed to make the binary executable"
        );
    }
}

#[cfg(not(unix))]
fn ensure_executable(path: &Utf8Path) {
    debug!(target: LOG_TARGET, path = %path, "no permission bits to adjust on this platform");
}
