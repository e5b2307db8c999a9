//! Tree copies between the tool cache and the install root.

use camino::Utf8Path;
use color_eyre::eyre::Context;
use std::fs;
use std::io;
use tracing::debug;

use crate::error::CacheResult;

const LOG_TARGET: &str = "gitops_setup::cache";

/// Copies a cache entry over `target`, replacing files already there.
///
/// # Errors
///
/// Returns an error if the entry cannot be read or any file cannot be
/// written below `target`.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use setup_gitops_cli::cache::copy_from_cache;
///
/// copy_from_cache(
///     Utf8Path::new("/opt/hostedtoolcache/gitops-cli/2.2.2/ubuntu-amd64"),
///     Utf8Path::new("/home/runner/.gitops-cli"),
/// )?;
/// # Ok::<(), setup_gitops_cli::cache::CacheError>(())
/// ```
pub fn copy_from_cache(source: &Utf8Path, target: &Utf8Path) -> CacheResult<()> {
    debug!(target: LOG_TARGET, %source, %target, "restoring entry from cache");
    copy_tree(source, target)
        .with_context(|| format!("failed to copy cached files from {source} to {target}"))?;
    Ok(())
}

/// Mirrors `source` into `target`. File modes are carried by `fs::copy`;
/// directory modes are copied best effort and symbolic links are recreated
/// rather than followed.
pub(crate) fn copy_tree(source: &Utf8Path, target: &Utf8Path) -> io::Result<()> {
    fs::create_dir_all(target)?;

    for item in source.read_dir_utf8()? {
        let entry = item?;
        let destination = target.join(entry.file_name());
        let kind = entry.file_type()?;
        if kind.is_symlink() {
            relink(entry.path(), &destination)?;
        } else if kind.is_dir() {
            copy_tree(entry.path(), &destination)?;
        } else {
            fs::copy(entry.path(), &destination)?;
        }
    }

    mirror_dir_mode(source, target);
    Ok(())
}

fn mirror_dir_mode(source: &Utf8Path, target: &Utf8Path) {
    let outcome = fs::metadata(source).and_then(|meta| fs::set_permissions(target, meta.permissions()));
    if let Err(err) = outcome {
        debug!(target: LOG_TARGET, %source, %target, error = %err, "directory mode not copied");
    }
}

#[cfg(unix)]
fn relink(link: &Utf8Path, destination: &Utf8Path) -> io::Result<()> {
    let points_to = fs::read_link(link)?;
    if let Err(err) = fs::remove_file(destination) {
        if err.kind() != io::ErrorKind::NotFound {
            return Err(err);
        }
    }
    std::os::unix::fs::symlink(points_to, destination)
}

/// Without portable symlink creation the link target's contents are copied.
#[cfg(not(unix))]
fn relink(link: &Utf8Path, destination: &Utf8Path) -> io::Result<()> {
    if link.is_file() {
        fs::copy(link, destination)?;
    }
    Ok(())
}
