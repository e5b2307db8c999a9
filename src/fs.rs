//! Directory creation and permission changes through `cap-std` handles.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs::Dir};
use color_eyre::eyre::{Context, Result};
use std::io::ErrorKind;

/// An ambient directory handle and a path relative to it.
struct Anchored {
    dir: Dir,
    relative: Utf8PathBuf,
}

/// Opens the deepest existing strict ancestor of `path` and returns it with
/// the remainder of `path`.
///
/// The ancestor is opened by the operating system, so symlinks anywhere in
/// it (including absolute ones) are followed; only the remainder is
/// resolved by `cap-std`. Returns `None` when `path` has no ancestor, as for
/// the filesystem root.
fn anchor(path: &Utf8Path) -> Result<Option<Anchored>> {
    let Some(base) = path
        .ancestors()
        .skip(1)
        .find(|candidate| openable(candidate).is_dir())
    else {
        return Ok(None);
    };
    let Ok(relative) = path.strip_prefix(base) else {
        return Ok(None);
    };
    let base_dir = openable(base);
    let dir = Dir::open_ambient_dir(base_dir, ambient_authority())
        .with_context(|| format!("failed to open directory {base_dir}"))?;
    Ok(Some(Anchored {
        dir,
        relative: relative.to_path_buf(),
    }))
}

/// The empty ancestor of a relative path is the working directory.
fn openable(candidate: &Utf8Path) -> &Utf8Path {
    if candidate.as_str().is_empty() {
        Utf8Path::new(".")
    } else {
        candidate
    }
}

/// Creates `path` and any missing parents. Existing directories are fine.
pub(crate) fn ensure_dir_exists(path: &Utf8Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    let Some(Anchored { dir, relative }) = anchor(path)? else {
        return Ok(());
    };
    match dir.create_dir_all(relative.as_std_path()) {
        Err(err) if err.kind() != ErrorKind::AlreadyExists => {
            Err(err).with_context(|| format!("failed to create directory {path}"))
        }
        _ => Ok(()),
    }
}

/// Sets the POSIX permission bits of `path` to `mode`.
#[cfg(unix)]
pub(crate) fn set_permissions(path: &Utf8Path, mode: u32) -> Result<()> {
    use cap_std::fs::{Permissions, PermissionsExt};

    let Some(Anchored { dir, relative }) = anchor(path)? else {
        return Ok(());
    };
    dir.set_permissions(relative.as_std_path(), Permissions::from_mode(mode))
        .with_context(|| format!("failed to set mode {mode:o} on {path}"))
}
