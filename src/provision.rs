//! Clone a template VM directory and give its disk a fresh UUID.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::BoxerError;
use crate::invoker::Invoker;
use crate::paths;

/// Copy `source_dir` to `dest_dir` and regenerate the UUID of `disk_name`.
///
/// Returns the path of the cloned disk. `dest_dir` must not exist yet. When
/// the disk is missing after the copy, the copied tree is left in place and
/// `DiskImageMissing` is returned; the clone must not be attached to a VM.
pub async fn clone_template<I: Invoker>(
    invoker: &I,
    source_dir: &Path,
    dest_dir: &Path,
    disk_name: &str,
) -> Result<PathBuf, BoxerError> {
    if !source_dir.is_dir() {
        return Err(BoxerError::SourceNotFound {
            path: source_dir.display().to_string(),
        });
    }
    if dest_dir.exists() {
        return Err(BoxerError::DestinationExists {
            path: dest_dir.display().to_string(),
        });
    }

    let (src, dst) = (source_dir.to_path_buf(), dest_dir.to_path_buf());
    let copied = tokio::task::spawn_blocking(move || {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        copy_tree(&src, &dst)
    })
        .await
        .map_err(|e| BoxerError::Io {
            context: "copy task failed".into(),
            source: io::Error::other(e),
        })?
        .map_err(|source| BoxerError::Io {
            context: format!(
                "copying {} to {}",
                source_dir.display(),
                dest_dir.display()
            ),
            source,
        })?;
    tracing::info!(
        from = %source_dir.display(),
        to = %dest_dir.display(),
        bytes = copied,
        "template copied"
    );

    let disk = paths::disk_path(dest_dir, disk_name);
    if !disk.is_file() {
        tracing::warn!(path = %disk.display(), "disk image missing after copy");
        return Err(BoxerError::DiskImageMissing {
            path: disk.display().to_string(),
        });
    }

    regenerate_uuid(invoker, &disk).await?;
    Ok(disk)
}

/// `internalcommands sethduuid <disk>`
pub async fn regenerate_uuid<I: Invoker>(invoker: &I, disk: &Path) -> Result<(), BoxerError> {
    let args = vec![
        "internalcommands".to_string(),
        "sethduuid".to_string(),
        disk.display().to_string(),
    ];
    invoker.invoke(&args).await?.check(&args)?;
    tracing::info!(path = %disk.display(), "disk UUID regenerated");
    Ok(())
}

/// Recursively copy a directory tree. Fails if `dst` already exists.
/// Returns the number of bytes copied.
fn copy_tree(src: &Path, dst: &Path) -> io::Result<u64> {
    fs::create_dir(dst)?;
    let mut total = 0;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dst.join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            total += fs::copy(entry.path(), &target)?;
        }
    }
    Ok(total)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(src)?, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst).map(|_| ())
}
