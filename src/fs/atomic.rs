//! Atomic file writes.
//!
//! Every durable write in broom (manifests, config, restored files,
//! reports) goes through this module so nothing is left half-written by
//! a crash or interruption. The sequence is always: stage the content
//! in a temporary sibling file, fsync it, then rename it over the
//! target.
//!
//! On POSIX the rename is atomic as long as the staging file and the
//! target share a filesystem, which holds because the staging file is
//! created next to the target. On Windows `std::fs::rename` refuses to
//! replace an existing file, so the replace goes through `MoveFileExW`
//! with `MOVEFILE_REPLACE_EXISTING`.
//!
//! Staging names carry the process id and a per-process sequence number
//! (`.{name}.{pid}-{seq}.tmp`), so concurrent writers never clobber each
//! other's staging file. A crash can leave one behind; the next write
//! simply stages a fresh one.

use crate::error::{BroomError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Atomically replace `path` with `content`.
///
/// Creates missing parent directories. When this returns `Ok`, the
/// target holds exactly `content` and has been synced to disk; on error
/// the target is untouched and the staging file has been removed.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            BroomError::UserError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let staging = staging_path(path)?;
    if let Err(e) = stage(&staging, content) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    if let Err(e) = replace(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    Ok(())
}

/// String-content convenience wrapper around [`atomic_write`].
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Unique staging path next to the target.
fn staging_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            BroomError::UserError(format!("invalid file path: '{}'", target.display()))
        })?;

    let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
    Ok(parent.join(format!(".{}.{}-{}.tmp", name, std::process::id(), seq)))
}

/// Write the content to the staging file and sync it to disk.
fn stage(staging: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(staging).map_err(|e| {
        BroomError::UserError(format!(
            "failed to create staging file '{}': {}",
            staging.display(),
            e
        ))
    })?;

    file.write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|e| {
            BroomError::UserError(format!(
                "failed to write staging file '{}': {}",
                staging.display(),
                e
            ))
        })
}

#[cfg(unix)]
fn replace(staging: &Path, target: &Path) -> Result<()> {
    fs::rename(staging, target).map_err(|e| {
        BroomError::UserError(format!(
            "failed to replace '{}': {}",
            target.display(),
            e
        ))
    })?;

    // Sync the directory entry too, or the rename itself can be lost
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

#[cfg(windows)]
fn replace(staging: &Path, target: &Path) -> Result<()> {
    // A plain rename covers the common case of a new target
    match fs::rename(staging, target) {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
        Err(e) => {
            return Err(BroomError::UserError(format!(
                "failed to replace '{}': {}",
                target.display(),
                e
            )));
        }
    }

    const MOVEFILE_REPLACE_EXISTING: u32 = 0x1;
    const MOVEFILE_WRITE_THROUGH: u32 = 0x8;

    #[link(name = "kernel32")]
    unsafe extern "system" {
        fn MoveFileExW(from: *const u16, to: *const u16, flags: u32) -> i32;
        fn GetLastError() -> u32;
    }

    let from = wide(staging);
    let to = wide(target);
    let ok = unsafe {
        MoveFileExW(
            from.as_ptr(),
            to.as_ptr(),
            MOVEFILE_REPLACE_EXISTING | MOVEFILE_WRITE_THROUGH,
        )
    };

    if ok == 0 {
        let code = unsafe { GetLastError() };
        return Err(BroomError::UserError(format!(
            "failed to replace '{}': Windows error code {}",
            target.display(),
            code
        )));
    }

    Ok(())
}

#[cfg(windows)]
fn wide(path: &Path) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;
    path.as_os_str().encode_wide().chain(std::iter::once(0)).collect()
}
