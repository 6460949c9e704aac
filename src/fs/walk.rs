//! Recursive project tree walking.
//!
//! All scans and cleanups see the tree through this walker, so the skip
//! rules (state dir, VCS dir, configured excludes, symlinks) apply
//! uniformly everywhere.

use crate::context::STATE_DIR_NAME;
use crate::error::{BroomError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};

/// A regular file found by the walker.
#[derive(Debug, Clone)]
pub struct WalkedFile {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// Path relative to the walk root.
    pub rel: PathBuf,
    /// File size in bytes.
    pub size: u64,
}

impl WalkedFile {
    /// The relative path with forward slashes, for reports and glob
    /// matching.
    pub fn rel_str(&self) -> String {
        self.rel.to_string_lossy().replace('\\', "/")
    }
}

/// Build a glob set from a list of patterns.
///
/// Empty patterns are skipped; backslashes are normalized to forward
/// slashes so patterns written on Windows match too.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let normalized = pattern.trim().replace('\\', "/");
        if normalized.is_empty() {
            continue;
        }
        let glob = Glob::new(&normalized).map_err(|e| {
            BroomError::UserError(format!("invalid glob pattern '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }

    builder
        .build()
        .map_err(|e| BroomError::UserError(format!("failed to build glob set: {}", e)))
}

/// Walk a project tree and collect regular files.
///
/// Always skips the `.broom` state directory, `.git`, and symlinks.
/// Paths matching `exclude` (tested against the relative path with
/// forward slashes) are skipped as well. Results are sorted by relative
/// path so walks are deterministic.
pub fn walk_project(root: &Path, exclude: &GlobSet) -> Result<Vec<WalkedFile>> {
    let mut files = Vec::new();
    walk_recursive(root, root, exclude, &mut files)?;
    files.sort_by(|a, b| a.rel.cmp(&b.rel));
    Ok(files)
}

fn walk_recursive(
    root: &Path,
    dir: &Path,
    exclude: &GlobSet,
    out: &mut Vec<WalkedFile>,
) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| {
        BroomError::UserError(format!(
            "failed to read directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            BroomError::UserError(format!(
                "failed to read entry in '{}': {}",
                dir.display(),
                e
            ))
        })?;

        let path = entry.path();
        let name = entry.file_name();

        if name == STATE_DIR_NAME || name == ".git" {
            continue;
        }

        let file_type = entry.file_type().map_err(|e| {
            BroomError::UserError(format!("failed to stat '{}': {}", path.display(), e))
        })?;

        // Symlinks are skipped entirely: following them could walk outside
        // the project root.
        if file_type.is_symlink() {
            continue;
        }

        let rel = match path.strip_prefix(root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => continue,
        };

        let rel_str = rel.to_string_lossy().replace('\\', "/");
        if exclude.is_match(&rel_str) {
            continue;
        }

        if file_type.is_dir() {
            walk_recursive(root, &path, exclude, out)?;
        } else if file_type.is_file() {
            let size = entry
                .metadata()
                .map_err(|e| {
                    BroomError::UserError(format!("failed to stat '{}': {}", path.display(), e))
                })?
                .len();
            out.push(WalkedFile { path, rel, size });
        }
    }

    Ok(())
}
