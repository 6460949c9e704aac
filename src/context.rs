//! Project context resolution for broom.
//!
//! This module provides the "environment resolution" layer that locates the
//! project root and the canonical state directory (`.broom/`) from any
//! working directory.
//!
//! All broom commands resolve a [`ProjectContext`] first and receive it by
//! reference from there on. There is no global state; every subsystem that
//! needs a path gets it from the context it was handed.

use crate::error::{BroomError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the state directory at the project root.
pub const STATE_DIR_NAME: &str = ".broom";

/// Resolved paths for a broom project.
///
/// All paths are absolute.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Absolute path to the project root (the directory holding `.broom/`).
    pub project_root: PathBuf,

    /// Absolute path to the state directory (`{project_root}/.broom/`).
    pub state_dir: PathBuf,

    /// Absolute path to the backups directory (`{state_dir}/backups/`).
    pub backups_dir: PathBuf,

    /// Absolute path to the locks directory (`{state_dir}/locks/`).
    pub locks_dir: PathBuf,
}

impl ProjectContext {
    /// Resolve the project context from the current working directory.
    ///
    /// Walks up from the working directory looking for an existing `.broom/`
    /// directory. If none is found, the working directory itself becomes the
    /// project root (the `init` case).
    pub fn resolve() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            BroomError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Self::resolve_from(&cwd)
    }

    /// Resolve the project context from a specific directory.
    ///
    /// This is useful for testing or when the working directory is known.
    pub fn resolve_from<P: AsRef<Path>>(cwd: P) -> Result<Self> {
        let cwd = cwd.as_ref();

        let project_root = match find_state_root(cwd) {
            Some(root) => root,
            None => cwd.to_path_buf(),
        };

        let state_dir = project_root.join(STATE_DIR_NAME);
        let backups_dir = state_dir.join("backups");
        let locks_dir = state_dir.join("locks");

        Ok(Self {
            project_root,
            state_dir,
            backups_dir,
            locks_dir,
        })
    }

    /// Check if the state directory exists.
    pub fn state_exists(&self) -> bool {
        self.state_dir.is_dir()
    }

    /// Ensure the project is initialized, returning an error if not.
    ///
    /// This should be called by all commands except `init` to provide
    /// a helpful error message guiding users to run `broom init`.
    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.state_dir.is_dir() {
            return Err(BroomError::UserError(format!(
                "broom is not initialized in this project.\n\
                 Expected state directory at: {}\n\n\
                 Run `broom init` to initialize broom in this directory.",
                self.state_dir.display()
            )));
        }

        Ok(())
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.state_dir.join("config.yaml")
    }

    /// Get the path to the events directory.
    pub fn events_dir(&self) -> PathBuf {
        self.state_dir.join("events")
    }

    /// Get the path to the main events log file.
    pub fn events_file(&self) -> PathBuf {
        self.events_dir().join("events.ndjson")
    }

    /// Get the path to the reports directory.
    pub fn reports_dir(&self) -> PathBuf {
        self.state_dir.join("reports")
    }

    /// Get the path to the run lock file.
    pub fn run_lock_path(&self) -> PathBuf {
        self.locks_dir.join("run.lock")
    }

    /// Get the directory for a specific backup entry.
    pub fn backup_dir(&self, backup_id: &str) -> PathBuf {
        self.backups_dir.join(backup_id)
    }

    /// Convert a path to a project-relative path, rejecting escapes.
    ///
    /// Accepts absolute paths under the project root and relative paths
    /// that stay inside it. Paths containing `..` components are rejected
    /// so state operations can never reach outside the project.
    pub fn relativize<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let path = path.as_ref();

        if path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(BroomError::UserError(format!(
                "refusing path with traversal: {}",
                path.display()
            )));
        }

        if path.is_absolute() {
            return path
                .strip_prefix(&self.project_root)
                .map(|p| p.to_path_buf())
                .map_err(|_| {
                    BroomError::UserError(format!(
                        "path is outside the project root: {}",
                        path.display()
                    ))
                });
        }

        Ok(path.to_path_buf())
    }
}

/// Walk up from a directory looking for an existing `.broom/` state dir.
fn find_state_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(STATE_DIR_NAME).is_dir() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

/// Convenience function to resolve context and ensure the project is initialized.
///
/// Use this in most commands (except `init`) to get the project context
/// with proper error handling for uninitialized projects.
pub fn require_initialized_project() -> Result<ProjectContext> {
    let ctx = ProjectContext::resolve()?;
    ctx.ensure_initialized()?;
    Ok(ctx)
}
