//! Run lock for serializing mutating operations.
//!
//! broom holds a single exclusive lock (`.broom/locks/run.lock`) while a
//! plan run, backup, restore, or prune mutates the project. The lock file
//! carries JSON metadata identifying the holder so a second invocation can
//! print who is in the way and since when.
//!
//! Acquisition uses `create_new` semantics: creating the file exclusively
//! either succeeds or fails because another holder exists. The returned
//! [`LockGuard`] removes the file on drop.

use crate::config::Config;
use crate::context::ProjectContext;
use crate::error::{BroomError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Lock metadata stored in the lock file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockMetadata {
    /// Owner of the lock (e.g., `user@HOST`).
    pub owner: String,

    /// Process ID of the lock holder (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Timestamp when the lock was created (RFC3339).
    pub created_at: DateTime<Utc>,

    /// The action being performed (run/backup/restore/prune).
    pub action: String,
}

impl LockMetadata {
    /// Create new lock metadata with the current timestamp.
    pub fn new(action: &str) -> Self {
        Self {
            owner: get_owner_string(),
            pid: Some(std::process::id()),
            created_at: Utc::now(),
            action: action.to_string(),
        }
    }

    /// Parse lock metadata from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            BroomError::UserError(format!(
                "failed to read lock file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            BroomError::UserError(format!(
                "failed to parse lock file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Serialize lock metadata to JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BroomError::UserError(format!("failed to serialize lock metadata: {}", e)))
    }

    /// Calculate the age of the lock.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes)
        }
    }

    /// Check if the lock is stale based on the given threshold in minutes.
    pub fn is_stale(&self, stale_minutes: u32) -> bool {
        self.age().num_minutes() > stale_minutes as i64
    }
}

/// Get the owner string for lock metadata.
fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Information about the active run lock.
#[derive(Debug, Clone)]
pub struct LockInfo {
    /// The lock file path.
    pub path: PathBuf,

    /// The lock metadata.
    pub metadata: LockMetadata,

    /// Whether the lock is stale.
    pub is_stale: bool,
}

/// RAII guard for the run lock.
///
/// When dropped, the lock file is automatically deleted.
/// If deletion fails, a warning is printed but no panic occurs.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    released: bool,
}

impl LockGuard {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Manually release the lock.
    ///
    /// Useful when the lock should be released before the guard goes
    /// out of scope and errors need explicit handling.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        fs::remove_file(&self.path).map_err(|e| {
            BroomError::UserError(format!(
                "failed to release lock '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = fs::remove_file(&self.path)
        {
            eprintln!(
                "Warning: failed to release lock '{}': {}",
                self.path.display(),
                e
            );
        }
    }
}

/// Acquire the exclusive run lock.
///
/// Returns a `LockError` (exit code 4) when the lock is already held,
/// including holder metadata in the message when it can be read.
pub fn acquire_run_lock(ctx: &ProjectContext, action: &str) -> Result<LockGuard> {
    let lock_path = ctx.run_lock_path();
    let metadata = LockMetadata::new(action);

    if let Some(parent) = lock_path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            BroomError::UserError(format!(
                "failed to create locks directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&lock_path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                let existing_info = match LockMetadata::from_file(&lock_path) {
                    Ok(meta) => format!(
                        "\nLock: {} (created {} ago by {})\nAction: {}\n\n\
                         If the holder has crashed, clear it with `broom lock clear --force`.",
                        lock_path.display(),
                        meta.age_string(),
                        meta.owner,
                        meta.action
                    ),
                    Err(_) => format!("\nLock: {}", lock_path.display()),
                };
                BroomError::LockError(format!(
                    "another broom operation is in progress{}",
                    existing_info
                ))
            } else {
                BroomError::LockError(format!(
                    "failed to acquire lock '{}': {}",
                    lock_path.display(),
                    e
                ))
            }
        })?;

    let json = metadata.to_json()?;
    file.write_all(json.as_bytes()).map_err(|e| {
        let _ = fs::remove_file(&lock_path);
        BroomError::LockError(format!("failed to write lock metadata: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(&lock_path);
        BroomError::LockError(format!("failed to sync lock file: {}", e))
    })?;

    Ok(LockGuard::new(lock_path))
}

/// Read the current run lock, if one is held.
pub fn run_lock_info(ctx: &ProjectContext, config: &Config) -> Result<Option<LockInfo>> {
    let lock_path = ctx.run_lock_path();

    if !lock_path.exists() {
        return Ok(None);
    }

    let metadata = LockMetadata::from_file(&lock_path)?;
    let is_stale = metadata.is_stale(config.lock_stale_minutes);

    Ok(Some(LockInfo {
        path: lock_path,
        metadata,
        is_stale,
    }))
}

/// Remove the run lock file.
///
/// The caller is responsible for verifying that clearing is appropriate
/// (the CLI requires `--force`). Returns the cleared lock's info for
/// audit purposes.
pub fn clear_run_lock(ctx: &ProjectContext, config: &Config) -> Result<LockInfo> {
    let info = run_lock_info(ctx, config)?.ok_or_else(|| {
        BroomError::UserError(format!(
            "no run lock exists at: {}",
            ctx.run_lock_path().display()
        ))
    })?;

    fs::remove_file(&info.path).map_err(|e| {
        BroomError::UserError(format!(
            "failed to clear lock '{}': {}",
            info.path.display(),
            e
        ))
    })?;

    Ok(info)
}
