//! Content-addressed backup store.
//!
//! Each backup entry lives in its own directory under `.broom/backups/`:
//! a `manifest.json` describing the snapshot and a `blobs/` directory
//! holding file contents keyed by SHA-256. Identical files share one
//! blob, so snapshotting a tree full of duplicates costs one copy.
//!
//! The manifest's `files` list is write-once: it is fixed when the entry
//! is created, and later operations only ever flip the entry `status`
//! (completed, corrupted, restored). Restores copy blob contents back
//! into the tree through the atomic-write layer and verify every blob's
//! checksum on the way out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

mod maintenance;
mod restore;
mod store;
#[cfg(test)]
mod tests;

pub use maintenance::prune_candidates;
pub use store::BackupStore;

/// Why a backup entry was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    /// Taken automatically before a plan mutates the tree.
    PreRun,
    /// Taken by a scheduled or scripted invocation.
    Auto,
    /// Requested explicitly via `broom backup create`.
    Manual,
    /// Safety snapshot taken immediately before a restore overwrites files.
    RollbackPoint,
}

impl BackupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupKind::PreRun => "pre_run",
            BackupKind::Auto => "auto",
            BackupKind::Manual => "manual",
            BackupKind::RollbackPoint => "rollback_point",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a backup entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    /// Entry directory exists but the manifest is not final yet.
    Creating,
    /// Snapshot finished and verified at creation time.
    Completed,
    /// Verification found a missing or mismatching blob.
    Corrupted,
    /// A full restore from this entry succeeded.
    Restored,
}

impl BackupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupStatus::Creating => "creating",
            BackupStatus::Completed => "completed",
            BackupStatus::Corrupted => "corrupted",
            BackupStatus::Restored => "restored",
        }
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the protected operation is expected to do to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Modified,
    Deleted,
    Created,
    Renamed,
}

/// One file captured in a backup entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    /// Project-relative path (forward slashes).
    pub path: String,

    /// File size in bytes at snapshot time.
    pub size: u64,

    /// File mtime at snapshot time.
    pub modified_at: DateTime<Utc>,

    /// SHA-256 of the file content; also the blob filename.
    pub checksum: String,

    /// Expected change during the protected operation.
    pub change: ChangeKind,
}

/// Bookkeeping attached to a backup entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// The operation this backup protects (e.g., "run quick_cleanup").
    pub operation: String,

    /// Who triggered the backup (`user@host`).
    pub triggered_by: String,

    /// Sum of all snapshot file sizes.
    pub total_bytes: u64,

    /// SHA-256 over the sorted (path, checksum) pairs.
    pub entry_checksum: String,
}

/// A backup entry as stored in `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub kind: BackupKind,
    pub description: String,
    pub status: BackupStatus,

    /// Snapshot files, sorted by path. Write-once at creation.
    pub files: Vec<SnapshotFile>,

    pub metadata: BackupMetadata,
}

impl BackupEntry {
    /// Number of files in the snapshot.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Whether a restore targets everything or a path subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreScope {
    Full,
    Partial,
}

impl fmt::Display for RestoreScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RestoreScope::Full => "full",
            RestoreScope::Partial => "partial",
        };
        write!(f, "{}", s)
    }
}

/// Result of one restore operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackOutcome {
    /// Restore operation id (e.g., "r-20250301-101500").
    pub rollback_id: String,

    /// The backup entry restored from.
    pub backup_id: String,

    pub performed_at: DateTime<Utc>,
    pub scope: RestoreScope,

    /// Requested path subset for partial restores.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,

    /// True when every selected file was restored without error.
    pub success: bool,

    pub files_restored: usize,
    pub files_skipped: usize,

    /// Per-file error descriptions; restore continues past them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Health of the backup store as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreHealth {
    Good,
    Warning,
    Critical,
}

impl StoreHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreHealth::Good => "good",
            StoreHealth::Warning => "warning",
            StoreHealth::Critical => "critical",
        }
    }
}

impl fmt::Display for StoreHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of verifying one backup entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOutcome {
    pub backup_id: String,

    /// True when every blob matched its manifest checksum.
    pub ok: bool,

    /// Descriptions of missing or mismatching blobs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<String>,
}

/// Summary of the backup store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreReport {
    pub generated_at: DateTime<Utc>,
    pub entry_count: usize,
    pub total_bytes: u64,

    /// Entry counts per backup kind.
    pub kind_counts: BTreeMap<String, usize>,

    /// Ids of entries marked corrupted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corrupted: Vec<String>,

    pub newest: Option<DateTime<Utc>>,
    pub oldest: Option<DateTime<Utc>>,

    /// Threshold advisories (size or count over the configured limits).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advisories: Vec<String>,

    /// Critical when the store is empty or an entry is corrupted,
    /// warning when an advisory fired, good otherwise.
    pub health: StoreHealth,
}
