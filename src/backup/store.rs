//! Backup entry creation and lookup.

use super::{
    BackupEntry, BackupKind, BackupMetadata, BackupStatus, ChangeKind, SnapshotFile,
};
use crate::context::ProjectContext;
use crate::error::{BroomError, Result};
use crate::events::{self, Event, EventAction};
use crate::fs::atomic_write;
use crate::hash;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Regex pattern for valid backup entry ids.
static BACKUP_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^b-\d{8}-\d{6}(-\d+)?$").expect("Invalid backup ID regex"));

/// Handle on the project's backup store.
///
/// Constructed per invocation from an explicit [`ProjectContext`]; the
/// store holds no state of its own beyond the directory layout.
pub struct BackupStore<'a> {
    ctx: &'a ProjectContext,
}

impl<'a> BackupStore<'a> {
    pub fn new(ctx: &'a ProjectContext) -> Self {
        Self { ctx }
    }

    pub(super) fn ctx(&self) -> &ProjectContext {
        self.ctx
    }

    /// Create a backup entry covering the given files.
    ///
    /// Each `(path, change)` pair names a project file and the change the
    /// protected operation is expected to make to it. Paths outside the
    /// project or containing traversal are rejected. On any failure the
    /// partial entry directory is removed before the error is returned.
    ///
    /// An empty file list produces a valid, empty entry; restoring it
    /// restores nothing and succeeds.
    pub fn create(
        &self,
        kind: BackupKind,
        description: &str,
        operation: &str,
        files: &[(PathBuf, ChangeKind)],
    ) -> Result<BackupEntry> {
        let id = self.next_entry_id();
        let entry_dir = self.ctx.backup_dir(&id);

        let result = self.snapshot_into(&id, &entry_dir, kind, description, operation, files);

        match result {
            Ok(entry) => {
                events::log_event_best_effort(
                    self.ctx,
                    &Event::new(EventAction::BackupCreate)
                        .with_module("backup")
                        .with_details(json!({
                            "backup_id": entry.id,
                            "kind": entry.kind.as_str(),
                            "files": entry.files.len(),
                            "bytes": entry.metadata.total_bytes,
                        })),
                );
                Ok(entry)
            }
            Err(e) => {
                if entry_dir.exists() {
                    let _ = fs::remove_dir_all(&entry_dir);
                }
                Err(BroomError::BackupError(format!(
                    "creating backup '{}': {}",
                    id, e
                )))
            }
        }
    }

    fn snapshot_into(
        &self,
        id: &str,
        entry_dir: &Path,
        kind: BackupKind,
        description: &str,
        operation: &str,
        files: &[(PathBuf, ChangeKind)],
    ) -> Result<BackupEntry> {
        let blobs_dir = entry_dir.join("blobs");
        fs::create_dir_all(&blobs_dir).map_err(|e| {
            BroomError::UserError(format!(
                "failed to create backup directory '{}': {}",
                blobs_dir.display(),
                e
            ))
        })?;

        let mut snapshot_files = Vec::with_capacity(files.len());
        let mut total_bytes = 0u64;

        for (path, change) in files {
            let rel = self.ctx.relativize(path)?;
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            let abs = self.ctx.project_root.join(&rel);

            let bytes = fs::read(&abs).map_err(|e| {
                BroomError::UserError(format!("failed to read '{}': {}", abs.display(), e))
            })?;
            let meta = fs::metadata(&abs).map_err(|e| {
                BroomError::UserError(format!("failed to stat '{}': {}", abs.display(), e))
            })?;
            let modified_at: DateTime<Utc> = meta
                .modified()
                .map(DateTime::from)
                .unwrap_or_else(|_| Utc::now());

            let checksum = hash::hash_bytes(&bytes);
            let blob = blobs_dir.join(&checksum);
            // Identical content shares one blob
            if !blob.exists() {
                atomic_write(&blob, &bytes)?;
            }

            total_bytes += bytes.len() as u64;
            snapshot_files.push(SnapshotFile {
                path: rel_str,
                size: bytes.len() as u64,
                modified_at,
                checksum,
                change: *change,
            });
        }

        snapshot_files.sort_by(|a, b| a.path.cmp(&b.path));

        let pairs: Vec<(String, String)> = snapshot_files
            .iter()
            .map(|f| (f.path.clone(), f.checksum.clone()))
            .collect();

        let entry = BackupEntry {
            id: id.to_string(),
            created_at: Utc::now(),
            kind,
            description: description.to_string(),
            status: BackupStatus::Completed,
            files: snapshot_files,
            metadata: BackupMetadata {
                operation: operation.to_string(),
                triggered_by: events::get_actor_string(),
                total_bytes,
                entry_checksum: hash::hash_pairs(&pairs),
            },
        };

        self.save_manifest(&entry)?;
        Ok(entry)
    }

    /// Load a backup entry by id.
    pub fn load(&self, id: &str) -> Result<BackupEntry> {
        validate_backup_id(id)?;

        let manifest = self.manifest_path(id);
        if !manifest.is_file() {
            return Err(BroomError::UserError(format!(
                "backup not found: '{}'.\nRun `broom backup list` to see available backups.",
                id
            )));
        }

        let content = fs::read_to_string(&manifest).map_err(|e| {
            BroomError::BackupError(format!(
                "failed to read manifest '{}': {}",
                manifest.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            BroomError::BackupError(format!(
                "failed to parse manifest '{}': {}",
                manifest.display(),
                e
            ))
        })
    }

    /// List all backup entries, newest first.
    ///
    /// Entries with unreadable manifests are skipped with a warning.
    pub fn list(&self) -> Result<Vec<BackupEntry>> {
        let backups_dir = &self.ctx.backups_dir;
        if !backups_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let dir = fs::read_dir(backups_dir).map_err(|e| {
            BroomError::BackupError(format!(
                "failed to read backups directory '{}': {}",
                backups_dir.display(),
                e
            ))
        })?;

        for dir_entry in dir {
            let dir_entry = dir_entry.map_err(|e| {
                BroomError::BackupError(format!("failed to read directory entry: {}", e))
            })?;
            let path = dir_entry.path();
            if !path.is_dir() {
                continue;
            }

            let manifest = path.join("manifest.json");
            if !manifest.is_file() {
                continue;
            }

            match fs::read_to_string(&manifest)
                .map_err(|e| e.to_string())
                .and_then(|c| serde_json::from_str::<BackupEntry>(&c).map_err(|e| e.to_string()))
            {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    eprintln!(
                        "Warning: skipping unreadable manifest '{}': {}",
                        manifest.display(),
                        e
                    );
                }
            }
        }

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    /// Persist a manifest atomically.
    pub(super) fn save_manifest(&self, entry: &BackupEntry) -> Result<()> {
        let json = serde_json::to_string_pretty(entry).map_err(|e| {
            BroomError::BackupError(format!("failed to serialize manifest: {}", e))
        })?;
        atomic_write(self.manifest_path(&entry.id), format!("{}\n", json).as_bytes())
    }

    pub(super) fn manifest_path(&self, id: &str) -> PathBuf {
        self.ctx.backup_dir(id).join("manifest.json")
    }

    /// Path to a blob within an entry.
    pub fn blob_path(&self, id: &str, checksum: &str) -> PathBuf {
        self.ctx.backup_dir(id).join("blobs").join(checksum)
    }

    /// Generate a fresh entry id (`b-YYYYMMDD-HHMMSS`, with a numeric
    /// suffix when several entries land in the same second).
    fn next_entry_id(&self) -> String {
        let base = format!("b-{}", Utc::now().format("%Y%m%d-%H%M%S"));
        if !self.ctx.backup_dir(&base).exists() {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !self.ctx.backup_dir(&candidate).exists() {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Validate a backup id before using it as a path component.
fn validate_backup_id(id: &str) -> Result<()> {
    if BACKUP_ID_REGEX.is_match(id) {
        return Ok(());
    }
    Err(BroomError::UserError(format!(
        "invalid backup id '{}': expected the form b-YYYYMMDD-HHMMSS",
        id
    )))
}
