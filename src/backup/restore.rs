//! Restoring snapshot files back into the tree.

use super::{BackupStatus, RestoreScope, RollbackOutcome};
use super::store::BackupStore;
use crate::error::Result;
use crate::events::{self, Event, EventAction};
use crate::fs::atomic_write;
use serde_json::json;
use std::fs;

impl BackupStore<'_> {
    /// Restore every file in a backup entry.
    ///
    /// A fully successful full restore flips the entry status to
    /// `restored`.
    pub fn restore_full(&self, id: &str) -> Result<RollbackOutcome> {
        self.restore(id, RestoreScope::Full, &[])
    }

    /// Restore only the files under the given project-relative paths.
    ///
    /// A path selects a snapshot file when it matches exactly or names a
    /// parent directory of it. No matching files is not an error; the
    /// restore succeeds having restored nothing.
    pub fn restore_partial(&self, id: &str, paths: &[String]) -> Result<RollbackOutcome> {
        self.restore(id, RestoreScope::Partial, paths)
    }

    fn restore(&self, id: &str, scope: RestoreScope, paths: &[String]) -> Result<RollbackOutcome> {
        let mut entry = self.load(id)?;

        let requested: Vec<String> = paths
            .iter()
            .map(|p| p.trim().trim_end_matches('/').replace('\\', "/"))
            .filter(|p| !p.is_empty())
            .collect();

        let selected: Vec<usize> = entry
            .files
            .iter()
            .enumerate()
            .filter(|(_, f)| match scope {
                RestoreScope::Full => true,
                RestoreScope::Partial => requested
                    .iter()
                    .any(|p| f.path == *p || f.path.starts_with(&format!("{}/", p))),
            })
            .map(|(i, _)| i)
            .collect();

        let mut outcome = RollbackOutcome {
            rollback_id: format!("r-{}", chrono::Utc::now().format("%Y%m%d-%H%M%S")),
            backup_id: entry.id.clone(),
            performed_at: chrono::Utc::now(),
            scope,
            paths: requested,
            success: false,
            files_restored: 0,
            files_skipped: 0,
            errors: Vec::new(),
        };

        // Every file is restored independently; one bad blob never stops
        // the rest of the restore.
        for idx in &selected {
            let file = &entry.files[*idx];
            let blob = self.blob_path(&entry.id, &file.checksum);

            let bytes = match fs::read(&blob) {
                Ok(b) => b,
                Err(e) => {
                    outcome.files_skipped += 1;
                    outcome
                        .errors
                        .push(format!("{}: blob missing or unreadable: {}", file.path, e));
                    continue;
                }
            };

            if crate::hash::hash_bytes(&bytes) != file.checksum {
                outcome.files_skipped += 1;
                outcome
                    .errors
                    .push(format!("{}: blob checksum mismatch", file.path));
                continue;
            }

            let target = self.ctx().project_root.join(&file.path);
            if let Some(parent) = target.parent()
                && !parent.exists()
                && let Err(e) = fs::create_dir_all(parent)
            {
                outcome.files_skipped += 1;
                outcome
                    .errors
                    .push(format!("{}: failed to create parent directory: {}", file.path, e));
                continue;
            }

            match atomic_write(&target, &bytes) {
                Ok(()) => outcome.files_restored += 1,
                Err(e) => {
                    outcome.files_skipped += 1;
                    outcome.errors.push(format!("{}: {}", file.path, e));
                }
            }
        }

        outcome.success = outcome.errors.is_empty();

        if scope == RestoreScope::Full && outcome.success && entry.status != BackupStatus::Restored
        {
            entry.status = BackupStatus::Restored;
            self.save_manifest(&entry)?;
        }

        events::log_event_best_effort(
            self.ctx(),
            &Event::new(EventAction::Rollback)
                .with_module("backup")
                .with_details(json!({
                    "rollback_id": outcome.rollback_id,
                    "backup_id": outcome.backup_id,
                    "scope": outcome.scope,
                    "files_restored": outcome.files_restored,
                    "files_skipped": outcome.files_skipped,
                    "success": outcome.success,
                })),
        );

        Ok(outcome)
    }
}
