//! Store verification, pruning, and reporting.

use super::store::BackupStore;
use super::{BackupEntry, BackupStatus, StoreHealth, StoreReport, VerifyOutcome};
use crate::config::Config;
use crate::error::{BroomError, Result};
use crate::events::{self, Event, EventAction};
use crate::hash;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;

impl BackupStore<'_> {
    /// Recompute every blob checksum for one entry.
    ///
    /// A missing or mismatching blob marks the entry `corrupted`, and the
    /// flip is persisted to the manifest. The entry's description of what
    /// it holds never changes; only the status does.
    pub fn verify_entry(&self, entry: &mut BackupEntry) -> Result<VerifyOutcome> {
        let mut problems = Vec::new();

        for file in &entry.files {
            let blob = self.blob_path(&entry.id, &file.checksum);
            match fs::read(&blob) {
                Ok(bytes) => {
                    if hash::hash_bytes(&bytes) != file.checksum {
                        problems.push(format!("{}: blob content does not match checksum", file.path));
                    }
                }
                Err(e) => {
                    problems.push(format!("{}: blob missing or unreadable: {}", file.path, e));
                }
            }
        }

        let pairs: Vec<(String, String)> = entry
            .files
            .iter()
            .map(|f| (f.path.clone(), f.checksum.clone()))
            .collect();
        if hash::hash_pairs(&pairs) != entry.metadata.entry_checksum {
            problems.push("manifest entry checksum mismatch".to_string());
        }

        if !problems.is_empty() && entry.status != BackupStatus::Corrupted {
            entry.status = BackupStatus::Corrupted;
            self.save_manifest(entry)?;
        }

        let outcome = VerifyOutcome {
            backup_id: entry.id.clone(),
            ok: problems.is_empty(),
            problems,
        };

        events::log_event_best_effort(
            self.ctx(),
            &Event::new(EventAction::BackupVerify)
                .with_module("backup")
                .with_details(json!({
                    "backup_id": outcome.backup_id,
                    "ok": outcome.ok,
                    "problems": outcome.problems.len(),
                })),
        );

        Ok(outcome)
    }

    /// Verify one entry by id, or every entry in the store.
    pub fn verify_store(&self, id: Option<&str>) -> Result<Vec<VerifyOutcome>> {
        let mut entries = match id {
            Some(id) => vec![self.load(id)?],
            None => self.list()?,
        };

        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in &mut entries {
            outcomes.push(self.verify_entry(entry)?);
        }
        Ok(outcomes)
    }

    /// Remove entries older than `days_to_keep` days.
    ///
    /// The newest entry is always retained, even when it is older than
    /// the cutoff, so the store never loses its last restore point.
    /// Returns the ids of the removed entries, oldest first.
    pub fn prune(&self, days_to_keep: u32) -> Result<Vec<String>> {
        let entries = self.list()?;
        let candidates = prune_candidates(&entries, days_to_keep, Utc::now());

        for id in &candidates {
            let dir = self.ctx().backup_dir(id);
            fs::remove_dir_all(&dir).map_err(|e| {
                BroomError::BackupError(format!(
                    "failed to remove backup '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        if !candidates.is_empty() {
            events::log_event_best_effort(
                self.ctx(),
                &Event::new(EventAction::BackupPrune)
                    .with_module("backup")
                    .with_details(json!({
                        "pruned": candidates,
                        "days_to_keep": days_to_keep,
                    })),
            );
        }

        Ok(candidates)
    }

    /// Summarize the store.
    pub fn store_report(&self, config: &Config) -> Result<StoreReport> {
        let entries = self.list()?;

        let mut kind_counts: BTreeMap<String, usize> = BTreeMap::new();
        for entry in &entries {
            *kind_counts.entry(entry.kind.as_str().to_string()).or_insert(0) += 1;
        }

        let corrupted: Vec<String> = entries
            .iter()
            .filter(|e| e.status == BackupStatus::Corrupted)
            .map(|e| e.id.clone())
            .collect();

        let total_bytes: u64 = entries.iter().map(|e| e.metadata.total_bytes).sum();

        let mut advisories = Vec::new();
        let max_bytes = config.max_total_mb * 1024 * 1024;
        if total_bytes > max_bytes {
            advisories.push(format!(
                "store holds {} MB, over the {} MB limit; run `broom backup prune`",
                total_bytes / (1024 * 1024),
                config.max_total_mb
            ));
        }
        if entries.len() > config.max_backups as usize {
            advisories.push(format!(
                "store holds {} entries, over the limit of {}; run `broom backup prune`",
                entries.len(),
                config.max_backups
            ));
        }

        // An empty store means no restore point exists at all, which is
        // worse than any advisory.
        let health = if entries.is_empty() || !corrupted.is_empty() {
            StoreHealth::Critical
        } else if !advisories.is_empty() {
            StoreHealth::Warning
        } else {
            StoreHealth::Good
        };

        Ok(StoreReport {
            generated_at: Utc::now(),
            entry_count: entries.len(),
            total_bytes,
            kind_counts,
            corrupted,
            newest: entries.first().map(|e| e.created_at),
            oldest: entries.last().map(|e| e.created_at),
            advisories,
            health,
        })
    }
}

/// Ids that [`BackupStore::prune`] would remove, oldest first.
///
/// Pure so the CLI's dry-run and the prune itself share one decision.
/// `entries` must be sorted newest first, as [`BackupStore::list`]
/// returns them.
pub fn prune_candidates(
    entries: &[BackupEntry],
    days_to_keep: u32,
    now: DateTime<Utc>,
) -> Vec<String> {
    if entries.len() <= 1 {
        return Vec::new();
    }

    let cutoff = now - Duration::days(days_to_keep as i64);
    let mut ids: Vec<String> = entries[1..]
        .iter()
        .filter(|e| e.created_at < cutoff)
        .map(|e| e.id.clone())
        .collect();
    ids.reverse();
    ids
}
