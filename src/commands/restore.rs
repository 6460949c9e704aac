//! Implementation of the `broom restore` command.
//!
//! Restores files from a backup entry into the working tree.
//!
//! # Safety
//!
//! - Requires `--yes` because it overwrites working files
//! - Holds the run lock for the duration
//! - Takes a `rollback_point` snapshot of the files about to be
//!   overwritten, so the restore itself can be undone

use crate::backup::{BackupKind, BackupStore, ChangeKind};
use crate::cli::RestoreArgs;
use crate::context::require_initialized_project;
use crate::error::{BroomError, Result};
use crate::locks;
use std::path::PathBuf;

/// Execute the `broom restore` command.
pub fn cmd_restore(args: RestoreArgs) -> Result<()> {
    // Require --yes flag
    if !args.yes {
        return Err(BroomError::UserError(format!(
            "refusing to restore without --yes flag.\n\n\
             Restoring overwrites files in the working tree with snapshot contents.\n\n\
             To restore, run:\n  broom restore {} --yes",
            args.backup_id
        )));
    }

    let ctx = require_initialized_project()?;
    let _lock = locks::acquire_run_lock(&ctx, &format!("restore {}", args.backup_id))?;

    let store = BackupStore::new(&ctx);
    let entry = store.load(&args.backup_id)?;

    // Snapshot the current contents of the files we are about to
    // overwrite. Best-effort: a failed rollback point must not block a
    // restore the user explicitly asked for.
    let current: Vec<(PathBuf, ChangeKind)> = entry
        .files
        .iter()
        .filter(|f| selected(&f.path, &args.paths))
        .map(|f| ctx.project_root.join(&f.path))
        .filter(|p| p.is_file())
        .map(|p| (p, ChangeKind::Modified))
        .collect();
    let rollback_point_id = match store.create(
        BackupKind::RollbackPoint,
        &format!("before restore of {}", entry.id),
        &format!("restore {}", entry.id),
        &current,
    ) {
        Ok(point) => Some(point.id),
        Err(e) => {
            eprintln!("Warning: failed to create rollback point: {}", e);
            None
        }
    };

    let outcome = if args.paths.is_empty() {
        store.restore_full(&args.backup_id)?
    } else {
        store.restore_partial(&args.backup_id, &args.paths)?
    };

    println!("Restored from backup {}:", outcome.backup_id);
    println!("  Scope:    {}", outcome.scope);
    println!("  Restored: {} file(s)", outcome.files_restored);
    if outcome.files_skipped > 0 {
        println!("  Skipped:  {} file(s)", outcome.files_skipped);
    }
    if let Some(id) = &rollback_point_id {
        println!("  Undo:     broom restore {} --yes", id);
    }
    if !outcome.errors.is_empty() {
        println!("  Errors:");
        for error in &outcome.errors {
            println!("    - {}", error);
        }
    }

    if outcome.success {
        Ok(())
    } else {
        Err(BroomError::BackupError(format!(
            "restore from '{}' completed with {} error(s)",
            args.backup_id,
            outcome.errors.len()
        )))
    }
}

/// Whether a snapshot path falls under the requested path filters.
///
/// Mirrors the store's partial-restore selection: exact match or parent
/// directory.
fn selected(path: &str, filters: &[String]) -> bool {
    if filters.is_empty() {
        return true;
    }
    filters
        .iter()
        .map(|f| f.trim().trim_end_matches('/').replace('\\', "/"))
        .filter(|f| !f.is_empty())
        .any(|f| path == f || path.starts_with(&format!("{}/", f)))
}
