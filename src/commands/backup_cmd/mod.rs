//! Implementations of the `broom backup` subcommands.
//!
//! - `create`: snapshot source files (or explicit paths) into the store
//! - `list`: show entries newest-first
//! - `report`: store totals, per-kind counts, corruption, advisories
//! - `verify`: recompute blob checksums; corruption is persisted
//! - `prune`: drop entries older than the retention window (newest is
//!   always kept), preview unless `--yes`

#[cfg(test)]
mod tests;

use crate::backup::{BackupEntry, BackupKind, BackupStore, ChangeKind, StoreReport, prune_candidates};
use crate::cli::{BackupCreateArgs, BackupPruneArgs, BackupReportArgs, BackupVerifyArgs};
use crate::config::Config;
use crate::context::{ProjectContext, require_initialized_project};
use crate::error::{BroomError, Result};
use crate::fs::{build_globset, walk_project};
use crate::locks;
use crate::report;
use chrono::Utc;
use std::path::PathBuf;

/// Execute the `broom backup create` command.
pub fn cmd_backup_create(args: BackupCreateArgs) -> Result<()> {
    let ctx = require_initialized_project()?;
    let config = Config::load_or_default(&ctx)?;

    let _lock = locks::acquire_run_lock(&ctx, "backup create")?;

    let files = if args.paths.is_empty() {
        source_file_targets(&ctx, &config)?
    } else {
        args.paths
            .iter()
            .map(|p| (PathBuf::from(p), ChangeKind::Modified))
            .collect()
    };

    let store = BackupStore::new(&ctx);
    let entry = store.create(
        BackupKind::Manual,
        &args.description,
        "backup create",
        &files,
    )?;

    println!("Created backup: {}", entry.id);
    println!("  Files:       {}", entry.file_count());
    println!("  Total bytes: {}", entry.metadata.total_bytes);
    println!("  Description: {}", entry.description);

    Ok(())
}

/// Every source file in the tree, as snapshot targets.
fn source_file_targets(
    ctx: &ProjectContext,
    config: &Config,
) -> Result<Vec<(PathBuf, ChangeKind)>> {
    let exclude = build_globset(&config.exclude_globs)?;
    Ok(walk_project(&ctx.project_root, &exclude)?
        .into_iter()
        .filter(|f| config.is_source_file(&f.rel))
        .map(|f| (f.path, ChangeKind::Modified))
        .collect())
}

/// Execute the `broom backup list` command.
pub fn cmd_backup_list() -> Result<()> {
    let ctx = require_initialized_project()?;
    let store = BackupStore::new(&ctx);

    let entries = store.list()?;
    if entries.is_empty() {
        println!("No backups. Run `broom backup create` to create one.");
        return Ok(());
    }

    println!("Backups ({}):", entries.len());
    println!();
    for entry in &entries {
        println!(
            "  {:22} {:19} {:15} {:10} {:>5} file(s) {:>10} bytes  {}",
            entry.id,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.kind.as_str(),
            entry.status.as_str(),
            entry.file_count(),
            entry.metadata.total_bytes,
            entry.description
        );
    }

    Ok(())
}

/// Execute the `broom backup report` command.
pub fn cmd_backup_report(args: BackupReportArgs) -> Result<()> {
    let ctx = require_initialized_project()?;
    let config = Config::load_or_default(&ctx)?;
    let store = BackupStore::new(&ctx);

    let entries = store.list()?;
    let store_report = store.store_report(&config)?;

    if args.format.is_some() || args.output.is_some() {
        let format = report::resolve_format(args.format.as_deref())?;
        let content = report::render_store_report(&store_report, &entries, format)?;
        if let Some(path) = report::write_report(&ctx, &content, args.output.as_deref())? {
            println!("Report written to: {}", path.display());
        }
        return Ok(());
    }

    print_store_report(&store_report, &entries);
    Ok(())
}

fn print_store_report(store_report: &StoreReport, entries: &[BackupEntry]) {
    println!("Backup store health: {}", store_report.health);
    println!("  Entries:     {}", store_report.entry_count);
    println!("  Total bytes: {}", store_report.total_bytes);
    if !store_report.kind_counts.is_empty() {
        let kinds: Vec<String> = store_report
            .kind_counts
            .iter()
            .map(|(kind, count)| format!("{}={}", kind, count))
            .collect();
        println!("  By kind:     {}", kinds.join(", "));
    }
    if let Some(newest) = store_report.newest {
        println!("  Newest:      {}", newest.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(oldest) = store_report.oldest {
        println!("  Oldest:      {}", oldest.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    if !store_report.corrupted.is_empty() {
        println!();
        println!("Corrupted entries:");
        for id in &store_report.corrupted {
            println!("  - {}", id);
        }
    }

    if !store_report.advisories.is_empty() {
        println!();
        println!("Advisories:");
        for advisory in &store_report.advisories {
            println!("  - {}", advisory);
        }
    }

    if entries.is_empty() {
        println!();
        println!("The store is empty: runs cannot roll back until a backup exists.");
    }
}

/// Execute the `broom backup verify` command.
pub fn cmd_backup_verify(args: BackupVerifyArgs) -> Result<()> {
    let ctx = require_initialized_project()?;
    let store = BackupStore::new(&ctx);

    let outcomes = store.verify_store(args.backup_id.as_deref())?;
    if outcomes.is_empty() {
        println!("No backups to verify.");
        return Ok(());
    }

    let mut failed = 0usize;
    for outcome in &outcomes {
        if outcome.ok {
            println!("  {:22} ok", outcome.backup_id);
        } else {
            failed += 1;
            println!("  {:22} CORRUPTED", outcome.backup_id);
            for problem in &outcome.problems {
                println!("    - {}", problem);
            }
        }
    }

    println!();
    if failed == 0 {
        println!("Verified {} backup(s): all checksums match.", outcomes.len());
        Ok(())
    } else {
        Err(BroomError::BackupError(format!(
            "verification failed for {} of {} backup(s)",
            failed,
            outcomes.len()
        )))
    }
}

/// Execute the `broom backup prune` command.
pub fn cmd_backup_prune(args: BackupPruneArgs) -> Result<()> {
    let ctx = require_initialized_project()?;
    let config = Config::load_or_default(&ctx)?;
    let store = BackupStore::new(&ctx);

    let days = args.days.unwrap_or(config.retention_days);

    if !args.yes {
        let entries = store.list()?;
        let candidates = prune_candidates(&entries, days, Utc::now());
        if candidates.is_empty() {
            println!(
                "Nothing to prune: no entries older than {} day(s) (the newest entry is always kept).",
                days
            );
            return Ok(());
        }

        println!("Would prune {} backup(s):", candidates.len());
        for id in &candidates {
            if let Some(entry) = entries.iter().find(|e| e.id == *id) {
                println!(
                    "  {:22} {} ({})",
                    entry.id,
                    entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.kind.as_str()
                );
            }
        }
        println!();
        println!("Dry-run mode: no changes made.");
        println!("Run with --yes to prune.");
        return Ok(());
    }

    let _lock = locks::acquire_run_lock(&ctx, "backup prune")?;

    let pruned = store.prune(days)?;
    if pruned.is_empty() {
        println!("Nothing to prune.");
    } else {
        println!("Pruned {} backup(s):", pruned.len());
        for id in &pruned {
            println!("  - {}", id);
        }
    }

    Ok(())
}
