//! Individual subsystem probes.
//!
//! Probes never return errors: anything that fails becomes a degraded
//! or unhealthy result with the failure in the detail text.

use super::{ModuleHealth, ProbeResult, Tier};
use crate::analyze::CheckSet;
use crate::backup::{BackupStatus, BackupStore};
use crate::config::Config;
use crate::context::ProjectContext;
use crate::events::read_events;
use crate::fs::{build_globset, walk_project};
use crate::hash::hash_file;
use crate::locks::run_lock_info;
use crate::plan::{builtin_plans, validate_plan};
use std::fs;

pub(super) fn probe_state_store(ctx: &ProjectContext) -> ModuleHealth {
    let mut probes = Vec::new();

    let mut missing: Vec<&str> = Vec::new();
    if !ctx.state_dir.is_dir() {
        missing.push(".broom");
    }
    if !ctx.backups_dir.is_dir() {
        missing.push("backups");
    }
    if !ctx.locks_dir.is_dir() {
        missing.push("locks");
    }
    probes.push(if missing.is_empty() {
        ProbeResult::healthy("state_dirs", "state layout present")
    } else {
        ProbeResult::unhealthy(
            "state_dirs",
            format!(
                "missing: {}. Run `broom health --repair --force` to recreate.",
                missing.join(", ")
            ),
        )
    });

    let config_path = ctx.config_path();
    probes.push(if !config_path.exists() {
        ProbeResult::healthy("config", "no config file, defaults in use")
    } else {
        match Config::load(&config_path) {
            Ok(_) => ProbeResult::healthy("config", "config parses and validates"),
            Err(e) => ProbeResult::unhealthy("config", e.to_string()),
        }
    });

    let reports_dir = ctx.reports_dir();
    probes.push(if !reports_dir.is_dir() {
        ProbeResult::degraded("reports_writable", "reports directory missing")
    } else {
        let probe_path = reports_dir.join(".write-probe");
        match fs::write(&probe_path, b"probe").and_then(|_| fs::remove_file(&probe_path)) {
            Ok(()) => ProbeResult::healthy("reports_writable", "reports directory is writable"),
            Err(e) => {
                ProbeResult::degraded("reports_writable", format!("cannot write reports: {}", e))
            }
        }
    });

    ModuleHealth::new("state_store", "State store", Tier::Critical, probes)
}

pub(super) fn probe_backup_store(ctx: &ProjectContext) -> ModuleHealth {
    let store = BackupStore::new(ctx);
    let mut probes = Vec::new();

    match store.list() {
        Err(e) => probes.push(ProbeResult::unhealthy("manifests", e.to_string())),
        Ok(entries) if entries.is_empty() => {
            probes.push(ProbeResult::healthy("manifests", "store is empty"));
        }
        Ok(entries) => {
            let corrupted: Vec<&str> = entries
                .iter()
                .filter(|e| e.status == BackupStatus::Corrupted)
                .map(|e| e.id.as_str())
                .collect();
            probes.push(if corrupted.is_empty() {
                ProbeResult::healthy("manifests", format!("{} backup(s) readable", entries.len()))
            } else {
                ProbeResult::unhealthy(
                    "manifests",
                    format!("corrupted entries: {}", corrupted.join(", ")),
                )
            });

            // Spot-check a few blobs of the newest entry rather than
            // re-hashing the whole store
            let newest = &entries[0];
            let mut problems = Vec::new();
            let mut checked = 0;
            for file in newest.files.iter().take(3) {
                checked += 1;
                let blob = store.blob_path(&newest.id, &file.checksum);
                match hash_file(&blob) {
                    Ok(h) if h == file.checksum => {}
                    Ok(_) => problems.push(format!("{}: checksum mismatch", file.path)),
                    Err(_) => problems.push(format!("{}: blob unreadable", file.path)),
                }
            }
            probes.push(if problems.is_empty() {
                ProbeResult::healthy(
                    "blob_spot_check",
                    format!("{} blob(s) of {} verified", checked, newest.id),
                )
            } else {
                ProbeResult::unhealthy("blob_spot_check", problems.join("; "))
            });
        }
    }

    ModuleHealth::new("backup_store", "Backup store", Tier::Critical, probes)
}

pub(super) fn probe_executor(ctx: &ProjectContext) -> ModuleHealth {
    let mut probes = Vec::new();

    let plans = builtin_plans();
    let invalid: Vec<String> = plans
        .iter()
        .filter_map(|p| validate_plan(p).err().map(|e| format!("{}: {}", p.id, e)))
        .collect();
    probes.push(if invalid.is_empty() {
        ProbeResult::healthy("plans", format!("{} built-in plan(s) valid", plans.len()))
    } else {
        ProbeResult::unhealthy("plans", invalid.join("; "))
    });

    let config = Config::load_or_default(ctx).unwrap_or_default();
    probes.push(match run_lock_info(ctx, &config) {
        Ok(None) => ProbeResult::healthy("run_lock", "no run in progress"),
        Ok(Some(info)) if info.is_stale => ProbeResult::unhealthy(
            "run_lock",
            format!(
                "stale lock held by {} for {}. Clear with `broom lock clear --force`.",
                info.metadata.owner,
                info.metadata.age_string()
            ),
        ),
        Ok(Some(info)) => ProbeResult::degraded(
            "run_lock",
            format!(
                "run in progress: {} ({} old)",
                info.metadata.action,
                info.metadata.age_string()
            ),
        ),
        Err(e) => ProbeResult::degraded("run_lock", e.to_string()),
    });

    ModuleHealth::new("executor", "Plan executor", Tier::High, probes)
}

pub(super) fn probe_audit_log(ctx: &ProjectContext) -> ModuleHealth {
    let mut probes = Vec::new();

    if !ctx.events_file().exists() {
        probes.push(ProbeResult::healthy("event_log", "no events recorded yet"));
    } else {
        probes.push(match read_events(ctx) {
            Ok((events, 0)) => {
                ProbeResult::healthy("event_log", format!("{} event(s)", events.len()))
            }
            Ok((events, malformed)) => ProbeResult::degraded(
                "event_log",
                format!(
                    "{} malformed line(s) out of {}",
                    malformed,
                    events.len() + malformed
                ),
            ),
            Err(e) => ProbeResult::unhealthy("event_log", e.to_string()),
        });
    }

    ModuleHealth::new("audit_log", "Audit log", Tier::High, probes)
}

pub(super) fn probe_analyzer(ctx: &ProjectContext) -> ModuleHealth {
    let config = Config::load_or_default(ctx).unwrap_or_default();
    let mut probes = Vec::new();

    probes.push(match CheckSet::compile(&config) {
        Ok(_) => ProbeResult::healthy("patterns", "analysis patterns compile"),
        Err(e) => ProbeResult::unhealthy("patterns", e.to_string()),
    });

    let globs =
        build_globset(&config.exclude_globs).and_then(|_| build_globset(&config.junk_globs));
    probes.push(match globs {
        Ok(_) => ProbeResult::healthy("globs", "exclude and junk globs compile"),
        Err(e) => ProbeResult::unhealthy("globs", e.to_string()),
    });

    let tree = build_globset(&config.exclude_globs)
        .and_then(|exclude| walk_project(&ctx.project_root, &exclude));
    probes.push(match tree {
        Ok(files) => {
            let sources = files
                .iter()
                .filter(|f| config.is_source_file(&f.path))
                .count();
            if sources == 0 {
                ProbeResult::degraded("source_tree", "no source files found")
            } else {
                ProbeResult::healthy("source_tree", format!("{} source file(s) visible", sources))
            }
        }
        Err(e) => ProbeResult::unhealthy("source_tree", e.to_string()),
    });

    ModuleHealth::new("analyzer", "Analyzer", Tier::Medium, probes)
}
