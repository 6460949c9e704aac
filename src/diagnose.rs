//! Deep diagnostics.
//!
//! Five diagnostic areas run concurrently on scoped threads, each
//! timed independently. A panicking area is reported as failed instead
//! of taking the whole command down.

use crate::analyze::{ScanOptions, Severity, scan_tree};
use crate::backup::{BackupStore, StoreHealth};
use crate::config::Config;
use crate::context::ProjectContext;
use crate::events::event_stats;
use crate::exec::panic_message;
use crate::fs::{build_globset, walk_project};
use crate::health::{HealthState, run_health_check};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Instant;

/// Verdict for one diagnostic area.
///
/// Ordered so that `max` picks the worst verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaStatus {
    Ok,
    Warn,
    Fail,
}

impl AreaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaStatus::Ok => "ok",
            AreaStatus::Warn => "warn",
            AreaStatus::Fail => "fail",
        }
    }
}

impl std::fmt::Display for AreaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One diagnosed area with its findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaReport {
    pub area: String,
    pub status: AreaStatus,
    pub findings: Vec<String>,
    pub elapsed_ms: u64,
}

/// Full diagnostics result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub generated_at: DateTime<Utc>,
    pub overall: AreaStatus,
    pub areas: Vec<AreaReport>,
}

impl DiagnosticsReport {
    pub fn area(&self, name: &str) -> Option<&AreaReport> {
        self.areas.iter().find(|a| a.area == name)
    }
}

/// The report is only as good as its worst area.
pub fn overall_status(areas: &[AreaReport]) -> AreaStatus {
    areas
        .iter()
        .map(|a| a.status)
        .max()
        .unwrap_or(AreaStatus::Ok)
}

/// Run all diagnostic areas and collect the verdict.
pub fn run_diagnostics(ctx: &ProjectContext, config: &Config) -> DiagnosticsReport {
    let areas = thread::scope(|s| {
        let handles = vec![
            ("analysis", s.spawn(|| timed("analysis", || diagnose_analysis(ctx, config)))),
            (
                "backup_store",
                s.spawn(|| timed("backup_store", || diagnose_backup_store(ctx, config))),
            ),
            ("health", s.spawn(|| timed("health", || diagnose_health(ctx)))),
            ("audit_log", s.spawn(|| timed("audit_log", || diagnose_audit_log(ctx)))),
            ("storage", s.spawn(|| timed("storage", || diagnose_storage(ctx, config)))),
        ];

        handles
            .into_iter()
            .map(|(name, handle)| match handle.join() {
                Ok(report) => report,
                Err(panic) => AreaReport {
                    area: name.to_string(),
                    status: AreaStatus::Fail,
                    findings: vec![format!(
                        "diagnostic panicked: {}",
                        panic_message(panic.as_ref())
                    )],
                    elapsed_ms: 0,
                },
            })
            .collect::<Vec<_>>()
    });

    DiagnosticsReport {
        generated_at: Utc::now(),
        overall: overall_status(&areas),
        areas,
    }
}

fn timed<F>(area: &str, f: F) -> AreaReport
where
    F: FnOnce() -> (AreaStatus, Vec<String>),
{
    let started = Instant::now();
    let (status, findings) = f();
    AreaReport {
        area: area.to_string(),
        status,
        findings,
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}

fn diagnose_analysis(ctx: &ProjectContext, config: &Config) -> (AreaStatus, Vec<String>) {
    let opts = ScanOptions {
        include_perf: true,
        include_duplicates: false,
        patterns: Vec::new(),
    };

    match scan_tree(&ctx.project_root, config, &opts) {
        Err(e) => (AreaStatus::Fail, vec![format!("scan failed: {}", e)]),
        Ok(report) => {
            let mut findings = vec![format!(
                "{} file(s) scanned in {} ms",
                report.files_scanned, report.elapsed_ms
            )];

            if report.issues.is_empty() && report.perf_issues.is_empty() {
                findings.push("no issues found".to_string());
                return (AreaStatus::Ok, findings);
            }

            findings.push(format!(
                "{} issue(s): {} high, {} medium, {} low",
                report.issues.len(),
                report.count_by_severity(Severity::High),
                report.count_by_severity(Severity::Medium),
                report.count_by_severity(Severity::Low),
            ));
            if !report.perf_issues.is_empty() {
                findings.push(format!(
                    "{} performance finding(s)",
                    report.perf_issues.len()
                ));
            }
            (AreaStatus::Warn, findings)
        }
    }
}

fn diagnose_backup_store(ctx: &ProjectContext, config: &Config) -> (AreaStatus, Vec<String>) {
    let store = BackupStore::new(ctx);
    match store.store_report(config) {
        Err(e) => (AreaStatus::Fail, vec![format!("store report failed: {}", e)]),
        Ok(report) => {
            let mut findings = vec![format!(
                "{} backup(s), {} byte(s) stored",
                report.entry_count, report.total_bytes
            )];
            if !report.corrupted.is_empty() {
                findings.push(format!("corrupted entries: {}", report.corrupted.join(", ")));
            }
            findings.extend(report.advisories.iter().cloned());
            if report.entry_count == 0 {
                findings.push("no safety net: runs cannot roll back".to_string());
            }

            let status = match report.health {
                StoreHealth::Good => AreaStatus::Ok,
                StoreHealth::Warning => AreaStatus::Warn,
                StoreHealth::Critical => AreaStatus::Fail,
            };
            (status, findings)
        }
    }
}

fn diagnose_health(ctx: &ProjectContext) -> (AreaStatus, Vec<String>) {
    match run_health_check(ctx) {
        Err(e) => (AreaStatus::Fail, vec![format!("health check failed: {}", e)]),
        Ok(report) => {
            let mut findings = Vec::new();
            for module in &report.modules {
                if module.state == HealthState::Healthy {
                    continue;
                }
                let worst = module
                    .probes
                    .iter()
                    .max_by_key(|p| p.state)
                    .map(|p| p.detail.as_str())
                    .unwrap_or("");
                findings.push(format!("{}: {} ({})", module.id, module.state, worst));
            }
            if findings.is_empty() {
                findings.push(format!("{} module(s) healthy", report.modules.len()));
            }

            let status = match report.overall {
                HealthState::Healthy => AreaStatus::Ok,
                HealthState::Degraded => AreaStatus::Warn,
                HealthState::Unhealthy => AreaStatus::Fail,
            };
            (status, findings)
        }
    }
}

fn diagnose_audit_log(ctx: &ProjectContext) -> (AreaStatus, Vec<String>) {
    match event_stats(ctx) {
        Err(e) => (AreaStatus::Fail, vec![format!("event log unreadable: {}", e)]),
        Ok(stats) => {
            let mut findings = Vec::new();
            if stats.total == 0 {
                findings.push("no events recorded yet".to_string());
                return (AreaStatus::Ok, findings);
            }

            findings.push(format!("{} event(s) recorded", stats.total));
            if let (Some(first), Some(last)) = (stats.first_ts, stats.last_ts) {
                findings.push(format!(
                    "first {} / last {}",
                    first.format("%Y-%m-%d %H:%M:%S"),
                    last.format("%Y-%m-%d %H:%M:%S")
                ));
            }
            if stats.malformed > 0 {
                findings.push(format!("{} malformed line(s)", stats.malformed));
                return (AreaStatus::Warn, findings);
            }
            (AreaStatus::Ok, findings)
        }
    }
}

fn diagnose_storage(ctx: &ProjectContext, config: &Config) -> (AreaStatus, Vec<String>) {
    let walked = build_globset(&config.exclude_globs)
        .and_then(|exclude| walk_project(&ctx.project_root, &exclude));
    let files = match walked {
        Ok(files) => files,
        Err(e) => return (AreaStatus::Fail, vec![format!("walk failed: {}", e)]),
    };

    let tree_bytes: u64 = files.iter().map(|f| f.size).sum();
    let mut findings = vec![format!(
        "{} file(s), {} byte(s) in the tree",
        files.len(),
        tree_bytes
    )];

    if let Some(largest) = files.iter().max_by_key(|f| f.size) {
        findings.push(format!(
            "largest file: {} ({} bytes)",
            largest.rel_str(),
            largest.size
        ));
    }

    let backup_bytes = dir_size(&ctx.backups_dir);
    findings.push(format!("backup store: {} byte(s) on disk", backup_bytes));

    let limit_bytes = config.max_total_mb * 1024 * 1024;
    if backup_bytes > limit_bytes {
        findings.push(format!(
            "backup store exceeds the {} MB limit, run `broom backup prune`",
            config.max_total_mb
        ));
        return (AreaStatus::Warn, findings);
    }

    (AreaStatus::Ok, findings)
}

fn dir_size(dir: &Path) -> u64 {
    let mut total = 0;
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            total += dir_size(&path);
        } else if let Ok(meta) = entry.metadata() {
            total += meta.len();
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::{BackupKind, ChangeKind};
    use crate::test_support::{create_test_project, write_file};

    fn area(name: &str, status: AreaStatus) -> AreaReport {
        AreaReport {
            area: name.to_string(),
            status,
            findings: vec![],
            elapsed_ms: 0,
        }
    }

    #[test]
    fn test_overall_status_is_worst_area() {
        assert_eq!(overall_status(&[]), AreaStatus::Ok);
        assert_eq!(
            overall_status(&[area("a", AreaStatus::Ok), area("b", AreaStatus::Warn)]),
            AreaStatus::Warn
        );
        assert_eq!(
            overall_status(&[
                area("a", AreaStatus::Warn),
                area("b", AreaStatus::Fail),
                area("c", AreaStatus::Ok)
            ]),
            AreaStatus::Fail
        );
    }

    #[test]
    fn test_diagnostics_on_fresh_project() {
        let (temp, ctx) = create_test_project();
        write_file(temp.path(), "src/main.rs", "fn main() {}\n");

        let config = Config::default();
        let report = run_diagnostics(&ctx, &config);

        let names: Vec<&str> = report.areas.iter().map(|a| a.area.as_str()).collect();
        assert_eq!(
            names,
            vec!["analysis", "backup_store", "health", "audit_log", "storage"]
        );

        // An empty backup store means no rollback safety net
        assert_eq!(report.area("backup_store").unwrap().status, AreaStatus::Fail);
        assert_eq!(report.overall, AreaStatus::Fail);

        assert_eq!(report.area("analysis").unwrap().status, AreaStatus::Ok);
        assert_eq!(report.area("health").unwrap().status, AreaStatus::Ok);
        assert_eq!(report.area("audit_log").unwrap().status, AreaStatus::Ok);
        assert_eq!(report.area("storage").unwrap().status, AreaStatus::Ok);
    }

    #[test]
    fn test_diagnostics_with_backup_is_ok() {
        let (temp, ctx) = create_test_project();
        let file = write_file(temp.path(), "src/main.rs", "fn main() {}\n");

        let store = BackupStore::new(&ctx);
        store
            .create(
                BackupKind::Manual,
                "baseline",
                "backup create",
                &[(file, ChangeKind::Modified)],
            )
            .unwrap();

        let config = Config::default();
        let report = run_diagnostics(&ctx, &config);

        assert_eq!(report.overall, AreaStatus::Ok);
        assert_eq!(report.area("backup_store").unwrap().status, AreaStatus::Ok);
    }

    #[test]
    fn test_analysis_area_warns_on_issues() {
        let (temp, ctx) = create_test_project();
        write_file(
            temp.path(),
            "src/app.js",
            "function f() {\n  console.log('debug');\n}\n",
        );

        let config = Config::default();
        let report = run_diagnostics(&ctx, &config);

        let analysis = report.area("analysis").unwrap();
        assert_eq!(analysis.status, AreaStatus::Warn);
        assert!(analysis.findings.iter().any(|f| f.contains("issue")));
    }
}
