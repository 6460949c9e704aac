use super::*;
use crate::backup::{BackupKind, BackupStore, ChangeKind};
use crate::locks::{LockMetadata, acquire_run_lock};
use crate::test_support::{create_test_project, write_file};
use std::fs;

fn module(id: &str, tier: Tier, state: HealthState) -> ModuleHealth {
    ModuleHealth {
        id: id.to_string(),
        name: id.to_string(),
        tier,
        state,
        probes: vec![],
    }
}

#[test]
fn test_aggregate_module_worst_probe_wins() {
    let probes = vec![
        ProbeResult::healthy("a", ""),
        ProbeResult::degraded("b", ""),
        ProbeResult::healthy("c", ""),
    ];
    assert_eq!(aggregate_module(&probes), HealthState::Degraded);

    let probes = vec![ProbeResult::degraded("a", ""), ProbeResult::unhealthy("b", "")];
    assert_eq!(aggregate_module(&probes), HealthState::Unhealthy);

    assert_eq!(aggregate_module(&[]), HealthState::Healthy);
}

#[test]
fn test_overall_unhealthy_critical_dominates() {
    let modules = vec![
        module("a", Tier::Critical, HealthState::Unhealthy),
        module("b", Tier::High, HealthState::Healthy),
    ];
    assert_eq!(aggregate_overall(&modules), HealthState::Unhealthy);
}

#[test]
fn test_overall_degraded_cases() {
    let modules = vec![
        module("a", Tier::Critical, HealthState::Degraded),
        module("b", Tier::High, HealthState::Healthy),
    ];
    assert_eq!(aggregate_overall(&modules), HealthState::Degraded);

    let modules = vec![
        module("a", Tier::Critical, HealthState::Healthy),
        module("b", Tier::High, HealthState::Unhealthy),
        module("c", Tier::High, HealthState::Unhealthy),
    ];
    assert_eq!(aggregate_overall(&modules), HealthState::Degraded);
}

#[test]
fn test_overall_tolerates_single_high_tier_failure() {
    // One unhealthy high-tier module is not enough to change the verdict
    let modules = vec![
        module("a", Tier::Critical, HealthState::Healthy),
        module("b", Tier::High, HealthState::Unhealthy),
        module("c", Tier::Medium, HealthState::Unhealthy),
        module("d", Tier::Low, HealthState::Unhealthy),
    ];
    assert_eq!(aggregate_overall(&modules), HealthState::Healthy);
}

#[test]
fn test_health_check_on_fresh_project() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "src/main.rs", "fn main() {}\n");

    let report = run_health_check(&ctx).unwrap();

    assert_eq!(report.overall, HealthState::Healthy);
    let ids: Vec<&str> = report.modules.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["state_store", "backup_store", "executor", "audit_log", "analyzer"]
    );
    assert!(report.modules.iter().all(|m| m.state == HealthState::Healthy));
}

#[test]
fn test_missing_state_dirs_and_repair() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "src/main.rs", "fn main() {}\n");
    fs::remove_dir_all(&ctx.backups_dir).unwrap();

    let report = run_health_check(&ctx).unwrap();
    assert_eq!(report.overall, HealthState::Unhealthy);
    let state_store = report.module("state_store").unwrap();
    assert_eq!(state_store.state, HealthState::Unhealthy);

    let repairs = apply_repairs(&ctx).unwrap();
    assert_eq!(repairs.len(), 1);
    assert!(repairs[0].contains("backups"));
    assert!(ctx.backups_dir.is_dir());

    let report = run_health_check(&ctx).unwrap();
    assert_eq!(report.overall, HealthState::Healthy);
}

#[test]
fn test_repair_is_a_noop_when_layout_is_intact() {
    let (_temp, ctx) = create_test_project();
    assert!(apply_repairs(&ctx).unwrap().is_empty());
}

#[test]
fn test_corrupted_backup_flags_store() {
    let (temp, ctx) = create_test_project();
    let file = write_file(temp.path(), "src/main.rs", "fn main() {}\n");

    let store = BackupStore::new(&ctx);
    let entry = store
        .create(
            BackupKind::Manual,
            "test",
            "backup create",
            &[(file, ChangeKind::Modified)],
        )
        .unwrap();

    // Tamper with the blob, then verify so the corruption is persisted
    let checksum = &entry.files[0].checksum;
    fs::write(store.blob_path(&entry.id, checksum), b"tampered").unwrap();
    store.verify_store(Some(&entry.id)).unwrap();

    let report = run_health_check(&ctx).unwrap();
    let backup_store = report.module("backup_store").unwrap();
    assert_eq!(backup_store.state, HealthState::Unhealthy);
    assert_eq!(report.overall, HealthState::Unhealthy);
}

#[test]
fn test_fresh_lock_degrades_executor() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "src/main.rs", "fn main() {}\n");

    let guard = acquire_run_lock(&ctx, "run quick_cleanup").unwrap();
    let report = run_health_check(&ctx).unwrap();
    drop(guard);

    let executor = report.module("executor").unwrap();
    assert_eq!(executor.state, HealthState::Degraded);
}

#[test]
fn test_stale_lock_is_unhealthy() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "src/main.rs", "fn main() {}\n");

    // A lock well past the default 120-minute threshold
    let metadata = LockMetadata {
        owner: "user@host".to_string(),
        pid: Some(1234),
        created_at: chrono::Utc::now() - chrono::Duration::minutes(200),
        action: "run quick_cleanup".to_string(),
    };
    fs::write(ctx.run_lock_path(), metadata.to_json().unwrap()).unwrap();

    let report = run_health_check(&ctx).unwrap();

    let executor = report.module("executor").unwrap();
    assert_eq!(executor.state, HealthState::Unhealthy);
    // A single unhealthy high-tier module leaves the verdict alone
    assert_eq!(report.overall, HealthState::Healthy);
}

#[test]
fn test_malformed_event_lines_degrade_audit_log() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "src/main.rs", "fn main() {}\n");

    fs::write(ctx.events_file(), "{not json}\n").unwrap();

    let report = run_health_check(&ctx).unwrap();
    let audit = report.module("audit_log").unwrap();
    assert_eq!(audit.state, HealthState::Degraded);
    assert!(audit.probes[0].detail.contains("malformed"));
}

#[test]
fn test_empty_tree_degrades_analyzer_only() {
    let (_temp, ctx) = create_test_project();

    let report = run_health_check(&ctx).unwrap();
    let analyzer = report.module("analyzer").unwrap();
    assert_eq!(analyzer.state, HealthState::Degraded);
    // Medium tier never changes the overall verdict
    assert_eq!(report.overall, HealthState::Healthy);
}
