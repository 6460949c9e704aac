//! Tests for the `backup` subcommands.

use super::*;
use crate::exit_codes;
use crate::test_support::{DirGuard, create_test_project, write_file};
use serial_test::serial;
use std::fs;

fn create_args(description: &str, paths: Vec<String>) -> BackupCreateArgs {
    BackupCreateArgs {
        description: description.to_string(),
        paths,
    }
}

#[test]
#[serial]
fn test_create_snapshots_all_source_files_by_default() {
    let (temp_dir, ctx) = create_test_project();
    let _guard = DirGuard::new(temp_dir.path());

    write_file(temp_dir.path(), "src/main.rs", "fn main() {}\n");
    write_file(temp_dir.path(), "notes.txt", "not a source file\n");

    cmd_backup_create(create_args("manual snapshot", vec![])).unwrap();

    let store = BackupStore::new(&ctx);
    let entries = store.list().unwrap();
    assert_eq!(entries.len(), 1);

    let entry = &entries[0];
    assert_eq!(entry.kind, BackupKind::Manual);
    assert_eq!(entry.file_count(), 1);
    assert_eq!(entry.files[0].path, "src/main.rs");
    assert!(!ctx.run_lock_path().exists());
}

#[test]
#[serial]
fn test_create_with_explicit_paths() {
    let (temp_dir, ctx) = create_test_project();
    let _guard = DirGuard::new(temp_dir.path());

    write_file(temp_dir.path(), "a.rs", "fn a() {}\n");
    write_file(temp_dir.path(), "b.rs", "fn b() {}\n");

    cmd_backup_create(create_args("just a", vec!["a.rs".to_string()])).unwrap();

    let store = BackupStore::new(&ctx);
    let entry = &store.list().unwrap()[0];
    assert_eq!(entry.file_count(), 1);
    assert_eq!(entry.files[0].path, "a.rs");
    assert_eq!(entry.description, "just a");
}

#[test]
#[serial]
fn test_create_rejects_traversal_and_releases_lock() {
    let (temp_dir, ctx) = create_test_project();
    let _guard = DirGuard::new(temp_dir.path());

    let result = cmd_backup_create(create_args("bad", vec!["../escape.rs".to_string()]));
    assert!(result.is_err());
    assert_eq!(result.unwrap_err().exit_code(), exit_codes::BACKUP_FAILURE);

    // Failure must not leave the lock or a partial entry behind.
    assert!(!ctx.run_lock_path().exists());
    assert_eq!(fs::read_dir(&ctx.backups_dir).unwrap().count(), 0);
}

#[test]
#[serial]
fn test_list_empty_store() {
    let (temp_dir, _ctx) = create_test_project();
    let _guard = DirGuard::new(temp_dir.path());

    assert!(cmd_backup_list().is_ok());
}

#[test]
#[serial]
fn test_verify_detects_tampered_blob() {
    let (temp_dir, ctx) = create_test_project();
    let _guard = DirGuard::new(temp_dir.path());

    write_file(temp_dir.path(), "src/main.rs", "fn main() {}\n");
    cmd_backup_create(create_args("manual snapshot", vec![])).unwrap();

    let store = BackupStore::new(&ctx);
    let entry = &store.list().unwrap()[0];
    let blob = store.blob_path(&entry.id, &entry.files[0].checksum);
    fs::write(&blob, b"tampered").unwrap();

    let result = cmd_backup_verify(BackupVerifyArgs { backup_id: None });
    assert!(result.is_err());
    assert_eq!(result.unwrap_err().exit_code(), exit_codes::BACKUP_FAILURE);

    // Corruption is persisted in the manifest.
    let reloaded = &store.list().unwrap()[0];
    assert_eq!(reloaded.status, crate::backup::BackupStatus::Corrupted);
}

#[test]
#[serial]
fn test_verify_clean_store_passes() {
    let (temp_dir, _ctx) = create_test_project();
    let _guard = DirGuard::new(temp_dir.path());

    write_file(temp_dir.path(), "src/main.rs", "fn main() {}\n");
    cmd_backup_create(create_args("manual snapshot", vec![])).unwrap();

    assert!(cmd_backup_verify(BackupVerifyArgs { backup_id: None }).is_ok());
}

#[test]
#[serial]
fn test_prune_dry_run_removes_nothing() {
    let (temp_dir, ctx) = create_test_project();
    let _guard = DirGuard::new(temp_dir.path());

    write_file(temp_dir.path(), "src/main.rs", "fn main() {}\n");
    cmd_backup_create(create_args("manual snapshot", vec![])).unwrap();

    let args = BackupPruneArgs {
        days: Some(0),
        yes: false,
    };
    cmd_backup_prune(args).unwrap();

    let store = BackupStore::new(&ctx);
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
#[serial]
fn test_prune_removes_old_entries_but_keeps_newest() {
    let (temp_dir, ctx) = create_test_project();
    let _guard = DirGuard::new(temp_dir.path());

    write_file(temp_dir.path(), "src/main.rs", "fn main() {}\n");
    cmd_backup_create(create_args("first", vec![])).unwrap();
    cmd_backup_create(create_args("second", vec![])).unwrap();

    let store = BackupStore::new(&ctx);
    let entries = store.list().unwrap();
    assert_eq!(entries.len(), 2);

    // Backdate the older entry past any retention window.
    let old_id = entries[1].id.clone();
    let manifest_path = ctx.backup_dir(&old_id).join("manifest.json");
    let mut manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
    manifest["created_at"] = serde_json::json!("2020-01-01T00:00:00Z");
    fs::write(&manifest_path, serde_json::to_string(&manifest).unwrap()).unwrap();

    let args = BackupPruneArgs {
        days: Some(7),
        yes: true,
    };
    cmd_backup_prune(args).unwrap();

    let remaining = store.list().unwrap();
    assert_eq!(remaining.len(), 1);
    assert!(remaining.iter().all(|e| e.id != old_id));
}

#[test]
#[serial]
fn test_report_empty_store_is_critical() {
    let (temp_dir, _ctx) = create_test_project();
    let _guard = DirGuard::new(temp_dir.path());

    let args = BackupReportArgs {
        format: Some("json".to_string()),
        output: Some("store.json".to_string()),
    };
    cmd_backup_report(args).unwrap();

    let json: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(temp_dir.path().join(".broom/reports/store.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(json["health"], "critical");
    assert_eq!(json["entry_count"], 0);
}
