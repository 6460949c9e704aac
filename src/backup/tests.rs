use super::*;
use crate::config::Config;
use crate::test_support::{create_test_project, write_file};
use chrono::{Duration, Utc};
use std::fs;
use std::path::PathBuf;

fn paths(files: &[(&str, ChangeKind)], root: &std::path::Path) -> Vec<(PathBuf, ChangeKind)> {
    files
        .iter()
        .map(|(rel, change)| (root.join(rel), *change))
        .collect()
}

#[test]
fn test_create_snapshot_dedupes_blobs() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "src/a.rs", "shared content\n");
    write_file(temp.path(), "src/b.rs", "shared content\n");
    write_file(temp.path(), "src/c.rs", "unique content\n");

    let store = BackupStore::new(&ctx);
    let files = paths(
        &[
            ("src/a.rs", ChangeKind::Modified),
            ("src/b.rs", ChangeKind::Modified),
            ("src/c.rs", ChangeKind::Modified),
        ],
        temp.path(),
    );
    let entry = store.create(BackupKind::Manual, "test", "backup", &files).unwrap();

    assert_eq!(entry.status, BackupStatus::Completed);
    assert_eq!(entry.file_count(), 3);
    assert_eq!(entry.metadata.total_bytes, 45);
    assert!(!entry.metadata.entry_checksum.is_empty());

    // a and b share content, so only two blobs exist on disk
    let blobs: Vec<_> = fs::read_dir(ctx.backup_dir(&entry.id).join("blobs"))
        .unwrap()
        .collect();
    assert_eq!(blobs.len(), 2);

    // Manifest round-trips
    let loaded = store.load(&entry.id).unwrap();
    assert_eq!(loaded.files.len(), 3);
    assert_eq!(loaded.metadata.entry_checksum, entry.metadata.entry_checksum);
}

#[test]
fn test_create_sorts_files_by_path() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "z.rs", "zz\n");
    write_file(temp.path(), "a.rs", "aa\n");

    let store = BackupStore::new(&ctx);
    let files = paths(&[("z.rs", ChangeKind::Modified), ("a.rs", ChangeKind::Modified)], temp.path());
    let entry = store.create(BackupKind::Manual, "t", "backup", &files).unwrap();

    let names: Vec<&str> = entry.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(names, vec!["a.rs", "z.rs"]);
}

#[test]
fn test_create_rejects_paths_outside_project() {
    let (temp, ctx) = create_test_project();
    let store = BackupStore::new(&ctx);

    let outside = temp.path().join("..").join("outside.txt");
    let result = store.create(
        BackupKind::Manual,
        "t",
        "backup",
        &[(outside, ChangeKind::Modified)],
    );

    assert!(matches!(result, Err(crate::error::BroomError::BackupError(_))));

    // The partial entry directory was cleaned up
    let leftover: Vec<_> = fs::read_dir(&ctx.backups_dir).unwrap().collect();
    assert!(leftover.is_empty());
}

#[test]
fn test_create_with_empty_file_list() {
    let (_temp, ctx) = create_test_project();
    let store = BackupStore::new(&ctx);

    let entry = store.create(BackupKind::PreRun, "nothing to protect", "run", &[]).unwrap();
    assert_eq!(entry.file_count(), 0);
    assert_eq!(entry.metadata.total_bytes, 0);

    let outcome = store.restore_full(&entry.id).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.files_restored, 0);
}

#[test]
fn test_load_unknown_id() {
    let (_temp, ctx) = create_test_project();
    let store = BackupStore::new(&ctx);

    let err = store.load("b-20990101-000000").unwrap_err();
    assert!(err.to_string().contains("backup not found"));
    assert!(err.to_string().contains("broom backup list"));
}

#[test]
fn test_load_rejects_malformed_id() {
    let (_temp, ctx) = create_test_project();
    let store = BackupStore::new(&ctx);

    assert!(store.load("latest").is_err());
    assert!(store.load("../escape").is_err());
}

#[test]
fn test_list_newest_first() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "f.rs", "content\n");
    let store = BackupStore::new(&ctx);
    let files = paths(&[("f.rs", ChangeKind::Modified)], temp.path());

    let first = store.create(BackupKind::Manual, "first", "backup", &files).unwrap();
    let second = store.create(BackupKind::Manual, "second", "backup", &files).unwrap();

    let entries = store.list().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, second.id);
    assert_eq!(entries[1].id, first.id);
}

#[test]
fn test_list_skips_unreadable_manifest() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "f.rs", "content\n");
    let store = BackupStore::new(&ctx);
    let files = paths(&[("f.rs", ChangeKind::Modified)], temp.path());
    store.create(BackupKind::Manual, "ok", "backup", &files).unwrap();

    // A directory with a garbage manifest must not break listing
    let bad_dir = ctx.backups_dir.join("b-20200101-000000");
    fs::create_dir_all(&bad_dir).unwrap();
    fs::write(bad_dir.join("manifest.json"), "not json").unwrap();

    let entries = store.list().unwrap();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_restore_full_roundtrip() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "src/a.rs", "original a\n");
    write_file(temp.path(), "src/b.rs", "original b\n");

    let store = BackupStore::new(&ctx);
    let files = paths(
        &[("src/a.rs", ChangeKind::Modified), ("src/b.rs", ChangeKind::Deleted)],
        temp.path(),
    );
    let entry = store.create(BackupKind::PreRun, "before run", "run", &files).unwrap();

    // Simulate the protected operation: one rewrite, one delete
    write_file(temp.path(), "src/a.rs", "mangled\n");
    fs::remove_file(temp.path().join("src/b.rs")).unwrap();

    let outcome = store.restore_full(&entry.id).unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.files_restored, 2);
    assert_eq!(outcome.files_skipped, 0);
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.scope, RestoreScope::Full);
    assert!(outcome.rollback_id.starts_with("r-"));

    assert_eq!(fs::read_to_string(temp.path().join("src/a.rs")).unwrap(), "original a\n");
    assert_eq!(fs::read_to_string(temp.path().join("src/b.rs")).unwrap(), "original b\n");

    // Full successful restore flips the entry status
    let reloaded = store.load(&entry.id).unwrap();
    assert_eq!(reloaded.status, BackupStatus::Restored);
}

#[test]
fn test_restore_partial_by_directory() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "src/a.rs", "original a\n");
    write_file(temp.path(), "docs/readme.md", "original docs\n");

    let store = BackupStore::new(&ctx);
    let files = paths(
        &[("src/a.rs", ChangeKind::Modified), ("docs/readme.md", ChangeKind::Modified)],
        temp.path(),
    );
    let entry = store.create(BackupKind::Manual, "t", "backup", &files).unwrap();

    write_file(temp.path(), "src/a.rs", "mangled\n");
    write_file(temp.path(), "docs/readme.md", "mangled\n");

    let outcome = store.restore_partial(&entry.id, &["src".to_string()]).unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.files_restored, 1);
    assert_eq!(outcome.scope, RestoreScope::Partial);
    assert_eq!(fs::read_to_string(temp.path().join("src/a.rs")).unwrap(), "original a\n");
    // Unselected file stays mangled
    assert_eq!(fs::read_to_string(temp.path().join("docs/readme.md")).unwrap(), "mangled\n");

    // Partial restores never flip the status
    assert_eq!(store.load(&entry.id).unwrap().status, BackupStatus::Completed);
}

#[test]
fn test_restore_partial_no_matches_succeeds() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "src/a.rs", "content\n");

    let store = BackupStore::new(&ctx);
    let files = paths(&[("src/a.rs", ChangeKind::Modified)], temp.path());
    let entry = store.create(BackupKind::Manual, "t", "backup", &files).unwrap();

    let outcome = store.restore_partial(&entry.id, &["no/such/path".to_string()]).unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.files_restored, 0);
    assert!(outcome.errors.is_empty());
}

#[test]
fn test_restore_accumulates_per_file_errors() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "good.rs", "good content\n");
    write_file(temp.path(), "bad.rs", "bad content\n");

    let store = BackupStore::new(&ctx);
    let files = paths(
        &[("good.rs", ChangeKind::Modified), ("bad.rs", ChangeKind::Modified)],
        temp.path(),
    );
    let entry = store.create(BackupKind::Manual, "t", "backup", &files).unwrap();

    // Tamper with one blob
    let bad_checksum = &entry.files.iter().find(|f| f.path == "bad.rs").unwrap().checksum;
    fs::write(store.blob_path(&entry.id, bad_checksum), "tampered").unwrap();

    write_file(temp.path(), "good.rs", "mangled\n");
    write_file(temp.path(), "bad.rs", "mangled\n");

    let outcome = store.restore_full(&entry.id).unwrap();

    // The good file was still restored despite the bad one
    assert!(!outcome.success);
    assert_eq!(outcome.files_restored, 1);
    assert_eq!(outcome.files_skipped, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].contains("bad.rs"));
    assert!(outcome.errors[0].contains("checksum mismatch"));
    assert_eq!(fs::read_to_string(temp.path().join("good.rs")).unwrap(), "good content\n");

    // Failed full restore does not flip the status to restored
    assert_ne!(store.load(&entry.id).unwrap().status, BackupStatus::Restored);
}

#[test]
fn test_verify_detects_tampered_blob() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "f.rs", "content\n");

    let store = BackupStore::new(&ctx);
    let files = paths(&[("f.rs", ChangeKind::Modified)], temp.path());
    let mut entry = store.create(BackupKind::Manual, "t", "backup", &files).unwrap();

    fs::write(store.blob_path(&entry.id, &entry.files[0].checksum), "tampered").unwrap();

    let outcome = store.verify_entry(&mut entry).unwrap();

    assert!(!outcome.ok);
    assert_eq!(outcome.problems.len(), 1);
    assert!(outcome.problems[0].contains("f.rs"));

    // The corrupted status is persisted
    assert_eq!(store.load(&entry.id).unwrap().status, BackupStatus::Corrupted);
}

#[test]
fn test_verify_detects_missing_blob() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "f.rs", "content\n");

    let store = BackupStore::new(&ctx);
    let files = paths(&[("f.rs", ChangeKind::Modified)], temp.path());
    let mut entry = store.create(BackupKind::Manual, "t", "backup", &files).unwrap();

    fs::remove_file(store.blob_path(&entry.id, &entry.files[0].checksum)).unwrap();

    let outcome = store.verify_entry(&mut entry).unwrap();
    assert!(!outcome.ok);
    assert!(outcome.problems[0].contains("missing"));
}

#[test]
fn test_verify_store_all_entries() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "f.rs", "content\n");

    let store = BackupStore::new(&ctx);
    let files = paths(&[("f.rs", ChangeKind::Modified)], temp.path());
    store.create(BackupKind::Manual, "one", "backup", &files).unwrap();
    store.create(BackupKind::Manual, "two", "backup", &files).unwrap();

    let outcomes = store.verify_store(None).unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.ok));
}

#[test]
fn test_prune_always_keeps_newest() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "f.rs", "content\n");

    let store = BackupStore::new(&ctx);
    let files = paths(&[("f.rs", ChangeKind::Modified)], temp.path());
    store.create(BackupKind::Manual, "one", "backup", &files).unwrap();
    store.create(BackupKind::Manual, "two", "backup", &files).unwrap();
    let newest = store.create(BackupKind::Manual, "three", "backup", &files).unwrap();

    // Zero retention qualifies every entry, but the newest survives
    let pruned = store.prune(0).unwrap();

    assert_eq!(pruned.len(), 2);
    let remaining = store.list().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, newest.id);
}

#[test]
fn test_prune_candidates_respects_cutoff() {
    let now = Utc::now();
    let mk = |id: &str, age_days: i64| BackupEntry {
        id: id.to_string(),
        created_at: now - Duration::days(age_days),
        kind: BackupKind::Manual,
        description: String::new(),
        status: BackupStatus::Completed,
        files: vec![],
        metadata: BackupMetadata {
            operation: "backup".to_string(),
            triggered_by: "test@host".to_string(),
            total_bytes: 0,
            entry_checksum: String::new(),
        },
    };

    // Newest first, as list() returns them
    let entries = vec![mk("b-newest", 0), mk("b-mid", 10), mk("b-old", 40)];

    assert_eq!(prune_candidates(&entries, 30, now), vec!["b-old"]);
    assert_eq!(prune_candidates(&entries, 0, now), vec!["b-old", "b-mid"]);
    assert_eq!(prune_candidates(&entries, 90, now), Vec::<String>::new());
    assert_eq!(prune_candidates(&entries[..1], 0, now), Vec::<String>::new());
}

#[test]
fn test_store_report_empty_is_critical() {
    let (_temp, ctx) = create_test_project();
    let store = BackupStore::new(&ctx);

    let report = store.store_report(&Config::default()).unwrap();

    assert_eq!(report.entry_count, 0);
    assert_eq!(report.health, StoreHealth::Critical);
    assert!(report.newest.is_none());
}

#[test]
fn test_store_report_healthy() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "f.rs", "content\n");

    let store = BackupStore::new(&ctx);
    let files = paths(&[("f.rs", ChangeKind::Modified)], temp.path());
    store.create(BackupKind::Manual, "t", "backup", &files).unwrap();

    let report = store.store_report(&Config::default()).unwrap();

    assert_eq!(report.entry_count, 1);
    assert_eq!(report.health, StoreHealth::Good);
    assert_eq!(report.kind_counts.get("manual"), Some(&1));
    assert!(report.newest.is_some());
    assert!(report.advisories.is_empty());
}

#[test]
fn test_store_report_corruption_is_critical() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "f.rs", "content\n");

    let store = BackupStore::new(&ctx);
    let files = paths(&[("f.rs", ChangeKind::Modified)], temp.path());
    let mut entry = store.create(BackupKind::Manual, "t", "backup", &files).unwrap();
    fs::write(store.blob_path(&entry.id, &entry.files[0].checksum), "x").unwrap();
    store.verify_entry(&mut entry).unwrap();

    let report = store.store_report(&Config::default()).unwrap();

    assert_eq!(report.health, StoreHealth::Critical);
    assert_eq!(report.corrupted, vec![entry.id]);
}

#[test]
fn test_store_report_count_advisory() {
    let (temp, ctx) = create_test_project();
    write_file(temp.path(), "f.rs", "content\n");

    let store = BackupStore::new(&ctx);
    let files = paths(&[("f.rs", ChangeKind::Modified)], temp.path());
    store.create(BackupKind::Manual, "one", "backup", &files).unwrap();
    store.create(BackupKind::Manual, "two", "backup", &files).unwrap();

    let mut config = Config::default();
    config.max_backups = 1;

    let report = store.store_report(&config).unwrap();

    assert_eq!(report.health, StoreHealth::Warning);
    assert_eq!(report.advisories.len(), 1);
    assert!(report.advisories[0].contains("broom backup prune"));
}
