//! Implementation of the `broom init` command.
//!
//! Creates the `.broom/` state directory at the project root:
//!
//! ```text
//! .broom/
//!   config.yaml        # default configuration (never overwritten)
//!   backups/           # content-addressed snapshot store
//!   events/            # append-only NDJSON audit log
//!   locks/             # exclusive run lock
//!   reports/           # exported reports
//! ```
//!
//! Init is idempotent: re-running it creates whatever is missing and
//! leaves an existing config untouched. Running it inside a subdirectory
//! of an already-initialized project reports the existing root instead
//! of nesting a second state directory.

use crate::config::Config;
use crate::context::ProjectContext;
use crate::error::{BroomError, Result};
use crate::events::{Event, EventAction, append_event};
use crate::fs::atomic_write_file;
use serde_json::json;
use std::fs;

/// Execute the `broom init` command.
pub fn cmd_init() -> Result<()> {
    let ctx = ProjectContext::resolve()?;
    let already_initialized = ctx.state_exists();

    let mut created: Vec<&str> = Vec::new();
    for (label, dir) in [
        ("backups", ctx.backups_dir.clone()),
        ("events", ctx.events_dir()),
        ("locks", ctx.locks_dir.clone()),
        ("reports", ctx.reports_dir()),
    ] {
        if !dir.is_dir() {
            fs::create_dir_all(&dir).map_err(|e| {
                BroomError::UserError(format!(
                    "failed to create directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
            created.push(label);
        }
    }

    let config_path = ctx.config_path();
    let wrote_config = if config_path.exists() {
        false
    } else {
        atomic_write_file(&config_path, &Config::default().to_yaml()?)?;
        true
    };

    let event = Event::new(EventAction::Init).with_details(json!({
        "created": created,
        "wrote_config": wrote_config,
        "reinit": already_initialized,
    }));
    append_event(&ctx, &event)?;

    if already_initialized && created.is_empty() && !wrote_config {
        println!(
            "broom is already initialized at: {}",
            ctx.state_dir.display()
        );
        return Ok(());
    }

    println!("Initialized broom at: {}", ctx.state_dir.display());
    if !created.is_empty() {
        println!("  Created: {}", created.join(", "));
    }
    if wrote_config {
        println!("  Config:  {} (defaults written)", config_path.display());
    }
    println!();
    println!("Next steps:");
    println!("  broom analyze               - scan the tree for cleanup candidates");
    println!("  broom plans                 - list the built-in cleanup plans");
    println!("  broom run quick_cleanup     - preview the quick cleanup plan");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::DirGuard;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_init_creates_state_layout() {
        let temp_dir = TempDir::new().unwrap();
        let _guard = DirGuard::new(temp_dir.path());

        cmd_init().unwrap();

        let state = temp_dir.path().join(".broom");
        assert!(state.is_dir());
        assert!(state.join("backups").is_dir());
        assert!(state.join("events").is_dir());
        assert!(state.join("locks").is_dir());
        assert!(state.join("reports").is_dir());
        assert!(state.join("config.yaml").is_file());
        assert!(state.join("events/events.ndjson").is_file());
    }

    #[test]
    #[serial]
    fn test_init_writes_parseable_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let _guard = DirGuard::new(temp_dir.path());

        cmd_init().unwrap();

        let config = Config::load(temp_dir.path().join(".broom/config.yaml")).unwrap();
        assert_eq!(config.workers, Config::default().workers);
    }

    #[test]
    #[serial]
    fn test_init_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let _guard = DirGuard::new(temp_dir.path());

        cmd_init().unwrap();
        cmd_init().unwrap();

        assert!(temp_dir.path().join(".broom/config.yaml").is_file());
    }

    #[test]
    #[serial]
    fn test_init_preserves_edited_config() {
        let temp_dir = TempDir::new().unwrap();
        let _guard = DirGuard::new(temp_dir.path());

        cmd_init().unwrap();

        let config_path = temp_dir.path().join(".broom/config.yaml");
        std::fs::write(&config_path, "workers: 7\n").unwrap();

        cmd_init().unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.workers, 7);
    }
}
