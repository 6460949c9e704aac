//! Command implementations for broom.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Every command resolves a [`ProjectContext`] first and
//! passes it by reference to the layers below; nothing reads global state.

mod analyze_cmd;
mod backup_cmd;
mod diagnose_cmd;
mod health_cmd;
mod init;
mod plans;
mod restore;
mod run;
mod status;

use crate::cli::{BackupCommand, Command, LockAction, LockClearArgs, LockCommand};
use crate::config::Config;
use crate::context::require_initialized_project;
use crate::error::{BroomError, Result};
use crate::events::{Event, EventAction, log_event_best_effort};
use crate::locks;
use serde_json::json;

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. Each command
/// is routed to its handler function.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Init => init::cmd_init(),
        Command::Plans(args) => plans::cmd_plans(args),
        Command::Run(args) => run::cmd_run(args),
        Command::Analyze(args) => analyze_cmd::cmd_analyze(args),
        Command::Backup(backup) => dispatch_backup(backup),
        Command::Restore(args) => restore::cmd_restore(args),
        Command::Health(args) => health_cmd::cmd_health(args),
        Command::Diagnose(args) => diagnose_cmd::cmd_diagnose(args),
        Command::Status => status::cmd_status(),
        Command::Lock(lock_cmd) => dispatch_lock(lock_cmd),
    }
}

/// Dispatch backup subcommands.
fn dispatch_backup(backup: BackupCommand) -> Result<()> {
    use crate::cli::BackupAction;

    match backup.action {
        BackupAction::Create(args) => backup_cmd::cmd_backup_create(args),
        BackupAction::List => backup_cmd::cmd_backup_list(),
        BackupAction::Report(args) => backup_cmd::cmd_backup_report(args),
        BackupAction::Verify(args) => backup_cmd::cmd_backup_verify(args),
        BackupAction::Prune(args) => backup_cmd::cmd_backup_prune(args),
    }
}

/// Dispatch lock subcommands.
fn dispatch_lock(lock_cmd: LockCommand) -> Result<()> {
    match lock_cmd.action {
        LockAction::List => cmd_lock_list(),
        LockAction::Clear(args) => cmd_lock_clear(args),
    }
}

// ============================================================================
// Lock Commands
// ============================================================================

fn cmd_lock_list() -> Result<()> {
    let ctx = require_initialized_project()?;
    let config = Config::load_or_default(&ctx)?;

    let Some(lock) = locks::run_lock_info(&ctx, &config)? else {
        println!("No run lock held.");
        return Ok(());
    };

    println!("Run lock:");
    println!("  Owner:      {}", lock.metadata.owner);
    if let Some(pid) = lock.metadata.pid {
        println!("  PID:        {}", pid);
    }
    println!(
        "  Created:    {}",
        lock.metadata.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  Age:        {}", lock.metadata.age_string());
    println!("  Action:     {}", lock.metadata.action);
    if lock.is_stale {
        println!(
            "  Status:     STALE (exceeds {} min threshold)",
            config.lock_stale_minutes
        );
    }
    println!("  Path:       {}", lock.path.display());

    if lock.is_stale {
        println!();
        println!("The lock looks abandoned. Use `broom lock clear --force` to clear it.");
    }

    Ok(())
}

fn cmd_lock_clear(args: LockClearArgs) -> Result<()> {
    // Require --force flag
    if !args.force {
        return Err(BroomError::UserError(
            "refusing to clear the run lock without --force flag.\n\n\
             Clearing the lock while a run is still active can corrupt the working tree.\n\
             Only clear it if you are certain the holding process has exited.\n\n\
             To clear the lock, run:\n  broom lock clear --force"
                .to_string(),
        ));
    }

    let ctx = require_initialized_project()?;
    let config = Config::load_or_default(&ctx)?;

    let cleared = locks::clear_run_lock(&ctx, &config)?;

    // Best-effort logging: clearing the lock must never fail because the
    // events file is unwritable.
    let event = Event::new(EventAction::LockClear)
        .with_module("locks")
        .with_details(json!({
            "owner": cleared.metadata.owner,
            "original_action": cleared.metadata.action,
            "age_minutes": cleared.metadata.age().num_minutes(),
            "was_stale": cleared.is_stale,
        }));
    log_event_best_effort(&ctx, &event);

    println!("Cleared run lock.");
    println!("  Owner:      {}", cleared.metadata.owner);
    println!("  Action:     {}", cleared.metadata.action);
    println!("  Age:        {}", cleared.metadata.age_string());
    if cleared.is_stale {
        println!("  Status:     was STALE");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;
    use crate::test_support::{DirGuard, create_test_project};
    use serial_test::serial;

    #[test]
    fn lock_clear_refuses_without_force() {
        // The --force check runs before context resolution, so this test
        // needs no project directory.
        let args = LockClearArgs { force: false };
        let result = cmd_lock_clear(args);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        assert!(err.to_string().contains("--force"));
    }

    #[test]
    #[serial]
    fn lock_list_without_lock_reports_none() {
        let (temp_dir, _ctx) = create_test_project();
        let _guard = DirGuard::new(temp_dir.path());

        assert!(cmd_lock_list().is_ok());
    }

    #[test]
    #[serial]
    fn lock_clear_fails_when_no_lock_exists() {
        let (temp_dir, _ctx) = create_test_project();
        let _guard = DirGuard::new(temp_dir.path());

        let args = LockClearArgs { force: true };
        let result = cmd_lock_clear(args);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no run lock"));
    }

    #[test]
    #[serial]
    fn lock_clear_removes_held_lock() {
        let (temp_dir, ctx) = create_test_project();
        let _guard = DirGuard::new(temp_dir.path());

        let lock = locks::acquire_run_lock(&ctx, "run quick_cleanup").unwrap();
        std::mem::forget(lock); // simulate a crashed holder

        let args = LockClearArgs { force: true };
        cmd_lock_clear(args).unwrap();
        assert!(!ctx.run_lock_path().exists());
    }

    #[test]
    #[serial]
    fn commands_require_initialized_project() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let _guard = DirGuard::new(temp_dir.path());

        let result = dispatch(Command::Status);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        assert!(err.to_string().contains("broom init"));
    }
}
