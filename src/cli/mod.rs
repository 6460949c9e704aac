//! CLI argument parsing for broom.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};

/// Broom: Plan-driven source tree cleanup orchestrator with snapshot rollback.
///
/// Cleanups run as plans of dependent steps over a worker pool:
/// - Every mutating run snapshots affected files first (SHA-256 blobs)
/// - Critical failures roll the tree back to the snapshot
/// - All state lives under .broom/ in the project root
#[derive(Parser, Debug)]
#[command(name = "broom")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for broom.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize broom state in the current directory.
    ///
    /// Creates the .broom/ state directory with a default config.yaml,
    /// backup store, events log, and reports directory.
    Init,

    /// List built-in cleanup plans, or show one plan in detail.
    ///
    /// With a plan ID, shows the plan's steps, dependencies, and
    /// execution stages.
    Plans(PlansArgs),

    /// Run a cleanup plan.
    ///
    /// Shows what the plan would do by default; pass --yes to execute.
    /// Mutating plans snapshot affected files first and roll back
    /// automatically when a critical step fails.
    Run(RunArgs),

    /// Analyze the source tree without changing it.
    ///
    /// Scans for leftover debug statements, stub markers, duplicate
    /// imports, and optionally duplicate files and performance findings.
    Analyze(AnalyzeArgs),

    /// Backup store commands.
    ///
    /// Create, list, verify, prune, and report on snapshots.
    Backup(BackupCommand),

    /// Restore files from a backup.
    ///
    /// Restores the full snapshot, or only the given paths. Requires
    /// --yes because it overwrites the working tree.
    Restore(RestoreArgs),

    /// Check subsystem health.
    ///
    /// Probes state layout, config, backup store, executor, audit log,
    /// and analyzer. Use --repair --force to recreate missing state
    /// directories.
    Health(HealthArgs),

    /// Run deep diagnostics.
    ///
    /// Executes independent diagnostic areas concurrently and reports
    /// per-area findings; one failing area never hides the others.
    Diagnose(DiagnoseArgs),

    /// Show project status summary.
    ///
    /// Displays backup store totals, recent runs with durations, and
    /// the slowest recent steps from the audit log.
    Status,

    /// Run lock management commands.
    ///
    /// List or clear the exclusive run lock.
    Lock(LockCommand),
}

/// Arguments for the `plans` command.
#[derive(Parser, Debug)]
pub struct PlansArgs {
    /// Plan ID to show in detail. If omitted, lists all plans.
    pub plan_id: Option<String>,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Plan ID to run (quick_cleanup, full_optimization, audit_only).
    pub plan_id: String,

    /// Execute the plan. Without this flag, only a dry-run preview is shown.
    #[arg(long)]
    pub yes: bool,

    /// Override the configured worker pool size for this run.
    #[arg(long)]
    pub workers: Option<u32>,

    /// Export format for the run report (json, csv, markdown).
    #[arg(long)]
    pub format: Option<String>,

    /// Report destination: a path, a bare name for .broom/reports/, or "-" for stdout.
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for the `analyze` command.
#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// Include performance findings (large files, long lines, blank runs).
    #[arg(long)]
    pub deep: bool,

    /// Include duplicate file detection.
    #[arg(long)]
    pub duplicates: bool,

    /// Export format for the analysis report (json, csv, markdown).
    #[arg(long)]
    pub format: Option<String>,

    /// Report destination: a path, a bare name for .broom/reports/, or "-" for stdout.
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Backup subcommands.
#[derive(Parser, Debug)]
pub struct BackupCommand {
    #[command(subcommand)]
    pub action: BackupAction,
}

/// Available backup actions.
#[derive(Subcommand, Debug)]
pub enum BackupAction {
    /// Create a manual backup.
    ///
    /// Snapshots the given paths, or every source file when no paths
    /// are given.
    Create(BackupCreateArgs),

    /// List backups, newest first.
    List,

    /// Report on the backup store.
    ///
    /// Shows totals, per-kind counts, corruption, and size advisories.
    Report(BackupReportArgs),

    /// Verify backup integrity.
    ///
    /// Recomputes every blob checksum for one backup, or all of them.
    /// Corrupted entries are marked in their manifests.
    Verify(BackupVerifyArgs),

    /// Remove old backups.
    ///
    /// Deletes entries older than the retention window but always keeps
    /// the newest entry. Shows a preview unless --yes is passed.
    Prune(BackupPruneArgs),
}

/// Arguments for the `backup create` command.
#[derive(Parser, Debug)]
pub struct BackupCreateArgs {
    /// Description recorded on the backup entry.
    #[arg(short, long, default_value = "manual snapshot")]
    pub description: String,

    /// Project-relative paths to snapshot (defaults to all source files).
    #[arg(long, value_delimiter = ',')]
    pub paths: Vec<String>,
}

/// Arguments for the `backup report` command.
#[derive(Parser, Debug)]
pub struct BackupReportArgs {
    /// Export format for the store report (json, csv, markdown).
    #[arg(long)]
    pub format: Option<String>,

    /// Report destination: a path, a bare name for .broom/reports/, or "-" for stdout.
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for the `backup verify` command.
#[derive(Parser, Debug)]
pub struct BackupVerifyArgs {
    /// Backup ID to verify. If omitted, verifies every backup.
    pub backup_id: Option<String>,
}

/// Arguments for the `backup prune` command.
#[derive(Parser, Debug)]
pub struct BackupPruneArgs {
    /// Retention window in days (defaults to config retention_days).
    #[arg(long)]
    pub days: Option<u32>,

    /// Actually delete. Without this flag, only a preview is shown.
    #[arg(long)]
    pub yes: bool,
}

/// Arguments for the `restore` command.
#[derive(Parser, Debug)]
pub struct RestoreArgs {
    /// Backup ID to restore from (e.g., b-20260825-103000).
    pub backup_id: String,

    /// Restore only these project-relative paths (files or directories).
    #[arg(long, value_delimiter = ',')]
    pub paths: Vec<String>,

    /// Confirm overwriting the working tree (required).
    #[arg(long)]
    pub yes: bool,
}

/// Arguments for the `health` command.
#[derive(Parser, Debug)]
pub struct HealthArgs {
    /// Attempt to repair detected issues.
    #[arg(long)]
    pub repair: bool,

    /// Force repairs without confirmation (use with --repair).
    #[arg(long)]
    pub force: bool,

    /// Export format for the health report (json, csv, markdown).
    #[arg(long)]
    pub format: Option<String>,

    /// Report destination: a path, a bare name for .broom/reports/, or "-" for stdout.
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for the `diagnose` command.
#[derive(Parser, Debug)]
pub struct DiagnoseArgs {
    /// Export format for the diagnostics report (json, csv, markdown).
    #[arg(long)]
    pub format: Option<String>,

    /// Report destination: a path, a bare name for .broom/reports/, or "-" for stdout.
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// Show the run lock, if held.
    ///
    /// Shows owner, action, age, and staleness.
    List,

    /// Clear the run lock.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(LockClearArgs),
}

/// Arguments for the `lock clear` command.
#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// Force clearing the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        // Verifies the CLI arguments configuration is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["broom", "init"]).unwrap();
        assert!(matches!(cli.command, Command::Init));
    }

    #[test]
    fn parse_plans_list() {
        let cli = Cli::try_parse_from(["broom", "plans"]).unwrap();
        if let Command::Plans(args) = cli.command {
            assert_eq!(args.plan_id, None);
        } else {
            panic!("Expected Plans command");
        }
    }

    #[test]
    fn parse_plans_show() {
        let cli = Cli::try_parse_from(["broom", "plans", "quick_cleanup"]).unwrap();
        if let Command::Plans(args) = cli.command {
            assert_eq!(args.plan_id, Some("quick_cleanup".to_string()));
        } else {
            panic!("Expected Plans command");
        }
    }

    #[test]
    fn parse_run_minimal() {
        let cli = Cli::try_parse_from(["broom", "run", "quick_cleanup"]).unwrap();
        if let Command::Run(args) = cli.command {
            assert_eq!(args.plan_id, "quick_cleanup");
            assert!(!args.yes);
            assert_eq!(args.workers, None);
            assert_eq!(args.format, None);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn parse_run_full() {
        let cli = Cli::try_parse_from([
            "broom",
            "run",
            "full_optimization",
            "--yes",
            "--workers",
            "4",
            "--format",
            "json",
            "--output",
            "run.json",
        ])
        .unwrap();
        if let Command::Run(args) = cli.command {
            assert_eq!(args.plan_id, "full_optimization");
            assert!(args.yes);
            assert_eq!(args.workers, Some(4));
            assert_eq!(args.format, Some("json".to_string()));
            assert_eq!(args.output, Some("run.json".to_string()));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn parse_analyze_defaults() {
        let cli = Cli::try_parse_from(["broom", "analyze"]).unwrap();
        if let Command::Analyze(args) = cli.command {
            assert!(!args.deep);
            assert!(!args.duplicates);
        } else {
            panic!("Expected Analyze command");
        }
    }

    #[test]
    fn parse_analyze_deep_duplicates() {
        let cli = Cli::try_parse_from(["broom", "analyze", "--deep", "--duplicates"]).unwrap();
        if let Command::Analyze(args) = cli.command {
            assert!(args.deep);
            assert!(args.duplicates);
        } else {
            panic!("Expected Analyze command");
        }
    }

    #[test]
    fn parse_backup_create_defaults() {
        let cli = Cli::try_parse_from(["broom", "backup", "create"]).unwrap();
        if let Command::Backup(backup_cmd) = cli.command {
            if let BackupAction::Create(args) = backup_cmd.action {
                assert_eq!(args.description, "manual snapshot");
                assert!(args.paths.is_empty());
            } else {
                panic!("Expected Create action");
            }
        } else {
            panic!("Expected Backup command");
        }
    }

    #[test]
    fn parse_backup_create_with_paths() {
        let cli = Cli::try_parse_from([
            "broom",
            "backup",
            "create",
            "--description",
            "before refactor",
            "--paths",
            "src/main.rs,src/lib.rs",
        ])
        .unwrap();
        if let Command::Backup(backup_cmd) = cli.command {
            if let BackupAction::Create(args) = backup_cmd.action {
                assert_eq!(args.description, "before refactor");
                assert_eq!(args.paths, vec!["src/main.rs", "src/lib.rs"]);
            } else {
                panic!("Expected Create action");
            }
        } else {
            panic!("Expected Backup command");
        }
    }

    #[test]
    fn parse_backup_list() {
        let cli = Cli::try_parse_from(["broom", "backup", "list"]).unwrap();
        if let Command::Backup(backup_cmd) = cli.command {
            assert!(matches!(backup_cmd.action, BackupAction::List));
        } else {
            panic!("Expected Backup command");
        }
    }

    #[test]
    fn parse_backup_verify_with_id() {
        let cli = Cli::try_parse_from(["broom", "backup", "verify", "b-20260825-103000"]).unwrap();
        if let Command::Backup(backup_cmd) = cli.command {
            if let BackupAction::Verify(args) = backup_cmd.action {
                assert_eq!(args.backup_id, Some("b-20260825-103000".to_string()));
            } else {
                panic!("Expected Verify action");
            }
        } else {
            panic!("Expected Backup command");
        }
    }

    #[test]
    fn parse_backup_prune() {
        let cli =
            Cli::try_parse_from(["broom", "backup", "prune", "--days", "7", "--yes"]).unwrap();
        if let Command::Backup(backup_cmd) = cli.command {
            if let BackupAction::Prune(args) = backup_cmd.action {
                assert_eq!(args.days, Some(7));
                assert!(args.yes);
            } else {
                panic!("Expected Prune action");
            }
        } else {
            panic!("Expected Backup command");
        }
    }

    #[test]
    fn parse_restore() {
        let cli = Cli::try_parse_from([
            "broom",
            "restore",
            "b-20260825-103000",
            "--paths",
            "src/main.rs,src/util",
            "--yes",
        ])
        .unwrap();
        if let Command::Restore(args) = cli.command {
            assert_eq!(args.backup_id, "b-20260825-103000");
            assert_eq!(args.paths, vec!["src/main.rs", "src/util"]);
            assert!(args.yes);
        } else {
            panic!("Expected Restore command");
        }
    }

    #[test]
    fn parse_health() {
        let cli = Cli::try_parse_from(["broom", "health"]).unwrap();
        if let Command::Health(args) = cli.command {
            assert!(!args.repair);
            assert!(!args.force);
        } else {
            panic!("Expected Health command");
        }
    }

    #[test]
    fn parse_health_repair() {
        let cli = Cli::try_parse_from(["broom", "health", "--repair", "--force"]).unwrap();
        if let Command::Health(args) = cli.command {
            assert!(args.repair);
            assert!(args.force);
        } else {
            panic!("Expected Health command");
        }
    }

    #[test]
    fn parse_diagnose_format() {
        let cli = Cli::try_parse_from(["broom", "diagnose", "--format", "markdown"]).unwrap();
        if let Command::Diagnose(args) = cli.command {
            assert_eq!(args.format, Some("markdown".to_string()));
        } else {
            panic!("Expected Diagnose command");
        }
    }

    #[test]
    fn parse_status() {
        let cli = Cli::try_parse_from(["broom", "status"]).unwrap();
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn parse_lock_list() {
        let cli = Cli::try_parse_from(["broom", "lock", "list"]).unwrap();
        if let Command::Lock(lock_cmd) = cli.command {
            assert!(matches!(lock_cmd.action, LockAction::List));
        } else {
            panic!("Expected Lock command");
        }
    }

    #[test]
    fn parse_lock_clear() {
        let cli = Cli::try_parse_from(["broom", "lock", "clear", "--force"]).unwrap();
        if let Command::Lock(lock_cmd) = cli.command {
            if let LockAction::Clear(args) = lock_cmd.action {
                assert!(args.force);
            } else {
                panic!("Expected Clear action");
            }
        } else {
            panic!("Expected Lock command");
        }
    }
}
