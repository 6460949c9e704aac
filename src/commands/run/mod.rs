//! Implementation of the `broom run` command.
//!
//! Runs a built-in cleanup plan against the project tree.
//!
//! # Safety
//!
//! - Default behavior is a dry-run preview (prints the plan and its
//!   execution stages)
//! - Requires `--yes` to actually execute
//! - Executed runs hold the exclusive run lock for their whole duration
//! - Plans with `backup_required` snapshot every file their mutating
//!   steps can touch before the first mutation; a critical failure
//!   restores that snapshot automatically
//!
//! # Reporting
//!
//! Step outcomes stream to the terminal as they finish. With
//! `--format`/`--output` the final run report is also exported.

mod display;


use crate::cli::RunArgs;
use crate::config::Config;
use crate::context::require_initialized_project;
use crate::error::{BroomError, Result};
use crate::exec::{Execution, RunStatus, Runner};
use crate::locks;
use crate::plan::find_plan;
use crate::report;

use display::{print_dry_run, print_run_summary, print_step_progress};

/// Execute the `broom run` command.
pub fn cmd_run(args: RunArgs) -> Result<()> {
    let ctx = require_initialized_project()?;
    let mut config = Config::load_or_default(&ctx)?;

    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err(BroomError::UserError(
                "workers must be greater than 0".to_string(),
            ));
        }
        config.workers = workers;
    }

    let plan = find_plan(&args.plan_id)?;

    if !args.yes {
        print_dry_run(&plan);
        return Ok(());
    }

    // Exclusive run lock for the whole run, released on drop even when
    // the run errors out.
    let _lock = locks::acquire_run_lock(&ctx, &format!("run {}", plan.id))?;

    println!("Running plan: {} ({})", plan.name, plan.id);
    println!();

    let runner = Runner::new(&ctx, &config);
    let mut reported = 0usize;
    let mut on_progress = |execution: &Execution| print_step_progress(execution, &mut reported);
    let execution = runner.run_plan(&plan, Some(&mut on_progress))?;

    print_run_summary(&execution);

    if args.format.is_some() || args.output.is_some() {
        let format = report::resolve_format(args.format.as_deref())?;
        let content = report::render_execution(&execution, format)?;
        if let Some(path) = report::write_report(&ctx, &content, args.output.as_deref())? {
            println!();
            println!("Report written to: {}", path.display());
        }
    }

    match execution.status {
        RunStatus::Completed => Ok(()),
        RunStatus::RolledBack => Err(BroomError::StepError(format!(
            "plan '{}' failed; the tree was rolled back to backup {}",
            plan.id,
            execution.backup_id.as_deref().unwrap_or("<none>")
        ))),
        _ => Err(BroomError::StepError(format!(
            "plan '{}' failed: {}",
            plan.id,
            execution.totals.errors.join("; ")
        ))),
    }
}
