//! Terminal output for the `run` command.

use crate::exec::Execution;
use crate::plan::{Plan, execution_layers};

/// Print the dry-run preview of a plan.
pub fn print_dry_run(plan: &Plan) {
    println!("Plan: {} ({})", plan.name, plan.id);
    println!("{}", plan.description);
    println!();
    println!("  Risk:      {}", plan.risk.as_str());
    println!("  Steps:     {}", plan.steps.len());
    println!("  Estimated: {}s", plan.total_estimated_secs());
    println!(
        "  Backup:    {}",
        if plan.backup_required {
            "taken before the first mutating step"
        } else {
            "not required"
        }
    );
    println!();

    println!("Execution stages:");
    for (i, layer) in execution_layers(plan).iter().enumerate() {
        let ids: Vec<&str> = layer.iter().map(|s| s.id.as_str()).collect();
        println!("  {}. {}", i + 1, ids.join(", "));
    }
    println!();
    println!("Dry-run mode: no changes made.");
    println!("Run with --yes to execute the plan.");
}

/// Print any step outcomes that arrived since the last call.
///
/// The runner invokes this after every step result; `reported` tracks
/// how many outcomes have been printed so far.
pub fn print_step_progress(execution: &Execution, reported: &mut usize) {
    for report in &execution.step_reports[*reported..] {
        let mark = if report.ok { "ok    " } else { "FAILED" };
        println!(
            "[{:>3}%] {} {:20} {}",
            execution.progress, mark, report.step_id, report.detail
        );
    }
    *reported = execution.step_reports.len();
}

/// Print the end-of-run summary.
pub fn print_run_summary(execution: &Execution) {
    let totals = &execution.totals;

    println!();
    println!("Run {} finished: {}", execution.id, execution.status);
    if let Some(finished_at) = execution.finished_at {
        let elapsed = finished_at.signed_duration_since(execution.started_at);
        println!("  Duration:   {} ms", elapsed.num_milliseconds());
    }
    println!("  Progress:   {}%", execution.progress);
    println!("  Completed:  {} step(s)", execution.completed_steps.len());
    if !execution.failed_steps.is_empty() {
        println!("  Failed:     {}", execution.failed_steps.join(", "));
    }
    if !execution.skipped_steps.is_empty() {
        println!("  Skipped:    {}", execution.skipped_steps.join(", "));
    }
    if let Some(backup_id) = &execution.backup_id {
        println!("  Backup:     {}", backup_id);
    }
    if let Some(rollback) = &execution.rollback {
        println!(
            "  Rollback:   restored {} file(s) from {} ({})",
            rollback.files_restored,
            rollback.backup_id,
            if rollback.success {
                "success"
            } else {
                "with errors"
            }
        );
    }

    let mut files: Vec<String> = Vec::new();
    if totals.files_scanned > 0 {
        files.push(format!("{} scanned", totals.files_scanned));
    }
    if totals.files_changed > 0 {
        files.push(format!("{} changed", totals.files_changed));
    }
    if totals.files_removed > 0 {
        files.push(format!("{} removed", totals.files_removed));
    }
    if !files.is_empty() {
        println!("  Files:      {}", files.join(", "));
    }
    if totals.issues_found > 0 || totals.issues_fixed > 0 {
        println!(
            "  Issues:     {} found, {} fixed",
            totals.issues_found, totals.issues_fixed
        );
    }
    if totals.duplicate_groups > 0 {
        println!("  Duplicates: {} group(s)", totals.duplicate_groups);
    }
    if totals.bytes_reclaimed > 0 {
        println!("  Reclaimed:  {} bytes", totals.bytes_reclaimed);
    }
    if !totals.errors.is_empty() {
        println!("  Errors:");
        for error in &totals.errors {
            println!("    - {}", error);
        }
    }
}
