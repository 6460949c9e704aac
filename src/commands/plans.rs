//! Implementation of the `broom plans` command.
//!
//! Lists the built-in cleanup plans, or shows one plan's steps,
//! dependencies, and execution stages.

use crate::cli::PlansArgs;
use crate::context::require_initialized_project;
use crate::error::Result;
use crate::plan::{Plan, builtin_plans, execution_layers, find_plan};

/// Execute the `broom plans` command.
pub fn cmd_plans(args: PlansArgs) -> Result<()> {
    require_initialized_project()?;

    match args.plan_id {
        Some(id) => show_plan(&find_plan(&id)?),
        None => list_plans(),
    }
}

fn list_plans() -> Result<()> {
    let plans = builtin_plans();

    println!("Available plans ({}):", plans.len());
    println!();
    for plan in &plans {
        println!(
            "  {:18} risk: {:7} est: {:>3}s  {}",
            plan.id,
            plan.risk.as_str(),
            plan.total_estimated_secs(),
            plan.description
        );
    }
    println!();
    println!("Run `broom plans <plan-id>` to see a plan's steps.");

    Ok(())
}

fn show_plan(plan: &Plan) -> Result<()> {
    println!("{} ({})", plan.name, plan.id);
    println!("{}", plan.description);
    println!();
    println!("  Risk:      {}", plan.risk.as_str());
    println!(
        "  Backup:    {}",
        if plan.backup_required {
            "required"
        } else {
            "not required"
        }
    );
    println!(
        "  Rollback:  {}",
        if plan.rollback_supported {
            "supported"
        } else {
            "not supported"
        }
    );
    println!("  Estimated: {}s", plan.total_estimated_secs());
    println!();

    println!("Steps:");
    for step in &plan.steps {
        let mut notes: Vec<&str> = Vec::new();
        if step.critical {
            notes.push("critical");
        }
        if !step.rollbackable {
            notes.push("no rollback");
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!(" [{}]", notes.join(", "))
        };

        println!(
            "  {:20} {:13} {}{}",
            step.id,
            step.kind().as_str(),
            step.name,
            notes
        );
        if !step.depends_on.is_empty() {
            println!("  {:20} depends on: {}", "", step.depends_on.join(", "));
        }
    }
    println!();

    // Stages show which steps are eligible to run concurrently.
    println!("Execution stages:");
    for (i, layer) in execution_layers(plan).iter().enumerate() {
        let ids: Vec<&str> = layer.iter().map(|s| s.id.as_str()).collect();
        println!("  {}. {}", i + 1, ids.join(", "));
    }

    Ok(())
}
