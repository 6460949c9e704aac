//! Implementation of the `broom health` command.
//!
//! Probes every subsystem and rolls the results up into an overall
//! verdict. `--repair --force` recreates missing state directories
//! before probing, so the report reflects the repaired layout.

use crate::cli::HealthArgs;
use crate::context::require_initialized_project;
use crate::error::{BroomError, Result};
use crate::health::{HealthReport, HealthState, apply_repairs, run_health_check};
use crate::report;

/// Execute the `broom health` command.
pub fn cmd_health(args: HealthArgs) -> Result<()> {
    let ctx = require_initialized_project()?;

    // Validate repair args
    if args.repair && !args.force {
        return Err(BroomError::UserError(
            "refusing to repair without --force flag.\n\n\
             Repairs modify the state directory layout. Review the report first with\n\
             `broom health`, then run `broom health --repair --force` to apply safe repairs."
                .to_string(),
        ));
    }

    let repairs = if args.repair && args.force {
        apply_repairs(&ctx)?
    } else {
        Vec::new()
    };

    let mut health_report = run_health_check(&ctx)?;
    health_report.repairs = repairs;

    if args.format.is_some() || args.output.is_some() {
        let format = report::resolve_format(args.format.as_deref())?;
        let content = report::render_health(&health_report, format)?;
        if let Some(path) = report::write_report(&ctx, &content, args.output.as_deref())? {
            println!("Report written to: {}", path.display());
        }
    } else {
        print_health(&health_report);
    }

    if health_report.overall == HealthState::Unhealthy {
        return Err(BroomError::UserError(
            "health check reported unhealthy. Review the probes above; \
             `broom health --repair --force` applies safe repairs."
                .to_string(),
        ));
    }

    Ok(())
}

fn print_health(health_report: &HealthReport) {
    println!("Overall health: {}", health_report.overall);
    println!();

    for module in &health_report.modules {
        println!(
            "  {:22} [{:8}] {}",
            module.name,
            module.tier.as_str(),
            module.state
        );
        for probe in &module.probes {
            let mark = match probe.state {
                HealthState::Healthy => "ok  ",
                HealthState::Degraded => "warn",
                HealthState::Unhealthy => "FAIL",
            };
            println!("    [{}] {:18} {}", mark, probe.name, probe.detail);
        }
    }

    if !health_report.repairs.is_empty() {
        println!();
        println!("Repairs applied:");
        for repair in &health_report.repairs {
            println!("  - {}", repair);
        }
    }
}
