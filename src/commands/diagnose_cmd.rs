//! Implementation of the `broom diagnose` command.
//!
//! Runs the independent diagnostic areas (each isolated on its own
//! thread) and prints or exports the per-area findings. A failing
//! area is reported alongside the healthy ones, never instead of them.

use crate::cli::DiagnoseArgs;
use crate::config::Config;
use crate::context::require_initialized_project;
use crate::diagnose::{AreaStatus, DiagnosticsReport, run_diagnostics};
use crate::error::{BroomError, Result};
use crate::report;

/// Execute the `broom diagnose` command.
pub fn cmd_diagnose(args: DiagnoseArgs) -> Result<()> {
    let ctx = require_initialized_project()?;
    let config = Config::load_or_default(&ctx)?;

    let diagnostics = run_diagnostics(&ctx, &config);

    if args.format.is_some() || args.output.is_some() {
        let format = report::resolve_format(args.format.as_deref())?;
        let content = report::render_diagnostics(&diagnostics, format)?;
        if let Some(path) = report::write_report(&ctx, &content, args.output.as_deref())? {
            println!("Report written to: {}", path.display());
        }
    } else {
        print_diagnostics(&diagnostics);
    }

    if diagnostics.overall == AreaStatus::Fail {
        return Err(BroomError::UserError(
            "diagnostics reported failures. Review the findings above.".to_string(),
        ));
    }

    Ok(())
}

fn print_diagnostics(diagnostics: &DiagnosticsReport) {
    println!("Diagnostics: {}", diagnostics.overall);
    println!();

    for area in &diagnostics.areas {
        println!(
            "  {:4} {:14} ({} ms)",
            area.status.as_str(),
            area.area,
            area.elapsed_ms
        );
        for finding in &area.findings {
            println!("       - {}", finding);
        }
    }
}
