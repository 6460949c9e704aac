//! Implementation of the `broom analyze` command.
//!
//! Scans the source tree without changing it and prints (or exports)
//! the analysis report. `--deep` adds performance findings and
//! duplicate file detection; `--duplicates` adds just the latter.

use crate::analyze::{AnalysisReport, ScanOptions, Severity, scan_tree};
use crate::cli::AnalyzeArgs;
use crate::config::Config;
use crate::context::require_initialized_project;
use crate::error::{BroomError, Result};
use crate::events::{Event, EventAction, log_event_best_effort};
use crate::report;
use serde_json::json;

/// Execute the `broom analyze` command.
pub fn cmd_analyze(args: AnalyzeArgs) -> Result<()> {
    let ctx = require_initialized_project()?;
    let config = Config::load_or_default(&ctx)?;

    let mut opts = if args.deep {
        ScanOptions::deep()
    } else {
        ScanOptions::quick()
    };
    if args.duplicates {
        opts.include_duplicates = true;
    }

    let analysis = scan_tree(&ctx.project_root, &config, &opts)
        .map_err(|e| BroomError::AnalysisError(e.to_string()))?;

    let event = Event::new(EventAction::Analyze)
        .with_module("analyzer")
        .with_details(json!({
            "files_scanned": analysis.files_scanned,
            "issues": analysis.issues.len(),
            "perf_issues": analysis.perf_issues.len(),
            "duplicate_groups": analysis.duplicate_groups.len(),
            "elapsed_ms": analysis.elapsed_ms,
        }));
    log_event_best_effort(&ctx, &event);

    if args.format.is_some() || args.output.is_some() {
        let format = report::resolve_format(args.format.as_deref())?;
        let content = report::render_analysis(&analysis, format)?;
        if let Some(path) = report::write_report(&ctx, &content, args.output.as_deref())? {
            println!("Report written to: {}", path.display());
        }
        return Ok(());
    }

    print_analysis(&analysis);
    Ok(())
}

fn print_analysis(analysis: &AnalysisReport) {
    println!(
        "Analyzed {} file(s), {} bytes, in {} ms.",
        analysis.files_scanned, analysis.bytes_scanned, analysis.elapsed_ms
    );
    println!();

    if analysis.total_findings() == 0 {
        println!("No findings. The tree is clean.");
        return;
    }

    if !analysis.issues.is_empty() {
        println!("Code issues ({}):", analysis.issues.len());
        for issue in &analysis.issues {
            println!(
                "  {:6} {}:{}  {}",
                issue.severity.as_str(),
                issue.file,
                issue.line,
                issue.message
            );
            if let Some(suggestion) = &issue.suggestion {
                println!("         fix: {}", suggestion);
            }
        }
        println!();
    }

    if !analysis.perf_issues.is_empty() {
        println!("Performance findings ({}):", analysis.perf_issues.len());
        for perf in &analysis.perf_issues {
            println!("  {:10} {}  {}", perf.kind.as_str(), perf.file, perf.message);
        }
        println!();
    }

    if !analysis.duplicate_groups.is_empty() {
        println!(
            "Duplicate files ({} group(s)):",
            analysis.duplicate_groups.len()
        );
        for group in &analysis.duplicate_groups {
            println!("  {} bytes, checksum {}:", group.size, &group.checksum[..12]);
            for file in &group.files {
                println!("    - {}", file);
            }
        }
        println!();
    }

    println!(
        "Summary: {} issue(s) ({} high, {} medium, {} low), {} perf finding(s), {} duplicate group(s)",
        analysis.issues.len(),
        analysis.count_by_severity(Severity::High),
        analysis.count_by_severity(Severity::Medium),
        analysis.count_by_severity(Severity::Low),
        analysis.perf_issues.len(),
        analysis.duplicate_groups.len()
    );
}
