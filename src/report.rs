//! Report rendering and export.
//!
//! Every report surface renders to JSON (full serialization), CSV (the
//! tabular portion), or Markdown. Output goes to stdout by default;
//! bare file names land in `.broom/reports/`, and explicit paths are
//! honored as given. All file writes are atomic.

use crate::analyze::AnalysisReport;
use crate::backup::{BackupEntry, StoreReport};
use crate::context::ProjectContext;
use crate::diagnose::DiagnosticsReport;
use crate::error::{BroomError, Result};
use crate::exec::Execution;
use crate::fs::atomic_write_file;
use crate::health::HealthReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// Export format for report surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            other => Err(BroomError::UserError(format!(
                "unknown report format '{}'. Expected json, csv, or markdown.",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
            ReportFormat::Markdown => "markdown",
        }
    }
}

/// Resolve a command's `--format` flag, defaulting to JSON when only an
/// output destination was given.
pub fn resolve_format(format: Option<&str>) -> Result<ReportFormat> {
    match format {
        Some(name) => ReportFormat::parse(name),
        None => Ok(ReportFormat::Json),
    }
}

/// Write rendered report content to its destination.
///
/// `None` and `"-"` both mean stdout. A bare file name (no path
/// separator) goes into `.broom/reports/`; anything else is used as
/// given. Returns the path written, if any.
pub fn write_report(
    ctx: &ProjectContext,
    content: &str,
    output: Option<&str>,
) -> Result<Option<PathBuf>> {
    let Some(output) = output else {
        print!("{}", content);
        return Ok(None);
    };
    if output == "-" {
        print!("{}", content);
        return Ok(None);
    }

    let path = if output.contains('/') || output.contains('\\') {
        PathBuf::from(output)
    } else {
        ctx.reports_dir().join(output)
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| {
            BroomError::UserError(format!(
                "failed to create report directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    atomic_write_file(&path, content)?;
    Ok(Some(path))
}

pub fn render_analysis(report: &AnalysisReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => to_json(report),
        ReportFormat::Csv => Ok(analysis_csv(report)),
        ReportFormat::Markdown => Ok(analysis_markdown(report)),
    }
}

pub fn render_store_report(
    report: &StoreReport,
    entries: &[BackupEntry],
    format: ReportFormat,
) -> Result<String> {
    match format {
        ReportFormat::Json => to_json(report),
        ReportFormat::Csv => Ok(store_csv(entries)),
        ReportFormat::Markdown => Ok(store_markdown(report, entries)),
    }
}

pub fn render_health(report: &HealthReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => to_json(report),
        ReportFormat::Csv => Ok(health_csv(report)),
        ReportFormat::Markdown => Ok(health_markdown(report)),
    }
}

pub fn render_diagnostics(report: &DiagnosticsReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => to_json(report),
        ReportFormat::Csv => Ok(diagnostics_csv(report)),
        ReportFormat::Markdown => Ok(diagnostics_markdown(report)),
    }
}

pub fn render_execution(execution: &Execution, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => to_json(execution),
        ReportFormat::Csv => Ok(execution_csv(execution)),
        ReportFormat::Markdown => Ok(execution_markdown(execution)),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value)
        .map_err(|e| BroomError::UserError(format!("failed to serialize report: {}", e)))?;
    json.push('\n');
    Ok(json)
}

/// Quote a CSV field when it contains a delimiter, quote, or newline.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

// ============================================================
// Analysis
// ============================================================

fn analysis_csv(report: &AnalysisReport) -> String {
    let mut out = String::from("file,line,category,severity,message\n");
    for issue in &report.issues {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_escape(&issue.file),
            issue.line,
            issue.category.as_str(),
            issue.severity.as_str(),
            csv_escape(&issue.message),
        ));
    }
    out
}

fn analysis_markdown(report: &AnalysisReport) -> String {
    let mut out = String::from("# Analysis Report\n\n");
    out.push_str(&format!("Generated: {}\n", fmt_ts(&report.generated_at)));
    out.push_str(&format!(
        "Files scanned: {} ({} bytes) in {} ms\n",
        report.files_scanned, report.bytes_scanned, report.elapsed_ms
    ));

    out.push_str(&format!("\n## Issues ({})\n\n", report.issues.len()));
    if report.issues.is_empty() {
        out.push_str("No issues found.\n");
    } else {
        out.push_str("| File | Line | Category | Severity | Message |\n");
        out.push_str("|------|------|----------|----------|---------|\n");
        for issue in &report.issues {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                issue.file,
                issue.line,
                issue.category.as_str(),
                issue.severity.as_str(),
                issue.message,
            ));
        }
    }

    if !report.perf_issues.is_empty() {
        out.push_str(&format!(
            "\n## Performance findings ({})\n\n",
            report.perf_issues.len()
        ));
        for perf in &report.perf_issues {
            out.push_str(&format!(
                "- {}: {} ({})\n",
                perf.file,
                perf.message,
                perf.kind.as_str()
            ));
        }
    }

    if !report.duplicate_groups.is_empty() {
        out.push_str(&format!(
            "\n## Duplicate files ({} group(s))\n\n",
            report.duplicate_groups.len()
        ));
        for group in &report.duplicate_groups {
            out.push_str(&format!(
                "- {} file(s) x {} bytes ({}): {}\n",
                group.files.len(),
                group.size,
                &group.checksum[..12.min(group.checksum.len())],
                group.files.join(", ")
            ));
        }
    }

    out
}

// ============================================================
// Backup store
// ============================================================

fn store_csv(entries: &[BackupEntry]) -> String {
    let mut out = String::from("id,created_at,kind,status,files,bytes,description\n");
    for entry in entries {
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            entry.id,
            fmt_ts(&entry.created_at),
            entry.kind.as_str(),
            entry.status.as_str(),
            entry.file_count(),
            entry.metadata.total_bytes,
            csv_escape(&entry.description),
        ));
    }
    out
}

fn store_markdown(report: &StoreReport, entries: &[BackupEntry]) -> String {
    let mut out = String::from("# Backup Store Report\n\n");
    out.push_str(&format!("Generated: {}\n", fmt_ts(&report.generated_at)));
    out.push_str(&format!(
        "Entries: {} ({} bytes)\n",
        report.entry_count, report.total_bytes
    ));
    out.push_str(&format!("Health: {}\n", report.health.as_str()));
    if let Some(newest) = &report.newest {
        out.push_str(&format!("Newest: {}\n", fmt_ts(newest)));
    }
    if let Some(oldest) = &report.oldest {
        out.push_str(&format!("Oldest: {}\n", fmt_ts(oldest)));
    }

    if !report.kind_counts.is_empty() {
        out.push_str("\n## Entries by kind\n\n");
        for (kind, count) in &report.kind_counts {
            out.push_str(&format!("- {}: {}\n", kind, count));
        }
    }

    if !report.corrupted.is_empty() {
        out.push_str("\n## Corrupted entries\n\n");
        for id in &report.corrupted {
            out.push_str(&format!("- {}\n", id));
        }
    }

    if !report.advisories.is_empty() {
        out.push_str("\n## Advisories\n\n");
        for advisory in &report.advisories {
            out.push_str(&format!("- {}\n", advisory));
        }
    }

    if !entries.is_empty() {
        out.push_str("\n## Entries\n\n");
        out.push_str("| Id | Created | Kind | Status | Files | Bytes |\n");
        out.push_str("|----|---------|------|--------|-------|-------|\n");
        for entry in entries {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                entry.id,
                fmt_ts(&entry.created_at),
                entry.kind.as_str(),
                entry.status.as_str(),
                entry.file_count(),
                entry.metadata.total_bytes,
            ));
        }
    }

    out
}

// ============================================================
// Health
// ============================================================

fn health_csv(report: &HealthReport) -> String {
    let mut out = String::from("module,tier,probe,state,detail\n");
    for module in &report.modules {
        for probe in &module.probes {
            out.push_str(&format!(
                "{},{},{},{},{}\n",
                module.id,
                module.tier.as_str(),
                probe.name,
                probe.state.as_str(),
                csv_escape(&probe.detail),
            ));
        }
    }
    out
}

fn health_markdown(report: &HealthReport) -> String {
    let mut out = String::from("# Health Report\n\n");
    out.push_str(&format!("Generated: {}\n", fmt_ts(&report.generated_at)));
    out.push_str(&format!("Overall: {}\n", report.overall.as_str()));

    for module in &report.modules {
        out.push_str(&format!(
            "\n## {} ({}): {}\n\n",
            module.name,
            module.tier.as_str(),
            module.state.as_str()
        ));
        for probe in &module.probes {
            out.push_str(&format!(
                "- [{}] {}: {}\n",
                probe.state.as_str(),
                probe.name,
                probe.detail
            ));
        }
    }

    if !report.repairs.is_empty() {
        out.push_str("\n## Repairs applied\n\n");
        for repair in &report.repairs {
            out.push_str(&format!("- {}\n", repair));
        }
    }

    out
}

// ============================================================
// Diagnostics
// ============================================================

fn diagnostics_csv(report: &DiagnosticsReport) -> String {
    let mut out = String::from("area,status,elapsed_ms,findings\n");
    for area in &report.areas {
        out.push_str(&format!(
            "{},{},{},{}\n",
            area.area,
            area.status.as_str(),
            area.elapsed_ms,
            csv_escape(&area.findings.join("; ")),
        ));
    }
    out
}

fn diagnostics_markdown(report: &DiagnosticsReport) -> String {
    let mut out = String::from("# Diagnostics Report\n\n");
    out.push_str(&format!("Generated: {}\n", fmt_ts(&report.generated_at)));
    out.push_str(&format!("Overall: {}\n", report.overall.as_str()));

    for area in &report.areas {
        out.push_str(&format!(
            "\n## {}: {} ({} ms)\n\n",
            area.area,
            area.status.as_str(),
            area.elapsed_ms
        ));
        for finding in &area.findings {
            out.push_str(&format!("- {}\n", finding));
        }
    }

    out
}

// ============================================================
// Execution
// ============================================================

fn execution_csv(execution: &Execution) -> String {
    let mut out = String::from("step,result,duration_ms,files_touched,bytes_processed,detail\n");
    for report in &execution.step_reports {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            report.step_id,
            if report.ok { "ok" } else { "failed" },
            report.duration_ms,
            report.files_touched,
            report.bytes_processed,
            csv_escape(&report.detail),
        ));
    }
    out
}

fn execution_markdown(execution: &Execution) -> String {
    let mut out = String::from("# Run Report\n\n");
    out.push_str(&format!("Plan: {}\n", execution.plan_id));
    out.push_str(&format!("Execution: {}\n", execution.id));
    out.push_str(&format!("Status: {}\n", execution.status.as_str()));
    out.push_str(&format!("Progress: {}%\n", execution.progress));
    out.push_str(&format!("Started: {}\n", fmt_ts(&execution.started_at)));
    if let Some(finished) = &execution.finished_at {
        out.push_str(&format!("Finished: {}\n", fmt_ts(finished)));
    }
    if let Some(backup_id) = &execution.backup_id {
        out.push_str(&format!("Backup: {}\n", backup_id));
    }

    if !execution.step_reports.is_empty() {
        out.push_str("\n## Steps\n\n");
        out.push_str("| Step | Result | Duration | Detail |\n");
        out.push_str("|------|--------|----------|--------|\n");
        for report in &execution.step_reports {
            out.push_str(&format!(
                "| {} | {} | {} ms | {} |\n",
                report.step_id,
                if report.ok { "ok" } else { "failed" },
                report.duration_ms,
                report.detail.replace('\n', " "),
            ));
        }
    }

    if !execution.skipped_steps.is_empty() {
        out.push_str(&format!(
            "\nSkipped: {}\n",
            execution.skipped_steps.join(", ")
        ));
    }

    let totals = &execution.totals;
    out.push_str("\n## Totals\n\n");
    out.push_str(&format!("- Files scanned: {}\n", totals.files_scanned));
    out.push_str(&format!("- Files changed: {}\n", totals.files_changed));
    out.push_str(&format!("- Files removed: {}\n", totals.files_removed));
    out.push_str(&format!("- Issues found: {}\n", totals.issues_found));
    out.push_str(&format!("- Issues fixed: {}\n", totals.issues_fixed));
    out.push_str(&format!("- Bytes reclaimed: {}\n", totals.bytes_reclaimed));

    if !totals.errors.is_empty() {
        out.push_str("\n## Errors\n\n");
        for error in &totals.errors {
            out.push_str(&format!("- {}\n", error.replace('\n', " ")));
        }
    }

    if let Some(rollback) = &execution.rollback {
        out.push_str("\n## Rollback\n\n");
        out.push_str(&format!("- Rollback id: {}\n", rollback.rollback_id));
        out.push_str(&format!("- Backup: {}\n", rollback.backup_id));
        out.push_str(&format!(
            "- Restored {} file(s), skipped {}\n",
            rollback.files_restored, rollback.files_skipped
        ));
    }

    out
}
