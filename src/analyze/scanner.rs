//! Tree scanning entry point.

use super::AnalysisReport;
use super::checks::CheckSet;
use super::duplicates::find_duplicate_groups;
use crate::config::Config;
use crate::error::Result;
use crate::fs::{build_globset, walk_project};
use chrono::Utc;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// What one analysis pass should collect.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Collect per-file performance findings.
    pub include_perf: bool,

    /// Collect duplicate file groups.
    pub include_duplicates: bool,

    /// Extra glob patterns narrowing the scan; empty scans everything.
    pub patterns: Vec<String>,
}

impl ScanOptions {
    /// Code issues only.
    pub fn quick() -> Self {
        Self {
            include_perf: false,
            include_duplicates: false,
            patterns: Vec::new(),
        }
    }

    /// Code issues plus performance findings and duplicate files.
    pub fn deep() -> Self {
        Self {
            include_perf: true,
            include_duplicates: true,
            patterns: Vec::new(),
        }
    }

    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.patterns = patterns;
        self
    }
}

/// Scan the project tree and build an analysis report.
///
/// An empty tree yields an empty report, not an error. Files that cannot
/// be read (racing deletes, permission holes) are skipped.
pub fn scan_tree(root: &Path, config: &Config, opts: &ScanOptions) -> Result<AnalysisReport> {
    let started = Instant::now();
    let checks = CheckSet::compile(config)?;

    let exclude = build_globset(&config.exclude_globs)?;
    let mut files = walk_project(root, &exclude)?;

    if !opts.patterns.is_empty() {
        let narrow = build_globset(&opts.patterns)?;
        files.retain(|f| narrow.is_match(f.rel_str()));
    }

    let mut report = AnalysisReport {
        generated_at: Utc::now(),
        files_scanned: files.len(),
        bytes_scanned: files.iter().map(|f| f.size).sum(),
        issues: Vec::new(),
        perf_issues: Vec::new(),
        duplicate_groups: Vec::new(),
        elapsed_ms: 0,
    };

    for file in &files {
        if !config.is_source_file(&file.path) {
            continue;
        }

        let Ok(bytes) = fs::read(&file.path) else {
            continue;
        };
        let content = String::from_utf8_lossy(&bytes);
        let rel = file.rel_str();

        report.issues.extend(checks.check_file(&rel, &content));
        if opts.include_perf {
            report
                .perf_issues
                .extend(checks.perf_issues(&rel, file.size, &content));
        }
    }

    report
        .issues
        .sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));

    if opts.include_duplicates {
        report.duplicate_groups =
            find_duplicate_groups(&files, config.duplicate_min_bytes)?;
    }

    report.elapsed_ms = started.elapsed().as_millis() as u64;
    Ok(report)
}
