//! Source tree analyzer.
//!
//! The analyzer walks the project, inspects source files line by line for
//! code issues (leftover debug statements, stub markers, duplicate
//! imports), and optionally collects performance findings and duplicate
//! file groups. All pattern tables come from the config; nothing is
//! hard-coded.
//!
//! Analysis never mutates the tree. The cleanup steps share the import
//! detection helpers in `checks` so the fixer and the reporter agree on
//! what counts as an import line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

mod checks;
mod duplicates;
mod scanner;

pub use checks::{CheckSet, import_block_len, is_import_line};
pub use duplicates::find_duplicate_groups;
pub use scanner::{ScanOptions, scan_tree};

/// Severity of a code issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category of a code issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    DebugStatement,
    StubMarker,
    DuplicateImport,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::DebugStatement => "debug_statement",
            IssueCategory::StubMarker => "stub_marker",
            IssueCategory::DuplicateImport => "duplicate_import",
        }
    }
}

/// A code issue found in a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Project-relative file path (forward slashes).
    pub file: String,

    /// 1-based line number.
    pub line: usize,

    pub category: IssueCategory,
    pub severity: Severity,

    /// Short description of the finding.
    pub message: String,

    /// Suggested fix, when one is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Kind of a performance finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerfKind {
    LargeFile,
    LongLines,
    BlankRuns,
}

impl PerfKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerfKind::LargeFile => "large_file",
            PerfKind::LongLines => "long_lines",
            PerfKind::BlankRuns => "blank_runs",
        }
    }
}

/// A per-file performance finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerfIssue {
    /// Project-relative file path (forward slashes).
    pub file: String,

    pub kind: PerfKind,

    /// Short description of the finding.
    pub message: String,
}

/// A group of byte-identical files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// SHA-256 of the shared content.
    pub checksum: String,

    /// Size of each file in the group, in bytes.
    pub size: u64,

    /// Project-relative paths, sorted.
    pub files: Vec<String>,
}

/// Result of one analysis pass over the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,

    /// Number of files visited (after excludes).
    pub files_scanned: usize,

    /// Total bytes across visited files.
    pub bytes_scanned: u64,

    pub issues: Vec<Issue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub perf_issues: Vec<PerfIssue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_groups: Vec<DuplicateGroup>,

    pub elapsed_ms: u64,
}

impl AnalysisReport {
    /// Number of issues with the given severity.
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Total findings across issues, performance findings, and duplicate
    /// groups.
    pub fn total_findings(&self) -> usize {
        self.issues.len() + self.perf_issues.len() + self.duplicate_groups.len()
    }
}
