//! Line-level checks for source files.

use super::{Issue, IssueCategory, PerfIssue, PerfKind, Severity};
use crate::config::Config;
use crate::error::{BroomError, Result};
use regex::Regex;
use std::collections::HashMap;

/// Compiled pattern tables for one analysis pass.
pub struct CheckSet {
    debug_patterns: Vec<Regex>,
    stub_patterns: Vec<Regex>,
    max_line_length: usize,
    large_file_bytes: u64,
}

impl CheckSet {
    /// Compile the configured patterns.
    ///
    /// Config validation already checks that every pattern compiles, so a
    /// failure here means the config was bypassed; the message still names
    /// the bad pattern.
    pub fn compile(config: &Config) -> Result<Self> {
        Ok(Self {
            debug_patterns: compile_patterns(&config.debug_patterns)?,
            stub_patterns: compile_patterns(&config.stub_patterns)?,
            max_line_length: config.max_line_length as usize,
            large_file_bytes: config.large_file_kb * 1024,
        })
    }

    /// Scan one file's content for code issues.
    pub fn check_file(&self, rel: &str, content: &str) -> Vec<Issue> {
        let lines: Vec<&str> = content.lines().collect();
        let mut issues = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let line_no = idx + 1;

            for pattern in &self.debug_patterns {
                if pattern.is_match(line) {
                    issues.push(Issue {
                        file: rel.to_string(),
                        line: line_no,
                        category: IssueCategory::DebugStatement,
                        severity: Severity::Medium,
                        message: format!("leftover debug statement: {}", snippet(line)),
                        suggestion: Some("remove before committing".to_string()),
                    });
                    break;
                }
            }

            for pattern in &self.stub_patterns {
                if pattern.is_match(line) {
                    issues.push(Issue {
                        file: rel.to_string(),
                        line: line_no,
                        category: IssueCategory::StubMarker,
                        severity: Severity::Low,
                        message: format!("stub marker: {}", snippet(line)),
                        suggestion: None,
                    });
                    break;
                }
            }
        }

        issues.extend(duplicate_import_issues(rel, &lines));
        issues
    }

    /// Collect performance findings for one file.
    pub fn perf_issues(&self, rel: &str, size: u64, content: &str) -> Vec<PerfIssue> {
        let mut findings = Vec::new();

        if size > self.large_file_bytes {
            findings.push(PerfIssue {
                file: rel.to_string(),
                kind: PerfKind::LargeFile,
                message: format!(
                    "file is {} KB (threshold {} KB)",
                    size / 1024,
                    self.large_file_bytes / 1024
                ),
            });
        }

        let long_lines = content
            .lines()
            .filter(|l| l.chars().count() > self.max_line_length)
            .count();
        if long_lines > 0 {
            findings.push(PerfIssue {
                file: rel.to_string(),
                kind: PerfKind::LongLines,
                message: format!(
                    "{} line(s) exceed {} characters",
                    long_lines, self.max_line_length
                ),
            });
        }

        let blank_runs = count_blank_runs(content);
        if blank_runs > 0 {
            findings.push(PerfIssue {
                file: rel.to_string(),
                kind: PerfKind::BlankRuns,
                message: format!("{} run(s) of 3+ blank lines", blank_runs),
            });
        }

        findings
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p)
                .map_err(|e| BroomError::UserError(format!("invalid pattern '{}': {}", p, e)))
        })
        .collect()
}

/// Trim a line for display in a finding message.
fn snippet(line: &str) -> String {
    let trimmed = line.trim();
    if trimmed.chars().count() > 60 {
        let head: String = trimmed.chars().take(57).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}

/// Whether a line looks like an import/include statement.
///
/// Shared between the analyzer and the import deduplication step so both
/// agree on what counts as an import.
pub fn is_import_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("use ")
        || trimmed.starts_with("pub use ")
        || trimmed.starts_with("import ")
        || trimmed.starts_with("from ")
        || trimmed.starts_with("#include")
}

/// Length of the leading import block, in lines.
///
/// The block extends from the top of the file through imports, blank
/// lines, comments, and attributes; the first other line ends it.
pub fn import_block_len(lines: &[&str]) -> usize {
    let mut len = 0;
    for line in lines {
        let trimmed = line.trim();
        let belongs = trimmed.is_empty()
            || is_import_line(line)
            || trimmed.starts_with("//")
            || trimmed.starts_with('#')
            || trimmed.starts_with("/*")
            || trimmed.starts_with('*');
        if !belongs {
            break;
        }
        len += 1;
    }
    len
}

/// Issues for exact duplicate import lines within the leading import block.
fn duplicate_import_issues(rel: &str, lines: &[&str]) -> Vec<Issue> {
    let block_len = import_block_len(lines);
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    let mut issues = Vec::new();

    for (idx, line) in lines[..block_len].iter().enumerate() {
        let trimmed = line.trim();
        if !is_import_line(line) {
            continue;
        }

        match first_seen.get(trimmed) {
            Some(&first_line) => issues.push(Issue {
                file: rel.to_string(),
                line: idx + 1,
                category: IssueCategory::DuplicateImport,
                severity: Severity::Medium,
                message: format!("duplicate import: {}", snippet(line)),
                suggestion: Some(format!("duplicate of line {}", first_line)),
            }),
            None => {
                first_seen.insert(trimmed, idx + 1);
            }
        }
    }

    issues
}

/// Number of runs of 3 or more consecutive blank lines.
pub(crate) fn count_blank_runs(content: &str) -> usize {
    let mut runs = 0;
    let mut current = 0;

    for line in content.lines() {
        if line.trim().is_empty() {
            current += 1;
            if current == 3 {
                runs += 1;
            }
        } else {
            current = 0;
        }
    }

    runs
}
