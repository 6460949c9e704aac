//! Step execution.
//!
//! Each step's file set is resolved before the run starts so the
//! scheduler can overlap steps with disjoint sets. Workers then execute
//! one step at a time against its resolved scope; every error comes back
//! inside the [`StepReport`] rather than unwinding through the pool.

use super::cancel::CancelToken;
use super::types::{StepReport, Totals};
use crate::analyze::{
    ScanOptions, find_duplicate_groups, import_block_len, is_import_line, scan_tree,
};
use crate::backup::{BackupKind, BackupStore, ChangeKind};
use crate::config::Config;
use crate::context::ProjectContext;
use crate::error::{BroomError, Result};
use crate::fs::{WalkedFile, atomic_write_file, build_globset, walk_project};
use crate::plan::{AnalysisDepth, Plan, Step, StepAction};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Instant;

/// Maximum lines of verify-command output kept in a failure message.
const VERIFY_OUTPUT_MAX_LINES: usize = 50;

/// Maximum characters of verify-command output kept in a failure message.
const VERIFY_OUTPUT_MAX_CHARS: usize = 4096;

/// Shared, read-only context for executing steps.
pub struct StepRun<'a> {
    pub ctx: &'a ProjectContext,
    pub config: &'a Config,
    pub store: &'a BackupStore<'a>,
    pub token: &'a CancelToken,

    /// Operation label for snapshots and events (e.g., "run quick_cleanup").
    pub operation: String,
}

/// The files a step will read or write, resolved before the run starts.
#[derive(Debug, Clone, Default)]
pub struct StepScope {
    /// Affected files with the change the step is expected to make.
    pub files: Vec<(WalkedFile, ChangeKind)>,

    /// Whether the step must run with the pool otherwise empty.
    pub exclusive: bool,
}

impl StepScope {
    /// Relative paths in this scope, for the disjointness gate.
    pub fn rel_set(&self) -> HashSet<String> {
        self.files.iter().map(|(f, _)| f.rel_str()).collect()
    }

    /// True when no file in this scope appears in `other`.
    pub fn is_disjoint(&self, other: &HashSet<String>) -> bool {
        self.files.iter().all(|(f, _)| !other.contains(&f.rel_str()))
    }
}

/// Resolve which files a step will touch.
///
/// Read-only steps (analysis, verification) resolve to an empty scope:
/// the gate only serializes writes. Snapshot steps are resolved
/// separately via [`union_mutating_scope`] because they need the other
/// steps' scopes.
pub fn resolve_scope(root: &std::path::Path, config: &Config, step: &Step) -> Result<StepScope> {
    let files = match &step.action {
        StepAction::DedupeImports | StepAction::TidyWhitespace | StepAction::CollapseBlankLines => {
            source_files(root, config, &step.patterns)?
                .into_iter()
                .map(|f| (f, ChangeKind::Modified))
                .collect()
        }
        StepAction::RemoveJunk => junk_files(root, config, &step.patterns)?
            .into_iter()
            .map(|f| (f, ChangeKind::Deleted))
            .collect(),
        _ => Vec::new(),
    };

    Ok(StepScope {
        files,
        exclusive: step.is_exclusive(),
    })
}

/// Scope for a snapshot step: the union of every mutating step's files.
///
/// A file targeted by both a rewriting and a deleting step records the
/// deletion, so the restore path knows to recreate it.
pub fn union_mutating_scope(plan: &Plan, scopes: &BTreeMap<String, StepScope>) -> StepScope {
    let mut by_rel: BTreeMap<String, (WalkedFile, ChangeKind)> = BTreeMap::new();

    for step in &plan.steps {
        if !step.mutates_tree() {
            continue;
        }
        let Some(scope) = scopes.get(&step.id) else {
            continue;
        };
        for (file, change) in &scope.files {
            by_rel
                .entry(file.rel_str())
                .and_modify(|(_, existing)| {
                    if *change == ChangeKind::Deleted {
                        *existing = ChangeKind::Deleted;
                    }
                })
                .or_insert_with(|| (file.clone(), *change));
        }
    }

    StepScope {
        files: by_rel.into_values().collect(),
        exclusive: false,
    }
}

fn source_files(
    root: &std::path::Path,
    config: &Config,
    patterns: &[String],
) -> Result<Vec<WalkedFile>> {
    let exclude = build_globset(&config.exclude_globs)?;
    let mut files = walk_project(root, &exclude)?;
    files.retain(|f| config.is_source_file(&f.path));

    if !patterns.is_empty() {
        let narrow = build_globset(patterns)?;
        files.retain(|f| narrow.is_match(f.rel_str()));
    }
    Ok(files)
}

fn junk_files(
    root: &std::path::Path,
    config: &Config,
    patterns: &[String],
) -> Result<Vec<WalkedFile>> {
    let exclude = build_globset(&config.exclude_globs)?;
    let files = walk_project(root, &exclude)?;

    let globs = if patterns.is_empty() {
        &config.junk_globs
    } else {
        patterns
    };
    let junk = build_globset(globs)?;

    Ok(files
        .into_iter()
        .filter(|f| junk.is_match(f.rel_str()))
        .collect())
}

/// Result of one step action, before timing is attached.
struct StepOutput {
    detail: String,
    files_touched: usize,
    bytes_processed: u64,
    backup_id: Option<String>,
    totals: Totals,
}

impl StepOutput {
    fn message(detail: String) -> Self {
        Self {
            detail,
            files_touched: 0,
            bytes_processed: 0,
            backup_id: None,
            totals: Totals::default(),
        }
    }
}

/// Execute one step against its resolved scope.
///
/// Never returns an error: failures are reported through `ok`/`detail`
/// so the coordinator can decide whether they abort the run.
pub fn execute_step(
    run: &StepRun,
    step: &Step,
    scope: &StepScope,
    backup_id: Option<&str>,
) -> StepReport {
    let started = Instant::now();

    let result = match &step.action {
        StepAction::Analyze { depth } => run_analysis(run, *depth, &step.patterns),
        StepAction::Snapshot => run_snapshot(run, scope),
        StepAction::DedupeImports => run_dedupe_imports(run, scope),
        StepAction::TidyWhitespace => run_tidy_whitespace(run, scope),
        StepAction::RemoveJunk => run_remove_junk(run, scope),
        StepAction::CollapseBlankLines => run_collapse_blank_lines(run, scope),
        StepAction::FindDuplicates => run_find_duplicates(run, &step.patterns),
        StepAction::VerifySnapshots => run_verify_snapshots(run, backup_id),
        StepAction::VerifyStore => run_verify_store(run),
        StepAction::RunVerifyCommand => run_external_command(run),
    };

    let duration_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(out) => StepReport {
            step_id: step.id.clone(),
            ok: true,
            detail: out.detail,
            duration_ms,
            files_touched: out.files_touched,
            bytes_processed: out.bytes_processed,
            backup_id: out.backup_id,
            totals: out.totals,
        },
        Err(e) => StepReport::failure(&step.id, e.to_string(), duration_ms),
    }
}

fn ensure_not_cancelled(token: &CancelToken) -> Result<()> {
    if token.is_cancelled() {
        return Err(BroomError::StepError("cancelled before completion".to_string()));
    }
    Ok(())
}

fn run_analysis(run: &StepRun, depth: AnalysisDepth, patterns: &[String]) -> Result<StepOutput> {
    ensure_not_cancelled(run.token)?;

    let opts = match depth {
        AnalysisDepth::Quick => ScanOptions::quick(),
        AnalysisDepth::Deep => ScanOptions::deep(),
    }
    .with_patterns(patterns.to_vec());

    let report = scan_tree(&run.ctx.project_root, run.config, &opts)
        .map_err(|e| BroomError::AnalysisError(e.to_string()))?;

    let issues_found = report.issues.len() + report.perf_issues.len();
    let totals = Totals {
        files_scanned: report.files_scanned,
        issues_found,
        duplicate_groups: report.duplicate_groups.len(),
        ..Default::default()
    };

    Ok(StepOutput {
        detail: format!(
            "{} file(s) scanned, {} issue(s) found",
            report.files_scanned, issues_found
        ),
        files_touched: report.files_scanned,
        bytes_processed: report.bytes_scanned,
        backup_id: None,
        totals,
    })
}

fn run_snapshot(run: &StepRun, scope: &StepScope) -> Result<StepOutput> {
    ensure_not_cancelled(run.token)?;

    let targets: Vec<(PathBuf, ChangeKind)> = scope
        .files
        .iter()
        .map(|(f, change)| (f.path.clone(), *change))
        .collect();

    let entry = run.store.create(
        BackupKind::PreRun,
        &format!("before {}", run.operation),
        &run.operation,
        &targets,
    )?;

    Ok(StepOutput {
        detail: format!("snapshot {} covers {} file(s)", entry.id, entry.file_count()),
        files_touched: entry.file_count(),
        bytes_processed: entry.metadata.total_bytes,
        backup_id: Some(entry.id),
        totals: Totals::default(),
    })
}

fn run_dedupe_imports(run: &StepRun, scope: &StepScope) -> Result<StepOutput> {
    let mut files_changed = 0;
    let mut removed_total = 0;
    let mut bytes = 0u64;

    for (file, _) in &scope.files {
        ensure_not_cancelled(run.token)?;
        // Binary or vanished files are not import-bearing; skip quietly
        let Ok(content) = fs::read_to_string(&file.path) else {
            continue;
        };
        bytes += content.len() as u64;

        if let Some((fixed, removed)) = dedupe_import_content(&content) {
            atomic_write_file(&file.path, &fixed)?;
            files_changed += 1;
            removed_total += removed;
        }
    }

    Ok(StepOutput {
        detail: format!(
            "removed {} duplicate import line(s) across {} file(s)",
            removed_total, files_changed
        ),
        files_touched: scope.files.len(),
        bytes_processed: bytes,
        backup_id: None,
        totals: Totals {
            files_changed,
            issues_fixed: removed_total,
            ..Default::default()
        },
    })
}

fn run_tidy_whitespace(run: &StepRun, scope: &StepScope) -> Result<StepOutput> {
    let mut files_changed = 0;
    let mut fixes_total = 0;
    let mut bytes = 0u64;

    for (file, _) in &scope.files {
        ensure_not_cancelled(run.token)?;
        let Ok(content) = fs::read_to_string(&file.path) else {
            continue;
        };
        bytes += content.len() as u64;

        if let Some((fixed, fixes)) = tidy_content(&content) {
            atomic_write_file(&file.path, &fixed)?;
            files_changed += 1;
            fixes_total += fixes;
        }
    }

    Ok(StepOutput {
        detail: format!("tidied whitespace in {} file(s)", files_changed),
        files_touched: scope.files.len(),
        bytes_processed: bytes,
        backup_id: None,
        totals: Totals {
            files_changed,
            issues_fixed: fixes_total,
            ..Default::default()
        },
    })
}

fn run_remove_junk(run: &StepRun, scope: &StepScope) -> Result<StepOutput> {
    let mut files_removed = 0;
    let mut bytes_reclaimed = 0u64;

    for (file, _) in &scope.files {
        ensure_not_cancelled(run.token)?;

        // The walker only yields files under the root; re-check before
        // deleting anyway.
        if !file.path.starts_with(&run.ctx.project_root) {
            return Err(BroomError::StepError(format!(
                "refusing to delete '{}': outside the project root",
                file.path.display()
            )));
        }

        match fs::remove_file(&file.path) {
            Ok(()) => {
                files_removed += 1;
                bytes_reclaimed += file.size;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(BroomError::StepError(format!(
                    "failed to remove '{}': {}",
                    file.path.display(),
                    e
                )));
            }
        }
    }

    Ok(StepOutput {
        detail: format!(
            "removed {} junk file(s), reclaimed {} byte(s)",
            files_removed, bytes_reclaimed
        ),
        files_touched: scope.files.len(),
        bytes_processed: bytes_reclaimed,
        backup_id: None,
        totals: Totals {
            files_removed,
            bytes_reclaimed,
            ..Default::default()
        },
    })
}

fn run_collapse_blank_lines(run: &StepRun, scope: &StepScope) -> Result<StepOutput> {
    let mut files_changed = 0;
    let mut runs_collapsed = 0;
    let mut bytes = 0u64;

    for (file, _) in &scope.files {
        ensure_not_cancelled(run.token)?;
        let Ok(content) = fs::read_to_string(&file.path) else {
            continue;
        };
        bytes += content.len() as u64;

        if let Some((fixed, collapsed)) = collapse_content(&content) {
            atomic_write_file(&file.path, &fixed)?;
            files_changed += 1;
            runs_collapsed += collapsed;
        }
    }

    Ok(StepOutput {
        detail: format!("normalized {} file(s)", files_changed),
        files_touched: scope.files.len(),
        bytes_processed: bytes,
        backup_id: None,
        totals: Totals {
            files_changed,
            issues_fixed: runs_collapsed,
            ..Default::default()
        },
    })
}

fn run_find_duplicates(run: &StepRun, patterns: &[String]) -> Result<StepOutput> {
    ensure_not_cancelled(run.token)?;

    let exclude = build_globset(&run.config.exclude_globs)?;
    let mut files = walk_project(&run.ctx.project_root, &exclude)?;
    if !patterns.is_empty() {
        let narrow = build_globset(patterns)?;
        files.retain(|f| narrow.is_match(f.rel_str()));
    }

    let bytes: u64 = files.iter().map(|f| f.size).sum();
    let groups = find_duplicate_groups(&files, run.config.duplicate_min_bytes)?;
    let duplicate_files: usize = groups.iter().map(|g| g.files.len()).sum();

    Ok(StepOutput {
        detail: format!(
            "{} duplicate group(s) covering {} file(s)",
            groups.len(),
            duplicate_files
        ),
        files_touched: files.len(),
        bytes_processed: bytes,
        backup_id: None,
        totals: Totals {
            files_scanned: files.len(),
            duplicate_groups: groups.len(),
            ..Default::default()
        },
    })
}

fn run_verify_snapshots(run: &StepRun, backup_id: Option<&str>) -> Result<StepOutput> {
    ensure_not_cancelled(run.token)?;

    let Some(id) = backup_id else {
        return Err(BroomError::StepError(
            "no snapshot was taken earlier in this run".to_string(),
        ));
    };

    let outcomes = run.store.verify_store(Some(id))?;
    let outcome = outcomes
        .into_iter()
        .next()
        .ok_or_else(|| BroomError::BackupError(format!("backup not found: '{}'", id)))?;

    if !outcome.ok {
        return Err(BroomError::StepError(format!(
            "snapshot {} failed verification: {}",
            id,
            outcome.problems.join("; ")
        )));
    }

    Ok(StepOutput::message(format!("snapshot {} verified", id)))
}

fn run_verify_store(run: &StepRun) -> Result<StepOutput> {
    ensure_not_cancelled(run.token)?;

    let outcomes = run.store.verify_store(None)?;
    let bad: Vec<String> = outcomes
        .iter()
        .filter(|o| !o.ok)
        .map(|o| o.backup_id.clone())
        .collect();

    if !bad.is_empty() {
        return Err(BroomError::StepError(format!(
            "backup store verification failed for: {}",
            bad.join(", ")
        )));
    }

    let mut out = StepOutput::message(format!("{} backup entries verified", outcomes.len()));
    out.files_touched = outcomes.len();
    Ok(out)
}

fn run_external_command(run: &StepRun) -> Result<StepOutput> {
    ensure_not_cancelled(run.token)?;

    let command = run.config.verify_command.trim();
    if command.is_empty() {
        return Ok(StepOutput::message(
            "no verify command configured".to_string(),
        ));
    }

    let args = shell_words::split(command).map_err(|e| {
        BroomError::StepError(format!(
            "failed to parse verify command: {}\nCommand: {}\nFix: check for unmatched quotes or invalid escape sequences.",
            e, command
        ))
    })?;

    let Some((program, rest)) = args.split_first() else {
        return Err(BroomError::StepError(format!(
            "verify command is empty after parsing.\nCommand: {}",
            command
        )));
    };

    let output = Command::new(program)
        .args(rest)
        .current_dir(&run.ctx.project_root)
        .output()
        .map_err(|e| {
            BroomError::StepError(format!(
                "failed to execute verify command: {}\nCommand: {}\nFix: ensure the command is installed and in PATH.",
                e, command
            ))
        })?;

    if output.status.success() {
        return Ok(StepOutput::message(format!(
            "verify command passed: {}",
            command
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let combined = if !stderr.is_empty() {
        format!("{}\n{}", stdout, stderr)
    } else {
        stdout
    };

    let mut msg = format!(
        "verify command failed with exit code {}\nCommand: {}",
        output.status.code().unwrap_or(-1),
        command
    );
    let truncated = truncate_output(&combined, VERIFY_OUTPUT_MAX_LINES, VERIFY_OUTPUT_MAX_CHARS);
    if !truncated.is_empty() {
        msg.push_str("\nOutput (truncated):\n");
        msg.push_str(&truncated);
    }

    Err(BroomError::StepError(msg))
}

/// Keep the tail of a command's output: the last `max_lines` lines,
/// clipped to at most `max_chars` on a char boundary.
fn truncate_output(output: &str, max_lines: usize, max_chars: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    let mut result = lines[start..].join("\n");

    if result.len() > max_chars {
        let mut cut = result.len() - max_chars;
        while !result.is_char_boundary(cut) {
            cut += 1;
        }
        result = format!("...(truncated)...\n{}", &result[cut..]);
    }

    result
}

/// Remove exact duplicate import lines from the leading import block.
///
/// Returns the fixed content and the number of removed lines, or None
/// when nothing changed.
fn dedupe_import_content(content: &str) -> Option<(String, usize)> {
    let lines: Vec<&str> = content.lines().collect();
    let block_len = import_block_len(&lines);

    let mut seen: HashSet<&str> = HashSet::new();
    let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
    let mut removed = 0;

    for (idx, line) in lines.iter().enumerate() {
        if idx < block_len && is_import_line(line) && !seen.insert(line.trim()) {
            removed += 1;
            continue;
        }
        kept.push(line);
    }

    if removed == 0 {
        return None;
    }

    let mut fixed = kept.join("\n");
    if content.ends_with('\n') {
        fixed.push('\n');
    }
    Some((fixed, removed))
}

/// Strip trailing whitespace per line, drop trailing blank lines, and
/// end the file with exactly one newline.
///
/// Returns the fixed content and a fix count, or None when the file is
/// already tidy. Empty files are left alone.
fn tidy_content(content: &str) -> Option<(String, usize)> {
    if content.is_empty() {
        return None;
    }

    let mut fixes = 0;
    let mut kept: Vec<&str> = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim_end();
        if trimmed.len() != line.len() {
            fixes += 1;
        }
        kept.push(trimmed);
    }

    while kept.last() == Some(&"") {
        kept.pop();
        fixes += 1;
    }

    let mut fixed = kept.join("\n");
    fixed.push('\n');

    if fixed == content {
        return None;
    }
    if fixes == 0 {
        // Only the final newline was missing or doubled
        fixes = 1;
    }
    Some((fixed, fixes))
}

/// Collapse runs of 3+ blank lines to a single blank line and normalize
/// CRLF endings to LF.
///
/// Returns the fixed content and the number of collapsed runs, or None
/// when nothing changed.
fn collapse_content(content: &str) -> Option<(String, usize)> {
    let normalized = content.replace("\r\n", "\n");

    let mut out: Vec<&str> = Vec::new();
    let mut blanks = 0usize;
    let mut collapsed_runs = 0;

    let mut flush = |out: &mut Vec<&str>, blanks: &mut usize, collapsed: &mut usize| {
        if *blanks >= 3 {
            out.push("");
            *collapsed += 1;
        } else {
            for _ in 0..*blanks {
                out.push("");
            }
        }
        *blanks = 0;
    };

    for line in normalized.lines() {
        if line.trim().is_empty() {
            blanks += 1;
        } else {
            flush(&mut out, &mut blanks, &mut collapsed_runs);
            out.push(line);
        }
    }
    flush(&mut out, &mut blanks, &mut collapsed_runs);

    let mut fixed = out.join("\n");
    if normalized.ends_with('\n') {
        fixed.push('\n');
    }

    if fixed == content {
        return None;
    }
    Some((fixed, collapsed_runs))
}
