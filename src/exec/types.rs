//! Execution records.

use crate::backup::RollbackOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    RolledBack,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::RolledBack => "rolled_back",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters accumulated across a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Totals {
    pub files_scanned: usize,
    pub files_changed: usize,
    pub files_removed: usize,
    pub issues_found: usize,
    pub issues_fixed: usize,
    pub duplicate_groups: usize,
    pub bytes_reclaimed: u64,

    /// Error descriptions from failed steps, the rollback path, and
    /// cancellation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl Totals {
    /// Fold another step's counters into this run's totals.
    pub fn merge(&mut self, other: &Totals) {
        self.files_scanned += other.files_scanned;
        self.files_changed += other.files_changed;
        self.files_removed += other.files_removed;
        self.issues_found += other.issues_found;
        self.issues_fixed += other.issues_fixed;
        self.duplicate_groups += other.duplicate_groups;
        self.bytes_reclaimed += other.bytes_reclaimed;
        self.errors.extend(other.errors.iter().cloned());
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub step_id: String,

    /// True when the step finished without error.
    pub ok: bool,

    /// One-line result summary, or the failure description.
    pub detail: String,

    /// Wall-clock duration of the step.
    pub duration_ms: u64,

    /// Files the step inspected or rewrote.
    pub files_touched: usize,

    /// Bytes read or written by the step.
    pub bytes_processed: u64,

    /// Backup entry created by this step, if it was a snapshot step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<String>,

    /// Counters contributed by this step.
    pub totals: Totals,
}

impl StepReport {
    /// A failure report with zeroed counters.
    pub fn failure(step_id: impl Into<String>, detail: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            step_id: step_id.into(),
            ok: false,
            detail: detail.into(),
            duration_ms,
            files_touched: 0,
            bytes_processed: 0,
            backup_id: None,
            totals: Totals::default(),
        }
    }
}

/// Record of one plan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    /// Execution id (e.g., "e-20250301-101500").
    pub id: String,

    pub plan_id: String,
    pub status: RunStatus,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Finished steps as a percentage of all steps (0-100).
    pub progress: u8,

    /// A step currently executing, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,

    /// Step ids that finished successfully, in completion order.
    pub completed_steps: Vec<String>,

    /// Step ids that failed, in completion order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_steps: Vec<String>,

    /// Step ids never dispatched because a dependency failed or the run
    /// stopped early.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_steps: Vec<String>,

    /// Backup entry taken by this run's snapshot step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<String>,

    /// Rollback performed after a failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<RollbackOutcome>,

    /// Per-step outcomes, in completion order.
    pub step_reports: Vec<StepReport>,

    pub totals: Totals,
}

impl Execution {
    pub fn new(plan_id: &str) -> Self {
        Self {
            id: format!("e-{}", Utc::now().format("%Y%m%d-%H%M%S")),
            plan_id: plan_id.to_string(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            progress: 0,
            current_step: None,
            completed_steps: Vec::new(),
            failed_steps: Vec::new(),
            skipped_steps: Vec::new(),
            backup_id: None,
            rollback: None,
            step_reports: Vec::new(),
            totals: Totals::default(),
        }
    }

    /// The report for a given step, if that step ran.
    pub fn step_report(&self, step_id: &str) -> Option<&StepReport> {
        self.step_reports.iter().find(|r| r.step_id == step_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_merge() {
        let mut totals = Totals {
            files_scanned: 10,
            issues_found: 2,
            errors: vec!["first".to_string()],
            ..Default::default()
        };

        totals.merge(&Totals {
            files_scanned: 5,
            files_changed: 3,
            issues_found: 1,
            bytes_reclaimed: 42,
            errors: vec!["second".to_string()],
            ..Default::default()
        });

        assert_eq!(totals.files_scanned, 15);
        assert_eq!(totals.files_changed, 3);
        assert_eq!(totals.issues_found, 3);
        assert_eq!(totals.bytes_reclaimed, 42);
        assert_eq!(totals.errors, vec!["first", "second"]);
    }

    #[test]
    fn test_new_execution_starts_running() {
        let execution = Execution::new("quick_cleanup");

        assert!(execution.id.starts_with("e-"));
        assert_eq!(execution.status, RunStatus::Running);
        assert_eq!(execution.progress, 0);
        assert!(execution.finished_at.is_none());
        assert!(execution.completed_steps.is_empty());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&RunStatus::RolledBack).unwrap(),
            r#""rolled_back""#
        );
        assert_eq!(RunStatus::Completed.to_string(), "completed");
    }
}
