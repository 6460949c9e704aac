//! Cleanup plan model for broom.
//!
//! A plan is an immutable, compile-time description of a cleanup run: an
//! ordered list of steps, each with a concrete action, an estimated
//! duration, and declared dependencies on earlier steps. Steps form a DAG
//! keyed by step id; the graph submodule validates it and computes which
//! steps are ready to dispatch.
//!
//! Exactly three built-in plans exist (`quick_cleanup`, `full_optimization`,
//! `audit_only`); they are defined in the builtin submodule and looked up
//! by id.

use serde::{Deserialize, Serialize};
use std::fmt;

mod builtin;
mod graph;

pub use builtin::{builtin_plans, find_plan};
pub use graph::{execution_layers, ready_steps, validate_plan};

/// Risk level of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category of a step, derived from its action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Analysis,
    Backup,
    Cleanup,
    Optimization,
    Verification,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Analysis => "analysis",
            StepKind::Backup => "backup",
            StepKind::Cleanup => "cleanup",
            StepKind::Optimization => "optimization",
            StepKind::Verification => "verification",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How thorough an analysis step is.
///
/// Quick scans skip performance findings and duplicate detection;
/// deep scans include both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisDepth {
    Quick,
    Deep,
}

/// The concrete work a step performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepAction {
    /// Scan the tree for code issues (and more, depending on depth).
    Analyze { depth: AnalysisDepth },

    /// Snapshot every file that later mutating steps in the plan can touch.
    Snapshot,

    /// Remove exact duplicate import lines within each file's import block.
    DedupeImports,

    /// Strip trailing whitespace and ensure a single trailing newline.
    TidyWhitespace,

    /// Delete junk files matched by the configured junk globs.
    RemoveJunk,

    /// Collapse runs of 3+ blank lines and normalize CRLF to LF.
    CollapseBlankLines,

    /// Report groups of byte-identical files.
    FindDuplicates,

    /// Recompute checksums for the backup taken earlier in this run.
    VerifySnapshots,

    /// Verify every backup entry in the store.
    VerifyStore,

    /// Run the configured verify command in the project root.
    RunVerifyCommand,
}

/// A single step within a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Step identifier, unique within the plan.
    pub id: String,

    /// Human-readable step name.
    pub name: String,

    /// The work this step performs.
    pub action: StepAction,

    /// Rough duration estimate in seconds, for display only.
    pub estimated_secs: u64,

    /// Whether a failure of this step aborts the run.
    pub critical: bool,

    /// Whether this step's changes are covered by the run's backup.
    pub rollbackable: bool,

    /// Ids of steps that must complete before this one starts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Glob patterns narrowing which files the step touches or scans.
    /// Empty means the action's natural scope (all source files, or the
    /// configured junk globs for junk removal).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
}

impl Step {
    /// The category this step belongs to, derived from its action.
    pub fn kind(&self) -> StepKind {
        match self.action {
            StepAction::Analyze { .. } | StepAction::FindDuplicates => StepKind::Analysis,
            StepAction::Snapshot => StepKind::Backup,
            StepAction::DedupeImports | StepAction::TidyWhitespace | StepAction::RemoveJunk => {
                StepKind::Cleanup
            }
            StepAction::CollapseBlankLines => StepKind::Optimization,
            StepAction::VerifySnapshots
            | StepAction::VerifyStore
            | StepAction::RunVerifyCommand => StepKind::Verification,
        }
    }

    /// Whether this step rewrites or deletes files in the project tree.
    ///
    /// The snapshot step uses this to decide which files need protecting,
    /// and the scheduler uses it for the disjoint-files dispatch gate.
    pub fn mutates_tree(&self) -> bool {
        matches!(
            self.action,
            StepAction::DedupeImports
                | StepAction::TidyWhitespace
                | StepAction::RemoveJunk
                | StepAction::CollapseBlankLines
        )
    }

    /// Whether this step deletes files (rather than rewriting them).
    pub fn deletes_files(&self) -> bool {
        matches!(self.action, StepAction::RemoveJunk)
    }

    /// Whether this step takes a pre-run snapshot.
    pub fn is_snapshot(&self) -> bool {
        matches!(self.action, StepAction::Snapshot)
    }

    /// Whether this step must run alone, with no concurrent steps.
    ///
    /// External commands can touch anything in the tree, so they never
    /// overlap with other steps.
    pub fn is_exclusive(&self) -> bool {
        matches!(self.action, StepAction::RunVerifyCommand)
    }
}

/// An immutable cleanup plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Plan identifier (e.g., "quick_cleanup").
    pub id: String,

    /// Human-readable plan name.
    pub name: String,

    /// One-line description of what the plan does.
    pub description: String,

    /// Risk level of running this plan.
    pub risk: RiskLevel,

    /// Whether the plan snapshots files before mutating them.
    pub backup_required: bool,

    /// Whether a failed run of this plan is rolled back automatically.
    pub rollback_supported: bool,

    /// The steps, in declaration order.
    pub steps: Vec<Step>,
}

impl Plan {
    /// Sum of the per-step duration estimates.
    pub fn total_estimated_secs(&self) -> u64 {
        self.steps.iter().map(|s| s.estimated_secs).sum()
    }

    /// Look up a step by id.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }
}
