//! The built-in cleanup plans.

use super::{AnalysisDepth, Plan, RiskLevel, Step, StepAction};
use crate::error::{BroomError, Result};

/// All built-in plans, in display order.
pub fn builtin_plans() -> Vec<Plan> {
    vec![quick_cleanup(), full_optimization(), audit_only()]
}

/// Look up a built-in plan by id.
pub fn find_plan(plan_id: &str) -> Result<Plan> {
    builtin_plans()
        .into_iter()
        .find(|p| p.id == plan_id)
        .ok_or_else(|| {
            BroomError::UserError(format!(
                "plan not found: '{}'.\nRun `broom plans` to list available plans.",
                plan_id
            ))
        })
}

/// Low-risk pass: analyze, snapshot, then fix imports and styles.
fn quick_cleanup() -> Plan {
    Plan {
        id: "quick_cleanup".to_string(),
        name: "Quick cleanup".to_string(),
        description: "Fix duplicate imports and whitespace issues in source files".to_string(),
        risk: RiskLevel::Low,
        backup_required: true,
        rollback_supported: true,
        steps: vec![
            Step {
                id: "quick_analysis".to_string(),
                name: "Quick analysis".to_string(),
                action: StepAction::Analyze {
                    depth: AnalysisDepth::Quick,
                },
                estimated_secs: 2,
                critical: true,
                rollbackable: false,
                depends_on: vec![],
                patterns: vec![],
            },
            Step {
                id: "backup_quick".to_string(),
                name: "Snapshot affected files".to_string(),
                action: StepAction::Snapshot,
                estimated_secs: 3,
                critical: true,
                rollbackable: false,
                depends_on: vec!["quick_analysis".to_string()],
                patterns: vec![],
            },
            Step {
                id: "fix_imports".to_string(),
                name: "Deduplicate imports".to_string(),
                action: StepAction::DedupeImports,
                estimated_secs: 4,
                critical: false,
                rollbackable: true,
                depends_on: vec!["backup_quick".to_string()],
                patterns: vec![
                    "**/*.rs".to_string(),
                    "**/*.py".to_string(),
                    "**/*.ts".to_string(),
                    "**/*.tsx".to_string(),
                    "**/*.js".to_string(),
                    "**/*.jsx".to_string(),
                ],
            },
            Step {
                id: "fix_styles".to_string(),
                name: "Tidy whitespace".to_string(),
                action: StepAction::TidyWhitespace,
                estimated_secs: 3,
                critical: false,
                rollbackable: true,
                depends_on: vec!["backup_quick".to_string()],
                patterns: vec![],
            },
        ],
    }
}

/// Medium-risk pass: deep analysis, snapshot, junk removal and source
/// normalization (independent of each other), then snapshot verification.
fn full_optimization() -> Plan {
    Plan {
        id: "full_optimization".to_string(),
        name: "Full optimization".to_string(),
        description: "Remove junk files, normalize sources, and verify the snapshot".to_string(),
        risk: RiskLevel::Medium,
        backup_required: true,
        rollback_supported: true,
        steps: vec![
            Step {
                id: "deep_analysis".to_string(),
                name: "Deep analysis".to_string(),
                action: StepAction::Analyze {
                    depth: AnalysisDepth::Deep,
                },
                estimated_secs: 5,
                critical: true,
                rollbackable: false,
                depends_on: vec![],
                patterns: vec![],
            },
            Step {
                id: "backup_full".to_string(),
                name: "Snapshot affected files".to_string(),
                action: StepAction::Snapshot,
                estimated_secs: 6,
                critical: true,
                rollbackable: false,
                depends_on: vec!["deep_analysis".to_string()],
                patterns: vec![],
            },
            Step {
                id: "remove_artifacts".to_string(),
                name: "Remove junk files".to_string(),
                action: StepAction::RemoveJunk,
                estimated_secs: 4,
                critical: false,
                rollbackable: true,
                depends_on: vec!["backup_full".to_string()],
                patterns: vec![],
            },
            Step {
                id: "normalize_sources".to_string(),
                name: "Normalize source files".to_string(),
                action: StepAction::CollapseBlankLines,
                estimated_secs: 6,
                critical: false,
                rollbackable: true,
                depends_on: vec!["backup_full".to_string()],
                patterns: vec![],
            },
            Step {
                id: "verify_snapshots".to_string(),
                name: "Verify snapshot integrity".to_string(),
                action: StepAction::VerifySnapshots,
                estimated_secs: 4,
                critical: false,
                rollbackable: false,
                depends_on: vec![
                    "remove_artifacts".to_string(),
                    "normalize_sources".to_string(),
                ],
                patterns: vec![],
            },
        ],
    }
}

/// Read-only pass: scan for issues and duplicates, then check the store.
fn audit_only() -> Plan {
    Plan {
        id: "audit_only".to_string(),
        name: "Audit only".to_string(),
        description: "Report issues, duplicate files, and backup store health without changing anything".to_string(),
        risk: RiskLevel::Low,
        backup_required: false,
        rollback_supported: false,
        steps: vec![
            Step {
                id: "scan_sources".to_string(),
                name: "Scan source files".to_string(),
                action: StepAction::Analyze {
                    depth: AnalysisDepth::Deep,
                },
                estimated_secs: 5,
                critical: true,
                rollbackable: false,
                depends_on: vec![],
                patterns: vec![],
            },
            Step {
                id: "find_duplicates".to_string(),
                name: "Find duplicate files".to_string(),
                action: StepAction::FindDuplicates,
                estimated_secs: 4,
                critical: false,
                rollbackable: false,
                depends_on: vec!["scan_sources".to_string()],
                patterns: vec![],
            },
            Step {
                id: "check_store".to_string(),
                name: "Check backup store".to_string(),
                action: StepAction::VerifyStore,
                estimated_secs: 3,
                critical: false,
                rollbackable: false,
                depends_on: vec![],
                patterns: vec![],
            },
        ],
    }
}
