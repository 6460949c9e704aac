//! Error types for the broom CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for broom operations.
///
/// Each variant maps to a specific exit code so callers can distinguish
/// argument mistakes from execution failures.
#[derive(Error, Debug)]
pub enum BroomError {
    /// User provided invalid arguments or the project is in an invalid state.
    #[error("{0}")]
    UserError(String),

    /// Analysis could not complete or reported blocking findings.
    #[error("Analysis failed: {0}")]
    AnalysisError(String),

    /// A plan or step execution failed.
    #[error("Execution failed: {0}")]
    StepError(String),

    /// The run lock could not be acquired.
    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    /// A backup, restore, or verification operation failed.
    #[error("Backup operation failed: {0}")]
    BackupError(String),
}

impl BroomError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            BroomError::UserError(_) => exit_codes::USER_ERROR,
            BroomError::AnalysisError(_) => exit_codes::ANALYSIS_FAILURE,
            BroomError::StepError(_) => exit_codes::STEP_FAILURE,
            BroomError::LockError(_) => exit_codes::LOCK_FAILURE,
            BroomError::BackupError(_) => exit_codes::BACKUP_FAILURE,
        }
    }
}

/// Result type alias for broom operations.
pub type Result<T> = std::result::Result<T, BroomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_has_correct_exit_code() {
        let err = BroomError::UserError("bad argument".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn analysis_error_has_correct_exit_code() {
        let err = BroomError::AnalysisError("scan aborted".to_string());
        assert_eq!(err.exit_code(), exit_codes::ANALYSIS_FAILURE);
    }

    #[test]
    fn step_error_has_correct_exit_code() {
        let err = BroomError::StepError("critical step failed".to_string());
        assert_eq!(err.exit_code(), exit_codes::STEP_FAILURE);
    }

    #[test]
    fn lock_error_has_correct_exit_code() {
        let err = BroomError::LockError("run in progress".to_string());
        assert_eq!(err.exit_code(), exit_codes::LOCK_FAILURE);
    }

    #[test]
    fn backup_error_has_correct_exit_code() {
        let err = BroomError::BackupError("blob missing".to_string());
        assert_eq!(err.exit_code(), exit_codes::BACKUP_FAILURE);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = BroomError::StepError("fix_imports failed".to_string());
        assert_eq!(err.to_string(), "Execution failed: fix_imports failed");

        let err = BroomError::BackupError("checksum mismatch".to_string());
        assert_eq!(
            err.to_string(),
            "Backup operation failed: checksum mismatch"
        );
    }
}
