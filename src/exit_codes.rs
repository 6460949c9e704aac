//! Exit code constants for the broom CLI.
//!
//! Each failure class maps to a distinct exit code so scripts and CI
//! wrappers can branch on the outcome without parsing stderr.

/// Command completed successfully.
pub const SUCCESS: i32 = 0;

/// Invalid arguments or invalid project state.
pub const USER_ERROR: i32 = 1;

/// Analysis failed or reported blocking findings.
pub const ANALYSIS_FAILURE: i32 = 2;

/// A plan or step execution failed.
pub const STEP_FAILURE: i32 = 3;

/// The run lock could not be acquired.
pub const LOCK_FAILURE: i32 = 4;

/// A backup, restore, or verification operation failed.
pub const BACKUP_FAILURE: i32 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            ANALYSIS_FAILURE,
            STEP_FAILURE,
            LOCK_FAILURE,
            BACKUP_FAILURE,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in codes.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(SUCCESS, 0);
    }
}
