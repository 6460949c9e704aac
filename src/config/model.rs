//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for a broom project.
///
/// This struct represents the contents of `.broom/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Execution settings
    // =========================================================================
    /// Maximum number of steps executed concurrently.
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Command run by verification steps (shell-words parsed; empty disables).
    #[serde(default)]
    pub verify_command: String,

    // =========================================================================
    // Backup settings
    // =========================================================================
    /// Days to keep backup entries when pruning.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Advisory ceiling on the number of backup entries.
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,

    /// Advisory ceiling on the total backup store size in megabytes.
    #[serde(default = "default_max_total_mb")]
    pub max_total_mb: u64,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Minutes after which the run lock is considered stale.
    #[serde(default = "default_lock_stale_minutes")]
    pub lock_stale_minutes: u32,

    // =========================================================================
    // Analyzer settings
    // =========================================================================
    /// Lines longer than this are reported as a performance finding.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: u32,

    /// Files larger than this (in KB) are reported as a performance finding.
    #[serde(default = "default_large_file_kb")]
    pub large_file_kb: u64,

    /// Files smaller than this are ignored by duplicate detection.
    #[serde(default = "default_duplicate_min_bytes")]
    pub duplicate_min_bytes: u64,

    /// File extensions treated as source files (no leading dots).
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// Glob patterns excluded from scans and cleanups.
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,

    /// Glob patterns for junk files that cleanup steps may delete.
    #[serde(default = "default_junk_globs")]
    pub junk_globs: Vec<String>,

    /// Regex patterns for leftover debug statements.
    #[serde(default = "default_debug_patterns")]
    pub debug_patterns: Vec<String>,

    /// Regex patterns for stub markers.
    #[serde(default = "default_stub_patterns")]
    pub stub_patterns: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            verify_command: String::new(),
            retention_days: default_retention_days(),
            max_backups: default_max_backups(),
            max_total_mb: default_max_total_mb(),
            lock_stale_minutes: default_lock_stale_minutes(),
            max_line_length: default_max_line_length(),
            large_file_kb: default_large_file_kb(),
            duplicate_min_bytes: default_duplicate_min_bytes(),
            source_extensions: default_source_extensions(),
            exclude_globs: default_exclude_globs(),
            junk_globs: default_junk_globs(),
            debug_patterns: default_debug_patterns(),
            stub_patterns: default_stub_patterns(),
        }
    }
}
