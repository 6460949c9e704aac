//! Configuration defaults for broom.
//!
//! This module defines the default value functions used by the Config
//! struct. Defaults are chosen so broom is useful on a fresh project
//! without any config file at all.

/// Default regex patterns for leftover debug statements.
pub fn default_debug_patterns() -> Vec<String> {
    vec![
        r"console\.(log|debug|trace)\s*\(".to_string(),
        r"\bdbg!\s*\(".to_string(),
        r"^\s*print\s*\(.*#\s*debug".to_string(),
        r"\bbinding\.pry\b".to_string(),
        r"\bdebugger\s*;?\s*$".to_string(),
    ]
}

/// Default regex patterns for stub markers in source files.
pub fn default_stub_patterns() -> Vec<String> {
    vec![
        "TODO".to_string(),
        "FIXME".to_string(),
        "XXX".to_string(),
        "HACK".to_string(),
        "unimplemented!".to_string(),
        "todo!".to_string(),
        "NotImplementedError".to_string(),
    ]
}

/// Default file extensions treated as source files (no leading dots).
pub fn default_source_extensions() -> Vec<String> {
    vec![
        "rs".to_string(),
        "py".to_string(),
        "ts".to_string(),
        "tsx".to_string(),
        "js".to_string(),
        "jsx".to_string(),
        "css".to_string(),
        "html".to_string(),
        "json".to_string(),
        "toml".to_string(),
        "yaml".to_string(),
        "yml".to_string(),
        "md".to_string(),
    ]
}

/// Default glob patterns excluded from scans and cleanups.
pub fn default_exclude_globs() -> Vec<String> {
    vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/dist/**".to_string(),
        "**/build/**".to_string(),
    ]
}

/// Default glob patterns for junk files that cleanup may delete.
pub fn default_junk_globs() -> Vec<String> {
    vec![
        "**/*~".to_string(),
        "**/*.orig".to_string(),
        "**/*.rej".to_string(),
        "**/*.bak".to_string(),
        "**/.DS_Store".to_string(),
        "**/Thumbs.db".to_string(),
    ]
}

// Default value functions for serde
pub(crate) fn default_workers() -> u32 {
    2
}
pub(crate) fn default_retention_days() -> u32 {
    30
}
pub(crate) fn default_lock_stale_minutes() -> u32 {
    120
}
pub(crate) fn default_max_line_length() -> u32 {
    120
}
pub(crate) fn default_large_file_kb() -> u64 {
    512
}
pub(crate) fn default_duplicate_min_bytes() -> u64 {
    64
}
pub(crate) fn default_max_backups() -> u32 {
    20
}
pub(crate) fn default_max_total_mb() -> u64 {
    100
}
