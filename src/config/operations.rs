//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::context::ProjectContext;
use crate::error::{BroomError, Result};
use globset::Glob;
use regex::Regex;
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            BroomError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load the project config, falling back to defaults when absent.
    ///
    /// A missing config file is normal (defaults apply); a present but
    /// invalid file is a user error and is surfaced rather than ignored.
    pub fn load_or_default(ctx: &ProjectContext) -> Result<Self> {
        let path = ctx.config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Parse config from a YAML string.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| BroomError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| BroomError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `workers`, `lock_stale_minutes`, `max_line_length`, `large_file_kb`
    ///   must be positive
    /// - `source_extensions` entries must be non-empty and have no leading dots
    /// - `debug_patterns` and `stub_patterns` must be valid regexes
    /// - `exclude_globs` and `junk_globs` must be valid glob patterns
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(BroomError::UserError(
                "config validation failed: workers must be greater than 0".to_string(),
            ));
        }

        if self.lock_stale_minutes == 0 {
            return Err(BroomError::UserError(
                "config validation failed: lock_stale_minutes must be greater than 0".to_string(),
            ));
        }

        if self.max_line_length == 0 {
            return Err(BroomError::UserError(
                "config validation failed: max_line_length must be greater than 0".to_string(),
            ));
        }

        if self.large_file_kb == 0 {
            return Err(BroomError::UserError(
                "config validation failed: large_file_kb must be greater than 0".to_string(),
            ));
        }

        if self.source_extensions.is_empty() {
            return Err(BroomError::UserError(
                "config validation failed: source_extensions must not be empty".to_string(),
            ));
        }

        for ext in &self.source_extensions {
            if ext.is_empty() {
                return Err(BroomError::UserError(
                    "config validation failed: source_extensions entries must be non-empty"
                        .to_string(),
                ));
            }
            if ext.starts_with('.') {
                return Err(BroomError::UserError(format!(
                    "config validation failed: source_extensions entries must not have leading dots (found '{}'). Use '{}' instead.",
                    ext,
                    ext.trim_start_matches('.')
                )));
            }
        }

        for pattern in self.debug_patterns.iter().chain(&self.stub_patterns) {
            Regex::new(pattern).map_err(|e| {
                BroomError::UserError(format!(
                    "config validation failed: invalid regex pattern '{}': {}",
                    pattern, e
                ))
            })?;
        }

        for pattern in self.exclude_globs.iter().chain(&self.junk_globs) {
            Glob::new(pattern).map_err(|e| {
                BroomError::UserError(format!(
                    "config validation failed: invalid glob pattern '{}': {}",
                    pattern, e
                ))
            })?;
        }

        Ok(())
    }

    /// Get source_extensions normalized to lowercase.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.source_extensions
            .iter()
            .map(|s| s.to_lowercase())
            .collect()
    }

    /// Check whether a path has one of the configured source extensions.
    pub fn is_source_file<P: AsRef<Path>>(&self, path: P) -> bool {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext {
            Some(ext) => self.normalized_extensions().contains(&ext),
            None => false,
        }
    }
}
