//! Event logging subsystem for broom.
//!
//! This module implements append-only event logging to support audit and
//! post-mortem review. Events are stored in NDJSON format (one JSON object
//! per line) in `.broom/events/events.ndjson`.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: The action performed (run_start, backup_create, etc.)
//! - `actor`: The owner string (e.g., `user@HOST`)
//! - `module`: Optional subsystem name (executor, backup, analyzer, ...)
//! - `details`: Freeform object with action-specific details
//!
//! # Failure Handling
//!
//! The audit log must never turn a succeeding operation into a failing one.
//! Callers on the emit path of another operation use [`log_event_best_effort`],
//! which downgrades append failures to a stderr warning.

use crate::context::ProjectContext;
use crate::error::{BroomError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Project state initialized
    Init,
    /// Plan execution started
    RunStart,
    /// Plan execution finished successfully
    RunComplete,
    /// Plan execution failed
    RunFailed,
    /// Plan execution cancelled by request
    RunCancelled,
    /// Backup restored over the working tree
    Rollback,
    /// Backup entry created
    BackupCreate,
    /// Backup store verified
    BackupVerify,
    /// Backup entries pruned
    BackupPrune,
    /// Standalone analysis run
    Analyze,
    /// Run lock cleared manually
    LockClear,
    /// Safe repairs applied by the health check
    Repair,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Init => write!(f, "init"),
            EventAction::RunStart => write!(f, "run_start"),
            EventAction::RunComplete => write!(f, "run_complete"),
            EventAction::RunFailed => write!(f, "run_failed"),
            EventAction::RunCancelled => write!(f, "run_cancelled"),
            EventAction::Rollback => write!(f, "rollback"),
            EventAction::BackupCreate => write!(f, "backup_create"),
            EventAction::BackupVerify => write!(f, "backup_verify"),
            EventAction::BackupPrune => write!(f, "backup_prune"),
            EventAction::Analyze => write!(f, "analyze"),
            EventAction::LockClear => write!(f, "lock_clear"),
            EventAction::Repair => write!(f, "repair"),
        }
    }
}

/// An event record for the audit log.
///
/// Events are serialized as single-line JSON objects and appended to
/// the events.ndjson file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// The actor who performed the action (e.g., `user@HOST`).
    pub actor: String,

    /// Optional subsystem that produced the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action.
    ///
    /// The timestamp is set to the current time, and the actor is
    /// determined from the environment (USER@HOSTNAME).
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_actor_string(),
            module: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the subsystem name for this event.
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| BroomError::UserError(format!("failed to serialize event to JSON: {}", e)))
    }
}

/// Get the actor string for event metadata.
pub(crate) fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Append an event to the events log.
///
/// Appends the event as a single JSON line to the events.ndjson file.
/// The file is created if it doesn't exist, and each append is synced
/// to disk so the log survives a crash.
pub fn append_event(ctx: &ProjectContext, event: &Event) -> Result<()> {
    let events_file = ctx.events_file();

    let json_line = event.to_ndjson_line()?;

    let events_dir = ctx.events_dir();
    if !events_dir.exists() {
        fs::create_dir_all(&events_dir).map_err(|e| {
            BroomError::UserError(format!(
                "failed to create events directory '{}': {}",
                events_dir.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&events_file)
        .map_err(|e| {
            BroomError::UserError(format!(
                "failed to open events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line).map_err(|e| {
        BroomError::UserError(format!(
            "failed to write event to '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    file.sync_all().map_err(|e| {
        BroomError::UserError(format!(
            "failed to sync events file '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    Ok(())
}

/// Append an event, downgrading failures to a warning.
///
/// Used on the emit path of other operations: a backup that succeeded
/// must not report failure because the audit append failed.
pub fn log_event_best_effort(ctx: &ProjectContext, event: &Event) {
    if let Err(e) = append_event(ctx, event) {
        eprintln!("Warning: failed to log {} event: {}", event.action, e);
    }
}

/// Read all parseable events from the log.
///
/// Malformed lines are skipped; the count of skipped lines is returned
/// alongside the events so callers can surface log corruption.
pub fn read_events(ctx: &ProjectContext) -> Result<(Vec<Event>, usize)> {
    let events_file = ctx.events_file();

    if !events_file.exists() {
        return Ok((Vec::new(), 0));
    }

    let content = fs::read_to_string(&events_file).map_err(|e| {
        BroomError::UserError(format!(
            "failed to read events file '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    let mut events = Vec::new();
    let mut malformed = 0;

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Event>(line) {
            Ok(event) => events.push(event),
            Err(_) => malformed += 1,
        }
    }

    Ok((events, malformed))
}

/// Aggregate statistics over the events log.
#[derive(Debug, Clone, Serialize)]
pub struct EventStats {
    /// Total number of parseable events.
    pub total: usize,
    /// Number of malformed lines skipped.
    pub malformed: usize,
    /// Event counts per action name.
    pub by_action: BTreeMap<String, usize>,
    /// Timestamp of the first event, if any.
    pub first_ts: Option<DateTime<Utc>>,
    /// Timestamp of the last event, if any.
    pub last_ts: Option<DateTime<Utc>>,
}

/// Tally the events log into summary statistics.
pub fn event_stats(ctx: &ProjectContext) -> Result<EventStats> {
    let (events, malformed) = read_events(ctx)?;

    let mut by_action: BTreeMap<String, usize> = BTreeMap::new();
    for event in &events {
        *by_action.entry(event.action.to_string()).or_insert(0) += 1;
    }

    Ok(EventStats {
        total: events.len(),
        malformed,
        by_action,
        first_ts: events.first().map(|e| e.ts),
        last_ts: events.last().map(|e| e.ts),
    })
}
