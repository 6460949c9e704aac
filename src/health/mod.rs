//! Subsystem health checks.
//!
//! Each subsystem is probed independently and rolled up into a module
//! state; module states roll up into one overall verdict weighted by
//! tier. Critical modules dominate the verdict, a lone unhealthy
//! high-tier module does not.

mod probes;

#[cfg(test)]
mod tests;

use crate::context::{ProjectContext, STATE_DIR_NAME};
use crate::error::{BroomError, Result};
use crate::events::{Event, EventAction, log_event_best_effort};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;

/// State of one probe, module, or the whole system.
///
/// Ordered so that `max` picks the worst state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Healthy => "healthy",
            HealthState::Degraded => "degraded",
            HealthState::Unhealthy => "unhealthy",
        }
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How much a module's state weighs in the overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Critical,
    High,
    Medium,
    Low,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Critical => "critical",
            Tier::High => "high",
            Tier::Medium => "medium",
            Tier::Low => "low",
        }
    }
}

/// Outcome of a single probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub name: String,
    pub state: HealthState,
    pub detail: String,
}

impl ProbeResult {
    pub fn healthy(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            state: HealthState::Healthy,
            detail: detail.into(),
        }
    }

    pub fn degraded(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            state: HealthState::Degraded,
            detail: detail.into(),
        }
    }

    pub fn unhealthy(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            state: HealthState::Unhealthy,
            detail: detail.into(),
        }
    }
}

/// Health of one subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleHealth {
    pub id: String,
    pub name: String,
    pub tier: Tier,
    pub state: HealthState,
    pub probes: Vec<ProbeResult>,
}

impl ModuleHealth {
    pub fn new(id: &str, name: &str, tier: Tier, probes: Vec<ProbeResult>) -> Self {
        let state = aggregate_module(&probes);
        Self {
            id: id.to_string(),
            name: name.to_string(),
            tier,
            state,
            probes,
        }
    }
}

/// Full health check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub generated_at: DateTime<Utc>,
    pub overall: HealthState,
    pub modules: Vec<ModuleHealth>,

    /// Repairs applied before probing, when requested.
    pub repairs: Vec<String>,
}

impl HealthReport {
    pub fn module(&self, id: &str) -> Option<&ModuleHealth> {
        self.modules.iter().find(|m| m.id == id)
    }
}

/// A module is only as healthy as its worst probe.
pub fn aggregate_module(probes: &[ProbeResult]) -> HealthState {
    probes
        .iter()
        .map(|p| p.state)
        .max()
        .unwrap_or(HealthState::Healthy)
}

/// Roll module states into the overall verdict.
///
/// Any unhealthy critical-tier module makes the system unhealthy. A
/// degraded critical module, or more than one unhealthy high-tier
/// module, degrades it. Everything else reports healthy.
pub fn aggregate_overall(modules: &[ModuleHealth]) -> HealthState {
    let critical_unhealthy = modules
        .iter()
        .any(|m| m.tier == Tier::Critical && m.state == HealthState::Unhealthy);
    if critical_unhealthy {
        return HealthState::Unhealthy;
    }

    let critical_degraded = modules
        .iter()
        .any(|m| m.tier == Tier::Critical && m.state == HealthState::Degraded);
    let high_unhealthy = modules
        .iter()
        .filter(|m| m.tier == Tier::High && m.state == HealthState::Unhealthy)
        .count();
    if critical_degraded || high_unhealthy > 1 {
        return HealthState::Degraded;
    }

    HealthState::Healthy
}

/// Probe every subsystem and roll up the verdict.
pub fn run_health_check(ctx: &ProjectContext) -> Result<HealthReport> {
    let modules = vec![
        probes::probe_state_store(ctx),
        probes::probe_backup_store(ctx),
        probes::probe_executor(ctx),
        probes::probe_audit_log(ctx),
        probes::probe_analyzer(ctx),
    ];

    Ok(HealthReport {
        generated_at: Utc::now(),
        overall: aggregate_overall(&modules),
        modules,
        repairs: Vec::new(),
    })
}

/// Recreate missing pieces of the on-disk state layout.
///
/// Only structural repairs are attempted; nothing here touches backup
/// content or the event log.
pub fn apply_repairs(ctx: &ProjectContext) -> Result<Vec<String>> {
    let mut repairs = Vec::new();

    let expected = [
        ("backups", ctx.backups_dir.clone()),
        ("locks", ctx.locks_dir.clone()),
        ("events", ctx.events_dir()),
        ("reports", ctx.reports_dir()),
    ];

    for (label, dir) in expected {
        if !dir.is_dir() {
            fs::create_dir_all(&dir).map_err(|e| {
                BroomError::UserError(format!(
                    "failed to recreate directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
            repairs.push(format!(
                "recreated missing directory {}/{}",
                STATE_DIR_NAME, label
            ));
        }
    }

    if !repairs.is_empty() {
        log_event_best_effort(
            ctx,
            &Event::new(EventAction::Repair)
                .with_module("health")
                .with_details(serde_json::json!({ "repairs": repairs })),
        );
    }

    Ok(repairs)
}
