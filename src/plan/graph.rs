//! Dependency graph checks and scheduling helpers.
//!
//! Steps reference each other by id through `depends_on`. Validation
//! rejects anything the scheduler cannot execute: duplicate ids, unknown
//! dependency ids, self-dependencies, and cycles. The scheduling helpers
//! answer "which steps may start now" against the sets the executor
//! tracks.

use super::{Plan, Step};
use crate::error::{BroomError, Result};
use std::collections::{HashMap, HashSet};

/// Validate a plan's step graph.
///
/// Returns a `UserError` naming the offending step(s) when the graph is
/// not a DAG over known, unique step ids.
pub fn validate_plan(plan: &Plan) -> Result<()> {
    if plan.steps.is_empty() {
        return Err(BroomError::UserError(format!(
            "plan '{}' has no steps",
            plan.id
        )));
    }

    let mut ids = HashSet::new();
    for step in &plan.steps {
        if !ids.insert(step.id.as_str()) {
            return Err(BroomError::UserError(format!(
                "plan '{}' has duplicate step id '{}'",
                plan.id, step.id
            )));
        }
    }

    for step in &plan.steps {
        for dep in &step.depends_on {
            if dep == &step.id {
                return Err(BroomError::UserError(format!(
                    "step '{}' in plan '{}' depends on itself",
                    step.id, plan.id
                )));
            }
            if !ids.contains(dep.as_str()) {
                return Err(BroomError::UserError(format!(
                    "step '{}' in plan '{}' depends on unknown step '{}'",
                    step.id, plan.id, dep
                )));
            }
        }
    }

    // Kahn's algorithm: repeatedly remove steps whose dependencies are all
    // satisfied. Anything left over is part of a cycle.
    let mut remaining: HashMap<&str, HashSet<&str>> = plan
        .steps
        .iter()
        .map(|s| {
            (
                s.id.as_str(),
                s.depends_on.iter().map(|d| d.as_str()).collect(),
            )
        })
        .collect();

    loop {
        let satisfied: Vec<&str> = remaining
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(id, _)| *id)
            .collect();

        if satisfied.is_empty() {
            break;
        }

        for id in &satisfied {
            remaining.remove(id);
        }
        for deps in remaining.values_mut() {
            for id in &satisfied {
                deps.remove(id);
            }
        }
    }

    if !remaining.is_empty() {
        let mut cycle: Vec<&str> = remaining.keys().copied().collect();
        cycle.sort_unstable();
        return Err(BroomError::UserError(format!(
            "plan '{}' has a dependency cycle involving: {}",
            plan.id,
            cycle.join(", ")
        )));
    }

    Ok(())
}

/// Steps whose dependencies are all completed and which have not been
/// dispatched yet, in declaration order.
pub fn ready_steps<'a>(
    plan: &'a Plan,
    completed: &HashSet<String>,
    dispatched: &HashSet<String>,
) -> Vec<&'a Step> {
    plan.steps
        .iter()
        .filter(|s| !dispatched.contains(&s.id))
        .filter(|s| s.depends_on.iter().all(|d| completed.contains(d)))
        .collect()
}

/// Group steps into dependency layers for display.
///
/// Layer 0 holds steps with no dependencies; each later layer holds steps
/// whose dependencies all appear in earlier layers. Assumes the plan has
/// already passed [`validate_plan`].
pub fn execution_layers(plan: &Plan) -> Vec<Vec<&Step>> {
    let mut layers: Vec<Vec<&Step>> = Vec::new();
    let mut placed: HashSet<&str> = HashSet::new();

    while placed.len() < plan.steps.len() {
        let layer: Vec<&Step> = plan
            .steps
            .iter()
            .filter(|s| !placed.contains(s.id.as_str()))
            .filter(|s| s.depends_on.iter().all(|d| placed.contains(d.as_str())))
            .collect();

        if layer.is_empty() {
            // Unvalidated cyclic input; stop rather than loop forever.
            break;
        }

        for step in &layer {
            placed.insert(step.id.as_str());
        }
        layers.push(layer);
    }

    layers
}
