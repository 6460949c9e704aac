//! Plan executor.
//!
//! Dispatches steps over a bounded worker pool as their dependencies
//! complete. Two steps may run at the same time only when their
//! resolved file scopes are disjoint; steps that shell out run with the
//! pool otherwise empty. A critical failure or a cancelled token stops
//! dispatch, and if the plan supports rollback the pre-run snapshot is
//! restored before the run is reported.

use super::cancel::CancelToken;
use super::steps::{self, StepRun, StepScope};
use super::types::{Execution, RunStatus, StepReport};
use crate::backup::BackupStore;
use crate::config::Config;
use crate::context::ProjectContext;
use crate::error::Result;
use crate::events::{Event, EventAction, log_event_best_effort};
use crate::plan::{Plan, Step, ready_steps, validate_plan};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

/// A dispatched step, handed to a worker thread.
struct Job {
    step: Step,
    scope: StepScope,
    backup_id: Option<String>,
}

/// Coordinator-side record of a step currently on a worker.
struct InFlight {
    rels: HashSet<String>,
    exclusive: bool,
}

/// Executes plans against one project.
pub struct Runner<'a> {
    ctx: &'a ProjectContext,
    config: &'a Config,
    token: CancelToken,
}

impl<'a> Runner<'a> {
    pub fn new(ctx: &'a ProjectContext, config: &'a Config) -> Self {
        Self {
            ctx,
            config,
            token: CancelToken::new(),
        }
    }

    pub fn with_token(ctx: &'a ProjectContext, config: &'a Config, token: CancelToken) -> Self {
        Self { ctx, config, token }
    }

    /// Handle for cancelling this runner from another thread or a
    /// progress callback.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Execute `plan` to completion, failure, or cancellation.
    ///
    /// `on_progress` is invoked after every finished step with the
    /// execution state so far. Returns the final [`Execution`]; step
    /// failures are recorded in it rather than returned as errors.
    pub fn run_plan(
        &self,
        plan: &Plan,
        mut on_progress: Option<&mut dyn FnMut(&Execution)>,
    ) -> Result<Execution> {
        validate_plan(plan)?;

        let operation = format!("run {}", plan.id);
        let scopes = self.resolve_scopes(plan)?;
        let total = plan.steps.len();
        let pool_size = (self.config.workers as usize).min(total).max(1);

        let mut execution = Execution::new(&plan.id);
        log_event_best_effort(
            self.ctx,
            &Event::new(EventAction::RunStart)
                .with_module("executor")
                .with_details(serde_json::json!({
                    "plan": plan.id,
                    "execution": execution.id,
                    "steps": total,
                    "workers": pool_size,
                })),
        );

        let store = BackupStore::new(self.ctx);
        let run = StepRun {
            ctx: self.ctx,
            config: self.config,
            store: &store,
            token: &self.token,
            operation,
        };

        let mut completed: HashSet<String> = HashSet::new();
        let mut dispatched: HashSet<String> = HashSet::new();
        let mut in_flight: BTreeMap<String, InFlight> = BTreeMap::new();
        let mut finished = 0usize;
        let mut stop_dispatch = false;
        let mut critical_failed = false;
        let mut cancel_noted = false;

        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (result_tx, result_rx) = mpsc::channel::<StepReport>();
        let job_rx = Arc::new(Mutex::new(job_rx));

        thread::scope(|s| {
            for _ in 0..pool_size {
                let job_rx = Arc::clone(&job_rx);
                let result_tx = result_tx.clone();
                let run = &run;
                s.spawn(move || {
                    loop {
                        let received = {
                            let Ok(guard) = job_rx.lock() else {
                                break;
                            };
                            guard.recv()
                        };
                        let Ok(job) = received else {
                            break;
                        };

                        let report = match catch_unwind(AssertUnwindSafe(|| {
                            steps::execute_step(run, &job.step, &job.scope, job.backup_id.as_deref())
                        })) {
                            Ok(report) => report,
                            Err(panic) => StepReport::failure(
                                &job.step.id,
                                format!("step panicked: {}", panic_message(&panic)),
                                0,
                            ),
                        };

                        if result_tx.send(report).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            loop {
                if self.token.is_cancelled() && !cancel_noted {
                    cancel_noted = true;
                    stop_dispatch = true;
                    execution
                        .totals
                        .errors
                        .push("run cancelled before completion".to_string());
                }

                if !stop_dispatch {
                    let exclusive_running = in_flight.values().any(|f| f.exclusive);
                    if !exclusive_running {
                        let mut busy: HashSet<String> = in_flight
                            .values()
                            .flat_map(|f| f.rels.iter().cloned())
                            .collect();

                        for step in ready_steps(plan, &completed, &dispatched) {
                            if in_flight.len() >= pool_size {
                                break;
                            }
                            let Some(scope) = scopes.get(&step.id) else {
                                continue;
                            };
                            if scope.exclusive && !in_flight.is_empty() {
                                continue;
                            }
                            if !scope.is_disjoint(&busy) {
                                continue;
                            }

                            let job = Job {
                                step: step.clone(),
                                scope: scope.clone(),
                                backup_id: execution.backup_id.clone(),
                            };
                            if job_tx.send(job).is_err() {
                                stop_dispatch = true;
                                break;
                            }

                            busy.extend(scope.rel_set());
                            dispatched.insert(step.id.clone());
                            in_flight.insert(
                                step.id.clone(),
                                InFlight {
                                    rels: scope.rel_set(),
                                    exclusive: scope.exclusive,
                                },
                            );
                            if scope.exclusive {
                                break;
                            }
                        }
                    }
                }

                if in_flight.is_empty() {
                    if stop_dispatch || ready_steps(plan, &completed, &dispatched).is_empty() {
                        break;
                    }
                    continue;
                }

                let Ok(report) = result_rx.recv() else {
                    // Workers are gone; anything still in flight is lost
                    for step_id in in_flight.keys() {
                        execution.failed_steps.push(step_id.clone());
                        execution
                            .totals
                            .errors
                            .push(format!("{}: worker exited unexpectedly", step_id));
                    }
                    in_flight.clear();
                    stop_dispatch = true;
                    critical_failed = true;
                    break;
                };

                finished += 1;
                in_flight.remove(&report.step_id);

                if report.ok {
                    if let Some(id) = &report.backup_id {
                        execution.backup_id = Some(id.clone());
                    }
                    completed.insert(report.step_id.clone());
                    execution.completed_steps.push(report.step_id.clone());
                } else {
                    execution.failed_steps.push(report.step_id.clone());
                    execution
                        .totals
                        .errors
                        .push(format!("{}: {}", report.step_id, report.detail));

                    let critical = plan.step(&report.step_id).is_some_and(|s| s.critical);
                    if critical {
                        critical_failed = true;
                        stop_dispatch = true;
                    }
                }

                execution.totals.merge(&report.totals);
                execution.progress = ((finished * 100) / total) as u8;
                execution.current_step = in_flight.keys().next().cloned();
                execution.step_reports.push(report);

                if let Some(cb) = on_progress.as_deref_mut() {
                    cb(&execution);
                }
            }

            drop(job_tx);
        });

        for step in &plan.steps {
            if !dispatched.contains(&step.id) {
                execution.skipped_steps.push(step.id.clone());
            }
        }

        let cancelled = self.token.is_cancelled();
        if critical_failed || cancelled {
            execution.status = RunStatus::Failed;

            if plan.rollback_supported && let Some(backup_id) = execution.backup_id.clone() {
                match store.restore_full(&backup_id) {
                    Ok(outcome) => {
                        if outcome.success {
                            execution.status = RunStatus::RolledBack;
                        } else {
                            execution
                                .totals
                                .errors
                                .push("rollback completed with errors".to_string());
                        }
                        execution.rollback = Some(outcome);
                    }
                    Err(e) => {
                        execution
                            .totals
                            .errors
                            .push(format!("rollback failed: {}", e));
                    }
                }
            }
        } else {
            execution.status = RunStatus::Completed;
        }

        execution.current_step = None;
        execution.finished_at = Some(Utc::now());

        let step_durations: BTreeMap<&str, u64> = execution
            .step_reports
            .iter()
            .map(|r| (r.step_id.as_str(), r.duration_ms))
            .collect();
        let action = if cancelled {
            EventAction::RunCancelled
        } else if execution.status == RunStatus::Completed {
            EventAction::RunComplete
        } else {
            EventAction::RunFailed
        };
        log_event_best_effort(
            self.ctx,
            &Event::new(action)
                .with_module("executor")
                .with_details(serde_json::json!({
                    "plan": plan.id,
                    "execution": execution.id,
                    "status": execution.status.as_str(),
                    "progress": execution.progress,
                    "completed": execution.completed_steps,
                    "failed": execution.failed_steps,
                    "skipped": execution.skipped_steps,
                    "duration_ms": (Utc::now() - execution.started_at).num_milliseconds(),
                    "steps": step_durations,
                })),
        );

        Ok(execution)
    }

    /// Resolve every step's file scope up front.
    ///
    /// Snapshot steps get the union of all mutating steps' files, so the
    /// pre-run backup covers exactly what the run may change.
    fn resolve_scopes(&self, plan: &Plan) -> Result<BTreeMap<String, StepScope>> {
        let root = &self.ctx.project_root;
        let mut scopes = BTreeMap::new();

        for step in &plan.steps {
            if step.is_snapshot() {
                continue;
            }
            scopes.insert(step.id.clone(), steps::resolve_scope(root, self.config, step)?);
        }

        for step in &plan.steps {
            if step.is_snapshot() {
                scopes.insert(step.id.clone(), steps::union_mutating_scope(plan, &scopes));
            }
        }

        Ok(scopes)
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
