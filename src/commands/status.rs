//! Implementation of the `broom status` command.
//!
//! One-screen project summary: backup store totals, lock state, audit
//! log statistics, recent runs with their durations, and the slowest
//! recent steps.

use crate::backup::BackupStore;
use crate::config::Config;
use crate::context::require_initialized_project;
use crate::error::Result;
use crate::events::{Event, EventAction, event_stats, read_events};
use crate::locks;

/// How many recent runs to show.
const RECENT_RUNS: usize = 5;

/// How many slow steps to show.
const SLOWEST_STEPS: usize = 5;

/// Execute the `broom status` command.
pub fn cmd_status() -> Result<()> {
    let ctx = require_initialized_project()?;
    let config = Config::load_or_default(&ctx)?;

    let store = BackupStore::new(&ctx);
    let store_report = store.store_report(&config)?;

    println!("Project status");
    println!("==============");
    println!();

    println!("Backup store:");
    println!("  Entries:     {}", store_report.entry_count);
    println!("  Total bytes: {}", store_report.total_bytes);
    println!("  Health:      {}", store_report.health);
    if let Some(newest) = store_report.newest {
        println!("  Newest:      {}", newest.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!();

    if let Some(lock) = locks::run_lock_info(&ctx, &config)? {
        let stale_marker = if lock.is_stale { " [STALE]" } else { "" };
        println!(
            "Run in progress: {} (by {}, {} old){}",
            lock.metadata.action,
            lock.metadata.owner,
            lock.metadata.age_string(),
            stale_marker
        );
        println!();
    }

    let stats = event_stats(&ctx)?;
    println!("Audit log:");
    println!(
        "  Events:      {} ({} malformed line(s))",
        stats.total, stats.malformed
    );
    if let (Some(first), Some(last)) = (stats.first_ts, stats.last_ts) {
        println!("  First:       {}", first.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("  Last:        {}", last.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if !stats.by_action.is_empty() {
        let actions: Vec<String> = stats
            .by_action
            .iter()
            .map(|(action, count)| format!("{}={}", action, count))
            .collect();
        println!("  By action:   {}", actions.join(", "));
    }
    println!();

    let (events, _malformed) = read_events(&ctx)?;
    let run_ends: Vec<&Event> = events
        .iter()
        .filter(|e| {
            matches!(
                e.action,
                EventAction::RunComplete | EventAction::RunFailed | EventAction::RunCancelled
            )
        })
        .collect();

    if run_ends.is_empty() {
        println!("No runs recorded yet. Run `broom run quick_cleanup` to preview one.");
        return Ok(());
    }

    println!("Recent runs:");
    for event in run_ends.iter().rev().take(RECENT_RUNS) {
        let plan = event.details["plan"].as_str().unwrap_or("?");
        let duration = event.details["duration_ms"].as_u64().unwrap_or(0);
        println!(
            "  {}  {:18} {:13} {:>7} ms",
            event.ts.format("%Y-%m-%d %H:%M:%S"),
            plan,
            event.action,
            duration
        );
    }
    println!();

    // Per-step durations live in the run-end events' details.
    let mut step_durations: Vec<(String, u64)> = Vec::new();
    for event in run_ends.iter().rev().take(RECENT_RUNS) {
        if let Some(steps) = event.details["steps"].as_object() {
            for (step_id, duration) in steps {
                if let Some(ms) = duration.as_u64() {
                    step_durations.push((step_id.clone(), ms));
                }
            }
        }
    }
    step_durations.sort_by(|a, b| b.1.cmp(&a.1));

    if !step_durations.is_empty() {
        println!("Slowest recent steps:");
        for (step_id, ms) in step_durations.iter().take(SLOWEST_STEPS) {
            println!("  {:20} {:>7} ms", step_id, ms);
        }
    }

    Ok(())
}
