//! Broom: Plan-driven source tree cleanup orchestrator with snapshot rollback.
//!
//! This is the main entry point for the `broom` CLI. It parses arguments,
//! dispatches to the appropriate command handler, and handles errors with
//! proper exit codes.

mod cli;
mod commands;
pub mod analyze;
pub mod backup;
pub mod config;
pub mod context;
pub mod diagnose;
pub mod error;
pub mod events;
pub mod exec;
pub mod exit_codes;
pub mod fs;
pub mod hash;
pub mod health;
pub mod locks;
pub mod plan;
pub mod report;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match commands::dispatch(cli.command) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
