//! Plan execution: scheduling, step actions, and cancellation.

mod cancel;
mod runner;
mod steps;
mod types;


pub use cancel::CancelToken;
pub use runner::Runner;
pub(crate) use runner::panic_message;
pub use steps::{StepRun, StepScope, execute_step, resolve_scope, union_mutating_scope};
pub use types::{Execution, RunStatus, StepReport, Totals};
