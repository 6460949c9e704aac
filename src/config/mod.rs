//! Configuration model for broom.
//!
//! The Config struct mirrors `.broom/config.yaml`. Parsing is forward
//! compatible: unknown fields are ignored, and every field falls back to
//! a default so a partial (or absent) file still yields a usable config.
//! Values are validated on load so bad thresholds and patterns surface
//! at the command line, not mid-run.

mod model;
mod operations;
pub mod types;


pub use model::Config;
