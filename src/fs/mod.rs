//! Filesystem utilities for broom.
//!
//! This module provides safe filesystem operations: atomic writes that keep
//! state files consistent across crashes, and the project tree walker used
//! by scans and cleanups.

pub mod atomic;
pub mod walk;

pub use atomic::atomic_write;
pub use atomic::atomic_write_file;
pub use walk::{WalkedFile, build_globset, walk_project};
