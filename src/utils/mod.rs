//! Utilities shared across modules.
//!
//! - [`fs`] - Directory creation, atomic writes and directory statistics

pub mod fs;

pub use fs::{atomic_write, atomic_write_async, ensure_dir, ensure_parent_dir};
