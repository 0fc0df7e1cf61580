//! Core types shared by every stage of the render path.
//!
//! Currently this is the error system: [`GraphError`] for typed failures,
//! [`ErrorKind`] for classification, and [`ErrorContext`] /
//! [`user_friendly_error`] for operator-facing reports.

pub mod error;

pub use error::{ErrorContext, ErrorKind, GraphError, user_friendly_error};
