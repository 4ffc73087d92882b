//! Prelude module for common test helpers.

pub use crate::fixtures::{Counter, ExecutionLog};
pub use crate::must::{must, must_some};
