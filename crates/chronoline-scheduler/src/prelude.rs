//! Prelude module for common scheduler types.

pub use crate::error::{SchedulerError, SchedulerResult};
pub use crate::jitter::{JitterCompensator, JitterConfig, JitterStats};
pub use crate::queue::{NodeRef, TimelineQueue};
pub use crate::scheduler::{Scheduler, Strategy};
