//! Timeline-based event scheduling with microsecond precision.
//!
//! This crate is the core of the chronoline timing stack: a sorted timeline
//! of type-erased triggers (see `chronoline-events`) dispatched by one of
//! four execution strategies. It provides:
//!
//! - **[`Scheduler`]**: `schedule`/`delay`/`cancel`/`clear` over a sorted
//!   queue, with stable [`NodeRef`] handles
//! - **[`Strategy`]**: busy-spin (`HighRes`), OS-sleep (`LowRes`),
//!   caller-driven (`Polled`), and worker-thread (`Background`) dispatch
//! - **[`JitterCompensator`]**: accumulated wake-time correction that
//!   pre-shifts waits by the measured lateness
//! - **[`JitterStats`]**: a debug-only collector of raw wake deltas
//!
//! # Ordering Guarantees
//!
//! Within one scheduler, triggers fire in non-decreasing scheduled-time
//! order, ties in insertion order. Listeners run synchronously on the
//! dispatching thread and may schedule, cancel, and clear reentrantly;
//! nodes enqueued mid-listener are honored on the next dispatch iteration.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chronoline_clock as clock;
//! use chronoline_events::{Event, Trigger};
//! use chronoline_scheduler::{Scheduler, Strategy};
//!
//! let scheduler = Scheduler::new(Strategy::HighRes);
//! let event = Arc::new(Event::<&'static str>::new());
//! event.add_listener(|e: &Event<&'static str>| {
//!     assert_eq!(e.payload_cloned(), Some("tick"));
//! });
//!
//! let trigger = Arc::new(Trigger::new(Arc::clone(&event), "tick"));
//! scheduler
//!     .schedule(trigger, clock::now_us() + 100)
//!     .expect("cooperative schedulers cannot be poisoned");
//! scheduler.run();
//! assert!(scheduler.is_empty());
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod jitter;
pub mod prelude;
pub mod queue;
pub mod scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use jitter::{JitterCompensator, JitterConfig, JitterStats};
pub use queue::{NodeRef, TimelineQueue};
pub use scheduler::{Scheduler, Strategy};
