//! Typed events, O(1)-removable listeners, and schedulable triggers.
//!
//! This crate provides the notification half of the chronoline core:
//!
//! - [`Event`] - A typed notification target holding an ordered listener
//!   list and the payload from its most recent firing
//! - [`ListenerHandle`] - An opaque handle that removes its listener in O(1)
//! - [`Trigger`] - An immutable `(event, payload)` pair that delivers the
//!   payload when notified
//! - [`TriggerNotify`] - The type-erased capability a scheduler queue uses
//!   to hold triggers of heterogeneous payload types
//!
//! # Threading Model
//!
//! Events are single-threaded cooperative by design: listeners run on
//! whichever thread drives the notification. The internal locks exist so an
//! event can be *handed between* threads (e.g. to a background scheduler
//! worker), not to support concurrent firing. Listener callbacks are invoked
//! with no internal lock held, so they may add and remove listeners, read
//! the payload, and notify other events reentrantly.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chronoline_events::{Event, Trigger, TriggerNotify};
//!
//! let event = Arc::new(Event::<i32>::new());
//! let handle = event.add_listener(|e: &Event<i32>| {
//!     assert_eq!(e.payload_cloned(), Some(42));
//! });
//!
//! let trigger = Trigger::new(Arc::clone(&event), 42);
//! trigger.notify();
//!
//! event.remove_listener(&handle);
//! assert_eq!(event.listener_count(), 0);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod event;
pub mod prelude;
pub mod trigger;

pub use event::{Event, ListenerHandle};
pub use trigger::{Trigger, TriggerNotify};
