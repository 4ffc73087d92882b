//! Prelude module for common event types.

pub use crate::event::{Event, ListenerHandle};
pub use crate::trigger::{Trigger, TriggerNotify};
