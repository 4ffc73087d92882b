//! Schedulable triggers and the type-erased notify capability.

use crate::event::Event;
use std::fmt;
use std::sync::Arc;

/// The type-erased capability a scheduler queue stores.
///
/// A timeline queue holds triggers bound to events of heterogeneous payload
/// types; this trait hides the concrete `(Event<T>, T)` pair behind the one
/// operation the queue needs. It is the only polymorphism the core requires.
pub trait TriggerNotify: Send + Sync {
    /// Deliver the bound payload to the bound event and fire its listeners.
    fn notify(&self);
}

/// An immutable work item pairing an [`Event`] with a payload value.
///
/// A trigger does nothing on its own; it is handed to a scheduler (as an
/// `Arc<dyn TriggerNotify>`) to be executed at a chosen instant, or notified
/// directly. One trigger value may back several schedule entries; each entry
/// executes it at most once.
pub struct Trigger<T> {
    event: Arc<Event<T>>,
    payload: T,
}

impl<T> Trigger<T> {
    /// Bind `payload` to `event`.
    #[must_use]
    pub fn new(event: Arc<Event<T>>, payload: T) -> Self {
        Self { event, payload }
    }

    /// The event this trigger delivers to.
    #[must_use]
    pub fn event(&self) -> &Arc<Event<T>> {
        &self.event
    }

    /// The payload this trigger delivers.
    #[must_use]
    pub fn payload(&self) -> &T {
        &self.payload
    }
}

impl<T> TriggerNotify for Trigger<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn notify(&self) {
        self.event.notify_with_payload(self.payload.clone());
    }
}

impl<T: fmt::Debug> fmt::Debug for Trigger<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("event", &self.event)
            .field("payload", &self.payload)
            .finish()
    }
}
