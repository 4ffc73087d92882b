//! Typed notification targets with O(1)-removable listeners.

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Sentinel index marking a handle whose listener has been removed.
const INVALID_INDEX: usize = usize::MAX;

/// Callback type invoked when an event fires.
pub type ListenerFn<T> = dyn Fn(&Event<T>) + Send + Sync;

/// A registered listener: the callback plus the shared slot that always
/// records the entry's current index in the list.
struct ListenerEntry<T> {
    callback: Arc<ListenerFn<T>>,
    slot: Arc<AtomicUsize>,
}

/// Opaque handle returned by [`Event::add_listener`].
///
/// The only supported operation is [`Event::remove_listener`]. The handle
/// shares an index slot with its list entry; swap-removal backpatches the
/// slot of whichever entry gets displaced, so the recorded index equals the
/// entry's actual position at all times.
///
/// A handle whose listener was already removed, or that belongs to a
/// different event, is silently ignored.
#[derive(Clone)]
pub struct ListenerHandle {
    slot: Arc<AtomicUsize>,
}

impl ListenerHandle {
    /// Whether the listener behind this handle has been removed.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.slot.load(Ordering::Acquire) == INVALID_INDEX
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index = self.slot.load(Ordering::Acquire);
        let mut dbg = f.debug_struct("ListenerHandle");
        if index == INVALID_INDEX {
            dbg.field("removed", &true).finish()
        } else {
            dbg.field("index", &index).finish()
        }
    }
}

/// A typed notification target.
///
/// Holds an ordered list of listener callbacks and a cached payload written
/// by the most recent firing. Listeners fire in registration order (subject
/// to the O(1) removal policy, which moves the final listener into a vacated
/// slot).
///
/// # Reentrancy
///
/// No internal lock is held while a listener runs, so listeners may call
/// [`add_listener`](Event::add_listener),
/// [`remove_listener`](Event::remove_listener) (including on themselves),
/// [`payload`](Event::payload), and
/// [`notify_with_payload`](Event::notify_with_payload) on the same event. A
/// listener appended during a firing is not guaranteed to run in that round.
pub struct Event<T> {
    listeners: RwLock<Vec<ListenerEntry<T>>>,
    payload: RwLock<Option<T>>,
}

impl<T> Event<T> {
    /// Create an event with no listeners and no payload.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            payload: RwLock::new(None),
        }
    }

    /// Append a listener and return its removal handle.
    ///
    /// Amortized O(1). The listener fires on every subsequent
    /// [`fire`](Event::fire) until removed.
    pub fn add_listener<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&Event<T>) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.write();
        let slot = Arc::new(AtomicUsize::new(listeners.len()));
        listeners.push(ListenerEntry {
            callback: Arc::new(callback),
            slot: Arc::clone(&slot),
        });
        ListenerHandle { slot }
    }

    /// Remove the listener behind `handle` in O(1).
    ///
    /// The final entry is swapped into the vacated slot and its recorded
    /// index is backpatched to match. Removing an already-removed handle, or
    /// a handle from another event, is a no-op.
    pub fn remove_listener(&self, handle: &ListenerHandle) {
        let mut listeners = self.listeners.write();

        let index = handle.slot.load(Ordering::Acquire);
        if index >= listeners.len() {
            return;
        }
        // A live index that does not share our slot belongs to some other
        // event's listener list.
        if !Arc::ptr_eq(&listeners[index].slot, &handle.slot) {
            return;
        }

        listeners.swap_remove(index);
        if index < listeners.len() {
            listeners[index].slot.store(index, Ordering::Release);
        }
        handle.slot.store(INVALID_INDEX, Ordering::Release);
    }

    /// Invoke every listener in current list order, passing the event.
    ///
    /// The listener list is re-read between invocations, so removals and
    /// additions made by a running listener take effect immediately without
    /// corrupting the iteration.
    pub fn fire(&self) {
        let mut index = 0;
        loop {
            let callback = {
                let listeners = self.listeners.read();
                match listeners.get(index) {
                    Some(entry) => Arc::clone(&entry.callback),
                    None => break,
                }
            };
            callback(self);
            index += 1;
        }
    }

    /// Store `payload` as the event's current payload, then [`fire`](Event::fire).
    ///
    /// Listeners observe the payload through the event reference they
    /// receive. Firing is synchronous in the calling context.
    pub fn notify_with_payload(&self, payload: T) {
        *self.payload.write() = Some(payload);
        self.fire();
    }

    /// Read access to the payload from the most recent firing.
    ///
    /// Returns `None` before the first [`notify_with_payload`](Event::notify_with_payload).
    #[must_use]
    pub fn payload(&self) -> Option<MappedRwLockReadGuard<'_, T>> {
        RwLockReadGuard::try_map(self.payload.read(), Option::as_ref).ok()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl<T: Clone> Event<T> {
    /// Clone of the payload from the most recent firing, if any.
    #[must_use]
    pub fn payload_cloned(&self) -> Option<T> {
        self.payload.read().clone()
    }
}

impl<T> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("listener_count", &self.listeners.read().len())
            .field("has_payload", &self.payload.read().is_some())
            .finish()
    }
}
