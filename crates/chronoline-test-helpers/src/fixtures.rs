//! Recording fixtures for listener and scheduler tests.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A cloneable, thread-safe execution log.
///
/// Listeners push an identifying value when they run; the test asserts on
/// the resulting order with [`snapshot`](ExecutionLog::snapshot).
#[derive(Clone, Debug, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<i64>>>,
}

impl ExecutionLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` as the next execution.
    pub fn push(&self, id: i64) {
        self.entries.lock().push(id);
    }

    /// The executions recorded so far, in order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<i64> {
        self.entries.lock().clone()
    }

    /// Number of executions recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// A cloneable, thread-safe execution counter.
#[derive(Clone, Debug, Default)]
pub struct Counter {
    count: Arc<AtomicUsize>,
}

impl Counter {
    /// Create a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the new value.
    pub fn increment(&self) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}
