//! The timeline scheduler and its execution strategies.
//!
//! Every strategy shares the same sorted queue and the same dispatch cycle:
//! capture the head and its scheduled time, wait until that time arrives,
//! notify the trigger, remove the node, repeat while the queue is
//! non-empty. The head is re-read every iteration, so triggers enqueued
//! from inside a listener are picked up in sort order, and cancellations
//! against not-yet-executed nodes are honored.

use crate::error::{SchedulerError, SchedulerResult};
use crate::jitter::{JitterCompensator, JitterConfig, JitterStats};
use crate::queue::{NodeRef, TimelineQueue};
use chronoline_clock as clock;
use chronoline_events::TriggerNotify;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Cap on a single background condvar wait, guaranteeing responsiveness to
/// [`stop`](Scheduler::stop) no matter how far out the head is scheduled.
const MAX_WAIT_US: i64 = 1_000_000;

/// A busy-spin wait ending earlier than its deadline by more than this is
/// reported as clock skew.
const SKEW_WARN_US: i64 = 64;

/// Execution policy determining how the queue head is waited for and
/// dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Busy-spin on the monotonic clock; sub-microsecond latency at 100%
    /// CPU during waits. Driven by [`run`](Scheduler::run) on the caller's
    /// thread.
    HighRes,
    /// OS sleep with the remaining delay rounded to the nearest
    /// millisecond; negligible cost at ~1 ms resolution. Driven by
    /// [`run`](Scheduler::run) on the caller's thread.
    LowRes,
    /// No waiting at all: [`poll`](Scheduler::poll) dispatches everything
    /// already due and returns. The caller supplies the cadence.
    Polled,
    /// A dedicated worker thread launched by [`exec`](Scheduler::exec),
    /// waiting on a condition variable between dispatches.
    Background,
}

struct State {
    queue: TimelineQueue,
    compensator: JitterCompensator,
    stats: Option<JitterStats>,
    worker_running: bool,
    stop_requested: bool,
    stopped: bool,
    poisoned: bool,
}

struct Shared {
    state: Mutex<State>,
    wake: Condvar,
}

/// How a cooperative strategy waits for the head's deadline.
#[derive(Clone, Copy, PartialEq, Eq)]
enum WaitKind {
    Spin,
    Sleep,
}

/// A timeline-based event scheduler.
///
/// Triggers (as `Arc<dyn TriggerNotify>`) are inserted at absolute
/// microsecond instants and dispatched according to the chosen
/// [`Strategy`]. Within one scheduler, triggers fire in non-decreasing
/// scheduled-time order; ties fire in insertion order.
///
/// # Threading
///
/// Listener callbacks run on whichever thread drives the scheduler: the
/// caller's thread for `HighRes`/`LowRes`/`Polled`, the worker for
/// `Background`. No internal lock is held while a trigger notifies, so
/// listeners may reentrantly [`schedule`](Scheduler::schedule),
/// [`delay`](Scheduler::delay), [`cancel`](Scheduler::cancel), and
/// [`clear`](Scheduler::clear) without deadlocking. [`stop`](Scheduler::stop)
/// is the one operation a listener must not call, since it joins the thread
/// the listener runs on.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use chronoline_events::{Event, Trigger};
/// use chronoline_scheduler::{Scheduler, Strategy};
/// use chronoline_clock as clock;
///
/// let scheduler = Scheduler::new(Strategy::Polled);
/// let event = Arc::new(Event::<u32>::new());
/// let trigger = Arc::new(Trigger::new(Arc::clone(&event), 7));
///
/// let node = scheduler
///     .schedule(trigger, clock::now_us())
///     .expect("polled schedulers cannot be poisoned");
/// scheduler.poll();
///
/// assert_eq!(event.payload_cloned(), Some(7));
/// assert!(scheduler.is_empty());
/// # let _ = node;
/// ```
pub struct Scheduler {
    strategy: Strategy,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler with the given strategy and default jitter
    /// configuration (compensation disabled for `Polled`).
    #[must_use]
    pub fn new(strategy: Strategy) -> Self {
        Self::with_jitter_config(strategy, JitterConfig::default())
    }

    /// Create a scheduler with an explicit jitter configuration.
    ///
    /// The `Polled` strategy performs no waits, so its compensator is
    /// forced off regardless of `config`.
    #[must_use]
    pub fn with_jitter_config(strategy: Strategy, mut config: JitterConfig) -> Self {
        if strategy == Strategy::Polled {
            config.enabled = false;
        }
        Self {
            strategy,
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    queue: TimelineQueue::new(),
                    compensator: JitterCompensator::new(config),
                    stats: None,
                    worker_running: false,
                    stop_requested: false,
                    stopped: false,
                    poisoned: false,
                }),
                wake: Condvar::new(),
            }),
            worker: Mutex::new(None),
        }
    }

    /// The strategy this scheduler dispatches with.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Insert a trigger to execute at an absolute microsecond instant.
    ///
    /// The returned [`NodeRef`] stays valid until the node executes or is
    /// cancelled. For a running background scheduler, the worker is woken
    /// iff the new node became the queue head.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::WorkerPoisoned`] after a listener panic unwound
    /// the background worker.
    ///
    /// # Panics
    ///
    /// Panics if called on a background scheduler after [`stop`](Scheduler::stop)
    /// without a subsequent [`exec`](Scheduler::exec).
    pub fn schedule(
        &self,
        trigger: Arc<dyn TriggerNotify>,
        execute_at_us: i64,
    ) -> SchedulerResult<NodeRef> {
        let mut state = self.shared.state.lock();
        if state.poisoned {
            return Err(SchedulerError::WorkerPoisoned);
        }
        assert!(
            !(self.strategy == Strategy::Background && state.stopped),
            "schedule on a stopped background scheduler"
        );

        let node = state.queue.insert(trigger, execute_at_us);
        if self.strategy == Strategy::Background
            && state.worker_running
            && state.queue.head_ref() == Some(node)
        {
            self.shared.wake.notify_one();
        }
        Ok(node)
    }

    /// Insert a trigger to execute `delay_us` microseconds from now.
    ///
    /// Sugar for [`schedule`](Scheduler::schedule)`(trigger, now_us() + delay_us)`.
    ///
    /// # Errors
    ///
    /// Same as [`schedule`](Scheduler::schedule).
    pub fn delay(
        &self,
        trigger: Arc<dyn TriggerNotify>,
        delay_us: i64,
    ) -> SchedulerResult<NodeRef> {
        self.schedule(trigger, clock::now_us() + delay_us)
    }

    /// Cancel a scheduled node.
    ///
    /// Synchronous and idempotent: after return the trigger will not fire
    /// via this node. A node that already executed or was already cancelled
    /// is left alone. A cancel racing an in-flight notification does not
    /// abort it.
    pub fn cancel(&self, node_ref: NodeRef) {
        let mut state = self.shared.state.lock();
        let _ = state.queue.remove(node_ref);
    }

    /// Cancel every queued node and reset the jitter offset.
    pub fn clear(&self) {
        let mut state = self.shared.state.lock();
        state.queue.clear();
        state.compensator.reset();
    }

    /// Number of queued nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Whether no nodes are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().queue.is_empty()
    }

    /// Scheduled time of the earliest queued node, if any.
    #[must_use]
    pub fn next_execute_at_us(&self) -> Option<i64> {
        let state = self.shared.state.lock();
        let head = state.queue.head_ref()?;
        state.queue.execute_at_us(head)
    }

    /// Whether a listener panic has poisoned the background worker.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.shared.state.lock().poisoned
    }

    /// Current jitter offset in microseconds.
    #[must_use]
    pub fn jitter_offset_us(&self) -> i64 {
        self.shared.state.lock().compensator.offset_us()
    }

    /// Attach the debug jitter collector (no-op if already attached).
    pub fn enable_jitter_stats(&self) {
        let mut state = self.shared.state.lock();
        if state.stats.is_none() {
            state.stats = Some(JitterStats::new());
        }
    }

    /// Snapshot of the debug jitter collector, if attached.
    #[must_use]
    pub fn jitter_stats(&self) -> Option<JitterStats> {
        self.shared.state.lock().stats.clone()
    }

    /// Reset the debug jitter collector, if attached.
    pub fn reset_jitter_stats(&self) {
        if let Some(stats) = self.shared.state.lock().stats.as_mut() {
            stats.reset();
        }
    }

    /// Drive a cooperative scheduler until its queue is empty.
    ///
    /// `HighRes` busy-spins to each deadline; `LowRes` sleeps the remaining
    /// delay rounded to the nearest millisecond (already-due nodes dispatch
    /// without sleeping). Listeners run on the calling thread.
    ///
    /// # Panics
    ///
    /// Panics for the `Polled` and `Background` strategies, which are
    /// driven by [`poll`](Scheduler::poll) and [`exec`](Scheduler::exec).
    pub fn run(&self) {
        let kind = match self.strategy {
            Strategy::HighRes => WaitKind::Spin,
            Strategy::LowRes => WaitKind::Sleep,
            other => panic!("run() requires a cooperative strategy, not {other:?}"),
        };
        self.run_cooperative(kind);
    }

    fn run_cooperative(&self, kind: WaitKind) {
        loop {
            let (node_ref, trigger, scheduled_us, target_us) = {
                let state = self.shared.state.lock();
                match state.queue.peek() {
                    Some((node_ref, trigger, at)) => {
                        (node_ref, trigger, at, state.compensator.wait_target(at))
                    }
                    None => break,
                }
            };

            let wake_us = match kind {
                WaitKind::Spin => {
                    let late_us = clock::busy_wait_until(target_us);
                    target_us + late_us
                }
                WaitKind::Sleep => {
                    let remaining_us = target_us - clock::now_us();
                    if remaining_us > 0 {
                        // Half-up to whole milliseconds; a zero rounding
                        // means no sleep at all.
                        let millis = (remaining_us + 500) / 1_000;
                        if millis > 0 {
                            thread::sleep(Duration::from_millis(millis as u64));
                        }
                    }
                    clock::now_us()
                }
            };

            // A spin exits at or after its deadline on a healthy monotonic
            // clock; a sleep may legitimately wake up to half a rounding
            // unit early.
            let skew_slack_us = match kind {
                WaitKind::Spin => 0,
                WaitKind::Sleep => 1_000,
            };
            if wake_us < target_us - SKEW_WARN_US - skew_slack_us {
                tracing::warn!(wake_us, target_us, "monotonic clock went backwards across a wait");
            }

            trigger.notify();

            let mut state = self.shared.state.lock();
            let _ = state.queue.remove(node_ref);
            let delta_us = wake_us - scheduled_us;
            state.compensator.record(delta_us);
            if let Some(stats) = state.stats.as_mut() {
                stats.record(delta_us);
            }
        }
    }

    /// Dispatch every node whose execution time is already in the past,
    /// in order, without sleeping.
    ///
    /// The caller invokes this on its own cadence (once per frame, for
    /// example). Nodes enqueued by listeners during the poll are dispatched
    /// in the same call if their time is already due.
    ///
    /// # Panics
    ///
    /// Panics for strategies other than `Polled`.
    pub fn poll(&self) {
        assert!(
            self.strategy == Strategy::Polled,
            "poll() requires the Polled strategy, not {:?}",
            self.strategy
        );

        loop {
            let (node_ref, trigger) = {
                let state = self.shared.state.lock();
                match state.queue.peek() {
                    Some((node_ref, trigger, at)) if at <= clock::now_us() => (node_ref, trigger),
                    _ => break,
                }
            };

            trigger.notify();

            let mut state = self.shared.state.lock();
            let _ = state.queue.remove(node_ref);
        }
    }

    /// Launch the background worker thread on demand.
    ///
    /// The worker dispatches until the queue drains or [`stop`](Scheduler::stop)
    /// is called, then terminates; call `exec()` again after a drain to
    /// relaunch. Calling `exec()` while the worker is running is a no-op.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::WorkerSpawn`] if the thread could not be spawned
    /// (the scheduler stays usable, and a later `exec()` may succeed);
    /// [`SchedulerError::WorkerPoisoned`] after a listener panic.
    ///
    /// # Panics
    ///
    /// Panics for strategies other than `Background`.
    pub fn exec(&self) -> SchedulerResult<()> {
        assert!(
            self.strategy == Strategy::Background,
            "exec() requires the Background strategy, not {:?}",
            self.strategy
        );

        {
            let mut state = self.shared.state.lock();
            if state.poisoned {
                return Err(SchedulerError::WorkerPoisoned);
            }
            if state.worker_running {
                return Ok(());
            }
            state.worker_running = true;
            state.stop_requested = false;
            state.stopped = false;
        }

        // Reap a previously drained worker before replacing its handle.
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }

        let shared = Arc::clone(&self.shared);
        match thread::Builder::new()
            .name("chronoline-worker".into())
            .spawn(move || worker_loop(&shared))
        {
            Ok(handle) => {
                *self.worker.lock() = Some(handle);
                tracing::debug!("background worker started");
                Ok(())
            }
            Err(err) => {
                self.shared.state.lock().worker_running = false;
                Err(SchedulerError::worker_spawn(err.to_string()))
            }
        }
    }

    /// Stop the background worker and join it.
    ///
    /// Nodes still queued stay queued; a later [`exec`](Scheduler::exec)
    /// resumes dispatching them. Must not be called from a listener (it
    /// would join the thread the listener runs on).
    ///
    /// # Panics
    ///
    /// Panics for strategies other than `Background`.
    pub fn stop(&self) {
        assert!(
            self.strategy == Strategy::Background,
            "stop() requires the Background strategy, not {:?}",
            self.strategy
        );
        self.shutdown_worker();
        tracing::debug!("background worker stopped");
    }

    fn shutdown_worker(&self) {
        {
            let mut state = self.shared.state.lock();
            state.stop_requested = true;
            state.stopped = true;
        }
        self.shared.wake.notify_all();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.strategy == Strategy::Background {
            self.shutdown_worker();
        }
        // Remaining nodes are freed with the queue itself.
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Scheduler")
            .field("strategy", &self.strategy)
            .field("len", &state.queue.len())
            .field("worker_running", &state.worker_running)
            .field("poisoned", &state.poisoned)
            .finish()
    }
}

/// Marks the worker as stopped on the way out; a panicking unwind (a
/// listener panic) additionally poisons the scheduler.
struct WorkerGuard<'a> {
    shared: &'a Shared,
}

impl Drop for WorkerGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        if thread::panicking() {
            state.poisoned = true;
            tracing::warn!("listener panic unwound the background worker; scheduler poisoned");
        }
        state.worker_running = false;
        self.shared.wake.notify_all();
    }
}

fn worker_loop(shared: &Shared) {
    let _guard = WorkerGuard { shared };

    let mut state = shared.state.lock();
    loop {
        if state.stop_requested {
            break;
        }
        let Some((node_ref, trigger, scheduled_us)) = state.queue.peek() else {
            // Drained: the thread terminates; exec() relaunches on demand.
            break;
        };

        let target_us = state.compensator.wait_target(scheduled_us);
        let delay_us = target_us - clock::now_us();

        if delay_us <= 0 {
            // Pop under the lock, notify outside it, so listeners can call
            // back into the scheduler without self-deadlock.
            let _ = state.queue.remove(node_ref);
            drop(state);

            let wake_us = clock::now_us();
            if wake_us < target_us - SKEW_WARN_US {
                tracing::warn!(wake_us, target_us, "monotonic clock went backwards across a wait");
            }
            trigger.notify();

            state = shared.state.lock();
            let delta_us = wake_us - scheduled_us;
            state.compensator.record(delta_us);
            if let Some(stats) = state.stats.as_mut() {
                stats.record(delta_us);
            }
        } else {
            let wait_ms = delay_us.min(MAX_WAIT_US) / 1_000;
            let _ = shared
                .wake
                .wait_for(&mut state, Duration::from_millis(wait_ms as u64));
        }
    }
}
