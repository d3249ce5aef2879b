//! Suspend coordinator: cycle state machine, activity registry, observer fan-out.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::activity::{Activity, CompletionHandle};
use crate::deadline::Deadline;
use crate::error::SuspendError;
use crate::metrics;
use crate::observer::{CycleEvent, SuspendObserver};

/// Coordinator state. A suspend cycle moves `Running` → `Pausing` → `Paused`;
/// [`Coordinator::resume`] returns to `Running` from either paused state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuspendState {
    Running,
    Pausing,
    Paused,
}

/// Drives registered [`Activity`] instances through a quiescence protocol:
/// a suspend cycle asks every activity to stop admitting and drain in-flight
/// work, tracks their confirmations, bounds the wait with an optional
/// deadline, and fans lifecycle events out to [`SuspendObserver`]s.
///
/// Clone-able; all clones share the same state. One exclusive lock serializes
/// every state mutation, and it is always released before any external code
/// (activity pause/resume, observer callbacks) runs, so callbacks may freely
/// reenter the coordinator.
///
/// Misuse is absorbed rather than rejected: `resume()` while `Running` is a
/// no-op, completions from a superseded cycle are silently dropped, and an
/// activity that never confirms leaves the cycle unresolved, surfaced only
/// through [`SuspendObserver::on_timeout`] when a deadline was configured.
#[derive(Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    name: String,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<SuspendState>,
    cycle_tx: watch::Sender<CycleEvent>,
}

struct Inner {
    state: SuspendState,
    /// Bumped at every cycle boundary (suspend, effective resume, honored
    /// self-resume, init). Handles and deadlines carry the generation they
    /// were issued under; a mismatch means the callback is stale.
    generation: u64,
    outstanding: usize,
    deadline: Option<Deadline>,
    cycle_started_at: Option<Instant>,
    activities: Vec<Arc<dyn Activity>>,
    observers: Vec<Arc<dyn SuspendObserver>>,
}

impl Coordinator {
    /// Create a coordinator. `name` appears in log events and metric labels.
    pub fn new(name: impl Into<String>) -> Self {
        let (state_tx, _state_rx) = watch::channel(SuspendState::Running);
        let (cycle_tx, _cycle_rx) = watch::channel(CycleEvent::Started);
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                inner: Mutex::new(Inner {
                    state: SuspendState::Running,
                    generation: 0,
                    outstanding: 0,
                    deadline: None,
                    cycle_started_at: None,
                    activities: Vec::new(),
                    observers: Vec::new(),
                }),
                state_tx,
                cycle_tx,
            }),
        }
    }

    /// Host lifecycle hook, invoked once at process start. Resets to
    /// `Running` and clears any cycle bookkeeping. Idempotent.
    pub fn init(&self) {
        let shared = &self.shared;
        let mut inner = shared.lock_inner();
        inner.state = SuspendState::Running;
        inner.generation += 1;
        inner.outstanding = 0;
        inner.deadline = None;
        inner.cycle_started_at = None;
        shared.state_tx.send_replace(SuspendState::Running);
        debug!(name = %shared.name, "Suspend: coordinator initialised");
    }

    /// Host lifecycle hook, invoked once at process stop. Disarms any live
    /// deadline so no timer task outlives the host; otherwise a no-op.
    pub fn shutdown(&self) {
        let mut inner = self.shared.lock_inner();
        inner.deadline = None;
        debug!(name = %self.shared.name, "Suspend: coordinator shut down");
    }

    /// Start a suspend cycle: notify observers, ask every registered activity
    /// to pause, and arm a deadline when `timeout` is positive.
    ///
    /// Callable in any state; a call issued while a cycle is in flight
    /// supersedes it (outstanding confirmations from the prior cycle are
    /// dropped, observers see a fresh `on_suspend_started`). Returns once the
    /// pause requests have been issued, not once they complete. The exception
    /// is the zero-activity fast path, which resolves the cycle and fires
    /// `on_complete` before returning.
    pub async fn suspend(&self, timeout: Option<Duration>) {
        let shared = &self.shared;
        let (generation, observers) = {
            let mut inner = shared.lock_inner();
            inner.state = SuspendState::Pausing;
            inner.generation += 1;
            inner.cycle_started_at = Some(Instant::now());
            // A prior cycle's deadline is already stale by generation, but
            // cancel its timer task eagerly rather than letting it tick down.
            inner.deadline = None;
            shared.state_tx.send_replace(SuspendState::Pausing);
            (inner.generation, inner.observers.clone())
        };
        info!(name = %shared.name, timeout = ?timeout, "Suspend: suspending server activities");
        metrics::emit_cycle_initiated(&shared.name);
        shared.publish(CycleEvent::Started);
        shared.notify(&observers, CycleEvent::Started);

        let targets: Vec<Arc<dyn Activity>> = {
            let mut inner = shared.lock_inner();
            if inner.generation != generation {
                // Superseded while observers were being notified.
                return;
            }
            inner.outstanding = inner.activities.len();
            if inner.activities.is_empty() {
                shared.resolve_complete(inner);
                return;
            }
            inner.activities.clone()
        };
        for activity in &targets {
            let handle = CompletionHandle::new(Arc::downgrade(shared), generation);
            activity.pause(handle).await;
        }

        if let Some(timeout) = timeout.filter(|t| !t.is_zero()) {
            let mut inner = shared.lock_inner();
            // Activities may confirm inline during pause(), and a concurrent
            // resume or overlapping suspend may have ended the cycle; only a
            // still-live, unresolved cycle gets a deadline.
            if inner.generation == generation && inner.state == SuspendState::Pausing {
                inner.deadline = Some(Deadline::arm(shared, generation, timeout));
            }
        }
    }

    /// Cancel any in-flight or completed suspend cycle and return to
    /// `Running`. No-op with no side effects when already `Running`.
    ///
    /// Observers are notified `on_cancelled`, then every registered
    /// activity's `resume()` is called and awaited in registration order;
    /// this method returns only after the last one returns.
    pub async fn resume(&self) {
        let shared = &self.shared;
        let (was_pausing, elapsed, observers, activities) = {
            let mut inner = shared.lock_inner();
            if inner.state == SuspendState::Running {
                return;
            }
            let was_pausing = inner.state == SuspendState::Pausing;
            // Supersede the cycle: outstanding handles and the deadline all
            // carry the old generation and become stale.
            inner.generation += 1;
            inner.deadline = None;
            inner.outstanding = 0;
            inner.state = SuspendState::Running;
            let elapsed = inner.cycle_started_at.take().map(|t| t.elapsed());
            shared.state_tx.send_replace(SuspendState::Running);
            (
                was_pausing,
                elapsed,
                inner.observers.clone(),
                inner.activities.clone(),
            )
        };
        info!(name = %shared.name, "Suspend: resuming server activities");
        if was_pausing {
            if let Some(elapsed) = elapsed {
                metrics::emit_cycle_resolved(&shared.name, "cancelled");
                metrics::emit_cycle_duration(&shared.name, "cancelled", elapsed.as_secs_f64());
            }
        }
        shared.publish(CycleEvent::Cancelled);
        shared.notify(&observers, CycleEvent::Cancelled);
        for activity in &activities {
            activity.resume().await;
        }
    }

    /// Register an activity. Activities added while a cycle is in flight are
    /// not retroactively part of that cycle's outstanding count.
    pub fn register_activity(&self, activity: Arc<dyn Activity>) {
        let mut inner = self.shared.lock_inner();
        inner.activities.push(activity);
        debug!(
            name = %self.shared.name,
            total = inner.activities.len(),
            "Suspend: activity registered"
        );
    }

    /// Unregister an activity (compared by `Arc` identity). Does not adjust
    /// the outstanding count of an in-flight cycle: removing an activity that
    /// has not yet confirmed leaves that cycle unresolvable until it is
    /// cancelled or its deadline fires.
    pub fn unregister_activity(&self, activity: &Arc<dyn Activity>) {
        let mut inner = self.shared.lock_inner();
        inner.activities.retain(|a| !Arc::ptr_eq(a, activity));
    }

    /// Register an observer. Safe to call from inside a notification
    /// callback; the new observer sees only events dispatched after
    /// registration.
    pub fn add_observer(&self, observer: Arc<dyn SuspendObserver>) {
        let mut inner = self.shared.lock_inner();
        inner.observers.push(observer);
    }

    /// Remove an observer (compared by `Arc` identity). Safe to call from
    /// inside a notification callback; events of the burst currently being
    /// dispatched are not retracted.
    pub fn remove_observer(&self, observer: &Arc<dyn SuspendObserver>) {
        let mut inner = self.shared.lock_inner();
        inner.observers.retain(|o| !Arc::ptr_eq(o, observer));
    }

    /// Current coordinator state.
    pub fn state(&self) -> SuspendState {
        *self.shared.state_tx.borrow()
    }

    /// Subscription to state transitions; pair with `tokio::select!` the same
    /// way a shutdown signal is consumed.
    pub fn state_changed(&self) -> watch::Receiver<SuspendState> {
        self.shared.state_tx.subscribe()
    }

    /// Wait for the coordinator to reach `Paused`.
    ///
    /// Resolves `Ok` immediately when already paused, otherwise when the next
    /// cycle completes. Resolves `Err` when that cycle is cancelled first
    /// (external [`resume`](Coordinator::resume) or an activity self-resume)
    /// or its deadline elapses first.
    pub async fn wait_until_paused(&self) -> Result<(), SuspendError> {
        let mut cycles = self.shared.cycle_tx.subscribe();
        if self.state() == SuspendState::Paused {
            return Ok(());
        }
        loop {
            if cycles.changed().await.is_err() {
                return Err(SuspendError::Cancelled);
            }
            let event = *cycles.borrow_and_update();
            match event {
                CycleEvent::Started => {}
                CycleEvent::Complete => return Ok(()),
                CycleEvent::Cancelled => return Err(SuspendError::Cancelled),
                CycleEvent::Timeout { after } => {
                    return Err(SuspendError::DeadlineElapsed { elapsed: after })
                }
            }
        }
    }
}

impl Shared {
    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("poisoned suspend coordinator lock")
    }

    /// An activity confirmed its pause. Stale confirmations (superseded
    /// cycle) are dropped; the last live confirmation resolves the cycle.
    pub(crate) fn activity_paused(&self, generation: u64) {
        let mut inner = self.lock_inner();
        if inner.generation != generation {
            debug!(name = %self.name, "Suspend: dropping stale pause confirmation");
            return;
        }
        inner.outstanding = inner.outstanding.saturating_sub(1);
        debug!(
            name = %self.name,
            outstanding = inner.outstanding,
            "Suspend: activity confirmed pause"
        );
        if inner.outstanding == 0 {
            self.resolve_complete(inner);
        }
    }

    /// An activity vetoed a pause in progress (observed new work and
    /// aborted). Cancels the cycle: the deadline is disarmed and later
    /// confirmations become stale. Other activities are not resumed, since
    /// only the originating activity aborted, and the state stays `Pausing`.
    pub(crate) fn activity_resumed(&self, generation: u64) {
        let (elapsed, observers) = {
            let mut inner = self.lock_inner();
            if inner.generation != generation {
                debug!(name = %self.name, "Suspend: dropping stale self-resume");
                return;
            }
            inner.generation += 1;
            inner.deadline = None;
            inner.outstanding = 0;
            (inner.cycle_started_at.take().map(|t| t.elapsed()), inner.observers.clone())
        };
        info!(name = %self.name, "Suspend: activity self-resumed, cycle cancelled");
        metrics::emit_cycle_resolved(&self.name, "cancelled");
        if let Some(elapsed) = elapsed {
            metrics::emit_cycle_duration(&self.name, "cancelled", elapsed.as_secs_f64());
        }
        self.publish(CycleEvent::Cancelled);
        self.notify(&observers, CycleEvent::Cancelled);
    }

    /// The cycle deadline elapsed. Informational only: no state change, no
    /// forced resume, and the cycle stays live. Activities are expected to
    /// keep draining and their confirmations still resolve it.
    pub(crate) fn timeout_fired(&self, generation: u64) {
        let (after, observers) = {
            let mut inner = self.lock_inner();
            if inner.generation != generation {
                return;
            }
            let after = match inner.deadline.take() {
                Some(deadline) => deadline.duration(),
                None => return,
            };
            (after, inner.observers.clone())
        };
        warn!(
            name = %self.name,
            deadline_secs = after.as_secs_f64(),
            "Suspend: deadline elapsed, activities still draining"
        );
        metrics::emit_deadline_elapsed(&self.name);
        self.publish(CycleEvent::Timeout { after });
        self.notify(&observers, CycleEvent::Timeout { after });
    }

    /// Outstanding reached zero: transition to `Paused` and notify.
    fn resolve_complete(&self, mut inner: MutexGuard<'_, Inner>) {
        inner.state = SuspendState::Paused;
        inner.deadline = None;
        let elapsed = inner.cycle_started_at.take().map(|t| t.elapsed());
        let observers = inner.observers.clone();
        self.state_tx.send_replace(SuspendState::Paused);
        drop(inner);

        info!(
            name = %self.name,
            duration_secs = elapsed.unwrap_or_default().as_secs_f64(),
            "Suspend: all activities paused"
        );
        metrics::emit_cycle_resolved(&self.name, "completed");
        if let Some(elapsed) = elapsed {
            metrics::emit_cycle_duration(&self.name, "completed", elapsed.as_secs_f64());
        }
        self.publish(CycleEvent::Complete);
        self.notify(&observers, CycleEvent::Complete);
    }

    fn publish(&self, event: CycleEvent) {
        self.cycle_tx.send_replace(event);
    }

    /// Deliver one event to a snapshot of the observer registry, in
    /// registration order. The snapshot is taken under the lock by the
    /// caller, so callbacks mutating the registry cannot corrupt iteration.
    fn notify(&self, observers: &[Arc<dyn SuspendObserver>], event: CycleEvent) {
        for observer in observers {
            match event {
                CycleEvent::Started => observer.on_suspend_started(),
                CycleEvent::Complete => observer.on_complete(),
                CycleEvent::Cancelled => observer.on_cancelled(),
                CycleEvent::Timeout { .. } => observer.on_timeout(),
            }
        }
    }
}
