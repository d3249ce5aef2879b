//! Observer capability for suspend lifecycle events.

use std::time::Duration;

/// External listener notified of suspend lifecycle transitions (health-check
/// flips, subsystem decommissioning, ...). All methods default to no-ops so
/// implementors override only what they react to.
///
/// Events of one cycle are delivered in registration order, against a
/// snapshot of the registry: an observer registered during a burst sees only
/// subsequent events, and one removed during a burst still receives the
/// event currently being dispatched.
pub trait SuspendObserver: Send + Sync {
    /// A suspend cycle started; activities are being asked to pause.
    fn on_suspend_started(&self) {}

    /// Every activity of the cycle confirmed its pause.
    fn on_complete(&self) {}

    /// The cycle was cancelled (an external resume or an activity
    /// self-resume) before all activities confirmed.
    fn on_cancelled(&self) {}

    /// The cycle deadline elapsed with activities still draining. This is
    /// informational: the coordinator does not force a resume, external code
    /// is expected to react.
    fn on_timeout(&self) {}
}

/// One cycle lifecycle event, dispatched to observers and broadcast on a
/// watch channel for the awaitable outcome API.
#[derive(Clone, Copy, Debug)]
pub(crate) enum CycleEvent {
    Started,
    Complete,
    Cancelled,
    Timeout { after: Duration },
}
