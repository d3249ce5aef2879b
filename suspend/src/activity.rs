//! Activity capability and per-cycle completion handle.

use std::sync::Weak;

use async_trait::async_trait;

use crate::coordinator::Shared;

/// An independently pausable unit of request admission, registered with the
/// [`Coordinator`](crate::Coordinator).
#[async_trait]
pub trait Activity: Send + Sync {
    /// Stop admitting new work and drain in-flight work. Returns once the
    /// request has been issued; report the outcome later through `handle`,
    /// with [`CompletionHandle::complete`] when drained or
    /// [`CompletionHandle::self_resumed`] when the pause is abandoned.
    async fn pause(&self, handle: CompletionHandle);

    /// Resume normal admission. Idempotent; invoked regardless of whether a
    /// pause ever completed.
    async fn resume(&self);
}

/// Callback capability issued fresh per suspend cycle, one per activity,
/// tagged with that cycle's generation. Both report methods consume the
/// handle, so an activity reports at most once per cycle; a handle from a
/// superseded cycle (or one outliving the coordinator) is a silent no-op.
#[derive(Debug)]
pub struct CompletionHandle {
    shared: Weak<Shared>,
    generation: u64,
}

impl CompletionHandle {
    pub(crate) fn new(shared: Weak<Shared>, generation: u64) -> Self {
        Self { shared, generation }
    }

    /// The activity stopped admitting and finished draining in-flight work.
    pub fn complete(self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.activity_paused(self.generation);
        }
    }

    /// The activity observed new work and aborted the pause. Cancels the
    /// suspend cycle without an external `resume()` call.
    pub fn self_resumed(self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.activity_resumed(self.generation);
        }
    }
}
