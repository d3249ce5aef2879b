//! Single-shot deadline timer bounding a suspend cycle.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::coordinator::Shared;

/// At most one deadline is live at a time. It is disarmed eagerly on resume,
/// completion, self-resume, or firing; dropping it cancels the timer task,
/// so no timer outlives its cycle.
pub(crate) struct Deadline {
    duration: Duration,
    cancel: CancellationToken,
}

impl Deadline {
    /// Spawn a timer task tagged with the cycle generation. The coordinator
    /// re-checks the generation under its lock when the timer fires, so a
    /// deadline racing its own disarm is a no-op.
    pub(crate) fn arm(shared: &Arc<Shared>, generation: u64, duration: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let shared = Arc::downgrade(shared);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(duration) => {
                    if let Some(shared) = shared.upgrade() {
                        shared.timeout_fired(generation);
                    }
                }
            }
        });
        Self { duration, cancel }
    }

    pub(crate) fn duration(&self) -> Duration {
        self.duration
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
