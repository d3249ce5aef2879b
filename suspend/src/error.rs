//! Error type for the awaitable suspend outcome API.

use std::time::Duration;

use thiserror::Error;

/// Returned by [`Coordinator::wait_until_paused`](crate::Coordinator::wait_until_paused).
///
/// Steady-state coordinator operations never fail; this only reports how an
/// awaited suspend cycle resolved when it did not reach `Paused`.
#[derive(Debug, Error)]
pub enum SuspendError {
    /// The cycle was cancelled before every activity confirmed its pause,
    /// by an external `resume()` or an activity self-resuming.
    #[error("suspend cycle cancelled before all activities paused")]
    Cancelled,

    /// The cycle deadline elapsed with activities still draining.
    #[error("suspend deadline elapsed after {elapsed:?} with activities still draining")]
    DeadlineElapsed { elapsed: Duration },
}
