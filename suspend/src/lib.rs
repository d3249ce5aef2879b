//! Graceful suspend/resume coordination for a server's pausable subsystems.
//!
//! Independently pausable subsystems ("activities") register with the
//! [`Coordinator`]; a suspend cycle asks each one to stop admitting new work
//! and drain what is in flight, tracks their confirmations through per-cycle
//! [`CompletionHandle`]s, bounds the wait with an optional deadline, and
//! notifies [`SuspendObserver`]s of the lifecycle. The coordinator only
//! orchestrates admission pausing, never request processing itself, and
//! anomalies (a deadline elapsing, an activity vetoing its pause) are
//! reported through observer events rather than forced state changes.

mod activity;
mod coordinator;
mod deadline;
mod error;
mod metrics;
mod observer;

pub use activity::{Activity, CompletionHandle};
pub use coordinator::{Coordinator, SuspendState};
pub use error::SuspendError;
pub use observer::SuspendObserver;
