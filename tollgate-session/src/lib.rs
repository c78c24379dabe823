//! Session orchestration for Tollgate.
//!
//! [`SessionController`] drives the interactive flows against an
//! [`Authority`](tollgate_authority::Authority) and, once a license is
//! active, hands it to a [`TrustScheduler`] that counts it down and
//! revalidates it in the background. Everything the host needs to show is
//! published as [`SessionEvent`]s.
//!
//! # Cancellation
//!
//! Logout bumps the license generation before aborting the scheduler. Any
//! revalidation still in flight finishes against an old generation and is
//! dropped by the state machine, and any queued report is dropped by the
//! session supervisor.

mod config;
mod controller;
mod event;
mod scheduler;

pub use config::SessionConfig;
pub use controller::{Enrollment, SessionController, SessionInfo, MIN_LICENSE_KEY_LEN};
pub use event::{EndReason, SessionEvent};
pub use scheduler::{SchedulerContext, SchedulerEvent, SchedulerSignal, TrustScheduler};
