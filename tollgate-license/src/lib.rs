//! License trust engine for Tollgate.
//!
//! This crate handles:
//! - Ed25519 verification of authority-signed license tokens
//! - The license state machine (active / expired / blocked / invalid)
//! - The in-memory license record and its derived trust verdict
//!
//! # Design Principles
//!
//! - **Signature first**: no payload field is trusted before its signature verifies
//! - **Fail closed**: a missing key, signature, or malformed input denies trust
//! - **Single writer**: only [`LicenseStateMachine`] mutates the license record
//! - **Generations**: late results from an ended session are discarded

mod clock;
mod error;
mod identity;
mod record;
mod state;
mod verifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LicenseError, LicenseResult};
pub use identity::{MachineIdentity, UNKNOWN_MACHINE_ID};
pub use record::{LicensePayload, LicenseRecord, TrustState};
pub use state::{LicenseStateMachine, RecordSnapshot, SessionStart};
pub use verifier::{SignatureVerifier, PUBLIC_KEY_LEN};
