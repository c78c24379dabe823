//! The license state machine.
//!
//! Owns the single [`LicenseRecord`] and is the only writer of it. Every
//! payload goes through [`LicenseStateMachine::classify`], which checks the
//! signature before looking at any other field:
//!
//! 1. signature missing or invalid → `Invalid`
//! 2. `blocked` → `Blocked`
//! 3. `now >= expires_at` → `Expired`
//! 4. otherwise → `Active`
//!
//! Writes from background tasks carry the session generation they were
//! started under; a write tagged with an old generation is discarded, so a
//! revalidation that completes after logout never resurrects the session.

use crate::record::{LicensePayload, LicenseRecord, TrustState};
use crate::verifier::SignatureVerifier;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    revision: u64,
    record: Option<LicenseRecord>,
    verdict: Option<TrustState>,
}

/// Result of committing the first payload of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStart {
    /// Generation the session runs under.
    pub generation: u64,
    /// Verdict for the payload.
    pub state: TrustState,
}

/// A consistent view of the committed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSnapshot {
    /// Bumped every time the record is replaced.
    pub revision: u64,
    /// The record itself.
    pub record: LicenseRecord,
}

/// Owner of the in-memory license.
#[derive(Debug)]
pub struct LicenseStateMachine {
    verifier: Arc<SignatureVerifier>,
    slot: RwLock<Slot>,
}

impl LicenseStateMachine {
    /// Creates an unauthenticated state machine.
    #[must_use]
    pub fn new(verifier: Arc<SignatureVerifier>) -> Self {
        Self {
            verifier,
            slot: RwLock::new(Slot::default()),
        }
    }

    /// The verifier used for every transition.
    #[must_use]
    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// Classifies `payload` at `now` without touching the committed state.
    #[must_use]
    pub fn classify(&self, payload: &LicensePayload, now: u64) -> TrustState {
        self.evaluate(payload, now).0
    }

    fn evaluate(&self, payload: &LicensePayload, now: u64) -> (TrustState, Option<LicenseRecord>) {
        let Some(signature) = payload.signature.as_deref() else {
            error!(user = %payload.user, "License payload carries no signature");
            return (TrustState::Invalid, None);
        };
        if !self.verifier.verify(&payload.token, signature) {
            error!(user = %payload.user, "License signature verification failed");
            return (TrustState::Invalid, None);
        }

        let record = LicenseRecord::verified(payload, signature.to_vec(), now);
        let state = record.trust_state(now);
        match state {
            TrustState::Active { .. } => (state, Some(record)),
            _ => (state, None),
        }
    }

    /// Starts a new session from `payload`, invalidating any previous one.
    ///
    /// The record is kept only when the verdict is `Active`; any other
    /// verdict is remembered so [`Self::trust_state`] can report it.
    pub fn begin(&self, payload: &LicensePayload, now: u64) -> SessionStart {
        let (state, record) = self.evaluate(payload, now);
        let mut slot = self.write();
        slot.generation += 1;
        slot.revision += 1;
        slot.verdict = (!state.is_active()).then_some(state);
        slot.record = record;
        info!(generation = slot.generation, ?state, "License session evaluated");
        SessionStart {
            generation: slot.generation,
            state,
        }
    }

    /// Applies a revalidation payload to the session `generation`.
    ///
    /// Returns `None` and changes nothing if that session has already ended.
    /// The record is replaced as a whole or, on a non-active verdict, cleared.
    pub fn apply(&self, generation: u64, payload: &LicensePayload, now: u64) -> Option<TrustState> {
        let (state, record) = self.evaluate(payload, now);
        let mut slot = self.write();
        if slot.generation != generation || slot.record.is_none() {
            debug!(generation, current = slot.generation, "Discarding late revalidation result");
            return None;
        }
        slot.revision += 1;
        match record {
            Some(record) => slot.record = Some(record),
            None => {
                warn!(generation, ?state, "Revalidation ended the license");
                slot.record = None;
                slot.verdict = Some(state);
            }
        }
        Some(state)
    }

    /// Records a terminal verdict reached without a new payload (countdown
    /// expiry, authority rejection) and drops the record.
    ///
    /// Returns false if `generation` is no longer current.
    pub fn conclude(&self, generation: u64, verdict: Option<TrustState>) -> bool {
        let mut slot = self.write();
        if slot.generation != generation {
            return false;
        }
        slot.revision += 1;
        slot.record = None;
        slot.verdict = verdict;
        true
    }

    /// Ends the current session and returns the new generation.
    ///
    /// Safe to call with no session.
    pub fn end_session(&self) -> u64 {
        let mut slot = self.write();
        slot.generation += 1;
        slot.revision += 1;
        slot.record = None;
        slot.verdict = None;
        slot.generation
    }

    /// The current session generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// The committed record for `generation`, if that session still holds one.
    #[must_use]
    pub fn snapshot(&self, generation: u64) -> Option<RecordSnapshot> {
        let slot = self.read();
        if slot.generation != generation {
            return None;
        }
        slot.record.as_ref().map(|record| RecordSnapshot {
            revision: slot.revision,
            record: record.clone(),
        })
    }

    /// The committed record, if any.
    #[must_use]
    pub fn record(&self) -> Option<LicenseRecord> {
        self.read().record.clone()
    }

    /// The trust verdict at `now`.
    #[must_use]
    pub fn trust_state(&self, now: u64) -> TrustState {
        let slot = self.read();
        match (&slot.record, slot.verdict) {
            (Some(record), _) => record.trust_state(now),
            (None, Some(verdict)) => verdict,
            (None, None) => TrustState::Unauthenticated,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Slot> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}
