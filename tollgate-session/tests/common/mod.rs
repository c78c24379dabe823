//! Shared helpers for session tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tollgate_authority::{
    Authority, Credentials, PasswordReset, Registration, Reply, Revalidation,
};
use tollgate_license::{
    Clock, LicensePayload, MachineIdentity, SignatureVerifier,
};
use tollgate_session::{SessionConfig, SessionController, SessionEvent};

/// Wall-clock seconds at the start of every test (2025-01-01T00:00:00Z).
pub const NOW: u64 = 1_735_689_600;

/// Clock that follows tokio's (paused) time, starting at [`NOW`].
#[derive(Debug)]
pub struct TokioClock {
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            start: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_secs(&self) -> u64 {
        NOW + self.start.elapsed().as_secs()
    }
}

/// Deterministic authority signing key.
pub fn authority_key() -> SigningKey {
    SigningKey::from_bytes(&[
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ])
}

/// A key the verifier does not trust.
pub fn rogue_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

pub fn trusted_verifier() -> Arc<SignatureVerifier> {
    let pk = authority_key().verifying_key().to_bytes();
    Arc::new(SignatureVerifier::from_bytes(&pk).unwrap())
}

pub fn machine() -> MachineIdentity {
    MachineIdentity::new("3f2a9c1e8b7d4a6f0c5e2b9d1a8f7c3e")
}

pub fn credentials() -> Credentials {
    Credentials {
        user: "alice".to_string(),
        password: "correct horse".to_string(),
    }
}

/// Payload for `alice` signed by `key`, expiring `ttl_secs` after [`NOW`].
pub fn license_signed_by(key: &SigningKey, ttl_secs: u64, blocked: bool) -> LicensePayload {
    let expires_at = NOW + ttl_secs;
    let token = format!("alice|{expires_at}|{blocked}").into_bytes();
    let signature = key.sign(&token).to_bytes().to_vec();
    LicensePayload {
        user: "alice".to_string(),
        expires_at,
        blocked,
        token,
        signature: Some(signature),
    }
}

pub fn license(ttl_secs: u64) -> LicensePayload {
    license_signed_by(&authority_key(), ttl_secs, false)
}

/// Authority answering from per-operation queues.
///
/// Unscripted revalidations report the authority as unreachable. With
/// [`ScriptedAuthority::hold_revalidations`] set, each revalidation signals
/// `revalidation_started` and then waits for `release` before answering.
#[derive(Default)]
pub struct ScriptedAuthority {
    logins: Mutex<VecDeque<Reply<Option<LicensePayload>>>>,
    registrations: Mutex<VecDeque<Reply<Option<LicensePayload>>>>,
    key_checks: Mutex<VecDeque<Reply<LicensePayload>>>,
    resets: Mutex<VecDeque<Reply<()>>>,
    revalidations: Mutex<VecDeque<Revalidation>>,
    pub key_check_calls: AtomicUsize,
    pub revalidate_calls: AtomicUsize,
    pub hold_revalidations: AtomicBool,
    pub revalidation_started: Notify,
    pub release: Notify,
}

impl ScriptedAuthority {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_login(&self, reply: Reply<Option<LicensePayload>>) {
        self.logins.lock().unwrap().push_back(reply);
    }

    pub fn push_registration(&self, reply: Reply<Option<LicensePayload>>) {
        self.registrations.lock().unwrap().push_back(reply);
    }

    pub fn push_key_check(&self, reply: Reply<LicensePayload>) {
        self.key_checks.lock().unwrap().push_back(reply);
    }

    pub fn push_reset(&self, reply: Reply<()>) {
        self.resets.lock().unwrap().push_back(reply);
    }

    pub fn push_revalidation(&self, outcome: Revalidation) {
        self.revalidations.lock().unwrap().push_back(outcome);
    }

    fn unscripted<T>() -> Reply<T> {
        Reply::NetworkFailure {
            message: "unscripted call".to_string(),
        }
    }
}

#[async_trait]
impl Authority for ScriptedAuthority {
    async fn login(
        &self,
        _credentials: &Credentials,
        _machine: &MachineIdentity,
        _client_ip: &str,
    ) -> Reply<Option<LicensePayload>> {
        self.logins.lock().unwrap().pop_front().unwrap_or_else(Self::unscripted)
    }

    async fn register(
        &self,
        _registration: &Registration,
        _machine: &MachineIdentity,
    ) -> Reply<Option<LicensePayload>> {
        self.registrations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(Self::unscripted)
    }

    async fn verify_key(&self, _key: &str, _machine: &MachineIdentity) -> Reply<LicensePayload> {
        self.key_check_calls.fetch_add(1, Ordering::SeqCst);
        self.key_checks.lock().unwrap().pop_front().unwrap_or_else(Self::unscripted)
    }

    async fn request_password_reset(&self, _email: &str) -> Reply<()> {
        self.resets.lock().unwrap().pop_front().unwrap_or_else(Self::unscripted)
    }

    async fn complete_password_reset(&self, _reset: &PasswordReset) -> Reply<()> {
        self.resets.lock().unwrap().pop_front().unwrap_or_else(Self::unscripted)
    }

    async fn revalidate(&self, _user: &str, _machine: &MachineIdentity, _token: &[u8]) -> Revalidation {
        self.revalidate_calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_revalidations.load(Ordering::SeqCst) {
            self.revalidation_started.notify_one();
            self.release.notified().await;
        }
        self.revalidations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Revalidation::Unreachable {
                reason: "connection error: timed out".to_string(),
            })
    }
}

/// Controller over `authority` with default timings and a tokio-driven clock.
pub fn controller(authority: &Arc<ScriptedAuthority>) -> SessionController {
    let authority: Arc<dyn Authority> = authority.clone();
    SessionController::new(
        authority,
        trusted_verifier(),
        Arc::new(TokioClock::new()),
        SessionConfig::default(),
    )
}

/// Receives events until one matches `pred`, skipping lag.
pub async fn wait_for(
    rx: &mut broadcast::Receiver<SessionEvent>,
    pred: impl Fn(&SessionEvent) -> bool,
) -> SessionEvent {
    loop {
        match rx.recv().await {
            Ok(event) if pred(&event) => return event,
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
        }
    }
}

/// Drains every event published so far.
pub fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => {}
            Err(_) => return events,
        }
    }
}

/// Lets spawned tasks run without moving the clock.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Advances paused time and lets the woken tasks run.
pub async fn advance_secs(secs: u64) {
    tokio::time::advance(Duration::from_secs(secs)).await;
    settle().await;
}
