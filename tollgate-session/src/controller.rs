//! Session orchestration.
//!
//! The controller runs the interactive flows (login, registration, license
//! activation, password reset), commits the first license of a session,
//! starts the trust scheduler for active sessions, and turns scheduler
//! verdicts into forced logouts after a notice period.

use crate::config::SessionConfig;
use crate::event::{EndReason, SessionEvent};
use crate::scheduler::{SchedulerContext, SchedulerEvent, SchedulerSignal, TrustScheduler};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tollgate_authority::{Authority, Credentials, PasswordReset, Registration};
use tollgate_license::{
    Clock, LicenseError, LicensePayload, LicenseResult, LicenseStateMachine, MachineIdentity,
    SignatureVerifier, TrustState,
};
use tracing::{error, info, warn};

/// Shortest license key accepted before contacting the authority.
pub const MIN_LICENSE_KEY_LEN: usize = 50;

/// Summary of a newly started session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user: String,
    pub expires_at: u64,
    pub remaining: Duration,
    pub generation: u64,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrollment {
    /// Account created; a license key still has to be activated.
    Registered { message: Option<String> },
    /// The authority granted a license with the account.
    Started(SessionInfo),
}

struct ActiveSession {
    generation: u64,
    user: String,
    machine: MachineIdentity,
    scheduler: TrustScheduler,
    supervisor: Option<JoinHandle<()>>,
}

impl ActiveSession {
    fn shutdown(mut self) {
        self.scheduler.stop();
        if let Some(supervisor) = self.supervisor.take() {
            supervisor.abort();
        }
    }
}

struct Inner {
    authority: Arc<dyn Authority>,
    state: Arc<LicenseStateMachine>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    events: broadcast::Sender<SessionEvent>,
    active: Mutex<Option<ActiveSession>>,
    pending_reset_email: Mutex<Option<String>>,
}

impl Inner {
    fn active(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending_reset(&self) -> MutexGuard<'_, Option<String>> {
        self.pending_reset_email.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn is_current(active: &Option<ActiveSession>, generation: u64) -> bool {
        active.as_ref().is_some_and(|s| s.generation == generation)
    }

    /// Relays a non-terminal scheduler signal if its session is still current.
    fn forward(&self, generation: u64, signal: SchedulerSignal) {
        let active = self.active();
        if !Self::is_current(&active, generation) {
            return;
        }
        let event = match signal {
            SchedulerSignal::Countdown { remaining } => SessionEvent::Countdown { remaining },
            SchedulerSignal::Refreshed { remaining } => SessionEvent::Refreshed { remaining },
            SchedulerSignal::Unreachable { reason, stale } => {
                SessionEvent::AuthorityUnreachable { reason, stale }
            }
            SchedulerSignal::Ended { .. } => return,
        };
        self.emit(event);
    }

    /// Stops the scheduler, announces the end, waits out the notice period
    /// and then logs the session out.
    async fn terminate(&self, generation: u64, reason: EndReason) {
        let grace = match reason {
            EndReason::Rejected(_) => self.config.rejection_grace_delay,
            _ => self.config.grace_delay,
        };

        {
            let mut active = self.active();
            match active.as_mut() {
                Some(session) if session.generation == generation => session.scheduler.stop(),
                _ => return,
            }
            if reason == EndReason::Expired {
                self.state.conclude(generation, Some(TrustState::Expired));
            }
            match &reason {
                EndReason::SignatureInvalid => {
                    error!(generation, "Session ending: license signature invalid");
                }
                EndReason::Blocked => warn!(generation, "Session ending: license blocked"),
                EndReason::Rejected(message) => {
                    warn!(generation, "Session ending: authority rejected license: {message}");
                }
                EndReason::Expired | EndReason::Logout | EndReason::Replaced => {
                    info!(generation, "Session ending: {reason}");
                }
            }
            self.emit(SessionEvent::Terminating {
                reason: reason.clone(),
                grace,
            });
        }

        tokio::time::sleep(grace).await;

        let mut active = self.active();
        if !Self::is_current(&active, generation) {
            return;
        }
        active.take();
        self.state.end_session();
        self.pending_reset().take();
        info!(generation, "Session forcibly logged out");
        self.emit(SessionEvent::LoggedOut { reason });
    }
}

/// The error reported for a license that did not come out active.
fn refusal(state: TrustState, payload: &LicensePayload) -> LicenseError {
    match state {
        TrustState::Expired => {
            info!("License for {} has expired", payload.user);
            LicenseError::Expired {
                expired_at: payload.expires_at,
            }
        }
        TrustState::Blocked => {
            warn!("License for {} is blocked", payload.user);
            LicenseError::Blocked
        }
        TrustState::Invalid | TrustState::Unauthenticated | TrustState::Active { .. } => {
            error!("Rejected license for {}: signature invalid", payload.user);
            LicenseError::SignatureInvalid
        }
    }
}

/// Receives scheduler reports for one session.
async fn supervise(
    inner: Weak<Inner>,
    generation: u64,
    mut reports: mpsc::UnboundedReceiver<SchedulerEvent>,
) {
    while let Some(report) = reports.recv().await {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        if report.generation != generation {
            continue;
        }
        match report.signal {
            SchedulerSignal::Ended { reason } => {
                inner.terminate(generation, reason).await;
                return;
            }
            signal => inner.forward(generation, signal),
        }
    }
}

/// Entry point for the host shell.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Creates a controller with no active session.
    pub fn new(
        authority: Arc<dyn Authority>,
        verifier: Arc<SignatureVerifier>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        if !verifier.is_available() {
            warn!("Starting without a trusted public key; every license will be rejected");
        }
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                authority,
                state: Arc::new(LicenseStateMachine::new(verifier)),
                clock,
                config,
                events,
                active: Mutex::new(None),
                pending_reset_email: Mutex::new(None),
            }),
        }
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Logs in and, if the account holds an active license, starts a session.
    ///
    /// # Errors
    ///
    /// Authority refusals and outages are returned as [`LicenseError::Rejected`]
    /// and [`LicenseError::Network`]; an account without a license yields
    /// [`LicenseError::ActivationRequired`]; license verdicts yield
    /// [`LicenseError::SignatureInvalid`], [`LicenseError::Blocked`] or
    /// [`LicenseError::Expired`].
    pub async fn login(
        &self,
        credentials: &Credentials,
        machine: &MachineIdentity,
        client_ip: &str,
    ) -> LicenseResult<SessionInfo> {
        let (license, _) = self
            .inner
            .authority
            .login(credentials, machine, client_ip)
            .await
            .into_result()?;
        let Some(payload) = license else {
            info!("Login for {} succeeded but no license is attached", credentials.user);
            return Err(LicenseError::ActivationRequired);
        };
        self.establish(&payload, machine)
    }

    /// Registers an account. Starts a session if the authority grants a
    /// license right away.
    ///
    /// # Errors
    ///
    /// Same as [`Self::login`], minus `ActivationRequired`.
    pub async fn register(
        &self,
        registration: &Registration,
        machine: &MachineIdentity,
    ) -> LicenseResult<Enrollment> {
        let (license, message) = self
            .inner
            .authority
            .register(registration, machine)
            .await
            .into_result()?;
        match license {
            Some(payload) => self.establish(&payload, machine).map(Enrollment::Started),
            None => Ok(Enrollment::Registered { message }),
        }
    }

    /// Activates a license key on this machine and starts a session.
    ///
    /// # Errors
    ///
    /// [`LicenseError::InvalidKeyFormat`] for keys rejected locally, otherwise
    /// as for [`Self::login`].
    pub async fn activate_license_key(
        &self,
        key: &str,
        machine: &MachineIdentity,
    ) -> LicenseResult<SessionInfo> {
        let key = key.trim();
        if key.is_empty() {
            return Err(LicenseError::InvalidKeyFormat("license key is empty".to_string()));
        }
        if key.chars().count() < MIN_LICENSE_KEY_LEN {
            return Err(LicenseError::InvalidKeyFormat(format!(
                "license key must be at least {MIN_LICENSE_KEY_LEN} characters"
            )));
        }

        let (payload, _) = self
            .inner
            .authority
            .verify_key(key, machine)
            .await
            .into_result()?;
        self.establish(&payload, machine)
    }

    /// Asks the authority to mail a reset token to `email`.
    ///
    /// # Errors
    ///
    /// [`LicenseError::Rejected`] or [`LicenseError::Network`].
    pub async fn request_password_reset(&self, email: &str) -> LicenseResult<Option<String>> {
        let ((), message) = self
            .inner
            .authority
            .request_password_reset(email)
            .await
            .into_result()?;
        *self.inner.pending_reset() = Some(email.to_string());
        Ok(message)
    }

    /// Completes a password reset.
    ///
    /// # Errors
    ///
    /// [`LicenseError::Rejected`] or [`LicenseError::Network`].
    pub async fn complete_password_reset(&self, reset: &PasswordReset) -> LicenseResult<Option<String>> {
        let ((), message) = self
            .inner
            .authority
            .complete_password_reset(reset)
            .await
            .into_result()?;
        self.inner.pending_reset().take();
        Ok(message)
    }

    /// Email of a reset requested in this process and not yet completed.
    #[must_use]
    pub fn pending_reset_email(&self) -> Option<String> {
        self.inner.pending_reset().clone()
    }

    /// Ends the session, cancels its tasks and clears cached identifiers.
    ///
    /// Safe to call with no session. Once this returns, nothing from the
    /// ended session is applied or published.
    pub fn logout(&self) {
        let mut active = self.inner.active();
        self.inner.state.end_session();
        self.inner.pending_reset().take();
        if let Some(session) = active.take() {
            info!(generation = session.generation, "Logged out {}", session.user);
            session.shutdown();
            self.inner.emit(SessionEvent::LoggedOut {
                reason: EndReason::Logout,
            });
        }
    }

    /// Current trust verdict.
    #[must_use]
    pub fn trust_state(&self) -> TrustState {
        self.inner.state.trust_state(self.inner.clock.now_secs())
    }

    /// User of the active session.
    #[must_use]
    pub fn current_user(&self) -> Option<String> {
        self.inner.active().as_ref().map(|s| s.user.clone())
    }

    /// Machine identity of the active session.
    #[must_use]
    pub fn current_machine(&self) -> Option<MachineIdentity> {
        self.inner.active().as_ref().map(|s| s.machine.clone())
    }

    /// True while a session's scheduler is running.
    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.inner
            .active()
            .as_ref()
            .is_some_and(|s| s.scheduler.is_running())
    }

    /// Signature check offered to the shell before it shows license data.
    #[must_use]
    pub fn verify_signature(&self, token: &[u8], signature_b64: &str) -> bool {
        self.inner.state.verifier().verify_base64(token, signature_b64)
    }

    /// Commits the first license of a session and starts monitoring it.
    fn establish(&self, payload: &LicensePayload, machine: &MachineIdentity) -> LicenseResult<SessionInfo> {
        let now = self.inner.clock.now_secs();
        let mut active = self.inner.active();

        // A running session survives a replacement license that fails.
        if active.is_some() {
            let verdict = self.inner.state.classify(payload, now);
            if !verdict.is_active() {
                warn!("Replacement license not active, keeping the current session");
                return Err(refusal(verdict, payload));
            }
        }
        if let Some(previous) = active.take() {
            info!(generation = previous.generation, "Replacing the session of {}", previous.user);
            previous.shutdown();
            self.inner.emit(SessionEvent::LoggedOut {
                reason: EndReason::Replaced,
            });
        }

        let start = self.inner.state.begin(payload, now);
        let TrustState::Active { remaining } = start.state else {
            return Err(refusal(start.state, payload));
        };

        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let scheduler = TrustScheduler::start(
            SchedulerContext {
                generation: start.generation,
                user: payload.user.clone(),
                machine: machine.clone(),
                state: Arc::clone(&self.inner.state),
                authority: Arc::clone(&self.inner.authority),
                clock: Arc::clone(&self.inner.clock),
                config: self.inner.config.clone(),
            },
            reports_tx,
        );
        let supervisor = tokio::spawn(supervise(
            Arc::downgrade(&self.inner),
            start.generation,
            reports_rx,
        ));

        *active = Some(ActiveSession {
            generation: start.generation,
            user: payload.user.clone(),
            machine: machine.clone(),
            scheduler,
            supervisor: Some(supervisor),
        });
        info!(generation = start.generation, "Session started for {} on {machine}", payload.user);
        self.inner.emit(SessionEvent::Started {
            user: payload.user.clone(),
            remaining,
        });

        Ok(SessionInfo {
            user: payload.user.clone(),
            expires_at: payload.expires_at,
            remaining,
            generation: start.generation,
        })
    }
}
