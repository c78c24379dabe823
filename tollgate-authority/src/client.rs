//! The authority client.
//!
//! Every operation is a single POST to the configured endpoint. Nothing here
//! retries: interactive flows leave retrying to the user and revalidation
//! retries on the scheduler's next tick.

use crate::config::AuthorityConfig;
use crate::error::{AuthorityError, AuthorityResult};
use crate::reply::{Reply, Revalidation};
use crate::wire::{Request, Response};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use tollgate_license::{LicensePayload, MachineIdentity};
use tracing::{debug, info, warn};

/// User shown for a license activated without a known account name.
pub const DEFAULT_LICENSE_USER: &str = "user";

/// Login credentials.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// New account details.
#[derive(Clone)]
pub struct Registration {
    pub user: String,
    pub password: String,
    pub email: String,
    pub phone: String,
    pub country: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("country", &self.country)
            .finish()
    }
}

/// Second step of a password reset.
#[derive(Clone)]
pub struct PasswordReset {
    pub email: String,
    pub reset_token: String,
    pub new_password: String,
}

impl fmt::Debug for PasswordReset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordReset")
            .field("email", &self.email)
            .field("reset_token", &"<redacted>")
            .field("new_password", &"<redacted>")
            .finish()
    }
}

/// The remote license authority.
///
/// Implementations never return errors: every failure is folded into the
/// reply value.
#[async_trait]
pub trait Authority: Send + Sync {
    /// Authenticates a user. An accepted reply without a license means the
    /// account exists but still needs a license key.
    async fn login(
        &self,
        credentials: &Credentials,
        machine: &MachineIdentity,
        client_ip: &str,
    ) -> Reply<Option<LicensePayload>>;

    /// Creates an account. Some deployments grant a trial license here.
    async fn register(
        &self,
        registration: &Registration,
        machine: &MachineIdentity,
    ) -> Reply<Option<LicensePayload>>;

    /// Activates a license key on this machine.
    async fn verify_key(&self, key: &str, machine: &MachineIdentity) -> Reply<LicensePayload>;

    /// Sends a password reset token to `email`.
    async fn request_password_reset(&self, email: &str) -> Reply<()>;

    /// Sets a new password using a reset token.
    async fn complete_password_reset(&self, reset: &PasswordReset) -> Reply<()>;

    /// Re-confirms the held license.
    async fn revalidate(&self, user: &str, machine: &MachineIdentity, token: &[u8]) -> Revalidation;
}

/// JSON-over-HTTPS authority client.
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    config: AuthorityConfig,
    client: Client,
}

impl HttpAuthority {
    /// Creates a client for `config`.
    ///
    /// # Errors
    ///
    /// Fails if the endpoint is empty or the HTTP client cannot be built.
    pub fn new(config: AuthorityConfig) -> AuthorityResult<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(AuthorityError::Config("authority endpoint is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { config, client })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &AuthorityConfig {
        &self.config
    }

    async fn post(&self, request: &Request<'_>) -> Result<Response, String> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| format!("connection error: {e}"))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(format!("authority returned HTTP {status}"));
        }

        let decoded = response.json::<Response>().await;
        if status.is_success() {
            return decoded.map_err(|e| format!("invalid authority response: {e}"));
        }
        // A client-error status still carries the authority's verdict when
        // the body is an explicit refusal.
        match decoded {
            Ok(body) if body.refused() => Ok(body),
            _ => Err(format!("authority returned HTTP {status}")),
        }
    }

    /// Sends `request` and folds the outcome into a [`Reply`].
    async fn call<T>(
        &self,
        operation: &str,
        request: &Request<'_>,
        rejected_fallback: &str,
        on_accept: impl FnOnce(&Response) -> T,
    ) -> Reply<T> {
        match self.post(request).await {
            Ok(response) if response.accepted() => {
                debug!("{operation} accepted");
                Reply::accepted(on_accept(&response), response.message.clone())
            }
            Ok(response) => {
                let message = response.message_or(rejected_fallback);
                info!("{operation} rejected: {message}");
                Reply::Rejected { message }
            }
            Err(message) => {
                warn!("{operation} failed: {message}");
                Reply::NetworkFailure { message }
            }
        }
    }
}

#[async_trait]
impl Authority for HttpAuthority {
    async fn login(
        &self,
        credentials: &Credentials,
        machine: &MachineIdentity,
        client_ip: &str,
    ) -> Reply<Option<LicensePayload>> {
        info!("Login request for {} on {machine}", credentials.user);
        let request = Request::Login {
            user: &credentials.user,
            pass: &credentials.password,
            mid: machine.as_str(),
            ip: client_ip,
        };
        self.call("login", &request, "login failed", |r| {
            r.has_license().then(|| r.license(&credentials.user))
        })
        .await
    }

    async fn register(
        &self,
        registration: &Registration,
        machine: &MachineIdentity,
    ) -> Reply<Option<LicensePayload>> {
        info!("Register request for {}", registration.user);
        let request = Request::Register {
            user: &registration.user,
            pass: &registration.password,
            email: &registration.email,
            phone: &registration.phone,
            country: &registration.country,
            mid: machine.as_str(),
        };
        self.call("register", &request, "registration failed", |r| {
            r.has_license().then(|| r.license(&registration.user))
        })
        .await
    }

    async fn verify_key(&self, key: &str, machine: &MachineIdentity) -> Reply<LicensePayload> {
        info!("License key verification on {machine}");
        let request = Request::VerifyKey {
            user: None,
            key,
            mid: machine.as_str(),
        };
        self.call(
            "verifyKey",
            &request,
            "license key is invalid or already in use",
            |r| r.license(DEFAULT_LICENSE_USER),
        )
        .await
    }

    async fn request_password_reset(&self, email: &str) -> Reply<()> {
        info!("Password reset requested for {email}");
        let request = Request::ForgotPassword { email };
        self.call("forgotPassword", &request, "password reset request failed", |_| ())
            .await
    }

    async fn complete_password_reset(&self, reset: &PasswordReset) -> Reply<()> {
        info!("Password reset completion for {}", reset.email);
        let request = Request::ResetPassword {
            email: &reset.email,
            reset_token: &reset.reset_token,
            new_password: &reset.new_password,
        };
        self.call("resetPassword", &request, "password reset failed", |_| ())
            .await
    }

    async fn revalidate(&self, user: &str, machine: &MachineIdentity, token: &[u8]) -> Revalidation {
        debug!("Revalidating license for {user}");
        let token = String::from_utf8_lossy(token);
        let request = Request::VerifyKey {
            user: Some(user),
            key: &token,
            mid: machine.as_str(),
        };
        match self.post(&request).await {
            Ok(response) if response.accepted() => Revalidation::Confirmed(response.license(user)),
            Ok(response) => Revalidation::Rejected {
                message: response.message_or("license is no longer valid"),
            },
            Err(reason) => {
                warn!("Revalidation failed: {reason}");
                Revalidation::Unreachable { reason }
            }
        }
    }
}
