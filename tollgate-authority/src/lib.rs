//! Remote license authority client for Tollgate.
//!
//! Talks to a single JSON endpoint whose `action` field selects the
//! operation (`login`, `register`, `verifyKey`, `forgotPassword`,
//! `resetPassword`). Periodic revalidation reuses the `verifyKey` shape.
//!
//! Responses are normalized at this boundary into [`Reply`] and
//! [`Revalidation`] so callers branch on an explicit outcome instead of
//! probing response fields.

mod client;
mod config;
mod error;
mod reply;
mod wire;

pub use client::{
    Authority, Credentials, HttpAuthority, PasswordReset, Registration, DEFAULT_LICENSE_USER,
};
pub use config::AuthorityConfig;
pub use error::{AuthorityError, AuthorityResult};
pub use reply::{Reply, Revalidation};
