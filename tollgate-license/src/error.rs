//! Error types for the license trust engine.

use thiserror::Error;

/// License and session failures surfaced to callers.
///
/// Every terminal verdict has its own variant and message so a tampered
/// license is never reported the same way as an expired one.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The authority could not be reached (timeout, DNS, TLS, bad gateway).
    #[error("network error: {0}")]
    Network(String),

    /// The authority answered and refused the request.
    #[error("{0}")]
    Rejected(String),

    /// Signature over the license token is missing or does not verify.
    #[error("security error: license signature is missing or invalid")]
    SignatureInvalid,

    /// License validity ended at the given epoch second.
    #[error("license expired at {expired_at}, renewal required")]
    Expired {
        /// Expiry as seconds since the Unix epoch.
        expired_at: u64,
    },

    /// License was blocked by an administrator.
    #[error("license has been blocked, contact support")]
    Blocked,

    /// Credentials are valid but the account has no license yet.
    #[error("account has no active license, activation required")]
    ActivationRequired,

    /// License key rejected locally before contacting the authority.
    #[error("invalid license key format: {0}")]
    InvalidKeyFormat(String),

    /// The trusted public key could not be loaded.
    #[error("public key unavailable: {0}")]
    KeyMaterial(String),
}

impl LicenseError {
    /// Returns true for failures that imply tampering rather than lifecycle.
    #[must_use]
    pub fn is_security_failure(&self) -> bool {
        matches!(self, Self::SignatureInvalid)
    }

    /// Returns true if retrying the same request later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
