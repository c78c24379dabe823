//! License data as received from the authority and as held in memory.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A license as delivered by the authority, before any trust decision.
///
/// `token` is the exact byte sequence the authority signed. Nothing else in
/// the payload may be relied on until the signature over `token` verifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensePayload {
    /// License holder.
    pub user: String,
    /// Expiry in seconds since the Unix epoch.
    pub expires_at: u64,
    /// Administrative block flag.
    pub blocked: bool,
    /// Signed message bytes.
    pub token: Vec<u8>,
    /// Detached Ed25519 signature over `token`, if the authority sent one.
    pub signature: Option<Vec<u8>>,
}

/// The license currently held by the state machine.
///
/// Only the state machine can build one, and only from a payload whose
/// signature verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseRecord {
    user: String,
    expires_at: u64,
    blocked: bool,
    token: Vec<u8>,
    signature: Vec<u8>,
    verified: bool,
    last_checked_at: u64,
}

impl LicenseRecord {
    /// Builds a record from a payload whose signature has just verified.
    pub(crate) fn verified(payload: &LicensePayload, signature: Vec<u8>, now: u64) -> Self {
        Self {
            user: payload.user.clone(),
            expires_at: payload.expires_at,
            blocked: payload.blocked,
            token: payload.token.clone(),
            signature,
            verified: true,
            last_checked_at: now,
        }
    }

    /// License holder.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Expiry in seconds since the Unix epoch.
    #[must_use]
    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    /// Administrative block flag.
    #[must_use]
    pub fn blocked(&self) -> bool {
        self.blocked
    }

    /// The signed token, sent back to the authority on revalidation.
    #[must_use]
    pub fn token(&self) -> &[u8] {
        &self.token
    }

    /// The signature that verified `token`.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// True if the signature verified when the record was committed.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// Epoch second of the last successful signature check.
    #[must_use]
    pub fn last_checked_at(&self) -> u64 {
        self.last_checked_at
    }

    /// Time left before expiry at `now`, floored at zero.
    #[must_use]
    pub fn remaining(&self, now: u64) -> Duration {
        Duration::from_secs(self.expires_at.saturating_sub(now))
    }

    /// True once the last check is older than `window`.
    #[must_use]
    pub fn is_stale(&self, now: u64, window: Duration) -> bool {
        now.saturating_sub(self.last_checked_at) > window.as_secs()
    }

    /// Derives the trust verdict for this record at `now`.
    #[must_use]
    pub fn trust_state(&self, now: u64) -> TrustState {
        if !self.verified {
            TrustState::Invalid
        } else if self.blocked {
            TrustState::Blocked
        } else if now >= self.expires_at {
            TrustState::Expired
        } else {
            TrustState::Active {
                remaining: self.remaining(now),
            }
        }
    }
}

/// The authorization verdict, always derived and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustState {
    /// No license is held.
    Unauthenticated,
    /// License verified and in force.
    Active {
        /// Time until expiry.
        remaining: Duration,
    },
    /// License validity ended.
    Expired,
    /// License blocked by an administrator.
    Blocked,
    /// Signature missing or failed: the license was tampered with or forged.
    Invalid,
}

impl TrustState {
    /// Returns true only for [`TrustState::Active`].
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    /// Returns true for verdicts that end a session.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Blocked | Self::Invalid)
    }

    /// Remaining time if active.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Self::Active { remaining } => Some(*remaining),
            _ => None,
        }
    }
}
