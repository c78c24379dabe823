//! Events published to the host shell.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tollgate_license::TrustState;

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The user logged out.
    Logout,
    /// A new login took over.
    Replaced,
    /// The license ran out.
    Expired,
    /// An administrator blocked the license.
    Blocked,
    /// A license signature failed to verify.
    SignatureInvalid,
    /// The authority refused to revalidate the license.
    Rejected(String),
}

impl EndReason {
    /// Maps a terminal verdict to its end reason.
    #[must_use]
    pub fn for_verdict(state: TrustState) -> Option<Self> {
        match state {
            TrustState::Expired => Some(Self::Expired),
            TrustState::Blocked => Some(Self::Blocked),
            TrustState::Invalid => Some(Self::SignatureInvalid),
            TrustState::Active { .. } | TrustState::Unauthenticated => None,
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logout => write!(f, "logged out"),
            Self::Replaced => write!(f, "replaced by a new login"),
            Self::Expired => write!(f, "license expired, renewal required"),
            Self::Blocked => write!(f, "license blocked by an administrator, contact support"),
            Self::SignatureInvalid => write!(f, "security alert: forged or tampered license detected"),
            Self::Rejected(message) => write!(f, "license no longer accepted: {message}"),
        }
    }
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A session became active.
    Started { user: String, remaining: Duration },
    /// Countdown tick.
    Countdown { remaining: Duration },
    /// Revalidation succeeded and the license was replaced.
    Refreshed { remaining: Duration },
    /// Revalidation could not reach the authority; the session continues.
    AuthorityUnreachable { reason: String, stale: bool },
    /// The session will be forcibly ended after `grace`.
    Terminating { reason: EndReason, grace: Duration },
    /// The session is over.
    LoggedOut { reason: EndReason },
}
