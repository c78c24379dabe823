//! Machine identity supplied by the host.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity reported when the host cannot determine one.
pub const UNKNOWN_MACHINE_ID: &str = "unknown-machine-id";

/// Opaque per-installation identifier.
///
/// Only used as a correlation key for the authority. It is untrusted input
/// and not a secret, but it is still shortened in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineIdentity(String);

impl MachineIdentity {
    /// Wraps a host-supplied identifier. Blank input maps to [`UNKNOWN_MACHINE_ID`].
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            Self(UNKNOWN_MACHINE_ID.to_string())
        } else {
            Self(trimmed.to_string())
        }
    }

    /// The raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for MachineIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}...", self.short())
    }
}
