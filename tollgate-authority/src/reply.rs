//! Normalized authority outcomes.

use tollgate_license::{LicenseError, LicensePayload, LicenseResult};

/// Outcome of an interactive authority request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    /// The authority accepted the request.
    Accepted {
        /// Operation-specific result.
        value: T,
        /// Optional server message.
        message: Option<String>,
    },
    /// The authority answered and refused; `message` is shown verbatim.
    Rejected { message: String },
    /// The authority could not be reached or answered garbage.
    NetworkFailure { message: String },
}

impl<T> Reply<T> {
    /// Wraps an accepted value.
    pub fn accepted(value: T, message: Option<String>) -> Self {
        Self::Accepted { value, message }
    }

    /// Returns true if the authority accepted the request.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// The server or transport message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Accepted { message, .. } => message.as_deref(),
            Self::Rejected { message } | Self::NetworkFailure { message } => Some(message),
        }
    }

    /// Maps the accepted value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        match self {
            Self::Accepted { value, message } => Reply::Accepted {
                value: f(value),
                message,
            },
            Self::Rejected { message } => Reply::Rejected { message },
            Self::NetworkFailure { message } => Reply::NetworkFailure { message },
        }
    }

    /// Converts into a result, keeping the server message on success.
    ///
    /// # Errors
    ///
    /// Rejections map to [`LicenseError::Rejected`] and transport failures to
    /// [`LicenseError::Network`].
    pub fn into_result(self) -> LicenseResult<(T, Option<String>)> {
        match self {
            Self::Accepted { value, message } => Ok((value, message)),
            Self::Rejected { message } => Err(LicenseError::Rejected(message)),
            Self::NetworkFailure { message } => Err(LicenseError::Network(message)),
        }
    }
}

/// Outcome of a periodic revalidation.
///
/// `Unreachable` is kept apart from `Rejected` so the scheduler can ride out
/// an outage without evicting a valid session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revalidation {
    /// `status: "ok"`; the payload still has to pass the state machine.
    Confirmed(LicensePayload),
    /// The authority answered and did not confirm the license.
    Rejected { message: String },
    /// Transport failure.
    Unreachable { reason: String },
}

impl Revalidation {
    /// Wire-style status: `"ok"`, `"rejected"` or `"error"`.
    #[must_use]
    pub fn status(&self) -> &'static str {
        match self {
            Self::Confirmed(_) => "ok",
            Self::Rejected { .. } => "rejected",
            Self::Unreachable { .. } => "error",
        }
    }
}
