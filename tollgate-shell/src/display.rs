//! Terminal rendering of session state.

use std::time::Duration;
use tollgate_license::TrustState;
use tollgate_session::{EndReason, SessionEvent};

/// Formats a countdown as `{d}d HH:MM:SS`.
#[must_use]
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{days}d {hours:02}:{minutes:02}:{seconds:02}")
}

/// One status line for a trust verdict.
#[must_use]
pub fn describe_state(state: &TrustState) -> String {
    match state {
        TrustState::Unauthenticated => "not logged in".to_string(),
        TrustState::Active { remaining } => {
            format!("license active, {} left", format_remaining(*remaining))
        }
        TrustState::Expired => "license expired".to_string(),
        TrustState::Blocked => "license blocked".to_string(),
        TrustState::Invalid => "license signature invalid".to_string(),
    }
}

/// One line per session event.
#[must_use]
pub fn describe_event(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Started { user, remaining } => {
            format!("Logged in as {user}. License valid for {}", format_remaining(*remaining))
        }
        SessionEvent::Countdown { remaining } => {
            format!("Time left: {}", format_remaining(*remaining))
        }
        SessionEvent::Refreshed { remaining } => {
            format!("License revalidated. Time left: {}", format_remaining(*remaining))
        }
        SessionEvent::AuthorityUnreachable { stale: false, .. } => {
            "License server unreachable, will retry".to_string()
        }
        SessionEvent::AuthorityUnreachable { stale: true, .. } => {
            "License server unreachable for too long, license not confirmed recently".to_string()
        }
        SessionEvent::Terminating { reason, grace } => {
            format!("{reason}. Logging out in {}s", grace.as_secs())
        }
        SessionEvent::LoggedOut { reason: EndReason::Logout } => "Logged out".to_string(),
        SessionEvent::LoggedOut { reason } => format!("Logged out: {reason}"),
    }
}
