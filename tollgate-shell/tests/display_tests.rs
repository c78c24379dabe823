use pretty_assertions::assert_eq;
use std::time::Duration;
use tollgate_license::TrustState;
use tollgate_session::{EndReason, SessionEvent};
use tollgate_shell::{describe_event, describe_state, format_remaining};

#[test]
fn remaining_time_formatting() {
    assert_eq!(format_remaining(Duration::ZERO), "0d 00:00:00");
    assert_eq!(format_remaining(Duration::from_secs(59)), "0d 00:00:59");
    assert_eq!(format_remaining(Duration::from_secs(3600)), "0d 01:00:00");
    assert_eq!(format_remaining(Duration::from_secs(86_399)), "0d 23:59:59");
    assert_eq!(
        format_remaining(Duration::from_secs(3 * 86_400 + 4 * 3600 + 5 * 60 + 6)),
        "3d 04:05:06"
    );
    assert_eq!(format_remaining(Duration::from_millis(1999)), "0d 00:00:01");
}

#[test]
fn state_lines() {
    assert_eq!(describe_state(&TrustState::Unauthenticated), "not logged in");
    assert_eq!(
        describe_state(&TrustState::Active {
            remaining: Duration::from_secs(90)
        }),
        "license active, 0d 00:01:30 left"
    );
    assert_eq!(describe_state(&TrustState::Invalid), "license signature invalid");
}

#[test]
fn termination_lines_name_the_reason() {
    let blocked = describe_event(&SessionEvent::Terminating {
        reason: EndReason::Blocked,
        grace: Duration::from_secs(3),
    });
    assert!(blocked.contains("blocked"));
    assert!(blocked.ends_with("Logging out in 3s"));

    let forged = describe_event(&SessionEvent::LoggedOut {
        reason: EndReason::SignatureInvalid,
    });
    assert!(forged.starts_with("Logged out: security alert"));

    assert_eq!(
        describe_event(&SessionEvent::LoggedOut {
            reason: EndReason::Logout
        }),
        "Logged out"
    );
}

#[test]
fn unreachable_lines_distinguish_staleness() {
    let fresh = describe_event(&SessionEvent::AuthorityUnreachable {
        reason: "timeout".to_string(),
        stale: false,
    });
    let stale = describe_event(&SessionEvent::AuthorityUnreachable {
        reason: "timeout".to_string(),
        stale: true,
    });
    assert_ne!(fresh, stale);
    assert!(stale.contains("not confirmed recently"));
}
