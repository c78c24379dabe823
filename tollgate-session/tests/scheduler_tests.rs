//! Trust scheduler tests, driven directly without a controller.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc;
use tollgate_authority::{Authority, Revalidation};
use tollgate_license::{Clock, LicenseStateMachine, ManualClock, TrustState};
use tollgate_session::{
    EndReason, SchedulerContext, SchedulerEvent, SchedulerSignal, SessionConfig, TrustScheduler,
};

struct Harness {
    state: Arc<LicenseStateMachine>,
    scheduler: TrustScheduler,
    reports: mpsc::UnboundedReceiver<SchedulerEvent>,
}

fn start(authority: &Arc<ScriptedAuthority>, clock: Arc<dyn Clock>, ttl_secs: u64) -> Harness {
    let state = Arc::new(LicenseStateMachine::new(trusted_verifier()));
    let session = state.begin(&license(ttl_secs), clock.now_secs());
    assert!(session.state.is_active());

    let authority: Arc<dyn Authority> = authority.clone();
    let (tx, reports) = mpsc::unbounded_channel();
    let scheduler = TrustScheduler::start(
        SchedulerContext {
            generation: session.generation,
            user: "alice".to_string(),
            machine: machine(),
            state: Arc::clone(&state),
            authority,
            clock,
            config: SessionConfig::default(),
        },
        tx,
    );
    Harness {
        state,
        scheduler,
        reports,
    }
}

async fn next_countdown(reports: &mut mpsc::UnboundedReceiver<SchedulerEvent>) -> Duration {
    loop {
        let report = reports.recv().await.unwrap();
        if let SchedulerSignal::Countdown { remaining } = report.signal {
            return remaining;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn countdown_does_not_grow_when_the_clock_steps_back() {
    let authority = ScriptedAuthority::new();
    let clock = Arc::new(ManualClock::new(NOW));
    let mut h = start(&authority, clock.clone(), 100);

    assert_eq!(next_countdown(&mut h.reports).await, Duration::from_secs(100));
    clock.set(NOW + 10);
    assert_eq!(next_countdown(&mut h.reports).await, Duration::from_secs(90));
    clock.set(NOW + 5);
    assert_eq!(next_countdown(&mut h.reports).await, Duration::from_secs(90));
    clock.set(NOW + 20);
    assert_eq!(next_countdown(&mut h.reports).await, Duration::from_secs(80));

    h.scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn countdown_reports_expiry_once() {
    let authority = ScriptedAuthority::new();
    let clock = Arc::new(ManualClock::new(NOW));
    let mut h = start(&authority, clock.clone(), 2);

    next_countdown(&mut h.reports).await;
    clock.advance(5);

    let report = h.reports.recv().await.unwrap();
    assert_eq!(
        report.signal,
        SchedulerSignal::Ended {
            reason: EndReason::Expired
        }
    );
    assert!(h.state.trust_state(clock.now_secs()).is_terminal());
}

#[tokio::test(start_paused = true)]
async fn ended_session_discards_an_in_flight_revalidation() {
    let authority = ScriptedAuthority::new();
    authority.hold_revalidations.store(true, Ordering::SeqCst);
    authority.push_revalidation(Revalidation::Confirmed(license(7200)));
    let mut h = start(&authority, Arc::new(TokioClock::new()), 3600);

    authority.revalidation_started.notified().await;
    // End the session without aborting the tasks: only the generation check
    // stands between the late result and the state.
    let ended_at = h.state.end_session();
    authority.release.notify_one();
    advance_secs(120).await;

    assert_eq!(h.state.generation(), ended_at);
    assert_eq!(h.state.record(), None);
    assert_eq!(h.state.trust_state(NOW), TrustState::Unauthenticated);

    let mut late = Vec::new();
    while let Ok(report) = h.reports.try_recv() {
        late.push(report.signal);
    }
    assert!(
        !late
            .iter()
            .any(|s| matches!(s, SchedulerSignal::Refreshed { .. } | SchedulerSignal::Ended { .. }))
    );
    assert!(!h.scheduler.is_running());
    assert_eq!(authority.revalidate_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_and_silences_reports() {
    let authority = ScriptedAuthority::new();
    let mut h = start(&authority, Arc::new(TokioClock::new()), 3600);

    next_countdown(&mut h.reports).await;
    assert!(h.scheduler.is_running());

    h.scheduler.stop();
    h.scheduler.stop();
    settle().await;
    assert!(!h.scheduler.is_running());

    advance_secs(90).await;
    while let Ok(report) = h.reports.try_recv() {
        assert!(matches!(report.signal, SchedulerSignal::Countdown { .. }));
    }
    assert!(h.reports.recv().await.is_none());
    assert_eq!(authority.revalidate_calls.load(Ordering::SeqCst), 0);
}
