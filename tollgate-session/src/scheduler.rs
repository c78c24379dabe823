//! The trust scheduler: countdown and revalidation tasks.
//!
//! Both tasks are spawned together, report to a single channel, and are
//! aborted together. Every write and every report is tagged with the session
//! generation, so anything that slips past an abort is discarded by the
//! state machine or the session supervisor.

use crate::config::SessionConfig;
use crate::event::EndReason;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tollgate_authority::{Authority, Revalidation};
use tollgate_license::{Clock, LicenseStateMachine, MachineIdentity, TrustState};
use tracing::{debug, info, warn};

/// What a scheduler task observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerSignal {
    /// Time left on the committed license.
    Countdown { remaining: Duration },
    /// A revalidation replaced the license.
    Refreshed { remaining: Duration },
    /// A revalidation could not reach the authority.
    Unreachable { reason: String, stale: bool },
    /// The session must end.
    Ended { reason: EndReason },
}

/// A signal tagged with the session generation that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerEvent {
    pub generation: u64,
    pub signal: SchedulerSignal,
}

/// Everything the scheduler tasks need.
pub struct SchedulerContext {
    /// Session generation the tasks act for.
    pub generation: u64,
    /// License holder, sent on revalidation.
    pub user: String,
    /// Machine identity, sent on revalidation.
    pub machine: MachineIdentity,
    pub state: Arc<LicenseStateMachine>,
    pub authority: Arc<dyn Authority>,
    pub clock: Arc<dyn Clock>,
    pub config: SessionConfig,
}

/// Owner of the two periodic tasks of one session.
#[derive(Debug)]
pub struct TrustScheduler {
    generation: u64,
    tasks: Vec<JoinHandle<()>>,
}

impl TrustScheduler {
    /// Spawns the countdown and revalidation tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(context: SchedulerContext, events: mpsc::UnboundedSender<SchedulerEvent>) -> Self {
        let generation = context.generation;
        let context = Arc::new(context);
        let countdown = tokio::spawn(run_countdown(Arc::clone(&context), events.clone()));
        let revalidation = tokio::spawn(run_revalidation(context, events));
        debug!(generation, "Trust scheduler started");
        Self {
            generation,
            tasks: vec![countdown, revalidation],
        }
    }

    /// Aborts both tasks. Idempotent.
    pub fn stop(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        debug!(generation = self.generation, "Trust scheduler stopped");
    }

    /// True while any task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Generation the tasks were started for.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for TrustScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn send(
    events: &mpsc::UnboundedSender<SchedulerEvent>,
    generation: u64,
    signal: SchedulerSignal,
) -> bool {
    events.send(SchedulerEvent { generation, signal }).is_ok()
}

/// Derives the remaining time every tick. Reads the record, never writes it.
async fn run_countdown(ctx: Arc<SchedulerContext>, events: mpsc::UnboundedSender<SchedulerEvent>) {
    let mut ticker = interval(ctx.config.countdown_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // Lowest remaining seen for a given record revision; a clock stepping
    // backwards must not extend the countdown.
    let mut floor: Option<(u64, Duration)> = None;

    loop {
        ticker.tick().await;
        let Some(snapshot) = ctx.state.snapshot(ctx.generation) else {
            return;
        };

        let computed = snapshot.record.remaining(ctx.clock.now_secs());
        let remaining = match floor {
            Some((revision, lowest)) if revision == snapshot.revision => computed.min(lowest),
            _ => computed,
        };
        floor = Some((snapshot.revision, remaining));

        if remaining.is_zero() {
            info!(generation = ctx.generation, "License countdown reached zero");
            send(&events, ctx.generation, SchedulerSignal::Ended { reason: EndReason::Expired });
            return;
        }
        if !send(&events, ctx.generation, SchedulerSignal::Countdown { remaining }) {
            return;
        }
    }
}

/// Re-confirms the license with the authority every revalidation period.
async fn run_revalidation(
    ctx: Arc<SchedulerContext>,
    events: mpsc::UnboundedSender<SchedulerEvent>,
) {
    let period = ctx.config.revalidation_period;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(snapshot) = ctx.state.snapshot(ctx.generation) else {
            return;
        };

        let outcome = ctx
            .authority
            .revalidate(&ctx.user, &ctx.machine, snapshot.record.token())
            .await;
        let now = ctx.clock.now_secs();

        let signal = match outcome {
            Revalidation::Unreachable { reason } => {
                if ctx.state.generation() != ctx.generation {
                    return;
                }
                let stale = snapshot.record.is_stale(now, ctx.config.stale_after());
                warn!(generation = ctx.generation, stale, "License authority unreachable: {reason}");
                SchedulerSignal::Unreachable { reason, stale }
            }
            Revalidation::Rejected { message } => {
                if !ctx.state.conclude(ctx.generation, None) {
                    return;
                }
                warn!(generation = ctx.generation, "License authority refused revalidation: {message}");
                SchedulerSignal::Ended {
                    reason: EndReason::Rejected(message),
                }
            }
            Revalidation::Confirmed(payload) => match ctx.state.apply(ctx.generation, &payload, now) {
                None => return,
                Some(TrustState::Active { remaining }) => {
                    debug!(generation = ctx.generation, "License revalidated");
                    SchedulerSignal::Refreshed { remaining }
                }
                Some(verdict) => match EndReason::for_verdict(verdict) {
                    Some(reason) => SchedulerSignal::Ended { reason },
                    None => return,
                },
            },
        };

        let ended = matches!(signal, SchedulerSignal::Ended { .. });
        if !send(&events, ctx.generation, signal) || ended {
            return;
        }
    }
}
