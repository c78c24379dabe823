//! Session timing configuration.

use std::time::Duration;

/// Timers driving an active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Countdown tick.
    pub countdown_period: Duration,
    /// Interval between revalidation requests.
    pub revalidation_period: Duration,
    /// Notice period between a terminal verdict and the forced logout.
    pub grace_delay: Duration,
    /// Notice period after the authority refuses a revalidation.
    pub rejection_grace_delay: Duration,
    /// Capacity of the session event broadcast channel.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            countdown_period: Duration::from_secs(1),
            revalidation_period: Duration::from_secs(30),
            grace_delay: Duration::from_secs(3),
            rejection_grace_delay: Duration::from_secs(5),
            event_capacity: 64,
        }
    }
}

impl SessionConfig {
    /// Age after which a record that could not be revalidated counts as stale:
    /// one revalidation period plus one more as grace.
    #[must_use]
    pub fn stale_after(&self) -> Duration {
        self.revalidation_period * 2
    }
}
