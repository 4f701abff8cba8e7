//! Relay liveness watchdog
//!
//! Before the first chunk the relay waits on `startup_deadline` as a hard
//! limit. Afterwards the monitor only reports stalls: long silences are a
//! warning, never an abort, because live sources have legitimate quiet gaps.

use std::time::Duration;
use tokio::time::Instant;

use crate::config::RelayConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallStatus {
    /// Data is flowing, or none has arrived yet
    Healthy,
    /// Data stopped arriving; the session continues
    Stalled { silent_for: Duration },
}

#[derive(Debug, Clone)]
pub struct StallMonitor {
    startup_timeout: Duration,
    check_interval: Duration,
    stall_threshold: Duration,
    min_session_age: Duration,
    started: Instant,
    last_data: Option<Instant>,
    warned: bool,
}

impl StallMonitor {
    pub fn new(config: &RelayConfig, started: Instant) -> Self {
        Self {
            startup_timeout: config.startup_timeout,
            check_interval: config.stall_check_interval,
            stall_threshold: config.stall_threshold,
            min_session_age: config.stall_min_session_age,
            started,
            last_data: None,
            warned: false,
        }
    }

    /// When the startup timer fires if no data has arrived
    pub fn startup_deadline(&self) -> Instant {
        self.started + self.startup_timeout
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Record output at `now`.
    ///
    /// Returns the silent gap when this ends a stall that was reported.
    pub fn record_data(&mut self, now: Instant) -> Option<Duration> {
        let recovered = match (self.warned, self.last_data) {
            (true, Some(last)) => Some(now.saturating_duration_since(last)),
            _ => None,
        };
        self.last_data = Some(now);
        self.warned = false;
        recovered
    }

    pub fn check(&mut self, now: Instant) -> StallStatus {
        // Before the first chunk only the startup deadline applies
        let Some(last) = self.last_data else {
            return StallStatus::Healthy;
        };

        let silent_for = now.saturating_duration_since(last);
        let session_age = now.saturating_duration_since(self.started);
        if silent_for > self.stall_threshold && session_age > self.min_session_age {
            self.warned = true;
            StallStatus::Stalled { silent_for }
        } else {
            StallStatus::Healthy
        }
    }
}
