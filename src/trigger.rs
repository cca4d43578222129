//! Periodic triggers for callbacks run inside the stepping loop.
//!
//! A trigger fires when any of its configured periods has elapsed since it
//! last fired:
//! - a simulated-time period (sampling cadence follows loading progress),
//! - a wall-clock period (monitor cadence independent of stepping speed),
//! - a wall-clock limit (fire anyway if the loop is stepping slowly).
//!
//! Callers pass `now` explicitly so tests can drive the clock.

use std::time::{Duration, Instant};

/// Simulated-time and/or wall-clock periodic trigger.
#[derive(Debug, Clone)]
pub struct PeriodicTrigger {
    virt_period: Option<f64>,
    real_period: Option<Duration>,
    real_limit: Option<Duration>,
    last_virt: f64,
    last_real: Instant,
    fired: u64,
}

impl PeriodicTrigger {
    /// Fire every `period` units of simulated time.
    #[must_use]
    pub fn virtual_period(period: f64, now: Instant) -> Self {
        Self {
            virt_period: Some(period),
            real_period: None,
            real_limit: None,
            last_virt: 0.0,
            last_real: now,
            fired: 0,
        }
    }

    /// Fire every `period` of wall-clock time.
    #[must_use]
    pub fn real_period(period: Duration, now: Instant) -> Self {
        Self {
            virt_period: None,
            real_period: Some(period),
            real_limit: None,
            last_virt: 0.0,
            last_real: now,
            fired: 0,
        }
    }

    /// Also fire once `limit` of wall-clock time passed without firing.
    #[must_use]
    pub const fn with_real_limit(mut self, limit: Duration) -> Self {
        self.real_limit = Some(limit);
        self
    }

    /// Replace the simulated-time period.
    pub fn set_virtual_period(&mut self, period: f64) {
        self.virt_period = Some(period);
    }

    /// Simulated-time period, if any.
    #[must_use]
    pub const fn virtual_period_value(&self) -> Option<f64> {
        self.virt_period
    }

    /// Restart counting from `virt`/`now`. Needed after simulated time jumps
    /// backwards on a snapshot restore.
    pub fn rearm(&mut self, virt: f64, now: Instant) {
        self.last_virt = virt;
        self.last_real = now;
    }

    /// Number of times this trigger fired.
    #[must_use]
    pub const fn fired(&self) -> u64 {
        self.fired
    }

    /// Check the trigger; records the firing when due.
    pub fn poll(&mut self, virt: f64, now: Instant) -> bool {
        let real_elapsed = now.saturating_duration_since(self.last_real);

        let virt_due = self
            .virt_period
            .is_some_and(|p| virt - self.last_virt >= p);
        let real_due = self.real_period.is_some_and(|p| real_elapsed >= p);
        let limit_due = self.real_limit.is_some_and(|l| real_elapsed >= l);

        if virt_due || real_due || limit_due {
            self.last_virt = virt;
            self.last_real = now;
            self.fired += 1;
            true
        } else {
            false
        }
    }
}
