//! Failure detection from the recorded stress history.
//!
//! The monitor runs on a wall-clock cadence so detection latency does not
//! depend on how fast the engine steps. A run is considered failed once the
//! latest stress has dropped below `threshold` times the extremum reached so
//! far (`|last / extremum| < threshold`).

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::phase::{LoadMode, PhaseState};
use crate::series::SeriesBuffer;
use crate::trigger::PeriodicTrigger;

/// Why an evaluation did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Fewer than two engine iterations have completed.
    TooEarly,
    /// No stress sample recorded yet.
    NoSamples,
    /// The extremum is zero; the ratio is meaningless.
    ZeroExtremum,
}

/// Observability record emitted on every non-skipped evaluation.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub run_id: String,
    pub mode: LoadMode,
    pub strain: f64,
    pub stress: f64,
    pub extremum: f64,
    pub ratio: f64,
}

/// Outcome of one monitor evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Guarded no-op.
    Skipped(SkipReason),
    /// Specimen still carries load.
    Healthy(ProgressRecord),
    /// Stress dropped below the threshold.
    Failed(ProgressRecord),
}

/// What the stepping loop must do after an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep stepping.
    Continue,
    /// Hand off the tension-to-compression reversal.
    Reverse,
    /// Stop and report.
    Terminate,
}

impl Evaluation {
    /// Map this evaluation to a loop decision.
    #[must_use]
    pub const fn decision(&self, can_reverse: bool) -> Decision {
        match self {
            Self::Skipped(_) | Self::Healthy(_) => Decision::Continue,
            Self::Failed(_) if can_reverse => Decision::Reverse,
            Self::Failed(_) => Decision::Terminate,
        }
    }

    /// Progress record, if the evaluation was not skipped.
    #[must_use]
    pub const fn record(&self) -> Option<&ProgressRecord> {
        match self {
            Self::Skipped(_) => None,
            Self::Healthy(r) | Self::Failed(r) => Some(r),
        }
    }
}

/// `|ratio| < threshold`; equality is not a failure.
#[must_use]
pub fn is_failure(ratio: f64, threshold: f64) -> bool {
    ratio.abs() < threshold
}

/// Wall-clock paced failure detector.
#[derive(Debug, Clone)]
pub struct FailureMonitor {
    run_id: String,
    threshold: f64,
    trigger: PeriodicTrigger,
}

impl FailureMonitor {
    /// Create a monitor evaluating every `period` of wall-clock time.
    #[must_use]
    pub fn new(run_id: impl Into<String>, threshold: f64, period: Duration, now: Instant) -> Self {
        Self {
            run_id: run_id.into(),
            threshold,
            trigger: PeriodicTrigger::real_period(period, now),
        }
    }

    /// Failure threshold.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether an evaluation is due at `now`.
    pub fn due(&mut self, now: Instant) -> bool {
        self.trigger.poll(0.0, now)
    }

    /// Restart the wall-clock cadence.
    pub fn rearm(&mut self, now: Instant) {
        self.trigger.rearm(0.0, now);
    }

    /// Evaluate the failure criterion. Reads only; the caller applies the
    /// outcome.
    #[must_use]
    pub fn evaluate(
        &self,
        iteration: u64,
        strain: f64,
        series: &SeriesBuffer,
        phase: &PhaseState,
    ) -> Evaluation {
        if iteration < 2 {
            return Evaluation::Skipped(SkipReason::TooEarly);
        }
        let (Some(last), Some(buffered)) = (series.last(), series.extremum(phase.direction_sign))
        else {
            return Evaluation::Skipped(SkipReason::NoSamples);
        };
        // The buffer may have dropped the peak; the running value has not.
        let extremum = phase.reference_extremum(buffered);
        if extremum == 0.0 {
            return Evaluation::Skipped(SkipReason::ZeroExtremum);
        }

        let ratio = last.stress / extremum;
        let record = ProgressRecord {
            run_id: self.run_id.clone(),
            mode: phase.mode,
            strain,
            stress: last.stress,
            extremum,
            ratio,
        };
        info!(
            run_id = %record.run_id,
            mode = %record.mode,
            strain = record.strain,
            stress = record.stress,
            ratio = record.ratio,
            "progress"
        );

        if is_failure(ratio, self.threshold) {
            Evaluation::Failed(record)
        } else {
            Evaluation::Healthy(record)
        }
    }
}
