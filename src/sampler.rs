//! Periodic sampling of specimen state into the series buffer.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::engine::{Axis, Scalar, SteppingEngine};
use crate::series::{Sample, SeriesBuffer, SECTION_COUNT};
use crate::trigger::PeriodicTrigger;

/// Relative positions of the probed sections along the loading axis.
pub const SECTION_FRACTIONS: [f64; SECTION_COUNT] = [0.25, 0.5, 0.75];

/// A cross-section with its area computed once up front.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionProbe {
    /// Coordinate along the loading axis.
    pub position: f64,
    /// Cached cross-sectional area.
    pub area: f64,
}

impl SectionProbe {
    fn stress<E: SteppingEngine>(&self, engine: &E, axis: Axis) -> f64 {
        if self.area > 0.0 {
            engine.section_force(self.position, axis) / self.area
        } else {
            0.0
        }
    }
}

/// Simulated-time interval between samples: `K / |strain_rate|`.
#[must_use]
pub fn sample_interval(strain_interval: f64, strain_rate: f64) -> f64 {
    strain_interval / strain_rate.abs()
}

/// Appends one `Sample` per simulated-time interval.
#[derive(Debug, Clone)]
pub struct Sampler {
    axis: Axis,
    probes: [SectionProbe; SECTION_COUNT],
    strain_interval: f64,
    trigger: PeriodicTrigger,
}

impl Sampler {
    /// Locate the quartile sections of `engine` and cache their areas.
    ///
    /// Must be called once the specimen is fully assembled.
    pub fn new<E: SteppingEngine>(
        engine: &E,
        strain_interval: f64,
        strain_rate: f64,
        real_limit: Option<Duration>,
        now: Instant,
    ) -> Self {
        let axis = engine.loading_axis();
        let (lo, hi) = engine.extent(axis);
        let probes = SECTION_FRACTIONS.map(|frac| {
            let position = lo + frac * (hi - lo);
            let area = engine.section_area(position, axis);
            if area <= 0.0 {
                warn!(position, area, "section has no area; its stress will read as zero");
            }
            SectionProbe { position, area }
        });

        let mut trigger =
            PeriodicTrigger::virtual_period(sample_interval(strain_interval, strain_rate), now);
        if let Some(limit) = real_limit {
            trigger = trigger.with_real_limit(limit);
        }
        trigger.rearm(engine.time(), now);

        Self {
            axis,
            probes,
            strain_interval,
            trigger,
        }
    }

    /// The cached section probes.
    #[must_use]
    pub const fn probes(&self) -> &[SectionProbe; SECTION_COUNT] {
        &self.probes
    }

    /// Current simulated-time interval.
    #[must_use]
    pub fn interval(&self) -> Option<f64> {
        self.trigger.virtual_period_value()
    }

    /// Read one sample from `engine`.
    #[must_use]
    pub fn read<E: SteppingEngine>(&self, engine: &E) -> Sample {
        Sample {
            time: engine.time(),
            iteration: engine.iteration(),
            strain: engine.read_scalar(Scalar::Strain),
            stress: engine.read_scalar(Scalar::AverageStress),
            section_stress: self.probes.map(|p| p.stress(engine, self.axis)),
        }
    }

    /// Append a sample to `series` if the interval has elapsed.
    pub fn on_step<E: SteppingEngine>(
        &mut self,
        engine: &E,
        series: &mut SeriesBuffer,
        now: Instant,
    ) -> bool {
        if !self.trigger.poll(engine.time(), now) {
            return false;
        }
        series.push(self.read(engine));
        true
    }

    /// Restart the cadence for a new phase whose rate is `strain_rate`.
    pub fn rearm(&mut self, strain_rate: f64, virt: f64, now: Instant) {
        self.trigger
            .set_virtual_period(sample_interval(self.strain_interval, strain_rate));
        self.trigger.rearm(virt, now);
    }
}
