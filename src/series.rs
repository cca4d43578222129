//! Bounded time series of load samples.
//!
//! Key invariants:
//! - `len() <= capacity()` at all times; the oldest sample is dropped first.
//! - Samples are immutable once appended.
//! - `reverse()` flips order and negates strain exactly once per call.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Number of cross-sections probed per sample (quartile positions).
pub const SECTION_COUNT: usize = 3;

/// One recorded sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Simulated time at sampling.
    pub time: f64,
    /// Engine iteration at sampling.
    pub iteration: u64,
    /// Specimen strain along the loading axis.
    pub strain: f64,
    /// Average stress.
    pub stress: f64,
    /// Stress at the 25%, 50% and 75% sections.
    pub section_stress: [f64; SECTION_COUNT],
}

/// Ordered, capped sample buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SeriesBuffer {
    /// Create an empty buffer holding at most `capacity` samples (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, discarding the oldest one when full.
    pub fn push(&mut self, sample: Sample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Reverse sample order and negate strain.
    ///
    /// Used at a tension/compression switch so the strain-stress curve
    /// continues through the origin instead of jumping.
    pub fn reverse(&mut self) {
        self.samples.make_contiguous().reverse();
        for sample in &mut self.samples {
            sample.strain = -sample.strain;
        }
    }

    /// Number of samples held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no sample has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples held.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Sample> + DoubleEndedIterator {
        self.samples.iter()
    }

    /// Most recent sample.
    #[must_use]
    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Largest recorded average stress.
    #[must_use]
    pub fn max_stress(&self) -> Option<f64> {
        self.samples.iter().map(|s| s.stress).reduce(f64::max)
    }

    /// Smallest recorded average stress.
    #[must_use]
    pub fn min_stress(&self) -> Option<f64> {
        self.samples.iter().map(|s| s.stress).reduce(f64::min)
    }

    /// Max stress for a positive direction, min stress otherwise.
    #[must_use]
    pub fn extremum(&self, direction_sign: f64) -> Option<f64> {
        if direction_sign > 0.0 {
            self.max_stress()
        } else {
            self.min_stress()
        }
    }

    /// Copy out the samples in insertion order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }
}

impl<'a> IntoIterator for &'a SeriesBuffer {
    type Item = &'a Sample;
    type IntoIter = std::collections::vec_deque::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
