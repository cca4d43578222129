//! Stepping-engine seam.
//!
//! The controller treats the physics engine as an opaque oracle: it advances
//! simulated time one step at a time and exposes a handful of read-only
//! quantities. Scheduling (run, pause, resume) lives in `crate::runtime`; the
//! engine itself only knows how to take a single step.

/// Tagged save/restore of engine state.
pub mod snapshot;
/// Deterministic stand-in specimen used by the binary and tests.
pub mod specimen;

pub use snapshot::{SnapshotStore, SnapshotTag};
pub use specimen::{SpecimenParams, SpecimenState, SyntheticSpecimen};

use serde::{Deserialize, Serialize};

use crate::error::LoadTestResult;

/// Cartesian axis.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Component index (0, 1, 2).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// Named live quantity exposed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scalar {
    /// Specimen strain along the loading axis.
    Strain,
    /// Average axial stress.
    AverageStress,
}

/// A step-driven simulation the controller can drive.
///
/// # Contract
/// - `time` and `iteration` are monotonic while stepping; they only move
///   backwards through `restore`.
/// - `section_force` may cost O(bodies); callers cache `section_area`.
/// - `restore` fully replaces live state with a previously captured one.
pub trait SteppingEngine: Send {
    /// Full restorable state.
    type State: Clone + Send;

    /// Advance one step.
    fn step(&mut self) -> LoadTestResult<()>;

    /// Simulated time.
    fn time(&self) -> f64;

    /// Completed iterations.
    fn iteration(&self) -> u64;

    /// Read a named live quantity.
    fn read_scalar(&self, scalar: Scalar) -> f64;

    /// Loading axis of the specimen.
    fn loading_axis(&self) -> Axis;

    /// Specimen extent `(min, max)` along `axis`.
    fn extent(&self, axis: Axis) -> (f64, f64);

    /// Cross-sectional area of the plane at `position` normal to `axis`.
    fn section_area(&self, position: f64, axis: Axis) -> f64;

    /// Axial force resultant transmitted across the plane at `position`.
    fn section_force(&self, position: f64, axis: Axis) -> f64;

    /// Set the signed strain rate imposed on the specimen.
    fn set_strain_rate(&mut self, rate: f64);

    /// Capture the full state.
    fn capture(&self) -> Self::State;

    /// Replace live state with `state`.
    fn restore(&mut self, state: &Self::State);
}
