//! # Uniaxial - load-test orchestration for step-driven specimens
//!
//! Drives a simulated specimen through a uniaxial load test: tension until
//! failure, an optional reversal into compression from the pristine initial
//! state, then compression until failure. The physics engine is an opaque
//! collaborator behind [`SteppingEngine`]; this crate only schedules it.
//!
//! ## Core Concepts
//!
//! - **Sampler**: records stress at three cross sections on a simulated-time
//!   cadence derived from the strain rate.
//! - **Monitor**: on a wall-clock cadence, compares the latest stress with the
//!   extremum so far and decides whether the specimen has failed.
//! - **Phase controller**: `Init -> Tension -> Compression -> Terminal`, each
//!   transition at most once.
//! - **Reversal**: performed off the stepping thread while the loop is parked.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use uniaxial::{LoadTest, LoadTestConfig, SpecimenParams, SyntheticSpecimen};
//!
//! let config = LoadTestConfig::default();
//! let engine = SyntheticSpecimen::new(SpecimenParams::default());
//! let outcome = LoadTest::new(engine, &config)?.run()?;
//! println!("ft = {:?}", outcome.summary.extrema.map(|e| e.max_stress));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod config;
pub mod error;
pub mod phase;
pub mod series;

// Engine seam and callbacks
pub mod engine;
pub mod monitor;
pub mod sampler;
pub mod trigger;

// Orchestration and outputs
pub mod display;
pub mod observability;
pub mod report;
pub mod runtime;

pub use config::LoadTestConfig;
pub use display::{displacement_scale, DisplayPeer};
pub use engine::{
    Axis, Scalar, SnapshotStore, SnapshotTag, SpecimenParams, SpecimenState, SteppingEngine,
    SyntheticSpecimen,
};
pub use error::{ExecutionError, LoadTestError, LoadTestResult, ReportError, ValidationError};
pub use monitor::{Decision, Evaluation, FailureMonitor, ProgressRecord, SkipReason};
pub use phase::{ControllerState, LoadMode, LoadModes, PhaseController, PhaseState};
pub use report::{Extrema, GnuplotExporter, ReportArtifact, ReportExporter};
pub use runtime::{
    LoadTest, LoopControl, LoopState, RunHandle, RunOutcome, RunSummary, TerminationReason,
};
pub use sampler::{SectionProbe, Sampler};
pub use series::{Sample, SeriesBuffer};
pub use trigger::PeriodicTrigger;
