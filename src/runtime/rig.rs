//! Everything the stepping loop mutates, and the protocol steps that mutate it.
//!
//! The rig sits behind one mutex shared by the stepping thread and the
//! reversal worker. The stepping thread holds it for one step plus its
//! callbacks; the worker only takes it once the loop has confirmed it is
//! parked, so the lock is never contended in practice.

use std::time::Instant;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::LoadTestConfig;
use crate::display::{displacement_scale, DisplayPeer};
use crate::engine::{Scalar, SnapshotStore, SnapshotTag, SteppingEngine};
use crate::error::LoadTestResult;
use crate::monitor::{Decision, FailureMonitor};
use crate::phase::{ControllerState, LoadMode, PhaseController, PhaseState};
use crate::report::{Extrema, ReportExporter};
use crate::sampler::Sampler;
use crate::series::SeriesBuffer;

use super::{RunSummary, TerminationReason};

pub(crate) struct Rig<E: SteppingEngine> {
    engine: E,
    snapshots: SnapshotStore<E::State>,
    series: SeriesBuffer,
    controller: PhaseController,
    sampler: Sampler,
    monitor: FailureMonitor,
    display: Option<Box<dyn DisplayPeer>>,
    run_id: String,
    title: String,
    max_iterations: Option<u64>,
    total_steps: u64,
    reversal_pending: bool,
    reversals: u32,
    termination: Option<TerminationReason>,
}

impl<E: SteppingEngine> Rig<E> {
    /// Snapshot the assembled engine and enter the first loading phase.
    pub(crate) fn assemble(mut engine: E, config: &LoadTestConfig, now: Instant) -> LoadTestResult<Self> {
        config.validate()?;

        let mut snapshots = SnapshotStore::new();
        snapshots.save(SnapshotTag::initial(), &engine)?;

        let mut controller = PhaseController::new(
            config.modes,
            config.strain_rate_tension,
            config.strain_rate_compression,
        );
        let phase = controller.begin()?;
        engine.set_strain_rate(phase.strain_rate);

        let run_id = config.tagged_run_id();
        let sampler = Sampler::new(
            &engine,
            config.sample_strain_interval,
            phase.strain_rate,
            config.sample_real_limit(),
            now,
        );
        let monitor = FailureMonitor::new(
            run_id.clone(),
            config.failure_threshold,
            config.monitor_period(),
            now,
        );

        info!(run_id = %run_id, mode = %phase.mode, strain_rate = phase.strain_rate, "load test assembled");

        Ok(Self {
            engine,
            snapshots,
            series: SeriesBuffer::new(config.max_samples),
            controller,
            sampler,
            monitor,
            display: None,
            run_id,
            title: config.title(),
            max_iterations: config.max_iterations,
            total_steps: 0,
            reversal_pending: false,
            reversals: 0,
            termination: None,
        })
    }

    pub(crate) fn attach_display(&mut self, mut display: Box<dyn DisplayPeer>) {
        display.set_displacement_scale(displacement_scale(self.controller.phase().mode));
        self.display = Some(display);
    }

    fn apply_display(&mut self, mode: LoadMode) {
        if let Some(display) = self.display.as_mut() {
            display.set_displacement_scale(displacement_scale(mode));
        }
    }

    pub(crate) fn phase(&self) -> &PhaseState {
        self.controller.phase()
    }

    pub(crate) fn state(&self) -> ControllerState {
        self.controller.state()
    }

    /// Advance the engine one step.
    pub(crate) fn step(&mut self) -> LoadTestResult<()> {
        self.engine.step()?;
        self.total_steps += 1;
        Ok(())
    }

    /// Sampler and monitor callbacks for the step just taken.
    pub(crate) fn after_step(&mut self, now: Instant) -> Decision {
        self.sampler.on_step(&self.engine, &mut self.series, now);

        if self.max_iterations.is_some_and(|max| self.total_steps >= max) {
            warn!(run_id = %self.run_id, steps = self.total_steps, "iteration limit reached");
            self.termination = Some(TerminationReason::IterationLimit);
            return Decision::Terminate;
        }
        if self.reversal_pending || !self.monitor.due(now) {
            return Decision::Continue;
        }

        let evaluation = self.monitor.evaluate(
            self.engine.iteration(),
            self.engine.read_scalar(Scalar::Strain),
            &self.series,
            self.controller.phase(),
        );
        if let Some(record) = evaluation.record() {
            self.controller.phase_mut().track_extremum(record.extremum);
        }

        let decision = evaluation.decision(self.controller.can_reverse());
        match decision {
            Decision::Reverse => {
                info!(run_id = %self.run_id, "damaged, switching to compression");
                self.reversal_pending = true;
            }
            Decision::Terminate => {
                info!(run_id = %self.run_id, "damaged, stopping");
                self.termination = Some(TerminationReason::Failure);
            }
            Decision::Continue => {}
        }
        decision
    }

    /// Restore the initial snapshot and enter compression.
    ///
    /// Only valid while the stepping loop is parked.
    pub(crate) fn reverse(&mut self, now: Instant) -> LoadTestResult<PhaseState> {
        self.snapshots.restore(&SnapshotTag::initial(), &mut self.engine)?;
        self.series.reverse();
        let phase = self.controller.reverse()?;
        self.engine.set_strain_rate(phase.strain_rate);
        self.sampler.rearm(phase.strain_rate, self.engine.time(), now);
        self.monitor.rearm(now);
        self.apply_display(phase.mode);
        self.reversal_pending = false;
        self.reversals += 1;
        Ok(phase)
    }

    /// Compute extrema, write the report, enter `Terminal`.
    pub(crate) fn terminate(
        &mut self,
        execution_id: Uuid,
        exporter: &dyn ReportExporter,
    ) -> LoadTestResult<RunSummary> {
        let final_mode = self.controller.phase().mode;
        let reason = self.termination.unwrap_or(TerminationReason::Failure);
        self.controller.terminate()?;

        let extrema = Extrema::from_series(&self.series);
        let report = extrema.map(|ex| {
            info!(
                run_id = %self.run_id,
                fc = ex.min_stress,
                ft = ex.max_stress,
                ratio = ex.ratio,
                "strengths"
            );
            let written = exporter.export(&self.run_id, &self.title, &self.series, &ex);
            match &written {
                Ok(artifact) => info!(path = %artifact.script_path.display(), "report written"),
                Err(err) => error!(%err, run_id = %self.run_id, "report write failed"),
            }
            written
        });
        if extrema.is_none() {
            warn!(run_id = %self.run_id, "no samples recorded; nothing to report");
        }

        Ok(RunSummary {
            execution_id,
            run_id: self.run_id.clone(),
            title: self.title.clone(),
            reason,
            final_mode,
            reversals: self.reversals,
            total_steps: self.total_steps,
            extrema,
            report,
            series: self.series.clone(),
        })
    }

    pub(crate) fn into_parts(self) -> (E, SnapshotStore<E::State>) {
        (self.engine, self.snapshots)
    }
}
