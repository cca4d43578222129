//! Run orchestration: the stepping loop and its handle.
//!
//! Two threads cooperate on one run:
//! - `uniaxial-stepper` steps the engine and runs the sampler and monitor
//!   after every step.
//! - `uniaxial-reversal` performs the tension-to-compression reversal while
//!   the stepper is parked at a checkpoint.
//!
//! The run ends when the stepper returns. Termination is a value handed back
//! to the caller through `RunHandle::join`, never a process exit.

/// Pause/resume handshake.
pub mod control;
mod reversal;
mod rig;

pub use control::{LoopControl, LoopState};

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::LoadTestConfig;
use crate::display::DisplayPeer;
use crate::engine::{SnapshotStore, SteppingEngine};
use crate::error::{ExecutionError, LoadTestError, LoadTestResult, ReportError};
use crate::monitor::Decision;
use crate::phase::{ControllerState, LoadMode, PhaseState};
use crate::report::{Extrema, GnuplotExporter, ReportArtifact, ReportExporter};
use crate::series::SeriesBuffer;

use control::Checkpoint;
use reversal::{ReversalCommand, ReversalQueue, ReversalWorker};
use rig::Rig;

/// Why a run reached `Terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The monitor detected failure with no reversal left.
    Failure,
    /// The configured iteration limit was reached first.
    IterationLimit,
}

/// Result of an orderly termination.
#[derive(Debug)]
pub struct RunSummary {
    /// Unique id of this execution; distinguishes repeated runs of one config.
    pub execution_id: Uuid,
    /// Run id with the description appended.
    pub run_id: String,
    /// Report title.
    pub title: String,
    /// Why the run stopped.
    pub reason: TerminationReason,
    /// Mode active at termination.
    pub final_mode: LoadMode,
    /// Reversals performed (0 or 1).
    pub reversals: u32,
    /// Engine steps taken across all phases.
    pub total_steps: u64,
    /// Strength extrema; `None` when nothing was sampled.
    pub extrema: Option<Extrema>,
    /// Report outcome; `None` when there was nothing to report. A failed write
    /// does not fail the run.
    pub report: Option<Result<ReportArtifact, ReportError>>,
    /// The recorded series at termination.
    pub series: SeriesBuffer,
}

/// Everything handed back after a run: the summary plus ownership of the
/// engine and its snapshots.
pub struct RunOutcome<E: SteppingEngine> {
    /// Run summary.
    pub summary: RunSummary,
    /// The engine in its final state.
    pub engine: E,
    /// Snapshots taken during the run.
    pub snapshots: SnapshotStore<E::State>,
}

/// An assembled, not yet started load test.
pub struct LoadTest<E: SteppingEngine> {
    rig: Rig<E>,
    exporter: Box<dyn ReportExporter>,
    pause_timeout: Duration,
}

impl<E: SteppingEngine + 'static> LoadTest<E> {
    /// Validate `config`, snapshot `engine` as `"initial"`, and enter the first phase.
    ///
    /// Reports go to a [`GnuplotExporter`] on `config.output_dir` unless
    /// replaced with [`LoadTest::with_exporter`].
    pub fn new(engine: E, config: &LoadTestConfig) -> LoadTestResult<Self> {
        let rig = Rig::assemble(engine, config, Instant::now())?;
        Ok(Self {
            rig,
            exporter: Box::new(GnuplotExporter::new(config.output_dir.clone())),
            pause_timeout: config.pause_timeout(),
        })
    }

    /// Replace the report exporter.
    #[must_use]
    pub fn with_exporter(mut self, exporter: impl ReportExporter + 'static) -> Self {
        self.exporter = Box::new(exporter);
        self
    }

    /// Attach a display peer; it immediately receives the current phase's scale.
    #[must_use]
    pub fn with_display(mut self, display: impl DisplayPeer + 'static) -> Self {
        self.rig.attach_display(Box::new(display));
        self
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> &PhaseState {
        self.rig.phase()
    }

    /// Current controller state.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.rig.state()
    }

    /// Spawn the stepping loop and the reversal worker.
    pub fn start(self) -> LoadTestResult<RunHandle<E>> {
        let execution_id = Uuid::new_v4();
        let rig = Arc::new(Mutex::new(self.rig));
        let control = Arc::new(LoopControl::new());
        let (fail_tx, fail_rx) = bounded::<LoadTestError>(1);
        let (done_tx, done_rx) = bounded::<LoadTestResult<RunSummary>>(1);

        let reversal = ReversalWorker::start(
            Arc::clone(&rig),
            Arc::clone(&control),
            self.pause_timeout,
            fail_tx,
        )?;

        let stepper = {
            let rig = Arc::clone(&rig);
            let control = Arc::clone(&control);
            let queue = reversal.queue();
            let exporter = self.exporter;
            thread::Builder::new()
                .name("uniaxial-stepper".to_string())
                .spawn(move || {
                    let span = info_span!("load_test", execution = %execution_id);
                    let _entered = span.enter();
                    let result = step_loop(
                        execution_id,
                        &rig,
                        &control,
                        &queue,
                        exporter.as_ref(),
                        &fail_rx,
                    );
                    let _ = control.stop();
                    drop(queue);
                    let _ = done_tx.send(result);
                })
        };
        let stepper = match stepper {
            Ok(handle) => handle,
            Err(e) => {
                reversal.shutdown();
                return Err(LoadTestError::internal(format!(
                    "failed to spawn stepping loop: {e}"
                )));
            }
        };

        info!(execution = %execution_id, "load test started");
        Ok(RunHandle {
            rig,
            control,
            stepper,
            reversal,
            done: done_rx,
        })
    }

    /// Start and block until termination.
    pub fn run(self) -> LoadTestResult<RunOutcome<E>> {
        self.start()?.join()
    }
}

/// Handle to a running load test.
pub struct RunHandle<E: SteppingEngine> {
    rig: Arc<Mutex<Rig<E>>>,
    control: Arc<LoopControl>,
    stepper: JoinHandle<()>,
    reversal: ReversalWorker,
    done: Receiver<LoadTestResult<RunSummary>>,
}

impl<E: SteppingEngine> RunHandle<E> {
    /// Ask the loop to park after its current step.
    pub fn pause(&self) -> LoadTestResult<bool> {
        self.control.request_pause()
    }

    /// Wait until the loop is parked.
    pub fn wait_paused(&self, timeout: Duration) -> LoadTestResult<()> {
        self.control.wait_paused(timeout)
    }

    /// Let a parked loop continue.
    pub fn resume(&self) -> LoadTestResult<bool> {
        self.control.resume()
    }

    /// Stop the loop at its next checkpoint; `join` then yields `Cancelled`.
    pub fn stop(&self) -> LoadTestResult<()> {
        self.control.stop()
    }

    /// Loop state.
    pub fn state(&self) -> LoadTestResult<LoopState> {
        self.control.state()
    }

    /// Controller state; briefly takes the rig lock.
    pub fn controller_state(&self) -> LoadTestResult<ControllerState> {
        Ok(lock_rig(&self.rig)?.state())
    }

    /// Block until the run terminates.
    pub fn join(self) -> LoadTestResult<RunOutcome<E>> {
        let result = self.done.recv().map_err(|_| {
            LoadTestError::from(ExecutionError::Disconnected {
                path: "stepping_loop".to_string(),
            })
        });
        self.finish(result.and_then(|r| r))
    }

    /// Block until the run terminates, for at most `timeout`.
    ///
    /// On timeout the run is stopped and its threads are left to wind down
    /// on their own.
    pub fn join_timeout(self, timeout: Duration) -> LoadTestResult<RunOutcome<E>> {
        let received = self.done.recv_timeout(timeout);
        match received {
            Ok(result) => self.finish(result),
            Err(RecvTimeoutError::Timeout) => {
                let duration_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(duration_ms, "run did not terminate in time; stopping");
                let _ = self.control.stop();
                Err(ExecutionError::Timeout { duration_ms }.into())
            }
            Err(RecvTimeoutError::Disconnected) => self.finish(Err(ExecutionError::Disconnected {
                path: "stepping_loop".to_string(),
            }
            .into())),
        }
    }

    fn finish(self, result: LoadTestResult<RunSummary>) -> LoadTestResult<RunOutcome<E>> {
        let panicked = self.stepper.join().is_err();
        self.reversal.shutdown();
        if panicked {
            return Err(LoadTestError::internal("stepping loop panicked"));
        }
        let summary = result?;

        let rig = Arc::try_unwrap(self.rig)
            .map_err(|_| LoadTestError::internal("rig still shared after shutdown"))?
            .into_inner()
            .map_err(|_| LoadTestError::internal("rig lock poisoned"))?;
        let (engine, snapshots) = rig.into_parts();
        Ok(RunOutcome {
            summary,
            engine,
            snapshots,
        })
    }
}

pub(crate) fn lock_rig<E: SteppingEngine>(rig: &Mutex<Rig<E>>) -> LoadTestResult<MutexGuard<'_, Rig<E>>> {
    rig.lock()
        .map_err(|_| LoadTestError::internal("rig lock poisoned"))
}

fn step_loop<E: SteppingEngine>(
    execution_id: Uuid,
    rig: &Mutex<Rig<E>>,
    control: &LoopControl,
    reversals: &ReversalQueue,
    exporter: &dyn ReportExporter,
    failures: &Receiver<LoadTestError>,
) -> LoadTestResult<RunSummary> {
    loop {
        if control.checkpoint()? == Checkpoint::Stop {
            debug!("stepping loop stopped at checkpoint");
            return Err(failures
                .try_recv()
                .unwrap_or_else(|_| ExecutionError::Cancelled.into()));
        }

        let mut rig = lock_rig(rig)?;
        rig.step()?;
        match rig.after_step(Instant::now()) {
            Decision::Continue => {}
            Decision::Reverse => {
                control.request_pause()?;
                reversals.submit(ReversalCommand::Reverse)?;
            }
            Decision::Terminate => return rig.terminate(execution_id, exporter),
        }
    }
}
