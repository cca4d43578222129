//! Tension-to-compression reversal, off the stepping thread.
//!
//! The stepping loop cannot restore the engine from inside its own step, so
//! it requests a pause and queues a command here. The worker waits (bounded)
//! for the loop to park, performs the reversal, then resumes the loop. Any
//! failure stops the loop and is reported on the failure channel.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{error, info};

use crate::engine::SteppingEngine;
use crate::error::{ExecutionError, LoadTestError, LoadTestResult};
use crate::phase::PhaseState;

use super::control::LoopControl;
use super::rig::Rig;
use super::lock_rig;

/// Work the reversal worker accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReversalCommand {
    Reverse,
}

/// Sending side handed to the stepping loop.
#[derive(Clone)]
pub(crate) struct ReversalQueue {
    tx: Sender<ReversalCommand>,
}

impl ReversalQueue {
    pub(crate) fn submit(&self, command: ReversalCommand) -> LoadTestResult<()> {
        match self.tx.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(LoadTestError::internal("reversal already queued")),
            Err(TrySendError::Disconnected(_)) => Err(ExecutionError::Disconnected {
                path: "reversal".to_string(),
            }
            .into()),
        }
    }
}

pub(crate) struct ReversalWorker {
    tx: Sender<ReversalCommand>,
    handle: JoinHandle<()>,
}

impl ReversalWorker {
    pub(crate) fn start<E>(
        rig: Arc<Mutex<Rig<E>>>,
        control: Arc<LoopControl>,
        pause_timeout: Duration,
        failures: Sender<LoadTestError>,
    ) -> LoadTestResult<Self>
    where
        E: SteppingEngine + 'static,
    {
        let (tx, rx) = bounded::<ReversalCommand>(1);
        let handle = thread::Builder::new()
            .name("uniaxial-reversal".to_string())
            .spawn(move || serve(&rx, &rig, &control, pause_timeout, &failures))
            .map_err(|e| LoadTestError::internal(format!("failed to spawn reversal worker: {e}")))?;
        Ok(Self { tx, handle })
    }

    pub(crate) fn queue(&self) -> ReversalQueue {
        ReversalQueue {
            tx: self.tx.clone(),
        }
    }

    /// Close the queue and join. The worker drains a queued command first.
    pub(crate) fn shutdown(self) {
        drop(self.tx);
        let _ = self.handle.join();
    }
}

fn serve<E: SteppingEngine>(
    rx: &Receiver<ReversalCommand>,
    rig: &Mutex<Rig<E>>,
    control: &LoopControl,
    pause_timeout: Duration,
    failures: &Sender<LoadTestError>,
) {
    for command in rx {
        match command {
            ReversalCommand::Reverse => match reverse(rig, control, pause_timeout) {
                Ok(phase) => {
                    info!(mode = %phase.mode, strain_rate = phase.strain_rate, "reversal complete");
                }
                Err(err) => {
                    error!(%err, "reversal failed; stopping run");
                    let _ = control.stop();
                    let _ = failures.try_send(err);
                }
            },
        }
    }
}

fn reverse<E: SteppingEngine>(
    rig: &Mutex<Rig<E>>,
    control: &LoopControl,
    pause_timeout: Duration,
) -> LoadTestResult<PhaseState> {
    control.wait_paused(pause_timeout)?;
    let phase = lock_rig(rig)?.reverse(Instant::now())?;
    control.resume()?;
    Ok(phase)
}
