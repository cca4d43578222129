//! Run/pause/resume handshake between the stepping loop and its controllers.
//!
//! The loop only looks at the control state between iterations
//! (`checkpoint`), so a pause request issued mid-step is honored after the
//! step and its callbacks complete. Anyone needing the loop idle waits on the
//! condition variable for `Paused` with a bound, never by spinning.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use crate::error::{ExecutionError, LoadTestError, LoadTestResult};

/// Loop lifecycle as seen by the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Stepping.
    Running,
    /// Pause requested; the loop will park at its next checkpoint.
    PauseRequested,
    /// Loop parked at a checkpoint; it holds no shared state.
    Paused,
    /// Loop finished or was told to stop.
    Stopped,
}

/// What the loop does after a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Checkpoint {
    Proceed,
    Stop,
}

/// Shared handshake state.
#[derive(Debug)]
pub struct LoopControl {
    state: Mutex<LoopState>,
    changed: Condvar,
}

impl Default for LoopControl {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopControl {
    /// New control in `Running`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LoopState::Running),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> LoadTestResult<MutexGuard<'_, LoopState>> {
        self.state
            .lock()
            .map_err(|_| LoadTestError::internal("loop control lock poisoned"))
    }

    fn set(&self, next: LoopState, only_from: &[LoopState]) -> LoadTestResult<bool> {
        let mut state = self.lock()?;
        if !only_from.contains(&*state) {
            return Ok(false);
        }
        debug!(from = ?*state, to = ?next, "loop control");
        *state = next;
        self.changed.notify_all();
        Ok(true)
    }

    /// Current state.
    pub fn state(&self) -> LoadTestResult<LoopState> {
        Ok(*self.lock()?)
    }

    /// Ask the loop to pause after its current step. Idempotent; returns
    /// whether this call changed the state.
    pub fn request_pause(&self) -> LoadTestResult<bool> {
        self.set(LoopState::PauseRequested, &[LoopState::Running])
    }

    /// Let a paused (or pausing) loop continue.
    pub fn resume(&self) -> LoadTestResult<bool> {
        self.set(
            LoopState::Running,
            &[LoopState::Paused, LoopState::PauseRequested],
        )
    }

    /// Stop the loop at its next checkpoint. Final.
    pub fn stop(&self) -> LoadTestResult<()> {
        self.set(
            LoopState::Stopped,
            &[LoopState::Running, LoopState::PauseRequested, LoopState::Paused],
        )?;
        Ok(())
    }

    /// Block until the loop reports `Paused`, for at most `timeout`.
    ///
    /// # Errors
    /// - `PauseTimeout` if the loop did not park in time.
    /// - `Disconnected` if the loop stopped instead.
    pub fn wait_paused(&self, timeout: Duration) -> LoadTestResult<()> {
        let guard = self.lock()?;
        let (state, result) = self
            .changed
            .wait_timeout_while(guard, timeout, |s| {
                matches!(*s, LoopState::Running | LoopState::PauseRequested)
            })
            .map_err(|_| LoadTestError::internal("loop control lock poisoned"))?;

        match *state {
            LoopState::Paused => Ok(()),
            LoopState::Stopped => Err(ExecutionError::Disconnected {
                path: "stepping_loop".to_string(),
            }
            .into()),
            LoopState::Running | LoopState::PauseRequested => {
                debug_assert!(result.timed_out());
                Err(ExecutionError::PauseTimeout {
                    waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }
                .into())
            }
        }
    }

    /// Called by the loop between iterations: parks while paused.
    pub(crate) fn checkpoint(&self) -> LoadTestResult<Checkpoint> {
        let mut state = self.lock()?;
        if *state == LoopState::PauseRequested {
            *state = LoopState::Paused;
            debug!("loop paused");
            self.changed.notify_all();
        }
        let state = self
            .changed
            .wait_while(state, |s| *s == LoopState::Paused)
            .map_err(|_| LoadTestError::internal("loop control lock poisoned"))?;
        Ok(match *state {
            LoopState::Stopped => Checkpoint::Stop,
            LoopState::Running | LoopState::PauseRequested | LoopState::Paused => {
                Checkpoint::Proceed
            }
        })
    }
}
