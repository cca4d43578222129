//! Loading phases and the controller state machine.
//!
//! Transitions: `Init -> Tension -> {Compression -> Terminal} | Terminal`.
//! Compression is reachable from `Init` (tension disabled) or once from
//! `Tension`; `Terminal` is reachable from either loading phase. There is no
//! way back to `Tension`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ExecutionError, LoadTestResult, ValidationError};

/// Loading direction of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Specimen is pulled apart (positive strain rate).
    Tension,
    /// Specimen is pushed together (negative strain rate).
    Compression,
}

impl LoadMode {
    /// Sign applied to the configured strain rate magnitude.
    #[must_use]
    pub const fn direction_sign(self) -> f64 {
        match self {
            Self::Tension => 1.0,
            Self::Compression => -1.0,
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tension => f.write_str("tension"),
            Self::Compression => f.write_str("compression"),
        }
    }
}

/// Enabled loading modes as a bitmask: 1 = tension, 2 = compression, 3 = both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadModes(u8);

impl LoadModes {
    /// Tension bit.
    pub const TENSION: u8 = 1;
    /// Compression bit.
    pub const COMPRESSION: u8 = 2;

    /// Tension followed by compression.
    pub const BOTH: Self = Self(Self::TENSION | Self::COMPRESSION);
    /// Tension only; failure terminates the run.
    pub const TENSION_ONLY: Self = Self(Self::TENSION);
    /// Compression only.
    pub const COMPRESSION_ONLY: Self = Self(Self::COMPRESSION);

    /// Build from a raw mask, rejecting masks with no known bit set or unknown bits.
    pub fn from_mask(mask: u8) -> Result<Self, ValidationError> {
        let modes = Self(mask);
        modes.validate()?;
        Ok(modes)
    }

    /// Raw mask value.
    #[must_use]
    pub const fn mask(self) -> u8 {
        self.0
    }

    /// Whether a tension phase runs.
    #[must_use]
    pub const fn tension(self) -> bool {
        self.0 & Self::TENSION != 0
    }

    /// Whether a compression phase runs.
    #[must_use]
    pub const fn compression(self) -> bool {
        self.0 & Self::COMPRESSION != 0
    }

    /// Validate the mask.
    pub fn validate(self) -> Result<(), ValidationError> {
        if self.0 & !(Self::TENSION | Self::COMPRESSION) != 0 || !(self.tension() || self.compression()) {
            return Err(ValidationError::NoModeEnabled { mask: self.0 });
        }
        Ok(())
    }

    /// Mode the run starts in.
    #[must_use]
    pub const fn initial_mode(self) -> LoadMode {
        if self.tension() {
            LoadMode::Tension
        } else {
            LoadMode::Compression
        }
    }
}

impl Default for LoadModes {
    fn default() -> Self {
        Self::BOTH
    }
}

/// Controller lifecycle state.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Init,
    Tension,
    Compression,
    Terminal,
}

impl From<LoadMode> for ControllerState {
    fn from(mode: LoadMode) -> Self {
        match mode {
            LoadMode::Tension => Self::Tension,
            LoadMode::Compression => Self::Compression,
        }
    }
}

/// The live loading phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseState {
    /// Current loading mode.
    pub mode: LoadMode,
    /// Signed strain rate handed to the stepping engine.
    pub strain_rate: f64,
    /// +1 in tension, -1 in compression.
    pub direction_sign: f64,
    /// Max stress in tension, min stress in compression; `None` until a
    /// nonzero extremum has been observed in this phase.
    pub running_extremum: Option<f64>,
}

impl PhaseState {
    fn new(mode: LoadMode, rate_magnitude: f64) -> Self {
        let sign = mode.direction_sign();
        Self {
            mode,
            strain_rate: sign * rate_magnitude.abs(),
            direction_sign: sign,
            running_extremum: None,
        }
    }

    /// Fold a freshly computed extremum into the running one.
    ///
    /// Zero is ignored; the running value only moves outward (up in tension,
    /// down in compression).
    pub fn track_extremum(&mut self, extremum: f64) {
        if extremum == 0.0 {
            return;
        }
        self.running_extremum = Some(match self.running_extremum {
            None => extremum,
            Some(prev) if self.direction_sign > 0.0 => prev.max(extremum),
            Some(prev) => prev.min(extremum),
        });
    }

    /// `buffered` folded into the running extremum, without recording it.
    #[must_use]
    pub fn reference_extremum(&self, buffered: f64) -> f64 {
        let mut probe = *self;
        probe.track_extremum(buffered);
        probe.running_extremum.unwrap_or(buffered)
    }
}

/// Owns the controller state and the live `PhaseState`.
#[derive(Debug, Clone)]
pub struct PhaseController {
    state: ControllerState,
    phase: PhaseState,
    modes: LoadModes,
    rate_compression: f64,
}

impl PhaseController {
    /// Create a controller in `Init`.
    #[must_use]
    pub fn new(modes: LoadModes, rate_tension: f64, rate_compression: f64) -> Self {
        let mode = modes.initial_mode();
        let rate = match mode {
            LoadMode::Tension => rate_tension,
            LoadMode::Compression => rate_compression,
        };
        Self {
            state: ControllerState::Init,
            phase: PhaseState::new(mode, rate),
            modes,
            rate_compression,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ControllerState {
        self.state
    }

    /// Live phase.
    #[must_use]
    pub const fn phase(&self) -> &PhaseState {
        &self.phase
    }

    /// Mutable access for extremum tracking.
    pub fn phase_mut(&mut self) -> &mut PhaseState {
        &mut self.phase
    }

    /// Enabled modes.
    #[must_use]
    pub const fn modes(&self) -> LoadModes {
        self.modes
    }

    /// True when a failure now should reverse rather than terminate.
    #[must_use]
    pub fn can_reverse(&self) -> bool {
        self.state == ControllerState::Tension && self.modes.compression()
    }

    /// Leave `Init` and enter the first loading phase.
    pub fn begin(&mut self) -> LoadTestResult<PhaseState> {
        let to = ControllerState::from(self.phase.mode);
        if self.state != ControllerState::Init {
            return Err(ExecutionError::InvalidTransition { from: self.state, to }.into());
        }
        self.state = to;
        Ok(self.phase)
    }

    /// `Tension -> Compression`. Valid at most once per run.
    pub fn reverse(&mut self) -> LoadTestResult<PhaseState> {
        if !self.can_reverse() {
            return Err(ExecutionError::InvalidTransition {
                from: self.state,
                to: ControllerState::Compression,
            }
            .into());
        }
        self.state = ControllerState::Compression;
        self.phase = PhaseState::new(LoadMode::Compression, self.rate_compression);
        Ok(self.phase)
    }

    /// Enter `Terminal` from either loading phase.
    pub fn terminate(&mut self) -> LoadTestResult<()> {
        match self.state {
            ControllerState::Tension | ControllerState::Compression => {
                self.state = ControllerState::Terminal;
                Ok(())
            }
            from => Err(ExecutionError::InvalidTransition {
                from,
                to: ControllerState::Terminal,
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_mask_semantics() {
        assert!(LoadModes::BOTH.tension() && LoadModes::BOTH.compression());
        assert!(LoadModes::TENSION_ONLY.tension() && !LoadModes::TENSION_ONLY.compression());
        assert_eq!(LoadModes::COMPRESSION_ONLY.initial_mode(), LoadMode::Compression);
        assert!(LoadModes::from_mask(0).is_err());
        assert!(LoadModes::from_mask(4).is_err());
        assert_eq!(LoadModes::from_mask(3).unwrap(), LoadModes::BOTH);
    }

    #[test]
    fn begin_applies_signed_rate() {
        let mut ctl = PhaseController::new(LoadModes::BOTH, 0.1, 1.0);
        let phase = ctl.begin().unwrap();
        assert_eq!(phase.mode, LoadMode::Tension);
        assert!((phase.strain_rate - 0.1).abs() < f64::EPSILON);
        assert_eq!(ctl.state(), ControllerState::Tension);

        let mut ctl = PhaseController::new(LoadModes::COMPRESSION_ONLY, 0.1, 1.0);
        let phase = ctl.begin().unwrap();
        assert_eq!(phase.mode, LoadMode::Compression);
        assert!((phase.strain_rate + 1.0).abs() < f64::EPSILON);
        assert!(phase.direction_sign < 0.0);
    }

    #[test]
    fn reverse_happens_at_most_once() {
        let mut ctl = PhaseController::new(LoadModes::BOTH, 0.1, 1.0);
        ctl.begin().unwrap();
        ctl.phase_mut().track_extremum(3.0);

        let phase = ctl.reverse().unwrap();
        assert_eq!(phase.mode, LoadMode::Compression);
        assert_eq!(phase.running_extremum, None);
        assert_eq!(ctl.state(), ControllerState::Compression);

        let err = ctl.reverse().unwrap_err();
        assert!(err.is_execution());
        assert_eq!(ctl.phase().mode, LoadMode::Compression);
        assert!(!ctl.can_reverse());
    }

    #[test]
    fn reverse_requires_compression_enabled() {
        let mut ctl = PhaseController::new(LoadModes::TENSION_ONLY, 0.1, 1.0);
        ctl.begin().unwrap();
        assert!(!ctl.can_reverse());
        assert!(ctl.reverse().is_err());
        ctl.terminate().unwrap();
        assert_eq!(ctl.state(), ControllerState::Terminal);
    }

    #[test]
    fn terminal_is_final() {
        let mut ctl = PhaseController::new(LoadModes::BOTH, 0.1, 1.0);
        assert!(ctl.terminate().is_err());
        ctl.begin().unwrap();
        ctl.terminate().unwrap();
        assert!(ctl.terminate().is_err());
        assert!(ctl.reverse().is_err());
        assert!(ctl.begin().is_err());
    }

    #[test]
    fn extremum_tracks_outward_and_ignores_zero() {
        let mut phase = PhaseState::new(LoadMode::Tension, 0.1);
        phase.track_extremum(0.0);
        assert_eq!(phase.running_extremum, None);
        phase.track_extremum(2.0);
        phase.track_extremum(1.0);
        assert_eq!(phase.running_extremum, Some(2.0));

        let mut phase = PhaseState::new(LoadMode::Compression, 1.0);
        phase.track_extremum(-1.0);
        phase.track_extremum(-0.5);
        assert_eq!(phase.running_extremum, Some(-1.0));
    }
}
