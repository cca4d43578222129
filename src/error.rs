//! Error types for the load-test controller.
//!
//! All errors are strongly typed using thiserror so callers can match on the
//! specific failure. Expected edge conditions (a monitor invoked too early, a
//! zero extremum) are not errors at all; see `monitor::Evaluation`.

use thiserror::Error;

use crate::phase::ControllerState;

/// Validation errors raised while checking a run configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Strain rate '{field}' must be finite and non-zero, got {value}")]
    InvalidStrainRate {
        field: String,
        value: f64,
    },

    #[error("Failure threshold {value} is out of range (0.0, 1.0)")]
    ThresholdOutOfRange {
        value: f64,
    },

    #[error("Field '{field}' must be > 0")]
    NotPositive {
        field: String,
    },

    #[error("Run identifier cannot be empty")]
    EmptyRunId,

    #[error("No loading mode enabled (mode mask {mask})")]
    NoModeEnabled {
        mask: u8,
    },

    #[error("Unknown parameter '{name}'")]
    UnknownParameter {
        name: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Execution errors raised while a run is in progress.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Stepping loop did not confirm pause within {waited_ms}ms")]
    PauseTimeout {
        waited_ms: u64,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("No snapshot tagged '{tag}'")]
    SnapshotNotFound {
        tag: String,
    },

    #[error("Snapshot '{tag}' already exists and cannot be overwritten")]
    SnapshotExists {
        tag: String,
    },

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: ControllerState,
        to: ControllerState,
    },

    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Run stopped before reaching a terminal state")]
    Cancelled,

    #[error("Stepping engine failure: {message}")]
    Engine {
        message: String,
    },
}

/// Errors raised while writing the report artifact.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Report serialization failed: {message}")]
    Serialization {
        message: String,
    },
}

/// Top-level error type for the controller.
#[derive(Debug, Error)]
pub enum LoadTestError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl LoadTestError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is a report error.
    #[must_use]
    pub const fn is_report(&self) -> bool {
        matches!(self, Self::Report(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if the run was stopped from outside.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::Cancelled))
    }

    /// Returns true if the stepping loop failed to honor a pause in time.
    #[must_use]
    pub const fn is_pause_timeout(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::PauseTimeout { .. }))
    }
}

/// Result type alias for controller operations.
pub type LoadTestResult<T> = Result<T, LoadTestError>;
