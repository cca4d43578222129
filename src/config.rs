//! Run configuration.
//!
//! Parameter sourcing is outside the controller: whatever produces the
//! parameters hands over either a JSON document or a flat name -> value table.
//! Every field has a default, and `validate()` must pass before a `LoadTest`
//! is constructed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LoadTestResult, ValidationError};
use crate::phase::LoadModes;

/// Pre-validated parameters of one load test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadTestConfig {
    /// Run identifier; keys the report files.
    pub run_id: String,
    /// Human description, appended to the run id and used as the report title.
    pub description: Option<String>,
    /// Enabled loading modes (1 tension, 2 compression, 3 both).
    pub modes: LoadModes,
    /// Tension strain rate magnitude.
    pub strain_rate_tension: f64,
    /// Compression strain rate magnitude.
    pub strain_rate_compression: f64,
    /// Failure when `|last / extremum|` drops below this, in both phases.
    pub failure_threshold: f64,
    /// Strain increment between samples; the sampling period is this over `|rate|`.
    pub sample_strain_interval: f64,
    /// Sample anyway after this much wall-clock time without one.
    pub sample_real_limit_ms: u64,
    /// Wall-clock period of the failure monitor.
    pub monitor_period_ms: u64,
    /// Series buffer capacity.
    pub max_samples: usize,
    /// How long the reversal worker waits for the loop to pause.
    pub pause_timeout_ms: u64,
    /// Where reports are written.
    pub output_dir: PathBuf,
    /// Stop (and report) after this many iterations.
    pub max_iterations: Option<u64>,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            run_id: "uniaxial".to_string(),
            description: None,
            modes: LoadModes::BOTH,
            strain_rate_tension: 0.1,
            strain_rate_compression: 1.0,
            failure_threshold: 0.5,
            sample_strain_interval: 3e-5,
            sample_real_limit_ms: 5_000,
            monitor_period_ms: 4_000,
            max_samples: 4_000,
            pause_timeout_ms: 30_000,
            output_dir: PathBuf::from("."),
            max_iterations: None,
        }
    }
}

impl LoadTestConfig {
    /// Validate all fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.run_id.trim().is_empty() {
            return Err(ValidationError::EmptyRunId);
        }
        self.modes.validate()?;
        for (field, value) in [
            ("strain_rate_tension", self.strain_rate_tension),
            ("strain_rate_compression", self.strain_rate_compression),
        ] {
            if !value.is_finite() || value == 0.0 {
                return Err(ValidationError::InvalidStrainRate {
                    field: field.to_string(),
                    value,
                });
            }
        }
        if !(self.failure_threshold > 0.0 && self.failure_threshold < 1.0) {
            return Err(ValidationError::ThresholdOutOfRange {
                value: self.failure_threshold,
            });
        }
        if !(self.sample_strain_interval.is_finite() && self.sample_strain_interval > 0.0) {
            return Err(ValidationError::NotPositive {
                field: "sample_strain_interval".to_string(),
            });
        }
        if self.max_samples == 0 {
            return Err(ValidationError::NotPositive {
                field: "max_samples".to_string(),
            });
        }
        if self.pause_timeout_ms == 0 {
            return Err(ValidationError::NotPositive {
                field: "pause_timeout_ms".to_string(),
            });
        }
        if self.max_iterations == Some(0) {
            return Err(ValidationError::NotPositive {
                field: "max_iterations".to_string(),
            });
        }
        Ok(())
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: &Path) -> LoadTestResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| ValidationError::InvalidConfig {
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        let cfg: Self = serde_json::from_str(&text).map_err(|e| ValidationError::InvalidConfig {
            reason: format!("invalid config {}: {e}", path.display()),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply numeric overrides from a flat parameter table.
    ///
    /// Keys are field names; unknown keys are rejected.
    pub fn with_params(mut self, params: &BTreeMap<String, f64>) -> Result<Self, ValidationError> {
        for (name, &value) in params {
            match name.as_str() {
                "modes" => self.modes = LoadModes::from_mask(as_count(name, value)?)?,
                "strain_rate_tension" => self.strain_rate_tension = value,
                "strain_rate_compression" => self.strain_rate_compression = value,
                "failure_threshold" => self.failure_threshold = value,
                "sample_strain_interval" => self.sample_strain_interval = value,
                "sample_real_limit_ms" => self.sample_real_limit_ms = as_count(name, value)?,
                "monitor_period_ms" => self.monitor_period_ms = as_count(name, value)?,
                "max_samples" => self.max_samples = as_count(name, value)?,
                "pause_timeout_ms" => self.pause_timeout_ms = as_count(name, value)?,
                "max_iterations" => self.max_iterations = Some(as_count(name, value)?),
                _ => {
                    return Err(ValidationError::UnknownParameter { name: name.clone() });
                }
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// Run id with the description appended, if any.
    #[must_use]
    pub fn tagged_run_id(&self) -> String {
        match &self.description {
            Some(desc) if !desc.is_empty() => format!("{}{desc}", self.run_id),
            _ => self.run_id.clone(),
        }
    }

    /// Report title: the description, or a compact parameter summary.
    #[must_use]
    pub fn title(&self) -> String {
        match &self.description {
            Some(desc) if !desc.is_empty() => desc.clone(),
            _ => format!(
                "modes={},strain_rate_tension={},strain_rate_compression={},failure_threshold={}",
                self.modes.mask(),
                self.strain_rate_tension,
                self.strain_rate_compression,
                self.failure_threshold
            ),
        }
    }

    /// Sampler wall-clock limit; `None` when disabled (zero).
    #[must_use]
    pub const fn sample_real_limit(&self) -> Option<Duration> {
        if self.sample_real_limit_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.sample_real_limit_ms))
        }
    }

    /// Monitor period.
    #[must_use]
    pub const fn monitor_period(&self) -> Duration {
        Duration::from_millis(self.monitor_period_ms)
    }

    /// Pause-confirmation bound.
    #[must_use]
    pub const fn pause_timeout(&self) -> Duration {
        Duration::from_millis(self.pause_timeout_ms)
    }
}

fn as_count<T: TryFrom<u64>>(name: &str, value: f64) -> Result<T, ValidationError> {
    let invalid = || ValidationError::InvalidConfig {
        reason: format!("parameter '{name}' must be a non-negative integer, got {value}"),
    };
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(invalid());
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = value as u64;
    T::try_from(whole).map_err(|_| invalid())
}
