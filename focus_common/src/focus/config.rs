//! Focus sequencer configuration types.
//!
//! `FocusConfig` is the root of `focus.toml`:
//! - `[shared]` - Log level and service name
//! - `[sequence]` - The four sweep tunables
//! - `[focus]` - Actuator selection, addressing mode and settle delay
//! - `[simulation]` - Parameters of the simulation backend

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    DEFAULT_DETECTOR_SHIFT, DEFAULT_EXPOSURE_COUNT, DEFAULT_EXPOSURE_TIME, DEFAULT_FOCUS_STEP,
    DEFAULT_SETTLE_DELAY_MS,
};
use crate::focus::types::{FocusMode, FocusTarget, SequenceConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn default_exposure_time() -> f64 {
    DEFAULT_EXPOSURE_TIME
}

fn default_exposure_count() -> u32 {
    DEFAULT_EXPOSURE_COUNT
}

fn default_focus_step() -> f64 {
    DEFAULT_FOCUS_STEP
}

fn default_detector_shift() -> u32 {
    DEFAULT_DETECTOR_SHIFT
}

fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

fn default_max_exposure_time() -> f64 {
    3600.0
}

fn default_time_scale() -> f64 {
    1.0
}

fn default_focus_min() -> f64 {
    -10_000.0
}

fn default_focus_max() -> f64 {
    10_000.0
}

/// Root configuration loaded from `focus.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FocusConfig {
    /// Logging and instance naming.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Sweep tunables.
    #[serde(default)]
    pub sequence: SequenceSection,

    /// Actuator selection and addressing.
    #[serde(default)]
    pub focus: FocusSection,

    /// Simulation backend parameters.
    #[serde(default)]
    pub simulation: SimulationSection,
}

/// `[sequence]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SequenceSection {
    /// Exposure time per sub-exposure, seconds.
    #[serde(default = "default_exposure_time")]
    pub exposure_time: f64,
    /// Number of exposures in the sweep.
    #[serde(default = "default_exposure_count")]
    pub exposure_count: u32,
    /// Focus change between exposures.
    #[serde(default = "default_focus_step")]
    pub focus_step: f64,
    /// Detector rows shifted between exposures.
    #[serde(default = "default_detector_shift")]
    pub detector_shift: u32,
    /// Treat the values above as explicitly set (never prompt).
    #[serde(default)]
    pub locked: bool,
}

impl Default for SequenceSection {
    fn default() -> Self {
        Self {
            exposure_time: DEFAULT_EXPOSURE_TIME,
            exposure_count: DEFAULT_EXPOSURE_COUNT,
            focus_step: DEFAULT_FOCUS_STEP,
            detector_shift: DEFAULT_DETECTOR_SHIFT,
            locked: false,
        }
    }
}

/// `[focus]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FocusSection {
    /// Actuator receiving focus commands.
    #[serde(default)]
    pub target: FocusTarget,
    /// Addressing mode.
    #[serde(default)]
    pub mode: FocusMode,
    /// Actuator channel id.
    #[serde(default)]
    pub channel: u32,
    /// Fixed wait after each focus command, milliseconds.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for FocusSection {
    fn default() -> Self {
        Self {
            target: FocusTarget::default(),
            mode: FocusMode::default(),
            channel: 0,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
        }
    }
}

/// `[simulation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSection {
    /// Requested exposure times below this are clamped up to it.
    #[serde(default)]
    pub min_exposure_time: f64,
    /// Requested exposure times above this are clamped down to it.
    #[serde(default = "default_max_exposure_time")]
    pub max_exposure_time: f64,
    /// Factor applied to exposure time when simulating integration (0 = instant).
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
    /// Instrument focus position at startup when no state file exists.
    #[serde(default)]
    pub instrument_start: f64,
    /// Telescope focus position at startup when no state file exists.
    #[serde(default)]
    pub telescope_start: f64,
    /// Lower travel limit of both simulated focusers.
    #[serde(default = "default_focus_min")]
    pub focus_min: f64,
    /// Upper travel limit of both simulated focusers.
    #[serde(default = "default_focus_max")]
    pub focus_max: f64,
    /// Path of the focuser state file (persisted positions).
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            min_exposure_time: 0.0,
            max_exposure_time: default_max_exposure_time(),
            time_scale: default_time_scale(),
            instrument_start: 0.0,
            telescope_start: 0.0,
            focus_min: default_focus_min(),
            focus_max: default_focus_max(),
            state_file: None,
        }
    }
}

impl FocusConfig {
    /// Validate the focus configuration.
    ///
    /// # Validation Rules
    /// 1. `shared.service_name` not empty
    /// 2. `sequence.exposure_time` finite and >= 0
    /// 3. `sequence.exposure_count` >= 1
    /// 4. `sequence.focus_step` finite
    /// 5. `simulation.focus_min` < `simulation.focus_max`
    /// 6. `simulation.time_scale` finite and >= 0
    /// 7. `simulation.min_exposure_time` <= `simulation.max_exposure_time`
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let seq = &self.sequence;
        if !seq.exposure_time.is_finite() || seq.exposure_time < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "exposure_time must be a non-negative number, got {}",
                seq.exposure_time
            )));
        }
        if seq.exposure_count == 0 {
            return Err(ConfigError::Invalid(
                "exposure_count must be at least 1".to_string(),
            ));
        }
        if !seq.focus_step.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "focus_step must be finite, got {}",
                seq.focus_step
            )));
        }

        let sim = &self.simulation;
        if !(sim.focus_min < sim.focus_max) {
            return Err(ConfigError::Invalid(format!(
                "focus_min ({}) must be below focus_max ({})",
                sim.focus_min, sim.focus_max
            )));
        }
        if !sim.time_scale.is_finite() || sim.time_scale < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "time_scale must be a non-negative number, got {}",
                sim.time_scale
            )));
        }
        if sim.min_exposure_time > sim.max_exposure_time {
            return Err(ConfigError::Invalid(format!(
                "min_exposure_time ({}) exceeds max_exposure_time ({})",
                sim.min_exposure_time, sim.max_exposure_time
            )));
        }

        Ok(())
    }

    /// Build the sequencer's starting configuration.
    pub fn sequence_config(&self) -> SequenceConfig {
        SequenceConfig {
            exposure_time: self.sequence.exposure_time,
            exposure_count: self.sequence.exposure_count,
            focus_step: self.sequence.focus_step,
            detector_shift: self.sequence.detector_shift,
            focus_target: self.focus.target,
            focus_mode: self.focus.mode,
            focus_channel: self.focus.channel,
            params_locked: self.sequence.locked,
            settle_delay: Duration::from_millis(self.focus.settle_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;

    #[test]
    fn test_empty_file_uses_defaults() {
        let cfg = FocusConfig::from_toml_str("").unwrap();
        assert!(cfg.validate().is_ok());

        let seq = cfg.sequence_config();
        assert_eq!(seq, SequenceConfig::default());
    }

    #[test]
    fn test_sections_map_to_sequence_config() {
        let cfg = FocusConfig::from_toml_str(
            r#"
[sequence]
exposure_time = 2.5
exposure_count = 5
focus_step = -12.0
detector_shift = 4
locked = true

[focus]
target = "telescope"
mode = "step"
channel = 2
settle_delay_ms = 250
"#,
        )
        .unwrap();
        cfg.validate().unwrap();

        let seq = cfg.sequence_config();
        assert_eq!(seq.exposure_time, 2.5);
        assert_eq!(seq.exposure_count, 5);
        assert_eq!(seq.focus_step, -12.0);
        assert_eq!(seq.detector_shift, 4);
        assert!(seq.params_locked);
        assert_eq!(seq.focus_target, FocusTarget::Telescope);
        assert_eq!(seq.focus_mode, FocusMode::RelativeStep);
        assert_eq!(seq.focus_channel, 2);
        assert_eq!(seq.settle_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = FocusConfig::from_toml_str("[focus]\nspeed = 3\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_rejects_zero_count() {
        let mut cfg = FocusConfig::default();
        cfg.sequence.exposure_count = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_validation_rejects_negative_exposure() {
        let mut cfg = FocusConfig::default();
        cfg.sequence.exposure_time = -1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_inverted_limits() {
        let mut cfg = FocusConfig::default();
        cfg.simulation.focus_min = 50.0;
        cfg.simulation.focus_max = 10.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_nan_step() {
        let mut cfg = FocusConfig::default();
        cfg.sequence.focus_step = f64::NAN;
        assert!(cfg.validate().is_err());
    }
}
