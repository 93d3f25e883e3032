//! Focus sweep data types.
//!
//! This module defines the value types exchanged with collaborators:
//! - `FocusTarget` / `FocusMode` - Which actuator moves and how it is addressed
//! - `ImageParam` / `ParamValue` - Imaging parameters saved and restored around a sweep
//! - `ExposureFlag` / `ImageKind` - Exposure state and image type
//! - `SequenceConfig` - Mutable sweep configuration owned by the sequencer

use crate::consts::{
    DEFAULT_DETECTOR_SHIFT, DEFAULT_EXPOSURE_COUNT, DEFAULT_EXPOSURE_TIME, DEFAULT_FOCUS_STEP,
    DEFAULT_SETTLE_DELAY_MS,
};
use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Mechanism that receives focus commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FocusTarget {
    /// Focus stage inside the instrument.
    #[default]
    Instrument,
    /// Telescope secondary focus.
    Telescope,
}

impl fmt::Display for FocusTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FocusTarget::Instrument => write!(f, "instrument"),
            FocusTarget::Telescope => write!(f, "telescope"),
        }
    }
}

impl FromStr for FocusTarget {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instrument" => Ok(FocusTarget::Instrument),
            "telescope" => Ok(FocusTarget::Telescope),
            other => Err(ConfigError::Invalid(format!(
                "unknown focus target '{other}' (expected instrument or telescope)"
            ))),
        }
    }
}

/// Addressing mode of focus commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FocusMode {
    /// Commands are absolute positions.
    #[default]
    #[serde(rename = "absolute")]
    Absolute,
    /// Commands are signed increments from the current position.
    #[serde(rename = "step")]
    RelativeStep,
}

impl fmt::Display for FocusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FocusMode::Absolute => write!(f, "absolute"),
            FocusMode::RelativeStep => write!(f, "step"),
        }
    }
}

impl FromStr for FocusMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absolute" => Ok(FocusMode::Absolute),
            "step" => Ok(FocusMode::RelativeStep),
            other => Err(ConfigError::Invalid(format!(
                "unknown focus mode '{other}' (expected absolute or step)"
            ))),
        }
    }
}

/// Image type recorded in the image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// Sky or lab object exposure.
    Object,
    /// Zero-second bias frame.
    Zero,
    /// Dark frame.
    Dark,
    /// Flat field.
    Flat,
}

impl ImageKind {
    /// Lowercase name used by the camera framework.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::Object => "object",
            ImageKind::Zero => "zero",
            ImageKind::Dark => "dark",
            ImageKind::Flat => "flat",
        }
    }
}

/// Exposure state reported by the imager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExposureFlag {
    /// No exposure in flight.
    #[default]
    None,
    /// Exposure opened, not yet integrating.
    Setup,
    /// Integrating.
    Exposing,
    /// Reading out the detector.
    Readout,
    /// Writing the image.
    Writing,
    /// Exposure was aborted.
    Aborted,
    /// Exposure failed.
    Error,
}

/// Imaging parameters the sequencer reads or overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageParam {
    /// Root of the image file name.
    ImageRoot,
    /// Append a sequence number to the file name.
    IncludeSequenceNumber,
    /// Build file names automatically (timestamps).
    AutoName,
    /// Increment the sequence number after every image.
    AutoIncrementSequenceNumber,
    /// Image title header.
    Title,
    /// Mark the image as a test image (not saved).
    TestImage,
    /// Overwrite existing files.
    Overwrite,
    /// Image type header.
    ImageType,
    /// Exposure state flag.
    ExposureFlag,
}

impl ImageParam {
    /// Parameter name used by the camera framework.
    pub fn name(&self) -> &'static str {
        match self {
            ImageParam::ImageRoot => "imageroot",
            ImageParam::IncludeSequenceNumber => "imageincludesequencenumber",
            ImageParam::AutoName => "imageautoname",
            ImageParam::AutoIncrementSequenceNumber => "imageautoincrementsequencenumber",
            ImageParam::Title => "imagetitle",
            ImageParam::TestImage => "imagetest",
            ImageParam::Overwrite => "imageoverwrite",
            ImageParam::ImageType => "imagetype",
            ImageParam::ExposureFlag => "exposureflag",
        }
    }
}

impl fmt::Display for ImageParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of an imaging parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Boolean switch.
    Flag(bool),
    /// Free text (root, title, image type).
    Text(String),
    /// Exposure state.
    Exposure(ExposureFlag),
}

impl ParamValue {
    /// Text payload, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Flag payload, if this is a flag value.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ParamValue::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Flag(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<ExposureFlag> for ParamValue {
    fn from(value: ExposureFlag) -> Self {
        ParamValue::Exposure(value)
    }
}

/// Mutable sweep configuration owned by the sequencer.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceConfig {
    /// Exposure time per sub-exposure, seconds.
    pub exposure_time: f64,
    /// Number of exposures in the sweep.
    pub exposure_count: u32,
    /// Focus change between exposures.
    pub focus_step: f64,
    /// Detector rows shifted between exposures.
    pub detector_shift: u32,
    /// Actuator receiving focus commands.
    pub focus_target: FocusTarget,
    /// Addressing mode of focus commands.
    pub focus_mode: FocusMode,
    /// Actuator channel id.
    pub focus_channel: u32,
    /// Set once the four tunables were explicitly configured; suppresses prompting.
    pub params_locked: bool,
    /// Fixed wait after every focus command.
    pub settle_delay: Duration,
}

impl SequenceConfig {
    /// Put the four tunables back to their defaults and unlock them.
    pub fn reset_tunables(&mut self) {
        self.exposure_time = DEFAULT_EXPOSURE_TIME;
        self.exposure_count = DEFAULT_EXPOSURE_COUNT;
        self.focus_step = DEFAULT_FOCUS_STEP;
        self.detector_shift = DEFAULT_DETECTOR_SHIFT;
        self.params_locked = false;
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            exposure_time: DEFAULT_EXPOSURE_TIME,
            exposure_count: DEFAULT_EXPOSURE_COUNT,
            focus_step: DEFAULT_FOCUS_STEP,
            detector_shift: DEFAULT_DETECTOR_SHIFT,
            focus_target: FocusTarget::default(),
            focus_mode: FocusMode::default(),
            focus_channel: 0,
            params_locked: false,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
        }
    }
}
