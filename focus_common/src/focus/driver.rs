//! Collaborator traits and error types for the focus sequencer.
//!
//! This module defines:
//! - `Imager` trait - Camera exposure and imaging-parameter interface
//! - `ExposureAbort` trait - Thread-safe abort forwarding into the imager
//! - `FocusActuator` trait - Instrument or telescope focus mechanism
//! - `Prompter` trait - Interactive parameter entry
//! - `AbortSignal` trait - Non-blocking abort poll
//! - `FocusError` / `ExposureError` enums - Error types for sweep operations

use crate::config::ConfigError;
use crate::focus::types::{FocusMode, ImageKind, ImageParam, ParamValue};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error types for focus sweep operations.
#[derive(Debug, Clone, Error)]
pub enum FocusError {
    /// A tunable or collaborator reply was out of range or unparsable
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Exposure could not be integrated
    #[error("Exposure error: {0}")]
    Exposure(#[from] ExposureError),

    /// Actuator or camera communication failure
    #[error("Hardware fault: {0}")]
    Hardware(String),

    /// Interactive prompt failed
    #[error("Prompt failed: {0}")]
    Prompt(String),

    /// Backend not registered
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State persistence error
    #[error("State persistence error: {0}")]
    Persistence(String),
}

/// Failure of the integration step of an exposure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExposureError {
    /// Integration was aborted on request
    #[error("exposure aborted")]
    Aborted,

    /// Integration failed in the camera
    #[error("integration failed: {0}")]
    Failed(String),
}

/// Abort entry point into an imager, callable from any thread.
pub trait ExposureAbort: Send + Sync {
    /// Ask the imager to abort the exposure in progress.
    ///
    /// Must not block. A running `Imager::integrate` is expected to return
    /// `ExposureError::Aborted` soon after.
    fn abort_exposure(&self);
}

/// Camera exposure and imaging-parameter interface.
///
/// One focus sweep maps onto a single exposure: `begin` opens it, each
/// `integrate` accumulates one sub-exposure, `shift_rows` moves the charge
/// between sub-exposures, and `readout` + `end` finalize the image.
pub trait Imager: Send {
    /// Request an exposure time in seconds. The imager may clamp it.
    fn set_exposure_time(&mut self, seconds: f64) -> Result<(), FocusError>;

    /// Effective exposure time in seconds after any clamping.
    fn exposure_time(&self) -> Result<f64, FocusError>;

    /// Open an exposure of the given kind and title label.
    fn begin(&mut self, exposure_time: f64, kind: ImageKind, label: &str)
    -> Result<(), FocusError>;

    /// Integrate one sub-exposure at the current exposure time.
    fn integrate(&mut self) -> Result<(), ExposureError>;

    /// Shift detector charge by `rows` rows.
    fn shift_rows(&mut self, rows: u32) -> Result<(), FocusError>;

    /// Read out the detector.
    fn readout(&mut self) -> Result<(), FocusError>;

    /// Finish the exposure and close the image.
    fn end(&mut self) -> Result<(), FocusError>;

    /// Handle for aborting an integration from another thread.
    fn abort_handle(&self) -> Arc<dyn ExposureAbort>;

    /// Read an imaging parameter.
    fn parameter(&self, param: ImageParam) -> Result<ParamValue, FocusError>;

    /// Write an imaging parameter.
    fn set_parameter(&mut self, param: ImageParam, value: ParamValue) -> Result<(), FocusError>;
}

/// Focus mechanism of an instrument or telescope.
pub trait FocusActuator: Send {
    /// Returns the actuator's identifier (e.g., "simulation-instrument").
    fn name(&self) -> &str;

    /// Current focus position of `channel`.
    fn get_focus(&mut self, channel: u32) -> Result<f64, FocusError>;

    /// Command a focus move on `channel`.
    ///
    /// In `FocusMode::Absolute` `value` is the target position; in
    /// `FocusMode::RelativeStep` it is a signed increment.
    fn set_focus(&mut self, value: f64, channel: u32, mode: FocusMode) -> Result<(), FocusError>;

    /// Block until the mechanism has stopped after a move.
    ///
    /// Default: sleep for `delay`. Actuators with position feedback may
    /// poll their status instead.
    fn wait_settled(&mut self, delay: Duration) {
        std::thread::sleep(delay);
    }

    /// Release the mechanism (persist state, close connections).
    /// Default: no-op
    fn shutdown(&mut self) -> Result<(), FocusError> {
        Ok(())
    }
}

/// Interactive parameter entry.
pub trait Prompter {
    /// Ask for `label`, offering `default`. Returns the raw reply; an empty
    /// reply means the default.
    fn prompt(&mut self, label: &str, default: &str) -> Result<String, FocusError>;
}

/// Non-blocking poll for a quit or abort request.
pub trait AbortSignal: Send + Sync {
    /// Whether an abort was requested.
    fn abort_requested(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedActuator {
        position: f64,
    }

    impl FocusActuator for FixedActuator {
        fn name(&self) -> &str {
            "fixed"
        }

        fn get_focus(&mut self, _channel: u32) -> Result<f64, FocusError> {
            Ok(self.position)
        }

        fn set_focus(&mut self, value: f64, _channel: u32, mode: FocusMode) -> Result<(), FocusError> {
            match mode {
                FocusMode::Absolute => self.position = value,
                FocusMode::RelativeStep => self.position += value,
            }
            Ok(())
        }
    }

    #[test]
    fn test_focus_error_display() {
        let err = FocusError::Hardware("focuser timeout".to_string());
        assert!(err.to_string().contains("focuser timeout"));

        let err = FocusError::DriverNotFound("simulation".to_string());
        assert!(err.to_string().contains("simulation"));
    }

    #[test]
    fn test_exposure_error_converts() {
        let err: FocusError = ExposureError::Aborted.into();
        assert!(matches!(err, FocusError::Exposure(ExposureError::Aborted)));
        assert!(err.to_string().contains("aborted"));
    }

    #[test]
    fn test_actuator_default_hooks() {
        let mut act = FixedActuator { position: 10.0 };
        act.set_focus(5.0, 0, FocusMode::RelativeStep).unwrap();
        act.wait_settled(Duration::ZERO);
        assert_eq!(act.get_focus(0).unwrap(), 15.0);
        assert!(act.shutdown().is_ok());
        assert_eq!(act.name(), "fixed");
    }
}
