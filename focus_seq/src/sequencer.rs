//! Focus sweep sequencer.
//!
//! The `FocusSequencer` takes one multi-segment image while stepping the
//! focus mechanism between sub-exposures:
//!
//! ```text
//! begin ─► integrate ─► move focus ─► shift rows ─► integrate ─► ... ─► readout/end
//!                                      (2x before the last)
//! ```
//!
//! Whatever happens during the sweep, the focus mechanism is driven back
//! to its starting position and the imaging parameters the sweep overrides
//! are written back before `run` returns.

use focus_common::cancel::CancellationToken;
use focus_common::consts::{FOCUS_EXPOSURE_LABEL, MIN_FOCUS_EXPOSURE_TIME};
use focus_common::focus::driver::{
    AbortSignal, ExposureAbort, FocusActuator, FocusError, Imager, Prompter,
};
use focus_common::focus::types::{
    ExposureFlag, FocusMode, FocusTarget, ImageKind, ImageParam, SequenceConfig,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::driver_registry::Backend;
use crate::prompt::{AcceptDefaults, prompt_value};
use crate::snapshot::{ImagingSnapshot, apply_sweep_overrides};

/// How `run` obtains one tunable.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Param<T> {
    /// Keep the current configuration value.
    #[default]
    Current,
    /// Ask the prompter, offering the current value as default.
    Prompt,
    /// Use this value.
    Value(T),
}

/// How a sweep ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SequenceOutcome {
    /// Effective exposure time too short; nothing was touched.
    Skipped,
    /// All exposures taken, image read out.
    Completed,
    /// Abort observed before exposure `at_exposure`; image abandoned.
    Aborted {
        /// 1-based index of the exposure that was not started
        at_exposure: u32,
    },
    /// Integration of exposure `at_exposure` failed; image abandoned.
    IntegrationFailed {
        /// 1-based index of the failed exposure
        at_exposure: u32,
        /// Imager's failure message
        reason: String,
    },
}

/// Summary of one `run`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceReport {
    /// How the sweep ended
    pub outcome: SequenceOutcome,
    /// Effective exposure time reported by the imager, seconds
    pub exposure_time: f64,
    /// Sub-exposures integrated successfully
    pub exposures_taken: u32,
    /// Focus position before the sweep
    pub starting_focus: Option<f64>,
    /// Focus position after restoration
    pub final_focus: Option<f64>,
    /// Total detector rows shifted
    pub rows_shifted: u64,
}

impl SequenceReport {
    fn skipped(exposure_time: f64) -> Self {
        Self {
            outcome: SequenceOutcome::Skipped,
            exposure_time,
            exposures_taken: 0,
            starting_focus: None,
            final_focus: None,
            rows_shifted: 0,
        }
    }
}

/// Thread-safe handle that aborts a running sweep.
#[derive(Clone)]
pub struct AbortHandle {
    cancel: CancellationToken,
    exposure: Arc<dyn ExposureAbort>,
}

impl AbortHandle {
    /// Abort the in-progress integration and flag the sweep loop.
    ///
    /// The loop notices the flag at its next poll point; an integration
    /// already running is cut short by the imager.
    pub fn abort(&self) {
        self.exposure.abort_exposure();
        self.cancel.cancel();
    }
}

/// Ephemeral state of one sweep.
#[derive(Debug, Default)]
struct RunState {
    index: u32,
    current_focus: f64,
    starting_focus: f64,
    accumulated_steps: f64,
    aborted: bool,
    exposures_taken: u32,
    rows_shifted: u64,
}

/// Focus sweep sequencer.
pub struct FocusSequencer {
    /// Sweep configuration
    config: SequenceConfig,
    /// Camera
    imager: Box<dyn Imager>,
    /// Focus mechanism selected by `config.focus_target`
    actuator: Box<dyn FocusActuator>,
    /// Interactive parameter entry
    prompter: Box<dyn Prompter>,
    /// Shared abort flag
    cancel: CancellationToken,
    /// Additional abort sources (keyboard, operator console)
    signals: Vec<Arc<dyn AbortSignal>>,
    /// Abort forwarding into the imager
    abort_handle: AbortHandle,
}

impl FocusSequencer {
    /// Start building a sequencer with the given configuration.
    pub fn builder(config: SequenceConfig) -> SequencerBuilder {
        SequencerBuilder::new(config)
    }

    /// Build a sequencer from a registry backend, selecting the actuator
    /// named by `config.focus_target`.
    pub fn from_backend(config: SequenceConfig, backend: Backend) -> Result<Self, FocusError> {
        Self::builder(config)
            .imager(backend.imager)
            .instrument(backend.instrument)
            .telescope(backend.telescope)
            .build()
    }

    /// Store the four tunables and lock them against prompting.
    ///
    /// # Errors
    /// Returns `FocusError::InvalidParameter` if a value is out of range;
    /// the configuration is left unchanged in that case.
    pub fn configure(
        &mut self,
        exposure_time: f64,
        exposure_count: u32,
        focus_step: f64,
        detector_shift: u32,
    ) -> Result<(), FocusError> {
        validate_tunables(exposure_time, exposure_count, focus_step)?;

        self.config.exposure_time = exposure_time;
        self.config.exposure_count = exposure_count;
        self.config.focus_step = focus_step;
        self.config.detector_shift = detector_shift;
        self.config.params_locked = true;

        info!(
            "Focus parameters set: exposure_time={:.3}s, exposures={}, step={}, shift={} rows",
            exposure_time, exposure_count, focus_step, detector_shift
        );
        Ok(())
    }

    /// Restore default tunables and unlock them.
    pub fn reset(&mut self) {
        self.config.reset_tunables();
        debug!("Focus parameters reset to defaults");
    }

    /// Abort a sweep in progress. See [`AbortHandle::abort`].
    pub fn abort(&self) {
        self.abort_handle.abort();
    }

    /// Handle for aborting from another thread or a signal handler.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Current configuration.
    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// Change the focus addressing mode for subsequent runs.
    pub fn set_focus_mode(&mut self, mode: FocusMode) {
        self.config.focus_mode = mode;
    }

    /// Change the settle delay for subsequent runs.
    pub fn set_settle_delay(&mut self, delay: Duration) {
        self.config.settle_delay = delay;
    }

    /// Wait for the actuator to stop after a focus command.
    pub fn focus_delay(&mut self) {
        self.actuator.wait_settled(self.config.settle_delay);
    }

    /// Release the actuator.
    pub fn shutdown(&mut self) -> Result<(), FocusError> {
        info!("Shutting down focus actuator '{}'", self.actuator.name());
        self.actuator.shutdown()
    }

    /// Execute a focus sweep.
    ///
    /// With locked parameters all four arguments are ignored. Otherwise
    /// each argument is applied independently, see [`Param`]. A negative
    /// exposure time skips the sweep like a zero one.
    ///
    /// An abort requested at any point after entry, prompting included,
    /// stops the sweep at its next poll. The abort flag is cleared when
    /// `run` returns.
    ///
    /// # Errors
    /// Collaborator faults other than integration failures propagate after
    /// the open exposure is abandoned and the imaging parameters are
    /// restored, both best-effort.
    pub fn run(
        &mut self,
        exposure_time: Param<f64>,
        exposure_count: Param<u32>,
        focus_step: Param<f64>,
        detector_shift: Param<u32>,
    ) -> Result<SequenceReport, FocusError> {
        let result = self.run_once(exposure_time, exposure_count, focus_step, detector_shift);
        // An abort belongs to the run that was in progress when it arrived.
        self.cancel.reset();
        result
    }

    fn run_once(
        &mut self,
        exposure_time: Param<f64>,
        exposure_count: Param<u32>,
        focus_step: Param<f64>,
        detector_shift: Param<u32>,
    ) -> Result<SequenceReport, FocusError> {
        self.resolve_params(exposure_time, exposure_count, focus_step, detector_shift)?;
        let cfg = self.config.clone();

        self.imager.set_exposure_time(cfg.exposure_time)?;
        let effective = self.imager.exposure_time()?;
        if effective < MIN_FOCUS_EXPOSURE_TIME {
            warn!("do not focus with zero exposure time");
            return Ok(SequenceReport::skipped(effective));
        }

        let snapshot = ImagingSnapshot::capture(self.imager.as_ref())?;
        match self.sweep(&cfg, effective, &snapshot) {
            Ok(report) => Ok(report),
            Err(e) => {
                error!("Focus sequence failed: {}", e);
                if let Err(flag_err) = self
                    .imager
                    .set_parameter(ImageParam::ExposureFlag, ExposureFlag::None.into())
                {
                    warn!("Failed to abandon exposure: {}", flag_err);
                }
                if let Err(restore_err) = snapshot.restore(self.imager.as_mut()) {
                    warn!("Failed to restore imaging parameters: {}", restore_err);
                }
                Err(e)
            }
        }
    }

    fn resolve_params(
        &mut self,
        exposure_time: Param<f64>,
        exposure_count: Param<u32>,
        focus_step: Param<f64>,
        detector_shift: Param<u32>,
    ) -> Result<(), FocusError> {
        if self.config.params_locked {
            debug!("Focus parameters locked, ignoring run arguments");
            return Ok(());
        }

        let prompter = self.prompter.as_mut();
        let exposure_time = resolve(
            prompter,
            exposure_time,
            "Exposure time (sec)",
            self.config.exposure_time,
        )?;
        let exposure_count = resolve(
            prompter,
            exposure_count,
            "Number of exposures",
            self.config.exposure_count,
        )?;
        let focus_step = resolve(prompter, focus_step, "Focus step size", self.config.focus_step)?;
        let detector_shift = resolve(
            prompter,
            detector_shift,
            "Number detector rows to shift",
            self.config.detector_shift,
        )?;
        // Negative exposure times fall through to the effective-time guard.
        if exposure_time.is_nan() {
            return Err(FocusError::InvalidParameter(
                "exposure time is not a number".to_string(),
            ));
        }
        validate_sweep_shape(exposure_count, focus_step)?;

        self.config.exposure_time = exposure_time;
        self.config.exposure_count = exposure_count;
        self.config.focus_step = focus_step;
        self.config.detector_shift = detector_shift;
        Ok(())
    }

    fn sweep(
        &mut self,
        cfg: &SequenceConfig,
        effective_exposure: f64,
        snapshot: &ImagingSnapshot,
    ) -> Result<SequenceReport, FocusError> {
        apply_sweep_overrides(self.imager.as_mut())?;

        self.imager
            .begin(cfg.exposure_time, ImageKind::Object, FOCUS_EXPOSURE_LABEL)?;

        let channel = cfg.focus_channel;
        let start = self.actuator.get_focus(channel)?;
        let mut state = RunState {
            index: 1,
            current_focus: start,
            starting_focus: start,
            ..RunState::default()
        };
        info!(
            "Focus sweep: {} exposures of {:.3}s, step {} ({}), shift {} rows, {} start {:.3}",
            cfg.exposure_count,
            cfg.exposure_time,
            cfg.focus_step,
            cfg.focus_mode,
            cfg.detector_shift,
            cfg.focus_target,
            start
        );

        while state.index <= cfg.exposure_count {
            if self.abort_requested() {
                info!("Focus sequence aborted before exposure {}", state.index);
                state.aborted = true;
                break;
            }

            if state.index > 1 {
                match cfg.focus_mode {
                    FocusMode::RelativeStep => {
                        self.actuator
                            .set_focus(cfg.focus_step, channel, FocusMode::RelativeStep)?;
                        state.accumulated_steps += cfg.focus_step;
                    }
                    FocusMode::Absolute => {
                        self.actuator.set_focus(
                            state.current_focus + cfg.focus_step,
                            channel,
                            FocusMode::Absolute,
                        )?;
                    }
                }
                self.focus_delay();
                state.current_focus = self.actuator.get_focus(channel)?;

                self.shift_detector(cfg.detector_shift, &mut state)?;
                if state.index == cfg.exposure_count {
                    info!("Last exposure, double shifting");
                    self.shift_detector(cfg.detector_shift, &mut state)?;
                }
            }

            info!(
                "Next exposure is {} of {} at focus position {:.3}",
                state.index, cfg.exposure_count, state.current_focus
            );

            info!("Integrating");
            if let Err(e) = self.imager.integrate() {
                warn!("Focus exposure aborted: {}", e);
                self.return_to_start(cfg, &state)?;
                snapshot.restore(self.imager.as_mut())?;
                let focus = self.actuator.get_focus(channel)?;
                info!("Current focus: {:.3}", focus);
                return Ok(SequenceReport {
                    outcome: SequenceOutcome::IntegrationFailed {
                        at_exposure: state.index,
                        reason: e.to_string(),
                    },
                    exposure_time: effective_exposure,
                    exposures_taken: state.exposures_taken,
                    starting_focus: Some(state.starting_focus),
                    final_focus: Some(focus),
                    rows_shifted: state.rows_shifted,
                });
            }

            state.exposures_taken += 1;
            state.index += 1;
        }

        info!(
            "Returning focus to starting value {:.3}",
            state.starting_focus
        );
        self.return_to_start(cfg, &state)?;
        self.focus_delay();
        let final_focus = self.actuator.get_focus(channel)?;
        info!("Current focus: {:.3}", final_focus);

        let outcome = if state.aborted {
            self.imager
                .set_parameter(ImageParam::ExposureFlag, ExposureFlag::None.into())?;
            SequenceOutcome::Aborted {
                at_exposure: state.index,
            }
        } else {
            info!("Reading out");
            self.imager.readout()?;
            self.imager.end()?;
            SequenceOutcome::Completed
        };

        snapshot.restore(self.imager.as_mut())?;

        Ok(SequenceReport {
            outcome,
            exposure_time: effective_exposure,
            exposures_taken: state.exposures_taken,
            starting_focus: Some(state.starting_focus),
            final_focus: Some(final_focus),
            rows_shifted: state.rows_shifted,
        })
    }

    /// Command the actuator back to the sweep's starting position.
    ///
    /// Step mode issues the exact inverse of the accumulated steps.
    fn return_to_start(&mut self, cfg: &SequenceConfig, state: &RunState) -> Result<(), FocusError> {
        match cfg.focus_mode {
            FocusMode::RelativeStep => self.actuator.set_focus(
                -state.accumulated_steps,
                cfg.focus_channel,
                FocusMode::RelativeStep,
            ),
            FocusMode::Absolute => self.actuator.set_focus(
                state.starting_focus,
                cfg.focus_channel,
                FocusMode::Absolute,
            ),
        }
    }

    fn shift_detector(&mut self, rows: u32, state: &mut RunState) -> Result<(), FocusError> {
        self.imager.shift_rows(rows)?;
        state.rows_shifted += u64::from(rows);
        Ok(())
    }

    fn abort_requested(&self) -> bool {
        self.cancel.is_cancelled() || self.signals.iter().any(|s| s.abort_requested())
    }
}

/// Builder for [`FocusSequencer`].
pub struct SequencerBuilder {
    config: SequenceConfig,
    imager: Option<Box<dyn Imager>>,
    instrument: Option<Box<dyn FocusActuator>>,
    telescope: Option<Box<dyn FocusActuator>>,
    prompter: Option<Box<dyn Prompter>>,
    cancel: CancellationToken,
    signals: Vec<Arc<dyn AbortSignal>>,
}

impl SequencerBuilder {
    /// Create a builder with the given configuration.
    pub fn new(config: SequenceConfig) -> Self {
        Self {
            config,
            imager: None,
            instrument: None,
            telescope: None,
            prompter: None,
            cancel: CancellationToken::new(),
            signals: Vec::new(),
        }
    }

    /// Camera to expose with.
    pub fn imager(mut self, imager: Box<dyn Imager>) -> Self {
        self.imager = Some(imager);
        self
    }

    /// Instrument focus mechanism.
    pub fn instrument(mut self, actuator: Box<dyn FocusActuator>) -> Self {
        self.instrument = Some(actuator);
        self
    }

    /// Telescope focus mechanism.
    pub fn telescope(mut self, actuator: Box<dyn FocusActuator>) -> Self {
        self.telescope = Some(actuator);
        self
    }

    /// Prompter for unresolved tunables. Default: accept current values.
    pub fn prompter(mut self, prompter: Box<dyn Prompter>) -> Self {
        self.prompter = Some(prompter);
        self
    }

    /// Share an existing cancellation token (e.g. one wired to Ctrl-C).
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Add an abort source polled once per sweep step.
    pub fn abort_signal(mut self, signal: Arc<dyn AbortSignal>) -> Self {
        self.signals.push(signal);
        self
    }

    /// Build the sequencer.
    ///
    /// # Errors
    /// Returns `FocusError::InvalidParameter` if no imager was given or the
    /// actuator for `config.focus_target` is missing.
    pub fn build(self) -> Result<FocusSequencer, FocusError> {
        let imager = self
            .imager
            .ok_or_else(|| FocusError::InvalidParameter("no imager configured".to_string()))?;

        let target = self.config.focus_target;
        let actuator = match target {
            FocusTarget::Instrument => self.instrument,
            FocusTarget::Telescope => self.telescope,
        }
        .ok_or_else(|| {
            FocusError::InvalidParameter(format!("no {target} focus actuator configured"))
        })?;

        let abort_handle = AbortHandle {
            cancel: self.cancel.clone(),
            exposure: imager.abort_handle(),
        };

        info!(
            "Focus sequencer ready: target={} ({}), mode={}, settle={:?}",
            target,
            actuator.name(),
            self.config.focus_mode,
            self.config.settle_delay
        );

        Ok(FocusSequencer {
            config: self.config,
            imager,
            actuator,
            prompter: self.prompter.unwrap_or_else(|| Box::new(AcceptDefaults)),
            cancel: self.cancel,
            signals: self.signals,
            abort_handle,
        })
    }
}

fn resolve<T>(
    prompter: &mut dyn Prompter,
    param: Param<T>,
    label: &str,
    current: T,
) -> Result<T, FocusError>
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match param {
        Param::Current => Ok(current),
        Param::Value(v) => Ok(v),
        Param::Prompt => prompt_value(prompter, label, current),
    }
}

fn validate_tunables(exposure_time: f64, exposure_count: u32, focus_step: f64) -> Result<(), FocusError> {
    if !exposure_time.is_finite() || exposure_time < 0.0 {
        return Err(FocusError::InvalidParameter(format!(
            "exposure time must be a non-negative number, got {exposure_time}"
        )));
    }
    validate_sweep_shape(exposure_count, focus_step)
}

fn validate_sweep_shape(exposure_count: u32, focus_step: f64) -> Result<(), FocusError> {
    if exposure_count == 0 {
        return Err(FocusError::InvalidParameter(
            "number of exposures must be at least 1".to_string(),
        ));
    }
    if !focus_step.is_finite() {
        return Err(FocusError::InvalidParameter(format!(
            "focus step must be finite, got {focus_step}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tunables() {
        assert!(validate_tunables(1.0, 7, 30.0).is_ok());
        assert!(validate_tunables(0.0, 1, -5.0).is_ok());
        assert!(validate_tunables(-0.5, 7, 30.0).is_err());
        assert!(validate_tunables(f64::INFINITY, 7, 30.0).is_err());
        assert!(validate_tunables(1.0, 0, 30.0).is_err());
        assert!(validate_tunables(1.0, 7, f64::NAN).is_err());
    }

    #[test]
    fn test_validate_sweep_shape_ignores_exposure_time() {
        assert!(validate_sweep_shape(1, -5.0).is_ok());
        assert!(validate_sweep_shape(0, 30.0).is_err());
        assert!(validate_sweep_shape(3, f64::INFINITY).is_err());
    }

    #[test]
    fn test_param_default_is_current() {
        assert_eq!(Param::<u32>::default(), Param::Current);
    }

    #[test]
    fn test_resolve_without_prompt() {
        let mut prompter = AcceptDefaults;
        assert_eq!(resolve(&mut prompter, Param::Value(3u32), "n", 7).unwrap(), 3);
        assert_eq!(resolve(&mut prompter, Param::Current, "n", 7u32).unwrap(), 7);
        assert_eq!(resolve(&mut prompter, Param::Prompt, "n", 7u32).unwrap(), 7);
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_string(&SequenceOutcome::Aborted { at_exposure: 3 }).unwrap();
        assert_eq!(json, r#"{"status":"aborted","at_exposure":3}"#);

        let json = serde_json::to_string(&SequenceOutcome::Completed).unwrap();
        assert_eq!(json, r#"{"status":"completed"}"#);
    }
}
