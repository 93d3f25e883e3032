//! Simulated camera.
//!
//! Keeps an imaging-parameter table, clamps exposure times to the configured
//! range, and simulates integration by sleeping `exposure_time * time_scale`
//! while watching its abort flag. Finished images are recorded by name
//! instead of being written to disk.

use focus_common::focus::config::SimulationSection;
use focus_common::focus::driver::{ExposureAbort, ExposureError, FocusError, Imager};
use focus_common::focus::types::{ExposureFlag, ImageKind, ImageParam, ParamValue};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Polling interval of the abort flag during simulated integration.
const ABORT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Observable state of a simulated camera.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraStatus {
    /// Exposure currently open
    pub open: bool,
    /// Image type of the open exposure
    pub kind: Option<ImageKind>,
    /// Title label of the open exposure
    pub label: String,
    /// Sub-exposures integrated into the open image
    pub segments: u32,
    /// Rows shifted in the open image
    pub rows_shifted: u64,
    /// Next image sequence number
    pub sequence_number: u32,
    /// Names of finished images, oldest first
    pub images: Vec<String>,
}

/// Read-only view of a [`SimulatedCamera`] that outlives boxing it.
#[derive(Debug, Clone)]
pub struct CameraMonitor {
    status: Arc<Mutex<CameraStatus>>,
}

impl CameraMonitor {
    /// Copy of the current camera status.
    pub fn status(&self) -> CameraStatus {
        self.status.lock().clone()
    }
}

#[derive(Debug, Default)]
struct AbortFlag {
    requested: AtomicBool,
}

impl ExposureAbort for AbortFlag {
    fn abort_exposure(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }
}

/// Software camera implementing [`Imager`].
pub struct SimulatedCamera {
    params: HashMap<ImageParam, ParamValue>,
    exposure_time: f64,
    min_exposure_time: f64,
    max_exposure_time: f64,
    time_scale: f64,
    status: Arc<Mutex<CameraStatus>>,
    abort: Arc<AbortFlag>,
    fail_next: Option<String>,
}

impl SimulatedCamera {
    /// Create a camera with default imaging parameters.
    pub fn new(sim: &SimulationSection) -> Self {
        let params = HashMap::from([
            (ImageParam::ImageRoot, ParamValue::from("image.")),
            (ImageParam::IncludeSequenceNumber, ParamValue::Flag(true)),
            (ImageParam::AutoName, ParamValue::Flag(false)),
            (ImageParam::AutoIncrementSequenceNumber, ParamValue::Flag(true)),
            (ImageParam::Title, ParamValue::from("")),
            (ImageParam::TestImage, ParamValue::Flag(false)),
            (ImageParam::Overwrite, ParamValue::Flag(false)),
            (ImageParam::ImageType, ParamValue::from(ImageKind::Zero.as_str())),
            (ImageParam::ExposureFlag, ParamValue::Exposure(ExposureFlag::None)),
        ]);

        Self {
            params,
            exposure_time: sim.min_exposure_time,
            min_exposure_time: sim.min_exposure_time,
            max_exposure_time: sim.max_exposure_time,
            time_scale: sim.time_scale,
            status: Arc::new(Mutex::new(CameraStatus {
                sequence_number: 1,
                ..CameraStatus::default()
            })),
            abort: Arc::new(AbortFlag::default()),
            fail_next: None,
        }
    }

    /// Observer for tests and the CLI summary.
    pub fn monitor(&self) -> CameraMonitor {
        CameraMonitor {
            status: Arc::clone(&self.status),
        }
    }

    /// Make the next integration fail with `reason`.
    pub fn fail_next_integration(&mut self, reason: impl Into<String>) {
        self.fail_next = Some(reason.into());
    }

    fn set_flag(&mut self, flag: ExposureFlag) {
        self.params
            .insert(ImageParam::ExposureFlag, ParamValue::Exposure(flag));
    }

    fn flag_enabled(&self, param: ImageParam) -> bool {
        self.params
            .get(&param)
            .and_then(ParamValue::as_flag)
            .unwrap_or(false)
    }

    fn require_open(&self, operation: &str) -> Result<(), FocusError> {
        if self.status.lock().open {
            Ok(())
        } else {
            Err(FocusError::Hardware(format!(
                "{operation} requested with no exposure open"
            )))
        }
    }

    fn image_name(&self, sequence_number: u32) -> String {
        if self.flag_enabled(ImageParam::TestImage) {
            return "test.fits".to_string();
        }
        let root = self
            .params
            .get(&ImageParam::ImageRoot)
            .and_then(ParamValue::as_text)
            .unwrap_or("image.");
        if self.flag_enabled(ImageParam::IncludeSequenceNumber) {
            format!("{root}{sequence_number:04}.fits")
        } else {
            format!("{root}fits")
        }
    }
}

impl Imager for SimulatedCamera {
    fn set_exposure_time(&mut self, seconds: f64) -> Result<(), FocusError> {
        if !seconds.is_finite() {
            return Err(FocusError::InvalidParameter(format!(
                "exposure time {seconds} is not a number"
            )));
        }
        let clamped = seconds.clamp(self.min_exposure_time, self.max_exposure_time);
        if clamped != seconds {
            debug!("Exposure time {:.3}s clamped to {:.3}s", seconds, clamped);
        }
        self.exposure_time = clamped;
        Ok(())
    }

    fn exposure_time(&self) -> Result<f64, FocusError> {
        Ok(self.exposure_time)
    }

    fn begin(
        &mut self,
        exposure_time: f64,
        kind: ImageKind,
        label: &str,
    ) -> Result<(), FocusError> {
        self.set_exposure_time(exposure_time)?;
        self.abort.requested.store(false, Ordering::SeqCst);
        self.params
            .insert(ImageParam::ImageType, ParamValue::from(kind.as_str()));
        self.params
            .insert(ImageParam::Title, ParamValue::from(label));
        self.set_flag(ExposureFlag::Setup);

        let mut status = self.status.lock();
        if status.open {
            warn!("Beginning a new exposure over an open one; discarding it");
        }
        status.open = true;
        status.kind = Some(kind);
        status.label = label.to_string();
        status.segments = 0;
        status.rows_shifted = 0;
        info!(
            "Exposure started: {} '{}' {:.3}s",
            kind.as_str(),
            label,
            self.exposure_time
        );
        Ok(())
    }

    fn integrate(&mut self) -> Result<(), ExposureError> {
        if !self.status.lock().open {
            return Err(ExposureError::Failed("no exposure open".to_string()));
        }
        if let Some(reason) = self.fail_next.take() {
            self.set_flag(ExposureFlag::Error);
            return Err(ExposureError::Failed(reason));
        }

        self.set_flag(ExposureFlag::Exposing);
        let duration = Duration::from_secs_f64(self.exposure_time * self.time_scale);
        let started = Instant::now();
        loop {
            if self.abort.requested.swap(false, Ordering::SeqCst) {
                self.set_flag(ExposureFlag::Aborted);
                return Err(ExposureError::Aborted);
            }
            let elapsed = started.elapsed();
            if elapsed >= duration {
                break;
            }
            std::thread::sleep(ABORT_POLL_INTERVAL.min(duration - elapsed));
        }

        self.set_flag(ExposureFlag::Setup);
        let mut status = self.status.lock();
        status.segments += 1;
        debug!("Integrated segment {}", status.segments);
        Ok(())
    }

    fn shift_rows(&mut self, rows: u32) -> Result<(), FocusError> {
        self.require_open("row shift")?;
        let mut status = self.status.lock();
        status.rows_shifted += u64::from(rows);
        debug!("Shifted {} rows (total {})", rows, status.rows_shifted);
        Ok(())
    }

    fn readout(&mut self) -> Result<(), FocusError> {
        self.require_open("readout")?;
        self.set_flag(ExposureFlag::Readout);
        let segments = self.status.lock().segments;
        debug!("Read out {} segments", segments);
        Ok(())
    }

    fn end(&mut self) -> Result<(), FocusError> {
        self.require_open("end")?;
        self.set_flag(ExposureFlag::Writing);

        let sequence_number = self.status.lock().sequence_number;
        let name = self.image_name(sequence_number);
        let auto_increment = self.flag_enabled(ImageParam::AutoIncrementSequenceNumber);

        let mut status = self.status.lock();
        status.open = false;
        status.kind = None;
        if auto_increment {
            status.sequence_number += 1;
        }
        info!("Image {} finished ({} segments)", name, status.segments);
        status.images.push(name);
        drop(status);

        self.set_flag(ExposureFlag::None);
        Ok(())
    }

    fn abort_handle(&self) -> Arc<dyn ExposureAbort> {
        self.abort.clone()
    }

    fn parameter(&self, param: ImageParam) -> Result<ParamValue, FocusError> {
        self.params
            .get(&param)
            .cloned()
            .ok_or_else(|| FocusError::InvalidParameter(format!("unknown parameter {param}")))
    }

    fn set_parameter(&mut self, param: ImageParam, value: ParamValue) -> Result<(), FocusError> {
        if param == ImageParam::ExposureFlag {
            let ParamValue::Exposure(flag) = value else {
                return Err(FocusError::InvalidParameter(format!(
                    "{param} expects an exposure flag"
                )));
            };
            if flag == ExposureFlag::None {
                let mut status = self.status.lock();
                if status.open {
                    debug!("Exposure abandoned with {} segments", status.segments);
                }
                status.open = false;
                status.kind = None;
            }
            self.set_flag(flag);
            return Ok(());
        }
        self.params.insert(param, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant_camera() -> SimulatedCamera {
        SimulatedCamera::new(&SimulationSection {
            time_scale: 0.0,
            ..SimulationSection::default()
        })
    }

    #[test]
    fn test_exposure_time_clamped() {
        let mut cam = SimulatedCamera::new(&SimulationSection {
            min_exposure_time: 0.01,
            max_exposure_time: 10.0,
            ..SimulationSection::default()
        });
        cam.set_exposure_time(-1.0).unwrap();
        assert_eq!(cam.exposure_time().unwrap(), 0.01);
        cam.set_exposure_time(20.0).unwrap();
        assert_eq!(cam.exposure_time().unwrap(), 10.0);
        assert!(cam.set_exposure_time(f64::NAN).is_err());
    }

    #[test]
    fn test_full_exposure_names_image() {
        let mut cam = instant_camera();
        let monitor = cam.monitor();
        cam.set_parameter(ImageParam::ImageRoot, "focus.".into()).unwrap();

        cam.begin(1.0, ImageKind::Object, "Focus").unwrap();
        cam.integrate().unwrap();
        cam.shift_rows(10).unwrap();
        cam.integrate().unwrap();
        cam.readout().unwrap();
        cam.end().unwrap();

        let status = monitor.status();
        assert!(!status.open);
        assert_eq!(status.segments, 2);
        assert_eq!(status.rows_shifted, 10);
        assert_eq!(status.images, vec!["focus.0001.fits".to_string()]);
        assert_eq!(status.sequence_number, 2);
        assert_eq!(
            cam.parameter(ImageParam::ExposureFlag).unwrap(),
            ParamValue::Exposure(ExposureFlag::None)
        );
    }

    #[test]
    fn test_abort_handle_interrupts_integration() {
        let mut cam = instant_camera();
        cam.begin(1.0, ImageKind::Object, "Focus").unwrap();
        cam.abort_handle().abort_exposure();
        assert_eq!(cam.integrate(), Err(ExposureError::Aborted));
        // The request is consumed by the failed integration.
        assert!(cam.integrate().is_ok());
    }

    #[test]
    fn test_abort_during_long_integration() {
        let mut cam = SimulatedCamera::new(&SimulationSection::default());
        cam.begin(30.0, ImageKind::Object, "Focus").unwrap();
        let handle = cam.abort_handle();
        let aborter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            handle.abort_exposure();
        });
        let started = Instant::now();
        assert_eq!(cam.integrate(), Err(ExposureError::Aborted));
        assert!(started.elapsed() < Duration::from_secs(5));
        aborter.join().unwrap();
    }

    #[test]
    fn test_injected_failure() {
        let mut cam = instant_camera();
        cam.begin(1.0, ImageKind::Object, "Focus").unwrap();
        cam.fail_next_integration("CCD temperature out of range");
        assert!(matches!(cam.integrate(), Err(ExposureError::Failed(_))));
        assert!(cam.integrate().is_ok());
    }

    #[test]
    fn test_operations_need_open_exposure() {
        let mut cam = instant_camera();
        assert!(cam.integrate().is_err());
        assert!(matches!(cam.shift_rows(5), Err(FocusError::Hardware(_))));
        assert!(cam.readout().is_err());
        assert!(cam.end().is_err());
    }

    #[test]
    fn test_exposure_flag_none_abandons_image() {
        let mut cam = instant_camera();
        let monitor = cam.monitor();
        cam.begin(1.0, ImageKind::Object, "Focus").unwrap();
        cam.set_parameter(ImageParam::ExposureFlag, ExposureFlag::None.into())
            .unwrap();
        assert!(!monitor.status().open);
        assert!(monitor.status().images.is_empty());
        assert!(cam
            .set_parameter(ImageParam::ExposureFlag, ParamValue::Flag(false))
            .is_err());
    }

    #[test]
    fn test_test_image_name() {
        let mut cam = instant_camera();
        let monitor = cam.monitor();
        cam.set_parameter(ImageParam::TestImage, true.into()).unwrap();
        cam.begin(1.0, ImageKind::Zero, "bias").unwrap();
        cam.integrate().unwrap();
        cam.readout().unwrap();
        cam.end().unwrap();
        assert_eq!(monitor.status().images, vec!["test.fits".to_string()]);
    }
}
