//! Imaging parameter snapshot.
//!
//! A sweep rewrites the camera's file-naming parameters so that every sweep
//! lands in one predictably named, overwritable, non-test image. The
//! previous values are captured into an [`ImagingSnapshot`] beforehand and
//! written back in one call on every exit path.

use focus_common::consts::FOCUS_IMAGE_ROOT;
use focus_common::focus::driver::{FocusError, Imager};
use focus_common::focus::types::{ImageParam, ParamValue};
use tracing::debug;

/// Saved values of the imaging parameters a sweep overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagingSnapshot {
    /// Image root name
    pub root: ParamValue,
    /// Include-sequence-number flag
    pub include_sequence_number: ParamValue,
    /// Auto-name flag
    pub auto_name: ParamValue,
    /// Auto-increment-sequence-number flag
    pub auto_increment_sequence_number: ParamValue,
    /// Overwrite flag
    pub overwrite: ParamValue,
    /// Image title
    pub title: ParamValue,
    /// Test-image flag
    pub test_image: ParamValue,
    /// Image type
    pub image_type: ParamValue,
}

impl ImagingSnapshot {
    /// Read every saved parameter from the imager.
    pub fn capture(imager: &dyn Imager) -> Result<Self, FocusError> {
        let snapshot = Self {
            root: imager.parameter(ImageParam::ImageRoot)?,
            include_sequence_number: imager.parameter(ImageParam::IncludeSequenceNumber)?,
            auto_name: imager.parameter(ImageParam::AutoName)?,
            auto_increment_sequence_number: imager
                .parameter(ImageParam::AutoIncrementSequenceNumber)?,
            overwrite: imager.parameter(ImageParam::Overwrite)?,
            title: imager.parameter(ImageParam::Title)?,
            test_image: imager.parameter(ImageParam::TestImage)?,
            image_type: imager.parameter(ImageParam::ImageType)?,
        };
        debug!("Captured imaging parameters: {:?}", snapshot);
        Ok(snapshot)
    }

    /// Write every saved parameter back to the imager.
    pub fn restore(&self, imager: &mut dyn Imager) -> Result<(), FocusError> {
        for (param, value) in self.entries() {
            imager.set_parameter(param, value.clone())?;
        }
        debug!("Restored imaging parameters");
        Ok(())
    }

    /// Saved parameters paired with their values, in restore order.
    pub fn entries(&self) -> [(ImageParam, &ParamValue); 8] {
        [
            (ImageParam::ImageRoot, &self.root),
            (ImageParam::IncludeSequenceNumber, &self.include_sequence_number),
            (ImageParam::AutoName, &self.auto_name),
            (
                ImageParam::AutoIncrementSequenceNumber,
                &self.auto_increment_sequence_number,
            ),
            (ImageParam::Overwrite, &self.overwrite),
            (ImageParam::TestImage, &self.test_image),
            (ImageParam::Title, &self.title),
            (ImageParam::ImageType, &self.image_type),
        ]
    }
}

/// Overrides applied for the duration of a sweep.
pub fn sweep_overrides() -> [(ImageParam, ParamValue); 6] {
    [
        (ImageParam::ImageRoot, ParamValue::from(FOCUS_IMAGE_ROOT)),
        (ImageParam::IncludeSequenceNumber, ParamValue::Flag(true)),
        (ImageParam::AutoName, ParamValue::Flag(false)),
        (ImageParam::AutoIncrementSequenceNumber, ParamValue::Flag(true)),
        (ImageParam::TestImage, ParamValue::Flag(false)),
        (ImageParam::Overwrite, ParamValue::Flag(true)),
    ]
}

/// Apply [`sweep_overrides`] to the imager.
pub fn apply_sweep_overrides(imager: &mut dyn Imager) -> Result<(), FocusError> {
    for (param, value) in sweep_overrides() {
        imager.set_parameter(param, value)?;
    }
    Ok(())
}
