//! System-wide constants for the focus workspace.
//!
//! Single source of truth for sequence defaults and limits.

/// Default exposure time per sub-exposure, seconds.
pub const DEFAULT_EXPOSURE_TIME: f64 = 1.0;

/// Default number of exposures in a sweep.
pub const DEFAULT_EXPOSURE_COUNT: u32 = 7;

/// Default focus change between exposures.
pub const DEFAULT_FOCUS_STEP: f64 = 30.0;

/// Default detector rows shifted between exposures.
pub const DEFAULT_DETECTOR_SHIFT: u32 = 10;

/// Default actuator settle delay in milliseconds.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 3000;

/// Shortest effective exposure time accepted for a focus sweep, seconds.
pub const MIN_FOCUS_EXPOSURE_TIME: f64 = 0.001;

/// Image root used while a sweep is running.
pub const FOCUS_IMAGE_ROOT: &str = "focus.";

/// Exposure label passed to the imager when the sweep begins.
pub const FOCUS_EXPOSURE_LABEL: &str = "Focus";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/focus_seq/focus.toml";

/// Default state file name (simulated focuser positions).
pub const DEFAULT_STATE_FILE: &str = "focus_state.bin";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        assert!(DEFAULT_EXPOSURE_TIME >= MIN_FOCUS_EXPOSURE_TIME);
        assert!(DEFAULT_EXPOSURE_COUNT >= 1);
        assert!(DEFAULT_FOCUS_STEP.is_finite());
        assert!(DEFAULT_DETECTOR_SHIFT > 0);
    }

    #[test]
    fn focus_root_is_prefix() {
        assert!(FOCUS_IMAGE_ROOT.ends_with('.'));
    }
}
