//! Prelude module for common re-exports.
//!
//! ```rust
//! use focus_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::focus::config::FocusConfig;

// ─── Sequence Constants ─────────────────────────────────────────────
pub use crate::consts::{FOCUS_IMAGE_ROOT, MIN_FOCUS_EXPOSURE_TIME};

// ─── Collaborators ──────────────────────────────────────────────────
pub use crate::cancel::CancellationToken;
pub use crate::focus::driver::{
    AbortSignal, ExposureAbort, ExposureError, FocusActuator, FocusError, Imager, Prompter,
};
pub use crate::focus::types::{
    ExposureFlag, FocusMode, FocusTarget, ImageKind, ImageParam, ParamValue, SequenceConfig,
};
