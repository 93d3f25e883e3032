//! Focus configuration loading tests.
//!
//! Tests for `FocusConfig` loading through `ConfigLoader`: the shipped
//! sample file, partial files, unknown fields and validation failures.

use focus_common::config::{ConfigError, ConfigLoader, LogLevel};
use focus_common::focus::config::FocusConfig;
use focus_common::focus::types::{FocusMode, FocusTarget};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn write_focus_toml(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("focus.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn sample_config_loads_and_validates() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/focus.toml");
    let config = FocusConfig::load(&path).unwrap();
    config.validate().unwrap();

    assert_eq!(config.shared.log_level, LogLevel::Info);
    let seq = config.sequence_config();
    assert_eq!(seq.exposure_count, 7);
    assert_eq!(seq.focus_target, FocusTarget::Instrument);
    assert_eq!(seq.settle_delay, Duration::from_secs(3));
    assert!(!seq.params_locked);
}

#[test]
fn partial_file_keeps_defaults() {
    let tmp = TempDir::new().unwrap();
    let path = write_focus_toml(
        tmp.path(),
        r#"
[focus]
target = "telescope"
mode = "step"
channel = 2
"#,
    );

    let config = FocusConfig::load(&path).unwrap();
    config.validate().unwrap();
    let seq = config.sequence_config();
    assert_eq!(seq.focus_target, FocusTarget::Telescope);
    assert_eq!(seq.focus_mode, FocusMode::RelativeStep);
    assert_eq!(seq.focus_channel, 2);
    assert_eq!(seq.exposure_time, 1.0);
    assert_eq!(seq.focus_step, 30.0);
    assert_eq!(seq.detector_shift, 10);
}

#[test]
fn locked_sequence_section() {
    let tmp = TempDir::new().unwrap();
    let path = write_focus_toml(
        tmp.path(),
        r#"
[sequence]
exposure_time = 5.0
exposure_count = 11
focus_step = -12.5
detector_shift = 20
locked = true
"#,
    );

    let seq = FocusConfig::load(&path).unwrap().sequence_config();
    assert!(seq.params_locked);
    assert_eq!(seq.exposure_count, 11);
    assert_eq!(seq.focus_step, -12.5);
}

#[test]
fn unknown_field_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = write_focus_toml(tmp.path(), "[focus]\nspeed = 3\n");
    assert!(matches!(
        FocusConfig::load(&path),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn unknown_mode_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = write_focus_toml(tmp.path(), "[focus]\nmode = \"relative\"\n");
    assert!(FocusConfig::load(&path).is_err());
}

#[test]
fn missing_file_reported() {
    let tmp = TempDir::new().unwrap();
    assert!(matches!(
        FocusConfig::load(&tmp.path().join("absent.toml")),
        Err(ConfigError::NotFound(_))
    ));
}

#[test]
fn validation_catches_bad_values() {
    let tmp = TempDir::new().unwrap();
    let path = write_focus_toml(
        tmp.path(),
        "[simulation]\nfocus_min = 10.0\nfocus_max = -10.0\n",
    );
    let config = FocusConfig::load(&path).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid(_))
    ));
}
