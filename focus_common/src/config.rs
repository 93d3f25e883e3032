//! TOML configuration loading.
//!
//! [`FocusConfig`](crate::focus::config::FocusConfig) is read through the
//! blanket [`ConfigLoader`] and carries a `[shared]` table ([`SharedConfig`])
//! with the log level and the instance name.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a configuration could not be loaded or accepted.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("no configuration file at {0:?}")]
    NotFound(PathBuf),

    /// The file exists but could not be read.
    #[error("cannot read {path:?}: {reason}")]
    Unreadable {
        /// File that failed to read.
        path: PathBuf,
        /// I/O error text.
        reason: String,
    },

    /// Malformed TOML, an unknown key, or a value of the wrong shape.
    #[error("malformed configuration: {0}")]
    Parse(String),

    /// Well-formed, but a value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// `[shared] log_level`, mapped onto a `tracing_subscriber` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Filter directive for `EnvFilter::new`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// The `[shared]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SharedConfig {
    /// Default log verbosity; `RUST_LOG` and `--verbose` take precedence.
    pub log_level: LogLevel,

    /// Instance name.
    pub service_name: String,
}

impl SharedConfig {
    /// Rejects a blank `service_name`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::Invalid("service_name is blank".to_string()));
        }
        Ok(())
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: "focus".to_string(),
        }
    }
}

/// Deserialize a configuration type from a TOML file or string.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Read and parse `path`. A missing file is [`ConfigError::NotFound`] so
    /// callers can fall back to defaults.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        tracing::debug!("Reading configuration {:?}", path);
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse TOML text.
    fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_directive_matches_toml_name() {
        #[derive(Deserialize)]
        struct Level {
            level: LogLevel,
        }

        for name in ["trace", "debug", "info", "warn", "error"] {
            let parsed: Level = toml::from_str(&format!("level = \"{name}\"")).unwrap();
            assert_eq!(parsed.level.as_directive(), name);
        }
    }

    #[test]
    fn test_shared_table_is_optional_field_by_field() {
        let shared = SharedConfig::from_toml_str("log_level = \"warn\"").unwrap();
        assert_eq!(shared.log_level, LogLevel::Warn);
        assert_eq!(shared.service_name, "focus");

        let shared = SharedConfig::from_toml_str("").unwrap();
        assert_eq!(shared.log_level, LogLevel::Info);
    }

    #[test]
    fn test_blank_service_name_invalid() {
        let shared = SharedConfig {
            service_name: " \t".to_string(),
            ..SharedConfig::default()
        };
        assert!(matches!(shared.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_carries_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("focus.toml");
        match SharedConfig::load(&path) {
            Err(ConfigError::NotFound(p)) => assert_eq!(p, path),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_directory_is_unreadable() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            SharedConfig::load(dir.path()),
            Err(ConfigError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_malformed_toml_and_unknown_key() {
        assert!(matches!(
            SharedConfig::from_toml_str("service_name = [["),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            SharedConfig::from_toml_str("colour = \"blue\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
