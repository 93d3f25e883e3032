//! Focuser position persistence for the simulation backend.
//!
//! Positions of every focuser channel are stored in one bincode file so a
//! restarted simulator resumes where the previous run left the mechanisms.
//! Each focuser rewrites only its own entries on save.

use focus_common::focus::driver::FocusError;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Persisted position of one focuser channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedChannel {
    /// Focuser name (for matching on load)
    pub focuser: String,
    /// Focus channel
    pub channel: u32,
    /// Last commanded position
    pub position: f64,
}

/// Persisted state of all simulated focusers.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PersistedState {
    /// Version of state format (for migration)
    pub version: u32,
    /// Channel positions
    pub channels: Vec<PersistedChannel>,
    /// Timestamp of last save (Unix epoch seconds)
    pub saved_at: u64,
}

impl PersistedState {
    /// Current state format version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Create an empty state.
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            channels: Vec::new(),
            saved_at: 0,
        }
    }

    /// Positions recorded for `focuser`.
    pub fn positions_for<'a>(
        &'a self,
        focuser: &'a str,
    ) -> impl Iterator<Item = (u32, f64)> + 'a {
        self.channels
            .iter()
            .filter(move |c| c.focuser == focuser)
            .map(|c| (c.channel, c.position))
    }

    /// Replace all entries of `focuser` with `positions`.
    pub fn replace_focuser(&mut self, focuser: &str, positions: impl IntoIterator<Item = (u32, f64)>) {
        self.channels.retain(|c| c.focuser != focuser);
        self.channels
            .extend(positions.into_iter().map(|(channel, position)| PersistedChannel {
                focuser: focuser.to_string(),
                channel,
                position,
            }));
        self.channels
            .sort_by(|a, b| a.focuser.cmp(&b.focuser).then(a.channel.cmp(&b.channel)));
    }
}

/// State file manager.
#[derive(Debug, Clone)]
pub struct StatePersistence {
    path: PathBuf,
}

impl StatePersistence {
    /// Create a persistence manager for `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save state to file.
    pub fn save(&self, state: &PersistedState) -> Result<(), FocusError> {
        debug!("Saving focuser state to {:?}", self.path);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                FocusError::Persistence(format!("Failed to create directory: {}", e))
            })?;
        }

        let mut state = state.clone();
        state.saved_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let file = File::create(&self.path).map_err(|e| {
            FocusError::Persistence(format!("Failed to create state file: {}", e))
        })?;

        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, &state).map_err(|e| {
            FocusError::Persistence(format!("Failed to serialize state: {}", e))
        })?;

        info!(
            "Saved {} focuser channels to {:?}",
            state.channels.len(),
            self.path
        );
        Ok(())
    }

    /// Load state from file. A missing file or a foreign version yields `None`.
    pub fn load(&self) -> Result<Option<PersistedState>, FocusError> {
        debug!("Loading focuser state from {:?}", self.path);

        if !self.path.exists() {
            debug!("State file does not exist, starting fresh");
            return Ok(None);
        }

        let file = File::open(&self.path).map_err(|e| {
            FocusError::Persistence(format!("Failed to open state file: {}", e))
        })?;

        let reader = BufReader::new(file);
        let state: PersistedState = bincode::deserialize_from(reader).map_err(|e| {
            FocusError::Persistence(format!("Failed to deserialize state: {}", e))
        })?;

        if state.version != PersistedState::CURRENT_VERSION {
            warn!(
                "State file version {} differs from current {}, starting fresh",
                state.version,
                PersistedState::CURRENT_VERSION
            );
            return Ok(None);
        }

        info!(
            "Loaded {} focuser channels from {:?} (saved at {})",
            state.channels.len(),
            self.path,
            state.saved_at
        );
        Ok(Some(state))
    }

    /// Load state, treating an unreadable file as absent.
    pub fn load_or_fresh(&self) -> PersistedState {
        match self.load() {
            Ok(Some(state)) => state,
            Ok(None) => PersistedState::new(),
            Err(e) => {
                warn!("{}, starting fresh", e);
                PersistedState::new()
            }
        }
    }

    /// Delete the state file.
    pub fn delete(&self) -> Result<(), FocusError> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                FocusError::Persistence(format!("Failed to delete state file: {}", e))
            })?;
            info!("Deleted state file {:?}", self.path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_persisted_state_new() {
        let state = PersistedState::new();
        assert_eq!(state.version, PersistedState::CURRENT_VERSION);
        assert!(state.channels.is_empty());
        assert_eq!(state.saved_at, 0);
    }

    #[test]
    fn test_replace_focuser_keeps_others() {
        let mut state = PersistedState::new();
        state.replace_focuser("telescope", [(0, 5.0)]);
        state.replace_focuser("instrument", [(0, 1.0), (1, 2.0)]);
        state.replace_focuser("instrument", [(0, 3.0)]);

        assert_eq!(state.channels.len(), 2);
        assert_eq!(state.positions_for("instrument").collect::<Vec<_>>(), vec![(0, 3.0)]);
        assert_eq!(state.positions_for("telescope").collect::<Vec<_>>(), vec![(0, 5.0)]);
    }

    #[test]
    fn test_persistence_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.bin");
        let persistence = StatePersistence::new(&path);

        let mut state = PersistedState::new();
        state.replace_focuser("instrument", [(0, 42.0), (2, -7.5)]);

        persistence.save(&state).unwrap();
        assert!(path.exists());

        let loaded = persistence.load().unwrap().unwrap();
        assert_eq!(loaded.channels, state.channels);
        assert!(loaded.saved_at > 0);

        persistence.delete().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_persistence_load_missing() {
        let dir = tempdir().unwrap();
        let persistence = StatePersistence::new(dir.path().join("nonexistent.bin"));
        assert!(persistence.load().unwrap().is_none());
    }

    #[test]
    fn test_version_mismatch_starts_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.bin");
        let old = PersistedState {
            version: PersistedState::CURRENT_VERSION + 1,
            channels: Vec::new(),
            saved_at: 0,
        };
        std::fs::write(&path, bincode::serialize(&old).unwrap()).unwrap();

        assert!(StatePersistence::new(&path).load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.bin");
        std::fs::write(&path, b"\x01").unwrap();

        let persistence = StatePersistence::new(&path);
        assert!(matches!(persistence.load(), Err(FocusError::Persistence(_))));
        assert!(persistence.load_or_fresh().channels.is_empty());
    }
}
