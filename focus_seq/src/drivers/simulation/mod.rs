//! Simulation backend.
//!
//! This module provides a software camera and two software focusers for
//! development and testing without physical hardware.

mod camera;
mod focuser;
mod state;

pub use camera::{CameraMonitor, CameraStatus, SimulatedCamera};
pub use focuser::{FocuserMonitor, SimulatedFocuser};
pub use state::{PersistedChannel, PersistedState, StatePersistence};

use crate::driver_registry::Backend;
use focus_common::focus::config::FocusConfig;
use focus_common::focus::driver::FocusError;
use tracing::info;

/// Name of the simulated instrument focuser.
pub const INSTRUMENT_FOCUSER: &str = "simulation-instrument";
/// Name of the simulated telescope focuser.
pub const TELESCOPE_FOCUSER: &str = "simulation-telescope";

/// Factory function to create the simulation backend.
pub fn create_backend(config: &FocusConfig) -> Result<Backend, FocusError> {
    let sim = &config.simulation;
    let camera = SimulatedCamera::new(sim);
    let mut instrument = SimulatedFocuser::new(INSTRUMENT_FOCUSER, sim.instrument_start, sim);
    let mut telescope = SimulatedFocuser::new(TELESCOPE_FOCUSER, sim.telescope_start, sim);

    if let Some(path) = &sim.state_file {
        let persistence = StatePersistence::new(path);
        let loaded = persistence.load_or_fresh();
        instrument = instrument.with_persistence(persistence.clone(), Some(&loaded));
        telescope = telescope.with_persistence(persistence, Some(&loaded));
    }

    info!(
        "Simulation backend ready (time scale {}, travel [{}, {}])",
        sim.time_scale, sim.focus_min, sim.focus_max
    );
    Ok(Backend {
        imager: Box::new(camera),
        instrument: Box::new(instrument),
        telescope: Box::new(telescope),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_common::focus::types::FocusMode;
    use tempfile::tempdir;

    #[test]
    fn test_create_backend_names() {
        let backend = create_backend(&FocusConfig::default()).unwrap();
        assert_eq!(backend.instrument.name(), INSTRUMENT_FOCUSER);
        assert_eq!(backend.telescope.name(), TELESCOPE_FOCUSER);
    }

    #[test]
    fn test_create_backend_restores_state() {
        let dir = tempdir().unwrap();
        let mut config = FocusConfig::default();
        config.simulation.state_file = Some(dir.path().join("focus_state.bin"));
        config.simulation.telescope_start = 50.0;

        let mut backend = create_backend(&config).unwrap();
        backend
            .instrument
            .set_focus(321.0, 0, FocusMode::Absolute)
            .unwrap();
        backend.instrument.shutdown().unwrap();
        backend.telescope.shutdown().unwrap();

        let mut backend = create_backend(&config).unwrap();
        assert_eq!(backend.instrument.get_focus(0).unwrap(), 321.0);
        assert_eq!(backend.telescope.get_focus(0).unwrap(), 50.0);
    }
}
