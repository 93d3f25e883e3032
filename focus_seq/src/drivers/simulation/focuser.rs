//! Simulated focus mechanism.
//!
//! Moves complete instantly within the configured travel limits. Settling
//! sleeps the requested delay scaled by the simulation time scale.

use super::state::{PersistedState, StatePersistence};
use focus_common::focus::config::SimulationSection;
use focus_common::focus::driver::{FocusActuator, FocusError};
use focus_common::focus::types::FocusMode;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct FocuserState {
    positions: BTreeMap<u32, f64>,
    moves: u64,
}

/// Read-only view of a [`SimulatedFocuser`] that outlives boxing it.
#[derive(Debug, Clone)]
pub struct FocuserMonitor {
    start: f64,
    state: Arc<Mutex<FocuserState>>,
}

impl FocuserMonitor {
    /// Position of `channel`.
    pub fn position(&self, channel: u32) -> f64 {
        self.state
            .lock()
            .positions
            .get(&channel)
            .copied()
            .unwrap_or(self.start)
    }

    /// Number of moves commanded so far.
    pub fn moves(&self) -> u64 {
        self.state.lock().moves
    }
}

/// Software focuser implementing [`FocusActuator`].
pub struct SimulatedFocuser {
    name: String,
    start: f64,
    min: f64,
    max: f64,
    time_scale: f64,
    state: Arc<Mutex<FocuserState>>,
    persistence: Option<StatePersistence>,
}

impl SimulatedFocuser {
    /// Create a focuser whose channels all start at `start`.
    pub fn new(name: &str, start: f64, sim: &SimulationSection) -> Self {
        Self {
            name: name.to_string(),
            start,
            min: sim.focus_min,
            max: sim.focus_max,
            time_scale: sim.time_scale,
            state: Arc::new(Mutex::new(FocuserState::default())),
            persistence: None,
        }
    }

    /// Persist positions to `persistence` on shutdown, seeding from `loaded`.
    pub fn with_persistence(
        mut self,
        persistence: StatePersistence,
        loaded: Option<&PersistedState>,
    ) -> Self {
        if let Some(loaded) = loaded {
            let mut state = self.state.lock();
            for (channel, position) in loaded.positions_for(&self.name) {
                debug!("{}: restored channel {} at {:.3}", self.name, channel, position);
                state.positions.insert(channel, position);
            }
        }
        self.persistence = Some(persistence);
        self
    }

    /// Observer for tests and the CLI summary.
    pub fn monitor(&self) -> FocuserMonitor {
        FocuserMonitor {
            start: self.start,
            state: Arc::clone(&self.state),
        }
    }
}

impl FocusActuator for SimulatedFocuser {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_focus(&mut self, channel: u32) -> Result<f64, FocusError> {
        Ok(self
            .state
            .lock()
            .positions
            .get(&channel)
            .copied()
            .unwrap_or(self.start))
    }

    fn set_focus(&mut self, value: f64, channel: u32, mode: FocusMode) -> Result<(), FocusError> {
        if !value.is_finite() {
            return Err(FocusError::InvalidParameter(format!(
                "{}: focus value {value} is not a number",
                self.name
            )));
        }

        let mut state = self.state.lock();
        let current = state.positions.get(&channel).copied().unwrap_or(self.start);
        let target = match mode {
            FocusMode::Absolute => value,
            FocusMode::RelativeStep => current + value,
        };
        if target < self.min || target > self.max {
            return Err(FocusError::Hardware(format!(
                "{}: channel {} target {:.3} beyond travel limits [{:.3}, {:.3}]",
                self.name, channel, target, self.min, self.max
            )));
        }

        state.positions.insert(channel, target);
        state.moves += 1;
        debug!(
            "{}: channel {} {} {:.3} -> {:.3}",
            self.name, channel, mode, current, target
        );
        Ok(())
    }

    fn wait_settled(&mut self, delay: Duration) {
        std::thread::sleep(delay.mul_f64(self.time_scale));
    }

    fn shutdown(&mut self) -> Result<(), FocusError> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };

        let mut persisted = persistence.load_or_fresh();
        let positions: Vec<(u32, f64)> = self
            .state
            .lock()
            .positions
            .iter()
            .map(|(channel, position)| (*channel, *position))
            .collect();
        if positions.is_empty() {
            warn!("{}: no positions to persist", self.name);
        }
        persisted.replace_focuser(&self.name, positions);
        persistence.save(&persisted)?;
        info!("{}: focus state persisted", self.name);
        Ok(())
    }
}
