//! Backend registry for the focus sequencer.
//!
//! A backend bundles one camera and the two focus mechanisms the sequencer
//! may drive. Backends are registered by name into a `DriverRegistry`
//! constructed at startup and passed around by value.

use focus_common::focus::config::FocusConfig;
use focus_common::focus::driver::{FocusActuator, FocusError, Imager};
use std::collections::HashMap;

/// Camera plus instrument and telescope focus mechanisms.
pub struct Backend {
    /// Camera
    pub imager: Box<dyn Imager>,
    /// Instrument focus mechanism
    pub instrument: Box<dyn FocusActuator>,
    /// Telescope focus mechanism
    pub telescope: Box<dyn FocusActuator>,
}

/// Factory function type for creating backends.
pub type BackendFactory = fn(&FocusConfig) -> Result<Backend, FocusError>;

/// Registry of available backends.
pub struct DriverRegistry {
    factories: HashMap<&'static str, BackendFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in backend.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry);
        registry
    }

    /// Register a backend factory.
    ///
    /// # Panics
    /// Panics if a backend with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: BackendFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a backend factory by name.
    pub fn get_factory(&self, name: &str) -> Option<BackendFactory> {
        self.factories.get(name).copied()
    }

    /// Create a backend by name.
    ///
    /// # Errors
    /// Returns `FocusError::DriverNotFound` if no backend with the given name
    /// is registered, or the factory's own error.
    pub fn create(&self, name: &str, config: &FocusConfig) -> Result<Backend, FocusError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| FocusError::DriverNotFound(name.to_string()))?;
        factory(config)
    }

    /// List all registered backend names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::{SimulatedCamera, SimulatedFocuser};
    use focus_common::focus::config::SimulationSection;

    fn create_test_backend(_config: &FocusConfig) -> Result<Backend, FocusError> {
        let sim = SimulationSection::default();
        Ok(Backend {
            imager: Box::new(SimulatedCamera::new(&sim)),
            instrument: Box::new(SimulatedFocuser::new("test-instrument", 0.0, &sim)),
            telescope: Box::new(SimulatedFocuser::new("test-telescope", 0.0, &sim)),
        })
    }

    fn failing_backend(_config: &FocusConfig) -> Result<Backend, FocusError> {
        Err(FocusError::Hardware("camera offline".to_string()))
    }

    #[test]
    fn registry_register_and_create() {
        let mut reg = DriverRegistry::new();
        reg.register("test_backend", create_test_backend);

        let backend = reg
            .create("test_backend", &FocusConfig::default())
            .expect("should create");
        assert_eq!(backend.instrument.name(), "test-instrument");
        assert_eq!(backend.telescope.name(), "test-telescope");
    }

    #[test]
    fn registry_driver_not_found() {
        let reg = DriverRegistry::new();
        let result = reg.create("nonexistent", &FocusConfig::default());
        assert!(matches!(result, Err(FocusError::DriverNotFound(_))));
    }

    #[test]
    fn registry_factory_error_propagates() {
        let mut reg = DriverRegistry::new();
        reg.register("broken", failing_backend);
        let result = reg.create("broken", &FocusConfig::default());
        assert!(matches!(result, Err(FocusError::Hardware(_))));
    }

    #[test]
    fn registry_list_drivers() {
        let mut reg = DriverRegistry::new();
        reg.register("beta", create_test_backend);
        reg.register("alpha", create_test_backend);
        assert_eq!(reg.list_drivers(), vec!["alpha", "beta"]);
    }

    #[test]
    fn registry_builtin_has_simulation() {
        let reg = DriverRegistry::with_builtin();
        assert!(reg.get_factory("simulation").is_some());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut reg = DriverRegistry::new();
        reg.register("dup", create_test_backend);
        reg.register("dup", create_test_backend);
    }
}
