//! Focus sequencer backends.
//!
//! - [`simulation`] - Software camera and focusers for development and testing
//!
//! # Adding New Backends
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `Imager` and `FocusActuator` from `focus_common::focus::driver`
//! 3. Provide a `BackendFactory` and register it in [`register_all_drivers`]

pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Register all built-in backends.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register("simulation", simulation::create_backend);
}
