//! Focus sweep collaborator contracts and shared types.
//!
//! - [`driver`] - `Imager`, `FocusActuator`, `Prompter`, `AbortSignal` traits and error types
//! - [`types`] - Focus target/mode enums, image parameters, sequence configuration
//! - [`config`] - `FocusConfig` loaded from `focus.toml`

pub mod config;
pub mod driver;
pub mod types;
