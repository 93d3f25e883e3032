//! # Focus Sequencer Library
//!
//! Focus-sweep calibration sequencer with pluggable camera and focus
//! backends. Backends implement the `Imager` and `FocusActuator` traits
//! defined in `focus_common::focus::driver`.
//!
//! # Module Structure
//!
//! - [`sequencer`] - FocusSequencer, sweep loop and restoration
//! - [`snapshot`] - Imaging parameter capture and restore
//! - [`prompt`] - Interactive tunable entry
//! - [`driver_registry`] - Backend factory registration
//! - [`drivers`] - Backend implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     focus_seq (single crate)                 │
//! │  ┌─────────────┐    ┌────────────────┐    ┌───────────────┐  │
//! │  │  Prompter   │───►│ FocusSequencer │◄──►│ Backend       │  │
//! │  └─────────────┘    │  (sweep loop)  │    │ Registry      │  │
//! │  ┌─────────────┐    └──┬──────────┬──┘    └───────────────┘  │
//! │  │ AbortHandle │───────┘          │                          │
//! │  └─────────────┘         ┌────────┴───────┐                  │
//! │                          ▼                ▼                  │
//! │                  ┌──────────────┐ ┌───────────────┐          │
//! │                  │ Imager       │ │ FocusActuator │          │
//! │                  └──────────────┘ └───────────────┘          │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod driver_registry;
pub mod drivers;
pub mod prompt;
pub mod sequencer;
pub mod snapshot;

pub use sequencer::{
    AbortHandle, FocusSequencer, Param, SequenceOutcome, SequenceReport, SequencerBuilder,
};
