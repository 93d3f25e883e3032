//! Focus Common Library
//!
//! This crate provides shared constants, collaborator traits and
//! configuration loading utilities for the focus sequencer workspace.
//!
//! # Module Structure
//!
//! - [`focus`] - Collaborator traits, error types, configuration and parameter types
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Sequence defaults and limits
//! - [`cancel`] - Cooperative cancellation token
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use focus_common::prelude::*;
//!
//! let token = CancellationToken::new();
//! assert!(!token.abort_requested());
//! ```

#![warn(missing_docs)]

pub mod cancel;
pub mod config;
pub mod consts;
pub mod focus;
pub mod prelude;
