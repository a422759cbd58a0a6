//! Two-state Markov error channels for networked control loops.

#![forbid(unsafe_code, unused_must_use)]
#![warn(clippy::all, missing_docs)]

/// Default experiment parameters.
pub mod common;

/// Error types.
pub mod error;

/// Transition rate pairs and their token grammar.
pub mod rate;

/// Seeded uniform random source.
pub mod random;

/// Per-index error channel.
pub mod channel;

/// Command line configuration.
pub mod config;

/// Closed-loop plant/controller driver.
pub mod simulation;

pub use channel::ErrorChannel;
pub use error::{Error, Result};
pub use rate::RateSpec;
