//! Stopmo Common Utilities
//!
//! Shared infrastructure for all Stopmo crates:
//! - Error types and result aliases
//! - Tick cadence constants for playback and export
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
