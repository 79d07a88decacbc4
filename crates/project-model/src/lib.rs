//! Stopmo Project Model
//!
//! Defines the core data contracts for a stop-motion editing session:
//! - **Frame:** An imported still image with its decoded bitmap
//! - **FrameStore:** The ordered frame sequence plus the cursor
//! - **State:** Display mode and driver state enumerations
//! - **Project:** Serializable project summary written next to exports
//!
//! Insertion order in the [`FrameStore`] is the animation order.

pub mod frame;
pub mod project;
pub mod state;
pub mod store;

pub use frame::*;
pub use project::*;
pub use state::*;
pub use store::*;
