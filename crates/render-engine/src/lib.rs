//! Stopmo Render Engine
//!
//! Draws the frame sequence onto a single render surface and samples that
//! surface into a stream encoder during export.
//!
//! # Pipeline Architecture
//!
//! ```text
//! FrameStore ──┐
//!              ├── Onion Compositor (Compare | Single)
//! DisplayMode ─┘          │
//!                         ▼
//!                   Render Surface ──── capture ───▶ StreamEncoder
//!                                                        │
//!                                                        ▼ finish()
//!                                                   EncodedClip
//! ```
//!
//! Drawing and capture are driven from the same tick, so the encoder only
//! ever observes a fully composited surface.

pub mod compositor;
pub mod encoder;
pub mod surface;

pub use compositor::*;
pub use encoder::*;
pub use surface::*;
