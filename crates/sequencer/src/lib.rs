//! Stopmo Sequencer
//!
//! The editing session for a stop-motion sequence. A single [`Session`]
//! owns the frame store, the display mode, the render surface and the
//! active cursor driver, and is the only place any of them change.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                    SessionRunner                      │
//! │   commands ─┐    decode ─┐    finalize ─┐   ticker    │
//! │             ▼            ▼              ▼      │      │
//! │  ┌─────────────────────────────────────────────▼────┐ │
//! │  │                    Session                       │ │
//! │  │  FrameStore · DisplayMode · Driver · Surface     │ │
//! │  │     │                 │                          │ │
//! │  │     ▼                 ▼                          │ │
//! │  │  GalleryView    Onion Compositor ──▶ Encoder     │ │
//! │  └──────────────────────────────────────────────────┘ │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Driver state machine:
//!
//! ```text
//!            start_playback            start_export
//!   Idle ───────────────▶ Previewing ───────────────▶ Exporting
//!    ▲ ▲                      │ (stop / last frame)       │
//!    │ └──────────────────────┘                           │
//!    └──────────── every frame emitted / abort ───────────┘
//! ```

pub mod export;
pub mod gallery;
pub mod loader;
pub mod playback;
pub mod reorder;
pub mod runtime;
pub mod session;
pub mod sink;

#[cfg(test)]
pub(crate) mod testing;

pub use export::{ExportTick, PendingExport};
pub use gallery::{CarouselItem, CarouselWindow, GalleryView, SlotKind, TracingGallery};
pub use loader::{DecodingLoader, ImageLoader, ImageSource};
pub use playback::PlaybackTick;
pub use reorder::{DragTracker, DropSide, ReorderGesture};
pub use runtime::{SessionCommand, SessionHandle, SessionNotice, SessionRunner, SessionSnapshot};
pub use session::Session;
pub use sink::{ArtifactSink, DirectorySink};
