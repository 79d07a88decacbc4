//! Frame and source handle types.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::RgbaImage;

/// A decoded bitmap, shared read-only between the store and the compositor.
pub type Bitmap = Arc<RgbaImage>;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque reference to the resource a frame was imported from.
///
/// Ids are unique for the lifetime of the process, so two imports of the
/// same file still produce distinct handles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceHandle {
    id: u64,
    label: String,
}

impl SourceHandle {
    /// Allocate a fresh handle with a human-readable label (usually a path).
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.label, self.id)
    }
}

/// One still image at one position in the sequence.
///
/// Frames are immutable once created. Removing a frame from the store
/// hands it back to the caller, and dropping it releases the bitmap.
#[derive(Debug)]
pub struct Frame {
    source: SourceHandle,
    bitmap: Bitmap,
}

impl Frame {
    pub fn new(source: SourceHandle, bitmap: impl Into<Bitmap>) -> Self {
        Self {
            source,
            bitmap: bitmap.into(),
        }
    }

    pub fn source(&self) -> &SourceHandle {
        &self.source
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    /// Pixel width of the decoded bitmap.
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    /// Pixel height of the decoded bitmap.
    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    /// Consume the frame, returning its source handle so the caller can
    /// release whatever backs it.
    pub fn release(self) -> SourceHandle {
        self.source
    }
}
