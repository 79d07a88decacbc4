//! Image loading: turns file paths or in-memory bytes into frames.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use image::RgbaImage;
use stopmo_common::error::{StopmoError, StopmoResult};
use stopmo_project_model::{Frame, SourceHandle};

/// Where a frame's pixels come from.
#[derive(Clone)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes { label: String, bytes: Arc<[u8]> },
}

impl ImageSource {
    pub fn bytes(label: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        ImageSource::Bytes {
            label: label.into(),
            bytes: bytes.into(),
        }
    }

    /// Human-readable label used in logs and the project summary.
    pub fn label(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Bytes { label, .. } => label.clone(),
        }
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            ImageSource::Bytes { label, bytes } => f
                .debug_struct("Bytes")
                .field("label", label)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

/// Decodes an image source into an RGBA bitmap.
///
/// Implementations block; the runner calls them from a blocking task.
pub trait ImageLoader: Send + Sync {
    fn load(&self, source: &ImageSource) -> StopmoResult<RgbaImage>;

    /// Decode `source` and wrap it in a frame with a fresh source handle.
    fn load_frame(&self, source: &ImageSource) -> StopmoResult<Frame> {
        let bitmap = self.load(source)?;
        Ok(Frame::new(SourceHandle::new(source.label()), bitmap))
    }
}

/// Loader backed by the `image` crate's format detection.
#[derive(Debug, Default, Clone, Copy)]
pub struct DecodingLoader;

impl ImageLoader for DecodingLoader {
    fn load(&self, source: &ImageSource) -> StopmoResult<RgbaImage> {
        let decoded = match source {
            ImageSource::Path(path) => {
                let bytes = std::fs::read(path)
                    .map_err(|e| StopmoError::decode(source.label(), e.to_string()))?;
                image::load_from_memory(&bytes)
            }
            ImageSource::Bytes { bytes, .. } => image::load_from_memory(bytes),
        }
        .map_err(|e| StopmoError::decode(source.label(), e.to_string()))?;

        let bitmap = decoded.to_rgba8();
        if bitmap.width() == 0 || bitmap.height() == 0 {
            return Err(StopmoError::decode(source.label(), "image has no pixels"));
        }
        tracing::debug!(
            source = %source.label(),
            width = bitmap.width(),
            height = bitmap.height(),
            "Image decoded"
        );
        Ok(bitmap)
    }
}

/// Decode a batch on the blocking pool, in request order.
///
/// Each entry carries its own result so one bad file does not sink the
/// rest of the batch.
pub async fn load_batch(
    loader: Arc<dyn ImageLoader>,
    sources: Vec<ImageSource>,
) -> Vec<(ImageSource, StopmoResult<Frame>)> {
    let joined = tokio::task::spawn_blocking(move || {
        sources
            .into_iter()
            .map(|source| {
                let frame = loader.load_frame(&source);
                (source, frame)
            })
            .collect::<Vec<_>>()
    })
    .await;

    match joined {
        Ok(results) => results,
        Err(e) => {
            tracing::error!(error = %e, "Decode task panicked");
            Vec::new()
        }
    }
}
