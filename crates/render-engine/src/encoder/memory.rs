//! In-memory encoder for dry runs and tests.

use stopmo_common::error::{StopmoError, StopmoResult};

use super::{CaptureSpec, ClipFormat, EncodedClip, StreamEncoder};
use crate::surface::Surface;

/// Keeps every captured frame as raw RGBA and concatenates them on finish.
#[derive(Debug, Default)]
pub struct MemoryStreamEncoder {
    spec: Option<CaptureSpec>,
    frames: Vec<Vec<u8>>,
}

impl MemoryStreamEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the frames captured so far.
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }
}

impl StreamEncoder for MemoryStreamEncoder {
    fn start_capture(&mut self, width: u32, height: u32, fps: u32) -> StopmoResult<()> {
        self.spec = Some(CaptureSpec::new(width, height, fps)?);
        self.frames.clear();
        Ok(())
    }

    fn capture(&mut self, surface: &Surface) -> StopmoResult<()> {
        let spec = self
            .spec
            .ok_or_else(|| StopmoError::encoder("memory encoder not started"))?;
        spec.check(surface)?;
        self.frames.push(surface.as_bytes().to_vec());
        Ok(())
    }

    fn finish(self: Box<Self>) -> StopmoResult<EncodedClip> {
        let spec = self
            .spec
            .ok_or_else(|| StopmoError::encoder("memory encoder not started"))?;
        let frames = self.frames.len();
        Ok(EncodedClip {
            format: ClipFormat::Raw,
            width: spec.width,
            height: spec.height,
            fps: spec.fps,
            frames,
            bytes: self.frames.concat(),
        })
    }

    fn abort(self: Box<Self>) {
        tracing::debug!(frames = self.frames.len(), "Discarding in-memory capture");
    }

    fn frames_captured(&self) -> usize {
        self.frames.len()
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "memory"
    }
}
