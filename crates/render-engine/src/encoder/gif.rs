//! Animated GIF encoder backed by the `image` crate.
//!
//! Frames are buffered during capture and encoded in one pass on finish,
//! which keeps the per-tick cost to a buffer copy.

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, RgbaImage};
use stopmo_common::error::{StopmoError, StopmoResult};

use super::{CaptureSpec, ClipFormat, EncodedClip, StreamEncoder};
use crate::surface::Surface;

/// Quantizer speed passed to the GIF encoder (1 = best, 30 = fastest).
const GIF_SPEED: i32 = 10;

/// Pure-Rust looping GIF encoder.
#[derive(Debug, Default)]
pub struct GifStreamEncoder {
    spec: Option<CaptureSpec>,
    frames: Vec<RgbaImage>,
}

impl GifStreamEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamEncoder for GifStreamEncoder {
    fn start_capture(&mut self, width: u32, height: u32, fps: u32) -> StopmoResult<()> {
        if width > u16::MAX as u32 || height > u16::MAX as u32 {
            return Err(StopmoError::encoder_unavailable(format!(
                "GIF frames are limited to 65535px, got {width}x{height}"
            )));
        }
        self.spec = Some(CaptureSpec::new(width, height, fps)?);
        self.frames.clear();
        tracing::debug!(width, height, fps, "GIF capture started");
        Ok(())
    }

    fn capture(&mut self, surface: &Surface) -> StopmoResult<()> {
        let spec = self
            .spec
            .ok_or_else(|| StopmoError::encoder("GIF encoder not started"))?;
        spec.check(surface)?;
        self.frames.push(surface.pixels().clone());
        Ok(())
    }

    fn finish(self: Box<Self>) -> StopmoResult<EncodedClip> {
        let spec = self
            .spec
            .ok_or_else(|| StopmoError::encoder("GIF encoder not started"))?;
        if self.frames.is_empty() {
            return Err(StopmoError::encoder("no frames were captured"));
        }

        let frame_count = self.frames.len();
        let delay = Delay::from_numer_denom_ms(1000, spec.fps);
        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut bytes, GIF_SPEED);
            encoder.set_repeat(Repeat::Infinite)?;
            encoder.encode_frames(
                self.frames
                    .into_iter()
                    .map(|buffer| image::Frame::from_parts(buffer, 0, 0, delay)),
            )?;
        }

        tracing::info!(frames = frame_count, bytes = bytes.len(), "GIF encoded");
        Ok(EncodedClip {
            format: ClipFormat::Gif,
            width: spec.width,
            height: spec.height,
            fps: spec.fps,
            frames: frame_count,
            bytes,
        })
    }

    fn abort(self: Box<Self>) {
        tracing::debug!(frames = self.frames.len(), "Discarding GIF capture");
    }

    fn frames_captured(&self) -> usize {
        self.frames.len()
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "gif"
    }
}
