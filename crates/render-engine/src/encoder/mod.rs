//! Stream encoders that capture the render surface.
//!
//! The export driver calls [`StreamEncoder::capture`] once per tick, right
//! after the compositor finishes drawing, so every captured frame is a
//! complete composite. [`StreamEncoder::finish`] may be slow and is run off
//! the session loop; the encoded bytes are delivered later as an
//! [`EncodedClip`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stopmo_common::error::{StopmoError, StopmoResult};

use crate::surface::Surface;

pub mod ffmpeg;
pub mod gif;
pub mod memory;

pub use ffmpeg::FfmpegStreamEncoder;
pub use gif::GifStreamEncoder;
pub use memory::MemoryStreamEncoder;

/// Trait for encoders fed by surface capture (GIF, FFmpeg, in-memory).
pub trait StreamEncoder: Send {
    /// Begin a capture of `width x height` frames at `fps`.
    fn start_capture(&mut self, width: u32, height: u32, fps: u32) -> StopmoResult<()>;

    /// Sample the surface into the stream as the next frame.
    fn capture(&mut self, surface: &Surface) -> StopmoResult<()>;

    /// Stop capturing and produce the encoded clip.
    fn finish(self: Box<Self>) -> StopmoResult<EncodedClip>;

    /// Stop capturing and discard everything captured so far.
    fn abort(self: Box<Self>);

    /// Number of frames captured since `start_capture`.
    fn frames_captured(&self) -> usize;

    /// Check if this encoder can run on this system.
    fn is_available(&self) -> bool;

    /// Encoder name for logging.
    fn name(&self) -> &str;
}

/// Output container of an encoded clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipFormat {
    Gif,
    Webm,
    Mp4,
    /// Concatenated RGBA frames, no container.
    Raw,
}

impl ClipFormat {
    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            ClipFormat::Gif => "gif",
            ClipFormat::Webm => "webm",
            ClipFormat::Mp4 => "mp4",
            ClipFormat::Raw => "rgba",
        }
    }
}

impl fmt::Display for ClipFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClipFormat::Gif => "gif",
            ClipFormat::Webm => "webm",
            ClipFormat::Mp4 => "mp4",
            ClipFormat::Raw => "raw",
        };
        f.write_str(name)
    }
}

impl FromStr for ClipFormat {
    type Err = StopmoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gif" => Ok(ClipFormat::Gif),
            "webm" => Ok(ClipFormat::Webm),
            "mp4" => Ok(ClipFormat::Mp4),
            "raw" | "rgba" => Ok(ClipFormat::Raw),
            _ => Err(StopmoError::config(format!(
                "Unknown format: {s}. Use: gif, webm, mp4, raw"
            ))),
        }
    }
}

/// The finished artifact of an export.
#[derive(Clone)]
pub struct EncodedClip {
    pub format: ClipFormat,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub frames: usize,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for EncodedClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedClip")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("fps", &self.fps)
            .field("frames", &self.frames)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Dimensions and rate negotiated at `start_capture`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSpec {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl CaptureSpec {
    pub fn new(width: u32, height: u32, fps: u32) -> StopmoResult<Self> {
        if width == 0 || height == 0 {
            return Err(StopmoError::encoder_unavailable(format!(
                "cannot capture a {width}x{height} surface"
            )));
        }
        if fps == 0 {
            return Err(StopmoError::encoder_unavailable("capture fps must be non-zero"));
        }
        Ok(Self { width, height, fps })
    }

    /// Byte length of one RGBA frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Reject surfaces whose buffer no longer matches the negotiated size.
    pub fn check(&self, surface: &Surface) -> StopmoResult<()> {
        if surface.size() != (self.width, self.height) {
            let (w, h) = surface.size();
            return Err(StopmoError::encoder(format!(
                "surface is {w}x{h} but capture was started at {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Build the default encoder for a clip format.
pub fn encoder_for(format: ClipFormat) -> Box<dyn StreamEncoder> {
    match format {
        ClipFormat::Gif => Box::new(GifStreamEncoder::new()),
        ClipFormat::Webm | ClipFormat::Mp4 => Box::new(FfmpegStreamEncoder::new(format)),
        ClipFormat::Raw => Box::new(MemoryStreamEncoder::new()),
    }
}
