//! Test doubles shared by the sequencer's unit tests.

use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};
use stopmo_common::config::SurfaceConfig;
use stopmo_common::error::{StopmoError, StopmoResult};
use stopmo_project_model::{Frame, SourceHandle};
use stopmo_render_engine::encoder::{ClipFormat, EncodedClip, StreamEncoder};
use stopmo_render_engine::surface::Surface;

use crate::gallery::GalleryView;
use crate::loader::{ImageLoader, ImageSource};
use crate::session::Session;

/// Side length of test bitmaps and of the test surface.
pub const SIDE: u32 = 4;

pub fn solid_frame(label: &str, color: [u8; 4]) -> Frame {
    Frame::new(
        SourceHandle::new(label),
        RgbaImage::from_pixel(SIDE, SIDE, Rgba(color)),
    )
}

pub fn empty_session() -> Session {
    Session::new(
        "test",
        SurfaceConfig {
            width: SIDE,
            height: SIDE,
        },
    )
}

/// Session holding one solid frame per colour, labelled `f0`, `f1`, ...
pub fn session_with(colors: &[[u8; 4]]) -> Session {
    let mut session = empty_session();
    for (i, color) in colors.iter().enumerate() {
        session.import(solid_frame(&format!("f{i}"), *color));
    }
    session
}

/// Session whose frames carry the given labels.
pub fn labelled_session(labels: &[&str]) -> Session {
    let mut session = empty_session();
    for (i, label) in labels.iter().enumerate() {
        session.import(solid_frame(label, [i as u8, 0, 0, 255]));
    }
    session
}

/// Gallery that records `(len, current)` on every refresh.
pub struct RecordingGallery {
    log: Arc<Mutex<Vec<(usize, Option<usize>)>>>,
}

impl RecordingGallery {
    pub fn new() -> (Self, Arc<Mutex<Vec<(usize, Option<usize>)>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (Self { log: log.clone() }, log)
    }
}

impl GalleryView for RecordingGallery {
    fn refresh(&mut self, frames: &[Frame], current: Option<usize>) {
        self.log.lock().unwrap().push((frames.len(), current));
    }
}

/// Loader for `ImageSource::Bytes` holding exactly one RGBA pixel, which is
/// expanded into a solid test bitmap. Anything else fails to decode.
pub struct SolidLoader;

impl SolidLoader {
    pub fn source(label: &str, color: [u8; 4]) -> ImageSource {
        ImageSource::bytes(label, color.to_vec())
    }
}

impl ImageLoader for SolidLoader {
    fn load(&self, source: &ImageSource) -> StopmoResult<RgbaImage> {
        match source {
            ImageSource::Bytes { bytes, .. } if bytes.len() == 4 => Ok(RgbaImage::from_pixel(
                SIDE,
                SIDE,
                Rgba([bytes[0], bytes[1], bytes[2], bytes[3]]),
            )),
            _ => Err(StopmoError::decode(source.label(), "not a test pixel")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    Start(u32, u32, u32),
    /// Centre pixel of the captured surface.
    Capture([u8; 4]),
    Finish,
    Abort,
}

/// Encoder that logs every call and can be told to fail.
pub struct RecordingEncoder {
    events: Arc<Mutex<Vec<EncoderEvent>>>,
    available: bool,
    fail_after: Option<usize>,
    keep_limit: Option<usize>,
    captured: usize,
    spec: (u32, u32, u32),
}

impl RecordingEncoder {
    pub fn new() -> (Self, Arc<Mutex<Vec<EncoderEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                events: events.clone(),
                available: true,
                fail_after: None,
                keep_limit: None,
                captured: 0,
                spec: (0, 0, 0),
            },
            events,
        )
    }

    pub fn unavailable() -> (Self, Arc<Mutex<Vec<EncoderEvent>>>) {
        let (mut encoder, events) = Self::new();
        encoder.available = false;
        (encoder, events)
    }

    /// Captures succeed `n` times, then fail.
    pub fn failing_after(n: usize) -> (Self, Arc<Mutex<Vec<EncoderEvent>>>) {
        let (mut encoder, events) = Self::new();
        encoder.fail_after = Some(n);
        (encoder, events)
    }

    /// Captures report success but only the first `n` are kept.
    pub fn dropping_after(n: usize) -> (Self, Arc<Mutex<Vec<EncoderEvent>>>) {
        let (mut encoder, events) = Self::new();
        encoder.keep_limit = Some(n);
        (encoder, events)
    }

    fn record(&self, event: EncoderEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl StreamEncoder for RecordingEncoder {
    fn start_capture(&mut self, width: u32, height: u32, fps: u32) -> StopmoResult<()> {
        if !self.available {
            return Err(StopmoError::encoder_unavailable("recording encoder disabled"));
        }
        self.spec = (width, height, fps);
        self.record(EncoderEvent::Start(width, height, fps));
        Ok(())
    }

    fn capture(&mut self, surface: &Surface) -> StopmoResult<()> {
        if self.fail_after.is_some_and(|n| self.captured >= n) {
            return Err(StopmoError::encoder("capture failed"));
        }
        let center = surface
            .pixels()
            .get_pixel(surface.width() / 2, surface.height() / 2);
        self.record(EncoderEvent::Capture(center.0));
        if self.keep_limit.map_or(true, |n| self.captured < n) {
            self.captured += 1;
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> StopmoResult<EncodedClip> {
        self.record(EncoderEvent::Finish);
        let (width, height, fps) = self.spec;
        Ok(EncodedClip {
            format: ClipFormat::Raw,
            width,
            height,
            fps,
            frames: self.captured,
            bytes: Vec::new(),
        })
    }

    fn abort(self: Box<Self>) {
        self.record(EncoderEvent::Abort);
    }

    fn frames_captured(&self) -> usize {
        self.captured
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn name(&self) -> &str {
        "recording"
    }
}
