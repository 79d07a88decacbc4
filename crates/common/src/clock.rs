//! Tick cadence for the playback and export drivers.
//!
//! Both timer drivers run on a fixed 500 ms period, and the export capture
//! rate is chosen so that every real-time tick maps to exactly one encoded
//! frame. This module keeps those constants in one place and provides a
//! small [`Cadence`] helper for converting between rates, periods and
//! frame timestamps.

use std::time::Duration;

/// Period of the interactive playback tick.
pub const PLAYBACK_TICK: Duration = Duration::from_millis(500);

/// Period of the export tick.
pub const EXPORT_TICK: Duration = Duration::from_millis(500);

/// Encoder capture rate in frames per second.
pub const CAPTURE_FPS: u32 = 2;

/// A fixed-rate cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    period: Duration,
}

impl Cadence {
    /// Cadence with the given period.
    pub fn from_period(period: Duration) -> Self {
        Self { period }
    }

    /// Cadence ticking `fps` times per second.
    pub fn from_fps(fps: u32) -> Self {
        Self {
            period: Duration::from_nanos(1_000_000_000 / fps.max(1) as u64),
        }
    }

    /// The tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Period in whole milliseconds.
    pub fn period_ms(&self) -> u64 {
        self.period.as_millis() as u64
    }

    /// Timestamp of frame `index` from the start of the stream.
    pub fn frame_time(&self, index: usize) -> Duration {
        self.period * index as u32
    }

    /// Whether one tick of this cadence corresponds to exactly one frame
    /// captured at `fps`.
    pub fn matches_fps(&self, fps: u32) -> bool {
        *self == Self::from_fps(fps)
    }
}
