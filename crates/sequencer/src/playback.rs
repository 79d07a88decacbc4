//! Playback controller: steps the cursor forward on a fixed cadence.
//!
//! The controller only owns the state transitions. The runner owns the
//! interval and calls [`Session::playback_tick`] each time it fires.

use stopmo_project_model::DisplayMode;

use crate::session::{Driver, Session};

/// Run state of an active preview.
#[derive(Debug, Default)]
pub(crate) struct PlaybackRun {
    ticks: u64,
}

/// Outcome of one playback tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackTick {
    /// The cursor moved to this index and the surface was redrawn.
    Advanced(usize),
    /// The last frame was already showing; playback stopped itself.
    Finished,
    /// No preview is running.
    Inactive,
}

impl Session {
    /// Start previewing from the current cursor.
    ///
    /// Returns `false` without side effects when the store is empty or
    /// another driver is active.
    pub fn start_playback(&mut self) -> bool {
        if self.store.is_empty() {
            tracing::debug!("Nothing to play back");
            return false;
        }
        if let Err(e) = self.ensure_idle("start playback") {
            tracing::debug!(error = %e, "Playback not started");
            return false;
        }

        self.driver = Driver::Previewing(PlaybackRun::default());
        self.mode = DisplayMode::Single;
        self.redraw();
        tracing::info!(from = ?self.store.cursor(), frames = self.store.len(), "Playback started");
        true
    }

    /// Advance the preview by one frame.
    pub fn playback_tick(&mut self) -> PlaybackTick {
        let Driver::Previewing(run) = &mut self.driver else {
            return PlaybackTick::Inactive;
        };
        run.ticks += 1;

        if !self.store.advance_cursor() {
            self.stop_playback();
            return PlaybackTick::Finished;
        }

        self.notify_gallery();
        self.redraw();
        match self.store.cursor() {
            Some(index) => PlaybackTick::Advanced(index),
            None => PlaybackTick::Finished,
        }
    }

    /// Stop the preview and return to the onion-skin view.
    ///
    /// Returns whether a preview was actually running.
    pub fn stop_playback(&mut self) -> bool {
        let Driver::Previewing(run) = &self.driver else {
            return false;
        };
        tracing::info!(ticks = run.ticks, cursor = ?self.store.cursor(), "Playback stopped");

        self.driver = Driver::Idle;
        self.mode = DisplayMode::Compare;
        self.redraw();
        true
    }
}
