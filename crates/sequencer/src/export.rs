//! Export controller: drives the cursor once through the sequence while
//! the render surface is captured into a stream encoder.

use stopmo_common::clock::CAPTURE_FPS;
use stopmo_common::error::{StopmoError, StopmoResult};
use stopmo_project_model::DisplayMode;
use stopmo_render_engine::encoder::{EncodedClip, StreamEncoder};

use crate::session::{Driver, Session};

/// Run state of an active export. Owns the encoder for its lifetime.
pub(crate) struct ExportRun {
    encoder: Box<dyn StreamEncoder>,
    emitted: usize,
    total: usize,
}

/// Outcome of one export tick.
pub enum ExportTick {
    /// This frame index was drawn and captured.
    Emitted(usize),
    /// Every frame was captured; the encoder awaits finalization.
    Completed(PendingExport),
    /// Capturing failed and the export was aborted.
    Failed(StopmoError),
    /// No export is running.
    Inactive,
}

impl std::fmt::Debug for ExportTick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportTick::Emitted(index) => f.debug_tuple("Emitted").field(index).finish(),
            ExportTick::Completed(pending) => f
                .debug_struct("Completed")
                .field("frames", &pending.frames)
                .finish(),
            ExportTick::Failed(error) => f.debug_tuple("Failed").field(error).finish(),
            ExportTick::Inactive => f.write_str("Inactive"),
        }
    }
}

/// A finished capture whose encoder still has to produce the clip.
///
/// Finalization may be slow, so it is handed out of the session and run
/// off the dispatch loop.
pub struct PendingExport {
    encoder: Box<dyn StreamEncoder>,
    frames: usize,
}

impl PendingExport {
    /// Number of frames captured.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Name of the encoder that will finalize the clip.
    pub fn encoder_name(&self) -> &str {
        self.encoder.name()
    }

    /// Finalize the clip. Blocking.
    pub fn finish(self) -> StopmoResult<EncodedClip> {
        self.encoder.finish()
    }
}

impl Session {
    /// Begin exporting the whole sequence through `encoder`.
    ///
    /// Returns `Ok(false)` when there is nothing to export or an export is
    /// already running. A running preview is stopped first. When the
    /// encoder cannot start, `EncoderUnavailable` is returned and the
    /// session stays idle.
    pub fn start_export(&mut self, mut encoder: Box<dyn StreamEncoder>) -> StopmoResult<bool> {
        if self.store.is_empty() {
            tracing::debug!("Nothing to export");
            return Ok(false);
        }
        if matches!(self.driver, Driver::Exporting(_)) {
            tracing::debug!(
                error = %StopmoError::reentrant("export already running"),
                "Export not started"
            );
            return Ok(false);
        }
        self.stop_playback();

        let (width, height) = self.surface.layout_size();
        if let Err(e) = encoder.start_capture(width, height, CAPTURE_FPS) {
            tracing::warn!(encoder = encoder.name(), error = %e, "Encoder failed to start");
            return Err(match e {
                StopmoError::EncoderUnavailable { .. } => e,
                other => StopmoError::encoder_unavailable(other.to_string()),
            });
        }

        let total = self.store.len();
        tracing::info!(encoder = encoder.name(), frames = total, width, height, fps = CAPTURE_FPS, "Export started");
        self.driver = Driver::Exporting(ExportRun {
            encoder,
            emitted: 0,
            total,
        });
        self.drag.cancel();
        self.mode = DisplayMode::Single;
        self.store.set_cursor(0)?;
        self.notify_gallery();
        Ok(true)
    }

    /// Draw and capture the next frame, or complete the export.
    pub fn export_tick(&mut self) -> ExportTick {
        let (emitted, total) = match &self.driver {
            Driver::Exporting(run) => (run.emitted, run.total),
            _ => return ExportTick::Inactive,
        };

        if emitted >= total {
            if let Driver::Exporting(run) = &self.driver {
                let captured = run.encoder.frames_captured();
                if captured != emitted {
                    return self.fail_export(StopmoError::encoder(format!(
                        "encoder kept {captured} of {emitted} captured frames"
                    )));
                }
            }
            return match self.end_export() {
                Some(run) => {
                    tracing::info!(frames = run.emitted, "Export capture complete");
                    ExportTick::Completed(PendingExport {
                        encoder: run.encoder,
                        frames: run.emitted,
                    })
                }
                None => ExportTick::Inactive,
            };
        }

        if let Err(e) = self.store.set_cursor(emitted) {
            return self.fail_export(e);
        }
        self.notify_gallery();
        self.redraw();

        let Driver::Exporting(run) = &mut self.driver else {
            return ExportTick::Inactive;
        };
        if let Err(e) = run.encoder.capture(&self.surface) {
            return self.fail_export(e);
        }
        run.emitted += 1;
        tracing::debug!(index = emitted, total, "Frame captured");
        ExportTick::Emitted(emitted)
    }

    /// Abandon a running export, discarding the partial capture.
    ///
    /// Returns whether an export was running.
    pub fn cancel_export(&mut self) -> bool {
        match self.end_export() {
            Some(run) => {
                tracing::info!(captured = run.emitted, total = run.total, "Export cancelled");
                run.encoder.abort();
                true
            }
            None => false,
        }
    }

    fn fail_export(&mut self, error: StopmoError) -> ExportTick {
        if let Some(run) = self.end_export() {
            tracing::error!(error = %error, captured = run.emitted, "Export aborted");
            run.encoder.abort();
        }
        ExportTick::Failed(error)
    }

    /// Leave the exporting state and hand back the run.
    fn end_export(&mut self) -> Option<ExportRun> {
        if !matches!(self.driver, Driver::Exporting(_)) {
            return None;
        }
        let Driver::Exporting(run) = std::mem::replace(&mut self.driver, Driver::Idle) else {
            return None;
        };
        self.mode = DisplayMode::Compare;
        self.apply_pending_layout();
        self.redraw();
        Some(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{session_with, EncoderEvent, RecordingEncoder};
    use stopmo_project_model::DriverState;

    const RGB: [[u8; 4]; 3] = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]];

    #[test]
    fn test_three_frames_three_captures() {
        let mut session = session_with(&RGB);
        let (encoder, events) = RecordingEncoder::new();

        assert!(session.start_export(Box::new(encoder)).unwrap());
        assert_eq!(session.driver_state(), DriverState::Exporting);
        assert_eq!(session.mode(), DisplayMode::Single);

        let mut cursors = Vec::new();
        let pending = loop {
            match session.export_tick() {
                ExportTick::Emitted(index) => cursors.push(session.cursor().unwrap_or(index)),
                ExportTick::Completed(pending) => break pending,
                other => panic!("unexpected tick {other:?}"),
            }
        };

        assert_eq!(cursors, vec![0, 1, 2]);
        assert_eq!(pending.frames(), 3);
        assert_eq!(session.driver_state(), DriverState::Idle);
        assert_eq!(session.mode(), DisplayMode::Compare);

        let clip = pending.finish().unwrap();
        assert_eq!(clip.frames, 3);

        let log = events.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                EncoderEvent::Start(4, 4, 2),
                EncoderEvent::Capture([255, 0, 0, 255]),
                EncoderEvent::Capture([0, 255, 0, 255]),
                EncoderEvent::Capture([0, 0, 255, 255]),
                EncoderEvent::Finish,
            ]
        );
        assert!(matches!(session.export_tick(), ExportTick::Inactive));
    }

    #[test]
    fn test_export_preempts_preview() {
        let mut session = session_with(&RGB);
        session.select(1).unwrap();
        session.start_playback();
        assert_eq!(session.driver_state(), DriverState::Previewing);

        let (encoder, _) = RecordingEncoder::new();
        assert!(session.start_export(Box::new(encoder)).unwrap());

        assert_eq!(session.driver_state(), DriverState::Exporting);
        assert_eq!(session.cursor(), Some(0));
        assert_eq!(session.playback_tick(), crate::PlaybackTick::Inactive);
    }

    #[test]
    fn test_unavailable_encoder_keeps_idle() {
        let mut session = session_with(&RGB);
        let (encoder, events) = RecordingEncoder::unavailable();

        let err = session.start_export(Box::new(encoder)).unwrap_err();

        assert!(matches!(err, StopmoError::EncoderUnavailable { .. }));
        assert_eq!(session.driver_state(), DriverState::Idle);
        assert_eq!(session.mode(), DisplayMode::Compare);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_capture_failure_aborts() {
        let mut session = session_with(&RGB);
        let (encoder, events) = RecordingEncoder::failing_after(1);
        session.start_export(Box::new(encoder)).unwrap();

        assert!(matches!(session.export_tick(), ExportTick::Emitted(0)));
        assert!(matches!(session.export_tick(), ExportTick::Failed(StopmoError::Encoder { .. })));

        assert_eq!(session.driver_state(), DriverState::Idle);
        assert_eq!(session.mode(), DisplayMode::Compare);
        assert_eq!(events.lock().unwrap().last(), Some(&EncoderEvent::Abort));
    }

    #[test]
    fn test_empty_store_and_reentry_rejected() {
        let mut empty = session_with(&[]);
        let (encoder, _) = RecordingEncoder::new();
        assert!(!empty.start_export(Box::new(encoder)).unwrap());

        let mut session = session_with(&RGB);
        let (first, _) = RecordingEncoder::new();
        let (second, second_events) = RecordingEncoder::new();
        assert!(session.start_export(Box::new(first)).unwrap());
        assert!(!session.start_export(Box::new(second)).unwrap());
        assert!(second_events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_frames_imported_mid_export_are_not_captured() {
        let mut session = session_with(&RGB[..2]);
        let (encoder, events) = RecordingEncoder::new();
        session.start_export(Box::new(encoder)).unwrap();

        session.export_tick();
        session.import(crate::testing::solid_frame("late", [9, 9, 9, 255]));
        session.export_tick();
        let ExportTick::Completed(pending) = session.export_tick() else {
            panic!("export should complete after two frames");
        };

        assert_eq!(pending.frames(), 2);
        assert_eq!(session.store().len(), 3);
        let captures = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, EncoderEvent::Capture(_)))
            .count();
        assert_eq!(captures, 2);
    }

    #[test]
    fn test_lost_captures_fail_the_export() {
        let mut session = session_with(&RGB);
        let (encoder, events) = RecordingEncoder::dropping_after(2);
        session.start_export(Box::new(encoder)).unwrap();

        for index in 0..3 {
            assert!(matches!(session.export_tick(), ExportTick::Emitted(i) if i == index));
        }
        assert!(matches!(session.export_tick(), ExportTick::Failed(StopmoError::Encoder { .. })));

        assert_eq!(session.driver_state(), DriverState::Idle);
        assert_eq!(session.mode(), DisplayMode::Compare);
        assert_eq!(events.lock().unwrap().last(), Some(&EncoderEvent::Abort));
    }

    #[test]
    fn test_cancel_discards_capture() {
        let mut session = session_with(&RGB);
        let (encoder, events) = RecordingEncoder::new();
        session.start_export(Box::new(encoder)).unwrap();
        session.export_tick();

        assert!(session.cancel_export());
        assert!(!session.cancel_export());
        assert_eq!(session.driver_state(), DriverState::Idle);
        assert_eq!(events.lock().unwrap().last(), Some(&EncoderEvent::Abort));
    }

    #[test]
    fn test_resize_deferred_until_export_ends() {
        let mut session = session_with(&RGB);
        let (encoder, _) = RecordingEncoder::new();
        session.start_export(Box::new(encoder)).unwrap();
        session.export_tick();

        session.resize(8, 8);
        assert_eq!(session.surface().layout_size(), (4, 4));
        session.export_tick();

        session.cancel_export();
        assert_eq!(session.surface().size(), (8, 8));
    }

    #[test]
    fn test_manual_actions_rejected_while_exporting() {
        let mut session = session_with(&RGB);
        let (encoder, _) = RecordingEncoder::new();
        session.start_export(Box::new(encoder)).unwrap();

        assert!(!session.select(2).unwrap());
        assert!(session.remove(0).unwrap().is_none());
        assert!(!session.start_playback());
        assert_eq!(session.store().len(), 3);
    }
}
