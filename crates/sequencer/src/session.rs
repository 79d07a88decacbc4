//! Editing session management.

use stopmo_common::config::SurfaceConfig;
use stopmo_common::error::{StopmoError, StopmoResult};
use stopmo_project_model::{DisplayMode, DriverState, Frame, FrameStore, ProjectSummary};
use stopmo_render_engine::compositor;
use stopmo_render_engine::surface::Surface;

use crate::export::ExportRun;
use crate::gallery::{GalleryView, TracingGallery};
use crate::playback::PlaybackRun;
use crate::reorder::DragTracker;

/// The mechanism that currently owns the cursor, with its run state.
pub(crate) enum Driver {
    Idle,
    Previewing(PlaybackRun),
    Exporting(ExportRun),
}

impl Driver {
    pub(crate) fn state(&self) -> DriverState {
        match self {
            Driver::Idle => DriverState::Idle,
            Driver::Previewing(_) => DriverState::Previewing,
            Driver::Exporting(_) => DriverState::Exporting,
        }
    }
}

/// A stop-motion editing session.
///
/// Holds the frame store, display mode, active driver and the render
/// surface. Every mutation that can change what is visible ends in exactly
/// one compositor redraw, and every change to the frames or cursor is
/// pushed to the gallery view.
pub struct Session {
    name: String,
    pub(crate) store: FrameStore,
    pub(crate) mode: DisplayMode,
    pub(crate) driver: Driver,
    pub(crate) surface: Surface,
    pub(crate) drag: DragTracker,
    pending_layout: Option<(u32, u32)>,
    gallery: Box<dyn GalleryView>,
    redraws: u64,
}

impl Session {
    /// Create an empty session with a surface of the configured layout size.
    pub fn new(name: impl Into<String>, surface: SurfaceConfig) -> Self {
        Self {
            name: name.into(),
            store: FrameStore::new(),
            mode: DisplayMode::Compare,
            driver: Driver::Idle,
            surface: Surface::new(surface.width, surface.height),
            drag: DragTracker::default(),
            pending_layout: None,
            gallery: Box::new(TracingGallery),
            redraws: 0,
        }
    }

    /// Replace the gallery view.
    pub fn with_gallery(mut self, gallery: Box<dyn GalleryView>) -> Self {
        self.gallery = gallery;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    pub fn cursor(&self) -> Option<usize> {
        self.store.cursor()
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn driver_state(&self) -> DriverState {
        self.driver.state()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Number of compositor redraws performed so far.
    pub fn redraw_count(&self) -> u64 {
        self.redraws
    }

    /// Summary of the current sequence for the save collaborator.
    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary::from_store(&self.name, &self.store)
    }

    /// Append a decoded frame to the end of the sequence.
    ///
    /// Appending never changes what a running driver shows, so the surface
    /// is only redrawn while idle.
    pub fn import(&mut self, frame: Frame) -> usize {
        tracing::debug!(source = %frame.source(), width = frame.width(), height = frame.height(), "Frame imported");
        self.store.append(frame);
        self.notify_gallery();
        if self.driver_state().is_idle() {
            self.redraw();
        }
        self.store.len() - 1
    }

    /// Manually select a frame.
    ///
    /// Stops an active preview first. Rejected (returns `Ok(false)`) while
    /// exporting.
    pub fn select(&mut self, index: usize) -> StopmoResult<bool> {
        if index >= self.store.len() {
            return Err(StopmoError::index_out_of_range(index, self.store.len()));
        }
        if !self.take_manual_control("select frame") {
            return Ok(false);
        }
        self.drag.cancel();
        self.store.set_cursor(index)?;
        self.notify_gallery();
        self.redraw();
        Ok(true)
    }

    /// Remove a frame, handing it back so its source can be released.
    ///
    /// Stops an active preview first. Rejected (returns `Ok(None)`) while
    /// exporting.
    pub fn remove(&mut self, index: usize) -> StopmoResult<Option<Frame>> {
        if index >= self.store.len() {
            return Err(StopmoError::index_out_of_range(index, self.store.len()));
        }
        if !self.take_manual_control("remove frame") {
            return Ok(None);
        }
        self.drag.cancel();
        let frame = self.store.remove(index)?;
        tracing::info!(source = %frame.source(), remaining = self.store.len(), "Frame removed");
        self.notify_gallery();
        if self.store.is_empty() {
            self.surface.sync_to_layout();
            self.surface.clear();
            self.redraws += 1;
        } else {
            self.redraw();
        }
        Ok(Some(frame))
    }

    /// Record a new on-screen size for the surface.
    ///
    /// While exporting the change is deferred until the export ends so the
    /// encoder keeps receiving frames of the negotiated size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            tracing::debug!(width, height, "Ignoring empty surface layout");
            return;
        }
        if matches!(self.driver, Driver::Exporting(_)) {
            tracing::debug!(width, height, "Deferring resize until export ends");
            self.pending_layout = Some((width, height));
            return;
        }
        self.surface.set_layout_size(width, height);
        self.redraw();
    }

    /// Redraw the surface from the store and current mode.
    pub(crate) fn redraw(&mut self) {
        compositor::render(&mut self.surface, &self.store, self.mode);
        if !self.store.is_empty() {
            self.redraws += 1;
        }
    }

    pub(crate) fn notify_gallery(&mut self) {
        self.gallery.refresh(self.store.frames(), self.store.cursor());
    }

    /// Apply a resize that arrived during an export.
    pub(crate) fn apply_pending_layout(&mut self) {
        if let Some((width, height)) = self.pending_layout.take() {
            self.surface.set_layout_size(width, height);
        }
    }

    /// Reject with `ReentrantOperation` unless no driver is active.
    pub(crate) fn ensure_idle(&self, action: &str) -> StopmoResult<()> {
        match self.driver_state() {
            DriverState::Idle => Ok(()),
            state => Err(StopmoError::reentrant(format!(
                "cannot {action} while {state:?}"
            ))),
        }
    }

    /// Give the cursor back to the user: a running preview is stopped,
    /// a running export wins and the action is rejected.
    fn take_manual_control(&mut self, action: &str) -> bool {
        if matches!(self.driver, Driver::Previewing(_)) {
            self.stop_playback();
        }
        match self.ensure_idle(action) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Manual action rejected");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reorder::{DropSide, ReorderGesture};
    use crate::testing::{session_with, RecordingGallery};
    use proptest::prelude::*;

    #[test]
    fn test_first_import_draws_frame_zero() {
        let mut session = session_with(&[]);
        assert_eq!(session.redraw_count(), 0);

        let index = session.import(crate::testing::solid_frame("a", [255, 0, 0, 255]));

        assert_eq!(index, 0);
        assert_eq!(session.cursor(), Some(0));
        assert_eq!(session.redraw_count(), 1);
        assert_eq!(session.surface().pixels().get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_select_out_of_range_is_error() {
        let mut session = session_with(&[[1, 1, 1, 255]]);
        assert!(matches!(
            session.select(3),
            Err(StopmoError::IndexOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn test_select_stops_preview_and_returns_to_compare() {
        let mut session = session_with(&[[1, 1, 1, 255], [2, 2, 2, 255], [3, 3, 3, 255]]);
        assert!(session.start_playback());
        assert_eq!(session.mode(), DisplayMode::Single);

        assert!(session.select(2).unwrap());

        assert_eq!(session.driver_state(), DriverState::Idle);
        assert_eq!(session.mode(), DisplayMode::Compare);
        assert_eq!(session.cursor(), Some(2));
    }

    #[test]
    fn test_gallery_sees_every_cursor_change() {
        let (gallery, log) = RecordingGallery::new();
        let mut session = session_with(&[[1, 1, 1, 255], [2, 2, 2, 255]]).with_gallery(Box::new(gallery));

        session.select(1).unwrap();
        session.select(0).unwrap();

        let seen = log.lock().unwrap().clone();
        assert_eq!(seen, vec![(2, Some(1)), (2, Some(0))]);
    }

    #[test]
    fn test_remove_last_frame_clears_surface() {
        let mut session = session_with(&[[9, 9, 9, 255]]);
        let removed = session.remove(0).unwrap().unwrap();
        assert_eq!(removed.source().label(), "f0");
        assert_eq!(session.cursor(), None);
        assert!(session.surface().as_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_resize_redraws_at_new_size() {
        let mut session = session_with(&[[9, 9, 9, 255]]);
        session.resize(8, 2);
        assert_eq!(session.surface().size(), (8, 2));
    }

    #[test]
    fn test_ensure_idle_reports_reentrant() {
        let mut session = session_with(&[[1, 1, 1, 255]]);
        session.start_playback();
        let err = session.ensure_idle("export").unwrap_err();
        assert!(err.is_rejection());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Import(u8),
        Select(usize),
        Remove(usize),
        Reorder(usize, usize, bool),
        BeginDrag(usize),
        CancelDrag,
        Drop(usize, f64),
        Play,
        StopPlayback,
        PlaybackTick,
        Export,
        ExportTick,
        CancelExport,
        Resize(u32, u32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<u8>().prop_map(Op::Import),
            (0usize..8).prop_map(Op::Select),
            (0usize..8).prop_map(Op::Remove),
            (0usize..8, 0usize..8, any::<bool>()).prop_map(|(a, b, after)| Op::Reorder(a, b, after)),
            (0usize..8).prop_map(Op::BeginDrag),
            Just(Op::CancelDrag),
            (0usize..8, 0.0f64..10.0).prop_map(|(t, x)| Op::Drop(t, x)),
            Just(Op::Play),
            Just(Op::StopPlayback),
            Just(Op::PlaybackTick),
            Just(Op::Export),
            Just(Op::ExportTick),
            Just(Op::CancelExport),
            (0u32..9, 0u32..9).prop_map(|(w, h)| Op::Resize(w, h)),
        ]
    }

    fn apply(session: &mut Session, op: Op) {
        match op {
            Op::Import(shade) => {
                session.import(crate::testing::solid_frame("p", [shade, shade, shade, 255]));
            }
            Op::Select(i) => {
                let _ = session.select(i);
            }
            Op::Remove(i) => {
                let _ = session.remove(i);
            }
            Op::Reorder(a, b, after) => {
                let side = if after { DropSide::After } else { DropSide::Before };
                let _ = session.reorder(ReorderGesture::new(a, b, side));
            }
            Op::BeginDrag(i) => {
                let _ = session.begin_drag(i);
            }
            Op::CancelDrag => {
                session.cancel_drag();
            }
            Op::Drop(target, x) => {
                let _ = session.drop_on(target, x, 0.0, 10.0);
            }
            Op::Play => {
                session.start_playback();
            }
            Op::StopPlayback => {
                session.stop_playback();
            }
            Op::PlaybackTick => {
                session.playback_tick();
            }
            Op::Export => {
                let (encoder, _) = crate::testing::RecordingEncoder::new();
                let _ = session.start_export(Box::new(encoder));
            }
            Op::ExportTick => {
                session.export_tick();
            }
            Op::CancelExport => {
                session.cancel_export();
            }
            Op::Resize(w, h) => session.resize(w, h),
        }
    }

    proptest! {
        #[test]
        fn prop_session_keeps_cursor_and_mode_consistent(
            ops in proptest::collection::vec(op_strategy(), 0..96),
        ) {
            let mut session = session_with(&[]);
            for op in ops {
                apply(&mut session, op);

                match session.cursor() {
                    Some(cursor) => prop_assert!(cursor < session.store().len()),
                    None => prop_assert!(session.store().is_empty()),
                }
                let idle = session.driver_state() == DriverState::Idle;
                let compare = session.mode() == DisplayMode::Compare;
                prop_assert_eq!(idle, compare);
                if session.driver_state() == DriverState::Exporting {
                    prop_assert!(!session.is_dragging());
                }
            }
        }
    }
}
