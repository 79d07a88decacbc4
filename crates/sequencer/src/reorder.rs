//! Drag-and-drop reordering of the frame sequence.

use stopmo_common::error::{StopmoError, StopmoResult};

use crate::session::{Driver, Session};

/// Which half of the drop target the pointer was released over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropSide {
    Before,
    After,
}

impl DropSide {
    /// Classify a pointer position against the target's horizontal bounds.
    /// The exact midpoint counts as `Before`.
    pub fn from_pointer(pointer_x: f64, target_left: f64, target_width: f64) -> Self {
        if pointer_x > target_left + target_width / 2.0 {
            DropSide::After
        } else {
            DropSide::Before
        }
    }
}

/// A completed drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderGesture {
    pub dragged: usize,
    pub target: usize,
    pub side: DropSide,
}

impl ReorderGesture {
    pub fn new(dragged: usize, target: usize, side: DropSide) -> Self {
        Self {
            dragged,
            target,
            side,
        }
    }

    /// Index the dragged frame lands on once moved, in post-removal
    /// indexing. `None` when the gesture does not change anything.
    pub fn insertion_index(&self, len: usize) -> Option<usize> {
        if self.dragged == self.target || len == 0 {
            return None;
        }
        let mut insert = self.target;
        if self.dragged < self.target {
            insert -= 1;
        }
        if self.side == DropSide::After {
            insert += 1;
        }
        Some(insert.min(len - 1))
    }
}

/// Remembers the frame picked up at drag start until it is dropped.
#[derive(Debug, Default)]
pub struct DragTracker {
    dragged: Option<usize>,
}

impl DragTracker {
    pub fn begin(&mut self, index: usize) {
        self.dragged = Some(index);
    }

    pub fn cancel(&mut self) {
        self.dragged = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragged.is_some()
    }

    /// Consume the drag; a second drop needs a new `begin`.
    pub fn take(&mut self) -> Option<usize> {
        self.dragged.take()
    }
}

impl Session {
    /// Record the start of a drag on a gallery item.
    ///
    /// Rejected (returns `Ok(false)`) while exporting.
    pub fn begin_drag(&mut self, index: usize) -> StopmoResult<bool> {
        if index >= self.store.len() {
            return Err(StopmoError::index_out_of_range(index, self.store.len()));
        }
        if matches!(self.driver, Driver::Exporting(_)) {
            tracing::debug!(index, "Drag rejected while exporting");
            return Ok(false);
        }
        tracing::trace!(index, "Drag started");
        self.drag.begin(index);
        Ok(true)
    }

    /// Abandon a drag released outside any gallery item.
    ///
    /// Returns whether a drag was in progress.
    pub fn cancel_drag(&mut self) -> bool {
        let dragging = self.drag.is_dragging();
        if dragging {
            tracing::trace!("Drag cancelled");
        }
        self.drag.cancel();
        dragging
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Finish a drag over `target`, given the pointer position and the
    /// target's horizontal bounds.
    ///
    /// Returns whether the sequence changed. A drop without a preceding
    /// `begin_drag` does nothing.
    pub fn drop_on(
        &mut self,
        target: usize,
        pointer_x: f64,
        target_left: f64,
        target_width: f64,
    ) -> StopmoResult<bool> {
        let Some(dragged) = self.drag.take() else {
            tracing::debug!(target, "Drop without a drag in progress");
            return Ok(false);
        };
        let side = DropSide::from_pointer(pointer_x, target_left, target_width);
        self.reorder(ReorderGesture::new(dragged, target, side))
    }

    /// Apply a reorder gesture and select the moved frame.
    ///
    /// Stops an active preview first. Rejected (returns `Ok(false)`) while
    /// exporting.
    pub fn reorder(&mut self, gesture: ReorderGesture) -> StopmoResult<bool> {
        self.drag.cancel();
        let len = self.store.len();
        let Some(insert) = gesture.insertion_index(len) else {
            return Ok(false);
        };
        // Validate before touching any driver.
        if gesture.dragged >= len || gesture.target >= len {
            return Err(StopmoError::index_out_of_range(
                gesture.dragged.max(gesture.target),
                len,
            ));
        }

        if matches!(self.driver, Driver::Previewing(_)) {
            self.stop_playback();
        }
        if let Err(e) = self.ensure_idle("reorder frames") {
            tracing::debug!(error = %e, "Reorder rejected");
            return Ok(false);
        }

        self.store.move_frame(gesture.dragged, insert)?;
        tracing::info!(from = gesture.dragged, to = insert, side = ?gesture.side, "Frame moved");
        self.notify_gallery();
        self.redraw();
        Ok(true)
    }
}
