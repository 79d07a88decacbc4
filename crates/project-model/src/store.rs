//! The ordered frame store.
//!
//! The store owns the frame sequence and the cursor. It is the only writer
//! of the cursor: drivers and gestures request changes through these
//! methods and never touch the index directly.

use stopmo_common::error::{StopmoError, StopmoResult};

use crate::frame::Frame;

/// Ordered sequence of frames plus the currently selected index.
///
/// Invariant: when the store is non-empty, `cursor < frames.len()`.
#[derive(Debug, Default)]
pub struct FrameStore {
    frames: Vec<Frame>,
    cursor: usize,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Current index, or `None` for an empty store.
    pub fn cursor(&self) -> Option<usize> {
        (!self.frames.is_empty()).then_some(self.cursor)
    }

    /// The frame under the cursor.
    pub fn current(&self) -> Option<&Frame> {
        self.cursor().and_then(|i| self.frames.get(i))
    }

    /// Append a frame at the end of the sequence.
    pub fn append(&mut self, frame: Frame) {
        self.frames.push(frame);
        if self.frames.len() == 1 {
            self.cursor = 0;
        }
    }

    /// Move the frame at `from` so it ends up at `to` (post-removal index)
    /// and select it.
    pub fn move_frame(&mut self, from: usize, to: usize) -> StopmoResult<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from != to {
            let frame = self.frames.remove(from);
            self.frames.insert(to, frame);
        }
        self.cursor = to;
        Ok(())
    }

    pub fn set_cursor(&mut self, index: usize) -> StopmoResult<()> {
        self.check_index(index)?;
        self.cursor = index;
        Ok(())
    }

    /// Step the cursor forward. Returns `false` when already at the last
    /// frame (or the store is empty), signalling the sequence is exhausted.
    pub fn advance_cursor(&mut self) -> bool {
        if self.cursor + 1 < self.frames.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Remove the frame at `index`, returning ownership of it.
    ///
    /// The cursor keeps pointing at the same frame when it sat after the
    /// removed one, and is clamped to the new last index otherwise.
    pub fn remove(&mut self, index: usize) -> StopmoResult<Frame> {
        self.check_index(index)?;
        let frame = self.frames.remove(index);
        if index < self.cursor {
            self.cursor -= 1;
        }
        if self.cursor >= self.frames.len() {
            self.cursor = self.frames.len().saturating_sub(1);
        }
        Ok(frame)
    }

    fn check_index(&self, index: usize) -> StopmoResult<()> {
        if index < self.frames.len() {
            Ok(())
        } else {
            Err(StopmoError::index_out_of_range(index, self.frames.len()))
        }
    }
}
