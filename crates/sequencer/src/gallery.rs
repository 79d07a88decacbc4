//! Gallery view: the thumbnail strip that mirrors the frame order.

use std::fmt;

use stopmo_project_model::Frame;

/// Receives the frame list and current index after every change.
pub trait GalleryView: Send {
    fn refresh(&mut self, frames: &[Frame], current: Option<usize>);
}

/// How prominent a carousel slot is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Center,
    Side,
    Outer,
}

/// One visible thumbnail in the carousel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarouselItem {
    pub index: usize,
    /// 1-based label shown to the user.
    pub number: usize,
    pub kind: SlotKind,
}

/// The thumbnails visible around the current frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarouselWindow {
    pub items: Vec<CarouselItem>,
}

impl CarouselWindow {
    /// Slots shown on either side of the current frame.
    pub const RADIUS: usize = 2;

    pub fn around(len: usize, current: Option<usize>) -> Self {
        let Some(current) = current.filter(|c| *c < len) else {
            return Self::default();
        };
        let start = current.saturating_sub(Self::RADIUS);
        let end = (current + Self::RADIUS).min(len - 1);
        let items = (start..=end)
            .map(|index| CarouselItem {
                index,
                number: index + 1,
                kind: match index.abs_diff(current) {
                    0 => SlotKind::Center,
                    1 => SlotKind::Side,
                    _ => SlotKind::Outer,
                },
            })
            .collect();
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for CarouselWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match item.kind {
                SlotKind::Center => write!(f, "[{}]", item.number)?,
                SlotKind::Side => write!(f, "({})", item.number)?,
                SlotKind::Outer => write!(f, "{}", item.number)?,
            }
        }
        Ok(())
    }
}

/// Gallery that logs the carousel instead of drawing it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingGallery;

impl GalleryView for TracingGallery {
    fn refresh(&mut self, frames: &[Frame], current: Option<usize>) {
        let window = CarouselWindow::around(frames.len(), current);
        tracing::debug!(frames = frames.len(), current = ?current, carousel = %window, "Gallery refreshed");
    }
}
