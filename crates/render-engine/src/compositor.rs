//! Onion-skin compositor.
//!
//! In [`DisplayMode::Compare`] the frame before the cursor is drawn fully
//! opaque, then the cursor frame is laid over it at reduced opacity so the
//! animator can line the two up. [`DisplayMode::Single`] draws only the
//! cursor frame. There is no forward-neighbour onion skin.

use stopmo_project_model::{DisplayMode, FrameStore};

use crate::surface::{DrawRect, Surface};

/// Opacity of the frame before the cursor in compare mode.
pub const ONION_BEFORE_OPACITY: f32 = 1.0;

/// Opacity of the cursor frame in compare mode.
pub const ONION_CURRENT_OPACITY: f32 = 0.8;

/// One bitmap to draw, in back-to-front order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer {
    /// Index into the frame store.
    pub index: usize,
    /// Opacity applied to the whole bitmap.
    pub opacity: f32,
}

/// Decide which frames to draw for the current cursor and mode.
///
/// Slots whose index falls outside the store are skipped.
pub fn plan_layers(store: &FrameStore, mode: DisplayMode) -> Vec<Layer> {
    let Some(cursor) = store.cursor() else {
        return Vec::new();
    };

    match mode {
        DisplayMode::Compare => {
            let mut layers = Vec::with_capacity(2);
            if let Some(before) = cursor.checked_sub(1) {
                layers.push(Layer {
                    index: before,
                    opacity: ONION_BEFORE_OPACITY,
                });
            }
            layers.push(Layer {
                index: cursor,
                opacity: ONION_CURRENT_OPACITY,
            });
            layers
        }
        DisplayMode::Single => vec![Layer {
            index: cursor,
            opacity: 1.0,
        }],
    }
}

/// Redraw the surface from the store.
///
/// An empty store leaves the surface untouched, including its buffer size.
/// Otherwise the buffer is synced to the layout size, cleared, and the
/// planned layers are drawn scaled to fit and centred. Returns the number
/// of bitmaps drawn.
pub fn render(surface: &mut Surface, store: &FrameStore, mode: DisplayMode) -> usize {
    if store.is_empty() {
        return 0;
    }

    surface.sync_to_layout();
    surface.clear();

    let (surface_w, surface_h) = surface.size();
    let mut drawn = 0;
    for layer in plan_layers(store, mode) {
        let Some(frame) = store.get(layer.index) else {
            continue;
        };
        let Some(rect) = DrawRect::fit_inside(surface_w, surface_h, frame.width(), frame.height())
        else {
            continue;
        };
        surface.draw_image(frame.bitmap(), rect, layer.opacity);
        drawn += 1;
    }

    tracing::trace!(
        cursor = ?store.cursor(),
        ?mode,
        drawn,
        width = surface_w,
        height = surface_h,
        "Surface redrawn"
    );
    drawn
}
