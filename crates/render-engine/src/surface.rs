//! The render surface shared by the compositor and the encoder.
//!
//! A surface has two sizes: the layout size (how large it is on screen)
//! and the pixel buffer size. They are independent, and the buffer must be
//! synced to the layout before each render or the fit-inside scaling is
//! computed against stale dimensions.

use image::imageops::FilterType;
use image::{Rgba, RgbaImage};

/// Transparent black, the cleared state of a surface.
pub const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// An RGBA pixel buffer with a separately tracked layout size.
#[derive(Debug, Clone)]
pub struct Surface {
    layout_width: u32,
    layout_height: u32,
    pixels: RgbaImage,
}

/// Placement of a bitmap on the surface, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DrawRect {
    /// Uniformly scale a `bitmap_width x bitmap_height` image to fit inside
    /// the surface and centre it. The scale may exceed 1.
    ///
    /// Returns `None` for zero-sized bitmaps.
    pub fn fit_inside(
        surface_width: u32,
        surface_height: u32,
        bitmap_width: u32,
        bitmap_height: u32,
    ) -> Option<Self> {
        if bitmap_width == 0 || bitmap_height == 0 {
            return None;
        }
        let (sw, sh) = (surface_width as f64, surface_height as f64);
        let (bw, bh) = (bitmap_width as f64, bitmap_height as f64);
        let scale = (sw / bw).min(sh / bh);
        let width = bw * scale;
        let height = bh * scale;
        Some(Self {
            x: (sw - width) / 2.0,
            y: (sh - height) / 2.0,
            width,
            height,
        })
    }
}

impl Surface {
    /// Create a surface whose buffer already matches its layout.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            layout_width: width,
            layout_height: height,
            pixels: RgbaImage::new(width, height),
        }
    }

    /// On-screen size of the surface.
    pub fn layout_size(&self) -> (u32, u32) {
        (self.layout_width, self.layout_height)
    }

    /// Pixel buffer size.
    pub fn size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Record a new on-screen size. The buffer follows on the next sync.
    pub fn set_layout_size(&mut self, width: u32, height: u32) {
        self.layout_width = width;
        self.layout_height = height;
    }

    /// Reallocate the pixel buffer if it no longer matches the layout.
    /// Returns whether a reallocation happened (which also clears it).
    pub fn sync_to_layout(&mut self) -> bool {
        if self.pixels.dimensions() == (self.layout_width, self.layout_height) {
            return false;
        }
        self.pixels = RgbaImage::new(self.layout_width, self.layout_height);
        true
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = CLEAR;
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Scale `bitmap` into `rect` and blend it over the current contents.
    pub fn draw_image(&mut self, bitmap: &RgbaImage, rect: DrawRect, opacity: f32) {
        let target_w = rect.width.round().max(1.0) as u32;
        let target_h = rect.height.round().max(1.0) as u32;
        let origin_x = rect.x.round() as i64;
        let origin_y = rect.y.round() as i64;

        let scaled;
        let source = if bitmap.dimensions() == (target_w, target_h) {
            bitmap
        } else {
            scaled = image::imageops::resize(bitmap, target_w, target_h, FilterType::Triangle);
            &scaled
        };

        let (surface_w, surface_h) = (self.pixels.width() as i64, self.pixels.height() as i64);
        for (sx, sy, src) in source.enumerate_pixels() {
            let dx = origin_x + sx as i64;
            let dy = origin_y + sy as i64;
            if dx < 0 || dy < 0 || dx >= surface_w || dy >= surface_h {
                continue;
            }
            let dst = self.pixels.get_pixel_mut(dx as u32, dy as u32);
            *dst = blend_over(*dst, *src, opacity);
        }
    }
}

/// Straight-alpha source-over with an extra opacity factor on the source.
pub fn blend_over(dst: Rgba<u8>, src: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0 * opacity.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return dst;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    let mut out = [0u8; 4];
    for i in 0..3 {
        let c = (src[i] as f32 * sa + dst[i] as f32 * da * (1.0 - sa)) / out_a;
        out[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}
