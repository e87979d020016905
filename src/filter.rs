//! Pixel filters applied to every export raster.
//!
//! Three independent switches, always composed in the same order:
//!
//! ```text
//! grayscale ──▶ invert ──▶ threshold
//! ```
//!
//! Each step reads the channel values left by the previous one, so e.g.
//! threshold after invert clears pixels that *became* light. Alpha is never
//! touched.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Channel average above which a pixel is forced to pure white.
///
/// Keeps dark text strokes intact while clearing off-white paper and scan
/// noise.
pub const THRESHOLD_LEVEL: u16 = 220;

/// Which filters to apply. All off by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSet {
    /// Convert to perceptual luma (0.299 R + 0.587 G + 0.114 B).
    pub grayscale: bool,
    /// Replace every channel `c` with `255 - c`.
    pub invert: bool,
    /// Background clear: pixels whose channel average exceeds
    /// [`THRESHOLD_LEVEL`] become white.
    pub threshold: bool,
}

impl FilterSet {
    /// True when no filter is enabled and rasters pass through unchanged.
    pub fn is_noop(&self) -> bool {
        !(self.grayscale || self.invert || self.threshold)
    }
}

/// Apply `filters` to a single RGBA pixel.
#[inline]
pub fn filter_pixel(px: [u8; 4], filters: FilterSet) -> [u8; 4] {
    let [mut r, mut g, mut b, a] = px;

    if filters.grayscale {
        let luma = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
        let l = luma.round() as u8;
        r = l;
        g = l;
        b = l;
    }

    if filters.invert {
        r = 255 - r;
        g = 255 - g;
        b = 255 - b;
    }

    // avg > 220  <=>  sum > 660, compared in integers to avoid rounding.
    if filters.threshold && u16::from(r) + u16::from(g) + u16::from(b) > THRESHOLD_LEVEL * 3 {
        r = 255;
        g = 255;
        b = 255;
    }

    [r, g, b, a]
}

/// Apply `filters` to every pixel of `image` in place.
pub fn apply_filters(image: &mut RgbaImage, filters: FilterSet) {
    if filters.is_noop() {
        return;
    }
    for px in image.pixels_mut() {
        px.0 = filter_pixel(px.0, filters);
    }
}
