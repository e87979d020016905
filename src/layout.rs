//! N-up geometry: grid shapes, output page sizes, slide placement.
//!
//! All coordinates are PDF points with a **bottom-left origin**, the native
//! PDF page convention, so placements can be written straight into a content
//! stream `cm` operator. Slot 0 is the top-left cell; slots fill rows left to
//! right, then top to bottom.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Fraction of the limiting cell dimension a slide may occupy.
pub const FIT_RATIO: f32 = 0.98;

/// Points per millimetre.
pub const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// A4 short edge in points.
const A4_SHORT: f32 = 595.0;
/// A4 long edge in points.
const A4_LONG: f32 = 842.0;

/// Columns × rows of slides on one output page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridShape {
    pub cols: u32,
    pub rows: u32,
}

impl GridShape {
    /// Map a "slides per page" layout value onto its grid.
    ///
    /// | value | cols | rows |
    /// |-------|------|------|
    /// | 1     | 1    | 1    |
    /// | 2     | 1    | 2    |
    /// | 3     | 1    | 3    |
    /// | 4     | 2    | 2    |
    /// | 6     | 2    | 3    |
    ///
    /// Anything else falls back to 1×1.
    pub fn from_layout_value(value: u8) -> Self {
        let (cols, rows) = match value {
            1 => (1, 1),
            2 => (1, 2),
            3 => (1, 3),
            4 => (2, 2),
            6 => (2, 3),
            _ => (1, 1),
        };
        Self { cols, rows }
    }

    /// Number of slides one output page holds.
    pub fn capacity(&self) -> usize {
        (self.cols * self.rows) as usize
    }
}

/// Output page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// A4 dimensions in points for this orientation.
    pub fn page_dimensions(self) -> PageSize {
        match self {
            Orientation::Portrait => PageSize {
                width: A4_SHORT,
                height: A4_LONG,
            },
            Orientation::Landscape => PageSize {
                width: A4_LONG,
                height: A4_SHORT,
            },
        }
    }
}

/// Width and height of an output page in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Where one slide lands on its output page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Compute the placement of the slide in `slot` (0-based within its page).
///
/// The slide is fitted into its cell preserving `image_aspect`
/// (width / height), scaled to [`FIT_RATIO`] of the limiting dimension and
/// centred. `margin` (points) is removed from every page edge before the
/// page is divided into cells.
pub fn place_slide(
    slot: usize,
    grid: GridShape,
    page: PageSize,
    margin: f32,
    image_aspect: f32,
) -> Placement {
    let cols = grid.cols.max(1) as usize;
    let rows = grid.rows.max(1);

    let cell_w = (page.width - 2.0 * margin) / cols as f32;
    let cell_h = (page.height - 2.0 * margin) / rows as f32;
    let cell_aspect = cell_w / cell_h;

    let (width, height) = if image_aspect > cell_aspect {
        let w = cell_w * FIT_RATIO;
        (w, w / image_aspect)
    } else {
        let h = cell_h * FIT_RATIO;
        (h * image_aspect, h)
    };

    let col = (slot % cols) as f32;
    let row = (slot / cols) as f32;

    Placement {
        x: margin + col * cell_w + (cell_w - width) / 2.0,
        y: page.height - margin - (row + 1.0) * cell_h + (cell_h - height) / 2.0,
        width,
        height,
    }
}

/// Split `total` slides into consecutive output pages of `per_page` slides.
///
/// The last page may be partially filled. `per_page == 0` is treated as 1.
pub fn allocate(total: usize, per_page: usize) -> Vec<Range<usize>> {
    let per_page = per_page.max(1);
    (0..total)
        .step_by(per_page)
        .map(|start| start..(start + per_page).min(total))
        .collect()
}
