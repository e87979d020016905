//! Configuration types for import and export.
//!
//! Import behaviour is controlled through [`ImportConfig`], export through
//! [`ExportConfig`]; both are built via builders that clamp values into their
//! supported ranges and validate the rest in `build()`. Filters and layout are
//! plain serde-friendly value types so a front end can persist or diff them.

use crate::error::NoteError;
use crate::filter::FilterSet;
use crate::layout::{GridShape, Orientation, PageSize, POINTS_PER_MM};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Largest margin the layout accepts, in millimetres.
pub const MAX_MARGIN_MM: f32 = 5.0;

// ── Import ───────────────────────────────────────────────────────────────

/// Configuration for importing source PDFs.
///
/// # Example
/// ```rust
/// use notecypher::ImportConfig;
///
/// let config = ImportConfig::builder()
///     .thumbnail_scale(0.25)
///     .build()
///     .unwrap();
/// assert_eq!(config.export_scale, 4.0);
/// ```
#[derive(Clone)]
pub struct ImportConfig {
    /// Render scale for preview thumbnails. Default: 0.5.
    pub thumbnail_scale: f32,

    /// Render scale for the export raster kept in the cache. Default: 4.0.
    ///
    /// 4× of the page's point size gives crisp text when a slide is printed
    /// at full page; lower it to trade sharpness for memory.
    pub export_scale: f32,

    /// Delay before progress resets to 0 after a successful import. Default: 800 ms.
    pub settle_delay: Duration,

    /// Delay before progress resets to 0 after a failed import. Default: 2 s.
    pub error_settle_delay: Duration,

    /// Receives progress and per-page errors.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            thumbnail_scale: 0.5,
            export_scale: 4.0,
            settle_delay: Duration::from_millis(800),
            error_settle_delay: Duration::from_millis(2000),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ImportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportConfig")
            .field("thumbnail_scale", &self.thumbnail_scale)
            .field("export_scale", &self.export_scale)
            .field("settle_delay", &self.settle_delay)
            .field("error_settle_delay", &self.error_settle_delay)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SessionProgressCallback>"),
            )
            .finish()
    }
}

impl ImportConfig {
    /// Create a new builder for `ImportConfig`.
    pub fn builder() -> ImportConfigBuilder {
        ImportConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ImportConfig`].
#[derive(Debug)]
pub struct ImportConfigBuilder {
    config: ImportConfig,
}

impl ImportConfigBuilder {
    pub fn thumbnail_scale(mut self, scale: f32) -> Self {
        self.config.thumbnail_scale = scale.clamp(0.05, 2.0);
        self
    }

    pub fn export_scale(mut self, scale: f32) -> Self {
        self.config.export_scale = scale.clamp(0.5, 8.0);
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    pub fn error_settle_delay(mut self, delay: Duration) -> Self {
        self.config.error_settle_delay = delay;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ImportConfig, NoteError> {
        let c = &self.config;
        if !c.thumbnail_scale.is_finite() || !c.export_scale.is_finite() {
            return Err(NoteError::InvalidConfig("render scales must be finite".into()));
        }
        if c.thumbnail_scale > c.export_scale {
            return Err(NoteError::InvalidConfig(format!(
                "thumbnail scale {} exceeds export scale {}",
                c.thumbnail_scale, c.export_scale
            )));
        }
        Ok(self.config)
    }
}

// ── Export ───────────────────────────────────────────────────────────────

/// Grid, orientation and margin of the output pages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Slides per output page: 1, 2, 3, 4 or 6. Other values lay out 1×1.
    pub slides_per_page: u8,
    pub orientation: Orientation,
    /// Blank border around every output page, in millimetres (0–5).
    pub margin_mm: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            slides_per_page: 1,
            orientation: Orientation::Portrait,
            margin_mm: 0.0,
        }
    }
}

impl LayoutConfig {
    pub fn grid(&self) -> GridShape {
        GridShape::from_layout_value(self.slides_per_page)
    }

    pub fn page_size(&self) -> PageSize {
        self.orientation.page_dimensions()
    }

    /// Margin converted to points.
    pub fn margin_points(&self) -> f32 {
        self.margin_mm.clamp(0.0, MAX_MARGIN_MM) * POINTS_PER_MM
    }
}

/// Configuration for one export.
///
/// # Example
/// ```rust
/// use notecypher::{ExportConfig, Orientation};
///
/// let config = ExportConfig::builder()
///     .slides_per_page(6)
///     .orientation(Orientation::Landscape)
///     .grayscale(true)
///     .threshold(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.layout.grid().capacity(), 6);
/// ```
#[derive(Clone)]
pub struct ExportConfig {
    /// Pixel filters applied to every slide. Default: none.
    pub filters: FilterSet,

    /// Output page layout. Default: 1 slide per portrait A4 page, no margin.
    pub layout: LayoutConfig,

    /// Delay before progress resets to 0 once the export ends. Default: 2 s.
    pub settle_delay: Duration,

    /// Receives progress and per-page errors.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            filters: FilterSet::default(),
            layout: LayoutConfig::default(),
            settle_delay: Duration::from_millis(2000),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("filters", &self.filters)
            .field("layout", &self.layout)
            .field("settle_delay", &self.settle_delay)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SessionProgressCallback>"),
            )
            .finish()
    }
}

impl ExportConfig {
    /// Create a new builder for `ExportConfig`.
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExportConfig`].
#[derive(Debug)]
pub struct ExportConfigBuilder {
    config: ExportConfig,
}

impl ExportConfigBuilder {
    pub fn filters(mut self, filters: FilterSet) -> Self {
        self.config.filters = filters;
        self
    }

    pub fn grayscale(mut self, v: bool) -> Self {
        self.config.filters.grayscale = v;
        self
    }

    pub fn invert(mut self, v: bool) -> Self {
        self.config.filters.invert = v;
        self
    }

    pub fn threshold(mut self, v: bool) -> Self {
        self.config.filters.threshold = v;
        self
    }

    pub fn layout(mut self, layout: LayoutConfig) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn slides_per_page(mut self, n: u8) -> Self {
        self.config.layout.slides_per_page = n;
        self
    }

    pub fn orientation(mut self, o: Orientation) -> Self {
        self.config.layout.orientation = o;
        self
    }

    pub fn margin_mm(mut self, mm: f32) -> Self {
        self.config.layout.margin_mm = if mm.is_finite() {
            mm.clamp(0.0, MAX_MARGIN_MM)
        } else {
            0.0
        };
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExportConfig, NoteError> {
        let m = self.config.layout.margin_mm;
        if !(0.0..=MAX_MARGIN_MM).contains(&m) {
            return Err(NoteError::InvalidConfig(format!(
                "margin must be 0–{MAX_MARGIN_MM} mm, got {m}"
            )));
        }
        Ok(self.config)
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Specifies pages by their 1-based position in the session's page list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every loaded page (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed positions.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_defaults() {
        let c = ImportConfig::default();
        assert_eq!(c.thumbnail_scale, 0.5);
        assert_eq!(c.export_scale, 4.0);
        assert_eq!(c.settle_delay, Duration::from_millis(800));
    }

    #[test]
    fn import_builder_rejects_inverted_scales() {
        let err = ImportConfig::builder()
            .thumbnail_scale(2.0)
            .export_scale(1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, NoteError::InvalidConfig(_)));
    }

    #[test]
    fn export_builder_clamps_margin() {
        let c = ExportConfig::builder().margin_mm(12.0).build().unwrap();
        assert_eq!(c.layout.margin_mm, MAX_MARGIN_MM);
        let c = ExportConfig::builder().margin_mm(f32::NAN).build().unwrap();
        assert_eq!(c.layout.margin_mm, 0.0);
    }

    #[test]
    fn direct_field_margin_is_validated() {
        let mut layout = LayoutConfig::default();
        layout.margin_mm = 9.0;
        let err = ExportConfig::builder().layout(layout).build().unwrap_err();
        assert!(matches!(err, NoteError::InvalidConfig(_)));
    }

    #[test]
    fn margin_points_conversion() {
        let layout = LayoutConfig {
            margin_mm: 5.0,
            ..Default::default()
        };
        assert!((layout.margin_points() - 14.173).abs() < 1e-2);
        assert_eq!(LayoutConfig::default().margin_points(), 0.0);
    }

    #[test]
    fn layout_round_trips_through_json() {
        let layout = LayoutConfig {
            slides_per_page: 4,
            orientation: Orientation::Landscape,
            margin_mm: 2.5,
        };
        let json = serde_json::to_string(&layout).unwrap();
        assert!(json.contains("\"landscape\""));
        let back: LayoutConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, layout);
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(5), vec![0, 1, 2, 3, 4]);
        assert_eq!(PageSelection::Single(3).to_indices(5), vec![2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 4).to_indices(5), vec![1, 2, 3]);
        assert_eq!(PageSelection::Range(3, 10).to_indices(4), vec![2, 3]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2] // deduplicated and sorted
        );
    }
}
