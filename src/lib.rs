//! # notecypher
//!
//! Turn lecture slide decks into compact, printer-friendly handouts.
//!
//! Load one or more PDFs, pick the pages you want, and export them with
//! several slides per sheet. Dark slides can be converted to grayscale,
//! inverted and thresholded so they print as dark text on white paper
//! instead of a page of solid toner.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDFs
//!  │
//!  ├─ 1. Import   decode with pdfium, render each page at 0.5× (thumbnail)
//!  │              and 4.0× (export raster, kept in the RasterCache)
//!  ├─ 2. Select   toggle pages, whole documents, or position ranges
//!  ├─ 3. Filter   grayscale → invert → threshold, per pixel
//!  ├─ 4. Layout   1, 2, 3, 4 or 6 slides per A4 page, portrait/landscape
//!  └─ 5. Export   composite onto new pages and serialise with lopdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notecypher::{ExportConfig, ImportConfig, PdfiumEngine, Session, SourceFile};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = Session::new(Arc::new(PdfiumEngine::new()));
//!     let deck = SourceFile::from_path("lecture-03.pdf").await?;
//!     let report = session.import(vec![deck], &ImportConfig::default()).await?;
//!     eprintln!("{} pages loaded", report.pages_added);
//!
//!     let config = ExportConfig::builder()
//!         .slides_per_page(6)
//!         .grayscale(true)
//!         .invert(true)
//!         .threshold(true)
//!         .build()?;
//!     let output = session.export(&config).await?;
//!     let path = output.save_to_dir(".").await?;
//!     eprintln!("wrote {}", path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `notecypher` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! notecypher = { version = "0.1", default-features = false }
//! ```
//!
//! ## Memory
//!
//! Export rasters are rendered once at import and kept PNG-encoded until
//! their document is removed. There is no eviction, so memory grows with
//! the number of loaded pages; remove documents you no longer need.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod layout;
pub mod pipeline;
pub mod prefs;
pub mod progress;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cache::{RasterCache, RasterEntry};
pub use config::{
    ExportConfig, ExportConfigBuilder, ImportConfig, ImportConfigBuilder, LayoutConfig,
    PageSelection,
};
pub use error::{NoteError, PageError};
pub use filter::{apply_filters, filter_pixel, FilterSet};
pub use layout::{allocate, place_slide, GridShape, Orientation, PageSize, Placement};
pub use pipeline::compose::{ImageHandle, OutputDocument, PageHandle, PdfWriter};
pub use pipeline::export::{ExportOutput, ExportStats};
pub use pipeline::input::SourceFile;
pub use pipeline::render::{PdfEngine, PdfLoader, PdfiumEngine, SourceDocument};
pub use prefs::DisplayPreferences;
pub use progress::{NoopProgressCallback, ProgressCallback, SessionProgressCallback};
pub use session::{
    DocumentId, DocumentInfo, ImportReport, PageId, PageRecord, Session, Thumbnail,
};
