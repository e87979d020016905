//! Pipeline stages for importing slide decks and exporting print handouts.
//!
//! Each submodule implements one step. The PDF library sits behind the
//! traits in [`render`] (decode side) and [`compose`] (write side), so the
//! rest of the pipeline can be tested with in-memory fakes.
//!
//! ## Data Flow
//!
//! ```text
//! import:  input ──▶ render ──▶ encode ──▶ RasterCache + thumbnails
//!          (bytes)   (pdfium)   (PNG)
//!
//! export:  RasterCache ──▶ encode ──▶ filter ──▶ layout ──▶ compose
//!                          (decode)   (pixels)   (placement)  (lopdf)
//! ```
//!
//! 1. [`input`]   read files and reject anything without the PDF header
//! 2. [`render`]  rasterise every page at thumbnail and export scale; runs
//!    in `spawn_blocking` because pdfium is blocking and CPU bound
//! 3. [`encode`]  PNG-encode rasters for storage, decode them for export
//! 4. [`import`]  drive 1-3 for a batch of files and collect page errors
//! 5. [`export`]  filter, place and draw the selected pages
//! 6. [`compose`] assemble and serialise the output PDF

pub mod compose;
pub mod encode;
pub mod export;
pub mod import;
pub mod input;
pub mod render;
