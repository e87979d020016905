//! PDF rasterisation: decode source documents and render pages to pixels.
//!
//! The decoder is reached through three small traits so the rest of the
//! pipeline never names pdfium directly:
//!
//! ```text
//! PdfEngine::bind() ──▶ PdfLoader::load_document(bytes) ──▶ SourceDocument
//!                                                            ├─ page_count()
//!                                                            └─ render_page(n, scale)
//! ```
//!
//! `bind` is called once per import, inside the blocking worker. pdfium keeps
//! thread-local state and its documents borrow the library handle, so the
//! handle is created, used and dropped on the same thread rather than shared.

use crate::error::NoteError;
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Produces a loader bound to a concrete PDF library.
pub trait PdfEngine: Send + Sync {
    /// Bind the library. Failure means no PDF can be decoded at all.
    fn bind(&self) -> Result<Box<dyn PdfLoader>, NoteError>;
}

/// Opens PDF documents from memory.
pub trait PdfLoader {
    /// Decode `bytes` into a document. The error string is diagnostic text.
    fn load_document(&self, bytes: Vec<u8>) -> Result<Box<dyn SourceDocument + '_>, String>;
}

/// One decoded source document.
pub trait SourceDocument {
    fn page_count(&self) -> u16;

    /// Rasterise 1-based `page_number` at `scale` × the page's point size.
    fn render_page(&self, page_number: u16, scale: f32) -> Result<RgbaImage, String>;
}

// ── pdfium backend ───────────────────────────────────────────────────────

/// [`PdfEngine`] backed by a pdfium shared library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumEngine {
    library_path: Option<PathBuf>,
}

impl PdfiumEngine {
    /// Look for pdfium next to the executable's working directory, then in
    /// the system library path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific pdfium library file, or a directory containing one.
    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind_pdfium(&self) -> Result<Pdfium, PdfiumError> {
        let bindings = match self.library_path {
            Some(ref path) => Pdfium::bind_to_library(library_file(path))?,
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())?,
        };
        Ok(Pdfium::new(bindings))
    }
}

/// Accept either the library file itself or its directory.
fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        let dir = path.to_string_lossy().into_owned();
        PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(&dir))
    } else {
        path.to_path_buf()
    }
}

impl PdfEngine for PdfiumEngine {
    fn bind(&self) -> Result<Box<dyn PdfLoader>, NoteError> {
        let pdfium = self
            .bind_pdfium()
            .map_err(|e| NoteError::PdfiumBindingFailed(format!("{:?}", e)))?;
        info!("pdfium bound");
        Ok(Box::new(PdfiumLoader { pdfium }))
    }
}

struct PdfiumLoader {
    pdfium: Pdfium,
}

impl PdfLoader for PdfiumLoader {
    fn load_document(&self, bytes: Vec<u8>) -> Result<Box<dyn SourceDocument + '_>, String> {
        let document = self
            .pdfium
            .load_pdf_from_byte_vec(bytes, None)
            .map_err(|e| format!("{:?}", e))?;
        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl SourceDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> u16 {
        self.document.pages().len()
    }

    fn render_page(&self, page_number: u16, scale: f32) -> Result<RgbaImage, String> {
        let total = self.page_count();
        if page_number == 0 || page_number > total {
            return Err(format!("page {page_number} out of range (document has {total})"));
        }

        let page = self
            .document
            .pages()
            .get(page_number - 1)
            .map_err(|e| format!("{:?}", e))?;

        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| format!("{:?}", e))?;

        let image = bitmap.as_image().into_rgba8();
        debug!(
            "Rendered page {} at {}× → {}x{} px",
            page_number,
            scale,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}
