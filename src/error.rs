//! Error types for the notecypher library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`NoteError`]: **Fatal** for the current operation: the import or
//!   export cannot proceed at all (engine not bound, empty selection, output
//!   could not be serialised). Returned as `Err(NoteError)` from the
//!   [`crate::session::Session`] entry points. Session state is left exactly
//!   as it was before the call.
//!
//! * [`PageError`]: **Non-fatal**: one source file or one page failed (bad
//!   PDF, render glitch, missing raster) but everything else is fine. Logged,
//!   forwarded to the progress callback and collected in the import/export
//!   reports so callers can inspect partial success.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the notecypher library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::session::ImportReport`] / [`crate::pipeline::export::ExportStats`]
/// rather than propagated here.
#[derive(Debug, Error)]
pub enum NoteError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── User input errors ─────────────────────────────────────────────────
    /// Export was requested while no page is selected.
    #[error("Please select at least one page to export.")]
    EmptySelection,

    /// The document id does not belong to this session.
    #[error("Unknown document #{id}")]
    UnknownDocument { id: u64 },

    // ── Export errors ─────────────────────────────────────────────────────
    /// Assembling or encoding the output PDF failed.
    #[error("Error exporting PDF: {detail}\nYour pages and settings are unchanged; try exporting again.")]
    SerializationFailed { detail: String },

    /// Every selected page was skipped; the output would be empty.
    #[error("None of the {selected} selected pages could be exported.\nFirst error: {first_error}")]
    NothingExported {
        selected: usize,
        first_error: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library, so no PDF can be decoded yet.
    #[error(
        "PDF library not loaded: {0}\n\n\
Point notecypher at an existing pdfium build:\n\
  • Pass --pdfium-lib /path/to/dir-containing-libpdfium, or\n\
  • Set PDFIUM_LIB_PATH, or\n\
  • Install libpdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single source file or page.
///
/// Every variant carries enough context (file name and/or page number) to
/// diagnose the failure from a log line alone.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The file is not a readable PDF; all of its pages are skipped.
    #[error("{file}: could not read PDF: {detail}")]
    DecodeFailed { file: String, detail: String },

    /// A page could not be rasterised at thumbnail or export resolution.
    #[error("{file} page {page}: rasterisation failed: {detail}")]
    RenderFailed {
        file: String,
        page: u16,
        detail: String,
    },

    /// Export found no stored raster for a selected page.
    #[error("{file} page {page}: no stored image for export")]
    CacheMiss { file: String, page: u16 },

    /// The stored raster could not be decoded or embedded in the output.
    #[error("{file} page {page}: could not embed page image: {detail}")]
    EmbedFailed {
        file: String,
        page: u16,
        detail: String,
    },
}
