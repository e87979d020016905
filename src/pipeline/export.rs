//! Export: composite the selected pages into one PDF.
//!
//! For each selected page, in position order:
//!
//! ```text
//! cache lookup ─▶ PNG decode ─▶ filters ─▶ embed ─▶ place_slide ─▶ draw
//!      │ miss          └──────── failure ───────┘
//!      ▼                             ▼
//!  CacheMiss (skip)           EmbedFailed (skip)
//! ```
//!
//! Slides fill output pages one after another: a new page is opened when the
//! current one holds the grid's capacity. Skipped pages do not consume a
//! slot, and a page whose draws all failed is reused by the next slide (or
//! discarded at the end), so the output never contains a blank page. The
//! resulting fill matches [`allocate`] over the exported slides.

use crate::cache::RasterEntry;
use crate::config::LayoutConfig;
use crate::error::{NoteError, PageError};
use crate::filter::{apply_filters, FilterSet};
use crate::layout::{allocate, place_slide};
use crate::pipeline::compose::{ImageHandle, OutputDocument, PageHandle};
use crate::pipeline::encode::decode_png;
use crate::progress::{export_percent, Reporter};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// MIME type of every export.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// One selected page handed to the export worker.
#[derive(Debug, Clone)]
pub(crate) struct ExportJob {
    pub file: String,
    pub page_number: u16,
    /// `None` when the cache had no raster for the page.
    pub raster: Option<RasterEntry>,
}

/// Summary of one export, serialisable for `--json` output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportStats {
    /// Pages that were selected when the export started.
    pub selected_pages: usize,
    /// Slides that made it into the output.
    pub exported_pages: usize,
    pub skipped_pages: usize,
    /// Pages in the produced PDF.
    pub output_pages: usize,
    /// Slides on each output page, in page order. Only the last page can be
    /// partially filled.
    pub slides_per_output_page: Vec<usize>,
    pub errors: Vec<PageError>,
    pub duration_ms: u64,
}

/// A finished export: the PDF plus what to call it.
pub struct ExportOutput {
    pub bytes: Vec<u8>,
    /// `optimized-notes-<unix millis>.pdf`
    pub file_name: String,
    pub mime_type: &'static str,
    pub stats: ExportStats,
}

impl std::fmt::Debug for ExportOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportOutput")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("stats", &self.stats)
            .finish()
    }
}

impl ExportOutput {
    /// Write the PDF into `dir` under [`ExportOutput::file_name`].
    pub async fn save_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, NoteError> {
        let path = dir.as_ref().join(&self.file_name);
        self.save_to(&path).await?;
        Ok(path)
    }

    /// Write the PDF to `path` atomically: a temp file in the same directory
    /// is written, flushed and then renamed over the target.
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<(), NoteError> {
        let path = path.as_ref().to_path_buf();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let write_err = |source: std::io::Error| NoteError::OutputWriteFailed {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&dir).await.map_err(write_err)?;

        let bytes = self.bytes.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| NoteError::Internal(format!("write task panicked: {e}")))?
        .map_err(write_err)?;

        info!("Wrote {} ({} bytes)", path.display(), self.bytes.len());
        Ok(())
    }
}

/// `optimized-notes-<millis>.pdf` for the current wall-clock time.
pub fn output_file_name() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("optimized-notes-{millis}.pdf")
}

/// Run [`export_blocking`] on the blocking pool.
pub(crate) async fn export_pages(
    jobs: Vec<ExportJob>,
    filters: FilterSet,
    layout: LayoutConfig,
    doc: Box<dyn OutputDocument>,
    reporter: &Reporter,
) -> Result<ExportOutput, NoteError> {
    let reporter = reporter.clone();
    tokio::task::spawn_blocking(move || export_blocking(jobs, filters, layout, doc, &reporter))
        .await
        .map_err(|e| NoteError::Internal(format!("export task panicked: {e}")))?
}

pub(crate) fn export_blocking(
    jobs: Vec<ExportJob>,
    filters: FilterSet,
    layout: LayoutConfig,
    mut doc: Box<dyn OutputDocument>,
    reporter: &Reporter,
) -> Result<ExportOutput, NoteError> {
    let start = Instant::now();
    let total = jobs.len();
    let grid = layout.grid();
    let capacity = grid.capacity();
    let page_size = layout.page_size();
    let margin = layout.margin_points();

    info!(
        "Exporting {} pages, {}x{} per page, margin {:.1} pt, filters {:?}",
        total, grid.cols, grid.rows, margin, filters
    );

    // Page currently being filled and the number of slides already on it.
    // A page is only kept once a slide has been drawn on it.
    let mut current: Option<(PageHandle, usize)> = None;
    let mut exported = 0usize;
    let mut errors = Vec::new();

    for (i, job) in jobs.into_iter().enumerate() {
        reporter.report(
            export_percent(i, total),
            format!("Processing page {} of {}...", i + 1, total),
        );

        match prepare_slide(doc.as_mut(), &job, filters) {
            Ok(image) => {
                let (page, slot) = match current {
                    Some((page, filled)) if filled < capacity => (page, filled),
                    _ => (doc.add_page(page_size), 0),
                };
                current = Some((page, slot));

                let at = place_slide(slot, grid, page_size, margin, image.aspect());
                match doc.draw_image(page, &image, at) {
                    Ok(()) => {
                        debug!(
                            "{} p{} → slot {} at ({:.1}, {:.1}) {:.1}x{:.1}",
                            job.file, job.page_number, slot, at.x, at.y, at.width, at.height
                        );
                        exported += 1;
                        current = Some((page, slot + 1));
                    }
                    Err(detail) => skip(
                        &mut errors,
                        reporter,
                        PageError::EmbedFailed {
                            file: job.file.clone(),
                            page: job.page_number,
                            detail,
                        },
                    ),
                }
            }
            Err(err) => skip(&mut errors, reporter, err),
        }

        reporter.report(
            export_percent(i + 1, total),
            format!("Processing page {} of {}...", i + 1, total),
        );
    }

    // A trailing page whose only draws failed carries no slide.
    if let Some((page, 0)) = current {
        doc.discard_page(page);
    }

    if exported == 0 {
        let first_error = errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no pages".to_string());
        return Err(NoteError::NothingExported {
            selected: total,
            first_error,
        });
    }

    reporter.report(95.0, "Finalizing PDF...");
    let output_pages = doc.page_count();
    let slides_per_output_page: Vec<usize> = allocate(exported, capacity)
        .into_iter()
        .map(|group| group.len())
        .collect();
    if slides_per_output_page.len() != output_pages {
        warn!(
            "Writer reports {} pages, {} expected for {} slides",
            output_pages,
            slides_per_output_page.len(),
            exported
        );
    }
    let bytes = doc.serialize()?;

    let stats = ExportStats {
        selected_pages: total,
        exported_pages: exported,
        skipped_pages: errors.len(),
        output_pages,
        slides_per_output_page,
        errors,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Exported {}/{} slides onto {} pages ({} bytes, {} ms)",
        stats.exported_pages,
        stats.selected_pages,
        stats.output_pages,
        bytes.len(),
        stats.duration_ms
    );

    Ok(ExportOutput {
        bytes,
        file_name: output_file_name(),
        mime_type: PDF_MIME_TYPE,
        stats,
    })
}

fn prepare_slide(
    doc: &mut dyn OutputDocument,
    job: &ExportJob,
    filters: FilterSet,
) -> Result<ImageHandle, PageError> {
    let raster = job.raster.as_ref().ok_or_else(|| PageError::CacheMiss {
        file: job.file.clone(),
        page: job.page_number,
    })?;
    let embed_failed = |detail: String| PageError::EmbedFailed {
        file: job.file.clone(),
        page: job.page_number,
        detail,
    };

    let mut image = decode_png(raster.png()).map_err(|e| embed_failed(e.to_string()))?;
    if !filters.is_noop() {
        apply_filters(&mut image, filters);
    }
    doc.embed_image(&image).map_err(embed_failed)
}

fn skip(errors: &mut Vec<PageError>, reporter: &Reporter, err: PageError) {
    error!("{}", err);
    reporter.page_error(&err);
    errors.push(err);
}
