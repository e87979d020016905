//! Import: decode source PDFs and render every page twice.
//!
//! Runs entirely inside one `spawn_blocking` task. The engine is bound first;
//! if that fails nothing has been touched and the whole import is rejected.
//! After that every failure is per file or per page: it is logged, forwarded
//! to the progress callback and collected, and the batch carries on.

use crate::cache::RasterEntry;
use crate::config::ImportConfig;
use crate::error::{NoteError, PageError};
use crate::pipeline::encode::encode_png;
use crate::pipeline::input::SourceFile;
use crate::pipeline::render::{PdfEngine, SourceDocument};
use crate::progress::{import_percent, Reporter};
use crate::session::Thumbnail;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// One page that rendered at both resolutions.
#[derive(Debug)]
pub(crate) struct RenderedPage {
    pub page_number: u16,
    pub thumbnail: Thumbnail,
    pub raster: RasterEntry,
}

/// A successfully decoded source file and the pages that survived rendering.
#[derive(Debug)]
pub(crate) struct DecodedDocument {
    pub name: String,
    pub size_bytes: u64,
    pub page_count: u16,
    pub pages: Vec<RenderedPage>,
}

/// Everything an import produced, ready to be committed to the session.
#[derive(Debug, Default)]
pub(crate) struct ImportBatch {
    pub documents: Vec<DecodedDocument>,
    pub errors: Vec<PageError>,
}

/// Run [`import_blocking`] on the blocking pool.
pub(crate) async fn import_files(
    engine: Arc<dyn PdfEngine>,
    files: Vec<SourceFile>,
    config: &ImportConfig,
    reporter: &Reporter,
) -> Result<ImportBatch, NoteError> {
    let config = config.clone();
    let reporter = reporter.clone();
    tokio::task::spawn_blocking(move || import_blocking(engine.as_ref(), files, &config, &reporter))
        .await
        .map_err(|e| NoteError::Internal(format!("import task panicked: {e}")))?
}

pub(crate) fn import_blocking(
    engine: &dyn PdfEngine,
    files: Vec<SourceFile>,
    config: &ImportConfig,
    reporter: &Reporter,
) -> Result<ImportBatch, NoteError> {
    let start = Instant::now();
    reporter.report(10.0, "Loading PDFs...");

    let loader = engine.bind()?;
    let mut errors = Vec::new();

    // Decode everything first so progress can be measured against the
    // combined page count of the batch.
    let mut loaded: Vec<(String, u64, Box<dyn SourceDocument + '_>)> = Vec::new();
    for file in files {
        let size_bytes = file.size();
        let SourceFile { name, bytes } = file;
        match loader.load_document(bytes) {
            Ok(doc) => {
                debug!("{}: {} pages", name, doc.page_count());
                loaded.push((name, size_bytes, doc));
            }
            Err(detail) => {
                let err = PageError::DecodeFailed {
                    file: name,
                    detail,
                };
                record(&mut errors, reporter, err);
            }
        }
    }

    let total: usize = loaded.iter().map(|(_, _, d)| d.page_count() as usize).sum();
    info!(
        "Decoded {} of {} files, {} pages to render",
        loaded.len(),
        loaded.len() + errors.len(),
        total
    );

    let mut documents = Vec::with_capacity(loaded.len());
    let mut done = 0usize;
    for (name, size_bytes, doc) in loaded {
        let page_count = doc.page_count();
        let mut pages = Vec::with_capacity(page_count as usize);

        for page_number in 1..=page_count {
            match render_twice(doc.as_ref(), page_number, config) {
                Ok(page) => pages.push(page),
                Err(detail) => record(
                    &mut errors,
                    reporter,
                    PageError::RenderFailed {
                        file: name.clone(),
                        page: page_number,
                        detail,
                    },
                ),
            }
            done += 1;
            reporter.report(
                import_percent(done, total),
                format!("Loading pages... ({done}/{total})"),
            );
        }

        if pages.len() < page_count as usize {
            warn!(
                "{}: {} of {} pages imported",
                name,
                pages.len(),
                page_count
            );
        }
        documents.push(DecodedDocument {
            name,
            size_bytes,
            page_count,
            pages,
        });
    }

    reporter.report(95.0, "Finishing import...");
    info!(
        "Rendered {} pages in {} ms ({} errors)",
        documents.iter().map(|d| d.pages.len()).sum::<usize>(),
        start.elapsed().as_millis(),
        errors.len()
    );

    Ok(ImportBatch { documents, errors })
}

fn render_twice(
    doc: &dyn SourceDocument,
    page_number: u16,
    config: &ImportConfig,
) -> Result<RenderedPage, String> {
    let small = doc.render_page(page_number, config.thumbnail_scale)?;
    let thumbnail = Thumbnail::new(
        encode_png(&small).map_err(|e| format!("thumbnail PNG: {e}"))?,
        small.width(),
        small.height(),
    );

    let large = doc.render_page(page_number, config.export_scale)?;
    let raster = RasterEntry::new(
        encode_png(&large).map_err(|e| format!("export PNG: {e}"))?,
        large.width(),
        large.height(),
    );

    Ok(RenderedPage {
        page_number,
        thumbnail,
        raster,
    })
}

fn record(errors: &mut Vec<PageError>, reporter: &Reporter, err: PageError) {
    error!("{}", err);
    reporter.page_error(&err);
    errors.push(err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::render::PdfLoader;
    use image::{Rgba, RgbaImage};

    /// "PDF" whose bytes after the header are one byte per page; a zero byte
    /// marks a page that fails to render.
    struct ByteEngine;
    struct ByteLoader;
    struct ByteDoc(Vec<u8>);

    impl PdfEngine for ByteEngine {
        fn bind(&self) -> Result<Box<dyn PdfLoader>, NoteError> {
            Ok(Box::new(ByteLoader))
        }
    }

    impl PdfLoader for ByteLoader {
        fn load_document(&self, bytes: Vec<u8>) -> Result<Box<dyn SourceDocument + '_>, String> {
            match bytes.strip_prefix(b"%PDF") {
                Some(pages) => Ok(Box::new(ByteDoc(pages.to_vec()))),
                None => Err("no header".into()),
            }
        }
    }

    impl SourceDocument for ByteDoc {
        fn page_count(&self) -> u16 {
            self.0.len() as u16
        }

        fn render_page(&self, page_number: u16, scale: f32) -> Result<RgbaImage, String> {
            let shade = self.0[page_number as usize - 1];
            if shade == 0 {
                return Err("broken page".into());
            }
            let side = (8.0 * scale).max(1.0) as u32;
            Ok(RgbaImage::from_pixel(side, side, Rgba([shade, shade, shade, 255])))
        }
    }

    #[test]
    fn renders_thumbnail_and_raster_per_page() {
        let files = vec![SourceFile::new("a.pdf", b"%PDF\x10\x20".to_vec())];
        let batch =
            import_blocking(&ByteEngine, files, &ImportConfig::default(), &Reporter::default())
                .unwrap();

        assert!(batch.errors.is_empty());
        let doc = &batch.documents[0];
        assert_eq!((doc.name.as_str(), doc.page_count, doc.size_bytes), ("a.pdf", 2, 6));
        let page = &doc.pages[1];
        assert_eq!(page.page_number, 2);
        assert_eq!((page.thumbnail.width, page.thumbnail.height), (4, 4));
        assert_eq!((page.raster.width(), page.raster.height()), (32, 32));
    }

    #[test]
    fn failures_are_collected_not_fatal() {
        let files = vec![
            SourceFile::new("broken.pdf", b"garbage".to_vec()),
            SourceFile::new("b.pdf", b"%PDF\x10\x00\x30".to_vec()),
        ];
        let batch =
            import_blocking(&ByteEngine, files, &ImportConfig::default(), &Reporter::default())
                .unwrap();

        assert_eq!(batch.documents.len(), 1);
        let pages: Vec<u16> = batch.documents[0].pages.iter().map(|p| p.page_number).collect();
        assert_eq!(pages, vec![1, 3]);
        assert!(matches!(
            batch.errors[0],
            PageError::DecodeFailed { ref file, .. } if file == "broken.pdf"
        ));
        assert!(matches!(batch.errors[1], PageError::RenderFailed { page: 2, .. }));
    }

    #[test]
    fn binding_failure_is_fatal() {
        struct Unbound;
        impl PdfEngine for Unbound {
            fn bind(&self) -> Result<Box<dyn PdfLoader>, NoteError> {
                Err(NoteError::PdfiumBindingFailed("missing".into()))
            }
        }
        let files = vec![SourceFile::new("a.pdf", b"%PDF\x10".to_vec())];
        let err = import_blocking(&Unbound, files, &ImportConfig::default(), &Reporter::default())
            .unwrap_err();
        assert!(matches!(err, NoteError::PdfiumBindingFailed(_)));
    }
}
