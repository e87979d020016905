//! The editing session: loaded documents, their pages, the selection and
//! the raster cache.
//!
//! [`Session::import`] takes `&mut self` and [`Session::export`] takes
//! `&self`, so at most one import or export can be in flight per session and
//! an export can never observe a half-committed import. Imports commit in a
//! single step after all rendering is done; a fatal error leaves the session
//! exactly as it was.

use crate::cache::RasterCache;
use crate::config::{ExportConfig, ImportConfig, PageSelection};
use crate::error::{NoteError, PageError};
use crate::pipeline::compose::{OutputDocument, PdfWriter};
use crate::pipeline::export::{export_pages, ExportJob, ExportOutput};
use crate::pipeline::import::{import_files, ImportBatch};
use crate::pipeline::input::SourceFile;
use crate::pipeline::render::PdfEngine;
use crate::progress::Reporter;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Stable identity of one imported page. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PageId(pub(crate) u64);

impl PageId {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Stable identity of one imported source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocumentId(pub(crate) u64);

impl DocumentId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A loaded source document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub id: DocumentId,
    pub name: String,
    pub size_bytes: u64,
    /// Pages in the source file, including any that failed to render.
    pub page_count: u16,
}

/// Low-resolution preview of a page, PNG-encoded.
#[derive(Clone)]
pub struct Thumbnail {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Thumbnail {
    pub fn new(png: Vec<u8>, width: u32, height: u32) -> Self {
        Self { png, width, height }
    }
}

impl fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thumbnail({}x{}, {} bytes)", self.width, self.height, self.png.len())
    }
}

/// One page in the session's page list.
#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    pub id: PageId,
    pub document: DocumentId,
    pub file_name: String,
    /// 1-based page number inside the source document.
    pub page_number: u16,
    #[serde(skip)]
    pub thumbnail: Thumbnail,
    /// Pixel size of the cached export raster.
    pub export_width: u32,
    pub export_height: u32,
}

/// Outcome of one [`Session::import`] call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    /// Documents added to the session, in input order.
    pub documents: Vec<DocumentId>,
    pub pages_added: usize,
    /// Files and pages that were skipped.
    pub errors: Vec<PageError>,
    /// Inputs that were not PDFs and never reached the decoder.
    pub rejected_files: Vec<String>,
}

/// All loaded documents and the state built on top of them.
pub struct Session {
    engine: Arc<dyn PdfEngine>,
    documents: Vec<DocumentInfo>,
    pages: Vec<PageRecord>,
    selection: BTreeSet<PageId>,
    cache: RasterCache,
    next_document: u64,
    next_page: u64,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("documents", &self.documents.len())
            .field("pages", &self.pages.len())
            .field("selected", &self.selection.len())
            .field("cached_bytes", &self.cache.encoded_bytes())
            .finish()
    }
}

impl Session {
    pub fn new(engine: Arc<dyn PdfEngine>) -> Self {
        Self {
            engine,
            documents: Vec::new(),
            pages: Vec::new(),
            selection: BTreeSet::new(),
            cache: RasterCache::new(),
            next_document: 1,
            next_page: 1,
        }
    }

    // ── Import ───────────────────────────────────────────────────────────

    /// Decode `files`, render every page and append the results.
    ///
    /// Non-PDF inputs are rejected with a warning. Files that fail to decode
    /// and pages that fail to render are skipped and listed in the report.
    /// On success the selection becomes exactly the newly added pages.
    ///
    /// # Errors
    /// Only [`NoteError::PdfiumBindingFailed`] or an internal task failure;
    /// the session is unchanged in both cases.
    pub async fn import(
        &mut self,
        files: Vec<SourceFile>,
        config: &ImportConfig,
    ) -> Result<ImportReport, NoteError> {
        let reporter = Reporter::new(config.progress_callback.clone());

        // ── Step 1: Reject non-PDF inputs ────────────────────────────────
        let mut rejected_files = Vec::new();
        let files: Vec<SourceFile> = files
            .into_iter()
            .filter(|f| {
                if f.is_pdf() {
                    true
                } else {
                    warn!("{} is not a PDF, skipping", f.name);
                    rejected_files.push(f.name.clone());
                    false
                }
            })
            .collect();

        if files.is_empty() {
            info!("No PDF files to import");
            return Ok(ImportReport {
                rejected_files,
                ..ImportReport::default()
            });
        }
        info!("Importing {} files", files.len());

        // ── Step 2: Decode and render off the async runtime ──────────────
        let batch = match import_files(self.engine.clone(), files, config, &reporter).await {
            Ok(batch) => batch,
            Err(e) => {
                error!("Import failed: {}", e);
                reporter.status("Error loading files");
                reporter.settle_after(config.error_settle_delay);
                return Err(e);
            }
        };

        // ── Step 3: Commit ───────────────────────────────────────────────
        let report = self.commit(batch, rejected_files);
        reporter.report(100.0, "Ready!");
        reporter.settle_after(config.settle_delay);

        info!(
            "Imported {} pages from {} documents ({} skipped)",
            report.pages_added,
            report.documents.len(),
            report.errors.len()
        );
        Ok(report)
    }

    fn commit(&mut self, batch: ImportBatch, rejected_files: Vec<String>) -> ImportReport {
        let mut added = BTreeSet::new();
        let mut documents = Vec::new();

        for doc in batch.documents {
            if doc.pages.is_empty() {
                warn!("{}: no page could be rendered, document not added", doc.name);
                continue;
            }
            let id = DocumentId(self.next_document);
            self.next_document += 1;

            for page in doc.pages {
                let page_id = PageId(self.next_page);
                self.next_page += 1;
                self.pages.push(PageRecord {
                    id: page_id,
                    document: id,
                    file_name: doc.name.clone(),
                    page_number: page.page_number,
                    thumbnail: page.thumbnail,
                    export_width: page.raster.width(),
                    export_height: page.raster.height(),
                });
                self.cache.put(page_id, page.raster);
                added.insert(page_id);
            }

            debug!("Added document {} '{}'", id, doc.name);
            self.documents.push(DocumentInfo {
                id,
                name: doc.name,
                size_bytes: doc.size_bytes,
                page_count: doc.page_count,
            });
            documents.push(id);
        }

        let pages_added = added.len();
        self.selection = added;

        ImportReport {
            documents,
            pages_added,
            errors: batch.errors,
            rejected_files,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn documents(&self) -> &[DocumentInfo] {
        &self.documents
    }

    pub fn document(&self, id: DocumentId) -> Option<&DocumentInfo> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Every page, in position order.
    pub fn pages(&self) -> &[PageRecord] {
        &self.pages
    }

    pub fn page(&self, id: PageId) -> Option<&PageRecord> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// 0-based index of `id` in the page list.
    pub fn position_of(&self, id: PageId) -> Option<usize> {
        self.pages.iter().position(|p| p.id == id)
    }

    /// Pages belonging to one document, in position order.
    pub fn pages_of(&self, document: DocumentId) -> impl Iterator<Item = &PageRecord> {
        self.pages.iter().filter(move |p| p.document == document)
    }

    pub fn raster_cache(&self) -> &RasterCache {
        &self.cache
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    // ── Selection ────────────────────────────────────────────────────────

    pub fn selection(&self) -> &BTreeSet<PageId> {
        &self.selection
    }

    pub fn is_selected(&self, id: PageId) -> bool {
        self.selection.contains(&id)
    }

    /// Flip one page's membership. Returns the new state; unknown ids stay
    /// unselected.
    pub fn toggle_selection(&mut self, id: PageId) -> bool {
        if self.selection.remove(&id) {
            return false;
        }
        if self.page(id).is_none() {
            return false;
        }
        self.selection.insert(id);
        true
    }

    pub fn select_all(&mut self) {
        self.selection = self.pages.iter().map(|p| p.id).collect();
    }

    pub fn deselect_all(&mut self) {
        self.selection.clear();
    }

    /// Select every page of `document`, or deselect them all if they already
    /// were all selected.
    pub fn select_document(&mut self, document: DocumentId) -> Result<(), NoteError> {
        if self.document(document).is_none() {
            return Err(NoteError::UnknownDocument {
                id: document.value(),
            });
        }
        let ids: Vec<PageId> = self.pages_of(document).map(|p| p.id).collect();
        if ids.iter().all(|id| self.selection.contains(id)) {
            for id in &ids {
                self.selection.remove(id);
            }
        } else {
            self.selection.extend(ids);
        }
        Ok(())
    }

    /// Replace the selection with the pages at the given 1-based positions.
    /// Out-of-range positions are ignored.
    pub fn select_pages(&mut self, selection: &PageSelection) {
        self.selection = selection
            .to_indices(self.pages.len())
            .into_iter()
            .filter_map(|i| self.pages.get(i).map(|p| p.id))
            .collect();
    }

    // ── Removal ──────────────────────────────────────────────────────────

    /// Remove a document with its pages, rasters and selection entries.
    pub fn remove_document(&mut self, document: DocumentId) -> Result<DocumentInfo, NoteError> {
        let index = self
            .documents
            .iter()
            .position(|d| d.id == document)
            .ok_or(NoteError::UnknownDocument {
                id: document.value(),
            })?;
        let info = self.documents.remove(index);

        let cache = &mut self.cache;
        let selection = &mut self.selection;
        self.pages.retain(|p| {
            if p.document != document {
                return true;
            }
            cache.remove(p.id);
            selection.remove(&p.id);
            false
        });

        info!("Removed document {} '{}'", info.id, info.name);
        Ok(info)
    }

    /// Drop every document, page, raster and selection entry.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.pages.clear();
        self.selection.clear();
        self.cache.clear();
        debug!("Session cleared");
    }

    // ── Export ───────────────────────────────────────────────────────────

    /// Export the selected pages with the default [`PdfWriter`].
    pub async fn export(&self, config: &ExportConfig) -> Result<ExportOutput, NoteError> {
        self.export_with(config, Box::new(PdfWriter::new())).await
    }

    /// Export the selected pages into `output`.
    ///
    /// # Errors
    /// [`NoteError::EmptySelection`] before any work is done,
    /// [`NoteError::NothingExported`] if every selected page was skipped, or
    /// [`NoteError::SerializationFailed`] from the writer. The session is
    /// borrowed immutably, so a failed export can simply be retried.
    pub async fn export_with(
        &self,
        config: &ExportConfig,
        output: Box<dyn OutputDocument>,
    ) -> Result<ExportOutput, NoteError> {
        if self.selection.is_empty() {
            return Err(NoteError::EmptySelection);
        }
        let reporter = Reporter::new(config.progress_callback.clone());

        let jobs: Vec<ExportJob> = self
            .pages
            .iter()
            .filter(|p| self.selection.contains(&p.id))
            .map(|p| ExportJob {
                file: p.file_name.clone(),
                page_number: p.page_number,
                raster: self.cache.get(p.id).cloned(),
            })
            .collect();
        info!("Exporting {} selected pages", jobs.len());

        let result = export_pages(jobs, config.filters, config.layout, output, &reporter).await;
        match result {
            Ok(ref out) => {
                reporter.report(100.0, "Download complete!");
                debug!("Export ready as {}", out.file_name);
            }
            Err(ref e) => {
                error!("Export failed: {}", e);
                reporter.status("Error occurred");
            }
        }
        reporter.settle_after(config.settle_delay);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RasterEntry;
    use crate::pipeline::import::{DecodedDocument, RenderedPage};
    use crate::pipeline::render::PdfLoader;

    struct NoEngine;

    impl PdfEngine for NoEngine {
        fn bind(&self) -> Result<Box<dyn PdfLoader>, NoteError> {
            Err(NoteError::PdfiumBindingFailed("not available in unit tests".into()))
        }
    }

    fn rendered(page_number: u16) -> RenderedPage {
        RenderedPage {
            page_number,
            thumbnail: Thumbnail::new(vec![1, 2, 3], 2, 3),
            raster: RasterEntry::new(vec![4, 5, 6, 7], 8, 12),
        }
    }

    fn doc(name: &str, pages: u16) -> DecodedDocument {
        DecodedDocument {
            name: name.into(),
            size_bytes: 1000,
            page_count: pages,
            pages: (1..=pages).map(rendered).collect(),
        }
    }

    fn session_with(docs: Vec<DecodedDocument>) -> (Session, ImportReport) {
        let mut s = Session::new(Arc::new(NoEngine));
        let report = s.commit(
            ImportBatch {
                documents: docs,
                errors: Vec::new(),
            },
            Vec::new(),
        );
        (s, report)
    }

    #[test]
    fn commit_appends_and_selects_new_pages() {
        let (mut s, first) = session_with(vec![doc("a.pdf", 2)]);
        assert_eq!(first.pages_added, 2);

        let second = s.commit(
            ImportBatch {
                documents: vec![doc("b.pdf", 3)],
                errors: Vec::new(),
            },
            Vec::new(),
        );
        assert_eq!(s.pages().len(), 5);
        assert_eq!(s.selection().len(), 3);
        let b = second.documents[0];
        assert!(s.selection().iter().all(|id| s.page(*id).unwrap().document == b));
        assert_eq!(s.pages()[0].file_name, "a.pdf");
        assert_eq!(s.raster_cache().len(), 5);
    }

    #[test]
    fn document_without_pages_is_not_added() {
        let mut empty = doc("blank.pdf", 2);
        empty.pages.clear();
        let (s, report) = session_with(vec![empty, doc("c.pdf", 1)]);
        assert_eq!(s.documents().len(), 1);
        assert_eq!(report.documents.len(), 1);
    }

    #[test]
    fn toggle_and_select_document() {
        let (mut s, report) = session_with(vec![doc("a.pdf", 2), doc("b.pdf", 2)]);
        let (a, b) = (report.documents[0], report.documents[1]);
        s.deselect_all();

        let first = s.pages()[0].id;
        assert!(s.toggle_selection(first));
        assert!(s.is_selected(first));

        // a is partially selected, so the toggle selects the rest
        s.select_document(a).unwrap();
        assert_eq!(s.selection().len(), 2);
        s.select_document(a).unwrap();
        assert!(s.selection().is_empty());

        s.select_document(b).unwrap();
        assert!(s.pages_of(b).all(|p| s.is_selected(p.id)));
        assert!(matches!(
            s.select_document(DocumentId(99)),
            Err(NoteError::UnknownDocument { id: 99 })
        ));
        assert!(!s.toggle_selection(PageId(999)));
    }

    #[test]
    fn select_pages_by_position() {
        let (mut s, _) = session_with(vec![doc("a.pdf", 5)]);
        s.select_pages(&PageSelection::Range(2, 3));
        let positions: Vec<usize> = s
            .selection()
            .iter()
            .map(|id| s.position_of(*id).unwrap())
            .collect();
        assert_eq!(positions, vec![1, 2]);
        s.select_pages(&PageSelection::Single(40));
        assert!(s.selection().is_empty());
        s.select_all();
        assert_eq!(s.selection().len(), 5);
    }

    #[test]
    fn remove_document_prunes_everything() {
        let (mut s, report) = session_with(vec![doc("a.pdf", 2), doc("b.pdf", 3)]);
        s.select_all();
        let removed = s.remove_document(report.documents[0]).unwrap();
        assert_eq!(removed.name, "a.pdf");

        assert_eq!(s.pages().len(), 3);
        assert_eq!(s.selection().len(), 3);
        assert_eq!(s.raster_cache().len(), 3);
        let first = s.pages()[0].id;
        assert_eq!(s.position_of(first), Some(0));
        assert!(s.remove_document(report.documents[0]).is_err());
    }

    #[test]
    fn clear_resets_state_but_not_ids() {
        let (mut s, _) = session_with(vec![doc("a.pdf", 1)]);
        let old = s.pages()[0].id;
        s.clear();
        assert!(s.is_empty());
        assert!(s.raster_cache().is_empty());

        s.commit(
            ImportBatch {
                documents: vec![doc("a.pdf", 1)],
                errors: Vec::new(),
            },
            Vec::new(),
        );
        assert_ne!(s.pages()[0].id, old);
    }

    #[tokio::test]
    async fn non_pdf_inputs_are_rejected_before_binding() {
        let mut s = Session::new(Arc::new(NoEngine));
        let report = s
            .import(
                vec![SourceFile::new("photo.png", b"\x89PNG".to_vec())],
                &ImportConfig::default(),
            )
            .await
            .unwrap();
        assert_eq!(report.rejected_files, vec!["photo.png".to_string()]);
        assert!(s.is_empty());
    }

    #[tokio::test]
    async fn empty_selection_is_rejected() {
        let (mut s, _) = session_with(vec![doc("a.pdf", 1)]);
        s.deselect_all();
        let err = s.export(&ExportConfig::default()).await.unwrap_err();
        assert!(matches!(err, NoteError::EmptySelection));
    }
}
