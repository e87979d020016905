//! High-resolution page rasters, stored apart from the page list.
//!
//! Rendering at export quality is the most expensive step of the whole
//! pipeline, so it happens once at import and the result is kept here until
//! the owning page is removed. There is no eviction: memory grows with the
//! number of loaded pages.

use crate::session::PageId;
use std::collections::HashMap;
use std::sync::Arc;

/// One page rendered at export resolution, PNG-encoded.
///
/// The encoded bytes are reference counted so the export task can take its
/// own handle without copying multi-megabyte buffers.
#[derive(Debug, Clone)]
pub struct RasterEntry {
    png: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl RasterEntry {
    pub fn new(png: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            png: png.into(),
            width,
            height,
        }
    }

    /// PNG bytes of the render.
    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        self.png.len()
    }
}

/// Map from page id to its export raster.
#[derive(Debug, Default)]
pub struct RasterCache {
    entries: HashMap<PageId, RasterEntry>,
}

impl RasterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) the raster for `id`.
    pub fn put(&mut self, id: PageId, entry: RasterEntry) {
        self.entries.insert(id, entry);
    }

    /// Look up the raster for `id`. A miss is recoverable; callers skip the page.
    pub fn get(&self, id: PageId) -> Option<&RasterEntry> {
        self.entries.get(&id)
    }

    pub fn remove(&mut self, id: PageId) -> Option<RasterEntry> {
        self.entries.remove(&id)
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total encoded bytes held by the cache.
    pub fn encoded_bytes(&self) -> usize {
        self.entries.values().map(RasterEntry::encoded_len).sum()
    }
}
