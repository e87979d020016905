//! Input resolution: turn paths or in-memory buffers into [`SourceFile`]s.
//!
//! Only content that starts with the PDF magic bytes (`%PDF`) is accepted
//! for import; everything else is rejected up front with a warning so pdfium
//! never sees it.

use crate::error::NoteError;
use std::path::Path;
use tracing::debug;

/// PDF files start with these four bytes.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// One user-supplied file, fully read into memory.
#[derive(Clone)]
pub struct SourceFile {
    /// Display name (file name without directories).
    pub name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a local file, validating existence and read permission.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, NoteError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => NoteError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => NoteError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        debug!("Read {} ({} bytes)", name, bytes.len());
        Ok(Self { name, bytes })
    }

    /// Whether the contents look like a PDF.
    pub fn is_pdf(&self) -> bool {
        self.bytes.starts_with(PDF_MAGIC)
    }

    /// Size of the file in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn magic_check() {
        assert!(SourceFile::new("a.pdf", b"%PDF-1.7\n".to_vec()).is_pdf());
        assert!(!SourceFile::new("a.png", b"\x89PNG\r\n".to_vec()).is_pdf());
        assert!(!SourceFile::new("empty.pdf", Vec::new()).is_pdf());
    }

    #[test]
    fn debug_hides_contents() {
        let f = SourceFile::new("notes.pdf", vec![0; 2048]);
        let dbg = format!("{f:?}");
        assert!(dbg.contains("notes.pdf"));
        assert!(dbg.contains("<2048 bytes>"));
    }

    #[tokio::test]
    async fn from_path_reads_name_and_bytes() {
        let mut tmp = tempfile::Builder::new()
            .prefix("lecture")
            .suffix(".pdf")
            .tempfile()
            .unwrap();
        tmp.write_all(b"%PDF-1.4 tiny").unwrap();

        let file = SourceFile::from_path(tmp.path()).await.unwrap();
        assert!(file.name.starts_with("lecture"));
        assert!(file.name.ends_with(".pdf"));
        assert_eq!(file.size(), 13);
        assert!(file.is_pdf());
    }

    #[tokio::test]
    async fn from_path_missing_file() {
        let err = SourceFile::from_path("/definitely/not/here.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, NoteError::FileNotFound { .. }));
    }
}
