//! Document handle bound to one PDF for the duration of one call.

mod metadata;
mod selection;

pub use metadata::Metadata;
pub(crate) use metadata::decode_text_string;
pub use selection::PageSelection;

use std::path::{Path, PathBuf};

use lopdf::{Document as LopdfDocument, ObjectId};

use crate::detect::sniff_path;
use crate::error::{Error, Result};

/// An opened, validated PDF.
///
/// The decoded lopdf document is owned by the handle and released when the
/// handle is dropped.
pub struct PaperDocument {
    doc: LopdfDocument,
    path: PathBuf,
    file_size: u64,
    encrypted: bool,
    page_ids: Vec<ObjectId>,
}

impl PaperDocument {
    /// Open and validate a PDF file.
    ///
    /// Fails with [`Error::NotFound`] if the path does not exist and with a
    /// format error if the file is not a readable PDF.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let file_size = std::fs::metadata(path)?.len();

        sniff_path(path)?;

        // lopdf reports files it cannot decrypt as Error::Decryption
        let doc = LopdfDocument::load(path)?;
        let encrypted = doc.is_encrypted();
        if encrypted {
            log::warn!("{} is encrypted; text may be unreadable", path.display());
        }

        let page_ids = doc.get_pages().into_values().collect();
        log::debug!("Opened {} ({} bytes)", path.display(), file_size);

        Ok(Self {
            doc,
            path: path.to_path_buf(),
            file_size,
            encrypted,
            page_ids,
        })
    }

    /// Path the document was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name component of the path.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Size of the file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Whether the file carried an encryption dictionary.
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Object id of the page at a zero-based index.
    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.page_ids
            .get(index)
            .copied()
            .ok_or(Error::PageOutOfRange {
                page: index,
                page_count: self.page_count(),
            })
    }

    /// Validate a selection against this document.
    pub fn resolve_pages(&self, selection: &PageSelection) -> Result<Vec<usize>> {
        selection.resolve(self.page_count())
    }

    /// Read the document information dictionary.
    pub fn metadata(&self) -> Metadata {
        Metadata::read(self)
    }

    /// Underlying lopdf document.
    pub fn inner(&self) -> &LopdfDocument {
        &self.doc
    }
}

impl std::fmt::Debug for PaperDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaperDocument")
            .field("path", &self.path)
            .field("file_size", &self.file_size)
            .field("page_count", &self.page_count())
            .finish()
    }
}
