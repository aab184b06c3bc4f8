//! Text and image extraction from an opened paper.

pub mod compress;
pub mod images;
pub mod quality;
pub mod text;

pub use images::{extract_images, ExtractedImage, ImageExtraction, ImageOptions};
pub use compress::{compress_image, decode_image, CompressedImage};
pub use quality::{ImageFormat, Quality, QualitySettings};
pub use text::{extract_text, PageText, PageTexts, TextExtractor, TextOptions, TextResult};

use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// An item skipped during extraction.
///
/// Per-item failures never abort a call; they are recorded here instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionWarning {
    /// Zero-based page index
    pub page: usize,
    /// Zero-based image index on the page, for image failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_index: Option<usize>,
    /// What went wrong
    pub reason: String,
}

impl ExtractionWarning {
    /// A page whose text could not be extracted.
    pub fn page(page: usize, reason: impl Into<String>) -> Self {
        Self {
            page,
            image_index: None,
            reason: reason.into(),
        }
    }

    /// An image that could not be decoded or encoded.
    pub fn image(page: usize, index: usize, reason: impl Into<String>) -> Self {
        Self {
            page,
            image_index: Some(index),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.image_index {
            Some(index) => write!(f, "page {} image {}: {}", self.page, index, self.reason),
            None => write!(f, "page {}: {}", self.page, self.reason),
        }
    }
}

/// Write `data` to `path` through a temporary file in the same directory.
///
/// Readers see either the previous file or the complete new one. The
/// temporary file is removed if anything fails before the rename.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".parse-paper-")
        .suffix(".part")
        .tempfile_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
