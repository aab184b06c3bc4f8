//! Tool results.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::document::Metadata;
use crate::extract::{ExtractedImage, ExtractionWarning, ImageFormat, Quality};

/// Result of `parse_paper`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperResult {
    pub metadata: Metadata,
    /// Markdown text, possibly truncated or a preview of a saved file
    pub text: String,
    /// Whether `text` is shorter than the full text
    pub truncated: bool,
    /// Length of the full text in characters
    pub total_chars: usize,
    /// File holding the full text
    pub saved_text_to: Option<PathBuf>,
    /// Published images, empty when image extraction was off
    pub images: Vec<ExtractedImage>,
    /// Directory images were written to, `None` when extraction was off
    pub output_dir: Option<PathBuf>,
    pub page_count: usize,
    /// Zero-based indices of the pages included, ascending
    pub pages_processed: Vec<usize>,
    /// Pages and images that were skipped
    pub warnings: Vec<ExtractionWarning>,
}

/// Result of `extract_images_only`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResult {
    /// Published images in page order
    pub images: Vec<ExtractedImage>,
    pub output_dir: PathBuf,
    pub quality: Quality,
    pub format: ImageFormat,
    pub page_count: usize,
    /// Zero-based indices of the pages searched, ascending
    pub pages_processed: Vec<usize>,
    /// Images that could not be decoded or encoded
    pub warnings: Vec<ExtractionWarning>,
}

impl ImageResult {
    /// Combined size of the written files in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.images.iter().map(|i| i.file_size).sum()
    }
}
