//! Markdown text extraction.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::document::{PageSelection, PaperDocument};
use crate::error::{Error, Result};
use crate::parser::{LayoutAnalyzer, ListMarkers, LopdfBackend};
use crate::render::{truncate_chars, CleanupPipeline, CleanupPreset, MarkdownRenderer};

use super::{write_atomic, ExtractionWarning};

/// Separator placed between pages in assembled text.
pub const DEFAULT_PAGE_SEPARATOR: &str = "\n\n-----\n\n";

/// Characters returned in place of text that was saved to a file.
pub const DEFAULT_PREVIEW_CHARS: usize = 500;

/// Markdown for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// Zero-based page index
    pub page: usize,
    /// Cleaned Markdown, empty for pages without text
    pub markdown: String,
}

/// Renders pages of one document to Markdown.
pub struct TextExtractor<'d> {
    document: &'d PaperDocument,
    backend: LopdfBackend<'d>,
    markers: ListMarkers,
    renderer: MarkdownRenderer,
    cleanup: CleanupPipeline,
}

impl<'d> TextExtractor<'d> {
    /// Create an extractor applying the given cleanup preset.
    pub fn new(document: &'d PaperDocument, cleanup: CleanupPreset) -> Self {
        Self {
            document,
            backend: LopdfBackend::new(document),
            markers: ListMarkers::new(),
            renderer: MarkdownRenderer::default(),
            cleanup: CleanupPipeline::from_preset(cleanup),
        }
    }

    /// Markdown of the page at a zero-based index.
    pub fn extract_page(&self, page: usize) -> Result<String> {
        let page_id = self.document.page_id(page)?;
        let analyzer = LayoutAnalyzer::with_markers(&self.backend, self.markers.clone());
        let model = analyzer.page(page, page_id)?;
        let markdown = self.renderer.render_page(&model);
        Ok(self.cleanup.process(&markdown))
    }

    /// Lazily render the selected pages in ascending order.
    ///
    /// The selection is validated up front, so an out-of-range index fails
    /// before any page is rendered.
    pub fn pages(&self, selection: &PageSelection) -> Result<PageTexts<'_, 'd>> {
        let pages = self.document.resolve_pages(selection)?;
        Ok(PageTexts {
            extractor: self,
            pages: pages.into_iter(),
            warnings: Vec::new(),
        })
    }
}

/// One-shot iterator over per-page Markdown.
///
/// A page that fails to render yields an empty unit and records a warning,
/// so the iterator always yields one item per selected page.
pub struct PageTexts<'e, 'd> {
    extractor: &'e TextExtractor<'d>,
    pages: std::vec::IntoIter<usize>,
    warnings: Vec<ExtractionWarning>,
}

impl PageTexts<'_, '_> {
    /// Warnings recorded so far.
    pub fn warnings(&self) -> &[ExtractionWarning] {
        &self.warnings
    }

    /// Consume the iterator, keeping its warnings.
    pub fn into_warnings(self) -> Vec<ExtractionWarning> {
        self.warnings
    }
}

impl Iterator for PageTexts<'_, '_> {
    type Item = PageText;

    fn next(&mut self) -> Option<Self::Item> {
        let page = self.pages.next()?;
        let markdown = match self.extractor.extract_page(page) {
            Ok(markdown) => markdown,
            Err(e) => {
                log::warn!("Skipping text of page {}: {}", page, e);
                self.warnings.push(ExtractionWarning::page(page, e.to_string()));
                String::new()
            }
        };
        Some(PageText { page, markdown })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pages.size_hint()
    }
}

impl ExactSizeIterator for PageTexts<'_, '_> {}

/// Options for assembling document text.
#[derive(Debug, Clone)]
pub struct TextOptions {
    /// Separator placed between pages
    pub page_separator: String,
    /// Cleanup applied to each page
    pub cleanup: CleanupPreset,
    /// Character budget for the returned text
    pub max_chars: Option<usize>,
    /// Write the full text here and return a preview instead
    pub save_to: Option<PathBuf>,
    /// Preview length when saving
    pub preview_chars: usize,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            page_separator: DEFAULT_PAGE_SEPARATOR.to_string(),
            cleanup: CleanupPreset::default(),
            max_chars: None,
            save_to: None,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

/// Assembled text of the selected pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextResult {
    /// Markdown text, possibly truncated or a preview of a saved file
    pub text: String,
    /// Number of pages in the document
    pub page_count: usize,
    /// Zero-based indices of the pages included, ascending
    pub pages_processed: Vec<usize>,
    /// Length of the full text in characters
    pub total_chars: usize,
    /// Whether `text` is shorter than the full text
    pub truncated: bool,
    /// File holding the full text
    pub saved_to: Option<PathBuf>,
    /// Pages that could not be rendered
    pub warnings: Vec<ExtractionWarning>,
}

/// Extract, assemble and truncate the text of the selected pages.
///
/// Truncation applies once to the assembled text, never per page.
pub fn extract_text(
    document: &PaperDocument,
    selection: &PageSelection,
    options: &TextOptions,
) -> Result<TextResult> {
    let extractor = TextExtractor::new(document, options.cleanup);
    let mut pages = extractor.pages(selection)?;

    let mut full = String::new();
    let mut pages_processed = Vec::with_capacity(pages.len());
    for (i, page) in (&mut pages).enumerate() {
        if i > 0 {
            full.push_str(&options.page_separator);
        }
        full.push_str(&page.markdown);
        pages_processed.push(page.page);
    }
    let warnings = pages.into_warnings();
    let total_chars = full.chars().count();

    let (text, saved_to) = match &options.save_to {
        Some(path) => {
            write_atomic(path, full.as_bytes()).map_err(|source| match path.parent() {
                Some(parent) if !parent.exists() => Error::OutputDir {
                    path: parent.to_path_buf(),
                    source,
                },
                _ => Error::Io(source),
            })?;
            log::info!("Saved {} characters of text to {}", total_chars, path.display());

            let limit = options
                .max_chars
                .map_or(options.preview_chars, |n| n.min(options.preview_chars));
            (truncate_chars(&full, limit).into_owned(), Some(path.clone()))
        }
        None => match options.max_chars {
            Some(limit) => (truncate_chars(&full, limit).into_owned(), None),
            None => (full, None),
        },
    };

    let truncated = text.chars().count() < total_chars;
    Ok(TextResult {
        text,
        page_count: document.page_count(),
        pages_processed,
        total_chars,
        truncated,
        saved_to,
        warnings,
    })
}
