//! The four tool operations over one PDF per call.
//!
//! Every call opens its own [`PaperDocument`], validates the request against
//! it before producing output, and drops the handle on return.

mod config;
mod request;
mod result;

pub use config::PaperConfig;
pub use request::{ImageRequest, ParseRequest, TextRequest};
pub use result::{ImageResult, PaperResult};

use std::path::{Path, PathBuf};

use crate::document::{Metadata, PaperDocument};
use crate::error::{Error, Result};
use crate::extract::{
    extract_images, extract_text, ImageFormat, ImageOptions, Quality, TextOptions, TextResult,
};

/// Runs extraction calls with a fixed configuration.
///
/// Holds no per-document state, so one parser can serve calls from several
/// threads.
#[derive(Debug, Clone, Default)]
pub struct PaperParser {
    config: PaperConfig,
}

impl PaperParser {
    /// Create a parser with the given configuration.
    pub fn new(config: PaperConfig) -> Self {
        Self { config }
    }

    /// Configuration applied to requests.
    pub fn config(&self) -> &PaperConfig {
        &self.config
    }

    /// Extract metadata, text and optionally images in one pass.
    ///
    /// Images are published before the text is saved, so a failed image
    /// write leaves no `save_text_to` file behind.
    pub fn parse_paper(&self, pdf_path: impl AsRef<Path>, request: &ParseRequest) -> Result<PaperResult> {
        let document = PaperDocument::open(pdf_path)?;
        let pages = document.resolve_pages(&request.pages)?;

        let image_options = if request.extract_images {
            let options = self.image_options(
                &document,
                request.output_dir.as_deref(),
                request.quality,
                request.image_format,
                request.return_base64,
            );
            prepare_output_dir(&options.output_dir)?;
            Some(options)
        } else {
            None
        };

        let (images, image_warnings, output_dir) = match image_options {
            Some(options) => {
                let extraction = extract_images(&document, &pages, &options)?;
                (extraction.images, extraction.warnings, Some(options.output_dir))
            }
            None => (Vec::new(), Vec::new(), None),
        };

        let metadata = document.metadata();
        let text = extract_text(
            &document,
            &request.pages,
            &self.text_options(request.max_chars, request.save_text_to.clone()),
        )?;
        let mut warnings = text.warnings;
        warnings.extend(image_warnings);

        log::info!(
            "Parsed {}: {} pages, {} characters, {} images, {} warnings",
            metadata.filename,
            pages.len(),
            text.total_chars,
            images.len(),
            warnings.len()
        );

        Ok(PaperResult {
            metadata,
            text: text.text,
            truncated: text.truncated,
            total_chars: text.total_chars,
            saved_text_to: text.saved_to,
            images,
            output_dir,
            page_count: document.page_count(),
            pages_processed: pages,
            warnings,
        })
    }

    /// Extract Markdown text of the selected pages.
    pub fn extract_text_only(&self, pdf_path: impl AsRef<Path>, request: &TextRequest) -> Result<TextResult> {
        let document = PaperDocument::open(pdf_path)?;
        let result = extract_text(
            &document,
            &request.pages,
            &self.text_options(request.max_chars, request.save_to.clone()),
        )?;
        log::info!(
            "Extracted {} characters from {} pages of {}",
            result.total_chars,
            result.pages_processed.len(),
            document.file_name()
        );
        Ok(result)
    }

    /// Compress and publish the images of the selected pages.
    pub fn extract_images_only(&self, pdf_path: impl AsRef<Path>, request: &ImageRequest) -> Result<ImageResult> {
        let document = PaperDocument::open(pdf_path)?;
        let pages = document.resolve_pages(&request.pages)?;
        let options = self.image_options(
            &document,
            request.output_dir.as_deref(),
            request.quality,
            request.image_format,
            request.return_base64,
        );

        let extraction = extract_images(&document, &pages, &options)?;
        Ok(ImageResult {
            images: extraction.images,
            output_dir: options.output_dir,
            quality: options.quality,
            format: options.format,
            page_count: document.page_count(),
            pages_processed: pages,
            warnings: extraction.warnings,
        })
    }

    /// Read the document information of a PDF.
    pub fn get_paper_metadata(&self, pdf_path: impl AsRef<Path>) -> Result<Metadata> {
        let document = PaperDocument::open(pdf_path)?;
        Ok(document.metadata())
    }

    fn text_options(&self, max_chars: Option<usize>, save_to: Option<PathBuf>) -> TextOptions {
        TextOptions {
            page_separator: self.config.page_separator.clone(),
            cleanup: self.config.cleanup,
            max_chars,
            save_to,
            preview_chars: self.config.preview_chars,
        }
    }

    fn image_options(
        &self,
        document: &PaperDocument,
        output_dir: Option<&Path>,
        quality: Option<Quality>,
        format: Option<ImageFormat>,
        return_base64: bool,
    ) -> ImageOptions {
        ImageOptions {
            output_dir: output_dir
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.config.output_dir_for(document.path())),
            quality: quality.unwrap_or(self.config.quality),
            format: format.unwrap_or(self.config.image_format),
            return_base64,
        }
    }
}

fn prepare_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| Error::OutputDir {
        path: dir.to_path_buf(),
        source,
    })
}
