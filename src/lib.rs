//! # parse-paper
//!
//! Extracts Markdown text, compressed images, and metadata from academic
//! papers in PDF form.
//!
//! ## Quick Start
//!
//! ```no_run
//! use parse_paper::{extract_text_only, TextRequest};
//!
//! fn main() -> parse_paper::Result<()> {
//!     let request = TextRequest {
//!         max_chars: Some(2000),
//!         ..Default::default()
//!     };
//!     let result = extract_text_only("paper.pdf", &request)?;
//!     println!("{}", parse_paper::render::text_report(&result));
//!     Ok(())
//! }
//! ```
//!
//! ## Operations
//!
//! - [`parse_paper`]: metadata, text and images in one call
//! - [`extract_text_only`]: Markdown text of selected pages
//! - [`extract_images_only`]: compressed image files of selected pages
//! - [`get_paper_metadata`]: document information
//!
//! Each call opens the PDF, does its work and releases the document before
//! returning. Use [`PaperParser`] with a [`PaperConfig`] to change defaults
//! such as the image output directory.

pub mod detect;
pub mod document;
pub mod error;
pub mod extract;
pub mod model;
pub mod paper;
pub mod parser;
pub mod render;

#[cfg(test)]
mod test_support;

pub use document::{Metadata, PageSelection, PaperDocument};
pub use error::{Error, ErrorKind, Result, ToolError};
pub use extract::{
    ExtractedImage, ExtractionWarning, ImageFormat, PageText, Quality, QualitySettings, TextResult,
};
pub use paper::{
    ImageRequest, ImageResult, PaperConfig, PaperParser, PaperResult, ParseRequest, TextRequest,
};
pub use render::{CleanupPreset, JsonFormat};

use std::path::Path;

/// Extract metadata, text and (by default) images with the default
/// configuration.
pub fn parse_paper<P: AsRef<Path>>(pdf_path: P, request: &ParseRequest) -> Result<PaperResult> {
    PaperParser::default().parse_paper(pdf_path, request)
}

/// Extract Markdown text with the default configuration.
pub fn extract_text_only<P: AsRef<Path>>(pdf_path: P, request: &TextRequest) -> Result<TextResult> {
    PaperParser::default().extract_text_only(pdf_path, request)
}

/// Extract and compress images with the default configuration.
///
/// Without an `output_dir` the files go to
/// `<temp>/parse_paper/<pdf stem>-<path hash>`.
pub fn extract_images_only<P: AsRef<Path>>(
    pdf_path: P,
    request: &ImageRequest,
) -> Result<ImageResult> {
    PaperParser::default().extract_images_only(pdf_path, request)
}

/// Read the metadata of a PDF.
pub fn get_paper_metadata<P: AsRef<Path>>(pdf_path: P) -> Result<Metadata> {
    PaperParser::default().get_paper_metadata(pdf_path)
}

/// Get the library version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
