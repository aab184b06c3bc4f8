//! Error types for parse-paper.

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for parse-paper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting content from a paper.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input path does not exist.
    #[error("PDF file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and cannot be read.
    #[error("Document is encrypted")]
    Encrypted,

    /// An embedded image could not be decoded or re-encoded.
    #[error("Cannot decode image {index} on page {page}: {reason}")]
    ImageDecode {
        /// Zero-based page index
        page: usize,
        /// Zero-based index of the image on the page
        index: usize,
        /// What went wrong
        reason: String,
    },

    /// Image codec failure outside of a specific page context.
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    /// Page index is out of range.
    #[error("Page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange {
        /// Requested zero-based page index
        page: usize,
        /// Number of pages in the document
        page_count: usize,
    },

    /// The output directory cannot be created or written.
    #[error("Cannot write to output directory {}: {source}", path.display())]
    OutputDir {
        /// Directory that was requested
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// Unknown quality tier name.
    #[error("Unknown quality tier '{0}' (expected high, medium, or low)")]
    InvalidQuality(String),

    /// Unknown output image format.
    #[error("Unknown image format '{0}' (expected jpg or png)")]
    InvalidImageFormat(String),

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// A tool request could not be read from its named parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Error during rendering (Markdown, JSON).
    #[error("Rendering error: {0}")]
    Render(String),
}

impl Error {
    /// Coarse category of this error, as reported to tool callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::UnknownFormat
            | Error::UnsupportedVersion(_)
            | Error::PdfParse(_)
            | Error::Encrypted
            | Error::ImageDecode { .. }
            | Error::Image(_) => ErrorKind::Format,
            Error::PageOutOfRange { .. } => ErrorKind::PageRange,
            Error::Io(_) | Error::OutputDir { .. } | Error::Render(_) => ErrorKind::Io,
            Error::InvalidQuality(_)
            | Error::InvalidImageFormat(_)
            | Error::InvalidPageRange(_)
            | Error::InvalidRequest(_) => ErrorKind::InvalidArgument,
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

/// Error category visible to tool callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The input path does not exist
    NotFound,
    /// The PDF or an embedded image cannot be parsed
    Format,
    /// A requested page index is out of bounds
    PageRange,
    /// Output cannot be written
    Io,
    /// A parameter value was rejected before any work started
    InvalidArgument,
}

/// Serializable error value returned to tool callers in place of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
}

impl From<&Error> for ToolError {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<Error> for ToolError {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}
