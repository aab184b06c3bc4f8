//! PDF header sniffing.
//!
//! Runs before the full lopdf load so that obviously wrong inputs (HTML error
//! pages, images, empty files) fail fast with [`Error::UnknownFormat`].

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Header information found at the start of a PDF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfHeader {
    /// Version declared in the header (e.g. "1.7", "2.0")
    pub version: String,
    /// Byte offset of `%PDF-` within the file
    pub offset: usize,
}

impl std::fmt::Display for PdfHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3;

/// Readers accept the header anywhere in the first 1024 bytes.
const HEADER_WINDOW: usize = 1024;

/// Sniff the PDF header of the file at `path`.
///
/// # Example
/// ```no_run
/// use parse_paper::detect::sniff_path;
///
/// let header = sniff_path("paper.pdf").unwrap();
/// println!("PDF version: {}", header.version);
/// ```
pub fn sniff_path<P: AsRef<Path>>(path: P) -> Result<PdfHeader> {
    let file = File::open(path)?;
    let mut window = Vec::with_capacity(HEADER_WINDOW);
    BufReader::new(file)
        .take(HEADER_WINDOW as u64)
        .read_to_end(&mut window)?;
    sniff_bytes(&window)
}

/// Sniff the PDF header in the leading bytes of a file.
pub fn sniff_bytes(data: &[u8]) -> Result<PdfHeader> {
    let window = &data[..data.len().min(HEADER_WINDOW)];
    let offset = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or(Error::UnknownFormat)?;

    let start = offset + PDF_MAGIC.len();
    let version_bytes = data
        .get(start..start + VERSION_LEN)
        .ok_or(Error::UnknownFormat)?;
    let version = String::from_utf8_lossy(version_bytes).into_owned();

    if !is_supported_version(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    Ok(PdfHeader { version, offset })
}

/// PDF 1.0 through 2.0.
fn is_supported_version(version: &str) -> bool {
    match version.as_bytes() {
        [b'1', b'.', minor] => minor.is_ascii_digit(),
        [b'2', b'.', b'0'] => true,
        _ => false,
    }
}
