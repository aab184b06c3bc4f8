//! Document information dictionary reader.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use lopdf::{Dictionary, Object};
use serde::{Deserialize, Serialize};

use super::PaperDocument;

/// Descriptive metadata of a paper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// File name without directories
    pub filename: String,
    /// File size in bytes
    pub file_size: u64,
    /// Total number of pages
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    /// Application that created the original document
    pub creator: Option<String>,
    /// Application that produced the PDF
    pub producer: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    /// PDF version (e.g., "1.7")
    pub pdf_version: String,
    /// Whether the file carried an encryption dictionary
    pub encrypted: bool,
}

impl Metadata {
    /// Read metadata from an opened document.
    pub fn read(document: &PaperDocument) -> Self {
        let doc = document.inner();
        let mut metadata = Metadata {
            filename: document.file_name(),
            file_size: document.file_size(),
            page_count: document.page_count(),
            pdf_version: doc.version.clone(),
            encrypted: document.is_encrypted(),
            ..Default::default()
        };

        let info = doc.trailer.get(b"Info").ok().and_then(|info| match info {
            Object::Reference(id) => doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        });

        if let Some(info) = info {
            metadata.title = info_string(info, b"Title");
            metadata.author = info_string(info, b"Author");
            metadata.subject = info_string(info, b"Subject");
            metadata.keywords = info_string(info, b"Keywords");
            metadata.creator = info_string(info, b"Creator");
            metadata.producer = info_string(info, b"Producer");
            metadata.created = info_string(info, b"CreationDate").and_then(|s| parse_pdf_date(&s));
            metadata.modified = info_string(info, b"ModDate").and_then(|s| parse_pdf_date(&s));
        } else {
            log::debug!("{} has no Info dictionary", metadata.filename);
        }

        metadata
    }

    /// Title, or the file name when the document declares none.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.filename)
    }
}

/// Read a text string entry, skipping empty values.
fn info_string(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let text = match dict.get(key).ok()? {
        Object::String(bytes, _) => decode_text_string(bytes),
        Object::Name(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        _ => return None,
    };
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    (!text.is_empty()).then(|| text.to_string())
}

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8, or Latin-1.
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(body) {
        Ok(s) => s.to_string(),
        Err(_) => body.iter().map(|&b| b as char).collect(),
    }
}

/// Parse a PDF date (`D:YYYYMMDDHHmmSSOHH'mm'`) into UTC.
///
/// Everything after the year is optional. A missing offset means UTC.
pub(crate) fn parse_pdf_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);
    if s.len() < 4 || !s.is_char_boundary(4) {
        return None;
    }

    let digits = |from: usize, to: usize, default: u32| -> Option<u32> {
        match s.get(from..to) {
            Some(part) if part.bytes().all(|b| b.is_ascii_digit()) => part.parse().ok(),
            Some(part) if part.starts_with(['Z', '+', '-']) => Some(default),
            None => Some(default),
            Some(_) => None,
        }
    };

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month = digits(4, 6, 1)?;
    let day = digits(6, 8, 1)?;
    let hour = digits(8, 10, 0)?;
    let minute = digits(10, 12, 0)?;
    let second = digits(12, 14, 0)?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    let offset = parse_offset(s.get(14..).unwrap_or(""))?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse the `Z`, `+HH'mm'` or `-HH'mm` suffix of a PDF date.
fn parse_offset(rest: &str) -> Option<FixedOffset> {
    let utc = FixedOffset::east_opt(0);
    let sign = match rest.chars().next() {
        None | Some('Z') => return utc,
        Some('+') => 1,
        Some('-') => -1,
        Some(_) => return utc,
    };
    let fields: Vec<&str> = rest[1..]
        .split('\'')
        .filter(|f| !f.is_empty())
        .collect();
    let hours: i32 = fields.first().and_then(|h| h.parse().ok()).unwrap_or(0);
    let minutes: i32 = fields.get(1).and_then(|m| m.parse().ok()).unwrap_or(0);
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
