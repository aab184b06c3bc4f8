//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for the page-level operations layout
//! analysis needs, isolating lopdf from the analyzer.

use std::cell::RefCell;
use std::collections::HashMap;

use lopdf::{Dictionary, Document as LopdfDocument, Object};

use crate::document::PaperDocument;
use crate::error::{Error, Result};

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// Font information returned by the backend.
#[derive(Debug, Clone)]
pub struct BackendFontInfo {
    /// Font resource name (key in the page's font dictionary).
    pub name: Vec<u8>,
    /// Base font name (e.g., "Helvetica-Bold").
    pub base_font: String,
    /// First character code covered by `widths`.
    pub first_char: u32,
    /// Glyph advances in thousandths of an em, empty when not declared.
    pub widths: Vec<f32>,
    /// Type0 font with multi-byte character codes.
    pub composite: bool,
}

/// A value from a PDF content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

impl PdfValue {
    /// Numeric value of an integer or real operand.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            PdfValue::Integer(i) => Some(*i as f32),
            PdfValue::Real(r) => Some(*r),
            _ => None,
        }
    }
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    /// Numeric operand at `index`, if present.
    pub fn number(&self, index: usize) -> Option<f32> {
        self.operands.get(index).and_then(PdfValue::as_number)
    }
}

/// Page-level access needed by layout analysis.
pub trait PdfBackend {
    /// Fonts declared in the page resources.
    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>>;

    /// Concatenated, decompressed content streams of a page.
    ///
    /// A page without `/Contents` yields an empty buffer.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Page size in points from the (possibly inherited) `/MediaBox`.
    fn page_size(&self, page: PageId) -> (f32, f32);

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Decode a shown string using the font's encoding on the given page.
    /// Falls back to simple decoding if the font or encoding is unavailable.
    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    crate::document::decode_text_string(bytes)
}

/// US Letter, used when a page declares no usable MediaBox.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// [`PdfBackend`] over a borrowed `lopdf::Document`.
///
/// Font dictionaries are looked up once per page and cached for the lifetime
/// of the backend.
pub struct LopdfBackend<'a> {
    doc: &'a LopdfDocument,
    fonts: RefCell<HashMap<PageId, HashMap<Vec<u8>, &'a Dictionary>>>,
}

impl<'a> LopdfBackend<'a> {
    /// Borrow the lopdf document of an opened paper.
    pub fn new(document: &'a PaperDocument) -> Self {
        Self::from_lopdf(document.inner())
    }

    /// Borrow a raw lopdf document.
    pub fn from_lopdf(doc: &'a LopdfDocument) -> Self {
        Self {
            doc,
            fonts: RefCell::new(HashMap::new()),
        }
    }

    fn stream_content(&self, obj: &Object) -> Result<Vec<u8>> {
        let obj = match obj {
            Object::Reference(r) => self.doc.get_object(*r)?,
            other => other,
        };
        match obj {
            Object::Stream(s) => Ok(s.decompressed_content().unwrap_or_else(|_| s.content.clone())),
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }

    fn font_widths(&self, font_dict: &Dictionary) -> Vec<f32> {
        let widths = match font_dict.get(b"Widths") {
            Ok(Object::Reference(id)) => self.doc.get_object(*id).ok(),
            Ok(other) => Some(other),
            Err(_) => None,
        };
        widths
            .and_then(|w| w.as_array().ok())
            .map(|items| items.iter().map(|o| number(o).unwrap_or(0.0)).collect())
            .unwrap_or_default()
    }

    fn font_dict(&self, page: PageId, font_name: &[u8]) -> Option<&'a Dictionary> {
        let mut cache = self.fonts.borrow_mut();
        let fonts = cache.entry(page).or_insert_with(|| {
            self.doc
                .get_page_fonts(page)
                .map(|fonts| fonts.into_iter().collect())
                .unwrap_or_default()
        });
        fonts.get(font_name).copied()
    }
}

impl PdfBackend for LopdfBackend<'_> {
    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>> {
        let lopdf_fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(lopdf_fonts
            .iter()
            .map(|(name, font_dict)| BackendFontInfo {
                name: name.clone(),
                base_font: font_dict
                    .get(b"BaseFont")
                    .ok()
                    .and_then(|o| o.as_name().ok())
                    .map(|n| String::from_utf8_lossy(n).into_owned())
                    .unwrap_or_else(|| "Unknown".to_string()),
                first_char: font_dict
                    .get(b"FirstChar")
                    .and_then(Object::as_i64)
                    .map(|c| c.max(0) as u32)
                    .unwrap_or(0),
                widths: self.font_widths(font_dict),
                composite: font_dict
                    .get(b"Subtype")
                    .and_then(Object::as_name)
                    .is_ok_and(|subtype| subtype == b"Type0"),
            })
            .collect())
    }

    fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id)?;
        let contents = match page_dict.get(b"Contents") {
            Ok(contents) => contents,
            Err(_) => return Ok(Vec::new()),
        };

        let contents = match contents {
            Object::Reference(r) => self.doc.get_object(*r)?,
            other => other,
        };

        match contents {
            Object::Array(parts) => {
                let mut content = Vec::new();
                for part in parts {
                    match self.stream_content(part) {
                        Ok(data) => {
                            content.extend_from_slice(&data);
                            content.push(b'\n');
                        }
                        Err(e) => log::warn!("Skipping content stream part: {}", e),
                    }
                }
                Ok(content)
            }
            other => self.stream_content(other),
        }
    }

    fn page_size(&self, page: PageId) -> (f32, f32) {
        let mut current = self.doc.get_dictionary(page).ok();
        // Bounded walk up the page tree for an inherited MediaBox
        for _ in 0..32 {
            let Some(dict) = current else { break };
            if let Ok(Object::Array(rect)) = dict.get(b"MediaBox") {
                let nums: Vec<f32> = rect.iter().filter_map(number).collect();
                if let [x0, y0, x1, y1] = nums[..] {
                    return ((x1 - x0).abs(), (y1 - y0).abs());
                }
            }
            current = dict
                .get(b"Parent")
                .and_then(Object::as_reference)
                .and_then(|id| self.doc.get_dictionary(id))
                .ok();
        }
        DEFAULT_PAGE_SIZE
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content =
            lopdf::content::Content::decode(data).map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String {
        if let Some(font_dict) = self.font_dict(page, font_name) {
            if let Ok(enc) = font_dict.get_font_encoding(self.doc) {
                if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                    return text;
                }
            }
        }
        decode_text_simple(bytes)
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}
