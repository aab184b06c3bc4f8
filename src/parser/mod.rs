//! Page layout analysis.
//!
//! [`backend`] isolates lopdf behind [`PdfBackend`], [`layout`] turns content
//! streams into blocks, and [`structure`] converts blocks into the paragraph
//! model.

pub mod backend;
pub mod layout;
pub mod structure;

pub use backend::{BackendFontInfo, ContentOp, LopdfBackend, PageId, PdfBackend, PdfValue};
pub use layout::{
    BlockType, Column, FontStatistics, LayoutAnalyzer, PageLayout, TextBlock, TextLine, TextSpan,
};
pub use structure::{block_to_paragraph, build_page, ListMarker, ListMarkers};
