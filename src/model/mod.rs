//! Page model that bridges layout analysis and Markdown rendering.

mod page;
mod paragraph;

pub use page::Page;
pub use paragraph::{
    InlineContent, ListInfo, ListStyle, NumberStyle, Paragraph, ParagraphStyle, TextRun, TextStyle,
};
