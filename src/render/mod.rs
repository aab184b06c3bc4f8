//! Rendering of pages to Markdown and of tool results to reports and JSON.

mod cleanup;
mod json;
mod markdown;
pub mod report;
mod truncate;

pub use cleanup::{CleanupOptions, CleanupPipeline, CleanupPreset};
pub use json::{to_json, JsonFormat};
pub use markdown::{page_to_markdown, MarkdownOptions, MarkdownRenderer};
pub use report::{
    error_report, image_report, metadata_report, paper_report, text_report, truncation_notice,
};
pub use truncate::truncate_chars;
