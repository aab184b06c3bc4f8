//! Markdown reports of tool results, as handed back to an agent.

use std::fmt::Write;

use crate::document::Metadata;
use crate::error::ToolError;
use crate::extract::{ExtractionWarning, TextResult};
use crate::paper::{ImageResult, PaperResult};

const NOT_AVAILABLE: &str = "N/A";

/// Report of a full `parse_paper` call.
pub fn paper_report(result: &PaperResult) -> String {
    let mut out = String::from("# Paper Parsing Complete\n\n");

    let meta = &result.metadata;
    out.push_str("## Metadata\n");
    let _ = writeln!(out, "- **Title**: {}", or_na(&meta.title));
    let _ = writeln!(out, "- **Author**: {}", or_na(&meta.author));
    let _ = writeln!(out, "- **Pages**: {}", meta.page_count);
    let _ = writeln!(out, "- **File Size**: {} bytes", thousands(meta.file_size));
    out.push('\n');

    if result.images.is_empty() {
        out.push_str("## Images\nNo images extracted.\n\n");
    } else {
        out.push_str("## Extracted Images\n");
        let _ = writeln!(out, "Total images: {}\n", result.images.len());
        for image in &result.images {
            let _ = writeln!(out, "- **{}** (Page {})", image.filename, image.page);
            let _ = writeln!(out, "  - Path: `{}`", image.path.display());
            let _ = writeln!(out, "  - Size: {}x{} pixels", image.width, image.height);
            if let Some(encoded) = &image.base64 {
                let _ = writeln!(out, "  - Base64: Available (length: {} chars)", encoded.len());
            }
            let _ = writeln!(out, "  - File size: {} bytes\n", thousands(image.file_size));
        }
    }

    push_warnings(&mut out, &result.warnings);

    out.push_str("## Text Content\n\n");
    match &result.saved_text_to {
        Some(path) => push_saved_text(
            &mut out,
            path,
            result.total_chars,
            &result.pages_processed,
            result.page_count,
            &result.text,
        ),
        None => {
            out.push_str(&result.text);
            if result.truncated {
                out.push_str(&truncation_notice(result.text.chars().count(), result.total_chars));
            }
        }
    }
    out
}

/// Report of an `extract_text_only` call.
///
/// Unsaved text is returned as is, followed by a notice when truncated.
pub fn text_report(result: &TextResult) -> String {
    let mut out = String::new();
    match &result.saved_to {
        Some(path) => {
            out.push_str("# Text Saved to File\n\n");
            push_saved_text(
                &mut out,
                path,
                result.total_chars,
                &result.pages_processed,
                result.page_count,
                &result.text,
            );
        }
        None => {
            out.push_str(&result.text);
            if result.truncated {
                out.push_str(&truncation_notice(result.text.chars().count(), result.total_chars));
            }
        }
    }
    if !result.warnings.is_empty() {
        out.push_str("\n\n");
        push_warnings(&mut out, &result.warnings);
    }
    out
}

/// Report of an `extract_images_only` call.
pub fn image_report(result: &ImageResult) -> String {
    let mut out = String::from("# Image Extraction Complete\n\n");
    let _ = writeln!(out, "Total images extracted: {}", result.images.len());
    let _ = writeln!(
        out,
        "Output directory: `{}` (quality: {}, format: {})\n",
        result.output_dir.display(),
        result.quality,
        result.format
    );

    for image in &result.images {
        let _ = writeln!(out, "## {}", image.filename);
        let _ = writeln!(out, "- **Page**: {}", image.page);
        let _ = writeln!(out, "- **Path**: `{}`", image.path.display());
        let _ = writeln!(out, "- **Dimensions**: {}x{} pixels", image.width, image.height);
        if (image.width, image.height) != (image.original_width, image.original_height) {
            let _ = writeln!(
                out,
                "- **Original**: {}x{} pixels",
                image.original_width, image.original_height
            );
        }
        if let Some(encoded) = &image.base64 {
            let _ = writeln!(out, "- **Base64**: Available (length: {} chars)", encoded.len());
        }
        let _ = writeln!(out, "- **File size**: {} bytes\n", thousands(image.file_size));
    }

    push_warnings(&mut out, &result.warnings);
    out
}

/// Report of a `get_paper_metadata` call.
pub fn metadata_report(meta: &Metadata) -> String {
    let mut out = String::from("# PDF Metadata\n\n");
    let _ = writeln!(out, "- **Filename**: {}", meta.filename);
    let _ = writeln!(
        out,
        "- **File Size**: {} bytes ({:.2} MB)",
        thousands(meta.file_size),
        meta.file_size as f64 / 1024.0 / 1024.0
    );
    let _ = writeln!(out, "- **Pages**: {}", meta.page_count);
    let _ = writeln!(out, "- **Title**: {}", or_na(&meta.title));
    let _ = writeln!(out, "- **Author**: {}", or_na(&meta.author));
    let _ = writeln!(out, "- **Subject**: {}", or_na(&meta.subject));
    let _ = writeln!(out, "- **Keywords**: {}", or_na(&meta.keywords));
    let _ = writeln!(out, "- **Creator**: {}", or_na(&meta.creator));
    let _ = writeln!(out, "- **Producer**: {}", or_na(&meta.producer));
    let _ = writeln!(
        out,
        "- **Creation Date**: {}",
        meta.created.map_or_else(|| NOT_AVAILABLE.to_string(), |d| d.to_rfc3339())
    );
    let _ = writeln!(
        out,
        "- **Modification Date**: {}",
        meta.modified.map_or_else(|| NOT_AVAILABLE.to_string(), |d| d.to_rfc3339())
    );
    let _ = writeln!(out, "- **PDF Version**: {}", meta.pdf_version);
    let _ = writeln!(out, "- **Encrypted**: {}", if meta.encrypted { "Yes" } else { "No" });
    out
}

/// Report of a failed call.
pub fn error_report(error: &ToolError) -> String {
    format!("# Error\n\n- **Kind**: {:?}\n- **Message**: {}\n", error.kind, error.message)
}

/// Notice appended to text cut to a character budget.
pub fn truncation_notice(shown: usize, total: usize) -> String {
    let percent = if total == 0 {
        100.0
    } else {
        100.0 * shown as f64 / total as f64
    };
    format!(
        "\n\n---\n\n**TEXT TRUNCATED**: Showing {} of {} characters ({:.1}%). \
         Use `pages` to extract specific pages, or `save_to` to save the full text.",
        thousands(shown as u64),
        thousands(total as u64),
        percent
    )
}

fn push_saved_text(
    out: &mut String,
    path: &std::path::Path,
    total_chars: usize,
    pages: &[usize],
    page_count: usize,
    preview: &str,
) {
    let _ = writeln!(out, "- **File**: `{}`", path.display());
    let _ = writeln!(out, "- **Size**: {} characters", thousands(total_chars as u64));
    let _ = writeln!(out, "- **Pages**: {}\n", describe_pages(pages, page_count));
    let _ = write!(
        out,
        "**Preview (first {} characters):**\n\n{}",
        preview.chars().count(),
        preview
    );
}

fn push_warnings(out: &mut String, warnings: &[ExtractionWarning]) {
    if warnings.is_empty() {
        return;
    }
    out.push_str("## Warnings\n");
    for warning in warnings {
        let _ = writeln!(out, "- {}", warning);
    }
    out.push('\n');
}

fn describe_pages(pages: &[usize], page_count: usize) -> String {
    if pages.len() == page_count {
        return "All".to_string();
    }
    let list: Vec<String> = pages.iter().map(usize::to_string).collect();
    format!("[{}]", list.join(", "))
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NOT_AVAILABLE)
}

/// Format with comma thousands separators.
fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use crate::extract::{ExtractedImage, ImageFormat, Quality};
    use std::path::PathBuf;

    fn text_result() -> TextResult {
        TextResult {
            text: "Abstract text".to_string(),
            page_count: 10,
            pages_processed: vec![0, 1, 2],
            total_chars: 12_345,
            truncated: true,
            saved_to: None,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_truncated_text_report() {
        let report = text_report(&text_result());
        assert!(report.starts_with("Abstract text\n\n---\n\n**TEXT TRUNCATED**"));
        assert!(report.contains("Showing 13 of 12,345 characters (0.1%)"));
    }

    #[test]
    fn test_saved_text_report() {
        let mut result = text_result();
        result.saved_to = Some(PathBuf::from("/tmp/paper.md"));
        let report = text_report(&result);

        assert!(report.starts_with("# Text Saved to File"));
        assert!(report.contains("- **File**: `/tmp/paper.md`"));
        assert!(report.contains("- **Size**: 12,345 characters"));
        assert!(report.contains("- **Pages**: [0, 1, 2]"));
        assert!(report.ends_with("Abstract text"));
        assert!(!report.contains("TRUNCATED"));
    }

    #[test]
    fn test_image_report_mentions_base64() {
        let image = ExtractedImage {
            page: 0,
            index: 0,
            filename: "page1_img1.jpg".to_string(),
            path: PathBuf::from("/tmp/out/page1_img1.jpg"),
            width: 768,
            height: 230,
            original_width: 2000,
            original_height: 600,
            file_size: 12_000,
            format: ImageFormat::Jpeg,
            base64: Some("QUJD".to_string()),
        };
        let mut result = ImageResult {
            images: vec![image],
            output_dir: PathBuf::from("/tmp/out"),
            quality: Quality::Low,
            format: ImageFormat::Jpeg,
            page_count: 1,
            pages_processed: vec![0],
            warnings: Vec::new(),
        };
        let report = image_report(&result);
        assert!(report.contains("- **Base64**: Available (length: 4 chars)"));
        assert!(report.contains("- **Original**: 2000x600 pixels"));

        result.images[0].base64 = None;
        assert!(!image_report(&result).contains("Base64"));
    }

    #[test]
    fn test_metadata_report() {
        let meta = Metadata {
            filename: "paper.pdf".to_string(),
            file_size: 2 * 1024 * 1024,
            page_count: 12,
            author: Some("A. Author".to_string()),
            pdf_version: "1.7".to_string(),
            ..Default::default()
        };
        let report = metadata_report(&meta);
        assert!(report.contains("- **File Size**: 2,097,152 bytes (2.00 MB)"));
        assert!(report.contains("- **Title**: N/A"));
        assert!(report.contains("- **Author**: A. Author"));
        assert!(report.contains("- **Pages**: 12"));
    }

    #[test]
    fn test_error_report() {
        let error = ToolError::from(Error::InvalidQuality("ultra".into()));
        assert_eq!(error.kind, ErrorKind::InvalidArgument);
        let report = error_report(&error);
        assert!(report.contains("InvalidArgument"));
        assert!(report.contains("ultra"));
    }
}
