//! Markdown rendering of analyzed pages.

use crate::model::{InlineContent, ListInfo, ListStyle, NumberStyle, Page, Paragraph, TextRun, TextStyle};

/// Options for Markdown output.
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    /// Escape characters that Markdown would interpret
    pub escape_special_chars: bool,
    /// Deepest heading level emitted; deeper headings are clamped
    pub max_heading_level: u8,
    /// Marker for unordered list items
    pub list_marker: char,
    /// Render line breaks as hard breaks instead of spaces
    pub preserve_line_breaks: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            escape_special_chars: true,
            max_heading_level: 6,
            list_marker: '-',
            preserve_line_breaks: false,
        }
    }
}

/// Render a page with default options.
pub fn page_to_markdown(page: &Page) -> String {
    MarkdownRenderer::default().render_page(page)
}

/// Markdown renderer.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    options: MarkdownOptions,
}

impl MarkdownRenderer {
    /// Create a new Markdown renderer.
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }

    /// Render a page to Markdown.
    ///
    /// Blocks are separated by a blank line; consecutive list items share a
    /// single newline so they form one list.
    pub fn render_page(&self, page: &Page) -> String {
        let mut output = String::new();
        let mut prev_was_item = false;

        for para in page.paragraphs.iter().filter(|p| !p.is_empty()) {
            let is_item = para.is_list_item() && !para.is_heading();
            if !output.is_empty() {
                output.push_str(if prev_was_item && is_item { "\n" } else { "\n\n" });
            }
            self.render_paragraph(&mut output, para);
            prev_was_item = is_item;
        }

        output
    }

    fn render_paragraph(&self, output: &mut String, para: &Paragraph) {
        if let Some(level) = para.style.heading_level {
            let level = level.clamp(1, self.options.max_heading_level.max(1));
            output.push_str(&"#".repeat(level as usize));
            output.push(' ');
            let start = output.len();
            self.render_inline_content(output, &para.content);
            trim_tail(output, start);
            return;
        }

        if let Some(ref list_info) = para.style.list_info {
            self.render_list_item(output, para, list_info);
            return;
        }

        let start = output.len();
        self.render_inline_content(output, &para.content);
        trim_tail(output, start);
    }

    fn render_list_item(&self, output: &mut String, para: &Paragraph, list_info: &ListInfo) {
        let indent = "  ".repeat(list_info.level as usize);

        let marker = match list_info.style {
            ListStyle::Unordered => self.options.list_marker.to_string(),
            ListStyle::Ordered {
                number,
                number_style,
            } => match number_style {
                NumberStyle::Decimal => format!("{}.", number),
                NumberStyle::LowerAlpha => {
                    format!("{}.", char::from_u32('a' as u32 + number.saturating_sub(1)).unwrap_or('a'))
                }
                NumberStyle::UpperAlpha => {
                    format!("{}.", char::from_u32('A' as u32 + number.saturating_sub(1)).unwrap_or('A'))
                }
            },
        };

        output.push_str(&indent);
        output.push_str(&marker);
        output.push(' ');
        let start = output.len();
        self.render_inline_content(output, &para.content);
        trim_tail(output, start);
    }

    fn render_inline_content(&self, output: &mut String, content: &[InlineContent]) {
        for (i, item) in content.iter().enumerate() {
            match item {
                InlineContent::Text(run) => {
                    let run = if i == 0 {
                        TextRun::styled(run.text.trim_start(), run.style)
                    } else {
                        run.clone()
                    };
                    self.render_text_run(output, &run);
                }
                InlineContent::LineBreak => {
                    if self.options.preserve_line_breaks {
                        output.push_str("  \n");
                    } else {
                        output.push(' ');
                    }
                }
            }
        }
    }

    fn render_text_run(&self, output: &mut String, run: &TextRun) {
        let text = if self.options.escape_special_chars {
            escape_markdown(&run.text)
        } else {
            run.text.clone()
        };

        output.push_str(&apply_text_style(&text, &run.style));
    }
}

/// Drop trailing whitespace written since `start`.
fn trim_tail(output: &mut String, start: usize) {
    let trimmed = output[start..].trim_end().len();
    output.truncate(start + trimmed);
}

/// Wrap text in emphasis markers.
///
/// Markers must hug the text, so surrounding whitespace stays outside them.
fn apply_text_style(text: &str, style: &TextStyle) -> String {
    let core = text.trim();
    if !style.has_styling() || core.is_empty() {
        return text.to_string();
    }

    let lead = &text[..text.len() - text.trim_start().len()];
    let trail = &text[lead.len() + core.len()..];
    let marker = match (style.bold, style.italic) {
        (true, true) => "***",
        (true, false) => "**",
        _ => "*",
    };

    format!("{lead}{marker}{core}{marker}{trail}")
}

/// Escape special Markdown characters.
/// Only escape characters that could be misinterpreted as Markdown syntax.
/// We minimize escaping to improve readability of extracted text.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            // Core formatting that must be escaped
            '\\' | '`' | '*' | '_' |
            // Brackets for links/images, pipe for tables
            '[' | ']' | '|' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}
