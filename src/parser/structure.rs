//! Conversion of analyzed layout blocks into the paragraph model.

use regex::Regex;

use crate::model::{InlineContent, ListInfo, NumberStyle, Page, Paragraph, TextRun, TextStyle};

use super::layout::{BlockType, PageLayout, TextBlock, TextLine};

/// A list marker recognized at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMarker {
    /// Number and style of an ordered marker, `None` for bullets
    pub ordered: Option<(u32, NumberStyle)>,
    /// Byte length of the marker including the whitespace after it
    pub len: usize,
}

impl ListMarker {
    /// List info for a top-level item with this marker.
    pub fn list_info(&self) -> ListInfo {
        match self.ordered {
            Some((number, style)) => ListInfo::numbered(0, number, style),
            None => ListInfo::bullet(0),
        }
    }
}

/// Recognizes bullet and numbered list markers.
#[derive(Debug, Clone)]
pub struct ListMarkers {
    pattern: Regex,
}

impl Default for ListMarkers {
    fn default() -> Self {
        Self::new()
    }
}

impl ListMarkers {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(
                r"^\s*(?:(?P<bullet>[•●○◦■▪\-–*])|(?P<num>\d{1,3})[.)]|\((?P<pnum>\d{1,3})\)|(?P<alpha>[a-z])[.)]|\((?P<palpha>[a-z])\))(?P<space>\s+)\S",
            )
            .expect("list marker pattern is valid"),
        }
    }

    /// Parse the marker at the start of `text`, if any.
    ///
    /// A marker must be followed by whitespace and then more text.
    pub fn parse(&self, text: &str) -> Option<ListMarker> {
        let caps = self.pattern.captures(text)?;
        let len = caps.name("space")?.end();

        let ordered = if caps.name("bullet").is_some() {
            None
        } else if let Some(num) = caps.name("num").or_else(|| caps.name("pnum")) {
            Some((num.as_str().parse().ok()?, NumberStyle::Decimal))
        } else {
            let letter = caps.name("alpha").or_else(|| caps.name("palpha"))?;
            let number = letter.as_str().bytes().next()? - b'a' + 1;
            Some((number as u32, NumberStyle::LowerAlpha))
        };

        Some(ListMarker { ordered, len })
    }
}

/// Convert an analyzed page layout into a model page.
pub fn build_page(index: usize, layout: &PageLayout, markers: &ListMarkers) -> Page {
    let mut page = Page::new(index, layout.width, layout.height);
    for block in &layout.blocks {
        let paragraph = block_to_paragraph(block, markers);
        if !paragraph.is_empty() {
            page.add_paragraph(paragraph);
        }
    }
    page
}

/// Convert one block into a paragraph.
///
/// Headings carry plain text only. List items lose their marker. Body text
/// keeps bold and italic runs from the fonts of its spans.
pub fn block_to_paragraph(block: &TextBlock, markers: &ListMarkers) -> Paragraph {
    if block.block_type == BlockType::Heading {
        let mut text = String::new();
        for line in &block.lines {
            join_line_text(&mut text, &line.text());
        }
        return Paragraph::heading(text.trim(), block.heading_level);
    }

    let marker = match block.block_type {
        BlockType::ListItem => block.lines.first().and_then(|l| markers.parse(&l.text())),
        _ => None,
    };
    let mut skip = marker.map(|m| m.len).unwrap_or(0);

    let mut paragraph = Paragraph::new();
    for (i, line) in block.lines.iter().enumerate() {
        if i > 0 {
            join_line_runs(&mut paragraph, line);
        }

        for (j, (space, span)) in line.segments().into_iter().enumerate() {
            let mut text = if space {
                format!(" {}", span.text)
            } else {
                span.text.clone()
            };

            // The marker offset is measured on the line text, which is the
            // concatenation of these segments
            if skip > 0 {
                if skip >= text.len() {
                    skip -= text.len();
                    continue;
                }
                text = text[skip..].to_string();
                skip = 0;
            }

            if i > 0 && j == 0 {
                text = text.trim_start().to_string();
            }

            let style = TextStyle {
                bold: span.is_bold,
                italic: span.is_italic,
            };
            paragraph.add_run(TextRun::styled(text, style));
        }
    }

    if let Some(marker) = marker {
        paragraph.style.list_info = Some(marker.list_info());
    }
    paragraph
}

/// Whether a hyphen at the end of `prev` joins a word broken across lines.
///
/// Only a hyphen preceded by a lowercase letter and followed on the next
/// line by a lowercase letter is treated as a break, so compounds such as
/// "state-of-the-art" split after "of-" still lose the hyphen but "GPT-"
/// followed by "4" keeps it.
fn is_broken_word(prev: &str, next: &str) -> bool {
    let mut tail = prev.trim_end().chars().rev();
    let hyphen = tail.next() == Some('-');
    let lower_before = tail.next().is_some_and(char::is_lowercase);
    let lower_after = next.trim_start().chars().next().is_some_and(char::is_lowercase);
    hyphen && lower_before && lower_after
}

/// Append a line to plain text, removing line-break hyphenation.
fn join_line_text(text: &mut String, line: &str) {
    if text.is_empty() {
        text.push_str(line.trim());
        return;
    }
    if is_broken_word(text, line) {
        let trimmed = text.trim_end().len();
        text.truncate(trimmed - 1);
    } else if !text.ends_with(char::is_whitespace) {
        text.push(' ');
    }
    text.push_str(line.trim_start());
}

/// Prepare the paragraph's trailing run for the next line.
fn join_line_runs(paragraph: &mut Paragraph, next: &TextLine) {
    let Some(InlineContent::Text(last)) = paragraph.content.last_mut() else {
        return;
    };

    if is_broken_word(&last.text, &next.text()) {
        let trimmed = last.text.trim_end().len();
        last.text.truncate(trimmed - 1);
        if last.text.is_empty() {
            paragraph.content.pop();
        }
    } else if !last.text.ends_with(char::is_whitespace) {
        last.text.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ListStyle;
    use crate::parser::layout::TextSpan;

    fn line(spans: &[(&str, f32, &str)], y: f32) -> TextLine {
        TextLine::from_spans(
            spans
                .iter()
                .map(|(text, x, font)| {
                    TextSpan::new(text.to_string(), *x, y, 10.0, font.to_string())
                        .with_width(text.chars().count() as f32 * 5.0)
                })
                .collect(),
        )
    }

    #[test]
    fn test_bullet_markers() {
        let markers = ListMarkers::new();
        for text in ["• item", "- item", "– item", "* item", "▪ item"] {
            let marker = markers.parse(text).unwrap();
            assert_eq!(marker.ordered, None, "{text}");
            assert_eq!(&text[marker.len..], "item");
        }
    }

    #[test]
    fn test_numbered_markers() {
        let markers = ListMarkers::new();
        assert_eq!(
            markers.parse("1. First").unwrap().ordered,
            Some((1, NumberStyle::Decimal))
        );
        assert_eq!(
            markers.parse("(12) Twelfth").unwrap().ordered,
            Some((12, NumberStyle::Decimal))
        );
        assert_eq!(
            markers.parse("c) Third").unwrap().ordered,
            Some((3, NumberStyle::LowerAlpha))
        );
    }

    #[test]
    fn test_non_markers() {
        let markers = ListMarkers::new();
        assert!(markers.parse("e.g. the model").is_none());
        assert!(markers.parse("2019. A year").is_none());
        assert!(markers.parse("-").is_none());
        assert!(markers.parse("-5 degrees").is_none());
        assert!(markers.parse("Plain text").is_none());
    }

    #[test]
    fn test_broken_word_detection() {
        assert!(is_broken_word("the trans-", "former model"));
        assert!(!is_broken_word("GPT-", "4 results"));
        assert!(!is_broken_word("see Section", "3"));
        assert!(!is_broken_word("pre-", "Training"));
    }

    #[test]
    fn test_heading_block() {
        let mut block = TextBlock::new(
            vec![
                line(&[("Attention Is", 72.0, "Helvetica-Bold")], 700.0),
                line(&[("All You Need", 72.0, "Helvetica-Bold")], 680.0),
            ],
            BlockType::Heading,
        );
        block.heading_level = 1;

        let p = block_to_paragraph(&block, &ListMarkers::new());
        assert_eq!(p.heading_level(), Some(1));
        assert_eq!(p.plain_text(), "Attention Is All You Need");
        // Headings carry no emphasis
        assert!(matches!(&p.content[0], InlineContent::Text(run) if !run.style.has_styling()));
    }

    #[test]
    fn test_paragraph_runs_and_dehyphenation() {
        let block = TextBlock::new(
            vec![
                line(
                    &[("We train a ", 72.0, "Times-Roman"), ("trans-", 127.0, "Times-Italic")],
                    700.0,
                ),
                line(&[("former on data.", 72.0, "Times-Italic")], 688.0),
            ],
            BlockType::Paragraph,
        );

        let p = block_to_paragraph(&block, &ListMarkers::new());
        assert_eq!(p.plain_text(), "We train a transformer on data.");
        assert_eq!(p.content.len(), 2);
        assert!(matches!(&p.content[1], InlineContent::Text(run) if run.style.italic));
    }

    #[test]
    fn test_list_item_marker_removed() {
        let block = TextBlock::new(
            vec![
                line(&[("2. A new", 72.0, "Times-Roman")], 700.0),
                line(&[("benchmark", 84.0, "Times-Roman")], 688.0),
            ],
            BlockType::ListItem,
        );

        let p = block_to_paragraph(&block, &ListMarkers::new());
        assert_eq!(p.plain_text(), "A new benchmark");
        let info = p.style.list_info.unwrap();
        assert_eq!(
            info.style,
            ListStyle::Ordered {
                number: 2,
                number_style: NumberStyle::Decimal
            }
        );
    }
}
