//! Layout analysis for PDF pages.
//!
//! Interprets a page's content stream into positioned text spans, groups the
//! spans into lines (column by column on two-column pages), assigns heading
//! levels from the page's font size distribution, and groups lines into
//! blocks.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::model::Page;

use super::backend::{BackendFontInfo, ContentOp, PageId, PdfBackend, PdfValue};
use super::structure::{build_page, ListMarkers};

/// Fallback glyph advance in thousandths of an em.
const DEFAULT_GLYPH_WIDTH: f32 = 500.0;
/// TJ adjustments at least this large (thousandths of an em) read as word spaces.
const TJ_SPACE_THRESHOLD: f32 = 200.0;
/// Headings must be at least this many points above body text.
const HEADING_MIN_DELTA: f32 = 1.5;
/// Lines longer than this are never headings.
const MAX_HEADING_CHARS: usize = 200;
/// Width of the vertical slices used for gutter detection, in points.
const SLICE_WIDTH: f32 = 3.0;
/// Narrowest gap accepted as a column gutter.
const MIN_GUTTER_WIDTH: f32 = 12.0;
/// Narrowest text column.
const MIN_COLUMN_WIDTH: f32 = 80.0;
/// Upper bound on gutter slices; wider text extents are read as one column.
const MAX_SLICES: usize = 4096;

/// A text span with position and style information.
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Width of the text
    pub width: f32,
    /// Font size in points
    pub font_size: f32,
    /// Font name (e.g., "Helvetica-Bold")
    pub font_name: String,
    /// Whether the font appears to be bold
    pub is_bold: bool,
    /// Whether the font appears to be italic
    pub is_italic: bool,
}

impl TextSpan {
    /// Create a new text span. The width is estimated from the character
    /// count until [`TextSpan::with_width`] supplies a measured one.
    pub fn new(text: String, x: f32, y: f32, font_size: f32, font_name: String) -> Self {
        let (is_bold, is_italic) = font_style(&font_name);
        let width = text.chars().count() as f32 * font_size * DEFAULT_GLYPH_WIDTH / 1000.0;

        Self {
            text,
            x,
            y,
            width,
            font_size,
            font_name,
            is_bold,
            is_italic,
        }
    }

    /// Replace the estimated width.
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width.max(0.0);
        self
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Horizontal center.
    pub fn center(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

/// Infer bold and italic from a font name, ignoring any subset prefix.
fn font_style(font_name: &str) -> (bool, bool) {
    let name = font_name
        .split_once('+')
        .map(|(_, rest)| rest)
        .unwrap_or(font_name)
        .to_lowercase();

    let bold = ["bold", "black", "heavy", "demi"]
        .iter()
        .any(|k| name.contains(k))
        || name.ends_with("-medi")
        || name.starts_with("cmbx");
    let italic = ["ital", "oblique", "slant"].iter().any(|k| name.contains(k))
        || name.ends_with("-it")
        || name.starts_with("cmti")
        || name.starts_with("cmsl");

    (bold, italic)
}

/// A text line composed of multiple spans on the same baseline.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// The spans in this line, sorted by X position
    pub spans: Vec<TextSpan>,
    /// Y position (baseline)
    pub y: f32,
    /// Leftmost X position
    pub x: f32,
    /// Dominant font size in this line
    pub font_size: f32,
    /// Whether this line appears to be a heading
    pub is_heading: bool,
    /// Detected heading level (1-6, or 0 for non-heading)
    pub heading_level: u8,
}

impl TextLine {
    /// Create a new text line from spans.
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));

        // Dominant font size, weighted by text length
        let total_chars: usize = spans.iter().map(|s| s.text.chars().count()).sum();
        let weighted_size: f32 = spans
            .iter()
            .map(|s| s.font_size * s.text.chars().count() as f32)
            .sum();
        let font_size = match spans.first() {
            Some(_) if total_chars > 0 => weighted_size / total_chars as f32,
            Some(first) => first.font_size,
            None => 0.0,
        };

        let (x, y) = spans.first().map(|s| (s.x, s.y)).unwrap_or((0.0, 0.0));

        Self {
            spans,
            y,
            x,
            font_size,
            is_heading: false,
            heading_level: 0,
        }
    }

    /// Spans paired with whether a space separates each from the previous
    /// one.
    ///
    /// A space is inserted when the horizontal gap exceeds a fifth of the
    /// average character width, except between characters of scripts that
    /// do not separate words with spaces.
    pub fn segments(&self) -> Vec<(bool, &TextSpan)> {
        let mut segments = Vec::with_capacity(self.spans.len());
        for (i, span) in self.spans.iter().enumerate() {
            let Some(prev) = i.checked_sub(1).map(|p| &self.spans[p]) else {
                segments.push((false, span));
                continue;
            };

            let gap = span.x - prev.right();
            let char_count = span.text.chars().count();
            let avg_char_width = if char_count > 0 && span.width > 0.0 {
                span.width / char_count as f32
            } else {
                span.font_size * 0.5
            };

            let spaceless = prev.text.chars().last().is_some_and(is_spaceless_script_char)
                && span.text.chars().next().is_some_and(is_spaceless_script_char);
            let has_space = prev.text.ends_with([' ', '\u{00A0}'])
                || span.text.starts_with([' ', '\u{00A0}']);

            segments.push((gap > avg_char_width * 0.2 && !spaceless && !has_space, span));
        }
        segments
    }

    /// Get the combined text of all spans with appropriate spacing.
    pub fn text(&self) -> String {
        let mut result = String::new();
        for (space, span) in self.segments() {
            if space {
                result.push(' ');
            }
            result.push_str(&span.text);
        }
        result
    }

    /// Number of characters across all spans.
    pub fn char_count(&self) -> usize {
        self.spans.iter().map(|s| s.text.chars().count()).sum()
    }

    /// Check if the line is predominantly bold.
    pub fn is_bold(&self) -> bool {
        let bold_chars: usize = self
            .spans
            .iter()
            .filter(|s| s.is_bold)
            .map(|s| s.text.chars().count())
            .sum();
        let total_chars = self.char_count();
        total_chars > 0 && bold_chars * 2 > total_chars
    }
}

/// Type of text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// A heading (H1-H6)
    Heading,
    /// A regular paragraph
    Paragraph,
    /// A list item
    ListItem,
}

/// A text block (paragraph, heading, list item).
#[derive(Debug, Clone)]
pub struct TextBlock {
    /// The lines in this block
    pub lines: Vec<TextLine>,
    /// Block type
    pub block_type: BlockType,
    /// Heading level (1-6 for headings, 0 otherwise)
    pub heading_level: u8,
}

impl TextBlock {
    /// Create a new text block.
    pub fn new(lines: Vec<TextLine>, block_type: BlockType) -> Self {
        Self {
            lines,
            block_type,
            heading_level: 0,
        }
    }

    /// Get the combined text of all lines.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Check if the block is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.text().trim().is_empty())
    }
}

/// A detected column in the page layout.
#[derive(Debug, Clone)]
pub struct Column {
    /// Left boundary X coordinate
    pub left: f32,
    /// Right boundary X coordinate
    pub right: f32,
    /// Column index (0 = leftmost)
    pub index: usize,
}

impl Column {
    /// Check if an X coordinate falls within this column.
    pub fn contains(&self, x: f32) -> bool {
        x >= self.left && x <= self.right
    }

    /// A span belongs to a column if its left edge or its center lies
    /// within it.
    pub fn contains_span(&self, span: &TextSpan) -> bool {
        self.contains(span.x) || self.contains(span.center())
    }
}

/// Font statistics for heading detection.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    /// Body text font size (most common by character count)
    pub body_size: f32,
    /// Sizes large enough to be headings, largest first
    pub heading_sizes: Vec<f32>,
    /// Characters observed per font size (in tenths of a point)
    pub size_histogram: BTreeMap<i32, usize>,
}

impl FontStatistics {
    /// Record `chars` characters set at `size`.
    pub fn add_size(&mut self, size: f32, chars: usize) {
        let key = (size * 10.0).round() as i32;
        *self.size_histogram.entry(key).or_insert(0) += chars.max(1);
    }

    /// Calculate body size and heading sizes.
    pub fn analyze(&mut self) {
        let mut body: Option<(i32, usize)> = None;
        for (&key, &count) in &self.size_histogram {
            // Ties resolve to the smaller size
            if body.map_or(true, |(_, best)| count > best) {
                body = Some((key, count));
            }
        }

        let Some((body_key, _)) = body else {
            self.body_size = 12.0;
            self.heading_sizes.clear();
            return;
        };
        self.body_size = body_key as f32 / 10.0;

        let threshold = self.body_size + HEADING_MIN_DELTA;
        self.heading_sizes = self
            .size_histogram
            .keys()
            .rev()
            .map(|k| *k as f32 / 10.0)
            .filter(|size| *size >= threshold)
            .collect();
    }

    /// Heading level for a font size (1-6, or 0 for body text).
    pub fn heading_level(&self, font_size: f32) -> u8 {
        if font_size < self.body_size + HEADING_MIN_DELTA {
            return 0;
        }

        self.heading_sizes
            .iter()
            .position(|&size| font_size >= size - 0.5)
            .map(|i| i + 1)
            .unwrap_or(self.heading_sizes.len() + 1)
            .min(6) as u8
    }
}

/// Layout of one page, ready for conversion to the paragraph model.
#[derive(Debug, Clone)]
pub struct PageLayout {
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Blocks in reading order
    pub blocks: Vec<TextBlock>,
    /// Font statistics of this page
    pub font_stats: FontStatistics,
}

/// Layout analyzer for extracting structured text from PDF pages.
pub struct LayoutAnalyzer<'b, B: PdfBackend + ?Sized> {
    backend: &'b B,
    markers: ListMarkers,
}

impl<'b, B: PdfBackend + ?Sized> LayoutAnalyzer<'b, B> {
    /// Create a new layout analyzer.
    pub fn new(backend: &'b B) -> Self {
        Self::with_markers(backend, ListMarkers::new())
    }

    /// Create an analyzer reusing already compiled list markers.
    pub fn with_markers(backend: &'b B, markers: ListMarkers) -> Self {
        Self { backend, markers }
    }

    /// Analyze a page and convert it to the paragraph model.
    pub fn page(&self, index: usize, page_id: PageId) -> Result<Page> {
        let layout = self.analyze_page(page_id)?;
        Ok(build_page(index, &layout, &self.markers))
    }

    /// Analyze a page into blocks.
    ///
    /// Font statistics are gathered from this page alone.
    pub fn analyze_page(&self, page_id: PageId) -> Result<PageLayout> {
        let (width, height) = self.backend.page_size(page_id);
        let spans = self.extract_page_spans(page_id)?;

        let mut font_stats = FontStatistics::default();
        for span in &spans {
            font_stats.add_size(span.font_size, span.text.chars().count());
        }
        font_stats.analyze();
        log::debug!(
            "Page {:?}: {} spans, body size {:.1}, heading sizes {:?}",
            page_id,
            spans.len(),
            font_stats.body_size,
            font_stats.heading_sizes
        );

        let lines = self.group_spans_into_lines(spans);
        let lines = self.detect_headings(&font_stats, lines);
        let blocks = self.group_lines_into_blocks(lines);

        Ok(PageLayout {
            width,
            height,
            blocks,
            font_stats,
        })
    }

    /// Extract text spans from a page with position and font information.
    pub fn extract_page_spans(&self, page_id: PageId) -> Result<Vec<TextSpan>> {
        let content = self.backend.page_content(page_id)?;
        if content.is_empty() {
            return Ok(Vec::new());
        }

        let fonts = match self.backend.page_fonts(page_id) {
            Ok(fonts) => fonts,
            Err(e) => {
                log::debug!("No fonts for page {:?}: {}", page_id, e);
                Vec::new()
            }
        };
        let ops = self.backend.decode_content(&content)?;

        let mut interpreter = TextInterpreter::new(self.backend, page_id, fonts);
        for op in &ops {
            interpreter.apply(op);
        }
        Ok(interpreter.spans)
    }

    /// Group spans into lines, reading two-column pages column by column.
    ///
    /// Spans that bridge the gutter (titles, full-width figures) form their
    /// own lines: those above the columns come first, the rest last.
    fn group_spans_into_lines(&self, spans: Vec<TextSpan>) -> Vec<TextLine> {
        let columns = detect_columns(&spans);
        if columns.len() <= 1 {
            return group_single_column(spans);
        }

        let gutter = columns[1].left;
        let mut spanning = Vec::new();
        let mut column_spans: Vec<Vec<TextSpan>> = vec![Vec::new(); columns.len()];
        for span in spans {
            if span.x < gutter - 5.0 && span.right() > gutter + 5.0 {
                spanning.push(span);
            } else {
                let index = columns
                    .iter()
                    .position(|c| c.contains_span(&span))
                    .unwrap_or(0);
                column_spans[index].push(span);
            }
        }

        log::debug!(
            "Two columns split at x={:.1}: spans per column {:?}, {} spanning",
            gutter,
            column_spans.iter().map(Vec::len).collect::<Vec<_>>(),
            spanning.len()
        );

        let column_lines: Vec<TextLine> = column_spans
            .into_iter()
            .flat_map(group_single_column)
            .collect();
        let columns_top = column_lines
            .iter()
            .map(|l| l.y)
            .fold(f32::NEG_INFINITY, f32::max);

        let (header, footer): (Vec<TextLine>, Vec<TextLine>) = group_single_column(spanning)
            .into_iter()
            .partition(|line| line.y > columns_top);

        header
            .into_iter()
            .chain(column_lines)
            .chain(footer)
            .collect()
    }

    /// Mark lines whose size puts them in the heading range.
    fn detect_headings(&self, stats: &FontStatistics, mut lines: Vec<TextLine>) -> Vec<TextLine> {
        for line in &mut lines {
            let level = stats.heading_level(line.font_size);
            if level == 0 || line.char_count() > MAX_HEADING_CHARS {
                continue;
            }
            if line.spans.iter().any(|s| s.text.chars().any(char::is_alphabetic)) {
                line.is_heading = true;
                line.heading_level = level;
            }
        }
        lines
    }

    /// Group lines into blocks (paragraphs) based on spacing.
    fn group_lines_into_blocks(&self, lines: Vec<TextLine>) -> Vec<TextBlock> {
        let typical_spacing = typical_line_spacing(&lines);
        let mut blocks = Vec::new();
        let mut current: Vec<TextLine> = Vec::new();

        for line in lines {
            if let (Some(first), Some(prev)) = (current.first(), current.last()) {
                if self.should_break_block(first, prev, &line, typical_spacing) {
                    blocks.push(self.finish_block(std::mem::take(&mut current)));
                }
            }
            current.push(line);
        }
        if !current.is_empty() {
            blocks.push(self.finish_block(current));
        }

        blocks.retain(|b| !b.is_empty());
        blocks
    }

    fn finish_block(&self, lines: Vec<TextLine>) -> TextBlock {
        let heading_level = lines
            .iter()
            .filter(|l| l.is_heading)
            .map(|l| l.heading_level)
            .min();

        match heading_level {
            Some(level) => {
                let mut block = TextBlock::new(lines, BlockType::Heading);
                block.heading_level = level;
                block
            }
            None => {
                let is_item = lines
                    .first()
                    .is_some_and(|l| self.markers.parse(&l.text()).is_some());
                let block_type = if is_item {
                    BlockType::ListItem
                } else {
                    BlockType::Paragraph
                };
                TextBlock::new(lines, block_type)
            }
        }
    }

    /// Determine if `curr` starts a new block after `prev`.
    fn should_break_block(
        &self,
        block_first: &TextLine,
        prev: &TextLine,
        curr: &TextLine,
        typical_spacing: f32,
    ) -> bool {
        let spacing = prev.y - curr.y;

        // Multi-line headings stay together; any other heading boundary breaks
        if prev.is_heading || curr.is_heading {
            let same_heading = prev.is_heading
                && curr.is_heading
                && prev.heading_level == curr.heading_level
                && spacing > 0.0
                && spacing <= prev.font_size * 1.6;
            return !same_heading;
        }

        if self.markers.parse(&curr.text()).is_some() {
            return true;
        }

        // Moving up the page means a new column; large gaps mean a new paragraph
        if spacing <= 0.0 || spacing > typical_spacing * 1.5 {
            return true;
        }

        if (prev.font_size - curr.font_size).abs() > 1.0 {
            return true;
        }

        // List items keep hanging-indented continuation lines
        let in_list_item = self.markers.parse(&block_first.text()).is_some();
        if in_list_item && curr.x >= block_first.x - 2.0 {
            return false;
        }

        (prev.x - curr.x).abs() > 20.0
    }
}

/// Most common vertical distance between consecutive lines moving down the
/// page, in half-point buckets. Ties resolve to the tighter spacing.
fn typical_line_spacing(lines: &[TextLine]) -> f32 {
    let mut histogram: BTreeMap<i32, usize> = BTreeMap::new();
    for w in lines.windows(2) {
        let spacing = w[0].y - w[1].y;
        if spacing > 0.1 {
            *histogram.entry((spacing * 2.0).round() as i32).or_insert(0) += 1;
        }
    }

    let mut best: Option<(i32, usize)> = None;
    for (&key, &count) in &histogram {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((key, count));
        }
    }
    best.map(|(key, _)| key as f32 / 2.0).unwrap_or(12.0)
}

/// Y-based line grouping for a single column.
fn group_single_column(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    // PDF Y grows upwards: sort top to bottom, then left to right
    spans.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut lines = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let tolerance = span.font_size * 0.3;
        match current_y {
            Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(TextLine::from_spans(std::mem::take(&mut current)));
                }
                current_y = Some(span.y);
                current.push(span);
            }
        }
    }
    if !current.is_empty() {
        lines.push(TextLine::from_spans(current));
    }

    lines
}

/// Detect a two-column layout from a vertical gutter.
///
/// Slices the text extent into thin vertical strips and looks for the widest
/// run of (nearly) empty strips in the middle 70% of the page, preferring
/// runs near the center. A few spans may bridge the gutter, so the
/// emptiness test tolerates one span in twenty-five (at least one).
fn detect_columns(spans: &[TextSpan]) -> Vec<Column> {
    let min_x = spans.iter().map(|s| s.x).fold(f32::INFINITY, f32::min);
    let max_x = spans.iter().map(|s| s.right()).fold(f32::NEG_INFINITY, f32::max);
    if !min_x.is_finite() || !max_x.is_finite() {
        return Vec::new();
    }

    let single = vec![Column {
        left: min_x - 10.0,
        right: max_x + 10.0,
        index: 0,
    }];

    let extent = max_x - min_x;
    if extent < MIN_COLUMN_WIDTH * 2.0 + MIN_GUTTER_WIDTH {
        return single;
    }

    let num_slices = (extent / SLICE_WIDTH) as usize + 1;
    if num_slices > MAX_SLICES {
        log::debug!("Text extent {:.0}pt exceeds the page, single column", extent);
        return single;
    }
    let mut occupancy = vec![0usize; num_slices];
    for span in spans {
        let start = ((span.x - min_x) / SLICE_WIDTH) as usize;
        let end = ((span.right() - min_x) / SLICE_WIDTH) as usize;
        for slot in occupancy
            .iter_mut()
            .take(end.min(num_slices - 1) + 1)
            .skip(start)
        {
            *slot += 1;
        }
    }

    let tolerance = (spans.len() / 25).max(1);
    let search_start = num_slices * 15 / 100;
    let search_end = num_slices * 85 / 100;
    let center = num_slices as f32 / 2.0;

    let mut best: Option<(usize, usize)> = None;
    let mut run_start: Option<usize> = None;
    for i in search_start..=search_end {
        let empty = i < search_end && occupancy[i] <= tolerance;
        match (empty, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                let candidate = (start, i - start);
                if is_better_gap(candidate, best, center) {
                    best = Some(candidate);
                }
                run_start = None;
            }
            _ => {}
        }
    }

    let Some((gap_start, gap_len)) = best else {
        return single;
    };

    let gutter = min_x + (gap_start as f32 + gap_len as f32 / 2.0) * SLICE_WIDTH;
    if gutter - min_x < MIN_COLUMN_WIDTH || max_x - gutter < MIN_COLUMN_WIDTH {
        log::debug!("Column too narrow, treating as single column");
        return single;
    }

    let left = spans.iter().filter(|s| s.center() < gutter).count();
    let right = spans.len() - left;
    let min_spans = (spans.len() / 10).max(2);
    if left < min_spans || right < min_spans {
        log::debug!("Spans too imbalanced ({} / {}), single column", left, right);
        return single;
    }

    vec![
        Column {
            left: min_x - 10.0,
            right: gutter,
            index: 0,
        },
        Column {
            left: gutter,
            right: max_x + 10.0,
            index: 1,
        },
    ]
}

/// Prefer clearly wider gaps, or similar gaps closer to the center.
fn is_better_gap(candidate: (usize, usize), best: Option<(usize, usize)>, center: f32) -> bool {
    let width = candidate.1 as f32 * SLICE_WIDTH;
    if width < MIN_GUTTER_WIDTH {
        return false;
    }
    let Some(best) = best else {
        return true;
    };

    let best_width = best.1 as f32 * SLICE_WIDTH;
    let dist = |(start, len): (usize, usize)| (start as f32 + len as f32 / 2.0 - center).abs();
    width > best_width * 1.5 || (width >= best_width * 0.7 && dist(candidate) < dist(best))
}

/// Affine transform `[a b c d e f]` as used by PDF.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(op: &ContentOp) -> Option<Self> {
        Some(Self {
            a: op.number(0)?,
            b: op.number(1)?,
            c: op.number(2)?,
            d: op.number(3)?,
            e: op.number(4)?,
            f: op.number(5)?,
        })
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// `self × other`: apply `self` first, then `other`.
    fn then(&self, o: &Matrix) -> Matrix {
        Matrix {
            a: self.a * o.a + self.b * o.c,
            b: self.a * o.b + self.b * o.d,
            c: self.c * o.a + self.d * o.c,
            d: self.c * o.b + self.d * o.d,
            e: self.e * o.a + self.f * o.c + o.e,
            f: self.e * o.b + self.f * o.d + o.f,
        }
    }

    fn horizontal_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Glyph metrics of a page font.
#[derive(Debug, Clone)]
struct FontMetrics {
    base_font: String,
    first_char: u32,
    widths: Vec<f32>,
    composite: bool,
}

impl FontMetrics {
    /// Advance of a shown string in thousandths of an em.
    fn advance(&self, bytes: &[u8], decoded: &str) -> f32 {
        if self.composite || self.widths.is_empty() {
            return decoded.chars().count() as f32 * DEFAULT_GLYPH_WIDTH;
        }
        bytes
            .iter()
            .map(|&b| {
                (b as u32)
                    .checked_sub(self.first_char)
                    .and_then(|i| self.widths.get(i as usize))
                    .copied()
                    .filter(|w| *w > 0.0)
                    .unwrap_or(DEFAULT_GLYPH_WIDTH)
            })
            .sum()
    }
}

impl From<BackendFontInfo> for FontMetrics {
    fn from(info: BackendFontInfo) -> Self {
        Self {
            base_font: info.base_font,
            first_char: info.first_char,
            widths: info.widths,
            composite: info.composite,
        }
    }
}

/// Text-related graphics state while walking a content stream.
struct TextInterpreter<'b, B: PdfBackend + ?Sized> {
    backend: &'b B,
    page: PageId,
    fonts: HashMap<Vec<u8>, FontMetrics>,
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    tm: Matrix,
    tlm: Matrix,
    font_key: Vec<u8>,
    font_size: f32,
    leading: f32,
    in_text: bool,
    spans: Vec<TextSpan>,
}

impl<'b, B: PdfBackend + ?Sized> TextInterpreter<'b, B> {
    fn new(backend: &'b B, page: PageId, fonts: Vec<BackendFontInfo>) -> Self {
        Self {
            backend,
            page,
            fonts: fonts
                .into_iter()
                .map(|f| (f.name.clone(), FontMetrics::from(f)))
                .collect(),
            ctm: Matrix::IDENTITY,
            ctm_stack: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            font_key: Vec::new(),
            font_size: 12.0,
            leading: 0.0,
            in_text: false,
            spans: Vec::new(),
        }
    }

    fn apply(&mut self, op: &ContentOp) {
        match op.operator.as_str() {
            "q" => self.ctm_stack.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.ctm_stack.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(op) {
                    self.ctm = m.then(&self.ctm);
                }
            }
            "BT" => {
                self.in_text = true;
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "ET" => self.in_text = false,
            "Tf" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    self.font_key = name.clone();
                }
                if let Some(size) = op.number(1) {
                    self.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = op.number(0) {
                    self.leading = leading;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                    self.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(op) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    self.show_string(bytes);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = op.operands.first() {
                    self.show_array(items);
                }
            }
            "'" => {
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    self.show_string(bytes);
                }
            }
            "\"" => {
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.get(2) {
                    self.show_string(bytes);
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translation(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = if self.leading != 0.0 {
            self.leading
        } else {
            self.font_size * 1.2
        };
        self.move_line(0.0, -leading);
    }

    fn show_string(&mut self, bytes: &[u8]) {
        if !self.in_text {
            return;
        }
        let text = self.backend.decode_text(self.page, &self.font_key, bytes);
        let advance = self.metrics_advance(bytes, &text);
        self.emit(text, advance);
    }

    fn show_array(&mut self, items: &[PdfValue]) {
        if !self.in_text {
            return;
        }
        let mut text = String::new();
        let mut advance = 0.0;
        for item in items {
            match item {
                PdfValue::Str(bytes) => {
                    let decoded = self.backend.decode_text(self.page, &self.font_key, bytes);
                    advance += self.metrics_advance(bytes, &decoded);
                    text.push_str(&decoded);
                }
                other => {
                    let Some(adjustment) = other.as_number() else {
                        continue;
                    };
                    // Negative adjustments move the next glyph to the right
                    advance -= adjustment;
                    let word_gap = -adjustment >= TJ_SPACE_THRESHOLD
                        && !text.ends_with([' ', '\u{00A0}'])
                        && text.chars().last().is_some_and(|c| !is_spaceless_script_char(c));
                    if word_gap {
                        text.push(' ');
                    }
                }
            }
        }
        self.emit(text, advance);
    }

    fn metrics_advance(&self, bytes: &[u8], decoded: &str) -> f32 {
        match self.fonts.get(&self.font_key) {
            Some(metrics) => metrics.advance(bytes, decoded),
            None => decoded.chars().count() as f32 * DEFAULT_GLYPH_WIDTH,
        }
    }

    /// Record a span at the current text position and advance past it.
    fn emit(&mut self, text: String, advance: f32) {
        let trm = self.tm.then(&self.ctm);
        let tx = advance / 1000.0 * self.font_size;
        let size = (self.font_size * trm.vertical_scale()).abs();

        if !text.trim().is_empty() && size >= 0.5 {
            let font_name = self
                .fonts
                .get(&self.font_key)
                .map(|m| m.base_font.clone())
                .unwrap_or_else(|| String::from_utf8_lossy(&self.font_key).into_owned());
            let width = (tx * trm.horizontal_scale()).abs();
            self.spans
                .push(TextSpan::new(text, trm.e, trm.f, size, font_name).with_width(width));
        }

        self.tm = Matrix::translation(tx, 0.0).then(&self.tm);
    }
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
pub(crate) fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions A-F
    (0x4E00..=0x9FFF).contains(&code)
        || (0x3400..=0x4DBF).contains(&code)
        || (0x20000..=0x2EBEF).contains(&code)
        // Hiragana, Katakana
        || (0x3040..=0x30FF).contains(&code)
        // CJK Symbols and Punctuation
        || (0x3000..=0x303F).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::LopdfBackend;
    use crate::test_support::{text_line, PdfBuilder};

    fn span(text: &str, x: f32, y: f32, size: f32) -> TextSpan {
        TextSpan::new(text.to_string(), x, y, size, "Helvetica".to_string())
    }

    fn analyze(content: &str) -> PageLayout {
        let doc = PdfBuilder::new().page(content).build();
        let backend = LopdfBackend::from_lopdf(&doc);
        let page_id = *doc.get_pages().values().next().unwrap();
        LayoutAnalyzer::new(&backend).analyze_page(page_id).unwrap()
    }

    #[test]
    fn test_font_statistics() {
        let mut stats = FontStatistics::default();
        stats.add_size(12.0, 1000);
        stats.add_size(18.0, 40);
        stats.add_size(24.0, 20);
        stats.add_size(12.8, 30);
        stats.analyze();

        assert!((stats.body_size - 12.0).abs() < 0.1);
        assert_eq!(stats.heading_sizes, vec![24.0, 18.0]);
        assert_eq!(stats.heading_level(12.0), 0);
        assert_eq!(stats.heading_level(12.8), 0);
        assert_eq!(stats.heading_level(24.0), 1);
        assert_eq!(stats.heading_level(18.0), 2);
    }

    #[test]
    fn test_font_statistics_empty() {
        let mut stats = FontStatistics::default();
        stats.analyze();
        assert_eq!(stats.body_size, 12.0);
        assert!(stats.heading_sizes.is_empty());
    }

    #[test]
    fn test_font_style_detection() {
        assert_eq!(font_style("Helvetica-Bold"), (true, false));
        assert_eq!(font_style("Helvetica-Oblique"), (false, true));
        assert_eq!(font_style("Helvetica-BoldOblique"), (true, true));
        assert_eq!(font_style("ABCDEF+CMBX12"), (true, false));
        assert_eq!(font_style("XYZABC+CMTI10"), (false, true));
        assert_eq!(font_style("NimbusRomNo9L-Medi"), (true, false));
        assert_eq!(font_style("NimbusRomNo9L-ReguItal"), (false, true));
        assert_eq!(font_style("Times-Roman"), (false, false));
        assert_eq!(font_style("CMMI10"), (false, false));
    }

    #[test]
    fn test_line_text_spacing() {
        let line = TextLine::from_spans(vec![
            span("world", 110.0, 700.0, 10.0).with_width(25.0),
            span("Hello", 72.0, 700.0, 10.0).with_width(25.0),
            span("!", 135.0, 700.0, 10.0).with_width(3.0),
        ]);
        assert_eq!(line.text(), "Hello world!");
        assert_eq!(line.x, 72.0);
    }

    #[test]
    fn test_cjk_spans_not_spaced() {
        let line = TextLine::from_spans(vec![
            span("日本", 72.0, 700.0, 10.0).with_width(20.0),
            span("語", 100.0, 700.0, 10.0).with_width(10.0),
        ]);
        assert_eq!(line.text(), "日本語");
    }

    #[test]
    fn test_column_contains_span() {
        let col = Column {
            left: 100.0,
            right: 200.0,
            index: 0,
        };
        assert!(col.contains(100.0));
        assert!(!col.contains(201.0));
        assert!(col.contains_span(&span("Test", 120.0, 0.0, 12.0).with_width(50.0)));
        // Center at 110
        assert!(col.contains_span(&span("Test", 90.0, 0.0, 12.0).with_width(40.0)));
        assert!(!col.contains_span(&span("Test", 250.0, 0.0, 12.0).with_width(30.0)));
    }

    #[test]
    fn test_detect_two_columns() {
        let mut spans = Vec::new();
        for i in 0..10 {
            let y = 700.0 - i as f32 * 12.0;
            spans.push(span("left column text", 72.0, y, 10.0).with_width(220.0));
            spans.push(span("right column text", 320.0, y, 10.0).with_width(220.0));
        }
        let columns = detect_columns(&spans);
        assert_eq!(columns.len(), 2);
        assert!(columns[0].right > 292.0 && columns[0].right < 320.0);
    }

    #[test]
    fn test_single_column_not_split() {
        let spans: Vec<TextSpan> = (0..10)
            .map(|i| span("a full width line", 72.0, 700.0 - i as f32 * 12.0, 10.0).with_width(460.0))
            .collect();
        assert_eq!(detect_columns(&spans).len(), 1);
    }

    #[test]
    fn test_far_off_page_span_is_single_column() {
        let mut spans: Vec<TextSpan> = (0..10)
            .map(|i| span("left column words", 72.0, 700.0 - i as f32 * 12.0, 10.0).with_width(200.0))
            .collect();
        spans.push(span("hidden", 9.0e10, 700.0, 12.0).with_width(30.0));
        assert_eq!(detect_columns(&spans).len(), 1);
    }

    #[test]
    fn test_off_page_text_does_not_break_layout() {
        let content = "BT /F1 12 Tf 72 700 Td (Left column words here) Tj ET \
                       BT /F1 12 Tf 1 0 0 1 90000000000 700 Tm (hidden) Tj ET";
        let layout = analyze(content);
        let text: Vec<String> = layout.blocks.iter().map(TextBlock::text).collect();
        assert!(text.iter().any(|t| t.contains("Left column words here")));
    }

    #[test]
    fn test_heading_and_paragraph_blocks() {
        let content = [
            text_line("F1", 18.0, 72.0, 720.0, "Introduction"),
            text_line("F1", 10.0, 72.0, 690.0, "Deep networks have changed"),
            text_line("F1", 10.0, 72.0, 678.0, "how papers are written and read."),
            text_line("F1", 10.0, 72.0, 650.0, "A second paragraph follows here."),
        ]
        .concat();
        let layout = analyze(&content);

        assert!((layout.font_stats.body_size - 10.0).abs() < 0.1);
        assert_eq!(layout.blocks.len(), 3);
        assert_eq!(layout.blocks[0].block_type, BlockType::Heading);
        assert_eq!(layout.blocks[0].heading_level, 1);
        assert_eq!(layout.blocks[1].lines.len(), 2);
        assert_eq!(layout.blocks[2].text(), "A second paragraph follows here.");
    }

    #[test]
    fn test_two_line_title_is_one_heading() {
        let content = [
            text_line("F1", 20.0, 72.0, 740.0, "A Very Long Title That"),
            text_line("F1", 20.0, 72.0, 716.0, "Wraps Onto Two Lines"),
            text_line("F1", 10.0, 72.0, 680.0, "Body text of the paper begins here and runs on."),
            text_line("F1", 10.0, 72.0, 668.0, "It continues for a little while longer."),
        ]
        .concat();
        let layout = analyze(&content);

        assert_eq!(layout.blocks[0].block_type, BlockType::Heading);
        assert_eq!(layout.blocks[0].lines.len(), 2);
        assert_eq!(layout.blocks.len(), 2);
    }

    #[test]
    fn test_list_items_break_blocks() {
        let content = [
            text_line("F1", 10.0, 72.0, 700.0, "Our contributions are:"),
            text_line("F1", 10.0, 72.0, 688.0, "- a new model"),
            text_line("F1", 10.0, 72.0, 676.0, "- a new dataset"),
        ]
        .concat();
        let layout = analyze(&content);

        let types: Vec<BlockType> = layout.blocks.iter().map(|b| b.block_type).collect();
        assert_eq!(
            types,
            vec![BlockType::Paragraph, BlockType::ListItem, BlockType::ListItem]
        );
    }

    #[test]
    fn test_two_column_reading_order() {
        let mut content = text_line("F1", 16.0, 150.0, 760.0, "Spanning Title Across Both Columns Of The Page");
        for i in 0..8 {
            let y = 700.0 - i as f32 * 12.0;
            content.push_str(&text_line("F1", 10.0, 72.0, y, &format!("left {} aaaa bbbb cccc dddd ee", i)));
            content.push_str(&text_line("F1", 10.0, 320.0, y, &format!("right {} aaaa bbbb cccc dddd e", i)));
        }
        let doc = PdfBuilder::new().page(&content).build();
        let backend = LopdfBackend::from_lopdf(&doc);
        let page_id = *doc.get_pages().values().next().unwrap();
        let analyzer = LayoutAnalyzer::new(&backend);
        let spans = analyzer.extract_page_spans(page_id).unwrap();
        let lines = analyzer.group_spans_into_lines(spans);
        let texts: Vec<String> = lines.iter().map(TextLine::text).collect();

        assert!(texts[0].starts_with("Spanning Title"));
        assert!(texts[1].starts_with("left 0"));
        assert!(texts[8].starts_with("left 7"));
        assert!(texts[9].starts_with("right 0"));
    }

    #[test]
    fn test_interpreter_tracks_positions() {
        let content = "BT /F1 10 Tf 14 TL 72 700 Td (First) Tj T* (Second) Tj ET \
                       q 2 0 0 2 0 0 cm BT /F1 10 Tf 50 100 Td (Scaled) Tj ET Q";
        let doc = PdfBuilder::new().page(content).build();
        let backend = LopdfBackend::from_lopdf(&doc);
        let page_id = *doc.get_pages().values().next().unwrap();
        let spans = LayoutAnalyzer::new(&backend)
            .extract_page_spans(page_id)
            .unwrap();

        assert_eq!(spans.len(), 3);
        assert_eq!((spans[0].x, spans[0].y), (72.0, 700.0));
        assert_eq!((spans[1].x, spans[1].y), (72.0, 686.0));
        assert_eq!((spans[2].x, spans[2].y), (100.0, 200.0));
        assert!((spans[2].font_size - 20.0).abs() < 0.01);
        assert_eq!(spans[0].font_name, "Helvetica");
    }

    #[test]
    fn test_tj_array_word_spaces() {
        let content = "BT /F1 10 Tf 72 700 Td [(Atten) -20 (tion) -300 (matters)] TJ ET";
        let layout = analyze(content);
        assert_eq!(layout.blocks[0].text(), "Attention matters");
    }

    #[test]
    fn test_empty_page() {
        let layout = analyze("");
        assert!(layout.blocks.is_empty());
    }
}
