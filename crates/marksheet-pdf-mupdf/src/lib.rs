use std::path::Path;

use mupdf::{Document, TextPageFlags, WriteMode};

use marksheet_core::page::{self, ExtractionStrategy, PageContent, PageText};
use marksheet_core::{BackendError, MIN_PAGE_CHARS, PdfBackend};

/// What MuPDF reports for a glyph without a Unicode mapping.
const UNMAPPED: char = '\u{FFFD}';

/// Distance between consecutive glyph origins, in multiples of the font
/// size, beyond which they belong to different words.
const WORD_GAP: f32 = 1.0;

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate isolates the mupdf dependency (AGPL-3.0) so that text-only
/// code paths do not transitively depend on it.
///
/// Each page goes through the layout → words → table-cells fallback chain
/// from [`page::extract_page_text`]; pages are then concatenated in order.
pub struct MupdfBackend {
    /// Non-whitespace characters a strategy must produce to be accepted.
    min_page_chars: usize,
    /// Vertical distance (points) within which lines share a table row.
    row_tolerance: f32,
}

impl Default for MupdfBackend {
    fn default() -> Self {
        Self {
            min_page_chars: MIN_PAGE_CHARS,
            row_tolerance: 3.0,
        }
    }
}

impl MupdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_page_chars(mut self, chars: usize) -> Self {
        self.min_page_chars = chars;
        self
    }

    /// Set the row clustering tolerance. Negative values are treated as 0.
    pub fn with_row_tolerance(mut self, points: f32) -> Self {
        self.row_tolerance = points.max(0.0);
        self
    }
}

impl PdfBackend for MupdfBackend {
    fn extract_text(&self, path: &Path) -> Result<String, BackendError> {
        page::join_pages(&self.extract_pages(path)?)
    }

    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;
        if document
            .needs_password()
            .map_err(|e| BackendError::OpenError(e.to_string()))?
        {
            return Err(BackendError::Encrypted(path.display().to_string()));
        }

        let mut pages = Vec::new();
        for (index, page_result) in document
            .pages()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?
            .enumerate()
        {
            let page = page_result.map_err(|e| BackendError::ExtractionError(e.to_string()))?;
            let text_page = page
                .to_text_page(TextPageFlags::empty())
                .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

            let mut lines = Vec::new();
            for block in text_page.blocks() {
                for line in block.lines() {
                    let glyphs = line
                        .chars()
                        .map(|c| {
                            let origin = c.origin();
                            Glyph {
                                ch: c.char().filter(|&ch| ch != UNMAPPED),
                                x: origin.x,
                                y: origin.y,
                                size: c.size(),
                            }
                        })
                        .collect();
                    let bounds = line.bounds();
                    lines.push(GlyphLine {
                        glyphs,
                        vertical: line.wmode() == WriteMode::Vertical,
                        x0: bounds.x0,
                        y0: bounds.y0,
                        y1: bounds.y1,
                    });
                }
            }

            let glyphs = PageGlyphs::new(lines, self.row_tolerance);
            let page_text = page::extract_page_text(&glyphs, self.min_page_chars);
            log_page(index, &page_text, self.min_page_chars);
            pages.push(page_text);
        }

        Ok(pages)
    }
}

fn log_page(index: usize, page_text: &PageText, min_chars: usize) {
    match page_text.strategy {
        ExtractionStrategy::Layout => {
            tracing::trace!(page = index + 1, "layout text accepted");
        }
        strategy => {
            tracing::debug!(
                page = index + 1,
                ?strategy,
                usable = page_text.is_usable(min_chars),
                "layout text too short, fell back"
            );
        }
    }
}

/// One positioned glyph. `ch` is `None` when the font has no Unicode
/// mapping for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub ch: Option<char>,
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

impl Glyph {
    fn distance(&self, other: &Glyph) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// One MuPDF text line: its glyphs in order and its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphLine {
    pub glyphs: Vec<Glyph>,
    pub vertical: bool,
    pub x0: f32,
    pub y0: f32,
    pub y1: f32,
}

impl GlyphLine {
    fn mid_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    /// The line as MuPDF renders it, unmapped glyphs included.
    fn text(&self) -> String {
        self.glyphs.iter().map(|g| g.ch.unwrap_or(UNMAPPED)).collect()
    }

    /// Whether the glyphs advance left to right rather than down the page.
    fn is_horizontal(&self) -> bool {
        if self.vertical {
            return false;
        }
        match (self.glyphs.first(), self.glyphs.last()) {
            (Some(a), Some(b)) => (b.x - a.x).abs() >= (b.y - a.y).abs(),
            _ => true,
        }
    }
}

/// The positioned lines of a single page.
///
/// The three views read the page differently: layout keeps horizontal lines
/// as rendered, words walks every glyph of every line and splits on spacing,
/// and table rows cluster lines by vertical position.
#[derive(Debug, Clone, Default)]
pub struct PageGlyphs {
    lines: Vec<GlyphLine>,
    row_tolerance: f32,
}

impl PageGlyphs {
    pub fn new(lines: Vec<GlyphLine>, row_tolerance: f32) -> Self {
        Self {
            lines,
            row_tolerance,
        }
    }
}

impl PageContent for PageGlyphs {
    fn layout_text(&self) -> String {
        let mut out = String::new();
        for line in self.lines.iter().filter(|l| l.is_horizontal()) {
            let text = line.text();
            if text.trim().is_empty() {
                continue;
            }
            out.push_str(text.trim_end());
            out.push('\n');
        }
        out
    }

    fn words(&self) -> Vec<String> {
        let mut words = Vec::new();
        for line in &self.lines {
            let mut current = String::new();
            let mut prev: Option<&Glyph> = None;
            for glyph in &line.glyphs {
                match glyph.ch.filter(|c| !c.is_whitespace()) {
                    Some(c) => {
                        let gap = prev.is_some_and(|p| {
                            p.distance(glyph) > WORD_GAP * p.size.max(glyph.size)
                        });
                        if gap {
                            words.push(std::mem::take(&mut current));
                        }
                        current.push(c);
                        prev = Some(glyph);
                    }
                    None => {
                        if !current.is_empty() {
                            words.push(std::mem::take(&mut current));
                        }
                        prev = None;
                    }
                }
            }
            if !current.is_empty() {
                words.push(current);
            }
        }
        words
    }

    fn table_rows(&self) -> Vec<Vec<String>> {
        let mut sorted: Vec<&GlyphLine> = self.lines.iter().collect();
        sorted.sort_by(|a, b| a.mid_y().total_cmp(&b.mid_y()).then(a.x0.total_cmp(&b.x0)));

        let mut rows: Vec<Vec<&GlyphLine>> = Vec::new();
        for line in sorted {
            let same_row = rows
                .last()
                .and_then(|row| row.first())
                .is_some_and(|first| (line.mid_y() - first.mid_y()).abs() <= self.row_tolerance);
            match rows.last_mut() {
                Some(row) if same_row => row.push(line),
                _ => rows.push(vec![line]),
            }
        }

        rows.into_iter()
            .map(|mut row| {
                row.sort_by(|a, b| a.x0.total_cmp(&b.x0));
                row.iter().flat_map(|l| split_cells(&l.text())).collect()
            })
            .collect()
    }
}

/// Split a line into cells on runs of two or more spaces.
fn split_cells(text: &str) -> Vec<String> {
    text.split("  ")
        .map(|cell| cell.replace(UNMAPPED, "").trim().to_string())
        .filter(|cell| !cell.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADVANCE: f32 = 6.0;

    /// A horizontal line; `\u{FFFD}` stands for an unmapped glyph.
    fn line(text: &str, x0: f32, y0: f32) -> GlyphLine {
        let glyphs = text
            .chars()
            .enumerate()
            .map(|(i, c)| Glyph {
                ch: Some(c).filter(|&c| c != UNMAPPED),
                x: x0 + i as f32 * ADVANCE,
                y: y0 + 8.0,
                size: 10.0,
            })
            .collect();
        GlyphLine {
            glyphs,
            vertical: false,
            x0,
            y0,
            y1: y0 + 10.0,
        }
    }

    /// A line rotated a quarter turn, glyphs running down the page.
    fn rotated(text: &str, x0: f32, y0: f32) -> GlyphLine {
        let mut l = line(text, x0, y0);
        for (i, g) in l.glyphs.iter_mut().enumerate() {
            g.x = x0;
            g.y = y0 + i as f32 * ADVANCE;
        }
        l.y1 = y0 + text.len() as f32 * ADVANCE;
        l
    }

    #[test]
    fn test_layout_text_keeps_line_order() {
        let glyphs = PageGlyphs::new(
            vec![
                line("Roll No: 1234567", 10.0, 10.0),
                line("   ", 10.0, 20.0),
                line("Candidate Name: A B  ", 10.0, 30.0),
            ],
            3.0,
        );
        assert_eq!(glyphs.layout_text(), "Roll No: 1234567\nCandidate Name: A B\n");
    }

    #[test]
    fn test_words_skip_unmapped_glyphs() {
        let glyphs = PageGlyphs::new(vec![line("184 \u{FFFD}\u{FFFD} ENGLISH", 0.0, 0.0)], 3.0);
        assert_eq!(glyphs.words(), vec!["184", "ENGLISH"]);
    }

    #[test]
    fn test_words_split_on_glyph_spacing() {
        // No space characters; the words are set apart by position only.
        let mut l = line("184ENGLISH078", 0.0, 0.0);
        for (i, g) in l.glyphs.iter_mut().enumerate() {
            if i >= 3 {
                g.x += 20.0;
            }
            if i >= 10 {
                g.x += 20.0;
            }
        }
        let glyphs = PageGlyphs::new(vec![l], 3.0);
        assert_eq!(glyphs.words(), vec!["184", "ENGLISH", "078"]);
    }

    #[test]
    fn test_table_rows_cluster_by_position() {
        let glyphs = PageGlyphs::new(
            vec![
                line("078", 200.0, 51.0),
                line("184", 10.0, 50.0),
                line("ENGLISH", 60.0, 49.5),
                line("085  HINDI", 10.0, 70.0),
                line("067", 200.0, 70.5),
            ],
            3.0,
        );
        assert_eq!(
            glyphs.table_rows(),
            vec![
                vec!["184", "ENGLISH", "078"],
                vec!["085", "HINDI", "067"],
            ]
        );
    }

    #[test]
    fn test_unmapped_glyphs_do_not_satisfy_layout() {
        let glyphs = PageGlyphs::new(
            vec![line(&"\u{FFFD}".repeat(10), 0.0, 0.0), line("A1", 0.0, 20.0)],
            3.0,
        );
        let out = page::extract_page_text(&glyphs, MIN_PAGE_CHARS);
        assert_eq!(out.strategy, ExtractionStrategy::TableCells);
        assert_eq!(out.text, "A1");
    }

    #[test]
    fn test_rotated_page_recovered_by_words() {
        let glyphs = PageGlyphs::new(
            vec![rotated("ROLL 1234567", 10.0, 10.0), rotated("ENGLISH 078", 30.0, 10.0)],
            3.0,
        );
        assert_eq!(glyphs.layout_text(), "");
        let out = page::extract_page_text(&glyphs, MIN_PAGE_CHARS);
        assert_eq!(out.strategy, ExtractionStrategy::Words);
        assert_eq!(out.text, "ROLL 1234567 ENGLISH 078");
    }

    #[test]
    fn test_fallback_chain_on_glyphs() {
        // Too little text for any strategy to reach the threshold.
        let glyphs = PageGlyphs::new(vec![line("A1", 0.0, 0.0)], 3.0);
        let out = page::extract_page_text(&glyphs, MIN_PAGE_CHARS);
        assert_eq!(out.strategy, ExtractionStrategy::TableCells);
        assert_eq!(out.text, "A1");

        let glyphs = PageGlyphs::new(vec![line("184 ENGLISH 078 020 098", 0.0, 0.0)], 3.0);
        let out = page::extract_page_text(&glyphs, MIN_PAGE_CHARS);
        assert_eq!(out.strategy, ExtractionStrategy::Layout);
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let backend = MupdfBackend::new().with_min_page_chars(5).with_row_tolerance(-1.0);
        assert_eq!(backend.row_tolerance, 0.0);
        let err = backend
            .extract_text(Path::new("/nonexistent/marksheet.pdf"))
            .unwrap_err();
        assert!(matches!(err, BackendError::OpenError(_)));
    }
}
