//! Per-page text extraction fallback chain.
//!
//! Scanned mark-sheets often carry a sparse or broken text layer. Each page is
//! read with the layout-aware text first; if that yields fewer than
//! [`MIN_PAGE_CHARS`] usable characters the page's word tokens are
//! joined instead, and failing that its table cells are flattened row-major.

use std::fmt;

use crate::BackendError;

/// Minimum number of usable characters for a strategy to count.
pub const MIN_PAGE_CHARS: usize = 10;

/// Separator placed between consecutive pages.
pub const PAGE_SEPARATOR: &str = "\n";

/// The strategy that produced a page's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    Layout,
    Words,
    TableCells,
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExtractionStrategy::Layout => "layout",
            ExtractionStrategy::Words => "words",
            ExtractionStrategy::TableCells => "table cells",
        })
    }
}

/// Views of a single page's text, from most to least structured.
pub trait PageContent {
    /// Text in reading order with line breaks preserved.
    fn layout_text(&self) -> String;
    /// Word tokens in reading order.
    fn words(&self) -> Vec<String>;
    /// Table cells grouped by row, top to bottom.
    fn table_rows(&self) -> Vec<Vec<String>>;
}

/// Text recovered from one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub text: String,
    pub strategy: ExtractionStrategy,
}

impl PageText {
    pub fn is_usable(&self, min_chars: usize) -> bool {
        usable_len(&self.text) >= min_chars
    }
}

/// Characters that carry text: everything but whitespace and the
/// replacement character PDF backends emit for unmapped glyphs.
pub fn usable_len(text: &str) -> usize {
    text.chars()
        .filter(|&c| !c.is_whitespace() && c != char::REPLACEMENT_CHARACTER)
        .count()
}

/// Run the layout → words → table-cells chain on one page.
///
/// The last strategy's output is returned even when it is still short.
pub fn extract_page_text(page: &dyn PageContent, min_chars: usize) -> PageText {
    let layout = page.layout_text();
    if usable_len(&layout) >= min_chars {
        return PageText {
            text: layout,
            strategy: ExtractionStrategy::Layout,
        };
    }

    let words = page.words().join(" ");
    if usable_len(&words) >= min_chars {
        return PageText {
            text: words,
            strategy: ExtractionStrategy::Words,
        };
    }

    let cells: Vec<String> = page
        .table_rows()
        .into_iter()
        .flatten()
        .map(|cell| cell.trim().to_string())
        .filter(|cell| !cell.is_empty())
        .collect();
    PageText {
        text: cells.join(" "),
        strategy: ExtractionStrategy::TableCells,
    }
}

/// Concatenate pages, failing when no page produced any text at all.
pub fn join_pages(pages: &[PageText]) -> Result<String, BackendError> {
    if pages.iter().all(|p| usable_len(&p.text) == 0) {
        return Err(BackendError::NoText { pages: pages.len() });
    }
    let mut out = String::new();
    for page in pages {
        out.push_str(&page.text);
        out.push_str(PAGE_SEPARATOR);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePage {
        layout: &'static str,
        words: Vec<&'static str>,
        rows: Vec<Vec<&'static str>>,
    }

    impl PageContent for FakePage {
        fn layout_text(&self) -> String {
            self.layout.to_string()
        }
        fn words(&self) -> Vec<String> {
            self.words.iter().map(|w| w.to_string()).collect()
        }
        fn table_rows(&self) -> Vec<Vec<String>> {
            self.rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect()
        }
    }

    #[test]
    fn test_layout_text_preferred() {
        let page = FakePage {
            layout: "Roll No: 1234567\nCandidate Name: A B",
            words: vec!["ignored", "words", "here"],
            rows: vec![],
        };
        let out = extract_page_text(&page, MIN_PAGE_CHARS);
        assert_eq!(out.strategy, ExtractionStrategy::Layout);
        assert!(out.text.contains("Candidate Name"));
    }

    #[test]
    fn test_falls_back_to_words() {
        let page = FakePage {
            layout: "  \n  abc ",
            words: vec!["Roll", "No:", "1234567"],
            rows: vec![vec!["never"]],
        };
        let out = extract_page_text(&page, MIN_PAGE_CHARS);
        assert_eq!(out.strategy, ExtractionStrategy::Words);
        assert_eq!(out.text, "Roll No: 1234567");
    }

    #[test]
    fn test_falls_back_to_table_cells() {
        let page = FakePage {
            layout: "",
            words: vec!["a"],
            rows: vec![
                vec!["184", "", "ENGLISH"],
                vec!["  ", "078", "A2 "],
            ],
        };
        let out = extract_page_text(&page, MIN_PAGE_CHARS);
        assert_eq!(out.strategy, ExtractionStrategy::TableCells);
        assert_eq!(out.text, "184 ENGLISH 078 A2");
    }

    #[test]
    fn test_replacement_characters_are_not_usable() {
        let page = FakePage {
            layout: "\u{FFFD}\u{FFFD}\u{FFFD}\u{FFFD}\u{FFFD}\u{FFFD}\u{FFFD}\u{FFFD}\u{FFFD}\u{FFFD} A1",
            words: vec!["Roll", "No:", "1234567"],
            rows: vec![],
        };
        assert_eq!(usable_len(page.layout), 2);
        let out = extract_page_text(&page, MIN_PAGE_CHARS);
        assert_eq!(out.strategy, ExtractionStrategy::Words);
    }

    #[test]
    fn test_join_pages_rejects_blank_document() {
        let blank = PageText {
            text: " \n".into(),
            strategy: ExtractionStrategy::TableCells,
        };
        assert!(matches!(
            join_pages(&[blank.clone(), blank]),
            Err(BackendError::NoText { pages: 2 })
        ));
    }

    #[test]
    fn test_join_pages_separates_pages() {
        let pages = vec![
            PageText {
                text: "page one".into(),
                strategy: ExtractionStrategy::Layout,
            },
            PageText {
                text: "".into(),
                strategy: ExtractionStrategy::TableCells,
            },
            PageText {
                text: "page three".into(),
                strategy: ExtractionStrategy::Words,
            },
        ];
        assert_eq!(join_pages(&pages).unwrap(), "page one\n\npage three\n");
    }
}
