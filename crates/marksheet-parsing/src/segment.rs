//! Splitting document text into per-student blocks.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ParsingConfig;

/// A line carrying a roll number label followed by digits opens a new block.
static ANCHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Roll\s*(?:Number|No)\.?[:\s]\s*\d+").unwrap());

/// Lazy iterator over student blocks.
///
/// A block starts at an anchor line (inclusive) and runs up to the next
/// anchor line (exclusive) or the end of the text. Text before the first
/// anchor belongs to no block and is dropped. Blocks borrow from the source
/// text and keep its original line breaks, minus trailing whitespace.
#[derive(Debug, Clone)]
pub struct StudentBlocks<'a> {
    text: &'a str,
    anchor: &'a Regex,
    pos: usize,
    block_start: Option<usize>,
}

impl<'a> StudentBlocks<'a> {
    pub fn new(text: &'a str, config: &'a ParsingConfig) -> Self {
        Self::with_anchor(text, config.anchor_re.as_ref().unwrap_or(&*ANCHOR_RE))
    }

    fn with_anchor(text: &'a str, anchor: &'a Regex) -> Self {
        Self {
            text,
            anchor,
            pos: 0,
            block_start: None,
        }
    }
}

impl<'a> Iterator for StudentBlocks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while self.pos < self.text.len() {
            let rest = &self.text[self.pos..];
            let line_len = rest.find('\n').map_or(rest.len(), |i| i + 1);
            let line_start = self.pos;
            self.pos += line_len;

            let line = rest[..line_len].trim_end_matches(['\r', '\n']);
            if !self.anchor.is_match(line) {
                continue;
            }
            if let Some(start) = self.block_start.replace(line_start) {
                return Some(self.text[start..line_start].trim_end());
            }
        }
        self.block_start
            .take()
            .map(|start| self.text[start..].trim_end())
    }
}

/// Split `text` into student blocks using the default anchor.
pub fn segment_blocks(text: &str) -> Vec<&str> {
    StudentBlocks::with_anchor(text, &ANCHOR_RE).collect()
}
