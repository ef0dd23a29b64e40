//! Subject mark detection.
//!
//! Three strategies are tried per catalog subject, in configured order, and
//! the first one that yields an in-range mark wins:
//!
//! 1. [`MarkStrategy::RowPattern`]: a tabular subject row
//!    `CODE NAME THEORY [PRACTICAL] [TOTAL] [GRADE]`.
//! 2. [`MarkStrategy::NamedSubject`]: the subject name or an alias followed
//!    later on the same line by a 1–3 digit number. Occurrences inside a
//!    longer subject name (`SCIENCE` in `SOCIAL SCIENCE`) are skipped.
//! 3. [`MarkStrategy::CodePrefixed`]: the subject code, a name, then a number,
//!    all on one line.
//!
//! A value above [`MAX_MARK`] rejects that match only; the next candidate is
//! still tried.

use std::collections::BTreeMap;
use std::fmt;

use marksheet_core::record::MAX_MARK;
use marksheet_core::{Mark, Subject, SubjectCatalog};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::config::ParsingConfig;

/// `CODE NAME THEORY [PRACTICAL] [TOTAL] [GRADE]` on a single line.
///
/// The name is greedy over upper-case words and `& . -`, so layout suffixes
/// such as `LNG & LIT` or `COURSE-B` stay part of it.
static ROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(\d{3})[ \t]+([A-Z][A-Z &.\-]*[A-Z.\-])[ \t]+(\d{1,3})\b(?:[ \t]+(\d{1,3})\b)?(?:[ \t]+(\d{1,3})\b)?(?:[ \t]+([A-E][12])\b)?",
    )
    .unwrap()
});

/// Additional subjects are printed without a name under their own heading.
static ADDITIONAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)ADDITIONAL\s+SUBJECT\s+INFORMATION\s+(\d{3})\s+(\d{1,3})\s+(\d{1,3})\s+(\d{1,3})\s+([A-E][12])",
    )
    .unwrap()
});

/// A mark detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkStrategy {
    RowPattern,
    NamedSubject,
    CodePrefixed,
}

impl MarkStrategy {
    pub const DEFAULT_ORDER: [MarkStrategy; 3] = [
        MarkStrategy::RowPattern,
        MarkStrategy::NamedSubject,
        MarkStrategy::CodePrefixed,
    ];
}

impl fmt::Display for MarkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MarkStrategy::RowPattern => "row",
            MarkStrategy::NamedSubject => "named",
            MarkStrategy::CodePrefixed => "code",
        })
    }
}

/// One parsed subject row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectRow {
    pub code: String,
    /// Empty for rows from the additional-subject section.
    pub name: String,
    pub theory: Mark,
    pub practical: Option<Mark>,
    pub total: Option<Mark>,
    pub grade: Option<String>,
}

impl SubjectRow {
    /// The printed total, or theory plus practical when no total is printed.
    pub fn mark(&self) -> Mark {
        self.total
            .unwrap_or_else(|| self.theory + self.practical.unwrap_or(0))
    }

    fn from_row(caps: &Captures<'_>) -> Option<Self> {
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<Mark>().ok());
        Some(Self {
            code: caps.get(1)?.as_str().to_string(),
            name: caps
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default(),
            theory: num(3)?,
            practical: num(4),
            total: num(5),
            grade: caps.get(6).map(|m| m.as_str().to_string()),
        })
    }

    fn from_additional(caps: &Captures<'_>) -> Option<Self> {
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<Mark>().ok());
        Some(Self {
            code: caps.get(1)?.as_str().to_string(),
            name: String::new(),
            theory: num(2)?,
            practical: num(3),
            total: num(4),
            grade: caps.get(5).map(|m| m.as_str().to_uppercase()),
        })
    }
}

/// Every subject row in `block`, in order of appearance.
pub fn parse_subject_rows(block: &str, config: &ParsingConfig) -> Vec<SubjectRow> {
    let row_re = config.row_re.as_ref().unwrap_or(&*ROW_RE);
    let mut rows: Vec<SubjectRow> = row_re
        .captures_iter(block)
        .filter_map(|caps| SubjectRow::from_row(&caps))
        .collect();
    rows.extend(
        ADDITIONAL_RE
            .captures_iter(block)
            .filter_map(|caps| SubjectRow::from_additional(&caps)),
    );
    rows
}

/// Precompiled name and code patterns for one subject.
#[derive(Debug, Clone)]
pub(crate) struct SubjectMatcher {
    pub(crate) code: String,
    named: Vec<Regex>,
    /// Longer spellings of other subjects that contain one of ours
    /// (`SOCIAL SCIENCE` for `SCIENCE`). A named match inside one is not ours.
    shadows: Vec<Regex>,
    code_prefixed: Regex,
}

impl SubjectMatcher {
    pub(crate) fn new(subject: &Subject, catalog: &SubjectCatalog) -> Result<Self, regex::Error> {
        let mut spellings: Vec<String> = subject.spellings().iter().map(|s| s.to_string()).collect();
        let compact = subject.compact_name();
        if !spellings.iter().any(|s| s.eq_ignore_ascii_case(&compact)) {
            spellings.push(compact);
        }

        let named = spellings
            .iter()
            .map(|s| Regex::new(&named_pattern(s)))
            .collect::<Result<Vec<_>, _>>()?;

        let bare = spellings
            .iter()
            .map(|s| Regex::new(&format!("(?i){}", spelling_pattern(s))))
            .collect::<Result<Vec<_>, _>>()?;
        let shadows = catalog
            .subjects()
            .iter()
            .filter(|other| other.code != subject.code)
            .flat_map(|other| other.spellings())
            .filter(|longer| bare.iter().any(|re| re.find(longer).is_some_and(|m| m.len() < longer.len())))
            .map(|longer| Regex::new(&format!("(?i){}", spelling_pattern(longer))))
            .collect::<Result<Vec<_>, _>>()?;

        let code_prefixed = Regex::new(&format!(
            r"(?i)\b{}[ \t]+[A-Z][A-Z \t&.\-]*?\b(\d{{1,3}})\b",
            regex::escape(&subject.code)
        ))?;

        Ok(Self {
            code: subject.code.clone(),
            named,
            shadows,
            code_prefixed,
        })
    }

    fn shadowed(&self, block: &str, at: usize) -> bool {
        self.shadows
            .iter()
            .flat_map(|re| re.find_iter(block))
            .any(|m| m.start() <= at && at < m.end())
    }

    /// First named match on a single line that is not part of another
    /// subject's name.
    fn named_mark(&self, block: &str) -> Option<Mark> {
        self.named.iter().find_map(|re| {
            re.captures_iter(block)
                .find(|caps| caps.get(0).is_some_and(|m| !self.shadowed(block, m.start())))
                .and_then(|caps| caps.get(1))
                .and_then(|m| in_range(m.as_str()))
        })
    }
}

pub(crate) fn compile_matchers(catalog: &SubjectCatalog) -> Result<Vec<SubjectMatcher>, regex::Error> {
    catalog
        .subjects()
        .iter()
        .map(|subject| SubjectMatcher::new(subject, catalog))
        .collect()
}

/// A spelling with word boundaries where it starts or ends alphanumerically.
/// Words may be separated by any run of spaces or tabs.
fn spelling_pattern(spelling: &str) -> String {
    let body = regex::escape(spelling.trim()).replace(' ', r"[ \t]+");
    let lead = if spelling.starts_with(|c: char| c.is_alphanumeric()) {
        r"\b"
    } else {
        ""
    };
    let trail = if spelling.ends_with(|c: char| c.is_alphanumeric()) {
        r"\b"
    } else {
        ""
    };
    format!("{lead}{body}{trail}")
}

fn named_pattern(spelling: &str) -> String {
    format!(r"(?i){}[^\n]*?\b(\d{{1,3}})\b", spelling_pattern(spelling))
}

fn in_range(value: &str) -> Option<Mark> {
    value.parse::<Mark>().ok().filter(|&m| m <= MAX_MARK)
}

fn first_capture(re: &Regex, block: &str) -> Option<Mark> {
    re.captures(block)
        .and_then(|caps| caps.get(1))
        .and_then(|m| in_range(m.as_str()))
}

/// A mark and the strategy that found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkHit {
    pub mark: Mark,
    pub strategy: MarkStrategy,
}

fn detect(
    strategy: MarkStrategy,
    block: &str,
    rows: &[SubjectRow],
    matcher: &SubjectMatcher,
) -> Option<Mark> {
    match strategy {
        // Repeated rows for one code keep the highest valid mark.
        MarkStrategy::RowPattern => rows
            .iter()
            .filter(|r| r.code == matcher.code)
            .map(SubjectRow::mark)
            .filter(|&m| m <= MAX_MARK)
            .max(),
        MarkStrategy::NamedSubject => matcher.named_mark(block),
        MarkStrategy::CodePrefixed => first_capture(&matcher.code_prefixed, block),
    }
}

/// Detect marks for every subject, recording which strategy produced each.
pub(crate) fn detect_marks(
    block: &str,
    matchers: &[SubjectMatcher],
    config: &ParsingConfig,
) -> BTreeMap<String, MarkHit> {
    let rows = if config.mark_strategies.contains(&MarkStrategy::RowPattern) {
        parse_subject_rows(block, config)
    } else {
        Vec::new()
    };

    let mut hits = BTreeMap::new();
    for matcher in matchers {
        let hit = config.mark_strategies.iter().find_map(|&strategy| {
            detect(strategy, block, &rows, matcher).map(|mark| MarkHit { mark, strategy })
        });
        if let Some(hit) = hit {
            hits.insert(matcher.code.clone(), hit);
        }
    }
    hits
}

/// Marks for every catalog subject detected in `block`, keyed by code.
pub fn extract_marks(
    block: &str,
    catalog: &SubjectCatalog,
    config: &ParsingConfig,
) -> Result<BTreeMap<String, Mark>, regex::Error> {
    let matchers = compile_matchers(catalog)?;
    Ok(detect_marks(block, &matchers, config)
        .into_iter()
        .map(|(code, hit)| (code, hit.mark))
        .collect())
}
