//! Identity field extraction (roll number, names, school, result).

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ParsingConfig;

/// A labelled identity value printed on a mark-sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityField {
    RollNumber,
    Name,
    MotherName,
    FatherName,
    School,
    Division,
    Result,
}

impl IdentityField {
    pub const ALL: [IdentityField; 7] = [
        IdentityField::RollNumber,
        IdentityField::Name,
        IdentityField::MotherName,
        IdentityField::FatherName,
        IdentityField::School,
        IdentityField::Division,
        IdentityField::Result,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdentityField::RollNumber => "roll number",
            IdentityField::Name => "name",
            IdentityField::MotherName => "mother's name",
            IdentityField::FatherName => "father's name",
            IdentityField::School => "school",
            IdentityField::Division => "division",
            IdentityField::Result => "result",
        })
    }
}

/// A compiled pattern whose first capture group yields a field value.
#[derive(Debug, Clone)]
pub struct IdentityPattern {
    pub field: IdentityField,
    pub regex: Regex,
}

impl IdentityPattern {
    pub fn new(field: IdentityField, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            field,
            regex: Regex::new(pattern)?,
        })
    }
}

static DEFAULT_PATTERNS: Lazy<Vec<IdentityPattern>> = Lazy::new(|| {
    [
        (
            IdentityField::RollNumber,
            r"(?i)(?:Roll\s*(?:Number|No)|Seat\s*No)[.:\s]+(\d+)",
        ),
        (
            IdentityField::Name,
            r"(?i)(?:Student|Candidate)(?:'s)?\s*Name[.:\s]+([^\n]+)",
        ),
        (IdentityField::Name, r"(?im)^[ \t]*Name[.:\s]+([^\n]+)"),
        (IdentityField::MotherName, r"(?i)Mother'?s?\s*Name[.:\s]+([^\n]+)"),
        (
            IdentityField::FatherName,
            r"(?i)(?:Father|Guardian)'?s?\s*Name[.:\s]+([^\n]+)",
        ),
        (IdentityField::School, r"(?i)School(?:'s)?\s*Name[.:\s]+([^\n]+)"),
        (IdentityField::Division, r"(?i)Division[.:\s]+([^\n]+)"),
        (IdentityField::Result, r"(?i)\bResult[.:\s]+([A-Z]+)"),
    ]
    .into_iter()
    .map(|(field, p)| IdentityPattern {
        field,
        regex: Regex::new(p).unwrap(),
    })
    .collect()
});

/// Where a captured value runs into the next label on the same line.
static LABEL_STOP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:\s(?:(?:Mother|Father|Guardian)'?s?|School(?:'s)?|Candidate|Student)\s*Name\b|\sRoll\s*(?:Number|No)\b|\sDivision\b|\sResult\b)",
    )
    .unwrap()
});

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Identity values found in one block; each slot holds the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityFields {
    values: [Option<String>; 7],
}

impl IdentityFields {
    pub fn get(&self, field: IdentityField) -> Option<&str> {
        self.values[field.index()].as_deref()
    }

    /// Store `value` unless the field already has one. Returns whether it was stored.
    pub fn set_if_absent(&mut self, field: IdentityField, value: String) -> bool {
        let slot = &mut self.values[field.index()];
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        true
    }

    /// Number of distinct fields found.
    pub fn count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn take(&mut self, field: IdentityField) -> Option<String> {
        self.values[field.index()].take()
    }
}

/// Trim a captured value down to the field itself.
///
/// Cuts at the next label, collapses whitespace and strips trailing
/// separators.
pub fn clean_value(raw: &str) -> String {
    let raw = raw.trim();
    let cut = match LABEL_STOP_RE.find(raw) {
        Some(m) => &raw[..m.start()],
        None => raw,
    };
    let collapsed = WHITESPACE_RE.replace_all(cut, " ");
    collapsed
        .trim_end_matches(|c: char| {
            c.is_whitespace() || matches!(c, '.' | ':' | ',' | ';' | '-' | '|')
        })
        .to_string()
}

fn accept(field: IdentityField, value: &str) -> bool {
    match field {
        IdentityField::RollNumber => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
        _ => value.chars().any(|c| c.is_alphabetic()),
    }
}

/// Extract identity fields from a student block.
pub fn extract_identity(block: &str, config: &ParsingConfig) -> IdentityFields {
    let patterns = config.identity_patterns.resolve(&DEFAULT_PATTERNS);
    let mut fields = IdentityFields::default();

    for pattern in &patterns {
        if fields.get(pattern.field).is_some() {
            continue;
        }
        let Some(raw) = pattern
            .regex
            .captures(block)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
        else {
            continue;
        };
        let value = match pattern.field {
            IdentityField::Result => clean_value(raw).to_uppercase(),
            _ => clean_value(raw),
        };
        if accept(pattern.field, &value) {
            fields.set_if_absent(pattern.field, value);
        }
    }

    fields
}
