use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("subject code {0:?} is not a 3-digit code")]
    InvalidCode(String),
    #[error("subject code {0} appears more than once")]
    DuplicateCode(String),
    #[error("subject {0} has an empty name")]
    EmptyName(String),
}

/// A single examination subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    /// Board subject code, always three ASCII digits (e.g. `"085"`).
    pub code: String,
    /// Canonical upper-case name (e.g. `"SOCIAL SCIENCE"`).
    pub name: String,
    /// Alternative spellings seen on mark-sheets, tried after the canonical name.
    pub aliases: Vec<String>,
}

impl Subject {
    pub fn new(code: &str, name: &str, aliases: &[&str]) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Canonical name followed by every distinct alias, in declaration order.
    pub fn spellings(&self) -> Vec<&str> {
        let mut out = vec![self.name.as_str()];
        for alias in &self.aliases {
            if !out.iter().any(|s| s.eq_ignore_ascii_case(alias)) {
                out.push(alias.as_str());
            }
        }
        out
    }

    /// Canonical name with everything but letters and digits removed
    /// (`"SOCIAL SCIENCE"` → `"SOCIALSCIENCE"`).
    pub fn compact_name(&self) -> String {
        self.name.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
    }
}

/// Immutable, ordered registry of the subjects examined at one grade level.
///
/// Order is significant: it fixes the column order of every report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectCatalog {
    subjects: Vec<Subject>,
}

impl SubjectCatalog {
    /// Build a catalog, rejecting malformed or duplicate codes.
    pub fn new(subjects: Vec<Subject>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for s in &subjects {
            if s.code.len() != 3 || !s.code.bytes().all(|b| b.is_ascii_digit()) {
                return Err(CatalogError::InvalidCode(s.code.clone()));
            }
            if s.name.trim().is_empty() {
                return Err(CatalogError::EmptyName(s.code.clone()));
            }
            if !seen.insert(s.code.clone()) {
                return Err(CatalogError::DuplicateCode(s.code.clone()));
            }
        }
        Ok(Self { subjects })
    }

    /// Secondary school (class 10) subjects.
    pub fn class10() -> Self {
        Self {
            subjects: vec![
                Subject::new(
                    "184",
                    "ENGLISH",
                    &["ENGLISH", "ENG", "ENGLISH LNG", "ENGLISH LANGUAGE", "ENGLISH LNG & LIT"],
                ),
                Subject::new(
                    "085",
                    "HINDI",
                    &["HINDI", "HINDI LNG", "HINDI LANGUAGE", "HINDI COURSE-B"],
                ),
                Subject::new(
                    "241",
                    "MATHEMATICS",
                    &["MATHEMATICS", "MATH", "MATHS", "MATHEMATICS BASIC"],
                ),
                Subject::new("086", "SCIENCE", &["SCIENCE", "SCI", "SCIENCE & TECHNOLOGY"]),
                Subject::new(
                    "087",
                    "SOCIAL SCIENCE",
                    &["SOCIAL SCIENCE", "SOC SCI", "SOCIAL STUDIES", "SST", "SOCIAL ST"],
                ),
                Subject::new(
                    "402",
                    "IT",
                    &["IT", "INFORMATION TECHNOLOGY", "COMPUTER", "COMPUTERS"],
                ),
            ],
        }
    }

    /// Senior secondary (class 12) subjects across all three streams.
    pub fn class12() -> Self {
        Self {
            subjects: vec![
                Subject::new("301", "ENGLISH CORE", &["ENGLISH CORE", "ENG CORE", "ENGLISH"]),
                Subject::new("302", "HINDI CORE", &["HINDI CORE", "HINDI"]),
                Subject::new("041", "MATHEMATICS", &["MATHEMATICS", "MATHS", "MATH"]),
                Subject::new("042", "PHYSICS", &["PHYSICS"]),
                Subject::new("043", "CHEMISTRY", &["CHEMISTRY"]),
                Subject::new("044", "BIOLOGY", &["BIOLOGY", "BIO"]),
                Subject::new(
                    "048",
                    "PHYSICAL EDUCATION",
                    &["PHYSICAL EDUCATION", "PHY EDU", "PHYSICAL EDU"],
                ),
                Subject::new("030", "ECONOMICS", &["ECONOMICS", "ECO"]),
                Subject::new("054", "BUSINESS STUDIES", &["BUSINESS STUDIES", "BUSINESS ST", "BST"]),
                Subject::new("055", "ACCOUNTANCY", &["ACCOUNTANCY", "ACCOUNTS"]),
                Subject::new(
                    "083",
                    "COMPUTER SCIENCE",
                    &["COMPUTER SCIENCE", "COMP SCI", "COMPUTER SC"],
                ),
                Subject::new("027", "HISTORY", &["HISTORY"]),
                Subject::new("028", "POLITICAL SCIENCE", &["POLITICAL SCIENCE", "POL SCI"]),
                Subject::new("029", "GEOGRAPHY", &["GEOGRAPHY", "GEO"]),
                Subject::new("037", "PSYCHOLOGY", &["PSYCHOLOGY"]),
                Subject::new(
                    "802",
                    "INFORMATION TECHNOLOGY",
                    &["INFORMATION TECHNOLOGY", "INFO TECH"],
                ),
                Subject::new("803", "AI", &["AI", "ARTIFICIAL INTELLIGENCE"]),
                Subject::new("804", "PAT", &["PAT"]),
            ],
        }
    }

    pub fn for_grade(grade: GradeLevel) -> Self {
        match grade {
            GradeLevel::Class10 => Self::class10(),
            GradeLevel::Class12 => Self::class12(),
        }
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn get(&self, code: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.subjects.iter().map(|s| s.code.as_str())
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

/// School grade a batch of mark-sheets belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradeLevel {
    Class10,
    Class12,
}

impl GradeLevel {
    /// File name of the per-student result table for this grade.
    pub fn result_file_name(&self) -> &'static str {
        match self {
            GradeLevel::Class10 => "10th_result.csv",
            GradeLevel::Class12 => "12th_result.csv",
        }
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeLevel::Class10 => write!(f, "class 10"),
            GradeLevel::Class12 => write!(f, "class 12"),
        }
    }
}

impl FromStr for GradeLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "10" | "x" | "10th" | "class10" | "classx" => Ok(GradeLevel::Class10),
            "12" | "xii" | "12th" | "class12" | "classxii" => Ok(GradeLevel::Class12),
            _ => Err(format!("unknown grade {s:?} (expected 10 or 12)")),
        }
    }
}

/// Class 12 subject track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stream {
    Science,
    Commerce,
    Humanities,
}

impl Stream {
    pub const ALL: [Stream; 3] = [Stream::Science, Stream::Commerce, Stream::Humanities];

    pub fn name(&self) -> &'static str {
        match self {
            Stream::Science => "science",
            Stream::Commerce => "commerce",
            Stream::Humanities => "humanities",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
