use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A subject mark out of 100.
pub type Mark = u32;

/// Highest mark a subject can carry.
pub const MAX_MARK: Mark = 100;

/// One student's identity and subject marks, as parsed from a mark-sheet.
///
/// Subjects the student did not sit (or that could not be recovered) have no
/// entry in `marks`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub roll_number: String,
    pub name: String,
    pub mother_name: Option<String>,
    pub father_name: Option<String>,
    pub school: Option<String>,
    pub division: Option<String>,
    pub result: Option<String>,
    /// Subject code → mark.
    pub marks: BTreeMap<String, Mark>,
}

impl StudentRecord {
    pub fn new(roll_number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            roll_number: roll_number.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style helper used mostly by tests and fixtures.
    pub fn with_mark(mut self, code: &str, mark: Mark) -> Self {
        self.record_mark(code, mark);
        self
    }

    /// Record `mark` for `code`, keeping the larger value on repeats.
    ///
    /// Returns `false` (and records nothing) for marks above [`MAX_MARK`].
    pub fn record_mark(&mut self, code: &str, mark: Mark) -> bool {
        if mark > MAX_MARK {
            return false;
        }
        let entry = self.marks.entry(code.to_string()).or_insert(mark);
        if mark > *entry {
            *entry = mark;
        }
        true
    }

    pub fn mark(&self, code: &str) -> Option<Mark> {
        self.marks.get(code).copied()
    }

    /// Fold `other` into `self`: marks keep the maximum, identity fields keep
    /// the first non-empty value.
    pub fn merge(&mut self, other: &StudentRecord) {
        for (code, &mark) in &other.marks {
            self.record_mark(code, mark);
        }
        fill(&mut self.roll_number, &other.roll_number);
        fill(&mut self.name, &other.name);
        fill_opt(&mut self.mother_name, &other.mother_name);
        fill_opt(&mut self.father_name, &other.father_name);
        fill_opt(&mut self.school, &other.school);
        fill_opt(&mut self.division, &other.division);
        fill_opt(&mut self.result, &other.result);
    }
}

fn fill(slot: &mut String, value: &str) {
    if slot.trim().is_empty() && !value.trim().is_empty() {
        *slot = value.to_string();
    }
}

fn fill_opt(slot: &mut Option<String>, value: &Option<String>) {
    if slot.is_none() {
        slot.clone_from(value);
    }
}

/// Statistics about blocks that did not produce a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipStats {
    /// Blocks produced by segmentation.
    pub total_blocks: usize,
    /// Blocks lacking a roll number, a name, or enough identity fields.
    pub missing_identity: usize,
    /// Blocks with identity fields but no recoverable subject mark.
    pub no_marks: usize,
}

/// Records parsed from a single document.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub records: Vec<StudentRecord>,
    pub skip_stats: SkipStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_mark_keeps_maximum() {
        let mut r = StudentRecord::new("1234567", "A B");
        assert!(r.record_mark("184", 80));
        assert!(r.record_mark("184", 72));
        assert_eq!(r.mark("184"), Some(80));
        assert!(r.record_mark("184", 85));
        assert_eq!(r.mark("184"), Some(85));
    }

    #[test]
    fn test_record_mark_rejects_out_of_range() {
        let mut r = StudentRecord::new("1", "A");
        assert!(!r.record_mark("184", 101));
        assert_eq!(r.mark("184"), None);
        assert!(r.record_mark("184", 0));
        assert_eq!(r.mark("184"), Some(0));
    }

    #[test]
    fn test_merge_fills_identity_and_maxes_marks() {
        let mut a = StudentRecord::new("1234567", "A B").with_mark("184", 80);
        let mut b = StudentRecord::new("1234567", "A B")
            .with_mark("184", 85)
            .with_mark("085", 60);
        b.school = Some("APS".into());
        a.merge(&b);
        assert_eq!(a.mark("184"), Some(85));
        assert_eq!(a.mark("085"), Some(60));
        assert_eq!(a.school.as_deref(), Some("APS"));

        let c = StudentRecord {
            school: Some("OTHER".into()),
            ..StudentRecord::new("", "")
        };
        a.merge(&c);
        assert_eq!(a.school.as_deref(), Some("APS"));
        assert_eq!(a.roll_number, "1234567");
        b = StudentRecord::new("", "A B");
        b.merge(&a);
        assert_eq!(b.roll_number, "1234567");
    }
}
