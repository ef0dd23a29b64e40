use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::SubjectCatalog;
use crate::record::{Mark, StudentRecord};
use crate::scoring::round_hundredths;

/// Number of subjects counted towards the composite score.
pub const BEST_OF: usize = 5;

/// Field used to decide whether two records describe the same student.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKey {
    /// Roll number, falling back to the name when the roll number is empty.
    #[default]
    RollNumber,
    /// Student name only.
    Name,
}

impl AggregationKey {
    fn key_for(&self, record: &StudentRecord) -> String {
        let name_key = || format!("name:{}", normalize_name(&record.name));
        match self {
            AggregationKey::RollNumber if !record.roll_number.trim().is_empty() => {
                format!("roll:{}", record.roll_number.trim())
            }
            _ => name_key(),
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// A student row of the aggregated table with derived composite fields.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedStudent {
    pub record: StudentRecord,
    /// Sum of the five highest marks, or 0 with fewer than five subjects.
    pub best_of_5: u32,
    /// `best_of_5 / 500 × 100`, two decimals; 0 alongside a zero composite.
    pub percentage: f64,
}

impl AggregatedStudent {
    pub fn new(record: StudentRecord) -> Self {
        let best_of_5 = best_of_five(record.marks.values().copied());
        let percentage = if best_of_5 == 0 {
            0.0
        } else {
            round_hundredths(f64::from(best_of_5) / (BEST_OF as f64 * 100.0) * 100.0)
        };
        Self {
            record,
            best_of_5,
            percentage,
        }
    }
}

/// Sum of the [`BEST_OF`] largest marks, or 0 when fewer are available.
pub fn best_of_five(marks: impl IntoIterator<Item = Mark>) -> u32 {
    let mut marks: Vec<Mark> = marks.into_iter().collect();
    if marks.len() < BEST_OF {
        return 0;
    }
    marks.sort_unstable_by(|a, b| b.cmp(a));
    marks.iter().take(BEST_OF).sum()
}

/// Canonical per-student table with fixed subject columns.
#[derive(Debug, Clone)]
pub struct AggregatedTable {
    catalog: SubjectCatalog,
    students: Vec<AggregatedStudent>,
}

impl AggregatedTable {
    pub fn catalog(&self) -> &SubjectCatalog {
        &self.catalog
    }

    pub fn students(&self) -> &[AggregatedStudent] {
        &self.students
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Marks recorded for one subject, absent students excluded, in row order.
    pub fn column(&self, code: &str) -> Vec<Mark> {
        self.students
            .iter()
            .filter_map(|s| s.record.mark(code))
            .collect()
    }

    /// Every subject's column concatenated in catalog order.
    pub fn pooled_column(&self) -> Vec<Mark> {
        self.catalog
            .codes()
            .flat_map(|code| self.column(code))
            .collect()
    }
}

/// Group records by student and fold them into an [`AggregatedTable`].
///
/// Within a group every catalog subject keeps the highest mark seen; codes
/// outside the catalog are dropped. Rows keep the order in which each student
/// first appeared.
pub fn aggregate_records<I>(records: I, catalog: &SubjectCatalog, key: AggregationKey) -> AggregatedTable
where
    I: IntoIterator<Item = StudentRecord>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut grouped: Vec<StudentRecord> = Vec::new();

    for mut record in records {
        record.marks.retain(|code, _| catalog.contains(code));
        let k = key.key_for(&record);
        match index.get(&k) {
            Some(&i) => grouped[i].merge(&record),
            None => {
                index.insert(k, grouped.len());
                grouped.push(record);
            }
        }
    }

    tracing::debug!(students = grouped.len(), ?key, "aggregated records");

    AggregatedTable {
        catalog: catalog.clone(),
        students: grouped.into_iter().map(AggregatedStudent::new).collect(),
    }
}
