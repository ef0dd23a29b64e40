//! Grade distributions and the Academic Performance Index (API).
//!
//! The API of a column of marks is the average rubric points per mark,
//! scaled by [`API_SCALE`] and rounded to two decimals:
//!
//! ```text
//! API = round(Σ(band_count × band_points) / total × 100, 2)
//! ```
//!
//! The same formula is used for per-subject and pooled reports.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::aggregate::AggregatedTable;
use crate::catalog::Subject;
use crate::record::Mark;
use crate::rubric::GradeRubric;

/// Multiplier applied to the average points per mark.
pub const API_SCALE: f64 = 100.0;

/// Text written in place of an API that has no marks to average.
pub const UNDEFINED_API: &str = "#DIV/0!";

pub(crate) fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// An API value, or the sentinel for an empty column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ApiValue {
    Value(f64),
    Undefined,
}

impl ApiValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            ApiValue::Value(v) => Some(*v),
            ApiValue::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, ApiValue::Undefined)
    }
}

impl fmt::Display for ApiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiValue::Value(v) if v.fract() == 0.0 => write!(f, "{v:.1}"),
            ApiValue::Value(v) => write!(f, "{v}"),
            ApiValue::Undefined => f.write_str(UNDEFINED_API),
        }
    }
}

impl Serialize for ApiValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ApiValue::Value(v) => serializer.serialize_f64(*v),
            ApiValue::Undefined => serializer.serialize_none(),
        }
    }
}

/// Number of marks falling in one rubric band.
#[derive(Debug, Clone, PartialEq)]
pub struct BandCount {
    pub label: String,
    pub column: String,
    pub points: i32,
    pub count: usize,
}

impl BandCount {
    /// `count × points`.
    pub fn points_total(&self) -> i64 {
        self.count as i64 * i64::from(self.points)
    }
}

/// What a [`DistributionReport`] was computed over.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportScope {
    Subject(Subject),
    Overall,
}

/// Grade distribution and API for one column of marks.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionReport {
    pub scope: ReportScope,
    /// Marks in the column (absent students excluded).
    pub total: usize,
    /// Students with a mark present; equal to `total`.
    pub appeared: usize,
    /// Marks at or above the rubric's pass mark.
    pub passed: usize,
    /// One entry per rubric band, in rubric order.
    pub bands: Vec<BandCount>,
    /// Sum of `count × points` over all bands.
    pub total_points: i64,
    pub api: ApiValue,
}

impl DistributionReport {
    pub fn band(&self, label: &str) -> Option<&BandCount> {
        self.bands.iter().find(|b| b.label == label)
    }

    /// Count for a band label, 0 for unknown labels.
    pub fn count(&self, label: &str) -> usize {
        self.band(label).map(|b| b.count).unwrap_or(0)
    }

    /// Subject name, or `"OVERALL"` for pooled reports.
    pub fn title(&self) -> &str {
        match &self.scope {
            ReportScope::Subject(s) => &s.name,
            ReportScope::Overall => "OVERALL",
        }
    }
}

/// Bucket `marks` into `rubric` bands and compute the API.
pub fn score_column(marks: &[Mark], rubric: &GradeRubric, scope: ReportScope) -> DistributionReport {
    let bands: Vec<BandCount> = rubric
        .bands()
        .iter()
        .map(|band| BandCount {
            label: band.label.clone(),
            column: band.column.clone(),
            points: band.points,
            count: marks.iter().filter(|&&m| band.claims(m)).count(),
        })
        .collect();

    let total = marks.len();
    let total_points: i64 = bands.iter().map(BandCount::points_total).sum();
    let api = if total == 0 {
        ApiValue::Undefined
    } else {
        ApiValue::Value(round_hundredths(
            total_points as f64 / total as f64 * API_SCALE,
        ))
    };

    DistributionReport {
        scope,
        total,
        appeared: total,
        passed: marks.iter().filter(|&&m| m >= rubric.pass_mark()).count(),
        bands,
        total_points,
        api,
    }
}

/// Per-subject and pooled distributions for one aggregated table.
#[derive(Debug, Clone)]
pub struct ApiSummary {
    /// One report per catalog subject, in catalog order.
    pub subjects: Vec<DistributionReport>,
    /// All subjects' marks pooled.
    pub overall: DistributionReport,
}

impl ApiSummary {
    pub fn compute(table: &AggregatedTable, rubric: &GradeRubric) -> Self {
        let subjects = table
            .catalog()
            .subjects()
            .iter()
            .map(|subject| {
                score_column(
                    &table.column(&subject.code),
                    rubric,
                    ReportScope::Subject(subject.clone()),
                )
            })
            .collect();
        let overall = score_column(&table.pooled_column(), rubric, ReportScope::Overall);
        Self { subjects, overall }
    }

    pub fn subject(&self, code: &str) -> Option<&DistributionReport> {
        self.subjects
            .iter()
            .find(|r| matches!(&r.scope, ReportScope::Subject(s) if s.code == code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{AggregationKey, aggregate_records};
    use crate::catalog::SubjectCatalog;
    use crate::record::StudentRecord;

    fn english() -> ReportScope {
        ReportScope::Subject(Subject::new("184", "ENGLISH", &[]))
    }

    #[test]
    fn test_scenario_distribution() {
        let report = score_column(&[100, 92, 70, 33, 0], &GradeRubric::standard(), english());
        assert_eq!(report.total, 5);
        assert_eq!(report.count(">95"), 1);
        assert_eq!(report.count("90-94.99"), 1);
        assert_eq!(report.count("70-79.9"), 1);
        assert_eq!(report.count("33-49.99"), 1);
        assert_eq!(report.count("Fail"), 1);
        assert_eq!(report.count("Compartment"), 0);
        assert_eq!(report.total_points, 10 + 8 + 4 - 1 - 3);
        assert_eq!(report.api, ApiValue::Value(360.0));
        assert_eq!(report.passed, 4);
        assert_eq!(report.appeared, 5);
    }

    #[test]
    fn test_empty_column_is_undefined() {
        let report = score_column(&[], &GradeRubric::standard(), english());
        assert_eq!(report.total, 0);
        assert!(report.api.is_undefined());
        assert_eq!(report.api.to_string(), "#DIV/0!");
        assert_eq!(serde_json::to_string(&report.api).unwrap(), "null");
    }

    #[test]
    fn test_api_rounding_and_display() {
        // (8 + 6 + 6) / 3 × 100 = 666.666…
        let report = score_column(&[91, 85, 82], &GradeRubric::standard(), english());
        assert_eq!(report.api, ApiValue::Value(666.67));
        assert_eq!(report.api.to_string(), "666.67");
        assert_eq!(ApiValue::Value(360.0).to_string(), "360.0");
        assert_eq!(serde_json::to_string(&ApiValue::Value(360.0)).unwrap(), "360.0");
    }

    #[test]
    fn test_raising_a_mark_never_lowers_api() {
        let rubric = GradeRubric::standard();
        let base = vec![12, 45, 67, 88, 0, 93];
        for i in 0..base.len() {
            let mut marks = base.clone();
            let mut previous = score_column(&marks, &rubric, ReportScope::Overall)
                .api
                .value()
                .unwrap();
            while marks[i] < 100 {
                marks[i] += 1;
                let api = score_column(&marks, &rubric, ReportScope::Overall)
                    .api
                    .value()
                    .unwrap();
                assert!(api >= previous, "api dropped from {previous} to {api}");
                previous = api;
            }
        }
    }

    #[test]
    fn test_summary_per_subject_and_overall() {
        let catalog = SubjectCatalog::class10();
        let records = vec![
            StudentRecord::new("1", "A").with_mark("184", 96).with_mark("085", 40),
            StudentRecord::new("2", "B").with_mark("184", 0),
        ];
        let table = aggregate_records(records, &catalog, AggregationKey::RollNumber);
        let summary = ApiSummary::compute(&table, &GradeRubric::standard());

        assert_eq!(summary.subjects.len(), 6);
        let eng = summary.subject("184").unwrap();
        assert_eq!(eng.total, 2);
        assert_eq!(eng.api, ApiValue::Value(350.0));
        assert_eq!(eng.title(), "ENGLISH");
        assert!(summary.subject("241").unwrap().api.is_undefined());

        assert_eq!(summary.overall.total, 3);
        // (10 - 3 - 1) / 3 × 100
        assert_eq!(summary.overall.api, ApiValue::Value(200.0));
        assert_eq!(summary.overall.title(), "OVERALL");
    }
}
