//! JSON summary of a multi-stream run.
//!
//! ```json
//! {
//!   "science": {"subject_apis": {"ENGLISH CORE": 350.0, ...}, "overall_api": 212.5, "students": [...]},
//!   "commerce": {"error": "nothing processed: ..."},
//!   "combined": {...}
//! }
//! ```
//!
//! Subjects keep catalog order. Undefined APIs serialize as `null`.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use marksheet_core::{AggregatedTable, ApiSummary, ApiValue, Stream};

use crate::ReportError;

/// Identity of one student in a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentRef {
    pub roll_number: String,
    pub name: String,
}

/// Subject name → API, serialized as a map in catalog order.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectApis(pub Vec<(String, ApiValue)>);

impl Serialize for SubjectApis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, api) in &self.0 {
            map.serialize_entry(name, api)?;
        }
        map.end()
    }
}

/// APIs and students of one scored table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSummary {
    pub subject_apis: SubjectApis,
    pub overall_api: ApiValue,
    pub students: Vec<StudentRef>,
}

impl GradeSummary {
    pub fn new(table: &AggregatedTable, summary: &ApiSummary) -> Self {
        Self {
            subject_apis: SubjectApis(
                summary
                    .subjects
                    .iter()
                    .map(|r| (r.title().to_string(), r.api))
                    .collect(),
            ),
            overall_api: summary.overall.api,
            students: table
                .students()
                .iter()
                .map(|s| StudentRef {
                    roll_number: s.record.roll_number.clone(),
                    name: s.record.name.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamEntry {
    Summary(GradeSummary),
    Failed { error: String },
}

impl StreamEntry {
    pub fn failed(error: impl ToString) -> Self {
        StreamEntry::Failed {
            error: error.to_string(),
        }
    }
}

/// Per-stream entries plus the combined entry, written as one JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamsReport {
    streams: Vec<(Stream, StreamEntry)>,
    combined: StreamEntry,
}

impl StreamsReport {
    pub fn new(streams: Vec<(Stream, StreamEntry)>, combined: StreamEntry) -> Self {
        Self { streams, combined }
    }

    pub fn streams(&self) -> &[(Stream, StreamEntry)] {
        &self.streams
    }

    pub fn combined(&self) -> &StreamEntry {
        &self.combined
    }

    pub fn to_json_pretty(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Serialize for StreamsReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.streams.len() + 1))?;
        for (stream, entry) in &self.streams {
            map.serialize_entry(stream.name(), entry)?;
        }
        map.serialize_entry("combined", &self.combined)?;
        map.end()
    }
}
