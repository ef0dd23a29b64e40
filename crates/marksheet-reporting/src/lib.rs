use std::path::{Path, PathBuf};

use thiserror::Error;

use marksheet_core::{AggregatedTable, ApiSummary, GradeLevel};

pub mod atomic;
pub mod distribution;
pub mod summary;
pub mod table;

pub use atomic::write_atomic;
pub use distribution::{
    OVERALL_FILE, SUBJECT_DIR, SUMMARY_FILE, distribution_csv, subject_file_name,
    subject_summary_csv,
};
pub use summary::{GradeSummary, StreamEntry, StreamsReport, StudentRef};
pub use table::{read_result_table, result_table_csv};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{}: line {line}: {message}", .path.display())]
    Malformed {
        path: PathBuf,
        line: u64,
        message: String,
    },
}

/// Files written by [`write_all_reports`], in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenReports {
    pub result_table: PathBuf,
    pub subject_files: Vec<PathBuf>,
    pub subject_summary: PathBuf,
    pub overall: PathBuf,
}

impl WrittenReports {
    /// Every written path, in write order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.result_table.as_path())
            .chain(self.subject_files.iter().map(PathBuf::as_path))
            .chain([self.subject_summary.as_path(), self.overall.as_path()])
    }
}

/// Write the result table and every API report for one grade under `dir`.
///
/// Layout:
/// - `<grade>_result.csv`
/// - `subject_api/API_<subject>.csv`, one per catalog subject
/// - `subject_api/Subject_Wise_API_Summary.csv`
/// - `overall_api.csv`
///
/// Each file is replaced atomically, so an interrupted run never leaves a
/// half-written report behind.
pub fn write_all_reports(
    dir: &Path,
    grade: GradeLevel,
    table: &AggregatedTable,
    summary: &ApiSummary,
) -> Result<WrittenReports, ReportError> {
    let result_table = dir.join(grade.result_file_name());
    write_atomic(&result_table, &result_table_csv(table)?)?;

    let subject_dir = dir.join(SUBJECT_DIR);
    let mut subject_files = Vec::with_capacity(summary.subjects.len());
    for report in &summary.subjects {
        let path = subject_dir.join(subject_file_name(report.title()));
        write_atomic(&path, &distribution_csv(report)?)?;
        subject_files.push(path);
    }

    let subject_summary = subject_dir.join(SUMMARY_FILE);
    write_atomic(&subject_summary, &subject_summary_csv(&summary.subjects)?)?;

    let overall = dir.join(OVERALL_FILE);
    write_atomic(&overall, &distribution_csv(&summary.overall)?)?;

    tracing::info!(
        dir = %dir.display(),
        %grade,
        students = table.len(),
        subjects = subject_files.len(),
        "wrote reports"
    );

    Ok(WrittenReports {
        result_table,
        subject_files,
        subject_summary,
        overall,
    })
}

/// Finish an in-memory CSV writer into its bytes.
pub(crate) fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ReportError> {
    writer.into_inner().map_err(|e| ReportError::Io {
        path: PathBuf::from("<memory>"),
        source: e.into_error(),
    })
}

/// CSV writer over a buffer with `\n` line endings.
///
/// `flexible` allows the short trailer lines of the distribution reports.
pub(crate) fn csv_buffer(flexible: bool) -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .flexible(flexible)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}
