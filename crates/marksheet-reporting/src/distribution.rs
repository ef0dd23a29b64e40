//! Grade distribution reports: one file per subject, the cross-subject
//! summary and the pooled overall distribution.

use marksheet_core::{DistributionReport, ReportScope};

use crate::{ReportError, csv_buffer, finish};

/// Directory (under the output directory) holding per-subject reports.
pub const SUBJECT_DIR: &str = "subject_api";
pub const SUMMARY_FILE: &str = "Subject_Wise_API_Summary.csv";
pub const OVERALL_FILE: &str = "overall_api.csv";

const DISTRIBUTION_HEADER: [&str; 4] = ["Range", "Points to be Awarded", "no of students", "POINTS"];

/// `API_<subject>.csv`, with path separators in the name replaced.
pub fn subject_file_name(subject: &str) -> String {
    let safe: String = subject
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("API_{safe}.csv")
}

/// One row per rubric band, a `Total` row, then two trailer lines: the API
/// and the number of marks it was computed over.
pub fn distribution_csv(report: &DistributionReport) -> Result<Vec<u8>, ReportError> {
    let mut writer = csv_buffer(true);
    writer.write_record(DISTRIBUTION_HEADER)?;

    for band in &report.bands {
        writer.write_record([
            band.label.clone(),
            band.points.to_string(),
            band.count.to_string(),
            band.points_total().to_string(),
        ])?;
    }
    writer.write_record([
        "Total".to_string(),
        String::new(),
        report.total.to_string(),
        report.total_points.to_string(),
    ])?;

    let api_label = match &report.scope {
        ReportScope::Subject(subject) => format!("API- {}", subject.name),
        ReportScope::Overall => "OVERALL API".to_string(),
    };
    writer.write_record([api_label, report.api.to_string()])?;
    writer.write_record(["Total Students".to_string(), report.total.to_string()])?;

    finish(writer)
}

/// One row per subject: counts, band counts under the rubric's short column
/// headings, and the API.
pub fn subject_summary_csv(reports: &[DistributionReport]) -> Result<Vec<u8>, ReportError> {
    let mut writer = csv_buffer(false);

    let mut header = vec![
        "SNO".to_string(),
        "Subject".to_string(),
        "Total Students".to_string(),
        "No of students appeared".to_string(),
        "No of students pass".to_string(),
    ];
    if let Some(first) = reports.first() {
        header.extend(first.bands.iter().map(|b| b.column.clone()));
    }
    header.push("API".to_string());
    writer.write_record(&header)?;

    for (i, report) in reports.iter().enumerate() {
        let mut row = vec![
            (i + 1).to_string(),
            report.title().to_string(),
            report.total.to_string(),
            report.appeared.to_string(),
            report.passed.to_string(),
        ];
        row.extend(report.bands.iter().map(|b| b.count.to_string()));
        row.push(report.api.to_string());
        writer.write_record(&row)?;
    }

    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marksheet_core::{GradeRubric, Subject, score_column};

    fn english(marks: &[u32]) -> DistributionReport {
        score_column(
            marks,
            &GradeRubric::standard(),
            ReportScope::Subject(Subject::new("184", "ENGLISH", &[])),
        )
    }

    #[test]
    fn test_subject_distribution_file() {
        let csv = String::from_utf8(distribution_csv(&english(&[100, 92, 70, 33, 0])).unwrap()).unwrap();
        let expected = "\
Range,Points to be Awarded,no of students,POINTS
>95,10,1,10
90-94.99,8,1,8
80-89.9,6,0,0
70-79.9,4,1,4
60-69.9,2,0,0
50-59.99,0,0,0
33-49.99,-1,1,-1
Compartment,-2,0,0
Fail,-3,1,-3
Total,,5,18
API- ENGLISH,360.0
Total Students,5
";
        assert_eq!(csv, expected);
    }

    #[test]
    fn test_empty_subject_is_undefined() {
        let csv = String::from_utf8(distribution_csv(&english(&[])).unwrap()).unwrap();
        assert!(csv.contains("API- ENGLISH,#DIV/0!\n"));
        assert!(csv.ends_with("Total Students,0\n"));
    }

    #[test]
    fn test_overall_trailer() {
        let report = score_column(&[96, 0], &GradeRubric::standard(), ReportScope::Overall);
        let csv = String::from_utf8(distribution_csv(&report).unwrap()).unwrap();
        assert!(csv.contains("OVERALL API,350.0\n"));
    }

    #[test]
    fn test_summary_rows() {
        let hindi = score_column(
            &[],
            &GradeRubric::standard(),
            ReportScope::Subject(Subject::new("085", "HINDI", &[])),
        );
        let csv =
            String::from_utf8(subject_summary_csv(&[english(&[100, 92, 70, 33, 0]), hindi]).unwrap())
                .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "SNO,Subject,Total Students,No of students appeared,No of students pass,\
             >95,>90,>80,>70,>60,>50,>33,Compartment,Fail,API"
        );
        assert_eq!(lines[1], "1,ENGLISH,5,5,4,1,1,0,1,0,0,1,0,1,360.0");
        assert_eq!(lines[2], "2,HINDI,0,0,0,0,0,0,0,0,0,0,0,0,#DIV/0!");
    }

    #[test]
    fn test_subject_file_name() {
        assert_eq!(subject_file_name("ENGLISH"), "API_ENGLISH.csv");
        assert_eq!(subject_file_name("ART/CRAFT"), "API_ART_CRAFT.csv");
    }
}
