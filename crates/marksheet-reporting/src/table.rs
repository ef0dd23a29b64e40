//! The per-student result table (`10th_result.csv` / `12th_result.csv`).
//!
//! Columns are the identity fields, one column per catalog subject code in
//! catalog order, then `best_of_5` and `percentage`. Absent marks are empty
//! cells.

use std::path::Path;

use marksheet_core::{AggregatedTable, Mark, StudentRecord};

use crate::{ReportError, csv_buffer, finish};

const IDENTITY_COLUMNS: [&str; 7] = [
    "roll_number",
    "name",
    "mother_name",
    "father_name",
    "school",
    "division",
    "result",
];
const BEST_OF_5_COLUMN: &str = "best_of_5";
const PERCENTAGE_COLUMN: &str = "percentage";

/// Serialize `table` as CSV.
pub fn result_table_csv(table: &AggregatedTable) -> Result<Vec<u8>, ReportError> {
    let codes: Vec<&str> = table.catalog().codes().collect();
    let mut writer = csv_buffer(false);

    let header = IDENTITY_COLUMNS
        .iter()
        .copied()
        .chain(codes.iter().copied())
        .chain([BEST_OF_5_COLUMN, PERCENTAGE_COLUMN]);
    writer.write_record(header)?;

    for student in table.students() {
        let r = &student.record;
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        let mut row = vec![
            r.roll_number.clone(),
            r.name.clone(),
            opt(&r.mother_name),
            opt(&r.father_name),
            opt(&r.school),
            opt(&r.division),
            opt(&r.result),
        ];
        row.extend(
            codes
                .iter()
                .map(|code| r.mark(code).map(|m| m.to_string()).unwrap_or_default()),
        );
        row.push(student.best_of_5.to_string());
        row.push(format!("{:.2}", student.percentage));
        writer.write_record(&row)?;
    }

    finish(writer)
}

/// Read a result table back into student records.
///
/// Identity columns are matched by name; every other column except
/// `best_of_5` and `percentage` is taken as a subject code. Derived columns
/// are ignored since they are recomputed on aggregation.
pub fn read_result_table(path: &Path) -> Result<Vec<StudentRecord>, ReportError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let mut record = StudentRecord::default();

        for (column, value) in headers.iter().zip(row.iter()) {
            let some = || Some(value.to_string()).filter(|v| !v.is_empty());
            match column {
                "roll_number" => record.roll_number = value.to_string(),
                "name" => record.name = value.to_string(),
                "mother_name" => record.mother_name = some(),
                "father_name" => record.father_name = some(),
                "school" => record.school = some(),
                "division" => record.division = some(),
                "result" => record.result = some(),
                BEST_OF_5_COLUMN | PERCENTAGE_COLUMN => {}
                _ if value.is_empty() => {}
                code => {
                    let mark: Mark = value.parse().map_err(|_| ReportError::Malformed {
                        path: path.to_path_buf(),
                        line,
                        message: format!("invalid mark {value:?} for subject {code}"),
                    })?;
                    if !record.record_mark(code, mark) {
                        return Err(ReportError::Malformed {
                            path: path.to_path_buf(),
                            line,
                            message: format!("mark {mark} for subject {code} is out of range"),
                        });
                    }
                }
            }
        }
        records.push(record);
    }
    Ok(records)
}
