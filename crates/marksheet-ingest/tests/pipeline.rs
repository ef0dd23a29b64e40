use std::io::Write;
use std::path::{Path, PathBuf};

use marksheet_core::{AggregationKey, ApiValue, GradeLevel};
use marksheet_ingest::{DocumentStatus, IngestError, Pipeline, PipelineConfig};

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn class10(key: AggregationKey) -> Pipeline {
    Pipeline::new(PipelineConfig::for_grade(GradeLevel::Class10).with_key(key), None).unwrap()
}

#[test]
fn test_same_student_in_two_documents_keeps_maximum() {
    let dir = tempfile::tempdir().unwrap();
    let first = write(
        dir.path(),
        "section_a.txt",
        "Roll No: 1234567\nCandidate Name: A B\n184 ENGLISH 080 B1\n",
    );
    let second = write(
        dir.path(),
        "section_b.txt",
        "Roll No: 1234567\nCandidate Name: A B\n184 ENGLISH 085 A2\n",
    );

    let run = class10(AggregationKey::RollNumber)
        .run(&[first, second], &mut |_| {})
        .unwrap();
    assert_eq!(run.table.len(), 1);
    assert_eq!(run.table.students()[0].record.mark("184"), Some(85));
    assert_eq!(run.summary.subject("184").unwrap().total, 1);
}

#[test]
fn test_name_key_merges_across_roll_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let first = write(
        dir.path(),
        "a.txt",
        "Roll No: 1\nCandidate Name: A B\n184 ENGLISH 080 B1\n",
    );
    let second = write(
        dir.path(),
        "b.txt",
        "Roll No: 2\nCandidate Name: a  b\n184 ENGLISH 085 A2\n",
    );

    let by_roll = class10(AggregationKey::RollNumber)
        .run(&[first.clone(), second.clone()], &mut |_| {})
        .unwrap();
    assert_eq!(by_roll.table.len(), 2);

    let by_name = class10(AggregationKey::Name)
        .run(&[first, second], &mut |_| {})
        .unwrap();
    assert_eq!(by_name.table.len(), 1);
    assert_eq!(by_name.table.students()[0].record.mark("184"), Some(85));
}

#[test]
fn test_block_without_marks_never_reaches_the_table() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write(
        dir.path(),
        "sheet.txt",
        "Roll No: 1234567\nCandidate Name: A B\nRoll No: 7654321\nCandidate Name: C D\n184 ENGLISH 092 A1\n",
    );

    let mut outcomes = Vec::new();
    let run = class10(AggregationKey::RollNumber)
        .run(&[doc], &mut |o| outcomes.push(o.clone()))
        .unwrap();

    assert_eq!(run.table.len(), 1);
    assert_eq!(run.table.students()[0].record.roll_number, "7654321");
    match &outcomes[0].status {
        DocumentStatus::Parsed { students, skipped } => {
            assert_eq!(*students, 1);
            assert_eq!(skipped.total_blocks, 2);
            assert_eq!(skipped.no_marks, 1);
        }
        other => panic!("unexpected status {other:?}"),
    }
}

#[test]
fn test_zip_bundle_documents_are_processed() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("sections.zip");
    {
        let file = std::fs::File::create(&bundle).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("x/one.txt", options).unwrap();
        writer
            .write_all(b"Roll No: 1\nCandidate Name: A B\n184 ENGLISH 096 A1\n")
            .unwrap();
        writer.start_file("x/two.txt", options).unwrap();
        writer
            .write_all(b"Roll No: 2\nCandidate Name: C D\n184 ENGLISH 0 E\n")
            .unwrap();
        writer.finish().unwrap();
    }

    let run = class10(AggregationKey::RollNumber)
        .run(&[dir.path().to_path_buf()], &mut |_| {})
        .unwrap();
    assert_eq!(run.batch.outcomes.len(), 2);
    assert!(run.batch.outcomes[0].label.ends_with("[x/one.txt]"));
    let eng = run.summary.subject("184").unwrap();
    assert_eq!(eng.total, 2);
    // (10 - 3) / 2 × 100
    assert_eq!(eng.api, ApiValue::Value(350.0));
}

#[test]
fn test_only_failures_is_nothing_processed() {
    let dir = tempfile::tempdir().unwrap();
    let fake = write(dir.path(), "scan.pdf", "not really a pdf");
    let mut failures = 0;
    let err = class10(AggregationKey::RollNumber)
        .run(&[fake], &mut |o| failures += usize::from(o.is_failure()))
        .unwrap_err();
    assert!(matches!(err, IngestError::NothingProcessed));
    assert_eq!(failures, 1);
}
