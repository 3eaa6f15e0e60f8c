//! Integration tests for JSONL storage.

use jsparse_bench::core::env::EnvironmentInfo;
use jsparse_bench::core::schema::{BenchRecord, CompilerInfo, RunConfig, TimingStat};
use jsparse_bench::pipeline::{LanguageMode, Mode};
use jsparse_bench::storage::JsonlWriter;

fn make_test_record(mode: Mode, fixture: &str) -> BenchRecord {
    BenchRecord::new(
        mode,
        fixture.to_string(),
        EnvironmentInfo::default(),
        CompilerInfo {
            name: "closure".to_string(),
            version: Some("v20240317".to_string()),
        },
        RunConfig::default(),
    )
}

#[test]
fn test_write_and_read_multiple_records() {
    let dir = tempfile::tempdir().unwrap();
    let writer = JsonlWriter::new(dir.path().join("bench.jsonl"));

    let record1 = make_test_record(Mode::Legacy, "a.js");
    let record2 = make_test_record(Mode::ModernToLegacy, "b.js");
    let record3 = make_test_record(Mode::Legacy, "c.js");

    writer.append(&record1).expect("failed to append record 1");
    writer.append(&record2).expect("failed to append record 2");
    writer.append(&record3).expect("failed to append record 3");

    let records = writer.read_all().expect("failed to read records");

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].fixture_name, "a.js");
    assert_eq!(records[1].fixture_name, "b.js");
    assert_eq!(records[2].fixture_name, "c.js");
    assert_eq!(records[1].record_id, record2.record_id);

    assert_eq!(records[0].compiler.name, "closure");
    assert_eq!(records[0].compiler.version, Some("v20240317".to_string()));
    assert_eq!(records[1].language_in, LanguageMode::Ecmascript6);
    assert_eq!(records[1].language_out, Some(LanguageMode::Ecmascript5));
    assert_eq!(records[0].language_out, None);
}

#[test]
fn test_append_does_not_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("append_test.jsonl");

    JsonlWriter::new(&path)
        .append(&make_test_record(Mode::Legacy, "first.js"))
        .unwrap();

    let reopened = JsonlWriter::new(&path);
    reopened
        .append(&make_test_record(Mode::Legacy, "second.js"))
        .unwrap();

    assert_eq!(reopened.count().unwrap(), 2);
    let records = reopened.read_all().unwrap();
    assert_eq!(records[0].fixture_name, "first.js");
    assert_eq!(records[1].fixture_name, "second.js");
}

#[test]
fn test_read_filtered_by_mode() {
    let dir = tempfile::tempdir().unwrap();
    let writer = JsonlWriter::new(dir.path().join("filtered.jsonl"));

    writer.append(&make_test_record(Mode::Legacy, "x.js")).unwrap();
    writer.append(&make_test_record(Mode::ModernToLegacy, "x.js")).unwrap();
    writer.append(&make_test_record(Mode::Legacy, "x.js")).unwrap();

    let legacy = writer.read_filtered(Some(Mode::Legacy)).unwrap();
    assert_eq!(legacy.len(), 2);
    assert!(legacy.iter().all(|r| r.mode == Mode::Legacy && r.input_name == "js5script.js"));

    let modern = writer.read_filtered(Some(Mode::ModernToLegacy)).unwrap();
    assert_eq!(modern.len(), 1);
    assert_eq!(modern[0].input_name, "es6script.js");

    assert_eq!(writer.read_filtered(None).unwrap().len(), 3);
}

#[test]
fn test_read_nonexistent_file_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let writer = JsonlWriter::new(dir.path().join("does_not_exist.jsonl"));

    let result = writer.read_all();
    assert!(result.unwrap_err().to_string().contains("file not found"));
}

#[test]
fn test_count_creates_nested_file_on_append() {
    let dir = tempfile::tempdir().unwrap();
    let writer = JsonlWriter::new(dir.path().join("nested/count_test.jsonl"));

    assert!(!writer.path().exists());
    assert_eq!(writer.count().unwrap(), 0);

    writer.append(&make_test_record(Mode::Legacy, "one.js")).unwrap();
    writer.append(&make_test_record(Mode::Legacy, "two.js")).unwrap();

    assert!(writer.path().exists());
    assert_eq!(writer.count().unwrap(), 2);
}

#[test]
fn test_record_preserves_optional_fields() {
    let dir = tempfile::tempdir().unwrap();
    let writer = JsonlWriter::new(dir.path().join("optional_fields.jsonl"));

    let mut record = make_test_record(Mode::ModernToLegacy, "less.js");
    record.fixture_sha256 = Some("ab".repeat(32));
    record.fixture_bytes = Some(123_456);
    record.externs = vec!["es3.js".into(), "es5.js".into(), "es6.js".into()];
    record.compile_stats = Some(TimingStat::from_samples(&[10.0, 20.0, 30.0]));
    record.warning_count = 4;
    record.peak_rss_mb = Some(512.5);

    writer.append(&record).unwrap();

    let loaded = &writer.read_all().unwrap()[0];
    assert_eq!(loaded.fixture_sha256, record.fixture_sha256);
    assert_eq!(loaded.fixture_bytes, Some(123_456));
    assert_eq!(loaded.externs, vec!["es3.js", "es5.js", "es6.js"]);
    assert_eq!(loaded.compile_stats.as_ref().unwrap().iterations, 3);
    assert_eq!(loaded.warning_count, 4);
    assert_eq!(loaded.peak_rss_mb, Some(512.5));
}
