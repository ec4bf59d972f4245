use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tempfile::tempdir;

use super::{AnomalyRow, Destination, LakeWriter, RetryPolicy, WriteError};
use crate::logic::fixtures::record;

fn fast_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy {
        attempts,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    }
}

fn writer_in(root: &Path) -> LakeWriter {
    LakeWriter::new(root.join("events"), root.join("anomalies"), fast_retry(3))
}

fn read_rows(path: &Path) -> usize {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path).unwrap())
        .unwrap()
        .build()
        .unwrap();
    reader.map(|b| b.unwrap().num_rows()).sum()
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    files
}

#[test]
fn test_write_events_round_trip() {
    let dir = tempdir().unwrap();
    let writer = writer_in(dir.path());
    let flushed_at = Utc.with_ymd_and_hms(2025, 1, 1, 12, 30, 15).unwrap();
    let records = vec![record("a", [1.0; 5]), record("b", [2.0; 5]), record("c", [3.0; 5])];

    let path = writer.write_events(&records, flushed_at).unwrap().expect("file written");

    assert_eq!(
        path.parent().unwrap(),
        dir.path().join("events").join("dt=2025-01-01T12-30")
    );
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("part-") && name.ends_with(".parquet"));
    assert_eq!(read_rows(&path), 3);
}

#[test]
fn test_empty_record_set_writes_nothing() {
    let dir = tempdir().unwrap();
    let writer = writer_in(dir.path());

    assert!(writer.write_events(&[], Utc::now()).unwrap().is_none());
    assert!(writer.write_anomalies(&[], Utc::now()).unwrap().is_none());
    assert!(!dir.path().join("events").exists());
    assert!(!dir.path().join("anomalies").exists());
}

#[test]
fn test_same_minute_flushes_never_collide() {
    let dir = tempdir().unwrap();
    let writer = writer_in(dir.path());
    let flushed_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 1).unwrap();
    let records = vec![record("a", [1.0; 5])];

    let first = writer.write_events(&records, flushed_at).unwrap().unwrap();
    let second = writer
        .write_events(&records, flushed_at + chrono::Duration::seconds(30))
        .unwrap()
        .unwrap();

    assert_ne!(first, second);
    assert_eq!(first.parent(), second.parent());
    let files = files_in(first.parent().unwrap());
    assert_eq!(files.len(), 2);
    assert_eq!(read_rows(&first), 1);
    assert_eq!(read_rows(&second), 1);
}

#[test]
fn test_no_staging_files_left_behind() {
    let dir = tempdir().unwrap();
    let writer = writer_in(dir.path());
    let path = writer
        .write_events(&[record("a", [1.0; 5])], Utc::now())
        .unwrap()
        .unwrap();

    for file in files_in(path.parent().unwrap()) {
        let name = file.file_name().unwrap().to_str().unwrap().to_string();
        assert!(!name.ends_with(".tmp"), "staging file left: {}", name);
    }
}

#[test]
fn test_anomalies_go_to_their_own_root() {
    let dir = tempdir().unwrap();
    let writer = writer_in(dir.path());
    let records = vec![record("a", [1.0; 5])];
    let rows = vec![AnomalyRow {
        record: &records[0],
        score: 7.0,
        is_anomaly: true,
    }];

    let path = writer.write_anomalies(&rows, Utc::now()).unwrap().unwrap();

    assert!(path.starts_with(writer.root(Destination::Anomalies)));
    assert_eq!(read_rows(&path), 1);
}

#[test]
fn test_write_failure_is_retried_then_surfaced() {
    let dir = tempdir().unwrap();
    // A regular file where the events root should be makes every attempt fail
    let blocked = dir.path().join("events");
    fs::write(&blocked, b"not a directory").unwrap();
    let writer = writer_in(dir.path());

    let err = writer
        .write_events(&[record("a", [1.0; 5])], Utc::now())
        .unwrap_err();

    match err {
        WriteError::Exhausted {
            destination,
            attempts,
            ..
        } => {
            assert_eq!(destination, Destination::Events);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected exhausted retries, got {}", other),
    }
}
