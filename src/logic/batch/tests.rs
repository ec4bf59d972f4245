use std::time::{Duration, Instant};

use super::{BatchAssembler, FlushReason};
use crate::logic::fixtures::record;

#[test]
fn test_empty_batch_never_flushes() {
    let start = Instant::now();
    let assembler = BatchAssembler::new(3, Duration::from_secs(1), start);

    assert!(assembler.flush_reason(start).is_none());
    assert!(assembler.flush_reason(start + Duration::from_secs(3600)).is_none());
}

#[test]
fn test_count_trigger_fires_at_threshold() {
    let start = Instant::now();
    let mut assembler = BatchAssembler::new(3, Duration::from_secs(60), start);

    assembler.append(record("a", [1.0; 5]));
    assembler.append(record("b", [1.0; 5]));
    assert!(!assembler.is_full());
    assert_eq!(assembler.flush_reason(start), None);

    assembler.append(record("c", [1.0; 5]));
    assert!(assembler.is_full());
    assert_eq!(assembler.flush_reason(start), Some(FlushReason::Size));
}

#[test]
fn test_idle_trigger_needs_elapsed_interval() {
    let start = Instant::now();
    let mut assembler = BatchAssembler::new(500, Duration::from_secs(3), start);
    assembler.append(record("a", [1.0; 5]));

    assert!(assembler.flush_reason(start + Duration::from_secs(2)).is_none());
    assert_eq!(
        assembler.flush_reason(start + Duration::from_secs(3)),
        Some(FlushReason::Idle)
    );
}

#[test]
fn test_drain_hands_over_in_order_and_resets() {
    let start = Instant::now();
    let mut assembler = BatchAssembler::new(10, Duration::from_secs(3), start);
    for user in ["a", "b", "c"] {
        assembler.append(record(user, [1.0; 5]));
    }

    let batch = assembler.drain(FlushReason::Idle);
    let users: Vec<_> = batch.records.iter().map(|r| r.user_id.as_str()).collect();

    assert_eq!(users, ["a", "b", "c"]);
    assert_eq!(batch.reason, FlushReason::Idle);
    assert_eq!(batch.feature_matrix().nrows(), 3);
    assert!(assembler.is_empty());

    let next = assembler.drain(FlushReason::Idle);
    assert!(next.is_empty());
}

#[test]
fn test_mark_flushed_restarts_idle_window() {
    let start = Instant::now();
    let mut assembler = BatchAssembler::new(10, Duration::from_secs(3), start);
    assembler.append(record("a", [1.0; 5]));

    let flushed_at = start + Duration::from_secs(5);
    assembler.mark_flushed(flushed_at);

    assert!(assembler.flush_reason(flushed_at + Duration::from_secs(1)).is_none());
    assert!(assembler.flush_reason(flushed_at + Duration::from_secs(3)).is_some());
}
