use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One-minute partition directory name for a flush at `flushed_at`
pub fn partition_key(flushed_at: DateTime<Utc>) -> String {
    format!("dt={}", flushed_at.format("%Y-%m-%dT%H-%M"))
}

/// Opaque, collision-free file name within a partition
pub fn part_file_name() -> String {
    format!("part-{}.parquet", Uuid::new_v4().simple())
}

/// Hidden sibling used while the part file is being written
pub fn staging_name(file_name: &str) -> String {
    format!(".{}.tmp", file_name)
}
