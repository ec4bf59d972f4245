use serde::Serialize;

/// Running counters for one processor run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessorStats {
    pub records_read: u64,
    pub malformed_lines: u64,
    pub read_errors: u64,
    pub flushes: u64,
    pub rows_written: u64,
    pub anomalies_written: u64,
    pub model_fallbacks: u64,
}

impl std::fmt::Display for ProcessorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "read={} malformed={} read_errors={} flushes={} rows={} anomalies={} fallbacks={}",
            self.records_read,
            self.malformed_lines,
            self.read_errors,
            self.flushes,
            self.rows_written,
            self.anomalies_written,
            self.model_fallbacks
        )
    }
}
