//! Telemetry Record - one line of the append-only log
//!
//! Wire format is a flat JSON object written by the ingest front door:
//! `{"ts": "...", "user_id": "...", "metric1": 1.0, ..., "tag": null}`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::features::FEATURE_COUNT;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Record {
    /// Event time, always normalised to UTC
    #[serde(deserialize_with = "deserialize_utc")]
    pub ts: DateTime<Utc>,

    pub user_id: String,

    // Non-negative metrics (validated upstream)
    pub metric1: f64,
    pub metric2: f64,
    pub metric3: f64,

    // Auxiliary features, zero when the producer omits them
    #[serde(default)]
    pub feature_a: f64,
    #[serde(default)]
    pub feature_b: f64,

    #[serde(default)]
    pub tag: Option<String>,
}

impl Record {
    /// Parse a single log line
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Numeric fields in `FEATURE_LAYOUT` order
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.metric1,
            self.metric2,
            self.metric3,
            self.feature_a,
            self.feature_b,
        ]
    }
}

/// Accept RFC 3339 with any offset, or a naive ISO-8601 timestamp taken as UTC.
fn deserialize_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_utc(&raw).map_err(serde::de::Error::custom)
}

pub fn parse_utc(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("timestamp {:?} is not a UTC instant", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_full_record() {
        let line = r#"{"ts":"2025-01-01T00:00:00Z","user_id":"u1","metric1":1.0,"metric2":2.0,"metric3":3.0,"feature_a":0.1,"feature_b":0.2,"tag":"web"}"#;
        let record = Record::from_json_line(line).unwrap();

        assert_eq!(record.ts, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.features(), [1.0, 2.0, 3.0, 0.1, 0.2]);
        assert_eq!(record.tag.as_deref(), Some("web"));
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let line = r#"{"ts":"2025-01-01T00:00:00+00:00","user_id":"u2","metric1":1,"metric2":1,"metric3":1}"#;
        let record = Record::from_json_line(line).unwrap();

        assert_eq!(record.feature_a, 0.0);
        assert_eq!(record.feature_b, 0.0);
        assert!(record.tag.is_none());
    }

    #[test]
    fn test_offset_and_naive_timestamps_become_utc() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_utc("2025-03-01T12:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_utc("2025-03-01T10:00:00").unwrap(), expected);
        assert_eq!(parse_utc("2025-03-01T10:00:00.000000").unwrap(), expected);
        assert!(parse_utc("yesterday").is_err());
    }

    #[test]
    fn test_malformed_lines_rejected() {
        assert!(Record::from_json_line("not json").is_err());
        assert!(Record::from_json_line(r#"{"ts":"2025-01-01T00:00:00Z","user_id":"u1"}"#).is_err());
        assert!(Record::from_json_line(r#"{"ts":"bogus","user_id":"u1","metric1":1,"metric2":1,"metric3":1}"#).is_err());
    }
}
