//! Arrow schemas and record encoding for both destinations

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

use crate::logic::record::Record;

/// One flagged record with its batch-local score
#[derive(Debug, Clone, Copy)]
pub struct AnomalyRow<'a> {
    pub record: &'a Record,
    pub score: f64,
    pub is_anomaly: bool,
}

fn record_fields() -> Vec<Field> {
    vec![
        Field::new(
            "ts",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("user_id", DataType::Utf8, false),
        Field::new("metric1", DataType::Float64, false),
        Field::new("metric2", DataType::Float64, false),
        Field::new("metric3", DataType::Float64, false),
        Field::new("feature_a", DataType::Float64, false),
        Field::new("feature_b", DataType::Float64, false),
        Field::new("tag", DataType::Utf8, true),
    ]
}

pub fn events_schema() -> SchemaRef {
    Arc::new(Schema::new(record_fields()))
}

pub fn anomalies_schema() -> SchemaRef {
    let mut fields = record_fields();
    fields.push(Field::new("score", DataType::Float64, false));
    fields.push(Field::new("is_anomaly", DataType::Boolean, false));
    Arc::new(Schema::new(fields))
}

fn record_columns<'a, I>(records: I) -> Vec<ArrayRef>
where
    I: Iterator<Item = &'a Record> + Clone,
{
    let ts: Vec<i64> = records.clone().map(|r| r.ts.timestamp_micros()).collect();
    let users: Vec<&str> = records.clone().map(|r| r.user_id.as_str()).collect();
    let metric1: Vec<f64> = records.clone().map(|r| r.metric1).collect();
    let metric2: Vec<f64> = records.clone().map(|r| r.metric2).collect();
    let metric3: Vec<f64> = records.clone().map(|r| r.metric3).collect();
    let feature_a: Vec<f64> = records.clone().map(|r| r.feature_a).collect();
    let feature_b: Vec<f64> = records.clone().map(|r| r.feature_b).collect();
    let tags: Vec<Option<&str>> = records.map(|r| r.tag.as_deref()).collect();

    vec![
        Arc::new(TimestampMicrosecondArray::from(ts).with_timezone("UTC")),
        Arc::new(StringArray::from(users)),
        Arc::new(Float64Array::from(metric1)),
        Arc::new(Float64Array::from(metric2)),
        Arc::new(Float64Array::from(metric3)),
        Arc::new(Float64Array::from(feature_a)),
        Arc::new(Float64Array::from(feature_b)),
        Arc::new(StringArray::from(tags)),
    ]
}

/// All-records batch
pub fn encode_events(records: &[Record]) -> Result<RecordBatch, ArrowError> {
    RecordBatch::try_new(events_schema(), record_columns(records.iter()))
}

/// Anomalies batch: record columns + `score` + `is_anomaly`
pub fn encode_anomalies(rows: &[AnomalyRow<'_>]) -> Result<RecordBatch, ArrowError> {
    let mut columns = record_columns(rows.iter().map(|r| r.record));
    let scores: Vec<f64> = rows.iter().map(|r| r.score).collect();
    let flags: Vec<bool> = rows.iter().map(|r| r.is_anomaly).collect();
    columns.push(Arc::new(Float64Array::from(scores)));
    columns.push(Arc::new(BooleanArray::from(flags)));

    RecordBatch::try_new(anomalies_schema(), columns)
}
