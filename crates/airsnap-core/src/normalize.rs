//! Raw document -> [`Reading`] conversion.
//!
//! Timestamps are strict: a record without a usable timestamp is dropped. Measurement
//! containers are required, but individual measurement values are lenient and fall back to
//! `0.0`. Input order is preserved.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;

use crate::lookup::Lookup;
use crate::model::{RawMap, RawRecord, RawValue, Reading};
use crate::timestamp::{self, TimestampError};

/// Field names used to pull a reading out of a raw document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    pub timestamp_field: String,
    pub container_field: String,
    pub sub_container_field: String,
    pub pm25_key: String,
    pub pm10_key: String,
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            timestamp_field: "Timestamp".to_string(),
            container_field: "PM".to_string(),
            sub_container_field: "PPM".to_string(),
            pm25_key: "25".to_string(),
            pm10_key: "10".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerLevel {
    Outer,
    Inner,
}

impl fmt::Display for ContainerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerLevel::Outer => f.write_str("outer"),
            ContainerLevel::Inner => f.write_str("inner"),
        }
    }
}

/// Why a record produced no reading.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("timestamp field `{field}` is missing")]
    MissingTimestamp { field: String },

    #[error("failed to parse text timestamp: {0}")]
    UnparsableTimestamp(#[source] TimestampError),

    #[error("timestamp field `{field}` has unexpected type {found}")]
    UnexpectedTimestampType { field: String, found: &'static str },

    #[error("{level} measurement container `{field}` is {found}, expected a map")]
    InvalidContainer {
        level: ContainerLevel,
        field: String,
        found: &'static str,
    },
}

#[derive(Debug)]
pub struct SkippedRecord {
    pub id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct NormalizeOutcome {
    pub readings: Vec<Reading>,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordNormalizer {
    schema: RecordSchema,
}

impl RecordNormalizer {
    pub fn new(schema: RecordSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Converts every record, logging and collecting the ones that were skipped.
    pub fn normalize<I>(&self, records: I) -> NormalizeOutcome
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let mut outcome = NormalizeOutcome::default();
        for record in records {
            match self.normalize_record(&record) {
                Ok(reading) => outcome.readings.push(reading),
                Err(reason) => {
                    warn!(record_id = %record.id, reason = %reason, "skipping record");
                    outcome.skipped.push(SkippedRecord {
                        id: record.id,
                        reason,
                    });
                }
            }
        }
        outcome
    }

    pub fn normalize_record(&self, record: &RawRecord) -> Result<Reading, SkipReason> {
        let timestamp = self.extract_timestamp(&record.fields)?;
        let measurements = self.measurement_container(&record.fields)?;

        Ok(Reading {
            timestamp,
            pm25: coerce_measurement(Lookup::field(measurements, &self.schema.pm25_key)),
            pm10: coerce_measurement(Lookup::field(measurements, &self.schema.pm10_key)),
        })
    }

    fn extract_timestamp(&self, fields: &RawMap) -> Result<DateTime<Utc>, SkipReason> {
        let field = &self.schema.timestamp_field;
        match Lookup::field(fields, field) {
            Lookup::Absent | Lookup::Null => Err(SkipReason::MissingTimestamp {
                field: field.clone(),
            }),
            Lookup::Present(RawValue::Timestamp(value)) => Ok(*value),
            Lookup::Present(RawValue::String(text)) => {
                timestamp::parse_text_timestamp(text).map_err(SkipReason::UnparsableTimestamp)
            }
            Lookup::Present(other) => Err(SkipReason::UnexpectedTimestampType {
                field: field.clone(),
                found: other.kind(),
            }),
        }
    }

    fn measurement_container<'a>(&self, fields: &'a RawMap) -> Result<&'a RawMap, SkipReason> {
        let outer = Lookup::field(fields, &self.schema.container_field);
        let outer_map = outer.as_map().ok_or_else(|| SkipReason::InvalidContainer {
            level: ContainerLevel::Outer,
            field: self.schema.container_field.clone(),
            found: outer.found(),
        })?;

        let inner = Lookup::field(outer_map, &self.schema.sub_container_field);
        inner.as_map().ok_or_else(|| SkipReason::InvalidContainer {
            level: ContainerLevel::Inner,
            field: self.schema.sub_container_field.clone(),
            found: inner.found(),
        })
    }
}

/// Floats pass through, integers widen, and everything else reads as `0.0`.
pub fn coerce_measurement(value: Lookup<'_>) -> f64 {
    match value {
        Lookup::Present(RawValue::Float(value)) => *value,
        Lookup::Present(RawValue::Integer(value)) => *value as f64,
        _ => 0.0,
    }
}
