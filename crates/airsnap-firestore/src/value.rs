//! Firestore REST value encoding -> [`RawValue`].
//!
//! Every field value arrives as a single-key object naming its type, e.g.
//! `{"integerValue": "12"}` or `{"mapValue": {"fields": {...}}}`.

use std::collections::BTreeMap;

use airsnap_core::{RawMap, RawValue};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("field `{path}`: invalid integer {value:?}")]
    Integer { path: String, value: String },
    #[error("field `{path}`: invalid double {value:?}")]
    Double { path: String, value: String },
    #[error("field `{path}`: invalid timestamp {value:?}: {source}")]
    Timestamp {
        path: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("field `{path}`: invalid base64 bytes: {source}")]
    Bytes {
        path: String,
        #[source]
        source: base64::DecodeError,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FirestoreValue {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(IntegerRepr),
    DoubleValue(DoubleRepr),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(serde_json::Value),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

/// int64 travels as a JSON string; some emulators send a bare number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IntegerRepr {
    Number(i64),
    Text(String),
}

/// Non-finite doubles travel as `"NaN"`, `"Infinity"` or `"-Infinity"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DoubleRepr {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<FirestoreValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, FirestoreValue>,
}

pub fn decode_fields(
    fields: BTreeMap<String, FirestoreValue>,
) -> Result<RawMap, DecodeError> {
    decode_map(fields, "")
}

fn decode_map(
    fields: BTreeMap<String, FirestoreValue>,
    parent: &str,
) -> Result<RawMap, DecodeError> {
    fields
        .into_iter()
        .map(|(name, value)| {
            let path = if parent.is_empty() {
                name.clone()
            } else {
                format!("{parent}.{name}")
            };
            decode_value(value, &path).map(|decoded| (name, decoded))
        })
        .collect()
}

pub fn decode_value(value: FirestoreValue, path: &str) -> Result<RawValue, DecodeError> {
    let decoded = match value {
        FirestoreValue::NullValue(()) => RawValue::Null,
        FirestoreValue::BooleanValue(flag) => RawValue::Boolean(flag),
        FirestoreValue::IntegerValue(IntegerRepr::Number(number)) => RawValue::Integer(number),
        FirestoreValue::IntegerValue(IntegerRepr::Text(text)) => {
            let number = text.parse().map_err(|_| DecodeError::Integer {
                path: path.to_string(),
                value: text.clone(),
            })?;
            RawValue::Integer(number)
        }
        FirestoreValue::DoubleValue(DoubleRepr::Number(number)) => RawValue::Float(number),
        FirestoreValue::DoubleValue(DoubleRepr::Text(text)) => {
            let number = match text.as_str() {
                "NaN" => f64::NAN,
                "Infinity" => f64::INFINITY,
                "-Infinity" => f64::NEG_INFINITY,
                other => other.parse().map_err(|_| DecodeError::Double {
                    path: path.to_string(),
                    value: text.clone(),
                })?,
            };
            RawValue::Float(number)
        }
        FirestoreValue::TimestampValue(text) => {
            let parsed = DateTime::parse_from_rfc3339(&text).map_err(|source| {
                DecodeError::Timestamp {
                    path: path.to_string(),
                    value: text.clone(),
                    source,
                }
            })?;
            RawValue::Timestamp(parsed.with_timezone(&Utc))
        }
        FirestoreValue::StringValue(text) => RawValue::String(text),
        FirestoreValue::BytesValue(encoded) => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map_err(|source| DecodeError::Bytes {
                    path: path.to_string(),
                    source,
                })?;
            RawValue::Bytes(bytes)
        }
        FirestoreValue::ReferenceValue(_) => RawValue::Other("reference"),
        FirestoreValue::GeoPointValue(_) => RawValue::Other("geo_point"),
        FirestoreValue::ArrayValue(array) => RawValue::Array(
            array
                .values
                .into_iter()
                .enumerate()
                .map(|(index, item)| decode_value(item, &format!("{path}[{index}]")))
                .collect::<Result<_, _>>()?,
        ),
        FirestoreValue::MapValue(map) => RawValue::Map(decode_map(map.fields, path)?),
    };
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn decode(json: serde_json::Value) -> Result<RawValue, DecodeError> {
        let value: FirestoreValue = serde_json::from_value(json).expect("valid firestore value");
        decode_value(value, "f")
    }

    #[test]
    fn decodes_scalars() {
        assert_eq!(decode(json!({"nullValue": null})).unwrap(), RawValue::Null);
        assert_eq!(
            decode(json!({"booleanValue": true})).unwrap(),
            RawValue::Boolean(true)
        );
        assert_eq!(
            decode(json!({"integerValue": "12"})).unwrap(),
            RawValue::Integer(12)
        );
        assert_eq!(
            decode(json!({"integerValue": 12})).unwrap(),
            RawValue::Integer(12)
        );
        assert_eq!(
            decode(json!({"doubleValue": 8.5})).unwrap(),
            RawValue::Float(8.5)
        );
        assert_eq!(
            decode(json!({"stringValue": "bad"})).unwrap(),
            RawValue::from("bad")
        );
        assert_eq!(
            decode(json!({"bytesValue": "aGk="})).unwrap(),
            RawValue::Bytes(b"hi".to_vec())
        );
    }

    #[test]
    fn decodes_timestamps_to_utc() {
        let value = decode(json!({"timestampValue": "2024-01-01T07:00:00+07:00"})).unwrap();
        assert_eq!(
            value,
            RawValue::Timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn decodes_non_finite_doubles() {
        let RawValue::Float(nan) = decode(json!({"doubleValue": "NaN"})).unwrap() else {
            panic!("expected float");
        };
        assert!(nan.is_nan());
        assert_eq!(
            decode(json!({"doubleValue": "-Infinity"})).unwrap(),
            RawValue::Float(f64::NEG_INFINITY)
        );
    }

    #[test]
    fn decodes_nested_maps_and_arrays() {
        let value = decode(json!({
            "mapValue": {"fields": {
                "PPM": {"mapValue": {"fields": {
                    "25": {"integerValue": "12"},
                    "10": {"stringValue": "bad"}
                }}},
                "tags": {"arrayValue": {"values": [{"stringValue": "x"}]}},
                "empty": {"mapValue": {}}
            }}
        }))
        .unwrap();

        let expected = RawValue::map([
            (
                "PPM",
                RawValue::map([("25", RawValue::from(12)), ("10", RawValue::from("bad"))]),
            ),
            ("tags", RawValue::Array(vec![RawValue::from("x")])),
            ("empty", RawValue::map(Vec::<(String, RawValue)>::new())),
        ]);
        assert_eq!(value, expected);
    }

    #[test]
    fn opaque_kinds_keep_their_name() {
        assert_eq!(
            decode(json!({"referenceValue": "projects/p/databases/(default)/documents/c/d"}))
                .unwrap()
                .kind(),
            "reference"
        );
        assert_eq!(
            decode(json!({"geoPointValue": {"latitude": 13.7, "longitude": 100.5}}))
                .unwrap()
                .kind(),
            "geo_point"
        );
    }

    #[test]
    fn bad_nested_integer_reports_its_path() {
        let err = decode(json!({
            "mapValue": {"fields": {"PPM": {"mapValue": {"fields": {"25": {"integerValue": "x"}}}}}}
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "field `f.PPM.25`: invalid integer \"x\"");
    }
}
