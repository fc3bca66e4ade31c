use std::collections::BTreeMap;

use airsnap_core::RawRecord;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::value::{decode_fields, DecodeError, FirestoreValue};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FirestoreValue>,
    pub create_time: Option<String>,
    pub update_time: Option<String>,
}

impl Document {
    /// Last path segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn into_record(self) -> Result<RawRecord, DecodeError> {
        let id = self.id().to_string();
        Ok(RawRecord {
            id,
            fields: decode_fields(self.fields)?,
        })
    }
}

/// One element of the streamed `runQuery` response. Elements without a document only carry
/// progress information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryItem {
    pub document: Option<Document>,
    pub read_time: Option<String>,
    pub skipped_results: Option<i64>,
}

/// Every document in `collection`, ascending by `order_by`.
pub fn run_query_body(collection: &str, order_by: &str) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection }],
            "orderBy": [{
                "field": { "fieldPath": quote_field_path(order_by) },
                "direction": "ASCENDING"
            }]
        }
    })
}

/// Field names outside `[A-Za-z_][A-Za-z0-9_]*` must be backtick-quoted in a field path.
pub fn quote_field_path(field: &str) -> String {
    let mut chars = field.chars();
    let simple = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        field.to_string()
    } else {
        let escaped = field.replace('\\', "\\\\").replace('`', "\\`");
        format!("`{escaped}`")
    }
}

/// Decodes a full `runQuery` response body, keeping document order.
pub fn records_from_response(body: &[u8]) -> Result<Vec<RawRecord>, String> {
    let items: Vec<RunQueryItem> =
        serde_json::from_slice(body).map_err(|err| format!("malformed runQuery response: {err}"))?;

    items
        .into_iter()
        .filter_map(|item| item.document)
        .map(|document| {
            let name = document.name.clone();
            document
                .into_record()
                .map_err(|err| format!("document {name}: {err}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use airsnap_core::RawValue;

    #[test]
    fn query_orders_ascending_on_timestamp() {
        let body = run_query_body("air_quality_raw", "Timestamp");
        assert_eq!(
            body["structuredQuery"]["from"][0]["collectionId"],
            "air_quality_raw"
        );
        assert_eq!(
            body["structuredQuery"]["orderBy"][0]["field"]["fieldPath"],
            "Timestamp"
        );
        assert_eq!(
            body["structuredQuery"]["orderBy"][0]["direction"],
            "ASCENDING"
        );
    }

    #[test]
    fn quotes_non_identifier_field_paths() {
        assert_eq!(quote_field_path("Timestamp"), "Timestamp");
        assert_eq!(quote_field_path("_ts2"), "_ts2");
        assert_eq!(quote_field_path("25"), "`25`");
        assert_eq!(quote_field_path("read at"), "`read at`");
        assert_eq!(quote_field_path("a`b"), "`a\\`b`");
    }

    #[test]
    fn skips_progress_only_items_and_keeps_order() {
        let body = br#"[
            {"readTime": "2024-01-01T00:00:00Z"},
            {"document": {"name": "projects/p/databases/(default)/documents/air_quality_raw/z",
                          "fields": {"Timestamp": {"stringValue": "2024-01-01 00:00:00 UTC"}}},
             "readTime": "2024-01-01T00:00:00Z"},
            {"document": {"name": "projects/p/databases/(default)/documents/air_quality_raw/a"},
             "readTime": "2024-01-01T00:00:00Z"}
        ]"#;

        let records = records_from_response(body).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a"]);
        assert_eq!(
            records[0].fields.get("Timestamp"),
            Some(&RawValue::from("2024-01-01 00:00:00 UTC"))
        );
        assert!(records[1].fields.is_empty());
    }

    #[test]
    fn undecodable_document_names_the_document() {
        let body = br#"[{"document": {"name": "c/doc-9", "fields": {"n": {"integerValue": "1.5"}}}}]"#;
        let err = records_from_response(body).unwrap_err();
        assert!(err.contains("c/doc-9"), "{err}");
    }
}
