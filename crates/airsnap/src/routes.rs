use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::state::SnapshotRunner;

#[derive(Clone)]
pub struct AppState {
    runner: Arc<dyn SnapshotRunner>,
}

impl AppState {
    pub fn new(runner: Arc<dyn SnapshotRunner>) -> Self {
        Self { runner }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(trigger))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Attributes of the delivering event. Only used for logging.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct EventContext {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub source: Option<String>,
    pub subject: Option<String>,
}

impl EventContext {
    /// Reads binary-mode `ce-*` headers, falling back to a structured-mode JSON envelope.
    pub fn extract(headers: &HeaderMap, body: &[u8]) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        let structured = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/cloudevents+json"));
        if structured {
            return serde_json::from_slice(body).unwrap_or_default();
        }

        Self {
            id: header("ce-id"),
            event_type: header("ce-type"),
            source: header("ce-source"),
            subject: header("ce-subject"),
        }
    }
}

#[derive(Debug, Serialize)]
struct Regenerated {
    count: usize,
}

#[derive(Debug, Serialize)]
struct Failed {
    phase: String,
    error: String,
}

pub async fn trigger(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let event = EventContext::extract(&headers, &body);
    info!(
        event_id = event.id.as_deref().unwrap_or("-"),
        event_type = event.event_type.as_deref().unwrap_or("-"),
        subject = event.subject.as_deref().unwrap_or("-"),
        "received trigger event"
    );

    match state.runner.run().await {
        Ok(report) => (
            StatusCode::OK,
            Json(Regenerated {
                count: report.count(),
            }),
        )
            .into_response(),
        Err(err) => {
            error!(phase = %err.phase(), "regeneration failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Failed {
                    phase: err.phase().to_string(),
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn reads_binary_mode_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("ce-id", HeaderValue::from_static("1234"));
        headers.insert(
            "ce-type",
            HeaderValue::from_static("google.cloud.pubsub.topic.v1.messagePublished"),
        );
        headers.insert("ce-subject", HeaderValue::from_static("cron"));

        let event = EventContext::extract(&headers, b"{\"message\":{}}");
        assert_eq!(event.id.as_deref(), Some("1234"));
        assert_eq!(
            event.event_type.as_deref(),
            Some("google.cloud.pubsub.topic.v1.messagePublished")
        );
        assert_eq!(event.subject.as_deref(), Some("cron"));
        assert!(event.source.is_none());
    }

    #[test]
    fn reads_structured_mode_envelope() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/cloudevents+json; charset=utf-8"),
        );
        let body = br#"{"specversion":"1.0","id":"9","type":"scheduler.tick","source":"//cloudscheduler","data":{}}"#;

        let event = EventContext::extract(&headers, body);
        assert_eq!(event.id.as_deref(), Some("9"));
        assert_eq!(event.event_type.as_deref(), Some("scheduler.tick"));
        assert_eq!(event.source.as_deref(), Some("//cloudscheduler"));
    }

    #[test]
    fn malformed_envelope_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/cloudevents+json"),
        );
        assert_eq!(EventContext::extract(&headers, b"not json"), EventContext::default());
    }
}
