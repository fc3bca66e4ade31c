use std::sync::Arc;

use airsnap::{router, AppState};
use airsnap_bucket::{BucketStore, MemoryBucketStore};
use airsnap_core::publish::DEFAULT_OBJECT_KEY;
use airsnap_core::{Pipeline, PipelineConfig, RawRecord, RawValue, StaticSource};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

async fn read_json(body: Body) -> serde_json::Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn reading(id: &str, timestamp: &str, pm25: f64, pm10: f64) -> RawRecord {
    RawRecord::new(id).with_field("Timestamp", timestamp).with_field(
        "PM",
        RawValue::map([(
            "PPM",
            RawValue::map([("25", RawValue::from(pm25)), ("10", RawValue::from(pm10))]),
        )]),
    )
}

fn pipeline(records: Vec<RawRecord>, store: Arc<MemoryBucketStore>) -> Pipeline {
    Pipeline::new(
        &PipelineConfig::new("chollada-aq"),
        Arc::new(StaticSource::new(records)),
        store,
    )
    .unwrap()
}

fn event() -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("ce-id", "1")
        .header("ce-type", "google.cloud.pubsub.topic.v1.messagePublished")
        .header("ce-source", "//pubsub.googleapis.com/projects/chollada-aq/topics/tick")
        .header("ce-specversion", "1.0")
        .body(Body::from(r#"{"message":{"data":""}}"#))
        .unwrap()
}

#[tokio::test]
async fn event_regenerates_and_reports_count() {
    let store = Arc::new(MemoryBucketStore::new());
    let records = vec![
        reading("a", "2024-01-01 00:00:00 UTC", 12.0, 30.0),
        RawRecord::new("b").with_field("Timestamp", RawValue::Null),
        reading("c", "2024-01-01 00:05:00 UTC", 14.5, 31.0),
    ];
    let app = router(AppState::new(Arc::new(pipeline(records, store.clone()))));

    let response = app.oneshot(event()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response.into_body()).await,
        serde_json::json!({ "count": 2 })
    );

    let object = store.object(DEFAULT_OBJECT_KEY).await.unwrap();
    assert_eq!(object.metadata.content_type, "application/json");
    assert_eq!(
        object.metadata.cache_control.as_deref(),
        Some("public, max-age=60")
    );
}

#[tokio::test]
async fn failed_upload_answers_500_with_phase() {
    let store = Arc::new(MemoryBucketStore::new());
    store
        .put_object(
            DEFAULT_OBJECT_KEY,
            "[]".into(),
            &airsnap_bucket::ObjectMetadata::new("application/json"),
        )
        .await
        .unwrap();
    store.reject_writes(true);

    let records = vec![reading("a", "2024-01-01 00:00:00 UTC", 1.0, 2.0)];
    let app = router(AppState::new(Arc::new(pipeline(records, store.clone()))));

    let response = app.oneshot(event()).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response.into_body()).await;
    assert_eq!(body["phase"], "uploading");
    assert!(body["error"].as_str().unwrap().contains("upload"));

    assert_eq!(&store.get_object(DEFAULT_OBJECT_KEY).await.unwrap()[..], b"[]");
}

#[tokio::test]
async fn healthz_answers_ok() {
    let store = Arc::new(MemoryBucketStore::new());
    let app = router(AppState::new(Arc::new(pipeline(Vec::new(), store.clone()))));

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.keys().await.is_empty());
}

#[tokio::test]
async fn get_on_root_is_not_a_trigger() {
    let store = Arc::new(MemoryBucketStore::new());
    let app = router(AppState::new(Arc::new(pipeline(Vec::new(), store.clone()))));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(store.keys().await.is_empty());
}
