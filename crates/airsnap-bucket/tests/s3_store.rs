use airsnap_bucket::{BucketStore, ObjectMetadata, S3BucketStore, S3Config};
use anyhow::{Context, Result};
use bytes::Bytes;
use uuid::Uuid;

const REQUIRED_VARS: &[&str] = &[
    "AIRSNAP_TEST_S3_BUCKET",
    "AIRSNAP_TEST_S3_ENDPOINT",
    "AIRSNAP_TEST_S3_ACCESS_KEY_ID",
    "AIRSNAP_TEST_S3_SECRET_ACCESS_KEY",
];

struct S3TestConfig {
    bucket: String,
    region: Option<String>,
    endpoint: String,
    access_key_id: String,
    secret_access_key: String,
}

impl S3TestConfig {
    fn from_env() -> Option<Self> {
        for &var in REQUIRED_VARS {
            if std::env::var(var)
                .ok()
                .filter(|value| !value.is_empty())
                .is_none()
            {
                return None;
            }
        }

        Some(Self {
            bucket: std::env::var("AIRSNAP_TEST_S3_BUCKET").ok()?,
            region: std::env::var("AIRSNAP_TEST_S3_REGION").ok(),
            endpoint: std::env::var("AIRSNAP_TEST_S3_ENDPOINT").ok()?,
            access_key_id: std::env::var("AIRSNAP_TEST_S3_ACCESS_KEY_ID").ok()?,
            secret_access_key: std::env::var("AIRSNAP_TEST_S3_SECRET_ACCESS_KEY").ok()?,
        })
    }
}

#[tokio::test]
async fn s3_store_put_get_delete() -> Result<()> {
    let Some(config) = S3TestConfig::from_env() else {
        eprintln!(
            "Skipping S3 bucket store test; set {} to enable",
            REQUIRED_VARS.join(", ")
        );
        return Ok(());
    };

    let store = S3BucketStore::new(S3Config {
        bucket: config.bucket,
        region: config.region.unwrap_or_else(|| "us-east-1".to_string()),
        endpoint: Some(config.endpoint),
        access_key_id: Some(config.access_key_id),
        secret_access_key: Some(config.secret_access_key),
        force_path_style: true,
    })
    .await
    .context("failed to build S3 bucket store")?;

    let key = format!("airsnap-tests/{}.json", Uuid::new_v4());
    let metadata = ObjectMetadata::new("application/json").with_cache_control("public, max-age=60");

    store
        .put_object(&key, Bytes::from_static(b"[]"), &metadata)
        .await
        .context("upload to S3 failed")?;

    let body = store.get_object(&key).await.context("download failed")?;
    assert_eq!(body, Bytes::from_static(b"[]"));

    store.delete_object(&key).await.context("cleanup delete failed")?;
    Ok(())
}

#[tokio::test]
async fn s3_store_rejects_half_configured_credentials() {
    let result = S3BucketStore::new(S3Config {
        access_key_id: Some("only-the-id".to_string()),
        ..S3Config::default()
    })
    .await;
    assert!(result.is_err());
}
