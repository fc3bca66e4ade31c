use std::sync::Arc;

use airsnap_bucket::{BucketStore, ObjectMetadata};
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::model::Snapshot;

pub const DEFAULT_OBJECT_KEY: &str = "public/data/history24h.json";
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
pub const DEFAULT_CACHE_CONTROL: &str = "public, max-age=60";

/// Where the snapshot lands and how it is tagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub key: String,
    pub metadata: ObjectMetadata,
}

impl Default for PublishTarget {
    fn default() -> Self {
        Self {
            key: DEFAULT_OBJECT_KEY.to_string(),
            metadata: ObjectMetadata::new(DEFAULT_CONTENT_TYPE)
                .with_cache_control(DEFAULT_CACHE_CONTROL),
        }
    }
}

/// A snapshot rendered to its published bytes.
#[derive(Debug, Clone)]
pub struct SerializedSnapshot {
    pub body: Bytes,
    pub count: usize,
    pub content_hash: String,
}

impl SerializedSnapshot {
    pub fn byte_size(&self) -> usize {
        self.body.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Published {
    pub location: String,
    pub key: String,
    pub count: usize,
    pub byte_size: usize,
    pub content_hash: String,
}

pub struct SnapshotPublisher {
    store: Arc<dyn BucketStore>,
    target: PublishTarget,
}

impl SnapshotPublisher {
    pub fn new(store: Arc<dyn BucketStore>, target: PublishTarget) -> Self {
        Self { store, target }
    }

    pub fn target(&self) -> &PublishTarget {
        &self.target
    }

    pub fn location(&self) -> String {
        self.store.location()
    }

    pub fn serialize(&self, snapshot: &Snapshot) -> Result<SerializedSnapshot> {
        let body = snapshot.to_json()?;
        let content_hash = blake3::hash(&body).to_hex().to_string();
        Ok(SerializedSnapshot {
            body,
            count: snapshot.count(),
            content_hash,
        })
    }

    /// Writes the whole body in a single put. Nothing is retried.
    pub async fn upload(&self, serialized: &SerializedSnapshot) -> Result<Published> {
        debug!(
            key = %self.target.key,
            bytes = serialized.byte_size(),
            "uploading snapshot"
        );
        self.store
            .put_object(&self.target.key, serialized.body.clone(), &self.target.metadata)
            .await
            .map_err(|source| PipelineError::Upload {
                location: self.store.location(),
                key: self.target.key.clone(),
                source,
            })?;

        Ok(Published {
            location: self.store.location(),
            key: self.target.key.clone(),
            count: serialized.count,
            byte_size: serialized.byte_size(),
            content_hash: serialized.content_hash.clone(),
        })
    }

    pub async fn publish(&self, snapshot: &Snapshot) -> Result<Published> {
        let serialized = self.serialize(snapshot)?;
        self.upload(&serialized).await
    }
}
