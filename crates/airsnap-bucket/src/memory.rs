use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::{BucketError, BucketStore, ObjectMetadata};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub metadata: ObjectMetadata,
}

/// Process-local store used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBucketStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    reject_writes: AtomicBool,
}

impl MemoryBucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every `put_object` fails without touching stored objects.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    fn location(&self) -> String {
        "memory://".to_string()
    }

    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        metadata: &ObjectMetadata,
    ) -> Result<(), BucketError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(BucketError::Rejected(format!(
                "memory store is rejecting writes to {key}"
            )));
        }
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                bytes,
                metadata: metadata.clone(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| BucketError::NotFound(key.to_string()))
    }

    async fn delete_object(&self, key: &str) -> Result<(), BucketError> {
        self.objects
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| BucketError::NotFound(key.to_string()))
    }
}
