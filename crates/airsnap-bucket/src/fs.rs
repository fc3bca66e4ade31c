use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use uuid::Uuid;

use crate::{BucketError, BucketStore, ObjectMetadata};

const METADATA_SUFFIX: &str = ".meta.json";

/// Stores objects as plain files below a root directory.
///
/// Bodies are written to a sibling temp file and renamed into place, so a failed write leaves
/// the previous object intact. Metadata lives in a `<key>.meta.json` sidecar.
#[derive(Debug, Clone)]
pub struct FsBucketStore {
    root: PathBuf,
}

impl FsBucketStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn get_metadata(&self, key: &str) -> Result<ObjectMetadata, BucketError> {
        let path = self.sidecar_path(key)?;
        let raw = read(&path, key).await?;
        serde_json::from_slice(&raw).map_err(|err| {
            BucketError::Configuration(format!(
                "corrupt metadata sidecar {}: {err}",
                path.display()
            ))
        })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, BucketError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn sidecar_path(&self, key: &str) -> Result<PathBuf, BucketError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}{METADATA_SUFFIX}")))
    }
}

fn validate_key(key: &str) -> Result<(), BucketError> {
    let invalid = |reason| BucketError::InvalidKey {
        key: key.to_string(),
        reason,
    };

    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    if key.ends_with('/') {
        return Err(invalid("key names a directory"));
    }
    for component in Path::new(key).components() {
        match component {
            Component::Normal(_) => {}
            _ => return Err(invalid("key must be a relative path without `.` or `..`")),
        }
    }
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> BucketError {
    BucketError::Io {
        path: path.display().to_string(),
        source,
    }
}

async fn read(path: &Path, key: &str) -> Result<Vec<u8>, BucketError> {
    fs::read(path).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            BucketError::NotFound(key.to_string())
        } else {
            io_error(path, err)
        }
    })
}

async fn replace_file(path: &Path, contents: &[u8]) -> Result<(), BucketError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .await
        .map_err(|err| io_error(parent, err))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

    if let Err(err) = fs::write(&temp_path, contents).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(io_error(&temp_path, err));
    }
    if let Err(err) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(io_error(path, err));
    }
    Ok(())
}

#[async_trait]
impl BucketStore for FsBucketStore {
    fn location(&self) -> String {
        format!("file://{}", self.root.display())
    }

    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        metadata: &ObjectMetadata,
    ) -> Result<(), BucketError> {
        let object_path = self.object_path(key)?;
        let sidecar_path = self.sidecar_path(key)?;
        let sidecar = serde_json::to_vec_pretty(metadata)
            .map_err(|err| BucketError::Configuration(format!("metadata encoding: {err}")))?;

        replace_file(&object_path, &bytes).await?;
        replace_file(&sidecar_path, &sidecar).await
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError> {
        let path = self.object_path(key)?;
        read(&path, key).await.map(Bytes::from)
    }

    async fn delete_object(&self, key: &str) -> Result<(), BucketError> {
        let object_path = self.object_path(key)?;
        let sidecar_path = self.sidecar_path(key)?;

        fs::remove_file(&object_path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                BucketError::NotFound(key.to_string())
            } else {
                io_error(&object_path, err)
            }
        })?;
        match fs::remove_file(&sidecar_path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&sidecar_path, err)),
        }
    }
}
