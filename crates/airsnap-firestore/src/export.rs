use std::path::PathBuf;

use airsnap_core::{RawRecord, RecordSource, SourceError};
use async_trait::async_trait;

use crate::query::records_from_response;

/// Replays a saved `runQuery` response from disk, in file order.
#[derive(Debug, Clone)]
pub struct ExportFileSource {
    path: PathBuf,
}

impl ExportFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecordSource for ExportFileSource {
    fn describe(&self) -> String {
        format!("export://{}", self.path.display())
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        records_from_response(&bytes).map_err(SourceError::Decode)
    }
}
