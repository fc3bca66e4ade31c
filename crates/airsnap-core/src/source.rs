use async_trait::async_trait;
use thiserror::Error;

use crate::model::RawRecord;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to reach document store: {0}")]
    Connect(String),
    #[error("document store request failed: {0}")]
    Request(String),
    #[error("document store returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode documents: {0}")]
    Decode(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Supplies the raw documents for one run, ordered ascending by timestamp where the backend
/// can guarantee it.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Human-readable origin used in logs, e.g. `firestore://project/collection`.
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError>;
}

/// Serves a fixed batch of records.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<RawRecord>,
}

impl StaticSource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordSource for StaticSource {
    fn describe(&self) -> String {
        format!("static ({} records)", self.records.len())
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError> {
        Ok(self.records.clone())
    }
}
