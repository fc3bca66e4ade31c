use std::sync::Arc;

use airsnap_bucket::{BucketStore, FsBucketStore, S3BucketStore};
use airsnap_core::{Pipeline, PipelineError, RecordSource, RunReport};
use airsnap_firestore::{ExportFileSource, FirestoreConfig, FirestoreSource};
use async_trait::async_trait;

use crate::config::{AppConfig, SinkKind, SourceKind};

/// Performs one regeneration run per call.
#[async_trait]
pub trait SnapshotRunner: Send + Sync {
    async fn run(&self) -> Result<RunReport, PipelineError>;
}

#[async_trait]
impl SnapshotRunner for Pipeline {
    async fn run(&self) -> Result<RunReport, PipelineError> {
        Pipeline::run(self).await
    }
}

/// Connects fresh collaborators for every run, so nothing is shared between runs.
#[derive(Debug, Clone)]
pub struct ConfiguredRunner {
    config: AppConfig,
}

impl ConfiguredRunner {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn pipeline(&self) -> Result<Pipeline, PipelineError> {
        let source = build_source(&self.config)?;
        let store = build_store(&self.config).await?;
        Pipeline::new(&self.config.pipeline, source, store)
    }
}

#[async_trait]
impl SnapshotRunner for ConfiguredRunner {
    async fn run(&self) -> Result<RunReport, PipelineError> {
        self.pipeline().await?.run().await
    }
}

pub fn build_source(config: &AppConfig) -> Result<Arc<dyn RecordSource>, PipelineError> {
    match &config.source {
        SourceKind::Firestore => {
            let firestore = FirestoreConfig::new(
                config.pipeline.project_id.clone(),
                config.pipeline.collection.clone(),
                config.pipeline.schema.timestamp_field.clone(),
            )
            .with_env_overrides();
            Ok(Arc::new(FirestoreSource::new(firestore)?))
        }
        SourceKind::Export(path) => Ok(Arc::new(ExportFileSource::new(path.clone()))),
    }
}

pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn BucketStore>, PipelineError> {
    match &config.sink {
        SinkKind::S3(s3) => {
            let store = S3BucketStore::new(s3.clone())
                .await
                .map_err(|err| PipelineError::Config(format!("object store: {err}")))?;
            Ok(Arc::new(store))
        }
        SinkKind::Fs(root) => Ok(Arc::new(FsBucketStore::new(root.clone()))),
    }
}
