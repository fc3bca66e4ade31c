//! One regeneration run: fetch -> normalize -> serialize -> upload.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use airsnap_bucket::BucketStore;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::{PipelineError, Result};
use crate::model::Snapshot;
use crate::normalize::{RecordNormalizer, RecordSchema, SkippedRecord};
use crate::publish::{PublishTarget, Published, SnapshotPublisher};
use crate::source::RecordSource;

pub const DEFAULT_COLLECTION: &str = "air_quality_raw";
pub const DEFAULT_BUCKET: &str = "aq.chollada.casa";

/// Everything a run needs to know besides its collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub project_id: String,
    pub collection: String,
    pub bucket: String,
    pub schema: RecordSchema,
    pub target: PublishTarget,
}

impl PipelineConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            collection: DEFAULT_COLLECTION.to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
            schema: RecordSchema::default(),
            target: PublishTarget::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("project id", &self.project_id),
            ("collection", &self.collection),
            ("bucket", &self.bucket),
            ("object key", &self.target.key),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(PipelineError::Config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Fetching,
    Normalizing,
    Serializing,
    Uploading,
    Done,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Fetching => "fetching",
            RunPhase::Normalizing => "normalizing",
            RunPhase::Serializing => "serializing",
            RunPhase::Uploading => "uploading",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub source: String,
    pub fetched: usize,
    pub skipped: usize,
    pub published: Published,
    pub phases: Vec<RunPhase>,
}

impl RunReport {
    pub fn count(&self) -> usize {
        self.published.count
    }
}

#[derive(Debug)]
struct PhaseTracker {
    history: Vec<RunPhase>,
}

impl PhaseTracker {
    fn start() -> Self {
        Self {
            history: vec![RunPhase::Idle],
        }
    }

    fn current(&self) -> RunPhase {
        self.history.last().copied().unwrap_or(RunPhase::Idle)
    }

    fn advance(&mut self, next: RunPhase) {
        debug!(from = %self.current(), to = %next, "run phase transition");
        self.history.push(next);
    }

    fn fail(&mut self, err: PipelineError) -> PipelineError {
        error!(phase = %err.phase(), error = %err, "snapshot run failed");
        self.advance(RunPhase::Failed);
        err
    }
}

pub struct Pipeline {
    source: Arc<dyn RecordSource>,
    normalizer: RecordNormalizer,
    publisher: SnapshotPublisher,
}

impl Pipeline {
    pub fn new(
        config: &PipelineConfig,
        source: Arc<dyn RecordSource>,
        store: Arc<dyn BucketStore>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            normalizer: RecordNormalizer::new(config.schema.clone()),
            publisher: SnapshotPublisher::new(store, config.target.clone()),
        })
    }

    /// Runs once and returns the number of published readings.
    pub async fn regenerate(&self) -> Result<usize> {
        self.run().await.map(|report| report.count())
    }

    pub async fn regenerate_until<F>(&self, cancel: F) -> Result<usize>
    where
        F: Future<Output = ()>,
    {
        self.run_until(cancel).await.map(|report| report.count())
    }

    pub async fn run(&self) -> Result<RunReport> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Runs once, abandoning the fetch or upload in flight if `cancel` resolves first.
    pub async fn run_until<F>(&self, cancel: F) -> Result<RunReport>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(cancel);
        let mut tracker = PhaseTracker::start();
        let source = self.source.describe();

        tracker.advance(RunPhase::Fetching);
        let records = tokio::select! {
            biased;
            _ = &mut cancel => {
                return Err(tracker.fail(PipelineError::Cancelled { phase: RunPhase::Fetching }));
            }
            fetched = self.source.fetch() => {
                fetched.map_err(|err| tracker.fail(PipelineError::Fetch(err)))?
            }
        };
        let fetched = records.len();
        info!(source = %source, fetched, "fetched raw documents");

        tracker.advance(RunPhase::Normalizing);
        let outcome = self.normalizer.normalize(records);
        let skipped = outcome.skipped.len();
        let snapshot = Snapshot::new(outcome.readings);

        tracker.advance(RunPhase::Serializing);
        let serialized = self
            .publisher
            .serialize(&snapshot)
            .map_err(|err| tracker.fail(err))?;

        tracker.advance(RunPhase::Uploading);
        let published = tokio::select! {
            biased;
            _ = &mut cancel => {
                return Err(tracker.fail(PipelineError::Cancelled { phase: RunPhase::Uploading }));
            }
            uploaded = self.publisher.upload(&serialized) => {
                uploaded.map_err(|err| tracker.fail(err))?
            }
        };

        tracker.advance(RunPhase::Done);
        info!(
            location = %published.location,
            key = %published.key,
            count = published.count,
            skipped,
            bytes = published.byte_size,
            "published snapshot"
        );

        Ok(RunReport {
            source,
            fetched,
            skipped,
            published,
            phases: tracker.history,
        })
    }

    /// Normalizes without publishing.
    pub async fn preview(&self) -> Result<(Snapshot, Vec<SkippedRecord>)> {
        let records = self.source.fetch().await?;
        let outcome = self.normalizer.normalize(records);
        Ok((Snapshot::new(outcome.readings), outcome.skipped))
    }
}
