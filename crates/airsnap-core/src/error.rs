use airsnap_bucket::BucketError;
use thiserror::Error;

use crate::pipeline::RunPhase;
use crate::source::SourceError;

/// Run-level failures. Each aborts the run before anything is published.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("fetch failed: {0}")]
    Fetch(#[from] SourceError),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("upload to {location} key {key} failed: {source}")]
    Upload {
        location: String,
        key: String,
        #[source]
        source: BucketError,
    },

    #[error("run cancelled while {phase}")]
    Cancelled { phase: RunPhase },
}

impl PipelineError {
    /// The phase the run was in when it failed.
    pub fn phase(&self) -> RunPhase {
        match self {
            PipelineError::Config(_) => RunPhase::Idle,
            PipelineError::Fetch(_) => RunPhase::Fetching,
            PipelineError::Serialize(_) => RunPhase::Serializing,
            PipelineError::Upload { .. } => RunPhase::Uploading,
            PipelineError::Cancelled { phase } => *phase,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
