//! Extraction, normalization and publication of air-quality snapshots.
//!
//! Raw store documents flow through [`RecordNormalizer`] into ordered [`Reading`]s, which
//! [`SnapshotPublisher`] serializes and uploads. [`Pipeline`] sequences the phases of one run.

pub mod error;
pub mod lookup;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod publish;
pub mod source;
pub mod timestamp;

pub use error::PipelineError;
pub use lookup::Lookup;
pub use model::{RawMap, RawRecord, RawValue, Reading, Snapshot};
pub use normalize::{
    ContainerLevel, NormalizeOutcome, RecordNormalizer, RecordSchema, SkipReason, SkippedRecord,
};
pub use pipeline::{Pipeline, PipelineConfig, RunPhase, RunReport};
pub use publish::{PublishTarget, Published, SerializedSnapshot, SnapshotPublisher};
pub use source::{RecordSource, SourceError, StaticSource};
