//! Entry points for regenerating the public 24-hour air-quality history.

pub mod config;
pub mod routes;
pub mod shutdown;
pub mod state;

pub use config::{AppConfig, ConfigError, SinkKind, SourceKind};
pub use routes::{router, AppState, EventContext};
pub use state::{ConfiguredRunner, SnapshotRunner};
