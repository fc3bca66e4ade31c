//! Document-store sources backed by Firestore's REST API or a saved `runQuery` response.

pub mod auth;
pub mod client;
pub mod export;
pub mod query;
pub mod value;

pub use auth::TokenProvider;
pub use client::{FirestoreConfig, FirestoreSource};
pub use export::ExportFileSource;
pub use value::DecodeError;
