use airsnap_core::{RawRecord, RecordSource, SourceError};
use async_trait::async_trait;
use tracing::debug;

use crate::auth::TokenProvider;
use crate::query::{records_from_response, run_query_body};

pub const PRODUCTION_ENDPOINT: &str = "https://firestore.googleapis.com";
pub const DEFAULT_DATABASE: &str = "(default)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database: String,
    pub collection: String,
    pub order_by: String,
    pub endpoint: String,
    pub token: TokenProvider,
}

impl FirestoreConfig {
    pub fn new(
        project_id: impl Into<String>,
        collection: impl Into<String>,
        order_by: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            database: DEFAULT_DATABASE.to_string(),
            collection: collection.into(),
            order_by: order_by.into(),
            endpoint: PRODUCTION_ENDPOINT.to_string(),
            token: TokenProvider::metadata_server(),
        }
    }

    /// Applies `FIRESTORE_EMULATOR_HOST`, `GOOGLE_OAUTH_ACCESS_TOKEN` and `GCE_METADATA_HOST`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(host) = non_empty_var("FIRESTORE_EMULATOR_HOST") {
            self.endpoint = format!("http://{host}");
            self.token = TokenProvider::Anonymous;
            return self;
        }
        if let Some(token) = non_empty_var("GOOGLE_OAUTH_ACCESS_TOKEN") {
            self.token = TokenProvider::Static(token);
        } else if let Some(host) = non_empty_var("GCE_METADATA_HOST") {
            self.token = TokenProvider::MetadataServer { host };
        }
        self
    }

    pub fn run_query_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/{}/documents:runQuery",
            self.endpoint.trim_end_matches('/'),
            self.project_id,
            self.database
        )
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Reads a whole collection through the Firestore REST `runQuery` endpoint.
#[derive(Debug, Clone)]
pub struct FirestoreSource {
    http: reqwest::Client,
    config: FirestoreConfig,
}

impl FirestoreSource {
    pub fn new(config: FirestoreConfig) -> Result<Self, SourceError> {
        if config.project_id.trim().is_empty() {
            return Err(SourceError::Connect("project id must not be empty".into()));
        }
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| SourceError::Connect(format!("HTTP client: {err}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }
}

#[async_trait]
impl RecordSource for FirestoreSource {
    fn describe(&self) -> String {
        format!(
            "firestore://{}/{}",
            self.config.project_id, self.config.collection
        )
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, SourceError> {
        let url = self.config.run_query_url();
        let body = run_query_body(&self.config.collection, &self.config.order_by);

        let mut request = self.http.post(&url).json(&body);
        if let Some(token) = self.config.token.bearer_token(&self.http).await? {
            request = request.bearer_auth(token);
        }

        debug!(url = %url, "running firestore query");
        let response = request
            .send()
            .await
            .map_err(|err| SourceError::Request(format!("runQuery: {err}")))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| SourceError::Request(format!("runQuery body: {err}")))?;

        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        records_from_response(&bytes).map_err(SourceError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_run_query_url() {
        let config = FirestoreConfig::new("chollada-aq", "air_quality_raw", "Timestamp");
        assert_eq!(
            config.run_query_url(),
            "https://firestore.googleapis.com/v1/projects/chollada-aq/databases/(default)/documents:runQuery"
        );
    }

    #[test]
    fn rejects_blank_project() {
        let config = FirestoreConfig::new(" ", "air_quality_raw", "Timestamp");
        assert!(FirestoreSource::new(config).is_err());
    }
}
