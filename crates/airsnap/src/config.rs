//! Process configuration read from the environment.

use std::path::PathBuf;

use airsnap_bucket::{GCS_INTEROP_ENDPOINT, S3Config};
use airsnap_core::PipelineConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Firestore,
    Export(PathBuf),
}

#[derive(Debug, Clone)]
pub enum SinkKind {
    S3(S3Config),
    Fs(PathBuf),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceKind,
    pub sink: SinkKind,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let project_id = var("GCP_PROJECT").ok_or(ConfigError::Missing("GCP_PROJECT"))?;
        let pipeline = PipelineConfig::new(project_id);

        let source = match var("AIRSNAP_SOURCE_KIND").as_deref() {
            None | Some("firestore") => SourceKind::Firestore,
            Some("export") => SourceKind::Export(PathBuf::from(
                var("AIRSNAP_EXPORT_PATH").ok_or(ConfigError::Missing("AIRSNAP_EXPORT_PATH"))?,
            )),
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "AIRSNAP_SOURCE_KIND",
                    value: other.to_string(),
                    reason: "expected `firestore` or `export`",
                });
            }
        };

        let sink = match var("AIRSNAP_SINK_KIND").as_deref() {
            None | Some("s3") => {
                let endpoint =
                    var("AIRSNAP_S3_ENDPOINT").unwrap_or_else(|| GCS_INTEROP_ENDPOINT.to_string());
                let access_key_id = var("AIRSNAP_S3_ACCESS_KEY_ID");
                let secret_access_key = var("AIRSNAP_S3_SECRET_ACCESS_KEY");
                // Cloud Storage interop accepts only HMAC keys.
                if endpoint.trim_end_matches('/') == GCS_INTEROP_ENDPOINT {
                    if access_key_id.is_none() {
                        return Err(ConfigError::Missing("AIRSNAP_S3_ACCESS_KEY_ID"));
                    }
                    if secret_access_key.is_none() {
                        return Err(ConfigError::Missing("AIRSNAP_S3_SECRET_ACCESS_KEY"));
                    }
                }
                SinkKind::S3(S3Config {
                    bucket: pipeline.bucket.clone(),
                    region: var("AIRSNAP_S3_REGION").unwrap_or_else(|| "auto".to_string()),
                    endpoint: Some(endpoint),
                    access_key_id,
                    secret_access_key,
                    force_path_style: match var("AIRSNAP_S3_FORCE_PATH_STYLE") {
                        None => true,
                        Some(value) => parse_bool("AIRSNAP_S3_FORCE_PATH_STYLE", &value)?,
                    },
                })
            }
            Some("fs") => SinkKind::Fs(PathBuf::from(
                var("AIRSNAP_FS_ROOT").ok_or(ConfigError::Missing("AIRSNAP_FS_ROOT"))?,
            )),
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "AIRSNAP_SINK_KIND",
                    value: other.to_string(),
                    reason: "expected `s3` or `fs`",
                });
            }
        };

        Ok(Self {
            pipeline,
            source,
            sink,
        })
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "expected a boolean",
        }),
    }
}
