use airsnap_core::SourceError;
use serde::Deserialize;

pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Where bearer tokens for the Firestore API come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenProvider {
    /// No `Authorization` header, for the local emulator.
    Anonymous,
    Static(String),
    /// The GCE/Cloud Run/Cloud Functions metadata server.
    MetadataServer { host: String },
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

impl TokenProvider {
    pub fn metadata_server() -> Self {
        TokenProvider::MetadataServer {
            host: DEFAULT_METADATA_HOST.to_string(),
        }
    }

    pub async fn bearer_token(
        &self,
        http: &reqwest::Client,
    ) -> Result<Option<String>, SourceError> {
        match self {
            TokenProvider::Anonymous => Ok(None),
            TokenProvider::Static(token) => Ok(Some(token.clone())),
            TokenProvider::MetadataServer { host } => {
                let url = format!("http://{host}{TOKEN_PATH}");
                let response = http
                    .get(&url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await
                    .map_err(|err| SourceError::Connect(format!("metadata server: {err}")))?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(SourceError::Status {
                        status: status.as_u16(),
                        body: format!("metadata token request: {body}"),
                    });
                }

                let token: MetadataToken = response
                    .json()
                    .await
                    .map_err(|err| SourceError::Decode(format!("metadata token: {err}")))?;
                Ok(Some(token.access_token))
            }
        }
    }
}
