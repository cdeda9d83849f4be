// HTTP client for the dontpad server API.

use std::time::Duration;

use dontpad_common::types::{
    CollabHealth, RestoreOutcome, RestoreRequest, SecurityStatus, Version, VersionEnvelope,
    VersionsEnvelope,
};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server URL `{0}`")]
    InvalidUrl(String),

    #[error("server is not reachable at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with its error envelope (or a bare status).
    #[error("{code}: {message}")]
    Api { status: u16, code: String, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Options for `save_version`.
#[derive(Debug, Clone, Default)]
pub struct SnapshotOptions {
    pub label: Option<String>,
    pub subdocument: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(server_url.trim())
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidUrl(server_url.to_string()))?;
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub async fn list_versions(
        &self,
        document_id: &str,
        subdocument: Option<&str>,
        root_only: bool,
    ) -> Result<Vec<Version>, ClientError> {
        let mut url = self.endpoint(&["api", "documents", document_id, "versions"])?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(subdocument) = subdocument {
                query.append_pair("subdocument", subdocument);
            }
            if root_only {
                query.append_pair("rootOnly", "true");
            }
        }
        let envelope: VersionsEnvelope = self.json(self.http.get(url.clone()), &url).await?;
        Ok(envelope.versions)
    }

    pub async fn version(&self, document_id: &str, version_id: &str) -> Result<Version, ClientError> {
        let url = self.endpoint(&["api", "documents", document_id, "versions", version_id])?;
        let envelope: VersionEnvelope = self.json(self.http.get(url.clone()), &url).await?;
        Ok(envelope.version)
    }

    pub async fn version_bytes(
        &self,
        document_id: &str,
        version_id: &str,
    ) -> Result<Vec<u8>, ClientError> {
        let url = self.endpoint(&["api", "documents", document_id, "versions", version_id])?;
        let response = self.send(self.http.post(url.clone()), &url).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn save_version(
        &self,
        document_id: &str,
        update: Vec<u8>,
        options: SnapshotOptions,
    ) -> Result<Version, ClientError> {
        let url = self.endpoint(&["api", "documents", document_id, "versions"])?;
        let part = Part::bytes(update)
            .file_name("state.yupdate")
            .mime_str("application/octet-stream")?;
        let mut form = Form::new().part("update", part);
        for (name, value) in [
            ("label", options.label),
            ("subdocument", options.subdocument),
            ("createdBy", options.created_by),
        ] {
            if let Some(value) = value {
                form = form.text(name, value);
            }
        }
        let envelope: VersionEnvelope =
            self.json(self.http.post(url.clone()).multipart(form), &url).await?;
        Ok(envelope.version)
    }

    pub async fn delete_version(&self, document_id: &str, version_id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["api", "documents", document_id, "versions", version_id])?;
        self.send(self.http.delete(url.clone()), &url).await?;
        Ok(())
    }

    pub async fn restore(
        &self,
        document_id: &str,
        version_id: &str,
        request: &RestoreRequest,
    ) -> Result<RestoreOutcome, ClientError> {
        let url =
            self.endpoint(&["api", "documents", document_id, "versions", version_id, "restore"])?;
        self.json(self.http.post(url.clone()).json(request), &url).await
    }

    pub async fn security(&self, document_id: &str) -> Result<SecurityStatus, ClientError> {
        let url = self.endpoint(&["api", "documents", document_id, "security"])?;
        self.json(self.http.get(url.clone()), &url).await
    }

    pub async fn collab_health(&self) -> Result<CollabHealth, ClientError> {
        let url = self.endpoint(&["api", "collab", "health"])?;
        self.json(self.http.get(url.clone()), &url).await
    }

    /// Base URL plus percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &Url,
    ) -> Result<T, ClientError> {
        Ok(self.send(request, url).await?.json().await?)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &Url,
    ) -> Result<reqwest::Response, ClientError> {
        debug!(%url, "calling server");
        let response = request.send().await.map_err(|source| {
            if source.is_connect() || source.is_timeout() {
                ClientError::Unreachable { url: self.base.to_string(), source }
            } else {
                ClientError::Http(source)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(api_error(status.as_u16(), &body))
    }
}

fn api_error(status: u16, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => ClientError::Api {
            status,
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => ClientError::Api {
            status,
            code: format!("HTTP_{status}"),
            message: if body.trim().is_empty() { "empty response".to_string() } else { body.trim().to_string() },
        },
    }
}
