use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::connection::ConnectionString;

pub const PROBE_TIMEOUT: Duration = Duration::from_millis(1500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum CollabError {
    #[error("invalid collab connection string `{value}`: {reason}")]
    InvalidConnectionString { value: String, reason: String },

    #[error("collab request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("collab server answered {status} for {url}")]
    Status { status: u16, url: String },
}

/// HTTP client for one collab server, with an optional local fallback.
#[derive(Debug, Clone)]
pub struct CollabClient {
    http: reqwest::Client,
    primary: ConnectionString,
    fallback: Option<ConnectionString>,
    doc_prefix: String,
}

impl CollabClient {
    pub fn new(primary: ConnectionString, doc_prefix: impl Into<String>) -> Result<Self, CollabError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, primary, fallback: None, doc_prefix: doc_prefix.into() })
    }

    /// Retry failed calls against `fallback`. Ignored when it is the primary.
    pub fn with_fallback(mut self, fallback: Option<ConnectionString>) -> Self {
        self.fallback = fallback.filter(|fallback| fallback.as_str() != self.primary.as_str());
        self
    }

    pub fn connection(&self) -> &ConnectionString {
        &self.primary
    }

    /// Id of the collab document backing `document_id` (already sanitized).
    pub fn collab_doc_id(&self, document_id: &str) -> String {
        format!("{}{document_id}", self.doc_prefix)
    }

    /// Full live state of a document as a v1 update.
    pub async fn fetch_update(&self, document_id: &str) -> Result<Vec<u8>, CollabError> {
        let doc_id = self.collab_doc_id(document_id);
        match (self.fetch_from(&self.primary, &doc_id).await, &self.fallback) {
            (Err(error), Some(fallback)) => {
                debug!(doc_id = %doc_id, %error, %fallback, "primary collab server failed, trying fallback");
                self.fetch_from(fallback, &doc_id).await
            }
            (outcome, _) => outcome,
        }
    }

    /// Send an incremental update to a document.
    pub async fn push_update(&self, document_id: &str, update: Vec<u8>) -> Result<(), CollabError> {
        let doc_id = self.collab_doc_id(document_id);
        match (self.push_to(&self.primary, &doc_id, update.clone()).await, &self.fallback) {
            (Err(error), Some(fallback)) => {
                debug!(doc_id = %doc_id, %error, %fallback, "primary collab server failed, trying fallback");
                self.push_to(fallback, &doc_id, update).await
            }
            (outcome, _) => outcome,
        }
    }

    /// Whether the primary server accepts TCP connections.
    pub async fn probe(&self) -> bool {
        let address = (self.primary.host(), self.primary.port());
        match timeout(PROBE_TIMEOUT, TcpStream::connect(address)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(error)) => {
                warn!(%error, connection = %self.primary, "collab server unreachable");
                false
            }
            Err(_) => {
                warn!(connection = %self.primary, "collab server probe timed out");
                false
            }
        }
    }

    async fn fetch_from(&self, conn: &ConnectionString, doc_id: &str) -> Result<Vec<u8>, CollabError> {
        let url = format!("{}/doc/{doc_id}/as-update", conn.base_url());
        let response = self.authorized(self.http.get(&url), conn).send().await?;
        let response = check_status(response, &url)?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn push_to(
        &self,
        conn: &ConnectionString,
        doc_id: &str,
        update: Vec<u8>,
    ) -> Result<(), CollabError> {
        let url = format!("{}/doc/{doc_id}/update", conn.base_url());
        let request = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(update);
        let response = self.authorized(request, conn).send().await?;
        check_status(response, &url)?;
        Ok(())
    }

    fn authorized(
        &self,
        request: reqwest::RequestBuilder,
        conn: &ConnectionString,
    ) -> reqwest::RequestBuilder {
        match conn.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn check_status(response: reqwest::Response, url: &str) -> Result<reqwest::Response, CollabError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(CollabError::Status { status: status.as_u16(), url: url.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::body::Bytes;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::Router;
    use tokio::net::TcpListener;

    #[derive(Clone, Default)]
    struct Recorded {
        pushed: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
        auth: Arc<Mutex<Option<String>>>,
    }

    async fn serve_mock() -> (String, Recorded) {
        let recorded = Recorded::default();
        let app = Router::new()
            .route(
                "/doc/{doc_id}/as-update",
                get(|Path(doc_id): Path<String>, State(rec): State<Recorded>, headers: HeaderMap| async move {
                    *rec.auth.lock().expect("lock") = headers
                        .get("authorization")
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_string);
                    if doc_id == "doc_missing" {
                        return Err(StatusCode::NOT_FOUND);
                    }
                    Ok(doc_id.into_bytes())
                }),
            )
            .route(
                "/doc/{doc_id}/update",
                post(|Path(doc_id): Path<String>, State(rec): State<Recorded>, body: Bytes| async move {
                    rec.pushed.lock().expect("lock").push((doc_id, body.to_vec()));
                    StatusCode::OK
                }),
            )
            .with_state(recorded.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("listener should bind");
        let addr = listener.local_addr().expect("listener should have an address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock collab server should run");
        });
        (format!("ys://{addr}"), recorded)
    }

    async fn closed_port() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("listener should bind");
        let addr = listener.local_addr().expect("listener should have an address");
        drop(listener);
        format!("ys://{addr}")
    }

    fn client(conn: &str) -> CollabClient {
        CollabClient::new(ConnectionString::parse(conn).expect("valid"), "doc_").expect("client")
    }

    #[tokio::test]
    async fn fetches_with_prefixed_doc_id() {
        let (conn, _) = serve_mock().await;
        let update = client(&conn).fetch_update("notas").await.expect("fetch should succeed");
        assert_eq!(update, b"doc_notas");
    }

    #[tokio::test]
    async fn sends_bearer_token_from_connection_string() {
        let (conn, recorded) = serve_mock().await;
        let conn = conn.replace("ys://", "ys://segredo@");
        client(&conn).fetch_update("notas").await.expect("fetch should succeed");
        assert_eq!(recorded.auth.lock().expect("lock").as_deref(), Some("Bearer segredo"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (conn, _) = serve_mock().await;
        let error = client(&conn).fetch_update("missing").await.expect_err("404 should fail");
        assert!(matches!(error, CollabError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn falls_back_when_primary_is_down() {
        let (fallback, recorded) = serve_mock().await;
        let client = client(&closed_port().await)
            .with_fallback(Some(ConnectionString::parse(&fallback).expect("valid")));

        assert_eq!(client.fetch_update("notas").await.expect("fallback fetch"), b"doc_notas");
        client.push_update("notas", vec![1, 2, 3]).await.expect("fallback push");
        assert_eq!(
            recorded.pushed.lock().expect("lock").as_slice(),
            &[("doc_notas".to_string(), vec![1, 2, 3])]
        );
    }

    #[tokio::test]
    async fn fallback_equal_to_primary_is_dropped() {
        let conn = closed_port().await;
        let client =
            client(&conn).with_fallback(Some(ConnectionString::parse(&conn).expect("valid")));
        assert!(client.fallback.is_none());
    }

    #[tokio::test]
    async fn probe_reports_reachability() {
        let (conn, _) = serve_mock().await;
        assert!(client(&conn).probe().await);
        assert!(!client(&closed_port().await).probe().await);
    }
}
