// HTTP API.
//
// Routes:
//   GET    /api/documents/{id}/versions                     list (?subdocument, ?rootOnly)
//   POST   /api/documents/{id}/versions                     snapshot (multipart)
//   GET    /api/documents/{id}/versions/{versionId}         metadata (?includeData=true for bytes)
//   POST   /api/documents/{id}/versions/{versionId}         raw bytes for client-side restore
//   DELETE /api/documents/{id}/versions/{versionId}
//   POST   /api/documents/{id}/versions/{versionId}/restore server-side restore with backup
//   POST   /api/documents/{id}/editor                       copy content between editors
//   GET    /api/documents/{id}/security
//   POST   /api/documents/{id}/verify-pin
//   POST   /api/documents/{id}/logout
//   GET    /api/documents/{id}/files                        (+ POST, DELETE)
//   GET    /api/documents/{id}/files/download
//   GET    /api/documents/{id}/subdocuments                 (+ POST, DELETE) compat only
//   DELETE /api/documents/{id}
//   POST   /api/audio-notes                                 (+ DELETE)
//   GET    /api/audio-notes/{noteId}
//   GET    /api/collab/health                               (alias /api/ysweet/health)

mod audio;
mod documents;
mod editor;
mod extract;
mod files;
mod health;
mod security;
mod versions;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{delete, get, post},
    Router,
};
use dontpad_common::id::{sanitize_document_id, storage_segment};

use crate::auth::DocumentTokenService;
use crate::collab::{CollabClient, ConnectionString, FALLBACK_CONNECTION_STRING};
use crate::config::ServerConfig;
use crate::error::{ApiError, ErrorCode};
use crate::store::audio::AudioNoteStore;
use crate::store::uploads::UploadStore;
use crate::store::versions::VersionStore;
use crate::store::DataDir;

/// Everything handlers need. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub data: DataDir,
    pub versions: VersionStore,
    pub uploads: UploadStore,
    pub audio: AudioNoteStore,
    pub collab: CollabClient,
    pub tokens: Arc<DocumentTokenService>,
    pub cookie_secure: bool,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let data = DataDir::new(&config.data_dir);
        let tokens =
            DocumentTokenService::new(&config.jwt_secret).context("invalid document JWT secret")?;

        let primary = ConnectionString::parse(&config.collab_url)
            .context("invalid collab connection string")?;
        let fallback = ConnectionString::parse(FALLBACK_CONNECTION_STRING)
            .context("invalid fallback connection string")?;
        let collab = CollabClient::new(primary, config.collab_doc_prefix.clone())
            .context("failed to build collab HTTP client")?
            .with_fallback(Some(fallback));

        Ok(Self {
            versions: VersionStore::new(data.clone()),
            uploads: UploadStore::new(data.clone(), config.max_upload_bytes),
            audio: AudioNoteStore::new(data.clone()),
            data,
            collab,
            tokens: Arc::new(tokens),
            cookie_secure: config.cookie_secure,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/documents/{document_id}/versions",
            get(versions::list_versions).post(versions::create_version),
        )
        .route(
            "/api/documents/{document_id}/versions/{version_id}",
            get(versions::get_version)
                .post(versions::version_bytes)
                .delete(versions::delete_version),
        )
        .route(
            "/api/documents/{document_id}/versions/{version_id}/restore",
            post(versions::restore_version),
        )
        .route("/api/documents/{document_id}/editor", post(editor::switch_editor))
        .route("/api/documents/{document_id}/security", get(security::security_status))
        .route("/api/documents/{document_id}/verify-pin", post(security::verify_pin))
        .route("/api/documents/{document_id}/logout", post(security::logout))
        .route(
            "/api/documents/{document_id}/files",
            get(files::list_files).post(files::upload_file).delete(files::delete_file),
        )
        .route("/api/documents/{document_id}/files/download", get(files::download_file))
        .route(
            "/api/documents/{document_id}/subdocuments",
            get(documents::list_subdocuments)
                .post(documents::create_subdocument)
                .delete(documents::delete_subdocument),
        )
        .route("/api/documents/{document_id}", delete(documents::delete_document))
        .route("/api/audio-notes", post(audio::create_audio_note).delete(audio::delete_audio_note))
        .route("/api/audio-notes/{note_id}", get(audio::get_audio_note))
        .route("/api/collab/health", get(health::collab_health))
        .route("/api/ysweet/health", get(health::collab_health))
        .with_state(state)
}

/// Run filesystem work off the async runtime.
pub(crate) async fn blocking<F, T>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|error| ApiError::internal(ErrorCode::InternalError, error.into()))
}

/// Document id as used for on-disk storage: the decoded path segment,
/// rejected when empty, `"null"` or not a single safe segment.
pub(crate) fn storage_document_id(raw: &str) -> Result<String, ApiError> {
    if raw.is_empty() || raw == "null" {
        return Err(ApiError::bad_request("Invalid document ID"));
    }
    storage_segment(raw)
        .map(str::to_string)
        .map_err(|error| ApiError::bad_request(format!("Invalid document ID: {error}")))
}

/// Document id as known to the collab server and access cookies.
pub(crate) fn collab_document_id(raw: &str) -> Result<String, ApiError> {
    let sanitized = sanitize_document_id(raw);
    if sanitized.is_empty() || raw == "null" {
        return Err(ApiError::bad_request("Invalid document ID"));
    }
    Ok(sanitized)
}

/// Optional subdocument name from a query string or form; blank means none.
pub(crate) fn optional_segment(raw: Option<String>) -> Result<Option<String>, ApiError> {
    match raw.map(|value| value.trim().to_string()).filter(|value| !value.is_empty()) {
        Some(value) => storage_segment(&value)
            .map(|segment| Some(segment.to_string()))
            .map_err(|error| ApiError::bad_request(format!("Invalid subdocument ID: {error}"))),
        None => Ok(None),
    }
}
