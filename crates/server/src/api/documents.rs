// Document removal, plus the subdocument routes older web clients still
// call. Subdocuments themselves live in the collab document's
// `subdocuments` map; these routes only validate and echo.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use dontpad_common::id::sanitize_document_id;
use dontpad_common::types::Subdocument;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::extract::ValidatedJson;
use super::{blocking, storage_document_id, AppState};
use crate::error::{ApiError, ErrorCode};
use crate::store::now_millis;

#[derive(Debug, Deserialize)]
pub struct CreateSubdocumentRequest {
    #[serde(default)]
    name: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteSubdocumentQuery {
    id: Option<String>,
}

pub async fn list_subdocuments(
    Path(document_id): Path<String>,
) -> Result<Json<Vec<Subdocument>>, ApiError> {
    storage_document_id(&document_id)?;
    Ok(Json(Vec::new()))
}

pub async fn create_subdocument(
    Path(document_id): Path<String>,
    ValidatedJson(request): ValidatedJson<CreateSubdocumentRequest>,
) -> Result<(StatusCode, Json<Subdocument>), ApiError> {
    storage_document_id(&document_id)?;
    let name = match request.name {
        Some(Value::String(name)) if !name.is_empty() => name,
        _ => return Err(ApiError::bad_request("Subdocument name is required")),
    };

    let name = name.trim().to_string();
    let id = sanitize_document_id(&name);
    if id.is_empty() {
        return Err(ApiError::bad_request("Subdocument name contains invalid characters"));
    }
    Ok((StatusCode::CREATED, Json(Subdocument { id, name, created_at: now_millis() })))
}

pub async fn delete_subdocument(
    Path(document_id): Path<String>,
    Query(query): Query<DeleteSubdocumentQuery>,
) -> Result<Json<Value>, ApiError> {
    if storage_document_id(&document_id).is_err() || query.id.as_deref().is_none_or(str::is_empty) {
        return Err(ApiError::bad_request("Invalid document ID or subdocument ID"));
    }
    Ok(Json(json!({ "success": true })))
}

/// Remove everything stored on disk for a document: versions, uploads
/// and audio notes.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let document_id = storage_document_id(&document_id)?;
    let data = state.data.clone();
    let target = document_id.clone();
    let removed = blocking(move || data.remove_document(&target)).await?.map_err(|error| {
        tracing::error!(document_id = %document_id, error = %format!("{error:#}"), "document removal failed");
        ApiError::new(ErrorCode::StorageFailed, "Failed to delete document")
    })?;

    info!(document_id = %document_id, removed, "document deleted");
    Ok(Json(json!({ "success": true })))
}
