// File attachments. Attachment metadata is kept by the web client in the
// collab document; these routes only move bytes.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use dontpad_common::types::DocumentFile;
use serde::Deserialize;
use serde_json::json;

use super::extract::FormData;
use super::{blocking, optional_segment, storage_document_id, AppState};
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    subdocument_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileQuery {
    file_id: Option<String>,
    file_name: Option<String>,
    subdocument_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadQuery {
    file_id: Option<String>,
    file_name: Option<String>,
    original_name: Option<String>,
    mime_type: Option<String>,
    subdocument_id: Option<String>,
}

/// Always empty: the file list comes from the collab document.
pub async fn list_files(Path(document_id): Path<String>) -> Result<Json<Vec<DocumentFile>>, ApiError> {
    storage_document_id(&document_id)?;
    Ok(Json(Vec::new()))
}

pub async fn upload_file(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    Query(query): Query<UploadQuery>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentFile>), ApiError> {
    let document_id = storage_document_id(&document_id)?;
    let subdocument = optional_segment(query.subdocument_id)?;
    let mut form = FormData::read(multipart).await?;
    let file = form.take("file").ok_or_else(|| ApiError::bad_request("No file provided"))?;

    let original_name = file.file_name.clone().unwrap_or_else(|| "blob".to_string());
    let mime_type = file.content_type.clone().unwrap_or_default();
    let store = state.uploads.clone();
    let saved = blocking(move || {
        store.save(&document_id, subdocument.as_deref(), &original_name, &mime_type, &file.bytes)
    })
    .await??;

    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn delete_file(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    Query(query): Query<DeleteFileQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let document_id = storage_document_id(&document_id)?;
    if query.file_id.as_deref().is_none_or(str::is_empty) {
        return Err(ApiError::bad_request("Invalid document ID or file ID"));
    }
    let subdocument = optional_segment(query.subdocument_id)?;

    // Without a file name only the client-side metadata goes away.
    if let Some(file_name) = query.file_name.filter(|name| !name.is_empty()) {
        let store = state.uploads.clone();
        blocking(move || store.delete(&document_id, subdocument.as_deref(), &file_name)).await??;
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn download_file(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let document_id = storage_document_id(&document_id)?;
    let (Some(_), Some(file_name)) = (
        query.file_id.filter(|id| !id.is_empty()),
        query.file_name.filter(|name| !name.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Invalid document ID, file ID, or file name"));
    };
    let subdocument = optional_segment(query.subdocument_id)?;

    let store = state.uploads.clone();
    let stored_name = file_name.clone();
    let bytes =
        blocking(move || store.read(&document_id, subdocument.as_deref(), &stored_name)).await??;

    let mut headers = HeaderMap::new();
    let content_type = query
        .mime_type
        .as_deref()
        .and_then(|mime| HeaderValue::from_str(mime).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);

    let download_name = query.original_name.filter(|name| !name.is_empty()).unwrap_or(file_name);
    if let Ok(disposition) =
        HeaderValue::from_str(&format!("attachment; filename=\"{download_name}\""))
    {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok((headers, bytes).into_response())
}
