// Recorded audio notes. The document is named in the form, body or
// headers instead of the path, matching what the web recorder sends.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use dontpad_common::types::AudioNote;
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::{FormData, ValidatedJson};
use super::{blocking, optional_segment, storage_document_id, AppState};
use crate::error::{ApiError, ErrorCode};
use crate::store::audio::AUDIO_MIME_TYPE;

const DOCUMENT_ID_HEADER: &str = "x-document-id";
const SUBDOCUMENT_ID_HEADER: &str = "x-subdocument-id";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAudioNoteRequest {
    #[serde(default)]
    document_id: Option<String>,
    #[serde(default)]
    note_id: Option<String>,
    #[serde(default)]
    subdocument_id: Option<String>,
}

/// Multipart fields: `audio` (required), `duration` in seconds,
/// `documentId` (required), `subdocumentId`.
pub async fn create_audio_note(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AudioNote>, ApiError> {
    let mut form = FormData::read(multipart).await?;
    let (Some(audio), Some(document_id)) = (form.take("audio"), form.text("documentId")) else {
        return Err(ApiError::bad_request("Audio e documentId são obrigatórios"));
    };
    let document_id = storage_document_id(&document_id)?;
    let subdocument = optional_segment(form.text("subdocumentId"))?;
    // Unparseable durations are stored as 0.
    let duration = form.text("duration").and_then(|value| value.parse::<f64>().ok()).unwrap_or(f64::NAN);

    let store = state.audio.clone();
    let note = blocking(move || store.save(&document_id, subdocument.as_deref(), duration, &audio.bytes))
        .await?
        .map_err(|error| ApiError::internal(ErrorCode::StorageFailed, error))?;
    Ok(Json(note))
}

pub async fn delete_audio_note(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<DeleteAudioNoteRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(document_id), Some(note_id)) = (
        request.document_id.filter(|id| !id.is_empty()),
        request.note_id.filter(|id| !id.is_empty()),
    ) else {
        return Err(ApiError::bad_request("documentId e noteId são obrigatórios"));
    };
    let document_id = storage_document_id(&document_id)?;
    let subdocument = optional_segment(request.subdocument_id)?;

    let store = state.audio.clone();
    blocking(move || store.delete(&document_id, subdocument.as_deref(), &note_id))
        .await?
        .map_err(|error| ApiError::internal(ErrorCode::StorageFailed, error))?;
    Ok(Json(json!({ "success": true })))
}

pub async fn get_audio_note(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .filter(|value| !value.is_empty())
    };
    let document_id = header_value(DOCUMENT_ID_HEADER)
        .ok_or_else(|| ApiError::bad_request("documentId e noteId são obrigatórios"))?;
    let document_id = storage_document_id(&document_id)?;
    let subdocument = optional_segment(header_value(SUBDOCUMENT_ID_HEADER))?;

    let store = state.audio.clone();
    let lookup_id = note_id.clone();
    let bytes = blocking(move || store.read(&document_id, subdocument.as_deref(), &lookup_id))
        .await?
        .map_err(|error| ApiError::internal(ErrorCode::StorageFailed, error))?
        .ok_or_else(|| ApiError::not_found("Nota de áudio não encontrada"))?;

    Ok((
        [
            (header::CONTENT_TYPE, AUDIO_MIME_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"audio-{note_id}.webm\"")),
        ],
        bytes,
    )
        .into_response())
}
