use axum::{
    extract::{Path, State},
    Json,
};
use dontpad_common::id::editor_keys;
use dontpad_common::types::{EditorKind, EditorSwitchOutcome, EditorSwitchRequest};
use tracing::info;

use super::extract::ValidatedJson;
use super::{blocking, collab_document_id, optional_segment, AppState};
use crate::engine::editor_sync::{sync_code_to_rich, sync_rich_to_code};
use crate::engine::YDoc;
use crate::error::{ApiError, ErrorCode};

/// Copy the current content into the editor the user is switching to, so
/// both editors show the same text afterwards.
pub async fn switch_editor(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    ValidatedJson(request): ValidatedJson<EditorSwitchRequest>,
) -> Result<Json<EditorSwitchOutcome>, ApiError> {
    let collab_id = collab_document_id(&document_id)?;
    let subdocument = optional_segment(request.subdocument)?;
    let keys = editor_keys(&collab_id, subdocument.as_deref());
    let target = request.target;

    let live = state.collab.fetch_update(&collab_id).await?;
    let update = blocking(move || -> anyhow::Result<Vec<u8>> {
        let doc = YDoc::from_state(&live)?;
        let before = doc.state_vector();
        match target {
            EditorKind::Code => sync_rich_to_code(&doc, &keys),
            EditorKind::Rich => sync_code_to_rich(&doc, &keys),
        }
        Ok(doc.encode_diff(&before))
    })
    .await?
    .map_err(|error| ApiError::internal(ErrorCode::InternalError, error))?;

    let update_size = update.len() as u64;
    state.collab.push_update(&collab_id, update).await?;
    info!(document_id = %collab_id, target = ?target, update_size, "switched editor");

    Ok(Json(EditorSwitchOutcome { target, update_size }))
}
