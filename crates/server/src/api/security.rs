// PIN protection. The PIN hash lives in the collab document; a correct PIN
// buys a per-document JWT in an HttpOnly cookie.

use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use dontpad_common::pin::verify_pin as pin_matches;
use dontpad_common::types::{SecurityStatus, VerifyPinRequest};
use serde_json::json;
use tracing::{info, warn};

use super::extract::ValidatedJson;
use super::{blocking, collab_document_id, AppState};
use crate::auth::cookie::{access_cookie, clear_cookie, read_token};
use crate::engine::security::password_hash_from_update;
use crate::error::{ApiError, ErrorCode};

pub async fn security_status(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SecurityStatus>, ApiError> {
    let document_id = collab_document_id(&document_id)?;

    // An unreachable collab server or unreadable state reads as unprotected.
    let stored_hash = match state.collab.fetch_update(&document_id).await {
        Ok(update) => blocking(move || password_hash_from_update(&update))
            .await?
            .unwrap_or_else(|error| {
                warn!(document_id = %document_id, error = %format!("{error:#}"), "unreadable collab state");
                None
            }),
        Err(error) => {
            warn!(document_id = %document_id, %error, "security check without collab state");
            None
        }
    };

    let status = match stored_hash {
        None => SecurityStatus { is_protected: false, has_access: true },
        Some(_) => {
            let token = read_token(&headers, &document_id);
            SecurityStatus {
                is_protected: true,
                has_access: state.tokens.grants(token.as_deref(), &document_id),
            }
        }
    };
    Ok(Json(status))
}

pub async fn verify_pin(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    ValidatedJson(request): ValidatedJson<VerifyPinRequest>,
) -> Result<Response, ApiError> {
    let document_id = collab_document_id(&document_id)?;
    let pin = request
        .pin
        .filter(|pin| !pin.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("PIN é obrigatório"))?;

    let update = state.collab.fetch_update(&document_id).await.map_err(|error| {
        warn!(document_id = %document_id, %error, "cannot load document for PIN check");
        ApiError::new(ErrorCode::InternalError, "Erro ao verificar PIN")
    })?;
    let stored_hash = blocking(move || password_hash_from_update(&update))
        .await?
        .map_err(|error| {
            warn!(document_id = %document_id, error = %format!("{error:#}"), "unreadable collab state");
            ApiError::new(ErrorCode::InternalError, "Erro ao verificar PIN")
        })?
        .ok_or_else(|| ApiError::from_code(ErrorCode::DocumentNotProtected))?;

    if !pin_matches(&pin, &stored_hash) {
        info!(document_id = %document_id, "rejected PIN");
        return Err(ApiError::from_code(ErrorCode::PinIncorrect));
    }

    let token = state
        .tokens
        .issue(&document_id)
        .map_err(|error| ApiError::internal(ErrorCode::InternalError, error))?;
    info!(document_id = %document_id, "granted document access");
    Ok((
        [(SET_COOKIE, access_cookie(&document_id, &token, state.cookie_secure))],
        Json(json!({ "success": true })),
    )
        .into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Response, ApiError> {
    let document_id = collab_document_id(&document_id)?;
    Ok((
        [(SET_COOKIE, clear_cookie(&document_id, state.cookie_secure))],
        Json(json!({ "success": true })),
    )
        .into_response())
}
