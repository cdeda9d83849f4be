// Request extractors that fail with `ApiError` bodies instead of axum's
// plain-text rejections.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, rejection::JsonRejection, FromRequest, Multipart, Request},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::{default_code_for_status, ApiError, ErrorCode};

pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidatedJson(value)),
            Err(rejection) => {
                let (message, details) = classify_json_rejection(&rejection);
                Err(ApiError::new(ErrorCode::ValidationFailed, message)
                    .with_details(details)
                    .into_response())
            }
        }
    }
}

fn classify_json_rejection(rejection: &JsonRejection) -> (String, serde_json::Value) {
    match rejection {
        JsonRejection::JsonDataError(e) => {
            (format!("invalid JSON payload: {e}"), serde_json::json!({ "kind": "data_error" }))
        }
        JsonRejection::JsonSyntaxError(e) => {
            (format!("malformed JSON: {e}"), serde_json::json!({ "kind": "syntax_error" }))
        }
        JsonRejection::MissingJsonContentType(_) => (
            "expected Content-Type: application/json".to_string(),
            serde_json::json!({ "kind": "missing_content_type" }),
        ),
        other => (format!("request body error: {other}"), serde_json::json!({ "kind": "body_error" })),
    }
}

/// One multipart part, fully buffered.
#[derive(Debug, Clone)]
pub struct FormPart {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl FormPart {
    pub fn text(&self) -> Option<String> {
        String::from_utf8(self.bytes.to_vec()).ok()
    }
}

/// A multipart form keyed by field name. Later parts with the same name win.
#[derive(Debug, Default)]
pub struct FormData {
    parts: HashMap<String, FormPart>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut parts = HashMap::new();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(multipart_error)?;
            parts.insert(name, FormPart { file_name, content_type, bytes });
        }
        Ok(Self { parts })
    }

    pub fn part(&self, name: &str) -> Option<&FormPart> {
        self.parts.get(name)
    }

    pub fn take(&mut self, name: &str) -> Option<FormPart> {
        self.parts.remove(name)
    }

    /// Trimmed text value; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.part(name)
            .and_then(FormPart::text)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

fn multipart_error(error: MultipartError) -> ApiError {
    let status = error.status();
    ApiError::new(default_code_for_status(status), error.body_text())
}
