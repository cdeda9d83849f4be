use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use dontpad_common::id::editor_keys;
use dontpad_common::types::{
    EditorKind, RestoreOutcome, RestoreRequest, Version, VersionEnvelope, VersionsEnvelope,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::extract::{FormData, ValidatedJson};
use super::{blocking, collab_document_id, optional_segment, storage_document_id, AppState};
use crate::engine::restore::{restore_rich, restore_text};
use crate::engine::YDoc;
use crate::error::{ApiError, ErrorCode};
use crate::store::versions::SaveOptions;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVersionsQuery {
    subdocument: Option<String>,
    /// Only document-root versions when no subdocument is given.
    #[serde(default)]
    root_only: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetVersionQuery {
    #[serde(default)]
    include_data: bool,
}

pub async fn list_versions(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    Query(query): Query<ListVersionsQuery>,
) -> Result<Json<VersionsEnvelope>, ApiError> {
    let document_id = storage_document_id(&document_id)?;
    let subdocument = query.subdocument.filter(|name| !name.is_empty());

    let store = state.versions.clone();
    let mut versions = blocking(move || match (subdocument.as_deref(), query.root_only) {
        (None, true) => store.get_partition(&document_id, None),
        (subdocument, _) => store.get_versions(&document_id, subdocument),
    })
    .await?;

    versions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(Json(VersionsEnvelope { versions }))
}

/// Multipart fields: `update` (required), `label`, `subdocument`, `createdBy`.
pub async fn create_version(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<VersionEnvelope>), ApiError> {
    let document_id = storage_document_id(&document_id)?;
    let mut form = FormData::read(multipart).await?;
    let update = form
        .take("update")
        .ok_or_else(|| ApiError::bad_request("Missing 'update' field with document state"))?;

    let options = SaveOptions {
        subdocument_name: form.text("subdocument"),
        label: form.text("label"),
        created_by: form.text("createdBy"),
        keep: None,
    };

    let store = state.versions.clone();
    let version = blocking(move || store.save_version(&document_id, &update.bytes, options))
        .await?
        .map_err(|error| ApiError::internal(ErrorCode::StorageFailed, error))?;

    Ok((StatusCode::CREATED, Json(VersionEnvelope { version })))
}

pub async fn get_version(
    State(state): State<AppState>,
    Path((document_id, version_id)): Path<(String, String)>,
    Query(query): Query<GetVersionQuery>,
) -> Result<Response, ApiError> {
    let document_id = storage_document_id(&document_id)?;
    let version = find_version(&state, &document_id, &version_id).await?;

    if !query.include_data {
        return Ok(Json(VersionEnvelope { version }).into_response());
    }

    let data = load_data(&state, &document_id, &version_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Version data not found"))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    insert_header(
        &mut headers,
        header::CONTENT_DISPOSITION,
        &format!("attachment; filename=\"{}.yupdate\"", version.id),
    );
    insert_header(&mut headers, HeaderName::from_static("x-version-id"), &version.id);
    insert_header(
        &mut headers,
        HeaderName::from_static("x-version-timestamp"),
        &version.timestamp.to_string(),
    );
    insert_header(
        &mut headers,
        HeaderName::from_static("x-version-label"),
        version.label.as_deref().unwrap_or(""),
    );
    insert_header(&mut headers, HeaderName::from_static("x-version-size"), &version.size.to_string());
    Ok((headers, data).into_response())
}

/// Raw snapshot bytes, for clients that restore locally.
pub async fn version_bytes(
    State(state): State<AppState>,
    Path((document_id, version_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let document_id = storage_document_id(&document_id)?;
    let data = load_data(&state, &document_id, &version_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Version not found"))?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data).into_response())
}

pub async fn delete_version(
    State(state): State<AppState>,
    Path((document_id, version_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let document_id = storage_document_id(&document_id)?;
    valid_version_id(&version_id)?;

    let store = state.versions.clone();
    let deleted = blocking(move || store.delete_version(&document_id, &version_id)).await?;
    if !deleted {
        return Err(ApiError::new(ErrorCode::StorageFailed, "Failed to delete version"));
    }
    Ok(Json(json!({ "success": true })))
}

/// Snapshot the live state, then replace the editor's content with the
/// chosen version and push the change to the collab server.
pub async fn restore_version(
    State(state): State<AppState>,
    Path((document_id, version_id)): Path<(String, String)>,
    ValidatedJson(request): ValidatedJson<RestoreRequest>,
) -> Result<Json<RestoreOutcome>, ApiError> {
    let collab_id = collab_document_id(&document_id)?;
    let document_id = storage_document_id(&document_id)?;
    let restored = find_version(&state, &document_id, &version_id).await?;
    let snapshot = load_data(&state, &document_id, &version_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Version data not found"))?;

    let subdocument =
        optional_segment(request.subdocument.clone())?.or_else(|| restored.subdocument_name.clone());
    let live = state.collab.fetch_update(&collab_id).await?;

    let store = state.versions.clone();
    let backup_options = SaveOptions {
        subdocument_name: subdocument.clone(),
        label: Some(format!("Backup before restoring {version_id}")),
        created_by: request.created_by.clone(),
        keep: Some(restored.id.clone()),
    };
    let backup_live = live.clone();
    let backup_document = document_id.clone();
    let backup = blocking(move || store.save_version(&backup_document, &backup_live, backup_options))
        .await?
        .map_err(|error| ApiError::internal(ErrorCode::StorageFailed, error))?;

    let keys = editor_keys(&collab_id, subdocument.as_deref());
    let editor = request.editor;
    let update = blocking(move || -> anyhow::Result<Vec<u8>> {
        let doc = YDoc::from_state(&live)?;
        match editor {
            EditorKind::Rich => restore_rich(&doc, &snapshot, &keys.rich),
            EditorKind::Code => restore_text(&doc, &snapshot, &keys.code),
        }
    })
    .await?
    .map_err(|error| ApiError::internal(ErrorCode::InternalError, error))?;

    let update_size = update.len() as u64;
    state.collab.push_update(&collab_id, update).await?;

    info!(
        document_id = %document_id,
        version_id = %restored.id,
        backup_id = %backup.id,
        editor = ?editor,
        update_size,
        "restored version"
    );
    Ok(Json(RestoreOutcome { backup, restored, update_size }))
}

async fn find_version(
    state: &AppState,
    document_id: &str,
    version_id: &str,
) -> Result<Version, ApiError> {
    valid_version_id(version_id)?;
    let store = state.versions.clone();
    let (document_id, version_id) = (document_id.to_string(), version_id.to_string());
    blocking(move || store.get_version_metadata(&document_id, &version_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Version not found"))
}

async fn load_data(
    state: &AppState,
    document_id: &str,
    version_id: &str,
) -> Result<Option<Vec<u8>>, ApiError> {
    valid_version_id(version_id)?;
    let store = state.versions.clone();
    let (document_id, version_id) = (document_id.to_string(), version_id.to_string());
    blocking(move || store.get_version_data(&document_id, &version_id)).await
}

fn valid_version_id(version_id: &str) -> Result<(), ApiError> {
    dontpad_common::id::storage_segment(version_id)
        .map(|_| ())
        .map_err(|error| ApiError::bad_request(format!("Invalid version ID: {error}")))
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;

    use crate::api::router;
    use crate::api::test_support::*;
    use crate::engine::editor_sync::{extract_text, write_blocks};
    use crate::engine::YDoc;
    use crate::store::versions::{SaveOptions, MAX_VERSIONS_PER_PARTITION};

    fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build")
    }

    fn empty_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).expect("request should build")
    }

    #[tokio::test]
    async fn create_then_list_newest_first() {
        let (_tmp, state) = test_state(&unreachable_collab().await);
        state
            .versions
            .save_version_at("notas", b"old", SaveOptions::default(), 1_000)
            .expect("seed version");
        let app = router(state);

        let response = send(
            &app,
            multipart_request(
                "/api/documents/notas/versions",
                &[("update", Some("blob"), Some("application/octet-stream"), b"\x01\x02"), ("label", None, None, b"manual")],
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["version"]["label"], "manual");
        assert_eq!(created["version"]["size"], 2);

        let listed = body_json(send(&app, empty_request(Method::GET, "/api/documents/notas/versions")).await).await;
        let versions = listed["versions"].as_array().expect("versions should be an array");
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0]["id"], created["version"]["id"]);
        assert_eq!(versions[1]["timestamp"], 1_000);
    }

    #[tokio::test]
    async fn missing_update_field_is_rejected() {
        let (_tmp, state) = test_state(&unreachable_collab().await);
        let response = send(
            &router(state),
            multipart_request("/api/documents/notas/versions", &[("label", None, None, b"x")]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Missing 'update' field with document state");
    }

    #[tokio::test]
    async fn list_filters_by_subdocument_and_root() {
        let (_tmp, state) = test_state(&unreachable_collab().await);
        let sub = SaveOptions { subdocument_name: Some("ideias".into()), ..SaveOptions::default() };
        state.versions.save_version("notas", b"r", SaveOptions::default()).expect("root");
        state.versions.save_version("notas", b"s", sub).expect("sub");
        let app = router(state);

        let sub = body_json(send(&app, empty_request(Method::GET, "/api/documents/notas/versions?subdocument=ideias")).await).await;
        assert_eq!(sub["versions"].as_array().map(Vec::len), Some(1));
        assert_eq!(sub["versions"][0]["subdocumentName"], "ideias");

        let root = body_json(send(&app, empty_request(Method::GET, "/api/documents/notas/versions?rootOnly=true")).await).await;
        assert_eq!(root["versions"].as_array().map(Vec::len), Some(1));
        assert!(root["versions"][0].get("subdocumentName").is_none());

        let all = body_json(send(&app, empty_request(Method::GET, "/api/documents/notas/versions")).await).await;
        assert_eq!(all["versions"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn get_version_with_data_sets_metadata_headers() {
        let (_tmp, state) = test_state(&unreachable_collab().await);
        let options = SaveOptions { label: Some("antes".into()), ..SaveOptions::default() };
        let version = state.versions.save_version("notas", b"bytes", options).expect("seed");
        let app = router(state);

        let uri = format!("/api/documents/notas/versions/{}?includeData=true", version.id);
        let response = send(&app, empty_request(Method::GET, &uri)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/octet-stream");
        assert_eq!(response.headers()["x-version-id"], version.id.as_str());
        assert_eq!(response.headers()["x-version-label"], "antes");
        assert_eq!(response.headers()["x-version-size"], "5");
        assert_eq!(body_bytes(response).await, b"bytes");

        let uri = format!("/api/documents/notas/versions/{}", version.id);
        let metadata = body_json(send(&app, empty_request(Method::GET, &uri)).await).await;
        assert_eq!(metadata["version"]["id"], version.id.as_str());

        let raw = send(&app, empty_request(Method::POST, &uri)).await;
        assert_eq!(raw.status(), StatusCode::OK);
        assert_eq!(body_bytes(raw).await, b"bytes");
    }

    #[tokio::test]
    async fn unknown_version_is_not_found() {
        let (_tmp, state) = test_state(&unreachable_collab().await);
        let app = router(state);
        let response = send(&app, empty_request(Method::GET, "/api/documents/notas/versions/1-abc")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = send(&app, empty_request(Method::POST, "/api/documents/notas/versions/1-abc")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_version_removes_it() {
        let (_tmp, state) = test_state(&unreachable_collab().await);
        let version = state.versions.save_version("notas", b"x", SaveOptions::default()).expect("seed");
        let store = state.versions.clone();
        let app = router(state);

        let uri = format!("/api/documents/notas/versions/{}", version.id);
        let response = send(&app, empty_request(Method::DELETE, &uri)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "success": true }));
        assert!(store.get_versions("notas", None).is_empty());
    }

    #[tokio::test]
    async fn restore_backs_up_live_state_and_pushes_update() {
        let (collab_url, mock) = spawn_mock_collab().await;
        let (_tmp, state) = test_state(&collab_url);

        let old = YDoc::with_client_id(10);
        write_blocks(&old, "blocknote", "versão de ontem");
        let version = state
            .versions
            .save_version("notas", &old.encode_state(), SaveOptions::default())
            .expect("seed version");

        let live = YDoc::with_client_id(11);
        write_blocks(&live, "blocknote", "versão de hoje");
        mock.set_state("doc_notas", live.encode_state());

        let store = state.versions.clone();
        let app = router(state);
        let uri = format!("/api/documents/notas/versions/{}/restore", version.id);
        let response =
            send(&app, json_request(Method::POST, &uri, json!({ "editor": "rich", "createdBy": "ana" }))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let outcome = body_json(response).await;
        assert_eq!(outcome["restored"]["id"], version.id.as_str());
        assert_eq!(
            outcome["backup"]["label"],
            format!("Backup before restoring {}", version.id).as_str()
        );
        assert_eq!(outcome["backup"]["createdBy"], "ana");
        assert!(outcome["updateSize"].as_u64().unwrap_or_default() > 0);

        let merged = YDoc::from_state(&mock.state("doc_notas")).expect("merged state");
        assert_eq!(extract_text(&merged, "blocknote"), "versão de ontem");

        let backup_id = outcome["backup"]["id"].as_str().expect("backup id").to_string();
        let backup = store.get_version_data("notas", &backup_id).expect("backup bytes");
        let backed_up = YDoc::from_state(&backup).expect("backup state");
        assert_eq!(extract_text(&backed_up, "blocknote"), "versão de hoje");
    }

    #[tokio::test]
    async fn restore_code_editor_targets_subdocument_text() {
        let (collab_url, mock) = spawn_mock_collab().await;
        let (_tmp, state) = test_state(&collab_url);
        let key = "doc-notas:subdoc-ideias-text";

        let old = YDoc::with_client_id(20);
        old.insert_text(key, 0, "fn antigo() {}");
        let options = SaveOptions { subdocument_name: Some("ideias".into()), ..SaveOptions::default() };
        let version = state.versions.save_version("notas", &old.encode_state(), options).expect("seed");

        let live = YDoc::with_client_id(21);
        live.insert_text(key, 0, "fn novo() {}");
        mock.set_state("doc_notas", live.encode_state());

        let store = state.versions.clone();
        let app = router(state);
        let uri = format!("/api/documents/notas/versions/{}/restore", version.id);
        let response = send(&app, json_request(Method::POST, &uri, json!({ "editor": "code" }))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let merged = YDoc::from_state(&mock.state("doc_notas")).expect("merged state");
        assert_eq!(merged.get_text_string(key), "fn antigo() {}");
        assert_eq!(store.get_versions("notas", Some("ideias")).len(), 2);
    }

    #[tokio::test]
    async fn restoring_oldest_in_full_partition_keeps_it() {
        let (collab_url, mock) = spawn_mock_collab().await;
        let (_tmp, state) = test_state(&collab_url);

        let old = YDoc::with_client_id(30);
        write_blocks(&old, "blocknote", "primeira versão");
        let oldest = state
            .versions
            .save_version_at("notas", &old.encode_state(), SaveOptions::default(), 1)
            .expect("seed oldest");
        let mut second = None;
        for i in 1..MAX_VERSIONS_PER_PARTITION {
            let version = state
                .versions
                .save_version_at("notas", b"", SaveOptions::default(), 100 + i as i64)
                .expect("seed version");
            second.get_or_insert(version);
        }
        let second = second.expect("second oldest should exist");

        let live = YDoc::with_client_id(31);
        write_blocks(&live, "blocknote", "versão atual");
        mock.set_state("doc_notas", live.encode_state());

        let store = state.versions.clone();
        let app = router(state);
        let uri = format!("/api/documents/notas/versions/{}/restore", oldest.id);
        let response = send(&app, json_request(Method::POST, &uri, json!({ "editor": "rich" }))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let versions = store.get_versions("notas", None);
        assert_eq!(versions.len(), MAX_VERSIONS_PER_PARTITION);
        assert!(versions.iter().any(|v| v.id == oldest.id));
        assert!(store.get_version_data("notas", &oldest.id).is_some());
        assert!(!versions.iter().any(|v| v.id == second.id));

        let merged = YDoc::from_state(&mock.state("doc_notas")).expect("merged state");
        assert_eq!(extract_text(&merged, "blocknote"), "primeira versão");
    }

    #[tokio::test]
    async fn restore_fails_cleanly_when_collab_is_down() {
        let (_tmp, state) = test_state(&unreachable_collab().await);
        let version = state.versions.save_version("notas", b"", SaveOptions::default()).expect("seed");
        let store = state.versions.clone();
        let app = router(state);

        let uri = format!("/api/documents/notas/versions/{}/restore", version.id);
        let response = send(&app, json_request(Method::POST, &uri, json!({}))).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(store.get_versions("notas", None).len(), 1, "no backup without live state");
    }
}
