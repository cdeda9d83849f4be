//! DontPad server: version snapshots, attachments, audio notes and PIN
//! access for documents whose live state lives on a collab server.

pub mod api;
pub mod auth;
pub mod collab;
pub mod config;
pub mod cors;
pub mod engine;
pub mod error;
pub mod store;

use std::time::Instant;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{error, info};

use crate::api::AppState;
use crate::error::{
    attach_request_id_header, request_id_from_headers_or_generate, with_request_id_scope, ApiError,
    ErrorCode,
};

/// Headroom over the upload limit for multipart framing and form fields.
const BODY_LIMIT_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Full application: API routes, `/healthz`, middleware and CORS.
pub fn build_app(state: AppState, cors_origins: Option<&str>) -> Router {
    let body_limit = usize::try_from(state.uploads.max_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_LIMIT_OVERHEAD_BYTES);

    apply_middleware(
        Router::new().route("/healthz", get(healthz)).merge(api::router(state)),
        body_limit,
    )
    .layer(cors::cors_layer(cors_origins))
}

fn apply_middleware(router: Router, body_limit: usize) -> Router {
    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_context_middleware))
        .layer(middleware::from_fn(panic_handler))
}

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

async fn panic_handler(request: Request<Body>, next: Next) -> Response {
    match tokio::spawn(async move { next.run(request).await }).await {
        Ok(response) => response,
        Err(join_error) => {
            error!(?join_error, "request handling panicked");
            ApiError::from_code(ErrorCode::InternalError).into_response()
        }
    }
}

async fn request_context_middleware(request: Request<Body>, next: Next) -> Response {
    let request_id = request_id_from_headers_or_generate(request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started_at = Instant::now();

    let mut response = with_request_id_scope(request_id.clone(), next.run(request)).await;
    attach_request_id_header(&mut response, &request_id);

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started_at.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}
