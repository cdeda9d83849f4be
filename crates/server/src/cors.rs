// CORS for browser clients served from another origin.
//
// Origins come from `ServerConfig::cors_origins` (comma-separated, or `*`).
// Without configuration the local development origins are allowed.

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

const DEFAULT_DEV_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

/// Credentials are allowed so the per-document access cookie travels,
/// except with `*` where browsers forbid it.
pub fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static("x-document-id"),
            HeaderName::from_static("x-subdocument-id"),
        ])
        .expose_headers([
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static("x-version-id"),
            HeaderName::from_static("x-version-timestamp"),
            HeaderName::from_static("x-version-label"),
            HeaderName::from_static("x-version-size"),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600));

    match origins.map(str::trim) {
        Some("*") => base.allow_origin(AllowOrigin::any()).allow_credentials(false),
        Some(origins) if !origins.is_empty() => base.allow_origin(parse_origins(origins)),
        _ => base.allow_origin(parse_origins(&DEFAULT_DEV_ORIGINS.join(","))),
    }
}

fn parse_origins(comma_separated: &str) -> Vec<HeaderValue> {
    comma_separated
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| HeaderValue::from_str(s).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    fn test_app(origins: Option<&str>) -> Router {
        Router::new().route("/test", get(|| async { "ok" })).layer(cors_layer(origins))
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/test")
            .header("origin", origin)
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .expect("request should build")
    }

    #[tokio::test]
    async fn dev_origin_gets_credentialed_cors() {
        let response = test_app(None)
            .oneshot(preflight("http://localhost:3000"))
            .await
            .expect("request should succeed");

        assert_eq!(
            response.headers().get("access-control-allow-origin").expect("allow-origin"),
            "http://localhost:3000"
        );
        assert_eq!(
            response.headers().get("access-control-allow-credentials").expect("credentials"),
            "true"
        );
    }

    #[tokio::test]
    async fn unknown_origin_is_not_allowed() {
        let response = test_app(Some("https://dontpad.com.br"))
            .oneshot(preflight("https://evil.example.com"))
            .await
            .expect("request should succeed");
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn configured_origins_replace_defaults() {
        let app = test_app(Some("https://dontpad.com.br, https://staging.dontpad.com.br"));
        let response = app
            .oneshot(preflight("https://staging.dontpad.com.br"))
            .await
            .expect("request should succeed");
        assert_eq!(
            response.headers().get("access-control-allow-origin").expect("allow-origin"),
            "https://staging.dontpad.com.br"
        );
    }

    #[tokio::test]
    async fn wildcard_disables_credentials() {
        let response = test_app(Some("*"))
            .oneshot(preflight("https://qualquer.example.com"))
            .await
            .expect("request should succeed");
        assert_eq!(response.headers().get("access-control-allow-origin").expect("origin"), "*");
        assert!(response.headers().get("access-control-allow-credentials").is_none());
    }
}
