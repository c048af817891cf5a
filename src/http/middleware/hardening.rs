//! Response hardening hook.
//!
//! # Responsibilities
//! - Buffer every HTML response body
//! - Obfuscate inline scripts and minify the document off the async workers
//! - Fail the response when hardening fails
//!
//! # Design Decisions
//! - Keyed off `Content-Type` containing `text/html`; everything else
//!   streams through untouched
//! - Sits inside the compression layer so it always sees plain bytes
//! - A failure yields `500` with a fixed body; the un-hardened page is dropped

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::HardeningConfig;
use crate::hardening::{harden, Hardened, HardeningError};
use crate::http::request::request_id;
use crate::observability::metrics;

/// Body of the response sent when a page could not be hardened.
pub const HARDENING_FAILED_MESSAGE: &str = "Internal Server Error";

/// Whether a response declares an HTML body.
pub fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("text/html"))
}

/// Middleware that hardens HTML responses produced by the inner service.
pub async fn harden_html_responses(
    State(config): State<Arc<HardeningConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = request_id(request.headers()).to_string();
    let response = next.run(request).await;

    if !config.enabled || !is_html(response.headers()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let start = Instant::now();
    match harden_body(&config, body).await {
        Ok(None) => Response::from_parts(parts, Body::empty()),
        Ok(Some(hardened)) => {
            metrics::record_hardening(start.elapsed(), hardened.scripts);
            tracing::debug!(
                request_id = %request_id,
                scripts = hardened.scripts,
                bytes = hardened.html.len(),
                "Response hardened"
            );
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(hardened.html))
        }
        Err(err) => {
            tracing::error!(
                request_id = %request_id,
                stage = err.stage(),
                error = %err,
                "Response hardening failed"
            );
            metrics::record_hardening_failure(err.stage());
            (StatusCode::INTERNAL_SERVER_ERROR, HARDENING_FAILED_MESSAGE).into_response()
        }
    }
}

/// Buffer and harden a body. Empty bodies (HEAD, 304) yield `None`.
async fn harden_body(config: &HardeningConfig, body: Body) -> Result<Option<Hardened>, HardeningError> {
    let bytes: Bytes = axum::body::to_bytes(body, config.max_body_bytes)
        .await
        .map_err(|e| HardeningError::Body(e.to_string()))?;
    if bytes.is_empty() {
        return Ok(None);
    }

    let html = String::from_utf8(bytes.to_vec()).map_err(|_| HardeningError::NotUtf8)?;
    let profile = config.obfuscation.clone();
    let hardened = tokio::task::spawn_blocking(move || harden(&html, &profile))
        .await
        .map_err(|e| HardeningError::Worker(e.to_string()))??;
    Ok(Some(hardened))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    const PAGE: &str = "<html>\n  <body>\n    <!-- hidden -->\n    <p>Hi</p>\n    \
                        <script>function greet() { var greeting = 'hello'; alert(greeting); } greet();</script>\n  </body>\n</html>";

    fn app(config: HardeningConfig) -> Router {
        Router::new()
            .route("/page", get(|| async { axum::response::Html(PAGE) }))
            .route("/broken", get(|| async { axum::response::Html("<html><script>var s = 'x</script></html>") }))
            .route("/json", get(|| async { axum::Json(serde_json::json!({ "content": "<!-- c -->" })) }))
            .route("/text", get(|| async { "<!-- plain -->" }))
            .layer(middleware::from_fn_with_state(Arc::new(config), harden_html_responses))
    }

    async fn get_body(app: Router, path: &str) -> (StatusCode, HeaderMap, String) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_is_html() {
        let mut headers = HeaderMap::new();
        assert!(!is_html(&headers));
        headers.insert(header::CONTENT_TYPE, "Text/HTML; charset=utf-8".parse().unwrap());
        assert!(is_html(&headers));
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        assert!(!is_html(&headers));
    }

    #[tokio::test]
    async fn test_html_response_is_hardened() {
        let (status, headers, body) = get_body(app(HardeningConfig::default()), "/page").await;
        assert_eq!(status, StatusCode::OK);
        if let Some(len) = headers.get(header::CONTENT_LENGTH) {
            assert_eq!(len.to_str().unwrap(), body.len().to_string());
        }
        assert!(!body.contains("hidden"));
        assert!(!body.contains("greeting"));
        assert!(body.starts_with("<html><body><p>Hi</p><script>"));
        assert!(body.ends_with("</script></body></html>"));
    }

    #[tokio::test]
    async fn test_failure_never_leaks_the_page() {
        let (status, _, body) = get_body(app(HardeningConfig::default()), "/broken").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, HARDENING_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_other_content_types_pass_through() {
        let app = app(HardeningConfig::default());
        let (_, _, json) = get_body(app.clone(), "/json").await;
        assert_eq!(json, r#"{"content":"<!-- c -->"}"#);
        let (_, _, text) = get_body(app, "/text").await;
        assert_eq!(text, "<!-- plain -->");
    }

    #[tokio::test]
    async fn test_disabled_hook_passes_html_through() {
        let config = HardeningConfig {
            enabled: false,
            ..HardeningConfig::default()
        };
        let (_, _, body) = get_body(app(config), "/page").await;
        assert_eq!(body, PAGE);
    }

    #[tokio::test]
    async fn test_oversized_body_fails() {
        let config = HardeningConfig {
            max_body_bytes: 16,
            ..HardeningConfig::default()
        };
        let (status, _, body) = get_body(app(config), "/page").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, HARDENING_FAILED_MESSAGE);
    }
}
