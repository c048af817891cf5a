//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the page handler and static files
//! - Wire up middleware (tracing, request ID, timeout, rate limiting,
//!   CORS, security headers, compression, hardening)
//! - Bind the server to a listener and shut down gracefully
//!
//! # Layer Order (outermost first)
//! ```text
//! set request-id → trace → propagate request-id → timeout → rate limit
//!     → CORS → security headers → compression → hardening hook → routes
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::State,
    http::{HeaderMap, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    compression::CompressionLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{CompressionLevel, SiteConfig};
use crate::http::middleware::harden_html_responses;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::observability::metrics;
use crate::routing::{normalize_path, PageResponse, PageRouter, ResponseShape};
use crate::security::{apply_security_headers, cors_layer, rate_limit_middleware, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<PageRouter>,
}

/// HTTP server for the page site.
pub struct HttpServer {
    router: Router,
    config: SiteConfig,
    limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    /// Create a new HTTP server serving pages from `pages`.
    pub fn new(config: SiteConfig, pages: PageRouter) -> Self {
        let state = AppState {
            router: Arc::new(pages),
        };
        let limiter = config
            .security
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::new(&config.security.rate_limit)));

        let router = Self::build_router(&config, state, limiter.clone());
        Self {
            router,
            config,
            limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &SiteConfig, state: AppState, limiter: Option<Arc<RateLimiter>>) -> Router {
        let mut router = Router::new()
            .route("/", get(page_handler))
            .fallback(get(page_handler))
            .with_state(state);

        if config.static_files.enabled {
            tracing::info!(
                dir = %config.static_files.dir,
                prefix = %config.static_files.prefix,
                "Serving static files"
            );
            router = router.nest_service(&config.static_files.prefix, ServeDir::new(&config.static_files.dir));
        }

        router = router.layer(middleware::from_fn_with_state(
            Arc::new(config.hardening.clone()),
            harden_html_responses,
        ));

        if config.compression.enabled {
            router = router.layer(CompressionLayer::new().quality(compression_level(config.compression.level)));
        }

        router = apply_security_headers(router, &config.security);
        router = router.layer(cors_layer(&config.security.cors));

        if let Some(limiter) = limiter {
            router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// The fully layered router, for serving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let pruner = self.limiter.clone().map(|limiter| {
            let period = Duration::from_secs(self.config.security.rate_limit.window_secs.max(1));
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                loop {
                    interval.tick().await;
                    limiter.prune();
                }
            })
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        if let Some(pruner) = pruner {
            pruner.abort();
        }
        served?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }
}

fn compression_level(level: CompressionLevel) -> tower_http::CompressionLevel {
    match level {
        CompressionLevel::Fastest => tower_http::CompressionLevel::Fastest,
        CompressionLevel::Default => tower_http::CompressionLevel::Default,
        CompressionLevel::Best => tower_http::CompressionLevel::Best,
    }
}

/// Page handler: negotiate the shape, look up the page, record metrics.
async fn page_handler(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let start = Instant::now();
    let shape = ResponseShape::from_headers(&headers);
    let response = state.router.handle(uri.path(), shape);

    let route = match response {
        PageResponse::NotFound => "unmatched",
        _ => normalize_path(uri.path()),
    };
    metrics::record_request(route, response.status_code(), shape.as_str(), start);

    response.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::http::middleware::HARDENING_FAILED_MESSAGE;
    use crate::render::Layout;
    use crate::routing::{Page, RouteTable, NOT_FOUND_MESSAGE};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    const LAYOUT: &str = "<!DOCTYPE html>\n<html>\n<head>\n  <title><%= title %></title>\n</head>\n\
        <body>\n  <!-- layout -->\n  <div id=\"content\"><%- content %></div>\n</body>\n</html>\n";

    fn pages() -> PageRouter {
        let table = RouteTable::new(
            vec![
                Page::new("/index", "<h1>Home</h1>"),
                Page::new("/contact", "<p>Mail   us</p>\n<script>function f() { var secret = 1; return secret; } f();</script>"),
                Page::new("/broken", "<script>var s = 'open</script>"),
            ],
            Layout::parse(LAYOUT).unwrap(),
        );
        PageRouter::new(table, "Nixaut")
    }

    fn config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.static_files.enabled = false;
        config.compression.enabled = false;
        config
    }

    async fn send(router: Router, path: &str, accept: Option<&str>) -> (StatusCode, HeaderMap, String) {
        let mut request = Request::builder().uri(path);
        if let Some(accept) = accept {
            request = request.header(header::ACCEPT, accept);
        }
        let response = router.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_html_page_is_composed_and_hardened() {
        let server = HttpServer::new(config(), pages());
        let (status, headers, body) = send(server.router(), "/contact/", Some("application/json, text/html")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "text/html; charset=utf-8");
        assert!(body.contains("<title>Contact</title>"));
        assert!(body.contains("<div id=\"content\"><p>Mail us</p><script>"));
        assert!(!body.contains("<!--"));
        assert!(!body.contains("secret"));
    }

    #[tokio::test]
    async fn test_json_page_bypasses_hardening() {
        let server = HttpServer::new(config(), pages());
        let (status, headers, body) = send(server.router(), "/", Some("application/json")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(payload, serde_json::json!({ "content": "<h1>Home</h1>", "title": "Nixaut" }));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404_for_both_shapes() {
        let server = HttpServer::new(config(), pages());
        for accept in [Some("application/json"), None] {
            let (status, headers, body) = send(server.router(), "/missing", accept).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(headers[header::CONTENT_TYPE], "text/plain; charset=utf-8");
            assert_eq!(body, NOT_FOUND_MESSAGE);
        }
    }

    #[tokio::test]
    async fn test_hardening_failure_is_500() {
        let server = HttpServer::new(config(), pages());
        let (status, _, body) = send(server.router(), "/broken", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, HARDENING_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_request_id_and_security_headers() {
        let server = HttpServer::new(config(), pages());
        let (_, headers, _) = send(server.router(), "/", None).await;
        let id = headers[X_REQUEST_ID].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert!(headers.get(header::CONTENT_SECURITY_POLICY).is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_excess_requests() {
        let mut config = config();
        config.security.rate_limit = RateLimitConfig {
            enabled: true,
            max_requests: 1,
            window_secs: 3600,
        };
        let server = HttpServer::new(config, pages());
        let (first, _, _) = send(server.router(), "/", None).await;
        let (second, _, body) = send(server.router(), "/", None).await;
        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body, crate::security::RATE_LIMITED_MESSAGE);
    }

    #[tokio::test]
    async fn test_static_html_is_hardened_and_assets_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "// keep\nvar a = 1;\n").unwrap();
        std::fs::write(dir.path().join("page.html"), "<p>\n  static  <!-- x -->\n</p>\n").unwrap();

        let mut config = config();
        config.static_files.enabled = true;
        config.static_files.dir = dir.path().display().to_string();
        let server = HttpServer::new(config, pages());

        let (status, _, js) = send(server.router(), "/public/app.js", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(js, "// keep\nvar a = 1;\n");

        let (status, _, html) = send(server.router(), "/public/page.html", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(html, "<p>static</p>");
    }
}
