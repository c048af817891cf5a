//! Mapping page responses onto HTTP.
//!
//! # Design Decisions
//! - HTML and 404 bodies declare a UTF-8 charset
//! - The HTML body leaves here un-hardened; the hardening hook runs next

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};

use crate::routing::{PageResponse, NOT_FOUND_MESSAGE};

/// `Content-Type` of the not-found body.
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

impl IntoResponse for PageResponse {
    fn into_response(self) -> Response {
        match self {
            PageResponse::Json(payload) => Json(payload).into_response(),
            PageResponse::Html { document, .. } => Html(document).into_response(),
            PageResponse::NotFound => (
                StatusCode::NOT_FOUND,
                [(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)],
                NOT_FOUND_MESSAGE,
            )
                .into_response(),
        }
    }
}
