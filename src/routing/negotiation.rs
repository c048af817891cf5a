//! Response shape negotiation.
//!
//! Only an `Accept` header that is exactly `application/json` selects the
//! JSON shape. Combined values such as `application/json, text/html`
//! (what the browser navigator sends) select HTML.

use axum::http::{header, HeaderMap};

/// The JSON media type matched against `Accept`.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Shape of a successful page response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{content, title}`; bypasses hardening.
    Json,
    /// Full layout-wrapped document; always hardened.
    Html,
}

impl ResponseShape {
    /// Pick a shape from a raw `Accept` value.
    pub fn from_accept(accept: Option<&str>) -> Self {
        match accept {
            Some(JSON_MEDIA_TYPE) => ResponseShape::Json,
            _ => ResponseShape::Html,
        }
    }

    /// Pick a shape from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::from_accept(headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseShape::Json => "json",
            ResponseShape::Html => "html",
        }
    }
}
