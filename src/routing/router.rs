//! Page lookup and response negotiation.
//!
//! # Responsibilities
//! - Normalize request paths into route keys
//! - Look up pages and derive their titles
//! - Produce the negotiated response (JSON payload or composed HTML)
//!
//! # Design Decisions
//! - Owns the route table; immutable after construction (no locks)
//! - Explicit `NotFound` rather than a silent default page
//! - JSON responses carry raw page content and skip hardening
//! - HTML responses are composed here and hardened by the response hook

use serde::{Deserialize, Serialize};

use crate::routing::negotiation::ResponseShape;
use crate::routing::registry::{RouteTable, INDEX_ROUTE};

/// Fixed body of every 404 response.
pub const NOT_FOUND_MESSAGE: &str = "Sayfa bulunamadı";

/// The structured-data response shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePayload {
    pub content: String,
    pub title: String,
}

/// Outcome of handling one page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageResponse {
    /// Page found, JSON shape requested.
    Json(PagePayload),
    /// Page found, full document (pre-hardening).
    Html { title: String, document: String },
    /// No page for the normalized route.
    NotFound,
}

impl PageResponse {
    pub fn status_code(&self) -> u16 {
        match self {
            PageResponse::Json(_) | PageResponse::Html { .. } => 200,
            PageResponse::NotFound => 404,
        }
    }
}

/// Normalize a request path into a route key.
///
/// `/` becomes `/index`; one trailing `/` is stripped from anything else.
pub fn normalize_path(path: &str) -> &str {
    if path == "/" {
        return INDEX_ROUTE;
    }
    path.strip_suffix('/').unwrap_or(path)
}

/// Derive a page title from its route key.
///
/// The site root uses the configured site title. Otherwise the first
/// character after the leading `/` is upper-cased and the rest is kept as is.
pub fn derive_title(route: &str, site_title: &str) -> String {
    if route == INDEX_ROUTE {
        return site_title.to_string();
    }
    let name = route.strip_prefix('/').unwrap_or(route);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Serves pages out of an immutable route table.
#[derive(Debug, Clone)]
pub struct PageRouter {
    table: RouteTable,
    site_title: String,
}

impl PageRouter {
    /// Create a router that owns `table`.
    pub fn new(table: RouteTable, site_title: impl Into<String>) -> Self {
        Self {
            table,
            site_title: site_title.into(),
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn site_title(&self) -> &str {
        &self.site_title
    }

    /// Handle a request for `path` in the negotiated `shape`.
    pub fn handle(&self, path: &str, shape: ResponseShape) -> PageResponse {
        let route = normalize_path(path);
        let Some(page) = self.table.get(route) else {
            tracing::debug!(path = %path, route = %route, "No page matched");
            return PageResponse::NotFound;
        };

        let title = derive_title(page.route(), &self.site_title);
        match shape {
            ResponseShape::Json => PageResponse::Json(PagePayload {
                content: page.source().to_string(),
                title,
            }),
            ResponseShape::Html => {
                let document = self.table.layout().compose(page.source(), &title);
                PageResponse::Html { title, document }
            }
        }
    }
}
