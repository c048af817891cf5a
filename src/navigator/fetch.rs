//! Fetching navigation targets.
//!
//! # Responsibilities
//! - Define the `PageFetcher` seam used by the navigator
//! - Provide the `reqwest` implementation
//!
//! # Design Decisions
//! - The Accept header matches the browser agent byte for byte, so the
//!   server answers with (hardened) HTML
//! - Non-success statuses are errors; their bodies are never swapped in

use std::future::Future;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::Url;

/// `Accept` value sent with every navigation request.
pub const NAVIGATION_ACCEPT: &str = "application/json, text/html";

/// Why a navigation could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("network error: {0}")]
    Network(String),

    #[error("page loading failed with status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("invalid navigation target {0:?}")]
    InvalidTarget(String),
}

/// A raw successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedResponse {
    /// Whether the body should be read as `{content, title}`.
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }
}

/// Source of navigation responses.
pub trait PageFetcher {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchedResponse, NavigationError>> + Send;
}

/// Fetches pages over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Issue a GET with an explicit `Accept` value and return the
    /// response whatever its status.
    pub async fn get(&self, url: &Url, accept: &str) -> Result<FetchedResponse, NavigationError> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| NavigationError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| NavigationError::Network(e.to_string()))?;

        Ok(FetchedResponse {
            status,
            content_type,
            body,
        })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedResponse, NavigationError> {
        let response = self.get(url, NAVIGATION_ACCEPT).await?;
        if !(200..300).contains(&response.status) {
            return Err(NavigationError::Status(response.status));
        }
        Ok(response)
    }
}
