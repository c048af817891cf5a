//! Client navigation subsystem.
//!
//! The same protocol the browser agent (`public/js/navigation.js`) speaks,
//! expressed as a library so it can be driven from a terminal and tested.
//!
//! # Data Flow
//! ```text
//! click / popstate
//!     → state.rs (intercept same-origin anchors, push history, stamp ticket)
//!     → fetch.rs (GET with Accept: application/json, text/html)
//!     → document.rs (JSON payload or #content of the HTML document)
//!     → state.rs (swap view only if the ticket is still the latest)
//! ```
//!
//! # Design Decisions
//! - View and history are traits; the navigator owns no I/O
//! - Failures never touch the displayed content

pub mod document;
pub mod fetch;
pub mod state;

use url::Url;

pub use document::{decode_transport_title, parse_response, FetchedPage};
pub use fetch::{FetchedResponse, HttpFetcher, NavigationError, PageFetcher, NAVIGATION_ACCEPT};
pub use state::{
    ClickTarget, Completion, History, MemoryHistory, MemoryViewport, NavigationTicket, Navigator, Viewport,
};

/// Fetch `url` and extract the swap for the content region `region_id`.
pub async fn fetch_page<F: PageFetcher>(
    fetcher: &F,
    url: &Url,
    region_id: &str,
) -> Result<FetchedPage, NavigationError> {
    let response = fetcher.fetch(url).await?;
    parse_response(&response, region_id)
}

/// Fetch the page behind `ticket` and complete the navigation.
pub async fn follow<F, V, H>(
    navigator: &mut Navigator<V, H>,
    fetcher: &F,
    ticket: &NavigationTicket,
    region_id: &str,
) -> Completion
where
    F: PageFetcher,
    V: Viewport,
    H: History,
{
    let result = fetch_page(fetcher, ticket.url(), region_id).await;
    navigator.complete(ticket, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::future::Future;

    /// Answers from a fixed path → response table.
    struct ScriptedFetcher {
        pages: HashMap<String, Result<FetchedResponse, NavigationError>>,
    }

    impl PageFetcher for ScriptedFetcher {
        fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchedResponse, NavigationError>> + Send {
            let result = self
                .pages
                .get(url.path())
                .cloned()
                .unwrap_or(Err(NavigationError::Status(404)));
            async move { result }
        }
    }

    fn html(body: &str) -> Result<FetchedResponse, NavigationError> {
        Ok(FetchedResponse {
            status: 200,
            content_type: Some("text/html; charset=utf-8".into()),
            body: body.into(),
        })
    }

    fn fetcher() -> ScriptedFetcher {
        let mut pages = HashMap::new();
        pages.insert(
            "/contact".to_string(),
            html("<html><head><title>Contact</title></head><body><div id=\"content\"><p>mail</p></div></body></html>"),
        );
        pages.insert(
            "/down".to_string(),
            Err(NavigationError::Network("connection refused".into())),
        );
        ScriptedFetcher { pages }
    }

    fn navigator() -> Navigator<MemoryViewport, MemoryHistory> {
        Navigator::new(
            Url::parse("http://127.0.0.1:3000/").unwrap(),
            MemoryViewport {
                content: "<p>home</p>".into(),
                title: "Nixaut".into(),
                loading: false,
            },
            MemoryHistory::default(),
        )
    }

    #[tokio::test]
    async fn test_follow_swaps_content_region() {
        let mut nav = navigator();
        let ticket = nav
            .intercept(&ClickTarget::Anchor { href: "/contact".into() })
            .unwrap();

        assert_eq!(follow(&mut nav, &fetcher(), &ticket, "content").await, Completion::Applied);
        assert_eq!(nav.view().content, "<p>mail</p>");
        assert_eq!(nav.view().title, "Contact");
    }

    #[tokio::test]
    async fn test_network_failure_leaves_view() {
        let mut nav = navigator();
        let ticket = nav.intercept(&ClickTarget::Anchor { href: "/down".into() }).unwrap();

        let completion = follow(&mut nav, &fetcher(), &ticket, "content").await;
        assert!(matches!(completion, Completion::Failed(NavigationError::Network(_))));
        assert_eq!(nav.view().content, "<p>home</p>");
        assert!(!nav.view().loading);
    }
}
