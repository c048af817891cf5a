//! End-to-end tests against a running page server.

mod common;

use common::{client, TestSite, CONTACT, INDEX};
use nixaweb::hardening::html::{tokenize, HtmlToken};
use nixaweb::navigator::{
    follow, ClickTarget, Completion, HttpFetcher, MemoryHistory, MemoryViewport, NavigationError, Navigator,
};
use nixaweb::routing::NOT_FOUND_MESSAGE;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

async fn get(site: &TestSite, path: &str, accept: Option<&str>) -> (StatusCode, String, String) {
    let mut request = client().get(site.url(path));
    if let Some(accept) = accept {
        request = request.header(ACCEPT, accept);
    }
    let response = request.send().await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default();
    (status, content_type, response.text().await.unwrap())
}

#[tokio::test]
async fn test_json_shape_is_raw_page_source() {
    let site = TestSite::start().await;

    let (status, content_type, body) = get(&site, "/contact", Some("application/json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("application/json"));

    let payload: Value = serde_json::from_str(&body).unwrap();
    let object = payload.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert_eq!(object["content"], CONTACT);
    assert_eq!(object["title"], "Contact");
    assert!(!object["content"].as_str().unwrap().contains("<main"));

    site.stop().await;
}

#[tokio::test]
async fn test_root_and_index_share_page_and_site_title() {
    let site = TestSite::start().await;

    let (_, _, root) = get(&site, "/", Some("application/json")).await;
    let (_, _, index) = get(&site, "/index", Some("application/json")).await;
    assert_eq!(root, index);
    let payload: Value = serde_json::from_str(&root).unwrap();
    assert_eq!(payload["title"], "Nixaut");
    assert_eq!(payload["content"], INDEX);

    site.stop().await;
}

#[tokio::test]
async fn test_trailing_slash_is_the_same_route() {
    let site = TestSite::start().await;

    let (_, _, with_slash) = get(&site, "/information/", Some("application/json")).await;
    let (_, _, without) = get(&site, "/information", Some("application/json")).await;
    assert_eq!(with_slash, without);

    site.stop().await;
}

#[tokio::test]
async fn test_unknown_routes_are_404_in_both_shapes() {
    let site = TestSite::start().await;

    for accept in [Some("application/json"), Some("text/html"), None] {
        let (status, content_type, body) = get(&site, "/nowhere", accept).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(content_type, "text/plain; charset=utf-8");
        assert_eq!(body, NOT_FOUND_MESSAGE);
    }
    // Files without the page extension are not routes.
    let (status, _, _) = get(&site, "/notes", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    site.stop().await;
}

#[tokio::test]
async fn test_html_shape_is_layout_wrapped_and_hardened() {
    let site = TestSite::start().await;

    let (status, content_type, body) = get(&site, "/contact", Some("application/json, text/html")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "text/html; charset=utf-8");

    assert!(body.starts_with("<!DOCTYPE html><html><head><title>Contact</title></head>"));
    assert!(body.contains("<div id=\"loading-bar\"></div><main id=\"content\"><h1>Contact</h1><script>"));

    let tokens = tokenize(&body).unwrap();
    assert!(!tokens.iter().any(|t| matches!(t, HtmlToken::Comment(_))));
    assert!(!tokens
        .iter()
        .any(|t| matches!(t, HtmlToken::Text(text) if text.trim().is_empty())));

    // The inline script was rewritten.
    assert!(!body.contains("greeting"));
    assert!(!body.contains("var greeting = 'hello';"));

    site.stop().await;
}

#[tokio::test]
async fn test_static_assets_are_served_unchanged() {
    let site = TestSite::start().await;

    let (status, _, body) = get(&site, "/public/site.js", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "// asset\nvar asset = 1;\n");

    site.stop().await;
}

#[tokio::test]
async fn test_hardening_can_be_disabled() {
    let site = TestSite::start_with(|config| config.hardening.enabled = false).await;

    let (_, _, body) = get(&site, "/contact", None).await;
    assert!(body.contains("<!-- shared layout -->"));
    assert!(body.contains("var greeting = 'hello';"));

    site.stop().await;
}

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let site = TestSite::start_with(|config| {
        config.security.rate_limit.max_requests = 2;
        config.security.rate_limit.window_secs = 3600;
    })
    .await;

    assert_eq!(get(&site, "/", None).await.0, StatusCode::OK);
    assert_eq!(get(&site, "/", None).await.0, StatusCode::OK);
    let (status, _, body) = get(&site, "/", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, "Rate limit exceeded");

    site.stop().await;
}

#[tokio::test]
async fn test_navigator_follows_links_against_live_server() {
    let site = TestSite::start().await;
    let fetcher = HttpFetcher::with_client(client());
    let mut navigator = Navigator::new(
        Url::parse(&site.url("/")).unwrap(),
        MemoryViewport {
            content: INDEX.into(),
            title: "Nixaut".into(),
            loading: false,
        },
        MemoryHistory::default(),
    );

    // Cross-origin links are not intercepted.
    assert!(navigator
        .intercept(&ClickTarget::Anchor {
            href: "https://example.com/contact".into()
        })
        .is_none());
    assert!(navigator.history().entries.is_empty());

    let ticket = navigator
        .intercept(&ClickTarget::Anchor {
            href: "/information".into(),
        })
        .unwrap();
    assert_eq!(follow(&mut navigator, &fetcher, &ticket, "content").await, Completion::Applied);
    assert_eq!(navigator.view().title, "Information");
    assert_eq!(navigator.view().content, "<h1>Information</h1><p>This is information page.</p>");
    assert_eq!(navigator.history().entries.len(), 1);

    // A 404 leaves the displayed page alone.
    let before = navigator.view().clone();
    let ticket = navigator
        .intercept(&ClickTarget::Anchor { href: "/missing".into() })
        .unwrap();
    let completion = follow(&mut navigator, &fetcher, &ticket, "content").await;
    assert_eq!(completion, Completion::Failed(NavigationError::Status(404)));
    assert_eq!(navigator.view(), &before);

    site.stop().await;
}
