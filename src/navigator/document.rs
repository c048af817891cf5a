//! Turning a fetched response into content-region markup and a title.

use scraper::{ElementRef, Html, Selector};

use crate::navigator::fetch::{FetchedResponse, NavigationError};
use crate::routing::PagePayload;

/// What a successful navigation swaps into the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// New inner markup of the content region.
    pub content: String,
    /// New document title; `None` leaves the current one.
    pub title: Option<String>,
}

/// Reinterpret a title whose UTF-8 bytes were delivered as Latin-1
/// characters. Titles that are not such a mis-decoding come back as is.
pub fn decode_transport_title(title: &str) -> String {
    let bytes: Option<Vec<u8>> = title
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect();
    bytes
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| title.to_string())
}

/// Parse a response by its content type.
///
/// JSON bodies carry `{content, title}`. Anything else is parsed as an HTML
/// document: the element with id `region_id` supplies the content and
/// `<title>` the title. Without that element the whole body becomes the
/// content and the title is left alone.
pub fn parse_response(response: &FetchedResponse, region_id: &str) -> Result<FetchedPage, NavigationError> {
    if response.is_json() {
        let payload: PagePayload =
            serde_json::from_str(&response.body).map_err(|e| NavigationError::Decode(e.to_string()))?;
        return Ok(FetchedPage {
            content: payload.content,
            title: Some(decode_transport_title(&payload.title)),
        });
    }

    let document = Html::parse_document(&response.body);
    let region = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().id() == Some(region_id));

    match region {
        Some(region) => Ok(FetchedPage {
            content: region.inner_html(),
            title: Some(decode_transport_title(&document_title(&document))),
        }),
        None => Ok(FetchedPage {
            content: response.body.clone(),
            title: None,
        }),
    }
}

/// `document.title`: the first `<title>`, whitespace stripped and collapsed.
fn document_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|title| {
            title
                .text()
                .collect::<String>()
                .split_ascii_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}
