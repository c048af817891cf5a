//! Navigation state machine.
//!
//! # States
//! ```text
//! idle ──intercept / pop_state──▶ loading ──complete(latest)──▶ idle
//!                                    │
//!                                    └──complete(stale)──▶ loading (unchanged)
//! ```
//!
//! Every navigation is stamped with a sequence number. Only the response
//! for the most recent one may touch the view, so a slow earlier response
//! can never overwrite a later navigation.

use url::Url;

use crate::navigator::document::FetchedPage;
use crate::navigator::fetch::NavigationError;

/// The visible page: content region, title and loading bar.
pub trait Viewport {
    fn set_content(&mut self, html: String);
    fn set_title(&mut self, title: String);
    fn set_loading(&mut self, loading: bool);
}

/// Browser session history.
pub trait History {
    fn push(&mut self, url: &Url);
}

/// What was clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    /// An anchor with its raw `href`.
    Anchor { href: String },
    /// Anything that is not an anchor.
    Other,
}

/// A navigation in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTicket {
    sequence: u64,
    url: Url,
}

impl NavigationTicket {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Where to fetch.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Outcome of completing a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The latest navigation succeeded and the view was swapped.
    Applied,
    /// The latest navigation failed; the view kept its content.
    Failed(NavigationError),
    /// A newer navigation was issued; nothing changed.
    Stale,
}

/// Client-side navigator over a view and a history.
#[derive(Debug)]
pub struct Navigator<V: Viewport, H: History> {
    location: Url,
    view: V,
    history: H,
    issued: u64,
}

impl<V: Viewport, H: History> Navigator<V, H> {
    pub fn new(location: Url, view: V, history: H) -> Self {
        Self {
            location,
            view,
            history,
            issued: 0,
        }
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Handle a click. Same-origin anchors start a navigation: the target
    /// is pushed onto history before anything is fetched. Everything else
    /// is left to the default action.
    pub fn intercept(&mut self, target: &ClickTarget) -> Option<NavigationTicket> {
        let ClickTarget::Anchor { href } = target else {
            return None;
        };
        let url = self.location.join(href).ok()?;
        if url.origin() != self.location.origin() {
            return None;
        }

        self.history.push(&url);
        Some(self.begin(url))
    }

    /// Handle a back/forward move to `path`. Nothing is pushed.
    pub fn pop_state(&mut self, path: &str) -> Result<NavigationTicket, NavigationError> {
        let url = self
            .location
            .join(path)
            .map_err(|_| NavigationError::InvalidTarget(path.to_string()))?;
        Ok(self.begin(url))
    }

    fn begin(&mut self, url: Url) -> NavigationTicket {
        self.issued += 1;
        self.location = url.clone();
        self.view.set_loading(true);
        tracing::debug!(sequence = self.issued, url = %url, "Navigation started");
        NavigationTicket {
            sequence: self.issued,
            url,
        }
    }

    /// Finish the navigation `ticket` with the fetch `result`.
    pub fn complete(
        &mut self,
        ticket: &NavigationTicket,
        result: Result<FetchedPage, NavigationError>,
    ) -> Completion {
        if ticket.sequence != self.issued {
            tracing::debug!(
                sequence = ticket.sequence,
                latest = self.issued,
                "Discarding stale navigation"
            );
            return Completion::Stale;
        }

        self.view.set_loading(false);
        match result {
            Ok(page) => {
                self.view.set_content(page.content);
                if let Some(title) = page.title {
                    self.view.set_title(title);
                }
                Completion::Applied
            }
            Err(error) => {
                tracing::error!(url = %ticket.url, error = %error, "Navigation error");
                Completion::Failed(error)
            }
        }
    }
}

/// In-memory view, used by the terminal client and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryViewport {
    pub content: String,
    pub title: String,
    pub loading: bool,
}

impl Viewport for MemoryViewport {
    fn set_content(&mut self, html: String) {
        self.content = html;
    }

    fn set_title(&mut self, title: String) {
        self.title = title;
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }
}

/// In-memory history stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryHistory {
    pub entries: Vec<Url>,
}

impl History for MemoryHistory {
    fn push(&mut self, url: &Url) {
        self.entries.push(url.clone());
    }
}
