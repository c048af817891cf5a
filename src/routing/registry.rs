//! Page discovery.
//!
//! # Responsibilities
//! - Enumerate page sources in the views directory
//! - Derive a route key for each (`contact.ejs` → `/contact`)
//! - Read the shared layout
//! - Freeze everything into an immutable `RouteTable`
//!
//! # Design Decisions
//! - Runs synchronously during startup, before the listener is bound
//! - Any I/O failure is fatal: no partial tables
//! - Entries that are not regular files, or lack the extension, are ignored

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::TemplatesConfig;
use crate::render::{Layout, LayoutError};

/// Route key of the site root.
pub const INDEX_ROUTE: &str = "/index";

/// Error type for page discovery.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read views directory {path}: {source}")]
    ViewsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read page {path}: {source}")]
    Page {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read layout {path}: {source}")]
    LayoutRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid layout {path}: {source}")]
    LayoutParse {
        path: PathBuf,
        #[source]
        source: LayoutError,
    },
}

/// A page discovered at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    route: String,
    source: Arc<str>,
}

impl Page {
    pub fn new(route: impl Into<String>, source: impl Into<Arc<str>>) -> Self {
        Self {
            route: route.into(),
            source: source.into(),
        }
    }

    /// Route key, always starting with `/`.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Raw, unrendered page source.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Route key → page mapping plus the shared layout.
///
/// Built once, then only read.
#[derive(Debug, Clone)]
pub struct RouteTable {
    pages: HashMap<String, Page>,
    layout: Layout,
}

impl RouteTable {
    /// Assemble a table from already loaded pages.
    pub fn new(pages: impl IntoIterator<Item = Page>, layout: Layout) -> Self {
        let pages = pages
            .into_iter()
            .map(|page| (page.route.clone(), page))
            .collect();
        Self { pages, layout }
    }

    /// Look up a page by normalized route key.
    pub fn get(&self, route: &str) -> Option<&Page> {
        self.pages.get(route)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Route keys in sorted order.
    pub fn routes(&self) -> Vec<&str> {
        let mut routes: Vec<&str> = self.pages.keys().map(String::as_str).collect();
        routes.sort_unstable();
        routes
    }
}

/// Derive a route key from a file name, if it carries the page extension.
pub fn route_key(file_name: &str, extension: &str) -> Option<String> {
    let stem = file_name.strip_suffix(extension)?.strip_suffix('.')?;
    Some(format!("/{stem}"))
}

/// Scans the views directory and loads the layout.
pub struct PageRegistry;

impl PageRegistry {
    /// Build the route table from the configured template locations.
    pub fn build(config: &TemplatesConfig) -> Result<RouteTable, RegistryError> {
        let layout = Self::load_layout(Path::new(&config.layout_path))?;
        let pages = Self::scan(Path::new(&config.views_dir), &config.extension)?;

        let table = RouteTable::new(pages, layout);
        tracing::info!(
            views_dir = %config.views_dir,
            pages = table.len(),
            routes = ?table.routes(),
            "Page registry built"
        );
        Ok(table)
    }

    /// Read and parse the shared layout.
    pub fn load_layout(path: &Path) -> Result<Layout, RegistryError> {
        let source = fs::read_to_string(path).map_err(|source| RegistryError::LayoutRead {
            path: path.to_path_buf(),
            source,
        })?;
        Layout::parse(&source).map_err(|source| RegistryError::LayoutParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load every `*.<extension>` file in `dir`.
    pub fn scan(dir: &Path, extension: &str) -> Result<Vec<Page>, RegistryError> {
        let views_err = |source: std::io::Error| RegistryError::ViewsDir {
            path: dir.to_path_buf(),
            source,
        };

        let mut pages = Vec::new();
        for entry in fs::read_dir(dir).map_err(views_err)? {
            let entry = entry.map_err(views_err)?;
            let file_type = entry.file_type().map_err(views_err)?;
            if !file_type.is_file() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                tracing::warn!(file = ?file_name, "Skipping page with non UTF-8 file name");
                continue;
            };
            let Some(route) = route_key(name, extension) else {
                continue;
            };

            let path = entry.path();
            let source = fs::read_to_string(&path)
                .map_err(|source| RegistryError::Page { path: path.clone(), source })?;
            tracing::debug!(route = %route, path = %path.display(), "Page loaded");
            pages.push(Page::new(route, source));
        }
        Ok(pages)
    }
}
