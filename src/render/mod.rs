//! Page rendering subsystem.
//!
//! # Data Flow
//! ```text
//! layout.ejs (read once at startup)
//!     → layout.rs (parse into literals + slots)
//!     → Layout (immutable)
//!
//! Per request (HTML shape only):
//!     Layout + page content + derived title
//!     → compose()
//!     → full HTML document, handed to the hardening hook
//! ```
//!
//! # Design Decisions
//! - Exactly one level of layout nesting; pages are not templates
//! - Composition never performs I/O

pub mod layout;

pub use layout::{escape_html, Layout, LayoutError, SlotName};
