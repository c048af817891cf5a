//! Response middleware owned by the page server.

pub mod hardening;

pub use hardening::{harden_html_responses, is_html, HARDENING_FAILED_MESSAGE};
