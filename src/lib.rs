//! Nixaweb: server-rendered pages with hardened HTML responses.

pub mod config;
pub mod hardening;
pub mod http;
pub mod lifecycle;
pub mod navigator;
pub mod observability;
pub mod render;
pub mod routing;
pub mod security;

pub use config::SiteConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
