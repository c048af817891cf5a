//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-IP token bucket, 429 when empty)
//!     → cors.rs (preflight + allow headers)
//!     → Pass to the page routes
//!
//! Outgoing response:
//!     → headers.rs (browser hardening headers, optional CSP)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Rejected requests never reach the handlers
//! - No trust in client input

pub mod cors;
pub mod headers;
pub mod rate_limit;

pub use cors::cors_layer;
pub use headers::{apply_security_headers, security_headers};
pub use rate_limit::{rate_limit_middleware, RateLimiter, RATE_LIMITED_MESSAGE};
