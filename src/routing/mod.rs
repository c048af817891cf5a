//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     views/*.ejs + layout.ejs
//!     → registry.rs (scan, derive route keys, read sources)
//!     → Freeze as immutable RouteTable
//!     → Moved into PageRouter
//!
//! Incoming Request (path, Accept):
//!     → negotiation.rs (JSON or HTML shape)
//!     → router.rs (normalize, look up, derive title, compose)
//!     → Return: PageResponse (Json | Html | NotFound)
//! ```
//!
//! # Design Decisions
//! - Routes discovered at startup, immutable at runtime
//! - Exact-match lookup on the normalized path
//! - Deterministic: same input always yields the same response

pub mod negotiation;
pub mod registry;
pub mod router;

pub use negotiation::{ResponseShape, JSON_MEDIA_TYPE};
pub use registry::{route_key, Page, PageRegistry, RegistryError, RouteTable, INDEX_ROUTE};
pub use router::{derive_title, normalize_path, PagePayload, PageResponse, PageRouter, NOT_FOUND_MESSAGE};
