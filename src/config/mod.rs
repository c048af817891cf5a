//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SiteConfig (validated, immutable)
//!     → handed to startup, which builds every subsystem from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, parse_config, ConfigError};
pub use schema::{
    CompressionConfig, CompressionLevel, CorsConfig, HardeningConfig, ListenerConfig, LogFormat,
    ObfuscationProfile, ObservabilityConfig, RateLimitConfig, SecurityConfig, SiteConfig,
    StaticFilesConfig, StringArrayEncoding, TemplatesConfig, TimeoutConfig,
};
