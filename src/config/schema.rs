//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the site.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the page server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Title used for the site root (`/index`).
    pub site_title: String,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Template discovery and layout settings.
    pub templates: TemplatesConfig,

    /// Static asset serving.
    pub static_files: StaticFilesConfig,

    /// Response hardening (obfuscation + minification).
    pub hardening: HardeningConfig,

    /// Response compression.
    pub compression: CompressionConfig,

    /// Security headers, CORS and rate limiting.
    pub security: SecurityConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_title: "Nixaut".to_string(),
            listener: ListenerConfig::default(),
            templates: TemplatesConfig::default(),
            static_files: StaticFilesConfig::default(),
            hardening: HardeningConfig::default(),
            compression: CompressionConfig::default(),
            security: SecurityConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Where pages and the shared layout live.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory scanned for page sources at startup.
    pub views_dir: String,

    /// Path of the shared layout template.
    pub layout_path: String,

    /// Page file extension, without the leading dot.
    pub extension: String,

    /// Element id of the content region inside the layout.
    pub content_region_id: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            views_dir: "templates/views".to_string(),
            layout_path: "templates/layout.ejs".to_string(),
            extension: "ejs".to_string(),
            content_region_id: "content".to_string(),
        }
    }
}

/// Static file serving configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Serve files from `dir` under `prefix`.
    pub enabled: bool,

    /// Directory on disk.
    pub dir: String,

    /// URL prefix (must start with `/`).
    pub prefix: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "public".to_string(),
            prefix: "/public".to_string(),
        }
    }
}

/// Response hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HardeningConfig {
    /// Run the hardening hook on HTML responses.
    pub enabled: bool,

    /// Largest HTML body the hook will buffer.
    pub max_body_bytes: usize,

    /// Script obfuscation profile.
    pub obfuscation: ObfuscationProfile,
}

impl Default for HardeningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_body_bytes: 8 * 1024 * 1024,
            obfuscation: ObfuscationProfile::default(),
        }
    }
}

/// Encoding applied to entries of the string array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StringArrayEncoding {
    None,
    Base64,
}

/// Fixed transformation profile for inline scripts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObfuscationProfile {
    /// Rename function-local bindings to hexadecimal names.
    pub rename_identifiers: bool,

    /// Move string literals into a lookup array.
    pub string_array: bool,

    /// Fraction of eligible strings moved into the array (0.0..=1.0).
    pub string_array_threshold: f64,

    /// Encoding of string array entries.
    pub string_array_encoding: StringArrayEncoding,

    /// Split long strings into concatenated chunks.
    pub split_strings: bool,

    /// Chunk length used by `split_strings`.
    pub split_strings_chunk_length: usize,

    /// Rewrite integer literals as arithmetic expressions.
    pub numbers_to_expressions: bool,

    /// Neutralise `console.*` inside the page.
    pub disable_console_output: bool,
}

impl Default for ObfuscationProfile {
    fn default() -> Self {
        Self {
            rename_identifiers: true,
            string_array: true,
            string_array_threshold: 0.1,
            string_array_encoding: StringArrayEncoding::Base64,
            split_strings: true,
            split_strings_chunk_length: 10,
            numbers_to_expressions: true,
            disable_console_output: true,
        }
    }
}

/// Compression level presets understood by tower-http.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Fastest,
    Default,
    Best,
}

/// Response compression configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Enable gzip/brotli compression.
    pub enabled: bool,

    /// Compression level.
    pub level: CompressionLevel,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: CompressionLevel::Best,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security response headers.
    pub headers_enabled: bool,

    /// Emit a default Content-Security-Policy header.
    pub content_security_policy: bool,

    /// Cross-origin resource sharing.
    pub cors: CorsConfig,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            headers_enabled: true,
            content_security_policy: false,
            cors: CorsConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; `"*"` allows any.
    pub allowed_origins: Vec<String>,

    /// Allowed request methods.
    pub allowed_methods: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "DELETE"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per client within one window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 120,
            window_secs: 60,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
