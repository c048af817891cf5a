//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds, windows, chunk lengths)
//! - Validate addresses and URL prefixes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SiteConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderValue, Method};

use crate::config::schema::SiteConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("site_title must not be empty")]
    EmptySiteTitle,

    #[error("invalid {field} address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("templates.extension must be non-empty and must not start with '.': {0:?}")]
    InvalidExtension(String),

    #[error("templates.content_region_id must not be empty")]
    EmptyContentRegionId,

    #[error("static_files.prefix must start with '/', must not end with '/' and must not be the root: {0:?}")]
    InvalidStaticPrefix(String),

    #[error("hardening.obfuscation.string_array_threshold must be within 0..=1: {0}")]
    ThresholdOutOfRange(f64),

    #[error("hardening.obfuscation.split_strings_chunk_length must be at least 1")]
    ZeroChunkLength,

    #[error("security.rate_limit.{0} must be at least 1")]
    ZeroRateLimit(&'static str),

    #[error("invalid security.cors.{field} entry: {value:?}")]
    InvalidCorsEntry { field: &'static str, value: String },

    #[error("timeouts.request_secs must be at least 1")]
    ZeroRequestTimeout,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &SiteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.site_title.trim().is_empty() {
        errors.push(ValidationError::EmptySiteTitle);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let ext = &config.templates.extension;
    if ext.is_empty() || ext.starts_with('.') {
        errors.push(ValidationError::InvalidExtension(ext.clone()));
    }

    if config.templates.content_region_id.trim().is_empty() {
        errors.push(ValidationError::EmptyContentRegionId);
    }

    let prefix = &config.static_files.prefix;
    if config.static_files.enabled && (!prefix.starts_with('/') || prefix.ends_with('/')) {
        errors.push(ValidationError::InvalidStaticPrefix(
            config.static_files.prefix.clone(),
        ));
    }

    let profile = &config.hardening.obfuscation;
    if !(0.0..=1.0).contains(&profile.string_array_threshold) {
        errors.push(ValidationError::ThresholdOutOfRange(
            profile.string_array_threshold,
        ));
    }
    if profile.split_strings_chunk_length == 0 {
        errors.push(ValidationError::ZeroChunkLength);
    }

    let cors = &config.security.cors;
    for origin in &cors.allowed_origins {
        if origin != "*" && HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::InvalidCorsEntry {
                field: "allowed_origins",
                value: origin.clone(),
            });
        }
    }
    for method in &cors.allowed_methods {
        if method.parse::<Method>().is_err() {
            errors.push(ValidationError::InvalidCorsEntry {
                field: "allowed_methods",
                value: method.clone(),
            });
        }
    }

    let rate_limit = &config.security.rate_limit;
    if rate_limit.enabled {
        if rate_limit.max_requests == 0 {
            errors.push(ValidationError::ZeroRateLimit("max_requests"));
        }
        if rate_limit.window_secs == 0 {
            errors.push(ValidationError::ZeroRateLimit("window_secs"));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
