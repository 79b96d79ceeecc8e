//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges. All errors are
//! collected rather than stopping at the first one.

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut push = |field, reason: &str| {
        errors.push(ValidationError {
            field,
            reason: reason.to_string(),
        })
    };

    if config.listener.host.trim().is_empty() {
        push("listener.host", "must not be empty");
    }
    if config.timeouts.request_secs == 0 {
        push("timeouts.request_secs", "must be greater than zero");
    }
    if config.upstream.timeout_secs == Some(0) {
        push("upstream.timeout_secs", "must be greater than zero when set");
    }
    if config.upstream.connect_timeout_secs == Some(0) {
        push("upstream.connect_timeout_secs", "must be greater than zero when set");
    }
    if config.security.max_body_size == 0 {
        push("security.max_body_size", "must be greater than zero");
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        push("observability.metrics_address", "must be a socket address");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
