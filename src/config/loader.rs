//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, value } => {
                write!(f, "Invalid value for {}: '{}'", var, value)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Read a TOML file into a config without validating it.
pub fn read_config_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Build the effective configuration: defaults, then an optional file, then
/// the process environment, then validation.
pub fn load(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => ProxyConfig::default(),
    };
    apply_env(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts `std::env::var` so tests don't touch the real process
/// environment. Empty values are treated as unset.
pub fn apply_env<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = get("PORT") {
        config.listener.port = parse_var("PORT", &port)?;
    }
    if let Some(host) = get("HOST") {
        config.listener.host = host;
    }
    if let Some(key) = get("API_KEY") {
        config.auth.api_key = Some(key);
    }
    if let Some(secs) = get("UPSTREAM_TIMEOUT_SECS") {
        config.upstream.timeout_secs = Some(parse_var("UPSTREAM_TIMEOUT_SECS", &secs)?);
    }
    if let Some(flag) = get("UPSTREAM_SYSTEM_PROXY") {
        config.upstream.use_system_proxy = parse_var("UPSTREAM_SYSTEM_PROXY", &flag)?;
    }
    if let Some(secs) = get("REQUEST_TIMEOUT_SECS") {
        config.timeouts.request_secs = parse_var("REQUEST_TIMEOUT_SECS", &secs)?;
    }
    if let Some(bytes) = get("MAX_BODY_BYTES") {
        config.security.max_body_size = parse_var("MAX_BODY_BYTES", &bytes)?;
    }
    if let Some(flag) = get("CORS_ENABLED") {
        config.security.cors_enabled = parse_var("CORS_ENABLED", &flag)?;
    }
    if let Some(format) = get("LOG_FORMAT") {
        config.observability.log_format = parse_var("LOG_FORMAT", &format)?;
    }
    if let Some(addr) = get("METRICS_ADDRESS") {
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = addr;
    }

    Ok(())
}

fn parse_var<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var,
        value: value.to_string(),
    })
}
