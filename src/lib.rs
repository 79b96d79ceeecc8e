//! Authenticated single-endpoint HTTP forwarding proxy.
//!
//! Callers `POST /proxy` a JSON description of a request
//! (`{url, method?, headers?, body?}`) with a shared secret in `h-api-key`;
//! the proxy performs it and relays the target's status, headers and body.

pub mod auth;
pub mod config;
pub mod error;
pub mod forward;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use error::{ProxyError, StartupError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
