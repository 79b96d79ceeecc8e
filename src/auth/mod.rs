//! Caller authentication.
//!
//! A single pre-shared key, configured once at startup, gates every `/proxy`
//! request. `/health` is not behind this check.

pub mod authenticator;
pub mod middleware;

pub use authenticator::{Authenticator, Rejection, API_KEY_HEADER};
pub use middleware::require_api_key;
