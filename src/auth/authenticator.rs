//! Shared-secret check for forwarding requests.

use axum::http::HeaderValue;
use subtle::ConstantTimeEq;

use crate::error::ProxyError;

/// Header carrying the caller's credential. Lookup is case-insensitive.
pub const API_KEY_HEADER: &str = "h-api-key";

pub const MISSING_SECRET: &str = "API_KEY environment variable is not configured";
pub const MISSING_CREDENTIAL: &str = "Missing credential header";
pub const INVALID_CREDENTIAL: &str = "Invalid credential";

/// Why a request was turned away. Used as a metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotConfigured,
    Missing,
    Invalid,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::NotConfigured => "not_configured",
            Rejection::Missing => "missing",
            Rejection::Invalid => "invalid",
        }
    }
}

impl From<Rejection> for ProxyError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::NotConfigured => ProxyError::Configuration(MISSING_SECRET.to_string()),
            Rejection::Missing => ProxyError::Unauthorized(MISSING_CREDENTIAL),
            Rejection::Invalid => ProxyError::Unauthorized(INVALID_CREDENTIAL),
        }
    }
}

/// Holds the configured secret for the lifetime of the process.
#[derive(Clone)]
pub struct Authenticator {
    secret: Option<String>,
}

impl Authenticator {
    /// An empty secret counts as not configured.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Check the value presented in [`API_KEY_HEADER`].
    pub fn verify(&self, presented: Option<&HeaderValue>) -> Result<(), Rejection> {
        let secret = self.secret.as_deref().ok_or(Rejection::NotConfigured)?;

        let presented = match presented {
            Some(value) if !value.is_empty() => value,
            _ => return Err(Rejection::Missing),
        };

        if bool::from(presented.as_bytes().ct_eq(secret.as_bytes())) {
            Ok(())
        } else {
            Err(Rejection::Invalid)
        }
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("configured", &self.is_configured())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(s: &str) -> HeaderValue {
        HeaderValue::from_str(s).unwrap()
    }

    #[test]
    fn test_accepts_matching_key() {
        let auth = Authenticator::new(Some("s3cret".into()));
        assert_eq!(auth.verify(Some(&value("s3cret"))), Ok(()));
    }

    #[test]
    fn test_rejects_missing_and_empty_header() {
        let auth = Authenticator::new(Some("s3cret".into()));
        assert_eq!(auth.verify(None), Err(Rejection::Missing));
        assert_eq!(auth.verify(Some(&value(""))), Err(Rejection::Missing));
    }

    #[test]
    fn test_rejects_wrong_key() {
        let auth = Authenticator::new(Some("s3cret".into()));
        assert_eq!(auth.verify(Some(&value("s3cre"))), Err(Rejection::Invalid));
        assert_eq!(auth.verify(Some(&value("s3cret!"))), Err(Rejection::Invalid));
        assert_eq!(auth.verify(Some(&value("S3CRET"))), Err(Rejection::Invalid));
    }

    #[test]
    fn test_unconfigured_secret_wins_over_caller_errors() {
        for secret in [None, Some(String::new())] {
            let auth = Authenticator::new(secret);
            assert!(!auth.is_configured());
            assert_eq!(auth.verify(None), Err(Rejection::NotConfigured));
            assert_eq!(
                auth.verify(Some(&value("anything"))),
                Err(Rejection::NotConfigured)
            );
        }
    }

    #[test]
    fn test_rejection_maps_to_proxy_error() {
        let err: ProxyError = Rejection::NotConfigured.into();
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), MISSING_SECRET);

        let err: ProxyError = Rejection::Invalid.into();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), INVALID_CREDENTIAL);
    }

    #[test]
    fn test_debug_hides_secret() {
        let auth = Authenticator::new(Some("s3cret".into()));
        assert!(!format!("{:?}", auth).contains("s3cret"));
    }
}
