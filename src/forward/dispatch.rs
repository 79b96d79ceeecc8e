//! Outbound HTTP dispatch.
//!
//! Exactly one attempt per forwarding request. Every status code the target
//! returns is a successful dispatch; only transport and local failures come
//! back as [`DispatchError`].

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use thiserror::Error;

use crate::config::UpstreamConfig;
use crate::error::error_chain;
use crate::forward::request::OutboundRequest;

/// A complete upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Why a dispatch did not produce a complete response.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The target answered with a status, then the transport failed.
    #[error("upstream response interrupted after status {status}: {reason}")]
    Interrupted {
        status: StatusCode,
        /// Body bytes received before the failure.
        body: Bytes,
        reason: String,
    },

    /// No response was received.
    #[error("{0}")]
    Unreachable(String),

    /// The outbound request could not be built.
    #[error("{0}")]
    Setup(String),
}

impl DispatchError {
    /// Sort a reqwest failure from `send()` into our three cases.
    fn classify(err: reqwest::Error) -> Self {
        if err.is_builder() {
            return DispatchError::Setup(error_chain(&err));
        }
        match err.status() {
            Some(status) => DispatchError::Interrupted {
                status,
                body: Bytes::new(),
                reason: error_chain(&err),
            },
            None => DispatchError::Unreachable(error_chain(&err)),
        }
    }
}

/// Shared outbound client. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
}

impl Dispatcher {
    /// Build the client. Timeouts left unset keep reqwest's defaults.
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub async fn dispatch(&self, request: OutboundRequest) -> Result<UpstreamResponse, DispatchError> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            DispatchError::Setup(format!("invalid HTTP method '{}': {}", request.method, e))
        })?;
        let headers = build_headers(&request)?;

        let mut builder = self.client.request(method, request.url).headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let mut response = builder.send().await.map_err(DispatchError::classify)?;
        let status = response.status();
        let headers = std::mem::take(response.headers_mut());

        let mut body = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => body.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => {
                    return Err(DispatchError::Interrupted {
                        status,
                        body: Bytes::from(body),
                        reason: error_chain(&e),
                    })
                }
            }
        }

        Ok(UpstreamResponse {
            status,
            headers,
            body: Bytes::from(body),
        })
    }
}

/// Copy caller headers into a `HeaderMap`, appending so repeats survive.
fn build_headers(request: &OutboundRequest) -> Result<HeaderMap, DispatchError> {
    let mut headers = HeaderMap::with_capacity(request.headers.len());
    for (name, value) in request.headers.iter() {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| DispatchError::Setup(format!("invalid header name '{}': {}", name, e)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| DispatchError::Setup(format!("invalid value for header '{}': {}", name, e)))?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}
