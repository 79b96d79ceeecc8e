//! Copy an upstream outcome back to the caller.
//!
//! Status and body are relayed verbatim. Headers are copied one-to-one except
//! for the transport-framing set in [`EXCLUDED_HEADERS`], which describe the
//! proxy's own connection rather than the payload.

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::forward::dispatch::UpstreamResponse;

/// Upstream response headers never relayed to the caller.
pub const EXCLUDED_HEADERS: &[&str] = &["transfer-encoding", "connection", "keep-alive"];

pub fn is_excluded(name: &str) -> bool {
    EXCLUDED_HEADERS
        .iter()
        .any(|h| name.eq_ignore_ascii_case(h))
}

/// Upstream headers minus [`EXCLUDED_HEADERS`], repeats preserved.
pub fn filter_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream.iter() {
        if !is_excluded(name.as_str()) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

/// Relayed upstream headers, attached to the response as an extension.
///
/// Outer layers (CORS) may rewrite headers after the handler returns;
/// [`restore_relayed_headers`] puts the upstream's values back on top.
#[derive(Debug, Clone)]
pub struct RelayedHeaders(pub HeaderMap);

/// Response middleware: every header name the upstream sent carries exactly
/// the upstream's values. Headers the upstream did not send are left alone.
pub async fn restore_relayed_headers(mut response: Response) -> Response {
    let Some(RelayedHeaders(upstream)) = response.extensions_mut().remove::<RelayedHeaders>() else {
        return response;
    };

    let headers = response.headers_mut();
    for name in upstream.keys() {
        headers.remove(name);
    }
    for (name, value) in upstream.iter() {
        headers.append(name.clone(), value.clone());
    }
    response
}

/// What the forwarder hands back to the handler.
#[derive(Debug)]
pub enum Relay {
    /// Full upstream response: status, filtered headers, body.
    Complete(UpstreamResponse),
    /// The upstream gave a status but the transport broke afterwards.
    /// Status and received bytes only; no upstream headers.
    Interrupted { status: StatusCode, body: Bytes },
}

impl Relay {
    pub fn status(&self) -> StatusCode {
        match self {
            Relay::Complete(upstream) => upstream.status,
            Relay::Interrupted { status, .. } => *status,
        }
    }
}

impl IntoResponse for Relay {
    fn into_response(self) -> Response {
        match self {
            Relay::Complete(upstream) => {
                let headers = filter_headers(&upstream.headers);
                let mut response = Response::new(Body::from(upstream.body));
                *response.status_mut() = upstream.status;
                response.extensions_mut().insert(RelayedHeaders(headers.clone()));
                *response.headers_mut() = headers;
                response
            }
            Relay::Interrupted { status, body } => {
                let mut response = Response::new(Body::from(body));
                *response.status_mut() = status;
                response
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn upstream_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("connection", HeaderValue::from_static("keep-alive"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        headers.insert("x-custom", HeaderValue::from_static("kept"));
        headers
    }

    #[test]
    fn test_is_excluded_case_insensitive() {
        assert!(is_excluded("Transfer-Encoding"));
        assert!(is_excluded("CONNECTION"));
        assert!(is_excluded("keep-alive"));
        assert!(!is_excluded("content-length"));
        assert!(!is_excluded("upgrade"));
    }

    #[test]
    fn test_filter_headers_drops_framing_only() {
        let filtered = filter_headers(&upstream_headers());

        for name in EXCLUDED_HEADERS {
            assert!(filtered.get(*name).is_none(), "{} should be dropped", name);
        }
        assert_eq!(filtered.get("content-type").unwrap(), "text/plain");
        assert_eq!(filtered.get("x-custom").unwrap(), "kept");

        let cookies: Vec<_> = filtered.get_all("set-cookie").iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }

    #[tokio::test]
    async fn test_complete_relay_mirrors_upstream() {
        let relay = Relay::Complete(UpstreamResponse {
            status: StatusCode::IM_A_TEAPOT,
            headers: upstream_headers(),
            body: Bytes::from_static(b"\x00\xffraw"),
        });
        assert_eq!(relay.status(), StatusCode::IM_A_TEAPOT);

        let response = relay.into_response();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert!(response.headers().get("transfer-encoding").is_none());
        assert_eq!(response.headers().get("x-custom").unwrap(), "kept");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"\x00\xffraw");
    }

    #[tokio::test]
    async fn test_restore_puts_upstream_values_back() {
        let mut upstream = HeaderMap::new();
        upstream.insert("access-control-allow-origin", HeaderValue::from_static("https://app.example"));
        upstream.insert("vary", HeaderValue::from_static("Accept-Encoding"));

        let relay = Relay::Complete(UpstreamResponse {
            status: StatusCode::OK,
            headers: upstream,
            body: Bytes::new(),
        });
        let mut response = relay.into_response();

        // What a CORS layer does on the way out.
        let headers = response.headers_mut();
        headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
        headers.insert("access-control-expose-headers", HeaderValue::from_static("*"));
        headers.append("vary", HeaderValue::from_static("origin"));

        let response = restore_relayed_headers(response).await;
        let headers = response.headers();
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "https://app.example");
        let vary: Vec<_> = headers.get_all("vary").iter().collect();
        assert_eq!(vary, vec!["Accept-Encoding"]);
        assert_eq!(headers.get("access-control-expose-headers").unwrap(), "*");
        assert!(response.extensions().get::<RelayedHeaders>().is_none());
    }

    #[tokio::test]
    async fn test_restore_ignores_non_relayed_responses() {
        let mut response = Response::new(Body::empty());
        response
            .headers_mut()
            .insert("access-control-allow-origin", HeaderValue::from_static("*"));

        let response = restore_relayed_headers(response).await;
        assert_eq!(response.headers().get("access-control-allow-origin").unwrap(), "*");
    }

    #[tokio::test]
    async fn test_interrupted_relay_has_no_upstream_headers() {
        let relay = Relay::Interrupted {
            status: StatusCode::BAD_GATEWAY,
            body: Bytes::from_static(b"partial"),
        };

        let response = relay.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().is_empty());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"partial");
    }
}
