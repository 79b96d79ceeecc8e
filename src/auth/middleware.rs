use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::authenticator::API_KEY_HEADER;
use crate::error::ProxyError;
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Route middleware guarding `/proxy`. Runs before the handler's extractors,
/// so an unauthenticated body is never parsed.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match state.authenticator.verify(request.headers().get(API_KEY_HEADER)) {
        Ok(()) => next.run(request).await,
        Err(rejection) => {
            tracing::warn!(
                request_id = %request_id(request.headers()),
                reason = rejection.as_str(),
                "Rejected forwarding request"
            );
            metrics::record_auth_rejection(rejection.as_str());
            ProxyError::from(rejection).into_response()
        }
    }
}
