//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router (`POST /proxy`, `GET /health`)
//! - Wire up middleware (request ID, tracing, CORS, timeout, body limit)
//! - Guard `/proxy` with the shared-secret check
//! - Bind server to listener and shut down gracefully

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State},
    http::{header::CONTENT_TYPE, HeaderMap, Request},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::{require_api_key, Authenticator};
use crate::config::ProxyConfig;
use crate::error::{ProxyError, StartupError};
use crate::forward::{restore_relayed_headers, Dispatcher, ForwardPayload, ForwardRequest, Forwarder, Relay};
use crate::health;
use crate::http::request::{request_id, MakeRequestUuidV4};
use crate::observability::metrics;

/// Application state injected into handlers and middleware.
///
/// Everything in here is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub forwarder: Arc<Forwarder>,
}

impl AppState {
    pub fn new(authenticator: Authenticator, forwarder: Forwarder) -> Self {
        Self {
            authenticator: Arc::new(authenticator),
            forwarder: Arc::new(forwarder),
        }
    }
}

/// HTTP server for the forwarding proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        let authenticator = Authenticator::new(config.auth.api_key.clone());
        if !authenticator.is_configured() {
            tracing::warn!("API_KEY is not configured; every /proxy request will fail with 500");
        }

        let dispatcher = Dispatcher::new(&config.upstream)?;
        let state = AppState::new(authenticator, Forwarder::new(dispatcher));

        let router = build_router(&config, state);
        Ok(Self { router })
    }

    /// A handle on the fully layered router, e.g. for `tower::ServiceExt::oneshot`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );
        tracing::info!("POST to http://{}/proxy to forward requests", addr);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: &ProxyConfig, state: AppState) -> Router {
    let proxy_routes = Router::new()
        .route("/proxy", post(proxy_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    let mut router = Router::new()
        .route("/health", get(health::health))
        .merge(proxy_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

    if config.security.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }
    // Outside CORS so relayed upstream headers win over the CORS defaults.
    router = router.layer(middleware::map_response(restore_relayed_headers));

    router
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = %request_id(request.headers()),
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
}

/// `POST /proxy`. Authentication already happened in route middleware.
async fn proxy_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&headers).to_string();
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());

    let request = match ForwardPayload::from_body(content_type, &body).and_then(ForwardRequest::try_from) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "Invalid forwarding payload");
            metrics::record_forward("none", e.status().as_u16(), "invalid", start_time);
            return e.into_response();
        }
    };

    let method = request.method.clone();
    tracing::debug!(
        request_id = %request_id,
        method = %method,
        url = %request.url,
        "Forwarding request"
    );

    match state.forwarder.forward(request).await {
        Ok(relay) => {
            let status = relay.status();
            let outcome = match relay {
                Relay::Complete(_) => "relayed",
                Relay::Interrupted { .. } => "interrupted",
            };
            tracing::debug!(request_id = %request_id, status = %status, outcome, "Relaying upstream response");
            metrics::record_forward(&method, status.as_u16(), outcome, start_time);
            relay.into_response()
        }
        Err(e) => {
            let outcome = match e {
                ProxyError::ServiceUnavailable { .. } => "unreachable",
                _ => "setup_failed",
            };
            metrics::record_forward(&method, e.status().as_u16(), outcome, start_time);
            e.into_response()
        }
    }
}
