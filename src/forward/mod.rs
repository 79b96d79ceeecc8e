//! Request forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! /proxy JSON body
//!     → request.rs (parse payload, validate url, normalize method, pick body)
//!     → dispatch.rs (one outbound call, tagged result)
//!     → relay.rs (status + filtered headers + body back to caller)
//! ```
//!
//! # Failure classification
//! - Interrupted: status received, transport broke → relay status and bytes
//! - Unreachable: no response → 503 with transport details
//! - Setup: request could not be built → 500

pub mod dispatch;
pub mod relay;
pub mod request;

pub use dispatch::{DispatchError, Dispatcher, UpstreamResponse};
pub use relay::{restore_relayed_headers, Relay, RelayedHeaders, EXCLUDED_HEADERS};
pub use request::{ForwardPayload, ForwardRequest, OutboundRequest};

use crate::error::ProxyError;

/// Dispatches validated requests and classifies the outcome.
#[derive(Debug, Clone)]
pub struct Forwarder {
    dispatcher: Dispatcher,
}

impl Forwarder {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn forward(&self, request: ForwardRequest) -> Result<Relay, ProxyError> {
        let url = request.url.clone();
        let outbound = request.into_outbound();

        match self.dispatcher.dispatch(outbound).await {
            Ok(upstream) => Ok(Relay::Complete(upstream)),
            Err(DispatchError::Interrupted { status, body, reason }) => {
                tracing::warn!(url = %url, status = %status, reason = %reason, "Upstream response interrupted");
                Ok(Relay::Interrupted { status, body })
            }
            Err(DispatchError::Unreachable(details)) => {
                tracing::warn!(url = %url, error = %details, "Target unreachable");
                Err(ProxyError::ServiceUnavailable { details })
            }
            Err(DispatchError::Setup(message)) => {
                tracing::error!(url = %url, error = %message, "Failed to build outbound request");
                Err(ProxyError::Internal(message))
            }
        }
    }
}
