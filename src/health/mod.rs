//! Liveness probe.
//!
//! `GET /health` answers without authentication and without touching any
//! upstream, so it only reports that the process is serving requests.

use axum::Json;
use serde::Serialize;

/// Name reported in the health body.
pub const SERVICE_NAME: &str = "proxy-server";

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        service: SERVICE_NAME,
    })
}
