//! Gateway Health API
//!
//! Reports the gateway process itself and the functions it hosts.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::GatewayState;

#[derive(Serialize)]
pub struct GlobalHealthReport {
    pub status: String,
    pub uptime_seconds: u64,
    pub functions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Handler for `GET /api/health`
pub async fn get_health(State(state): State<GatewayState>) -> Json<GlobalHealthReport> {
    Json(GlobalHealthReport {
        status: "ok".into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        functions: state.registry.names(),
        timestamp: Utc::now(),
    })
}
