//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub running: bool,
    pub timestamp: i64,
}

pub async fn check(State(engine): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        running: engine.is_running(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
