//! DNS report handlers

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::logic::dns::DnsReport;

/// Latest reconstruction run
pub async fn get(State(engine): State<AppState>) -> ApiResult<Json<DnsReport>> {
    engine
        .current_snapshot()
        .dns
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No DNS analysis has completed yet".to_string()))
}

/// Queue an out-of-schedule reconstruction run
pub async fn refresh(State(engine): State<AppState>) -> ApiResult<(StatusCode, Json<Value>)> {
    if !engine.request_dns_refresh() {
        return Err(ApiError::NotRunning);
    }
    log::info!("[API] DNS refresh requested");
    Ok((StatusCode::ACCEPTED, Json(json!({ "accepted": true }))))
}
