//! Snapshot handlers (read-only)

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::AppState;
use crate::logic::scoring::{HealthSnapshot, PerformanceRating};
use crate::logic::topology::Topology;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub score: u8,
    pub rating: PerformanceRating,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub unreachable_targets: Vec<String>,
    pub findings: usize,
}

/// Full latest snapshot
pub async fn get(State(engine): State<AppState>) -> Json<HealthSnapshot> {
    Json(engine.current_snapshot().as_ref().clone())
}

pub async fn score(State(engine): State<AppState>) -> Json<ScoreResponse> {
    let snapshot = engine.current_snapshot();

    Json(ScoreResponse {
        score: snapshot.score,
        rating: snapshot.rating,
        sequence: snapshot.sequence,
        timestamp: snapshot.timestamp,
        unreachable_targets: snapshot
            .targets
            .iter()
            .filter(|(_, t)| !t.reachable)
            .map(|(name, _)| name.clone())
            .collect(),
        findings: snapshot.findings.len(),
    })
}

pub async fn topology(State(engine): State<AppState>) -> Json<Topology> {
    Json(engine.current_snapshot().topology.clone())
}
