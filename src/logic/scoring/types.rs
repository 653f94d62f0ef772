//! Scoring Types & Health Snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::logic::dns::{ChainLevel, DnsReport, SecurityFinding, Severity};
use crate::logic::metrics::{LatencyBurst, MetricKind, MetricSnapshot, Sample};
use crate::logic::topology::Topology;

/// Subtract `penalty` when the observed value is strictly above `above`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyStep {
    pub above: f64,
    pub penalty: u32,
}

impl PenaltyStep {
    pub const fn new(above: f64, penalty: u32) -> Self {
        Self { above, penalty }
    }
}

/// Weighted-penalty model. Approximate by construction; every number is configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoreWeights {
    pub high_finding: u32,
    pub medium_finding: u32,
    pub low_finding: u32,

    /// Applied cumulatively: crossing both steps costs both penalties
    pub latency_ms: [PenaltyStep; 2],
    pub packet_loss_pct: [PenaltyStep; 2],
    pub jitter_ms: [PenaltyStep; 2],

    pub min_bandwidth_kbps: f64,
    pub low_bandwidth_penalty: u32,

    pub unreachable_target: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            high_finding: 20,
            medium_finding: 10,
            low_finding: 5,
            latency_ms: [PenaltyStep::new(100.0, 20), PenaltyStep::new(200.0, 30)],
            packet_loss_pct: [PenaltyStep::new(1.0, 25), PenaltyStep::new(5.0, 50)],
            jitter_ms: [PenaltyStep::new(50.0, 15), PenaltyStep::new(100.0, 25)],
            min_bandwidth_kbps: 1000.0,
            low_bandwidth_penalty: 10,
            unreachable_target: 10,
        }
    }
}

impl ScoreWeights {
    pub fn finding_penalty(&self, severity: Severity) -> u32 {
        match severity {
            Severity::High => self.high_finding,
            Severity::Medium => self.medium_finding,
            Severity::Low => self.low_finding,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl PerformanceRating {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => PerformanceRating::Excellent,
            60..=79 => PerformanceRating::Good,
            40..=59 => PerformanceRating::Fair,
            _ => PerformanceRating::Poor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetHealth {
    pub reachable: bool,
    pub consecutive_failures: u32,
}

/// One aggregation tick's complete view. Never mutated once published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub timestamp: DateTime<Utc>,
    /// Monotonic per engine instance; 0 is the placeholder before the first tick
    pub sequence: u64,
    pub per_target_stats: BTreeMap<String, BTreeMap<MetricKind, MetricSnapshot>>,
    pub series: BTreeMap<String, BTreeMap<MetricKind, Vec<Sample>>>,
    pub targets: BTreeMap<String, TargetHealth>,
    pub latest_bursts: BTreeMap<String, LatencyBurst>,
    pub chain: Vec<ChainLevel>,
    pub findings: Vec<SecurityFinding>,
    pub dns: Option<DnsReport>,
    pub topology: Topology,
    pub score: u8,
    pub rating: PerformanceRating,
}

impl HealthSnapshot {
    /// Well-formed snapshot with no measurements yet
    pub fn empty(topology: Topology) -> Self {
        Self {
            timestamp: Utc::now(),
            sequence: 0,
            per_target_stats: BTreeMap::new(),
            series: BTreeMap::new(),
            targets: BTreeMap::new(),
            latest_bursts: BTreeMap::new(),
            chain: Vec::new(),
            findings: Vec::new(),
            dns: None,
            topology,
            score: 100,
            rating: PerformanceRating::Excellent,
        }
    }

    pub fn is_unreachable(&self, target: &str) -> bool {
        self.targets.get(target).map_or(false, |t| !t.reachable)
    }

    pub fn stats(&self, target: &str, kind: MetricKind) -> MetricSnapshot {
        self.per_target_stats
            .get(target)
            .and_then(|m| m.get(&kind))
            .copied()
            .unwrap_or(MetricSnapshot::NoData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bands() {
        assert_eq!(PerformanceRating::from_score(100), PerformanceRating::Excellent);
        assert_eq!(PerformanceRating::from_score(80), PerformanceRating::Excellent);
        assert_eq!(PerformanceRating::from_score(79), PerformanceRating::Good);
        assert_eq!(PerformanceRating::from_score(60), PerformanceRating::Good);
        assert_eq!(PerformanceRating::from_score(40), PerformanceRating::Fair);
        assert_eq!(PerformanceRating::from_score(39), PerformanceRating::Poor);
        assert_eq!(PerformanceRating::from_score(0), PerformanceRating::Poor);
    }

    #[test]
    fn test_empty_snapshot_serializes_camel_case() {
        let json = serde_json::to_value(HealthSnapshot::empty(Topology::default())).unwrap();
        assert_eq!(json["score"], 100);
        assert_eq!(json["rating"], "excellent");
        assert!(json["perTargetStats"].is_object());
        assert!(json["dns"].is_null());
    }

    #[test]
    fn test_partial_weights_json() {
        let weights: ScoreWeights = serde_json::from_str(r#"{"highFinding": 40}"#).unwrap();
        assert_eq!(weights.high_finding, 40);
        assert_eq!(weights.medium_finding, 10);
        assert_eq!(weights.latency_ms[1].above, 200.0);
    }
}
