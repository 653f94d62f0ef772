//! Metric Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four sampled metric kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    /// Mean RTT of a probe burst (ms)
    Latency,
    /// Link throughput (kbit/s)
    Bandwidth,
    /// Failed fraction of a probe batch (0.0 - 1.0)
    PacketLoss,
    /// Mean absolute deviation of a probe burst (ms)
    Jitter,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Latency => "latency",
            MetricKind::Bandwidth => "bandwidth",
            MetricKind::PacketLoss => "packetLoss",
            MetricKind::Jitter => "jitter",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One measurement. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub target_name: String,
    pub metric_kind: MetricKind,
    pub value: f64,
    pub captured_at: DateTime<Utc>,
}

impl Sample {
    pub fn new(target_name: impl Into<String>, metric_kind: MetricKind, value: f64) -> Self {
        Self {
            target_name: target_name.into(),
            metric_kind,
            value,
            captured_at: Utc::now(),
        }
    }
}

/// Statistics over the current buffer contents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStats {
    pub current: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
    pub count: usize,
}

/// Copy-on-read view of a buffer. `NoData` means "never measured",
/// which is different from a measured zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum MetricSnapshot {
    NoData,
    Measured(MetricStats),
}

impl MetricSnapshot {
    pub fn is_no_data(&self) -> bool {
        matches!(self, MetricSnapshot::NoData)
    }

    pub fn stats(&self) -> Option<&MetricStats> {
        match self {
            MetricSnapshot::Measured(s) => Some(s),
            MetricSnapshot::NoData => None,
        }
    }

    pub fn average(&self) -> Option<f64> {
        self.stats().map(|s| s.average)
    }
}

/// Result of one latency burst. Extremes are kept for this tick only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyBurst {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub successes: u32,
    pub attempts: u32,
    pub captured_at: DateTime<Utc>,
}

impl LatencyBurst {
    /// Build from the successful RTTs (ms) of a burst. `None` when nothing succeeded.
    pub fn from_rtts(rtts: &[f64], attempts: u32) -> Option<Self> {
        let mean = super::stats::mean(rtts)?;
        let min = rtts.iter().copied().fold(f64::INFINITY, f64::min);
        let max = rtts.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            mean,
            min,
            max,
            successes: rtts.len() as u32,
            attempts,
            captured_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_serializes_distinctly() {
        let json = serde_json::to_value(MetricSnapshot::NoData).unwrap();
        assert_eq!(json["state"], "noData");

        let measured = MetricSnapshot::Measured(MetricStats {
            current: 0.0,
            average: 0.0,
            min: 0.0,
            max: 0.0,
            stddev: 0.0,
            count: 1,
        });
        let json = serde_json::to_value(measured).unwrap();
        assert_eq!(json["state"], "measured");
        assert_eq!(json["current"], 0.0);
    }

    #[test]
    fn test_latency_burst_extremes() {
        let burst = LatencyBurst::from_rtts(&[10.0, 30.0, 20.0], 5).unwrap();
        assert_eq!(burst.mean, 20.0);
        assert_eq!(burst.min, 10.0);
        assert_eq!(burst.max, 30.0);
        assert_eq!(burst.successes, 3);
        assert_eq!(burst.attempts, 5);

        assert!(LatencyBurst::from_rtts(&[], 5).is_none());
    }
}
