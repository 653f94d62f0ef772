//! Health score: start at 100, subtract penalties, clamp to [0, 100]

use std::collections::BTreeMap;

use super::types::{PenaltyStep, ScoreWeights, TargetHealth};
use crate::constants::LINK_TARGET;
use crate::logic::dns::SecurityFinding;
use crate::logic::metrics::{stats, MetricKind, MetricSnapshot};

/// Aggregated inputs. `None` means no data, which costs nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreInputs {
    pub latency_ms: Option<f64>,
    pub packet_loss_pct: Option<f64>,
    pub jitter_ms: Option<f64>,
    pub bandwidth_kbps: Option<f64>,
    pub unreachable_targets: usize,
}

impl ScoreInputs {
    /// Means over targets that have data
    pub fn from_stats(
        stats_by_target: &BTreeMap<String, BTreeMap<MetricKind, MetricSnapshot>>,
        targets: &BTreeMap<String, TargetHealth>,
    ) -> Self {
        let mean_of = |kind: MetricKind| -> Option<f64> {
            let averages: Vec<f64> = stats_by_target
                .iter()
                .filter(|(name, _)| name.as_str() != LINK_TARGET)
                .filter_map(|(_, metrics)| metrics.get(&kind).and_then(|s| s.average()))
                .collect();
            stats::mean(&averages)
        };

        let bandwidth_kbps = stats_by_target
            .get(LINK_TARGET)
            .and_then(|m| m.get(&MetricKind::Bandwidth))
            .and_then(|s| s.average());

        Self {
            latency_ms: mean_of(MetricKind::Latency),
            packet_loss_pct: mean_of(MetricKind::PacketLoss).map(|ratio| ratio * 100.0),
            jitter_ms: mean_of(MetricKind::Jitter),
            bandwidth_kbps,
            unreachable_targets: targets.values().filter(|t| !t.reachable).count(),
        }
    }
}

fn steps_penalty(value: Option<f64>, steps: &[PenaltyStep]) -> u32 {
    let Some(value) = value else {
        return 0;
    };
    steps
        .iter()
        .filter(|s| value > s.above)
        .map(|s| s.penalty)
        .sum()
}

pub fn compute_score(inputs: &ScoreInputs, findings: &[SecurityFinding], weights: &ScoreWeights) -> u8 {
    let mut penalty: u64 = 0;

    penalty += findings
        .iter()
        .map(|f| weights.finding_penalty(f.severity) as u64)
        .sum::<u64>();

    penalty += steps_penalty(inputs.latency_ms, &weights.latency_ms) as u64;
    penalty += steps_penalty(inputs.packet_loss_pct, &weights.packet_loss_pct) as u64;
    penalty += steps_penalty(inputs.jitter_ms, &weights.jitter_ms) as u64;

    if inputs.bandwidth_kbps.map_or(false, |kbps| kbps < weights.min_bandwidth_kbps) {
        penalty += weights.low_bandwidth_penalty as u64;
    }

    penalty += inputs.unreachable_targets as u64 * weights.unreachable_target as u64;

    100u64.saturating_sub(penalty) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::dns::Severity;

    fn finding(severity: Severity) -> SecurityFinding {
        SecurityFinding {
            category: "test".into(),
            severity,
            title: "t".into(),
            detail: "d".into(),
        }
    }

    #[test]
    fn test_clean_run_scores_100() {
        let score = compute_score(&ScoreInputs::default(), &[], &ScoreWeights::default());
        assert_eq!(score, 100);
    }

    #[test]
    fn test_reference_penalties() {
        let weights = ScoreWeights::default();
        let inputs = ScoreInputs {
            latency_ms: Some(150.0),
            packet_loss_pct: Some(2.0),
            jitter_ms: Some(10.0),
            bandwidth_kbps: Some(5000.0),
            unreachable_targets: 0,
        };
        // -20 latency, -25 loss, -5 low finding
        assert_eq!(compute_score(&inputs, &[finding(Severity::Low)], &weights), 50);

        let inputs = ScoreInputs {
            latency_ms: Some(250.0),
            ..Default::default()
        };
        assert_eq!(compute_score(&inputs, &[], &weights), 50);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let weights = ScoreWeights::default();
        let inputs = ScoreInputs {
            latency_ms: Some(100.0),
            packet_loss_pct: Some(1.0),
            jitter_ms: Some(50.0),
            bandwidth_kbps: Some(1000.0),
            unreachable_targets: 0,
        };
        assert_eq!(compute_score(&inputs, &[], &weights), 100);
    }

    #[test]
    fn test_clamped_at_zero() {
        let weights = ScoreWeights::default();
        let findings: Vec<_> = (0..10).map(|_| finding(Severity::High)).collect();
        let inputs = ScoreInputs {
            packet_loss_pct: Some(50.0),
            unreachable_targets: 4,
            ..Default::default()
        };
        assert_eq!(compute_score(&inputs, &findings, &weights), 0);
    }

    #[test]
    fn test_monotonic_in_findings_and_metrics() {
        let weights = ScoreWeights::default();
        let severities = [Severity::Low, Severity::Medium, Severity::High];

        let mut findings = Vec::new();
        let mut last = compute_score(&ScoreInputs::default(), &findings, &weights);
        for i in 0..12 {
            findings.push(finding(severities[i % 3]));
            let next = compute_score(&ScoreInputs::default(), &findings, &weights);
            assert!(next <= last);
            last = next;
        }

        let mut last = 100;
        for latency in [0.0, 50.0, 100.0, 100.1, 150.0, 200.0, 200.1, 1000.0] {
            let inputs = ScoreInputs {
                latency_ms: Some(latency),
                ..Default::default()
            };
            let next = compute_score(&inputs, &[], &weights);
            assert!(next <= last, "latency {} raised the score", latency);
            last = next;
        }

        let mut last = 100;
        for bandwidth in [10_000.0, 1000.0, 999.0, 1.0] {
            let inputs = ScoreInputs {
                bandwidth_kbps: Some(bandwidth),
                ..Default::default()
            };
            let next = compute_score(&inputs, &[], &weights);
            assert!(next <= last);
            last = next;
        }
    }

    #[test]
    fn test_inputs_from_stats_skip_no_data() {
        use crate::logic::metrics::MetricStats;

        let measured = |v: f64| {
            MetricSnapshot::Measured(MetricStats {
                current: v,
                average: v,
                min: v,
                max: v,
                stddev: 0.0,
                count: 1,
            })
        };

        let mut stats_by_target = BTreeMap::new();
        stats_by_target.insert(
            "origin".to_string(),
            BTreeMap::from([
                (MetricKind::Latency, measured(120.0)),
                (MetricKind::PacketLoss, measured(0.1)),
                (MetricKind::Jitter, MetricSnapshot::NoData),
            ]),
        );
        stats_by_target.insert(
            "github".to_string(),
            BTreeMap::from([(MetricKind::Latency, measured(40.0))]),
        );
        stats_by_target.insert(
            LINK_TARGET.to_string(),
            BTreeMap::from([(MetricKind::Bandwidth, measured(800.0))]),
        );

        let mut targets = BTreeMap::new();
        targets.insert("origin".to_string(), TargetHealth { reachable: true, consecutive_failures: 0 });
        targets.insert("github".to_string(), TargetHealth { reachable: false, consecutive_failures: 3 });

        let inputs = ScoreInputs::from_stats(&stats_by_target, &targets);
        assert_eq!(inputs.latency_ms, Some(80.0));
        assert!((inputs.packet_loss_pct.unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(inputs.jitter_ms, None);
        assert_eq!(inputs.bandwidth_kbps, Some(800.0));
        assert_eq!(inputs.unreachable_targets, 1);
    }
}
