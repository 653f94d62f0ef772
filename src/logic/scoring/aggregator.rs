//! Aggregator & Snapshot Publishing
//!
//! The aggregator is the only reader that composes a snapshot from the
//! metric store and the latest DNS/topology analysis. Publishing swaps one
//! `Arc` so readers see either the old or the new snapshot, never a mix.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use super::score::{compute_score, ScoreInputs};
use super::types::{HealthSnapshot, PerformanceRating, ScoreWeights, TargetHealth};
use crate::logic::dns::DnsReport;
use crate::logic::metrics::{MetricStore, ReachabilityTracker};
use crate::logic::topology::Topology;

// ============================================================================
// LATEST ANALYSIS
// ============================================================================

/// Output of the last DNS/topology run, reused until the next run replaces it
pub struct LatestAnalysis {
    dns: RwLock<Option<Arc<DnsReport>>>,
    topology: RwLock<Arc<Topology>>,
}

impl LatestAnalysis {
    pub fn new(topology: Topology) -> Self {
        Self {
            dns: RwLock::new(None),
            topology: RwLock::new(Arc::new(topology)),
        }
    }

    pub fn replace(&self, report: DnsReport, topology: Topology) {
        *self.dns.write() = Some(Arc::new(report));
        *self.topology.write() = Arc::new(topology);
    }

    pub fn dns(&self) -> Option<Arc<DnsReport>> {
        self.dns.read().clone()
    }

    pub fn topology(&self) -> Arc<Topology> {
        self.topology.read().clone()
    }
}

// ============================================================================
// PUBLISHER
// ============================================================================

pub struct SnapshotPublisher {
    tx: watch::Sender<Arc<HealthSnapshot>>,
}

impl SnapshotPublisher {
    pub fn new(initial: HealthSnapshot) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    pub fn publish(&self, snapshot: HealthSnapshot) {
        self.tx.send_replace(Arc::new(snapshot));
    }

    pub fn current(&self) -> Arc<HealthSnapshot> {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<Arc<HealthSnapshot>> {
        self.tx.subscribe()
    }
}

// ============================================================================
// AGGREGATOR
// ============================================================================

pub struct Aggregator {
    store: Arc<MetricStore>,
    reachability: Arc<ReachabilityTracker>,
    analysis: Arc<LatestAnalysis>,
    publisher: Arc<SnapshotPublisher>,
    weights: ScoreWeights,
    sequence: AtomicU64,
}

impl Aggregator {
    pub fn new(
        store: Arc<MetricStore>,
        reachability: Arc<ReachabilityTracker>,
        analysis: Arc<LatestAnalysis>,
        publisher: Arc<SnapshotPublisher>,
        weights: ScoreWeights,
    ) -> Self {
        // Continue numbering from whatever the publisher already holds
        let sequence = AtomicU64::new(publisher.current().sequence);
        Self {
            store,
            reachability,
            analysis,
            publisher,
            weights,
            sequence,
        }
    }

    pub fn compose(&self) -> HealthSnapshot {
        let per_target_stats = self.store.snapshot_all();
        let series = self.store.series_all();

        let failures = self.reachability.failure_counts();
        let targets: BTreeMap<String, TargetHealth> = failures
            .into_iter()
            .map(|(name, consecutive_failures)| {
                let reachable = !self.reachability.is_unreachable(&name);
                (name, TargetHealth { reachable, consecutive_failures })
            })
            .collect();

        let dns = self.analysis.dns();
        let (chain, findings) = dns
            .as_ref()
            .map(|r| (r.chain.clone(), r.findings.clone()))
            .unwrap_or_default();

        let inputs = ScoreInputs::from_stats(&per_target_stats, &targets);
        let score = compute_score(&inputs, &findings, &self.weights);

        HealthSnapshot {
            timestamp: Utc::now(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            per_target_stats,
            series,
            targets,
            latest_bursts: self.store.latest_bursts(),
            chain,
            findings,
            dns: dns.map(|r| (*r).clone()),
            topology: (*self.analysis.topology()).clone(),
            score,
            rating: PerformanceRating::from_score(score),
        }
    }

    pub fn tick(&self) {
        let snapshot = self.compose();
        log::trace!("[Aggregator] Published #{} score={}", snapshot.sequence, snapshot.score);
        self.publisher.publish(snapshot);
    }
}
