//! Metric Store
//!
//! Owns every rolling buffer of an engine instance plus the per-target
//! consecutive-failure counters. The set of series is fixed at construction.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};

use super::buffer::{BufferError, RollingBuffer};
use super::types::{LatencyBurst, MetricKind, MetricSnapshot, Sample};
use crate::constants::LINK_TARGET;

/// Metrics sampled per configured target
pub const PER_TARGET_KINDS: [MetricKind; 3] = [
    MetricKind::Latency,
    MetricKind::PacketLoss,
    MetricKind::Jitter,
];

type SeriesKey = (String, MetricKind);

pub struct MetricStore {
    buffers: HashMap<SeriesKey, Mutex<RollingBuffer>>,
    /// Latest latency burst per target, tick-only extremes
    bursts: Mutex<BTreeMap<String, LatencyBurst>>,
    capacity: usize,
}

impl MetricStore {
    /// One buffer per (target, latency|packetLoss|jitter) plus the link bandwidth series
    pub fn new<'a>(target_names: impl IntoIterator<Item = &'a str>, capacity: usize) -> Self {
        let mut buffers = HashMap::new();

        for name in target_names {
            for kind in PER_TARGET_KINDS {
                buffers.insert(
                    (name.to_string(), kind),
                    Mutex::new(RollingBuffer::new(name, kind, capacity)),
                );
            }
        }
        buffers.insert(
            (LINK_TARGET.to_string(), MetricKind::Bandwidth),
            Mutex::new(RollingBuffer::new(LINK_TARGET, MetricKind::Bandwidth, capacity)),
        );

        Self {
            buffers,
            bursts: Mutex::new(BTreeMap::new()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, sample: Sample) -> Result<(), BufferError> {
        let key = (sample.target_name.clone(), sample.metric_kind);
        match self.buffers.get(&key) {
            Some(buffer) => buffer.lock().push(sample),
            None => Err(BufferError::UnknownSeries(key.0, key.1)),
        }
    }

    pub fn snapshot(&self, target: &str, kind: MetricKind) -> MetricSnapshot {
        self.buffers
            .get(&(target.to_string(), kind))
            .map(|b| b.lock().snapshot())
            .unwrap_or(MetricSnapshot::NoData)
    }

    pub fn series(&self, target: &str, kind: MetricKind) -> Vec<Sample> {
        self.buffers
            .get(&(target.to_string(), kind))
            .map(|b| b.lock().series())
            .unwrap_or_default()
    }

    pub fn record_burst(&self, target: &str, burst: LatencyBurst) {
        self.bursts.lock().insert(target.to_string(), burst);
    }

    pub fn latest_bursts(&self) -> BTreeMap<String, LatencyBurst> {
        self.bursts.lock().clone()
    }

    /// Every series' stats, grouped by target (sorted for stable export)
    pub fn snapshot_all(&self) -> BTreeMap<String, BTreeMap<MetricKind, MetricSnapshot>> {
        let mut out: BTreeMap<String, BTreeMap<MetricKind, MetricSnapshot>> = BTreeMap::new();
        for ((target, kind), buffer) in &self.buffers {
            out.entry(target.clone())
                .or_default()
                .insert(*kind, buffer.lock().snapshot());
        }
        out
    }

    /// Every series' raw samples, grouped like [`snapshot_all`](Self::snapshot_all)
    pub fn series_all(&self) -> BTreeMap<String, BTreeMap<MetricKind, Vec<Sample>>> {
        let mut out: BTreeMap<String, BTreeMap<MetricKind, Vec<Sample>>> = BTreeMap::new();
        for ((target, kind), buffer) in &self.buffers {
            out.entry(target.clone())
                .or_default()
                .insert(*kind, buffer.lock().series());
        }
        out
    }
}

// ============================================================================
// REACHABILITY
// ============================================================================

/// Consecutive full-tick failure counters per target
pub struct ReachabilityTracker {
    failures: HashMap<String, AtomicU32>,
    threshold: u32,
}

impl ReachabilityTracker {
    pub fn new<'a>(target_names: impl IntoIterator<Item = &'a str>, threshold: u32) -> Self {
        Self {
            failures: target_names
                .into_iter()
                .map(|n| (n.to_string(), AtomicU32::new(0)))
                .collect(),
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Returns the new consecutive-failure count
    pub fn record_failure(&self, target: &str) -> u32 {
        self.failures
            .get(target)
            .map(|c| c.fetch_add(1, Ordering::SeqCst).saturating_add(1))
            .unwrap_or(0)
    }

    pub fn record_success(&self, target: &str) {
        if let Some(c) = self.failures.get(target) {
            c.store(0, Ordering::SeqCst);
        }
    }

    pub fn consecutive_failures(&self, target: &str) -> u32 {
        self.failures
            .get(target)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn is_unreachable(&self, target: &str) -> bool {
        self.consecutive_failures(target) >= self.threshold
    }

    /// `target -> reachable`, sorted
    pub fn reachability(&self) -> BTreeMap<String, bool> {
        self.failures
            .keys()
            .map(|name| (name.clone(), !self.is_unreachable(name)))
            .collect()
    }

    /// `target -> consecutive failed ticks`, sorted
    pub fn failure_counts(&self) -> BTreeMap<String, u32> {
        self.failures
            .iter()
            .map(|(name, c)| (name.clone(), c.load(Ordering::SeqCst)))
            .collect()
    }
}
