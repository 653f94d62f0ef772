//! Rolling Metric Buffer
//!
//! Fixed-capacity FIFO of samples for one (target, metric) pair.
//! Push is O(1) amortized; min/max come from monotonic windows and
//! mean/stddev from running sums, all over the current contents only.

use std::collections::VecDeque;

use super::types::{MetricKind, MetricSnapshot, MetricStats, Sample};

/// Running sums are rebuilt from scratch after this many evictions × capacity
/// to keep floating-point drift bounded.
const RESYNC_FACTOR: usize = 4;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum BufferError {
    /// Sample belongs to a different (target, metric) pair
    Mismatch {
        expected: (String, MetricKind),
        got: (String, MetricKind),
    },
    /// NaN / infinite values are never stored
    NonFinite(MetricKind),
    /// No buffer exists for this pair
    UnknownSeries(String, MetricKind),
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mismatch { expected, got } => write!(
                f,
                "Sample for {}/{} pushed into {}/{} buffer",
                got.0, got.1, expected.0, expected.1
            ),
            Self::NonFinite(kind) => write!(f, "Non-finite {} value rejected", kind),
            Self::UnknownSeries(target, kind) => write!(f, "No buffer for {}/{}", target, kind),
        }
    }
}

impl std::error::Error for BufferError {}

// ============================================================================
// ROLLING BUFFER
// ============================================================================

#[derive(Debug, Clone)]
pub struct RollingBuffer {
    target_name: String,
    kind: MetricKind,
    capacity: usize,
    samples: VecDeque<Sample>,

    sum: f64,
    sum_sq: f64,
    evictions_since_resync: usize,

    /// (sequence, value), values increasing front to back
    min_window: VecDeque<(u64, f64)>,
    /// (sequence, value), values decreasing front to back
    max_window: VecDeque<(u64, f64)>,
    /// Sequence number the next pushed sample gets
    next_seq: u64,
}

impl RollingBuffer {
    /// `capacity` is clamped to at least 1; config validation rejects 0 earlier.
    pub fn new(target_name: impl Into<String>, kind: MetricKind, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            target_name: target_name.into(),
            kind,
            capacity,
            samples: VecDeque::with_capacity(capacity),
            sum: 0.0,
            sum_sq: 0.0,
            evictions_since_resync: 0,
            min_window: VecDeque::new(),
            max_window: VecDeque::new(),
            next_seq: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append a sample, evicting the single oldest entry first when full
    pub fn push(&mut self, sample: Sample) -> Result<(), BufferError> {
        if sample.target_name != self.target_name || sample.metric_kind != self.kind {
            return Err(BufferError::Mismatch {
                expected: (self.target_name.clone(), self.kind),
                got: (sample.target_name, sample.metric_kind),
            });
        }
        if !sample.value.is_finite() {
            return Err(BufferError::NonFinite(self.kind));
        }

        if self.samples.len() == self.capacity {
            self.evict_oldest();
        }

        let value = sample.value;
        let seq = self.next_seq;
        self.next_seq += 1;

        while self.min_window.back().map_or(false, |&(_, v)| v >= value) {
            self.min_window.pop_back();
        }
        self.min_window.push_back((seq, value));

        while self.max_window.back().map_or(false, |&(_, v)| v <= value) {
            self.max_window.pop_back();
        }
        self.max_window.push_back((seq, value));

        self.sum += value;
        self.sum_sq += value * value;
        self.samples.push_back(sample);

        Ok(())
    }

    fn evict_oldest(&mut self) {
        let oldest_seq = self.next_seq - self.samples.len() as u64;

        let Some(old) = self.samples.pop_front() else {
            return;
        };

        if self.min_window.front().map_or(false, |&(s, _)| s == oldest_seq) {
            self.min_window.pop_front();
        }
        if self.max_window.front().map_or(false, |&(s, _)| s == oldest_seq) {
            self.max_window.pop_front();
        }

        self.sum -= old.value;
        self.sum_sq -= old.value * old.value;
        self.evictions_since_resync += 1;

        if self.evictions_since_resync >= self.capacity * RESYNC_FACTOR {
            self.resync_sums();
        }
    }

    fn resync_sums(&mut self) {
        self.sum = self.samples.iter().map(|s| s.value).sum();
        self.sum_sq = self.samples.iter().map(|s| s.value * s.value).sum();
        self.evictions_since_resync = 0;
    }

    /// Immutable copy of the current stats
    pub fn snapshot(&self) -> MetricSnapshot {
        let Some(last) = self.samples.back() else {
            return MetricSnapshot::NoData;
        };

        let n = self.samples.len() as f64;
        let average = self.sum / n;
        let variance = (self.sum_sq / n - average * average).max(0.0);

        MetricSnapshot::Measured(MetricStats {
            current: last.value,
            average,
            min: self.min_window.front().map_or(last.value, |&(_, v)| v),
            max: self.max_window.front().map_or(last.value, |&(_, v)| v),
            stddev: variance.sqrt(),
            count: self.samples.len(),
        })
    }

    /// Copy of the contents, oldest first
    pub fn series(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: f64) -> Sample {
        Sample::new("origin", MetricKind::Latency, value)
    }

    #[test]
    fn test_empty_buffer_reports_no_data() {
        let buffer = RollingBuffer::new("origin", MetricKind::Latency, 10);
        assert_eq!(buffer.snapshot(), MetricSnapshot::NoData);
        assert!(buffer.series().is_empty());
    }

    #[test]
    fn test_measured_zero_is_not_no_data() {
        let mut buffer = RollingBuffer::new("origin", MetricKind::Latency, 10);
        buffer.push(sample(0.0)).unwrap();

        let snapshot = buffer.snapshot();
        assert!(!snapshot.is_no_data());
        assert_eq!(snapshot.average(), Some(0.0));
    }

    #[test]
    fn test_never_exceeds_capacity_and_keeps_latest_in_order() {
        // Deterministic pseudo-random sequence
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 1000) as f64 / 10.0
        };

        for capacity in [1usize, 2, 3, 7, 50] {
            let mut buffer = RollingBuffer::new("origin", MetricKind::Latency, capacity);
            let mut pushed = Vec::new();

            for _ in 0..(capacity * 9 + 3) {
                let v = next();
                pushed.push(v);
                buffer.push(sample(v)).unwrap();

                assert!(buffer.len() <= capacity);

                let start = pushed.len().saturating_sub(capacity);
                let expected = &pushed[start..];
                let actual: Vec<f64> = buffer.series().iter().map(|s| s.value).collect();
                assert_eq!(actual, expected);

                let stats = *buffer.snapshot().stats().unwrap();
                let naive_min = expected.iter().copied().fold(f64::INFINITY, f64::min);
                let naive_max = expected.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let naive_mean = expected.iter().sum::<f64>() / expected.len() as f64;

                assert_eq!(stats.min, naive_min);
                assert_eq!(stats.max, naive_max);
                assert!((stats.average - naive_mean).abs() < 1e-9);
                assert_eq!(stats.current, *expected.last().unwrap());
                assert_eq!(stats.count, expected.len());
            }
        }
    }

    #[test]
    fn test_stats_ignore_evicted_history() {
        let mut buffer = RollingBuffer::new("origin", MetricKind::Latency, 2);
        buffer.push(sample(500.0)).unwrap();
        buffer.push(sample(10.0)).unwrap();
        buffer.push(sample(20.0)).unwrap();

        let stats = *buffer.snapshot().stats().unwrap();
        assert_eq!(stats.max, 20.0);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.average, 15.0);
        assert_eq!(stats.stddev, 5.0);
    }

    #[test]
    fn test_rejects_foreign_and_non_finite_samples() {
        let mut buffer = RollingBuffer::new("origin", MetricKind::Latency, 4);

        let foreign = Sample::new("github", MetricKind::Latency, 1.0);
        assert!(matches!(buffer.push(foreign), Err(BufferError::Mismatch { .. })));

        let wrong_kind = Sample::new("origin", MetricKind::Jitter, 1.0);
        assert!(matches!(buffer.push(wrong_kind), Err(BufferError::Mismatch { .. })));

        assert_eq!(buffer.push(sample(f64::NAN)), Err(BufferError::NonFinite(MetricKind::Latency)));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_long_run_stays_accurate() {
        let mut buffer = RollingBuffer::new("origin", MetricKind::Latency, 3);
        for i in 0..10_000 {
            buffer.push(sample(1e6 + (i % 7) as f64 * 0.1)).unwrap();
        }
        let expected: f64 = buffer.series().iter().map(|s| s.value).sum::<f64>() / 3.0;
        let stats = *buffer.snapshot().stats().unwrap();
        assert!((stats.average - expected).abs() < 1e-6);
    }
}
