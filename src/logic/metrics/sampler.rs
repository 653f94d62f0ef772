//! Metric Sampler
//!
//! One tick function per metric kind. Each tick fans out over all targets,
//! wraps every probe call in the configured deadline and only writes to the
//! store once the whole tick has finished. A tick interrupted by shutdown
//! writes nothing.
//!
//! Reachability follows latency ticks only. A latency tick with no successful
//! probe counts one failure and any success resets the count. Packet-loss and
//! jitter failures are logged but never counted, so a target losing every
//! packet stays reachable while its latency probes still answer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use super::stats;
use super::store::{MetricStore, ReachabilityTracker};
use super::types::{LatencyBurst, MetricKind, Sample};
use crate::constants::LINK_TARGET;
use crate::logic::config::ProbeSettings;
use crate::logic::engine::scheduler::Shutdown;
use crate::logic::probe::{with_timeout, Probe, Target};

pub struct MetricSampler {
    probe: Arc<dyn Probe>,
    targets: Vec<Target>,
    store: Arc<MetricStore>,
    reachability: Arc<ReachabilityTracker>,
    settings: ProbeSettings,
}

/// Wait for every task of a tick, or abort them all on shutdown.
/// `None` means the tick was interrupted and its results must be dropped.
async fn drain<T: Send + 'static>(mut set: JoinSet<T>, shutdown: &Shutdown) -> Option<Vec<T>> {
    let mut shutdown = shutdown.clone();
    let mut out = Vec::with_capacity(set.len());

    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => {
                set.shutdown().await;
                return None;
            }
            joined = set.join_next() => match joined {
                Some(Ok(value)) => out.push(value),
                Some(Err(e)) => log::error!("[Sampler] Probe task failed: {}", e),
                None => return Some(out),
            },
        }
    }
}

impl MetricSampler {
    pub fn new(
        probe: Arc<dyn Probe>,
        targets: Vec<Target>,
        store: Arc<MetricStore>,
        reachability: Arc<ReachabilityTracker>,
        settings: ProbeSettings,
    ) -> Self {
        Self {
            probe,
            targets,
            store,
            reachability,
            settings,
        }
    }

    fn record(&self, sample: Sample) {
        if let Err(e) = self.store.push(sample) {
            log::warn!("[Sampler] Dropped sample: {}", e);
        }
    }

    /// Count one failed latency tick for `target`.
    ///
    /// Only `latency_tick` calls this. Packet-loss and jitter ticks never
    /// change the reachability counter, whatever their outcome.
    fn record_failed_tick(&self, target: &str) {
        let failures = self.reachability.record_failure(target);
        log::debug!("[Sampler] latency tick for {} produced no data ({} in a row)", target, failures);
        if failures == self.reachability.threshold() {
            log::warn!("[Sampler] {} unreachable after {} failed ticks", target, failures);
        }
    }

    /// Sequential RTTs (ms) of the successful probes in a burst
    async fn rtt_series(&self, target: &Target, count: u32, spacing: Duration, operation: &'static str) -> Vec<f64> {
        let mut rtts = Vec::with_capacity(count as usize);

        for i in 0..count {
            if i > 0 && !spacing.is_zero() {
                tokio::time::sleep(spacing).await;
            }
            match with_timeout(operation, self.settings.timeout(), self.probe.measure_latency(target)).await {
                Ok(rtt) => rtts.push(stats::millis(rtt)),
                Err(e) => log::debug!("[Sampler] {} probe to {} failed: {}", operation, target.name, e),
            }
        }

        rtts
    }

    /// Run one burst per target concurrently
    async fn burst_all(
        self: &Arc<Self>,
        shutdown: &Shutdown,
        count: u32,
        spacing: Duration,
        operation: &'static str,
    ) -> Option<Vec<(String, Vec<f64>)>> {
        let mut set = JoinSet::new();
        for target in self.targets.iter().cloned() {
            let sampler = Arc::clone(self);
            set.spawn(async move {
                let rtts = sampler.rtt_series(&target, count, spacing, operation).await;
                (target.name, rtts)
            });
        }
        drain(set, shutdown).await
    }

    // ========================================================================
    // TICKS
    // ========================================================================

    /// Latency: mean of the successful probes of a burst, extremes kept per tick
    pub async fn latency_tick(self: &Arc<Self>, shutdown: &Shutdown) {
        let attempts = self.settings.latency_probes;
        let spacing = Duration::from_millis(self.settings.latency_spacing_ms);

        let Some(results) = self.burst_all(shutdown, attempts, spacing, "latency").await else {
            return;
        };

        for (name, rtts) in results {
            match LatencyBurst::from_rtts(&rtts, attempts) {
                Some(burst) => {
                    self.record(Sample::new(name.as_str(), MetricKind::Latency, burst.mean));
                    self.reachability.record_success(&name);
                    self.store.record_burst(&name, burst);
                }
                None => self.record_failed_tick(&name),
            }
        }
    }

    /// Packet loss: failed fraction of a concurrent probe batch
    pub async fn packet_loss_tick(self: &Arc<Self>, shutdown: &Shutdown) {
        let total = self.settings.packet_loss_probes;
        let timeout = self.settings.timeout();

        let mut set = JoinSet::new();
        for target in &self.targets {
            for _ in 0..total {
                let sampler = Arc::clone(self);
                let target = target.clone();
                set.spawn(async move {
                    let ok = with_timeout("packet_loss", timeout, sampler.probe.measure_latency(&target))
                        .await
                        .is_ok();
                    (target.name, ok)
                });
            }
        }

        let Some(results) = drain(set, shutdown).await else {
            return;
        };

        let mut successes: HashMap<String, u32> = HashMap::new();
        for (name, ok) in results {
            let entry = successes.entry(name).or_insert(0);
            if ok {
                *entry += 1;
            }
        }

        for target in &self.targets {
            let ok = successes.get(&target.name).copied().unwrap_or(0);
            if let Some(loss) = stats::packet_loss(ok, total) {
                self.record(Sample::new(target.name.as_str(), MetricKind::PacketLoss, loss));
            }
            if ok == 0 {
                log::debug!("[Sampler] packet loss batch for {} fully lost", target.name);
            }
        }
    }

    /// Jitter: mean absolute deviation within one burst, needs two successes
    pub async fn jitter_tick(self: &Arc<Self>, shutdown: &Shutdown) {
        let count = self.settings.jitter_probes;
        let spacing = Duration::from_millis(self.settings.jitter_spacing_ms);

        let Some(results) = self.burst_all(shutdown, count, spacing, "jitter").await else {
            return;
        };

        for (name, rtts) in results {
            if rtts.len() < 2 {
                log::debug!("[Sampler] jitter for {} skipped: {} successful probes", name, rtts.len());
                continue;
            }
            if let Some(jitter) = stats::mean_abs_deviation(&rtts) {
                self.record(Sample::new(name.as_str(), MetricKind::Jitter, jitter));
            }
        }
    }

    /// Bandwidth: mean kbit/s over the configured payload sizes, stored under `link`
    pub async fn bandwidth_tick(&self, shutdown: &Shutdown) {
        let mut shutdown = shutdown.clone();
        tokio::select! {
            biased;
            _ = shutdown.wait() => {}
            kbps = self.measure_bandwidth() => {
                if let Some(kbps) = kbps {
                    self.record(Sample::new(LINK_TARGET, MetricKind::Bandwidth, kbps));
                }
            }
        }
    }

    async fn measure_bandwidth(&self) -> Option<f64> {
        let timeout = self.settings.timeout();
        let mut samples = Vec::with_capacity(self.settings.bandwidth_payloads.len());

        for &size in &self.settings.bandwidth_payloads {
            match with_timeout("bandwidth", timeout, self.probe.measure_bandwidth_sample(size)).await {
                Ok(bps) if bps.is_finite() && bps > 0.0 => samples.push(bps / 1000.0),
                Ok(bps) => log::debug!("[Sampler] Ignoring bandwidth reading {} for {} bytes", bps, size),
                Err(e) => log::debug!("[Sampler] Bandwidth probe ({} bytes) failed: {}", size, e),
            }
        }

        stats::mean(&samples)
    }
}
