//! Engine - Lifecycle Controller
//!
//! An [`Engine`] owns everything of one telemetry run: metric buffers,
//! reachability counters, the latest DNS/topology analysis and the published
//! snapshot. `start` spawns one periodic task per metric kind plus the DNS
//! and aggregation tasks; `stop` cancels them and waits until they are gone.
//!
//! The last published snapshot stays readable after `stop`.

pub mod scheduler;


use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use self::scheduler::{shutdown_channel, spawn_periodic, Shutdown};
use crate::logic::config::{ConfigError, EngineConfig};
use crate::logic::dns::{DnsChainReconstructor, DnsReport};
use crate::logic::metrics::{MetricSampler, MetricStore, ReachabilityTracker};
use crate::logic::probe::{with_timeout, Probe, RecordType};
use crate::logic::scoring::{Aggregator, HealthSnapshot, LatestAnalysis, SnapshotPublisher};
use crate::logic::topology::{OriginFacts, Topology, TopologyInference};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("engine is already running")]
    AlreadyRunning,

    #[error("no data directory available for export")]
    NoExportDir,

    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Handles of one `start` .. `stop` run
struct Running {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
    config: EngineConfig,
}

pub struct Engine {
    publisher: Arc<SnapshotPublisher>,
    dns_trigger: Arc<Notify>,
    running: Mutex<Option<Running>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Idle engine publishing a placeholder snapshot
    pub fn new() -> Self {
        Self {
            publisher: Arc::new(SnapshotPublisher::new(HealthSnapshot::empty(Topology::default()))),
            dns_trigger: Arc::new(Notify::new()),
            running: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Config of the current run
    pub fn config(&self) -> Option<EngineConfig> {
        self.running.lock().as_ref().map(|r| r.config.clone())
    }

    /// Validate `config` and spawn every periodic task.
    ///
    /// Must be called from within a tokio runtime. A configuration error is
    /// the only failure; probe problems only ever degrade the snapshot.
    pub fn start(&self, config: EngineConfig, probe: Arc<dyn Probe>) -> Result<(), EngineError> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(EngineError::AlreadyRunning);
        }
        config.validate()?;

        let names: Vec<&str> = config.target_names().collect();
        let store = Arc::new(MetricStore::new(names.iter().copied(), config.buffer_capacity));
        let reachability = Arc::new(ReachabilityTracker::new(names.iter().copied(), config.unreachable_after));

        let inference = Arc::new(TopologyInference::with_default_tables(config.topology.clone()));
        let origin = OriginFacts {
            domain: Some(config.domain.clone()),
            ..Default::default()
        };
        let initial_topology = inference.infer(&inference.detect_connection(), None, &origin);
        let analysis = Arc::new(LatestAnalysis::new(initial_topology));

        let sampler = Arc::new(MetricSampler::new(
            Arc::clone(&probe),
            config.targets.clone(),
            Arc::clone(&store),
            Arc::clone(&reachability),
            config.probes.clone(),
        ));
        let aggregator = Arc::new(Aggregator::new(
            store,
            reachability,
            Arc::clone(&analysis),
            Arc::clone(&self.publisher),
            config.scoring.clone(),
        ));
        let analysis_task = Arc::new(AnalysisTask {
            reconstructor: DnsChainReconstructor::with_defaults(
                Arc::clone(&probe),
                config.dns.clone(),
                config.probes.timeout(),
                &config.topology,
            ),
            inference,
            probe,
            domain: config.domain.clone(),
            timeout: config.probes.timeout(),
            analysis,
        });

        let (shutdown_tx, shutdown) = shutdown_channel();
        let intervals = &config.intervals;
        let mut handles = Vec::with_capacity(6);

        let s = Arc::clone(&sampler);
        handles.push(spawn_periodic(
            "latency",
            Duration::from_millis(intervals.latency_ms),
            shutdown.clone(),
            None,
            move |sd| {
                let s = Arc::clone(&s);
                async move { s.latency_tick(&sd).await }
            },
        ));

        let s = Arc::clone(&sampler);
        handles.push(spawn_periodic(
            "packet_loss",
            Duration::from_millis(intervals.packet_loss_ms),
            shutdown.clone(),
            None,
            move |sd| {
                let s = Arc::clone(&s);
                async move { s.packet_loss_tick(&sd).await }
            },
        ));

        let s = Arc::clone(&sampler);
        handles.push(spawn_periodic(
            "jitter",
            Duration::from_millis(intervals.jitter_ms),
            shutdown.clone(),
            None,
            move |sd| {
                let s = Arc::clone(&s);
                async move { s.jitter_tick(&sd).await }
            },
        ));

        let s = sampler;
        handles.push(spawn_periodic(
            "bandwidth",
            Duration::from_millis(intervals.bandwidth_ms),
            shutdown.clone(),
            None,
            move |sd| {
                let s = Arc::clone(&s);
                async move { s.bandwidth_tick(&sd).await }
            },
        ));

        handles.push(spawn_periodic(
            "dns",
            Duration::from_millis(intervals.dns_ms),
            shutdown.clone(),
            Some(Arc::clone(&self.dns_trigger)),
            move |sd| {
                let task = Arc::clone(&analysis_task);
                async move { task.run(sd).await }
            },
        ));

        handles.push(spawn_periodic(
            "aggregation",
            Duration::from_millis(intervals.aggregation_ms),
            shutdown,
            None,
            move |_| {
                let a = Arc::clone(&aggregator);
                async move { a.tick() }
            },
        ));

        log::info!(
            "[Engine] Started: {} targets, domain {}, buffer capacity {}",
            config.targets.len(),
            config.domain,
            config.buffer_capacity
        );

        *running = Some(Running {
            shutdown_tx,
            handles,
            config,
        });
        Ok(())
    }

    /// Cancel in-flight probes and wait for every task to finish.
    ///
    /// Once this returns no task holds the probe any more. Stopping an idle
    /// engine is a no-op.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        let Some(running) = running else {
            return;
        };

        let _ = running.shutdown_tx.send(true);
        for handle in running.handles {
            if let Err(e) = handle.await {
                log::error!("[Engine] Task ended abnormally: {}", e);
            }
        }

        log::info!("[Engine] Stopped");
    }

    /// Latest published snapshot
    pub fn current_snapshot(&self) -> Arc<HealthSnapshot> {
        self.publisher.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<HealthSnapshot>> {
        self.publisher.subscribe()
    }

    /// Run the DNS/topology analysis now instead of waiting for its interval.
    /// Returns false when the engine is not running.
    pub fn request_dns_refresh(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.dns_trigger.notify_one();
        true
    }

    /// Current snapshot as pretty JSON
    pub fn export(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(&*self.current_snapshot())?)
    }

    /// Write the current snapshot to `<dir>/pathscope-snapshot-<timestamp>.json`.
    ///
    /// Without `dir` the platform's local data directory is used.
    pub fn export_to_file(&self, dir: Option<&Path>) -> Result<PathBuf, EngineError> {
        let dir = match dir {
            Some(d) => d.to_path_buf(),
            None => dirs::data_local_dir()
                .ok_or(EngineError::NoExportDir)?
                .join("pathscope"),
        };
        std::fs::create_dir_all(&dir)?;

        let snapshot = self.current_snapshot();
        let name = format!(
            "pathscope-snapshot-{}.json",
            snapshot.timestamp.format("%Y%m%d-%H%M%S")
        );
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_vec_pretty(&*snapshot)?)?;

        log::info!("[Engine] Exported snapshot #{} to {}", snapshot.sequence, path.display());
        Ok(path)
    }
}

// ============================================================================
// DNS + TOPOLOGY TASK
// ============================================================================

struct AnalysisTask {
    reconstructor: DnsChainReconstructor,
    inference: Arc<TopologyInference>,
    probe: Arc<dyn Probe>,
    domain: String,
    timeout: Duration,
    analysis: Arc<LatestAnalysis>,
}

impl AnalysisTask {
    /// One reconstruction run. An interrupted run leaves the previous analysis in place.
    async fn run(&self, mut shutdown: Shutdown) {
        tokio::select! {
            biased;
            _ = shutdown.wait() => {}
            (report, topology) = self.analyse() => {
                log::info!(
                    "[DNS] {}: {} chain levels, {} findings",
                    report.domain,
                    report.chain.len(),
                    report.findings.len()
                );
                self.analysis.replace(report, topology);
            }
        }
    }

    async fn analyse(&self) -> (DnsReport, Topology) {
        let report = self.reconstructor.reconstruct(&self.domain).await;

        let public_ip = match with_timeout("public_ip", self.timeout, self.probe.fetch_public_ip_metadata()).await {
            Ok(info) => Some(info),
            Err(e) => {
                log::debug!("[Topology] Public IP lookup failed: {}", e);
                None
            }
        };

        let origin = OriginFacts {
            domain: Some(report.domain.clone()),
            serving_ips: report
                .records_of(RecordType::A)
                .iter()
                .map(|r| r.data.clone())
                .collect(),
            lat: None,
            lon: None,
        };
        let connection = self.inference.detect_connection();
        let topology = self.inference.infer(&connection, public_ip.as_ref(), &origin);

        (report, topology)
    }
}
