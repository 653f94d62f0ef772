//! Engine Configuration
//!
//! Defaults come from `constants.rs`; an optional JSON file and then the
//! environment may override them. `validate()` is the only place a fatal
//! error can come from.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::constants::{self, env_flag, env_parse, env_string};
use crate::logic::probe::{Target, TargetKind};
use crate::logic::scoring::ScoreWeights;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no targets configured")]
    NoTargets,

    #[error("invalid buffer capacity {0} (expected 1..={})", constants::MAX_BUFFER_CAPACITY)]
    InvalidCapacity(usize),

    #[error("invalid {name} interval: must be greater than zero")]
    InvalidInterval { name: &'static str },

    #[error("duplicate target name: {0}")]
    DuplicateTarget(String),

    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============================================================================
// SECTIONS
// ============================================================================

/// Tick periods, milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IntervalConfig {
    pub latency_ms: u64,
    pub bandwidth_ms: u64,
    pub packet_loss_ms: u64,
    pub jitter_ms: u64,
    pub aggregation_ms: u64,
    pub dns_ms: u64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            latency_ms: constants::DEFAULT_LATENCY_INTERVAL_MS,
            bandwidth_ms: constants::DEFAULT_BANDWIDTH_INTERVAL_MS,
            packet_loss_ms: constants::DEFAULT_PACKET_LOSS_INTERVAL_MS,
            jitter_ms: constants::DEFAULT_JITTER_INTERVAL_MS,
            aggregation_ms: constants::DEFAULT_AGGREGATION_INTERVAL_MS,
            dns_ms: constants::DEFAULT_DNS_INTERVAL_MS,
        }
    }
}

impl IntervalConfig {
    fn named(&self) -> [(&'static str, u64); 6] {
        [
            ("latency", self.latency_ms),
            ("bandwidth", self.bandwidth_ms),
            ("packet loss", self.packet_loss_ms),
            ("jitter", self.jitter_ms),
            ("aggregation", self.aggregation_ms),
            ("dns", self.dns_ms),
        ]
    }
}

/// Probe batch shapes and deadline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProbeSettings {
    pub timeout_ms: u64,
    pub latency_probes: u32,
    pub latency_spacing_ms: u64,
    pub packet_loss_probes: u32,
    pub jitter_probes: u32,
    pub jitter_spacing_ms: u64,
    /// Bytes requested per bandwidth sample
    pub bandwidth_payloads: Vec<u64>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout_ms: constants::DEFAULT_PROBE_TIMEOUT_MS,
            latency_probes: constants::DEFAULT_LATENCY_PROBES,
            latency_spacing_ms: constants::DEFAULT_LATENCY_SPACING_MS,
            packet_loss_probes: constants::DEFAULT_PACKET_LOSS_PROBES,
            jitter_probes: constants::DEFAULT_JITTER_PROBES,
            jitter_spacing_ms: constants::DEFAULT_JITTER_SPACING_MS,
            bandwidth_payloads: constants::DEFAULT_BANDWIDTH_PAYLOADS.to_vec(),
        }
    }
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DnsSettings {
    /// DoH endpoints timed by the resolver performance check
    pub resolvers: Vec<String>,
    /// Pause between consecutive queries of one run
    pub query_delay_ms: u64,
    pub measure_resolvers: bool,
    /// `ANY` answers above this count are reported as amplification risk
    pub amplification_threshold: usize,
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self {
            resolvers: constants::DEFAULT_DOH_RESOLVERS.iter().map(|s| s.to_string()).collect(),
            query_delay_ms: constants::DEFAULT_DNS_QUERY_DELAY_MS,
            measure_resolvers: true,
            amplification_threshold: 10,
        }
    }
}

/// Path modeling options. The anycast range is a heuristic, not a measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TopologySettings {
    pub include_backbone: bool,
    pub anycast_min: usize,
    pub anycast_max: usize,
    /// Overrides local address detection
    pub local_address: Option<String>,
    pub gateway_address: Option<String>,
    pub connection_type: Option<String>,
    pub origin_lat: Option<f64>,
    pub origin_lon: Option<f64>,
}

impl Default for TopologySettings {
    fn default() -> Self {
        Self {
            include_backbone: true,
            anycast_min: 1,
            anycast_max: 4,
            local_address: None,
            gateway_address: None,
            connection_type: None,
            origin_lat: None,
            origin_lon: None,
        }
    }
}

// ============================================================================
// ENGINE CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub targets: Vec<Target>,
    /// Domain whose resolution chain is reconstructed
    pub domain: String,
    pub buffer_capacity: usize,
    /// Consecutive failed ticks before a target is reported unreachable
    pub unreachable_after: u32,
    pub intervals: IntervalConfig,
    pub probes: ProbeSettings,
    pub dns: DnsSettings,
    pub scoring: ScoreWeights,
    pub topology: TopologySettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            targets: default_targets(constants::DEFAULT_DOMAIN),
            domain: constants::DEFAULT_DOMAIN.to_string(),
            buffer_capacity: constants::DEFAULT_BUFFER_CAPACITY,
            unreachable_after: constants::DEFAULT_UNREACHABLE_AFTER,
            intervals: IntervalConfig::default(),
            probes: ProbeSettings::default(),
            dns: DnsSettings::default(),
            scoring: ScoreWeights::default(),
            topology: TopologySettings::default(),
        }
    }
}

/// Origin site plus the reference endpoints
pub fn default_targets(domain: &str) -> Vec<Target> {
    vec![
        Target::new("origin", format!("https://{}", domain), TargetKind::Origin),
        Target::new(
            "google-dns",
            "https://dns.google/resolve?name=google.com&type=A",
            TargetKind::Resolver,
        ),
        Target::new("cloudflare", "https://cloudflare.com", TargetKind::Cdn),
        Target::new("github", "https://github.com", TargetKind::Platform),
    ]
}

impl EngineConfig {
    /// Load a JSON file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Defaults, then `PATHSCOPE_CONFIG` (if set), then env overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env_string("PATHSCOPE_CONFIG") {
            Some(path) => {
                log::info!("[Config] Loading {}", path);
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `PATHSCOPE_*` overrides in place. Unparsable values are ignored.
    pub fn apply_env(&mut self) {
        if let Some(domain) = env_string("PATHSCOPE_DOMAIN") {
            // Keep the origin target pointing at the analysed domain
            for target in self.targets.iter_mut().filter(|t| t.kind == TargetKind::Origin) {
                if target.address == format!("https://{}", self.domain) {
                    target.address = format!("https://{}", domain);
                }
            }
            self.domain = domain;
        }
        if let Some(url) = env_string("PATHSCOPE_ORIGIN_URL") {
            for target in self.targets.iter_mut().filter(|t| t.kind == TargetKind::Origin) {
                target.address = url.clone();
            }
        }

        if let Some(v) = env_parse("PATHSCOPE_BUFFER_CAPACITY") {
            self.buffer_capacity = v;
        }
        if let Some(v) = env_parse("PATHSCOPE_UNREACHABLE_AFTER") {
            self.unreachable_after = v;
        }
        if let Some(v) = env_parse("PATHSCOPE_PROBE_TIMEOUT_MS") {
            self.probes.timeout_ms = v;
        }

        let intervals = [
            ("PATHSCOPE_LATENCY_INTERVAL_MS", &mut self.intervals.latency_ms),
            ("PATHSCOPE_BANDWIDTH_INTERVAL_MS", &mut self.intervals.bandwidth_ms),
            ("PATHSCOPE_PACKET_LOSS_INTERVAL_MS", &mut self.intervals.packet_loss_ms),
            ("PATHSCOPE_JITTER_INTERVAL_MS", &mut self.intervals.jitter_ms),
            ("PATHSCOPE_AGGREGATION_INTERVAL_MS", &mut self.intervals.aggregation_ms),
            ("PATHSCOPE_DNS_INTERVAL_MS", &mut self.intervals.dns_ms),
        ];
        for (key, slot) in intervals {
            if let Some(v) = env_parse(key) {
                *slot = v;
            }
        }

        if let Some(list) = env_string("PATHSCOPE_RESOLVERS") {
            self.dns.resolvers = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        self.dns.measure_resolvers = env_flag("PATHSCOPE_MEASURE_RESOLVERS", self.dns.measure_resolvers);

        if let Some(v) = env_string("PATHSCOPE_CONNECTION_TYPE") {
            self.topology.connection_type = Some(v);
        }
        if let Some(v) = env_string("PATHSCOPE_LOCAL_ADDRESS") {
            self.topology.local_address = Some(v);
        }
        if let Some(v) = env_string("PATHSCOPE_GATEWAY_ADDRESS") {
            self.topology.gateway_address = Some(v);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.name.is_empty() || target.name == constants::LINK_TARGET || !seen.insert(&target.name) {
                return Err(ConfigError::DuplicateTarget(target.name.clone()));
            }
        }

        if self.buffer_capacity == 0 || self.buffer_capacity > constants::MAX_BUFFER_CAPACITY {
            return Err(ConfigError::InvalidCapacity(self.buffer_capacity));
        }

        for (name, ms) in self.intervals.named() {
            if ms == 0 {
                return Err(ConfigError::InvalidInterval { name });
            }
        }
        if self.probes.timeout_ms == 0 {
            return Err(ConfigError::InvalidInterval { name: "probe timeout" });
        }

        if !is_valid_domain(&self.domain) {
            return Err(ConfigError::InvalidDomain(self.domain.clone()));
        }

        if self.unreachable_after == 0 {
            return Err(ConfigError::InvalidThreshold("unreachableAfter must be at least 1".to_string()));
        }
        if self.probes.latency_probes == 0 || self.probes.packet_loss_probes == 0 {
            return Err(ConfigError::InvalidThreshold("probe batches must not be empty".to_string()));
        }
        if self.probes.jitter_probes < 2 {
            return Err(ConfigError::InvalidThreshold("jitter needs at least 2 probes".to_string()));
        }
        if self.topology.anycast_min > self.topology.anycast_max {
            return Err(ConfigError::InvalidThreshold(format!(
                "anycast range [{}, {}] is empty",
                self.topology.anycast_min, self.topology.anycast_max
            )));
        }

        Ok(())
    }

    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.name.as_str())
    }
}

fn is_valid_domain(domain: &str) -> bool {
    // Letters, digits and hyphens per label, at least two labels
    match Regex::new(r"^(?i)([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}\.?$") {
        Ok(re) => domain.len() <= 253 && re.is_match(domain),
        Err(_) => false,
    }
}
