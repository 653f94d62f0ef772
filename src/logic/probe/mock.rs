//! Scripted in-memory probe for tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::types::{DnsAnswer, DnsResponse, ProbeError, PublicIpInfo, RecordType, Target};
use super::Probe;

/// What a scripted latency probe does
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Answer after this long
    Respond(Duration),
    /// Fail immediately
    Fail,
    /// Never answer (until the caller's deadline fires)
    Hang,
}

pub struct ScriptedProbe {
    latency_scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    default_step: Step,
    bandwidth_bps: Option<f64>,
    dns: HashMap<(String, RecordType), Result<DnsResponse, ProbeError>>,
    public_ip: Option<PublicIpInfo>,
    /// RCODE of every unscripted DNS reply
    default_rcode: u32,
    pub latency_calls: AtomicUsize,
    pub dns_calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self {
            latency_scripts: Mutex::new(HashMap::new()),
            default_step: Step::Respond(Duration::from_millis(20)),
            bandwidth_bps: Some(8_000_000.0),
            dns: HashMap::new(),
            public_ip: None,
            default_rcode: 0,
            latency_calls: AtomicUsize::new(0),
            dns_calls: AtomicUsize::new(0),
        }
    }

    pub fn default_step(mut self, step: Step) -> Self {
        self.default_step = step;
        self
    }

    /// Queue steps for a target; once exhausted the default step applies
    pub fn script(self, target: &str, steps: impl IntoIterator<Item = Step>) -> Self {
        self.latency_scripts
            .lock()
            .entry(target.to_string())
            .or_default()
            .extend(steps);
        self
    }

    pub fn push_steps(&self, target: &str, steps: impl IntoIterator<Item = Step>) {
        self.latency_scripts
            .lock()
            .entry(target.to_string())
            .or_default()
            .extend(steps);
    }

    pub fn bandwidth(mut self, bps: Option<f64>) -> Self {
        self.bandwidth_bps = bps;
        self
    }

    pub fn answers(mut self, name: &str, record_type: RecordType, data: &[&str]) -> Self {
        let answers = data
            .iter()
            .map(|d| DnsAnswer::new(name, record_type, *d))
            .collect();
        self.dns
            .insert((name.to_string(), record_type), Ok(DnsResponse::with_answers(answers)));
        self
    }

    pub fn dns_failure(mut self, name: &str, record_type: RecordType) -> Self {
        self.dns.insert(
            (name.to_string(), record_type),
            Err(ProbeError::Network("scripted failure".to_string())),
        );
        self
    }

    pub fn default_rcode(mut self, status: u32) -> Self {
        self.default_rcode = status;
        self
    }

    pub fn public_ip(mut self, info: PublicIpInfo) -> Self {
        self.public_ip = Some(info);
        self
    }

    fn next_step(&self, target: &str) -> Step {
        self.latency_scripts
            .lock()
            .get_mut(target)
            .and_then(|q| q.pop_front())
            .unwrap_or(self.default_step)
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn measure_latency(&self, target: &Target) -> Result<Duration, ProbeError> {
        self.latency_calls.fetch_add(1, Ordering::SeqCst);
        match self.next_step(&target.name) {
            Step::Respond(d) => {
                tokio::time::sleep(d).await;
                Ok(d)
            }
            Step::Fail => Err(ProbeError::Network("scripted failure".to_string())),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Duration::from_secs(3600))
            }
        }
    }

    async fn measure_bandwidth_sample(&self, _payload_size_hint: u64) -> Result<f64, ProbeError> {
        self.bandwidth_bps
            .ok_or_else(|| ProbeError::Network("scripted failure".to_string()))
    }

    async fn query_dns(&self, name: &str, record_type: RecordType) -> Result<DnsResponse, ProbeError> {
        self.dns_calls.fetch_add(1, Ordering::SeqCst);
        self.dns
            .get(&(name.to_string(), record_type))
            .cloned()
            .unwrap_or_else(|| {
                Ok(DnsResponse {
                    status: self.default_rcode,
                    ..Default::default()
                })
            })
    }

    async fn fetch_public_ip_metadata(&self) -> Result<PublicIpInfo, ProbeError> {
        self.public_ip
            .clone()
            .ok_or_else(|| ProbeError::Network("scripted failure".to_string()))
    }
}
