//! Probe Module - Pluggable Measurement Primitives
//!
//! The engine never touches the network directly. Every measurement goes
//! through a [`Probe`] implementation supplied by the caller:
//! - `http.rs` - reqwest-based probe (HEAD latency, DoH JSON, ipapi)
//! - `types.rs` - Targets, DNS shapes, `ProbeError`
//!
//! All engine-side calls are wrapped in [`with_timeout`].

pub mod types;
pub mod http;

#[cfg(test)]
pub(crate) mod mock;

pub use types::{
    DnsAnswer,
    DnsResponse,
    ProbeError,
    PublicIpInfo,
    RecordType,
    Target,
    TargetKind,
};
pub use http::{HttpProbe, HttpProbeConfig};

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// External measurement capability.
///
/// Implementations are expected to respect caller deadlines, but the engine
/// enforces its own timeout around every call regardless.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Round-trip time of one lightweight request to `target`
    async fn measure_latency(&self, target: &Target) -> Result<Duration, ProbeError>;

    /// Observed bitrate (bits per second) transferring roughly `payload_size_hint` bytes
    async fn measure_bandwidth_sample(&self, payload_size_hint: u64) -> Result<f64, ProbeError>;

    /// Query the primary resolver
    async fn query_dns(&self, name: &str, record_type: RecordType) -> Result<DnsResponse, ProbeError>;

    /// Query a specific resolver. Probes with a single resolver can ignore `resolver`.
    async fn query_dns_at(
        &self,
        resolver: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<DnsResponse, ProbeError> {
        let _ = resolver;
        self.query_dns(name, record_type).await
    }

    async fn fetch_public_ip_metadata(&self) -> Result<PublicIpInfo, ProbeError>;
}

/// Run a probe future under a deadline, mapping expiry to `ProbeError::Timeout`
pub async fn with_timeout<T, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T, ProbeError>
where
    F: Future<Output = Result<T, ProbeError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout { operation, after: limit }),
    }
}
