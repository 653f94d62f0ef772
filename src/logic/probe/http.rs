//! HTTP Probe
//!
//! reqwest-based implementation of [`Probe`]:
//! - latency: HEAD request with a cache-busting query parameter
//! - bandwidth: timed GET of a sized payload
//! - DNS: DNS-over-HTTPS JSON API (`application/dns-json`)
//! - public IP: ipapi-style JSON endpoint

use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};

use super::types::{DnsAnswer, DnsResponse, ProbeError, PublicIpInfo, RecordType, Target};
use super::Probe;
use crate::constants;

/// HTTP probe configuration
#[derive(Debug, Clone)]
pub struct HttpProbeConfig {
    /// DoH JSON resolvers; the first one answers `query_dns`
    pub resolvers: Vec<String>,
    pub public_ip_url: String,
    pub bandwidth_url: String,
    /// Client-level backstop; the engine applies its own tighter deadline
    pub timeout_seconds: u64,
}

impl Default for HttpProbeConfig {
    fn default() -> Self {
        Self {
            resolvers: constants::DEFAULT_DOH_RESOLVERS.iter().map(|s| s.to_string()).collect(),
            public_ip_url: constants::get_public_ip_url(),
            bandwidth_url: constants::get_bandwidth_url(),
            timeout_seconds: 30,
        }
    }
}

pub struct HttpProbe {
    config: HttpProbeConfig,
    http_client: reqwest::Client,
}

// DoH JSON wire format

#[derive(Debug, Deserialize)]
struct DohJson {
    #[serde(rename = "Status", default)]
    status: u32,
    #[serde(rename = "Answer", default)]
    answer: Vec<DohRecord>,
    #[serde(rename = "Authority", default)]
    authority: Vec<DohRecord>,
    #[serde(rename = "Additional", default)]
    additional: Vec<DohRecord>,
}

#[derive(Debug, Deserialize)]
struct DohRecord {
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    record_type: u16,
    #[serde(rename = "TTL", default)]
    ttl: u32,
    #[serde(default)]
    data: String,
}

impl From<DohRecord> for DnsAnswer {
    fn from(r: DohRecord) -> Self {
        DnsAnswer {
            name: r.name,
            record_type: r.record_type,
            ttl: r.ttl,
            data: r.data,
        }
    }
}

// ipapi wire format

#[derive(Debug, Deserialize)]
struct IpApiJson {
    ip: Option<String>,
    org: Option<String>,
    city: Option<String>,
    country_name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl HttpProbe {
    pub fn new(config: HttpProbeConfig) -> Result<Self, ProbeError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(format!("{}/{}", constants::APP_NAME, constants::APP_VERSION))
            .build()
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        Ok(Self { config, http_client })
    }

    fn primary_resolver(&self) -> Result<&str, ProbeError> {
        self.config
            .resolvers
            .first()
            .map(|s| s.as_str())
            .ok_or(ProbeError::Unsupported("no DoH resolver configured"))
    }

    fn map_error(&self, operation: &'static str, e: reqwest::Error) -> ProbeError {
        if e.is_timeout() {
            ProbeError::Timeout {
                operation,
                after: Duration::from_secs(self.config.timeout_seconds),
            }
        } else {
            ProbeError::Network(e.to_string())
        }
    }
}

/// Append a cache-busting parameter so intermediaries never answer from cache
fn cache_busted(address: &str) -> String {
    let separator = if address.contains('?') { '&' } else { '?' };
    format!("{}{}t={}", address, separator, chrono::Utc::now().timestamp_millis())
}

#[async_trait]
impl Probe for HttpProbe {
    async fn measure_latency(&self, target: &Target) -> Result<Duration, ProbeError> {
        let url = cache_busted(&target.address);

        let started = Instant::now();
        // Any HTTP answer proves the round trip; status is irrelevant here
        self.http_client
            .head(&url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| self.map_error("latency", e))?;

        Ok(started.elapsed())
    }

    async fn measure_bandwidth_sample(&self, payload_size_hint: u64) -> Result<f64, ProbeError> {
        let started = Instant::now();

        let response = self
            .http_client
            .get(&self.config.bandwidth_url)
            .query(&[("bytes", payload_size_hint)])
            .send()
            .await
            .map_err(|e| self.map_error("bandwidth", e))?;

        if !response.status().is_success() {
            return Err(ProbeError::Status(response.status().as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_error("bandwidth", e))?;

        let secs = started.elapsed().as_secs_f64();
        if body.is_empty() || secs <= 0.0 {
            return Err(ProbeError::Parse("empty bandwidth payload".to_string()));
        }

        Ok(body.len() as f64 * 8.0 / secs)
    }

    async fn query_dns(&self, name: &str, record_type: RecordType) -> Result<DnsResponse, ProbeError> {
        let resolver = self.primary_resolver()?.to_string();
        self.query_dns_at(&resolver, name, record_type).await
    }

    async fn query_dns_at(
        &self,
        resolver: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<DnsResponse, ProbeError> {
        let response = self
            .http_client
            .get(resolver)
            .query(&[("name", name), ("type", record_type.as_str())])
            .header(reqwest::header::ACCEPT, "application/dns-json")
            .send()
            .await
            .map_err(|e| self.map_error("dns", e))?;

        if !response.status().is_success() {
            return Err(ProbeError::Status(response.status().as_u16()));
        }

        let doh: DohJson = response
            .json()
            .await
            .map_err(|e| ProbeError::Parse(e.to_string()))?;

        Ok(DnsResponse {
            status: doh.status,
            answers: doh.answer.into_iter().map(DnsAnswer::from).collect(),
            authority: doh.authority.into_iter().map(DnsAnswer::from).collect(),
            additional: doh.additional.into_iter().map(DnsAnswer::from).collect(),
        })
    }

    async fn fetch_public_ip_metadata(&self) -> Result<PublicIpInfo, ProbeError> {
        let response = self
            .http_client
            .get(&self.config.public_ip_url)
            .send()
            .await
            .map_err(|e| self.map_error("public_ip", e))?;

        if !response.status().is_success() {
            return Err(ProbeError::Status(response.status().as_u16()));
        }

        let info: IpApiJson = response
            .json()
            .await
            .map_err(|e| ProbeError::Parse(e.to_string()))?;

        let address = info
            .ip
            .ok_or_else(|| ProbeError::Parse("public IP response without address".to_string()))?;

        Ok(PublicIpInfo {
            address,
            org: info.org,
            city: info.city,
            country: info.country_name,
            lat: info.latitude,
            lon: info.longitude,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_busted_separator() {
        assert!(cache_busted("https://example.com").starts_with("https://example.com?t="));
        assert!(cache_busted("https://dns.google/resolve?name=a").starts_with("https://dns.google/resolve?name=a&t="));
    }

    #[test]
    fn test_doh_json_decoding() {
        let raw = r#"{
            "Status": 0,
            "Answer": [
                {"name": "example.com.", "type": 1, "TTL": 120, "data": "93.184.216.34"}
            ]
        }"#;

        let doh: DohJson = serde_json::from_str(raw).unwrap();
        assert_eq!(doh.status, 0);
        assert!(doh.authority.is_empty());

        let answer = DnsAnswer::from(doh.answer.into_iter().next().unwrap());
        assert_eq!(answer.record_type, RecordType::A.code());
        assert_eq!(answer.ttl, 120);
    }

    #[test]
    fn test_probe_without_resolvers_is_unsupported() {
        let probe = HttpProbe::new(HttpProbeConfig {
            resolvers: vec![],
            ..Default::default()
        })
        .unwrap();

        assert!(matches!(probe.primary_resolver(), Err(ProbeError::Unsupported(_))));
    }
}
