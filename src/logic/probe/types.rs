//! Probe Types
//!
//! Targets, DNS wire shapes and the probe error taxonomy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// TARGETS
// ============================================================================

/// What a measurement endpoint represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// The site under analysis
    Origin,
    /// A DNS-over-HTTPS resolver
    Resolver,
    /// A CDN / edge network
    Cdn,
    /// A well-known platform used as reachability reference
    Platform,
    Other,
}

/// A measurement endpoint. Immutable once configured.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub address: String,
    pub kind: TargetKind,
}

impl Target {
    pub fn new(name: impl Into<String>, address: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            kind,
        }
    }
}

// ============================================================================
// DNS
// ============================================================================

/// DNS record types the engine knows how to ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Ns,
    Txt,
    Soa,
    Ds,
    Caa,
    Any,
    Axfr,
}

impl RecordType {
    /// Record types queried for every chain reconstruction
    pub const CHAIN_SET: [RecordType; 7] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Cname,
        RecordType::Mx,
        RecordType::Ns,
        RecordType::Txt,
        RecordType::Soa,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Txt => "TXT",
            RecordType::Soa => "SOA",
            RecordType::Ds => "DS",
            RecordType::Caa => "CAA",
            RecordType::Any => "ANY",
            RecordType::Axfr => "AXFR",
        }
    }

    /// IANA type code
    pub fn code(&self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::Ns => 2,
            RecordType::Cname => 5,
            RecordType::Soa => 6,
            RecordType::Mx => 15,
            RecordType::Txt => 16,
            RecordType::Aaaa => 28,
            RecordType::Ds => 43,
            RecordType::Axfr => 252,
            RecordType::Any => 255,
            RecordType::Caa => 257,
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resource record as returned by a resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsAnswer {
    pub name: String,
    pub record_type: u16,
    pub ttl: u32,
    pub data: String,
}

impl DnsAnswer {
    pub fn new(name: impl Into<String>, record_type: RecordType, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.code(),
            ttl: 300,
            data: data.into(),
        }
    }
}

/// Full response of a single DNS query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsResponse {
    /// RCODE (0 = NOERROR, 3 = NXDOMAIN)
    pub status: u32,
    pub answers: Vec<DnsAnswer>,
    pub authority: Vec<DnsAnswer>,
    pub additional: Vec<DnsAnswer>,
}

impl DnsResponse {
    pub fn with_answers(answers: Vec<DnsAnswer>) -> Self {
        Self {
            status: 0,
            answers,
            ..Default::default()
        }
    }

    /// NOERROR and NXDOMAIN are answers; any other RCODE means the resolver failed
    pub fn into_answered(self) -> Result<Self, ProbeError> {
        match self.status {
            0 | 3 => Ok(self),
            code => Err(ProbeError::Status(u16::try_from(code).unwrap_or(u16::MAX))),
        }
    }

    /// Answers whose type matches the question (resolvers also return CNAME hops)
    pub fn answers_of(&self, record_type: RecordType) -> impl Iterator<Item = &DnsAnswer> {
        let code = record_type.code();
        self.answers.iter().filter(move |a| a.record_type == code)
    }
}

// ============================================================================
// PUBLIC IP
// ============================================================================

/// Metadata about the client's public address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpInfo {
    pub address: String,
    pub org: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

// ============================================================================
// ERRORS
// ============================================================================

/// Probe errors. Always non-fatal: the caller records absence of data.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeError {
    /// Deadline exceeded
    Timeout { operation: &'static str, after: Duration },
    /// Connection / transport / resolution failure
    Network(String),
    /// Endpoint answered with a non-success status
    Status(u16),
    /// Response could not be decoded
    Parse(String),
    /// The probe implementation cannot perform this operation
    Unsupported(&'static str),
}

impl ProbeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeError::Timeout { .. })
    }
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout { operation, after } => {
                write!(f, "{} timed out after {}ms", operation, after.as_millis())
            }
            Self::Network(e) => write!(f, "Network error: {}", e),
            Self::Status(code) => write!(f, "Unexpected status: {}", code),
            Self::Parse(e) => write!(f, "Parse error: {}", e),
            Self::Unsupported(op) => write!(f, "Operation not supported: {}", op),
        }
    }
}

impl std::error::Error for ProbeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_serde_uses_wire_names() {
        let json = serde_json::to_string(&RecordType::Aaaa).unwrap();
        assert_eq!(json, "\"AAAA\"");

        let parsed: RecordType = serde_json::from_str("\"CNAME\"").unwrap();
        assert_eq!(parsed, RecordType::Cname);
    }

    #[test]
    fn test_answers_of_filters_by_type() {
        let response = DnsResponse::with_answers(vec![
            DnsAnswer::new("www.example.com", RecordType::Cname, "example.com."),
            DnsAnswer::new("example.com", RecordType::A, "93.184.216.34"),
        ]);

        let a: Vec<_> = response.answers_of(RecordType::A).collect();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].data, "93.184.216.34");
    }

    #[test]
    fn test_timeout_display() {
        let err = ProbeError::Timeout {
            operation: "latency",
            after: Duration::from_secs(5),
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "latency timed out after 5000ms");
    }
}
