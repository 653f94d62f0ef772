//! DNS Analysis Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::logic::probe::RecordType;

/// One answer, attributed to the resolver that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecord {
    pub owner_name: String,
    pub record_type: RecordType,
    pub data: String,
    pub source: String,
    pub queried_at: DateTime<Utc>,
}

// ============================================================================
// CHAIN
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    Root,
    Tld,
    Authoritative,
    Cdn,
}

impl ChainKind {
    /// Fixed level number of each stage
    pub fn level(&self) -> u8 {
        match self {
            ChainKind::Root => 0,
            ChainKind::Tld => 1,
            ChainKind::Authoritative => 2,
            ChainKind::Cdn => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ChainMember {
    Record(DnsRecord),
    Address(String),
    Zone(String),
}

impl ChainMember {
    /// Identity used for de-duplication within a level
    pub fn identity(&self) -> &str {
        match self {
            ChainMember::Record(r) => &r.data,
            ChainMember::Address(a) => a,
            ChainMember::Zone(z) => z,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainLevel {
    pub level: u8,
    pub label: String,
    pub members: Vec<ChainMember>,
    pub kind: ChainKind,
}

// ============================================================================
// SECURITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityFinding {
    pub category: String,
    pub severity: Severity,
    pub title: String,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityCheck {
    Dnssec,
    Caa,
    Spf,
    Dmarc,
    Wildcard,
    ZoneTransfer,
    Amplification,
}

impl SecurityCheck {
    pub const ALL: [SecurityCheck; 7] = [
        SecurityCheck::Dnssec,
        SecurityCheck::Caa,
        SecurityCheck::Spf,
        SecurityCheck::Dmarc,
        SecurityCheck::Wildcard,
        SecurityCheck::ZoneTransfer,
        SecurityCheck::Amplification,
    ];
}

/// Outcome of one check. Network trouble is `Unknown`, never pass or fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub check: SecurityCheck,
    pub status: CheckStatus,
}

// ============================================================================
// INFRASTRUCTURE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureSummary {
    pub ip_addresses: Vec<String>,
    pub hosting_provider: Option<String>,
    pub load_balancing: bool,
    pub redundancy: usize,
    pub anycast_likely: bool,
    pub name_servers: Vec<String>,
    pub dns_providers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverTiming {
    pub resolver: String,
    /// `None` when the query failed
    pub time_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverPerformance {
    pub timings: Vec<ResolverTiming>,
    pub fastest: Option<String>,
    pub slowest: Option<String>,
    pub average_ms: Option<f64>,
    /// Successful queries, percent
    pub reliability: f64,
}

// ============================================================================
// GRAPH + REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsGraphNode {
    pub id: String,
    pub label: String,
    pub level: u8,
    pub kind: ChainKind,
    pub member_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsGraphEdge {
    pub from_id: String,
    pub to_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsGraph {
    pub nodes: Vec<DnsGraphNode>,
    pub edges: Vec<DnsGraphEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedQuery {
    pub name: String,
    pub record_type: RecordType,
    pub error: String,
}

/// Everything one reconstruction run produced. Replaced wholesale by the next run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsReport {
    pub domain: String,
    pub analyzed_at: DateTime<Utc>,
    pub records: BTreeMap<RecordType, Vec<DnsRecord>>,
    pub failed_queries: Vec<FailedQuery>,
    pub chain: Vec<ChainLevel>,
    pub checks: Vec<CheckResult>,
    pub findings: Vec<SecurityFinding>,
    pub infrastructure: InfrastructureSummary,
    pub resolver_performance: Option<ResolverPerformance>,
    pub graph: DnsGraph,
}

impl DnsReport {
    pub fn records_of(&self, record_type: RecordType) -> &[DnsRecord] {
        self.records.get(&record_type).map(|v| v.as_slice()).unwrap_or(&[])
    }
}
