//! DNS Module - Resolution Chain & Security Heuristics
//!
//! - `reconstructor.rs` - one analysis run over a domain
//! - `chain.rs` - leveled chain (root → tld → authoritative → cdn) + graph
//! - `security.rs` - independent pass/fail/unknown checks
//! - `infrastructure.rs` - hosting summary, resolver timing
//! - `query.rs` - paced queries with deadlines

pub mod types;
pub mod query;
pub mod chain;
pub mod security;
pub mod infrastructure;
pub mod reconstructor;

pub use types::{
    ChainKind,
    ChainLevel,
    ChainMember,
    CheckResult,
    CheckStatus,
    DnsGraph,
    DnsRecord,
    DnsReport,
    InfrastructureSummary,
    ResolverPerformance,
    SecurityCheck,
    SecurityFinding,
    Severity,
};
pub use reconstructor::DnsChainReconstructor;
