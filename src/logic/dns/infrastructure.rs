//! Hosting infrastructure summary and resolver timing

use std::time::Duration;
use tokio::time::Instant;

use super::types::{DnsRecord, InfrastructureSummary, ResolverPerformance, ResolverTiming};
use crate::logic::metrics::stats;
use crate::logic::probe::{with_timeout, Probe, RecordType};
use crate::logic::topology::{anycast_likely, ns_provider, redundancy, ProviderClassifier};

pub fn summarize(
    a_records: &[DnsRecord],
    ns_records: &[DnsRecord],
    hosting: &dyn ProviderClassifier,
    anycast_range: (usize, usize),
) -> InfrastructureSummary {
    let ip_addresses: Vec<String> = a_records.iter().map(|r| r.data.clone()).collect();
    let redundancy = redundancy(&ip_addresses);

    let name_servers: Vec<String> = ns_records
        .iter()
        .map(|r| r.data.trim_end_matches('.').to_string())
        .collect();

    let mut dns_providers: Vec<String> = Vec::new();
    for provider in name_servers.iter().filter_map(|ns| ns_provider(ns)) {
        if !dns_providers.iter().any(|p| p == provider) {
            dns_providers.push(provider.to_string());
        }
    }

    InfrastructureSummary {
        hosting_provider: hosting.first_match(&ip_addresses).map(|(_, p)| p),
        load_balancing: redundancy > 1,
        redundancy,
        anycast_likely: anycast_likely(redundancy, anycast_range.0, anycast_range.1),
        ip_addresses,
        name_servers,
        dns_providers,
    }
}

/// Time one A query against every resolver, one after another, `delay` apart.
/// A failure RCODE counts as an unreliable answer.
pub async fn measure_resolvers(
    probe: &dyn Probe,
    resolvers: &[String],
    domain: &str,
    timeout: Duration,
    delay: Duration,
) -> ResolverPerformance {
    let mut timings = Vec::with_capacity(resolvers.len());

    for (i, resolver) in resolvers.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let started = Instant::now();
        let result = with_timeout("dns", timeout, probe.query_dns_at(resolver, domain, RecordType::A))
            .await
            .and_then(|r| r.into_answered());

        let time_ms = match result {
            Ok(_) => Some(stats::millis(started.elapsed())),
            Err(e) => {
                log::debug!("[DNS] Resolver {} failed: {}", resolver, e);
                None
            }
        };
        timings.push(ResolverTiming {
            resolver: resolver.clone(),
            time_ms,
        });
    }

    resolver_performance(timings)
}

pub fn resolver_performance(timings: Vec<ResolverTiming>) -> ResolverPerformance {
    let ok: Vec<(&str, f64)> = timings
        .iter()
        .filter_map(|t| t.time_ms.map(|ms| (t.resolver.as_str(), ms)))
        .collect();

    let fastest = ok
        .iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(r, _)| r.to_string());
    let slowest = ok
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(r, _)| r.to_string());
    let times: Vec<f64> = ok.iter().map(|(_, ms)| *ms).collect();

    let reliability = if timings.is_empty() {
        0.0
    } else {
        ok.len() as f64 / timings.len() as f64 * 100.0
    };

    ResolverPerformance {
        fastest,
        slowest,
        average_ms: stats::mean(&times),
        reliability,
        timings,
    }
}
