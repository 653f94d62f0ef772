//! DNS Chain Reconstructor
//!
//! One `reconstruct` call is one self-contained analysis run. Partial query
//! failures shrink the result; they never abort the run.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::chain::{build_chain, build_graph};
use super::infrastructure::{measure_resolvers, summarize};
use super::query::Querier;
use super::security::{findings_for, run_checks};
use super::types::{DnsRecord, DnsReport, FailedQuery};
use crate::logic::config::{DnsSettings, TopologySettings};
use crate::logic::probe::{Probe, RecordType};
use crate::logic::topology::{ProviderClassifier, ProviderPrefixTable};

pub struct DnsChainReconstructor {
    probe: Arc<dyn Probe>,
    settings: DnsSettings,
    timeout: Duration,
    cdn: Arc<dyn ProviderClassifier>,
    hosting: Arc<dyn ProviderClassifier>,
    anycast_range: (usize, usize),
}

impl DnsChainReconstructor {
    pub fn new(
        probe: Arc<dyn Probe>,
        settings: DnsSettings,
        timeout: Duration,
        cdn: Arc<dyn ProviderClassifier>,
        hosting: Arc<dyn ProviderClassifier>,
    ) -> Self {
        Self {
            probe,
            settings,
            timeout,
            cdn,
            hosting,
            anycast_range: (1, 4),
        }
    }

    /// Default provider tables, anycast range from topology settings
    pub fn with_defaults(probe: Arc<dyn Probe>, settings: DnsSettings, timeout: Duration, topology: &TopologySettings) -> Self {
        Self::new(
            probe,
            settings,
            timeout,
            Arc::new(ProviderPrefixTable::cdn_default()),
            Arc::new(ProviderPrefixTable::hosting_default()),
        )
        .anycast_range(topology.anycast_min, topology.anycast_max)
    }

    pub fn anycast_range(mut self, min: usize, max: usize) -> Self {
        self.anycast_range = (min, max);
        self
    }

    fn source(&self) -> String {
        self.settings
            .resolvers
            .first()
            .cloned()
            .unwrap_or_else(|| "probe".to_string())
    }

    pub async fn reconstruct(&self, domain: &str) -> DnsReport {
        let domain = domain.trim_end_matches('.');
        let querier = Querier::new(
            Arc::clone(&self.probe),
            self.timeout,
            Duration::from_millis(self.settings.query_delay_ms),
            self.source(),
        );

        log::info!("[DNS] Analysing {}", domain);

        let mut records: BTreeMap<RecordType, Vec<DnsRecord>> = BTreeMap::new();
        let mut failed_queries = Vec::new();

        for record_type in RecordType::CHAIN_SET {
            match querier.records(domain, record_type).await {
                Ok(found) => {
                    records.insert(record_type, found);
                }
                Err(e) => {
                    log::warn!("[DNS] {} query for {} failed: {}", record_type, domain, e);
                    failed_queries.push(FailedQuery {
                        name: domain.to_string(),
                        record_type,
                        error: e.to_string(),
                    });
                }
            }
        }

        let chain = build_chain(domain, &records, self.cdn.as_ref());

        let txt = records.get(&RecordType::Txt).map(|v| v.as_slice());
        let checks = run_checks(&querier, domain, txt, self.settings.amplification_threshold).await;
        let findings = findings_for(&checks, domain);

        let empty = Vec::new();
        let infrastructure = summarize(
            records.get(&RecordType::A).unwrap_or(&empty),
            records.get(&RecordType::Ns).unwrap_or(&empty),
            self.hosting.as_ref(),
            self.anycast_range,
        );

        let resolver_performance = if self.settings.measure_resolvers && !self.settings.resolvers.is_empty() {
            Some(
                measure_resolvers(
                    self.probe.as_ref(),
                    &self.settings.resolvers,
                    domain,
                    self.timeout,
                    Duration::from_millis(self.settings.query_delay_ms),
                )
                .await,
            )
        } else {
            None
        };

        let graph = build_graph(&chain);

        log::info!(
            "[DNS] {}: {} chain levels, {} findings, {} failed queries",
            domain,
            chain.len(),
            findings.len(),
            failed_queries.len()
        );

        DnsReport {
            domain: domain.to_string(),
            analyzed_at: Utc::now(),
            records,
            failed_queries,
            chain,
            checks,
            findings,
            infrastructure,
            resolver_performance,
            graph,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::dns::types::{ChainKind, CheckStatus, SecurityCheck};
    use crate::logic::probe::mock::ScriptedProbe;

    fn reconstructor(probe: ScriptedProbe, measure_resolvers: bool) -> DnsChainReconstructor {
        let settings = DnsSettings {
            measure_resolvers,
            ..Default::default()
        };
        DnsChainReconstructor::with_defaults(
            Arc::new(probe),
            settings,
            Duration::from_secs(1),
            &TopologySettings::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ns_answers_gives_root_and_tld_only() {
        let probe = ScriptedProbe::new().answers("example.com", RecordType::A, &["93.184.216.34"]);
        let report = reconstructor(probe, false).reconstruct("example.com").await;

        assert_eq!(report.chain.len(), 2);
        assert_eq!(report.chain[0].kind, ChainKind::Root);
        assert_eq!(report.chain[1].kind, ChainKind::Tld);
        assert!(report.failed_queries.is_empty());
        assert!(report.resolver_performance.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_keeps_other_levels() {
        let probe = ScriptedProbe::new()
            .answers("example.github.io", RecordType::A, &["185.199.108.10"])
            .dns_failure("example.github.io", RecordType::Ns)
            .dns_failure("example.github.io", RecordType::Txt);
        let report = reconstructor(probe, false).reconstruct("example.github.io").await;

        let kinds: Vec<ChainKind> = report.chain.iter().map(|l| l.kind).collect();
        assert_eq!(kinds, vec![ChainKind::Root, ChainKind::Tld, ChainKind::Cdn]);
        assert_eq!(report.chain[2].label, "CDN (github)");
        assert_eq!(report.failed_queries.len(), 2);

        let spf = report.checks.iter().find(|c| c.check == SecurityCheck::Spf).unwrap();
        assert_eq!(spf.status, CheckStatus::Unknown);
        assert_eq!(report.infrastructure.hosting_provider.as_deref(), Some("GitHub Pages"));
        assert_eq!(report.graph.nodes.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_servfail_is_a_failed_query_not_an_empty_answer() {
        let probe = ScriptedProbe::new().default_rcode(2);
        let report = reconstructor(probe, false).reconstruct("example.com").await;

        assert_eq!(report.failed_queries.len(), RecordType::CHAIN_SET.len());
        assert!(report.failed_queries.iter().any(|q| q.record_type == RecordType::Ns));
        assert!(report.records.is_empty());
        assert_eq!(report.chain.len(), 2);
        assert!(report.findings.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_queries_every_type_once() {
        let probe = Arc::new(
            ScriptedProbe::new()
                .answers("example.com", RecordType::Ns, &["a.iana-servers.net."])
                .answers("example.com", RecordType::A, &["93.184.216.34"]),
        );
        let recon = DnsChainReconstructor::with_defaults(
            probe.clone(),
            DnsSettings::default(),
            Duration::from_secs(1),
            &TopologySettings::default(),
        );

        let report = recon.reconstruct("example.com.").await;
        assert_eq!(report.domain, "example.com");
        assert_eq!(report.chain.len(), 3);

        // 7 chain types + DS, CAA, DMARC, wildcard, AXFR, ANY + 3 resolvers
        let calls = probe.dns_calls.load(std::sync::atomic::Ordering::SeqCst);
        assert_eq!(calls, 7 + 6 + 3);

        let perf = report.resolver_performance.unwrap();
        assert_eq!(perf.timings.len(), 3);
        assert_eq!(perf.reliability, 100.0);
    }
}
