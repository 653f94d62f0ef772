//! Paced, deadline-bound DNS queries for one analysis run

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::types::DnsRecord;
use crate::logic::probe::{with_timeout, DnsResponse, Probe, ProbeError, RecordType};

pub struct Querier {
    probe: Arc<dyn Probe>,
    timeout: Duration,
    delay: Duration,
    source: String,
    started: AtomicBool,
}

impl Querier {
    pub fn new(probe: Arc<dyn Probe>, timeout: Duration, delay: Duration, source: impl Into<String>) -> Self {
        Self {
            probe,
            timeout,
            delay,
            source: source.into(),
            started: AtomicBool::new(false),
        }
    }

    /// Sleep between consecutive queries so a run never bursts
    async fn pace(&self) {
        if self.started.swap(true, Ordering::SeqCst) && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Full response, all answer types included. SERVFAIL, REFUSED and the
    /// like are errors, so callers never read them as "no records".
    pub async fn raw(&self, name: &str, record_type: RecordType) -> Result<DnsResponse, ProbeError> {
        self.pace().await;
        with_timeout("dns", self.timeout, self.probe.query_dns(name, record_type))
            .await?
            .into_answered()
    }

    /// Answers of the asked type only
    pub async fn records(&self, name: &str, record_type: RecordType) -> Result<Vec<DnsRecord>, ProbeError> {
        let response = self.raw(name, record_type).await?;
        let now = Utc::now();

        Ok(response
            .answers_of(record_type)
            .map(|a| DnsRecord {
                owner_name: if a.name.is_empty() { name.to_string() } else { a.name.clone() },
                record_type,
                data: a.data.clone(),
                source: self.source.clone(),
                queried_at: now,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::probe::mock::ScriptedProbe;

    #[tokio::test(start_paused = true)]
    async fn test_queries_are_paced() {
        let probe = ScriptedProbe::new().answers("example.com", RecordType::A, &["1.2.3.4"]);
        let querier = Querier::new(Arc::new(probe), Duration::from_secs(5), Duration::from_millis(100), "primary");

        let started = tokio::time::Instant::now();
        let first = querier.records("example.com", RecordType::A).await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(first[0].data, "1.2.3.4");
        assert_eq!(first[0].source, "primary");

        querier.records("example.com", RecordType::Aaaa).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_resolver_failure_codes_are_errors() {
        let querier = Querier::new(
            Arc::new(ScriptedProbe::new().default_rcode(2)),
            Duration::from_secs(1),
            Duration::ZERO,
            "primary",
        );
        let err = querier.records("example.com", RecordType::Ns).await.unwrap_err();
        assert_eq!(err, ProbeError::Status(2));

        let refused = Querier::new(
            Arc::new(ScriptedProbe::new().default_rcode(5)),
            Duration::from_secs(1),
            Duration::ZERO,
            "primary",
        );
        assert!(refused.raw("example.com", RecordType::Axfr).await.is_err());
    }

    #[tokio::test]
    async fn test_nxdomain_is_an_empty_answer() {
        let querier = Querier::new(
            Arc::new(ScriptedProbe::new().default_rcode(3)),
            Duration::from_secs(1),
            Duration::ZERO,
            "primary",
        );
        let records = querier.records("missing.example.com", RecordType::A).await.unwrap();
        assert!(records.is_empty());
    }
}
