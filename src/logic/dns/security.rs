//! Heuristic DNS security checks
//!
//! Every check is independent: a failed query turns that one check into
//! `Unknown` and the rest still run. Only `Fail` produces a finding.

use rand::distributions::Alphanumeric;
use rand::Rng;

use super::query::Querier;
use super::types::{CheckResult, CheckStatus, DnsRecord, SecurityCheck, SecurityFinding, Severity};
use crate::logic::probe::{ProbeError, RecordType};

fn presence(result: Result<Vec<DnsRecord>, ProbeError>, check: SecurityCheck) -> CheckStatus {
    match result {
        Ok(records) if !records.is_empty() => CheckStatus::Pass,
        Ok(_) => CheckStatus::Fail,
        Err(e) => {
            log::debug!("[DNS] {:?} check inconclusive: {}", check, e);
            CheckStatus::Unknown
        }
    }
}

fn contains_marker(records: &[DnsRecord], marker: &str) -> bool {
    let marker = marker.to_lowercase();
    records.iter().any(|r| r.data.to_lowercase().contains(&marker))
}

/// Random label that should never exist
fn nonce_label() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("test-{}", suffix.to_lowercase())
}

/// `txt` is the apex TXT set from the main run, `None` if that query failed
pub async fn run_checks(
    querier: &Querier,
    domain: &str,
    txt: Option<&[DnsRecord]>,
    amplification_threshold: usize,
) -> Vec<CheckResult> {
    let mut results = Vec::with_capacity(SecurityCheck::ALL.len());

    for check in SecurityCheck::ALL {
        let status = match check {
            SecurityCheck::Dnssec => presence(querier.records(domain, RecordType::Ds).await, check),
            SecurityCheck::Caa => presence(querier.records(domain, RecordType::Caa).await, check),
            SecurityCheck::Spf => match txt {
                Some(records) if contains_marker(records, "v=spf1") => CheckStatus::Pass,
                Some(_) => CheckStatus::Fail,
                None => CheckStatus::Unknown,
            },
            SecurityCheck::Dmarc => {
                let name = format!("_dmarc.{}", domain);
                match querier.records(&name, RecordType::Txt).await {
                    Ok(records) if contains_marker(&records, "v=DMARC1") => CheckStatus::Pass,
                    Ok(_) => CheckStatus::Fail,
                    Err(e) => {
                        log::debug!("[DNS] DMARC check inconclusive: {}", e);
                        CheckStatus::Unknown
                    }
                }
            }
            SecurityCheck::Wildcard => {
                let name = format!("{}.{}", nonce_label(), domain);
                // A nonce name that resolves means a wildcard record answers everything
                match querier.records(&name, RecordType::A).await {
                    Ok(records) if records.is_empty() => CheckStatus::Pass,
                    Ok(_) => CheckStatus::Fail,
                    Err(_) => CheckStatus::Unknown,
                }
            }
            SecurityCheck::ZoneTransfer => match querier.raw(domain, RecordType::Axfr).await {
                Ok(response) if response.answers.is_empty() => CheckStatus::Pass,
                Ok(_) => CheckStatus::Fail,
                Err(_) => CheckStatus::Unknown,
            },
            SecurityCheck::Amplification => match querier.raw(domain, RecordType::Any).await {
                Ok(response) if response.answers.len() > amplification_threshold => CheckStatus::Fail,
                Ok(_) => CheckStatus::Pass,
                Err(_) => CheckStatus::Unknown,
            },
        };

        results.push(CheckResult { check, status });
    }

    results
}

/// One finding per failed check
pub fn findings_for(checks: &[CheckResult], domain: &str) -> Vec<SecurityFinding> {
    checks
        .iter()
        .filter(|c| c.status == CheckStatus::Fail)
        .map(|c| finding(c.check, domain))
        .collect()
}

fn finding(check: SecurityCheck, domain: &str) -> SecurityFinding {
    let (category, severity, title, detail) = match check {
        SecurityCheck::Dnssec => (
            "dnssec",
            Severity::Medium,
            "DNSSEC not enabled",
            format!("No DS record published for {}; responses cannot be authenticated", domain),
        ),
        SecurityCheck::Caa => (
            "caa",
            Severity::Low,
            "No CAA records",
            format!("Any certificate authority may issue certificates for {}", domain),
        ),
        SecurityCheck::Spf => (
            "email",
            Severity::Medium,
            "Missing SPF record",
            format!("No v=spf1 TXT record at {}; mail spoofing is easier", domain),
        ),
        SecurityCheck::Dmarc => (
            "email",
            Severity::Medium,
            "Missing DMARC policy",
            format!("No v=DMARC1 record at _dmarc.{}", domain),
        ),
        SecurityCheck::Wildcard => (
            "wildcard",
            Severity::Medium,
            "Wildcard DNS detected",
            format!("A random subdomain of {} resolved", domain),
        ),
        SecurityCheck::ZoneTransfer => (
            "zone_transfer",
            Severity::High,
            "Zone transfer allowed",
            format!("An AXFR query for {} returned records", domain),
        ),
        SecurityCheck::Amplification => (
            "amplification",
            Severity::Low,
            "DNS amplification risk",
            format!("ANY query for {} returns a large answer set", domain),
        ),
    };

    SecurityFinding {
        category: category.to_string(),
        severity,
        title: title.to_string(),
        detail,
    }
}
