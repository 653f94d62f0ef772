//! Provider Prefix Tables
//!
//! Table-driven IP → provider labeling. Used for display only, never for
//! security decisions. Lookups are first-match-wins in table order.

use serde::{Deserialize, Serialize};

/// Swappable provider detection strategy
pub trait ProviderClassifier: Send + Sync {
    /// Provider owning `ip`, if any entry matches
    fn classify(&self, ip: &str) -> Option<String>;

    /// First IP (in order) that matches any provider. Later IPs are not consulted.
    fn first_match(&self, ips: &[String]) -> Option<(String, String)> {
        ips.iter()
            .find_map(|ip| self.classify(ip).map(|provider| (ip.clone(), provider)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPrefixes {
    pub provider: String,
    pub prefixes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderPrefixTable {
    entries: Vec<ProviderPrefixes>,
}

impl ProviderPrefixTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider; earlier entries win on overlapping prefixes
    pub fn with(mut self, provider: &str, prefixes: &[&str]) -> Self {
        self.entries.push(ProviderPrefixes {
            provider: provider.to_string(),
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        });
        self
    }

    /// CDN / edge networks
    pub fn cdn_default() -> Self {
        Self::new()
            .with("cloudflare", &["104.16.", "104.17.", "172.64.", "104.18."])
            .with("amazonaws", &["54.", "52.", "34.", "3."])
            .with("fastly", &["151.101."])
            .with("akamai", &["23.", "104.74."])
            .with("cloudfront", &["54.230.", "54.239.", "52.84."])
            .with("github", &["185.199.108.", "185.199.109.", "185.199.110.", "185.199.111."])
    }

    /// Hosting platforms
    pub fn hosting_default() -> Self {
        Self::new()
            .with("GitHub Pages", &["185.199.108.", "185.199.109.", "185.199.110.", "185.199.111."])
            .with("Cloudflare", &["104.16.", "104.17.", "172.64."])
            .with("AWS", &["54.", "52.", "34.", "3."])
            .with("Google Cloud", &["35.", "34.102.", "34.118."])
            .with("Azure", &["52.", "40.", "168."])
    }
}

impl ProviderClassifier for ProviderPrefixTable {
    fn classify(&self, ip: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|entry| entry.prefixes.iter().any(|p| ip.starts_with(p.as_str())))
            .map(|entry| entry.provider.clone())
    }
}

/// Name server host suffix → DNS provider
pub const NS_PROVIDERS: &[(&str, &str)] = &[
    ("amazonaws.com", "AWS Route 53"),
    ("cloudflare.com", "Cloudflare"),
    ("googledomains.com", "Google Domains"),
    ("namecheap.com", "Namecheap"),
    ("godaddy.com", "GoDaddy"),
    ("github.io", "GitHub Pages"),
];

/// DNS provider for a name server host, matched on its suffix
pub fn ns_provider(ns_host: &str) -> Option<&'static str> {
    let host = ns_host.trim_end_matches('.').to_lowercase();
    NS_PROVIDERS
        .iter()
        .find(|(suffix, _)| host == *suffix || host.ends_with(&format!(".{}", suffix)))
        .map(|(_, provider)| *provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_prefix_is_labeled() {
        let table = ProviderPrefixTable::cdn_default();
        assert_eq!(table.classify("185.199.108.10").as_deref(), Some("github"));
        assert_eq!(table.classify("151.101.1.69").as_deref(), Some("fastly"));
        assert_eq!(table.classify("93.184.216.34"), None);
    }

    #[test]
    fn test_table_order_decides_overlaps() {
        // 54.230. is listed under both; the earlier entry wins
        let table = ProviderPrefixTable::cdn_default();
        assert_eq!(table.classify("54.230.1.1").as_deref(), Some("amazonaws"));

        let swapped = ProviderPrefixTable::new()
            .with("cloudfront", &["54.230."])
            .with("amazonaws", &["54."]);
        assert_eq!(swapped.classify("54.230.1.1").as_deref(), Some("cloudfront"));
    }

    #[test]
    fn test_first_match_short_circuits_on_ip_order() {
        let table = ProviderPrefixTable::cdn_default();
        let ips = vec![
            "93.184.216.34".to_string(),
            "151.101.1.69".to_string(),
            "104.16.1.1".to_string(),
        ];
        assert_eq!(
            table.first_match(&ips),
            Some(("151.101.1.69".to_string(), "fastly".to_string()))
        );
        assert_eq!(table.first_match(&ips[..1]), None);
    }

    #[test]
    fn test_ns_provider_suffix() {
        assert_eq!(ns_provider("ns-123.awsdns-45.org."), None);
        assert_eq!(ns_provider("ns1.cloudflare.com."), Some("Cloudflare"));
        assert_eq!(ns_provider("dns1.p01.NSONE.net"), None);
        assert_eq!(ns_provider("pdns1.registrar-servers.namecheap.com"), Some("Namecheap"));
        // Suffix must sit on a label boundary
        assert_eq!(ns_provider("notcloudflare.com"), None);
    }
}
