//! Resolution chain assembly
//!
//! Levels are built in fixed semantic order. A level whose source produced
//! nothing qualifying is omitted, never padded.

use std::collections::{BTreeMap, HashSet};

use super::types::{ChainKind, ChainLevel, ChainMember, DnsGraph, DnsGraphEdge, DnsGraphNode, DnsRecord};
use crate::constants::ROOT_SERVERS;
use crate::logic::probe::RecordType;
use crate::logic::topology::ProviderClassifier;

/// Last label of a domain, without the trailing dot
pub fn tld_of(domain: &str) -> Option<&str> {
    domain
        .trim_end_matches('.')
        .rsplit('.')
        .next()
        .filter(|label| !label.is_empty())
}

/// Keep only the first member per identity
fn distinct(members: impl IntoIterator<Item = ChainMember>) -> Vec<ChainMember> {
    let mut seen = HashSet::new();
    members
        .into_iter()
        .filter(|m| seen.insert(m.identity().trim_end_matches('.').to_lowercase()))
        .collect()
}

pub fn build_chain(
    domain: &str,
    records: &BTreeMap<RecordType, Vec<DnsRecord>>,
    cdn: &dyn ProviderClassifier,
) -> Vec<ChainLevel> {
    let mut chain = Vec::with_capacity(4);

    chain.push(ChainLevel {
        level: ChainKind::Root.level(),
        label: "Root Servers".to_string(),
        members: distinct(ROOT_SERVERS.iter().map(|ip| ChainMember::Address(ip.to_string()))),
        kind: ChainKind::Root,
    });

    if let Some(tld) = tld_of(domain) {
        chain.push(ChainLevel {
            level: ChainKind::Tld.level(),
            label: format!(".{} TLD", tld),
            members: vec![ChainMember::Zone(format!("{}.", tld))],
            kind: ChainKind::Tld,
        });
    }

    let ns = records.get(&RecordType::Ns).map(|v| v.as_slice()).unwrap_or(&[]);
    if !ns.is_empty() {
        chain.push(ChainLevel {
            level: ChainKind::Authoritative.level(),
            label: "Authoritative Name Servers".to_string(),
            members: distinct(ns.iter().cloned().map(ChainMember::Record)),
            kind: ChainKind::Authoritative,
        });
    }

    let ips: Vec<String> = records
        .get(&RecordType::A)
        .map(|v| v.iter().map(|r| r.data.clone()).collect())
        .unwrap_or_default();
    if let Some((ip, provider)) = cdn.first_match(&ips) {
        chain.push(ChainLevel {
            level: ChainKind::Cdn.level(),
            label: format!("CDN ({})", provider),
            members: vec![ChainMember::Address(ip)],
            kind: ChainKind::Cdn,
        });
    }

    chain
}

/// One node per level, linked in level order
pub fn build_graph(chain: &[ChainLevel]) -> DnsGraph {
    let nodes: Vec<DnsGraphNode> = chain
        .iter()
        .map(|level| DnsGraphNode {
            id: format!("level-{}", level.level),
            label: level.label.clone(),
            level: level.level,
            kind: level.kind,
            member_count: level.members.len(),
        })
        .collect();

    let edges = nodes
        .windows(2)
        .map(|w| DnsGraphEdge {
            from_id: w[0].id.clone(),
            to_id: w[1].id.clone(),
        })
        .collect();

    DnsGraph { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::topology::ProviderPrefixTable;
    use chrono::Utc;

    fn record(rt: RecordType, data: &str) -> DnsRecord {
        DnsRecord {
            owner_name: "example.com".into(),
            record_type: rt,
            data: data.into(),
            source: "test".into(),
            queried_at: Utc::now(),
        }
    }

    fn levels(chain: &[ChainLevel]) -> Vec<u8> {
        chain.iter().map(|l| l.level).collect()
    }

    #[test]
    fn test_tld_of() {
        assert_eq!(tld_of("example.com"), Some("com"));
        assert_eq!(tld_of("example.co.uk."), Some("uk"));
        assert_eq!(tld_of(""), None);
    }

    #[test]
    fn test_full_chain_is_strictly_increasing() {
        let table = ProviderPrefixTable::cdn_default();
        let mut records = BTreeMap::new();
        records.insert(
            RecordType::Ns,
            vec![record(RecordType::Ns, "ns1.example.com."), record(RecordType::Ns, "NS1.example.com")],
        );
        records.insert(RecordType::A, vec![record(RecordType::A, "185.199.108.10")]);

        let chain = build_chain("example.com", &records, &table);
        assert_eq!(levels(&chain), vec![0, 1, 2, 3]);
        assert!(chain.windows(2).all(|w| w[0].level < w[1].level));

        // Same server listed twice collapses to one member
        assert_eq!(chain[2].members.len(), 1);
        assert_eq!(chain[3].label, "CDN (github)");
    }

    #[test]
    fn test_levels_absent_without_qualifying_answers() {
        let table = ProviderPrefixTable::cdn_default();
        let mut records = BTreeMap::new();
        records.insert(RecordType::Ns, vec![]);
        records.insert(RecordType::A, vec![record(RecordType::A, "93.184.216.34")]);

        let chain = build_chain("example.com", &records, &table);
        assert_eq!(levels(&chain), vec![0, 1]);

        records.insert(RecordType::A, vec![record(RecordType::A, "151.101.1.69")]);
        let chain = build_chain("example.com", &records, &table);
        assert_eq!(levels(&chain), vec![0, 1, 3]);
    }

    #[test]
    fn test_graph_follows_chain() {
        let table = ProviderPrefixTable::cdn_default();
        let chain = build_chain("example.com", &BTreeMap::new(), &table);
        let graph = build_graph(&chain);

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].from_id, "level-0");
        assert_eq!(graph.edges[0].to_id, "level-1");
        assert_eq!(graph.nodes[0].member_count, ROOT_SERVERS.len());
    }
}
