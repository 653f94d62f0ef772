//! Topology Inference
//!
//! Builds the fixed client → gateway → isp → [backbone] → cdn → origin path.
//! Missing facts show up as "unknown" metadata; nodes are never dropped.

use std::collections::{BTreeMap, HashSet};
use std::net::UdpSocket;
use std::sync::Arc;

use super::prefix::{ProviderClassifier, ProviderPrefixTable};
use super::types::{ConnectionFacts, NodeRole, OriginFacts, Topology, TopologyEdge, TopologyNode};
use crate::constants::UNKNOWN;
use crate::logic::config::TopologySettings;
use crate::logic::probe::PublicIpInfo;

/// Mean Earth radius (km)
const EARTH_RADIUS_KM: f64 = 6371.0;

pub struct TopologyInference {
    settings: TopologySettings,
    cdn: Arc<dyn ProviderClassifier>,
    hosting: Arc<dyn ProviderClassifier>,
}

impl TopologyInference {
    pub fn new(
        settings: TopologySettings,
        cdn: Arc<dyn ProviderClassifier>,
        hosting: Arc<dyn ProviderClassifier>,
    ) -> Self {
        Self { settings, cdn, hosting }
    }

    pub fn with_default_tables(settings: TopologySettings) -> Self {
        Self::new(
            settings,
            Arc::new(ProviderPrefixTable::cdn_default()),
            Arc::new(ProviderPrefixTable::hosting_default()),
        )
    }

    /// Local facts, with configured overrides taking precedence over detection
    pub fn detect_connection(&self) -> ConnectionFacts {
        ConnectionFacts {
            local_address: self.settings.local_address.clone().or_else(detect_local_address),
            hostname: hostname::get().ok().map(|h| h.to_string_lossy().into_owned()),
            gateway_address: self.settings.gateway_address.clone(),
            connection_type: self.settings.connection_type.clone(),
        }
    }

    pub fn infer(
        &self,
        connection: &ConnectionFacts,
        public_ip: Option<&PublicIpInfo>,
        origin: &OriginFacts,
    ) -> Topology {
        let mut nodes = Vec::with_capacity(NodeRole::PATH.len());

        nodes.push(self.client_node(connection));
        nodes.push(self.gateway_node(connection));
        nodes.push(self.isp_node(public_ip));
        if self.settings.include_backbone {
            let mut backbone = node(NodeRole::Backbone);
            backbone.metadata.insert("description".into(), "Major internet infrastructure".into());
            nodes.push(backbone);
        }
        nodes.push(self.cdn_node(origin));
        nodes.push(self.origin_node(public_ip, origin));

        let edges = nodes
            .windows(2)
            .map(|w| TopologyEdge {
                from_id: w[0].id.clone(),
                to_id: w[1].id.clone(),
            })
            .collect();

        Topology { nodes, edges }
    }

    fn client_node(&self, connection: &ConnectionFacts) -> TopologyNode {
        let mut n = node(NodeRole::Client);
        put(&mut n.metadata, "localAddress", connection.local_address.as_deref());
        put(&mut n.metadata, "hostname", connection.hostname.as_deref());
        put(&mut n.metadata, "connectionType", connection.connection_type.as_deref());
        n
    }

    fn gateway_node(&self, connection: &ConnectionFacts) -> TopologyNode {
        let mut n = node(NodeRole::Gateway);
        put(&mut n.metadata, "address", connection.gateway_address.as_deref());
        n
    }

    fn isp_node(&self, public_ip: Option<&PublicIpInfo>) -> TopologyNode {
        let mut n = node(NodeRole::Isp);
        let info = public_ip.cloned().unwrap_or_default();
        let address = Some(info.address.as_str()).filter(|a| !a.is_empty());

        put(&mut n.metadata, "publicIp", address);
        put(&mut n.metadata, "org", info.org.as_deref());
        put(&mut n.metadata, "city", info.city.as_deref());
        put(&mut n.metadata, "country", info.country.as_deref());
        put(&mut n.metadata, "lat", info.lat.map(|v| v.to_string()).as_deref());
        put(&mut n.metadata, "lon", info.lon.map(|v| v.to_string()).as_deref());

        n.provider_label = address.and_then(|ip| self.hosting.classify(ip));
        n
    }

    fn cdn_node(&self, origin: &OriginFacts) -> TopologyNode {
        let mut n = node(NodeRole::Cdn);

        match self.cdn.first_match(&origin.serving_ips) {
            Some((ip, provider)) => {
                n.metadata.insert("address".into(), ip);
                n.metadata.insert("provider".into(), provider.clone());
                n.provider_label = Some(provider);
            }
            None => {
                put(&mut n.metadata, "address", None);
                put(&mut n.metadata, "provider", None);
            }
        }
        n
    }

    fn origin_node(&self, public_ip: Option<&PublicIpInfo>, origin: &OriginFacts) -> TopologyNode {
        let mut n = node(NodeRole::Origin);
        if let Some(domain) = &origin.domain {
            n.display_name = domain.clone();
        }

        let redundancy = redundancy(&origin.serving_ips);
        let hosting = self.hosting.first_match(&origin.serving_ips).map(|(_, p)| p);

        put(&mut n.metadata, "domain", origin.domain.as_deref());
        let ips = origin.serving_ips.join(",");
        put(&mut n.metadata, "servingIps", Some(ips.as_str()).filter(|s| !s.is_empty()));
        n.metadata.insert("redundancy".into(), redundancy.to_string());
        n.metadata.insert(
            "anycastLikely".into(),
            anycast_likely(redundancy, self.settings.anycast_min, self.settings.anycast_max).to_string(),
        );
        n.metadata.insert("loadBalanced".into(), (redundancy > 1).to_string());
        put(&mut n.metadata, "hostingProvider", hosting.as_deref());

        let client_coords = public_ip.and_then(|p| p.lat.zip(p.lon));
        let origin_coords = origin
            .lat
            .zip(origin.lon)
            .or_else(|| self.settings.origin_lat.zip(self.settings.origin_lon));
        let distance = client_coords
            .zip(origin_coords)
            .map(|((lat1, lon1), (lat2, lon2))| format!("{:.1}", haversine_km(lat1, lon1, lat2, lon2)));
        put(&mut n.metadata, "distanceKm", distance.as_deref());

        n.provider_label = hosting;
        n
    }
}

fn node(role: NodeRole) -> TopologyNode {
    TopologyNode {
        id: role.as_str().to_string(),
        display_name: role.display_name().to_string(),
        role,
        provider_label: None,
        metadata: BTreeMap::new(),
    }
}

fn put(metadata: &mut BTreeMap<String, String>, key: &str, value: Option<&str>) {
    metadata.insert(key.to_string(), value.unwrap_or(UNKNOWN).to_string());
}

/// Number of distinct serving addresses
pub fn redundancy(ips: &[String]) -> usize {
    ips.iter().collect::<HashSet<_>>().len()
}

/// Heuristic: a handful of addresses behind one name suggests anycast
pub fn anycast_likely(redundancy: usize, min: usize, max: usize) -> bool {
    (min..=max).contains(&redundancy)
}

/// Great-circle distance between two coordinates
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Address of the interface that would route to the internet. No packet is sent.
pub fn detect_local_address() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|a| a.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inference() -> TopologyInference {
        TopologyInference::with_default_tables(TopologySettings::default())
    }

    #[test]
    fn test_empty_facts_still_produce_full_path() {
        let topology = inference().infer(&ConnectionFacts::default(), None, &OriginFacts::default());

        let roles: Vec<NodeRole> = topology.nodes.iter().map(|n| n.role).collect();
        assert_eq!(roles, NodeRole::PATH.to_vec());
        assert!(topology.is_canonical_path());

        let client = topology.node(NodeRole::Client).unwrap();
        assert_eq!(client.metadata["localAddress"], UNKNOWN);
        assert_eq!(topology.node(NodeRole::Origin).unwrap().metadata["redundancy"], "0");
        assert_eq!(topology.node(NodeRole::Origin).unwrap().metadata["anycastLikely"], "false");
    }

    #[test]
    fn test_backbone_can_be_left_out() {
        let settings = TopologySettings {
            include_backbone: false,
            ..Default::default()
        };
        let topology = TopologyInference::with_default_tables(settings)
            .infer(&ConnectionFacts::default(), None, &OriginFacts::default());

        assert_eq!(topology.nodes.len(), 5);
        assert!(topology.node(NodeRole::Backbone).is_none());
        assert!(topology.is_canonical_path());
    }

    #[test]
    fn test_cdn_labeled_from_serving_ip() {
        let origin = OriginFacts {
            domain: Some("example.github.io".into()),
            serving_ips: vec!["185.199.108.10".into(), "185.199.109.153".into()],
            ..Default::default()
        };
        let topology = inference().infer(&ConnectionFacts::default(), None, &origin);

        let cdn = topology.node(NodeRole::Cdn).unwrap();
        assert_eq!(cdn.provider_label.as_deref(), Some("github"));
        assert_eq!(cdn.metadata["address"], "185.199.108.10");

        let origin_node = topology.node(NodeRole::Origin).unwrap();
        assert_eq!(origin_node.display_name, "example.github.io");
        assert_eq!(origin_node.provider_label.as_deref(), Some("GitHub Pages"));
        assert_eq!(origin_node.metadata["redundancy"], "2");
        assert_eq!(origin_node.metadata["anycastLikely"], "true");
        assert_eq!(origin_node.metadata["loadBalanced"], "true");
    }

    #[test]
    fn test_unmatched_ip_leaves_cdn_unlabeled() {
        let origin = OriginFacts {
            serving_ips: vec!["93.184.216.34".into()],
            ..Default::default()
        };
        let topology = inference().infer(&ConnectionFacts::default(), None, &origin);

        let cdn = topology.node(NodeRole::Cdn).unwrap();
        assert_eq!(cdn.provider_label, None);
        assert_eq!(cdn.metadata["provider"], UNKNOWN);
    }

    #[test]
    fn test_redundancy_counts_distinct_ips() {
        let ips: Vec<String> = ["1.1.1.1", "1.1.1.1", "1.0.0.1"].iter().map(|s| s.to_string()).collect();
        assert_eq!(redundancy(&ips), 2);

        assert!(!anycast_likely(0, 1, 4));
        assert!(anycast_likely(1, 1, 4));
        assert!(anycast_likely(4, 1, 4));
        assert!(!anycast_likely(5, 1, 4));
    }

    #[test]
    fn test_haversine_known_distance() {
        // Paris -> London, roughly 344 km
        let d = haversine_km(48.8566, 2.3522, 51.5074, -0.1278);
        assert!((d - 343.5).abs() < 2.0, "got {}", d);
        assert_eq!(haversine_km(10.0, 10.0, 10.0, 10.0), 0.0);
    }

    #[test]
    fn test_distance_needs_both_ends() {
        let public_ip = PublicIpInfo {
            address: "203.0.113.7".into(),
            lat: Some(48.8566),
            lon: Some(2.3522),
            ..Default::default()
        };
        let settings = TopologySettings {
            origin_lat: Some(51.5074),
            origin_lon: Some(-0.1278),
            ..Default::default()
        };
        let with_origin = TopologyInference::with_default_tables(settings);
        let topology = with_origin.infer(&ConnectionFacts::default(), Some(&public_ip), &OriginFacts::default());
        assert_ne!(topology.node(NodeRole::Origin).unwrap().metadata["distanceKm"], UNKNOWN);

        let topology = inference().infer(&ConnectionFacts::default(), Some(&public_ip), &OriginFacts::default());
        assert_eq!(topology.node(NodeRole::Origin).unwrap().metadata["distanceKm"], UNKNOWN);

        let isp = topology.node(NodeRole::Isp).unwrap();
        assert_eq!(isp.metadata["publicIp"], "203.0.113.7");
        assert_eq!(isp.metadata["org"], UNKNOWN);
    }
}
