//! Topology Types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical hop roles, in path order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Client,
    Gateway,
    Isp,
    Backbone,
    Cdn,
    Origin,
}

impl NodeRole {
    pub const PATH: [NodeRole; 6] = [
        NodeRole::Client,
        NodeRole::Gateway,
        NodeRole::Isp,
        NodeRole::Backbone,
        NodeRole::Cdn,
        NodeRole::Origin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Client => "client",
            NodeRole::Gateway => "gateway",
            NodeRole::Isp => "isp",
            NodeRole::Backbone => "backbone",
            NodeRole::Cdn => "cdn",
            NodeRole::Origin => "origin",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            NodeRole::Client => "Client Device",
            NodeRole::Gateway => "Local Gateway",
            NodeRole::Isp => "Regional ISP",
            NodeRole::Backbone => "Internet Backbone",
            NodeRole::Cdn => "CDN Edge Server",
            NodeRole::Origin => "Origin Server",
        }
    }

    /// Position in the canonical ordering
    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyNode {
    pub id: String,
    pub display_name: String,
    pub role: NodeRole,
    pub provider_label: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyEdge {
    pub from_id: String,
    pub to_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub nodes: Vec<TopologyNode>,
    pub edges: Vec<TopologyEdge>,
}

impl Topology {
    pub fn node(&self, role: NodeRole) -> Option<&TopologyNode> {
        self.nodes.iter().find(|n| n.role == role)
    }

    /// Roles strictly follow the canonical order and edges link each node to the next
    pub fn is_canonical_path(&self) -> bool {
        let ordered = self.nodes.windows(2).all(|w| w[0].role < w[1].role);
        let linked = self.edges.len() == self.nodes.len().saturating_sub(1)
            && self
                .edges
                .iter()
                .zip(self.nodes.windows(2))
                .all(|(e, w)| e.from_id == w[0].id && e.to_id == w[1].id);
        ordered && linked
    }
}

/// Local facts about the client side of the path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionFacts {
    pub local_address: Option<String>,
    pub hostname: Option<String>,
    pub gateway_address: Option<String>,
    pub connection_type: Option<String>,
}

/// What is known about the analysed site
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginFacts {
    pub domain: Option<String>,
    /// A-record addresses, resolver order
    pub serving_ips: Vec<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}
