//! Topology Module - Best-Guess Network Path
//!
//! - `prefix.rs` - provider prefix tables (first match wins)
//! - `inference.rs` - canonical path construction + derived facts
//!
//! All of this is heuristic display data.

pub mod types;
pub mod prefix;
pub mod inference;

pub use types::{ConnectionFacts, NodeRole, OriginFacts, Topology, TopologyEdge, TopologyNode};
pub use prefix::{ns_provider, ProviderClassifier, ProviderPrefixTable};
pub use inference::{anycast_likely, haversine_km, redundancy, TopologyInference};
