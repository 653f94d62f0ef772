//! PathScope Core - Network Telemetry & Topology Inference Engine
//!
//! Periodically samples latency, packet loss, jitter and bandwidth against a
//! set of targets, reconstructs a domain's DNS resolution chain with a few
//! security heuristics, infers a best-guess network path and publishes it all
//! as one immutable [`HealthSnapshot`](logic::scoring::HealthSnapshot).

pub mod constants;
pub mod logic;
pub mod api;
