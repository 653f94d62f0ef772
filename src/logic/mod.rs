//! Logic Module - Telemetry & Inference Engines
//!
//! ## Architecture
//! - `probe/` - pluggable measurement primitives (trait + HTTP implementation)
//! - `metrics/` - rolling buffers, sampler ticks, reachability
//! - `dns/` - resolution chain reconstruction and security checks
//! - `topology/` - best-guess client → origin path
//! - `scoring/` - health score and snapshot publishing
//! - `engine/` - lifecycle controller and periodic scheduling
//! - `config.rs` - `EngineConfig` with file/env layering

pub mod config;
pub mod probe;
pub mod metrics;
pub mod dns;
pub mod topology;
pub mod scoring;
pub mod engine;

pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, EngineError};
