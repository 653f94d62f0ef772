//! Metrics Module - Rolling Measurement Windows
//!
//! - `buffer.rs` - fixed-capacity FIFO with streaming stats
//! - `store.rs` - all buffers of an engine run + reachability counters
//! - `sampler.rs` - per-metric tick functions
//! - `stats.rs` - per-tick math (mean, MAD, loss ratio)

pub mod types;
pub mod stats;
pub mod buffer;
pub mod store;
pub mod sampler;

pub use types::{LatencyBurst, MetricKind, MetricSnapshot, MetricStats, Sample};
pub use buffer::{BufferError, RollingBuffer};
pub use store::{MetricStore, ReachabilityTracker};
pub use sampler::MetricSampler;
