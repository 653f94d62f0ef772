//! Scoring Module - Health Snapshot Composition
//!
//! - `score.rs` - weighted-penalty score (0-100)
//! - `aggregator.rs` - composes and atomically publishes snapshots
//! - `types.rs` - `HealthSnapshot`, `ScoreWeights`, rating

pub mod types;
pub mod score;
pub mod aggregator;

pub use types::{HealthSnapshot, PenaltyStep, PerformanceRating, ScoreWeights, TargetHealth};
pub use score::{compute_score, ScoreInputs};
pub use aggregator::{Aggregator, LatestAnalysis, SnapshotPublisher};
