//! Provider and decision statistics, summarised per cycle.

pub mod engine;
pub mod stats;

pub use engine::{MetricsEngine, QueryOutcome};
