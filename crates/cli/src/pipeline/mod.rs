//! Simulation pipeline: sensor tick loop feeding the dispatcher.

mod orchestrator;
mod stats;

pub use orchestrator::{Pipeline, PipelineConfig};
pub use stats::PipelineStats;
