//! TickReport - per-tick diagnostics attached to every frame

use serde::{Deserialize, Serialize};

/// Diagnostics of one sensor tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// Monotonic frame counter of the sensor
    pub frame_id: u64,

    /// Simulation time at the end of the tick (seconds)
    pub timestamp: f64,

    /// Tick duration supplied by the caller (seconds)
    pub tick_duration: f64,

    /// Samples per channel this tick (0 = empty tick)
    pub samples_per_channel: u32,

    /// Rays submitted to the oracle across all channels
    pub rays_cast: u64,

    /// Points written into the measurement
    pub points: u64,

    /// Hits whose object id could not be resolved
    pub unresolved_hits: u64,

    /// Channels whose oracle call failed (treated as all-miss)
    pub failed_channels: u32,

    /// Horizontal angle at the start of the tick (degrees)
    pub start_angle: f32,

    /// Horizontal angle persisted for the next tick (degrees)
    pub next_angle: f32,

    /// Wall-clock processing time of the tick (milliseconds)
    pub elapsed_ms: f64,
}

impl TickReport {
    /// True when the planner requested no rays this tick
    pub fn is_empty_tick(&self) -> bool {
        self.samples_per_channel == 0
    }

    /// Fraction of rays that produced a point
    pub fn hit_ratio(&self) -> f64 {
        if self.rays_cast == 0 {
            0.0
        } else {
            self.points as f64 / self.rays_cast as f64
        }
    }
}
