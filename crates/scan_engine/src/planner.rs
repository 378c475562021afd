//! ScanPlanner - how many rays each channel fires this tick, and where

use contracts::LidarDescription;

const FULL_TURN_DEG: f64 = 360.0;

/// Horizontal sweep of one non-empty tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sweep {
    pub samples_per_channel: u32,
    /// Degrees between consecutive samples
    pub angle_step: f32,
}

impl Sweep {
    /// Horizontal angle of sample `index`, unwrapped
    #[inline]
    pub fn horizontal_angle(&self, start: f32, index: u32) -> f32 {
        (f64::from(start) + f64::from(self.angle_step) * f64::from(index)) as f32
    }
}

/// Plan of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanPlan {
    /// Scan phase at the start of the tick (degrees, [0, 360))
    pub start_angle: f32,
    /// Degrees swept during the tick
    pub angle_distance: f32,
    /// Scan phase for the next tick (degrees, [0, 360))
    pub next_angle: f32,
    /// None when the tick is too short to fire a single ray per channel
    pub sweep: Option<Sweep>,
}

impl ScanPlan {
    #[inline]
    pub fn is_empty_tick(&self) -> bool {
        self.sweep.is_none()
    }

    pub fn samples_per_channel(&self) -> u32 {
        self.sweep.map_or(0, |s| s.samples_per_channel)
    }
}

pub struct ScanPlanner;

impl ScanPlanner {
    /// Plan a tick of `tick_duration` seconds starting at `current_angle`.
    ///
    /// Callers pass a finite, non-negative duration and a validated
    /// description. The phase advances even when no ray is requested.
    pub fn plan(
        description: &LidarDescription,
        tick_duration: f64,
        current_angle: f32,
    ) -> ScanPlan {
        let channels = f64::from(description.channels.max(1));
        let samples = (f64::from(description.points_per_second) * tick_duration / channels)
            .round()
            .clamp(0.0, f64::from(u32::MAX)) as u32;

        let angle_distance =
            f64::from(description.rotation_frequency) * FULL_TURN_DEG * tick_duration;
        let next_angle = wrap_degrees(f64::from(current_angle) + angle_distance);

        let sweep = (samples > 0).then(|| Sweep {
            samples_per_channel: samples,
            angle_step: (angle_distance / f64::from(samples)) as f32,
        });

        ScanPlan {
            start_angle: current_angle,
            angle_distance: angle_distance as f32,
            next_angle,
            sweep,
        }
    }
}

/// Normalize to [0, 360)
pub fn wrap_degrees(angle: f64) -> f32 {
    let wrapped = angle.rem_euclid(FULL_TURN_DEG) as f32;
    // f32 rounding can land exactly on the upper bound
    if wrapped >= FULL_TURN_DEG as f32 {
        0.0
    } else {
        wrapped
    }
}
