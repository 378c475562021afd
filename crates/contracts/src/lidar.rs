//! LidarDescription - sensor parameters
//!
//! Immutable after construction. Defaults follow the stock ray-cast lidar
//! definition (32 channels, 10 m, 56k points/s, 10 Hz, +10/-30 degrees).

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::ContractError;

/// Upper bound on `points_per_second`
pub const MAX_POINTS_PER_SECOND: u32 = 10_000_000;

/// Upper bound on rays one tick may request across all channels
pub const MAX_RAYS_PER_TICK: u64 = 1 << 24;

/// Ray-cast lidar description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_description"))]
#[serde(default)]
pub struct LidarDescription {
    /// Number of lasers (vertical channels), must be >= 1
    #[validate(range(min = 1, message = "channels must be >= 1"))]
    pub channels: u32,

    /// Maximum ray length in metres
    #[validate(range(exclusive_min = 0.0, message = "range must be > 0"))]
    pub range: f32,

    /// Points generated by all lasers per second
    #[validate(range(
        max = MAX_POINTS_PER_SECOND,
        message = "points_per_second must be <= 10000000"
    ))]
    pub points_per_second: u32,

    /// Lidar rotation frequency (revolutions per second)
    #[validate(range(min = 0.0, message = "rotation_frequency must be >= 0"))]
    pub rotation_frequency: f32,

    /// Upper laser angle, counts from horizontal, positive is above (degrees)
    #[validate(range(min = -90.0, max = 90.0))]
    pub upper_fov: f32,

    /// Lower laser angle, counts from horizontal, negative is below (degrees)
    #[validate(range(min = -90.0, max = 90.0))]
    pub lower_fov: f32,
}

impl Default for LidarDescription {
    fn default() -> Self {
        Self {
            channels: 32,
            range: 10.0,
            points_per_second: 56_000,
            rotation_frequency: 10.0,
            upper_fov: 10.0,
            lower_fov: -30.0,
        }
    }
}

impl LidarDescription {
    /// Validate and convert failures into `ContractError::InvalidConfiguration`
    pub fn check(&self) -> Result<(), ContractError> {
        self.validate()
            .map_err(|e| ContractError::invalid_configuration(e.to_string()))
    }
}

fn validate_description(description: &LidarDescription) -> Result<(), ValidationError> {
    let finite = description.range.is_finite()
        && description.rotation_frequency.is_finite()
        && description.upper_fov.is_finite()
        && description.lower_fov.is_finite();
    if !finite {
        return Err(ValidationError::new("non_finite")
            .with_message("lidar parameters must be finite".into()));
    }

    if description.lower_fov > description.upper_fov {
        return Err(ValidationError::new("fov_order").with_message(
            format!(
                "lower_fov ({}) must be <= upper_fov ({})",
                description.lower_fov, description.upper_fov
            )
            .into(),
        ));
    }

    Ok(())
}
