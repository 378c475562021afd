//! LaserGeometry - vertical angle of every channel

use contracts::LidarDescription;

use crate::ScanError;

/// Fixed vertical angles (degrees), index 0 = upper limit
#[derive(Debug, Clone, PartialEq)]
pub struct LaserGeometry {
    vertical_angles: Vec<f32>,
}

impl LaserGeometry {
    /// Spread `channel_count` lasers evenly from `upper_limit` down to
    /// `lower_limit`, both inclusive. A single laser sits at the upper limit.
    pub fn configure(
        channel_count: u32,
        lower_limit: f32,
        upper_limit: f32,
    ) -> Result<Self, ScanError> {
        if channel_count == 0 {
            return Err(ScanError::invalid_configuration(
                "channel count must be >= 1",
            ));
        }
        if !lower_limit.is_finite() || !upper_limit.is_finite() {
            return Err(ScanError::invalid_configuration(format!(
                "vertical limits must be finite (lower={lower_limit}, upper={upper_limit})"
            )));
        }
        if lower_limit > upper_limit {
            return Err(ScanError::invalid_configuration(format!(
                "lower limit {lower_limit} is above upper limit {upper_limit}"
            )));
        }

        let upper = f64::from(upper_limit);
        let vertical_angles = if channel_count == 1 {
            vec![upper_limit]
        } else {
            let delta = (upper - f64::from(lower_limit)) / f64::from(channel_count - 1);
            (0..channel_count)
                .map(|i| (upper - f64::from(i) * delta) as f32)
                .collect()
        };

        Ok(Self { vertical_angles })
    }

    pub fn from_description(description: &LidarDescription) -> Result<Self, ScanError> {
        Self::configure(
            description.channels,
            description.lower_fov,
            description.upper_fov,
        )
    }

    #[inline]
    pub fn channel_count(&self) -> u32 {
        self.vertical_angles.len() as u32
    }

    #[inline]
    pub fn vertical_angle(&self, channel: u32) -> Option<f32> {
        self.vertical_angles.get(channel as usize).copied()
    }

    #[inline]
    pub fn vertical_angles(&self) -> &[f32] {
        &self.vertical_angles
    }
}
