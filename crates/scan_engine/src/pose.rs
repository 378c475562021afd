//! SensorPose - sensor-local <-> world conversions
//!
//! Frames are right-handed, Z up. A local ray at vertical angle `v` and
//! horizontal angle `h` points along `(cos v cos h, cos v sin h, sin v)`.
//! Output points are expressed relative to the sensor origin with only the
//! yaw undone, so they stay level with the world horizon.

use contracts::{Transform, Vector3};
use nalgebra as na;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorPose {
    origin: na::Vector3<f64>,
    body: na::UnitQuaternion<f64>,
    inverse_yaw: na::UnitQuaternion<f64>,
}

impl SensorPose {
    pub fn from_transform(transform: &Transform) -> Self {
        let location = transform.location;
        let rotation = transform.rotation;
        let yaw = rotation.yaw.to_radians();

        // Positive pitch raises the forward axis, hence the sign flip
        let body = na::UnitQuaternion::from_euler_angles(
            rotation.roll.to_radians(),
            -rotation.pitch.to_radians(),
            yaw,
        );
        let inverse_yaw = na::UnitQuaternion::from_axis_angle(&na::Vector3::z_axis(), -yaw);

        Self {
            origin: na::Vector3::new(location.x, location.y, location.z),
            body,
            inverse_yaw,
        }
    }

    /// World position shared by every ray
    pub fn origin(&self) -> Vector3 {
        from_na(&self.origin)
    }

    /// Unit world direction of a ray given in sensor-local angles (degrees)
    pub fn world_direction(&self, vertical_deg: f32, horizontal_deg: f32) -> Vector3 {
        let v = f64::from(vertical_deg).to_radians();
        let h = f64::from(horizontal_deg).to_radians();
        let local = na::Vector3::new(v.cos() * h.cos(), v.cos() * h.sin(), v.sin());
        from_na(&(self.body * local))
    }

    /// Express a world point relative to the sensor origin, yaw removed
    pub fn to_sensor_local(&self, world: Vector3) -> Vector3 {
        let relative = to_na(world) - self.origin;
        from_na(&(self.inverse_yaw * relative))
    }
}

impl Default for SensorPose {
    fn default() -> Self {
        Self::from_transform(&Transform::default())
    }
}

#[inline]
pub(crate) fn to_na(v: Vector3) -> na::Vector3<f64> {
    na::Vector3::new(f64::from(v.x), f64::from(v.y), f64::from(v.z))
}

#[inline]
pub(crate) fn from_na(v: &na::Vector3<f64>) -> Vector3 {
    Vector3::new(v.x as f32, v.y as f32, v.z as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Location, Rotation};

    const EPS: f32 = 1e-5;

    fn pose(location: Location, rotation: Rotation) -> SensorPose {
        SensorPose::from_transform(&Transform::new(location, rotation))
    }

    #[test]
    fn test_identity_directions() {
        let p = SensorPose::default();
        assert!(p
            .world_direction(0.0, 0.0)
            .approx_eq(Vector3::new(1.0, 0.0, 0.0), EPS));
        assert!(p
            .world_direction(0.0, 90.0)
            .approx_eq(Vector3::new(0.0, 1.0, 0.0), EPS));
        assert!(p
            .world_direction(90.0, 0.0)
            .approx_eq(Vector3::new(0.0, 0.0, 1.0), EPS));
        assert!(p
            .world_direction(-30.0, 180.0)
            .approx_eq(Vector3::new(-(30f32.to_radians().cos()), 0.0, -0.5), EPS));
    }

    #[test]
    fn test_directions_are_unit() {
        let p = pose(Location::default(), Rotation::new(12.0, -70.0, 5.0));
        for v in [-30.0, -10.0, 0.0, 15.0] {
            for h in [0.0, 45.0, 123.4, 359.0] {
                assert!((p.world_direction(v, h).norm() - 1.0).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_yaw_and_pitch() {
        let yawed = pose(Location::default(), Rotation::new(0.0, 90.0, 0.0));
        assert!(yawed
            .world_direction(0.0, 0.0)
            .approx_eq(Vector3::new(0.0, 1.0, 0.0), EPS));

        let pitched = pose(Location::default(), Rotation::new(90.0, 0.0, 0.0));
        assert!(pitched
            .world_direction(0.0, 0.0)
            .approx_eq(Vector3::new(0.0, 0.0, 1.0), EPS));
    }

    #[test]
    fn test_to_sensor_local_undoes_yaw_only() {
        let p = pose(Location::new(10.0, 5.0, 2.0), Rotation::new(30.0, 90.0, 0.0));

        // 4 m along world +X from the origin
        let local = p.to_sensor_local(Vector3::new(14.0, 5.0, 2.0));
        assert!(local.approx_eq(Vector3::new(0.0, -4.0, 0.0), 1e-4));

        // Height is kept relative to the origin regardless of pitch
        let below = p.to_sensor_local(Vector3::new(10.0, 5.0, 0.0));
        assert!(below.approx_eq(Vector3::new(0.0, 0.0, -2.0), 1e-4));
    }
}
