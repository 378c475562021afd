//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the LiDAR workspace.
//! Business crates depend on this crate only, never on each other's internals.
//!
//! ## Coordinate model
//! - Right-handed, Z up, metres. Angles in configuration are degrees.
//! - Sensor-local X points along horizontal angle 0, Y along 90 degrees.
//!
//! ## Time model
//! - Simulation time in seconds (f64), advanced by the caller through
//!   explicit ticks. There is no implicit clock.

mod blueprint;
mod error;
mod geometry;
mod lidar;
mod report;
mod scene;
mod sensor_id;

pub use blueprint::*;
pub use error::*;
pub use geometry::*;
pub use lidar::*;
pub use report::TickReport;
pub use scene::*;
pub use sensor_id::SensorId;
