//! # Scan Engine
//!
//! Rotating multi-channel ray-cast LiDAR.
//!
//! Responsibilities:
//! - `LaserGeometry`: vertical angle per channel
//! - `ScanPlanner`: samples, angle step and next phase per tick
//! - `RayIssuer`: one batched oracle query per channel, hits to local frame
//! - `RayCastLidar`: tick orchestration, pooled measurements, frame encoding
//! - `MockScene`: analytic oracle/registry for demos and tests
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use contracts::{LidarDescription, RuntimeOptions};
//! use scan_engine::{MockScene, RayCastLidar};
//!
//! let scene = Arc::new(MockScene::new().with_ground(-1.7, Some(1)));
//! let mut lidar = RayCastLidar::with_description(
//!     "roof",
//!     LidarDescription::default(),
//!     scene.clone(),
//!     scene,
//!     RuntimeOptions::default(),
//! )
//! .unwrap();
//!
//! let frame = lidar.tick(0.1).unwrap();
//! assert_eq!(frame.channel_count(), 32);
//! assert!(frame.point_count() > 0);
//! ```

mod error;
mod geometry;
mod mock;
mod planner;
mod pose;
mod ray_issuer;
mod sensor;

pub use error::ScanError;
pub use geometry::LaserGeometry;
pub use mock::MockScene;
pub use planner::{wrap_degrees, ScanPlan, ScanPlanner, Sweep};
pub use pose::SensorPose;
pub use ray_issuer::{ChannelScan, RayIssuer};
pub use sensor::RayCastLidar;
