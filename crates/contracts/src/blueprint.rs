//! LidarBlueprint - Config Loader output
//!
//! Describes one simulation run: the sensor and its mount, the tick cadence,
//! runtime knobs of the scan pipeline, an optional demo scene and the output
//! sinks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{LidarDescription, Location, ObjectId, Transform};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete run blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LidarBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Sensor definition and mount pose
    pub sensor: SensorSpec,

    /// Tick cadence and motion of the carrier
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Scan pipeline knobs
    #[serde(default)]
    pub runtime: RuntimeOptions,

    /// Demo scene traced by the mock oracle
    #[serde(default)]
    pub scene: SceneConfig,

    /// Output routing
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Sensor definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSpec {
    /// Unique identifier
    pub id: String,

    /// Lidar parameters
    #[serde(default)]
    pub description: LidarDescription,

    /// Initial world pose of the sensor
    #[serde(default)]
    pub transform: Transform,
}

/// Simulation cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Fixed tick duration (seconds), must be > 0
    #[serde(default = "default_tick_duration")]
    pub tick_duration_s: f64,

    /// Number of ticks to run (0 = until interrupted)
    #[serde(default)]
    pub max_ticks: u64,

    /// Pace ticks against the wall clock
    #[serde(default)]
    pub realtime: bool,

    /// Optional constant motion of the sensor carrier
    #[serde(default)]
    pub motion: Option<MotionConfig>,
}

fn default_tick_duration() -> f64 {
    0.1
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_duration_s: default_tick_duration(),
            max_ticks: 0,
            realtime: false,
            motion: None,
        }
    }
}

/// Constant carrier motion
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MotionConfig {
    /// World-frame linear velocity (m/s)
    #[serde(default)]
    pub velocity: Location,

    /// Yaw rate (deg/s)
    #[serde(default)]
    pub yaw_rate_deg_s: f64,
}

/// Scan pipeline knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeOptions {
    /// Shoot channels concurrently
    #[serde(default = "default_parallel_channels")]
    pub parallel_channels: bool,

    /// Idle measurement buffers retained by the pool
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle: usize,

    /// What to do with hits whose object id cannot be resolved
    #[serde(default)]
    pub unresolved_hit_policy: UnresolvedHitPolicy,
}

fn default_parallel_channels() -> bool {
    true
}

fn default_pool_max_idle() -> usize {
    4
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            parallel_channels: default_parallel_channels(),
            pool_max_idle: default_pool_max_idle(),
            unresolved_hit_policy: UnresolvedHitPolicy::default(),
        }
    }
}

/// Policy for hits that fail object-id resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedHitPolicy {
    /// Drop the point from the measurement
    #[default]
    Drop,
    /// Keep the point and tag it with the given id
    Sentinel(ObjectId),
}

/// Demo scene for the mock intersection oracle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Infinite horizontal ground plane
    #[serde(default)]
    pub ground: Option<GroundConfig>,

    /// Finite objects
    #[serde(default)]
    pub objects: Vec<SceneObjectConfig>,
}

/// Ground plane at a fixed height
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GroundConfig {
    /// Plane height (m)
    #[serde(default)]
    pub height: f64,

    /// Groundtruth id (None = not registered)
    #[serde(default)]
    pub object_id: Option<ObjectId>,
}

/// Scene object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObjectConfig {
    /// Groundtruth id (None = not registered)
    #[serde(default)]
    pub object_id: Option<ObjectId>,

    /// Geometry
    #[serde(flatten)]
    pub shape: ShapeConfig,
}

/// Scene object geometry
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ShapeConfig {
    Sphere { center: Location, radius: f64 },
    Box { min: Location, max: Location },
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log frame summaries
    Log,
    /// Write frames to disk
    File,
}

impl LidarBlueprint {
    /// Build a blueprint around a sensor with every other section defaulted
    pub fn for_sensor(id: impl Into<String>, description: LidarDescription) -> Self {
        Self {
            version: ConfigVersion::V1,
            sensor: SensorSpec {
                id: id.into(),
                description,
                transform: Transform::default(),
            },
            simulation: SimulationConfig::default(),
            runtime: RuntimeOptions::default(),
            scene: SceneConfig::default(),
            sinks: Vec::new(),
        }
    }

    /// Rays one tick will request across all channels
    pub fn rays_per_tick(&self) -> u64 {
        let description = &self.sensor.description;
        if description.channels == 0 {
            return 0;
        }
        let per_channel = (f64::from(description.points_per_second)
            * self.simulation.tick_duration_s
            / f64::from(description.channels))
        .round();
        per_channel.max(0.0) as u64 * u64::from(description.channels)
    }
}
