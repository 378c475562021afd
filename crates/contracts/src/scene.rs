//! Scene collaborators - intersection oracle and object registry
//!
//! Both are owned by the host engine. The sensor core only sees them
//! through these traits, injected at construction.

use thiserror::Error;

use crate::Vector3;

/// Groundtruth object identifier written into frames
pub type ObjectId = u32;

/// Opaque engine handle of the surface a ray hit
pub type SceneRef = u64;

/// Impact of one ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World-space impact point
    pub impact_point: Vector3,

    /// Engine reference of the hit object
    pub scene_ref: SceneRef,
}

/// Result of one ray query. `None` is a miss.
pub type HitResult = Option<RayHit>;

/// A ray hit a surface whose object id could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unresolved hit: scene object {scene_ref} has no registered id")]
pub struct UnresolvedHit {
    pub scene_ref: SceneRef,
}

/// Intersection oracle failure
#[derive(Debug, Clone, Error)]
#[error("intersection oracle failed: {message}")]
pub struct OracleError {
    pub message: String,
}

impl OracleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Batched ray/intersection oracle
///
/// `origins` and `directions` are index-aligned; directions are unit vectors.
/// The returned vector should hold one `HitResult` per ray in the same order.
/// Callers must tolerate short or long results.
pub trait IntersectionOracle: Send + Sync {
    /// Trace a batch of rays up to `max_range` metres
    fn trace(
        &self,
        origins: &[Vector3],
        directions: &[Vector3],
        max_range: f32,
    ) -> Result<Vec<HitResult>, OracleError>;
}

/// Maps engine scene references to stable groundtruth ids
pub trait ObjectRegistry: Send + Sync {
    /// Resolve the object id of a hit surface
    fn resolve_object_id(&self, scene_ref: SceneRef) -> Result<ObjectId, UnresolvedHit>;
}
