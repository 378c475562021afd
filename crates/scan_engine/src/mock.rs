//! MockScene - analytic scene standing in for a physics engine
//!
//! Implements both collaborator traits so a sensor can run without a host
//! engine: a horizontal ground plane, spheres, and axis-aligned boxes.
//! Objects added without an id stay unregistered and produce unresolved
//! hits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{
    HitResult, IntersectionOracle, Location, ObjectId, ObjectRegistry, OracleError, RayHit,
    SceneConfig, SceneRef, ShapeConfig, UnresolvedHit, Vector3,
};
use nalgebra as na;

use crate::pose::{from_na, to_na};

/// Rays starting closer than this to a surface ignore it
const MIN_HIT_DISTANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
enum Shape {
    Ground { height: f64 },
    Sphere { center: na::Vector3<f64>, radius: f64 },
    Aabb { min: na::Vector3<f64>, max: na::Vector3<f64> },
}

impl Shape {
    /// Distance along the unit direction `d` to the first surface crossing
    fn intersect(&self, o: &na::Vector3<f64>, d: &na::Vector3<f64>) -> Option<f64> {
        match *self {
            Shape::Ground { height } => {
                if d.z.abs() < f64::EPSILON {
                    return None;
                }
                let t = (height - o.z) / d.z;
                (t > MIN_HIT_DISTANCE).then_some(t)
            }
            Shape::Sphere { center, radius } => {
                let oc = o - center;
                let b = oc.dot(d);
                let c = oc.norm_squared() - radius * radius;
                let disc = b * b - c;
                if disc < 0.0 {
                    return None;
                }
                let sq = disc.sqrt();
                [-b - sq, -b + sq]
                    .into_iter()
                    .find(|t| *t > MIN_HIT_DISTANCE)
            }
            Shape::Aabb { min, max } => {
                let mut t_near = f64::NEG_INFINITY;
                let mut t_far = f64::INFINITY;
                for axis in 0..3 {
                    if d[axis].abs() < f64::EPSILON {
                        if o[axis] < min[axis] || o[axis] > max[axis] {
                            return None;
                        }
                        continue;
                    }
                    let t1 = (min[axis] - o[axis]) / d[axis];
                    let t2 = (max[axis] - o[axis]) / d[axis];
                    t_near = t_near.max(t1.min(t2));
                    t_far = t_far.min(t1.max(t2));
                }
                if t_far < t_near || t_far <= MIN_HIT_DISTANCE {
                    return None;
                }
                Some(if t_near > MIN_HIT_DISTANCE { t_near } else { t_far })
            }
        }
    }
}

#[derive(Debug)]
pub struct MockScene {
    /// Index + 1 is the scene reference of the shape
    shapes: Vec<Shape>,
    registered: HashMap<SceneRef, ObjectId>,
    trace_calls: AtomicU64,
    rays_traced: AtomicU64,
}

impl Default for MockScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScene {
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            registered: HashMap::new(),
            trace_calls: AtomicU64::new(0),
            rays_traced: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &SceneConfig) -> Self {
        let mut scene = Self::new();
        if let Some(ground) = config.ground {
            scene = scene.with_ground(ground.height, ground.object_id);
        }
        for object in &config.objects {
            scene = match object.shape {
                ShapeConfig::Sphere { center, radius } => {
                    scene.with_sphere(center, radius, object.object_id)
                }
                ShapeConfig::Box { min, max } => scene.with_box(min, max, object.object_id),
            };
        }
        scene
    }

    pub fn with_ground(self, height: f64, object_id: Option<ObjectId>) -> Self {
        self.with_shape(Shape::Ground { height }, object_id)
    }

    pub fn with_sphere(self, center: Location, radius: f64, object_id: Option<ObjectId>) -> Self {
        self.with_shape(
            Shape::Sphere {
                center: location(center),
                radius,
            },
            object_id,
        )
    }

    /// Axis-aligned box; corners are normalized
    pub fn with_box(self, a: Location, b: Location, object_id: Option<ObjectId>) -> Self {
        let (a, b) = (location(a), location(b));
        self.with_shape(
            Shape::Aabb {
                min: a.inf(&b),
                max: a.sup(&b),
            },
            object_id,
        )
    }

    fn with_shape(mut self, shape: Shape, object_id: Option<ObjectId>) -> Self {
        self.shapes.push(shape);
        let scene_ref = self.shapes.len() as SceneRef;
        if let Some(id) = object_id {
            self.registered.insert(scene_ref, id);
        }
        self
    }

    /// Number of shapes
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Batched `trace` calls served so far
    pub fn trace_calls(&self) -> u64 {
        self.trace_calls.load(Ordering::Relaxed)
    }

    pub fn rays_traced(&self) -> u64 {
        self.rays_traced.load(Ordering::Relaxed)
    }

    fn nearest_hit(&self, origin: Vector3, direction: Vector3, max_range: f64) -> HitResult {
        let o = to_na(origin);
        let d = to_na(direction).try_normalize(f64::EPSILON)?;

        let (index, t) = self
            .shapes
            .iter()
            .enumerate()
            .filter_map(|(i, shape)| shape.intersect(&o, &d).map(|t| (i, t)))
            .filter(|(_, t)| *t <= max_range)
            .min_by(|a, b| a.1.total_cmp(&b.1))?;

        Some(RayHit {
            impact_point: from_na(&(o + d * t)),
            scene_ref: index as SceneRef + 1,
        })
    }
}

impl IntersectionOracle for MockScene {
    fn trace(
        &self,
        origins: &[Vector3],
        directions: &[Vector3],
        max_range: f32,
    ) -> Result<Vec<HitResult>, OracleError> {
        if origins.len() != directions.len() {
            return Err(OracleError::new(format!(
                "{} origins vs {} directions",
                origins.len(),
                directions.len()
            )));
        }

        self.trace_calls.fetch_add(1, Ordering::Relaxed);
        self.rays_traced
            .fetch_add(origins.len() as u64, Ordering::Relaxed);

        let max_range = f64::from(max_range);
        Ok(origins
            .iter()
            .zip(directions)
            .map(|(o, d)| self.nearest_hit(*o, *d, max_range))
            .collect())
    }
}

impl ObjectRegistry for MockScene {
    fn resolve_object_id(&self, scene_ref: SceneRef) -> Result<ObjectId, UnresolvedHit> {
        self.registered
            .get(&scene_ref)
            .copied()
            .ok_or(UnresolvedHit { scene_ref })
    }
}

fn location(l: Location) -> na::Vector3<f64> {
    na::Vector3::new(l.x, l.y, l.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{GroundConfig, SceneObjectConfig};

    fn ray(scene: &MockScene, o: Vector3, d: Vector3, range: f32) -> HitResult {
        scene.trace(&[o], &[d], range).unwrap()[0]
    }

    #[test]
    fn test_ground_plane() {
        let scene = MockScene::new().with_ground(-1.0, Some(9));
        let hit = ray(
            &scene,
            Vector3::ZERO,
            Vector3::new(1.0, 0.0, -1.0),
            10.0,
        )
        .unwrap();
        assert!(hit.impact_point.approx_eq(Vector3::new(1.0, 0.0, -1.0), 1e-5));
        assert_eq!(scene.resolve_object_id(hit.scene_ref), Ok(9));

        // Upward and horizontal rays miss
        assert!(ray(&scene, Vector3::ZERO, Vector3::new(0.0, 0.0, 1.0), 10.0).is_none());
        assert!(ray(&scene, Vector3::ZERO, Vector3::new(1.0, 0.0, 0.0), 10.0).is_none());
    }

    #[test]
    fn test_sphere_outside_and_inside() {
        let scene = MockScene::new().with_sphere(Location::new(5.0, 0.0, 0.0), 1.0, Some(2));
        let hit = ray(&scene, Vector3::ZERO, Vector3::new(1.0, 0.0, 0.0), 10.0).unwrap();
        assert!(hit.impact_point.approx_eq(Vector3::new(4.0, 0.0, 0.0), 1e-5));

        // From inside the far wall is hit
        let hit = ray(
            &scene,
            Vector3::new(5.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            10.0,
        )
        .unwrap();
        assert!(hit.impact_point.approx_eq(Vector3::new(5.0, 1.0, 0.0), 1e-5));

        assert!(ray(&scene, Vector3::ZERO, Vector3::new(-1.0, 0.0, 0.0), 10.0).is_none());
    }

    #[test]
    fn test_box_and_nearest_wins() {
        let scene = MockScene::new()
            .with_box(Location::new(8.0, -1.0, -1.0), Location::new(9.0, 1.0, 1.0), Some(1))
            .with_box(Location::new(4.0, 1.0, 1.0), Location::new(3.0, -1.0, -1.0), Some(2));

        let hit = ray(&scene, Vector3::ZERO, Vector3::new(1.0, 0.0, 0.0), 20.0).unwrap();
        assert!(hit.impact_point.approx_eq(Vector3::new(3.0, 0.0, 0.0), 1e-5));
        assert_eq!(scene.resolve_object_id(hit.scene_ref), Ok(2));
    }

    #[test]
    fn test_max_range() {
        let scene = MockScene::new().with_sphere(Location::new(5.0, 0.0, 0.0), 1.0, Some(2));
        assert!(ray(&scene, Vector3::ZERO, Vector3::new(1.0, 0.0, 0.0), 3.9).is_none());
        assert!(ray(&scene, Vector3::ZERO, Vector3::new(1.0, 0.0, 0.0), 4.1).is_some());
    }

    #[test]
    fn test_unregistered_object() {
        let scene = MockScene::new().with_ground(0.0, None);
        let hit = ray(&scene, Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.0, 0.0, -1.0), 5.0)
            .unwrap();
        assert_eq!(
            scene.resolve_object_id(hit.scene_ref),
            Err(UnresolvedHit {
                scene_ref: hit.scene_ref
            })
        );
    }

    #[test]
    fn test_from_config_and_counters() {
        let config = SceneConfig {
            ground: Some(GroundConfig {
                height: 0.0,
                object_id: Some(1),
            }),
            objects: vec![SceneObjectConfig {
                object_id: Some(5),
                shape: ShapeConfig::Sphere {
                    center: Location::new(0.0, 10.0, 1.0),
                    radius: 2.0,
                },
            }],
        };
        let scene = MockScene::from_config(&config);
        assert_eq!(scene.len(), 2);

        let hits = scene
            .trace(
                &[Vector3::new(0.0, 0.0, 1.0); 2],
                &[Vector3::new(0.0, 1.0, 0.0), Vector3::new(0.0, 0.0, -1.0)],
                50.0,
            )
            .unwrap();
        let ids: Vec<_> = hits
            .iter()
            .map(|h| scene.resolve_object_id(h.unwrap().scene_ref).unwrap())
            .collect();
        assert_eq!(ids, vec![5, 1]);
        assert_eq!(scene.trace_calls(), 1);
        assert_eq!(scene.rays_traced(), 2);

        assert!(scene.trace(&[Vector3::ZERO], &[], 1.0).is_err());
    }
}
