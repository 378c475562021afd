//! RayIssuer - fires the rays of one channel and keeps the hits

use std::time::Instant;

use contracts::{
    IntersectionOracle, ObjectId, ObjectRegistry, UnresolvedHitPolicy, Vector3,
};
use tracing::{debug, trace, warn};

use crate::{SensorPose, Sweep};

/// Hits of one channel, in ray order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelScan {
    pub points: Vec<Vector3>,
    pub object_ids: Vec<ObjectId>,
    /// Rays submitted to the oracle
    pub rays: u32,
    /// Hits whose object id did not resolve
    pub unresolved: u32,
    /// Oracle call failed, every ray counted as a miss
    pub failed: bool,
}

impl ChannelScan {
    fn with_capacity(rays: u32) -> Self {
        Self {
            points: Vec::with_capacity(rays as usize),
            object_ids: Vec::with_capacity(rays as usize),
            rays,
            ..Default::default()
        }
    }

    #[inline]
    pub fn hit_count(&self) -> usize {
        self.points.len()
    }
}

/// Per-tick ray issuer. Holds no sensor state, so one instance is shared by
/// every channel of a tick, across threads.
pub struct RayIssuer<'a> {
    oracle: &'a dyn IntersectionOracle,
    registry: &'a dyn ObjectRegistry,
    pose: SensorPose,
    range: f32,
    policy: UnresolvedHitPolicy,
}

impl<'a> RayIssuer<'a> {
    pub fn new(
        oracle: &'a dyn IntersectionOracle,
        registry: &'a dyn ObjectRegistry,
        pose: SensorPose,
        range: f32,
        policy: UnresolvedHitPolicy,
    ) -> Self {
        Self {
            oracle,
            registry,
            pose,
            range,
            policy,
        }
    }

    /// Cast `sweep.samples_per_channel` rays of `channel` starting at
    /// `start_angle`, in a single oracle call.
    pub fn shoot_channel(
        &self,
        channel: u32,
        vertical_angle: f32,
        start_angle: f32,
        sweep: &Sweep,
    ) -> ChannelScan {
        let rays = sweep.samples_per_channel;
        let mut scan = ChannelScan::with_capacity(rays);

        let origins = vec![self.pose.origin(); rays as usize];
        let directions: Vec<Vector3> = (0..rays)
            .map(|i| {
                self.pose
                    .world_direction(vertical_angle, sweep.horizontal_angle(start_angle, i))
            })
            .collect();

        let started = Instant::now();
        let hits = match self.oracle.trace(&origins, &directions, self.range) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(channel, rays, error = %e, "Channel trace failed, treating as all-miss");
                scan.failed = true;
                return scan;
            }
        };

        if hits.len() != rays as usize {
            debug!(
                channel,
                expected = rays,
                returned = hits.len(),
                "Oracle result length mismatch, missing rays count as misses"
            );
        }

        for hit in hits.into_iter().take(rays as usize).flatten() {
            let object_id = match self.registry.resolve_object_id(hit.scene_ref) {
                Ok(id) => id,
                Err(unresolved) => {
                    scan.unresolved += 1;
                    trace!(channel, scene_ref = unresolved.scene_ref, "Unresolved hit");
                    match self.policy {
                        UnresolvedHitPolicy::Drop => continue,
                        UnresolvedHitPolicy::Sentinel(id) => id,
                    }
                }
            };

            scan.points.push(self.pose.to_sensor_local(hit.impact_point));
            scan.object_ids.push(object_id);
        }

        trace!(
            channel,
            rays,
            hits = scan.hit_count(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Channel traced"
        );

        scan
    }
}
