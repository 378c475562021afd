//! RayCastLidar - rotating multi-channel LiDAR driven by explicit ticks

use std::sync::Arc;
use std::time::Instant;

use contracts::{
    IntersectionOracle, LidarDescription, ObjectRegistry, RuntimeOptions, SensorId, TickReport,
    Transform, MAX_RAYS_PER_TICK,
};
use measurement::{FrameEncoder, LidarFrame, MeasurementPool};
use observability::metrics;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::{ChannelScan, LaserGeometry, RayIssuer, ScanError, ScanPlanner, SensorPose, Sweep};

/// Everything that is replaced together on reconfiguration
#[derive(Debug)]
struct ScannerState {
    description: LidarDescription,
    lasers: LaserGeometry,
    pool: MeasurementPool,
    /// Scan phase (degrees, [0, 360))
    horizontal_angle: f32,
}

/// Ray-cast LiDAR sensor
///
/// Owns its scan phase and measurement pool. The host supplies the scene
/// through the oracle/registry pair, moves the sensor with
/// [`set_transform`](Self::set_transform) and advances it with
/// [`tick`](Self::tick).
pub struct RayCastLidar {
    id: SensorId,
    oracle: Arc<dyn IntersectionOracle>,
    registry: Arc<dyn ObjectRegistry>,
    options: RuntimeOptions,
    transform: Transform,
    state: Option<ScannerState>,
    frame_counter: u64,
    sim_time: f64,
}

impl RayCastLidar {
    /// Unconfigured sensor; ticks fail until [`configure`](Self::configure)
    /// succeeds
    pub fn new(
        id: impl Into<SensorId>,
        oracle: Arc<dyn IntersectionOracle>,
        registry: Arc<dyn ObjectRegistry>,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            id: id.into(),
            oracle,
            registry,
            options,
            transform: Transform::default(),
            state: None,
            frame_counter: 0,
            sim_time: 0.0,
        }
    }

    pub fn with_description(
        id: impl Into<SensorId>,
        description: LidarDescription,
        oracle: Arc<dyn IntersectionOracle>,
        registry: Arc<dyn ObjectRegistry>,
        options: RuntimeOptions,
    ) -> Result<Self, ScanError> {
        let mut lidar = Self::new(id, oracle, registry, options);
        lidar.configure(description)?;
        Ok(lidar)
    }

    /// Apply a new description.
    ///
    /// Rebuilds the laser table and the pool and restarts the scan phase at
    /// 0. On error the previous configuration stays active.
    #[instrument(
        name = "lidar_configure",
        skip(self, description),
        fields(sensor_id = %self.id, channels = description.channels)
    )]
    pub fn configure(&mut self, description: LidarDescription) -> Result<(), ScanError> {
        if let Err(e) = description.check() {
            warn!(error = %e, "Rejected LiDAR description, keeping previous configuration");
            return Err(e.into());
        }
        let lasers = LaserGeometry::from_description(&description)?;
        let pool = MeasurementPool::new(description.channels, self.options.pool_max_idle);

        info!(
            range = description.range,
            points_per_second = description.points_per_second,
            rotation_frequency = description.rotation_frequency,
            upper_fov = description.upper_fov,
            lower_fov = description.lower_fov,
            "LiDAR configured"
        );

        self.state = Some(ScannerState {
            description,
            lasers,
            pool,
            horizontal_angle: 0.0,
        });
        Ok(())
    }

    /// World pose used by the next tick
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn id(&self) -> &SensorId {
        &self.id
    }

    pub fn is_configured(&self) -> bool {
        self.state.is_some()
    }

    pub fn description(&self) -> Option<&LidarDescription> {
        self.state.as_ref().map(|s| &s.description)
    }

    pub fn lasers(&self) -> Option<&LaserGeometry> {
        self.state.as_ref().map(|s| &s.lasers)
    }

    /// Current scan phase (degrees)
    pub fn horizontal_angle(&self) -> Option<f32> {
        self.state.as_ref().map(|s| s.horizontal_angle)
    }

    pub fn pool(&self) -> Option<&MeasurementPool> {
        self.state.as_ref().map(|s| &s.pool)
    }

    /// Frames produced so far
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    /// Accumulated simulation time (seconds)
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Advance the sensor by `tick_duration` seconds and produce one frame.
    ///
    /// Always yields a well-formed frame once configured: an empty tick, a
    /// failed oracle call or unresolved hits only shrink the point set.
    #[instrument(
        name = "lidar_tick",
        skip(self),
        fields(sensor_id = %self.id, frame_id = self.frame_counter + 1)
    )]
    pub fn tick(&mut self, tick_duration: f64) -> Result<LidarFrame, ScanError> {
        if !tick_duration.is_finite() || tick_duration < 0.0 {
            return Err(ScanError::InvalidTickDuration(tick_duration));
        }
        let started = Instant::now();

        let state = self.state.as_mut().ok_or_else(|| ScanError::Unconfigured {
            sensor_id: self.id.clone(),
        })?;

        let plan = ScanPlanner::plan(&state.description, tick_duration, state.horizontal_angle);
        let channel_count = state.lasers.channel_count();

        let requested = u64::from(plan.samples_per_channel()) * u64::from(channel_count);
        if requested > MAX_RAYS_PER_TICK {
            warn!(rays = requested, max = MAX_RAYS_PER_TICK, "Tick rejected, too many rays");
            return Err(ScanError::TickTooLarge {
                rays: requested,
                max: MAX_RAYS_PER_TICK,
            });
        }

        let mut measurement = state.pool.checkout();
        measurement.reset(plan.samples_per_channel() as usize * channel_count as usize);
        measurement.set_horizontal_angle(plan.start_angle);

        let mut rays_cast = 0u64;
        let mut unresolved_hits = 0u64;
        let mut failed_channels = 0u32;

        match plan.sweep {
            None => {
                warn!(
                    points_per_second = state.description.points_per_second,
                    tick_duration,
                    "No points requested this frame, try increasing the number of points per second"
                );
            }
            Some(sweep) => {
                let issuer = RayIssuer::new(
                    self.oracle.as_ref(),
                    self.registry.as_ref(),
                    SensorPose::from_transform(&self.transform),
                    state.description.range,
                    self.options.unresolved_hit_policy,
                );
                let scans = shoot_channels(
                    &issuer,
                    &state.lasers,
                    plan.start_angle,
                    &sweep,
                    self.options.parallel_channels,
                );

                for (channel, scan) in scans.iter().enumerate() {
                    measurement.append(channel as u32, &scan.points, &scan.object_ids)?;
                    rays_cast += u64::from(scan.rays);
                    unresolved_hits += u64::from(scan.unresolved);
                    failed_channels += u32::from(scan.failed);
                }
            }
        }

        state.horizontal_angle = plan.next_angle;
        self.frame_counter += 1;
        self.sim_time += tick_duration;

        let data = FrameEncoder::encode(&measurement);
        let report = TickReport {
            frame_id: self.frame_counter,
            timestamp: self.sim_time,
            tick_duration,
            samples_per_channel: plan.samples_per_channel(),
            rays_cast,
            points: measurement.point_count() as u64,
            unresolved_hits,
            failed_channels,
            start_angle: plan.start_angle,
            next_angle: plan.next_angle,
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        };

        debug!(
            samples_per_channel = report.samples_per_channel,
            rays = report.rays_cast,
            points = report.points,
            unresolved = report.unresolved_hits,
            bytes = data.len(),
            elapsed_ms = report.elapsed_ms,
            "Tick complete"
        );

        let sensor = self.id.as_str();
        metrics::record_tick_metrics(sensor, &report);
        metrics::record_frame_bytes(sensor, data.len());
        let pool_stats = state.pool.stats();
        metrics::record_pool_stats(sensor, pool_stats.idle, pool_stats.created);

        Ok(LidarFrame::new(self.id.clone(), report, data, measurement))
    }
}

impl std::fmt::Debug for RayCastLidar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RayCastLidar")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("transform", &self.transform)
            .field("state", &self.state)
            .field("frame_counter", &self.frame_counter)
            .finish_non_exhaustive()
    }
}

/// Shoot every channel; results are in channel index order either way
fn shoot_channels(
    issuer: &RayIssuer<'_>,
    lasers: &LaserGeometry,
    start_angle: f32,
    sweep: &Sweep,
    parallel: bool,
) -> Vec<ChannelScan> {
    let shoot = |(channel, vertical): (usize, &f32)| {
        issuer.shoot_channel(channel as u32, *vertical, start_angle, sweep)
    };

    if parallel {
        lasers.vertical_angles().par_iter().enumerate().map(shoot).collect()
    } else {
        lasers.vertical_angles().iter().enumerate().map(shoot).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockScene;
    use contracts::{
        HitResult, Location, OracleError, Rotation, UnresolvedHitPolicy, Vector3,
    };
    use measurement::decode_frame;

    fn description(channels: u32, pps: u32, rf: f32, upper: f32, lower: f32) -> LidarDescription {
        LidarDescription {
            channels,
            range: 50.0,
            points_per_second: pps,
            rotation_frequency: rf,
            upper_fov: upper,
            lower_fov: lower,
        }
    }

    fn lidar_with(
        scene: Arc<MockScene>,
        description: LidarDescription,
        options: RuntimeOptions,
    ) -> RayCastLidar {
        RayCastLidar::with_description(
            "lidar",
            description,
            scene.clone(),
            scene,
            options,
        )
        .unwrap()
    }

    fn at(x: f64, y: f64, z: f64, yaw: f64) -> Transform {
        Transform::new(Location::new(x, y, z), Rotation::new(0.0, yaw, 0.0))
    }

    #[test]
    fn test_single_channel_all_miss() {
        let scene = Arc::new(MockScene::new());
        let mut lidar = lidar_with(
            scene.clone(),
            description(1, 1000, 1.0, 10.0, 10.0),
            RuntimeOptions::default(),
        );

        let frame = lidar.tick(0.1).unwrap();
        assert_eq!(frame.report.samples_per_channel, 100);
        assert_eq!(frame.report.rays_cast, 100);
        assert_eq!(frame.horizontal_angle(), 0.0);

        let decoded = decode_frame(&frame.data).unwrap();
        assert_eq!(decoded.header.total_point_count, 0);
        assert_eq!(decoded.header.per_channel_point_count, vec![0]);
        assert!((lidar.horizontal_angle().unwrap() - 36.0).abs() < 1e-4);

        // Next frame is stamped with the phase it started at
        let frame = lidar.tick(0.1).unwrap();
        assert!((frame.horizontal_angle() - 36.0).abs() < 1e-4);
        assert_eq!(scene.trace_calls(), 2);
    }

    #[test]
    fn test_two_channels_known_ids() {
        // Sensor inside a large sphere (id 2), ground (id 1) 1 m below
        let scene = Arc::new(
            MockScene::new()
                .with_ground(0.0, Some(1))
                .with_sphere(Location::new(0.0, 0.0, 1.0), 5.0, Some(2)),
        );
        let mut lidar = lidar_with(
            scene,
            description(2, 200, 1.0, 10.0, -30.0),
            RuntimeOptions::default(),
        );
        lidar.set_transform(at(0.0, 0.0, 1.0, 0.0));

        let frame = lidar.tick(0.1).unwrap();
        let decoded = decode_frame(&frame.data).unwrap();

        assert_eq!(decoded.header.per_channel_point_count, vec![10, 10]);
        let mut expected = vec![2; 10];
        expected.extend(vec![1; 10]);
        assert_eq!(decoded.object_ids, expected);

        let (upper, upper_ids) = decoded.channel(0).unwrap();
        assert!(upper_ids.iter().all(|id| *id == 2));
        assert!(upper.iter().all(|p| (p.norm() - 5.0).abs() < 1e-3));

        let (lower, _) = decoded.channel(1).unwrap();
        assert!(lower.iter().all(|p| (p.z + 1.0).abs() < 1e-4));
        assert!(lower.iter().all(|p| (p.norm() - 2.0).abs() < 1e-3));
    }

    #[test]
    fn test_empty_tick_skips_oracle() {
        let scene = Arc::new(MockScene::new().with_ground(0.0, Some(1)));
        let mut lidar = lidar_with(
            scene.clone(),
            description(32, 5, 1.0, 10.0, -30.0),
            RuntimeOptions::default(),
        );

        let frame = lidar.tick(0.1).unwrap();

        assert!(frame.is_empty_tick());
        assert_eq!(scene.trace_calls(), 0);
        assert_eq!(frame.report.rays_cast, 0);
        assert!((lidar.horizontal_angle().unwrap() - 36.0).abs() < 1e-4);

        let decoded = decode_frame(&frame.data).unwrap();
        assert_eq!(decoded.header.channel_count, 32);
        assert_eq!(decoded.header.per_channel_point_count, vec![0; 32]);
    }

    #[test]
    fn test_yawed_sensor_reports_local_points() {
        // Wall 4 m along world +X; sensor faces world +Y
        let scene = Arc::new(MockScene::new().with_box(
            Location::new(14.0, -100.0, -100.0),
            Location::new(15.0, 100.0, 100.0),
            Some(7),
        ));
        let mut lidar = lidar_with(
            scene,
            description(1, 40, 10.0, 0.0, 0.0),
            RuntimeOptions::default(),
        );
        lidar.set_transform(at(10.0, 5.0, 2.0, 90.0));

        // 4 samples at local 0, 90, 180, 270 degrees
        let frame = lidar.tick(0.1).unwrap();
        let m = frame.measurement();

        assert_eq!(m.point_count(), 1);
        assert_eq!(m.object_ids(), &[7]);
        assert!(m.points()[0].approx_eq(Vector3::new(0.0, -4.0, 0.0), 1e-3));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let scene = Arc::new(
            MockScene::new()
                .with_ground(0.0, Some(1))
                .with_sphere(Location::new(6.0, 2.0, 1.5), 1.5, Some(2))
                .with_box(Location::new(-8.0, -3.0, 0.0), Location::new(-6.0, 3.0, 3.0), Some(3)),
        );
        let d = description(16, 20_000, 10.0, 15.0, -25.0);
        let parallel = RuntimeOptions {
            parallel_channels: true,
            ..Default::default()
        };
        let sequential = RuntimeOptions {
            parallel_channels: false,
            ..Default::default()
        };
        let mut a = lidar_with(scene.clone(), d.clone(), parallel);
        let mut b = lidar_with(scene, d, sequential);

        for i in 0..5 {
            let pose = at(f64::from(i) * 0.5, 0.0, 1.8, f64::from(i) * 7.0);
            a.set_transform(pose);
            b.set_transform(pose);

            let fa = a.tick(0.05).unwrap();
            let fb = b.tick(0.05).unwrap();
            assert!(fa.point_count() > 0);
            assert_eq!(fa.data, fb.data, "tick {i}");
        }
    }

    #[test]
    fn test_unresolved_hits_dropped_or_tagged() {
        let scene = Arc::new(MockScene::new().with_ground(0.0, None));
        let d = description(1, 100, 1.0, -30.0, -30.0);

        let mut dropping = lidar_with(scene.clone(), d.clone(), RuntimeOptions::default());
        dropping.set_transform(at(0.0, 0.0, 1.0, 0.0));
        let frame = dropping.tick(0.1).unwrap();
        assert_eq!(frame.point_count(), 0);
        assert_eq!(frame.report.unresolved_hits, 10);

        let mut tagging = lidar_with(
            scene,
            d,
            RuntimeOptions {
                unresolved_hit_policy: UnresolvedHitPolicy::Sentinel(0),
                ..Default::default()
            },
        );
        tagging.set_transform(at(0.0, 0.0, 1.0, 0.0));
        let frame = tagging.tick(0.1).unwrap();
        assert_eq!(frame.measurement().object_ids(), &[0; 10]);
        assert_eq!(frame.report.unresolved_hits, 10);
    }

    /// Fails every batch that points upwards
    struct SkyFailsOracle(MockScene);

    impl IntersectionOracle for SkyFailsOracle {
        fn trace(
            &self,
            origins: &[Vector3],
            directions: &[Vector3],
            max_range: f32,
        ) -> Result<Vec<HitResult>, OracleError> {
            if directions.iter().any(|d| d.z > 0.0) {
                return Err(OracleError::new("sky query failed"));
            }
            self.0.trace(origins, directions, max_range)
        }
    }

    #[test]
    fn test_failed_channel_is_all_miss() {
        let oracle = Arc::new(SkyFailsOracle(MockScene::new().with_ground(0.0, Some(1))));
        let registry = Arc::new(MockScene::new().with_ground(0.0, Some(1)));
        let mut lidar = RayCastLidar::with_description(
            "lidar",
            description(2, 200, 1.0, 10.0, -30.0),
            oracle,
            registry,
            RuntimeOptions::default(),
        )
        .unwrap();
        lidar.set_transform(at(0.0, 0.0, 1.0, 0.0));

        let frame = lidar.tick(0.1).unwrap();
        assert_eq!(frame.report.failed_channels, 1);
        assert_eq!(frame.measurement().per_channel_counts(), &[0, 10]);
    }

    #[test]
    fn test_reconfigure() {
        let scene = Arc::new(MockScene::new());
        let mut lidar = lidar_with(
            scene,
            description(2, 1000, 1.0, 10.0, -10.0),
            RuntimeOptions::default(),
        );
        lidar.tick(0.1).unwrap();
        let angle = lidar.horizontal_angle().unwrap();
        assert!(angle > 0.0);

        // Rejected description keeps everything
        let err = lidar
            .configure(description(0, 1000, 1.0, 10.0, -10.0))
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfiguration { .. }));
        assert!(lidar
            .configure(description(2, 1000, 1.0, -10.0, 10.0))
            .is_err());
        assert_eq!(lidar.description().unwrap().channels, 2);
        assert_eq!(lidar.horizontal_angle(), Some(angle));

        // Accepted description resets phase and channel layout
        lidar
            .configure(description(4, 1000, 1.0, 10.0, -10.0))
            .unwrap();
        assert_eq!(lidar.horizontal_angle(), Some(0.0));
        let frame = lidar.tick(0.1).unwrap();
        assert_eq!(frame.channel_count(), 4);
        assert_eq!(frame.horizontal_angle(), 0.0);
    }

    #[test]
    fn test_unconfigured_and_bad_durations() {
        let scene = Arc::new(MockScene::new());
        let mut lidar = RayCastLidar::new(
            "idle",
            scene.clone(),
            scene.clone(),
            RuntimeOptions::default(),
        );
        assert!(matches!(
            lidar.tick(0.1),
            Err(ScanError::Unconfigured { .. })
        ));

        let mut lidar = lidar_with(scene, LidarDescription::default(), RuntimeOptions::default());
        assert!(matches!(
            lidar.tick(f64::NAN),
            Err(ScanError::InvalidTickDuration(_))
        ));
        assert!(matches!(
            lidar.tick(-0.1),
            Err(ScanError::InvalidTickDuration(_))
        ));
        assert_eq!(lidar.frame_count(), 0);
    }

    #[test]
    fn test_oversized_tick_rejected_without_side_effects() {
        let scene = Arc::new(MockScene::new().with_ground(-2.0, Some(1)));
        let mut lidar = lidar_with(
            scene.clone(),
            description(1, contracts::MAX_POINTS_PER_SECOND, 10.0, 0.0, 0.0),
            RuntimeOptions::default(),
        );

        // 10M pts/s over 2 s is past the per-tick ray cap
        let err = lidar.tick(2.0).unwrap_err();
        match err {
            ScanError::TickTooLarge { rays, max } => {
                assert_eq!(rays, 20_000_000);
                assert_eq!(max, MAX_RAYS_PER_TICK);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(scene.trace_calls(), 0);
        assert_eq!(lidar.frame_count(), 0);
        assert_eq!(lidar.horizontal_angle(), Some(0.0));

        // A tick under the cap still works
        let frame = lidar.tick(0.001).unwrap();
        assert_eq!(frame.report.rays_cast, 10_000);
    }

    #[test]
    fn test_frame_ids_timestamps_and_pool_reuse() {
        let scene = Arc::new(MockScene::new().with_ground(0.0, Some(1)));
        let mut lidar = lidar_with(
            scene,
            LidarDescription::default(),
            RuntimeOptions::default(),
        );
        lidar.set_transform(at(0.0, 0.0, 1.7, 0.0));

        for expected in 1..=5u64 {
            let frame = lidar.tick(0.1).unwrap();
            assert_eq!(frame.frame_id, expected);
            assert!((frame.timestamp - expected as f64 * 0.1).abs() < 1e-9);
        }

        let stats = lidar.pool().unwrap().stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.reused, 4);

        // Holding frames forces new buffers
        let held: Vec<_> = (0..3).map(|_| lidar.tick(0.1).unwrap()).collect();
        assert_eq!(lidar.pool().unwrap().stats().created, 3);
        drop(held);
        assert_eq!(lidar.pool().unwrap().idle_len(), 3);
    }
}
