//! # Integration Tests
//!
//! End-to-end scenarios across the workspace crates:
//! - sample configuration loads and drives a sensor
//! - sensor -> dispatcher -> sinks, frames decode on the far side
//! - pooled buffers come back once every sink is done

#[cfg(test)]
mod support {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use contracts::{
        ContractError, GroundConfig, LidarBlueprint, LidarDescription, Location, Rotation,
        TickReport, Transform,
    };
    use dispatcher::{FrameSink, LidarFrame};
    use measurement::{decode_frame, DecodedFrame, PoolStats};
    use scan_engine::{MockScene, RayCastLidar};

    pub type Captured = Arc<Mutex<Vec<(TickReport, DecodedFrame)>>>;

    /// Sink that decodes every frame it receives
    pub struct CaptureSink {
        name: String,
        captured: Captured,
        delay: Option<Duration>,
    }

    impl CaptureSink {
        pub fn new(name: &str) -> (Self, Captured) {
            let captured = Captured::default();
            let sink = Self {
                name: name.to_string(),
                captured: Arc::clone(&captured),
                delay: None,
            };
            (sink, captured)
        }

        pub fn slow(name: &str, delay: Duration) -> (Self, Captured) {
            let (mut sink, captured) = Self::new(name);
            sink.delay = Some(delay);
            (sink, captured)
        }
    }

    impl FrameSink for CaptureSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn publish(&mut self, frame: &LidarFrame) -> Result<(), ContractError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let decoded = decode_frame(&frame.data)?;
            self.captured
                .lock()
                .unwrap()
                .push((frame.report.clone(), decoded));
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    /// 4 downward channels, 100 samples each at dt = 0.1, quarter turn per tick
    pub fn downward_blueprint() -> LidarBlueprint {
        let description = LidarDescription {
            channels: 4,
            range: 50.0,
            points_per_second: 4000,
            rotation_frequency: 2.5,
            upper_fov: -5.0,
            lower_fov: -30.0,
        };
        let mut bp = LidarBlueprint::for_sensor("e2e_lidar", description);
        bp.sensor.transform = Transform::new(Location::new(0.0, 0.0, 2.0), Rotation::default());
        bp.scene.ground = Some(GroundConfig {
            height: 0.0,
            object_id: Some(1),
        });
        bp
    }

    pub fn build_lidar(bp: &LidarBlueprint) -> (RayCastLidar, Arc<MockScene>) {
        let scene = Arc::new(MockScene::from_config(&bp.scene));
        let mut lidar = RayCastLidar::with_description(
            bp.sensor.id.as_str(),
            bp.sensor.description.clone(),
            scene.clone(),
            scene.clone(),
            bp.runtime.clone(),
        )
        .unwrap();
        lidar.set_transform(bp.sensor.transform);
        (lidar, scene)
    }

    /// Every checked-out buffer has been given back or discarded
    pub fn assert_pool_settled(stats: PoolStats) {
        assert_eq!(
            stats.created + stats.reused,
            stats.returned + stats.discarded,
            "outstanding buffers: {stats:?}"
        );
    }
}

#[cfg(test)]
mod config_tests {
    use std::collections::HashSet;
    use std::path::PathBuf;

    use config_loader::ConfigLoader;

    use crate::support::build_lidar;

    fn sample_config() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../configs/roof_lidar.toml")
    }

    #[test]
    fn test_sample_config_drives_sensor() {
        let bp = ConfigLoader::load_from_path(&sample_config()).unwrap();
        assert_eq!(bp.sensor.id, "roof_lidar");
        assert_eq!(bp.sinks.len(), 2);

        let (mut lidar, scene) = build_lidar(&bp);
        let frame = lidar.tick(bp.simulation.tick_duration_s).unwrap();

        // 320000 * 0.05 / 32 = 500 samples per channel
        assert_eq!(frame.report.samples_per_channel, 500);
        assert_eq!(frame.report.rays_cast, 16_000);
        assert_eq!(scene.trace_calls(), 32);
        assert!(frame.point_count() > 0);

        let known: HashSet<u32> = [1, 10, 20].into_iter().collect();
        assert!(frame
            .measurement()
            .object_ids()
            .iter()
            .all(|id| known.contains(id)));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use contracts::{SinkConfig, SinkType, TickReport, UnresolvedHitPolicy};
    use dispatcher::{create_dispatcher, Dispatcher, LogSink, SinkHandle};
    use measurement::{decode_frame, LidarFrame};
    use observability::TickMetricsAggregator;
    use tokio::sync::mpsc;

    use crate::support::{assert_pool_settled, build_lidar, downward_blueprint, CaptureSink};

    /// RayCastLidar -> Dispatcher -> CaptureSink + LogSink
    #[tokio::test]
    async fn test_e2e_sensor_to_sinks() {
        let bp = downward_blueprint();
        let (mut lidar, _scene) = build_lidar(&bp);

        let (capture, captured) = CaptureSink::new("capture");
        let handles = vec![
            SinkHandle::spawn(capture, 16),
            SinkHandle::spawn(LogSink::new("log"), 16),
        ];
        let (frame_tx, frame_rx) = mpsc::channel::<LidarFrame>(16);
        let dispatcher_handle = Dispatcher::with_handles(handles, frame_rx).spawn();

        let mut aggregator = TickMetricsAggregator::new();
        for _ in 0..5 {
            let frame = lidar.tick(0.1).unwrap();
            aggregator.update(&frame.report);
            frame_tx.send(frame).await.unwrap();
        }
        drop(frame_tx);

        let sink_metrics = dispatcher_handle.await.unwrap();
        for (name, snapshot) in &sink_metrics {
            assert_eq!(snapshot.write_count, 5, "sink {name}");
            assert_eq!(snapshot.points_written, 5 * 400, "sink {name}");
        }

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 5);

        let angles: Vec<f32> = captured
            .iter()
            .map(|(_, f)| f.header.horizontal_angle)
            .collect();
        assert_eq!(angles, vec![0.0, 90.0, 180.0, 270.0, 0.0]);

        for (i, (report, frame)) in captured.iter().enumerate() {
            assert_eq!(report.frame_id, i as u64 + 1);
            assert_eq!(frame.header.channel_count, 4);
            assert_eq!(frame.header.per_channel_point_count, vec![100; 4]);
            assert!(frame.object_ids.iter().all(|id| *id == 1));
            // Sensor sits 2 m above the ground
            assert!(frame.points.iter().all(|p| (p.z + 2.0).abs() < 1e-3));
        }

        let summary = aggregator.summary();
        assert_eq!(summary.total_ticks, 5);
        assert_eq!(summary.total_points, 2000);
        assert!((summary.hit_rate - 100.0).abs() < 1e-9);

        assert_pool_settled(lidar.pool().unwrap().stats());
    }

    #[tokio::test]
    async fn test_e2e_slow_sink_drops_and_buffers_return() {
        let bp = downward_blueprint();
        let (mut lidar, _scene) = build_lidar(&bp);

        let (slow, captured) = CaptureSink::slow("slow", Duration::from_millis(20));
        let (fast, fast_captured) = CaptureSink::new("fast");
        let handles = vec![SinkHandle::spawn(slow, 1), SinkHandle::spawn(fast, 32)];
        let (frame_tx, frame_rx) = mpsc::channel::<LidarFrame>(32);
        let dispatcher_handle = Dispatcher::with_handles(handles, frame_rx).spawn();

        for _ in 0..10 {
            frame_tx.send(lidar.tick(0.1).unwrap()).await.unwrap();
        }
        drop(frame_tx);

        let metrics: HashMap<_, _> = dispatcher_handle.await.unwrap().into_iter().collect();
        let slow_metrics = metrics["slow"];
        assert!(slow_metrics.dropped_count > 0);
        assert_eq!(slow_metrics.write_count + slow_metrics.dropped_count, 10);
        assert_eq!(metrics["fast"].write_count, 10);

        assert_eq!(
            captured.lock().unwrap().len() as u64,
            slow_metrics.write_count
        );
        assert_eq!(fast_captured.lock().unwrap().len(), 10);

        assert_pool_settled(lidar.pool().unwrap().stats());
    }

    #[tokio::test]
    async fn test_e2e_unregistered_hits_tagged() {
        let mut bp = downward_blueprint();
        if let Some(ground) = bp.scene.ground.as_mut() {
            ground.object_id = None;
        }
        bp.runtime.unresolved_hit_policy = UnresolvedHitPolicy::Sentinel(u32::MAX);
        let (mut lidar, _scene) = build_lidar(&bp);

        let (capture, captured) = CaptureSink::new("capture");
        let (frame_tx, frame_rx) = mpsc::channel::<LidarFrame>(4);
        let dispatcher_handle =
            Dispatcher::with_handles(vec![SinkHandle::spawn(capture, 4)], frame_rx).spawn();

        frame_tx.send(lidar.tick(0.1).unwrap()).await.unwrap();
        drop(frame_tx);
        dispatcher_handle.await.unwrap();

        let captured = captured.lock().unwrap();
        let (report, frame) = &captured[0];
        assert_eq!(report.unresolved_hits, 400);
        assert_eq!(report.points, 400);
        assert!(frame.object_ids.iter().all(|id| *id == u32::MAX));
    }

    #[tokio::test]
    async fn test_e2e_empty_ticks_still_dispatched() {
        let mut bp = downward_blueprint();
        bp.sensor.description.points_per_second = 1;
        let (mut lidar, scene) = build_lidar(&bp);

        let (capture, captured) = CaptureSink::new("capture");
        let (frame_tx, frame_rx) = mpsc::channel::<LidarFrame>(4);
        let dispatcher_handle =
            Dispatcher::with_handles(vec![SinkHandle::spawn(capture, 4)], frame_rx).spawn();

        for _ in 0..3 {
            frame_tx.send(lidar.tick(0.1).unwrap()).await.unwrap();
        }
        drop(frame_tx);
        dispatcher_handle.await.unwrap();

        assert_eq!(scene.trace_calls(), 0);
        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 3);
        for (report, frame) in captured.iter() {
            assert!(report.is_empty_tick());
            assert_eq!(frame.header.total_point_count, 0);
            assert_eq!(frame.header.per_channel_point_count, vec![0; 4]);
        }
        // The scan phase still advances on empty ticks
        assert_eq!(captured[1].1.header.horizontal_angle, 90.0);
    }

    /// Frames on disk decode to what the sensor reported
    #[tokio::test]
    async fn test_e2e_file_sink_output() {
        let dir = tempfile::tempdir().unwrap();
        let bp = downward_blueprint();
        let (mut lidar, _scene) = build_lidar(&bp);

        let configs = vec![SinkConfig {
            name: "disk".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 8,
            params: HashMap::from([
                ("base_path".to_string(), dir.path().display().to_string()),
                ("format".to_string(), "both".to_string()),
            ]),
        }];
        let (frame_tx, frame_rx) = mpsc::channel::<LidarFrame>(8);
        let dispatcher = create_dispatcher(configs, frame_rx).await.unwrap();
        let dispatcher_handle = dispatcher.spawn();

        let mut expected = Vec::new();
        for _ in 0..2 {
            let frame = lidar.tick(0.1).unwrap();
            expected.push(frame.data.clone());
            frame_tx.send(frame).await.unwrap();
        }
        drop(frame_tx);
        dispatcher_handle.await.unwrap();

        let sensor_dir = dir.path().join("e2e_lidar");
        for (i, data) in expected.iter().enumerate() {
            let stem = format!("{:06}", i + 1);
            let bytes = std::fs::read(sensor_dir.join(format!("{stem}.bin"))).unwrap();
            assert_eq!(bytes, data.to_vec());

            let decoded = decode_frame(&bytes).unwrap();
            let report: TickReport = serde_json::from_slice(
                &std::fs::read(sensor_dir.join(format!("meta/{stem}.json"))).unwrap(),
            )
            .unwrap();
            assert_eq!(u64::from(decoded.header.total_point_count), report.points);
            assert!(sensor_dir.join(format!("{stem}.ply")).exists());
        }

        assert_pool_settled(lidar.pool().unwrap().stats());
    }
}
