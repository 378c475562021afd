//! Pipeline orchestrator - owns the sensor, the demo scene and the dispatcher.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{LidarBlueprint, MotionConfig, Transform};
use measurement::LidarFrame;
use scan_engine::{MockScene, RayCastLidar};
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{info, warn};

use super::PipelineStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated run blueprint
    pub blueprint: LidarBlueprint,

    /// Stop after this many ticks (None = until shutdown)
    pub max_ticks: Option<u64>,

    /// Wall-clock limit (None = no timeout)
    pub timeout: Option<Duration>,

    /// Frames buffered between the sensor and the dispatcher
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Tick until `max_ticks`, the timeout or `shutdown` resolves, then
    /// drain the sinks.
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let scene = Arc::new(MockScene::from_config(&blueprint.scene));
        info!(shapes = scene.len(), "Demo scene built");

        let mut lidar = RayCastLidar::with_description(
            blueprint.sensor.id.as_str(),
            blueprint.sensor.description.clone(),
            scene.clone(),
            scene.clone(),
            blueprint.runtime.clone(),
        )
        .context("Failed to configure LiDAR")?;
        lidar.set_transform(blueprint.sensor.transform);

        let (frame_tx, frame_rx) = mpsc::channel::<LidarFrame>(self.config.buffer_size.max(1));
        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - frames will be discarded");
        }
        let dispatcher = dispatcher::create_dispatcher(blueprint.sinks.clone(), frame_rx)
            .await
            .context("Failed to create dispatcher")?;
        let active_sinks = dispatcher.sink_count();
        let dispatcher_handle = dispatcher.spawn();

        let dt = blueprint.simulation.tick_duration_s;
        let motion = blueprint.simulation.motion;
        let mut ticker = blueprint.simulation.realtime.then(|| {
            let mut interval = tokio::time::interval(Duration::from_secs_f64(dt));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        let timeout = self.config.timeout;
        let deadline = async move {
            match timeout {
                Some(t) => tokio::time::sleep(t).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(deadline);

        info!(
            sensor_id = %lidar.id(),
            tick_duration_s = dt,
            max_ticks = ?self.config.max_ticks,
            realtime = blueprint.simulation.realtime,
            active_sinks,
            "Tick loop running"
        );

        let mut stats = PipelineStats {
            active_sinks,
            ..Default::default()
        };

        loop {
            if let Some(max) = self.config.max_ticks {
                if stats.ticks >= max {
                    info!(ticks = stats.ticks, "Reached max ticks limit");
                    break;
                }
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Shutdown requested, stopping tick loop");
                    break;
                }
                _ = &mut deadline => {
                    warn!(timeout_secs = ?timeout.map(|t| t.as_secs()), "Run timed out");
                    break;
                }
                _ = next_tick(&mut ticker) => {}
            }

            // Rayon fan-out blocks; move this worker's other tasks elsewhere
            let frame = tokio::task::block_in_place(|| lidar.tick(dt))
                .context("LiDAR tick failed")?;
            stats.ticks += 1;
            stats.tick_metrics.update(&frame.report);

            if let Some(motion) = &motion {
                let next = advance_pose(lidar.transform(), motion, dt);
                lidar.set_transform(next);
            }

            if frame_tx.send(frame).await.is_err() {
                warn!("Dispatcher channel closed");
                break;
            }
            stats.frames_sent += 1;
        }

        info!("Shutting down pipeline...");
        drop(frame_tx);

        match tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await {
            Ok(Ok(sink_metrics)) => stats.sink_metrics = sink_metrics,
            Ok(Err(e)) => warn!(error = %e, "Dispatcher task failed"),
            Err(_) => warn!("Dispatcher did not drain within 5s"),
        }

        if let Some(pool) = lidar.pool() {
            stats.buffers_created = pool.stats().created;
        }
        stats.duration = start_time.elapsed();

        info!(
            ticks = stats.ticks,
            duration_secs = stats.duration.as_secs_f64(),
            ticks_per_sec = format!("{:.2}", stats.ticks_per_sec()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        // Keeps the loop cancellable when it never blocks otherwise
        None => tokio::task::yield_now().await,
    }
}

/// Move the carrier by one tick of constant motion
fn advance_pose(transform: &Transform, motion: &MotionConfig, dt: f64) -> Transform {
    let mut next = *transform;
    next.location.x += motion.velocity.x * dt;
    next.location.y += motion.velocity.y * dt;
    next.location.z += motion.velocity.z * dt;
    next.rotation.yaw = (next.rotation.yaw + motion.yaw_rate_deg_s * dt).rem_euclid(360.0);
    next
}
