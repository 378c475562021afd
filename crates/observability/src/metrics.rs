//! Sensor metrics
//!
//! Per-tick counters and histograms derived from `TickReport`, plus an
//! in-memory aggregator for end-of-run summaries.

use contracts::TickReport;
use metrics::{counter, gauge, histogram};

/// Record the metrics of one completed tick
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_tick_metrics;
///
/// let frame = lidar.tick(0.1)?;
/// record_tick_metrics(frame.sensor_id.as_str(), &frame.report);
/// ```
pub fn record_tick_metrics(sensor_id: &str, report: &TickReport) {
    let sensor = sensor_id.to_string();

    counter!("lidar_sim_ticks_total", "sensor_id" => sensor.clone()).increment(1);
    gauge!("lidar_sim_last_frame_id", "sensor_id" => sensor.clone()).set(report.frame_id as f64);
    gauge!("lidar_sim_horizontal_angle_deg", "sensor_id" => sensor.clone())
        .set(report.next_angle as f64);
    histogram!("lidar_sim_tick_latency_ms", "sensor_id" => sensor.clone()).record(report.elapsed_ms);

    if report.is_empty_tick() {
        counter!("lidar_sim_empty_ticks_total", "sensor_id" => sensor).increment(1);
        return;
    }

    counter!("lidar_sim_rays_cast_total", "sensor_id" => sensor.clone()).increment(report.rays_cast);
    counter!("lidar_sim_points_total", "sensor_id" => sensor.clone()).increment(report.points);
    histogram!("lidar_sim_points_per_tick", "sensor_id" => sensor.clone())
        .record(report.points as f64);

    if report.unresolved_hits > 0 {
        counter!("lidar_sim_unresolved_hits_total", "sensor_id" => sensor.clone())
            .increment(report.unresolved_hits);
    }
    if report.failed_channels > 0 {
        counter!("lidar_sim_failed_channels_total", "sensor_id" => sensor)
            .increment(report.failed_channels as u64);
    }
}

/// Record the size of an encoded frame
pub fn record_frame_bytes(sensor_id: &str, bytes: usize) {
    histogram!(
        "lidar_sim_frame_bytes",
        "sensor_id" => sensor_id.to_string()
    )
    .record(bytes as f64);
}

/// Record measurement pool occupancy
pub fn record_pool_stats(sensor_id: &str, idle: usize, created: u64) {
    gauge!(
        "lidar_sim_pool_idle_buffers",
        "sensor_id" => sensor_id.to_string()
    )
    .set(idle as f64);
    gauge!(
        "lidar_sim_pool_created_buffers",
        "sensor_id" => sensor_id.to_string()
    )
    .set(created as f64);
}

/// Record a frame handed to a sink
pub fn record_frame_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "lidar_sim_frames_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a frame dropped because a sink queue was full
pub fn record_frame_dropped(sink_name: &str) {
    counter!(
        "lidar_sim_frames_dropped_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}

/// In-memory tick aggregator
#[derive(Debug, Clone, Default)]
pub struct TickMetricsAggregator {
    pub total_ticks: u64,
    pub empty_ticks: u64,
    pub total_rays: u64,
    pub total_points: u64,
    pub total_unresolved: u64,
    pub failed_channels: u64,

    /// Tick processing time (ms)
    pub latency_stats: RunningStats,

    /// Points per non-empty tick
    pub points_stats: RunningStats,
}

impl TickMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick into the running totals
    pub fn update(&mut self, report: &TickReport) {
        self.total_ticks += 1;
        self.latency_stats.push(report.elapsed_ms);

        if report.is_empty_tick() {
            self.empty_ticks += 1;
            return;
        }

        self.total_rays += report.rays_cast;
        self.total_points += report.points;
        self.total_unresolved += report.unresolved_hits;
        self.failed_channels += report.failed_channels as u64;
        self.points_stats.push(report.points as f64);
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_ticks: self.total_ticks,
            empty_ticks: self.empty_ticks,
            total_rays: self.total_rays,
            total_points: self.total_points,
            total_unresolved: self.total_unresolved,
            failed_channels: self.failed_channels,
            hit_rate: if self.total_rays > 0 {
                self.total_points as f64 / self.total_rays as f64 * 100.0
            } else {
                0.0
            },
            tick_latency_ms: StatsSummary::from(&self.latency_stats),
            points_per_tick: StatsSummary::from(&self.points_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Aggregated run summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_ticks: u64,
    pub empty_ticks: u64,
    pub total_rays: u64,
    pub total_points: u64,
    pub total_unresolved: u64,
    pub failed_channels: u64,
    /// Percentage of rays that produced a point
    pub hit_rate: f64,
    pub tick_latency_ms: StatsSummary,
    pub points_per_tick: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== LiDAR Metrics Summary ===")?;
        writeln!(
            f,
            "Ticks: {} ({} empty)",
            self.total_ticks, self.empty_ticks
        )?;
        writeln!(
            f,
            "Rays cast: {}, points: {} ({:.2}% hit)",
            self.total_rays, self.total_points, self.hit_rate
        )?;
        if self.total_unresolved > 0 {
            writeln!(f, "Unresolved hits: {}", self.total_unresolved)?;
        }
        if self.failed_channels > 0 {
            writeln!(f, "Failed channel traces: {}", self.failed_channels)?;
        }
        writeln!(f, "Tick latency (ms): {}", self.tick_latency_ms)?;
        writeln!(f, "Points per tick: {}", self.points_per_tick)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
