//! Run statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::TickMetricsAggregator;

#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Ticks executed
    pub ticks: u64,

    /// Frames handed to the dispatcher
    pub frames_sent: u64,

    /// Wall-clock duration of the run
    pub duration: Duration,

    pub active_sinks: usize,

    /// Measurement buffers allocated by the sensor pool
    pub buffers_created: u64,

    pub tick_metrics: TickMetricsAggregator,

    /// Final per-sink counters
    pub sink_metrics: Vec<(String, MetricsSnapshot)>,
}

impl PipelineStats {
    pub fn ticks_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ticks as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n=== Run Statistics ===");
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!("Ticks: {} ({:.2}/s)", self.ticks, self.ticks_per_sec());
        println!("Frames sent: {}", self.frames_sent);
        println!("Pool buffers allocated: {}", self.buffers_created);
        println!();
        print!("{}", self.tick_metrics.summary());

        if !self.sink_metrics.is_empty() {
            println!("\nSinks ({}):", self.active_sinks);
            for (name, m) in &self.sink_metrics {
                println!(
                    "  - {}: {} written, {} failed, {} dropped, {} points",
                    name, m.write_count, m.failure_count, m.dropped_count, m.points_written
                );
            }
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_per_sec() {
        let mut stats = PipelineStats {
            ticks: 50,
            ..Default::default()
        };
        assert_eq!(stats.ticks_per_sec(), 0.0);
        stats.duration = Duration::from_secs(5);
        assert_eq!(stats.ticks_per_sec(), 10.0);
    }
}
