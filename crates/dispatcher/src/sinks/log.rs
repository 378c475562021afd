//! LogSink - logs frame summaries via tracing

use contracts::ContractError;
use measurement::LidarFrame;
use tracing::{info, instrument};

use crate::sink::FrameSink;

pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_frame_summary(&self, frame: &LidarFrame) {
        let report = &frame.report;
        info!(
            sink = %self.name,
            sensor_id = %frame.sensor_id,
            frame_id = frame.frame_id,
            timestamp = frame.timestamp,
            horizontal_angle = frame.horizontal_angle(),
            points = report.points,
            rays = report.rays_cast,
            unresolved = report.unresolved_hits,
            hit_ratio = report.hit_ratio(),
            empty = report.is_empty_tick(),
            bytes = frame.byte_len(),
            "LidarFrame received"
        );
    }
}

impl FrameSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_publish",
        skip(self, frame),
        fields(sink = %self.name, frame_id = frame.frame_id)
    )]
    async fn publish(&mut self, frame: &LidarFrame) -> Result<(), ContractError> {
        self.log_frame_summary(frame);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
