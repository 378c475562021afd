//! LidarFrame - one completed tick, ready for transport

use bytes::Bytes;
use contracts::{SensorId, TickReport};

use crate::{LidarMeasurement, PooledMeasurement};

/// Output of one sensor tick.
///
/// `data` is the encoded frame. The structured measurement rides along so
/// in-process consumers can read points without decoding; its buffer goes
/// back to the sensor's pool when the frame is dropped.
#[derive(Debug)]
pub struct LidarFrame {
    pub sensor_id: SensorId,
    pub frame_id: u64,
    /// Simulation time at the end of the tick (seconds)
    pub timestamp: f64,
    pub report: TickReport,
    pub data: Bytes,
    measurement: PooledMeasurement,
}

impl LidarFrame {
    pub fn new(
        sensor_id: SensorId,
        report: TickReport,
        data: Bytes,
        measurement: PooledMeasurement,
    ) -> Self {
        Self {
            sensor_id,
            frame_id: report.frame_id,
            timestamp: report.timestamp,
            report,
            data,
            measurement,
        }
    }

    #[inline]
    pub fn measurement(&self) -> &LidarMeasurement {
        &self.measurement
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.measurement.point_count()
    }

    #[inline]
    pub fn channel_count(&self) -> u32 {
        self.measurement.channel_count()
    }

    /// Scan phase at the start of this tick (degrees)
    #[inline]
    pub fn horizontal_angle(&self) -> f32 {
        self.measurement.horizontal_angle()
    }

    /// Tick too short to cast any ray
    #[inline]
    pub fn is_empty_tick(&self) -> bool {
        self.report.is_empty_tick()
    }

    /// Encoded frame size in bytes
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Take the structured measurement out, detached from the pool
    pub fn into_measurement(self) -> LidarMeasurement {
        self.measurement.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode_frame, FrameEncoder, MeasurementPool};
    use contracts::Vector3;

    #[test]
    fn test_frame_returns_buffer_on_drop() {
        let pool = MeasurementPool::new(1, 2);
        let mut m = pool.checkout();
        m.reset(1);
        m.set_horizontal_angle(45.0);
        m.append(0, &[Vector3::new(3.0, 0.0, 0.0)], &[5]).unwrap();
        let data = FrameEncoder::encode(&m);

        let report = TickReport {
            frame_id: 7,
            timestamp: 0.7,
            samples_per_channel: 1,
            ..Default::default()
        };
        let frame = LidarFrame::new(SensorId::from("lidar.top"), report, data, m);

        assert_eq!(frame.frame_id, 7);
        assert_eq!(frame.point_count(), 1);
        assert_eq!(frame.horizontal_angle(), 45.0);
        assert_eq!(
            decode_frame(&frame.data).unwrap().object_ids,
            frame.measurement().object_ids()
        );
        assert_eq!(pool.idle_len(), 0);

        drop(frame);
        assert_eq!(pool.idle_len(), 1);
    }

    #[test]
    fn test_into_measurement_detaches_from_pool() {
        let pool = MeasurementPool::new(2, 2);
        let mut m = pool.checkout();
        m.reset(2);
        m.append(1, &[Vector3::new(0.0, 1.0, 0.0)], &[9]).unwrap();
        let data = FrameEncoder::encode(&m);

        let frame = LidarFrame::new(SensorId::from("lidar"), TickReport::default(), data, m);
        let owned = frame.into_measurement();

        assert_eq!(owned.per_channel_counts(), &[0, 1]);
        assert_eq!(pool.idle_len(), 0);
        assert_eq!(pool.stats().returned, 0);
    }
}
