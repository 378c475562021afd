//! LidarMeasurement - reusable per-tick accumulation buffer
//!
//! Points are stored channel-major: all hits of channel 0 in ray order, then
//! channel 1, and so on. `object_ids` is index-aligned with `points` at all
//! times, and `header[c]` counts the points of channel `c`.

use contracts::{ObjectId, Vector3};

use crate::MeasurementError;

/// Point cloud of one tick with per-point groundtruth
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LidarMeasurement {
    /// Per-channel point counts, len = channel count
    header: Vec<u32>,
    points: Vec<Vector3>,
    object_ids: Vec<ObjectId>,
    horizontal_angle: f32,
    /// Lowest channel still accepting appends
    cursor: u32,
}

impl LidarMeasurement {
    /// Create an empty measurement for `channel_count` channels
    pub fn new(channel_count: u32) -> Self {
        Self {
            header: vec![0; channel_count as usize],
            ..Default::default()
        }
    }

    /// Clear all content and reserve room for `total_point_budget` points.
    ///
    /// Backing storage is kept, so a buffer that has already grown to the
    /// steady-state size does not allocate again.
    pub fn reset(&mut self, total_point_budget: usize) {
        self.points.clear();
        self.object_ids.clear();
        self.points.reserve(total_point_budget);
        self.object_ids.reserve(total_point_budget);
        self.header.fill(0);
        self.horizontal_angle = 0.0;
        self.cursor = 0;
    }

    /// Append the hits of one channel.
    ///
    /// Channels must arrive in non-decreasing index order. On error nothing
    /// is written.
    pub fn append(
        &mut self,
        channel: u32,
        points: &[Vector3],
        object_ids: &[ObjectId],
    ) -> Result<(), MeasurementError> {
        let channel_count = self.channel_count();
        if channel >= channel_count {
            return Err(MeasurementError::ChannelOutOfRange {
                channel,
                channel_count,
            });
        }
        if channel < self.cursor {
            return Err(MeasurementError::ChannelOutOfOrder {
                channel,
                current: self.cursor,
            });
        }
        if points.len() != object_ids.len() {
            return Err(MeasurementError::LengthMismatch {
                points: points.len(),
                object_ids: object_ids.len(),
            });
        }

        self.points.extend_from_slice(points);
        self.object_ids.extend_from_slice(object_ids);
        self.header[channel as usize] += points.len() as u32;
        self.cursor = channel;
        Ok(())
    }

    #[inline]
    pub fn channel_count(&self) -> u32 {
        self.header.len() as u32
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn points(&self) -> &[Vector3] {
        &self.points
    }

    #[inline]
    pub fn object_ids(&self) -> &[ObjectId] {
        &self.object_ids
    }

    /// Per-channel point counts
    #[inline]
    pub fn per_channel_counts(&self) -> &[u32] {
        &self.header
    }

    /// Points and ids of one channel
    pub fn channel(&self, channel: u32) -> Option<(&[Vector3], &[ObjectId])> {
        let count = *self.header.get(channel as usize)? as usize;
        let start: usize = self.header[..channel as usize]
            .iter()
            .map(|&c| c as usize)
            .sum();
        let range = start..start + count;
        Some((&self.points[range.clone()], &self.object_ids[range]))
    }

    /// Scan phase at the start of the tick (degrees)
    #[inline]
    pub fn horizontal_angle(&self) -> f32 {
        self.horizontal_angle
    }

    #[inline]
    pub fn set_horizontal_angle(&mut self, angle: f32) {
        self.horizontal_angle = angle;
    }

    /// Points that fit without reallocating
    #[inline]
    pub fn capacity(&self) -> usize {
        self.points.capacity().min(self.object_ids.capacity())
    }
}
