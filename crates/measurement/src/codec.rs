//! Frame codec
//!
//! Layout, all fields little-endian:
//!
//! ```text
//! u32      total_point_count
//! u32      channel_count
//! u32[C]   per_channel_point_count
//! f32      horizontal_angle_marker
//! f32[3N]  x, y, z per point (channel-major, ray order)
//! u32[N]   object id per point (same order)
//! ```
//!
//! A consumer splits points back into channels from the header counts alone.

use std::ops::Range;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use contracts::{ObjectId, Vector3};

use crate::{FrameError, LidarMeasurement};

const U32_BYTES: usize = 4;
const POINT_BYTES: usize = 12;

/// Serializes measurements into frames
pub struct FrameEncoder;

impl FrameEncoder {
    /// Exact encoded size of `measurement`
    pub fn encoded_len(measurement: &LidarMeasurement) -> usize {
        let channels = measurement.channel_count() as usize;
        let points = measurement.point_count();
        // total + channel_count + table + marker
        U32_BYTES * (3 + channels) + points * (POINT_BYTES + U32_BYTES)
    }

    /// Encode into a freshly allocated buffer of exactly the encoded size
    pub fn encode(measurement: &LidarMeasurement) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::encoded_len(measurement));
        Self::encode_into(measurement, &mut buf);
        buf.freeze()
    }

    /// Append the frame to an existing buffer
    pub fn encode_into(measurement: &LidarMeasurement, buf: &mut BytesMut) {
        buf.reserve(Self::encoded_len(measurement));

        buf.put_u32_le(measurement.point_count() as u32);
        buf.put_u32_le(measurement.channel_count());
        for &count in measurement.per_channel_counts() {
            buf.put_u32_le(count);
        }
        buf.put_f32_le(measurement.horizontal_angle());

        for point in measurement.points() {
            buf.put_f32_le(point.x);
            buf.put_f32_le(point.y);
            buf.put_f32_le(point.z);
        }
        for &id in measurement.object_ids() {
            buf.put_u32_le(id);
        }
    }
}

/// Decoded frame header
#[derive(Debug, Clone, PartialEq)]
pub struct FrameHeader {
    pub total_point_count: u32,
    pub channel_count: u32,
    pub per_channel_point_count: Vec<u32>,
    pub horizontal_angle: f32,
}

impl FrameHeader {
    /// Index range of each channel inside the point/id payloads
    pub fn channel_ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.per_channel_point_count
            .iter()
            .scan(0usize, |offset, &count| {
                let start = *offset;
                *offset += count as usize;
                Some(start..*offset)
            })
    }
}

/// Fully decoded frame, as a downstream consumer would see it
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub header: FrameHeader,
    pub points: Vec<Vector3>,
    pub object_ids: Vec<ObjectId>,
}

impl DecodedFrame {
    /// Points and ids of one channel
    pub fn channel(&self, channel: u32) -> Option<(&[Vector3], &[ObjectId])> {
        let range = self.header.channel_ranges().nth(channel as usize)?;
        Some((&self.points[range.clone()], &self.object_ids[range]))
    }
}

fn ensure(buf: &[u8], needed: usize, section: &'static str) -> Result<(), FrameError> {
    if buf.remaining() < needed {
        return Err(FrameError::Truncated {
            section,
            needed,
            available: buf.remaining(),
        });
    }
    Ok(())
}

/// Decode a frame produced by `FrameEncoder`
pub fn decode_frame(mut buf: &[u8]) -> Result<DecodedFrame, FrameError> {
    ensure(buf, 2 * U32_BYTES, "header")?;
    let total_point_count = buf.get_u32_le();
    let channel_count = buf.get_u32_le();

    let table_len = (channel_count as usize).saturating_mul(U32_BYTES);
    ensure(buf, table_len.saturating_add(U32_BYTES), "channel table")?;
    let per_channel_point_count: Vec<u32> =
        (0..channel_count).map(|_| buf.get_u32_le()).collect();
    let horizontal_angle = buf.get_f32_le();

    let sum: u64 = per_channel_point_count.iter().map(|&c| u64::from(c)).sum();
    if sum != u64::from(total_point_count) {
        return Err(FrameError::CountMismatch {
            total: total_point_count,
            sum,
        });
    }

    let n = total_point_count as usize;
    ensure(buf, n.saturating_mul(POINT_BYTES), "point payload")?;
    let points: Vec<Vector3> = (0..n)
        .map(|_| {
            let x = buf.get_f32_le();
            let y = buf.get_f32_le();
            let z = buf.get_f32_le();
            Vector3::new(x, y, z)
        })
        .collect();

    ensure(buf, n.saturating_mul(U32_BYTES), "groundtruth payload")?;
    let object_ids: Vec<ObjectId> = (0..n).map(|_| buf.get_u32_le()).collect();

    if buf.has_remaining() {
        return Err(FrameError::TrailingBytes(buf.remaining()));
    }

    Ok(DecodedFrame {
        header: FrameHeader {
            total_point_count,
            channel_count,
            per_channel_point_count,
            horizontal_angle,
        },
        points,
        object_ids,
    })
}
