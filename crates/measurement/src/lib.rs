//! # Measurement
//!
//! Per-tick LiDAR measurement storage and its binary frame.
//!
//! Responsibilities:
//! - `LidarMeasurement`: channel-major points + parallel groundtruth ids
//! - `MeasurementPool`: exclusive checkout, automatic return on drop
//! - `FrameEncoder` / `decode_frame`: header + payload byte layout
//! - `LidarFrame`: the unit handed to transport
//!
//! ## Usage
//!
//! ```
//! use contracts::Vector3;
//! use measurement::{decode_frame, FrameEncoder, MeasurementPool};
//!
//! let pool = MeasurementPool::new(2, 4);
//! let mut m = pool.checkout();
//! m.reset(8);
//! m.set_horizontal_angle(12.5);
//! m.append(0, &[Vector3::new(1.0, 0.0, 0.0)], &[42]).unwrap();
//!
//! let bytes = FrameEncoder::encode(&m);
//! let decoded = decode_frame(&bytes).unwrap();
//! assert_eq!(decoded.header.per_channel_point_count, vec![1, 0]);
//! assert_eq!(decoded.channel(0).unwrap().1, &[42]);
//! ```

mod buffer;
mod codec;
mod error;
mod frame;
mod pool;

pub use buffer::LidarMeasurement;
pub use codec::{decode_frame, DecodedFrame, FrameEncoder, FrameHeader};
pub use error::{FrameError, MeasurementError};
pub use frame::LidarFrame;
pub use pool::{MeasurementPool, PoolStats, PooledMeasurement};
