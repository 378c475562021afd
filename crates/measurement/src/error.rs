//! Measurement error types

use contracts::ContractError;
use thiserror::Error;

/// Rejected append into a measurement
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeasurementError {
    /// Channel index outside the configured channel count
    #[error("channel {channel} out of range (channel_count={channel_count})")]
    ChannelOutOfRange { channel: u32, channel_count: u32 },

    /// Appends must be channel-major
    #[error("channel {channel} appended after channel {current}")]
    ChannelOutOfOrder { channel: u32, current: u32 },

    /// Points and object ids must be index-aligned
    #[error("length mismatch: {points} points vs {object_ids} object ids")]
    LengthMismatch { points: usize, object_ids: usize },
}

/// Malformed encoded frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Buffer ended before a section was complete
    #[error("frame truncated in {section}: need {needed} bytes, have {available}")]
    Truncated {
        section: &'static str,
        needed: usize,
        available: usize,
    },

    /// Header total disagrees with the per-channel table
    #[error("header total {total} != sum of per-channel counts {sum}")]
    CountMismatch { total: u32, sum: u64 },

    /// Bytes left over after the groundtruth payload
    #[error("{0} trailing bytes after groundtruth payload")]
    TrailingBytes(usize),
}

impl From<FrameError> for ContractError {
    fn from(e: FrameError) -> Self {
        ContractError::FrameDecode {
            message: e.to_string(),
        }
    }
}
