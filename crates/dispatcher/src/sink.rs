//! FrameSink - transport endpoint for completed LiDAR frames

use contracts::ContractError;
use measurement::LidarFrame;

/// Frame consumer
///
/// A sink receives frames by reference; the dispatcher keeps the frame
/// alive until every sink has seen it, then its buffer returns to the
/// sensor's pool.
#[trait_variant::make(FrameSink: Send)]
pub trait LocalFrameSink {
    /// Sink name (logging/metrics)
    fn name(&self) -> &str;

    /// Publish one frame
    ///
    /// # Errors
    /// Returns a write error with context; the worker keeps going.
    async fn publish(&mut self, frame: &LidarFrame) -> Result<(), ContractError>;

    async fn flush(&mut self) -> Result<(), ContractError>;

    async fn close(&mut self) -> Result<(), ContractError>;
}
