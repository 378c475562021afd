//! # Dispatcher
//!
//! Frame transport for the LiDAR simulator.
//!
//! - Consumes `LidarFrame`s from the sensor loop
//! - Fans out to every configured sink through a shared `Arc`
//! - Isolates slow sinks behind bounded queues, dropping on overflow

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sink;
pub mod sinks;

pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use measurement::LidarFrame;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sink::{FrameSink, LocalFrameSink};
pub use sinks::{FileFormat, FileSink, FileSinkConfig, LogSink};
