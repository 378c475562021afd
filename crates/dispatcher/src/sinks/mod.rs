//! Sink implementations

mod file;
mod log;

pub use self::file::{FileFormat, FileSink, FileSinkConfig};
pub use self::log::LogSink;
