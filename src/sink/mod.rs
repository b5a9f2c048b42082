//! Log sinks
//!
//! Provides the sink contract, the buffered write path every sink shares, and the
//! console and rotating file destinations.

mod base;
mod buffer;
mod console;
mod control;
mod file_writer;
mod pipeline;

pub use base::{Sink, SinkSettings};
pub use buffer::{FlushPolicy, LogBuffer, WriteLock};
pub use console::{ConsoleOptions, ConsoleSink, ConsoleStream, MirrorOptions};
pub use control::{ControlFile, ControlRecord, CONTROL_DIR, CONTROL_EXTENSION, CONTROL_MAGIC};
pub use file_writer::{
    FileOptions, FileSink, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FILE_COUNT, DEFAULT_MAX_FILE_SIZE_MIB,
    ONE_MIB,
};
pub use pipeline::{Destination, Pipeline};
