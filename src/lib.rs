//! bufferlog - embeddable leveled logging
//!
//! Messages are rendered through a `${placeholder}` template, buffered per sink and
//! written to the console or to a set of rotating log files.

pub mod config;
pub mod error;
pub mod format;
pub mod level;
mod macros;
pub mod sink;

pub use config::Config;
pub use error::{LogError, Result};
pub use format::{CallSite, Layout, LoggerIdentity, Placeholder, Template, TimeFormat};
pub use level::Severity;
pub use sink::{
    ConsoleOptions, ConsoleSink, FileOptions, FileSink, FlushPolicy, Sink, SinkSettings,
    WriteLock,
};
