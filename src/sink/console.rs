//! Console sink
//!
//! Buffered output goes to stdout. Bad logs can skip the buffer and go straight to
//! stderr; debug output has its own stderr switch. A console sink can also mirror
//! every accepted message into a rotating file.
//!
//! Colour is applied to the `${llevel}` token while the sink renders a message, so text
//! handed to [`Sink::log_message`] already rendered is written unchanged.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;

use crate::error::{LogError, Result};
use crate::format::{CallSite, Placeholder};
use crate::level::Severity;

use super::base::{Sink, SinkSettings};
use super::buffer::{FlushPolicy, WriteLock};
use super::file_writer::{FileOptions, FileSink, DEFAULT_BUFFER_SIZE};
use super::pipeline::{Destination, Pipeline};

/// Rotating file a console sink mirrors its output into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorOptions {
    /// Directory receiving `<name>.log<N>`
    pub directory: PathBuf,
    /// Size limit of a single mirror file in MiB
    pub max_file_size_mib: u32,
}

/// Options for building a [`ConsoleSink`]
#[derive(Debug, Clone)]
pub struct ConsoleOptions {
    pub name: String,
    pub max_level: Severity,
    /// Flush once this many bytes are buffered (0 = every write)
    pub buffer_size: usize,
    pub flush_after_write: bool,
    /// Write bad logs directly to stderr
    pub bad_logs_to_stderr: bool,
    /// Write debug logs directly to stderr
    pub debug_logs_to_stderr: bool,
    /// Colour the level name in console output
    pub colour: bool,
    pub mirror: Option<MirrorOptions>,
    /// Lock to share with other sinks; a private lock is used if `None`
    pub write_lock: Option<WriteLock>,
}

impl ConsoleOptions {
    pub fn new(name: impl Into<String>, max_level: Severity) -> Self {
        Self {
            name: name.into(),
            max_level,
            buffer_size: DEFAULT_BUFFER_SIZE,
            flush_after_write: true,
            bad_logs_to_stderr: false,
            debug_logs_to_stderr: false,
            colour: false,
            mirror: None,
            write_lock: None,
        }
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn flush_after_write(mut self, flush_after_write: bool) -> Self {
        self.flush_after_write = flush_after_write;
        self
    }

    pub fn bad_logs_to_stderr(mut self, enabled: bool) -> Self {
        self.bad_logs_to_stderr = enabled;
        self
    }

    pub fn debug_logs_to_stderr(mut self, enabled: bool) -> Self {
        self.debug_logs_to_stderr = enabled;
        self
    }

    pub fn colour(mut self, enabled: bool) -> Self {
        self.colour = enabled;
        self
    }

    /// Mirror output into `<directory>/<name>.log<N>`
    pub fn mirror_to_file(mut self, directory: impl Into<PathBuf>, max_file_size_mib: u32) -> Self {
        self.mirror = Some(MirrorOptions {
            directory: directory.into(),
            max_file_size_mib,
        });
        self
    }

    pub fn write_lock(mut self, lock: WriteLock) -> Self {
        self.write_lock = Some(lock);
        self
    }
}

/// Writer a console sink can target
pub type ConsoleStream = Box<dyn Write + Send>;

/// stdout/stderr pair a console sink writes to
struct ConsoleStreams {
    out: ConsoleStream,
    err: ConsoleStream,
}

impl ConsoleStreams {
    fn write_err(&mut self, text: &str) -> Result<()> {
        write_stream(&mut self.err, "stderr", text)
    }
}

fn write_stream(stream: &mut ConsoleStream, name: &'static str, text: &str) -> Result<()> {
    let result = if text.ends_with(['\n', '\r']) {
        stream.write_all(text.as_bytes())
    } else {
        stream
            .write_all(text.as_bytes())
            .and_then(|_| stream.write_all(b"\n"))
    };
    result
        .and_then(|_| stream.flush())
        .map_err(|source| LogError::Stream {
            stream: name,
            source,
        })
}

impl Destination for ConsoleStreams {
    fn write_buffered(&mut self, text: &str) -> Result<()> {
        write_stream(&mut self.out, "stdout", text)
    }
}

/// Sink writing to the process console
pub struct ConsoleSink {
    pipeline: Pipeline<ConsoleStreams>,
    bad_logs_to_stderr: AtomicBool,
    debug_logs_to_stderr: AtomicBool,
    colour: AtomicBool,
    mirror: Option<FileSink>,
}

impl ConsoleSink {
    /// Console sink on the process stdout and stderr
    pub fn new(options: ConsoleOptions) -> Result<Self> {
        Self::with_streams(options, Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Console sink on caller-provided streams
    pub fn with_streams(
        options: ConsoleOptions,
        out: ConsoleStream,
        err: ConsoleStream,
    ) -> Result<Self> {
        let lock = options.write_lock.clone().unwrap_or_default();

        // The console level decides what is mirrored, so the mirror accepts everything
        let mirror = match &options.mirror {
            Some(mirror) => Some(FileSink::new(
                FileOptions::new(
                    options.name.clone(),
                    Severity::Trace,
                    mirror.directory.join(format!("{}.log", options.name)),
                )
                .buffer_size(options.buffer_size)
                .flush_after_write(options.flush_after_write)
                .max_file_size_mib(mirror.max_file_size_mib)
                .create_if_missing(true)
                .write_lock(lock.clone()),
            )?),
            None => None,
        };

        let settings = SinkSettings::new(
            options.name,
            options.max_level,
            FlushPolicy::new(options.buffer_size, options.flush_after_write),
        );

        Ok(Self {
            pipeline: Pipeline::new(settings, ConsoleStreams { out, err }, lock),
            bad_logs_to_stderr: AtomicBool::new(options.bad_logs_to_stderr),
            debug_logs_to_stderr: AtomicBool::new(options.debug_logs_to_stderr),
            colour: AtomicBool::new(options.colour),
            mirror,
        })
    }

    pub fn bad_logs_to_stderr(&self) -> bool {
        self.bad_logs_to_stderr.load(Ordering::Relaxed)
    }

    pub fn set_bad_logs_to_stderr(&self, enabled: bool) {
        self.bad_logs_to_stderr.store(enabled, Ordering::Relaxed);
    }

    pub fn debug_logs_to_stderr(&self) -> bool {
        self.debug_logs_to_stderr.load(Ordering::Relaxed)
    }

    pub fn set_debug_logs_to_stderr(&self, enabled: bool) {
        self.debug_logs_to_stderr.store(enabled, Ordering::Relaxed);
    }

    pub fn colour(&self) -> bool {
        self.colour.load(Ordering::Relaxed)
    }

    pub fn set_colour(&self, enabled: bool) {
        self.colour.store(enabled, Ordering::Relaxed);
    }

    /// File sink receiving mirrored output, if enabled
    pub fn mirror(&self) -> Option<&FileSink> {
        self.mirror.as_ref()
    }

    /// Bytes buffered for stdout but not yet written
    pub fn pending_bytes(&self) -> usize {
        self.pipeline.buffered_len()
    }

    pub fn write_lock(&self) -> &WriteLock {
        self.pipeline.write_lock()
    }

    fn routes_to_stderr(&self, level: Severity) -> bool {
        if level == Severity::Debug {
            self.debug_logs_to_stderr()
        } else {
            level.is_bad() && self.bad_logs_to_stderr()
        }
    }

    /// Send `console` text to stdout or stderr and `plain` text to the mirror
    fn write_rendered(&self, level: Severity, console: &str, plain: &str) -> Result<()> {
        if !self.settings().accepts(level) || plain.is_empty() {
            return Ok(());
        }

        let written = if self.routes_to_stderr(level) {
            self.pipeline
                .with_destination(|streams| streams.write_err(console))
        } else {
            self.pipeline.log_message(level, console)
        };

        // Outside the console lock: the mirror may share it
        let mirrored = match &self.mirror {
            Some(file) => file.log_message(level, plain),
            None => Ok(()),
        };

        written.and(mirrored)
    }
}

impl Sink for ConsoleSink {
    fn settings(&self) -> &SinkSettings {
        self.pipeline.settings()
    }

    fn log_message(&self, level: Severity, message: &str) -> Result<()> {
        self.write_rendered(level, message, message)
    }

    fn log(&self, level: Severity, message: &str, site: &CallSite<'_>) -> Result<()> {
        let settings = self.settings();
        if !settings.accepts(level) {
            return Ok(());
        }

        let now = Local::now();
        let plain = settings.render_at(message, level, site, false, &now);
        if self.colour() && settings.uses(Placeholder::Level) {
            let coloured = settings.render_at(message, level, site, true, &now);
            self.write_rendered(level, &coloured, &plain)
        } else {
            self.write_rendered(level, &plain, &plain)
        }
    }

    fn flush_buffer(&self) -> Result<()> {
        let console = self.pipeline.flush_buffer();
        let mirrored = match &self.mirror {
            Some(file) => file.flush_buffer(),
            None => Ok(()),
        };
        console.and(mirrored)
    }
}
