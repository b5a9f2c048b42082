//! Rotating file sink
//!
//! Log output goes to `<base><index>` (`app.log0`, `app.log1`, ...). Once the current
//! file reaches the size limit, the next flush moves on to the following index,
//! wrapping at the configured file count and truncating the file it lands on. The
//! index is persisted in a control file so a restarted process continues where the
//! previous one stopped.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{LogError, Result};
use crate::level::Severity;

use super::base::{Sink, SinkSettings};
use super::buffer::{FlushPolicy, WriteLock};
use super::control::ControlFile;
use super::pipeline::{Destination, Pipeline};

/// Bytes in one MiB
pub const ONE_MIB: u64 = 1_048_576;
/// Files in a rotation set unless configured otherwise
pub const DEFAULT_MAX_FILE_COUNT: u32 = 4;
/// Default buffer size in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 4096;
/// Default size limit of a single log file in MiB
pub const DEFAULT_MAX_FILE_SIZE_MIB: u32 = 10;

/// Options for building a [`FileSink`]
#[derive(Debug, Clone)]
pub struct FileOptions {
    /// Logger name, also names the control file
    pub name: String,
    /// Most verbose level written
    pub max_level: Severity,
    /// Base path; the rotation index is appended to it
    pub path: PathBuf,
    /// Flush once this many bytes are buffered (0 = every write)
    pub buffer_size: usize,
    /// Size limit of a single file in MiB
    pub max_file_size_mib: u32,
    /// Number of files in the rotation set
    pub max_file_count: u32,
    /// Flush after every message
    pub flush_after_write: bool,
    /// Create the current target file (and its directory) if it does not exist
    pub create_if_missing: bool,
    /// Lock to share with other sinks; a private lock is used if `None`
    pub write_lock: Option<WriteLock>,
}

impl FileOptions {
    pub fn new(name: impl Into<String>, max_level: Severity, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            max_level,
            path: path.into(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_file_size_mib: DEFAULT_MAX_FILE_SIZE_MIB,
            max_file_count: DEFAULT_MAX_FILE_COUNT,
            flush_after_write: false,
            create_if_missing: false,
            write_lock: None,
        }
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn max_file_size_mib(mut self, max_file_size_mib: u32) -> Self {
        self.max_file_size_mib = max_file_size_mib;
        self
    }

    pub fn max_file_count(mut self, max_file_count: u32) -> Self {
        self.max_file_count = max_file_count;
        self
    }

    pub fn flush_after_write(mut self, flush_after_write: bool) -> Self {
        self.flush_after_write = flush_after_write;
        self
    }

    pub fn create_if_missing(mut self, create_if_missing: bool) -> Self {
        self.create_if_missing = create_if_missing;
        self
    }

    pub fn write_lock(mut self, lock: WriteLock) -> Self {
        self.write_lock = Some(lock);
        self
    }
}

/// Append `index` to the base path
fn indexed_path(base: &Path, index: u32) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(index.to_string());
    PathBuf::from(path)
}

/// The rotation set a file sink writes into
struct RotatingFile {
    base: PathBuf,
    index: u32,
    max_file_count: u32,
    max_bytes: u64,
    control: ControlFile,
}

impl RotatingFile {
    fn current_path(&self) -> PathBuf {
        indexed_path(&self.base, self.index)
    }

    fn current_size(&self) -> Result<u64> {
        let path = self.current_path();
        match fs::metadata(&path) {
            Ok(metadata) => Ok(metadata.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(LogError::io(path, e)),
        }
    }

    fn rotate(&mut self) -> Result<()> {
        let next = (self.index + 1) % self.max_file_count;
        self.control.store(next)?;
        tracing::debug!(
            from = self.index,
            to = next,
            base = %self.base.display(),
            "Rotating log file"
        );
        self.index = next;
        Ok(())
    }
}

impl Destination for RotatingFile {
    fn write_buffered(&mut self, text: &str) -> Result<()> {
        let rotated = self.current_size()? >= self.max_bytes;
        if rotated {
            self.rotate()?;
        }

        let path = self.current_path();
        let mut options = OpenOptions::new();
        if rotated {
            options.write(true).create(true).truncate(true);
        } else {
            options.append(true).create(true);
        }
        let mut file = options.open(&path).map_err(|e| LogError::io(&path, e))?;

        let mut chunk = text.to_string();
        if !chunk.ends_with(['\n', '\r']) {
            chunk.push('\n');
        }
        file.write_all(chunk.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| LogError::io(&path, e))
    }
}

/// Sink writing to a size-limited, rotating set of files
pub struct FileSink {
    pipeline: Pipeline<RotatingFile>,
}

impl FileSink {
    /// Open the rotation set, resuming the index stored in the control file
    pub fn new(options: FileOptions) -> Result<Self> {
        if options.name.is_empty() {
            return Err(LogError::InvalidArgument(
                "file sink needs a name for its control file".to_string(),
            ));
        }
        if options.max_file_size_mib == 0 {
            return Err(LogError::InvalidArgument(
                "max file size must be at least 1 MiB".to_string(),
            ));
        }
        if options.max_file_count == 0 {
            return Err(LogError::InvalidArgument(
                "max file count must be at least 1".to_string(),
            ));
        }

        let control = ControlFile::for_log(&options.path, &options.name);
        let index = match control.load() {
            Some(index) if index < options.max_file_count => {
                tracing::debug!(logger = %options.name, index, "Resuming log rotation");
                index
            }
            Some(index) => {
                tracing::warn!(
                    logger = %options.name,
                    index,
                    max_file_count = options.max_file_count,
                    "Stored rotation index out of range, starting at 0"
                );
                0
            }
            None => 0,
        };

        let file = RotatingFile {
            base: options.path.clone(),
            index,
            max_file_count: options.max_file_count,
            max_bytes: u64::from(options.max_file_size_mib) * ONE_MIB,
            control,
        };

        let target = file.current_path();
        if !target.exists() {
            if !options.create_if_missing {
                return Err(LogError::InvalidArgument(format!(
                    "log file {} does not exist",
                    target.display()
                )));
            }
            create_log_file(&target)?;
        }

        let settings = SinkSettings::new(
            options.name,
            options.max_level,
            FlushPolicy::new(options.buffer_size, options.flush_after_write),
        );
        let lock = options.write_lock.unwrap_or_default();

        Ok(Self {
            pipeline: Pipeline::new(settings, file, lock),
        })
    }

    /// Rotation index currently written to
    pub fn current_index(&self) -> u32 {
        self.pipeline.with_destination(|file| file.index)
    }

    /// Path of the file currently written to
    pub fn current_path(&self) -> PathBuf {
        self.pipeline.with_destination(|file| file.current_path())
    }

    /// Path of this sink's control file
    pub fn control_path(&self) -> PathBuf {
        self.pipeline
            .with_destination(|file| file.control.path().to_path_buf())
    }

    pub fn max_file_count(&self) -> u32 {
        self.pipeline.with_destination(|file| file.max_file_count)
    }

    /// Change the size of the rotation set; takes effect at the next rotation
    pub fn set_max_file_count(&self, max_file_count: u32) -> Result<()> {
        if max_file_count == 0 {
            return Err(LogError::InvalidArgument(
                "max file count must be at least 1".to_string(),
            ));
        }
        self.pipeline
            .with_destination(|file| file.max_file_count = max_file_count);
        Ok(())
    }

    /// Bytes buffered but not yet written
    pub fn pending_bytes(&self) -> usize {
        self.pipeline.buffered_len()
    }

    pub fn write_lock(&self) -> &WriteLock {
        self.pipeline.write_lock()
    }
}

fn create_log_file(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| LogError::io(dir, e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| LogError::io(path, e))
}

impl Sink for FileSink {
    fn settings(&self) -> &SinkSettings {
        self.pipeline.settings()
    }

    fn log_message(&self, level: Severity, message: &str) -> Result<()> {
        self.pipeline.log_message(level, message)
    }

    fn flush_buffer(&self) -> Result<()> {
        self.pipeline.flush_buffer()
    }
}
