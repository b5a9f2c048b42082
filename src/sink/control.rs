//! Rotation control file
//!
//! A file sink remembers which rotation index it was writing to in a small binary
//! record, so a restarted process continues numbering instead of starting over.
//!
//! Layout: `u32 magic` followed by `u32 index`, both little-endian.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{LogError, Result};

/// Directory holding control files, next to the log files it describes
pub const CONTROL_DIR: &str = ".bufferlog";
/// Extension of control files
pub const CONTROL_EXTENSION: &str = "lcf";
/// Sentinel identifying a valid control record
pub const CONTROL_MAGIC: u32 = 0xF00D_BEEF;

const RECORD_LEN: usize = 8;

/// Persisted rotation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRecord {
    pub magic: u32,
    pub index: u32,
}

impl ControlRecord {
    pub fn new(index: u32) -> Self {
        Self {
            magic: CONTROL_MAGIC,
            index,
        }
    }

    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut bytes = [0u8; RECORD_LEN];
        bytes[..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..].copy_from_slice(&self.index.to_le_bytes());
        bytes
    }

    /// Decode a record; short input or a wrong magic number yields `None`
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let magic = u32::from_le_bytes(bytes.get(..4)?.try_into().ok()?);
        let index = u32::from_le_bytes(bytes.get(4..RECORD_LEN)?.try_into().ok()?);
        if magic != CONTROL_MAGIC {
            return None;
        }
        Some(Self { magic, index })
    }
}

/// Control file belonging to one named file sink
#[derive(Debug, Clone)]
pub struct ControlFile {
    path: PathBuf,
}

impl ControlFile {
    /// Control file for logger `name` writing to `log_path`
    pub fn for_log(log_path: &Path, name: &str) -> Self {
        let dir = log_path.parent().unwrap_or_else(|| Path::new(""));
        Self {
            path: dir
                .join(CONTROL_DIR)
                .join(format!("{}.{}", name, CONTROL_EXTENSION)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored index. Missing, unreadable or invalid records read as `None`.
    pub fn load(&self) -> Option<u32> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read control file");
                return None;
            }
        };

        match ControlRecord::from_bytes(&bytes) {
            Some(record) => Some(record.index),
            None => {
                tracing::warn!(path = %self.path.display(), "Ignoring invalid control file");
                None
            }
        }
    }

    /// Persist `index`, creating the control directory if needed
    pub fn store(&self, index: u32) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| LogError::io(dir, e))?;
        }
        fs::write(&self.path, ControlRecord::new(index).to_bytes())
            .map_err(|e| LogError::io(&self.path, e))
    }
}
