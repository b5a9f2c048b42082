//! Configuration management for bufferlog
//!
//! A config file describes a set of sinks. It is read from `~/.bufferlog/config.toml`
//! unless a path is given explicitly.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::error::LogError;
use crate::format::{TimeFormat, DEFAULT_DATE_FORMAT, DEFAULT_TEMPLATE, DEFAULT_TIME_FORMAT};
use crate::level::Severity;
use crate::sink::{
    ConsoleOptions, ConsoleSink, FileOptions, FileSink, Sink, DEFAULT_BUFFER_SIZE,
    DEFAULT_MAX_FILE_COUNT, DEFAULT_MAX_FILE_SIZE_MIB,
};

/// Severity written either as a name or as a rank
#[derive(Deserialize)]
#[serde(untagged)]
enum SeverityRepr {
    Rank(u8),
    Name(String),
}

fn deserialize_severity<'de, D>(deserializer: D) -> std::result::Result<Severity, D::Error>
where
    D: Deserializer<'de>,
{
    match SeverityRepr::deserialize(deserializer)? {
        SeverityRepr::Rank(rank) => Severity::try_from(rank),
        SeverityRepr::Name(name) => name.parse(),
    }
    .map_err(serde::de::Error::custom)
}

/// File a console sink mirrors its output into
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MirrorConfig {
    /// Directory receiving `<name>.log<N>`
    pub directory: String,
    #[serde(default = "default_max_file_size_mib")]
    pub max_file_size_mib: u32,
}

/// Console sink entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub name: String,
    #[serde(
        default = "default_max_level",
        deserialize_with = "deserialize_severity"
    )]
    pub max_level: Severity,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_true")]
    pub flush_after_write: bool,
    #[serde(default)]
    pub bad_logs_to_stderr: bool,
    #[serde(default)]
    pub debug_logs_to_stderr: bool,
    #[serde(default)]
    pub colour: bool,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_time_format")]
    pub time_format: String,
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub class_name: String,
    /// Flare substituted for `${custom}`
    #[serde(default)]
    pub custom: String,
    #[serde(default)]
    pub mirror: Option<MirrorConfig>,
}

/// Rotating file sink entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileConfig {
    pub name: String,
    /// Base path; `~` is expanded
    pub path: String,
    #[serde(
        default = "default_max_level",
        deserialize_with = "deserialize_severity"
    )]
    pub max_level: Severity,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default)]
    pub flush_after_write: bool,
    #[serde(default = "default_max_file_size_mib")]
    pub max_file_size_mib: u32,
    #[serde(default = "default_max_file_count")]
    pub max_file_count: u32,
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_time_format")]
    pub time_format: String,
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub class_name: String,
    /// Flare substituted for `${custom}`
    #[serde(default)]
    pub custom: String,
}

/// One `[[sinks]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SinkConfig {
    Console(ConsoleConfig),
    File(FileConfig),
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_sinks")]
    pub sinks: Vec<SinkConfig>,
}

fn default_max_level() -> Severity {
    Severity::Info
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_true() -> bool {
    true
}

fn default_format() -> String {
    DEFAULT_TEMPLATE.to_string()
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_time_format() -> String {
    DEFAULT_TIME_FORMAT.to_string()
}

fn default_max_file_size_mib() -> u32 {
    DEFAULT_MAX_FILE_SIZE_MIB
}

fn default_max_file_count() -> u32 {
    DEFAULT_MAX_FILE_COUNT
}

fn default_sinks() -> Vec<SinkConfig> {
    vec![SinkConfig::Console(ConsoleConfig::new("bufferlog"))]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sinks: default_sinks(),
        }
    }
}

impl ConsoleConfig {
    /// Console entry with every optional field at its default
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_level: default_max_level(),
            buffer_size: default_buffer_size(),
            flush_after_write: true,
            bad_logs_to_stderr: false,
            debug_logs_to_stderr: false,
            colour: false,
            format: default_format(),
            date_format: default_date_format(),
            time_format: default_time_format(),
            app_name: String::new(),
            class_name: String::new(),
            custom: String::new(),
            mirror: None,
        }
    }
}

impl SinkConfig {
    pub fn name(&self) -> &str {
        match self {
            SinkConfig::Console(console) => &console.name,
            SinkConfig::File(file) => &file.name,
        }
    }

    /// Construct the sink this entry describes
    pub fn build(&self) -> crate::Result<Box<dyn Sink>> {
        match self {
            SinkConfig::Console(console) => {
                let mut options = ConsoleOptions::new(console.name.clone(), console.max_level)
                    .buffer_size(console.buffer_size)
                    .flush_after_write(console.flush_after_write)
                    .bad_logs_to_stderr(console.bad_logs_to_stderr)
                    .debug_logs_to_stderr(console.debug_logs_to_stderr)
                    .colour(console.colour);
                if let Some(mirror) = &console.mirror {
                    options = options
                        .mirror_to_file(expand_path(&mirror.directory), mirror.max_file_size_mib);
                }

                let sink = ConsoleSink::new(options)?;
                apply_presentation(
                    &sink,
                    &console.format,
                    &console.date_format,
                    &console.time_format,
                    Identity {
                        app_name: &console.app_name,
                        class_name: &console.class_name,
                        custom: &console.custom,
                    },
                )?;
                Ok(Box::new(sink))
            }
            SinkConfig::File(file) => {
                let options =
                    FileOptions::new(file.name.clone(), file.max_level, expand_path(&file.path))
                        .buffer_size(file.buffer_size)
                        .flush_after_write(file.flush_after_write)
                        .max_file_size_mib(file.max_file_size_mib)
                        .max_file_count(file.max_file_count)
                        .create_if_missing(file.create_if_missing);

                let sink = FileSink::new(options)?;
                apply_presentation(
                    &sink,
                    &file.format,
                    &file.date_format,
                    &file.time_format,
                    Identity {
                        app_name: &file.app_name,
                        class_name: &file.class_name,
                        custom: &file.custom,
                    },
                )?;
                Ok(Box::new(sink))
            }
        }
    }
}

/// Identity names configured for a sink
struct Identity<'a> {
    app_name: &'a str,
    class_name: &'a str,
    custom: &'a str,
}

fn apply_presentation(
    sink: &dyn Sink,
    format: &str,
    date_format: &str,
    time_format: &str,
    identity: Identity<'_>,
) -> crate::Result<()> {
    let settings = sink.settings();
    settings.set_time_format(TimeFormat::new(date_format, time_format)?);
    settings.set_template(format);
    settings.set_app_name(identity.app_name);
    settings.set_class_name(identity.class_name);
    settings.set_custom_flare(identity.custom);
    Ok(())
}

/// Expand a leading `~` in a configured path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

impl Config {
    /// Load configuration from the default location, or return the default if not found
    pub fn load() -> Result<Self> {
        let path = config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Construct every configured sink, stopping at the first failure
    pub fn build(&self) -> std::result::Result<Vec<Box<dyn Sink>>, LogError> {
        self.sinks.iter().map(SinkConfig::build).collect()
    }
}

/// Get the bufferlog configuration directory (~/.bufferlog)
///
/// Falls back to `./.bufferlog` when no home directory is available.
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".bufferlog")
    })
}

/// Get the configuration directory, or `None` without a home directory
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".bufferlog"))
}

/// Path of the default config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}
