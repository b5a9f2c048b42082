//! The sink contract shared by every log destination
//!
//! A sink receives already rendered messages through [`Sink::log_message`] and decides,
//! with its flush policy, when buffered text reaches its destination. The leveled
//! shortcuts render a raw message through the sink's template first.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::Result;
use chrono::{DateTime, Local};

use crate::format::{
    format_message, format_message_at, CallSite, Layout, LoggerIdentity, Placeholder, Template,
    TimeFormat,
};
use crate::level::Severity;

use super::buffer::FlushPolicy;

#[derive(Debug, Clone)]
struct Profile {
    max_level: Severity,
    layout: Layout,
    policy: FlushPolicy,
}

/// Runtime-adjustable settings of a sink
///
/// Settings are read on every log call and may be changed from any thread.
#[derive(Debug)]
pub struct SinkSettings {
    name: String,
    profile: RwLock<Profile>,
}

impl SinkSettings {
    /// Create settings with the default template and time formats
    pub fn new(name: impl Into<String>, max_level: Severity, policy: FlushPolicy) -> Self {
        let name = name.into();
        Self {
            profile: RwLock::new(Profile {
                max_level,
                layout: Layout::new(name.clone()),
                policy,
            }),
            name,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Profile> {
        self.profile.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Profile> {
        self.profile.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Logger name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Most verbose level this sink accepts
    pub fn max_level(&self) -> Severity {
        self.read().max_level
    }

    pub fn set_max_level(&self, level: Severity) {
        self.write().max_level = level;
    }

    /// Check if a message of `level` would be accepted
    pub fn accepts(&self, level: Severity) -> bool {
        level <= self.read().max_level
    }

    pub fn identity(&self) -> LoggerIdentity {
        self.read().layout.identity.clone()
    }

    pub fn set_class_name(&self, class_name: impl Into<String>) {
        self.write().layout.identity.class_name = class_name.into();
    }

    pub fn set_app_name(&self, app_name: impl Into<String>) {
        self.write().layout.identity.app_name = app_name.into();
    }

    pub fn set_custom_flare(&self, custom: impl Into<String>) {
        self.write().layout.identity.custom = custom.into();
    }

    /// Current template text
    pub fn template(&self) -> String {
        self.read().layout.template.as_str().to_string()
    }

    /// Replace the template. An empty template disables formatting.
    pub fn set_template(&self, template: &str) {
        self.write().layout.template = Template::parse(template);
    }

    pub fn reset_template(&self) {
        self.write().layout.template = Template::default();
    }

    pub fn time_format(&self) -> TimeFormat {
        self.read().layout.time_format.clone()
    }

    pub fn set_time_format(&self, time_format: TimeFormat) {
        self.write().layout.time_format = time_format;
    }

    pub fn flush_policy(&self) -> FlushPolicy {
        self.read().policy
    }

    pub fn set_max_buffer_size(&self, max_buffer_size: usize) {
        self.write().policy.max_buffer_size = max_buffer_size;
    }

    pub fn set_flush_after_write(&self, flush_after_write: bool) {
        self.write().policy.flush_after_write = flush_after_write;
    }

    /// Check whether the current template uses `placeholder`
    pub fn uses(&self, placeholder: Placeholder) -> bool {
        self.read().layout.template.contains(placeholder)
    }

    /// Render a message with this sink's identity, template and time formats
    pub fn format(&self, message: &str, level: Severity, site: &CallSite<'_>) -> String {
        format_message(message, level, site, &self.read().layout, false)
    }

    /// Render at a fixed time, optionally colouring the level token
    pub fn render_at(
        &self,
        message: &str,
        level: Severity,
        site: &CallSite<'_>,
        coloured: bool,
        now: &DateTime<Local>,
    ) -> String {
        format_message_at(message, level, site, &self.read().layout, coloured, now)
    }
}

/// A log destination
pub trait Sink: Send + Sync {
    /// Settings shared by every log call on this sink
    fn settings(&self) -> &SinkSettings;

    /// Buffer an already rendered message and flush if the policy requires it
    ///
    /// Messages above the sink's max level are discarded without touching the buffer.
    fn log_message(&self, level: Severity, message: &str) -> Result<()>;

    /// Write buffered text to the destination. The buffer is kept if the write fails.
    fn flush_buffer(&self) -> Result<()>;

    fn name(&self) -> &str {
        self.settings().name()
    }

    fn format(&self, message: &str, level: Severity, site: &CallSite<'_>) -> String {
        self.settings().format(message, level, site)
    }

    /// Render and log a message
    fn log(&self, level: Severity, message: &str, site: &CallSite<'_>) -> Result<()> {
        if !self.settings().accepts(level) {
            return Ok(());
        }
        let rendered = self.format(message, level, site);
        self.log_message(level, &rendered)
    }

    fn ok(&self, message: &str) -> Result<()> {
        self.log(Severity::Ok, message, &CallSite::new())
    }

    fn info(&self, message: &str) -> Result<()> {
        self.log(Severity::Info, message, &CallSite::new())
    }

    fn warning(&self, message: &str) -> Result<()> {
        self.log(Severity::Warning, message, &CallSite::new())
    }

    fn error(&self, message: &str) -> Result<()> {
        self.log(Severity::Error, message, &CallSite::new())
    }

    fn fatal(&self, message: &str) -> Result<()> {
        self.log(Severity::Fatal, message, &CallSite::new())
    }

    fn debug(&self, message: &str) -> Result<()> {
        self.log(Severity::Debug, message, &CallSite::new())
    }

    fn trace(&self, message: &str) -> Result<()> {
        self.log(Severity::Trace, message, &CallSite::new())
    }
}
