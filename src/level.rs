//! Severity levels
//!
//! Levels carry a fixed integer rank used for every threshold comparison, and a fixed
//! colour used when console output is coloured.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crossterm::style::{Color, Stylize};
use serde::{Deserialize, Serialize};

use crate::error::LogError;

/// Severity of a log message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Severity {
    Ok,
    Info,
    Warning,
    Error,
    Fatal,
    Debug,
    Trace,
}

/// Lowest rank treated as a bad log (forces a flush, may be routed to stderr)
pub const BAD_LOG_THRESHOLD: Severity = Severity::Error;

impl Severity {
    /// Every level in rank order
    pub const ALL: [Severity; 7] = [
        Severity::Ok,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Fatal,
        Severity::Debug,
        Severity::Trace,
    ];

    /// Integer rank of this level
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Ok => 0,
            Severity::Info => 1,
            Severity::Warning => 2,
            Severity::Error => 3,
            Severity::Fatal => 4,
            Severity::Debug => 5,
            Severity::Trace => 6,
        }
    }

    /// Canonical display name
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ok => "Ok",
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal",
            Severity::Debug => "Debug",
            Severity::Trace => "Trace",
        }
    }

    /// Check if this level is at or above the bad log threshold
    pub fn is_bad(&self) -> bool {
        self.rank() >= BAD_LOG_THRESHOLD.rank()
    }

    /// Foreground and optional background colour for this level
    pub fn colours(&self) -> (Color, Option<Color>) {
        match self {
            Severity::Ok => (Color::Green, None),
            Severity::Info => (Color::Cyan, None),
            Severity::Warning => (Color::Yellow, None),
            Severity::Error => (Color::Red, None),
            Severity::Fatal => (Color::White, Some(Color::Red)),
            Severity::Debug => (Color::Magenta, None),
            Severity::Trace => (Color::Blue, None),
        }
    }

    /// Render the level name, optionally wrapped in its ANSI colours
    pub fn render(&self, coloured: bool) -> String {
        if !coloured {
            return self.as_str().to_string();
        }

        let (fg, bg) = self.colours();
        let styled = self.as_str().with(fg);
        match bg {
            Some(bg) => styled.on(bg).to_string(),
            None => styled.to_string(),
        }
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = LogError;

    /// Parse a level name (any case) or its decimal rank
    fn from_str(s: &str) -> Result<Self, LogError> {
        let text = s.trim();

        if let Ok(rank) = text.parse::<u8>() {
            return Severity::try_from(rank).map_err(|_| LogError::UnknownSeverity(s.to_string()));
        }

        Severity::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(text))
            .ok_or_else(|| LogError::UnknownSeverity(s.to_string()))
    }
}

impl TryFrom<u8> for Severity {
    type Error = LogError;

    fn try_from(rank: u8) -> Result<Self, LogError> {
        Severity::ALL
            .get(usize::from(rank))
            .copied()
            .ok_or_else(|| LogError::UnknownSeverity(rank.to_string()))
    }
}

impl TryFrom<String> for Severity {
    type Error = LogError;

    fn try_from(value: String) -> Result<Self, LogError> {
        value.parse()
    }
}

impl From<Severity> for String {
    fn from(level: Severity) -> Self {
        level.as_str().to_lowercase()
    }
}
