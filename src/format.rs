//! Message templating
//!
//! A template such as `"[ ${date} ${time} ] [ ${llevel} ] ${lmsg}"` is split into
//! literal text and placeholders once, when it is set. Rendering walks those segments
//! in a single pass, so substituted values are never scanned for further placeholders.
//!
//! Placeholders whose value is missing (no class name, no line number, ...) are left
//! in the output verbatim.

use std::error::Error as StdError;
use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

use crate::error::{LogError, Result};
use crate::level::Severity;

/// Template used when none is configured
pub const DEFAULT_TEMPLATE: &str = "[ ${date} ${time} ] [ ${llevel} ] ${lmsg}";
/// Default strftime format for `${date}`
pub const DEFAULT_DATE_FORMAT: &str = "%Y.%m.%d";
/// Default strftime format for `${time}`
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S";

/// Placeholders recognised inside a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Date,
    Time,
    DateTime,
    Level,
    Message,
    Function,
    Line,
    Class,
    Exception,
    AppName,
    Custom,
}

impl Placeholder {
    const ALL: [Placeholder; 11] = [
        Placeholder::Date,
        Placeholder::Time,
        Placeholder::DateTime,
        Placeholder::Level,
        Placeholder::Message,
        Placeholder::Function,
        Placeholder::Line,
        Placeholder::Class,
        Placeholder::Exception,
        Placeholder::AppName,
        Placeholder::Custom,
    ];

    /// Exact token text, including the `${` `}` delimiters
    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::Date => "${date}",
            Placeholder::Time => "${time}",
            Placeholder::DateTime => "${datetime}",
            Placeholder::Level => "${llevel}",
            Placeholder::Message => "${lmsg}",
            Placeholder::Function => "${func}",
            Placeholder::Line => "${lineno}",
            Placeholder::Class => "${class}",
            Placeholder::Exception => "${except}",
            Placeholder::AppName => "${appname}",
            Placeholder::Custom => "${custom}",
        }
    }

    fn match_prefix(text: &str) -> Option<Placeholder> {
        Placeholder::ALL
            .into_iter()
            .find(|p| text.starts_with(p.token()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// A parsed format template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template string. Unknown `${...}` sequences stay literal text.
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(pos) = rest.find("${") {
            literal.push_str(&rest[..pos]);
            rest = &rest[pos..];

            match Placeholder::match_prefix(rest) {
                Some(placeholder) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(placeholder));
                    rest = &rest[placeholder.token().len()..];
                }
                None => {
                    literal.push_str("${");
                    rest = &rest[2..];
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self {
            source: source.to_string(),
            segments,
        }
    }

    /// The template text as configured
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check if the template is empty (formatting is skipped)
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Check whether the template uses a placeholder
    pub fn contains(&self, placeholder: Placeholder) -> bool {
        self.segments
            .iter()
            .any(|s| *s == Segment::Placeholder(placeholder))
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::parse(DEFAULT_TEMPLATE)
    }
}

/// strftime formats used for the date and time placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFormat {
    date: String,
    time: String,
    datetime: Option<String>,
}

impl TimeFormat {
    /// Create validated date and time formats; `${datetime}` combines the two
    pub fn new(date: &str, time: &str) -> Result<Self> {
        validate_strftime(date)?;
        validate_strftime(time)?;
        Ok(Self {
            date: date.to_string(),
            time: time.to_string(),
            datetime: None,
        })
    }

    /// Use a dedicated format for `${datetime}` instead of date + time
    pub fn with_datetime(mut self, datetime: &str) -> Result<Self> {
        validate_strftime(datetime)?;
        self.datetime = Some(datetime.to_string());
        Ok(self)
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    /// Format used for `${datetime}`
    pub fn datetime(&self) -> String {
        match &self.datetime {
            Some(datetime) => datetime.clone(),
            None => format!("{} {}", self.date, self.time),
        }
    }
}

impl Default for TimeFormat {
    fn default() -> Self {
        Self {
            date: DEFAULT_DATE_FORMAT.to_string(),
            time: DEFAULT_TIME_FORMAT.to_string(),
            datetime: None,
        }
    }
}

fn validate_strftime(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(LogError::InvalidArgument(format!(
            "invalid date/time format `{}`",
            format
        )));
    }
    Ok(())
}

/// Names substituted into `${class}`, `${appname}` and `${custom}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggerIdentity {
    /// Logger name (also names the file sink's control file)
    pub name: String,
    /// Owning class or component
    pub class_name: String,
    /// Owning application
    pub app_name: String,
    /// Free-form flare for the `${custom}` placeholder
    pub custom: String,
}

impl LoggerIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Where a log call came from
#[derive(Debug, Clone, Copy, Default)]
pub struct CallSite<'a> {
    function: Option<&'a str>,
    line: Option<u32>,
    error: Option<&'a (dyn StdError + 'a)>,
}

impl<'a> CallSite<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Function (or module path) substituted for `${func}`
    pub fn function(mut self, function: &'a str) -> Self {
        self.function = Some(function);
        self
    }

    /// Line number substituted for `${lineno}`
    pub fn line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// Error substituted for `${except}`
    pub fn error(mut self, error: &'a (dyn StdError + 'a)) -> Self {
        self.error = Some(error);
        self
    }
}

/// Everything besides the message and call site that shapes a rendered line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub identity: LoggerIdentity,
    pub template: Template,
    pub time_format: TimeFormat,
}

impl Layout {
    /// Default template and time formats for logger `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            identity: LoggerIdentity::new(name),
            template: Template::default(),
            time_format: TimeFormat::default(),
        }
    }
}

/// Render `message` through the layout using the current local time
///
/// With `coloured` set, the `${llevel}` token is emitted in the level's ANSI colours.
pub fn format_message(
    message: &str,
    level: Severity,
    site: &CallSite<'_>,
    layout: &Layout,
    coloured: bool,
) -> String {
    format_message_at(message, level, site, layout, coloured, &Local::now())
}

/// Render `message` through the layout at a fixed point in time
pub fn format_message_at(
    message: &str,
    level: Severity,
    site: &CallSite<'_>,
    layout: &Layout,
    coloured: bool,
    now: &DateTime<Local>,
) -> String {
    let Layout {
        identity,
        template,
        time_format,
    } = layout;
    if template.is_empty() || message.is_empty() {
        return message.to_string();
    }

    let mut out = String::with_capacity(template.source.len() + message.len());

    for segment in &template.segments {
        let placeholder = match segment {
            Segment::Literal(text) => {
                out.push_str(text);
                continue;
            }
            Segment::Placeholder(placeholder) => *placeholder,
        };

        match placeholder {
            Placeholder::Date => push_time(&mut out, now, time_format.date()),
            Placeholder::Time => push_time(&mut out, now, time_format.time()),
            Placeholder::DateTime => push_time(&mut out, now, &time_format.datetime()),
            Placeholder::Level => out.push_str(&level.render(coloured)),
            Placeholder::Message => out.push_str(message),
            Placeholder::Function => push_or_token(&mut out, site.function, placeholder),
            Placeholder::Line => match site.line {
                Some(line) => {
                    let _ = write!(out, "{}", line);
                }
                None => out.push_str(placeholder.token()),
            },
            Placeholder::Class => {
                push_or_token(&mut out, non_empty(&identity.class_name), placeholder)
            }
            Placeholder::Exception => match site.error {
                Some(error) => {
                    let _ = write!(out, "{}", error);
                }
                None => out.push_str(placeholder.token()),
            },
            Placeholder::AppName => {
                push_or_token(&mut out, non_empty(&identity.app_name), placeholder)
            }
            Placeholder::Custom => push_or_token(&mut out, non_empty(&identity.custom), placeholder),
        }
    }

    out
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn push_or_token(out: &mut String, value: Option<&str>, placeholder: Placeholder) {
    match value.filter(|v| !v.is_empty()) {
        Some(value) => out.push_str(value),
        None => out.push_str(placeholder.token()),
    }
}

fn push_time(out: &mut String, now: &DateTime<Local>, format: &str) {
    // Formats are validated when set; fall back to the raw format if rendering still fails
    let start = out.len();
    if write!(out, "{}", now.format(format)).is_err() {
        out.truncate(start);
        out.push_str(format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 1, 21, 14, 30, 45).unwrap()
    }

    fn render(template: &str, message: &str, level: Severity, site: &CallSite<'_>) -> String {
        render_with(template, message, level, site, &LoggerIdentity::new("test"))
    }

    fn render_with(
        template: &str,
        message: &str,
        level: Severity,
        site: &CallSite<'_>,
        identity: &LoggerIdentity,
    ) -> String {
        let layout = Layout {
            identity: identity.clone(),
            template: Template::parse(template),
            time_format: TimeFormat::default(),
        };
        format_message_at(message, level, site, &layout, false, &fixed_time())
    }

    #[test]
    fn test_level_and_message_only() {
        let out = render("${llevel}:${lmsg}", "hello", Severity::Info, &CallSite::new());
        assert_eq!(out, "Info:hello");
    }

    #[test]
    fn test_default_template() {
        let out = render(DEFAULT_TEMPLATE, "started", Severity::Ok, &CallSite::new());
        assert_eq!(out, "[ 2026.01.21 14:30:45 ] [ Ok ] started");
    }

    #[test]
    fn test_datetime_combines_formats() {
        let out = render("${datetime}", "x", Severity::Info, &CallSite::new());
        assert_eq!(out, "2026.01.21 14:30:45");
    }

    #[test]
    fn test_custom_datetime_format() {
        let time_format = TimeFormat::new("%d/%m/%Y", "%H-%M")
            .unwrap()
            .with_datetime("%Y%m%dT%H%M%S")
            .unwrap();
        let layout = Layout {
            identity: LoggerIdentity::default(),
            template: Template::parse("${date}|${time}|${datetime}"),
            time_format,
        };
        let out = format_message_at(
            "x",
            Severity::Info,
            &CallSite::new(),
            &layout,
            false,
            &fixed_time(),
        );
        assert_eq!(out, "21/01/2026|14-30|20260121T143045");
    }

    #[test]
    fn test_invalid_time_format_rejected() {
        assert!(matches!(
            TimeFormat::new("%Y.%m.%", DEFAULT_TIME_FORMAT),
            Err(LogError::InvalidArgument(_))
        ));
        assert!(TimeFormat::default().with_datetime("%Q").is_err());
    }

    #[test]
    fn test_empty_template_or_message_is_passthrough() {
        assert_eq!(render("", "raw", Severity::Error, &CallSite::new()), "raw");
        assert_eq!(render("${llevel}:${lmsg}", "", Severity::Error, &CallSite::new()), "");
    }

    #[test]
    fn test_missing_values_leave_tokens() {
        let out = render(
            "${class}|${appname}|${custom}|${func}|${lineno}|${except}",
            "m",
            Severity::Info,
            &CallSite::new(),
        );
        assert_eq!(out, "${class}|${appname}|${custom}|${func}|${lineno}|${except}");
    }

    #[test]
    fn test_present_values_substituted() {
        let err = io::Error::new(io::ErrorKind::Other, "disk on fire");
        let site = CallSite::new().function("main").line(42).error(&err);
        let identity = LoggerIdentity {
            name: "test".into(),
            class_name: "Server".into(),
            app_name: "demo".into(),
            custom: ">>".into(),
        };
        let out = render_with(
            "${custom} ${appname}/${class}::${func}:${lineno} ${lmsg} (${except})",
            "boom",
            Severity::Fatal,
            &site,
            &identity,
        );
        assert_eq!(out, ">> demo/Server::main:42 boom (disk on fire)");
    }

    #[test]
    fn test_every_occurrence_replaced() {
        let out = render("${llevel} ${lmsg} ${llevel}", "x", Severity::Warning, &CallSite::new());
        assert_eq!(out, "Warning x Warning");
    }

    #[test]
    fn test_substituted_values_not_rescanned() {
        let identity = LoggerIdentity {
            class_name: "Widget".into(),
            ..LoggerIdentity::default()
        };
        let out = render_with(
            "${lmsg} ${class}",
            "literal ${class} and ${llevel}",
            Severity::Info,
            &CallSite::new(),
            &identity,
        );
        assert_eq!(out, "literal ${class} and ${llevel} Widget");
    }

    #[test]
    fn test_unknown_tokens_are_literal() {
        let out = render("${foo} ${lmsg} ${", "x", Severity::Info, &CallSite::new());
        assert_eq!(out, "${foo} x ${");
    }

    #[test]
    fn test_template_contains() {
        let template = Template::parse("[${llevel}] ${lmsg}");
        assert!(template.contains(Placeholder::Level));
        assert!(template.contains(Placeholder::Message));
        assert!(!template.contains(Placeholder::Date));
        assert_eq!(template.as_str(), "[${llevel}] ${lmsg}");
    }

    #[test]
    fn test_datetime_token_not_confused_with_date() {
        let template = Template::parse("${datetime}");
        assert!(template.contains(Placeholder::DateTime));
        assert!(!template.contains(Placeholder::Date));
    }

    #[test]
    fn test_colour_applies_to_level_token_only() {
        let mut layout = Layout::new("test");
        layout.template = Template::parse("${lmsg} [${llevel}]");

        let out = format_message_at(
            "Information arrived",
            Severity::Info,
            &CallSite::new(),
            &layout,
            true,
            &fixed_time(),
        );
        assert_eq!(
            out,
            format!("Information arrived [{}]", Severity::Info.render(true))
        );
    }

    #[test]
    fn test_colour_leaves_identity_values_plain() {
        let mut layout = Layout::new("test");
        layout.identity.class_name = "ErrorHandler".into();
        layout.template = Template::parse("${class} ${llevel} ${lmsg}");

        let out = format_message_at(
            "retrying",
            Severity::Error,
            &CallSite::new(),
            &layout,
            true,
            &fixed_time(),
        );
        assert_eq!(
            out,
            format!("ErrorHandler {} retrying", Severity::Error.render(true))
        );
    }
}
