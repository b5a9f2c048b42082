//! `format!`-style logging macros
//!
//! The macros record the calling module and line so templates can use `${func}` and
//! `${lineno}`. A leading `error = <expr>` attaches an error for `${except}`. Each
//! expands to the `Result` of the underlying [`Sink::log`] call.
//!
//! [`Sink::log`]: crate::Sink::log

/// Log a formatted message at an explicit level
///
/// ```
/// use bufferlog::{log_at, ConsoleOptions, ConsoleSink, Severity};
///
/// let sink = ConsoleSink::new(ConsoleOptions::new("doc", Severity::Info)).unwrap();
/// log_at!(sink, Severity::Info, "listening on port {}", 8080).unwrap();
///
/// let err = std::io::Error::new(std::io::ErrorKind::Other, "refused");
/// log_at!(sink, Severity::Error, error = &err, "connect to {} failed", "db").unwrap();
/// ```
#[macro_export]
macro_rules! log_at {
    ($sink:expr, $level:expr, error = $err:expr, $($arg:tt)+) => {{
        #[allow(unused_imports)]
        use $crate::Sink as _;
        $sink.log(
            $level,
            &::std::format!($($arg)+),
            &$crate::CallSite::new()
                .function(::std::module_path!())
                .line(::std::line!())
                .error($err),
        )
    }};
    ($sink:expr, $level:expr, $($arg:tt)+) => {{
        #[allow(unused_imports)]
        use $crate::Sink as _;
        $sink.log(
            $level,
            &::std::format!($($arg)+),
            &$crate::CallSite::new()
                .function(::std::module_path!())
                .line(::std::line!()),
        )
    }};
}

#[macro_export]
macro_rules! log_ok {
    ($sink:expr, error = $err:expr, $($arg:tt)+) => {
        $crate::log_at!($sink, $crate::Severity::Ok, error = $err, $($arg)+)
    };
    ($sink:expr, $($arg:tt)+) => {
        $crate::log_at!($sink, $crate::Severity::Ok, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_info {
    ($sink:expr, error = $err:expr, $($arg:tt)+) => {
        $crate::log_at!($sink, $crate::Severity::Info, error = $err, $($arg)+)
    };
    ($sink:expr, $($arg:tt)+) => {
        $crate::log_at!($sink, $crate::Severity::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_warning {
    ($sink:expr, error = $err:expr, $($arg:tt)+) => {
        $crate::log_at!($sink, $crate::Severity::Warning, error = $err, $($arg)+)
    };
    ($sink:expr, $($arg:tt)+) => {
        $crate::log_at!($sink, $crate::Severity::Warning, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_error {
    ($sink:expr, error = $err:expr, $($arg:tt)+) => {
        $crate::log_at!($sink, $crate::Severity::Error, error = $err, $($arg)+)
    };
    ($sink:expr, $($arg:tt)+) => {
        $crate::log_at!($sink, $crate::Severity::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_fatal {
    ($sink:expr, error = $err:expr, $($arg:tt)+) => {
        $crate::log_at!($sink, $crate::Severity::Fatal, error = $err, $($arg)+)
    };
    ($sink:expr, $($arg:tt)+) => {
        $crate::log_at!($sink, $crate::Severity::Fatal, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($sink:expr, error = $err:expr, $($arg:tt)+) => {
        $crate::log_at!($sink, $crate::Severity::Debug, error = $err, $($arg)+)
    };
    ($sink:expr, $($arg:tt)+) => {
        $crate::log_at!($sink, $crate::Severity::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_trace {
    ($sink:expr, error = $err:expr, $($arg:tt)+) => {
        $crate::log_at!($sink, $crate::Severity::Trace, error = $err, $($arg)+)
    };
    ($sink:expr, $($arg:tt)+) => {
        $crate::log_at!($sink, $crate::Severity::Trace, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::{FileOptions, FileSink, Severity, Sink};
    use std::fs;
    use std::io;
    use tempfile::TempDir;

    fn file_sink(temp_dir: &TempDir, template: &str) -> FileSink {
        let sink = FileSink::new(
            FileOptions::new("macros", Severity::Trace, temp_dir.path().join("macros.log"))
                .buffer_size(0)
                .create_if_missing(true),
        )
        .unwrap();
        sink.settings().set_template(template);
        sink
    }

    fn contents(temp_dir: &TempDir) -> String {
        fs::read_to_string(temp_dir.path().join("macros.log0")).unwrap()
    }

    #[test]
    fn test_formats_arguments() {
        let temp_dir = TempDir::new().unwrap();
        let sink = file_sink(&temp_dir, "${llevel} ${lmsg}");

        log_info!(sink, "{} + {} = {}", 1, 2, 1 + 2).unwrap();
        log_warning!(&sink, "plain").unwrap();

        assert_eq!(contents(&temp_dir), "Info 1 + 2 = 3\nWarning plain\n");
    }

    #[test]
    fn test_records_call_site() {
        let temp_dir = TempDir::new().unwrap();
        let sink = file_sink(&temp_dir, "${func}:${lineno} ${lmsg}");

        let line = line!() + 1;
        log_error!(sink, "here").unwrap();

        assert_eq!(
            contents(&temp_dir),
            format!("{}:{} here\n", module_path!(), line)
        );
    }

    #[test]
    fn test_every_level_macro() {
        let temp_dir = TempDir::new().unwrap();
        let sink = file_sink(&temp_dir, "${llevel}");

        log_ok!(sink, "x").unwrap();
        log_info!(sink, "x").unwrap();
        log_warning!(sink, "x").unwrap();
        log_error!(sink, "x").unwrap();
        log_fatal!(sink, "x").unwrap();
        log_debug!(sink, "x").unwrap();
        log_trace!(sink, "x").unwrap();

        assert_eq!(
            contents(&temp_dir),
            "Ok\nInfo\nWarning\nError\nFatal\nDebug\nTrace\n"
        );
    }

    #[test]
    fn test_respects_max_level() {
        let temp_dir = TempDir::new().unwrap();
        let sink = file_sink(&temp_dir, "${lmsg}");
        sink.settings().set_max_level(Severity::Warning);

        log_debug!(sink, "hidden {}", 1).unwrap();
        log_ok!(sink, "shown").unwrap();

        assert_eq!(contents(&temp_dir), "shown\n");
    }

    #[test]
    fn test_works_through_trait_object() {
        let temp_dir = TempDir::new().unwrap();
        let sink: Box<dyn Sink> = Box::new(file_sink(&temp_dir, "${lmsg}"));

        log_trace!(sink, "boxed").unwrap();
        assert_eq!(contents(&temp_dir), "boxed\n");
    }

    #[test]
    fn test_attaches_error() {
        let temp_dir = TempDir::new().unwrap();
        let sink = file_sink(&temp_dir, "${llevel} ${lmsg}: ${except}");
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");

        log_error!(sink, error = &err, "cannot open {}", "config.toml").unwrap();
        log_at!(sink, Severity::Warning, error = &err, "retrying").unwrap();

        assert_eq!(
            contents(&temp_dir),
            "Error cannot open config.toml: access denied\nWarning retrying: access denied\n"
        );
    }

    #[test]
    fn test_without_error_leaves_except_token() {
        let temp_dir = TempDir::new().unwrap();
        let sink = file_sink(&temp_dir, "${lmsg} ${except}");

        log_fatal!(sink, "no cause").unwrap();
        assert_eq!(contents(&temp_dir), "no cause ${except}\n");
    }
}
