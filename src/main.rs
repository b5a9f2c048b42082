//! Walkthrough of the bufferlog sinks
//!
//! Logs a message at every level through a console sink with the default format, a
//! renamed application, a custom format and finally a console sink mirrored to a file.

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use bufferlog::{
    log_debug, log_error, log_fatal, log_info, log_ok, log_trace, log_warning, Config,
    ConsoleOptions, ConsoleSink, Severity, Sink,
};

const CUSTOM_FORMAT: &str = "[[ ${datetime} ]] [${appname}] ${llevel} ${lmsg}";

fn every_level(sink: &dyn Sink, stage: &str) -> Result<()> {
    log_ok!(sink, "{}: ok message", stage)?;
    log_info!(sink, "{}: info message", stage)?;
    log_warning!(sink, "{}: warning message", stage)?;
    log_error!(sink, "{}: error message", stage)?;
    log_fatal!(sink, "{}: fatal message", stage)?;
    log_debug!(sink, "{}: debug message", stage)?;
    log_trace!(sink, "{}: trace message", stage)?;
    sink.flush_buffer()?;
    Ok(())
}

fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bufferlog=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let console = ConsoleSink::new(
        ConsoleOptions::new("demo", Severity::Trace)
            .bad_logs_to_stderr(true)
            .colour(true),
    )
    .context("Failed to create console sink")?;

    every_level(&console, "default format")?;

    console.settings().set_app_name("bufferlog-demo");
    every_level(&console, "named application")?;

    console.settings().set_template(CUSTOM_FORMAT);
    every_level(&console, "custom format")?;

    let mirrored = ConsoleSink::new(
        ConsoleOptions::new("demo-mirror", Severity::Trace)
            .colour(true)
            .mirror_to_file(".", 12),
    )
    .context("Failed to create mirrored console sink")?;
    every_level(&mirrored, "mirrored")?;
    if let Some(file) = mirrored.mirror() {
        tracing::info!("Mirrored output written to {}", file.current_path().display());
    }

    // Sinks from the user's config file, if one exists
    let config = Config::load()?;
    for sink in config.build().context("Failed to build configured sinks")? {
        tracing::info!(sink = %sink.name(), "Built configured sink");
        every_level(sink.as_ref(), "configured")?;
    }

    Ok(())
}
