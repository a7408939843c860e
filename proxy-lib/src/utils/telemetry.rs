use std::{io::IsTerminal as _, path::Path};

use rama::{
    error::{BoxError, ErrorContext as _},
    telemetry::tracing::{
        self,
        metadata::LevelFilter,
        subscriber::{EnvFilter, fmt::writer::BoxMakeWriter},
    },
};

#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig<'a> {
    /// debug logging as default instead of info
    pub verbose: bool,
    /// format the logs for humans
    pub pretty: bool,
    /// append logs to this file instead of writing them to stderr
    pub output: Option<&'a Path>,
}

impl TelemetryConfig<'_> {
    fn default_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        }
    }

    /// Returns the writer together with whether or not it supports ANSI colors.
    fn writer(&self) -> Result<(BoxMakeWriter, bool), BoxError> {
        let Some(path) = self.output else {
            return Ok((
                BoxMakeWriter::new(std::io::stderr),
                std::io::stderr().is_terminal(),
            ));
        };

        let file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .context("open log file")
            .with_context_debug_field("path", || path.to_owned())?;

        Ok((BoxMakeWriter::new(file), false))
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the default level (INFO, or DEBUG when verbose).
/// Every fault decision is logged at TRACE level, e.g. `RUST_LOG=fault_injection_proxy_lib=trace`.
pub fn init_tracing(cfg: TelemetryConfig<'_>) -> Result<(), BoxError> {
    let (make_writer, ansi) = cfg.writer()?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(cfg.default_level().into())
        .from_env_lossy();

    let subscriber = tracing::subscriber::fmt()
        .with_ansi(ansi)
        .with_env_filter(env_filter)
        .with_writer(make_writer);

    if cfg.pretty {
        subscriber.pretty().try_init()?;
    } else {
        subscriber.try_init()?;
    }

    tracing::debug!(
        verbose = cfg.verbose,
        pretty = cfg.pretty,
        output = ?cfg.output,
        "tracing initialised"
    );
    Ok(())
}
