use std::{
    convert::Infallible,
    fmt::{Display, Formatter},
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::{Directive, LevelFilter},
    fmt::{
        self,
        format::{Format, JsonFields, Writer},
        time::FormatTime,
        writer::BoxMakeWriter,
        FmtContext, FormatEvent, FormatFields,
    },
    prelude::*,
    registry::LookupSpan,
    util::TryInitError,
    EnvFilter,
};

/// Output format emitted to the terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ArgEnum))]
pub enum LogFormat {
    /// Single-line logs with the span context ahead of the event.
    Full,
    /// Multi-line logs optimized for human readability.
    Pretty,
    /// Newline-delimited JSON.
    Json,
    /// Only the fields of the most recently entered span.
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Pretty
    }
}

impl Display for LogFormat {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            LogFormat::Full => fmt.write_str("full"),
            LogFormat::Pretty => fmt.write_str("pretty"),
            LogFormat::Json => fmt.write_str("json"),
            LogFormat::Compact => fmt.write_str("compact"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLocation {
    StdOut,
    StdErr,
    File { path: PathBuf },
}

impl Display for OutputLocation {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputLocation::StdOut => fmt.write_str("stdout"),
            OutputLocation::StdErr => fmt.write_str("stderr"),
            OutputLocation::File { path } => Display::fmt(&path.to_string_lossy(), fmt),
        }
    }
}

impl FromStr for OutputLocation {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdout" => Ok(Self::StdOut),
            "stderr" => Ok(Self::StdErr),
            _ => Ok(Self::File {
                path: PathBuf::from_str(s)?,
            }),
        }
    }
}

impl Default for OutputLocation {
    fn default() -> Self {
        Self::StdErr
    }
}

impl OutputLocation {
    fn writer<P: AsRef<Path>>(&self, log_folder: P) -> (BoxMakeWriter, Option<WorkerGuard>) {
        match self {
            Self::StdOut => (BoxMakeWriter::new(io::stdout), None),
            Self::StdErr => (BoxMakeWriter::new(io::stderr), None),
            Self::File { path } => {
                let appender = tracing_appender::rolling::never(log_folder, path);
                let (file, guard) = tracing_appender::non_blocking(appender);
                (BoxMakeWriter::new(file), Some(guard))
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ArgEnum))]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

impl Display for LogLevel {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => fmt.write_str("trace"),
            Self::Debug => fmt.write_str("debug"),
            Self::Info => fmt.write_str("info"),
            Self::Warning => fmt.write_str("warning"),
            Self::Error => fmt.write_str("error"),
        }
    }
}

impl From<LogLevel> for Directive {
    fn from(level: LogLevel) -> Self {
        use tracing::Level;
        match level {
            LogLevel::Trace => Directive::from(Level::TRACE),
            LogLevel::Debug => Directive::from(Level::DEBUG),
            LogLevel::Info => Directive::from(Level::INFO),
            LogLevel::Warning => Directive::from(Level::WARN),
            LogLevel::Error => Directive::from(Level::ERROR),
        }
    }
}

enum OutputFormatter<T> {
    Full(Format<fmt::format::Full, T>),
    Pretty(Format<fmt::format::Pretty, T>),
    Json(Format<fmt::format::Json, T>),
    Compact(Format<fmt::format::Compact, T>),
}

impl<S, N, T> FormatEvent<S, N> for OutputFormatter<T>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    T: FormatTime,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        match self {
            OutputFormatter::Full(fmt) => fmt.format_event(ctx, writer, event),
            OutputFormatter::Pretty(fmt) => fmt.format_event(ctx, writer, event),
            OutputFormatter::Json(fmt) => fmt.format_event(ctx, writer, event),
            OutputFormatter::Compact(fmt) => fmt.format_event(ctx, writer, event),
        }
    }
}

/// Guard for file logging; dropping it flushes pending entries.
pub struct LogGuard {
    _output_guard: Option<WorkerGuard>,
    _json_file_guard: WorkerGuard,
}

/// Install the global subscriber: the chosen format to the chosen
/// location, plus a JSON copy of everything into the log folder and span
/// traces for error reports.
pub fn init_logger<P: AsRef<Path>>(
    log_format: LogFormat,
    output_location: &OutputLocation,
    log_folder: P,
    log_level: Option<LogLevel>,
    log_file_name: &str,
) -> Result<LogGuard, TryInitError> {
    let log_folder = log_folder.as_ref();

    let filter = if let Some(log_level) = log_level {
        EnvFilter::default().add_directive(Directive::from(log_level))
    } else {
        match std::env::var("RUST_LOG") {
            Ok(env) => EnvFilter::new(env),
            #[cfg(debug_assertions)]
            _ => EnvFilter::default().add_directive(Directive::from(LevelFilter::DEBUG)),
            #[cfg(not(debug_assertions))]
            _ => EnvFilter::default().add_directive(Directive::from(LevelFilter::WARN)),
        }
    };

    let formatter = fmt::format()
        .with_timer(fmt::time::Uptime::default())
        .with_target(true);
    let output_format = match log_format {
        LogFormat::Full => OutputFormatter::Full(formatter.clone()),
        LogFormat::Pretty => OutputFormatter::Pretty(formatter.clone().pretty()),
        LogFormat::Json => OutputFormatter::Json(formatter.clone().json()),
        LogFormat::Compact => OutputFormatter::Compact(formatter.clone().compact()),
    };

    let error_layer = tracing_error::ErrorLayer::default();

    let (output_writer, _output_guard) = output_location.writer(log_folder);
    // The fmt layers have different types per format; Option<Layer>
    // implements Layer, so exactly one of the two is Some.
    let (output_layer, json_output_layer) = match log_format {
        LogFormat::Json => (
            None,
            Some(
                fmt::layer()
                    .event_format(output_format)
                    .fmt_fields(JsonFields::new())
                    .with_writer(output_writer),
            ),
        ),
        _ => (
            Some(
                fmt::layer()
                    .event_format(output_format)
                    .with_writer(output_writer),
            ),
            None,
        ),
    };

    if !log_folder.exists() {
        fs::create_dir_all(log_folder).unwrap_or_else(|err| {
            eprintln!(
                "Could not create the log folder `{}`: {err}",
                log_folder.display()
            );
            std::process::exit(1);
        });
    }

    let json_file_appender =
        tracing_appender::rolling::never(log_folder, format!("{log_file_name}.json"));
    let (non_blocking, _json_file_guard) = tracing_appender::non_blocking(json_file_appender);
    let json_file_layer = fmt::layer()
        .event_format(formatter.json())
        .fmt_fields(JsonFields::new())
        .with_writer(non_blocking);

    tracing_subscriber::registry()
        .with(filter)
        .with(output_layer)
        .with(json_output_layer)
        .with(json_file_layer)
        .with(error_layer)
        .try_init()?;

    Ok(LogGuard {
        _output_guard,
        _json_file_guard,
    })
}
