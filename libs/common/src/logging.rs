//! Logging bootstrap for station services
//!
//! Console output uses a bracketed level format; an optional daily rolling
//! file sink is added when a log directory is configured.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Environment variable overriding the configured log directory
pub const LOG_DIR_ENV: &str = "STATION_LOG_DIR";

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Event formatter that outputs: `timestamp [LEVEL] target: message`
///
/// Example output: `2026-10-16T08:12:44.809000Z [INFO] stationsrv::station: Ping round finished`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m", // magenta
                Level::DEBUG => "\x1b[34m", // blue
                Level::INFO => "\x1b[32m",  // green
                Level::WARN => "\x1b[33m",  // yellow
                Level::ERROR => "\x1b[31m", // red
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        write!(writer, "{}: ", event.metadata().target())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

// Keeps the non-blocking file writer alive for the process lifetime
static GUARDS: OnceLock<Mutex<Vec<WorkerGuard>>> = OnceLock::new();

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Service name, used as the log file prefix
    pub service_name: String,
    /// Default filter when `RUST_LOG` is not set (e.g. "info")
    pub level: String,
    /// Directory for daily rolling log files; console only when `None`
    pub log_dir: Option<PathBuf>,
    /// Write file logs as JSON lines
    pub enable_json: bool,
    /// Colored console output
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "stationsrv".to_string(),
            level: "info".to_string(),
            log_dir: None,
            enable_json: false,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Effective log directory. `STATION_LOG_DIR` wins over the configured one.
    pub fn resolved_log_dir(&self) -> Option<PathBuf> {
        std::env::var(LOG_DIR_ENV)
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.log_dir.clone())
    }

    fn env_filter(&self) -> EnvFilter {
        // RUST_LOG takes priority over the configured level
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

/// Initialize the global subscriber.
///
/// Fails if a global subscriber is already installed or the log directory
/// cannot be created.
pub fn init_with_config(config: &LogConfig) -> anyhow::Result<()> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    layers.push(
        fmt::layer()
            .with_ansi(config.ansi)
            .event_format(BracketedLevelFormat)
            .with_filter(config.env_filter())
            .boxed(),
    );

    if let Some(dir) = config.resolved_log_dir() {
        std::fs::create_dir_all(&dir)?;
        let appender =
            tracing_appender::rolling::daily(&dir, format!("{}.log", config.service_name));
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let file_layer = if config.enable_json {
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(config.env_filter())
                .boxed()
        } else {
            fmt::layer()
                .with_ansi(false)
                .event_format(BracketedLevelFormat)
                .with_writer(writer)
                .with_filter(config.env_filter())
                .boxed()
        };
        layers.push(file_layer);

        let guards = GUARDS.get_or_init(|| Mutex::new(Vec::new()));
        match guards.lock() {
            Ok(mut guards) => guards.push(guard),
            Err(poisoned) => poisoned.into_inner().push(guard),
        }
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        service = %config.service_name,
        level = %config.level,
        "Logging initialized"
    );
    Ok(())
}
