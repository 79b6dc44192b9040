//! # Logging
//!
//! `tracing` bootstrap for hosts embedding the compression core.
//!
//! - Pretty, JSON and compact output on stderr, so a CLI can keep stdout
//!   for its own output
//! - A default filter that follows the configured level for the workspace
//!   crates and keeps the decoder stack at `warn`
//! - Optional forwarding of every event to a host [`LoggerSink`]
//! - Configuration from the environment (`AUDIO_COMPRESS_LOG`,
//!   `AUDIO_COMPRESS_LOG_FORMAT`)
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LoggingConfig};
//!
//! init_logging(LoggingConfig::from_env()?)?;
//! tracing::info!("Compressor ready");
//! ```
//!
//! ## Privacy
//!
//! Recordings are named by the user's file system. Log file names through
//! [`strip_path`]; the sink layer also strips any path-like field
//! (`file`, `path`, `input`, `output`) before an entry leaves the process.

use crate::error::{Error, Result};

use bridge_traits::log_sink::{LogEntry, LogLevel, LoggerSink};

use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::format::FmtSpan,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

/// Filter directives, or a bare level, e.g. `debug` or `core_compress=trace`.
pub const LOG_FILTER_ENV: &str = "AUDIO_COMPRESS_LOG";
/// One of `pretty`, `json`, `compact`.
pub const LOG_FORMAT_ENV: &str = "AUDIO_COMPRESS_LOG_FORMAT";

const WORKSPACE_CRATES: &[&str] = &[
    "core_runtime",
    "core_compress",
    "core_service",
    "bridge_desktop",
];

/// Field names whose values may hold a full path.
const PATH_FIELDS: &[&str] = &["file", "path", "input", "output"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(Error::InvalidEnv {
                variable: LOG_FORMAT_ENV,
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level for the workspace crates when no custom filter is set.
    pub level: LogLevel,
    /// Full `EnvFilter` directive string; overrides `level`.
    pub filter: Option<String>,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Emit span open/close events (pretty and compact only).
    pub enable_spans: bool,
    pub display_target: bool,
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            enable_spans: false,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field("logger_sink", &self.logger_sink.is_some())
            .field("enable_spans", &self.enable_spans)
            .finish_non_exhaustive()
    }
}

impl LoggingConfig {
    /// Defaults overridden by [`LOG_FILTER_ENV`] and [`LOG_FORMAT_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEnv`] if the format variable holds an unknown
    /// value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            config.format = format.parse()?;
        }

        if let Some(filter) = lookup(LOG_FILTER_ENV).filter(|f| !f.trim().is_empty()) {
            // A bare level keeps the default per-crate directives
            match filter.parse::<LogLevel>() {
                Ok(level) => config.level = level,
                Err(_) => config.filter = Some(filter),
            }
        }

        Ok(config)
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }

    fn span_events(&self) -> FmtSpan {
        if self.enable_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns [`Error::Logging`] if the filter does not parse or a global
/// subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(HostSinkLayer::new(config.logger_sink.clone()));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_writer(io::stderr);

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(fmt_layer.pretty().with_span_events(config.span_events()))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt_layer.compact().with_span_events(config.span_events()))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt_layer
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
    };

    installed.map_err(|e| Error::Logging(format!("Failed to initialize logging: {}", e)))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        None => default_directives(config.level),
    };

    EnvFilter::try_new(directives).map_err(|e| Error::Logging(format!("Invalid log filter: {}", e)))
}

fn default_directives(level: LogLevel) -> String {
    WORKSPACE_CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, level))
        .chain(std::iter::once("symphonia=warn".to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Forwards events to the host's [`LoggerSink`].
///
/// Inside a tokio runtime delivery is spawned; elsewhere it blocks the
/// emitting thread until the sink returns.
struct HostSinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
}

impl HostSinkLayer {
    fn new(sink: Option<Arc<dyn LoggerSink>>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for HostSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        let metadata = event.metadata();
        let level = log_level(metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let mut entry = LogEntry::new(
            level,
            metadata.target(),
            fields.message.take().unwrap_or_default(),
        );
        entry.fields = fields.values;
        entry.span = ctx.lookup_current().map(|span| span.name().to_string());

        let sink = Arc::clone(sink);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = sink.log(entry).await {
                        eprintln!("log sink rejected entry: {}", err);
                    }
                });
            }
            Err(_) => {
                if let Err(err) = futures::executor::block_on(sink.log(entry)) {
                    eprintln!("log sink rejected entry: {}", err);
                }
            }
        }
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    values: std::collections::BTreeMap<String, String>,
}

impl FieldCollector {
    fn insert(&mut self, field: &Field, value: String) {
        let name = field.name();
        if name == "message" {
            self.message = Some(value);
        } else if PATH_FIELDS.contains(&name) {
            self.values.insert(name.to_string(), strip_path(&value).to_string());
        } else {
            self.values.insert(name.to_string(), value);
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{:?}", value));
    }
}

fn log_level(level: &tracing::Level) -> LogLevel {
    match *level {
        tracing::Level::TRACE => LogLevel::Trace,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

/// Final component of a `/` or `\` separated path.
///
/// ```
/// use core_runtime::logging::strip_path;
///
/// assert_eq!(strip_path("/Users/alex/Recordings/part2.webm"), "part2.webm");
/// ```
pub fn strip_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for RecordingSink {
        async fn log(&self, entry: LogEntry) -> bridge_traits::Result<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Debug
        }
    }

    fn with_recording_sink(emit: impl FnOnce()) -> Vec<LogEntry> {
        let sink = Arc::new(RecordingSink::default());
        let layer = HostSinkLayer::new(Some(sink.clone() as Arc<dyn LoggerSink>));
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, emit);
        let entries = sink.entries.lock().unwrap().clone();
        entries
    }

    #[test]
    fn test_from_env_bare_level() {
        let env: HashMap<&str, &str> = [(LOG_FILTER_ENV, "debug"), (LOG_FORMAT_ENV, "compact")]
            .into_iter()
            .collect();
        let config =
            LoggingConfig::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Compact);
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_from_env_directives_and_bad_format() {
        let config = LoggingConfig::from_lookup(|key| {
            (key == LOG_FILTER_ENV).then(|| "core_compress=trace".to_string())
        })
        .unwrap();
        assert_eq!(config.filter.as_deref(), Some("core_compress=trace"));

        let err = LoggingConfig::from_lookup(|key| {
            (key == LOG_FORMAT_ENV).then(|| "xml".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidEnv { variable: LOG_FORMAT_ENV, .. }));
    }

    #[test]
    fn test_default_directives() {
        let filter = build_filter(&LoggingConfig::default().with_level(LogLevel::Debug)).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("core_compress=debug"));
        assert!(rendered.contains("core_service=debug"));
        assert!(rendered.contains("symphonia=warn"));
    }

    #[test]
    fn test_bad_filter_rejected() {
        let config = LoggingConfig::default().with_filter("core_compress=[=");
        assert!(matches!(build_filter(&config), Err(Error::Logging(_))));
    }

    #[test]
    fn test_sink_receives_fields_and_span() {
        let entries = with_recording_sink(|| {
            let span = tracing::info_span!("compress_with_cancel");
            let _entered = span.enter();
            tracing::info!(target: "core_compress", blocks = 12u64, "Encoded recording");
        });

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.target, "core_compress");
        assert_eq!(entry.message, "Encoded recording");
        assert_eq!(entry.field("blocks"), Some("12"));
        assert_eq!(entry.span.as_deref(), Some("compress_with_cancel"));
    }

    #[test]
    fn test_sink_strips_path_fields() {
        let entries = with_recording_sink(|| {
            tracing::warn!(file = "/home/alex/exam/part3.webm", stage = "decode", "failed");
        });

        assert_eq!(entries[0].field("file"), Some("part3.webm"));
        assert_eq!(entries[0].field("stage"), Some("decode"));
    }

    #[test]
    fn test_sink_min_level() {
        let entries = with_recording_sink(|| {
            tracing::trace!("below threshold");
            tracing::warn!("above threshold");
        });

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Warn);
    }

    #[test]
    fn test_strip_path() {
        assert_eq!(strip_path("C:\\Users\\Alex\\answer.m4a"), "answer.m4a");
        assert_eq!(strip_path("answer.wav"), "answer.wav");
        assert_eq!(strip_path("/var/log/"), "");
    }
}
