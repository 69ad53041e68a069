//! Structured logging with navigation context.

use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

/// Severity of a navigation log entry, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Upper-case label used in human-readable output.
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One log line about a navigation.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Navigation the entry belongs to.
    pub navigation_id: String,
    /// Runtime that produced the entry ("server" or "client").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    /// Path being navigated to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Entry-specific key/value pairs, flattened into the JSON object.
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
    /// Microseconds since the navigation started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_us: Option<u64>,
}

impl LogEntry {
    /// The entry as a single JSON object.
    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(_) => self.message.clone(),
        }
    }

    /// The entry as one line: `[LEVEL] nav=ID message route=PATH (Nus) | k=v ...`.
    ///
    /// Fields are sorted by key so output is stable.
    pub fn to_human(&self) -> String {
        let mut line = format!("[{}] nav={} {}", self.level, self.navigation_id, self.message);
        if let Some(route) = &self.route {
            let _ = write!(line, " route={}", route);
        }
        if let Some(us) = self.elapsed_us {
            let _ = write!(line, " ({}us)", us);
        }

        let mut keys: Vec<&String> = self.fields.keys().collect();
        keys.sort();
        for (i, key) in keys.into_iter().enumerate() {
            line.push_str(if i == 0 { " | " } else { " " });
            let _ = write!(line, "{}={}", key, self.fields[key]);
        }
        line
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Native `tracing` event with structured fields.
    #[default]
    Tracing,
    /// A `tracing` event whose message is the JSON-encoded entry.
    Json,
    /// A `tracing` event whose message is a one-line summary.
    Human,
}

/// Shared buffer that receives a copy of every emitted entry.
///
/// Used by tests to assert on what was logged.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl LogCapture {
    /// Create an empty capture buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries captured so far.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Entries at exactly `level`.
    pub fn at_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    fn push(&self, entry: LogEntry) {
        self.entries.lock().push(entry);
    }
}

/// Structured logger with navigation context.
///
/// Every entry carries the navigation id, the runtime and the route, plus
/// the time elapsed since the logger was created.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    navigation_id: String,
    runtime: Option<String>,
    route: Option<String>,
    start_time: Instant,
    min_level: LogLevel,
    format: LogFormat,
    capture: Option<LogCapture>,
}

impl StructuredLogger {
    /// A logger for one navigation. Its clock starts now.
    pub fn new(navigation_id: impl fmt::Display) -> Self {
        Self {
            navigation_id: navigation_id.to_string(),
            runtime: None,
            route: None,
            start_time: Instant::now(),
            min_level: LogLevel::Debug,
            format: LogFormat::default(),
            capture: None,
        }
    }

    /// Tag entries with the runtime (`server` or `client`).
    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = Some(runtime.into());
        self
    }

    /// Tag entries with the navigated path.
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Drop entries below `level`.
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Choose how entries reach `tracing`.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Copy every emitted entry into `capture`.
    pub fn with_capture(mut self, capture: LogCapture) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message.to_string(), HashMap::new());
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message.to_string(), HashMap::new());
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message.to_string(), HashMap::new());
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message.to_string(), HashMap::new());
    }

    fn log(&self, level: LogLevel, message: String, fields: HashMap<String, serde_json::Value>) {
        if level < self.min_level {
            return;
        }

        let entry = LogEntry {
            level,
            message,
            navigation_id: self.navigation_id.clone(),
            runtime: self.runtime.clone(),
            route: self.route.clone(),
            fields,
            elapsed_us: Some(self.elapsed_us()),
        };

        self.emit(&entry);

        if let Some(capture) = &self.capture {
            capture.push(entry);
        }
    }

    fn emit(&self, entry: &LogEntry) {
        // `tracing` levels must be constants at the call site.
        macro_rules! dispatch {
            ($($arg:tt)+) => {
                match entry.level {
                    LogLevel::Trace => tracing::event!(tracing::Level::TRACE, $($arg)+),
                    LogLevel::Debug => tracing::event!(tracing::Level::DEBUG, $($arg)+),
                    LogLevel::Info => tracing::event!(tracing::Level::INFO, $($arg)+),
                    LogLevel::Warn => tracing::event!(tracing::Level::WARN, $($arg)+),
                    LogLevel::Error => tracing::event!(tracing::Level::ERROR, $($arg)+),
                }
            };
        }

        match self.format {
            LogFormat::Tracing => {
                let fields = serde_json::to_string(&entry.fields).unwrap_or_default();
                let route = entry.route.as_deref().unwrap_or_default();
                let runtime = entry.runtime.as_deref().unwrap_or_default();
                let elapsed_us = entry.elapsed_us.unwrap_or_default();
                dispatch!(
                    navigation_id = %entry.navigation_id,
                    runtime,
                    route,
                    elapsed_us,
                    fields = %fields,
                    "{}",
                    entry.message
                );
            }
            LogFormat::Json => {
                let line = entry.to_json();
                dispatch!("{}", line);
            }
            LogFormat::Human => {
                let line = entry.to_human();
                dispatch!("{}", line);
            }
        }
    }

    /// Id of the navigation this logger belongs to.
    pub fn navigation_id(&self) -> &str {
        &self.navigation_id
    }

    /// Microseconds since the logger was created.
    pub fn elapsed_us(&self) -> u64 {
        self.start_time.elapsed().as_micros() as u64
    }
}

/// Accumulates fields for one entry; nothing is logged until [`LogBuilder::emit`].
pub struct LogBuilder<'a> {
    logger: &'a StructuredLogger,
    level: LogLevel,
    message: String,
    fields: HashMap<String, serde_json::Value>,
}

impl<'a> LogBuilder<'a> {
    pub fn new(logger: &'a StructuredLogger, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            logger,
            level,
            message: message.into(),
            fields: HashMap::new(),
        }
    }

    fn with_value(mut self, key: &str, value: serde_json::Value) -> Self {
        self.fields.insert(key.to_owned(), value);
        self
    }

    /// Attach a text field.
    pub fn field(self, key: &str, value: impl Into<String>) -> Self {
        self.with_value(key, serde_json::Value::String(value.into()))
    }

    pub fn field_i64(self, key: &str, value: i64) -> Self {
        self.with_value(key, value.into())
    }

    pub fn field_bool(self, key: &str, value: bool) -> Self {
        self.with_value(key, value.into())
    }

    /// Attach a duration, recorded in whole milliseconds.
    pub fn duration_ms(self, key: &str, duration: std::time::Duration) -> Self {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.with_value(key, ms.into())
    }

    /// Log the entry.
    pub fn emit(self) {
        self.logger.log(self.level, self.message, self.fields);
    }
}

impl StructuredLogger {
    pub fn debug_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Debug, message)
    }

    pub fn info_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Info, message)
    }

    pub fn warn_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Warn, message)
    }

    pub fn error_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Error, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured() -> (StructuredLogger, LogCapture) {
        let capture = LogCapture::new();
        let logger = StructuredLogger::new(7)
            .with_runtime("server")
            .with_route("/products/1")
            .with_capture(capture.clone());
        (logger, capture)
    }

    // === Entry Formatting Tests ===

    #[test]
    fn test_entry_to_json_flattens_fields() {
        let (logger, capture) = captured();
        logger.info_builder("load settled").field("outcome", "props").emit();

        let json: serde_json::Value = serde_json::from_str(&capture.entries()[0].to_json()).unwrap();
        assert_eq!(json["level"], "info");
        assert_eq!(json["navigation_id"], "7");
        assert_eq!(json["route"], "/products/1");
        assert_eq!(json["outcome"], "props");
    }

    #[test]
    fn test_entry_to_human() {
        let (logger, capture) = captured();
        logger.warn_builder("slow load").field_i64("status", 504).emit();

        let line = capture.entries()[0].to_human();
        assert!(line.starts_with("[WARN] nav=7 slow load route=/products/1"));
        assert!(line.ends_with("| status=504"));
    }

    // === Level Filtering Tests ===

    #[test]
    fn test_min_level_filters_entries() {
        let (logger, capture) = captured();
        let logger = logger.with_min_level(LogLevel::Warn);

        logger.debug("hidden");
        logger.info("hidden");
        logger.error("shown");

        assert_eq!(capture.entries().len(), 1);
        assert_eq!(capture.at_level(LogLevel::Error).len(), 1);
    }

    #[test]
    fn test_all_formats_emit() {
        for format in [LogFormat::Tracing, LogFormat::Json, LogFormat::Human] {
            let (logger, capture) = captured();
            logger.with_format(format).info("hello");
            assert_eq!(capture.entries().len(), 1);
        }
    }

    #[test]
    fn test_duration_field() {
        let (logger, capture) = captured();
        logger
            .debug_builder("timed")
            .duration_ms("load_ms", std::time::Duration::from_millis(12))
            .field_bool("cached", false)
            .emit();

        let entry = &capture.entries()[0];
        assert_eq!(entry.fields["load_ms"], 12);
        assert_eq!(entry.fields["cached"], false);
    }
}
