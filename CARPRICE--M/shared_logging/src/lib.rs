#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Structured JSON-lines logging shared by the form crates.

use std::{
    fmt,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Log severity level, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational events.
    Info,
    /// Warning indicator.
    Warn,
    /// Error indicator.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => bail!("unknown log level {other:?}"),
        }
    }
}

/// Structured log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Timestamp in ISO8601.
    pub timestamp: DateTime<Utc>,
    /// Module emitting the log.
    pub module: String,
    /// Severity.
    pub level: LogLevel,
    /// Event name or human-readable message.
    pub message: String,
    /// Structured fields attached to the event.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(module: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            module: module.into(),
            level,
            message: message.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Attaches the fields of a JSON object. Non-object values are stored under `data`.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        match metadata {
            serde_json::Value::Object(map) => self.metadata.extend(map),
            serde_json::Value::Null => {}
            other => {
                self.metadata.insert("data".into(), other);
            }
        }
        self
    }
}

enum Sink {
    File(File),
    Stderr,
    Memory(Vec<LogRecord>),
}

/// Thread-safe JSON logger with append-only semantics and a minimum level.
pub struct JsonLogger {
    path: Option<PathBuf>,
    min_level: LogLevel,
    sink: Mutex<Sink>,
}

impl fmt::Debug for JsonLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonLogger")
            .field("path", &self.path)
            .field("min_level", &self.min_level)
            .finish_non_exhaustive()
    }
}

impl JsonLogger {
    /// Creates or opens a file logger at the desired path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path: Some(path),
            min_level: LogLevel::Debug,
            sink: Mutex::new(Sink::File(file)),
        })
    }

    /// Logger writing one JSON line per record to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            path: None,
            min_level: LogLevel::Debug,
            sink: Mutex::new(Sink::Stderr),
        }
    }

    /// Logger retaining records in memory, see [`JsonLogger::captured`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            min_level: LogLevel::Debug,
            sink: Mutex::new(Sink::Memory(Vec::new())),
        }
    }

    /// Drops records below `level`.
    #[must_use]
    pub const fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Minimum level that is written.
    #[must_use]
    pub const fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Writes a log record as a JSON line, unless it is below the minimum level.
    pub fn log(&self, record: &LogRecord) -> Result<()> {
        if record.level < self.min_level {
            return Ok(());
        }
        let mut sink = self.sink.lock();
        match &mut *sink {
            Sink::File(file) => {
                serde_json::to_writer(&mut *file, record)?;
                file.write_all(b"\n")?;
                file.flush()?;
            }
            Sink::Stderr => {
                let line = serde_json::to_string(record)?;
                let mut stderr = std::io::stderr().lock();
                writeln!(stderr, "{line}")?;
            }
            Sink::Memory(records) => records.push(record.clone()),
        }
        Ok(())
    }

    /// Records retained by an in-memory logger; empty for other sinks.
    #[must_use]
    pub fn captured(&self) -> Vec<LogRecord> {
        match &*self.sink.lock() {
            Sink::Memory(records) => records.clone(),
            Sink::File(_) | Sink::Stderr => Vec::new(),
        }
    }

    /// Returns the file path for file loggers.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn writes_json_lines() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::new(dir.path().join("logs/form.log")).unwrap();
        logger
            .log(&LogRecord::new("form", LogLevel::Info, "hello"))
            .unwrap();
        let content = fs::read_to_string(logger.path().unwrap()).unwrap();
        assert!(content.contains("\"message\":\"hello\""));
        assert!(content.contains("\"level\":\"INFO\""));
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn drops_records_below_min_level() {
        let logger = JsonLogger::in_memory().with_min_level(LogLevel::Warn);
        logger
            .log(&LogRecord::new("form", LogLevel::Info, "quiet"))
            .unwrap();
        logger
            .log(&LogRecord::new("form", LogLevel::Error, "loud"))
            .unwrap();
        let captured = logger.captured();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].message, "loud");
    }

    #[test]
    fn metadata_merges_objects_and_wraps_scalars() {
        let record = LogRecord::new("form", LogLevel::Debug, "event")
            .with_metadata(json!({ "field": "width" }))
            .with_metadata(json!(3));
        assert_eq!(record.metadata["field"], json!("width"));
        assert_eq!(record.metadata["data"], json!(3));
    }

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(" info ".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert!("verbose".parse::<LogLevel>().is_err());
        assert!(LogLevel::Debug < LogLevel::Error);
    }
}
