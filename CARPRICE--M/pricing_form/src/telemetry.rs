use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_logging::{JsonLogger, LogLevel, LogRecord};

/// Builder for form telemetry sinks.
pub struct FormTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    stderr: bool,
    min_level: LogLevel,
}

impl FormTelemetryBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            stderr: false,
            min_level: LogLevel::Info,
        }
    }

    /// Appends JSON lines to a file.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Writes JSON lines to stderr when no file is configured.
    #[must_use]
    pub const fn stderr(mut self, enabled: bool) -> Self {
        self.stderr = enabled;
        self
    }

    /// Minimum level written.
    #[must_use]
    pub const fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Builds the telemetry handle.
    pub fn build(self) -> Result<FormTelemetry> {
        let logger = match (self.log_path, self.stderr) {
            (Some(path), _) => Some(JsonLogger::new(path)?),
            (None, true) => Some(JsonLogger::stderr()),
            (None, false) => None,
        };
        Ok(FormTelemetry::from_parts(
            self.module,
            logger.map(|logger| logger.with_min_level(self.min_level)),
        ))
    }
}

/// Telemetry handle shared by the collector, predictor and console.
#[derive(Clone)]
pub struct FormTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for FormTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormTelemetry")
            .field("module", &self.inner.module)
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    logger: Option<JsonLogger>,
}

impl FormTelemetry {
    fn from_parts(module: String, logger: Option<JsonLogger>) -> Self {
        Self {
            inner: Arc::new(TelemetryInner { module, logger }),
        }
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> FormTelemetryBuilder {
        FormTelemetryBuilder::new(module)
    }

    /// Handle retaining every record in memory.
    #[must_use]
    pub fn in_memory(module: impl Into<String>) -> Self {
        Self::from_parts(module.into(), Some(JsonLogger::in_memory()))
    }

    /// Logs structured metadata.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            let record = LogRecord::new(&self.inner.module, level, message).with_metadata(metadata);
            logger.log(&record)?;
        }
        Ok(())
    }

    /// Records held by an in-memory handle.
    #[must_use]
    pub fn captured(&self) -> Vec<LogRecord> {
        self.inner
            .logger
            .as_ref()
            .map(JsonLogger::captured)
            .unwrap_or_default()
    }
}
