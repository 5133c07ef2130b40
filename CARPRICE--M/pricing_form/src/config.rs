use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use shared_logging::LogLevel;
use thiserror::Error;

use crate::{
    chart::ChartDimensions,
    collector::OutOfRangePolicy,
    telemetry::{FormTelemetry, FormTelemetryBuilder},
};

/// Model artifact looked up in the working directory when nothing else is configured.
pub const DEFAULT_MODEL_PATH: &str = "final_model.json";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("reading config {}: {source}", path.display())]
    Io {
        /// Config location.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("parsing config {}: {source}", path.display())]
    Parse {
        /// Config location.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: toml::de::Error,
    },
    /// A value is out of its accepted domain.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Logging section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// JSON-lines log file; when absent logs go to stderr if enabled.
    pub path: Option<PathBuf>,
    /// Minimum level written.
    pub level: LogLevel,
    /// Write to stderr when no file is set.
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            path: None,
            level: LogLevel::Info,
            stderr: false,
        }
    }
}

impl LoggingConfig {
    /// Builds the telemetry handle; `None` when logging is disabled.
    pub fn telemetry(&self, module: &str) -> anyhow::Result<Option<FormTelemetry>> {
        if self.path.is_none() && !self.stderr {
            return Ok(None);
        }
        let mut builder: FormTelemetryBuilder = FormTelemetry::builder(module)
            .min_level(self.level)
            .stderr(self.stderr);
        if let Some(path) = &self.path {
            builder = builder.log_path(path);
        }
        builder.build().map(Some)
    }
}

/// Resolved application settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Model artifact location.
    pub model_path: PathBuf,
    /// Unit appended to prices.
    pub currency: String,
    /// Optional byline under the title.
    pub subtitle: Option<String>,
    /// Handling of out-of-range edits.
    pub out_of_range: OutOfRangePolicy,
    /// Chart size hint.
    pub chart: ChartDimensions,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            currency: default_currency(),
            subtitle: None,
            out_of_range: OutOfRangePolicy::default(),
            chart: ChartDimensions::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AppConfigSerde {
    model_path: Option<PathBuf>,
    currency: Option<String>,
    subtitle: Option<String>,
    out_of_range: Option<String>,
    #[serde(default)]
    chart: ChartSerde,
    #[serde(default)]
    logging: LoggingSerde,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ChartSerde {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct LoggingSerde {
    path: Option<PathBuf>,
    level: Option<String>,
    #[serde(default)]
    stderr: bool,
}

fn default_currency() -> String {
    "dollars".into()
}

impl AppConfig {
    /// Loads a TOML file. Relative paths inside it resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_toml_str(&raw, &source_dir).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parses TOML text, resolving relative paths against `base_dir`.
    pub fn from_toml_str(raw: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let document: AppConfigSerde = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        let defaults = Self::default();
        let resolve = |candidate: PathBuf| {
            if candidate.is_absolute() {
                candidate
            } else {
                base_dir.join(candidate)
            }
        };

        let currency = document.currency.unwrap_or(defaults.currency);
        if currency.trim().is_empty() {
            return Err(ConfigError::Invalid("currency must not be empty".into()));
        }
        let out_of_range = match document.out_of_range {
            Some(raw) => raw
                .parse::<OutOfRangePolicy>()
                .map_err(|err| ConfigError::Invalid(err.to_string()))?,
            None => defaults.out_of_range,
        };
        let chart = ChartDimensions {
            width: document.chart.width.unwrap_or(defaults.chart.width),
            height: document.chart.height.unwrap_or(defaults.chart.height),
        };
        if chart.width == 0 || chart.height == 0 {
            return Err(ConfigError::Invalid(
                "chart width and height must be positive".into(),
            ));
        }
        let level = match document.logging.level {
            Some(raw) => raw
                .parse::<LogLevel>()
                .map_err(|err| ConfigError::Invalid(err.to_string()))?,
            None => defaults.logging.level,
        };

        Ok(Self {
            model_path: document
                .model_path
                .map_or(defaults.model_path, &resolve),
            currency,
            subtitle: document.subtitle.filter(|text| !text.trim().is_empty()),
            out_of_range,
            chart,
            logging: LoggingConfig {
                path: document.logging.path.map(&resolve),
                level,
                stderr: document.logging.stderr,
            },
        })
    }
}
