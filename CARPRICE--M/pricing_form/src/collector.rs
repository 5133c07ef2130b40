use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_logging::LogLevel;
use thiserror::Error;

use crate::{feature::FeatureVector, field::CarField, telemetry::FormTelemetry};

/// Errors raised while editing form fields.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    /// No field has this key.
    #[error("unknown field {0:?}")]
    UnknownField(String),
    /// The text is not a number.
    #[error("invalid number {raw:?} for {field}")]
    InvalidNumber {
        /// Target field.
        field: CarField,
        /// Rejected text.
        raw: String,
    },
    /// NaN or infinity.
    #[error("{field} must be a finite number")]
    NonFinite {
        /// Target field.
        field: CarField,
    },
    /// Outside the field's range under the reject policy.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// Target field.
        field: CarField,
        /// Rejected value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// Unknown policy name in configuration.
    #[error("unknown out-of-range policy {0:?} (expected clamp or reject)")]
    UnknownPolicy(String),
}

/// What the collector does with a value outside a field's range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangePolicy {
    /// Store the nearest bound.
    #[default]
    Clamp,
    /// Refuse the edit and keep the previous value.
    Reject,
}

impl FromStr for OutOfRangePolicy {
    type Err = InputError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "reject" => Ok(Self::Reject),
            other => Err(InputError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Outcome of a successful edit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldUpdate {
    /// Edited field.
    pub field: CarField,
    /// Value before the edit.
    pub previous: f64,
    /// Value as stored.
    pub stored: f64,
    /// True when the requested value was moved onto a bound.
    pub clamped: bool,
}

/// Current values of the nine sidebar fields.
///
/// Plays the part of the host's numeric widgets: each field starts at its
/// default and only accepts values inside its bounds.
#[derive(Debug, Clone)]
pub struct InputCollector {
    values: FeatureVector,
    policy: OutOfRangePolicy,
    telemetry: Option<FormTelemetry>,
}

impl Default for InputCollector {
    fn default() -> Self {
        Self::new(OutOfRangePolicy::default())
    }
}

impl InputCollector {
    /// Collector with every field at its default.
    #[must_use]
    pub fn new(policy: OutOfRangePolicy) -> Self {
        Self {
            values: FeatureVector::defaults(),
            policy,
            telemetry: None,
        }
    }

    /// Attaches telemetry for clamp and reject events.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Option<FormTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Active out-of-range policy.
    #[must_use]
    pub const fn policy(&self) -> OutOfRangePolicy {
        self.policy
    }

    /// Current value of `field`.
    #[must_use]
    pub const fn value(&self, field: CarField) -> f64 {
        self.values.get(field)
    }

    /// Wheel base.
    #[must_use]
    pub const fn wheel_base(&self) -> f64 {
        self.value(CarField::WheelBase)
    }

    /// Length.
    #[must_use]
    pub const fn length(&self) -> f64 {
        self.value(CarField::Length)
    }

    /// Width.
    #[must_use]
    pub const fn width(&self) -> f64 {
        self.value(CarField::Width)
    }

    /// Curb weight.
    #[must_use]
    pub const fn curb_weight(&self) -> f64 {
        self.value(CarField::CurbWeight)
    }

    /// Engine size.
    #[must_use]
    pub const fn engine_size(&self) -> f64 {
        self.value(CarField::EngineSize)
    }

    /// Horsepower.
    #[must_use]
    pub const fn horsepower(&self) -> f64 {
        self.value(CarField::Horsepower)
    }

    /// City fuel economy.
    #[must_use]
    pub const fn city_mpg(&self) -> f64 {
        self.value(CarField::CityMpg)
    }

    /// Highway fuel economy.
    #[must_use]
    pub const fn highway_mpg(&self) -> f64 {
        self.value(CarField::HighwayMpg)
    }

    /// Peak engine speed.
    #[must_use]
    pub const fn peak_rpm(&self) -> f64 {
        self.value(CarField::PeakRpm)
    }

    /// Sets one field, applying the out-of-range policy. Other fields are untouched.
    pub fn set(&mut self, field: CarField, value: f64) -> Result<FieldUpdate, InputError> {
        if !value.is_finite() {
            return Err(InputError::NonFinite { field });
        }
        let bounds = field.bounds();
        let previous = self.values.get(field);
        let stored = if bounds.contains(value) {
            value
        } else {
            match self.policy {
                OutOfRangePolicy::Clamp => bounds.clamp(value),
                OutOfRangePolicy::Reject => {
                    self.log(
                        LogLevel::Warn,
                        "input.rejected",
                        json!({ "field": field.key(), "value": value }),
                    );
                    return Err(InputError::OutOfRange {
                        field,
                        value,
                        min: bounds.min,
                        max: bounds.max,
                    });
                }
            }
        };
        let clamped = !bounds.contains(value);
        if clamped {
            self.log(
                LogLevel::Info,
                "input.clamped",
                json!({ "field": field.key(), "requested": value, "stored": stored }),
            );
        }
        self.values.set(field, stored);
        Ok(FieldUpdate {
            field,
            previous,
            stored,
            clamped,
        })
    }

    /// Sets a field looked up by key.
    pub fn set_by_name(&mut self, name: &str, value: f64) -> Result<FieldUpdate, InputError> {
        let field: CarField = name.parse()?;
        self.set(field, value)
    }

    /// Parses `raw` as a number and sets the named field.
    pub fn parse_and_set(&mut self, name: &str, raw: &str) -> Result<FieldUpdate, InputError> {
        let field: CarField = name.parse()?;
        let value = raw
            .trim()
            .parse::<f64>()
            .map_err(|_| InputError::InvalidNumber {
                field,
                raw: raw.to_string(),
            })?;
        self.set(field, value)
    }

    /// Restores one field's default.
    pub fn reset_field(&mut self, field: CarField) {
        self.values.set(field, field.bounds().default);
    }

    /// Restores every default.
    pub fn reset(&mut self) {
        self.values = FeatureVector::defaults();
    }

    /// Current values as a feature vector.
    #[must_use]
    pub const fn snapshot(&self) -> FeatureVector {
        self.values
    }

    fn log(&self, level: LogLevel, message: &str, metadata: serde_json::Value) {
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.log(level, message, metadata);
        }
    }
}
