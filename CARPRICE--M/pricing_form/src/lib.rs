#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Car price prediction form.
//!
//! One render pass reads the nine sidebar fields from an [`InputCollector`],
//! optionally runs the [`Predictor`] when the predict action fired, and
//! produces a declarative [`RenderedPage`] for a host to draw.

/// Field catalogue: keys, labels and bounds.
pub mod field;
/// Ordered nine-value feature vector.
pub mod feature;
/// Sidebar input state.
pub mod collector;
/// Schema-checked inference on the injected model.
pub mod predictor;
/// Bar chart dataset and exports.
pub mod chart;
/// Page render pass.
pub mod page;
/// Text and JSON hosts.
pub mod render;
/// TOML configuration.
pub mod config;
/// Structured logging handle.
pub mod telemetry;
/// Interactive JSON-lines session.
pub mod console;

pub use chart::{BarChart, ChartDimensions, ChartRow};
pub use collector::{FieldUpdate, InputCollector, InputError, OutOfRangePolicy};
pub use config::{AppConfig, ConfigError, LoggingConfig};
pub use console::{ConsoleCommand, ConsoleSession, SessionStep};
pub use feature::FeatureVector;
pub use field::{CarField, FieldBounds, FIELD_COUNT};
pub use page::{PageAction, PredictionPanel, PricingPage, RenderedPage, SummaryTable};
pub use predictor::{FeatureBinding, PredictedPrice, PredictionFailure, Predictor, SchemaError};
pub use render::{OutputFormat, TextRenderer};
pub use telemetry::{FormTelemetry, FormTelemetryBuilder};
