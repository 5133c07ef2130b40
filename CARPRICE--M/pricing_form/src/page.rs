use std::sync::Arc;

use anyhow::{Context, Result};
use carprice_regression::{ModelArtifact, Regressor};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;
use shared_logging::LogLevel;

use crate::{
    chart::{BarChart, ChartDimensions},
    collector::InputCollector,
    config::AppConfig,
    feature::FeatureVector,
    field::CarField,
    predictor::Predictor,
    telemetry::FormTelemetry,
};

const TITLE: &str = "Car Price Prediction";
const DESCRIPTION: &str =
    "This application uses a machine learning model to predict the price of a car from its characteristics.";
const SIDEBAR_HEADER: &str = "Enter the car's characteristics";
const PREDICTION_HEADING: &str = "Price prediction:";
const FOOTER: &str = "Remember that this prediction relies on a machine learning model trained on historical data. \
Results are estimates and may vary depending on many factors.";

/// What triggered the render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageAction {
    /// Any interaction other than the predict button.
    #[default]
    Idle,
    /// The predict button was pressed.
    Predict,
}

/// Title block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageHeader {
    /// Page title.
    pub title: String,
    /// Optional byline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// One-line description.
    pub description: String,
}

/// One numeric input in the sidebar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputWidget {
    /// Field key.
    pub key: &'static str,
    /// Display label.
    pub label: String,
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
    /// Current value.
    pub value: f64,
}

/// Sidebar with the nine inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sidebar {
    /// Sidebar heading.
    pub header: String,
    /// Inputs in canonical order.
    pub widgets: Vec<InputWidget>,
}

/// Read-only one-row table echoing the inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    /// Column title to value, in canonical order.
    pub columns: IndexMap<String, f64>,
}

impl SummaryTable {
    fn from_features(features: &FeatureVector) -> Self {
        Self {
            columns: features
                .iter()
                .map(|(field, value)| (field.title().to_string(), value))
                .collect(),
        }
    }

    /// Value shown for `field`.
    #[must_use]
    pub fn value(&self, field: CarField) -> Option<f64> {
        self.columns.get(field.title()).copied()
    }
}

/// Result area shown after the predict button.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictionPanel {
    /// Inference succeeded.
    Success {
        /// Panel heading.
        heading: String,
        /// Raw estimate.
        price: f64,
        /// Sentence with the formatted price.
        text: String,
    },
    /// Inference failed.
    Failure {
        /// Error notice.
        message: String,
    },
}

/// Output of one render pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedPage {
    /// Title block.
    pub header: PageHeader,
    /// Inputs.
    pub sidebar: Sidebar,
    /// Input echo.
    pub summary: SummaryTable,
    /// Present only when the predict action fired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<PredictionPanel>,
    /// Input visualization.
    pub chart: BarChart,
    /// Host notices such as rejected edits.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
    /// Disclaimer.
    pub footer: String,
}

impl RenderedPage {
    /// Adds a host notice.
    #[must_use]
    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notices.push(notice.into());
        self
    }
}

/// The prediction page: holds the predictor and presentation settings.
#[derive(Debug)]
pub struct PricingPage {
    predictor: Predictor,
    currency: String,
    subtitle: Option<String>,
    chart: ChartDimensions,
}

impl PricingPage {
    /// Creates a page around an existing predictor.
    #[must_use]
    pub fn new(predictor: Predictor, currency: impl Into<String>, chart: ChartDimensions) -> Self {
        Self {
            predictor,
            currency: currency.into(),
            subtitle: None,
            chart,
        }
    }

    /// Sets the byline under the title.
    #[must_use]
    pub fn with_subtitle(mut self, subtitle: Option<String>) -> Self {
        self.subtitle = subtitle;
        self
    }

    /// Loads the model named by `config` and builds the page. Any failure here is
    /// fatal for the caller.
    pub fn from_config(config: &AppConfig, telemetry: Option<FormTelemetry>) -> Result<Self> {
        let artifact = ModelArtifact::load(&config.model_path)
            .with_context(|| format!("loading model artifact {}", config.model_path.display()))?;
        let summary = artifact.summary();
        let model: Arc<dyn Regressor> = artifact
            .into_regressor()
            .context("building model from artifact")?;
        if let Some(telemetry) = &telemetry {
            let _ = telemetry.log(
                LogLevel::Info,
                "model.loaded",
                json!({ "path": config.model_path, "model": summary }),
            );
        }
        let predictor =
            Predictor::new(model, telemetry).context("binding model features to form fields")?;
        Ok(Self::new(predictor, config.currency.clone(), config.chart)
            .with_subtitle(config.subtitle.clone()))
    }

    /// Predictor used on the predict action.
    #[must_use]
    pub const fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    /// Currency label appended to prices.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Runs one top-to-bottom render pass over the collector state.
    #[must_use]
    pub fn render(&self, collector: &InputCollector, action: PageAction) -> RenderedPage {
        let features = collector.snapshot();
        let prediction = match action {
            PageAction::Idle => None,
            PageAction::Predict => Some(self.prediction_panel(&features)),
        };
        RenderedPage {
            header: PageHeader {
                title: TITLE.into(),
                subtitle: self.subtitle.clone(),
                description: DESCRIPTION.into(),
            },
            sidebar: Sidebar {
                header: SIDEBAR_HEADER.into(),
                widgets: features
                    .iter()
                    .map(|(field, value)| {
                        let bounds = field.bounds();
                        InputWidget {
                            key: field.key(),
                            label: field.label(),
                            min: bounds.min,
                            max: bounds.max,
                            value,
                        }
                    })
                    .collect(),
            },
            summary: SummaryTable::from_features(&features),
            prediction,
            chart: BarChart::from_features(&features, self.chart),
            notices: Vec::new(),
            footer: FOOTER.into(),
        }
    }

    fn prediction_panel(&self, features: &FeatureVector) -> PredictionPanel {
        match self.predictor.predict(features) {
            Ok(price) => PredictionPanel::Success {
                heading: PREDICTION_HEADING.into(),
                price: price.value(),
                text: format!(
                    "The estimated price of the car is: {}",
                    price.format(&self.currency)
                ),
            },
            Err(err) => PredictionPanel::Failure {
                message: format!("Prediction error: {err}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::tests::fakes::{Broken, Recorder};
    use carprice_regression::LinearRegressionModel;
    use std::fs;
    use tempfile::tempdir;

    fn names() -> Vec<String> {
        CarField::ALL.iter().map(|field| field.key().to_string()).collect()
    }

    fn page_with(model: Arc<dyn Regressor>) -> PricingPage {
        PricingPage::new(
            Predictor::new(model, None).unwrap(),
            "dollars",
            ChartDimensions::default(),
        )
    }

    #[test]
    fn idle_pass_has_no_prediction_panel() {
        let page = page_with(Arc::new(Recorder::new(Some(names()))));
        let rendered = page.render(&InputCollector::default(), PageAction::Idle);
        assert!(rendered.prediction.is_none());
        assert_eq!(rendered.sidebar.widgets.len(), 9);
        assert_eq!(rendered.header.title, TITLE);
        assert!(rendered.header.subtitle.is_none());
    }

    #[test]
    fn configured_subtitle_reaches_header_and_text() {
        let page = page_with(Arc::new(Recorder::new(Some(names()))))
            .with_subtitle(Some("Fleet pricing desk".into()));
        let rendered = page.render(&InputCollector::default(), PageAction::Idle);
        assert_eq!(rendered.header.subtitle.as_deref(), Some("Fleet pricing desk"));
        let text = crate::render::TextRenderer::default().render(&rendered);
        assert!(text.contains("Fleet pricing desk"));
    }

    #[test]
    fn bounds_echo_unchanged_in_summary_and_chart() {
        let page = page_with(Arc::new(Recorder::new(Some(names()))));
        let mut collector = InputCollector::default();
        for (idx, field) in CarField::ALL.into_iter().enumerate() {
            let bounds = field.bounds();
            let value = if idx % 2 == 0 { bounds.min } else { bounds.max };
            collector.set(field, value).unwrap();
        }
        let rendered = page.render(&collector, PageAction::Predict);
        assert_eq!(rendered.chart.rows.len(), 9);
        for (field, row) in CarField::ALL.into_iter().zip(&rendered.chart.rows) {
            let shown = rendered.summary.value(field).unwrap();
            assert_eq!(shown, collector.value(field));
            assert_eq!(row.value, shown);
        }
    }

    #[test]
    fn success_panel_formats_two_decimals() {
        let model = LinearRegressionModel::new(vec![0.0; 9], 12_345.678)
            .unwrap()
            .with_feature_names(names())
            .unwrap();
        let page = page_with(Arc::new(model));
        let rendered = page.render(&InputCollector::default(), PageAction::Predict);
        match rendered.prediction.unwrap() {
            PredictionPanel::Success { text, price, .. } => {
                assert_eq!(text, "The estimated price of the car is: 12345.68 dollars");
                assert!((price - 12_345.678).abs() < 1e-9);
            }
            other => panic!("unexpected panel {other:?}"),
        }
    }

    #[test]
    fn failure_panel_keeps_rest_of_page() {
        let page = page_with(Arc::new(Broken));
        let collector = InputCollector::default();
        let rendered = page.render(&collector, PageAction::Predict);
        assert_eq!(
            rendered.prediction,
            Some(PredictionPanel::Failure {
                message: "Prediction error: invalid model artifact: weights corrupted".into()
            })
        );
        assert_eq!(rendered.chart.rows.len(), 9);
        assert_eq!(rendered.summary.columns.len(), 9);
    }

    #[test]
    fn repredicting_after_edit_leaves_other_fields() {
        let page = page_with(Arc::new(Recorder::new(Some(names()))));
        let mut collector = InputCollector::default();
        let first = page.render(&collector, PageAction::Predict);
        collector.set(CarField::Horsepower, 250.0).unwrap();
        let second = page.render(&collector, PageAction::Predict);
        for field in CarField::ALL {
            if field != CarField::Horsepower {
                assert_eq!(first.summary.value(field), second.summary.value(field));
            }
        }
        assert_eq!(second.summary.value(CarField::Horsepower), Some(250.0));
    }

    #[test]
    fn from_config_loads_model_and_fails_fatally_when_missing() {
        let dir = tempdir().unwrap();
        let mut config = AppConfig::default();
        config.model_path = dir.path().join("final_model.json");
        assert!(PricingPage::from_config(&config, None).is_err());

        fs::copy(
            concat!(env!("CARGO_MANIFEST_DIR"), "/../../final_model.json"),
            &config.model_path,
        )
        .unwrap();
        let telemetry = FormTelemetry::in_memory("pricing_form");
        let page = PricingPage::from_config(&config, Some(telemetry.clone())).unwrap();
        assert_eq!(page.predictor().model_name(), "car_price_linear");
        assert_eq!(telemetry.captured()[0].message, "model.loaded");
        let rendered = page.render(&InputCollector::default(), PageAction::Predict);
        assert!(matches!(
            rendered.prediction,
            Some(PredictionPanel::Success { price, .. }) if price == 14_000.0
        ));
    }
}
