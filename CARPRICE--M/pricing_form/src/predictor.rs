use std::{fmt, sync::Arc};

use carprice_regression::{ModelError, Regressor};
use ndarray::Array2;
use serde::Serialize;
use serde_json::json;
use shared_logging::LogLevel;
use thiserror::Error;

use crate::{feature::FeatureVector, field::CarField, telemetry::FormTelemetry};

/// The model's declared features do not line up with the form fields.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The model names a feature the form does not collect.
    #[error("model feature {0:?} is not a form field")]
    UnknownFeature(String),
    /// The model names a feature twice.
    #[error("model declares feature {0:?} more than once")]
    DuplicateFeature(String),
    /// A form field is absent from the model's features.
    #[error("model does not declare form field {0:?}")]
    MissingFeature(&'static str),
}

/// Inference failed; the page shows the message and keeps rendering.
#[derive(Debug, Error)]
pub enum PredictionFailure {
    /// The model rejected the input or faulted.
    #[error(transparent)]
    Model(#[from] ModelError),
    /// The feature matrix could not be built.
    #[error("assembling feature matrix: {0}")]
    Assembly(String),
    /// The model returned an empty array.
    #[error("model returned no prediction")]
    EmptyOutput,
}

/// Estimated price in the model's currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictedPrice(f64);

impl PredictedPrice {
    /// Raw value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Two-decimal amount followed by the unit, e.g. `14000.00 dollars`.
    #[must_use]
    pub fn format(self, currency: &str) -> String {
        format!("{:.2} {currency}", self.0)
    }
}

impl fmt::Display for PredictedPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// How form fields map onto model input columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "binding", content = "order", rename_all = "snake_case")]
pub enum FeatureBinding {
    /// Columns follow the model's declared names.
    Named(Vec<CarField>),
    /// The model declares no names; columns follow the canonical field order.
    Positional,
}

impl FeatureBinding {
    /// Binds declared names to fields. Every field must appear exactly once.
    pub fn resolve(names: Option<&[String]>) -> Result<Self, SchemaError> {
        let Some(names) = names else {
            return Ok(Self::Positional);
        };
        let mut order = Vec::with_capacity(names.len());
        for name in names {
            let field = CarField::from_key(name)
                .ok_or_else(|| SchemaError::UnknownFeature(name.clone()))?;
            if order.contains(&field) {
                return Err(SchemaError::DuplicateFeature(name.clone()));
            }
            order.push(field);
        }
        if let Some(missing) = CarField::ALL.into_iter().find(|field| !order.contains(field)) {
            return Err(SchemaError::MissingFeature(missing.key()));
        }
        Ok(Self::Named(order))
    }

    /// Fields in model column order.
    #[must_use]
    pub fn order(&self) -> &[CarField] {
        match self {
            Self::Named(order) => order.as_slice(),
            Self::Positional => &CarField::ALL,
        }
    }
}

/// Runs the injected model on one feature vector.
pub struct Predictor {
    model: Arc<dyn Regressor>,
    binding: FeatureBinding,
    telemetry: Option<FormTelemetry>,
}

impl fmt::Debug for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predictor")
            .field("model", &self.model.name())
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

impl Predictor {
    /// Binds the model's declared features to the form fields.
    pub fn new(
        model: Arc<dyn Regressor>,
        telemetry: Option<FormTelemetry>,
    ) -> Result<Self, SchemaError> {
        let binding = FeatureBinding::resolve(model.feature_names())?;
        let predictor = Self {
            model,
            binding,
            telemetry,
        };
        if predictor.binding == FeatureBinding::Positional {
            predictor.log(
                LogLevel::Warn,
                "schema.positional_binding",
                json!({ "model": predictor.model.name(), "n_features": predictor.model.n_features() }),
            );
        }
        Ok(predictor)
    }

    /// Active field binding.
    #[must_use]
    pub const fn binding(&self) -> &FeatureBinding {
        &self.binding
    }

    /// Name of the injected model.
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Builds the single-row input matrix in model column order.
    pub fn assemble(&self, features: &FeatureVector) -> Result<Array2<f64>, PredictionFailure> {
        let order = self.binding.order();
        let row: Vec<f64> = order.iter().map(|field| features.get(*field)).collect();
        Array2::from_shape_vec((1, order.len()), row)
            .map_err(|err| PredictionFailure::Assembly(err.to_string()))
    }

    /// Predicts a price. Failures are returned, never raised.
    pub fn predict(&self, features: &FeatureVector) -> Result<PredictedPrice, PredictionFailure> {
        let outcome = self
            .assemble(features)
            .and_then(|inputs| self.model.predict(&inputs).map_err(PredictionFailure::from))
            .and_then(|outputs| {
                outputs
                    .get(0)
                    .copied()
                    .map(PredictedPrice)
                    .ok_or(PredictionFailure::EmptyOutput)
            });
        match &outcome {
            Ok(price) => self.log(
                LogLevel::Info,
                "prediction.completed",
                json!({ "model": self.model.name(), "price": price.value(), "features": features }),
            ),
            Err(err) => self.log(
                LogLevel::Error,
                "prediction.failed",
                json!({ "model": self.model.name(), "error": err.to_string(), "features": features }),
            ),
        }
        outcome
    }

    fn log(&self, level: LogLevel, message: &str, metadata: serde_json::Value) {
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.log(level, message, metadata);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use carprice_regression::LinearRegressionModel;
    use ndarray::Array1;
    use fakes::Recorder;

    /// Test doubles for the model boundary.
    pub(crate) mod fakes {
        use super::*;
        use std::sync::Mutex;

        /// Returns the first input column and remembers every matrix it saw.
        pub(crate) struct Recorder {
            pub(crate) names: Option<Vec<String>>,
            pub(crate) seen: Mutex<Vec<Vec<f64>>>,
        }

        impl Recorder {
            pub(crate) fn new(names: Option<Vec<String>>) -> Self {
                Self {
                    names,
                    seen: Mutex::new(Vec::new()),
                }
            }
        }

        impl Regressor for Recorder {
            fn name(&self) -> &str {
                "recorder"
            }

            fn feature_names(&self) -> Option<&[String]> {
                self.names.as_deref()
            }

            fn n_features(&self) -> Option<usize> {
                Some(9)
            }

            fn predict(&self, inputs: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
                self.seen
                    .lock()
                    .unwrap()
                    .push(inputs.row(0).to_vec());
                Ok(inputs.column(0).to_owned())
            }
        }

        /// Always faults.
        pub(crate) struct Broken;

        impl Regressor for Broken {
            fn name(&self) -> &str {
                "broken"
            }

            fn n_features(&self) -> Option<usize> {
                None
            }

            fn predict(&self, _inputs: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
                Err(ModelError::InvalidArtifact("weights corrupted".into()))
            }
        }
    }

    fn canonical_names() -> Vec<String> {
        CarField::ALL.iter().map(|field| field.key().to_string()).collect()
    }

    #[test]
    fn named_binding_follows_model_order() {
        let mut names = canonical_names();
        names.reverse();
        let model = Arc::new(Recorder::new(Some(names)));
        let predictor = Predictor::new(model.clone(), None).unwrap();
        let features = FeatureVector::defaults();
        let price = predictor.predict(&features).unwrap();
        assert_eq!(price.value(), 5000.0);
        let seen = model.seen.lock().unwrap();
        assert_eq!(
            seen[0],
            vec![5000.0, 30.0, 20.0, 110.0, 120.0, 2000.0, 65.0, 150.0, 90.0]
        );
    }

    #[test]
    fn canonical_order_survives_edit_order() {
        let model = Arc::new(Recorder::new(Some(canonical_names())));
        let predictor = Predictor::new(model.clone(), None).unwrap();
        let mut collector = crate::collector::InputCollector::default();
        for field in CarField::ALL.iter().rev() {
            collector.set(*field, field.bounds().max).unwrap();
        }
        predictor.predict(&collector.snapshot()).unwrap();
        let expected: Vec<f64> = CarField::ALL.iter().map(|field| field.bounds().max).collect();
        assert_eq!(model.seen.lock().unwrap()[0], expected);
    }

    #[test]
    fn rejects_unknown_missing_and_duplicate_names() {
        let mut unknown = canonical_names();
        unknown[3] = "weight".into();
        assert_eq!(
            FeatureBinding::resolve(Some(unknown.as_slice())),
            Err(SchemaError::UnknownFeature("weight".into()))
        );
        let missing = canonical_names()[..8].to_vec();
        assert_eq!(
            FeatureBinding::resolve(Some(missing.as_slice())),
            Err(SchemaError::MissingFeature("peak_rpm"))
        );
        let mut duplicate = canonical_names();
        duplicate.push("width".into());
        assert_eq!(
            FeatureBinding::resolve(Some(duplicate.as_slice())),
            Err(SchemaError::DuplicateFeature("width".into()))
        );
        let model = Arc::new(Recorder::new(Some(missing)));
        assert!(Predictor::new(model, None).is_err());
    }

    #[test]
    fn positional_model_of_wrong_width_fails_visibly() {
        let telemetry = FormTelemetry::in_memory("pricing_form");
        let model = Arc::new(LinearRegressionModel::new(vec![1.0; 8], 0.0).unwrap());
        let predictor = Predictor::new(model, Some(telemetry.clone())).unwrap();
        assert_eq!(predictor.binding(), &FeatureBinding::Positional);
        let err = predictor.predict(&FeatureVector::defaults()).unwrap_err();
        assert_eq!(err.to_string(), "expected 8 features, got 9");
        let messages: Vec<_> = telemetry
            .captured()
            .into_iter()
            .map(|record| record.message)
            .collect();
        assert_eq!(messages, vec!["schema.positional_binding", "prediction.failed"]);
    }

    #[test]
    fn repeated_predictions_are_identical() {
        let model = Arc::new(
            LinearRegressionModel::new(
                vec![120.0, -40.0, 600.0, 4.5, 80.0, 40.0, -150.0, 90.0, 1.5],
                -60_000.0,
            )
            .unwrap()
            .with_feature_names(canonical_names())
            .unwrap(),
        );
        let predictor = Predictor::new(model, None).unwrap();
        let features = FeatureVector::defaults();
        let first = predictor.predict(&features).unwrap();
        let second = predictor.predict(&features).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.value(), 14_000.0);
        assert_eq!(first.format("dollars"), "14000.00 dollars");
    }

    #[test]
    fn model_faults_become_failures() {
        let predictor = Predictor::new(Arc::new(fakes::Broken), None).unwrap();
        let err = predictor.predict(&FeatureVector::defaults()).unwrap_err();
        assert!(matches!(err, PredictionFailure::Model(_)));
        assert!(err.to_string().contains("weights corrupted"));
    }
}
