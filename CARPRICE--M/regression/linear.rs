use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::{
    error::ModelError,
    regressor::{check_inputs, check_outputs, Regressor},
};

/// Per-feature standardization applied before the linear map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Training mean of each feature.
    pub mean: Vec<f64>,
    /// Training standard deviation of each feature.
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn transform(&self, inputs: &Array2<f64>) -> Array2<f64> {
        let mean = Array1::from(self.mean.clone());
        let scale = Array1::from(self.scale.clone());
        (inputs - &mean) / &scale
    }

    fn width(&self) -> usize {
        self.mean.len()
    }
}

/// Ordinary linear regression: `x · coefficients + intercept`.
#[derive(Debug, Clone)]
pub struct LinearRegressionModel {
    name: String,
    coefficients: Array1<f64>,
    intercept: f64,
    scaler: Option<StandardScaler>,
    feature_names: Option<Vec<String>>,
}

impl LinearRegressionModel {
    /// Creates a model from fitted coefficients.
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self, ModelError> {
        if coefficients.is_empty() {
            return Err(ModelError::InvalidArtifact(
                "linear model has no coefficients".into(),
            ));
        }
        if coefficients.iter().any(|value| !value.is_finite()) || !intercept.is_finite() {
            return Err(ModelError::InvalidArtifact(
                "linear model parameters must be finite".into(),
            ));
        }
        Ok(Self {
            name: "linear_regression".into(),
            coefficients: Array1::from(coefficients),
            intercept,
            scaler: None,
            feature_names: None,
        })
    }

    /// Renames the model.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attaches a standardization step; its width must match the coefficients.
    pub fn with_scaler(mut self, scaler: StandardScaler) -> Result<Self, ModelError> {
        if scaler.width() != self.width() || scaler.scale.len() != self.width() {
            return Err(ModelError::InvalidArtifact(format!(
                "scaler covers {} / {} features, model has {}",
                scaler.mean.len(),
                scaler.scale.len(),
                self.width()
            )));
        }
        if scaler.mean.iter().any(|value| !value.is_finite()) {
            return Err(ModelError::InvalidArtifact(
                "scaler means must be finite".into(),
            ));
        }
        if scaler
            .scale
            .iter()
            .any(|value| !value.is_finite() || *value <= 0.0)
        {
            return Err(ModelError::InvalidArtifact(
                "scaler scales must be finite and positive".into(),
            ));
        }
        self.scaler = Some(scaler);
        Ok(self)
    }

    /// Declares the column order the coefficients were fitted on.
    pub fn with_feature_names(mut self, names: Vec<String>) -> Result<Self, ModelError> {
        if names.len() != self.width() {
            return Err(ModelError::InvalidArtifact(format!(
                "{} feature names declared for {} coefficients",
                names.len(),
                self.width()
            )));
        }
        self.feature_names = Some(names);
        Ok(self)
    }

    /// Number of coefficients.
    #[must_use]
    pub fn width(&self) -> usize {
        self.coefficients.len()
    }

    /// Fitted intercept.
    #[must_use]
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }

    pub(crate) fn predict_unchecked(&self, inputs: &Array2<f64>) -> Array1<f64> {
        let scaled;
        let inputs = match &self.scaler {
            Some(scaler) => {
                scaled = scaler.transform(inputs);
                &scaled
            }
            None => inputs,
        };
        inputs.dot(&self.coefficients) + self.intercept
    }
}

impl Regressor for LinearRegressionModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.width())
    }

    fn predict(&self, inputs: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        check_inputs(inputs, self.width())?;
        check_outputs(self.predict_unchecked(inputs))
    }
}
