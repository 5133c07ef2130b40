use std::{collections::HashSet, fs, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    ensemble::{EnsembleMember, WeightedEnsemble},
    error::ModelError,
    linear::{LinearRegressionModel, StandardScaler},
    regressor::Regressor,
};

/// Artifact format version understood by this crate.
pub const FORMAT_VERSION: u32 = 1;

fn default_target() -> String {
    "price".into()
}

/// Serialized, externally trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelArtifact {
    /// Must equal [`FORMAT_VERSION`].
    pub format_version: u32,
    /// Model name shown in logs and `inspect-model`.
    pub name: String,
    /// Name of the predicted quantity.
    #[serde(default = "default_target")]
    pub target: String,
    /// Column order the model was fitted on. Absent for positional artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    /// Fitted parameters.
    pub model: ModelSpec,
}

/// Fitted parameters, tagged by model kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    /// Single linear regression.
    Linear(LinearSpec),
    /// Weighted blend of linear regressions.
    Ensemble {
        /// Members with their weights.
        members: Vec<MemberSpec>,
    },
}

/// Parameters of a linear regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinearSpec {
    /// One coefficient per feature.
    pub coefficients: Vec<f64>,
    /// Intercept term.
    pub intercept: f64,
    /// Optional standardization fitted with the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<StandardScaler>,
}

/// Ensemble member parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberSpec {
    /// Relative weight.
    pub weight: f64,
    /// Member regression.
    #[serde(flatten)]
    pub linear: LinearSpec,
}

/// Metadata printed by tooling.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    /// Model name.
    pub name: String,
    /// Predicted quantity.
    pub target: String,
    /// `linear` or `ensemble`.
    pub kind: &'static str,
    /// Input width.
    pub n_features: usize,
    /// Declared column order, if any.
    pub features: Option<Vec<String>>,
}

impl LinearSpec {
    fn build(&self) -> Result<LinearRegressionModel, ModelError> {
        let model = LinearRegressionModel::new(self.coefficients.clone(), self.intercept)?;
        match &self.scaler {
            Some(scaler) => model.with_scaler(scaler.clone()),
            None => Ok(model),
        }
    }
}

impl ModelArtifact {
    /// Reads and validates an artifact from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Parses and validates an artifact from JSON text.
    pub fn from_json_str(raw: &str) -> Result<Self, ModelError> {
        let artifact: Self = serde_json::from_str(raw)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Input width implied by the fitted parameters.
    #[must_use]
    pub fn n_features(&self) -> usize {
        match &self.model {
            ModelSpec::Linear(linear) => linear.coefficients.len(),
            ModelSpec::Ensemble { members } => members
                .first()
                .map_or(0, |member| member.linear.coefficients.len()),
        }
    }

    /// Checks version, declared names and parameter shapes.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.check_header()?;
        self.build().map(drop)
    }

    /// Builds the in-memory model.
    pub fn into_regressor(self) -> Result<Arc<dyn Regressor>, ModelError> {
        self.check_header()?;
        self.build()
    }

    fn check_header(&self) -> Result<(), ModelError> {
        if self.format_version != FORMAT_VERSION {
            return Err(ModelError::InvalidArtifact(format!(
                "unsupported format_version {} (expected {FORMAT_VERSION})",
                self.format_version
            )));
        }
        if let Some(features) = &self.features {
            let mut seen = HashSet::new();
            if let Some(duplicate) = features.iter().find(|name| !seen.insert(name.as_str())) {
                return Err(ModelError::InvalidArtifact(format!(
                    "feature {duplicate:?} declared twice"
                )));
            }
        }
        Ok(())
    }

    /// Tooling summary.
    #[must_use]
    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            name: self.name.clone(),
            target: self.target.clone(),
            kind: match self.model {
                ModelSpec::Linear(_) => "linear",
                ModelSpec::Ensemble { .. } => "ensemble",
            },
            n_features: self.n_features(),
            features: self.features.clone(),
        }
    }

    fn build(&self) -> Result<Arc<dyn Regressor>, ModelError> {
        match &self.model {
            ModelSpec::Linear(spec) => {
                let mut model = spec.build()?.with_name(&self.name);
                if let Some(features) = &self.features {
                    model = model.with_feature_names(features.clone())?;
                }
                Ok(Arc::new(model))
            }
            ModelSpec::Ensemble { members } => {
                let members = members
                    .iter()
                    .map(|member| {
                        Ok(EnsembleMember {
                            weight: member.weight,
                            model: member.linear.build()?,
                        })
                    })
                    .collect::<Result<Vec<_>, ModelError>>()?;
                let mut ensemble = WeightedEnsemble::new(members)?.with_name(&self.name);
                if let Some(features) = &self.features {
                    ensemble = ensemble.with_feature_names(features.clone())?;
                }
                Ok(Arc::new(ensemble))
            }
        }
    }
}
