use ndarray::{Array1, Array2};

use crate::{
    error::ModelError,
    linear::LinearRegressionModel,
    regressor::{check_inputs, check_outputs, Regressor},
};

/// One weighted participant of an ensemble.
#[derive(Debug, Clone)]
pub struct EnsembleMember {
    /// Relative weight; weights are normalized by their sum.
    pub weight: f64,
    /// Member model.
    pub model: LinearRegressionModel,
}

/// Weighted average of linear members sharing one input width.
#[derive(Debug, Clone)]
pub struct WeightedEnsemble {
    name: String,
    members: Vec<EnsembleMember>,
    total_weight: f64,
    width: usize,
    feature_names: Option<Vec<String>>,
}

impl WeightedEnsemble {
    /// Builds an ensemble, checking weights and member widths.
    pub fn new(members: Vec<EnsembleMember>) -> Result<Self, ModelError> {
        let Some(first) = members.first() else {
            return Err(ModelError::InvalidArtifact("ensemble has no members".into()));
        };
        let width = first.model.width();
        if let Some(member) = members.iter().find(|member| member.model.width() != width) {
            return Err(ModelError::InvalidArtifact(format!(
                "ensemble members disagree on width: {width} vs {}",
                member.model.width()
            )));
        }
        if members
            .iter()
            .any(|member| !member.weight.is_finite() || member.weight < 0.0)
        {
            return Err(ModelError::InvalidArtifact(
                "ensemble weights must be finite and non-negative".into(),
            ));
        }
        let total_weight: f64 = members.iter().map(|member| member.weight).sum();
        if total_weight <= 0.0 {
            return Err(ModelError::InvalidArtifact(
                "ensemble weights sum to zero".into(),
            ));
        }
        Ok(Self {
            name: "weighted_ensemble".into(),
            members,
            total_weight,
            width,
            feature_names: None,
        })
    }

    /// Renames the ensemble.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Declares the shared column order.
    pub fn with_feature_names(mut self, names: Vec<String>) -> Result<Self, ModelError> {
        if names.len() != self.width {
            return Err(ModelError::InvalidArtifact(format!(
                "{} feature names declared for ensemble of width {}",
                names.len(),
                self.width
            )));
        }
        self.feature_names = Some(names);
        Ok(self)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false: construction rejects empty ensembles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Regressor for WeightedEnsemble {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.width)
    }

    fn predict(&self, inputs: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        check_inputs(inputs, self.width)?;
        let mut blended = Array1::<f64>::zeros(inputs.nrows());
        for member in &self.members {
            let share = member.weight / self.total_weight;
            blended.scaled_add(share, &member.model.predict_unchecked(inputs));
        }
        check_outputs(blended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn member(coefficient: f64, intercept: f64, weight: f64) -> EnsembleMember {
        EnsembleMember {
            weight,
            model: LinearRegressionModel::new(vec![coefficient], intercept).unwrap(),
        }
    }

    #[test]
    fn blends_by_normalized_weight() {
        let ensemble =
            WeightedEnsemble::new(vec![member(1.0, 0.0, 3.0), member(0.0, 100.0, 1.0)]).unwrap();
        let out = ensemble.predict(&array![[20.0]]).unwrap();
        assert!((out[0] - 40.0).abs() < 1e-9);
        assert_eq!(ensemble.len(), 2);
    }

    #[test]
    fn rejects_bad_membership() {
        assert!(WeightedEnsemble::new(Vec::new()).is_err());
        assert!(WeightedEnsemble::new(vec![member(1.0, 0.0, 0.0)]).is_err());
        assert!(WeightedEnsemble::new(vec![member(1.0, 0.0, -1.0), member(1.0, 0.0, 2.0)]).is_err());
        let wide = EnsembleMember {
            weight: 1.0,
            model: LinearRegressionModel::new(vec![1.0, 1.0], 0.0).unwrap(),
        };
        assert!(WeightedEnsemble::new(vec![member(1.0, 0.0, 1.0), wide]).is_err());
    }
}
