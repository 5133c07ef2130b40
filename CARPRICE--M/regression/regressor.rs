use ndarray::{Array1, Array2};

use crate::error::ModelError;

/// A fitted model mapping a batch of feature rows to one prediction per row.
///
/// Implementations are immutable once constructed and are shared across the
/// process behind an `Arc<dyn Regressor>`.
pub trait Regressor: Send + Sync {
    /// Short human-readable model name.
    fn name(&self) -> &str;

    /// Feature names in the column order the model expects, when the model
    /// declares them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Number of input columns, when known.
    fn n_features(&self) -> Option<usize>;

    /// Predicts one value per input row.
    fn predict(&self, inputs: &Array2<f64>) -> Result<Array1<f64>, ModelError>;
}

/// Validates batch shape and finiteness before inference.
pub(crate) fn check_inputs(inputs: &Array2<f64>, expected: usize) -> Result<(), ModelError> {
    let (rows, columns) = inputs.dim();
    if columns != expected {
        return Err(ModelError::ShapeMismatch {
            expected,
            found: columns,
        });
    }
    if rows == 0 {
        return Err(ModelError::EmptyBatch);
    }
    if let Some(((row, column), _)) = inputs.indexed_iter().find(|(_, value)| !value.is_finite()) {
        return Err(ModelError::NonFiniteInput { row, column });
    }
    Ok(())
}

/// Validates that every prediction is finite.
pub(crate) fn check_outputs(outputs: Array1<f64>) -> Result<Array1<f64>, ModelError> {
    if let Some(row) = outputs.iter().position(|value| !value.is_finite()) {
        return Err(ModelError::NonFiniteOutput { row });
    }
    Ok(outputs)
}
