use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by artifact loading and inference.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The artifact file could not be read.
    #[error("reading model artifact {}: {source}", path.display())]
    Io {
        /// Artifact location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The artifact is not valid JSON for the expected format.
    #[error("parsing model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    /// The artifact parsed but its contents are inconsistent.
    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),
    /// Input column count does not match the model width.
    #[error("expected {expected} features, got {found}")]
    ShapeMismatch {
        /// Columns the model was fitted on.
        expected: usize,
        /// Columns supplied.
        found: usize,
    },
    /// The input matrix has no rows.
    #[error("input batch contains no rows")]
    EmptyBatch,
    /// NaN or infinity in the input matrix.
    #[error("non-finite input value at row {row}, column {column}")]
    NonFiniteInput {
        /// Row index.
        row: usize,
        /// Column index.
        column: usize,
    },
    /// The model produced NaN or infinity.
    #[error("model produced a non-finite prediction for row {row}")]
    NonFiniteOutput {
        /// Row index.
        row: usize,
    },
}
