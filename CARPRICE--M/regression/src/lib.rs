#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Regression models for car price estimation: the inference trait, linear and
//! weighted-ensemble models, and the JSON artifact they are loaded from.

/// Errors raised while loading or evaluating a model.
#[path = "../error.rs"]
pub mod error;

/// Inference boundary shared by every model kind.
#[path = "../regressor.rs"]
pub mod regressor;

/// Linear regression with optional feature standardization.
#[path = "../linear.rs"]
pub mod linear;

/// Weighted blend of linear members.
#[path = "../ensemble.rs"]
pub mod ensemble;

/// Serialized model artifact format.
#[path = "../artifact.rs"]
pub mod artifact;

pub use artifact::{
    ArtifactSummary, LinearSpec, MemberSpec, ModelArtifact, ModelSpec, FORMAT_VERSION,
};
pub use ensemble::{EnsembleMember, WeightedEnsemble};
pub use error::ModelError;
pub use linear::{LinearRegressionModel, StandardScaler};
pub use regressor::Regressor;
