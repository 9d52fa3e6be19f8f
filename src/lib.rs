//! bigml-local: local inference for BigML models.
//!
//! Loads decision trees, ensembles, anomaly detectors and clusters exported
//! by the BigML service and reproduces their predictions, confidences,
//! anomaly scores and centroid assignments without any network call.
//!
//! # Key Types
//!
//! - [`Model`] / [`Ensemble`] - Decision tree and ensemble prediction
//! - [`Anomaly`] - Isolation forest scoring with cooperative cancellation
//! - [`Cluster`] - Nearest-centroid assignment
//! - [`PredictOptions`] - Prediction options (builder or serde)
//! - [`InputRecord`] - Input values keyed by field id or name
//!
//! # Loading Models
//!
//! Every model type has `from_json` and `from_value` constructors taking the
//! resource document. Malformed documents are rejected at load time with a
//! [`ConversionError`]; see the [`compat`] module for details.

// Re-export approx traits for users who want to compare predictions
pub use approx;

pub mod compat;
pub mod data;
pub mod inference;
pub mod model;
pub mod repr;
pub mod testing;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// High-level model types
pub use model::{Anomaly, Cluster, Ensemble, Model};

// Options and results
pub use inference::{
    CancelToken, CentroidMatch, CombinationMethod, MissingStrategy, PredictError, PredictOptions,
    Prediction,
};

// Input data
pub use data::{FieldValue, InputRecord};

// Load errors
pub use compat::ConversionError;

// Shared utilities
pub use utils::{run_with_threads, Parallelism};
