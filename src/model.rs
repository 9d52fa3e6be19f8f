//! High-level model wrappers for local inference.
//!
//! Each wrapper owns one immutable native representation and exposes the
//! single entry point of its kind:
//!
//! | Type | Resource | Entry point |
//! |------|----------|-------------|
//! | [`Model`] | decision tree | [`Model::predict`] |
//! | [`Ensemble`] | list of trees | [`Ensemble::predict`] |
//! | [`Anomaly`] | isolation forest | [`Anomaly::score`] |
//! | [`Cluster`] | centroid set | [`Cluster::centroid`] |
//!
//! Loading goes through [`crate::compat::bigml`]; any malformed document is
//! rejected there with a [`ConversionError`](crate::compat::ConversionError).
//! After loading, the wrappers are `Send + Sync` and can be shared freely.
//!
//! # Example
//!
//! ```ignore
//! use bigml_local::model::Model;
//! use bigml_local::inference::PredictOptions;
//!
//! let model = Model::from_json(&std::fs::read_to_string("model.json")?)?;
//! let input = [("petal length", 4.07), ("petal width", 1.51)].into_iter().collect();
//! let options = PredictOptions::builder().by_name(true).build();
//! let prediction = model.predict(&input, &options)?;
//! ```

mod anomaly;
mod cluster;
mod ensemble;
mod tree;

pub use anomaly::{Anomaly, TreePath};
pub use cluster::Cluster;
pub use ensemble::Ensemble;
pub use tree::Model;

use crate::data::{FieldSet, InputRecord};
use crate::inference::PredictError;

/// Resolve a raw input record against `fields`, rejecting empty inputs.
pub(crate) fn resolve_input(
    fields: &FieldSet,
    raw: &InputRecord,
    by_name: bool,
) -> Result<InputRecord, PredictError> {
    if raw.is_empty() {
        return Err(PredictError::EmptyInput);
    }
    Ok(fields.resolve(raw, by_name))
}
