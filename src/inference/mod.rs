//! Inference algorithms over loaded models.
//!
//! Everything here is a pure, synchronous computation over an immutable
//! model and an already resolved [`InputRecord`](crate::data::InputRecord).
//!
//! # Module Structure
//!
//! - [`common`]: Shared types (`PredictOptions`, `Vote`, `Prediction`)
//! - [`tree`]: Decision tree descent and leaf statistics
//! - [`ensemble`]: Vote combination ([`MultiVote`])
//! - [`anomaly`]: Isolation depth scoring with cooperative cancellation
//! - [`cluster`]: Nearest-centroid search
//!
//! # Quick Start
//!
//! ```ignore
//! use bigml_local::inference::{tree, MissingStrategy};
//!
//! let input = tree.fields.resolve(&raw, true);
//! let vote = tree::predict_tree(&tree, &input, MissingStrategy::LastPrediction)?;
//! ```

pub mod anomaly;
pub mod cluster;
pub mod common;
pub mod ensemble;
pub mod tree;

pub use anomaly::CancelToken;
pub use common::{
    CategoryScore, CentroidMatch, CombinationMethod, MissingStrategy, PredictOptions, Prediction,
    Vote,
};
pub use ensemble::MultiVote;

/// Error type for prediction calls.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictError {
    /// A field required for centroid distances is absent.
    #[error("input is missing required field `{0}`")]
    MissingInputField(String),
    #[error("missing strategy {0:?} is not supported")]
    UnsupportedStrategy(MissingStrategy),
    /// The forest scan was stopped through its cancel token.
    #[error("anomaly scoring was cancelled")]
    Cancelled,
    #[error("input record is empty")]
    EmptyInput,
    #[error("no centroid is at a finite distance")]
    NoCentroid,
    #[error("no votes to combine")]
    NoVotes,
}
