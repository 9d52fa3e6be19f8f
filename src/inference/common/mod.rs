//! Shared inference types.
//!
//! This module contains types shared across the model kinds:
//! - [`PredictOptions`]: the configuration record of every entry point
//! - [`Vote`]: the full outcome of one tree or of combined trees
//! - [`Prediction`] / [`CentroidMatch`]: what callers get back

mod options;
mod output;

pub use options::{CombinationMethod, MissingStrategy, PredictOptions};
pub use output::{CategoryScore, CentroidMatch, Prediction, Vote};
