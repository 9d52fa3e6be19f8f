//! Canonical, immutable model representations.
//!
//! Everything here is built once by [`crate::compat::bigml`] at load time and
//! only read afterwards, so loaded models can be shared across threads.

pub mod cluster;
pub mod distribution;
pub mod forest;
pub mod predicate;
pub mod tree;

pub use cluster::{Centroid, CentroidSet};
pub use distribution::Distribution;
pub use forest::{AnomalyNode, IsolationForest, TopAnomaly};
pub use predicate::{Condition, Operator, Predicate, PredicateValue, Predicates};
pub use tree::{DecisionTree, NodeStats, Outcome, TreeNode, DEFAULT_MAX_BINS};
