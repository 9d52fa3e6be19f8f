//! Isolation forest representation.

use super::Predicates;
use crate::data::FieldSet;

/// A node of an isolation tree: only the split predicates matter.
#[derive(Clone, Debug, PartialEq)]
pub struct AnomalyNode {
    pub predicates: Predicates,
    pub children: Vec<AnomalyNode>,
}

impl AnomalyNode {
    pub fn leaf(predicates: Predicates) -> Self {
        Self {
            predicates,
            children: Vec::new(),
        }
    }

    pub fn n_nodes(&self) -> usize {
        1 + self.children.iter().map(AnomalyNode::n_nodes).sum::<usize>()
    }
}

/// One row of the training sample the service flagged as most anomalous.
#[derive(Clone, Debug, PartialEq)]
pub struct TopAnomaly {
    /// Row values, one per input field in `input_fields` order.
    pub row: Vec<serde_json::Value>,
    pub score: f64,
}

/// An isolation forest with its load-time constants.
#[derive(Clone, Debug, PartialEq)]
pub struct IsolationForest {
    pub fields: FieldSet,
    pub trees: Vec<AnomalyNode>,
    pub sample_size: f64,
    pub mean_depth: f64,
    /// `min(mean_depth, 2·(γ + ln(n−1) − (n−1)/n))`, fixed at load time.
    pub expected_mean_depth: f64,
    pub input_fields: Vec<String>,
    pub top_anomalies: Vec<TopAnomaly>,
    pub resource: Option<String>,
}

impl IsolationForest {
    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
