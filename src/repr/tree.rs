//! Decision tree representation.

use std::fmt;

use super::{Distribution, Predicates};
use crate::data::FieldSet;

/// Bin limit applied to merged numeric distributions when a model does not
/// carry its own.
pub const DEFAULT_MAX_BINS: usize = 32;

/// Output stored at a tree node.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Category(String),
    Value(f64),
}

impl Outcome {
    pub fn as_category(&self) -> Option<&str> {
        match self {
            Outcome::Category(c) => Some(c),
            Outcome::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<f64> {
        match self {
            Outcome::Value(v) => Some(*v),
            Outcome::Category(_) => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Category(c) => f.write_str(c),
            Outcome::Value(v) => write!(f, "{v}"),
        }
    }
}

/// Summary statistics of a regression node's objective.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeStats {
    pub median: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

/// A tree node. Children are owned; the tree is acyclic and immutable.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeNode {
    pub predicates: Predicates,
    pub output: Outcome,
    pub distribution: Distribution,
    pub count: f64,
    /// Confidence stored by the service, used when no distribution exists.
    pub confidence: Option<f64>,
    pub stats: NodeStats,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Number of nodes in this subtree.
    pub fn n_nodes(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// A loaded decision tree model.
#[derive(Clone, Debug, PartialEq)]
pub struct DecisionTree {
    pub fields: FieldSet,
    pub root: TreeNode,
    /// Bin limit for numeric distributions.
    pub max_bins: usize,
    pub locale: Option<String>,
    /// Resource id, when the document carried one.
    pub resource: Option<String>,
}

impl DecisionTree {
    #[inline]
    pub fn is_regression(&self) -> bool {
        matches!(self.root.output, Outcome::Value(_))
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.root.n_nodes()
    }
}
