//! Isolation forest scoring.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::data::{FieldSet, InputRecord};
use crate::repr::{AnomalyNode, IsolationForest};

use super::PredictError;

/// Cooperative cancellation flag for forest scans.
///
/// Clones share the flag, so a token handed to another thread can stop a
/// scan in flight. The scan checks it before each tree.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request running and future scans to stop.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear a previous stop request.
    pub fn unstop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Isolation depth of `input` in one tree.
///
/// 0 when the root does not match; otherwise 1 plus one per descent into the
/// first matching child.
pub fn depth(root: &AnomalyNode, input: &InputRecord, fields: &FieldSet) -> usize {
    walk(root, input, fields, None)
}

/// [`depth`] together with the rules of the traversed predicates.
pub fn depth_with_path(
    root: &AnomalyNode,
    input: &InputRecord,
    fields: &FieldSet,
) -> (usize, Vec<String>) {
    let mut path = Vec::new();
    let depth = walk(root, input, fields, Some(&mut path));
    (depth, path)
}

fn walk(
    root: &AnomalyNode,
    input: &InputRecord,
    fields: &FieldSet,
    mut path: Option<&mut Vec<String>>,
) -> usize {
    let mut record = |node: &AnomalyNode| {
        if let Some(path) = path.as_deref_mut() {
            let rule = node.predicates.rule(fields);
            if !rule.is_empty() {
                path.push(rule);
            }
        }
    };
    if !root.predicates.apply(input, fields) {
        return 0;
    }
    record(root);
    let mut depth = 1;
    let mut node = root;
    while let Some(child) = node
        .children
        .iter()
        .find(|child| child.predicates.apply(input, fields))
    {
        record(child);
        depth += 1;
        node = child;
    }
    depth
}

/// Anomaly score `2^(−mean_depth / expected_mean_depth)` of a resolved input.
///
/// Fails with [`PredictError::Cancelled`] when `token` is stopped before or
/// during the scan; partial depths are discarded.
pub fn score(
    forest: &IsolationForest,
    input: &InputRecord,
    token: &CancelToken,
) -> Result<f64, PredictError> {
    let mut total = 0usize;
    for (index, tree) in forest.trees.iter().enumerate() {
        if token.is_stopped() {
            tracing::debug!(tree = index, trees = forest.n_trees(), "anomaly score cancelled");
            return Err(PredictError::Cancelled);
        }
        let d = depth(tree, input, &forest.fields);
        tracing::trace!(tree = index, depth = d, "isolation depth");
        total += d;
    }
    let observed = total as f64 / forest.n_trees() as f64;
    Ok(2f64.powf(-observed / forest.expected_mean_depth))
}
