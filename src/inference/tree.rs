//! Decision tree descent and leaf statistics.

use crate::data::InputRecord;
use crate::repr::{DecisionTree, Distribution, Outcome, TreeNode};
use crate::utils::{self, DEFAULT_Z};

use super::{MissingStrategy, PredictError, Vote};

/// Where descent stopped.
#[derive(Debug, Clone)]
pub struct Descent<'a> {
    pub node: &'a TreeNode,
    /// Rules of the matched predicates, root first.
    pub path: Vec<String>,
}

/// Descend from the root into the first matching child until none matches.
///
/// Only [`MissingStrategy::LastPrediction`] is supported.
pub fn descend<'a>(
    tree: &'a DecisionTree,
    input: &InputRecord,
    strategy: MissingStrategy,
) -> Result<Descent<'a>, PredictError> {
    if strategy != MissingStrategy::LastPrediction {
        return Err(PredictError::UnsupportedStrategy(strategy));
    }
    let mut node = &tree.root;
    let mut path = Vec::new();
    while let Some(child) = node
        .children
        .iter()
        .find(|child| child.predicates.apply(input, &tree.fields))
    {
        let rule = child.predicates.rule(&tree.fields);
        if !rule.is_empty() {
            path.push(rule);
        }
        node = child;
    }
    Ok(Descent { node, path })
}

/// Predict with a single tree, producing its full [`Vote`].
pub fn predict_tree(
    tree: &DecisionTree,
    input: &InputRecord,
    strategy: MissingStrategy,
) -> Result<Vote, PredictError> {
    let Descent { node, path } = descend(tree, input, strategy)?;
    let next = node
        .children
        .first()
        .and_then(|child| child.predicates.field())
        .map(|id| tree.fields.name_of(id).to_owned());
    let mut vote = match &node.output {
        Outcome::Category(category) => classification_vote(node, category),
        Outcome::Value(value) => regression_vote(node, *value),
    };
    vote.path = path;
    vote.next = next;
    Ok(vote)
}

fn classification_vote(node: &TreeNode, category: &str) -> Vote {
    let total = node.distribution.total();
    let confidence = if total > 0.0 {
        let p = node.distribution.count_of(category) / total;
        utils::wilson_score(p, total, DEFAULT_Z)
    } else {
        node.confidence.unwrap_or(0.0)
    };
    Vote {
        prediction: Outcome::Category(category.to_owned()),
        confidence,
        distribution: node.distribution.clone(),
        count: node.count,
        median: None,
        min: None,
        max: None,
        path: Vec::new(),
        next: None,
    }
}

/// Regression leaf: the node output is the mean; confidence is the error
/// bound of the leaf distribution, or the stored confidence when the bound
/// is undefined.
fn regression_vote(node: &TreeNode, mean: f64) -> Vote {
    let bins = node.distribution.as_numeric().unwrap_or(&[]);
    let instances = utils::total_count(bins);
    let error = utils::regression_error(utils::unbiased_variance(bins, mean), instances, DEFAULT_Z);
    let confidence = if error.is_finite() {
        error
    } else {
        node.confidence.unwrap_or(0.0)
    };
    let median = node
        .stats
        .median
        .or_else(|| Some(utils::median(bins)).filter(|m| m.is_finite()));
    Vote {
        prediction: Outcome::Value(mean),
        confidence,
        distribution: Distribution::Numeric(bins.to_vec()),
        count: node.count,
        median,
        min: node.stats.minimum.or_else(|| bins.first().map(|b| b.0)),
        max: node.stats.maximum.or_else(|| bins.last().map(|b| b.0)),
        path: Vec::new(),
        next: None,
    }
}
