//! Weighted output distributions of tree nodes and votes.

use approx::AbsDiffEq;

use crate::utils;

/// Instance counts at a tree node.
///
/// Categorical distributions map category to count; numeric distributions
/// map bin value to count and are kept sorted by value.
#[derive(Clone, Debug, PartialEq)]
pub enum Distribution {
    Categorical(Vec<(String, f64)>),
    Numeric(Vec<(f64, f64)>),
}

impl Distribution {
    /// Total instance count.
    pub fn total(&self) -> f64 {
        match self {
            Distribution::Categorical(bins) => utils::total_count(bins),
            Distribution::Numeric(bins) => utils::total_count(bins),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Distribution::Categorical(bins) => bins.is_empty(),
            Distribution::Numeric(bins) => bins.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Distribution::Categorical(bins) => bins.len(),
            Distribution::Numeric(bins) => bins.len(),
        }
    }

    /// Count of a category (0 when absent or numeric).
    pub fn count_of(&self, category: &str) -> f64 {
        match self {
            Distribution::Categorical(bins) => bins
                .iter()
                .find(|(k, _)| k == category)
                .map(|(_, c)| *c)
                .unwrap_or(0.0),
            Distribution::Numeric(_) => 0.0,
        }
    }

    /// Sum counts at equal keys. Mixing kinds keeps `self`.
    pub fn merge(&self, other: &Distribution) -> Distribution {
        match (self, other) {
            (Distribution::Categorical(a), Distribution::Categorical(b)) => {
                Distribution::Categorical(utils::merge_counts(a, b))
            }
            (Distribution::Numeric(a), Distribution::Numeric(b)) => {
                Distribution::Numeric(utils::merge_counts(a, b))
            }
            _ => self.clone(),
        }
    }

    /// Limit a numeric distribution to `limit` bins. Categorical
    /// distributions are returned unchanged.
    pub fn rebin(self, limit: usize) -> Distribution {
        match self {
            Distribution::Numeric(bins) => Distribution::Numeric(utils::merge_bins(bins, limit)),
            categorical => categorical,
        }
    }

    pub fn as_numeric(&self) -> Option<&[(f64, f64)]> {
        match self {
            Distribution::Numeric(bins) => Some(bins),
            Distribution::Categorical(_) => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&[(String, f64)]> {
        match self {
            Distribution::Categorical(bins) => Some(bins),
            Distribution::Numeric(_) => None,
        }
    }
}

impl AbsDiffEq for Distribution {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        match (self, other) {
            (Distribution::Categorical(a), Distribution::Categorical(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, ca), (kb, cb))| ka == kb && ca.abs_diff_eq(cb, epsilon))
            }
            (Distribution::Numeric(a), Distribution::Numeric(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|((va, ca), (vb, cb))| {
                        va.abs_diff_eq(vb, epsilon) && ca.abs_diff_eq(cb, epsilon)
                    })
            }
            _ => false,
        }
    }
}
