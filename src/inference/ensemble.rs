//! Ensemble vote combination.
//!
//! Every member tree yields one [`Vote`]; votes are concatenated in model
//! order into a [`MultiVote`] and combined with a [`CombinationMethod`].
//!
//! # Classification
//!
//! - **Plurality**: each vote adds 1 to its predicted category. Confidence is
//!   the Wilson score of the winner in the merged distribution of all votes.
//! - **Confidence-weighted**: each vote adds `confidence · p(c)` to every
//!   category `c` of its distribution. Confidence is the confidence-weighted
//!   mean confidence of the votes agreeing with the winner.
//! - **Probability-weighted**: each vote adds `p(c)`. Confidence is the
//!   winner's score divided by the number of votes.
//!
//! Ties go to the category first seen in model order.
//!
//! # Regression
//!
//! Plurality and probability-weighted average the predictions (or medians)
//! and the error bounds. Confidence-weighted weighs votes by
//! `exp((min_err − err) / (max_err − min_err) · 10)`.

use crate::repr::{Distribution, Outcome};
use crate::utils::{self, DEFAULT_Z};

use super::{CombinationMethod, PredictError, Vote};

/// Sharpness of the error weighting of confidence-weighted regression.
const ERROR_WEIGHT_SCALE: f64 = 10.0;

/// The votes of an ensemble, in model order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiVote {
    votes: Vec<Vote>,
}

impl MultiVote {
    pub fn new(votes: Vec<Vote>) -> Self {
        Self { votes }
    }

    /// Append the votes of another batch, keeping order.
    pub fn extend(&mut self, other: MultiVote) {
        self.votes.extend(other.votes);
    }

    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn is_regression(&self) -> bool {
        self.votes
            .first()
            .is_some_and(|v| matches!(v.prediction, Outcome::Value(_)))
    }

    /// Combine all votes into one.
    ///
    /// `use_median` makes regression average each vote's median instead of
    /// its mean; merged numeric distributions are limited to `max_bins`.
    pub fn combine(
        &self,
        method: CombinationMethod,
        use_median: bool,
        max_bins: usize,
    ) -> Result<Vote, PredictError> {
        if self.votes.is_empty() {
            return Err(PredictError::NoVotes);
        }
        let vote = if self.is_regression() {
            self.combine_regression(method, use_median, max_bins)
        } else {
            self.combine_categorical(method)
        };
        tracing::trace!(votes = self.len(), ?method, prediction = ?vote.prediction, "combined votes");
        Ok(vote)
    }

    fn merged_distribution(&self) -> Distribution {
        let empty = if self.is_regression() {
            Distribution::Numeric(Vec::new())
        } else {
            Distribution::Categorical(Vec::new())
        };
        self.votes
            .iter()
            .fold(empty, |acc, vote| acc.merge(&vote.distribution))
    }

    // =========================================================================
    // Classification
    // =========================================================================

    fn combine_categorical(&self, method: CombinationMethod) -> Vote {
        // category scores in first-seen order
        let mut scores: Vec<(String, f64)> = Vec::new();
        let mut add = |category: &str, amount: f64| {
            match scores.iter_mut().find(|(c, _)| c == category) {
                Some((_, score)) => *score += amount,
                None => scores.push((category.to_owned(), amount)),
            }
        };

        for vote in &self.votes {
            let Some(predicted) = vote.prediction.as_category() else {
                continue;
            };
            let weight = match method {
                CombinationMethod::Plurality => {
                    add(predicted, 1.0);
                    continue;
                }
                CombinationMethod::ConfidenceWeighted => vote.confidence,
                CombinationMethod::ProbabilityWeighted => 1.0,
            };
            let total = vote.distribution.total();
            match vote.distribution.as_categorical() {
                Some(bins) if total > 0.0 => {
                    for (category, count) in bins {
                        add(category, weight * count / total);
                    }
                }
                _ => add(predicted, weight),
            }
        }

        let (winner, winner_score) = scores
            .iter()
            .fold(None, |best: Option<&(String, f64)>, entry| match best {
                Some(b) if b.1 >= entry.1 => Some(b),
                _ => Some(entry),
            })
            .map(|(c, s)| (c.clone(), *s))
            .unwrap_or_default();

        let distribution = self.merged_distribution();
        let confidence = match method {
            CombinationMethod::Plurality => {
                let total = distribution.total();
                if total > 0.0 {
                    let p = distribution.count_of(&winner) / total;
                    utils::wilson_score(p, total, DEFAULT_Z)
                } else {
                    mean(self.votes.iter().map(|v| v.confidence))
                }
            }
            CombinationMethod::ConfidenceWeighted => {
                let agreeing = self
                    .votes
                    .iter()
                    .filter(|v| v.prediction.as_category() == Some(winner.as_str()));
                let (weighted, weights) = agreeing.fold((0.0, 0.0), |(num, den), v| {
                    (num + v.confidence * v.confidence, den + v.confidence)
                });
                if weights > 0.0 {
                    weighted / weights
                } else {
                    0.0
                }
            }
            CombinationMethod::ProbabilityWeighted => winner_score / self.votes.len() as f64,
        };

        let count = distribution.total();
        Vote {
            prediction: Outcome::Category(winner),
            confidence,
            count: if count > 0.0 { count } else { self.votes.len() as f64 },
            distribution,
            median: None,
            min: None,
            max: None,
            path: Vec::new(),
            next: None,
        }
    }

    // =========================================================================
    // Regression
    // =========================================================================

    fn combine_regression(
        &self,
        method: CombinationMethod,
        use_median: bool,
        max_bins: usize,
    ) -> Vote {
        let values: Vec<f64> = self
            .votes
            .iter()
            .map(|v| {
                let mean = v.prediction.as_value().unwrap_or(f64::NAN);
                if use_median {
                    v.median.unwrap_or(mean)
                } else {
                    mean
                }
            })
            .collect();
        let errors: Vec<f64> = self.votes.iter().map(|v| v.confidence).collect();

        let (prediction, confidence) = match method {
            CombinationMethod::ConfidenceWeighted => {
                let weights = error_weights(&errors);
                (weighted_mean(&values, &weights), weighted_mean(&errors, &weights))
            }
            CombinationMethod::Plurality | CombinationMethod::ProbabilityWeighted => (
                mean(values.iter().copied()),
                mean(errors.iter().copied()),
            ),
        };

        let distribution = self.merged_distribution().rebin(max_bins);
        let bins = distribution.as_numeric().unwrap_or(&[]);
        let median = Some(utils::median(bins)).filter(|m| m.is_finite());
        let min = self.votes.iter().filter_map(|v| v.min).reduce(f64::min);
        let max = self.votes.iter().filter_map(|v| v.max).reduce(f64::max);
        let count = self.votes.iter().map(|v| v.count).sum();
        Vote {
            prediction: Outcome::Value(prediction),
            confidence,
            distribution,
            count,
            median,
            min,
            max,
            path: Vec::new(),
            next: None,
        }
    }
}

/// Mean of the finite values; NaN when there are none.
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    let (num, den) = values
        .iter()
        .zip(weights)
        .filter(|(v, w)| v.is_finite() && w.is_finite())
        .fold((0.0, 0.0), |(num, den), (v, w)| (num + v * w, den + w));
    if den > 0.0 {
        num / den
    } else {
        f64::NAN
    }
}

/// Exponential weights favouring low errors. Equal errors weigh 1.
fn error_weights(errors: &[f64]) -> Vec<f64> {
    let finite = errors.iter().copied().filter(|e| e.is_finite());
    let min = finite.clone().fold(f64::INFINITY, f64::min);
    let max = finite.fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    errors
        .iter()
        .map(|e| {
            if !e.is_finite() {
                0.0
            } else if range > 0.0 {
                ((min - e) / range * ERROR_WEIGHT_SCALE).exp()
            } else {
                1.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::DEFAULT_MAX_BINS;

    fn class_vote(category: &str, confidence: f64, bins: &[(&str, f64)]) -> Vote {
        let distribution =
            Distribution::Categorical(bins.iter().map(|(c, n)| (c.to_string(), *n)).collect());
        Vote {
            prediction: Outcome::Category(category.into()),
            confidence,
            count: distribution.total(),
            distribution,
            median: None,
            min: None,
            max: None,
            path: Vec::new(),
            next: None,
        }
    }

    fn value_vote(value: f64, error: f64, median: f64) -> Vote {
        Vote {
            prediction: Outcome::Value(value),
            confidence: error,
            distribution: Distribution::Numeric(vec![(value, 2.0)]),
            count: 2.0,
            median: Some(median),
            min: Some(value - 1.0),
            max: Some(value + 1.0),
            path: Vec::new(),
            next: None,
        }
    }

    fn votes() -> MultiVote {
        MultiVote::new(vec![
            class_vote("a", 0.9, &[("a", 9.0), ("b", 1.0)]),
            class_vote("b", 0.4, &[("a", 4.0), ("b", 6.0)]),
            class_vote("b", 0.3, &[("a", 4.5), ("b", 5.5)]),
        ])
    }

    #[test]
    fn plurality_counts_votes() {
        let vote = votes()
            .combine(CombinationMethod::Plurality, false, DEFAULT_MAX_BINS)
            .unwrap();
        assert_eq!(vote.prediction, Outcome::Category("b".into()));
        // merged: a = 17.5, b = 12.5
        let expected = utils::wilson_score(12.5 / 30.0, 30.0, DEFAULT_Z);
        assert!((vote.confidence - expected).abs() < 1e-12);
        assert_eq!(vote.count, 30.0);
    }

    #[test]
    fn plurality_tie_goes_to_first_vote() {
        let multi = MultiVote::new(vec![
            class_vote("b", 0.5, &[("b", 1.0)]),
            class_vote("a", 0.5, &[("a", 1.0)]),
        ]);
        let vote = multi
            .combine(CombinationMethod::Plurality, false, DEFAULT_MAX_BINS)
            .unwrap();
        assert_eq!(vote.prediction, Outcome::Category("b".into()));
    }

    #[test]
    fn confidence_weighted_prefers_confident_votes() {
        let vote = votes()
            .combine(CombinationMethod::ConfidenceWeighted, false, DEFAULT_MAX_BINS)
            .unwrap();
        // a: 0.9*0.9 + 0.4*0.4 + 0.3*0.45 = 1.105; b: 0.09 + 0.24 + 0.165 = 0.495
        assert_eq!(vote.prediction, Outcome::Category("a".into()));
        assert!((vote.confidence - 0.9).abs() < 1e-12);
    }

    #[test]
    fn probability_weighted_sums_probabilities() {
        let vote = votes()
            .combine(CombinationMethod::ProbabilityWeighted, false, DEFAULT_MAX_BINS)
            .unwrap();
        // a: 0.9 + 0.4 + 0.45 = 1.75
        assert_eq!(vote.prediction, Outcome::Category("a".into()));
        assert!((vote.confidence - 1.75 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn regression_average_and_median() {
        let multi = MultiVote::new(vec![value_vote(1.0, 0.5, 1.5), value_vote(3.0, 0.5, 2.5)]);
        let vote = multi
            .combine(CombinationMethod::Plurality, false, DEFAULT_MAX_BINS)
            .unwrap();
        assert_eq!(vote.prediction, Outcome::Value(2.0));
        assert_eq!(vote.confidence, 0.5);
        assert_eq!(vote.min, Some(0.0));
        assert_eq!(vote.max, Some(4.0));
        assert_eq!(vote.count, 4.0);

        let vote = multi
            .combine(CombinationMethod::Plurality, true, DEFAULT_MAX_BINS)
            .unwrap();
        assert_eq!(vote.prediction, Outcome::Value(2.0));
    }

    #[test]
    fn regression_confidence_weighted_favours_low_error() {
        let multi = MultiVote::new(vec![value_vote(1.0, 0.1, 1.0), value_vote(3.0, 2.0, 3.0)]);
        let vote = multi
            .combine(CombinationMethod::ConfidenceWeighted, false, DEFAULT_MAX_BINS)
            .unwrap();
        let w = (-10.0f64).exp();
        let expected = (1.0 + 3.0 * w) / (1.0 + w);
        assert!((vote.prediction.as_value().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn merged_bins_are_limited() {
        let multi = MultiVote::new((0..10).map(|i| value_vote(i as f64, 1.0, i as f64)).collect());
        let vote = multi
            .combine(CombinationMethod::Plurality, false, 4)
            .unwrap();
        assert_eq!(vote.distribution.len(), 4);
        assert_eq!(vote.distribution.total(), 20.0);
    }

    #[test]
    fn empty_multivote_is_an_error() {
        let result = MultiVote::default().combine(CombinationMethod::Plurality, false, 32);
        assert_eq!(result, Err(PredictError::NoVotes));
    }
}
