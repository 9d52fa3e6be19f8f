//! Prediction results.

use super::PredictOptions;
use crate::repr::{Distribution, Outcome};
use crate::utils::{wilson_score, DEFAULT_Z};

/// The raw outcome of one tree, or of a combined set of trees.
///
/// Carries every statistic; [`Vote::into_prediction`] selects what the caller
/// asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct Vote {
    pub prediction: Outcome,
    /// Wilson score for classification, error bound for regression.
    pub confidence: f64,
    pub distribution: Distribution,
    pub count: f64,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Rules of the traversed predicates, root first.
    pub path: Vec<String>,
    /// Name of the field that decides the next split when descent stopped
    /// at an internal node.
    pub next: Option<String>,
}

impl Vote {
    /// Share of the distribution held by the predicted category.
    pub fn probability(&self) -> Option<f64> {
        let category = self.prediction.as_category()?;
        let total = self.distribution.total();
        (total > 0.0).then(|| self.distribution.count_of(category) / total)
    }

    /// The `k` most frequent categories with their own confidence.
    pub fn top_categories(&self, k: usize) -> Vec<CategoryScore> {
        let Some(bins) = self.distribution.as_categorical() else {
            return Vec::new();
        };
        let total = self.distribution.total();
        let mut ranked: Vec<&(String, f64)> = bins.iter().collect();
        // stable sort keeps the listed order among equal counts
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
            .into_iter()
            .take(k)
            .map(|(category, count)| {
                let probability = if total > 0.0 { count / total } else { 0.0 };
                CategoryScore {
                    category: category.clone(),
                    confidence: wilson_score(probability, total, DEFAULT_Z),
                    probability,
                    count: *count,
                }
            })
            .collect()
    }

    /// Shape the vote into the result requested by `options`.
    pub fn into_prediction(self, options: &PredictOptions) -> Prediction {
        let probability = self.probability();
        let multiple = if options.multiple > 0 {
            self.top_categories(options.multiple)
        } else {
            Vec::new()
        };
        Prediction {
            confidence: options.confidence.then_some(self.confidence),
            probability,
            count: options.count.then_some(self.count),
            median: self.median.filter(|_| options.median),
            min: self.min.filter(|_| options.min),
            max: self.max.filter(|_| options.max),
            distribution: options.distribution.then_some(self.distribution),
            prediction: self.prediction,
            path: self.path,
            next: self.next,
            multiple,
        }
    }
}

/// One entry of a top-K category listing.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScore {
    pub category: String,
    pub confidence: f64,
    pub probability: f64,
    pub count: f64,
}

/// The result of `predict`.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub prediction: Outcome,
    pub confidence: Option<f64>,
    /// Share of the predicted category (classification only).
    pub probability: Option<f64>,
    pub distribution: Option<Distribution>,
    pub count: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub path: Vec<String>,
    pub next: Option<String>,
    /// Top-K categories, when requested.
    pub multiple: Vec<CategoryScore>,
}

impl Prediction {
    pub fn category(&self) -> Option<&str> {
        self.prediction.as_category()
    }

    pub fn value(&self) -> Option<f64> {
        self.prediction.as_value()
    }
}

/// The result of `centroid`.
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidMatch {
    pub id: String,
    pub name: String,
    pub distance: f64,
}
