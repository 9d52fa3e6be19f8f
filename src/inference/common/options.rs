//! Prediction options.
//!
//! [`PredictOptions`] is the configuration record every entry point takes.
//! It is built with a `bon` builder or deserialized from the camelCase option
//! keys used by the service's clients.
//!
//! # Example
//!
//! ```
//! use bigml_local::inference::{CombinationMethod, PredictOptions};
//!
//! // All defaults
//! let options = PredictOptions::default();
//!
//! // Keys by display name, top-3 categories, confidence-weighted voting
//! let options = PredictOptions::builder()
//!     .by_name(true)
//!     .multiple(3)
//!     .method(CombinationMethod::ConfidenceWeighted)
//!     .build();
//!
//! // From JSON
//! let options: PredictOptions =
//!     serde_json::from_str(r#"{"byName": true, "strategy": 0, "method": "probabilityWeighted"}"#)
//!         .unwrap();
//! ```

use bon::Builder;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

// =============================================================================
// Policies
// =============================================================================

/// What a tree does when the field deciding a split is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingStrategy {
    /// Stop and answer with the deepest node reached.
    #[default]
    LastPrediction,
    /// Descend into every child weighted by training counts. Not supported.
    Proportional,
}

/// How ensemble votes are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CombinationMethod {
    /// One unit per vote.
    #[default]
    Plurality,
    /// Vote probabilities weighted by each vote's confidence.
    ConfidenceWeighted,
    /// Vote probabilities, unweighted.
    ProbabilityWeighted,
}

// =============================================================================
// Custom deserializers for option values
// =============================================================================

/// Names or numeric codes, in code order.
fn deserialize_coded<'de, D, T: Copy>(
    deserializer: D,
    what: &str,
    choices: &[(&str, T)],
) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    let value = Value::deserialize(deserializer)?;
    let found = match &value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|code| choices.get(code as usize))
            .map(|(_, choice)| *choice),
        Value::String(s) => choices
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, choice)| *choice),
        _ => None,
    };
    found.ok_or_else(|| SerdeError::custom(format!("unknown {what} {value}")))
}

impl<'de> Deserialize<'de> for MissingStrategy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_coded(
            deserializer,
            "missing strategy",
            &[
                ("lastPrediction", MissingStrategy::LastPrediction),
                ("proportional", MissingStrategy::Proportional),
            ],
        )
    }
}

impl<'de> Deserialize<'de> for CombinationMethod {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_coded(
            deserializer,
            "combination method",
            &[
                ("plurality", CombinationMethod::Plurality),
                ("confidenceWeighted", CombinationMethod::ConfidenceWeighted),
                ("probabilityWeighted", CombinationMethod::ProbabilityWeighted),
            ],
        )
    }
}

/// A count, or `"all"`.
fn deserialize_multiple<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .map(|k| k as usize)
            .ok_or_else(|| SerdeError::custom("multiple must be a non-negative integer")),
        Value::String(s) if s == "all" => Ok(usize::MAX),
        Value::Null => Ok(0),
        other => Err(SerdeError::custom(format!("invalid multiple {other}"))),
    }
}

// =============================================================================
// PredictOptions
// =============================================================================

/// Options shared by `predict`, `score` and `centroid`.
///
/// The result-shaping toggles (`confidence`, `distribution`, `count`,
/// `median`, `min`, `max`) only select what the returned prediction carries.
#[derive(Debug, Clone, PartialEq, Builder, Deserialize)]
#[builder(derive(Clone, Debug))]
#[serde(rename_all = "camelCase", default)]
pub struct PredictOptions {
    /// Input keys are display names rather than field ids. Default: false.
    #[builder(default)]
    pub by_name: bool,

    /// Missing-value policy of tree descent.
    #[builder(default)]
    pub strategy: MissingStrategy,

    /// Ensemble vote combination.
    #[builder(default)]
    pub method: CombinationMethod,

    /// Report the top K categories. 0 disables; `usize::MAX` reports all.
    #[builder(default)]
    #[serde(deserialize_with = "deserialize_multiple")]
    pub multiple: usize,

    /// Default: true.
    #[builder(default = true)]
    pub confidence: bool,

    #[builder(default)]
    pub distribution: bool,

    #[builder(default)]
    pub count: bool,

    /// Also makes ensemble regression average the members' medians.
    #[builder(default)]
    pub median: bool,

    #[builder(default)]
    pub min: bool,

    #[builder(default)]
    pub max: bool,

    /// Ensemble fan-out threads. 0 = auto, 1 = sequential.
    #[builder(default)]
    pub n_threads: usize,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
