//! Ensemble of decision trees.

use serde_json::Value;

use crate::compat::bigml::{check_status, ConversionError, EnsembleResourceJson, ModelResourceJson};
use crate::data::InputRecord;
use crate::inference::{MultiVote, PredictError, PredictOptions, Prediction};
use crate::utils::run_with_threads;

use super::Model;

/// A loaded ensemble.
///
/// Members vote in batches of at most `max_models` trees; batches are
/// evaluated concurrently (see [`PredictOptions::n_threads`]) and their votes
/// concatenated in model order before combination, so results do not depend
/// on the thread count.
#[derive(Debug, Clone)]
pub struct Ensemble {
    models: Vec<Model>,
    /// Members per batch. Default: 1.
    max_models: usize,
    resource: Option<String>,
}

impl Ensemble {
    /// Build an ensemble from already loaded models.
    pub fn from_models(models: Vec<Model>) -> Result<Self, ConversionError> {
        if models.is_empty() {
            return Err(ConversionError::EmptyEnsemble);
        }
        Ok(Self {
            models,
            max_models: 1,
            resource: None,
        })
    }

    /// Parse an ensemble resource from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConversionError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Load an ensemble document whose `models` are embedded model resources.
    ///
    /// Members given only by id cannot be fetched locally and are rejected
    /// with [`ConversionError::UnresolvedModel`].
    pub fn from_value(value: Value) -> Result<Self, ConversionError> {
        let resource = EnsembleResourceJson::from_value(value)?;
        if resource.status.is_some() {
            check_status(resource.status.as_ref())?;
        }
        let entries = resource.models.unwrap_or_default();
        let mut models = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let model = match entry {
                Value::String(id) => return Err(ConversionError::UnresolvedModel { index, id }),
                Value::Object(_) => Model::new(ModelResourceJson::from_value(entry)?.to_tree()?),
                other => {
                    return Err(ConversionError::InvalidField {
                        path: format!("models[{index}]"),
                        reason: format!("expected a model resource, got {other}"),
                    })
                }
            };
            models.push(model);
        }

        let mut ensemble = Self::from_models(models)?;
        ensemble.resource = resource.resource;
        tracing::debug!(
            resource = ensemble.resource.as_deref(),
            models = ensemble.len(),
            "loaded ensemble"
        );
        Ok(ensemble)
    }

    /// Evaluate members in batches of `max_models` (at least 1).
    pub fn with_max_models(mut self, max_models: usize) -> Self {
        self.max_models = max_models.max(1);
        self
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    pub fn is_regression(&self) -> bool {
        self.models.first().is_some_and(Model::is_regression)
    }

    /// Bin limit for merged regression distributions: the largest of the
    /// members' limits.
    fn max_bins(&self) -> usize {
        self.models
            .iter()
            .map(|m| m.tree().max_bins)
            .max()
            .unwrap_or(crate::repr::DEFAULT_MAX_BINS)
    }

    /// Collect the votes of every member, in model order.
    pub fn votes(
        &self,
        input: &InputRecord,
        options: &PredictOptions,
    ) -> Result<MultiVote, PredictError> {
        if input.is_empty() {
            return Err(PredictError::EmptyInput);
        }
        let batches: Vec<&[Model]> = self.models.chunks(self.max_models).collect();
        let results = run_with_threads(options.n_threads, |parallelism| {
            parallelism.maybe_par_map(batches, |batch| {
                batch
                    .iter()
                    .map(|model| model.vote(input, options))
                    .collect::<Result<Vec<_>, _>>()
                    .map(MultiVote::new)
            })
        });

        let mut votes = MultiVote::default();
        for batch in results {
            votes.extend(batch?);
        }
        Ok(votes)
    }

    /// Predict the objective by combining the members' votes with
    /// `options.method`.
    pub fn predict(
        &self,
        input: &InputRecord,
        options: &PredictOptions,
    ) -> Result<Prediction, PredictError> {
        let votes = self.votes(input, options)?;
        let combined = votes.combine(options.method, options.median, self.max_bins())?;
        Ok(combined.into_prediction(options))
    }
}
