//! Single decision tree model.

use serde_json::Value;

use crate::compat::bigml::{ConversionError, ModelResourceJson};
use crate::data::{FieldSet, InputRecord};
use crate::inference::{tree, PredictError, PredictOptions, Prediction, Vote};
use crate::repr::DecisionTree;

use super::resolve_input;

/// A loaded decision tree.
///
/// # Example
///
/// ```ignore
/// let model = Model::from_value(resource)?;
/// let prediction = model.predict(&input, &PredictOptions::default())?;
/// println!("{} ({:?})", prediction.prediction, prediction.confidence);
/// ```
#[derive(Debug, Clone)]
pub struct Model {
    tree: DecisionTree,
}

impl Model {
    pub fn new(tree: DecisionTree) -> Self {
        Self { tree }
    }

    /// Parse a model resource from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConversionError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Load a model resource document, with or without the API envelope.
    pub fn from_value(value: Value) -> Result<Self, ConversionError> {
        let resource = ModelResourceJson::from_value(value)?;
        Ok(Self::new(resource.to_tree()?))
    }

    pub fn tree(&self) -> &DecisionTree {
        &self.tree
    }

    pub fn fields(&self) -> &FieldSet {
        &self.tree.fields
    }

    pub fn is_regression(&self) -> bool {
        self.tree.is_regression()
    }

    pub fn n_nodes(&self) -> usize {
        self.tree.n_nodes()
    }

    /// Raw vote of the tree for `input`, before result shaping.
    pub fn vote(&self, input: &InputRecord, options: &PredictOptions) -> Result<Vote, PredictError> {
        let resolved = resolve_input(&self.tree.fields, input, options.by_name)?;
        tree::predict_tree(&self.tree, &resolved, options.strategy)
    }

    /// Predict the objective for `input`.
    pub fn predict(
        &self,
        input: &InputRecord,
        options: &PredictOptions,
    ) -> Result<Prediction, PredictError> {
        Ok(self.vote(input, options)?.into_prediction(options))
    }
}

impl From<DecisionTree> for Model {
    fn from(tree: DecisionTree) -> Self {
        Self::new(tree)
    }
}
