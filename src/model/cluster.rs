//! Cluster centroid model.

use serde_json::Value;

use crate::compat::bigml::{ClusterResourceJson, ConversionError};
use crate::data::{FieldSet, InputRecord};
use crate::inference::{cluster, CentroidMatch, PredictError, PredictOptions};
use crate::repr::CentroidSet;

use super::resolve_input;

/// A loaded cluster.
#[derive(Debug, Clone)]
pub struct Cluster {
    centroids: CentroidSet,
}

impl Cluster {
    pub fn new(centroids: CentroidSet) -> Self {
        Self { centroids }
    }

    /// Parse a cluster resource from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConversionError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> Result<Self, ConversionError> {
        let resource = ClusterResourceJson::from_value(value)?;
        Ok(Self::new(resource.to_centroids()?))
    }

    pub fn centroids(&self) -> &CentroidSet {
        &self.centroids
    }

    pub fn fields(&self) -> &FieldSet {
        &self.centroids.fields
    }

    /// Nearest centroid to `input`.
    ///
    /// Fails with [`PredictError::MissingInputField`] when a field that is
    /// neither categorical nor text is absent.
    pub fn centroid(
        &self,
        input: &InputRecord,
        options: &PredictOptions,
    ) -> Result<CentroidMatch, PredictError> {
        let resolved = resolve_input(&self.centroids.fields, input, options.by_name)?;
        cluster::nearest(&self.centroids, &resolved)
    }
}
