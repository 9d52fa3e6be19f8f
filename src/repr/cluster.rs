//! Cluster centroid representation.

use std::collections::{BTreeMap, HashMap};

use crate::data::{FieldSet, FieldValue};

/// A cluster's representative point.
#[derive(Clone, Debug, PartialEq)]
pub struct Centroid {
    pub id: String,
    pub name: String,
    /// Representative value per field id. Text fields hold their terms.
    pub center: BTreeMap<String, FieldValue>,
    pub count: f64,
}

/// The centroids of a cluster model with per-field scale factors.
///
/// Every field with a scale is a member of the model's field set.
#[derive(Clone, Debug, PartialEq)]
pub struct CentroidSet {
    pub fields: FieldSet,
    pub centroids: Vec<Centroid>,
    pub scales: HashMap<String, f64>,
    pub resource: Option<String>,
}

impl CentroidSet {
    /// Scale of a field; unscaled fields weigh 1.
    #[inline]
    pub fn scale(&self, field: &str) -> f64 {
        self.scales.get(field).copied().unwrap_or(1.0)
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }
}
