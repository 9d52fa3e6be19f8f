//! BigML JSON resource documents.
//!
//! These are "foreign types" used only for parsing; [`super::convert`] turns
//! them into the native representations of [`crate::repr`]. Everything is
//! lenient here (optional keys, loosely typed values) so the conversion step
//! can report the offending path when a required piece is missing.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, OneOrMany, PickFirst};

// =============================================================================
// Custom deserializers for service-specific formats
// =============================================================================

/// Tag clouds are lists of `[term, count]` pairs; only the terms are kept.
/// Bare strings are accepted as well.
fn deserialize_tag_cloud<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(entries)) = value else {
        return Ok(Vec::new());
    };
    entries
        .into_iter()
        .map(|entry| match entry {
            Value::String(term) => Ok(term),
            Value::Array(pair) => match pair.into_iter().next() {
                Some(Value::String(term)) => Ok(term),
                _ => Err(SerdeError::custom("tag cloud entry must start with a term")),
            },
            _ => Err(SerdeError::custom("tag cloud entry must be a term or [term, count]")),
        })
        .collect()
}

/// `null` counts as absent for maps the service sometimes nulls out.
fn deserialize_null_map<'de, D, V>(deserializer: D) -> Result<HashMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    Ok(Option::<HashMap<String, V>>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Resource envelope
// =============================================================================

/// Keys holding the payload of a bare (unwrapped) resource document.
const PAYLOAD_KEYS: [&str; 3] = ["model", "models", "clusters"];

/// Unwrap the `{"object": {...}}` envelope returned by the service API.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map)
            if map.get("object").is_some_and(Value::is_object)
                && !PAYLOAD_KEYS.iter().any(|k| map.contains_key(*k)) =>
        {
            map.remove("object").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Processing status of a resource. Code 5 means finished.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusJson {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Fields
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TermAnalysisJson {
    #[serde(default)]
    pub token_mode: Option<String>,
    #[serde(default)]
    pub case_sensitive: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemAnalysisJson {
    #[serde(default)]
    pub separator: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldSummaryJson {
    #[serde(default, deserialize_with = "deserialize_null_map")]
    pub term_forms: HashMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_tag_cloud")]
    pub tag_cloud: Vec<String>,
}

/// A field entry of `fields` / `model_fields`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldJson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub optype: Option<String>,
    #[serde(default)]
    pub summary: Option<FieldSummaryJson>,
    #[serde(default)]
    pub term_analysis: Option<TermAnalysisJson>,
    #[serde(default)]
    pub item_analysis: Option<ItemAnalysisJson>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
}

pub type FieldsJson = HashMap<String, FieldJson>;

// =============================================================================
// Tree nodes
// =============================================================================

/// A predicate object. The operator key is `operator` or `op`.
#[derive(Debug, Clone, Deserialize)]
pub struct PredicateJson {
    #[serde(alias = "op")]
    pub operator: String,
    pub field: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub term: Option<String>,
}

/// Objective summary of a node or of the training set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectiveSummaryJson {
    /// Categorical distribution as `[category, count]` pairs.
    #[serde(default)]
    pub categories: Option<Vec<(Value, f64)>>,
    /// Numeric distribution as `[value, count]` bins.
    #[serde(default)]
    pub bins: Option<Vec<(f64, f64)>>,
    /// Numeric distribution with exact values.
    #[serde(default)]
    pub counts: Option<Vec<(f64, f64)>>,
    #[serde(default)]
    pub median: Option<f64>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// A tree node as stored in `model.root` or `trees[i].root`.
///
/// Predicates come either as `predicate` (a single entry, `true` at the root)
/// or as a `predicates` list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeJson {
    #[serde(default)]
    pub predicate: Option<Value>,
    #[serde(default)]
    pub predicates: Option<Value>,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub count: Option<f64>,
    #[serde(default)]
    pub objective_summary: Option<ObjectiveSummaryJson>,
    #[serde(default)]
    pub children: Vec<NodeJson>,
}

// =============================================================================
// Model
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainingDistributionJson {
    #[serde(default)]
    pub training: Option<ObjectiveSummaryJson>,
}

/// The `model` member of a model resource.
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct ModelJson {
    #[serde(default, deserialize_with = "deserialize_null_map")]
    pub fields: FieldsJson,
    #[serde(default)]
    pub model_fields: Option<FieldsJson>,
    #[serde_as(as = "Option<OneOrMany<_>>")]
    #[serde(default, alias = "objective_fields")]
    pub objective_field: Option<Vec<String>>,
    #[serde(default)]
    pub root: Option<NodeJson>,
    #[serde(default)]
    pub distribution: Option<TrainingDistributionJson>,
    #[serde(default)]
    pub missing_tokens: Option<Vec<String>>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default)]
    pub max_bins: Option<usize>,
}

/// A model resource document.
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct ModelResourceJson {
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub status: Option<StatusJson>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde_as(as = "Option<OneOrMany<_>>")]
    #[serde(default, alias = "objective_fields")]
    pub objective_field: Option<Vec<String>>,
    #[serde(default)]
    pub model: Option<ModelJson>,
}

impl ModelResourceJson {
    /// Parse a model resource, unwrapping the API envelope if present.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(unwrap_envelope(value))
    }
}

// =============================================================================
// Ensemble
// =============================================================================

/// An ensemble resource: member models as ids or embedded documents.
#[derive(Debug, Clone, Deserialize)]
pub struct EnsembleResourceJson {
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub status: Option<StatusJson>,
    #[serde(default)]
    pub models: Option<Vec<Value>>,
}

impl EnsembleResourceJson {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(unwrap_envelope(value))
    }
}

// =============================================================================
// Anomaly detector
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AnomalyTreeJson {
    pub root: NodeJson,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopAnomalyJson {
    #[serde(default)]
    pub row: Vec<Value>,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnomalyModelJson {
    #[serde(default, deserialize_with = "deserialize_null_map")]
    pub fields: FieldsJson,
    #[serde(default)]
    pub top_anomalies: Vec<TopAnomalyJson>,
    #[serde(default)]
    pub mean_depth: Option<f64>,
    #[serde(default)]
    pub trees: Option<Vec<AnomalyTreeJson>>,
}

/// An anomaly detector resource document.
#[derive(Debug, Clone, Deserialize)]
pub struct AnomalyResourceJson {
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub status: Option<StatusJson>,
    #[serde(default)]
    pub sample_size: Option<f64>,
    #[serde(default)]
    pub input_fields: Vec<String>,
    #[serde(default)]
    pub model: Option<AnomalyModelJson>,
}

impl AnomalyResourceJson {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(unwrap_envelope(value))
    }
}

// =============================================================================
// Cluster
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CentroidJson {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub center: HashMap<String, Value>,
    #[serde(default)]
    pub count: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClustersJson {
    #[serde(default)]
    pub clusters: Vec<CentroidJson>,
    #[serde(default, deserialize_with = "deserialize_null_map")]
    pub fields: FieldsJson,
}

/// A cluster resource document.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterResourceJson {
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub status: Option<StatusJson>,
    #[serde(default)]
    pub clusters: Option<ClustersJson>,
    #[serde(default, deserialize_with = "deserialize_null_map")]
    pub scales: HashMap<String, f64>,
    #[serde(default)]
    pub summary_fields: Vec<String>,
}

impl ClusterResourceJson {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(unwrap_envelope(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_field_summary() {
        let field: FieldJson = serde_json::from_value(json!({
            "name": "review",
            "optype": "text",
            "summary": {
                "tag_cloud": [["good", 12], ["bad", 3]],
                "term_forms": {"good": ["goods"]}
            },
            "term_analysis": {"token_mode": "all", "case_sensitive": false}
        }))
        .unwrap();
        let summary = field.summary.unwrap();
        assert_eq!(summary.tag_cloud, vec!["good", "bad"]);
        assert_eq!(summary.term_forms["good"], vec!["goods"]);
        assert_eq!(field.term_analysis.unwrap().case_sensitive, Some(false));
    }

    #[test]
    fn parse_predicate_with_op_alias() {
        let p: PredicateJson =
            serde_json::from_value(json!({"op": "<=*", "field": "000002", "value": 2.45}))
                .unwrap();
        assert_eq!(p.operator, "<=*");
        assert_eq!(p.value, json!(2.45));

        let p: PredicateJson =
            serde_json::from_value(json!({"operator": "=", "field": "000001"})).unwrap();
        assert!(p.value.is_null());
    }

    #[test]
    fn parse_objective_field_one_or_many() {
        let m: ModelJson = serde_json::from_value(json!({"objective_field": "000004"})).unwrap();
        assert_eq!(m.objective_field, Some(vec!["000004".to_string()]));

        let m: ModelJson =
            serde_json::from_value(json!({"objective_fields": ["000004"]})).unwrap();
        assert_eq!(m.objective_field, Some(vec!["000004".to_string()]));
    }

    #[test]
    fn parse_max_bins_number_or_string() {
        let m: ModelJson = serde_json::from_value(json!({"max_bins": 16})).unwrap();
        assert_eq!(m.max_bins, Some(16));
        let m: ModelJson = serde_json::from_value(json!({"max_bins": "8"})).unwrap();
        assert_eq!(m.max_bins, Some(8));
    }

    #[test]
    fn parse_node_tree() {
        let node: NodeJson = serde_json::from_value(json!({
            "predicate": true,
            "output": "Iris-setosa",
            "count": 150,
            "objective_summary": {"categories": [["Iris-setosa", 50], ["Iris-virginica", 100]]},
            "children": [
                {"predicate": {"operator": "<", "field": "000002", "value": 2.45}, "output": "Iris-setosa"}
            ]
        }))
        .unwrap();
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.count, Some(150.0));
        let categories = node.objective_summary.unwrap().categories.unwrap();
        assert_eq!(categories[1], (json!("Iris-virginica"), 100.0));
    }

    #[test]
    fn envelope_is_unwrapped() {
        let inner = json!({"resource": "model/1", "status": {"code": 5}});
        let wrapped = json!({"code": 200, "object": inner.clone()});
        assert_eq!(unwrap_envelope(wrapped), inner);
        assert_eq!(unwrap_envelope(inner.clone()), inner);
    }
}
