//! Conversion from BigML JSON types to native representations.
//!
//! All malformed-model errors are raised here, at load time, with the path of
//! the offending element.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::data::{Field, FieldSet, FieldValue, Optype, TermAnalysis, TokenMode};
use crate::repr::{
    AnomalyNode, Centroid, CentroidSet, Condition, DecisionTree, Distribution, IsolationForest,
    NodeStats, Operator, Outcome, Predicate, PredicateValue, Predicates, TopAnomaly, TreeNode,
    DEFAULT_MAX_BINS,
};
use crate::utils::EULER_GAMMA;

use super::json::{
    AnomalyResourceJson, ClusterResourceJson, FieldJson, FieldsJson, ModelResourceJson, NodeJson,
    ObjectiveSummaryJson, PredicateJson, StatusJson,
};

/// Status code of a finished resource.
pub const FINISHED: i64 = 5;

/// Error type for BigML resource conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("invalid resource document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("resource is not finished (status code {code})")]
    NotReady { code: i64 },
    #[error("missing key `{0}`")]
    MissingKey(String),
    #[error("invalid field at `{path}`: {reason}")]
    InvalidField { path: String, reason: String },
    #[error("invalid predicate at `{path}`: {reason}")]
    InvalidPredicate { path: String, reason: String },
    #[error("invalid distribution at `{path}`: {reason}")]
    InvalidDistribution { path: String, reason: String },
    #[error("isolation forest has no trees")]
    EmptyForest,
    #[error("scale references unknown field `{0}`")]
    UnknownScaleField(String),
    #[error("ensemble member {index} is an unresolved model id `{id}`")]
    UnresolvedModel { index: usize, id: String },
    #[error("ensemble has no models")]
    EmptyEnsemble,
}

/// Require a present, finished status.
pub(crate) fn check_status(status: Option<&StatusJson>) -> Result<(), ConversionError> {
    let status = status.ok_or_else(|| ConversionError::MissingKey("status".into()))?;
    if status.code != FINISHED {
        return Err(ConversionError::NotReady { code: status.code });
    }
    Ok(())
}

// =============================================================================
// Fields
// =============================================================================

fn convert_field(id: &str, json: &FieldJson, path: &str) -> Result<Field, ConversionError> {
    let optype_name = json
        .optype
        .as_deref()
        .ok_or_else(|| ConversionError::MissingKey(format!("{path}.{id}.optype")))?;
    let optype = Optype::from_name(optype_name).ok_or_else(|| ConversionError::InvalidField {
        path: format!("{path}.{id}.optype"),
        reason: format!("unknown optype `{optype_name}`"),
    })?;

    let mut field = Field::new(id, json.name.clone().unwrap_or_else(|| id.to_owned()), optype);
    if let Some(analysis) = &json.term_analysis {
        let token_mode = match analysis.token_mode.as_deref() {
            None => None,
            Some(mode) => Some(TokenMode::from_name(mode).ok_or_else(|| {
                ConversionError::InvalidField {
                    path: format!("{path}.{id}.term_analysis.token_mode"),
                    reason: format!("unknown token mode `{mode}`"),
                }
            })?),
        };
        field.term_analysis = TermAnalysis {
            token_mode,
            case_sensitive: analysis.case_sensitive,
        };
    }
    if let Some(summary) = &json.summary {
        field.term_forms = summary.term_forms.clone();
        field.tag_cloud = summary.tag_cloud.clone();
    }
    field.item_separator = json.item_analysis.as_ref().and_then(|a| a.separator.clone());
    field.prefix = json.prefix.clone();
    field.suffix = json.suffix.clone();
    Ok(field)
}

/// Convert a `fields` map, sorted by id.
fn convert_fields(fields: &FieldsJson, path: &str) -> Result<Vec<Field>, ConversionError> {
    let mut ids: Vec<&String> = fields.keys().collect();
    ids.sort();
    ids.into_iter()
        .map(|id| convert_field(id, &fields[id], path))
        .collect()
}

/// `model_fields` enriched with the names and summaries of `fields`.
fn merge_model_fields(model_fields: &FieldsJson, fields: &FieldsJson) -> FieldsJson {
    model_fields
        .iter()
        .map(|(id, model_field)| {
            let mut merged = model_field.clone();
            if let Some(full) = fields.get(id) {
                merged.name = full.name.clone().or(merged.name);
                merged.optype = merged.optype.or_else(|| full.optype.clone());
                merged.summary = full.summary.clone().or(merged.summary);
                merged.term_analysis = merged.term_analysis.or_else(|| full.term_analysis.clone());
                merged.item_analysis = merged.item_analysis.or_else(|| full.item_analysis.clone());
            }
            (id.clone(), merged)
        })
        .collect()
}

// =============================================================================
// Predicates
// =============================================================================

fn convert_predicate_value(value: &Value, path: &str) -> Result<PredicateValue, ConversionError> {
    match value {
        Value::Null => Ok(PredicateValue::Null),
        Value::Number(n) => n.as_f64().map(PredicateValue::Number).ok_or_else(|| {
            ConversionError::InvalidPredicate {
                path: path.to_owned(),
                reason: format!("value {n} is not representable"),
            }
        }),
        Value::String(s) => Ok(PredicateValue::Text(s.clone())),
        Value::Bool(b) => Ok(PredicateValue::Text(b.to_string())),
        Value::Array(items) => items
            .iter()
            .map(|v| convert_predicate_value(v, path))
            .collect::<Result<_, _>>()
            .map(PredicateValue::Set),
        Value::Object(_) => Err(ConversionError::InvalidPredicate {
            path: path.to_owned(),
            reason: "value must be a scalar or a list".into(),
        }),
    }
}

fn convert_predicate(value: &Value, path: &str) -> Result<Predicate, ConversionError> {
    match value {
        // `true` and the legacy "TRUE" string are the root sentinel
        Value::Bool(true) | Value::String(_) => Ok(Predicate::True),
        Value::Object(_) => {
            let json: PredicateJson =
                serde_json::from_value(value.clone()).map_err(|err| {
                    ConversionError::InvalidPredicate {
                        path: path.to_owned(),
                        reason: err.to_string(),
                    }
                })?;
            let (operator, missing) =
                Operator::parse(&json.operator).ok_or_else(|| ConversionError::InvalidPredicate {
                    path: path.to_owned(),
                    reason: format!("unknown operator `{}`", json.operator),
                })?;
            let value = convert_predicate_value(&json.value, path)?;
            if json.term.is_some() && !matches!(value, PredicateValue::Number(_)) {
                return Err(ConversionError::InvalidPredicate {
                    path: path.to_owned(),
                    reason: "term predicates need a numeric count".into(),
                });
            }
            Ok(Predicate::Condition(Condition {
                operator,
                field: json.field,
                value,
                term: json.term,
                missing,
            }))
        }
        other => Err(ConversionError::InvalidPredicate {
            path: path.to_owned(),
            reason: format!("unexpected predicate {other}"),
        }),
    }
}

fn convert_predicates(node: &NodeJson, path: &str) -> Result<Predicates, ConversionError> {
    if let Some(list) = &node.predicates {
        return match list {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| convert_predicate(item, &format!("{path}.predicates[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Predicates),
            single => Ok(Predicates(vec![convert_predicate(
                single,
                &format!("{path}.predicates"),
            )?])),
        };
    }
    match &node.predicate {
        Some(single) => Ok(Predicates(vec![convert_predicate(
            single,
            &format!("{path}.predicate"),
        )?])),
        None => Err(ConversionError::MissingKey(format!("{path}.predicate"))),
    }
}

// =============================================================================
// Decision trees
// =============================================================================

fn category_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn convert_distribution(
    summary: Option<&ObjectiveSummaryJson>,
    regression: bool,
    path: &str,
) -> Result<Distribution, ConversionError> {
    let Some(summary) = summary else {
        return Ok(if regression {
            Distribution::Numeric(Vec::new())
        } else {
            Distribution::Categorical(Vec::new())
        });
    };
    if let Some(categories) = &summary.categories {
        if regression {
            return Err(ConversionError::InvalidDistribution {
                path: path.to_owned(),
                reason: "categories in a regression tree".into(),
            });
        }
        return categories
            .iter()
            .map(|(key, count)| {
                category_key(key).map(|k| (k, *count)).ok_or_else(|| {
                    ConversionError::InvalidDistribution {
                        path: path.to_owned(),
                        reason: format!("category {key} is not a scalar"),
                    }
                })
            })
            .collect::<Result<_, _>>()
            .map(Distribution::Categorical);
    }
    let bins = summary.bins.as_ref().or(summary.counts.as_ref());
    match (bins, regression) {
        (Some(bins), true) => {
            let mut bins = bins.clone();
            bins.sort_by(|a, b| a.0.total_cmp(&b.0));
            Ok(Distribution::Numeric(bins))
        }
        (Some(_), false) => Err(ConversionError::InvalidDistribution {
            path: path.to_owned(),
            reason: "numeric bins in a classification tree".into(),
        }),
        (None, true) => Ok(Distribution::Numeric(Vec::new())),
        (None, false) => Ok(Distribution::Categorical(Vec::new())),
    }
}

fn convert_output(value: &Value, regression: bool, path: &str) -> Result<Outcome, ConversionError> {
    match (value, regression) {
        (Value::Number(n), true) => n.as_f64().map(Outcome::Value).ok_or_else(|| {
            ConversionError::InvalidDistribution {
                path: path.to_owned(),
                reason: format!("output {n} is not representable"),
            }
        }),
        (Value::Null, _) => Err(ConversionError::MissingKey(path.to_owned())),
        (other, false) => category_key(other).map(Outcome::Category).ok_or_else(|| {
            ConversionError::InvalidDistribution {
                path: path.to_owned(),
                reason: "output must be a scalar".into(),
            }
        }),
        (other, true) => Err(ConversionError::InvalidDistribution {
            path: path.to_owned(),
            reason: format!("regression output {other} is not a number"),
        }),
    }
}

fn convert_node(node: &NodeJson, regression: bool, path: &str) -> Result<TreeNode, ConversionError> {
    let predicates = convert_predicates(node, path)?;
    let output = convert_output(&node.output, regression, &format!("{path}.output"))?;
    let summary = node.objective_summary.as_ref();
    let distribution =
        convert_distribution(summary, regression, &format!("{path}.objective_summary"))?;
    let count = node.count.unwrap_or_else(|| distribution.total());
    let stats = summary
        .map(|s| NodeStats {
            median: s.median,
            minimum: s.minimum,
            maximum: s.maximum,
        })
        .unwrap_or_default();
    let children = node
        .children
        .iter()
        .enumerate()
        .map(|(i, child)| convert_node(child, regression, &format!("{path}.children[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TreeNode {
        predicates,
        output,
        distribution,
        count,
        confidence: node.confidence,
        stats,
        children,
    })
}

impl ModelResourceJson {
    /// Convert to a native [`DecisionTree`].
    pub fn to_tree(&self) -> Result<DecisionTree, ConversionError> {
        check_status(self.status.as_ref())?;
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| ConversionError::MissingKey("model".into()))?;
        let root = model
            .root
            .as_ref()
            .ok_or_else(|| ConversionError::MissingKey("model.root".into()))?;

        let (fields_json, fields_path) = match &model.model_fields {
            Some(model_fields) => (merge_model_fields(model_fields, &model.fields), "model.model_fields"),
            None => (model.fields.clone(), "model.fields"),
        };
        let fields = convert_fields(&fields_json, fields_path)?;

        let objective_id = model
            .objective_field
            .as_ref()
            .or(self.objective_field.as_ref())
            .and_then(|ids| ids.first().cloned());
        let regression = match objective_id.as_deref().and_then(|id| {
            fields.iter().find(|f| f.id == id)
        }) {
            Some(objective) => objective.optype.is_numeric(),
            None => root.output.is_number(),
        };

        let root = convert_node(root, regression, "model.root")?;
        let mut field_set = FieldSet::new(fields, objective_id);
        if let Some(tokens) = &model.missing_tokens {
            field_set = field_set.with_missing_tokens(tokens.clone());
        }

        let tree = DecisionTree {
            fields: field_set,
            root,
            max_bins: model.max_bins.unwrap_or(DEFAULT_MAX_BINS),
            locale: self.locale.clone(),
            resource: self.resource.clone(),
        };
        tracing::debug!(
            resource = tree.resource.as_deref().unwrap_or("-"),
            nodes = tree.n_nodes(),
            fields = tree.fields.len(),
            regression = tree.is_regression(),
            "loaded decision tree"
        );
        Ok(tree)
    }
}

// =============================================================================
// Isolation forests
// =============================================================================

fn convert_anomaly_node(node: &NodeJson, path: &str) -> Result<AnomalyNode, ConversionError> {
    let predicates = convert_predicates(node, path)?;
    let children = node
        .children
        .iter()
        .enumerate()
        .map(|(i, child)| convert_anomaly_node(child, &format!("{path}.children[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AnomalyNode {
        predicates,
        children,
    })
}

/// Expected isolation depth for a training sample of `sample_size` rows,
/// capped by the depth observed at training time.
pub fn expected_mean_depth(mean_depth: f64, sample_size: f64) -> f64 {
    let n = sample_size;
    let default_depth = 2.0 * (EULER_GAMMA + (n - 1.0).ln() - (n - 1.0) / n);
    mean_depth.min(default_depth)
}

impl AnomalyResourceJson {
    /// Convert to a native [`IsolationForest`].
    pub fn to_forest(&self) -> Result<IsolationForest, ConversionError> {
        check_status(self.status.as_ref())?;
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| ConversionError::MissingKey("model".into()))?;
        let trees_json = model
            .trees
            .as_ref()
            .ok_or_else(|| ConversionError::MissingKey("model.trees".into()))?;
        if trees_json.is_empty() {
            return Err(ConversionError::EmptyForest);
        }
        let sample_size = self
            .sample_size
            .ok_or_else(|| ConversionError::MissingKey("sample_size".into()))?;
        if sample_size < 2.0 {
            return Err(ConversionError::InvalidField {
                path: "sample_size".into(),
                reason: format!("need at least 2 samples, got {sample_size}"),
            });
        }
        let mean_depth = model
            .mean_depth
            .ok_or_else(|| ConversionError::MissingKey("model.mean_depth".into()))?;
        if !(mean_depth.is_finite() && mean_depth > 0.0) {
            return Err(ConversionError::InvalidField {
                path: "model.mean_depth".into(),
                reason: format!("must be a positive depth, got {mean_depth}"),
            });
        }

        let trees = trees_json
            .iter()
            .enumerate()
            .map(|(i, tree)| convert_anomaly_node(&tree.root, &format!("model.trees[{i}].root")))
            .collect::<Result<Vec<_>, _>>()?;
        let fields = FieldSet::new(convert_fields(&model.fields, "model.fields")?, None);

        let forest = IsolationForest {
            fields,
            trees,
            sample_size,
            mean_depth,
            expected_mean_depth: expected_mean_depth(mean_depth, sample_size),
            input_fields: self.input_fields.clone(),
            top_anomalies: model
                .top_anomalies
                .iter()
                .map(|a| TopAnomaly {
                    row: a.row.clone(),
                    score: a.score,
                })
                .collect(),
            resource: self.resource.clone(),
        };
        tracing::debug!(
            resource = forest.resource.as_deref().unwrap_or("-"),
            trees = forest.n_trees(),
            sample_size,
            expected_mean_depth = forest.expected_mean_depth,
            "loaded isolation forest"
        );
        Ok(forest)
    }
}

// =============================================================================
// Clusters
// =============================================================================

fn convert_center_value(
    value: &Value,
    field: &Field,
    path: &str,
) -> Result<Option<FieldValue>, ConversionError> {
    let converted = match (field.optype, value) {
        (_, Value::Null) => None,
        (Optype::Numeric, Value::Number(n)) => n.as_f64().map(FieldValue::Number),
        (Optype::Text | Optype::Items, Value::String(s)) => {
            Some(FieldValue::Terms(vec![s.clone()]))
        }
        (_, other) => FieldValue::from_json(other),
    };
    match converted {
        Some(FieldValue::Number(_)) if !field.optype.is_numeric() => {
            Err(ConversionError::InvalidField {
                path: path.to_owned(),
                reason: "numeric center for a non-numeric field".into(),
            })
        }
        Some(FieldValue::Text(_) | FieldValue::Terms(_)) if field.optype.is_numeric() => {
            Err(ConversionError::InvalidField {
                path: path.to_owned(),
                reason: "non-numeric center for a numeric field".into(),
            })
        }
        converted => Ok(converted),
    }
}

impl ClusterResourceJson {
    /// Convert to a native [`CentroidSet`].
    ///
    /// Summary fields are removed from the field set, the scales and the
    /// centers; every remaining nonzero scale must name a known field.
    pub fn to_centroids(&self) -> Result<CentroidSet, ConversionError> {
        check_status(self.status.as_ref())?;
        let clusters = self
            .clusters
            .as_ref()
            .ok_or_else(|| ConversionError::MissingKey("clusters".into()))?;

        let mut fields_json = clusters.fields.clone();
        for summary_field in &self.summary_fields {
            fields_json.remove(summary_field);
        }
        let fields = FieldSet::new(convert_fields(&fields_json, "clusters.fields")?, None);

        let mut scales: HashMap<String, f64> = HashMap::new();
        for (id, scale) in &self.scales {
            if self.summary_fields.contains(id) {
                continue;
            }
            if *scale != 0.0 && !fields.contains(id) {
                return Err(ConversionError::UnknownScaleField(id.clone()));
            }
            scales.insert(id.clone(), *scale);
        }

        let centroids = clusters
            .clusters
            .iter()
            .enumerate()
            .map(|(i, centroid)| {
                let mut center = BTreeMap::new();
                for (id, value) in &centroid.center {
                    let Some(field) = fields.get(id) else {
                        continue;
                    };
                    let path = format!("clusters.clusters[{i}].center.{id}");
                    if let Some(value) = convert_center_value(value, field, &path)? {
                        center.insert(id.clone(), value);
                    }
                }
                Ok::<_, ConversionError>(Centroid {
                    id: centroid.id.clone(),
                    name: centroid.name.clone().unwrap_or_else(|| centroid.id.clone()),
                    center,
                    count: centroid.count.unwrap_or(0.0),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let set = CentroidSet {
            fields,
            centroids,
            scales,
            resource: self.resource.clone(),
        };
        tracing::debug!(
            resource = set.resource.as_deref().unwrap_or("-"),
            centroids = set.len(),
            fields = set.fields.len(),
            "loaded cluster"
        );
        Ok(set)
    }
}
