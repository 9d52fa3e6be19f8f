//! Anomaly detector (isolation forest).

use serde_json::Value;

use crate::compat::bigml::{AnomalyResourceJson, ConversionError};
use crate::data::{FieldSet, InputRecord};
use crate::inference::{anomaly, CancelToken, PredictError, PredictOptions};
use crate::repr::IsolationForest;

use super::resolve_input;

/// Depth of an input in one tree of the forest, with the traversed rules.
#[derive(Debug, Clone, PartialEq)]
pub struct TreePath {
    pub depth: usize,
    pub rules: Vec<String>,
}

/// A loaded anomaly detector.
///
/// Scoring is read-only except for the detector's [`CancelToken`]: a call to
/// [`Anomaly::stop`] makes in-flight and later scores fail with
/// [`PredictError::Cancelled`] until [`Anomaly::unstop`] is called.
#[derive(Debug, Clone)]
pub struct Anomaly {
    forest: IsolationForest,
    token: CancelToken,
}

impl Anomaly {
    pub fn new(forest: IsolationForest) -> Self {
        Self {
            forest,
            token: CancelToken::new(),
        }
    }

    /// Parse an anomaly detector resource from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConversionError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> Result<Self, ConversionError> {
        let resource = AnomalyResourceJson::from_value(value)?;
        Ok(Self::new(resource.to_forest()?))
    }

    pub fn forest(&self) -> &IsolationForest {
        &self.forest
    }

    pub fn fields(&self) -> &FieldSet {
        &self.forest.fields
    }

    pub fn expected_mean_depth(&self) -> f64 {
        self.forest.expected_mean_depth
    }

    /// Token observed by [`Anomaly::score`]; clones share the flag.
    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn stop(&self) {
        self.token.stop();
    }

    pub fn unstop(&self) {
        self.token.unstop();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_stopped()
    }

    /// Anomaly score of `input` in (0, 1]; higher is more anomalous.
    pub fn score(&self, input: &InputRecord, options: &PredictOptions) -> Result<f64, PredictError> {
        self.score_with_token(input, options, &self.token)
    }

    /// [`Anomaly::score`] observing a caller supplied token instead of the
    /// detector's own.
    pub fn score_with_token(
        &self,
        input: &InputRecord,
        options: &PredictOptions,
        token: &CancelToken,
    ) -> Result<f64, PredictError> {
        let resolved = resolve_input(&self.forest.fields, input, options.by_name)?;
        anomaly::score(&self.forest, &resolved, token)
    }

    /// Per-tree depth of `input` together with the rules of its path.
    pub fn explain(
        &self,
        input: &InputRecord,
        options: &PredictOptions,
    ) -> Result<Vec<TreePath>, PredictError> {
        let resolved = resolve_input(&self.forest.fields, input, options.by_name)?;
        Ok(self
            .forest
            .trees
            .iter()
            .map(|root| {
                let (depth, rules) = anomaly::depth_with_path(root, &resolved, &self.forest.fields);
                TreePath { depth, rules }
            })
            .collect())
    }

    /// Filter expression selecting the rows of the top anomalies, or
    /// excluding them when `include` is false.
    ///
    /// Row values are matched against `input_fields` by position; a null
    /// value is rendered as a missing check. Empty when the model lists no
    /// top anomalies.
    pub fn anomalies_filter(&self, include: bool) -> String {
        let rows: Vec<String> = self
            .forest
            .top_anomalies
            .iter()
            .filter_map(|anomaly| {
                let clauses: Vec<String> = self
                    .forest
                    .input_fields
                    .iter()
                    .zip(&anomaly.row)
                    .filter_map(|(id, value)| field_clause(id, value))
                    .collect();
                (!clauses.is_empty()).then(|| format!("(and {})", clauses.join(" ")))
            })
            .collect();
        if rows.is_empty() {
            return String::new();
        }
        let any = format!("(or {})", rows.join(" "));
        if include {
            any
        } else {
            format!("(not {any})")
        }
    }
}

fn field_clause(id: &str, value: &Value) -> Option<String> {
    let field = Value::String(id.to_owned());
    match value {
        Value::Null => Some(format!("(missing? {field})")),
        Value::Number(n) => Some(format!("(= (f {field}) {n})")),
        Value::String(_) => Some(format!("(= (f {field}) {value})")),
        Value::Bool(b) => Some(format!("(= (f {field}) \"{b}\")")),
        Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Field, Optype};
    use crate::repr::{AnomalyNode, Predicates, TopAnomaly};
    use serde_json::json;

    fn detector(top: Vec<TopAnomaly>) -> Anomaly {
        Anomaly::new(IsolationForest {
            fields: FieldSet::new(
                [
                    Field::new("000000", "x", Optype::Numeric),
                    Field::new("000001", "kind", Optype::Categorical),
                ],
                None,
            ),
            trees: vec![AnomalyNode::leaf(Predicates::always())],
            sample_size: 16.0,
            mean_depth: 4.0,
            expected_mean_depth: 4.0,
            input_fields: vec!["000000".into(), "000001".into()],
            top_anomalies: top,
            resource: None,
        })
    }

    #[test]
    fn filter_includes_and_excludes_rows() {
        let anomaly = detector(vec![
            TopAnomaly {
                row: vec![json!(1.5), json!("a")],
                score: 0.7,
            },
            TopAnomaly {
                row: vec![json!(null), json!("b")],
                score: 0.6,
            },
        ]);
        let include = anomaly.anomalies_filter(true);
        assert_eq!(
            include,
            r#"(or (and (= (f "000000") 1.5) (= (f "000001") "a")) (and (missing? "000000") (= (f "000001") "b")))"#
        );
        assert_eq!(anomaly.anomalies_filter(false), format!("(not {include})"));
    }

    #[test]
    fn filter_is_empty_without_top_anomalies() {
        assert_eq!(detector(Vec::new()).anomalies_filter(true), "");
    }

    #[test]
    fn empty_input_is_rejected() {
        let anomaly = detector(Vec::new());
        assert_eq!(
            anomaly.score(&InputRecord::new(), &PredictOptions::default()),
            Err(PredictError::EmptyInput)
        );
    }

    #[test]
    fn shared_token_stops_scoring() {
        let anomaly = detector(Vec::new());
        let input = InputRecord::new().with("000000", 1.0);
        let options = PredictOptions::default();
        anomaly.cancel_token().stop();
        assert!(anomaly.is_stopped());
        assert_eq!(anomaly.score(&input, &options), Err(PredictError::Cancelled));
        // a separate token is unaffected
        let own = CancelToken::new();
        assert!(anomaly.score_with_token(&input, &options, &own).is_ok());
    }
}
