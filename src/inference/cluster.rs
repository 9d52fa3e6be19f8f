//! Nearest-centroid search.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::data::{Field, FieldValue, InputRecord, Optype, TokenMode};
use crate::repr::{Centroid, CentroidSet};

use super::{CentroidMatch, PredictError};

static TERM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\b|_)([^_\s]+?)(?:\b|_)").expect("static pattern"));

/// Default separator of items fields.
const ITEM_SEPARATOR: &str = ",";

/// Word tokens of `text`, lowercased unless case sensitive.
pub fn parse_terms(text: &str, case_sensitive: bool) -> Vec<String> {
    TERM_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| {
            if case_sensitive {
                m.as_str().to_owned()
            } else {
                m.as_str().to_lowercase()
            }
        })
        .collect()
}

/// Terms of a text input restricted to the field's vocabulary.
///
/// Terms come from tokenizing (unless full terms only) plus the whole string
/// (unless tokens only). Synonym forms map back to their term; only terms of
/// the tag cloud, or registered forms, are kept.
pub fn unique_terms(field: &Field, text: &str) -> Vec<String> {
    let case_sensitive = field.term_analysis.case_sensitive();
    let mode = field.term_analysis.token_mode.unwrap_or(TokenMode::All);
    let mut terms = if mode == TokenMode::FullTermsOnly {
        Vec::new()
    } else {
        parse_terms(text, case_sensitive)
    };
    if mode != TokenMode::TokensOnly {
        terms.push(if case_sensitive {
            text.to_owned()
        } else {
            text.to_lowercase()
        });
    }

    let mut unique: Vec<String> = Vec::new();
    for term in &terms {
        let kept = if field.tag_cloud.iter().any(|t| t == term) {
            Some(term.as_str())
        } else if field.term_forms.contains_key(term) {
            Some(term.as_str())
        } else {
            let canonical = field.canonical_term(term);
            (canonical != term.as_str()).then_some(canonical)
        };
        if let Some(kept) = kept {
            if !unique.iter().any(|u| u == kept) {
                unique.push(kept.to_owned());
            }
        }
    }
    unique
}

/// Terms of a text or items input value.
fn input_terms(field: &Field, value: &FieldValue) -> Vec<String> {
    match (field.optype, value) {
        (Optype::Items, FieldValue::Text(text)) => {
            let separator = field.item_separator.as_deref().unwrap_or(ITEM_SEPARATOR);
            text.split(separator)
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_owned)
                .collect()
        }
        (_, FieldValue::Text(text)) => unique_terms(field, text),
        (_, FieldValue::Terms(terms)) => terms.clone(),
        (_, FieldValue::Number(n)) => vec![n.to_string()],
    }
}

/// Squared cosine distance between two term sets, scaled.
pub fn cosine_distance2(terms: &[String], centroid_terms: &[String], scale: f64) -> f64 {
    if terms.is_empty() && centroid_terms.is_empty() {
        return 0.0;
    }
    if terms.is_empty() || centroid_terms.is_empty() {
        return scale * scale;
    }
    let shared = centroid_terms.iter().filter(|t| terms.contains(t)).count();
    let similarity = shared as f64 / ((terms.len() * centroid_terms.len()) as f64).sqrt();
    let distance = scale * (1.0 - similarity);
    distance * distance
}

/// Squared distance to `centroid`, or `None` once it reaches `stop`.
fn distance2(
    set: &CentroidSet,
    centroid: &Centroid,
    input: &InputRecord,
    terms: &HashMap<&str, Vec<String>>,
    stop: f64,
) -> Option<f64> {
    let mut total = 0.0;
    for (id, center) in &centroid.center {
        let Some(field) = set.fields.get(id) else {
            continue;
        };
        let scale = set.scale(id);
        total += match (field.optype, center) {
            (Optype::Numeric, FieldValue::Number(c)) => match input.get(id) {
                Some(FieldValue::Number(x)) => ((x - c) * scale).powi(2),
                _ => f64::NAN,
            },
            (Optype::Text | Optype::Items, FieldValue::Terms(center_terms)) => {
                let input_terms = terms.get(id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
                cosine_distance2(input_terms, center_terms, scale)
            }
            (Optype::Categorical, center) => match input.get(id) {
                Some(value) if value == center => 0.0,
                _ => scale * scale,
            },
            _ => 0.0,
        };
        if !(total < stop) {
            return None;
        }
    }
    Some(total)
}

/// Nearest centroid to a resolved input.
///
/// Every field that is neither categorical nor text must be present. A
/// centroid whose distance is not finite is skipped.
pub fn nearest(set: &CentroidSet, input: &InputRecord) -> Result<CentroidMatch, PredictError> {
    if let Some(missing) = set
        .fields
        .iter()
        .find(|f| !matches!(f.optype, Optype::Categorical | Optype::Text) && !input.contains_key(&f.id))
    {
        return Err(PredictError::MissingInputField(missing.name.clone()));
    }

    let terms: HashMap<&str, Vec<String>> = set
        .fields
        .iter()
        .filter(|f| matches!(f.optype, Optype::Text | Optype::Items))
        .filter_map(|f| input.get(&f.id).map(|v| (f.id.as_str(), input_terms(f, v))))
        .collect();

    let mut best: Option<(&Centroid, f64)> = None;
    for centroid in &set.centroids {
        let stop = best.map_or(f64::INFINITY, |(_, d)| d);
        match distance2(set, centroid, input, &terms, stop) {
            Some(d) if d.is_finite() => {
                tracing::trace!(centroid = %centroid.id, distance2 = d, "centroid distance");
                best = Some((centroid, d));
            }
            _ => {}
        }
    }

    best.map(|(centroid, d)| CentroidMatch {
        id: centroid.id.clone(),
        name: centroid.name.clone(),
        distance: d.sqrt(),
    })
    .ok_or(PredictError::NoCentroid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FieldSet, TermAnalysis};
    use std::collections::BTreeMap;

    fn text_field(mode: TokenMode) -> Field {
        Field::new("000001", "tag", Optype::Text)
            .with_term_analysis(TermAnalysis {
                token_mode: Some(mode),
                case_sensitive: Some(false),
            })
            .with_tag_cloud(vec!["machine learning".into(), "machine".into(), "data".into()])
    }

    fn centroid(id: &str, x: f64, tags: &[&str]) -> Centroid {
        let mut center = BTreeMap::new();
        center.insert("000000".to_string(), FieldValue::Number(x));
        center.insert(
            "000001".to_string(),
            FieldValue::Terms(tags.iter().map(|t| t.to_string()).collect()),
        );
        Centroid {
            id: id.into(),
            name: format!("Cluster {id}"),
            center,
            count: 10.0,
        }
    }

    fn set(mode: TokenMode) -> CentroidSet {
        CentroidSet {
            fields: FieldSet::new(
                [Field::new("000000", "x", Optype::Numeric), text_field(mode)],
                None,
            ),
            centroids: vec![
                centroid("000000", 0.0, &["machine learning"]),
                centroid("000001", 0.0, &["machine"]),
            ],
            scales: [("000000".to_string(), 1.0), ("000001".to_string(), 2.0)]
                .into_iter()
                .collect(),
            resource: None,
        }
    }

    #[test]
    fn parse_terms_splits_words() {
        assert_eq!(parse_terms("Hello big World", false), vec!["hello", "big", "world"]);
        assert_eq!(parse_terms("Hello", true), vec!["Hello"]);
    }

    #[test]
    fn full_terms_only_keeps_whole_string() {
        let field = text_field(TokenMode::FullTermsOnly);
        assert_eq!(unique_terms(&field, "Machine Learning"), vec!["machine learning"]);
        assert!(unique_terms(&field, "machine learning rocks").is_empty());
    }

    #[test]
    fn all_mode_keeps_tokens_and_whole_string() {
        let field = text_field(TokenMode::All);
        assert_eq!(
            unique_terms(&field, "machine learning"),
            vec!["machine", "machine learning"]
        );
    }

    #[test]
    fn cosine_distance_edge_cases() {
        let a = vec!["x".to_string()];
        assert_eq!(cosine_distance2(&[], &[], 2.0), 0.0);
        assert_eq!(cosine_distance2(&a, &[], 2.0), 4.0);
        assert_eq!(cosine_distance2(&a, &a, 2.0), 0.0);
    }

    #[test]
    fn full_term_match_is_exact_not_substring() {
        let set = set(TokenMode::FullTermsOnly);
        let exact = InputRecord::new()
            .with("000000", 0.0)
            .with("000001", "MACHINE LEARNING");
        let found = nearest(&set, &exact).unwrap();
        assert_eq!(found.id, "000000");
        assert_eq!(found.distance, 0.0);

        // "machine" is a substring of the input but never a full-term match
        let longer = InputRecord::new()
            .with("000000", 0.0)
            .with("000001", "machine learning course");
        let found = nearest(&set, &longer).unwrap();
        assert_eq!(found.id, "000000");
        assert_eq!(found.distance, 2.0);
    }

    #[test]
    fn numeric_fields_are_mandatory() {
        let set = set(TokenMode::All);
        let input = InputRecord::new().with("000001", "data");
        assert_eq!(
            nearest(&set, &input),
            Err(PredictError::MissingInputField("x".into()))
        );
    }

    #[test]
    fn text_fields_are_optional() {
        let set = set(TokenMode::All);
        let found = nearest(&set, &InputRecord::new().with("000000", 1.0)).unwrap();
        // both centroids are at sqrt(1 + 4); the first one wins
        assert_eq!(found.id, "000000");
        assert!((found.distance - 5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn non_finite_centroid_is_skipped() {
        let mut set = set(TokenMode::All);
        set.centroids[0]
            .center
            .insert("000000".into(), FieldValue::Number(f64::INFINITY));
        let found = nearest(&set, &InputRecord::new().with("000000", 0.0)).unwrap();
        assert_eq!(found.id, "000001");
    }
}
