//! Ensemble prediction tests: loading, fan-out and vote combination.

mod common;

use bigml_local::compat::ConversionError;
use bigml_local::inference::{CombinationMethod, PredictError, PredictOptions};
use bigml_local::model::{Ensemble, Model};
use bigml_local::utils::{wilson_score, DEFAULT_Z};
use bigml_local::InputRecord;
use rstest::rstest;
use serde_json::json;

use common::{assert_approx_eq, load_resource};

fn ensemble() -> Ensemble {
    Ensemble::from_value(load_resource("ensemble")).expect("ensemble loads")
}

fn options(method: CombinationMethod) -> PredictOptions {
    PredictOptions::builder().by_name(true).method(method).build()
}

fn x(value: f64) -> InputRecord {
    InputRecord::new().with("x", value)
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn loads_embedded_members() {
    let ensemble = ensemble();
    assert_eq!(ensemble.len(), 3);
    assert!(!ensemble.is_regression());
    assert_eq!(ensemble.resource(), Some("ensemble/5143a51a37203f2cf7020351"));
}

#[test]
fn member_ids_cannot_be_resolved_locally() {
    let err = Ensemble::from_value(json!({"models": ["model/5143a51a37203f2cf7000972"]}))
        .unwrap_err();
    assert!(
        matches!(err, ConversionError::UnresolvedModel { index: 0, ref id } if id == "model/5143a51a37203f2cf7000972"),
        "got {err}"
    );
}

#[test]
fn empty_ensemble_is_rejected() {
    let err = Ensemble::from_value(json!({"models": []})).unwrap_err();
    assert!(matches!(err, ConversionError::EmptyEnsemble), "got {err}");
}

#[test]
fn unfinished_ensemble_is_rejected() {
    let err = Ensemble::from_value(json!({"status": {"code": 3}, "models": []})).unwrap_err();
    assert!(matches!(err, ConversionError::NotReady { code: 3 }), "got {err}");
}

// =============================================================================
// Combination
// =============================================================================

#[test]
fn plurality_counts_votes() {
    // members vote b, a, b; merged distribution a: 6, b: 10
    let prediction = ensemble()
        .predict(&x(1.5), &options(CombinationMethod::Plurality))
        .unwrap();
    assert_eq!(prediction.category(), Some("b"));
    let expected = wilson_score(10.0 / 16.0, 16.0, DEFAULT_Z);
    assert_approx_eq!(prediction.confidence.unwrap(), expected, 1e-12);
}

#[test]
fn probability_weighted_sums_probabilities() {
    // a: 5/6 + 1/6, b: 1 + 1/6 + 5/6
    let prediction = ensemble()
        .predict(&x(1.5), &options(CombinationMethod::ProbabilityWeighted))
        .unwrap();
    assert_eq!(prediction.category(), Some("b"));
    assert_approx_eq!(prediction.confidence.unwrap(), 2.0 / 3.0, 1e-12);
}

#[test]
fn confidence_weighted_averages_agreeing_votes() {
    let prediction = ensemble()
        .predict(&x(1.5), &options(CombinationMethod::ConfidenceWeighted))
        .unwrap();
    assert_eq!(prediction.category(), Some("b"));
    let c1 = wilson_score(1.0, 4.0, DEFAULT_Z);
    let c3 = wilson_score(5.0 / 6.0, 6.0, DEFAULT_Z);
    let expected = (c1 * c1 + c3 * c3) / (c1 + c3);
    assert_approx_eq!(prediction.confidence.unwrap(), expected, 1e-12);
}

#[test]
fn unanimous_vote() {
    let prediction = ensemble()
        .predict(&x(0.2), &options(CombinationMethod::Plurality))
        .unwrap();
    assert_eq!(prediction.category(), Some("a"));
}

#[test]
fn plurality_tie_goes_to_first_member() {
    let members = ensemble().models().to_vec();
    let pair = Ensemble::from_models(vec![members[0].clone(), members[2].clone()]).unwrap();
    // first member votes a, second votes b
    let prediction = pair
        .predict(&x(0.8), &options(CombinationMethod::Plurality))
        .unwrap();
    assert_eq!(prediction.category(), Some("a"));
}

// =============================================================================
// Fan-out
// =============================================================================

#[rstest]
#[case::auto(0, 1)]
#[case::sequential(1, 1)]
#[case::two_threads(2, 1)]
#[case::batched(2, 2)]
#[case::single_batch(0, 10)]
fn votes_do_not_depend_on_threads_or_batches(#[case] n_threads: usize, #[case] max_models: usize) {
    let reference = ensemble()
        .votes(&x(1.5), &PredictOptions::builder().by_name(true).n_threads(1).build())
        .unwrap();
    let options = PredictOptions::builder()
        .by_name(true)
        .n_threads(n_threads)
        .build();
    let votes = ensemble()
        .with_max_models(max_models)
        .votes(&x(1.5), &options)
        .unwrap();
    assert_eq!(votes, reference);
    let predicted: Vec<_> = votes
        .votes()
        .iter()
        .map(|v| v.prediction.as_category().unwrap().to_owned())
        .collect();
    assert_eq!(predicted, vec!["b", "a", "b"]);
}

#[test]
fn empty_input_is_rejected() {
    assert_eq!(
        ensemble().predict(&InputRecord::new(), &PredictOptions::default()),
        Err(PredictError::EmptyInput)
    );
}

#[test]
fn single_member_matches_model() {
    let member: Model = ensemble().models()[1].clone();
    let alone = Ensemble::from_models(vec![member.clone()]).unwrap();
    let options = options(CombinationMethod::Plurality);
    let combined = alone.predict(&x(1.5), &options).unwrap();
    let single = member.predict(&x(1.5), &options).unwrap();
    assert_eq!(combined.category(), single.category());
    assert_approx_eq!(combined.confidence.unwrap(), single.confidence.unwrap(), 1e-12);
}
