//! Anomaly detector tests: scoring, cancellation and explanations.

mod common;

use std::thread;

use bigml_local::compat::ConversionError;
use bigml_local::inference::{PredictError, PredictOptions};
use bigml_local::model::Anomaly;
use bigml_local::InputRecord;
use rstest::rstest;
use serde_json::json;

use common::{assert_approx_eq, load_resource};

fn detector() -> Anomaly {
    Anomaly::from_value(load_resource("anomaly")).expect("anomaly detector loads")
}

fn by_name() -> PredictOptions {
    PredictOptions::builder().by_name(true).build()
}

#[test]
fn expected_depth_is_capped_by_training_depth() {
    // 2(γ + ln 63 − 63/64) ≈ 7.47 exceeds the stored mean depth
    let anomaly = detector();
    assert_eq!(anomaly.expected_mean_depth(), 6.0);
    assert_eq!(anomaly.forest().n_trees(), 2);
}

#[rstest]
#[case::deep_in_both(InputRecord::new().with("x", 1.5).with("kind", "a"), 3.0)]
#[case::shallow_in_both(InputRecord::new().with("x", 7.0).with("kind", "b"), 2.0)]
#[case::missing_kind(InputRecord::new().with("x", 7.0), 1.5)]
fn score_from_mean_depth(#[case] input: InputRecord, #[case] mean_depth: f64) {
    let score = detector().score(&input, &by_name()).unwrap();
    assert_approx_eq!(score, 2f64.powf(-mean_depth / 6.0), 1e-12);
    assert!(score > 0.0 && score <= 1.0);
}

#[test]
fn stop_cancels_and_unstop_restores() {
    let anomaly = detector();
    let input = InputRecord::new().with("x", 1.5).with("kind", "a");
    let fresh = detector().score(&input, &by_name()).unwrap();

    anomaly.stop();
    assert!(anomaly.is_stopped());
    assert_eq!(anomaly.score(&input, &by_name()), Err(PredictError::Cancelled));

    anomaly.unstop();
    assert_eq!(anomaly.score(&input, &by_name()), Ok(fresh));
}

#[test]
fn stop_from_another_thread() {
    let anomaly = detector();
    let token = anomaly.cancel_token();
    thread::spawn(move || token.stop()).join().unwrap();
    let input = InputRecord::new().with("x", 1.5);
    assert_eq!(anomaly.score(&input, &by_name()), Err(PredictError::Cancelled));
}

#[test]
fn explain_lists_paths_per_tree() {
    let input = InputRecord::new().with("x", 1.5).with("kind", "a");
    let paths = detector().explain(&input, &by_name()).unwrap();
    assert_eq!(paths.len(), 2);
    assert_eq!(paths[0].depth, 3);
    assert_eq!(paths[0].rules, vec!["x < 5".to_string(), "x < 2".to_string()]);
    assert_eq!(paths[1].depth, 3);
    assert_eq!(paths[1].rules, vec!["kind = a".to_string(), "x >= 1".to_string()]);
}

#[test]
fn top_anomalies_filter() {
    let anomaly = detector();
    assert_eq!(
        anomaly.anomalies_filter(true),
        r#"(or (and (= (f "000000") 7) (= (f "000001") "b")) (and (missing? "000000") (= (f "000001") "c")))"#
    );
    assert!(anomaly.anomalies_filter(false).starts_with("(not (or "));
}

#[test]
fn forest_without_trees_is_rejected() {
    let err = Anomaly::from_value(json!({
        "status": {"code": 5},
        "sample_size": 64,
        "model": {"fields": {}, "mean_depth": 6.0, "trees": []}
    }))
    .unwrap_err();
    assert!(matches!(err, ConversionError::EmptyForest), "got {err}");
}

#[test]
fn missing_sample_size_is_rejected() {
    let err = Anomaly::from_value(json!({
        "status": {"code": 5},
        "model": {"fields": {}, "mean_depth": 6.0, "trees": [{"root": {"predicates": true}}]}
    }))
    .unwrap_err();
    assert!(matches!(err, ConversionError::MissingKey(ref key) if key == "sample_size"), "got {err}");
}

#[rstest]
#[case::zero(json!(0.0))]
#[case::negative(json!(-3.0))]
fn non_positive_mean_depth_is_rejected(#[case] mean_depth: serde_json::Value) {
    let err = Anomaly::from_value(json!({
        "status": {"code": 5},
        "sample_size": 64,
        "model": {
            "fields": {"000000": {"name": "x", "optype": "numeric"}},
            "mean_depth": mean_depth,
            "trees": [{"root": {"predicates": [true]}}]
        }
    }))
    .unwrap_err();
    assert!(
        matches!(err, ConversionError::InvalidField { ref path, .. } if path == "model.mean_depth"),
        "got {err}"
    );
}
