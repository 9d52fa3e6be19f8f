//! Test case loading utilities for integration tests.
//!
//! This module provides helpers for loading resource fixtures from JSON files.
//! For assertion helpers, use `bigml_local::testing`.

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};

use serde_json::Value;

// Re-export testing utilities for convenience
#[allow(unused_imports)]
pub use bigml_local::assert_approx_eq;
#[allow(unused_imports)]
pub use bigml_local::testing::{assert_distribution_eq, DEFAULT_TOLERANCE};

// =============================================================================
// Test Case Loading
// =============================================================================

/// Base directory for test cases.
pub fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/test-cases")
}

/// Directory for BigML resource fixtures.
pub fn bigml_test_cases_dir() -> PathBuf {
    test_cases_dir().join("bigml")
}

/// Load a JSON file as a raw value.
pub fn load_json(path: &Path) -> Value {
    let file =
        File::open(path).unwrap_or_else(|e| panic!("Failed to open {}: {e}", path.display()));
    serde_json::from_reader(file)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {e}", path.display()))
}

/// Load the fixture `tests/test-cases/bigml/{name}.json`.
pub fn load_resource(name: &str) -> Value {
    load_json(&bigml_test_cases_dir().join(format!("{name}.json")))
}

/// Read the fixture `tests/test-cases/bigml/{name}.json` as text.
pub fn read_resource(name: &str) -> String {
    let path = bigml_test_cases_dir().join(format!("{name}.json"));
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()))
}
