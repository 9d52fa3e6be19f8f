//! BigML JSON resource format support.
//!
//! This module provides parsing of the service's model, ensemble, anomaly
//! detector and cluster documents and their conversion to native types.

mod convert;
mod json;

pub use convert::{expected_mean_depth, ConversionError, FINISHED};
pub(crate) use convert::check_status;
pub use json::*;
