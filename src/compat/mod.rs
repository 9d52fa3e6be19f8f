//! External format compatibility loaders.
//!
//! This module parses resource documents exported by the BigML service and
//! converts them to native bigml-local types.

pub mod bigml;

pub use bigml::ConversionError;
