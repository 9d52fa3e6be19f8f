//! Input records and model field metadata.
//!
//! This module provides the [`InputRecord`] a caller predicts on and the
//! [`FieldSet`] each model carries, including the resolver that turns a raw
//! record into one keyed by field id.
//!
//! # Overview
//!
//! Raw input arrives keyed either by field id (`"000002"`) or by display
//! name (`"petal length"`). [`FieldSet::resolve`] normalizes it:
//!
//! - values equal to one of the model's missing tokens are dropped
//! - display names are renamed to ids (unknown names are dropped)
//! - the objective field is dropped
//! - values are cast to the field's optype (numeric strings parsed after
//!   stripping the field's prefix/suffix)
//!
//! # Missing Values
//!
//! A missing value is simply an absent key. There is no in-band sentinel.

mod fields;
mod resolve;
mod value;

pub use fields::{Field, FieldSet, Optype, TermAnalysis, TokenMode, DEFAULT_MISSING_TOKENS};
pub use value::{FieldValue, InputRecord};
