//! Input resolution against a model's field set.

use super::{FieldSet, FieldValue, InputRecord, Optype};

impl FieldSet {
    /// Normalize a raw input record for prediction.
    ///
    /// Drops missing-token values, unmapped display names (when `by_name`) and
    /// the objective field, then casts each value to its field's optype.
    /// Keys that are not known field ids pass through untouched when
    /// `by_name` is false.
    ///
    /// Never fails: values that cannot be cast are dropped, which permits
    /// partial inputs.
    pub fn resolve(&self, raw: &InputRecord, by_name: bool) -> InputRecord {
        let mut resolved = InputRecord::new();
        for (key, value) in raw.iter() {
            if let FieldValue::Text(text) = value {
                if self.is_missing_token(text) {
                    continue;
                }
            }
            let id = if by_name {
                match self.id_for_name(key) {
                    Some(id) => id,
                    None => continue,
                }
            } else {
                key.as_str()
            };
            if self.objective_id() == Some(id) {
                continue;
            }
            if let Some(value) = self.cast(id, value) {
                resolved.insert(id, value);
            }
        }
        resolved
    }

    /// Cast a value to the optype of field `id`.
    fn cast(&self, id: &str, value: &FieldValue) -> Option<FieldValue> {
        let Some(field) = self.get(id) else {
            return Some(value.clone());
        };
        match (field.optype, value) {
            (Optype::Numeric, FieldValue::Text(text)) => {
                let mut text = text.trim();
                if let Some(prefix) = field.prefix.as_deref() {
                    text = text.strip_prefix(prefix).unwrap_or(text);
                }
                if let Some(suffix) = field.suffix.as_deref() {
                    text = text.strip_suffix(suffix).unwrap_or(text);
                }
                match text.trim().parse::<f64>() {
                    Ok(number) => Some(FieldValue::Number(number)),
                    Err(_) => {
                        tracing::warn!(field = id, value = %text, "dropping non-numeric value");
                        None
                    }
                }
            }
            (Optype::Numeric, _) => Some(value.clone()),
            (_, FieldValue::Number(number)) => Some(FieldValue::Text(number.to_string())),
            _ => Some(value.clone()),
        }
    }
}
