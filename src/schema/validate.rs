//! Record validation against a declared schema.
//!
//! Pure function of record + schema: no store access, no side effects.
//! Fails fast on the first violated field and reports the field name, the
//! violated constraint, and the offending value.

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;

use super::types::{ExperimentSchema, FieldConstraint};
use crate::domain::model::{FieldValue, FileReference, RawRecord};
use crate::error::{SpecError, SpecResult};

/// Validate a raw record against `schema`, producing a typed field map.
pub fn validate_record(
    record: &RawRecord,
    schema: &ExperimentSchema,
) -> SpecResult<HashMap<String, FieldValue>> {
    // Undeclared fields are rejected so submissions stay reproducible.
    for key in record.keys() {
        if schema.field(key).is_none() {
            return Err(violation(key, "is not declared in the schema", record[key].clone()));
        }
    }

    let mut fields = HashMap::with_capacity(schema.fields.len());
    for field in &schema.fields {
        let raw = match record.get(&field.name) {
            Some(value) => value,
            None if field.required => {
                return Err(violation(&field.name, "is required but missing", Value::Null));
            }
            None => continue,
        };

        let value = check_field(&field.name, &field.constraint, raw)?;
        fields.insert(field.name.clone(), value);
    }

    Ok(fields)
}

fn check_field(name: &str, constraint: &FieldConstraint, raw: &Value) -> SpecResult<FieldValue> {
    match constraint {
        FieldConstraint::Float { min, max } => {
            let v = raw
                .as_f64()
                .ok_or_else(|| violation(name, "must be a number", raw.clone()))?;
            if v < *min || v > *max {
                return Err(violation(name, &constraint.describe(), raw.clone()));
            }
            Ok(FieldValue::Float(v))
        }
        FieldConstraint::Integer { min, max } => {
            let v = raw
                .as_i64()
                .ok_or_else(|| violation(name, "must be an integer", raw.clone()))?;
            if v < *min || v > *max {
                return Err(violation(name, &constraint.describe(), raw.clone()));
            }
            Ok(FieldValue::Integer(v))
        }
        FieldConstraint::Text => {
            let v = raw
                .as_str()
                .ok_or_else(|| violation(name, "must be a string", raw.clone()))?;
            Ok(FieldValue::Text(v.to_string()))
        }
        FieldConstraint::Choice { options } => {
            let v = raw
                .as_str()
                .ok_or_else(|| violation(name, "must be a string", raw.clone()))?;
            if !options.iter().any(|o| o == v) {
                return Err(violation(name, &constraint.describe(), raw.clone()));
            }
            Ok(FieldValue::Choice(v.to_string()))
        }
        FieldConstraint::FileRef => file_reference(name, raw),
    }
}

/// A file field is either a path string (lazily uploaded at execution time)
/// or an object `{"stored": "<key>"}` naming an existing storage key.
fn file_reference(name: &str, raw: &Value) -> SpecResult<FieldValue> {
    match raw {
        Value::String(path) if !path.trim().is_empty() => Ok(FieldValue::File(
            FileReference::Local(PathBuf::from(path)),
        )),
        Value::Object(map) => match map.get("stored").and_then(Value::as_str) {
            Some(key) if !key.trim().is_empty() => {
                Ok(FieldValue::File(FileReference::Stored(key.to_string())))
            }
            _ => Err(violation(
                name,
                "must name a storage key under \"stored\"",
                raw.clone(),
            )),
        },
        _ => Err(violation(
            name,
            "must be a non-empty file path or storage key",
            raw.clone(),
        )),
    }
}

fn violation(field: &str, constraint: &str, value: Value) -> SpecError {
    SpecError::Validation {
        field: field.to_string(),
        constraint: constraint.to_string(),
        value,
    }
}
