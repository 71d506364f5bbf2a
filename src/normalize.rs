//! Input normalization applied to every request before any matching
//!
//! The normalizer canonicalizes an arbitrarily nested JSON value: keys become
//! trimmed strings, numeric-looking strings become numbers, date-like strings
//! become ISO dates, string values are trimmed, and null-valued keys are
//! dropped. The input is never mutated; a new value is produced.

use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Date formats accepted on input, tried in order. Output is always ISO
/// (`%Y-%m-%d`).
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d", "%d.%m.%Y", "%Y.%m.%d", "%d-%m-%y", "%d/%m/%y",
];

/// Errors raised for values that cannot be represented in normalized form
#[derive(Debug, thiserror::Error)]
pub enum NormalizationError {
    #[error("non-finite number at '{key}' cannot be serialized")]
    NonFiniteNumber { key: String },
}

/// Normalize a raw input value into canonical form.
///
/// Missing optional fields are simply absent from the output — they are never
/// an error. Only fundamentally non-serializable values (non-finite numbers)
/// fail.
pub fn normalize(raw: &Value) -> Result<Value, NormalizationError> {
    normalize_at(raw, "$")
}

fn normalize_at(value: &Value, key: &str) -> Result<Value, NormalizationError> {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                if v.is_null() {
                    continue;
                }
                let clean_key = k.trim().to_string();
                let normalized = normalize_at(v, &clean_key)?;
                // An empty string value normalizes away like a null.
                if matches!(&normalized, Value::String(s) if s.is_empty()) {
                    continue;
                }
                out.insert(clean_key, normalized);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(normalize_at(item, key)?);
            }
            Ok(Value::Array(out))
        }
        Value::String(s) => Ok(normalize_string(s)),
        Value::Number(n) => {
            let f = n
                .as_f64()
                .filter(|f| f.is_finite())
                .ok_or_else(|| NormalizationError::NonFiniteNumber {
                    key: key.to_string(),
                })?;
            // All numerics are carried as floats for consistency.
            Ok(Value::from(f))
        }
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Null => Ok(Value::Null),
    }
}

fn normalize_string(s: &str) -> Value {
    let trimmed = s.trim();

    if let Ok(n) = trimmed.parse::<f64>() {
        if n.is_finite() {
            return Value::from(n);
        }
    }

    if let Some(date) = parse_date(trimmed) {
        return Value::String(date.format("%Y-%m-%d").to_string());
    }

    Value::String(trimmed.to_string())
}

/// Parse a date string against the recognized format list.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}
